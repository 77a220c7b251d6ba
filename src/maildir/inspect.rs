use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use mail_parser::{HeaderName, MessageParser};
use std::fs::{File, Metadata};
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::types::MailFileInfo;

/// Build a `MailFileInfo` for `path` from its metadata and header `Date`.
pub fn inspect(path: &Path, metadata: &Metadata) -> Result<MailFileInfo> {
    let fs_time: DateTime<Utc> = metadata.modified().context("read mtime")?.into();

    let header = read_header_block(path)?;
    if header.is_empty() {
        bail!("empty message header");
    }

    let message = MessageParser::default()
        .parse_headers(&header)
        .ok_or_else(|| anyhow!("malformed message header"))?;

    let mail_time = match message.date() {
        Some(date) => to_utc(date).ok_or_else(|| anyhow!("malformed Date header"))?,
        None if message
            .headers()
            .iter()
            .any(|h| matches!(h.name, HeaderName::Date)) =>
        {
            bail!("malformed Date header")
        }
        None => bail!("missing Date header"),
    };

    Ok(MailFileInfo {
        path: path.to_path_buf(),
        fs_time,
        mail_time,
    })
}

/// Read the raw header block: everything up to the first empty line.
/// Every line must be a `name:` field or a folded continuation of one.
/// The file is closed before returning.
fn read_header_block(path: &Path) -> Result<Vec<u8>> {
    let file = File::open(path).context("open")?;
    let mut reader = BufReader::new(file);

    let mut header = Vec::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).context("read")? == 0 {
            break;
        }
        if line == b"\n" || line == b"\r\n" {
            break;
        }
        let continuation = matches!(line.first(), Some(b' ' | b'\t'));
        if (continuation && header.is_empty()) || (!continuation && !is_field_line(&line)) {
            bail!("malformed message header");
        }
        header.extend_from_slice(&line);
    }

    Ok(header)
}

/// A field name of printable ASCII (no space or colon) followed by `:`
fn is_field_line(line: &[u8]) -> bool {
    match line.iter().position(|&b| b == b':') {
        Some(0) | None => false,
        Some(colon) => line[..colon].iter().all(|&b| (b'!'..=b'~').contains(&b)),
    }
}

fn to_utc(date: &mail_parser::DateTime) -> Option<DateTime<Utc>> {
    let naive = NaiveDate::from_ymd_opt(date.year.into(), date.month.into(), date.day.into())?
        .and_hms_opt(date.hour.into(), date.minute.into(), date.second.into())?;

    let mut offset = i32::from(date.tz_hour) * 3600 + i32::from(date.tz_minute) * 60;
    if date.tz_before_gmt {
        offset = -offset;
    }

    let local = FixedOffset::east_opt(offset)?
        .from_local_datetime(&naive)
        .single()?;
    Some(local.with_timezone(&Utc))
}
