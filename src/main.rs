use anyhow::Result;
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use maildir_mtime::config::Config;
use maildir_mtime::maildir::{AccessTimePolicy, FileErrorPolicy, Fixer, fix_maildir};

/// Report (and optionally fix) maildir messages whose mtime disagrees with
/// their Date header.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Rewrite the mtime of mismatched messages instead of only reporting
    #[arg(long)]
    fix: bool,

    /// Mismatch threshold in seconds (default from config, else 3600)
    #[arg(long, value_name = "SECS")]
    threshold: Option<u64>,

    /// Keep the access time when rewriting mtime instead of resetting it
    #[arg(long)]
    preserve_atime: bool,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Maildir roots to scan (default: `roots` from config)
    #[arg(value_name = "ROOT")]
    roots: Vec<PathBuf>,
}

impl Cli {
    fn load_config(&self) -> Config {
        match &self.config {
            Some(path) => Config::load_from(path),
            None => Config::load(),
        }
    }

    fn fixer(&self, config: &Config) -> Fixer {
        Fixer {
            threshold: self
                .threshold
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.threshold()),
            apply: self.fix,
            access_time: if self.preserve_atime {
                AccessTimePolicy::Preserve
            } else {
                config.access_time
            },
        }
    }

    fn roots(&self, config: &Config) -> Vec<PathBuf> {
        if self.roots.is_empty() {
            config.expanded_roots()
        } else {
            self.roots.clone()
        }
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}

/// Process each root in turn, stopping at the first fatal error.
fn run_roots<W: Write, E: Write>(
    roots: &[PathBuf],
    fixer: &Fixer,
    out: &mut W,
    errors: &mut E,
) -> Result<()> {
    for root in roots {
        fix_maildir(root, fixer, FileErrorPolicy::LogAndContinue, out, errors)?;
    }
    Ok(())
}

/// Run all roots and turn the outcome into the process exit status.
fn run<W: Write, E: Write>(roots: &[PathBuf], fixer: &Fixer, out: &mut W, errors: &mut E) -> u8 {
    match run_roots(roots, fixer, out, errors) {
        Ok(()) => 0,
        Err(e) => {
            let _ = writeln!(errors, "fatal error: {:#}", e);
            1
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let config = cli.load_config();
    let fixer = cli.fixer(&config);
    tracing::debug!(?fixer, "starting");

    let code = run(
        &cli.roots(&config),
        &fixer,
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    );
    ExitCode::from(code)
}
