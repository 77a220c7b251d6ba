pub mod config;
pub mod maildir;
