use clap::Parser;
use std::path::PathBuf;

/// Upload files and folders to the drive
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Files or folders to upload; folders keep their structure
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Config file (defaults to ~/.drive-uploader/config.json)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Destination folder id (defaults to the drive root)
    #[arg(long, value_name = "ID")]
    pub parent: Option<String>,

    /// Override the backend base URL
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Override the number of concurrent transfers
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Override the number of files per batch request
    #[arg(long, value_name = "N")]
    pub chunk_size: Option<usize>,

    /// Log to stdout only
    #[arg(long)]
    pub no_log_file: bool,
}
