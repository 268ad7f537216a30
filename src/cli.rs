use std::path::PathBuf;

use clap::Parser;

/// Export named blobs from a GridFS or S3-compatible store into a local directory
#[derive(Debug, Parser)]
#[command(name = "blob-extract", version, about)]
pub struct Cli {
    /// Path to the properties file with store and worker settings
    #[arg(short, long, env = "BLOB_EXTRACT_CONFIG", value_name = "FILE")]
    pub config: PathBuf,

    /// File listing the blobs to retrieve, one name per line
    #[arg(short = 'l', long, value_name = "FILE")]
    pub bloblist: PathBuf,

    /// Directory where the blob files are stored (created if missing)
    #[arg(short = 'p', long, value_name = "DIR")]
    pub blobpath: PathBuf,

    /// Write a JSON report of every outcome to this file
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}
