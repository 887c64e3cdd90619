use std::path::PathBuf;

use clap::Parser;
use url::Url;

use crate::pipeline::{DEFAULT_QUEUE_SIZE, DEFAULT_SIM_DOWNLOADS, DEFAULT_TIMEOUT_SECS};

#[derive(Parser, Debug)]
#[clap(name = "NetTruyen Downloader", author, version, about, long_about = None)]
pub struct Cli {
    /// URL of the series index page listing all chapters
    #[clap(value_name = "URL")]
    pub url: Url,

    /// Where to save the series (If the path doesn't exist, it will be created.)
    ///
    /// Defaults to the current dir. The series gets its own folder, named after its
    /// title, with one subfolder per chapter.
    #[clap(short = 'o', long, value_name = "PATH", help_heading = "SAVE")]
    pub output: Option<PathBuf>,

    /// Number of simultaneous downloads
    ///
    /// [max: 20]
    #[clap(
        short = 'd',
        value_name = "NUMBER",
        value_parser(clap::value_parser!(u8).range(1..=20)),
        default_value_t = DEFAULT_SIM_DOWNLOADS,
        help_heading = "DOWNLOAD"
    )]
    pub simultaneous_downloads: u8,

    /// Timeout for each request, in seconds
    #[clap(
        short = 't',
        long,
        value_name = "SECONDS",
        default_value_t = DEFAULT_TIMEOUT_SECS,
        help_heading = "DOWNLOAD"
    )]
    pub timeout: u64,

    /// How many pending image downloads the task queue holds before discovery blocks
    #[clap(
        long,
        value_name = "NUMBER",
        default_value_t = DEFAULT_QUEUE_SIZE,
        help_heading = "DOWNLOAD"
    )]
    pub queue_size: usize,
}
