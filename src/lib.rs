//! # NetTruyen Downloader
//!
//! nettruyen_downloader is a CLI utility to bulk download entire manga series from
//! NetTruyen.
//!
//! It discovers the chapter list from a series index page, then streams every image
//! of every chapter through a bounded download queue with simultaneous downloads.
pub mod cli;
pub mod extractor;
pub mod pipeline;
pub mod queue;
pub mod series;

mod progress_bars;

// Export the pipeline entrypoint
pub use pipeline::{DownloadSummary, Pipeline};

// Export main worker queue
pub use queue::DownloadQueue;

pub use series::{Chapter, DownloadTask, Series};
