use std::io;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Connection Error")]
    ConnectionError(#[from] reqwest::Error),

    #[error("Remote file returned status {status}")]
    RemoteFileNotFound { status: StatusCode },

    #[error("Failed to download chunk: {message}")]
    ChunkDownloadFail { message: String },

    #[error("File IO error")]
    IoError(#[from] io::Error),
}
