use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("Series title not found in index page")]
    TitleNotFound,

    #[error("No chapter links found in index page")]
    ZeroChapters,

    #[error("Page returned an invalid response: {status}")]
    InvalidServerResponse { status: StatusCode },

    #[error("Connection Error")]
    ConnectionError(#[from] reqwest::Error),
}
