//! Data model shared between the discovery and download stages.
//!
//! A [`Series`] is built exactly once, right after the index page is parsed, and owns
//! the root output directory plus the lock that serializes all directory creation.
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;
use tokio::fs::create_dir_all;
use tokio::sync::Mutex;
use url::Url;

#[derive(Error, Debug)]
pub enum SeriesError {
    #[error("Failed to get current dir from environment")]
    EnvError {
        #[from]
        source: io::Error,
    },

    #[error("Failed to create destination directory. error: {message}")]
    DirCreationError { message: String },
}

/// The top-level collection being downloaded.
///
/// Holds the sanitized display title, the original series URL (used as `Referer` for
/// image requests) and the root directory every chapter folder is created under.
pub struct Series {
    title: String,
    url: Url,
    root: PathBuf,
    dir_guard: Mutex<()>,
}

impl Series {
    /// Builds the series from the already-extracted index title.
    ///
    /// When `output` is not set via cli flags, the root directory is placed in the
    /// current dir, named after the sanitized title.
    pub fn new(title: &str, url: Url, output: Option<PathBuf>) -> Result<Self, SeriesError> {
        let place = match output {
            None => std::env::current_dir()?,
            Some(dir) => dir,
        };

        let root = place.join(sanitize_segment(title.trim()));
        debug!("Target dir: {}", root.display());

        Ok(Self {
            title: title.trim().to_string(),
            url,
            root,
            dir_guard: Mutex::new(()),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the root output directory. Must succeed before any chapter is processed.
    pub async fn create_root(&self) -> Result<(), SeriesError> {
        self.ensure_dir(&self.root).await
    }

    /// Derives a [`Chapter`] from its page URL.
    ///
    /// The chapter keeps the last non-empty path segment as its name and maps to a
    /// subdirectory of the series root.
    pub fn chapter(&self, url: Url) -> Chapter {
        let name = url
            .path_segments()
            .and_then(|segments| segments.rev().find(|s| !s.is_empty()))
            .map(|s| sanitize_segment(s.trim()))
            .unwrap_or_else(|| String::from("chapter"));

        let dir = self.root.join(&name);

        Chapter { url, name, dir }
    }

    /// Creates the chapter subdirectory, lazily, the first time any of its images is
    /// discovered. Safe to call multiple times for the same chapter.
    pub async fn ensure_chapter_dir(&self, chapter: &Chapter) -> Result<(), SeriesError> {
        self.ensure_dir(&chapter.dir).await
    }

    // All directory creation goes through the guard so concurrent attempts for the
    // same path are serialized.
    async fn ensure_dir(&self, dir: &Path) -> Result<(), SeriesError> {
        let _guard = self.dir_guard.lock().await;

        match create_dir_all(dir).await {
            Ok(_) => Ok(()),
            Err(error) => Err(SeriesError::DirCreationError {
                message: error.to_string(),
            }),
        }
    }
}

/// An ordered sub-unit of a [`Series`].
#[derive(Debug, Clone)]
pub struct Chapter {
    /// URL of the chapter reading page.
    pub url: Url,
    /// Display name, derived from the last path segment of the chapter URL.
    pub name: String,
    /// Directory where this chapter's images are saved.
    pub dir: PathBuf,
}

/// A single image download unit, produced by the chapter relay and consumed exactly
/// once by one download worker.
#[derive(Debug, Clone)]
pub struct DownloadTask {
    /// Direct URL of the image file.
    pub url: String,
    /// Full destination path, including the file name.
    pub path: PathBuf,
}

impl DownloadTask {
    /// Builds a task for an image discovered on a chapter page.
    ///
    /// Returns `None` when no file name can be derived from the URL.
    pub fn new(img_url: String, chapter: &Chapter) -> Option<Self> {
        let file_name = file_name_from_url(&img_url)?;
        let path = chapter.dir.join(file_name);

        Some(Self { url: img_url, path })
    }
}

/// Replaces characters that are unsafe in a path segment.
pub fn sanitize_segment(name: &str) -> String {
    name.replace(
        ['/', '\\', ':', '*', '?', '"', '<', '>', '|'],
        "-",
    )
}

/// Derives the local file name from an image URL: the query string is stripped first,
/// then the last path segment is taken.
pub fn file_name_from_url(img_url: &str) -> Option<String> {
    let mut url = Url::parse(img_url).ok()?;
    url.set_query(None);

    let name = url
        .path_segments()
        .and_then(|segments| segments.last())
        .filter(|s| !s.is_empty())?;

    Some(sanitize_segment(name))
}
