//! Coordinates the two discovery stages and the download pool of a series rip.
//!
//! Stage wiring, in order:
//! 1. Fetch and parse the index page (any failure here aborts the run).
//! 2. Build the [`Series`], create its root directory.
//! 3. Stream chapter URLs into the relay task, which fetches each chapter page
//!    sequentially and enqueues image tasks onto the bounded channel.
//! 4. The [`DownloadQueue`] drains the channel with simultaneous downloads.
//!
//! The coordinator owns both channels: the chapter sender is dropped once the index
//! is drained, the task sender is dropped when the relay ends, and the run only
//! reports done after both spawned tasks were joined.
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Error;
use log::{debug, error};
use reqwest::Client;
use tokio::join;
use tokio::spawn;
use tokio::sync::mpsc::{channel, unbounded_channel, Sender, UnboundedReceiver};
use url::Url;

use crate::extractor::{
    fetch_html, parse_chapter_images, parse_index, SiteSelectors, PAGE_USER_AGENT,
};
use crate::progress_bars::ProgressArcs;
use crate::queue::DownloadQueue;
use crate::series::{DownloadTask, Series};

/// Default number of simultaneous downloads.
pub const DEFAULT_SIM_DOWNLOADS: u8 = 5;
/// Default per-request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Default capacity of the bounded task channel.
pub const DEFAULT_QUEUE_SIZE: usize = 100;

/// Final report of a completed run.
#[derive(Debug)]
pub struct DownloadSummary {
    /// Number of image files successfully saved.
    pub downloaded: u64,
    /// Root directory the series was saved in.
    pub output_dir: PathBuf,
}

/// Wires the extractor, chapter relay and download queue together.
pub struct Pipeline {
    start_url: Url,
    output: Option<PathBuf>,
    sim_downloads: u8,
    timeout: Duration,
    queue_size: usize,
}

impl Pipeline {
    pub fn new(
        start_url: Url,
        output: Option<PathBuf>,
        sim_downloads: u8,
        timeout: Duration,
        queue_size: usize,
    ) -> Self {
        Self {
            start_url,
            output,
            sim_downloads,
            timeout,
            queue_size,
        }
    }

    /// Runs the whole pipeline to completion.
    ///
    /// Only an index fetch failure, a missing series title or a root directory
    /// creation failure abort the run; chapter and image level errors are logged and
    /// skipped.
    pub async fn run(self) -> Result<DownloadSummary, Error> {
        let selectors = SiteSelectors::new();

        let page_client = Client::builder()
            .user_agent(PAGE_USER_AGENT)
            .timeout(self.timeout)
            .build()?;

        // Stage 1: index page. Fatal on any error.
        let index_html = fetch_html(&page_client, &self.start_url).await?;
        let index = parse_index(&index_html, &self.start_url, &selectors)?;

        let series = Arc::new(Series::new(
            &index.title,
            self.start_url.clone(),
            self.output,
        )?);
        series.create_root().await?;

        debug!(
            "Downloading {} chapters of {}",
            index.chapter_urls.len(),
            series.title()
        );

        let bars = ProgressArcs::initialize();

        // Chapter relay channel and bounded task channel. Senders are dropped by
        // their owning stage, which is what closes each channel.
        let (chapter_tx, chapter_rx) = unbounded_channel::<Url>();
        let (task_tx, task_rx) = channel::<DownloadTask>(self.queue_size);

        let queue = DownloadQueue::new(self.start_url.clone(), self.sim_downloads, self.timeout)?;
        let downloader_task = queue.setup_async_downloader(task_rx, bars.clone());

        let relay_task = spawn(relay_chapters(
            page_client,
            series.clone(),
            selectors,
            chapter_rx,
            task_tx,
            bars.clone(),
        ));

        // Stage 2: drain the discovered chapter list into the relay, in document
        // order, then close the chapter channel.
        for url in index.chapter_urls {
            if chapter_tx.send(url).is_err() {
                break;
            }
        }
        drop(chapter_tx);

        let (relay_result, downloader_result) = join!(relay_task, downloader_task);

        relay_result?;
        let downloaded = downloader_result?;

        bars.main.finish_and_clear();

        Ok(DownloadSummary {
            downloaded,
            output_dir: series.root().to_path_buf(),
        })
    }
}

/// Fetches each relayed chapter page, extracts its images and enqueues download
/// tasks. Chapter-level failures are logged and the chapter is skipped.
async fn relay_chapters(
    client: Client,
    series: Arc<Series>,
    selectors: SiteSelectors,
    mut chapter_rx: UnboundedReceiver<Url>,
    task_tx: Sender<DownloadTask>,
    bars: Arc<ProgressArcs>,
) {
    debug!("Chapter relay thread initialized");

    while let Some(chapter_url) = chapter_rx.recv().await {
        let chapter = series.chapter(chapter_url);
        bars.main.set_message(chapter.name.clone());

        let html = match fetch_html(&client, &chapter.url).await {
            Ok(html) => html,
            Err(extract_error) => {
                error!("Failed to fetch chapter {}: {}", chapter.url, extract_error);
                continue;
            }
        };

        let page = parse_chapter_images(&html, &selectors);

        if page.matched() == 0 {
            debug!("No images found in chapter {}", chapter.name);
            continue;
        }

        // Created on first discovered image, never before.
        if let Err(dir_error) = series.ensure_chapter_dir(&chapter).await {
            error!(
                "Skipping chapter {}: {}",
                chapter.name, dir_error
            );
            continue;
        }

        for img_url in page.images {
            let Some(task_item) = DownloadTask::new(img_url, &chapter) else {
                error!("Could not derive a file name for an image in {}", chapter.name);
                continue;
            };

            bars.main.inc_length(1);

            // Blocks when the queue is full; backpressure instead of lost tasks.
            if task_tx.send(task_item).await.is_err() {
                debug!("Task channel closed, stopping chapter relay");
                return;
            }
        }
    }
}
