//! Queue used to download every image task produced by the chapter relay.
//!
//! The [`DownloadQueue`] drains the bounded task channel with a fixed number of
//! simultaneous downloads and exits only once the channel is closed and empty.
//! Individual task failures are logged and never stop the other downloads.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use indicatif::ProgressBar;
use log::{debug, error};
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, REFERER};
use reqwest::Client;
use tokio::fs::{remove_file, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::spawn;
use tokio::sync::mpsc::Receiver;
use tokio::task;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use url::Url;

pub mod error;

use crate::progress_bars::ProgressArcs;
use crate::series::DownloadTask;
use error::DownloadError;

/// User-Agent sent with every image request.
const IMAGE_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
/// Image sources reject requests that don't look like a browser loading a page.
const IMAGE_ACCEPT: &str = "image/webp,image/apng,image/*,*/*;q=0.8";
const IMAGE_ACCEPT_ENCODING: &str = "gzip, deflate, br";

/// Fixed-size pool of image download workers.
pub struct DownloadQueue {
    client: Client,
    sim_downloads: u8,
    referer: Url,
}

impl DownloadQueue {
    /// Sets up the queue for download.
    ///
    /// `referer` must be the original series URL; NetTruyen image servers reject
    /// hot-linked requests without it.
    pub fn new(referer: Url, sim_downloads: u8, timeout: Duration) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .user_agent(IMAGE_USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            sim_downloads,
            referer,
        })
    }

    /// Spawns the downloader task draining `channel_rx`.
    ///
    /// The task ends when every sender half of the channel has been dropped and all
    /// queued downloads finished, and resolves to the number of files successfully
    /// saved.
    pub fn setup_async_downloader(
        self,
        channel_rx: Receiver<DownloadTask>,
        bars: Arc<ProgressArcs>,
    ) -> JoinHandle<u64> {
        spawn(async move {
            debug!("Async downloader thread initialized");

            let downloaded = Arc::new(AtomicU64::new(0));
            let counter = downloaded.clone();

            ReceiverStream::new(channel_rx)
                .map(|task_item| {
                    let client = self.client.clone();
                    let referer = self.referer.clone();
                    let bars = bars.clone();

                    task::spawn(async move { Self::fetch(client, referer, task_item, bars).await })
                })
                .buffer_unordered(self.sim_downloads as usize)
                .for_each(|join_result| {
                    let counter = counter.clone();
                    let bars = bars.clone();

                    async move {
                        match join_result {
                            Ok(Ok(())) => {
                                counter.fetch_add(1, Ordering::SeqCst);
                            }
                            Ok(Err(download_error)) => {
                                error!("Failed to download image: {}", download_error);
                            }
                            Err(join_error) => {
                                error!("Download task failed to execute: {}", join_error);
                            }
                        }
                        bars.main.inc(1);
                    }
                })
                .await;

            downloaded.load(Ordering::SeqCst)
        })
    }

    async fn fetch(
        client: Client,
        referer: Url,
        task_item: DownloadTask,
        bars: Arc<ProgressArcs>,
    ) -> Result<(), DownloadError> {
        debug!("Fetching {} into {}", task_item.url, task_item.path.display());

        let res = client
            .get(&task_item.url)
            .header(REFERER, referer.as_str())
            .header(ACCEPT, IMAGE_ACCEPT)
            .header(ACCEPT_ENCODING, IMAGE_ACCEPT_ENCODING)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            // Do not create the file at all for a failed request.
            return Err(DownloadError::RemoteFileNotFound { status });
        }

        let size = res.content_length().unwrap_or_default();
        let bar = bars.add_download_bar(size);

        let mut stream = res.bytes_stream();

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&task_item.path)
            .await?;

        let mut bw = BufWriter::new(file);

        while let Some(item) = stream.next().await {
            let mut chunk = match item {
                Ok(chunk) => chunk,
                Err(error) => {
                    Self::discard_partial(bw, &task_item, &bar).await;
                    return Err(DownloadError::ChunkDownloadFail {
                        message: error.to_string(),
                    });
                }
            };

            bar.inc(chunk.len() as u64);

            if let Err(error) = bw.write_all_buf(&mut chunk).await {
                Self::discard_partial(bw, &task_item, &bar).await;
                return Err(error.into());
            }
        }

        if let Err(error) = bw.flush().await {
            Self::discard_partial(bw, &task_item, &bar).await;
            return Err(error.into());
        }

        bar.finish_and_clear();
        debug!("Finished downloading {}", task_item.path.display());
        Ok(())
    }

    // Close and remove the partial file.
    async fn discard_partial(
        bw: BufWriter<tokio::fs::File>,
        task_item: &DownloadTask,
        bar: &ProgressBar,
    ) {
        bar.finish_and_clear();
        drop(bw);

        if let Err(error) = remove_file(&task_item.path).await {
            debug!(
                "Failed to remove partial file {}: {}",
                task_item.path.display(),
                error
            );
        }
    }
}
