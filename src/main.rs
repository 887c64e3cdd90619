use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use nettruyen_downloader::cli::Cli;
use nettruyen_downloader::Pipeline;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    env_logger::builder().format_timestamp(None).init();

    println!(
        "{} {}",
        "Starting download from".bold(),
        args.url.as_str().bold().blue()
    );

    let pipeline = Pipeline::new(
        args.url,
        args.output,
        args.simultaneous_downloads,
        Duration::from_secs(args.timeout),
        args.queue_size,
    );

    let summary = pipeline.run().await?;

    println!(
        "{} {} {}",
        summary.downloaded.to_string().bold().blue(),
        "files".bold().blue(),
        "downloaded".bold()
    );
    println!(
        "{} {}",
        "Saved in".bold(),
        summary.output_dir.display().to_string().bold().green()
    );

    Ok(())
}
