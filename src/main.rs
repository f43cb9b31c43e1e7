// playlist-downloader - command-line entry point

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use playlist_downloader_lib::downloader::models::DEFAULT_MAX_CONCURRENT;
use playlist_downloader_lib::downloader::{
    DownloadError, DownloadOptions, Downloader, HttpProvider, LocalFilesystem, NetworkConfig,
    ProviderConfig, QualityPreference, RunReport, Target,
};
use playlist_downloader_lib::logging::{init_tracing, LogLevel};

#[derive(Parser, Debug)]
#[command(name = "playlist-downloader", version, about, long_about = None)]
struct Cli {
    /// Video or playlist URL
    url: String,

    /// Quality: empty for the first stream, `max`, `min`, or a tier name (e.g. hd720)
    #[arg(short, long, default_value = "")]
    quality: String,

    /// Output directory (defaults to the user's download directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// How many downloads may run at once
    #[arg(short, long, default_value_t = DEFAULT_MAX_CONCURRENT)]
    jobs: usize,

    /// Proxy URL (e.g. socks5://127.0.0.1:1080)
    #[arg(long)]
    proxy: Option<String>,

    /// Connect and metadata timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u32,

    /// User-Agent header to send
    #[arg(long)]
    user_agent: Option<String>,

    /// Video info endpoint; the video id is appended
    #[arg(long, hide = true)]
    video_info_url: Option<String>,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn options(&self) -> DownloadOptions {
        let mut options = DownloadOptions::default()
            .with_quality(QualityPreference::parse(&self.quality))
            .with_max_concurrent(self.jobs)
            .with_network(NetworkConfig {
                proxy: self.proxy.clone(),
                timeout: Some(self.timeout),
                user_agent: self.user_agent.clone(),
            });
        if let Some(output) = &self.output {
            options = options.with_output_path(output);
        }
        options
    }

    fn provider_config(&self) -> ProviderConfig {
        match &self.video_info_url {
            Some(url) => ProviderConfig::default().with_video_info_url(url),
            None => ProviderConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_level.as_tracing_level()) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(&cli).await {
        Ok(report) => {
            print_report(&report, cli.json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(kind = e.kind(), "{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<RunReport, DownloadError> {
    let target = Target::parse(&cli.url)?;
    let options = cli.options();

    let provider = HttpProvider::new(&options.network, cli.provider_config())?;
    let downloader = Downloader::new(
        Arc::new(provider),
        Arc::new(LocalFilesystem::new()),
        options,
    )?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling remaining downloads");
            on_interrupt.cancel();
        }
    });

    downloader.run_with_cancel(&target, cancel).await
}

fn print_report(report: &RunReport, json: bool) {
    if json {
        match serde_json::to_string_pretty(report) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to serialize report: {}", e),
        }
        return;
    }

    for outcome in &report.outcomes {
        println!("{}", outcome);
    }
    println!(
        "{} downloaded, {} failed -> {}",
        report.succeeded(),
        report.failed(),
        report.destination.display()
    );
}
