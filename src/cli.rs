use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use comfy_table::{Cell, Table};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config;
use crate::core::fetch::HttpFetcher;
use crate::core::pipeline::{run_batch, BatchOptions, BatchReport, FailurePolicy, SavePipeline};
use crate::core::resolver::YtDlp;
use crate::core::track::Backends;
use crate::core::transcode::Ffmpeg;
use crate::sources::openuni::OpenUniversity;
use crate::sources::podcast::PodcastPage;
use crate::sources::soundcloud::SoundcloudCollector;
use crate::sources::youtube::ShlosbergLive;
use crate::sources::{collect_all, Collector};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Full,
    Compact,
    Pretty,
}

/// `--on-error` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnError {
    /// Log the failure and go on with the next track
    Continue,
    /// Stop the batch at the first failure
    Abort,
}

impl From<OnError> for FailurePolicy {
    fn from(value: OnError) -> Self {
        match value {
            OnError::Continue => FailurePolicy::Continue,
            OnError::Abort => FailurePolicy::Abort,
        }
    }
}

#[derive(Parser)]
#[command(name = "audio-archiver", about = "Download playlists into a tagged audio archive")]
pub struct Cli {
    /// Debug logging
    #[arg(long)]
    pub debug: bool,

    /// Log line layout
    #[arg(long, value_enum, default_value_t = LogFormat::Full)]
    pub log_format: LogFormat,

    /// Download SoundCloud playlists
    #[arg(long)]
    pub soundcloud: bool,

    /// Download Shlosberg Live videos as audio
    #[arg(long)]
    pub shlosberg_live: bool,

    /// Download Open University lectures
    #[arg(long)]
    pub openuni: bool,

    /// Download episodes linked from the configured podcast page
    #[arg(long)]
    pub podcast: bool,

    /// Actually save files; without it only log what would be saved
    #[arg(long)]
    pub save: bool,

    /// Save even when the target file already exists
    #[arg(long)]
    pub force: bool,

    /// What a failed track does to the rest of the batch
    #[arg(long, value_enum, default_value_t = OnError::Continue)]
    pub on_error: OnError,

    /// JSON file with the download path and service credentials
    #[arg(long, default_value = "secrets.json")]
    pub secrets: PathBuf,
}

/// Process-wide log sink; `RUST_LOG` overrides `--debug`.
pub fn init_logging(cli: &Cli) {
    let level = if cli.debug {
        "audio_archiver=debug"
    } else {
        "audio_archiver=info"
    };
    let builder = tracing_subscriber::fmt().with_env_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
    );
    match cli.log_format {
        LogFormat::Full => builder.init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

pub fn run(cli: Cli) -> Result<BatchReport> {
    let cfg = config::load_config(&cli.secrets)?;
    let root = cfg.download_root();
    info!("saving files to {}", root.display());

    let backends = Backends {
        fetcher: Box::new(HttpFetcher::new().context("cannot build http client")?),
        transcoder: Box::new(Ffmpeg),
        resolver: Box::new(YtDlp),
        retry: cfg.retry_policy(),
        transcode: cfg.transcode_settings(),
    };
    if cli.shlosberg_live {
        backends.resolver.check_available()?;
        if cli.save {
            backends.transcoder.check_available()?;
        }
    }
    let pipeline = SavePipeline::new(backends);

    let mut collectors: Vec<Box<dyn Collector + '_>> = Vec::new();
    if cli.soundcloud {
        collectors.push(Box::new(SoundcloudCollector::new(cfg.soundcloud_token()?)?));
    }
    if cli.shlosberg_live {
        collectors.push(Box::new(ShlosbergLive::new(
            pipeline.backends().resolver.as_ref(),
            cfg.retry_policy(),
        )));
    }
    if cli.openuni {
        collectors.push(Box::new(OpenUniversity::new()?));
    }
    if cli.podcast {
        collectors.push(Box::new(PodcastPage::new(cfg.podcast()?.clone())?));
    }
    if collectors.is_empty() {
        warn!("no source selected, nothing to do");
    }

    let options = BatchOptions {
        root,
        save: cli.save,
        force: cli.force,
        on_error: cli.on_error.into(),
    };
    let report = run_batch(&pipeline, collect_all(&collectors), &options)?;
    print_report(&report);
    Ok(report)
}

fn print_report(report: &BatchReport) {
    let mut table = Table::new();
    table.set_header(vec!["Checked", "Saved", "Skipped", "Failed"]);
    table.add_row(vec![
        Cell::new(report.checked),
        Cell::new(report.saved),
        Cell::new(report.skipped),
        Cell::new(report.failed),
    ]);
    println!("{table}");
}
