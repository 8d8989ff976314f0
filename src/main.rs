use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use youtube_transcriber::api::{self, AppState};
use youtube_transcriber::credentials::CookieProvisioner;
use youtube_transcriber::transcribe::fetcher::build_client;
use youtube_transcriber::utils::{self, normalize_language_code};
use youtube_transcriber::{
    output, Cli, Commands, Config, OutputFormat, TranscribeError, TranscribeOptions, TranscriptionPipeline,
    VideoId,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    match cli.command {
        Commands::VideoId { ref input } => {
            let video_id = VideoId::parse(input)?;
            println!("{}", video_id);
        }
        Commands::Config { show, init } => {
            if init {
                let path = match &cli.config {
                    Some(path) => path.clone(),
                    None => Config::default_path()?,
                };
                if path.exists() {
                    anyhow::bail!("Config file already exists: {}", path.display());
                }
                Config::default().save(&path)?;
                println!("Configuration written to: {}", path.display());
            }

            if show || !init {
                load_config(&cli)?.display();
            }
        }
        Commands::Serve { ref bind } => {
            let mut config = load_config(&cli)?;
            if let Some(bind) = bind {
                config.server.bind_address = bind.clone();
            }
            warn_missing_dependencies(&config).await;

            let shutdown = shutdown_on_ctrl_c();
            let pipeline = build_pipeline(&config).await?;
            let state = AppState::new(pipeline, TranscribeOptions::from_config(&config.youtube), shutdown);

            api::serve(state, &config.server.bind_address).await?;
        }
        Commands::Transcribe {
            ref url,
            ref languages,
            format,
            ref output,
        } => {
            let config = load_config(&cli)?;
            warn_missing_dependencies(&config).await;

            let mut options = TranscribeOptions::from_config(&config.youtube);
            if !languages.is_empty() {
                options.preferred_languages = languages.iter().map(|l| normalize_language_code(l)).collect();
            }

            let pipeline = build_pipeline(&config).await?;
            let cancel = shutdown_on_ctrl_c();

            let progress = spinner(cli.quiet);
            progress.set_message(format!("Fetching captions for {}...", url));
            let result = pipeline.transcribe(url, &options, &cancel).await;
            progress.finish_and_clear();

            let transcript = match result {
                Ok(transcript) => transcript,
                Err(e) => {
                    if let TranscribeError::Extraction(err) = &e {
                        if let Some(suggestion) = err.suggestion() {
                            eprintln!("{}", suggestion);
                        }
                    }
                    return Err(e.into());
                }
            };

            write_output(&transcript, output.as_ref(), format)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "youtube_transcriber=debug"
    } else {
        "youtube_transcriber=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(backend) = cli.backend {
        config.youtube.backend = backend;
    }
    Ok(config)
}

/// Dependency problems are reported but never fatal (tools may appear later in containers)
async fn warn_missing_dependencies(config: &Config) {
    let missing = utils::check_dependencies(config).await;
    if !missing.is_empty() {
        eprintln!("Dependency check warnings:");
        for dep in missing {
            eprintln!("   - {}", dep);
        }
        eprintln!("   (Continuing anyway)");
    }
}

async fn build_pipeline(config: &Config) -> Result<TranscriptionPipeline> {
    let client = build_client(&config.fetch)?;
    let cookies = CookieProvisioner::from_config(&config.credentials, client.clone())
        .ensure()
        .await;

    Ok(TranscriptionPipeline::from_config(config, client, cookies.cookie_path()))
}

fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            trigger.cancel();
        }
    });
    token
}

fn spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let progress = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        progress.set_style(style);
    }
    progress.enable_steady_tick(Duration::from_millis(120));
    progress
}

fn write_output(
    transcript: &youtube_transcriber::Transcript,
    path: Option<&PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    match path {
        Some(path) => {
            output::save_to_file(transcript, path, format)?;
            println!("Transcript saved to: {}", path.display());
        }
        None => output::print_to_console(transcript, format)?,
    }
    Ok(())
}
