mod cli;
mod config;
mod domain;
mod infra;
mod workflows;

use anyhow::Result;
use chrono::{Local, Utc};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::Config;
use infra::cache::TodoListCache;
use infra::dvr::kmttg::KmttgClient;
use infra::dvr::mind::MindSession;
use infra::dvr::RecordingSource;
use infra::mail;
use infra::sheets::SheetsClient;
use infra::tvmaze::TvmazeClient;
use workflows::{collect, digest};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config_path = config::get_config_path(cli.config.as_deref());
    info!("Loading config file from {}", config_path.display());
    let config = Config::load(&config_path)?;

    let local = Local;
    let today = Utc::now().with_timezone(&local).date_naive();
    let days = digest::target_days(today, cli.days);
    let window = collect::search_window(&days, &local);

    let cache = TodoListCache::new(config.cache_path());
    let records = collect::load_dvr_records(&cache, cli.force, today, &local, &window, || {
        connect_dvr(&config)
    })?;
    let mut episodes = collect::new_dvr_episodes(&records, &local)?;

    episodes.extend(collect::schedule_episodes_or_empty(&days, &local, |dates| {
        let show_ids = tracked_show_ids(&config)?;
        if show_ids.is_empty() {
            return Ok(Vec::new());
        }
        TvmazeClient::new(&show_ids).get_schedule(dates)
    }));

    let body = digest::build_digest(&episodes, &days);
    let message = mail::compose_message(&config, &digest::subject_for(today), body)?;
    mail::deliver(&config, &message, cli.debug)?;

    info!("Done");
    Ok(())
}

fn connect_dvr(config: &Config) -> Result<Box<dyn RecordingSource>> {
    match &config.kmttg {
        Some(settings) => Ok(Box::new(KmttgClient::new(settings.clone()))),
        None => Ok(Box::new(MindSession::connect(config)?)),
    }
}

/// `tvmaze_show_ids` from the config plus any listed in the configured sheet.
fn tracked_show_ids(config: &Config) -> Result<Vec<u64>> {
    let mut show_ids = config.tvmaze_show_ids.clone();
    if let Some((spreadsheet_id, api_key)) = config.show_id_sheet() {
        show_ids.extend(SheetsClient::new(api_key.to_string()).get_show_ids(spreadsheet_id)?);
    }
    Ok(show_ids)
}
