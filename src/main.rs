/// Batch entry point: load a directory of sonde exports, resolve sites and
/// print the site index plus every non-empty depth profile as JSON.
///
/// Environment (a `.env` file is honoured):
///   PROFILE_CONFIG    path to the TOML config (default `profile.toml`)
///   PROFILE_DATA_DIR  overrides `data_dir` from the config

use serde::Serialize;
use std::env;
use std::error::Error;

use pond_profile_service::ingest::ysi;
use pond_profile_service::logging::{self, Stage};
use pond_profile_service::{Config, DepthProfile, ProfileError, ProfileService, SiteId, SiteSummary};

const DEFAULT_CONFIG_PATH: &str = "profile.toml";

#[derive(Serialize)]
struct BatchOutput {
    default_site: Option<SiteId>,
    sites: Vec<SiteSummary>,
    profiles: Vec<DepthProfile>,
}

fn main() {
    if let Err(e) = run() {
        logging::error(Stage::System, None, &e.to_string());
        eprintln!("✗ {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    let config_path = env::var("PROFILE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = Config::load_or_default(&config_path)?;
    if let Ok(dir) = env::var("PROFILE_DATA_DIR") {
        config.data_dir = Some(dir.into());
    }

    logging::init_logger(
        config.logging.log_level()?,
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );

    let data_dir = config.data_dir.clone().ok_or_else(|| {
        ProfileError::InvalidConfiguration(
            "no data directory configured (set data_dir or PROFILE_DATA_DIR)".to_string(),
        )
    })?;

    logging::info(
        Stage::System,
        None,
        &format!(
            "Loading {} (threshold {} m, bucket {} m, {})",
            data_dir.display(),
            config.clustering.proximity_threshold_m,
            config.profiles.bucket_width_m,
            config.profiles.reducer
        ),
    );

    let report = ysi::load_dir(&data_dir)?;
    let mut service = ProfileService::new(&config)?;
    service.ingest(report.readings);

    let sites = service.list_sites();
    let mut profiles = Vec::new();
    for site in &sites {
        for profile in service.profiles_for_site(site.id)? {
            if !profile.is_empty() {
                profiles.push(DepthProfile::clone(&profile));
            }
        }
    }

    let output = BatchOutput {
        default_site: service.default_site().map(|s| s.id),
        sites,
        profiles,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
