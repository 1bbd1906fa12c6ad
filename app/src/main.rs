use std::env;
use std::fs::OpenOptions;
use std::sync::Mutex;

use tabula_core::config::{ConnectionProfile, FileConfigStore};
use tracing_subscriber::EnvFilter;

const LOG_PATH_ENV: &str = "TABULA_LOG";
const LOG_FILTER_ENV: &str = "TABULA_LOG_FILTER";
const DEFAULT_LOG_FILTER: &str = "tabula=info";

// The terminal is owned by the grid, so logs only go to a file the user asks for.
fn init_logging() {
    let Some(path) = env::var_os(LOG_PATH_ENV) else {
        return;
    };
    match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init();
        }
        Err(error) => {
            eprintln!(
                "could not open log file {}: {error}",
                path.to_string_lossy()
            );
        }
    }
}

fn select_profile(
    store: &FileConfigStore,
    name: Option<&str>,
) -> Result<Option<ConnectionProfile>, String> {
    let Some(name) = name else {
        return Ok(None);
    };
    if let Some(profile) = store.profile(name) {
        return Ok(Some(profile.clone()));
    }
    let known: Vec<&str> = store
        .profiles()
        .iter()
        .map(|profile| profile.name.as_str())
        .collect();
    let known = if known.is_empty() {
        "none defined".to_string()
    } else {
        known.join(", ")
    };
    Err(format!(
        "no profile named `{name}` in {} (profiles: {known})",
        store.path().display()
    ))
}

fn run_app(
    run_tui: impl FnOnce() -> Result<(), tabula_tui::TuiError>,
) -> Result<(), Box<dyn std::error::Error>> {
    run_tui()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let store = FileConfigStore::load_default()?;
    let requested = env::args().nth(1);
    let profile = select_profile(&store, requested.as_deref())?;
    let settings = store.grid_settings();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        profile = profile
            .as_ref()
            .map_or("offline demo", |profile| profile.name.as_str()),
        "starting tabula"
    );

    run_app(|| tabula_tui::run(profile, settings))
}
