use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::{AnalysisConfig, ReportConfig, ScoringConfig};
use tracing::{debug, warn};

pub const CONFIG_FILE_NAME: &str = ".energylens.toml";

const MAX_TRAVERSAL_DEPTH: usize = 10;

pub(crate) fn read_config_file(path: &Path) -> Result<String, std::io::Error> {
    let file = fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Parse TOML and replace invalid sections with their defaults.
pub fn parse_and_validate_config(contents: &str) -> Result<AnalysisConfig, String> {
    let mut config = toml::from_str::<AnalysisConfig>(contents)
        .map_err(|e| format!("Failed to parse {CONFIG_FILE_NAME}: {e}"))?;

    if let Err(e) = config.scoring.validate() {
        warn!("Invalid scoring settings: {e}. Using defaults.");
        config.scoring = ScoringConfig::default();
    }
    if let Err(e) = config.report.validate() {
        warn!("Invalid report settings: {e}. Using defaults.");
        config.report = ReportConfig::default();
    }
    config.patterns.disabled.sort();
    config.patterns.disabled.dedup();

    Ok(config)
}

pub(crate) fn try_load_config_from_path(config_path: &Path) -> Option<AnalysisConfig> {
    let contents = match read_config_file(config_path) {
        Ok(contents) => contents,
        Err(e) => {
            handle_read_error(config_path, &e);
            return None;
        }
    };

    match parse_and_validate_config(&contents) {
        Ok(config) => {
            debug!("Loaded config from {}", config_path.display());
            Some(config)
        }
        Err(e) => {
            warn!("{e}. Using defaults.");
            None
        }
    }
}

/// Missing files are expected; anything else is worth a warning.
pub(crate) fn handle_read_error(config_path: &Path, error: &std::io::Error) {
    if error.kind() != std::io::ErrorKind::NotFound {
        warn!(
            "Failed to read config file {}: {}",
            config_path.display(),
            error
        );
    }
}

pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Search `start` and its ancestors for a config file.
pub fn load_config_from(start: &Path) -> AnalysisConfig {
    directory_ancestors(start.to_path_buf(), MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find_map(|path| try_load_config_from_path(&path))
        .unwrap_or_else(|| {
            debug!(
                "No config found after checking {} directories. Using default config.",
                MAX_TRAVERSAL_DEPTH
            );
            AnalysisConfig::default()
        })
}

/// Load an explicitly named config file. Unlike discovery, failures are errors.
pub fn load_config_file(path: &Path) -> crate::core::Result<AnalysisConfig> {
    let contents = read_config_file(path)?;
    parse_and_validate_config(&contents).map_err(crate::core::Error::Configuration)
}

pub fn load_config() -> AnalysisConfig {
    match std::env::current_dir() {
        Ok(dir) => load_config_from(&dir),
        Err(e) => {
            warn!("Failed to get current directory: {e}. Using default config.");
            AnalysisConfig::default()
        }
    }
}
