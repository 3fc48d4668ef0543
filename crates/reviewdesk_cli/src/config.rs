//! CLI configuration: TOML file merged with flags and environment.
//!
//! Precedence: command-line flag / env var, then config file, then defaults.

use anyhow::{Context, Result};
use reviewdesk_core::default_log_level;
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "reviewdesk.toml";
const DEFAULT_DATABASE_FILE: &str = "reviewdesk.sqlite3";

/// On-disk configuration; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub database_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Effective settings for one CLI invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub database_path: PathBuf,
    /// Absolute log directory; `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    pub log_level: String,
}

/// Loads the config file (explicit path or `./reviewdesk.toml`) and merges
/// overrides on top.
pub fn load(explicit_path: Option<&Path>, overrides: Overrides) -> Result<Settings> {
    let file = match explicit_path {
        Some(path) => read_file(path)?,
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.is_file() {
                read_file(default_path)?
            } else {
                FileConfig::default()
            }
        }
    };
    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    Ok(merge(file, overrides, &cwd))
}

fn read_file(path: &Path) -> Result<FileConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config `{}`", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid config `{}`", path.display()))
}

fn merge(file: FileConfig, overrides: Overrides, cwd: &Path) -> Settings {
    let database_path = overrides
        .database_path
        .or(file.database_path)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_FILE));
    let log_dir = overrides
        .log_dir
        .or(file.log_dir)
        .map(|dir| if dir.is_absolute() { dir } else { cwd.join(dir) });
    let log_level = overrides
        .log_level
        .or(file.log_level)
        .unwrap_or_else(|| default_log_level().to_string());

    Settings {
        database_path,
        log_dir,
        log_level,
    }
}

#[cfg(test)]
mod tests {
    use super::{load, merge, FileConfig, Overrides, DEFAULT_DATABASE_FILE};
    use std::path::{Path, PathBuf};

    #[test]
    fn defaults_apply_without_file_or_overrides() {
        let settings = merge(FileConfig::default(), Overrides::default(), Path::new("/work"));
        assert_eq!(settings.database_path, PathBuf::from(DEFAULT_DATABASE_FILE));
        assert_eq!(settings.log_dir, None);
        assert!(!settings.log_level.is_empty());
    }

    #[test]
    fn overrides_win_over_file_values() {
        let file = FileConfig {
            database_path: Some(PathBuf::from("file.sqlite3")),
            log_dir: Some(PathBuf::from("logs")),
            log_level: Some("warn".to_string()),
        };
        let overrides = Overrides {
            database_path: Some(PathBuf::from("flag.sqlite3")),
            log_dir: None,
            log_level: Some("trace".to_string()),
        };

        let settings = merge(file, overrides, Path::new("/work"));

        assert_eq!(settings.database_path, PathBuf::from("flag.sqlite3"));
        assert_eq!(settings.log_dir, Some(PathBuf::from("/work/logs")));
        assert_eq!(settings.log_level, "trace");
    }

    #[test]
    fn explicit_file_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviewdesk.toml");
        std::fs::write(
            &path,
            "database_path = \"/data/review.sqlite3\"\nlog_level = \"error\"\n",
        )
        .unwrap();

        let settings = load(Some(&path), Overrides::default()).unwrap();

        assert_eq!(settings.database_path, PathBuf::from("/data/review.sqlite3"));
        assert_eq!(settings.log_level, "error");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "database = \"x\"\n").unwrap();

        let err = load(Some(&path), Overrides::default()).unwrap_err();
        assert!(format!("{err:#}").contains("invalid config"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = load(Some(Path::new("/nonexistent/reviewdesk.toml")), Overrides::default())
            .unwrap_err();
        assert!(format!("{err:#}").contains("failed to read config"));
    }
}
