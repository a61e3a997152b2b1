use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use datebook_core::CalendarOptions;
use datebook_core::source::{SourceInput, SourceKindInput};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration at ~/.config/datebook/config.toml, overlaid by `DATEBOOK_*`
/// environment variables (`DATEBOOK_CALENDAR__TIME_ZONE=UTC`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatebookConfig {
    pub calendar: CalendarOptions,
    pub sources: Vec<SourceInput>,
}

impl DatebookConfig {
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("datebook");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from `path`, or from the default location, which is created with
    /// everything commented out if missing.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).into_owned()),
            None => {
                let default_path = Self::config_path()?;
                if !default_path.exists() {
                    debug!("Creating default config at {}", default_path.display());
                    Self::create_default_config(&default_path)?;
                }
                default_path
            }
        };

        let mut config: DatebookConfig = Config::builder()
            .add_source(File::from(path.as_path()).required(false))
            .add_source(
                Environment::with_prefix("DATEBOOK")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Could not read config {}", path.display()))?
            .try_deserialize()
            .with_context(|| format!("Invalid config {}", path.display()))?;

        for source in &mut config.sources {
            expand_source_path(source);
        }
        debug!(
            "Loaded config from {} with {} source(s)",
            path.display(),
            config.sources.len()
        );
        Ok(config)
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> Result<()> {
        let contents = "\
# datebook configuration

[calendar]
# \"local\", \"UTC\" or an IANA name such as \"Europe/Berlin\":
# time_zone = \"local\"
# locale = \"en\"

# First day of the week, 0 = Sunday:
# first_day = 1

# initial_view = \"dayGridMonth\"
# default_timed_event_duration = \"01:00\"
# lazy_fetching = true
# theme_system = \"standard\"

# Event sources. kind is \"file\", \"json\" or \"ical\".
#
# [[sources]]
# id = \"team\"
# kind = \"ical\"
# url = \"webcal://example.com/team.ics\"
# color = \"#378006\"
#
# [[sources]]
# id = \"mine\"
# kind = \"file\"
# path = \"~/calendar/events.json\"
";

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Could not create config directory")?;
        }
        std::fs::write(path, contents).context("Could not write config file")?;

        Ok(())
    }
}

fn expand_source_path(source: &mut SourceInput) {
    match &mut source.kind {
        SourceKindInput::File { path } => {
            *path = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned());
        }
        SourceKindInput::Ical { url } if !url.contains("://") => {
            *url = shellexpand::tilde(url.as_str()).into_owned();
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datebook_core::env::TimeZoneSetting;

    #[test]
    fn test_default_config_loads_as_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("datebook").join("config.toml");
        DatebookConfig::create_default_config(&path).unwrap();

        let config = DatebookConfig::load(Some(&path)).unwrap();
        assert!(config.sources.is_empty());
        assert_eq!(config.calendar.initial_view, "dayGridMonth");
    }

    #[test]
    fn test_sources_and_options_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r##"
[calendar]
time_zone = "Europe/Berlin"
first_day = 1
default_timed_event_duration = "00:30"

[[sources]]
id = "mine"
kind = "file"
path = "~/events.json"

[[sources]]
kind = "ical"
url = "webcal://example.com/team.ics"
color = "#378006"
"##,
        )
        .unwrap();

        let config = DatebookConfig::load(Some(&path)).unwrap();
        assert_eq!(
            config.calendar.time_zone,
            TimeZoneSetting::Named("Europe/Berlin".into())
        );
        assert_eq!(config.calendar.first_day, Some(1));
        assert_eq!(config.sources.len(), 2);
        match &config.sources[0].kind {
            SourceKindInput::File { path } => assert!(!path.to_string_lossy().starts_with('~')),
            other => panic!("Expected file source, got {:?}", other),
        }
        assert!(matches!(config.sources[1].kind, SourceKindInput::Ical { .. }));
    }
}
