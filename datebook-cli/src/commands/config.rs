use std::path::Path;

use anyhow::Result;
use datebook_core::source::SourceKindInput;
use owo_colors::OwoColorize;

use crate::config::DatebookConfig;

pub fn run(config: &DatebookConfig, config_path: &Path, as_toml: bool) -> Result<()> {
    if as_toml {
        print!("{}", toml::to_string_pretty(config)?);
        return Ok(());
    }

    let options = &config.calendar;

    println!("{}", "Paths".bold());
    println!("  Config:     {}", config_path.display());

    println!();
    println!("{}", "Calendar".bold());
    println!("  Time zone:  {}", options.time_zone);
    println!("  Locale:     {}", options.locale);
    println!("  View:       {}", options.initial_view);
    println!("  Theme:      {}", options.theme_system);

    println!();
    println!("{}", "Sources".bold());
    if config.sources.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for source in &config.sources {
        let id = source.id.as_deref().unwrap_or("(unnamed)");
        let location = match &source.kind {
            SourceKindInput::Array { events } => format!("{} inline events", events.len()),
            SourceKindInput::File { path } => path.display().to_string(),
            SourceKindInput::Json { url, .. } | SourceKindInput::Ical { url } => url.clone(),
        };
        println!("  {:<12}{}", id, location.dimmed());
    }

    Ok(())
}
