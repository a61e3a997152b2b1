use anyhow::Result;
use datebook_core::EventEngine;
use datebook_core::date_range::OpenDateRange;
use datebook_core::duration::TimeUnit;
use datebook_core::env::RangeFormatOptions;
use datebook_core::format::create_formatter;
use owo_colors::OwoColorize;
use serde_json::json;

use crate::render::{Render, render_range};

pub fn run(engine: &EventEngine, as_json: bool) -> Result<()> {
    let state = engine.profile();
    let profile = &state.profile;
    let navigation = engine.navigation()?;
    let env = engine.env();

    if as_json {
        let out = json!({
            "viewType": state.view_type,
            "title": title(engine),
            "profile": profile,
            "navigation": navigation,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("{} {}", title(engine).bold(), state.view_type.dimmed());
    println!("  current   {}", render_range(env, &profile.current_range));
    match &profile.active_range {
        Some(range) => println!("  active    {}", render_range(env, range)),
        None => println!("  active    {}", "(none)".red()),
    }
    println!("  render    {}", render_range(env, &profile.render_range));
    println!("  valid     {}", render_open_range(engine, &profile.valid_range));
    println!("  unit      {}", profile.current_range_unit);
    println!("  {}", navigation.render());

    Ok(())
}

/// The toolbar title: the current range formatted for its unit.
fn title(engine: &EventEngine) -> String {
    let state = engine.profile();
    let range = &state.profile.current_range;
    let command = match state.profile.current_range_unit {
        TimeUnit::Year => "YYYY",
        TimeUnit::Month => "MMMM YYYY",
        _ => "{MMM {D}}, YYYY",
    };
    engine.env().format_range(
        range.start,
        range.end,
        create_formatter(command).as_ref(),
        &RangeFormatOptions {
            is_end_exclusive: true,
            ..Default::default()
        },
    )
}

fn render_open_range(engine: &EventEngine, range: &OpenDateRange) -> String {
    let env = engine.env();
    let side = |m: Option<datebook_core::Marker>| match m {
        Some(m) => env.format_iso_date(m),
        None => "…".to_string(),
    };
    if range.is_unbounded() {
        "unbounded".dimmed().to_string()
    } else {
        format!("{} – {}", side(range.start), side(range.end))
    }
}
