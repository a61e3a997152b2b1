use anyhow::Result;
use datebook_core::DateEnv;
use datebook_core::env::{DateInput, RangeFormatOptions};
use datebook_core::format::{FormatterInput, create_formatter};

/// Format a date, or a range when `end` is given. `format` is a command
/// string like `"{MMMM {D}}, YYYY"` or a JSON object of native options.
pub fn run(
    env: &DateEnv,
    start: &str,
    end: Option<&str>,
    format: &str,
    separator: Option<String>,
    end_exclusive: bool,
) -> Result<()> {
    println!("{}", render(env, start, end, format, separator, end_exclusive)?);
    Ok(())
}

fn render(
    env: &DateEnv,
    start: &str,
    end: Option<&str>,
    format: &str,
    separator: Option<String>,
    end_exclusive: bool,
) -> Result<String> {
    let formatter = create_formatter(FormatterInput::from_text(format));
    let start = env.create_marker_meta(&DateInput::from(start))?;
    let Some(end) = end else {
        return Ok(env.format(start.marker, formatter.as_ref(), start.forced_tzo));
    };
    let end = env.create_marker_meta(&DateInput::from(end))?;
    Ok(env.format_range(
        start.marker,
        end.marker,
        formatter.as_ref(),
        &RangeFormatOptions {
            forced_start_tzo: start.forced_tzo,
            forced_end_tzo: end.forced_tzo,
            is_end_exclusive: end_exclusive,
            separator,
        },
    ))
}
