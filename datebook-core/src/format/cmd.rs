//! Command-string formatter (`"MMMM D, YYYY"`).
//!
//! Text in `[...]` is copied literally. A `{...}` group marks the part of the
//! command that differs between the ends of a range; groups nest.

use super::{DateFormatter, ZonedMarker};
use crate::env::{DateEnv, format_offset};

const TOKENS: [&str; 26] = [
    "YYYY", "YY", "MMMM", "MMM", "MM", "M", "DD", "D", "dddd", "ddd", "d", "HH", "H", "hh", "h",
    "mm", "m", "ss", "s", "SSS", "A", "a", "ZZ", "Z", "ww", "w",
];

#[derive(Debug, Clone)]
pub struct CommandFormatter {
    cmd: String,
    parts: CmdParts,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CmdParts {
    head: String,
    middle: Option<Box<CmdParts>>,
    tail: String,
    whole: String,
}

impl CmdParts {
    fn parse(cmd: &str) -> Self {
        if let (Some(open), Some(close)) = (cmd.find('{'), cmd.rfind('}'))
            && open < close
        {
            let middle = CmdParts::parse(&cmd[open + 1..close]);
            let head = cmd[..open].to_string();
            let tail = cmd[close + 1..].to_string();
            let whole = format!("{head}{}{tail}", middle.whole);
            return CmdParts {
                head,
                middle: Some(Box::new(middle)),
                tail,
                whole,
            };
        }
        CmdParts {
            head: String::new(),
            middle: None,
            tail: String::new(),
            whole: cmd.to_string(),
        }
    }
}

impl CommandFormatter {
    pub fn new(cmd: impl Into<String>) -> Self {
        let cmd = cmd.into();
        let parts = CmdParts::parse(&cmd);
        CommandFormatter { cmd, parts }
    }

    pub fn command(&self) -> &str {
        &self.cmd
    }
}

impl DateFormatter for CommandFormatter {
    fn format(&self, date: &ZonedMarker, env: &DateEnv) -> String {
        render(&self.parts.whole, date, env)
    }

    fn format_range(
        &self,
        start: &ZonedMarker,
        end: &ZonedMarker,
        env: &DateEnv,
        separator: &str,
    ) -> String {
        format_parts_range(&self.parts, start, end, env, separator)
    }
}

fn format_parts_range(
    parts: &CmdParts,
    start: &ZonedMarker,
    end: &ZonedMarker,
    env: &DateEnv,
    separator: &str,
) -> String {
    if let Some(middle) = &parts.middle {
        let start_head = render(&parts.head, start, env);
        let start_tail = render(&parts.tail, start, env);
        if start_head == render(&parts.head, end, env) && start_tail == render(&parts.tail, end, env)
        {
            let middle = format_parts_range(middle, start, end, env, separator);
            return format!("{start_head}{middle}{start_tail}");
        }
    }
    let start_whole = render(&parts.whole, start, env);
    let end_whole = render(&parts.whole, end, env);
    if start_whole == end_whole {
        start_whole
    } else {
        format!("{start_whole}{separator}{end_whole}")
    }
}

fn render(cmd: &str, date: &ZonedMarker, env: &DateEnv) -> String {
    let mut out = String::new();
    let mut rest = cmd;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('[') {
            match after.find(']') {
                Some(end) => {
                    out.push_str(&after[..end]);
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(after);
                    rest = "";
                }
            }
            continue;
        }
        if let Some(token) = TOKENS.iter().find(|t| rest.starts_with(**t)) {
            out.push_str(&token_value(token, date, env));
            rest = &rest[token.len()..];
            continue;
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }
    out
}

fn token_value(token: &str, date: &ZonedMarker, env: &DateEnv) -> String {
    let f = env.calendar().marker_to_array(date.marker);
    let locale = env.locale();
    let weekday = date.marker.weekday() as usize;
    let hour12 = match f.hour % 12 {
        0 => 12,
        h => h,
    };
    match token {
        "YYYY" => format!("{:04}", f.year),
        "YY" => format!("{:02}", f.year.rem_euclid(100)),
        "MMMM" => locale.month_name(f.month, false).to_string(),
        "MMM" => locale.month_name(f.month, true).to_string(),
        "MM" => format!("{:02}", f.month),
        "M" => f.month.to_string(),
        "DD" => format!("{:02}", f.day),
        "D" => f.day.to_string(),
        "dddd" => locale.weekday_names[weekday].to_string(),
        "ddd" => locale.weekday_names_short[weekday].to_string(),
        "d" => weekday.to_string(),
        "HH" => format!("{:02}", f.hour),
        "H" => f.hour.to_string(),
        "hh" => format!("{hour12:02}"),
        "h" => hour12.to_string(),
        "mm" => format!("{:02}", f.minute),
        "m" => f.minute.to_string(),
        "ss" => format!("{:02}", f.second),
        "s" => f.second.to_string(),
        "SSS" => format!("{:03}", f.millisecond),
        "A" => locale.meridiem[usize::from(f.hour >= 12)].to_string(),
        "a" => locale.meridiem[usize::from(f.hour >= 12)].to_lowercase(),
        "Z" => date
            .time_zone_offset
            .map(|m| format_offset(m, false))
            .unwrap_or_default(),
        "ZZ" => date
            .time_zone_offset
            .map(|m| format_offset(m, true))
            .unwrap_or_default(),
        "ww" => format!("{:02}", env.compute_week_number(date.marker)),
        "w" => env.compute_week_number(date.marker).to_string(),
        _ => token.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{DateInput, RangeFormatOptions};
    use crate::marker::Marker;

    fn mk(env: &DateEnv, s: &str) -> Marker {
        env.create_marker(&DateInput::from(s)).unwrap()
    }

    #[test]
    fn test_tokens_and_literals() {
        let env = DateEnv::utc();
        let f = CommandFormatter::new("dddd, MMMM D YYYY [at] h:mma");
        let m = mk(&env, "2024-01-05T21:07:00");
        assert_eq!(env.format(m, &f, None), "Friday, January 5 2024 at 9:07pm");

        let iso = CommandFormatter::new("YYYY-MM-DD[T]HH:mm:ss.SSSZ");
        assert_eq!(
            env.format(m.add_ms(42), &iso, Some(-300)),
            "2024-01-05T21:07:00.042-05:00"
        );
    }

    #[test]
    fn test_nested_range_groups() {
        let env = DateEnv::utc();
        let f = CommandFormatter::new("{MMMM {D}}, YYYY");
        let range = |a: &str, b: &str| {
            env.format_range(mk(&env, a), mk(&env, b), &f, &RangeFormatOptions::default())
        };
        assert_eq!(range("2024-01-05", "2024-01-09"), "January 5 – 9, 2024");
        assert_eq!(range("2024-01-30", "2024-02-02"), "January 30 – February 2, 2024");
        assert_eq!(
            range("2023-12-30", "2024-01-02"),
            "December 30, 2023 – January 2, 2024"
        );
        assert_eq!(range("2024-01-05", "2024-01-05T08:00"), "January 5, 2024");
    }

    #[test]
    fn test_plain_command_range() {
        let env = DateEnv::utc();
        let f = CommandFormatter::new("MMM D");
        let text = env.format_range(
            mk(&env, "2024-01-05"),
            mk(&env, "2024-01-09"),
            &f,
            &RangeFormatOptions {
                separator: Some(" to ".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(text, "Jan 5 to Jan 9");
        assert_eq!(f.command(), "MMM D");
    }
}
