//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits tab-separated lines.

use std::io::{self, IsTerminal, Write};

use owo_colors::{OwoColorize, Style};
use tabled::{Table, Tabled, settings::Style as TableStyle};

use calsync_core::{CalendarEvent, ParticipantStatus, Severity};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Apply `style` when color is enabled.
pub fn paint(text: &str, style: Style, color: bool) -> String {
    if color {
        text.style(style).to_string()
    } else {
        text.to_owned()
    }
}

pub fn severity_style(severity: Severity) -> Style {
    match severity {
        Severity::Success => Style::new().green().bold(),
        Severity::Error => Style::new().red().bold(),
        Severity::Info => Style::new().cyan(),
        Severity::Warning => Style::new().yellow(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `line_fn` on each item to emit one line per item
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    line_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&line_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table and plain rendering use `text_fn`, which returns a pre-formatted
/// string.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    text_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table | OutputFormat::Plain => Ok(text_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
    let _ = stdout.flush();
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(TableStyle::rounded()).to_string()
}

pub fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let out = if compact {
        serde_json::to_string(data)?
    } else {
        serde_json::to_string_pretty(data)?
    };
    Ok(out)
}

pub fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    Ok(serde_yaml::to_string(data)?)
}

// ── Event rows ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct EventRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Start")]
    pub start: String,
    #[tabled(rename = "End")]
    pub end: String,
    #[tabled(rename = "Location")]
    pub location: String,
    #[tabled(rename = "Accepted")]
    pub accepted: String,
}

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn event_row(event: &CalendarEvent) -> EventRow {
    EventRow {
        id: event.id.to_string(),
        title: event.title.clone(),
        start: event.start.format(TIME_FORMAT).to_string(),
        end: event.end.format(TIME_FORMAT).to_string(),
        location: event.location.clone().unwrap_or_default(),
        accepted: format!(
            "{}/{}",
            event.count_status(ParticipantStatus::Accepted),
            event.participants.len()
        ),
    }
}

/// `id<TAB>start<TAB>title`, for scripting.
pub fn event_line(event: &CalendarEvent) -> String {
    format!(
        "{}\t{}\t{}",
        event.id,
        event.start.format(TIME_FORMAT),
        event.title
    )
}

/// Sort events by start time for display.
pub fn by_start(events: &[CalendarEvent]) -> Vec<CalendarEvent> {
    let mut sorted = events.to_vec();
    sorted.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
    sorted
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use calsync_core::EntityId;

    use super::*;

    fn event(id: &str, title: &str, hour: u32) -> CalendarEvent {
        CalendarEvent {
            id: EntityId::from(id),
            title: title.into(),
            description: None,
            start: Utc.with_ymd_and_hms(2026, 3, 2, hour, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 3, 2, hour + 1, 0, 0).unwrap(),
            location: Some("Room 1".into()),
            creator_id: EntityId::from("u1"),
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
            updated_at: None,
            participants: Vec::new(),
        }
    }

    #[test]
    fn plain_lines_are_tab_separated() {
        let out = render_list(
            OutputFormat::Plain,
            &[event("e1", "Standup", 9), event("e2", "Review", 14)],
            event_row,
            event_line,
        )
        .unwrap();
        assert_eq!(
            out,
            "e1\t2026-03-02 09:00\tStandup\ne2\t2026-03-02 14:00\tReview"
        );
    }

    #[test]
    fn table_has_headers_and_rows() {
        let out = render_list(
            OutputFormat::Table,
            &[event("e1", "Standup", 9)],
            event_row,
            event_line,
        )
        .unwrap();
        assert!(out.contains("Title"));
        assert!(out.contains("Standup"));
        assert!(out.contains("0/0"));
    }

    #[test]
    fn compact_json_is_one_line() {
        let out = render_single(OutputFormat::JsonCompact, &event("e1", "Standup", 9), |_| {
            String::new()
        })
        .unwrap();
        assert!(!out.contains('\n'));
        assert!(out.contains("\"title\":\"Standup\""));
    }

    #[test]
    fn sorted_by_start_then_id() {
        let sorted = by_start(&[
            event("b", "Later", 15),
            event("c", "Early", 8),
            event("a", "Also later", 15),
        ]);
        let ids: Vec<String> = sorted.iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn paint_is_a_no_op_without_color() {
        assert_eq!(paint("+", Style::new().green(), false), "+");
        assert_ne!(paint("+", Style::new().green(), true), "+");
    }
}
