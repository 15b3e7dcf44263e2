//! Console report: the consolidated schedule as a fixed-column table.
//!
//! This is the run's human-facing artifact, printed to stdout rather than
//! logged. Free-text columns are capped so one verbose reason does not blow
//! the table apart; widths otherwise fit the content.

use crate::models::EventRecord;

const BANNER_WIDTH: usize = 80;

struct Column {
    header: &'static str,
    /// Cap for free-text columns; `None` means fit to content.
    max_width: Option<usize>,
    value: fn(&EventRecord) -> &str,
}

const COLUMNS: [Column; 6] = [
    Column { header: "FECHA", max_width: None, value: |e| e.date.as_text() },
    Column { header: "HORA", max_width: None, value: |e| e.time.as_text() },
    Column { header: "QUÉ", max_width: None, value: |e| e.measure_type.as_text() },
    Column { header: "LUGAR", max_width: Some(40), value: |e| e.place.as_text() },
    Column { header: "QUIÉN", max_width: Some(30), value: |e| e.organizer.as_text() },
    Column { header: "MOTIVO", max_width: Some(50), value: |e| e.reason.as_text() },
];

fn display_width(s: &str) -> usize {
    s.chars().count()
}

fn truncate(text: &str, width: usize) -> String {
    if display_width(text) > width {
        let cut: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

fn pad(text: &str, width: usize) -> String {
    let missing = width.saturating_sub(display_width(text));
    format!("{}{}", text, " ".repeat(missing))
}

/// Render the events as an aligned table. Empty input renders the friendly
/// nothing-scheduled line instead.
pub fn render_event_table(events: &[EventRecord]) -> String {
    if events.is_empty() {
        return "✅ No se encontraron eventos programados para hoy en los sitios monitoreados."
            .to_string();
    }

    // Each column is as wide as its widest (possibly capped) cell or header.
    let mut widths: Vec<usize> = COLUMNS.iter().map(|c| display_width(c.header)).collect();
    for event in events {
        for (i, column) in COLUMNS.iter().enumerate() {
            let mut w = display_width((column.value)(event));
            if let Some(cap) = column.max_width {
                w = w.min(cap);
            }
            widths[i] = widths[i].max(w);
        }
    }

    let mut out = String::new();
    let header_line = COLUMNS
        .iter()
        .enumerate()
        .map(|(i, c)| pad(c.header, widths[i]))
        .collect::<Vec<_>>()
        .join(" | ");
    out.push_str(&header_line);
    out.push('\n');
    out.push_str(&"-".repeat(display_width(&header_line)));
    out.push('\n');

    for event in events {
        let row = COLUMNS
            .iter()
            .enumerate()
            .map(|(i, column)| {
                let content = (column.value)(event);
                let cell = match column.max_width {
                    Some(_) => truncate(content, widths[i]),
                    None => content.to_string(),
                };
                pad(&cell, widths[i])
            })
            .collect::<Vec<_>>()
            .join(" | ");
        out.push_str(&row);
        out.push('\n');
    }

    out
}

/// Print the run banner and the event table to stdout.
pub fn print_report(events: &[EventRecord]) {
    println!();
    println!("{}", "=".repeat(BANNER_WIDTH));
    println!("{:^width$}", "FIXTURE DE PROTESTAS COMPLETO", width = BANNER_WIDTH);
    println!("{}", "=".repeat(BANNER_WIDTH));
    println!();
    println!("{}", render_event_table(events));
}
