//! Text rendering of presented rows

use itertools::Itertools;
use tabled::builder::Builder;
use tabled::settings::style::HorizontalLine;
use tabled::settings::themes::Theme;
use tabled::settings::Style;

use super::ordering::TableEntry;
use crate::lens::utils::OutputFormat;

fn build_table(headers: &[&str], rows: &[&Vec<String>]) -> tabled::Table {
    let mut builder = Builder::default();
    builder.push_record(headers.iter().map(|h| h.to_string()));
    for row in rows {
        builder.push_record(row.iter().cloned());
    }
    builder.build()
}

/// Table rows (header included) that a group rule is drawn above.
///
/// A separator following `k` data rows puts a rule above table row `k + 1`.
fn group_rule_rows(entries: &[TableEntry<Vec<String>>]) -> Vec<usize> {
    let mut rows = vec![];
    let mut seen = 0;
    for entry in entries {
        match entry {
            TableEntry::Row(_) => seen += 1,
            TableEntry::Separator => rows.push(seen + 1),
        }
    }
    rows
}

/// Modern style with the header rule plus one rule per group boundary
fn grouped_modern_theme(rule_rows: &[usize]) -> Theme {
    let rule = HorizontalLine::inherit(Style::modern());
    let mut theme = Theme::from_style(Style::modern());
    theme.remove_horizontal_lines();
    theme.insert_horizontal_line(1, rule);
    for row in rule_rows {
        theme.insert_horizontal_line(*row, rule);
    }
    theme
}

/// Render headers and entries as a table, markdown or PSV.
///
/// Separators are honoured only where [`OutputFormat::shows_groups`] says so.
/// JSON formats are handled on typed rows by the lens and are rendered here as
/// a plain table.
pub fn render_rows(
    headers: &[&str],
    entries: &[TableEntry<Vec<String>>],
    format: OutputFormat,
) -> String {
    let rows: Vec<&Vec<String>> = entries.iter().filter_map(TableEntry::row).collect();
    let groups = format.shows_groups();

    match format {
        OutputFormat::Markdown => {
            let mut table = build_table(headers, &rows);
            table.with(Style::markdown());
            table.to_string()
        }
        OutputFormat::Psv => {
            let mut lines = vec![headers.join("|")];
            for entry in entries {
                match entry {
                    TableEntry::Row(row) => {
                        lines.push(row.iter().map(|c| c.replace('\n', ",")).join("|"))
                    }
                    TableEntry::Separator if groups => lines.push(String::new()),
                    TableEntry::Separator => {}
                }
            }
            lines.join("\n")
        }
        _ => {
            let rule_rows = if groups {
                group_rule_rows(entries)
            } else {
                vec![]
            };
            let mut table = build_table(headers, &rows);
            table.with(grouped_modern_theme(&rule_rows));
            table.to_string()
        }
    }
}
