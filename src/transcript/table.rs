//! Box-drawn layout for `console.table`.

use unicode_width::UnicodeWidthStr;

use super::format::format_nested;
use super::value::RenderedValue;
use crate::config::RenderConfig;

const INDEX_HEADER: &str = "(index)";
const VALUES_HEADER: &str = "Values";

/// Lay out tabular data; `None` when the value is not tabular and should be
/// logged normally instead.
pub fn render_table(
    data: &RenderedValue,
    columns: Option<&[String]>,
    config: &RenderConfig,
) -> Option<String> {
    let rows: Vec<(String, &RenderedValue)> = match data {
        RenderedValue::Array { items, .. } => items
            .iter()
            .enumerate()
            .map(|(i, item)| (i.to_string(), item))
            .collect(),
        RenderedValue::Object { entries, .. } => {
            entries.iter().map(|(k, v)| (k.clone(), v)).collect()
        }
        _ => return None,
    };

    let mut headers: Vec<String> = Vec::new();
    let mut has_values = false;
    for (_, row) in &rows {
        match row_cells(row) {
            Some(cells) => {
                for (key, _) in cells {
                    if !headers.contains(&key) {
                        headers.push(key);
                    }
                }
            }
            None => has_values = true,
        }
    }

    if let Some(filter) = columns {
        headers = filter.to_vec();
        has_values = false;
    }

    let mut table: Vec<Vec<String>> = Vec::with_capacity(rows.len() + 1);
    let mut header_row = vec![INDEX_HEADER.to_string()];
    header_row.extend(headers.iter().cloned());
    if has_values {
        header_row.push(VALUES_HEADER.to_string());
    }
    table.push(header_row);

    for (index, row) in &rows {
        let cells = row_cells(row);
        let mut line = vec![index.clone()];
        for header in &headers {
            let cell = cells
                .as_ref()
                .and_then(|cells| cells.iter().find(|(key, _)| key == header))
                .map(|(_, value)| format_nested(value, 0, config))
                .unwrap_or_default();
            line.push(cell);
        }
        if has_values {
            line.push(match cells {
                Some(_) => String::new(),
                None => format_nested(row, 0, config),
            });
        }
        table.push(line);
    }

    Some(draw(&table))
}

fn row_cells(row: &RenderedValue) -> Option<Vec<(String, &RenderedValue)>> {
    match row {
        RenderedValue::Object { entries, .. } => {
            Some(entries.iter().map(|(k, v)| (k.clone(), v)).collect())
        }
        RenderedValue::Array { items, .. } => Some(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
        ),
        _ => None,
    }
}

fn draw(table: &[Vec<String>]) -> String {
    let column_count = table.first().map(Vec::len).unwrap_or(0);
    let widths: Vec<usize> = (0..column_count)
        .map(|col| {
            table
                .iter()
                .map(|row| row.get(col).map(|cell| cell.width()).unwrap_or(0))
                .max()
                .unwrap_or(0)
                + 2
        })
        .collect();

    let rule = |left: &str, mid: &str, right: &str| {
        let segments: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
        format!("{left}{}{right}", segments.join(mid))
    };
    let line = |row: &[String]| {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                let padding = width.saturating_sub(cell.width() + 1);
                format!(" {cell}{}", " ".repeat(padding))
            })
            .collect();
        format!("│{}│", cells.join("│"))
    };

    let mut out = Vec::with_capacity(table.len() + 3);
    out.push(rule("┌", "┬", "┐"));
    if let Some((header, body)) = table.split_first() {
        out.push(line(header));
        out.push(rule("├", "┼", "┤"));
        for row in body {
            out.push(line(row));
        }
    }
    out.push(rule("└", "┴", "┘"));
    out.join("\n")
}
