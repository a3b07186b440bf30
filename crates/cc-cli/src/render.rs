//! Plain-text rendering of the conformance table

use cc_core::{RowState, TableEntry};

const HEADERS: [&str; 6] = ["Name", "Work Item", "Tags", "State", "Last Modified", "Assigned To"];

/// Render rows as an aligned text table, one line per row.
///
/// Blank rows (still loading) render as empty cells.
#[must_use]
pub fn render_table(entries: &[TableEntry], conformance_tag: &str) -> String {
    let rows: Vec<[String; 6]> = entries.iter().map(|e| cells(e, conformance_tag)).collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &HEADERS.map(String::from), &widths);
    for row in &rows {
        push_line(&mut out, row, &widths);
    }
    out
}

fn cells(entry: &TableEntry, conformance_tag: &str) -> [String; 6] {
    let Some(row) = entry.row.as_ref() else {
        return Default::default();
    };
    let mut name = row.measure().name.clone();
    if entry.state() == RowState::Creating {
        name.push_str(" …");
    }
    let tags = row.visible_tags(conformance_tag).join(", ");
    match row.work_item() {
        None => [name, String::new(), tags, String::new(), String::new(), String::new()],
        Some(item) => [
            name,
            item.caption(),
            tags,
            item.state_text().unwrap_or_default(),
            item.changed_date()
                .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
            item.assigned_to().map(|a| a.display_name).unwrap_or_default(),
        ],
    }
}

fn push_line(out: &mut String, cells: &[String; 6], widths: &[usize; 6]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}
