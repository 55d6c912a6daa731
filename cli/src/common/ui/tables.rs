//! Column-aligned plain-text tables.

/// Spaces between columns.
const GAP: usize = 3;

/// Renders `rows` under `headers`, each column padded to its widest cell.
/// The last column is never padded.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    push_row(&mut out, &header_cells, &widths);
    for row in rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let last = cells.len().min(widths.len()).saturating_sub(1);
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate().take(widths.len()) {
        line.push_str(cell);
        if i < last {
            let pad = widths[i] - cell.chars().count() + GAP;
            line.extend(std::iter::repeat(' ').take(pad));
        }
    }
    out.push_str(line.trim_end());
    out.push('\n');
}
