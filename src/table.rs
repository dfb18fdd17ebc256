use std::fmt::Write as _;

use crate::data::parse_number;

/// Renders rows as an aligned text table. Columns whose every non-empty
/// cell is numeric are right-aligned.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths = headers
        .iter()
        .map(|h| h.chars().count().max(3))
        .collect::<Vec<_>>();
    let mut numeric = vec![true; column_count];
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            let cell = sanitize(cell);
            widths[idx] = widths[idx].max(cell.chars().count());
            if !cell.is_empty() && parse_number(cell.trim_end_matches('%')).is_none() {
                numeric[idx] = false;
            }
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths, &vec![false; column_count]));
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&rule, &widths, &numeric));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths, &numeric));
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn format_row(values: &[String], widths: &[usize], right_align: &[bool]) -> String {
    let line = widths
        .iter()
        .enumerate()
        .map(|(idx, width)| {
            let cell = values.get(idx).map(|v| sanitize(v)).unwrap_or_default();
            if right_align[idx] {
                format!("{cell:>width$}")
            } else {
                format!("{cell:<width$}")
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn sanitize(value: &str) -> String {
    value.replace(['\n', '\r', '\t'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn numeric_columns_are_right_aligned() {
        let headers = strings(&["name", "count", "percent"]);
        let rows = vec![
            strings(&["California", "12", "60.00%"]),
            strings(&["Ohio", "8", "40.00%"]),
        ];
        let rendered = render_table(&headers, &rows);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "name        count  percent");
        assert_eq!(lines[1], "----------  -----  -------");
        assert_eq!(lines[2], "California     12   60.00%");
        assert_eq!(lines[3], "Ohio            8   40.00%");
    }

    #[test]
    fn control_characters_are_flattened_and_short_rows_padded() {
        let headers = strings(&["a", "b"]);
        let rows = vec![strings(&["x\ty"])];
        let rendered = render_table(&headers, &rows);
        assert_eq!(rendered.lines().nth(2), Some("x y"));
    }
}
