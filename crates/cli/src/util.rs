use unicode_width::UnicodeWidthStr;

use crate::CliError;

/// Display width of a string. Vietnamese combining marks take no columns.
pub(crate) fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate a string to fit within `width` display columns, adding ".." if truncated.
pub(crate) fn truncate_display(s: &str, width: usize) -> String {
    if display_width(s) <= width {
        return s.to_string();
    }
    if width < 3 {
        return s
            .chars()
            .take_while(|ch| unicode_width::UnicodeWidthChar::width(*ch).unwrap_or(0) <= width)
            .take(1)
            .collect();
    }

    // Walk chars, stop at width - 2 to leave room for ".."
    let budget = width - 2;
    let mut used = 0;
    let mut end_byte = 0;
    for (i, ch) in s.char_indices() {
        let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + cw > budget {
            break;
        }
        used += cw;
        end_byte = i + ch.len_utf8();
    }

    format!("{}..", &s[..end_byte])
}

/// Pad or truncate a string to exactly `width` display columns.
pub(crate) fn pad_right(s: &str, width: usize) -> String {
    let sw = display_width(s);
    if sw > width {
        truncate_display(s, width)
    } else {
        format!("{}{}", s, " ".repeat(width - sw))
    }
}

/// Left-aligned text table. Every column but the last is capped at `max_col`.
pub(crate) fn format_table(headers: &[&str], rows: &[Vec<String>], max_col: usize) -> String {
    let last = headers.len().saturating_sub(1);
    let widths: Vec<usize> = (0..headers.len())
        .map(|c| {
            let widest = rows
                .iter()
                .filter_map(|r| r.get(c))
                .map(|cell| display_width(cell))
                .chain(std::iter::once(display_width(headers[c])))
                .max()
                .unwrap_or(0);
            if c == last { widest } else { widest.min(max_col) }
        })
        .collect();

    let mut out = render_row(headers, &widths);
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push_str(&render_row(&cells, &widths));
    }
    out
}

fn render_row(cells: &[&str], widths: &[usize]) -> String {
    let last = widths.len().saturating_sub(1);
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(c, (cell, w))| if c == last { cell.to_string() } else { pad_right(cell, *w) })
        .collect();
    format!("{}\n", line.join("  ").trim_end())
}

/// Split a `FIELD=VALUE` argument. The value may be empty.
pub(crate) fn parse_assignment(arg: &str) -> Result<(String, String), CliError> {
    match arg.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => {
            Ok((field.trim().to_string(), value.to_string()))
        }
        _ => Err(CliError::args(format!("expected FIELD=VALUE, got {:?}", arg))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_width_vietnamese() {
        assert_eq!(display_width("Toán"), 4);
        assert_eq!(display_width("Ngoại ngữ"), 9);
        assert_eq!(display_width(""), 0);
    }

    #[test]
    fn truncate_cuts() {
        assert_eq!(truncate_display("abcdef", 5), "abc..");
        assert_eq!(truncate_display("Cập nhật", 6), "Cập ..");
        assert_eq!(truncate_display("abc", 3), "abc");
        assert_eq!(truncate_display("abc", 2), "a");
    }

    #[test]
    fn pad_right_cases() {
        assert_eq!(pad_right("Xem", 5), "Xem  ");
        assert_eq!(pad_right("abcde", 5), "abcde");
        assert_eq!(pad_right("abcdef", 5), "abc..");
    }

    #[test]
    fn table_aligns_columns() {
        let table = format_table(
            &["#", "Thao tác", "Chi tiết"],
            &[
                vec!["1".into(), "Xóa".into(), "Xóa thí sinh SBD: 1, Năm: 2019".into()],
                vec!["10".into(), "Cập nhật".into(), "Cập nhật thí sinh".into()],
            ],
            20,
        );
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "#   Thao tác  Chi tiết");
        assert_eq!(lines[1], "1   Xóa       Xóa thí sinh SBD: 1, Năm: 2019");
        assert_eq!(lines[2], "10  Cập nhật  Cập nhật thí sinh");
    }

    #[test]
    fn assignments() {
        assert_eq!(parse_assignment("Toán=9.5").unwrap(), ("Toán".into(), "9.5".into()));
        assert_eq!(parse_assignment("Văn=").unwrap(), ("Văn".into(), String::new()));
        assert!(parse_assignment("Toán").is_err());
        assert!(parse_assignment("=1").is_err());
    }
}
