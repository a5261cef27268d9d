//! A1-style cell and range addressing.

/// Column letters for a 1-based column index: 1 → `A`, 27 → `AA`.
pub fn column_letter(index: usize) -> String {
    let mut index = index.max(1);
    let mut letters = Vec::new();
    while index > 0 {
        let remainder = (index - 1) % 26;
        letters.push(char::from(b'A' + remainder as u8));
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Sheet prefix, quoted when the title is not a plain identifier.
pub fn sheet_prefix(sheet: &str) -> String {
    let plain = !sheet.is_empty()
        && sheet
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if plain {
        format!("{sheet}!")
    } else {
        format!("'{}'!", sheet.replace('\'', "''"))
    }
}

/// `Sheet!C5`
pub fn cell(sheet: &str, column: usize, row: u32) -> String {
    format!("{}{}{row}", sheet_prefix(sheet), column_letter(column))
}

/// `Sheet!A3:C40`
pub fn range(sheet: &str, from: (usize, u32), to: (usize, u32)) -> String {
    format!("{}{}", sheet_prefix(sheet), local_range(from, to))
}

/// `C5:C7`, without a sheet prefix, as used inside formulas.
pub fn local_range(from: (usize, u32), to: (usize, u32)) -> String {
    format!(
        "{}{}:{}{}",
        column_letter(from.0),
        from.1,
        column_letter(to.0),
        to.1
    )
}

/// Whole-column range such as `Config!A:B`.
pub fn columns(sheet: &str, first: usize, last: usize) -> String {
    format!(
        "{}{}:{}",
        sheet_prefix(sheet),
        column_letter(first),
        column_letter(last)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(1), "A");
        assert_eq!(column_letter(3), "C");
        assert_eq!(column_letter(26), "Z");
        assert_eq!(column_letter(27), "AA");
        assert_eq!(column_letter(52), "AZ");
        assert_eq!(column_letter(703), "AAA");
    }

    #[test]
    fn addresses() {
        assert_eq!(cell("Monitor", 3, 2), "Monitor!C2");
        assert_eq!(range("Monitor", (1, 3), (3, 40)), "Monitor!A3:C40");
        assert_eq!(local_range((4, 5), (4, 7)), "D5:D7");
        assert_eq!(columns("Config", 1, 2), "Config!A:B");
    }

    #[test]
    fn quotes_titles_with_spaces() {
        assert_eq!(cell("Name list 1", 1, 1), "'Name list 1'!A1");
        assert_eq!(sheet_prefix("Bob's"), "'Bob''s'!");
    }
}
