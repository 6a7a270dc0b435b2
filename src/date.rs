//! Parsing of the loosely formatted date tokens found on course cards.

/// Calendar date recovered from a card's date text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// Parse the leading calendar date out of a raw card token.
///
/// Tokens on the course site look like `2024/03/10`, often with a range
/// suffix (`2024/03/10 - 2024/03/11`) or a time tacked on; only the leading
/// date is considered and anything after it is ignored. Both `/` and `-`
/// separators are accepted. A token that does not open with four digits
/// followed by a numeric month and day is rejected; callers treat `None`
/// as "cannot confirm membership", not as an error.
pub fn normalize(raw: &str) -> Option<ParsedDate> {
    let token = raw.trim().as_bytes();
    if token.len() < 4 || !token[..4].iter().all(u8::is_ascii_digit) {
        return None;
    }

    // Leading four digits are ASCII, safe to slice.
    let year = std::str::from_utf8(&token[..4]).ok()?.parse::<i32>().ok()?;
    let mut pos = 4;
    let month = separated_number(token, &mut pos)?;
    let day = separated_number(token, &mut pos)?;

    ((1..=12).contains(&month) && (1..=31).contains(&day)).then_some(ParsedDate {
        year,
        month,
        day,
    })
}

/// Consume a `/` or `-` separator followed by one or two digits.
fn separated_number(token: &[u8], pos: &mut usize) -> Option<u32> {
    if !matches!(token.get(*pos), Some(b'/' | b'-')) {
        return None;
    }
    *pos += 1;

    let start = *pos;
    while *pos < token.len() && token[*pos].is_ascii_digit() && *pos - start < 2 {
        *pos += 1;
    }
    if *pos == start {
        return None;
    }
    std::str::from_utf8(&token[start..*pos]).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::{ParsedDate, normalize};

    #[test]
    fn parses_slash_separated_date() {
        assert_eq!(
            normalize("2024/03/10"),
            Some(ParsedDate {
                year: 2024,
                month: 3,
                day: 10
            })
        );
    }

    #[test]
    fn parses_dash_separated_date() {
        assert_eq!(
            normalize("2024-03-10"),
            Some(ParsedDate {
                year: 2024,
                month: 3,
                day: 10
            })
        );
    }

    #[test]
    fn ignores_range_suffix() {
        assert_eq!(
            normalize("2024/03/10 - 2024/03/11"),
            Some(ParsedDate {
                year: 2024,
                month: 3,
                day: 10
            })
        );
    }

    #[test]
    fn ignores_trailing_time() {
        assert_eq!(
            normalize("2024/3/5 09:00"),
            Some(ParsedDate {
                year: 2024,
                month: 3,
                day: 5
            })
        );
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(
            normalize("  2025/12/01  "),
            Some(ParsedDate {
                year: 2025,
                month: 12,
                day: 1
            })
        );
    }

    #[test]
    fn rejects_token_without_leading_year() {
        assert_eq!(normalize("無日期"), None);
        assert_eq!(normalize("3/10/2024"), None);
        assert_eq!(normalize("202"), None);
        assert_eq!(normalize(""), None);
    }

    #[test]
    fn rejects_year_without_month_and_day() {
        assert_eq!(normalize("2024"), None);
        assert_eq!(normalize("2024/"), None);
        assert_eq!(normalize("2024/03"), None);
    }

    #[test]
    fn rejects_out_of_range_month_or_day() {
        assert_eq!(normalize("2024/13/01"), None);
        assert_eq!(normalize("2024/00/10"), None);
        assert_eq!(normalize("2024/03/32"), None);
    }
}
