//! ISBN recognition for identifiers pulled out of book metadata.

const PREFIXES: [&str; 3] = ["urn:isbn:", "isbn:", "isbn"];

/// Normalize an identifier to a bare ISBN-10 or ISBN-13.
///
/// Accepts `urn:isbn:` and `ISBN` prefixes, hyphens, and spaces. Returns
/// `None` unless the remaining characters form an ISBN with a valid check
/// digit.
pub(crate) fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    let rest = PREFIXES
        .iter()
        .find_map(|prefix| lower.starts_with(prefix).then(|| &trimmed[prefix.len()..]))
        .unwrap_or(trimmed);
    let compact: String = rest
        .chars()
        .filter(|c| !matches!(c, '-' | ' '))
        .map(|c| c.to_ascii_uppercase())
        .collect();
    match compact.len() {
        10 if is_valid_isbn10(&compact) => Some(compact),
        13 if is_valid_isbn13(&compact) => Some(compact),
        _ => None,
    }
}

fn is_valid_isbn10(isbn: &str) -> bool {
    let mut sum = 0;
    for (i, c) in isbn.chars().enumerate() {
        let value = match c {
            'X' if i == 9 => 10,
            c => match c.to_digit(10) {
                Some(d) => d,
                None => return false,
            },
        };
        sum += value * (10 - i as u32);
    }
    sum % 11 == 0
}

fn is_valid_isbn13(isbn: &str) -> bool {
    let Some(digits) = isbn.chars().map(|c| c.to_digit(10)).collect::<Option<Vec<_>>>() else {
        return false;
    };
    let sum: u32 = digits.iter().enumerate().map(|(i, d)| if i % 2 == 0 { *d } else { d * 3 }).sum();
    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("9780140449136", Some("9780140449136"))]
    #[case("978-0-14-044913-6", Some("9780140449136"))]
    #[case("urn:isbn:978-0-14-044913-6", Some("9780140449136"))]
    #[case("ISBN 0-306-40615-2", Some("0306406152"))]
    #[case("isbn:080442957x", Some("080442957X"))]
    #[case("978-0-14-044913-7", None)]
    #[case("0-306-40615-3", None)]
    #[case("urn:uuid:9a3c6c1e-0000-4000-8000-000000000000", None)]
    #[case("X306406152", None)]
    #[case("", None)]
    fn test_normalize(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalize(raw).as_deref(), expected);
    }
}
