//! core/tags/util.rs

use super::super::stream::TagValue;

/// Split a "position of total" value such as "3" or "3/12".
pub(crate) fn position_of(s: &str) -> (Option<u32>, Option<u32>) {
    let mut parts = s.trim().splitn(2, '/');
    let number = |p: Option<&str>| p.and_then(|p| p.trim().parse::<u32>().ok());
    let position = number(parts.next());
    (position, number(parts.next()))
}

/// Yes/no style values ("1", "true", "yes", "y" and their negatives).
pub(crate) fn flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Some(true),
        "0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Interpret text stored under a numeric tag: the leading position of a
/// "3/12" pair, else a flag as 0 or 1.
pub(crate) fn numeric_text(s: &str) -> Option<TagValue> {
    position_of(s)
        .0
        .map(|n| TagValue::Int(i64::from(n)))
        .or_else(|| flag(s).map(|b| TagValue::Int(i64::from(b))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions() {
        assert_eq!(position_of("3"), (Some(3), None));
        assert_eq!(position_of(" 3 / 12 "), (Some(3), Some(12)));
        assert_eq!(position_of("/12"), (None, Some(12)));
        assert_eq!(position_of(""), (None, None));
    }

    #[test]
    fn numeric_text_falls_back_to_flags() {
        assert_eq!(numeric_text("7/9"), Some(TagValue::Int(7)));
        assert_eq!(numeric_text("Yes"), Some(TagValue::Int(1)));
        assert_eq!(numeric_text("maybe"), None);
    }
}
