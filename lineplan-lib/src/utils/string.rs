/// Normalize header text so that cosmetic differences don't hide a column.
///
/// Control characters (line breaks typed with Alt+Enter, tabs) become spaces,
/// runs of whitespace collapse to a single space, and the result is trimmed.
pub fn normalize_string(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}
