//! Human-readable labels derived from field names.

/// Turns a field name into a display label.
///
/// `_` and `-` become spaces, a space is inserted at lower→upper camel-case
/// boundaries, runs of whitespace collapse, and the first letter is uppercased.
/// "dateOfBirth" → "Date Of Birth", "full_name" → "Full name".
pub fn humanize(name: &str) -> String {
    let mut spaced = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;

    for c in name.chars() {
        let c = if c == '_' || c == '-' { ' ' } else { c };
        if let Some(p) = prev {
            if c.is_uppercase() && (p.is_lowercase() || p.is_ascii_digit()) {
                spaced.push(' ');
            }
        }
        spaced.push(c);
        prev = Some(c);
    }

    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut chars = collapsed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
