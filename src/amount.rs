/// Convert locale-formatted monetary text to a numeric value.
///
/// Handles the shapes seen in Brazilian bank and franchise exports:
/// `R$ 1.234,56`, `1234.56`, `(500,00)` (parenthesized negatives), stray
/// currency markers and grouping separators. Returns `None` for empty or
/// unparseable input so callers can tell a parse failure apart from a true
/// zero.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let mut s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let mut negative = false;
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        negative = true;
        s = inner.trim();
    }

    let s = s
        .replace("R$", "")
        .replace('$', "")
        .replace(char::is_whitespace, "");

    // Comma present: '.' is a thousands separator and ',' the decimal mark.
    // Otherwise '.' is already the decimal mark.
    let s = if s.contains(',') {
        s.replace('.', "").replace(',', ".")
    } else {
        s
    };

    let mut cleaned = String::with_capacity(s.len());
    for (i, c) in s.chars().enumerate() {
        if c.is_ascii_digit() || c == '.' || (c == '-' && i == 0) {
            cleaned.push(c);
        }
    }

    let value: f64 = cleaned.parse().ok()?;
    Some(if negative { -value } else { value })
}
