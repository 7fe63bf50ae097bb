//! Canonical form of key names and combos for exclusion matching

/// Canonicalize a key name or `+`-joined combo.
///
/// Tokens are trimmed, lowercased and sorted, so `"Shift + Ctrl+S"` and
/// `"ctrl+shift+s"` both become `"ctrl+s+shift"`.
pub fn normalize(combo: &str) -> String {
    let mut tokens: Vec<String> = combo
        .split('+')
        .map(|token| token.trim().to_lowercase())
        .collect();
    tokens.sort();
    tokens.join("+")
}
