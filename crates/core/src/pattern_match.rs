//! LIKE pattern matching.
//!
//! Shared by the string-match renderer (which decides whether an operand
//! can be expressed as a LIKE pattern) and by row sources that evaluate
//! rendered fragments in memory, so both sides agree on the semantics.
//!
//! SQL LIKE with two wildcards:
//! - `%` matches zero or more characters
//! - `_` matches exactly one character
//!
//! Matching is **case-sensitive** and operates on Unicode scalar values.

/// The LIKE wildcard characters.
pub const WILDCARDS: [char; 2] = ['%', '_'];

/// SQL LIKE pattern matching.
///
/// ```
/// use weir_core::pattern_match::like;
/// assert!(like("hello", "h%o"));
/// assert!(like("hello", "_ello"));
/// assert!(!like("hello", "world"));
/// ```
pub fn like(value: &str, pattern: &str) -> bool {
    let v: Vec<char> = value.chars().collect();
    let p: Vec<char> = pattern.chars().collect();

    // matched[j]: p[..i] matches v[..j]
    let mut matched = vec![false; v.len() + 1];
    matched[0] = true;

    for &pc in &p {
        let mut next = vec![false; v.len() + 1];
        match pc {
            '%' => {
                let mut seen = false;
                for j in 0..=v.len() {
                    seen |= matched[j];
                    next[j] = seen;
                }
            }
            '_' => {
                for j in 1..=v.len() {
                    next[j] = matched[j - 1];
                }
            }
            ch => {
                for j in 1..=v.len() {
                    next[j] = matched[j - 1] && v[j - 1] == ch;
                }
            }
        }
        matched = next;
    }

    matched[v.len()]
}

/// Returns true if `text` contains a LIKE wildcard.
pub fn has_wildcards(text: &str) -> bool {
    text.contains(WILDCARDS)
}
