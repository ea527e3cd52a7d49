//! Glob Pattern Module
//!
//! Minimal `*`-wildcard matcher for pattern-based key deletion. Only `*` is
//! special; every other byte matches literally.

// == Glob Match ==
/// Returns true if `text` matches the glob `pattern`.
///
/// `*` matches any run of characters, including the empty run. Patterns with
/// no `*` are exact-equality checks.
///
/// # Examples
/// - `user:*` matches `user:1` and `user:` but not `account:1`
/// - `*:list:*` matches `bill:list:recent`
pub fn glob_match(pattern: &str, text: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == text;
    }

    let segments: Vec<&str> = pattern.split('*').collect();
    let mut remainder = text;

    // First segment must anchor at the start unless the pattern opens with *
    let first = segments[0];
    if !first.is_empty() {
        match remainder.strip_prefix(first) {
            Some(rest) => remainder = rest,
            None => return false,
        }
    }

    // Last segment must anchor at the end unless the pattern closes with *
    let last = segments[segments.len() - 1];
    if !last.is_empty() {
        match remainder.strip_suffix(last) {
            Some(rest) => remainder = rest,
            None => return false,
        }
    }

    // Middle segments must appear in order within what remains
    for segment in &segments[1..segments.len() - 1] {
        if segment.is_empty() {
            continue;
        }
        match remainder.find(segment) {
            Some(pos) => remainder = &remainder[pos + segment.len()..],
            None => return false,
        }
    }

    true
}
