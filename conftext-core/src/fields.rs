//! Readers for `set <key> <value>` statements inside a block or entry body.
//!
//! Keys are matched ASCII case-insensitively. Absent keys are `None`, never
//! an error; callers decide what a missing field means.

/// Scalar lookup for `set <key> <value>`.
///
/// A quoted value (`set alias "branch fw"`) wins over an unquoted match for
/// the same key anywhere in the body; an unquoted value is the first
/// whitespace-delimited token after the key.
pub fn value<'a>(body: &'a str, key: &str) -> Option<&'a str> {
    let mut unquoted: Option<&str> = None;
    for line in body.lines() {
        let Some(rest) = set_statement(line, key) else {
            continue;
        };
        if let Some(inner) = quoted_head(rest) {
            return Some(inner);
        }
        if unquoted.is_none() {
            if let Some((token, _)) = split_token(rest) {
                unquoted = Some(token);
            }
        }
    }
    unquoted
}

/// Scalar lookup parsed as an integer; unparsable values are `None`.
pub fn number(body: &str, key: &str) -> Option<i64> {
    value(body, key)?.parse().ok()
}

/// Whitespace-delimited list with quote-aware tokenization.
///
/// `set member "a" "b c" d` yields `["a", "b c", "d"]`. A present key with a
/// single value yields a one-element vec; an absent key yields `None`.
pub fn list(body: &str, key: &str) -> Option<Vec<String>> {
    for line in body.lines() {
        let Some(rest) = set_statement(line, key) else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        return Some(tokenize(rest));
    }
    None
}

/// Iterate every `set` statement in order as `(key, raw value)` pairs.
pub fn statements(body: &str) -> impl Iterator<Item = (&str, &str)> {
    body.lines().filter_map(|line| {
        let (keyword, rest) = split_token(line)?;
        if !keyword.eq_ignore_ascii_case("set") {
            return None;
        }
        let (key, raw) = split_token(rest)?;
        Some((key, raw))
    })
}

fn set_statement<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let (keyword, rest) = split_token(line)?;
    if !keyword.eq_ignore_ascii_case("set") {
        return None;
    }
    let (found, raw) = split_token(rest)?;
    if !found.eq_ignore_ascii_case(key) {
        return None;
    }
    Some(raw)
}

/// Split off the first whitespace-delimited token, returning it and the
/// trimmed remainder.
fn split_token(s: &str) -> Option<(&str, &str)> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    Some((&s[..end], s[end..].trim_start()))
}

fn quoted_head(rest: &str) -> Option<&str> {
    let after = rest.strip_prefix('"')?;
    let end = after.find('"')?;
    Some(&after[..end])
}

fn tokenize(raw: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut rest = raw.trim();
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('"') {
            match after.find('"') {
                Some(end) => {
                    items.push(after[..end].to_string());
                    rest = after[end + 1..].trim_start();
                }
                None => {
                    items.push(after.to_string());
                    rest = "";
                }
            }
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            items.push(rest[..end].to_string());
            rest = rest[end..].trim_start();
        }
    }
    items
}
