use serde::Serialize;
use tracing::warn;

/// One `config <section> … end` block located in the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block<'a> {
    /// Section name as written after the `config` keyword.
    pub section: &'a str,
    /// Text between the opening line and the matching `end` line.
    pub body: &'a str,
}

/// One `edit <id> … next` entry inside a table block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry<'a> {
    /// Identifier following the `edit` keyword, surrounding quotes stripped.
    pub id: &'a str,
    /// Text between the `edit` line and the matching `next` line.
    pub body: &'a str,
}

/// Return every top-level occurrence of `config <section>` in the text.
///
/// The scan is line-oriented: a line whose first token is `config` opens a
/// block, a bare `end` closes the innermost one. While a matching block is
/// being consumed, nested `config … end` pairs of any name only adjust the
/// depth, so a block is delimited by its own `end` even when the same
/// keywords recur inside it. An occurrence that starts while another
/// occurrence of the same section is still open is interior and is not
/// returned on its own.
///
/// A block still open at end of input is dropped with a diagnostic; earlier
/// complete blocks are unaffected.
pub fn blocks<'a>(text: &'a str, section: &str) -> Vec<Block<'a>> {
    let mut found = Vec::new();
    let mut open: Option<(&'a str, usize)> = None;
    let mut depth = 0usize;

    let mut offset = 0usize;
    for raw in text.split_inclusive('\n') {
        let start = offset;
        offset += raw.len();
        let line = raw.trim();

        match open {
            None => {
                if let Some(rest) = keyword_rest(line, "config") {
                    if rest == section {
                        open = Some((rest, start + raw.len()));
                        depth = 1;
                    }
                }
            }
            Some((name, body_start)) => {
                if keyword_rest(line, "config").is_some() {
                    depth += 1;
                } else if line == "end" {
                    depth -= 1;
                    if depth == 0 {
                        found.push(Block {
                            section: name,
                            body: &text[body_start..start],
                        });
                        open = None;
                    }
                }
            }
        }
    }

    if let Some((name, _)) = open {
        warn!(section = name, "unterminated config block dropped");
    }

    found
}

/// Split a block body into its `edit … next` entries.
///
/// Entries may contain nested `config … end` sub-blocks; while one is open,
/// `edit`, `next`, and `end` lines belong to the sub-block and do not affect
/// the outer entry. An entry with no terminating `next` (including one cut
/// off by a following `edit` at the same level) is dropped with a
/// diagnostic.
pub fn entries(body: &str) -> Vec<Entry<'_>> {
    let mut found = Vec::new();
    let mut open: Option<(&str, usize)> = None;
    let mut depth = 0usize;

    let mut offset = 0usize;
    for raw in body.split_inclusive('\n') {
        let start = offset;
        offset += raw.len();
        let line = raw.trim();

        if keyword_rest(line, "config").is_some() {
            if open.is_some() {
                depth += 1;
            }
            continue;
        }
        if line == "end" {
            if depth > 0 {
                depth -= 1;
            }
            continue;
        }
        if depth > 0 {
            continue;
        }

        if let Some(rest) = keyword_rest(line, "edit") {
            if let Some((id, _)) = open.take() {
                warn!(entry = id, "entry without next dropped");
            }
            open = Some((unquote(rest), start + raw.len()));
        } else if line == "next" {
            if let Some((id, body_start)) = open.take() {
                found.push(Entry {
                    id,
                    body: &body[body_start..start],
                });
            }
        }
    }

    if let Some((id, _)) = open {
        warn!(entry = id, "unterminated entry dropped");
    }

    found
}

/// If the line starts with the given keyword, return the rest of the line.
///
/// The keyword must be followed by whitespace or end-of-line, so `config`
/// does not match `configure`. The remainder comes back trimmed.
pub fn keyword_rest<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(keyword)?;
    if rest.is_empty() {
        return Some("");
    }
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    Some(rest.trim())
}

fn unquote(raw: &str) -> &str {
    raw.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw)
}
