//! On-disk manifest encoding
//!
//! Both forms are JSON objects with one entry per line:
//!
//! ```text
//! {                                   {
//!   "/a.txt": "<digest>",               "/a.txt": "<digest>",
//!   "/b.txt": "<digest>"                "/b.txt": "<digest>",
//! }
//!        sealed                              append log
//! ```
//!
//! The sealed form is strict JSON. The append log is the opening brace followed
//! by comma-terminated entry lines and no closing brace, so appending an entry
//! never touches earlier bytes. A log may also end with a lone `}`.

use indexmap::IndexMap;

use super::{Manifest, ManifestEntry};

pub(super) const LOG_HEADER: &str = "{";

/// Serialized line for one entry in the append log.
pub(super) fn entry_line(entry: &ManifestEntry) -> serde_json::Result<String> {
    Ok(format!(
        "  {}: {},",
        serde_json::to_string(&entry.path)?,
        serde_json::to_string(&entry.digest)?
    ))
}

pub(super) fn encode_sealed(manifest: &Manifest) -> serde_json::Result<String> {
    let mut out = serde_json::to_string_pretty(manifest)?;
    out.push('\n');
    Ok(out)
}

pub(super) fn encode_log(manifest: &Manifest) -> serde_json::Result<String> {
    let mut out = String::from(LOG_HEADER);
    out.push('\n');
    for (path, digest) in manifest.iter() {
        out.push_str(&entry_line(&ManifestEntry::new(path, digest))?);
        out.push('\n');
    }
    Ok(out)
}

/// Result of parsing manifest text.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum Parsed {
    /// Strict JSON document
    Sealed(Manifest),
    /// Append log; `torn_tail` is a trailing line that never finished writing
    Log {
        manifest: Manifest,
        torn_tail: Option<String>,
    },
}

/// Parse either form, recovering from a torn final line.
///
/// Fails only for damage that cannot come from an interrupted append: a
/// missing opening brace or a malformed line before the last one.
pub(super) fn parse(content: &str) -> Result<Parsed, String> {
    if content.trim().is_empty() {
        return Ok(Parsed::Log {
            manifest: Manifest::new(),
            torn_tail: None,
        });
    }

    if let Ok(manifest) = serde_json::from_str::<Manifest>(content) {
        return Ok(Parsed::Sealed(manifest));
    }

    parse_log(content)
}

fn parse_log(content: &str) -> Result<Parsed, String> {
    let mut lines = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    match lines.next() {
        Some((_, first)) if first.trim() == LOG_HEADER => {}
        Some((n, _)) => return Err(format!("line {}: expected opening brace", n + 1)),
        None => return Err("manifest is empty".to_string()),
    }

    let body: Vec<(usize, &str)> = lines.collect();
    let mut manifest = Manifest::new();
    let mut torn_tail = None;

    for (i, (n, raw)) in body.iter().enumerate() {
        let is_last = i + 1 == body.len();
        let line = raw.trim();

        if is_last && line == "}" {
            break;
        }

        match parse_entry_line(line) {
            Some(entry) => {
                manifest.insert(entry);
            }
            None if is_last => torn_tail = Some((*raw).to_string()),
            None => return Err(format!("line {}: malformed entry {:?}", n + 1, line)),
        }
    }

    Ok(Parsed::Log {
        manifest,
        torn_tail,
    })
}

/// A complete log line is exactly one `"key": "digest"` pair followed by a comma.
fn parse_entry_line(line: &str) -> Option<ManifestEntry> {
    let body = line.strip_suffix(',')?;
    let pair: IndexMap<String, String> = serde_json::from_str(&format!("{{{body}}}")).ok()?;
    if pair.len() != 1 {
        return None;
    }
    let (path, digest) = pair.into_iter().next()?;
    Some(ManifestEntry::new(path, &digest))
}
