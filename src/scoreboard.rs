//! Scoreboard snapshot parsing
//!
//! The scoreboard is a block of text with one tree per line:
//!
//! ```text
//! `#1` - `trukipouss` - 101.50ft 📏
//! `#2` - `oak` - 98.25ft
//! ```
//!
//! Parsing is all-or-nothing: one malformed line aborts the whole batch so
//! a half-read scoreboard never reaches the store.

use crate::error::ParseError;

/// One parsed scoreboard line
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreboardEntry {
    pub rank: u32,
    pub name: String,
    pub height: f64,
}

/// Recognized unit suffixes. The middle two are the renderings a bad
/// re-encode makes of the ruler emoji: its UTF-8 bytes read back as
/// cp1252 ("ðŸ“") and the replacement-character mangling ("ï¿½ï¿½").
const UNIT_SUFFIXES: &[&str] = &["ft 📏", "ft ðŸ“", "ft ï¿½ï¿½", "ft"];

/// Parse a raw scoreboard snapshot into entries for the tracked trees.
///
/// Every non-empty line must match the grammar
/// `` `#<rank>` - `<name>` - <height><unit> `` or the whole parse fails
/// with the offending line. The tracked-name filter is applied after
/// structural parsing, so an untracked malformed line still aborts.
/// Output ordering follows input line order.
pub fn parse_scoreboard(
    text: &str,
    tracked: &[String],
) -> Result<Vec<ScoreboardEntry>, ParseError> {
    let mut entries = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = idx + 1;

        let (rank, name, height_raw) =
            split_line(line).ok_or_else(|| ParseError::InvalidLine {
                line_no,
                content: line.to_string(),
            })?;

        let height = parse_height(height_raw).ok_or_else(|| ParseError::InvalidHeight {
            line_no,
            content: line.to_string(),
        })?;

        if tracked.iter().any(|t| t == &name) {
            entries.push(ScoreboardEntry { rank, name, height });
        }
    }

    Ok(entries)
}

/// Split one line into (rank, name, raw height text).
///
/// The name is matched greedily up to the last `` ` - `` separator so
/// names containing backticks survive.
fn split_line(line: &str) -> Option<(u32, String, &str)> {
    let rest = line.strip_prefix("`#")?;

    let tick = rest.find('`')?;
    let rank_str = &rest[..tick];
    if rank_str.is_empty() || !rank_str.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let rank: u32 = rank_str.parse().ok()?;

    let rest = rest[tick..].strip_prefix("` - `")?;
    let sep = rest.rfind("` - ")?;
    let name = rest[..sep].trim();
    if name.is_empty() {
        return None;
    }

    Some((rank, name.to_string(), &rest[sep + 4..]))
}

/// Strip the unit suffix and parse the remaining decimal.
///
/// A leading sign is accepted. Text that is not a number once the unit is
/// gone (including a missing height entirely) yields None.
fn parse_height(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();

    let mut stripped = trimmed;
    for suffix in UNIT_SUFFIXES {
        if let Some(without) = trimmed.strip_suffix(suffix) {
            stripped = without;
            break;
        }
    }

    stripped.trim().parse::<f64>().ok()
}
