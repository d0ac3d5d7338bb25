//! LRC cue parser.
//!
//! QQ Music returns lyrics as LRC text:
//! [00:12.34]Lyrics line here
//! [00:15.00]Another line
//!
//! Metadata tags like [ti:Title] share the bracket syntax and are dropped
//! because they never match the timestamp shape.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static BRACKET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[(.*?)\]").unwrap());
static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{2}):(\d{2})\.\d+$").unwrap());

/// One synchronized lyrics line. `time` is whole seconds from track start;
/// the web client only scrolls at second granularity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricCue {
    pub time: u64,
    pub text: String,
}

/// Parse LRC text into cues, one per usable line, in input order.
///
/// A line is usable when its first bracket group is a `MM:SS.xx` timestamp
/// and some text remains after every bracket group is removed. Anything
/// else is dropped without failing the rest of the document.
pub fn parse_lrc(content: &str) -> Vec<LyricCue> {
    let mut cues = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || !line.contains('[') || !line.contains(']') {
            continue;
        }

        let Some(stamp) = BRACKET_RE.captures(line).map(|c| c[1].to_string()) else {
            continue;
        };
        let text = BRACKET_RE.replace_all(line, "");
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        if let Some(time) = parse_timestamp(&stamp) {
            cues.push(LyricCue {
                time,
                text: text.to_string(),
            });
        }
    }

    cues
}

/// "MM:SS.xx" to whole seconds; the fraction never carries into the floor.
fn parse_timestamp(s: &str) -> Option<u64> {
    let caps = TIMESTAMP_RE.captures(s)?;
    let minutes: u64 = caps[1].parse().ok()?;
    let seconds: u64 = caps[2].parse().ok()?;
    Some(minutes * 60 + seconds)
}
