use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::message::Segment;

// Opening fence, a language word glued to it, a mandatory newline, then the
// shortest body ending at the next closing fence. A fence without a language
// tag never matches and stays plain text; the same goes for an unterminated
// fence.
static FENCE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"```(\w+)\n((?s:.)+?)```").unwrap());

/// Splits a raw message into interleaved plain-text and fenced-code
/// segments, preserving their original left-to-right order.
///
/// Text runs between and around fences are kept even when empty so the
/// interleaving stays aligned for back-to-back code blocks. Empty input
/// yields no segments at all.
pub fn segment_message(raw: &str) -> Vec<Segment> {
    if raw.is_empty() {
        return Vec::new();
    }

    let mut segments = Vec::new();
    let mut last_end = 0;

    for caps in FENCE_REGEX.captures_iter(raw) {
        let (Some(whole), Some(language), Some(code)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        segments.push(Segment::Text(raw[last_end..whole.start()].to_string()));
        segments.push(Segment::Code {
            language: language.as_str().to_string(),
            code: code.as_str().to_string(),
        });
        last_end = whole.end();
    }

    segments.push(Segment::Text(raw[last_end..].to_string()));
    segments
}
