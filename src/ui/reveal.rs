use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::models::message::Segment;

/// Fixed per-character delay of the typing reveal.
pub const CHAR_DELAY: Duration = Duration::from_millis(45);

/// How one segment of an animated message should be drawn this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegmentView {
    /// Show the first `visible_chars` characters of the text run.
    Text { visible_chars: usize, done: bool },
    /// Code renders whole and instantly; it is never animated.
    Code,
}

#[derive(Clone, Copy, Debug)]
enum Phase {
    Revealing { started: Instant },
    Done,
}

/// Reveal progress for every animated text segment, keyed by message id and
/// segment position so unrelated repaints never restart a finished reveal.
/// Absence from the map means the segment is still pending.
#[derive(Default)]
pub struct RevealLedger {
    phases: HashMap<(String, usize), Phase>,
}

impl RevealLedger {
    /// Advances one message's reveal and reports, per segment, what is
    /// visible this frame. Text segments reveal strictly in order: a run
    /// stays pending until every earlier text run of the same message is
    /// done. Code segments are exempt and always render whole.
    pub fn advance_message(
        &mut self,
        message_id: &str,
        segments: &[Segment],
        now: Instant,
    ) -> Vec<SegmentView> {
        let mut gate_open = true;
        segments
            .iter()
            .enumerate()
            .map(|(index, segment)| match segment {
                Segment::Code { .. } => SegmentView::Code,
                Segment::Text(text) => {
                    let total = text.chars().count();
                    let view = self.advance_text(message_id, index, total, gate_open, now);
                    if let SegmentView::Text { done: false, .. } = view {
                        gate_open = false;
                    }
                    view
                }
            })
            .collect()
    }

    /// True while any segment is mid-reveal; drives repaint scheduling.
    pub fn has_active_reveal(&self) -> bool {
        self.phases
            .values()
            .any(|phase| matches!(phase, Phase::Revealing { .. }))
    }

    /// Forgets all progress. Called when the thread is cleared or replaced.
    pub fn clear(&mut self) {
        self.phases.clear();
    }

    fn advance_text(
        &mut self,
        message_id: &str,
        index: usize,
        total_chars: usize,
        gate_open: bool,
        now: Instant,
    ) -> SegmentView {
        let key = (message_id.to_string(), index);

        match self.phases.get(&key).copied() {
            Some(Phase::Done) => SegmentView::Text {
                visible_chars: total_chars,
                done: true,
            },
            Some(Phase::Revealing { started }) => {
                let elapsed = now.saturating_duration_since(started);
                let visible = (elapsed.as_millis() / CHAR_DELAY.as_millis()) as usize;
                if visible >= total_chars {
                    self.phases.insert(key, Phase::Done);
                    SegmentView::Text {
                        visible_chars: total_chars,
                        done: true,
                    }
                } else {
                    SegmentView::Text {
                        visible_chars: visible,
                        done: false,
                    }
                }
            }
            None => {
                if !gate_open {
                    return SegmentView::Text {
                        visible_chars: 0,
                        done: false,
                    };
                }
                if total_chars == 0 {
                    // Nothing to type; an empty run is born done.
                    self.phases.insert(key, Phase::Done);
                    return SegmentView::Text {
                        visible_chars: 0,
                        done: true,
                    };
                }
                self.phases.insert(key, Phase::Revealing { started: now });
                SegmentView::Text {
                    visible_chars: 0,
                    done: false,
                }
            }
        }
    }
}

/// The first `count` characters of a text run, respecting char boundaries.
pub fn visible_prefix(text: &str, count: usize) -> &str {
    match text.char_indices().nth(count) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn text(s: &str) -> Segment {
        Segment::Text(s.to_string())
    }

    fn code() -> Segment {
        Segment::Code {
            language: "rust".to_string(),
            code: "let x = 1;".to_string(),
        }
    }

    fn after(t0: Instant, chars: usize) -> Instant {
        t0 + CHAR_DELAY * (chars as u32)
    }

    #[test]
    fn a_text_segment_reveals_one_character_per_tick() {
        let mut ledger = RevealLedger::default();
        let t0 = Instant::now();
        let segments = vec![text("hello")];

        // Mount: the reveal starts with nothing visible.
        assert_eq!(
            ledger.advance_message("m", &segments, t0),
            vec![SegmentView::Text {
                visible_chars: 0,
                done: false
            }]
        );

        assert_eq!(
            ledger.advance_message("m", &segments, after(t0, 3)),
            vec![SegmentView::Text {
                visible_chars: 3,
                done: false
            }]
        );

        assert_eq!(
            ledger.advance_message("m", &segments, after(t0, 5)),
            vec![SegmentView::Text {
                visible_chars: 5,
                done: true
            }]
        );
    }

    #[test]
    fn done_is_terminal_even_if_the_clock_rewinds() {
        let mut ledger = RevealLedger::default();
        let t0 = Instant::now();
        let segments = vec![text("hi")];

        ledger.advance_message("m", &segments, t0);
        ledger.advance_message("m", &segments, after(t0, 2));

        // A repaint with an earlier timestamp must not restart the reveal.
        assert_eq!(
            ledger.advance_message("m", &segments, t0),
            vec![SegmentView::Text {
                visible_chars: 2,
                done: true
            }]
        );
    }

    #[test]
    fn later_text_waits_for_earlier_text_to_finish() {
        let mut ledger = RevealLedger::default();
        let t0 = Instant::now();
        let segments = vec![text("ab"), code(), text("cd")];

        let views = ledger.advance_message("m", &segments, t0);
        assert_eq!(
            views,
            vec![
                SegmentView::Text {
                    visible_chars: 0,
                    done: false
                },
                SegmentView::Code,
                // Gated: not yet mounted.
                SegmentView::Text {
                    visible_chars: 0,
                    done: false
                },
            ]
        );

        // First run finishes; the second only mounts now.
        let views = ledger.advance_message("m", &segments, after(t0, 2));
        assert_eq!(views[0], SegmentView::Text { visible_chars: 2, done: true });
        assert_eq!(views[2], SegmentView::Text { visible_chars: 0, done: false });

        // And reveals on its own clock from here.
        let views = ledger.advance_message("m", &segments, after(t0, 3));
        assert_eq!(views[2], SegmentView::Text { visible_chars: 1, done: false });
    }

    #[test]
    fn code_segments_are_never_gated() {
        let mut ledger = RevealLedger::default();
        let t0 = Instant::now();
        let segments = vec![text("typing"), code(), code()];

        let views = ledger.advance_message("m", &segments, t0);
        assert_eq!(views[1], SegmentView::Code);
        assert_eq!(views[2], SegmentView::Code);
    }

    #[test]
    fn empty_text_runs_are_born_done() {
        let mut ledger = RevealLedger::default();
        let t0 = Instant::now();
        let segments = vec![text(""), code(), text("x")];

        let views = ledger.advance_message("m", &segments, t0);
        assert_eq!(views[0], SegmentView::Text { visible_chars: 0, done: true });
        // The empty run opens the gate immediately for the next text run.
        assert_eq!(views[2], SegmentView::Text { visible_chars: 0, done: false });
        assert!(ledger.has_active_reveal());
    }

    #[test]
    fn messages_reveal_independently_of_each_other() {
        let mut ledger = RevealLedger::default();
        let t0 = Instant::now();

        ledger.advance_message("m1", &[text("abc")], t0);
        let views = ledger.advance_message("m2", &[text("xyz")], after(t0, 1));
        // m2 starts from zero on its own clock, unaffected by m1.
        assert_eq!(views[0], SegmentView::Text { visible_chars: 0, done: false });
    }

    #[test]
    fn clearing_the_ledger_forgets_all_progress() {
        let mut ledger = RevealLedger::default();
        let t0 = Instant::now();
        ledger.advance_message("m", &[text("abc")], t0);
        ledger.advance_message("m", &[text("abc")], after(t0, 3));
        ledger.clear();
        assert!(!ledger.has_active_reveal());

        let views = ledger.advance_message("m", &[text("abc")], after(t0, 3));
        assert_eq!(views[0], SegmentView::Text { visible_chars: 0, done: false });
    }

    #[test]
    fn animated_content_converges_to_the_static_rendering() {
        let mut ledger = RevealLedger::default();
        let t0 = Instant::now();
        let segments = vec![text("ab"), code(), text("cde")];

        ledger.advance_message("m", &segments, t0);
        ledger.advance_message("m", &segments, after(t0, 2));
        let views = ledger.advance_message("m", &segments, after(t0, 5));

        // Every text run fully visible, every code block whole: exactly
        // what a non-animated rendering of the same segments shows.
        assert_eq!(
            views,
            vec![
                SegmentView::Text {
                    visible_chars: 2,
                    done: true
                },
                SegmentView::Code,
                SegmentView::Text {
                    visible_chars: 3,
                    done: true
                },
            ]
        );
        assert!(!ledger.has_active_reveal());
    }

    #[test]
    fn visible_prefix_respects_char_boundaries() {
        assert_eq!(visible_prefix("héllo", 2), "hé");
        assert_eq!(visible_prefix("héllo", 99), "héllo");
        assert_eq!(visible_prefix("", 3), "");
    }
}
