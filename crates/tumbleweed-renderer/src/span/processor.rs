use super::SpanOutput;
use super::types::{FormatRange, SpanKind};
use std::cmp::Ordering;

#[derive(Debug, Clone)]
struct SpanEvent<'a> {
    pos: usize,
    is_start: bool,
    /// The range's other edge: its end for start events, its start for end
    /// events. Used to order ties so containment nests correctly.
    far_edge: usize,
    kind: &'a SpanKind,
    range_idx: usize,
}

impl PartialEq for SpanEvent<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos && self.is_start == other.is_start && self.far_edge == other.far_edge
    }
}

impl Eq for SpanEvent<'_> {}

impl PartialOrd for SpanEvent<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SpanEvent<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.pos.cmp(&other.pos) {
            Ordering::Equal => match (self.is_start, other.is_start) {
                // At the same position: ends before starts for proper nesting
                (false, true) => Ordering::Less,
                (true, false) => Ordering::Greater,
                // Two starts: the containing (longer) range opens first.
                // Two ends: the inner (later-started) range closes first.
                _ => other.far_edge.cmp(&self.far_edge),
            },
            ord => ord,
        }
    }
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    if idx >= text.len() {
        return text.len();
    }
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Applies formatting ranges to `text`, streaming segments and span
/// open/close calls into `output`.
///
/// Ranges may overlap or nest arbitrarily. A stack keeps delimiters balanced:
/// when a range ends while later-opened ranges are still active, those are
/// closed and reopened around the boundary. Out-of-bounds offsets are clamped
/// to char boundaries and zero-length ranges are dropped, so malformed input
/// degrades to plain text instead of failing.
pub fn process_spans<O: SpanOutput>(
    text: &str,
    ranges: &[FormatRange],
    output: &mut O,
) -> Result<(), O::Error> {
    let mut events: Vec<SpanEvent<'_>> = Vec::new();

    for (idx, range) in ranges.iter().enumerate() {
        let start = floor_char_boundary(text, range.start);
        let end = floor_char_boundary(text, range.end());
        if start >= end {
            continue;
        }
        events.push(SpanEvent {
            pos: start,
            is_start: true,
            far_edge: end,
            kind: &range.kind,
            range_idx: idx,
        });
        events.push(SpanEvent {
            pos: end,
            is_start: false,
            far_edge: start,
            kind: &range.kind,
            range_idx: idx,
        });
    }

    events.sort();

    let mut active_stack: Vec<(&SpanKind, usize)> = Vec::new();
    let mut last_pos = 0;

    for event in events {
        if event.pos > last_pos {
            if let Some(segment) = text.get(last_pos..event.pos) {
                output.write_text(segment)?;
            }
            last_pos = event.pos;
        }

        if event.is_start {
            output.open_span(event.kind)?;
            active_stack.push((event.kind, event.range_idx));
        } else {
            let close_from = active_stack
                .iter()
                .rposition(|(_, idx)| *idx == event.range_idx);

            if let Some(close_idx) = close_from {
                let to_reopen: Vec<_> = active_stack.drain(close_idx..).collect();

                for (kind, _) in to_reopen.iter().rev() {
                    output.close_span(kind)?;
                }

                // Reopen everything above the range that actually ended.
                for (kind, idx) in to_reopen.into_iter().skip(1) {
                    output.open_span(kind)?;
                    active_stack.push((kind, idx));
                }
            }
        }
    }

    if last_pos < text.len() {
        output.write_text(&text[last_pos..])?;
    }

    for (kind, _) in active_stack.into_iter().rev() {
        output.close_span(kind)?;
    }

    Ok(())
}
