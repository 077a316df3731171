use super::types::{FormatRange, SpanKind};
use super::{SpanOutput, process_spans};
use std::fmt::Write;

pub struct MarkdownSpanOutput<W: Write> {
    writer: W,
}

impl<W: Write> MarkdownSpanOutput<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> SpanOutput for MarkdownSpanOutput<W> {
    type Error = std::fmt::Error;

    fn write_text(&mut self, text: &str) -> Result<(), Self::Error> {
        self.writer.write_str(text)
    }

    fn open_span(&mut self, kind: &SpanKind) -> Result<(), Self::Error> {
        match kind {
            SpanKind::Bold => write!(self.writer, "**"),
            SpanKind::Italic => write!(self.writer, "_"),
            SpanKind::Strikethrough => write!(self.writer, "~~"),
            SpanKind::Code => write!(self.writer, "`"),
            SpanKind::Link { .. } | SpanKind::Mention { .. } => write!(self.writer, "["),
            // No markdown equivalent
            SpanKind::Other => Ok(()),
        }
    }

    fn close_span(&mut self, kind: &SpanKind) -> Result<(), Self::Error> {
        match kind {
            SpanKind::Bold => write!(self.writer, "**"),
            SpanKind::Italic => write!(self.writer, "_"),
            SpanKind::Strikethrough => write!(self.writer, "~~"),
            SpanKind::Code => write!(self.writer, "`"),
            SpanKind::Link { href } => write!(self.writer, "]({})", href),
            SpanKind::Mention { url } => write!(self.writer, "]({})", url),
            // No markdown equivalent
            SpanKind::Other => Ok(()),
        }
    }
}

/// Applies `ranges` to `text` as markdown inline syntax. Never fails: a
/// formatting error falls back to the unformatted text.
pub fn apply_spans(text: &str, ranges: &[FormatRange]) -> String {
    let mut output = MarkdownSpanOutput::new(String::new());
    match process_spans(text, ranges, &mut output) {
        Ok(()) => output.into_inner(),
        Err(_) => text.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_bold_italic() {
        let ranges = vec![
            FormatRange::new(0, 11, SpanKind::Bold),
            FormatRange::new(2, 2, SpanKind::Italic),
        ];
        assert_eq!(
            apply_spans("Hello world", &ranges),
            "**He_ll_o world**"
        );
    }

    #[test]
    fn link_wraps_span_in_brackets() {
        let ranges = vec![FormatRange::new(
            6,
            4,
            SpanKind::Link {
                href: "https://example.com".into(),
            },
        )];
        assert_eq!(
            apply_spans("click here for more", &ranges),
            "click [here](https://example.com) for more"
        );
    }

    #[test]
    fn delimiters_nested_inside_link_stay_inside_brackets() {
        let ranges = vec![
            FormatRange::new(
                0,
                10,
                SpanKind::Link {
                    href: "https://example.com".into(),
                },
            ),
            FormatRange::new(0, 4, SpanKind::Bold),
        ];
        assert_eq!(
            apply_spans("bold plain", &ranges),
            "[**bold** plain](https://example.com)"
        );
    }

    #[test]
    fn strikethrough_and_code() {
        let ranges = vec![
            FormatRange::new(0, 4, SpanKind::Strikethrough),
            FormatRange::new(5, 4, SpanKind::Code),
        ];
        assert_eq!(apply_spans("gone code", &ranges), "~~gone~~ `code`");
    }

    #[test]
    fn other_kind_is_a_no_op() {
        let ranges = vec![FormatRange::new(0, 5, SpanKind::Other)];
        assert_eq!(apply_spans("small text", &ranges), "small text");
    }
}
