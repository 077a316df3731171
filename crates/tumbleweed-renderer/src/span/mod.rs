//! Inline rich-text span application.
//!
//! Takes a plain text run plus its formatting ranges and emits the text with
//! nested inline markers. The sweep in [`processor`] guarantees markers are
//! balanced and never cross, whatever the input ranges do.

mod markdown;
mod processor;
mod types;

pub use markdown::{MarkdownSpanOutput, apply_spans};
pub use processor::process_spans;
pub use types::{FormatRange, SpanKind, normalize_ranges};

pub trait SpanOutput {
    type Error;

    fn write_text(&mut self, text: &str) -> Result<(), Self::Error>;
    fn open_span(&mut self, kind: &SpanKind) -> Result<(), Self::Error>;
    fn close_span(&mut self, kind: &SpanKind) -> Result<(), Self::Error>;
}
