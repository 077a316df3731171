//! Tumbleweed renderer
//!
//! Turns fetched posts into markdown documents on disk: inline formatting
//! spans, content blocks, reblog trails, attachment resolution, document
//! assembly, and write planning.

pub mod assemble;
pub mod attach;
pub mod blocks;
pub mod plan;
pub mod playlist;
pub mod report;
pub mod span;
pub mod trail;
pub mod util;

pub use assemble::{RenderedDocument, assemble_grouped, assemble_singular};
pub use attach::{AttachmentScope, HttpMediaFetcher, MediaFetcher};
pub use plan::{WritePlan, plan_document};
pub use report::RenderWarning;
pub use trail::render_post_body;
