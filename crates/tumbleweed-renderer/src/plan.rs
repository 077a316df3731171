//! Write planning: deciding which documents a run will produce.
//!
//! Existing documents are never overwritten, which is what makes repeated
//! runs cheap and idempotent. The check is purely path-based so planning
//! needs no parsing of previously written files.

use crate::assemble::DocumentPaths;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WritePlan {
    /// The document already exists on disk; nothing happens this run.
    Skip(PathBuf),
    /// The document is absent and should be rendered and written.
    Render(DocumentPaths),
}

impl WritePlan {
    pub fn path(&self) -> &std::path::Path {
        match self {
            WritePlan::Skip(path) => path,
            WritePlan::Render(paths) => &paths.document,
        }
    }

    pub fn should_render(&self) -> bool {
        matches!(self, WritePlan::Render(_))
    }
}

/// Plans one document. A grouped-day document that exists is skipped as a
/// whole even if new posts have since appeared on that day; the coarse
/// check trades completeness for never rewriting archived files.
pub fn plan_document(paths: DocumentPaths) -> WritePlan {
    if paths.document.exists() {
        WritePlan::Skip(paths.document)
    } else {
        WritePlan::Render(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::{day_document_paths, post_document_paths};
    use chrono::NaiveDate;
    use tumbleweed_common::post::Post;

    fn post(json: &str) -> Post {
        serde_json::from_str(json).unwrap()
    }

    fn sydney() -> chrono::FixedOffset {
        crate::assemble::local_offset(600)
    }

    #[test]
    fn absent_document_is_rendered() {
        let tmp = tempfile::tempdir().unwrap();
        let post = post(r#"{"id": 1, "timestamp": 1700000000, "summary": "hi"}"#);
        let paths = post_document_paths(tmp.path(), &post, sydney());

        let plan = plan_document(paths.clone());
        assert_eq!(plan, WritePlan::Render(paths));
        assert!(plan.should_render());
    }

    #[test]
    fn existing_document_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let post = post(r#"{"id": 1, "timestamp": 1700000000, "summary": "hi"}"#);
        let paths = post_document_paths(tmp.path(), &post, sydney());

        std::fs::create_dir_all(paths.document.parent().unwrap()).unwrap();
        std::fs::write(&paths.document, "already archived\n").unwrap();

        let plan = plan_document(paths.clone());
        assert_eq!(plan, WritePlan::Skip(paths.document));
        assert!(!plan.should_render());
    }

    #[test]
    fn grouped_day_skip_covers_the_whole_day() {
        let tmp = tempfile::tempdir().unwrap();
        let day = NaiveDate::from_ymd_opt(2023, 11, 15).unwrap();
        let paths = day_document_paths(tmp.path(), day);

        std::fs::create_dir_all(paths.document.parent().unwrap()).unwrap();
        std::fs::write(&paths.document, "## 08:13\n\nold post\n").unwrap();

        // Even a day with newly arrived posts stays skipped once written.
        let plan = plan_document(paths);
        assert!(!plan.should_render());
    }
}
