use std::path::PathBuf;

use thiserror::Error;

use crate::model::SectionKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid report record: {0}")]
    InvalidRecord(String),

    #[error("template not found: {}", path.display())]
    MissingTemplate { path: PathBuf },

    #[error("template is corrupt: {} ({reason}{})", path.display(), page_count_note(*page_count))]
    TemplateCorrupt {
        path: PathBuf,
        page_count: Option<usize>,
        reason: String,
    },

    #[error("cannot register font for style {style}: {} ({reason})", path.display())]
    FontRegistration {
        style: &'static str,
        path: PathBuf,
        reason: String,
    },

    #[error("rendering failed: {0}")]
    Rendering(String),

    #[error("assembly plan references section {0} but it was not rendered")]
    MissingSection(SectionKind),

    #[error("assembly failed: {0}")]
    Assembly(String),

    #[error("invalid assembly plan: {0}")]
    InvalidPlan(String),
}

fn page_count_note(page_count: Option<usize>) -> String {
    match page_count {
        Some(n) => format!(", {n} pages readable"),
        None => String::new(),
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidRecord(e.to_string())
    }
}
