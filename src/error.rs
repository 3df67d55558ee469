pub use anyhow::{Error, Result};

/// Why a single lesson file could not be turned into a `Lesson`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LessonError {
    #[error("malformed front matter: {reason}")]
    MalformedFrontMatter { reason: String },

    #[error("no recognized section headings found")]
    NoSectionsFound,
}

impl LessonError {
    pub(crate) fn front_matter(reason: impl Into<String>) -> Self {
        LessonError::MalformedFrontMatter {
            reason: reason.into(),
        }
    }
}
