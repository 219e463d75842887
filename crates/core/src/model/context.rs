use serde::{Deserialize, Serialize};

/// Where a study context came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContextProvenance {
    LearnerNotes,
    Retrieved,
}

/// Reference material for one checkpoint attempt.
///
/// Owned by the attempt and discarded when the attempt concludes; it is not
/// persisted with the learner's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyContext {
    text: String,
    provenance: ContextProvenance,
}

impl StudyContext {
    #[must_use]
    pub fn new(text: impl Into<String>, provenance: ContextProvenance) -> Self {
        Self {
            text: text.into(),
            provenance,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn provenance(&self) -> ContextProvenance {
        self.provenance
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Returns a copy of this context with extra reference material appended.
    ///
    /// Used on retry cycles, where the remediation explanation joins the
    /// original material before questions are regenerated.
    #[must_use]
    pub fn with_supplement(&self, extra: &str) -> Self {
        let mut text = self.text.clone();
        text.push_str("\n\n");
        text.push_str(extra);
        Self {
            text,
            provenance: self.provenance,
        }
    }
}
