//! Sections: the unit of attributable content that flows through
//! deduplication and aggregation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One unit of extracted content, attributed to the page it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// URL of the page the section was extracted from
    pub url: String,

    /// Title of the section (page title or the heading it was split at)
    pub title: String,

    /// Markdown content of the section
    pub content: String,

    /// Embedding of `content`, filled in by the deduplicator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// When the source page was fetched
    pub fetched_at: DateTime<Utc>,
}

impl Section {
    /// Create a section without an embedding, stamped with the current time
    pub fn new(url: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            content: content.into(),
            embedding: None,
            fetched_at: Utc::now(),
        }
    }

    /// Set the fetch timestamp
    pub fn fetched_at(mut self, fetched_at: DateTime<Utc>) -> Self {
        self.fetched_at = fetched_at;
        self
    }
}

/// Per-page provenance handed to downstream collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// URL of the page
    pub url: String,

    /// Title of the page's first surviving section
    pub title: String,

    /// When the page was fetched
    pub fetched_at: DateTime<Utc>,
}

impl Provenance {
    /// One entry per distinct page URL, in the order the sections appear
    pub fn from_sections(sections: &[Section]) -> Vec<Provenance> {
        let mut provenance: Vec<Provenance> = Vec::new();
        for section in sections {
            if provenance.iter().any(|p| p.url == section.url) {
                continue;
            }
            provenance.push(Provenance {
                url: section.url.clone(),
                title: section.title.clone(),
                fetched_at: section.fetched_at,
            });
        }
        provenance
    }
}
