//! # Aggregator Module
//!
//! Assembles the surviving sections into one markdown document with YAML front
//! matter, a table of contents for multi-section documents, and per-page
//! provenance.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::error::{Error, Result};
use crate::markdown::{Slugger, demote_headings, heading_texts};
use crate::section::{Provenance, Section};

/// Title used when neither the job nor any section provides one
pub const DEFAULT_TITLE: &str = "Aggregated Content";

const EMPTY_SECTION: &str = "*No content could be extracted from this page.*";

const TOC_HEADING: &str = "Table of Contents";

/// Caller-supplied metadata for a job
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobMetadata {
    /// Free-form tags copied into the front matter
    pub tags: Vec<String>,

    /// Domain override; defaults to the first section's host
    pub domain: Option<String>,

    /// Document title override
    pub title: Option<String>,

    /// Creation time; defaults to now
    pub created_at: Option<DateTime<Utc>>,
}

impl JobMetadata {
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }
}

/// Metadata of a finished document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub created_at: DateTime<Utc>,
    /// Number of distinct source pages
    pub total_pages: usize,
    pub domain: String,
    pub tags: Vec<String>,
}

/// The final document handed to downstream consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedDocument {
    pub metadata: DocumentMetadata,

    /// Markdown body including front matter
    pub body: String,

    /// One entry per page that contributed a section
    pub provenance: Vec<Provenance>,
}

fn section_domain(sections: &[Section]) -> String {
    sections
        .first()
        .and_then(|s| Url::parse(&s.url).ok())
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

fn document_title(metadata: &JobMetadata, sections: &[Section]) -> String {
    metadata
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| {
            sections
                .iter()
                .map(|s| s.title.trim())
                .find(|t| !t.is_empty())
        })
        .unwrap_or(DEFAULT_TITLE)
        .to_string()
}

fn front_matter(metadata: &DocumentMetadata) -> Result<String> {
    // JSON scalars and arrays are valid YAML flow values
    Ok(format!(
        "---\ncreated_at: {}\ntotal_pages: {}\ndomain: {}\ntags: {}\n---\n",
        metadata.created_at.to_rfc3339(),
        metadata.total_pages,
        serde_json::to_string(&metadata.domain)?,
        serde_json::to_string(&metadata.tags)?,
    ))
}

fn section_body(content: &str, min_level: usize) -> String {
    let content = content.trim();
    if content.is_empty() {
        EMPTY_SECTION.to_string()
    } else {
        demote_headings(content, min_level)
    }
}

/// Build the aggregated document from deduplicated sections
#[instrument(skip_all, fields(sections = sections.len()))]
pub fn aggregate(sections: Vec<Section>, metadata: JobMetadata) -> Result<AggregatedDocument> {
    if sections.is_empty() {
        return Err(Error::EmptyContent);
    }

    let title = document_title(&metadata, &sections);
    let total_pages = sections
        .iter()
        .map(|s| s.url.as_str())
        .collect::<HashSet<_>>()
        .len();
    let document_metadata = DocumentMetadata {
        title: title.clone(),
        created_at: metadata.created_at.unwrap_or_else(Utc::now),
        total_pages,
        domain: metadata
            .domain
            .clone()
            .unwrap_or_else(|| section_domain(&sections)),
        tags: metadata.tags.clone(),
    };

    let mut body = front_matter(&document_metadata)?;
    body.push('\n');
    body.push_str(&format!("# {title}\n\n"));

    if let [section] = sections.as_slice() {
        body.push_str(&section_body(&section.content, 2));
        body.push('\n');
    } else {
        let blocks: Vec<String> = sections
            .iter()
            .map(|section| section_body(&section.content, 3))
            .collect();

        // Slugs are claimed in render order, headings above a section first
        let mut slugger = Slugger::new();
        slugger.slug(&title);
        slugger.slug(TOC_HEADING);
        let anchors: Vec<String> = sections
            .iter()
            .zip(&blocks)
            .map(|(section, block)| {
                let anchor = slugger.slug(&section.title);
                for heading in heading_texts(block) {
                    slugger.slug(&heading);
                }
                anchor
            })
            .collect();

        body.push_str(&format!("## {TOC_HEADING}\n\n"));
        for (i, (section, anchor)) in sections.iter().zip(&anchors).enumerate() {
            body.push_str(&format!("{}. [{}](#{})\n", i + 1, section.title, anchor));
        }
        body.push('\n');

        for (section, block) in sections.iter().zip(&blocks) {
            body.push_str(&format!("## {}\n\n", section.title));
            body.push_str(&format!("*Source: [{0}]({0})*\n\n", section.url));
            body.push_str(block);
            body.push_str("\n\n---\n\n");
        }
    }

    debug!(total_pages, bytes = body.len(), "Aggregated document");

    Ok(AggregatedDocument {
        metadata: document_metadata,
        provenance: Provenance::from_sections(&sections),
        body,
    })
}
