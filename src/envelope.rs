//! Generic response wrapper shared by every API resource.
//!
//! Entity types are supplied by the caller; these structs only model the
//! envelope around them.

use serde::{Deserialize, Serialize};

/// Top-level response body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    pub status: String,
    #[serde(default)]
    pub copyright: Option<String>,
    #[serde(default, rename = "attributionText")]
    pub attribution_text: Option<String>,
    #[serde(default, rename = "attributionHTML")]
    pub attribution_html: Option<String>,
    #[serde(default)]
    pub etag: Option<String>,
    pub data: T,
}

/// Paginated result set inside [`ApiEnvelope::data`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataContainer<T> {
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub count: u32,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

impl<T> DataContainer<T> {
    /// Whether more results exist past this page.
    pub fn has_more(&self) -> bool {
        self.offset.saturating_add(self.count) < self.total
    }

    /// Offset of the next page, if any.
    pub fn next_offset(&self) -> Option<u32> {
        self.has_more().then(|| self.offset + self.count)
    }
}
