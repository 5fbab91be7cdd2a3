//! App manifest (`api.yaml`) data model.

use serde::{Deserialize, Serialize};

/// App manifest as declared in `api.yaml`.
///
/// Only the fields the pipeline inspects are modeled; the remote service
/// owns the full schema and unknown fields are ignored on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppManifest {
    pub name: String,
    pub app_version: String,
    #[serde(default)]
    pub large_image: String,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

/// A named action the handler is expected to implement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,
}

impl AppManifest {
    /// Format segment of the `large_image` reference: `"png"` for
    /// `data:image/png;base64,…`, or the file extension for a plain path or
    /// URL. Empty when the reference is empty.
    #[must_use]
    pub fn large_image_format(&self) -> &str {
        if let Some(rest) = self.large_image.strip_prefix("data:image/") {
            return rest.split([';', ',']).next().unwrap_or("");
        }
        match self.large_image.rsplit_once('.') {
            Some((_, ext)) => ext,
            None => "",
        }
    }
}
