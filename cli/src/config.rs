//! Environment-resolved configuration.
//!
//! The CLI shell resolves these once at startup and hands them to the
//! pipeline components as plain values — no process-wide state.

use std::path::PathBuf;

use anyhow::Result;

/// Remote service used when `LOOM_URL` is unset.
pub const DEFAULT_BASE_URL: &str = "https://loom.dev";

/// Credentials and endpoints for remote API calls.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// API token, with or without a `Bearer ` prefix.
    pub token: String,
    /// Base URL of the remote service.
    pub base_url: String,
    /// Organization id, sent as the `Org-Id` header when non-empty.
    pub org_id: String,
}

impl ApiConfig {
    /// Resolve from `LOOM_APIKEY` (fallback `LOOM_AUTHORIZATION`),
    /// `LOOM_URL` and `LOOM_ORGID`.
    #[must_use]
    pub fn from_env() -> Self {
        let token = std::env::var("LOOM_APIKEY")
            .or_else(|_| std::env::var("LOOM_AUTHORIZATION"))
            .unwrap_or_default();
        let base_url = std::env::var("LOOM_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let org_id = std::env::var("LOOM_ORGID").unwrap_or_default();
        Self {
            token,
            base_url,
            org_id,
        }
    }

    /// `Authorization` header value. Tokens pasted with the `Bearer ` prefix
    /// already attached are passed through unchanged.
    #[must_use]
    pub fn bearer(&self) -> String {
        if self.token.starts_with("Bearer ") {
            self.token.clone()
        } else {
            format!("Bearer {}", self.token)
        }
    }
}

/// Local directory holding synced parameter files and sandbox working
/// copies. `LOOM_CODE_DIR` overrides; defaults to `~/.loom/code`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn code_dir() -> Result<PathBuf> {
    if let Ok(val) = std::env::var("LOOM_CODE_DIR") {
        return Ok(PathBuf::from(val));
    }
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.join(".loom").join("code"))
}

/// Optional working-directory override for the sandbox's handler copy.
#[must_use]
pub fn workdir_override() -> Option<PathBuf> {
    std::env::var("LOOM_WORKDIR").ok().map(PathBuf::from)
}
