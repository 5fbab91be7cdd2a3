//! App directory structure and manifest validation.
//!
//! Fatal preconditions (missing directory, unreadable manifest) abort the
//! pass; everything else is a soft [`Defect`] accumulated into a
//! [`ValidationReport`] so one invocation reports every finding at once.
//! The validator only reads — it never mutates the manifest or the handler.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use loom_common::AppManifest;
use thiserror::Error;

/// Manifest file name inside an app directory.
pub const MANIFEST_FILE: &str = "api.yaml";
/// Handler script, relative to the app root.
pub const HANDLER_FILE: &str = "src/app.py";
/// Dependency list, adjacent to the manifest.
pub const REQUIREMENTS_FILE: &str = "requirements.txt";

/// Fatal validation preconditions — the pipeline cannot proceed past these.
#[derive(Debug, Error)]
pub enum ValidateError {
    /// The target is missing, not a directory, or lacks a required file.
    #[error("invalid app folder: {0}")]
    InvalidFolder(String),

    /// `api.yaml` could not be read or parsed.
    #[error("cannot load manifest {path}: {reason}")]
    ManifestParse { path: PathBuf, reason: String },
}

/// A non-fatal validation finding. Closed set so consumers can match
/// exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Defect {
    /// Manifest name does not match the folder base name.
    Appname,
    /// Folder name suffix does not encode the manifest version.
    FolderVersion,
    /// Large image uses a vector format the remote renderer rejects.
    Image,
    /// One or more declared actions never appear in the handler source.
    Actions,
}

impl Defect {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Defect::Appname => "appname",
            Defect::FolderVersion => "folder-version",
            Defect::Image => "image",
            Defect::Actions => "actions",
        }
    }
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Accumulated findings from one validation pass. Defect codes are unique
/// and unordered; the detail lines preserve what the operator needs to
/// self-correct (expected vs. actual).
#[derive(Debug, Default)]
pub struct ValidationReport {
    defects: BTreeSet<Defect>,
    details: Vec<String>,
}

impl ValidationReport {
    pub fn record(&mut self, defect: Defect, detail: impl Into<String>) {
        self.defects.insert(defect);
        self.details.push(detail.into());
    }

    /// True when every check passed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.defects.is_empty()
    }

    #[must_use]
    pub fn defects(&self) -> &BTreeSet<Defect> {
        &self.defects
    }

    #[must_use]
    pub fn details(&self) -> &[String] {
        &self.details
    }

    /// Comma-separated defect codes, e.g. `"appname, image"`.
    #[must_use]
    pub fn summary(&self) -> String {
        self.defects
            .iter()
            .map(|d| d.code())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Resolved paths of the files the pipeline inspects inside an app
/// directory.
#[derive(Debug, Clone)]
pub struct AppLayout {
    pub root: PathBuf,
    pub manifest: PathBuf,
    pub handler: PathBuf,
    pub requirements: PathBuf,
}

impl AppLayout {
    /// Confirm `root` is a directory containing the three required files.
    ///
    /// # Errors
    ///
    /// Returns [`ValidateError::InvalidFolder`] naming whichever piece is
    /// missing.
    pub fn resolve(root: &Path) -> Result<Self, ValidateError> {
        let meta = std::fs::metadata(root).map_err(|_| {
            ValidateError::InvalidFolder(format!("{} does not exist", root.display()))
        })?;
        if !meta.is_dir() {
            return Err(ValidateError::InvalidFolder(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        // Canonicalize so the base name is meaningful for `.`-style paths.
        let root = std::fs::canonicalize(root).map_err(|e| {
            ValidateError::InvalidFolder(format!("cannot resolve {}: {e}", root.display()))
        })?;

        let layout = Self {
            manifest: root.join(MANIFEST_FILE),
            handler: root.join(HANDLER_FILE),
            requirements: root.join(REQUIREMENTS_FILE),
            root,
        };
        for required in [&layout.manifest, &layout.handler, &layout.requirements] {
            if !required.is_file() {
                return Err(ValidateError::InvalidFolder(format!(
                    "missing {}",
                    required.display()
                )));
            }
        }
        Ok(layout)
    }

    /// Base name of the app directory.
    #[must_use]
    pub fn dir_name(&self) -> &str {
        self.root
            .file_name()
            .map_or("", |n| n.to_str().unwrap_or(""))
    }
}

/// Load and parse `api.yaml`.
///
/// # Errors
///
/// Returns [`ValidateError::ManifestParse`] if the file cannot be read or
/// is not valid YAML for the inspected fields.
pub fn load_manifest(path: &Path) -> Result<AppManifest, ValidateError> {
    let content = std::fs::read_to_string(path).map_err(|e| ValidateError::ManifestParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_yaml::from_str(&content).map_err(|e| ValidateError::ManifestParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Run the full validation pass over a resolved layout.
///
/// Returns the loaded manifest and the complete report; soft defects never
/// produce a hard error here — callers decide whether to escalate.
///
/// # Errors
///
/// Returns a fatal error only for the preconditions: unreadable manifest or
/// unreadable handler source.
pub fn validate(layout: &AppLayout) -> Result<(AppManifest, ValidationReport), ValidateError> {
    let manifest = load_manifest(&layout.manifest)?;
    let handler_src = std::fs::read_to_string(&layout.handler).map_err(|e| {
        ValidateError::InvalidFolder(format!("cannot read {}: {e}", layout.handler.display()))
    })?;

    let mut report = ValidationReport::default();
    check_name(&manifest, layout.dir_name(), &mut report);
    check_version(&manifest, layout.dir_name(), &mut report);
    check_image(&manifest, &mut report);
    check_actions(&manifest, &handler_src, &mut report);
    Ok((manifest, report))
}

fn check_name(manifest: &AppManifest, dir_name: &str, report: &mut ValidationReport) {
    if !manifest.name.eq_ignore_ascii_case(dir_name) {
        report.record(
            Defect::Appname,
            format!(
                "manifest name '{}' does not match folder name '{dir_name}'",
                manifest.name
            ),
        );
    }
}

/// The folder name encodes the version as the suffix after the last `-`.
/// An app name that itself ends in `-<digits>` misparses here; that is the
/// established naming convention, kept as-is.
fn check_version(manifest: &AppManifest, dir_name: &str, report: &mut ValidationReport) {
    let suffix = dir_name.rsplit('-').next().unwrap_or(dir_name);
    if suffix != manifest.app_version {
        report.record(
            Defect::FolderVersion,
            format!(
                "folder '{dir_name}' encodes version '{suffix}', manifest declares '{}'",
                manifest.app_version
            ),
        );
    }
}

fn check_image(manifest: &AppManifest, report: &mut ValidationReport) {
    let format = manifest.large_image_format();
    if format.starts_with("svg") {
        report.record(
            Defect::Image,
            format!("large_image format '{format}' is a vector format the renderer does not support"),
        );
    }
}

/// Every declared action name must appear verbatim in the handler source.
/// Missing names collapse into one aggregate defect; the detail line keeps
/// the individual names.
fn check_actions(manifest: &AppManifest, handler_src: &str, report: &mut ValidationReport) {
    let missing: Vec<&str> = manifest
        .actions
        .iter()
        .map(|a| a.name.as_str())
        .filter(|name| !handler_src.contains(*name))
        .collect();
    if !missing.is_empty() {
        report.record(
            Defect::Actions,
            format!("actions not found in {HANDLER_FILE}: {}", missing.join(", ")),
        );
    }
}
