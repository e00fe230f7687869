//! Upload file naming: sanitise, check the extension, resolve collisions.
//!
//! Uploaded names are untrusted. Sanitising reduces them to a flat ASCII name
//! made of `[A-Za-z0-9_.-]` so they can never escape the upload folder.
//! Collisions are resolved by appending `_1`, `_2`, … before the extension;
//! the first free slot wins.

use crate::error::IntakeError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tracing::debug;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Extensions accepted by the upload pipeline (compared lower-case).
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf"];

static RE_UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_.-]").unwrap());

/// Reduce an untrusted file name to a safe, flat name.
///
/// The name is NFKD-decomposed and combining marks are dropped, so accented
/// letters keep their base letter (`résumé` → `resume`). Path separators
/// become word breaks, runs of whitespace collapse to `_`, every character
/// outside `[A-Za-z0-9_.-]` is dropped, and leading or trailing `.`/`_` are
/// trimmed.
///
/// # Errors
/// [`IntakeError::InvalidArgument`] when nothing usable is left.
pub fn sanitize_filename(name: &str) -> Result<String, IntakeError> {
    let decomposed: String = name.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    let flattened = decomposed.replace(['/', '\\'], " ");
    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");
    let stripped = RE_UNSAFE_CHARS.replace_all(&joined, "");
    let trimmed = stripped.trim_matches(|c: char| c == '.' || c == '_');

    if trimmed.is_empty() {
        return Err(IntakeError::InvalidArgument(format!(
            "Invalid file name '{name}'"
        )));
    }
    Ok(trimmed.to_string())
}

/// Whether `name` ends in an allowed extension (case-insensitive).
pub fn has_allowed_extension(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Split `name` into stem and extension; the extension keeps its dot.
///
/// A leading dot does not start an extension (`.pdf` has no extension).
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && !name[..idx].chars().all(|c| c == '.') => name.split_at(idx),
        _ => (name, ""),
    }
}

/// The `attempt`-th candidate for `name`: `name` itself for 0, otherwise
/// `stem_<attempt>.ext`.
pub fn candidate_name(name: &str, attempt: u64) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    let (stem, ext) = split_extension(name);
    format!("{stem}_{attempt}{ext}")
}

/// A freshly created, empty file reserved for an upload.
#[derive(Debug)]
pub struct ReservedFile {
    /// The resolved file name (no directory part).
    pub name: String,
    /// Full path inside the upload folder.
    pub path: PathBuf,
    /// Open handle, positioned at the start.
    pub file: File,
}

/// Create the first free candidate of `name` inside `folder`.
///
/// Each candidate is created with create-new semantics, so two concurrent
/// uploads of the same name can never claim the same slot.
pub async fn reserve_unique(folder: &Path, name: &str) -> Result<ReservedFile, IntakeError> {
    let mut attempt = 0u64;
    loop {
        let candidate = candidate_name(name, attempt);
        let path = folder.join(&candidate);
        match OpenOptions::new().write(true).create_new(true).open(&path).await {
            Ok(file) => {
                if attempt > 0 {
                    debug!("Resolved name collision: {} -> {}", name, candidate);
                }
                return Ok(ReservedFile {
                    name: candidate,
                    path,
                    file,
                });
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(source) => return Err(IntakeError::FileWriteFailed { path, source }),
        }
    }
}
