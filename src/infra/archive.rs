//! Firmware bundle expansion
//!
//! Bundles are zip archives; they are expanded once into the working
//! directory and never read again.

use std::fs::File;
use std::path::Path;

use crate::error::PipelineError;

/// Expand the zip archive at `bundle` into `dest`
pub fn extract_bundle(bundle: &Path, dest: &Path) -> Result<(), PipelineError> {
    let archive_error = |error: String| PipelineError::Archive {
        path: bundle.to_path_buf(),
        error,
    };

    let file = File::open(bundle).map_err(|e| archive_error(e.to_string()))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| archive_error(e.to_string()))?;
    tracing::debug!("Bundle has {} entries", archive.len());
    archive
        .extract(dest)
        .map_err(|e| archive_error(e.to_string()))
}
