//! Content-addressed artifact persistence.
//!
//! Each state transition for a comprobante writes its XML to
//! `comprobantes/<STATE>/<accessKey>_<YYYYMMDD-HHmmss>.xml` via write-to-
//! tmp-then-rename, so a cancelled write never leaves a half-written
//! file in place.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use super::state::ComprobanteState;
use crate::error::Error;

/// Persist `xml` for `access_key` under `state`, rooted at `base_dir`.
pub async fn persist_artifact(
    base_dir: &Path,
    state: ComprobanteState,
    access_key: &str,
    xml: &str,
) -> Result<PathBuf, Error> {
    let dir = base_dir.join("comprobantes").join(state.dir_name());
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| Error::Persistence(format!("failed to create {}: {e}", dir.display())))?;

    let timestamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
    let final_path = dir.join(format!("{access_key}_{timestamp}.xml"));
    let tmp_path = dir.join(format!(".{access_key}_{timestamp}.xml.tmp"));

    let mut file = tokio::fs::File::create(&tmp_path).await.map_err(|e| {
        Error::Persistence(format!("failed to create temp file {}: {e}", tmp_path.display()))
    })?;
    file.write_all(xml.as_bytes())
        .await
        .map_err(|e| Error::Persistence(format!("write failed: {e}")))?;
    file.sync_all()
        .await
        .map_err(|e| Error::Persistence(format!("fsync failed: {e}")))?;
    drop(file);

    tokio::fs::rename(&tmp_path, &final_path)
        .await
        .map_err(|e| Error::Persistence(format!("rename into place failed: {e}")))?;

    Ok(final_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn persists_artifact_under_state_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let path = persist_artifact(tmp.path(), ComprobanteState::Firmado, "1234567890123456789012345678901234567890123456789", "<factura/>")
            .await
            .unwrap();
        assert!(path.starts_with(tmp.path().join("comprobantes").join("FIRMADO")));
        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(contents, "<factura/>");
    }

    #[tokio::test]
    async fn leaves_no_tmp_file_behind() {
        let tmp = tempfile::tempdir().unwrap();
        persist_artifact(tmp.path(), ComprobanteState::Recibido, "ak", "<x/>")
            .await
            .unwrap();
        let dir = tmp.path().join("comprobantes").join("RECIBIDO");
        let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            assert!(!entry.file_name().to_string_lossy().ends_with(".tmp"));
        }
    }
}
