//! Local validation of plugin ZIP archives before upload.

use std::path::Path;

use super::ApiError;

/// What a valid archive contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub entries: usize,
    pub uncompressed_bytes: u64,
}

/// Check that `path` is an existing `.zip` file whose every entry can be
/// decompressed. Reading each entry to the end verifies its CRC.
pub fn validate_plugin_archive(path: &Path) -> Result<ArchiveSummary, ApiError> {
    if !path.is_file() {
        return Err(ApiError::InvalidArchive(format!("{} does not exist", path.display())));
    }

    let is_zip = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("zip"));
    if !is_zip {
        return Err(ApiError::InvalidArchive(format!("{} is not a .zip file", path.display())));
    }

    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| ApiError::InvalidArchive(e.to_string()))?;
    if archive.is_empty() {
        return Err(ApiError::InvalidArchive("archive is empty".into()));
    }

    let mut uncompressed_bytes = 0;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| ApiError::InvalidArchive(format!("entry {i}: {e}")))?;
        let name = entry.name().to_string();
        uncompressed_bytes += std::io::copy(&mut entry, &mut std::io::sink())
            .map_err(|e| ApiError::InvalidArchive(format!("{name}: {e}")))?;
    }

    Ok(ArchiveSummary { entries: archive.len(), uncompressed_bytes })
}


#[cfg(test)]
mod tests {
    use super::testing::plugin_zip;
    use super::*;

    #[test]
    fn test_valid_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = plugin_zip(dir.path(), "hello");

        let summary = validate_plugin_archive(&path).unwrap();
        assert_eq!(summary.entries, 1);
        assert!(summary.uncompressed_bytes > 0);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = validate_plugin_archive(&dir.path().join("absent.zip")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidArchive(_)));
    }

    #[test]
    fn test_wrong_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = plugin_zip(dir.path(), "hello");
        let renamed = dir.path().join("hello.tar");
        std::fs::rename(&path, &renamed).unwrap();

        assert!(matches!(validate_plugin_archive(&renamed), Err(ApiError::InvalidArchive(_))));
    }

    #[test]
    fn test_not_a_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.zip");
        std::fs::write(&path, b"definitely not a zip archive").unwrap();

        assert!(matches!(validate_plugin_archive(&path), Err(ApiError::InvalidArchive(_))));
    }

    #[test]
    fn test_truncated_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = plugin_zip(dir.path(), "hello");
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        assert!(matches!(validate_plugin_archive(&path), Err(ApiError::InvalidArchive(_))));
    }
}
