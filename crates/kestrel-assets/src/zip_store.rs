//! Archive-backed asset store.
//!
//! Packaged applications ship their bundles inside a zip archive; this
//! store serves asset locations straight out of one without unpacking it
//! to disk.

use parking_lot::Mutex;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use kestrel_bridge::{AssetError, AssetStore, ScriptBuffer};
use zip::result::ZipError;
use zip::ZipArchive;

/// Asset store reading entries from a zip archive.
///
/// The archive handle needs `&mut` to read an entry, so it sits behind a
/// mutex; reads from different locations serialize on it.
pub struct ZipAssetStore {
    archive: Mutex<ZipArchive<File>>,
}

impl ZipAssetStore {
    /// Open the archive at `path`.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::open(path.as_ref())?;
        let archive = ZipArchive::new(file).map_err(std::io::Error::other)?;
        Ok(Self {
            archive: Mutex::new(archive),
        })
    }

    /// Number of entries in the archive.
    pub fn len(&self) -> usize {
        self.archive.lock().len()
    }

    /// True when the archive has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AssetStore for ZipAssetStore {
    fn load(&self, location: &str) -> Result<ScriptBuffer, AssetError> {
        let mut archive = self.archive.lock();
        let mut entry = match archive.by_name(location) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => {
                return Err(AssetError::NotFound(location.to_string()));
            }
            Err(err) => {
                return Err(AssetError::Unreadable {
                    location: location.to_string(),
                    message: err.to_string(),
                });
            }
        };

        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut bytes)
            .map_err(|err| AssetError::Unreadable {
                location: location.to_string(),
                message: err.to_string(),
            })?;
        Ok(ScriptBuffer::new(bytes, location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn archive_with(entries: &[(&str, &[u8])]) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut writer = ZipWriter::new(file.reopen().unwrap());
        for (name, data) in entries {
            writer
                .start_file(name.to_string(), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap();
        file
    }

    #[test]
    fn test_loads_entry_by_location() {
        let file = archive_with(&[
            ("assets/platform.js", b"platform"),
            ("assets/main.js", b"user"),
        ]);
        let store = ZipAssetStore::open(file.path()).unwrap();

        let buffer = store.load("assets/main.js").unwrap();
        assert_eq!(buffer.bytes(), b"user");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_missing_entry_is_not_found() {
        let file = archive_with(&[("assets/main.js", b"user")]);
        let store = ZipAssetStore::open(file.path()).unwrap();
        assert!(matches!(
            store.load("assets/other.js"),
            Err(AssetError::NotFound(_))
        ));
    }

    #[test]
    fn test_open_rejects_non_archive() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"not a zip").unwrap();
        assert!(ZipAssetStore::open(file.path()).is_err());
    }
}
