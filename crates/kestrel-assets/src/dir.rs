//! Directory-backed asset store.

use std::path::{Component, Path, PathBuf};

use kestrel_bridge::{AssetError, AssetStore, ScriptBuffer};

/// Asset store rooted at a directory on disk.
///
/// Locations are interpreted relative to the root. Locations that would
/// escape the root (`..` components) are reported as not found rather
/// than resolved.
pub struct DirAssetStore {
    root: PathBuf,
}

impl DirAssetStore {
    /// Create a store over `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory assets are served from.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetStore for DirAssetStore {
    fn load(&self, location: &str) -> Result<ScriptBuffer, AssetError> {
        let relative = Path::new(location);
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(AssetError::NotFound(location.to_string()));
        }

        let path = self.root.join(relative);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(ScriptBuffer::new(bytes, location)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(AssetError::NotFound(location.to_string()))
            }
            Err(err) => Err(AssetError::Unreadable {
                location: location.to_string(),
                message: err.to_string(),
            }),
        }
    }
}
