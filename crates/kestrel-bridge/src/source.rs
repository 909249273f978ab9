//! Script source resolution.
//!
//! A bundle location is either a filesystem path or a packaged-asset
//! reference, decided by one prefix test: locations starting with `/` go
//! to the filesystem, everything else goes to the asset store. The test
//! is deliberately not a URL parse — widening it would silently move
//! ambiguous locations to a different storage backend.

use std::path::Path;

use crate::error::BridgeError;

/// Byte-bearing script handle produced by resolution.
#[derive(Debug, Clone)]
pub struct ScriptBuffer {
    bytes: Vec<u8>,
    origin: String,
}

impl ScriptBuffer {
    /// Wrap raw script bytes with the location they came from.
    pub fn new(bytes: Vec<u8>, origin: impl Into<String>) -> Self {
        Self {
            bytes,
            origin: origin.into(),
        }
    }

    /// The script bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The location this buffer was resolved from.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Byte length.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True when the buffer holds no bytes. An empty buffer is still a
    /// successfully resolved script; whether it is acceptable is the
    /// executor's call.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Failure reported by an asset store.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// No asset exists at the requested location.
    #[error("asset not found: '{0}'")]
    NotFound(String),

    /// The asset exists but could not be read.
    #[error("asset unreadable: '{location}': {message}")]
    Unreadable {
        /// The requested location
        location: String,
        /// Store-specific detail
        message: String,
    },
}

/// Packaged-asset store collaborator.
///
/// Resolves asset references (locations without a leading `/`) to script
/// bytes. Concrete stores live outside the core; `kestrel-assets`
/// provides directory- and archive-backed implementations.
pub trait AssetStore: Send + Sync {
    /// Load the asset at `location`.
    fn load(&self, location: &str) -> Result<ScriptBuffer, AssetError>;
}

/// True iff `location` names a filesystem path.
///
/// Exactly the leading-`/` prefix test, bit-for-bit. Relative paths,
/// `file:` URLs, and drive prefixes are all asset references by this
/// rule.
pub fn is_file_path(location: &str) -> bool {
    location.starts_with('/')
}

/// Resolve a bundle location to script bytes.
///
/// Filesystem paths are read directly; everything else goes through the
/// asset store. Any not-found or unreadable outcome maps to
/// [`BridgeError::ScriptNotFound`] so the loading sequence can fail fast
/// with the offending location attached.
pub fn resolve(location: &str, assets: &dyn AssetStore) -> Result<ScriptBuffer, BridgeError> {
    if is_file_path(location) {
        let bytes = std::fs::read(Path::new(location)).map_err(|_| BridgeError::ScriptNotFound {
            location: location.to_string(),
        })?;
        Ok(ScriptBuffer::new(bytes, location))
    } else {
        assets
            .load(location)
            .map_err(|_| BridgeError::ScriptNotFound {
                location: location.to_string(),
            })
    }
}
