//! Bundle descriptors.

/// Immutable descriptor of one loadable script bundle.
///
/// An empty `source_location` is a valid "absent bundle" sentinel: the
/// loading sequence skips it without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleInfo {
    /// Where the bundle bytes live: a filesystem path (leading `/`) or a
    /// packaged-asset reference (anything else).
    pub source_location: String,

    /// Version tag handed to the executor alongside the script.
    pub version: u32,
}

impl BundleInfo {
    /// Create a bundle descriptor.
    pub fn new(source_location: impl Into<String>, version: u32) -> Self {
        Self {
            source_location: source_location.into(),
            version,
        }
    }

    /// True when this descriptor is the absent-bundle sentinel.
    pub fn is_absent(&self) -> bool {
        self.source_location.is_empty()
    }
}
