//! Packaged-asset stores for the Kestrel bridge.
//!
//! The bridge core resolves every bundle location without a leading `/`
//! through an [`kestrel_bridge::AssetStore`]. This crate provides the two
//! stores a host typically needs: a plain directory during development
//! and an archive (the packaged-app analogue) in production.

mod dir;
mod zip_store;

pub use dir::DirAssetStore;
pub use zip_store::ZipAssetStore;
