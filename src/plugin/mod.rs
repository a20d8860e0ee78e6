//! Site plugins: discover content at a URL and merge its fetched artifacts.
//!
//! # Architecture
//!
//! - [`Plugin`] - Async trait that individual plugins implement
//! - [`PluginRegistry`] - Ordered plugin collection with a generic fallback
//! - [`GenericPlugin`] - Fallback that treats any URL as a single file

mod error;
mod generic;
mod registry;

pub use error::PluginError;
pub use generic::GenericPlugin;
pub use registry::{PluginRegistry, build_default_plugin_registry};

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use url::Url;

use crate::model::{Content, Manifest};

/// Domain entry matching any host.
pub const ANY_DOMAIN: &str = "*";

/// Site-specific content discovery and merging.
///
/// # Object Safety
///
/// This trait uses `async_trait` to support dynamic dispatch via
/// `Box<dyn Plugin>` in the [`PluginRegistry`].
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Returns the plugin's display name.
    fn name(&self) -> &str;

    /// Hosts handled by the plugin (compared to the URL host);
    /// [`ANY_DOMAIN`] matches every host.
    fn domains(&self) -> &[&str];

    /// Returns true if the plugin can extract content from `url`.
    fn can_handle(&self, url: &Url) -> bool;

    /// Discovers the content available at `url`.
    ///
    /// Variants of the same content share an id and are yielded consecutively.
    async fn extract_content(&self, url: &Url) -> Result<Vec<Content>, PluginError>;

    /// Merges the artifacts of `manifest` into a single file at `to_path`.
    async fn write_content(&self, manifest: &Manifest, to_path: &Path) -> Result<PathBuf, PluginError>;
}
