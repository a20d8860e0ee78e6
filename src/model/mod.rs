//! Data model shared by plugins, downloaders and the service pipeline.
//!
//! - [`Resource`] / [`HttpResource`] - one fetchable request belonging to a content item
//! - [`Content`] - one discovered downloadable unit (video, image, document, ...)
//! - [`Manifest`] - ordered mapping of fetched resources to their staging files

mod content;
mod resource;

pub use content::{Artifact, Checksum, Content, ContentMetadata, Manifest, extension_from_mime};
pub use resource::{HttpMethod, HttpResource, Resource, ResourceKind};
