//! Tag Manager API v2: resource model, wire client and the CWV resource set.

pub mod client;
pub mod errors;
pub mod resources;
pub mod types;

pub use client::{ResourceApi, TagManagerClient};
pub use errors::{CreationError, CreationErrorKind};
pub use resources::VitalsVariable;
pub use types::{
    ResourceConfig, ResourceId, ResourceKind, ResourceRequest, WorkspacePath,
};
