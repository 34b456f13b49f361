//! Remote mod registry: normalized data model and query client.

pub mod client;
pub mod types;

pub use client::{ModrinthClient, Registry};
#[cfg(test)]
pub use client::MockRegistry;
pub use types::{
    DependencyKind, DependencyRelation, FileRef, ProjectId, ProjectInfo, Stability,
    VersionCandidate, VersionId,
};
