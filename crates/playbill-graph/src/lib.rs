//! playbill-graph: Neo4j persistence for the Playbill catalog.
//!
//! The single mutation point for catalog data. A uniform lifecycle
//! (create / update / edit / delete / show / list) runs over the
//! registered types; each type contributes its field shape and any
//! specialized Cypher through the template registry.

pub mod catalog;
pub mod client;
pub mod lifecycle;
pub mod templates;

pub use client::{FetchOptions, Fetched, GraphClient, GraphConfig, StoreError};
pub use lifecycle::Engine;
pub use templates::{Operation, QuerySet, Registry, TypeSpec};
