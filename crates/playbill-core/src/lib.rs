//! playbill-core: entity model, normalization, and validation for the
//! Playbill catalog.
//!
//! This crate is pure (no I/O, no store types). It provides:
//! - the [`types::Entity`] model with its tagged field representation
//! - [`normalize`], the store-parameter normalizer
//! - [`validate`], local field validators and the error aggregate scan
//! - [`error::PlaybillError`]

pub mod error;
pub mod normalize;
pub mod types;
pub mod validate;

pub use error::PlaybillError;
pub use normalize::{normalize, IdSource, UuidIds};
pub use types::{Association, Entity, Scalar};
pub use validate::has_errors;
