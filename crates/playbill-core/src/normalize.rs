//! Store-parameter normalization.
//!
//! [`normalize`] turns an entity tree into the parameter tree its Cypher
//! body receives: unfilled placeholder rows are pruned from list
//! associations, surviving members get contiguous `position` ordinals,
//! and any entity without an identity is assigned a fresh one. The input
//! is never mutated. Identity generation is injected via [`IdSource`] so
//! tests can substitute deterministic sequences.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::types::{Association, Entity};

/// Source of fresh identities for entities that lack one.
pub trait IdSource {
    fn next_id(&self) -> String;
}

/// Production source: random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Normalize an entity tree into store-ready parameters.
///
/// The output mirrors the input minus pruned placeholders: every
/// surviving list member carries a contiguous zero-based `position`, and
/// every level carries a `uuid`. Scalars pass through unchanged.
pub fn normalize(entity: &Entity, ids: &dyn IdSource) -> Map<String, Value> {
    normalize_level(entity, ids, None)
}

fn normalize_level(
    entity: &Entity,
    ids: &dyn IdSource,
    position: Option<usize>,
) -> Map<String, Value> {
    let mut params = Map::new();

    let id = match &entity.id {
        Some(id) if !id.is_empty() => id.clone(),
        _ => ids.next_id(),
    };
    params.insert("uuid".to_string(), Value::String(id));

    if let Some(name) = &entity.name {
        params.insert("name".to_string(), Value::String(name.clone()));
    }
    for (key, field) in &entity.fields {
        params.insert(key.clone(), field.to_value());
    }
    // Inserted after the scalar fields so the assigned ordinal wins over
    // any inbound `position` value.
    if let Some(position) = position {
        params.insert("position".to_string(), Value::from(position as i64));
    }

    for (key, association) in &entity.associations {
        let value = match association {
            Association::One(child) => Value::Object(normalize_level(child, ids, None)),
            Association::Many(children) => Value::Array(
                children
                    .iter()
                    .filter(|child| !placeholder(child))
                    .enumerate()
                    .map(|(index, child)| Value::Object(normalize_level(child, ids, Some(index))))
                    .collect(),
            ),
        };
        params.insert(key.clone(), value);
    }

    params
}

/// An unfilled form row: a `name` present but blank once trimmed.
/// Members without a `name` at all are never pruned on that basis.
fn placeholder(entity: &Entity) -> bool {
    matches!(&entity.name, Some(name) if name.trim().is_empty())
}
