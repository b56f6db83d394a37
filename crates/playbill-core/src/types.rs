//! Core entity model for the Playbill catalog.
//!
//! An [`Entity`] is the in-memory record of one persisted instance: type
//! discriminator, identity, display name, scalar fields, named
//! associations, and validation error bag. Types differ only in which
//! fields and associations they carry, so the model uses a tagged
//! representation the normalizer and error aggregator match on
//! exhaustively.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::PlaybillError;

// ── Scalars ───────────────────────────────────────────────────────

/// A single scalar field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Convert a JSON value to a scalar. Objects and arrays are not
    /// scalars and yield `None`. Integers that fit `i64` stay integers;
    /// anything wider falls back to `f64`.
    pub fn from_value(value: &Value) -> Option<Scalar> {
        match value {
            Value::Null => Some(Scalar::Null),
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Scalar::Int(i)),
                None => n.as_f64().map(Scalar::Float),
            },
            Value::String(s) => Some(Scalar::Text(s.clone())),
            Value::Object(_) | Value::Array(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Int(i) => Value::from(*i),
            Scalar::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Scalar::Text(s) => Value::String(s.clone()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(i) => Some(*i),
            _ => None,
        }
    }
}

// ── Associations ──────────────────────────────────────────────────

/// A named relationship to a nested entity or an ordered collection of
/// nested entities.
#[derive(Debug, Clone, PartialEq)]
pub enum Association {
    One(Entity),
    Many(Vec<Entity>),
}

// ── Entity ────────────────────────────────────────────────────────

/// In-memory record of one persisted instance, its associations, and its
/// validation error bag.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Type discriminator; doubles as the Neo4j label (e.g. `"Play"`).
    pub kind: String,
    /// Identity (the `uuid` node property). Absent until saved or fetched.
    pub id: Option<String>,
    /// Display name (the `name` node property).
    pub name: Option<String>,
    /// Remaining scalar fields.
    pub fields: BTreeMap<String, Scalar>,
    /// Named nested shapes.
    pub associations: BTreeMap<String, Association>,
    /// Validation error bag: field → messages. Present, possibly empty,
    /// at every nesting level.
    pub errors: BTreeMap<String, Vec<String>>,
}

impl Entity {
    pub fn new(kind: impl Into<String>) -> Entity {
        Entity {
            kind: kind.into(),
            id: None,
            name: None,
            fields: BTreeMap::new(),
            associations: BTreeMap::new(),
            errors: BTreeMap::new(),
        }
    }

    /// Build an entity tree from merged route/body input or from a store
    /// record.
    ///
    /// `uuid`, `name`, and `kind` are pulled out of the map (a `kind` key
    /// in the record overrides the hint); other scalar members land in
    /// `fields`; object members become single associations and array
    /// members become list associations, keyed by member name. Non-object
    /// list elements are dropped. An inbound `errors` key is ignored;
    /// the bag always starts empty.
    pub fn from_value(kind: &str, value: &Value) -> Result<Entity, PlaybillError> {
        let map = value.as_object().ok_or_else(|| {
            PlaybillError::Record(format!("expected an object for {kind}, got {value}"))
        })?;

        let kind = map.get("kind").and_then(Value::as_str).unwrap_or(kind);
        let mut entity = Entity::new(kind);

        for (key, member) in map {
            match (key.as_str(), member) {
                ("kind", _) | ("errors", _) => {}
                ("uuid", v) => entity.id = v.as_str().map(str::to_owned),
                ("name", v) => entity.name = v.as_str().map(str::to_owned),
                (_, Value::Object(_)) => {
                    let child = Entity::from_value(key, member)?;
                    entity
                        .associations
                        .insert(key.clone(), Association::One(child));
                }
                (_, Value::Array(members)) => {
                    let children = members
                        .iter()
                        .filter(|m| m.is_object())
                        .map(|m| Entity::from_value(key, m))
                        .collect::<Result<Vec<_>, _>>()?;
                    entity
                        .associations
                        .insert(key.clone(), Association::Many(children));
                }
                (_, scalar) => {
                    if let Some(scalar) = Scalar::from_value(scalar) {
                        entity.fields.insert(key.clone(), scalar);
                    }
                }
            }
        }

        Ok(entity)
    }

    /// Flat JSON rendering, the response shape routers return. Inverse
    /// of [`Entity::from_value`], with the error bag included at every
    /// level.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("kind".to_string(), Value::String(self.kind.clone()));
        if let Some(id) = &self.id {
            map.insert("uuid".to_string(), Value::String(id.clone()));
        }
        if let Some(name) = &self.name {
            map.insert("name".to_string(), Value::String(name.clone()));
        }
        for (key, field) in &self.fields {
            map.insert(key.clone(), field.to_value());
        }
        for (key, association) in &self.associations {
            let value = match association {
                Association::One(child) => child.to_value(),
                Association::Many(children) => {
                    Value::Array(children.iter().map(Entity::to_value).collect())
                }
            };
            map.insert(key.clone(), value);
        }

        let errors = self
            .errors
            .iter()
            .map(|(field, messages)| {
                let messages = messages.iter().cloned().map(Value::String).collect();
                (field.clone(), Value::Array(messages))
            })
            .collect();
        map.insert("errors".to_string(), Value::Object(errors));

        Value::Object(map)
    }

    /// Scalar lookup by parameter key, treating identity and display name
    /// as ordinary keys. Used to assemble uniqueness-check parameters.
    pub fn scalar_value(&self, key: &str) -> Value {
        match key {
            "uuid" => self.id.clone().map(Value::String).unwrap_or(Value::Null),
            "name" => self.name.clone().map(Value::String).unwrap_or(Value::Null),
            _ => self
                .fields
                .get(key)
                .map(Scalar::to_value)
                .unwrap_or(Value::Null),
        }
    }

    pub fn set_field(&mut self, key: impl Into<String>, value: Scalar) {
        self.fields.insert(key.into(), value);
    }

    pub fn associate_one(&mut self, key: impl Into<String>, child: Entity) {
        self.associations.insert(key.into(), Association::One(child));
    }

    pub fn associate_many(&mut self, key: impl Into<String>, children: Vec<Entity>) {
        self.associations
            .insert(key.into(), Association::Many(children));
    }

    pub fn add_error(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }
}
