//! The lifecycle engine: create / update / edit / delete / show / list.
//!
//! Composes local validation, the store-side checks, normalization, and
//! templated execution. Validation failures come back as data on the
//! entity's error bag; NotFound and backend failures are raised as
//! [`StoreError`].

use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};

use playbill_core::{has_errors, normalize, validate, Entity, IdSource, UuidIds};

use crate::client::{FetchOptions, GraphClient, StoreError};
use crate::templates::{Operation, Registry, TypeSpec};

/// Uniform persistence lifecycle over the registered types.
///
/// Holds the pooled client, the capability table, and the identity
/// source injected into normalization. Every operation borrows a
/// connection for that call alone.
pub struct Engine {
    client: GraphClient,
    registry: Registry,
    ids: Arc<dyn IdSource + Send + Sync>,
}

impl Engine {
    /// Engine with v4 UUID identities.
    pub fn new(client: GraphClient, registry: Registry) -> Engine {
        Engine::with_ids(client, registry, Arc::new(UuidIds))
    }

    /// Engine with an injected identity source (deterministic in tests).
    pub fn with_ids(
        client: GraphClient,
        registry: Registry,
        ids: Arc<dyn IdSource + Send + Sync>,
    ) -> Engine {
        Engine {
            client,
            registry,
            ids,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Create a new entity. Validation and uniqueness failures are
    /// returned on the entity without touching the store; the entity has
    /// no identity yet, so the uniqueness check excludes nothing.
    pub async fn create(&self, entity: Entity) -> Result<Entity, StoreError> {
        self.write(entity, Operation::Create).await
    }

    /// Update an existing entity. Same flow as create, except the
    /// uniqueness check excludes the entity's own identity.
    pub async fn update(&self, entity: Entity) -> Result<Entity, StoreError> {
        self.write(entity, Operation::Update).await
    }

    async fn write(&self, mut entity: Entity, operation: Operation) -> Result<Entity, StoreError> {
        let spec = self.registry.spec(&entity.kind)?;

        run_validations(spec, &mut entity);
        if has_errors(&entity) {
            return Ok(entity);
        }

        if self.uniqueness_conflict(spec, &entity).await? {
            attach_conflicts(spec, &mut entity);
            return Ok(entity);
        }

        let cypher = self.registry.query(&entity.kind, operation)?;
        let params = self.write_params(spec, &entity);
        let record = self
            .client
            .fetch(&entity.kind, &cypher, &params, FetchOptions::default())
            .await?
            .record();
        let saved = hydrate(&entity.kind, record)?;
        tracing::info!(
            kind = %saved.kind,
            uuid = saved.id.as_deref().unwrap_or_default(),
            operation = operation.name(),
            "Persisted entity"
        );
        Ok(saved)
    }

    /// One dedicated read: does another record of this kind share the
    /// uniqueness key? This check and the later write are separate
    /// round-trips; concurrent writers can both pass (see DESIGN.md).
    async fn uniqueness_conflict(
        &self,
        spec: &TypeSpec,
        entity: &Entity,
    ) -> Result<bool, StoreError> {
        let cypher = self.registry.query(spec.kind, Operation::UniqueCheck)?;
        let mut params = Map::new();
        params.insert(
            "uuid".to_string(),
            Value::String(entity.id.clone().unwrap_or_default()),
        );
        for key in spec.unique_keys {
            params.insert((*key).to_string(), entity.scalar_value(key));
        }

        let conflicts = self
            .client
            .fetch(
                spec.kind,
                &cypher,
                &params,
                FetchOptions {
                    result_required: false,
                    return_as_list: false,
                },
            )
            .await?
            .record()
            .and_then(|record| record.as_i64())
            .unwrap_or(0);
        Ok(conflicts > 0)
    }

    fn write_params(&self, spec: &TypeSpec, entity: &Entity) -> Map<String, Value> {
        let mut params = normalize(entity, self.ids.as_ref());
        for key in spec.optional_params {
            params.entry((*key).to_string()).or_insert(Value::Null);
        }
        params.insert("now".to_string(), Value::String(Utc::now().to_rfc3339()));
        params
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Fetch the persisted shape for an edit form. NotFound when the
    /// identity matches nothing.
    pub async fn edit(&self, entity: &Entity) -> Result<Entity, StoreError> {
        self.read(entity, Operation::Edit).await
    }

    /// Fetch the full associated-graph shape. Every type must register a
    /// show query; there is no generic fallback.
    pub async fn show(&self, entity: &Entity) -> Result<Entity, StoreError> {
        self.read(entity, Operation::Show).await
    }

    async fn read(&self, entity: &Entity, operation: Operation) -> Result<Entity, StoreError> {
        let cypher = self.registry.query(&entity.kind, operation)?;
        let record = self
            .client
            .fetch(
                &entity.kind,
                &cypher,
                &identity_params(entity),
                FetchOptions::default(),
            )
            .await?
            .record();
        hydrate(&entity.kind, record)
    }

    /// All instances of a kind, ordered by the type's rule. An empty
    /// result is success, never NotFound.
    pub async fn list(&self, kind: &str) -> Result<Vec<Entity>, StoreError> {
        let cypher = self.registry.query(kind, Operation::List)?;
        let records = self
            .client
            .fetch(
                kind,
                &cypher,
                &Map::new(),
                FetchOptions {
                    result_required: false,
                    return_as_list: true,
                },
            )
            .await?
            .records();
        records
            .iter()
            .map(|record| Entity::from_value(kind, record).map_err(StoreError::from))
            .collect()
    }

    // ── Delete ───────────────────────────────────────────────────

    /// Delete by identity, honoring the type's referential-integrity
    /// check. A guarded delete returns the entity with an `associations`
    /// error and leaves the store untouched; otherwise the pre-deletion
    /// representation comes back.
    pub async fn delete(&self, mut entity: Entity) -> Result<Entity, StoreError> {
        if let Some(check) = self.registry.delete_check(&entity.kind)? {
            let blocked = self
                .client
                .fetch(
                    &entity.kind,
                    &check,
                    &identity_params(&entity),
                    FetchOptions {
                        result_required: false,
                        return_as_list: true,
                    },
                )
                .await?
                .records();
            if !blocked.is_empty() {
                for association in &blocked {
                    let name = association.as_str().unwrap_or("records");
                    entity.add_error("associations", format!("cannot delete while {name} exist"));
                }
                return Ok(entity);
            }
        }

        let cypher = self.registry.query(&entity.kind, Operation::Delete)?;
        let record = self
            .client
            .fetch(
                &entity.kind,
                &cypher,
                &identity_params(&entity),
                FetchOptions::default(),
            )
            .await?
            .record();
        let deleted = hydrate(&entity.kind, record)?;
        tracing::info!(
            kind = %deleted.kind,
            uuid = deleted.id.as_deref().unwrap_or_default(),
            "Deleted entity"
        );
        Ok(deleted)
    }
}

/// Universal display-name requirement plus the type's own validator.
fn run_validations(spec: &TypeSpec, entity: &mut Entity) {
    validate::require_name(entity);
    if let Some(custom) = spec.validate {
        custom(entity);
    }
}

/// Attach the uniqueness failure to the key fields the entity actually
/// carries; a composite key with absent members still reports on the
/// present ones.
fn attach_conflicts(spec: &TypeSpec, entity: &mut Entity) {
    let carried: Vec<&str> = spec
        .unique_keys
        .iter()
        .copied()
        .filter(|key| entity.scalar_value(key) != Value::Null)
        .collect();
    if carried.is_empty() {
        entity.add_error("name", validate::ALREADY_EXISTS);
        return;
    }
    for key in carried {
        entity.add_error(key, validate::ALREADY_EXISTS);
    }
}

fn identity_params(entity: &Entity) -> Map<String, Value> {
    let mut params = Map::new();
    params.insert(
        "uuid".to_string(),
        Value::String(entity.id.clone().unwrap_or_default()),
    );
    params
}

/// Convert a returned record back into an Entity.
fn hydrate(kind: &str, record: Option<Value>) -> Result<Entity, StoreError> {
    let record = record.ok_or_else(|| StoreError::NotFound {
        kind: kind.to_string(),
        id: String::new(),
    })?;
    Entity::from_value(kind, &record).map_err(StoreError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::QuerySet;
    use playbill_core::Scalar;
    use serde_json::json;

    fn spec_with(
        unique_keys: &'static [&'static str],
        validator: Option<fn(&mut Entity)>,
    ) -> TypeSpec {
        TypeSpec {
            kind: "Play",
            unique_keys,
            order_by: "n.name",
            optional_params: &[],
            validate: validator,
            queries: QuerySet::default(),
        }
    }

    fn require_differentiator(entity: &mut Entity) {
        validate::require_field(entity, "differentiator");
    }

    #[test]
    fn run_validations_always_requires_a_name() {
        let spec = spec_with(&["name"], None);
        let mut entity = Entity::new("Play");
        run_validations(&spec, &mut entity);
        assert_eq!(entity.errors["name"], vec![validate::BLANK.to_string()]);
    }

    #[test]
    fn run_validations_appends_the_type_validator() {
        let spec = spec_with(&["name"], Some(require_differentiator));
        let mut entity = Entity::new("Play");
        entity.name = Some("Hamlet".to_string());
        run_validations(&spec, &mut entity);
        assert!(!entity.errors.contains_key("name"));
        assert!(entity.errors.contains_key("differentiator"));
    }

    #[test]
    fn attach_conflicts_targets_carried_key_fields() {
        let spec = spec_with(&["name", "differentiator"], None);

        let mut bare = Entity::new("Play");
        bare.name = Some("Hamlet".to_string());
        attach_conflicts(&spec, &mut bare);
        assert_eq!(
            bare.errors["name"],
            vec![validate::ALREADY_EXISTS.to_string()]
        );
        assert!(!bare.errors.contains_key("differentiator"));

        let mut full = Entity::new("Play");
        full.name = Some("Hamlet".to_string());
        full.set_field("differentiator", Scalar::Text("Broadway".to_string()));
        attach_conflicts(&spec, &mut full);
        assert!(full.errors.contains_key("name"));
        assert!(full.errors.contains_key("differentiator"));
    }

    #[test]
    fn identity_params_use_an_empty_uuid_for_unsaved_entities() {
        let entity = Entity::new("Play");
        assert_eq!(identity_params(&entity)["uuid"], json!(""));

        let mut saved = Entity::new("Play");
        saved.id = Some("p-1".to_string());
        assert_eq!(identity_params(&saved)["uuid"], json!("p-1"));
    }

    #[test]
    fn hydrate_raises_not_found_on_missing_records() {
        assert!(matches!(
            hydrate("Play", None),
            Err(StoreError::NotFound { .. })
        ));

        let entity = hydrate("Play", Some(json!({"uuid": "p-1", "name": "Hamlet"}))).unwrap();
        assert_eq!(entity.id.as_deref(), Some("p-1"));
    }
}
