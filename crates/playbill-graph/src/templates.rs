//! Query template registry: per-type Cypher overrides with generic
//! fallbacks.
//!
//! Dispatch is a data structure: one [`TypeSpec`] capability row per
//! kind, consulted before the generic templates, so what a type
//! customizes is inspectable rather than buried in inheritance. Every
//! template returns a single column aliased `record`; custom bodies may
//! assume parameter names exactly matching the normalizer's output, plus
//! `$now`.

use std::collections::HashMap;

use playbill_core::Entity;

use crate::client::StoreError;

/// Lifecycle and check operations a type may override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Delete,
    Edit,
    Show,
    List,
    UniqueCheck,
    DeleteCheck,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Edit => "edit",
            Operation::Show => "show",
            Operation::List => "list",
            Operation::UniqueCheck => "validate-uniqueness",
            Operation::DeleteCheck => "validate-delete",
        }
    }
}

/// A pure function from a type name to a parameterized Cypher body.
pub type QueryFn = fn(&str) -> String;

/// Per-type query overrides. Unset entries fall back to the generic
/// templates; `show` has no generic fallback and must be registered for
/// every persisted type.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuerySet {
    pub create: Option<QueryFn>,
    pub update: Option<QueryFn>,
    pub delete: Option<QueryFn>,
    pub edit: Option<QueryFn>,
    pub show: Option<QueryFn>,
    pub list: Option<QueryFn>,
    pub unique_check: Option<QueryFn>,
    pub delete_check: Option<QueryFn>,
}

impl QuerySet {
    fn get(&self, operation: Operation) -> Option<QueryFn> {
        match operation {
            Operation::Create => self.create,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
            Operation::Edit => self.edit,
            Operation::Show => self.show,
            Operation::List => self.list,
            Operation::UniqueCheck => self.unique_check,
            Operation::DeleteCheck => self.delete_check,
        }
    }
}

/// Capability row for one entity type.
#[derive(Debug, Clone, Copy)]
pub struct TypeSpec {
    /// Type discriminator; doubles as the Neo4j label.
    pub kind: &'static str,
    /// Field combination the store treats as required-distinct per type.
    pub unique_keys: &'static [&'static str],
    /// ORDER BY body for list queries (`n` is the matched node).
    pub order_by: &'static str,
    /// Parameters the type's Cypher references that input may omit;
    /// padded with null before execution.
    pub optional_params: &'static [&'static str],
    /// Additional local validation beyond the universal name requirement.
    pub validate: Option<fn(&mut Entity)>,
    pub queries: QuerySet,
}

/// Capability table: kind → [`TypeSpec`].
#[derive(Debug, Default)]
pub struct Registry {
    types: HashMap<&'static str, TypeSpec>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    pub fn register(&mut self, spec: TypeSpec) {
        self.types.insert(spec.kind, spec);
    }

    pub fn spec(&self, kind: &str) -> Result<&TypeSpec, StoreError> {
        self.types
            .get(kind)
            .ok_or_else(|| StoreError::UnknownKind(kind.to_string()))
    }

    /// Resolve the Cypher body for `(kind, operation)`: the registered
    /// override when present, else the generic template. `show` has no
    /// generic form; displayable shape is inherently type-specific.
    pub fn query(&self, kind: &str, operation: Operation) -> Result<String, StoreError> {
        let spec = self.spec(kind)?;
        if let Some(custom) = spec.queries.get(operation) {
            return Ok(custom(spec.kind));
        }
        match operation {
            Operation::Create => Ok(generic_create(spec.kind)),
            Operation::Update => Ok(generic_update(spec.kind)),
            Operation::Delete => Ok(generic_delete(spec.kind)),
            Operation::Edit => Ok(generic_edit(spec.kind)),
            Operation::List => Ok(generic_list(spec.kind, spec.order_by)),
            Operation::UniqueCheck => Ok(generic_unique_check(spec.kind)),
            Operation::Show | Operation::DeleteCheck => Err(StoreError::MissingQuery {
                kind: kind.to_string(),
                operation: operation.name(),
            }),
        }
    }

    /// The referential-integrity check run before delete, if the type
    /// registers one. There is no generic form: absence means "no check".
    pub fn delete_check(&self, kind: &str) -> Result<Option<String>, StoreError> {
        let spec = self.spec(kind)?;
        Ok(spec.queries.delete_check.map(|custom| custom(spec.kind)))
    }
}

// ── Generic templates ─────────────────────────────────────────────
//
// Parameterized only by the type name and the standard identity and
// display-name fields.

fn generic_create(label: &str) -> String {
    format!(
        "CREATE (n:{label} {{uuid: $uuid, name: $name, created_at: $now, updated_at: $now}})
         RETURN n {{ .*, kind: '{label}' }} AS record"
    )
}

fn generic_update(label: &str) -> String {
    format!(
        "MATCH (n:{label} {{uuid: $uuid}})
         SET n.name = $name, n.updated_at = $now
         RETURN n {{ .*, kind: '{label}' }} AS record"
    )
}

fn generic_delete(label: &str) -> String {
    format!(
        "MATCH (n:{label} {{uuid: $uuid}})
         WITH n, n {{ .*, kind: '{label}' }} AS record
         DETACH DELETE n
         RETURN record"
    )
}

fn generic_edit(label: &str) -> String {
    format!(
        "MATCH (n:{label} {{uuid: $uuid}})
         RETURN n {{ .*, kind: '{label}' }} AS record"
    )
}

fn generic_list(label: &str, order_by: &str) -> String {
    format!(
        "MATCH (n:{label})
         RETURN n {{ .*, kind: '{label}' }} AS record
         ORDER BY {order_by}"
    )
}

fn generic_unique_check(label: &str) -> String {
    format!(
        "MATCH (n:{label})
         WHERE n.uuid <> $uuid AND n.name = $name
         RETURN count(n) AS record"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom_show(kind: &str) -> String {
        format!("MATCH (n:{kind}) RETURN n {{ .* }} AS record")
    }

    fn minimal_spec(queries: QuerySet) -> TypeSpec {
        TypeSpec {
            kind: "Venue",
            unique_keys: &["name"],
            order_by: "n.name",
            optional_params: &[],
            validate: None,
            queries,
        }
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let registry = Registry::new();
        assert!(matches!(
            registry.query("Ghost", Operation::Edit),
            Err(StoreError::UnknownKind(kind)) if kind == "Ghost"
        ));
    }

    #[test]
    fn unregistered_operations_fall_back_to_generic_templates() {
        let mut registry = Registry::new();
        registry.register(minimal_spec(QuerySet::default()));

        let create = registry.query("Venue", Operation::Create).unwrap();
        assert!(create.contains("CREATE (n:Venue"));
        assert!(create.contains("$uuid"));
        assert!(create.contains("$now"));

        let list = registry.query("Venue", Operation::List).unwrap();
        assert!(list.contains("ORDER BY n.name"));

        let unique = registry.query("Venue", Operation::UniqueCheck).unwrap();
        assert!(unique.contains("n.uuid <> $uuid"));
        assert!(unique.contains("count(n) AS record"));
    }

    #[test]
    fn custom_queries_win_over_generic_templates() {
        let mut registry = Registry::new();
        registry.register(minimal_spec(QuerySet {
            edit: Some(custom_show),
            ..QuerySet::default()
        }));

        let edit = registry.query("Venue", Operation::Edit).unwrap();
        assert_eq!(edit, custom_show("Venue"));
    }

    #[test]
    fn show_has_no_generic_fallback() {
        let mut registry = Registry::new();
        registry.register(minimal_spec(QuerySet::default()));

        assert!(matches!(
            registry.query("Venue", Operation::Show),
            Err(StoreError::MissingQuery { operation: "show", .. })
        ));

        let mut registry = Registry::new();
        registry.register(minimal_spec(QuerySet {
            show: Some(custom_show),
            ..QuerySet::default()
        }));
        assert!(registry.query("Venue", Operation::Show).is_ok());
    }

    #[test]
    fn delete_check_is_optional() {
        let mut registry = Registry::new();
        registry.register(minimal_spec(QuerySet::default()));
        assert_eq!(registry.delete_check("Venue").unwrap(), None);

        let mut registry = Registry::new();
        registry.register(minimal_spec(QuerySet {
            delete_check: Some(custom_show),
            ..QuerySet::default()
        }));
        assert!(registry.delete_check("Venue").unwrap().is_some());
    }
}
