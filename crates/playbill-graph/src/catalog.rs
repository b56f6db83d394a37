//! The registered entity types of the Playbill catalog.
//!
//! Each type contributes its capability row: uniqueness key, list
//! ordering, extra validation, and whatever Cypher it needs beyond the
//! generic templates. Query bodies assume the normalizer's parameter
//! names plus `$now`.

use playbill_core::{validate, Entity};

use crate::templates::{QuerySet, Registry, TypeSpec};

/// The standard registry: Play, Production, Venue.
pub fn registry() -> Registry {
    let mut registry = Registry::new();
    registry.register(play());
    registry.register(production());
    registry.register(venue());
    registry
}

// ── Play ──────────────────────────────────────────────────────────
//
// Unique by title plus an optional differentiator (revival year, city,
// whatever tells two same-titled plays apart). A play with staged
// productions cannot be deleted.

fn play() -> TypeSpec {
    TypeSpec {
        kind: "Play",
        unique_keys: &["name", "differentiator"],
        order_by: "n.name, n.differentiator",
        optional_params: &["differentiator"],
        validate: None,
        queries: QuerySet {
            create: Some(play_create),
            update: Some(play_update),
            show: Some(play_show),
            unique_check: Some(play_unique_check),
            delete_check: Some(play_delete_check),
            ..QuerySet::default()
        },
    }
}

fn play_create(kind: &str) -> String {
    format!(
        "CREATE (p:{kind} {{uuid: $uuid, name: $name, differentiator: $differentiator,
                 created_at: $now, updated_at: $now}})
         RETURN p {{ .*, kind: '{kind}' }} AS record"
    )
}

fn play_update(kind: &str) -> String {
    format!(
        "MATCH (p:{kind} {{uuid: $uuid}})
         SET p.name = $name, p.differentiator = $differentiator, p.updated_at = $now
         RETURN p {{ .*, kind: '{kind}' }} AS record"
    )
}

fn play_show(kind: &str) -> String {
    format!(
        "MATCH (p:{kind} {{uuid: $uuid}})
         OPTIONAL MATCH (p)<-[:PRODUCTION_OF]-(pr:Production)
         WITH p, pr ORDER BY pr.name
         WITH p, collect(pr {{ .*, kind: 'Production' }}) AS productions
         RETURN p {{ .*, kind: '{kind}', productions: productions }} AS record"
    )
}

fn play_unique_check(kind: &str) -> String {
    format!(
        "MATCH (p:{kind})
         WHERE p.uuid <> $uuid
           AND p.name = $name
           AND coalesce(p.differentiator, '') = coalesce($differentiator, '')
         RETURN count(p) AS record"
    )
}

fn play_delete_check(kind: &str) -> String {
    format!(
        "MATCH (p:{kind} {{uuid: $uuid}})<-[:PRODUCTION_OF]-(:Production)
         RETURN DISTINCT 'productions' AS record"
    )
}

// ── Production ────────────────────────────────────────────────────
//
// A staging of a play: references its play and carries an ordered cast
// list. Role rows are replaced wholesale on update, in normalizer
// order.

fn production() -> TypeSpec {
    TypeSpec {
        kind: "Production",
        unique_keys: &["name"],
        order_by: "n.name",
        optional_params: &["roles"],
        validate: Some(validate_production),
        queries: QuerySet {
            create: Some(production_create),
            update: Some(production_update),
            delete: Some(production_delete),
            edit: Some(production_show),
            show: Some(production_show),
            ..QuerySet::default()
        },
    }
}

fn validate_production(entity: &mut Entity) {
    validate::require_saved_association(entity, "play");
}

fn production_create(kind: &str) -> String {
    format!(
        "MATCH (play:Play {{uuid: $play.uuid}})
         CREATE (pr:{kind} {{uuid: $uuid, name: $name, created_at: $now, updated_at: $now}})
         CREATE (pr)-[:PRODUCTION_OF]->(play)
         FOREACH (role IN coalesce($roles, []) |
             CREATE (pr)-[:HAS_ROLE]->(:Role {{uuid: role.uuid, name: role.name,
                 actor: role.actor, position: role.position,
                 created_at: $now, updated_at: $now}}))
         RETURN pr {{ .*, kind: '{kind}' }} AS record"
    )
}

fn production_update(kind: &str) -> String {
    format!(
        "MATCH (pr:{kind} {{uuid: $uuid}})
         SET pr.name = $name, pr.updated_at = $now
         WITH pr
         OPTIONAL MATCH (pr)-[:HAS_ROLE]->(stale:Role)
         DETACH DELETE stale
         WITH DISTINCT pr
         FOREACH (role IN coalesce($roles, []) |
             CREATE (pr)-[:HAS_ROLE]->(:Role {{uuid: role.uuid, name: role.name,
                 actor: role.actor, position: role.position,
                 created_at: $now, updated_at: $now}}))
         RETURN pr {{ .*, kind: '{kind}' }} AS record"
    )
}

fn production_delete(kind: &str) -> String {
    format!(
        "MATCH (pr:{kind} {{uuid: $uuid}})
         WITH pr, pr {{ .*, kind: '{kind}' }} AS record
         OPTIONAL MATCH (pr)-[:HAS_ROLE]->(role:Role)
         DETACH DELETE pr, role
         RETURN DISTINCT record"
    )
}

fn production_show(kind: &str) -> String {
    format!(
        "MATCH (pr:{kind} {{uuid: $uuid}})
         OPTIONAL MATCH (pr)-[:HAS_ROLE]->(role:Role)
         WITH pr, role ORDER BY role.position
         WITH pr, collect(role {{ .*, kind: 'Role' }}) AS roles
         RETURN pr {{ .*, kind: '{kind}', roles: roles,
             play: head([(pr)-[:PRODUCTION_OF]->(play:Play) | play {{ .*, kind: 'Play' }}])
         }} AS record"
    )
}

// ── Venue ─────────────────────────────────────────────────────────
//
// Mostly generic: only the mandatory show query plus create/update
// bodies that persist the capacity field.

fn venue() -> TypeSpec {
    TypeSpec {
        kind: "Venue",
        unique_keys: &["name"],
        order_by: "n.name",
        optional_params: &["capacity"],
        validate: Some(validate_venue),
        queries: QuerySet {
            create: Some(venue_create),
            update: Some(venue_update),
            show: Some(venue_show),
            ..QuerySet::default()
        },
    }
}

fn validate_venue(entity: &mut Entity) {
    validate::require_positive_int(entity, "capacity");
}

fn venue_create(kind: &str) -> String {
    format!(
        "CREATE (v:{kind} {{uuid: $uuid, name: $name, capacity: $capacity,
                 created_at: $now, updated_at: $now}})
         RETURN v {{ .*, kind: '{kind}' }} AS record"
    )
}

fn venue_update(kind: &str) -> String {
    format!(
        "MATCH (v:{kind} {{uuid: $uuid}})
         SET v.name = $name, v.capacity = $capacity, v.updated_at = $now
         RETURN v {{ .*, kind: '{kind}' }} AS record"
    )
}

fn venue_show(kind: &str) -> String {
    format!(
        "MATCH (v:{kind} {{uuid: $uuid}})
         RETURN v {{ .*, kind: '{kind}' }} AS record"
    )
}
