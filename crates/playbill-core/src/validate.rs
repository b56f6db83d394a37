//! Local field validation and error aggregation.
//!
//! Validators mutate only the entity's error bag. The aggregate scan is a
//! pure recursive walk over the tagged tree.

use crate::types::{Association, Entity, Scalar};

/// Message attached when a store-side uniqueness check fails.
pub const ALREADY_EXISTS: &str = "already exists";

/// Message attached when a required value is missing or blank.
pub const BLANK: &str = "can't be blank";

/// True iff any node reachable from `entity` carries a non-empty error
/// bag. Short-circuits on the first positive; an empty `errors` map is
/// "no errors".
pub fn has_errors(entity: &Entity) -> bool {
    if !entity.errors.is_empty() {
        return true;
    }
    entity
        .associations
        .values()
        .any(|association| match association {
            Association::One(child) => has_errors(child),
            Association::Many(children) => children.iter().any(has_errors),
        })
}

/// The display name must be present and non-blank.
pub fn require_name(entity: &mut Entity) {
    let blank = entity
        .name
        .as_deref()
        .map_or(true, |name| name.trim().is_empty());
    if blank {
        entity.add_error("name", BLANK);
    }
}

/// A scalar field must be present and non-blank.
pub fn require_field(entity: &mut Entity, field: &str) {
    let blank = match entity.fields.get(field) {
        None | Some(Scalar::Null) => true,
        Some(Scalar::Text(text)) => text.trim().is_empty(),
        Some(_) => false,
    };
    if blank {
        entity.add_error(field, BLANK);
    }
}

/// A single association must be present and reference a saved entity.
pub fn require_saved_association(entity: &mut Entity, association: &str) {
    let saved = match entity.associations.get(association) {
        Some(Association::One(child)) => child.id.as_deref().is_some_and(|id| !id.is_empty()),
        _ => false,
    };
    if !saved {
        entity.add_error(association, "must reference a saved record");
    }
}

/// An optional numeric field must be a non-negative integer when present.
pub fn require_positive_int(entity: &mut Entity, field: &str) {
    match entity.fields.get(field) {
        None | Some(Scalar::Null) => {}
        Some(Scalar::Int(value)) if *value >= 0 => {}
        Some(_) => entity.add_error(field, "must be a non-negative number"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(kind: &str, name: &str) -> Entity {
        let mut entity = Entity::new(kind);
        entity.name = Some(name.to_string());
        entity
    }

    #[test]
    fn clean_tree_has_no_errors() {
        let mut production = named("Production", "Winter run");
        production.associate_one("play", named("Play", "Hamlet"));
        production.associate_many("roles", vec![named("Role", "Hamlet")]);

        assert!(!has_errors(&production));
    }

    #[test]
    fn root_errors_are_detected() {
        let mut play = named("Play", "Hamlet");
        play.add_error("name", ALREADY_EXISTS);
        assert!(has_errors(&play));
    }

    #[test]
    fn nested_single_association_errors_are_detected() {
        let mut play = named("Play", "Hamlet");
        play.add_error("name", BLANK);
        let mut production = named("Production", "Winter run");
        production.associate_one("play", play);

        assert!(has_errors(&production));
    }

    #[test]
    fn deep_list_member_errors_are_detected() {
        let mut role = named("Role", "Hamlet");
        role.add_error("actor", BLANK);
        let mut production = named("Production", "Winter run");
        production.associate_many("roles", vec![named("Role", "Ophelia"), role]);
        let mut play = named("Play", "Hamlet");
        play.associate_many("productions", vec![production]);

        assert!(has_errors(&play));
    }

    #[test]
    fn empty_error_maps_do_not_count() {
        let mut production = named("Production", "Winter run");
        production.associate_many("roles", vec![named("Role", "Hamlet")]);
        // Every level has an errors map; all of them are empty.
        assert!(!has_errors(&production));
    }

    #[test]
    fn aggregation_is_idempotent() {
        let mut play = named("Play", "Hamlet");
        play.add_error("name", ALREADY_EXISTS);
        assert!(has_errors(&play));
        assert!(has_errors(&play));
    }

    #[test]
    fn require_name_flags_missing_and_blank() {
        let mut missing = Entity::new("Play");
        require_name(&mut missing);
        assert_eq!(missing.errors["name"], vec![BLANK.to_string()]);

        let mut blank = named("Play", "   ");
        require_name(&mut blank);
        assert_eq!(blank.errors["name"], vec![BLANK.to_string()]);

        let mut filled = named("Play", "Hamlet");
        require_name(&mut filled);
        assert!(filled.errors.is_empty());
    }

    #[test]
    fn require_field_flags_missing_null_and_blank() {
        let mut entity = named("Venue", "The Globe");
        require_field(&mut entity, "city");
        assert!(entity.errors.contains_key("city"));

        let mut entity = named("Venue", "The Globe");
        entity.set_field("city", Scalar::Null);
        require_field(&mut entity, "city");
        assert!(entity.errors.contains_key("city"));

        let mut entity = named("Venue", "The Globe");
        entity.set_field("city", Scalar::Text("London".to_string()));
        require_field(&mut entity, "city");
        assert!(entity.errors.is_empty());
    }

    #[test]
    fn require_saved_association_needs_an_identity() {
        let mut production = named("Production", "Winter run");
        require_saved_association(&mut production, "play");
        assert!(production.errors.contains_key("play"));

        let mut production = named("Production", "Winter run");
        production.associate_one("play", named("Play", "Hamlet"));
        require_saved_association(&mut production, "play");
        assert!(production.errors.contains_key("play"));

        let mut production = named("Production", "Winter run");
        let mut play = named("Play", "Hamlet");
        play.id = Some("p-1".to_string());
        production.associate_one("play", play);
        require_saved_association(&mut production, "play");
        assert!(production.errors.is_empty());
    }

    #[test]
    fn require_positive_int_allows_absent_values() {
        let mut venue = named("Venue", "The Globe");
        require_positive_int(&mut venue, "capacity");
        assert!(venue.errors.is_empty());

        venue.set_field("capacity", Scalar::Int(857));
        require_positive_int(&mut venue, "capacity");
        assert!(venue.errors.is_empty());

        venue.set_field("capacity", Scalar::Int(-1));
        require_positive_int(&mut venue, "capacity");
        assert!(venue.errors.contains_key("capacity"));

        let mut venue = named("Venue", "The Globe");
        venue.set_field("capacity", Scalar::Text("lots".to_string()));
        require_positive_int(&mut venue, "capacity");
        assert!(venue.errors.contains_key("capacity"));
    }
}
