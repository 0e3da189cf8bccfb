//! Entity field schema and typed field assignments.
//!
//! `EntityFields` is the cumulative partial record a session builds up turn
//! by turn. Every field is independently optional until commit time; the
//! schema defines which subset is required to materialize an entity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Enumerated temperament of a catalogued entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Temperament {
    Benevolent,
    Watchful,
    Capricious,
    Baleful,
}

impl fmt::Display for Temperament {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Temperament::Benevolent => "benevolent",
            Temperament::Watchful => "watchful",
            Temperament::Capricious => "capricious",
            Temperament::Baleful => "baleful",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Temperament {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "benevolent" => Ok(Temperament::Benevolent),
            "watchful" => Ok(Temperament::Watchful),
            "capricious" => Ok(Temperament::Capricious),
            "baleful" => Ok(Temperament::Baleful),
            other => Err(ValidationError::invalid_format(
                "temperament",
                format!("unknown temperament '{}'", other),
            )),
        }
    }
}

/// Names of the entity schema fields.
///
/// Wire names (`type`, `domain`, ...) are what tool payloads and the
/// dialogue service use; they also name fields in commit error lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldName {
    #[serde(rename = "type")]
    EntityType,
    Domain,
    Description,
    Corporeality,
    Luminance,
    Temperament,
    Lore,
    Capabilities,
}

impl FieldName {
    /// All schema fields, in declaration order.
    pub const ALL: [FieldName; 8] = [
        FieldName::EntityType,
        FieldName::Domain,
        FieldName::Description,
        FieldName::Corporeality,
        FieldName::Luminance,
        FieldName::Temperament,
        FieldName::Lore,
        FieldName::Capabilities,
    ];

    /// Fields that must be populated before an entity can be committed.
    pub const REQUIRED: [FieldName; 3] = [
        FieldName::EntityType,
        FieldName::Domain,
        FieldName::Description,
    ];

    /// Returns the wire name of this field.
    pub fn wire_name(&self) -> &'static str {
        match self {
            FieldName::EntityType => "type",
            FieldName::Domain => "domain",
            FieldName::Description => "description",
            FieldName::Corporeality => "corporeality",
            FieldName::Luminance => "luminance",
            FieldName::Temperament => "temperament",
            FieldName::Lore => "lore",
            FieldName::Capabilities => "capabilities",
        }
    }

    /// Returns true if this field is required for commit.
    pub fn is_required(&self) -> bool {
        Self::REQUIRED.contains(self)
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

/// Partial record of extracted entity fields.
///
/// Built up across turns by merging; never replaced wholesale. An empty
/// `capabilities` list means the field is unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityFields {
    /// Category/type of the entity (e.g. "Guardian").
    pub entity_type: Option<String>,
    /// Domain the entity belongs to (e.g. "Dream Threshold").
    pub domain: Option<String>,
    /// Textual description.
    pub description: Option<String>,
    /// How physically manifest the entity is, 0.0 (incorporeal) to 1.0.
    pub corporeality: Option<f32>,
    /// How visibly radiant the entity is, 0.0 to 1.0.
    pub luminance: Option<f32>,
    /// Enumerated temperament.
    pub temperament: Option<Temperament>,
    /// Free-text lore.
    pub lore: Option<String>,
    /// Named capabilities.
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl EntityFields {
    /// Creates an empty partial record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the given field holds a value.
    pub fn is_set(&self, field: FieldName) -> bool {
        match field {
            FieldName::EntityType => self.entity_type.is_some(),
            FieldName::Domain => self.domain.is_some(),
            FieldName::Description => self.description.is_some(),
            FieldName::Corporeality => self.corporeality.is_some(),
            FieldName::Luminance => self.luminance.is_some(),
            FieldName::Temperament => self.temperament.is_some(),
            FieldName::Lore => self.lore.is_some(),
            FieldName::Capabilities => !self.capabilities.is_empty(),
        }
    }

    /// Returns true if no field holds a value.
    pub fn is_empty(&self) -> bool {
        FieldName::ALL.iter().all(|f| !self.is_set(*f))
    }

    /// Returns the populated fields, in declaration order.
    pub fn populated(&self) -> Vec<FieldName> {
        FieldName::ALL
            .iter()
            .copied()
            .filter(|f| self.is_set(*f))
            .collect()
    }

    /// Returns required fields that are not yet populated, in declaration
    /// order. This list is exactly `required − present` and is derived from
    /// the schema alone.
    pub fn missing_required(&self) -> Vec<FieldName> {
        FieldName::REQUIRED
            .iter()
            .copied()
            .filter(|f| !self.is_set(*f))
            .collect()
    }

    /// Fraction of required fields populated, in [0, 1].
    pub fn required_coverage(&self) -> f32 {
        let present = FieldName::REQUIRED
            .iter()
            .filter(|f| self.is_set(**f))
            .count();
        present as f32 / FieldName::REQUIRED.len() as f32
    }

    /// Applies an assignment, returning the displaced prior value (as text)
    /// when the field already held a different value.
    pub fn apply(&mut self, assignment: &FieldAssignment) -> Option<String> {
        let prior = self.display_value(assignment.field());
        match assignment {
            FieldAssignment::EntityType(v) => self.entity_type = Some(v.clone()),
            FieldAssignment::Domain(v) => self.domain = Some(v.clone()),
            FieldAssignment::Description(v) => self.description = Some(v.clone()),
            FieldAssignment::Corporeality(v) => self.corporeality = Some(*v),
            FieldAssignment::Luminance(v) => self.luminance = Some(*v),
            FieldAssignment::Temperament(v) => self.temperament = Some(*v),
            FieldAssignment::Lore(v) => self.lore = Some(v.clone()),
            FieldAssignment::Capabilities(v) => self.capabilities = v.clone(),
        }
        let current = self.display_value(assignment.field());
        match prior {
            Some(p) if Some(&p) != current.as_ref() => Some(p),
            _ => None,
        }
    }

    /// Renders the current value of a field as display text, if set.
    pub fn display_value(&self, field: FieldName) -> Option<String> {
        match field {
            FieldName::EntityType => self.entity_type.clone(),
            FieldName::Domain => self.domain.clone(),
            FieldName::Description => self.description.clone(),
            FieldName::Corporeality => self.corporeality.map(|v| v.to_string()),
            FieldName::Luminance => self.luminance.map(|v| v.to_string()),
            FieldName::Temperament => self.temperament.map(|v| v.to_string()),
            FieldName::Lore => self.lore.clone(),
            FieldName::Capabilities => {
                if self.capabilities.is_empty() {
                    None
                } else {
                    Some(self.capabilities.join(", "))
                }
            }
        }
    }

    /// Decomposes the populated fields into assignments, in declaration
    /// order. Used to seed a session from a vision-analysis suggestion.
    pub fn to_assignments(&self) -> Vec<FieldAssignment> {
        let mut out = Vec::new();
        if let Some(v) = &self.entity_type {
            out.push(FieldAssignment::EntityType(v.clone()));
        }
        if let Some(v) = &self.domain {
            out.push(FieldAssignment::Domain(v.clone()));
        }
        if let Some(v) = &self.description {
            out.push(FieldAssignment::Description(v.clone()));
        }
        if let Some(v) = self.corporeality {
            out.push(FieldAssignment::Corporeality(v));
        }
        if let Some(v) = self.luminance {
            out.push(FieldAssignment::Luminance(v));
        }
        if let Some(v) = self.temperament {
            out.push(FieldAssignment::Temperament(v));
        }
        if let Some(v) = &self.lore {
            out.push(FieldAssignment::Lore(v.clone()));
        }
        if !self.capabilities.is_empty() {
            out.push(FieldAssignment::Capabilities(self.capabilities.clone()));
        }
        out
    }
}

/// A typed value destined for one schema field.
///
/// This is the boundary form of "record field" tool payloads: the dialogue
/// adapter parses provider output into this union, so nothing downstream
/// handles untyped values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "lowercase")]
pub enum FieldAssignment {
    #[serde(rename = "type")]
    EntityType(String),
    Domain(String),
    Description(String),
    Corporeality(f32),
    Luminance(f32),
    Temperament(Temperament),
    Lore(String),
    Capabilities(Vec<String>),
}

impl FieldAssignment {
    /// Returns the field this assignment targets.
    pub fn field(&self) -> FieldName {
        match self {
            FieldAssignment::EntityType(_) => FieldName::EntityType,
            FieldAssignment::Domain(_) => FieldName::Domain,
            FieldAssignment::Description(_) => FieldName::Description,
            FieldAssignment::Corporeality(_) => FieldName::Corporeality,
            FieldAssignment::Luminance(_) => FieldName::Luminance,
            FieldAssignment::Temperament(_) => FieldName::Temperament,
            FieldAssignment::Lore(_) => FieldName::Lore,
            FieldAssignment::Capabilities(_) => FieldName::Capabilities,
        }
    }

    /// Validates the payload against the schema's constraints.
    ///
    /// # Errors
    ///
    /// - `EmptyField` for empty/whitespace text values or capability entries
    /// - `OutOfRange` for continuous parameters outside [0, 1]
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            FieldAssignment::EntityType(v)
            | FieldAssignment::Domain(v)
            | FieldAssignment::Description(v)
            | FieldAssignment::Lore(v) => {
                if v.trim().is_empty() {
                    return Err(ValidationError::empty_field(self.field().wire_name()));
                }
            }
            FieldAssignment::Corporeality(v) | FieldAssignment::Luminance(v) => {
                if !(0.0..=1.0).contains(v) {
                    return Err(ValidationError::out_of_range(
                        self.field().wire_name(),
                        0.0,
                        1.0,
                        f64::from(*v),
                    ));
                }
            }
            FieldAssignment::Temperament(_) => {}
            FieldAssignment::Capabilities(v) => {
                if v.is_empty() || v.iter().any(|c| c.trim().is_empty()) {
                    return Err(ValidationError::empty_field("capabilities"));
                }
            }
        }
        Ok(())
    }

    /// Renders the proposed value as display text.
    pub fn display_value(&self) -> String {
        match self {
            FieldAssignment::EntityType(v)
            | FieldAssignment::Domain(v)
            | FieldAssignment::Description(v)
            | FieldAssignment::Lore(v) => v.clone(),
            FieldAssignment::Corporeality(v) | FieldAssignment::Luminance(v) => v.to_string(),
            FieldAssignment::Temperament(v) => v.to_string(),
            FieldAssignment::Capabilities(v) => v.join(", "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod field_name {
        use super::*;

        #[test]
        fn wire_names_match_display() {
            for field in FieldName::ALL {
                assert_eq!(field.to_string(), field.wire_name());
            }
        }

        #[test]
        fn required_set_is_type_domain_description() {
            assert_eq!(
                FieldName::REQUIRED,
                [
                    FieldName::EntityType,
                    FieldName::Domain,
                    FieldName::Description
                ]
            );
            assert!(FieldName::EntityType.is_required());
            assert!(!FieldName::Lore.is_required());
        }

        #[test]
        fn entity_type_serializes_as_type() {
            let json = serde_json::to_string(&FieldName::EntityType).unwrap();
            assert_eq!(json, "\"type\"");
        }
    }

    mod entity_fields {
        use super::*;

        #[test]
        fn new_record_is_empty() {
            let fields = EntityFields::new();
            assert!(fields.is_empty());
            assert!(fields.populated().is_empty());
            assert_eq!(fields.required_coverage(), 0.0);
        }

        #[test]
        fn missing_required_lists_unpopulated_in_order() {
            let fields = EntityFields {
                entity_type: Some("Guardian".to_string()),
                domain: Some("Dream Threshold".to_string()),
                ..Default::default()
            };
            assert_eq!(fields.missing_required(), vec![FieldName::Description]);
        }

        #[test]
        fn missing_required_is_empty_when_complete() {
            let fields = EntityFields {
                entity_type: Some("Guardian".to_string()),
                domain: Some("Dream Threshold".to_string()),
                description: Some("Keeps the gate of sleep".to_string()),
                ..Default::default()
            };
            assert!(fields.missing_required().is_empty());
            assert_eq!(fields.required_coverage(), 1.0);
        }

        #[test]
        fn empty_capabilities_is_unset() {
            let fields = EntityFields::new();
            assert!(!fields.is_set(FieldName::Capabilities));
        }

        #[test]
        fn apply_reports_displaced_value() {
            let mut fields = EntityFields::new();
            let first = FieldAssignment::Domain("Dream Threshold".to_string());
            assert_eq!(fields.apply(&first), None);

            let second = FieldAssignment::Domain("Waking Shore".to_string());
            assert_eq!(fields.apply(&second), Some("Dream Threshold".to_string()));
            assert_eq!(fields.domain.as_deref(), Some("Waking Shore"));
        }

        #[test]
        fn apply_same_value_reports_no_displacement() {
            let mut fields = EntityFields::new();
            let assignment = FieldAssignment::EntityType("Guardian".to_string());
            fields.apply(&assignment);
            assert_eq!(fields.apply(&assignment), None);
        }

        #[test]
        fn to_assignments_roundtrips_populated_fields() {
            let fields = EntityFields {
                entity_type: Some("Guardian".to_string()),
                corporeality: Some(0.4),
                capabilities: vec!["ward".to_string(), "veil".to_string()],
                ..Default::default()
            };

            let mut rebuilt = EntityFields::new();
            for assignment in fields.to_assignments() {
                rebuilt.apply(&assignment);
            }
            assert_eq!(rebuilt, fields);
        }
    }

    mod assignment_validation {
        use super::*;

        #[test]
        fn accepts_valid_payloads() {
            assert!(FieldAssignment::EntityType("Guardian".to_string())
                .validate()
                .is_ok());
            assert!(FieldAssignment::Corporeality(0.5).validate().is_ok());
            assert!(FieldAssignment::Corporeality(0.0).validate().is_ok());
            assert!(FieldAssignment::Corporeality(1.0).validate().is_ok());
            assert!(
                FieldAssignment::Capabilities(vec!["ward".to_string()])
                    .validate()
                    .is_ok()
            );
        }

        #[test]
        fn rejects_empty_text() {
            assert!(FieldAssignment::Domain("  ".to_string()).validate().is_err());
        }

        #[test]
        fn rejects_out_of_range_parameters() {
            assert!(FieldAssignment::Corporeality(1.5).validate().is_err());
            assert!(FieldAssignment::Luminance(-0.1).validate().is_err());
        }

        #[test]
        fn rejects_empty_capability_entries() {
            assert!(FieldAssignment::Capabilities(vec![]).validate().is_err());
            assert!(
                FieldAssignment::Capabilities(vec!["ward".to_string(), " ".to_string()])
                    .validate()
                    .is_err()
            );
        }
    }

    mod serde_shapes {
        use super::*;

        #[test]
        fn assignment_serializes_with_wire_field_name() {
            let assignment = FieldAssignment::EntityType("Guardian".to_string());
            let json = serde_json::to_value(&assignment).unwrap();
            assert_eq!(json["field"], "type");
            assert_eq!(json["value"], "Guardian");
        }

        #[test]
        fn assignment_deserializes_from_wire_shape() {
            let assignment: FieldAssignment =
                serde_json::from_value(serde_json::json!({
                    "field": "luminance",
                    "value": 0.8
                }))
                .unwrap();
            assert_eq!(assignment, FieldAssignment::Luminance(0.8));
        }

        #[test]
        fn temperament_deserializes_lowercase() {
            let t: Temperament = serde_json::from_str("\"capricious\"").unwrap();
            assert_eq!(t, Temperament::Capricious);
        }

        #[test]
        fn temperament_parses_from_str() {
            assert_eq!(
                "Watchful".parse::<Temperament>().unwrap(),
                Temperament::Watchful
            );
            assert!("serene".parse::<Temperament>().is_err());
        }
    }
}
