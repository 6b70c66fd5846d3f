//! Tag and tag type reference rules
//!
//! Tag types may name other tag types as their *reference types*; a tag of such a
//! type may then point at tags belonging to one of those reference types. Attaching a
//! tag to an entry also attaches the tags it references, one level deep.
//!
//! Everything here works on plain values so the rules can be checked before anything
//! is written and tested without a database.

use std::collections::{BTreeSet, HashMap};

use uuid::Uuid;

/// Identity of a tag type as seen by the validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    pub id: Uuid,
    pub name: String,
}

/// A tag and the type it belongs to, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRef {
    pub id: Uuid,
    pub name: String,
    pub tag_type: Option<TypeRef>,
}

/// The owning tag type of a tag being saved, with its allowed reference types
#[derive(Debug, Clone)]
pub struct TypeRules {
    pub tag_type: TypeRef,
    pub reference_types: Vec<TypeRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagGraphError {
    #[error("A tag type cannot reference itself.")]
    TagTypeSelfReference,

    #[error("A tag cannot reference itself.")]
    TagSelfReference,

    #[error("Cannot set a reference tag without a tag type.")]
    MissingTagType,

    #[error(
        "The tag type \"{tag_type}\" does not allow tag references. Configure a reference tag type first."
    )]
    ReferencesNotAllowed { tag_type: String },

    #[error("Reference tag must be of type {allowed}. Selected tag \"{tag}\" is of type \"{actual}\".")]
    WrongReferenceType {
        allowed: String,
        tag: String,
        actual: String,
    },
}

impl TagGraphError {
    /// Form field the error belongs to
    pub fn field(&self) -> &'static str {
        match self {
            TagGraphError::TagTypeSelfReference => "reference_tagtypes",
            _ => "reference_tags",
        }
    }
}

/// Reject a tag type that lists itself among its reference types.
///
/// `tag_type_id` is `None` while the type is being created.
pub fn validate_tag_type_references(
    tag_type_id: Option<Uuid>,
    reference_type_ids: &[Uuid],
) -> Result<(), TagGraphError> {
    match tag_type_id {
        Some(id) if reference_type_ids.contains(&id) => Err(TagGraphError::TagTypeSelfReference),
        _ => Ok(()),
    }
}

/// Check a tag's reference tags against its type's reference types.
///
/// `tag_id` is `None` while the tag is being created. `rules` is `None` when the tag
/// has no type.
pub fn validate_tag_references(
    tag_id: Option<Uuid>,
    rules: Option<&TypeRules>,
    references: &[TagRef],
) -> Result<(), TagGraphError> {
    if references.is_empty() {
        return Ok(());
    }

    if let Some(id) = tag_id {
        if references.iter().any(|r| r.id == id) {
            return Err(TagGraphError::TagSelfReference);
        }
    }

    let rules = rules.ok_or(TagGraphError::MissingTagType)?;
    if rules.reference_types.is_empty() {
        return Err(TagGraphError::ReferencesNotAllowed {
            tag_type: rules.tag_type.name.clone(),
        });
    }

    for reference in references {
        let allowed = reference
            .tag_type
            .as_ref()
            .is_some_and(|t| rules.reference_types.iter().any(|rt| rt.id == t.id));
        if !allowed {
            return Err(TagGraphError::WrongReferenceType {
                allowed: describe_allowed(&rules.reference_types),
                tag: reference.name.clone(),
                actual: reference
                    .tag_type
                    .as_ref()
                    .map(|t| t.name.clone())
                    .unwrap_or_else(|| "None".to_string()),
            });
        }
    }

    Ok(())
}

fn describe_allowed(types: &[TypeRef]) -> String {
    types
        .iter()
        .map(|t| format!("\"{}\"", t.name))
        .collect::<Vec<_>>()
        .join(" or ")
}

/// Tags to attach for one entry: the ones asked for and the ones they imply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentPlan {
    pub direct: Vec<Uuid>,
    pub cascaded: Vec<Uuid>,
}

/// Tag to reference-tag adjacency
#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    edges: HashMap<Uuid, Vec<Uuid>>,
}

impl ReferenceGraph {
    pub fn from_edges(edges: impl IntoIterator<Item = (Uuid, Uuid)>) -> Self {
        let mut graph = ReferenceGraph::default();
        for (from, to) in edges {
            graph.edges.entry(from).or_default().push(to);
        }
        graph
    }

    pub fn references_of(&self, tag_id: Uuid) -> &[Uuid] {
        self.edges.get(&tag_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Expand `direct` with the reference tags of each direct tag.
    ///
    /// Only the immediate references are followed. Tags already requested directly
    /// are not counted again as cascaded.
    pub fn plan(&self, direct: &[Uuid]) -> AssignmentPlan {
        let mut seen: BTreeSet<Uuid> = BTreeSet::new();
        let mut plan = AssignmentPlan::default();
        for id in direct {
            if seen.insert(*id) {
                plan.direct.push(*id);
            }
        }
        for id in direct {
            for reference in self.references_of(*id) {
                if seen.insert(*reference) {
                    plan.cascaded.push(*reference);
                }
            }
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag_type(name: &str) -> TypeRef {
        TypeRef {
            id: Uuid::new_v4(),
            name: name.to_string(),
        }
    }

    fn tag(name: &str, tag_type: Option<&TypeRef>) -> TagRef {
        TagRef {
            id: Uuid::new_v4(),
            name: name.to_string(),
            tag_type: tag_type.cloned(),
        }
    }

    #[test]
    fn test_tag_type_cannot_reference_itself() {
        let id = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert_eq!(
            validate_tag_type_references(Some(id), &[other, id]),
            Err(TagGraphError::TagTypeSelfReference)
        );
        assert!(validate_tag_type_references(Some(id), &[other]).is_ok());
        assert!(validate_tag_type_references(None, &[other]).is_ok());
    }

    #[test]
    fn test_no_references_always_valid() {
        assert!(validate_tag_references(None, None, &[]).is_ok());
    }

    #[test]
    fn test_tag_cannot_reference_itself() {
        let faction = tag_type("Faction");
        let rules = TypeRules {
            tag_type: tag_type("Unit"),
            reference_types: vec![faction.clone()],
        };
        let me = tag("Boyz", Some(&rules.tag_type));
        let err = validate_tag_references(Some(me.id), Some(&rules), &[me.clone()]).unwrap_err();
        assert_eq!(err, TagGraphError::TagSelfReference);
        assert_eq!(err.to_string(), "A tag cannot reference itself.");
    }

    #[test]
    fn test_reference_requires_tag_type() {
        let faction = tag_type("Faction");
        let orks = tag("Orks", Some(&faction));
        let err = validate_tag_references(None, None, &[orks]).unwrap_err();
        assert_eq!(err, TagGraphError::MissingTagType);
    }

    #[test]
    fn test_type_without_reference_types_rejects() {
        let rules = TypeRules {
            tag_type: tag_type("Army Role"),
            reference_types: vec![],
        };
        let orks = tag("Orks", Some(&tag_type("Faction")));
        let err = validate_tag_references(None, Some(&rules), &[orks]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The tag type \"Army Role\" does not allow tag references. Configure a reference tag type first."
        );
    }

    #[test]
    fn test_reference_of_wrong_type_names_actual_type() {
        let faction = tag_type("Faction");
        let publisher = tag_type("Publisher");
        let rules = TypeRules {
            tag_type: tag_type("Unit"),
            reference_types: vec![faction.clone(), publisher.clone()],
        };
        let troops = tag("Troops", Some(&tag_type("Army Role")));
        let err = validate_tag_references(None, Some(&rules), &[troops]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Reference tag must be of type \"Faction\" or \"Publisher\". Selected tag \"Troops\" is of type \"Army Role\"."
        );
        assert_eq!(err.field(), "reference_tags");

        let untyped = tag("Loose", None);
        let err = validate_tag_references(None, Some(&rules), &[untyped]).unwrap_err();
        assert!(err.to_string().ends_with("is of type \"None\"."));
    }

    #[test]
    fn test_reference_of_allowed_types_accepted() {
        let faction = tag_type("Faction");
        let publisher = tag_type("Publisher");
        let rules = TypeRules {
            tag_type: tag_type("Unit"),
            reference_types: vec![faction.clone(), publisher.clone()],
        };
        let refs = [tag("Orks", Some(&faction)), tag("GW", Some(&publisher))];
        assert!(validate_tag_references(Some(Uuid::new_v4()), Some(&rules), &refs).is_ok());
    }

    #[test]
    fn test_cascade_is_one_level_deep() {
        let boyz = Uuid::new_v4();
        let orks = Uuid::new_v4();
        let xenos = Uuid::new_v4();
        let graph = ReferenceGraph::from_edges([(boyz, orks), (orks, xenos)]);

        let plan = graph.plan(&[boyz]);
        assert_eq!(plan.direct, vec![boyz]);
        assert_eq!(plan.cascaded, vec![orks]);
    }

    #[test]
    fn test_cascade_skips_tags_requested_directly() {
        let boyz = Uuid::new_v4();
        let nobz = Uuid::new_v4();
        let orks = Uuid::new_v4();
        let graph = ReferenceGraph::from_edges([(boyz, orks), (nobz, orks)]);

        let plan = graph.plan(&[boyz, nobz, orks]);
        assert_eq!(plan.direct, vec![boyz, nobz, orks]);
        assert!(plan.cascaded.is_empty());

        let plan = graph.plan(&[boyz, nobz]);
        assert_eq!(plan.cascaded, vec![orks]);
    }
}
