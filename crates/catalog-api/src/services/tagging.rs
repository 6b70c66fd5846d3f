//! Tag graph checks against stored data, and tag assignment with the reference cascade

use catalog_core::models::{TagInput, TagTypeInput};
use catalog_core::tag_graph::{
    validate_tag_references, validate_tag_type_references, ReferenceGraph, TypeRules,
};
use catalog_core::AppError;
use catalog_db::{EntryRepository, TagRepository, TagTypeRepository};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    #[default]
    Add,
    Remove,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QuickAction {
    #[default]
    Toggle,
    Add,
    Remove,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct BulkAssignRequest {
    #[serde(default)]
    pub entry_ids: Vec<Uuid>,
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
    #[serde(default)]
    pub action: BulkAction,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BulkAssignResponse {
    pub success: bool,
    pub affected_count: u64,
    pub auto_assigned_count: u64,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct QuickAssignRequest {
    pub entry_id: Option<Uuid>,
    pub tag_id: Option<Uuid>,
    #[serde(default)]
    pub action: QuickAction,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuickAssignResponse {
    pub success: bool,
    pub assigned: bool,
    pub auto_assigned: bool,
    pub tag_count: i64,
}

/// Summary line shown after a bulk assignment
pub fn bulk_message(action: BulkAction, entries: usize, auto_assigned: u64) -> String {
    let verb = match action {
        BulkAction::Add => "added",
        BulkAction::Remove => "removed",
    };
    let mut message = format!(
        "Successfully {} tags for {} entr{}",
        verb,
        entries,
        if entries == 1 { "y" } else { "ies" }
    );
    if auto_assigned > 0 {
        message.push_str(&format!(
            " (also auto-assigned {} reference tag{})",
            auto_assigned,
            if auto_assigned == 1 { "" } else { "s" }
        ));
    }
    message
}

pub struct TaggingService;

impl TaggingService {
    /// Run the tag type rules for a create (`id = None`) or an update
    pub async fn check_tag_type(
        tag_types: &TagTypeRepository,
        id: Option<Uuid>,
        input: &TagTypeInput,
    ) -> Result<(), AppError> {
        input.check()?;
        validate_tag_type_references(id, &input.reference_tagtype_ids)?;

        let found = tag_types.get_many(&input.reference_tagtype_ids).await?;
        if let Some(missing) = input
            .reference_tagtype_ids
            .iter()
            .find(|rid| !found.iter().any(|t| t.id == **rid))
        {
            return Err(AppError::Validation {
                field: "reference_tagtypes".to_string(),
                message: format!("Tag type {} does not exist", missing),
            });
        }
        Ok(())
    }

    /// Run the tag reference rules for a create (`id = None`) or an update
    pub async fn check_tag(
        tags: &TagRepository,
        tag_types: &TagTypeRepository,
        id: Option<Uuid>,
        input: &TagInput,
    ) -> Result<(), AppError> {
        use validator::Validate;
        input.validate()?;

        let rules = match input.tag_type_id {
            Some(type_id) => {
                let tag_type = tag_types.get(type_id).await?.ok_or_else(|| AppError::Validation {
                    field: "tag_type".to_string(),
                    message: format!("Tag type {} does not exist", type_id),
                })?;
                let reference_types = tag_types.reference_types(type_id).await?;
                Some(TypeRules {
                    tag_type: tag_type.type_ref(),
                    reference_types: reference_types.iter().map(|t| t.type_ref()).collect(),
                })
            }
            None => None,
        };

        let references = tags.get_many(&input.reference_tag_ids).await?;
        if let Some(missing) = input
            .reference_tag_ids
            .iter()
            .find(|rid| !references.iter().any(|t| t.id == **rid))
        {
            return Err(AppError::Validation {
                field: "reference_tags".to_string(),
                message: format!("Tag {} does not exist", missing),
            });
        }

        let refs: Vec<_> = references.iter().map(|t| t.tag_ref()).collect();
        validate_tag_references(id, rules.as_ref(), &refs)?;
        Ok(())
    }

    /// Add or remove tags on many entries. Adding also attaches each tag's references.
    #[tracing::instrument(skip(entries, tags, request), fields(entries = request.entry_ids.len(), tags = request.tag_ids.len()))]
    pub async fn bulk_assign(
        entries: &EntryRepository,
        tags: &TagRepository,
        request: &BulkAssignRequest,
    ) -> Result<BulkAssignResponse, AppError> {
        if request.entry_ids.is_empty() || request.tag_ids.is_empty() {
            return Err(AppError::BadRequest(
                "Missing entry IDs or tag IDs".to_string(),
            ));
        }

        let entry_ids = entries.existing_ids(&request.entry_ids).await?;
        let tag_ids: Vec<Uuid> = tags
            .get_many(&request.tag_ids)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();

        let mut affected: u64 = 0;
        let mut auto_assigned: u64 = 0;

        match request.action {
            BulkAction::Add => {
                let graph = ReferenceGraph::from_edges(tags.reference_edges(&tag_ids).await?);
                let plan = graph.plan(&tag_ids);
                for entry_id in &entry_ids {
                    entries.add_tags(*entry_id, &plan.direct).await?;
                    affected += plan.direct.len() as u64;

                    if plan.cascaded.is_empty() {
                        continue;
                    }
                    match entries.add_tags(*entry_id, &plan.cascaded).await {
                        Ok(_) => auto_assigned += plan.cascaded.len() as u64,
                        Err(e) => tracing::warn!(
                            error = %e,
                            entry_id = %entry_id,
                            "Failed to auto-assign reference tags"
                        ),
                    }
                }
            }
            BulkAction::Remove => {
                for entry_id in &entry_ids {
                    entries.remove_tags(*entry_id, &tag_ids).await?;
                    affected += tag_ids.len() as u64;
                }
            }
        }

        Ok(BulkAssignResponse {
            success: true,
            affected_count: affected,
            auto_assigned_count: auto_assigned,
            message: bulk_message(request.action, entry_ids.len(), auto_assigned),
        })
    }

    /// Toggle, add or remove one tag on one entry
    #[tracing::instrument(skip(entries, tags, request))]
    pub async fn quick_assign(
        entries: &EntryRepository,
        tags: &TagRepository,
        request: &QuickAssignRequest,
    ) -> Result<QuickAssignResponse, AppError> {
        let (Some(entry_id), Some(tag_id)) = (request.entry_id, request.tag_id) else {
            return Err(AppError::BadRequest(
                "Missing entry ID or tag ID".to_string(),
            ));
        };
        entries.require(entry_id).await?;
        tags.require(tag_id).await?;

        let add = match request.action {
            QuickAction::Add => true,
            QuickAction::Remove => false,
            QuickAction::Toggle => !entries.has_tag(entry_id, tag_id).await?,
        };

        let mut auto_assigned = false;
        if add {
            entries.add_tags(entry_id, &[tag_id]).await?;
            let references = tags.reference_ids(tag_id).await?;
            if !references.is_empty() {
                match entries.add_tags(entry_id, &references).await {
                    Ok(_) => auto_assigned = true,
                    Err(e) => tracing::warn!(
                        error = %e,
                        entry_id = %entry_id,
                        tag_id = %tag_id,
                        "Failed to auto-assign reference tags"
                    ),
                }
            }
        } else {
            entries.remove_tags(entry_id, &[tag_id]).await?;
        }

        Ok(QuickAssignResponse {
            success: true,
            assigned: add,
            auto_assigned,
            tag_count: entries.tag_count(entry_id).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_message() {
        assert_eq!(
            bulk_message(BulkAction::Add, 1, 0),
            "Successfully added tags for 1 entry"
        );
        assert_eq!(
            bulk_message(BulkAction::Add, 3, 1),
            "Successfully added tags for 3 entries (also auto-assigned 1 reference tag)"
        );
        assert_eq!(
            bulk_message(BulkAction::Remove, 2, 0),
            "Successfully removed tags for 2 entries"
        );
        assert_eq!(
            bulk_message(BulkAction::Add, 2, 4),
            "Successfully added tags for 2 entries (also auto-assigned 4 reference tags)"
        );
    }

    #[test]
    fn test_request_defaults() {
        let bulk: BulkAssignRequest = serde_json::from_str(r#"{"entry_ids": []}"#).unwrap();
        assert_eq!(bulk.action, BulkAction::Add);
        assert!(bulk.tag_ids.is_empty());

        let quick: QuickAssignRequest = serde_json::from_str(r#"{"action": "remove"}"#).unwrap();
        assert_eq!(quick.action, QuickAction::Remove);
        assert!(quick.entry_id.is_none());
    }
}
