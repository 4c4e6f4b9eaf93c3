//! Engagement target and bookmark mappers

use engage_core::entities::{
    BookmarkEdge, EngagementTarget, ReactionCounts, ReactionKind, TargetRef, TargetType,
};
use engage_core::error::DomainError;
use engage_core::value_objects::Snowflake;

use super::{corrupt, scope_from_columns};
use crate::models::{BookmarkModel, ReactionCountModel, TargetModel};

impl TryFrom<TargetModel> for EngagementTarget {
    type Error = DomainError;

    fn try_from(model: TargetModel) -> Result<Self, Self::Error> {
        let target_type: TargetType = model
            .target_type
            .parse()
            .map_err(|e| corrupt("target_type", e))?;

        Ok(EngagementTarget {
            target: TargetRef::new(target_type, Snowflake::new(model.target_id)),
            owner_id: model.owner_id.map(Snowflake::new),
            scope: scope_from_columns(model.campus_id, model.department_id, model.batch),
            preview: model.preview,
            like_count: model.like_count,
            bookmark_count: model.bookmark_count,
            reaction_counts: ReactionCounts::new(),
        })
    }
}

impl From<BookmarkModel> for BookmarkEdge {
    fn from(model: BookmarkModel) -> Self {
        BookmarkEdge {
            user_id: Snowflake::new(model.user_id),
            post_id: Snowflake::new(model.post_id),
            created_at: model.created_at,
        }
    }
}

/// Fold counter rows into a map, skipping zero buckets
pub fn reaction_counts(rows: Vec<ReactionCountModel>) -> Result<ReactionCounts, DomainError> {
    let mut counts = ReactionCounts::new();
    for row in rows {
        let kind: ReactionKind = row.kind.parse().map_err(|e| corrupt("kind", e))?;
        if row.count > 0 {
            counts.insert(kind, row.count);
        }
    }
    Ok(counts)
}

/// Values for registering a target
pub struct TargetInsert<'a> {
    pub target_type: &'static str,
    pub target_id: i64,
    pub owner_id: Option<i64>,
    pub campus_id: Option<&'a str>,
    pub department_id: Option<&'a str>,
    pub batch: Option<&'a str>,
    pub preview: Option<&'a str>,
}

impl<'a> TargetInsert<'a> {
    pub fn new(target: &'a EngagementTarget) -> Self {
        Self {
            target_type: target.target.target_type.as_str(),
            target_id: target.target.target_id.into_inner(),
            owner_id: target.owner_id.map(Snowflake::into_inner),
            campus_id: target.scope.campus_id.as_deref(),
            department_id: target.scope.department_id.as_deref(),
            batch: target.scope.batch.as_deref(),
            preview: target.preview.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> TargetModel {
        TargetModel {
            target_type: "post".into(),
            target_id: 42,
            owner_id: Some(7),
            campus_id: Some("north".into()),
            department_id: None,
            batch: Some("2026".into()),
            preview: Some("hello".into()),
            like_count: 3,
            bookmark_count: 1,
        }
    }

    #[test]
    fn test_target_from_model() {
        let target = EngagementTarget::try_from(model()).unwrap();
        assert_eq!(target.target, TargetRef::post(Snowflake::new(42)));
        assert_eq!(target.owner_id, Some(Snowflake::new(7)));
        assert_eq!(target.scope.campus_id.as_deref(), Some("north"));
        assert_eq!(target.like_count, 3);
    }

    #[test]
    fn test_unknown_target_type_is_a_database_error() {
        let mut bad = model();
        bad.target_type = "thread".into();
        let err = EngagementTarget::try_from(bad).unwrap_err();
        assert!(matches!(err, DomainError::DatabaseError(_)));
    }

    #[test]
    fn test_reaction_counts_skip_zero_rows() {
        let counts = reaction_counts(vec![
            ReactionCountModel { kind: "like".into(), count: 2 },
            ReactionCountModel { kind: "sad".into(), count: 0 },
        ])
        .unwrap();
        assert_eq!(counts.get(&ReactionKind::Like), Some(&2));
        assert!(!counts.contains_key(&ReactionKind::Sad));
    }
}
