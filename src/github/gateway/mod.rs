//! Gateways for reading and writing GitHub projects through Octocrab.
//!
//! The traits split reads from writes so dry runs can be wired without any
//! mutation capability. The Octocrab implementation speaks GraphQL and
//! implements both.

mod error_mapping;
mod project;
mod queries;

pub use project::OctocrabProjectGateway;

use async_trait::async_trait;
use serde::Serialize;

use crate::github::cursor::{InnerCursorSet, OuterCursor};
use crate::github::error::UpvoteError;
use crate::github::locator::{FieldId, ProjectId, ProjectItemId};
use crate::github::models::{ProjectItemPage, ProjectItemsPage, ProjectMetadata};

/// Gateway that can read a project's items.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProjectGateway: Send + Sync {
    /// Fetch the project and upvote field identifiers.
    async fn project_metadata(&self) -> Result<ProjectMetadata, UpvoteError>;

    /// Fetch one page of project items, each with the first page of every
    /// nested connection.
    async fn project_items(
        &self,
        cursor: &OuterCursor,
        page_size: u8,
    ) -> Result<ProjectItemsPage, UpvoteError>;

    /// Re-fetch a single item with its nested connections advanced to
    /// `cursors`.
    async fn project_item(
        &self,
        item_id: &ProjectItemId,
        cursors: &InnerCursorSet,
    ) -> Result<ProjectItemPage, UpvoteError>;
}

/// Gateway that can write number fields on project items.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FieldMutationGateway: Send + Sync {
    /// Set the number field described by `update`.
    async fn update_number_field(&self, update: &FieldUpdate) -> Result<(), UpvoteError>;
}

/// Input of `updateProjectV2ItemFieldValue` for a number field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldUpdate {
    /// Project owning the item.
    pub project_id: ProjectId,
    /// Item whose field is written.
    pub item_id: ProjectItemId,
    /// Number field receiving the score.
    pub field_id: FieldId,
    /// New field value.
    pub value: NumberValue,
}

/// `{ number }` wrapper expected by the field value input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NumberValue {
    /// The score to store.
    pub number: u64,
}

impl FieldUpdate {
    /// Builds the input that stores `score` on `item_id`.
    #[must_use]
    pub const fn new(
        project_id: ProjectId,
        field_id: FieldId,
        item_id: ProjectItemId,
        score: u64,
    ) -> Self {
        Self {
            project_id,
            item_id,
            field_id,
            value: NumberValue { number: score },
        }
    }
}
