//! Octocrab implementation of the project gateways.

use async_trait::async_trait;
use http::Uri;
use octocrab::Octocrab;
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::{Map, Value, json};
use url::Url;

use crate::github::cursor::{InnerCursorSet, OuterCursor};
use crate::github::error::UpvoteError;
use crate::github::locator::{
    FieldId, PersonalAccessToken, ProjectId, ProjectItemId, ProjectLocator,
};
use crate::github::models::{
    ConnectionKind, ProjectItem, ProjectItemPage, ProjectItemsPage, ProjectMetadata,
};
use crate::github::pagination::Connection;
use crate::github::rate_limit::RateLimit;

use super::error_mapping::{GraphQlEnvelope, map_octocrab_error};
use super::queries;
use super::{FieldMutationGateway, FieldUpdate, ProjectGateway};

/// GraphQL type name of plain (text, number, date) project fields.
const PLAIN_FIELD: &str = "ProjectV2Field";
/// `dataType` of number fields.
const NUMBER_DATA_TYPE: &str = "NUMBER";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrganizationData<P> {
    organization: Option<ProjectData<P>>,
    rate_limit: RateLimit,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectData<P> {
    #[serde(rename = "projectV2")]
    project: Option<P>,
}

#[derive(Debug, Deserialize)]
struct ItemsSelection {
    items: Connection<ProjectItem>,
}

#[derive(Debug, Deserialize)]
struct MetadataSelection {
    id: ProjectId,
    #[serde(default)]
    field: Option<FieldSelection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldSelection {
    #[serde(rename = "__typename")]
    typename: String,
    #[serde(default)]
    id: Option<FieldId>,
    #[serde(default)]
    data_type: Option<String>,
}

impl FieldSelection {
    fn into_number_field(self) -> Option<FieldId> {
        let is_number = self.typename == PLAIN_FIELD
            && self.data_type.as_deref() == Some(NUMBER_DATA_TYPE);
        if is_number { self.id } else { None }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeData {
    node: Option<ProjectItem>,
    rate_limit: RateLimit,
}

/// Authenticated client rooted at `api_base`; GraphQL is served at
/// `{api_base}/graphql`.
fn graphql_client(token: &PersonalAccessToken, api_base: &Url) -> Result<Octocrab, UpvoteError> {
    let base_uri = api_base
        .as_str()
        .parse::<Uri>()
        .map_err(|error| UpvoteError::InvalidUrl(error.to_string()))?;

    Octocrab::builder()
        .personal_token(token.value())
        .base_uri(base_uri)
        .map_err(|error| UpvoteError::InvalidUrl(error.to_string()))?
        .build()
        .map_err(|error| map_octocrab_error("build GraphQL client", &error))
}

/// Octocrab-backed gateway bound to one project and upvote field name.
pub struct OctocrabProjectGateway {
    client: Octocrab,
    locator: ProjectLocator,
    field_name: String,
}

impl OctocrabProjectGateway {
    /// Creates a new gateway from an Octocrab client.
    #[must_use]
    pub fn new(client: Octocrab, locator: ProjectLocator, field_name: impl Into<String>) -> Self {
        Self {
            client,
            locator,
            field_name: field_name.into(),
        }
    }

    /// Builds a gateway for `locator` that reads and writes `field_name`.
    ///
    /// # Errors
    ///
    /// Returns `UpvoteError::InvalidUrl` when the API base is not a valid URI,
    /// or the mapped Octocrab error when the client cannot be built.
    pub fn for_token(
        token: &PersonalAccessToken,
        locator: &ProjectLocator,
        field_name: &str,
    ) -> Result<Self, UpvoteError> {
        let client = graphql_client(token, locator.api_base())?;
        Ok(Self::new(client, locator.clone(), field_name))
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: Value,
    ) -> Result<T, UpvoteError> {
        tracing::trace!(operation, "sending GraphQL request");
        let payload = json!({ "query": query, "variables": variables });
        self.client
            .graphql::<GraphQlEnvelope<T>>(&payload)
            .await
            .map_err(|error| map_octocrab_error(operation, &error))?
            .into_data(operation)
    }

    fn project_variables(&self) -> Map<String, Value> {
        let mut variables = Map::new();
        variables.insert(
            "org".to_owned(),
            Value::from(self.locator.organization().as_str()),
        );
        variables.insert(
            "project".to_owned(),
            Value::from(self.locator.number().get()),
        );
        variables.insert("fieldName".to_owned(), Value::from(self.field_name.as_str()));
        variables
    }
}

/// Binds every inner cursor variable, `null` meaning "first page".
fn insert_inner_cursors(variables: &mut Map<String, Value>, cursors: &InnerCursorSet) {
    for kind in ConnectionKind::ALL {
        let value = cursors.cursor(kind).map_or(Value::Null, Value::from);
        variables.insert(kind.cursor_variable().to_owned(), value);
    }
}

fn missing_project(operation: &str, locator: &ProjectLocator) -> UpvoteError {
    UpvoteError::MalformedResponse {
        operation: operation.to_owned(),
        message: format!(
            "project {} was not found in organisation {}",
            locator.number().get(),
            locator.organization().as_str()
        ),
    }
}

#[async_trait]
impl ProjectGateway for OctocrabProjectGateway {
    async fn project_metadata(&self) -> Result<ProjectMetadata, UpvoteError> {
        const OPERATION: &str = "project metadata";
        let data: OrganizationData<MetadataSelection> = self
            .execute(
                OPERATION,
                queries::PROJECT_METADATA,
                Value::Object(self.project_variables()),
            )
            .await?;
        let project = data
            .organization
            .and_then(|organization| organization.project)
            .ok_or_else(|| missing_project(OPERATION, &self.locator))?;

        Ok(ProjectMetadata {
            project_id: project.id,
            field_id: project.field.and_then(FieldSelection::into_number_field),
            rate_limit: data.rate_limit,
        })
    }

    async fn project_items(
        &self,
        cursor: &OuterCursor,
        page_size: u8,
    ) -> Result<ProjectItemsPage, UpvoteError> {
        const OPERATION: &str = "project items";
        let mut variables = self.project_variables();
        variables.insert("pageSize".to_owned(), Value::from(page_size));
        variables.insert(
            "projectItemsCursor".to_owned(),
            cursor.as_deref().map_or(Value::Null, Value::from),
        );
        insert_inner_cursors(&mut variables, &InnerCursorSet::default());

        let data: OrganizationData<ItemsSelection> = self
            .execute(OPERATION, queries::PROJECT_ITEMS, Value::Object(variables))
            .await?;
        let project = data
            .organization
            .and_then(|organization| organization.project)
            .ok_or_else(|| missing_project(OPERATION, &self.locator))?;

        Ok(ProjectItemsPage {
            items: project.items,
            rate_limit: data.rate_limit,
        })
    }

    async fn project_item(
        &self,
        item_id: &ProjectItemId,
        cursors: &InnerCursorSet,
    ) -> Result<ProjectItemPage, UpvoteError> {
        const OPERATION: &str = "project item";
        let mut variables = Map::new();
        variables.insert("itemId".to_owned(), Value::from(item_id.as_str()));
        variables.insert("fieldName".to_owned(), Value::from(self.field_name.as_str()));
        insert_inner_cursors(&mut variables, cursors);

        let data: NodeData = self
            .execute(OPERATION, queries::PROJECT_ITEM, Value::Object(variables))
            .await?;
        let item = data.node.ok_or_else(|| UpvoteError::MalformedResponse {
            operation: OPERATION.to_owned(),
            message: format!("item {item_id} no longer exists"),
        })?;

        Ok(ProjectItemPage {
            item,
            rate_limit: data.rate_limit,
        })
    }
}

#[async_trait]
impl FieldMutationGateway for OctocrabProjectGateway {
    async fn update_number_field(&self, update: &FieldUpdate) -> Result<(), UpvoteError> {
        let _ack: IgnoredAny = self
            .execute(
                "update field",
                queries::UPDATE_NUMBER_FIELD,
                json!({ "input": update }),
            )
            .await?;
        Ok(())
    }
}
