//! GraphQL documents sent to the GitHub API.
//!
//! Every query selects `rateLimit { remaining cost }` so the governor sees
//! the budget after each call. Nested connections are paged through the
//! `*Cursor` variables named by [`ConnectionKind::cursor_variable`].
//!
//! [`ConnectionKind::cursor_variable`]: crate::github::models::ConnectionKind::cursor_variable

macro_rules! linked_subject {
    () => {
        "__typename
          ... on Issue { comments { totalCount } reactions { totalCount } }
          ... on PullRequest { comments { totalCount } reactions { totalCount } }"
    };
}

macro_rules! discussion_fields {
    () => {
        concat!(
            "closed
        reactions { totalCount }
        comments(first: 10, after: $commentsCursor) {
          totalCount
          pageInfo { endCursor hasNextPage }
          nodes { reactions { totalCount } }
        }
        timelineItems(
          first: 10
          after: $timelineItemsCursor
          itemTypes: [CONNECTED_EVENT, CROSS_REFERENCED_EVENT, ISSUE_COMMENT, MARKED_AS_DUPLICATE_EVENT, REFERENCED_EVENT, SUBSCRIBED_EVENT]
        ) {
          totalCount
          pageInfo { endCursor hasNextPage }
          nodes {
            __typename
            ... on ConnectedEvent { source { ",
            linked_subject!(),
            " } }
            ... on CrossReferencedEvent { source { ",
            linked_subject!(),
            " } }
            ... on MarkedAsDuplicateEvent { canonical { ",
            linked_subject!(),
            " } }
            ... on IssueComment { reactions { totalCount } }
          }
        }"
        )
    };
}

macro_rules! reactable_connection {
    ($field:literal, $cursor:literal) => {
        concat!(
            $field,
            "(first: 10, after: $",
            $cursor,
            ") {
          totalCount
          pageInfo { endCursor hasNextPage }
          nodes { reactions { totalCount } }
        }"
        )
    };
}

macro_rules! project_item_fragment {
    () => {
        concat!(
            "
fragment ProjectItemFields on ProjectV2Item {
  id
  isArchived
  type
  upvotes: fieldValueByName(name: $fieldName) {
    ... on ProjectV2ItemFieldNumberValue { number }
  }
  content {
    __typename
    ... on Issue {
        ",
            discussion_fields!(),
            "
        ",
            reactable_connection!("trackedIssues", "trackedIssuesCursor"),
            "
        ",
            reactable_connection!("trackedInIssues", "trackedInIssuesCursor"),
            "
    }
    ... on PullRequest {
        ",
            discussion_fields!(),
            "
        ",
            reactable_connection!("closingIssuesReferences", "closingIssuesReferencesCursor"),
            "
    }
  }
}
"
        )
    };
}

macro_rules! inner_cursor_variables {
    () => {
        "$commentsCursor: String
  $timelineItemsCursor: String
  $trackedIssuesCursor: String
  $trackedInIssuesCursor: String
  $closingIssuesReferencesCursor: String"
    };
}

/// One page of the project's item list, each item with its first inner pages.
pub(super) const PROJECT_ITEMS: &str = concat!(
    "query ProjectItems(
  $org: String!
  $project: Int!
  $fieldName: String!
  $pageSize: Int!
  $projectItemsCursor: String
  ",
    inner_cursor_variables!(),
    "
) {
  organization(login: $org) {
    projectV2(number: $project) {
      items(first: $pageSize, after: $projectItemsCursor) {
        totalCount
        pageInfo { endCursor hasNextPage }
        nodes { ...ProjectItemFields }
      }
    }
  }
  rateLimit { remaining cost }
}
",
    project_item_fragment!()
);

/// A single item re-queried with advanced inner cursors.
pub(super) const PROJECT_ITEM: &str = concat!(
    "query ProjectItem(
  $itemId: ID!
  $fieldName: String!
  ",
    inner_cursor_variables!(),
    "
) {
  node(id: $itemId) { ...ProjectItemFields }
  rateLimit { remaining cost }
}
",
    project_item_fragment!()
);

/// Project and field identifiers needed for write-back.
pub(super) const PROJECT_METADATA: &str = "query ProjectMetadata($org: String!, $project: Int!, $fieldName: String!) {
  organization(login: $org) {
    projectV2(number: $project) {
      id
      field(name: $fieldName) {
        __typename
        ... on ProjectV2Field { id dataType }
      }
    }
  }
  rateLimit { remaining cost }
}
";

/// Sets a number field on one project item.
pub(super) const UPDATE_NUMBER_FIELD: &str = "mutation UpdateUpvotes($input: UpdateProjectV2ItemFieldValueInput!) {
  updateProjectV2ItemFieldValue(input: $input) { clientMutationId }
}
";
