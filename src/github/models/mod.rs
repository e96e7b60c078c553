//! Project item models returned by the GitHub GraphQL API.
//!
//! A project item points at polymorphic content: an `Issue`, a `PullRequest`,
//! or a draft. The item's `type` tag is the only dispatch key; the content is
//! resolved through an exhaustive match and a mismatch is reported as an
//! error rather than defaulting to an empty fragment.

use std::fmt;

use serde::Deserialize;

use super::error::UpvoteError;
use super::locator::{FieldId, ProjectId, ProjectItemId};
use super::pagination::{Connection, PageInfo, Reactable, TotalCount, Upvotable};
use super::rate_limit::RateLimit;


/// Item type tag reported by `ProjectV2Item.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectItemType {
    /// The item links to an issue.
    Issue,
    /// The item links to a pull request.
    PullRequest,
    /// A draft issue that only exists on the board.
    DraftIssue,
    /// Content the token is not allowed to see.
    Redacted,
}

impl ProjectItemType {
    /// GraphQL spelling of the tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Issue => "ISSUE",
            Self::PullRequest => "PULL_REQUEST",
            Self::DraftIssue => "DRAFT_ISSUE",
            Self::Redacted => "REDACTED",
        }
    }
}

impl fmt::Display for ProjectItemType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Comment and reaction totals shared by issues and pull requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct CommentsAndReactions {
    /// Comment total.
    pub comments: TotalCount,
    /// Reaction total.
    pub reactions: TotalCount,
}

impl CommentsAndReactions {
    /// Creates totals from raw counts.
    #[must_use]
    pub const fn new(comments: u64, reactions: u64) -> Self {
        Self {
            comments: TotalCount::new(comments),
            reactions: TotalCount::new(reactions),
        }
    }

    /// Comments plus reactions.
    #[must_use]
    pub const fn base_score(&self) -> u64 {
        self.comments
            .total_count
            .saturating_add(self.reactions.total_count)
    }
}

/// An issue or pull request referenced from a timeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "__typename")]
pub enum LinkedContent {
    /// A linked issue.
    Issue(CommentsAndReactions),
    /// A linked pull request.
    PullRequest(CommentsAndReactions),
}

impl LinkedContent {
    /// Base score of whichever variant is present.
    #[must_use]
    pub const fn base_score(&self) -> u64 {
        match self {
            Self::Issue(totals) | Self::PullRequest(totals) => totals.base_score(),
        }
    }
}

/// A timeline event that counts towards an item's upvotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "__typename")]
pub enum TimelineItem {
    /// Another issue or pull request was connected to this one.
    ConnectedEvent {
        /// The connected subject, absent when the token cannot read it.
        source: Option<LinkedContent>,
    },
    /// Another issue or pull request mentioned this one.
    CrossReferencedEvent {
        /// The referencing subject, absent when the token cannot read it.
        source: Option<LinkedContent>,
    },
    /// A comment on this item.
    IssueComment {
        /// Reactions left on the comment.
        reactions: TotalCount,
    },
    /// This item was marked as a duplicate of another.
    MarkedAsDuplicateEvent {
        /// The canonical subject, absent when the token cannot read it.
        canonical: Option<LinkedContent>,
    },
    /// The item was referenced from a commit.
    ReferencedEvent,
    /// Someone subscribed to the item.
    SubscribedEvent,
}

impl Upvotable for TimelineItem {
    fn upvotes(&self) -> u64 {
        let linked = match self {
            Self::ConnectedEvent { source } | Self::CrossReferencedEvent { source } => {
                source.as_ref().map_or(0, LinkedContent::base_score)
            }
            Self::MarkedAsDuplicateEvent { canonical } => {
                canonical.as_ref().map_or(0, LinkedContent::base_score)
            }
            Self::IssueComment { reactions } => reactions.total_count,
            Self::ReferencedEvent | Self::SubscribedEvent => 0,
        };
        // Existing at all is worth one point.
        linked.saturating_add(1)
    }
}

/// Fields every scored issue or pull request carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discussion {
    /// Whether the issue or pull request is closed.
    pub closed: bool,
    /// Reactions left on the issue or pull request itself.
    pub reactions: TotalCount,
    /// One page of comments.
    pub comments: Connection<Reactable>,
    /// One page of scored timeline events.
    pub timeline_items: Connection<TimelineItem>,
}

/// Issue content of a project item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueContent {
    /// Shared discussion fields.
    #[serde(flatten)]
    pub discussion: Discussion,
    /// One page of issues tracked by this issue.
    pub tracked_issues: Connection<Reactable>,
    /// One page of issues tracking this issue.
    pub tracked_in_issues: Connection<Reactable>,
}

/// Pull request content of a project item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequestContent {
    /// Shared discussion fields.
    #[serde(flatten)]
    pub discussion: Discussion,
    /// One page of issues this pull request closes.
    pub closing_issues_references: Connection<Reactable>,
}

/// Raw content union as returned by GraphQL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "__typename")]
pub enum ItemContent {
    /// Issue content.
    Issue(IssueContent),
    /// Pull request content.
    PullRequest(PullRequestContent),
    /// Draft issue content; carries nothing scoreable.
    DraftIssue,
}

/// Nested connections whose pages contribute to an item's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConnectionKind {
    /// `comments`
    Comments,
    /// `timelineItems`
    TimelineItems,
    /// `trackedIssues` (issues only)
    TrackedIssues,
    /// `trackedInIssues` (issues only)
    TrackedInIssues,
    /// `closingIssuesReferences` (pull requests only)
    ClosingIssuesReferences,
}

impl ConnectionKind {
    /// Every connection kind, in query variable order.
    pub const ALL: [Self; 5] = [
        Self::Comments,
        Self::TimelineItems,
        Self::TrackedIssues,
        Self::TrackedInIssues,
        Self::ClosingIssuesReferences,
    ];

    /// Name of the GraphQL variable carrying this connection's cursor.
    #[must_use]
    pub const fn cursor_variable(self) -> &'static str {
        match self {
            Self::Comments => "commentsCursor",
            Self::TimelineItems => "timelineItemsCursor",
            Self::TrackedIssues => "trackedIssuesCursor",
            Self::TrackedInIssues => "trackedInIssuesCursor",
            Self::ClosingIssuesReferences => "closingIssuesReferencesCursor",
        }
    }
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.cursor_variable().trim_end_matches("Cursor"))
    }
}

/// Contribution and pagination state of one connection on one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionPage<'page> {
    /// Which connection this page belongs to.
    pub kind: ConnectionKind,
    /// Upvotes contributed by the page's nodes.
    pub upvotes: u64,
    /// Pagination state of the page.
    pub page_info: &'page PageInfo,
}

impl<'page> ConnectionPage<'page> {
    fn of<T: Upvotable>(kind: ConnectionKind, connection: &'page Connection<T>) -> Self {
        Self {
            kind,
            upvotes: connection.reactable_upvotes(),
            page_info: &connection.page_info,
        }
    }
}

/// Content resolved through the item's type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedContent<'item> {
    /// Issue content.
    Issue(&'item IssueContent),
    /// Pull request content.
    PullRequest(&'item PullRequestContent),
}

impl<'item> ResolvedContent<'item> {
    /// Shared discussion fields of either variant.
    #[must_use]
    pub const fn discussion(&self) -> &'item Discussion {
        match self {
            Self::Issue(issue) => &issue.discussion,
            Self::PullRequest(pull_request) => &pull_request.discussion,
        }
    }

    /// Whether the underlying issue or pull request is closed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.discussion().closed
    }

    /// Reactions plus comment total of the root content, counted once.
    #[must_use]
    pub const fn base_score(&self) -> u64 {
        let discussion = self.discussion();
        discussion
            .reactions
            .total_count
            .saturating_add(discussion.comments.total_count)
    }

    /// Every nested connection of the resolved variant.
    #[must_use]
    pub fn connection_pages(&self) -> Vec<ConnectionPage<'item>> {
        let discussion = self.discussion();
        let mut pages = vec![
            ConnectionPage::of(ConnectionKind::Comments, &discussion.comments),
            ConnectionPage::of(ConnectionKind::TimelineItems, &discussion.timeline_items),
        ];
        match self {
            Self::Issue(issue) => {
                pages.push(ConnectionPage::of(
                    ConnectionKind::TrackedIssues,
                    &issue.tracked_issues,
                ));
                pages.push(ConnectionPage::of(
                    ConnectionKind::TrackedInIssues,
                    &issue.tracked_in_issues,
                ));
            }
            Self::PullRequest(pull_request) => pages.push(ConnectionPage::of(
                ConnectionKind::ClosingIssuesReferences,
                &pull_request.closing_issues_references,
            )),
        }
        pages
    }
}

/// Current value of the number field the score is written to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct NumberFieldValue {
    /// The stored number; absent for non-number field values.
    #[serde(default)]
    pub number: Option<f64>,
}

/// Why an item contributes nothing and is never written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The item is archived on the board.
    Archived,
    /// The item is a draft issue.
    Draft,
    /// The item's content is hidden from the token.
    Redacted,
    /// The linked issue or pull request is closed.
    Closed,
}

impl SkipReason {
    /// Short label for logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Archived => "archived",
            Self::Draft => "draft",
            Self::Redacted => "redacted",
            Self::Closed => "closed",
        }
    }
}

/// One row of a Project (v2) board.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectItem {
    /// Item node identifier.
    pub id: ProjectItemId,
    /// Whether the item is archived.
    #[serde(default)]
    pub is_archived: bool,
    /// Dispatch tag for `content`.
    #[serde(rename = "type")]
    pub item_type: ProjectItemType,
    /// Linked content; null for redacted items.
    #[serde(default)]
    pub content: Option<ItemContent>,
    /// Current value of the upvote field, when set.
    #[serde(default)]
    pub upvotes: Option<NumberFieldValue>,
}

impl ProjectItem {
    /// Skip decision that can be made without resolving the content.
    #[must_use]
    pub const fn pre_resolution_skip(&self) -> Option<SkipReason> {
        if self.is_archived {
            return Some(SkipReason::Archived);
        }
        match self.item_type {
            ProjectItemType::DraftIssue => Some(SkipReason::Draft),
            ProjectItemType::Redacted => Some(SkipReason::Redacted),
            ProjectItemType::Issue | ProjectItemType::PullRequest => None,
        }
    }

    /// Resolves the content union through the item's type tag.
    ///
    /// # Errors
    ///
    /// Returns [`UpvoteError::UnresolvableContent`] when the tag is not
    /// `ISSUE`/`PULL_REQUEST` or the content does not match it.
    pub fn resolve(&self) -> Result<ResolvedContent<'_>, UpvoteError> {
        match (self.item_type, self.content.as_ref()) {
            (ProjectItemType::Issue, Some(ItemContent::Issue(issue))) => {
                Ok(ResolvedContent::Issue(issue))
            }
            (ProjectItemType::PullRequest, Some(ItemContent::PullRequest(pull_request))) => {
                Ok(ResolvedContent::PullRequest(pull_request))
            }
            _ => Err(UpvoteError::UnresolvableContent {
                item_id: self.id.to_string(),
                item_type: self.item_type.to_string(),
            }),
        }
    }

    /// Full skip test: item flags first, then the resolved content's state.
    ///
    /// # Errors
    ///
    /// Propagates [`ProjectItem::resolve`] failures for non-skipped items.
    pub fn skip_reason(&self) -> Result<Option<SkipReason>, UpvoteError> {
        if let Some(reason) = self.pre_resolution_skip() {
            return Ok(Some(reason));
        }
        let content = self.resolve()?;
        Ok(content.is_closed().then_some(SkipReason::Closed))
    }

    /// Number currently stored in the upvote field.
    #[must_use]
    pub fn current_upvotes(&self) -> Option<f64> {
        self.upvotes.and_then(|value| value.number)
    }
}

/// One page of the project's item list.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectItemsPage {
    /// The items connection page.
    pub items: Connection<ProjectItem>,
    /// Budget reported with the page.
    pub rate_limit: RateLimit,
}

/// A single item re-queried with advanced inner cursors.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectItemPage {
    /// The item with the next page of each nested connection.
    pub item: ProjectItem,
    /// Budget reported with the page.
    pub rate_limit: RateLimit,
}

/// Identifiers needed to write scores back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectMetadata {
    /// Project node identifier.
    pub project_id: ProjectId,
    /// Field node identifier, when a number field with the name exists.
    pub field_id: Option<FieldId>,
    /// Budget reported with the lookup.
    pub rate_limit: RateLimit,
}
