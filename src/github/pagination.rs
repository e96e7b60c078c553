//! Cursor-based pagination for GitHub GraphQL connections.
//!
//! GraphQL connections return one page of `nodes` alongside a `pageInfo`
//! block. The types here model a single fetched page: contributions are
//! always computed from the nodes actually present, never inferred from
//! `totalCount`, because the total over-counts whenever pagination is
//! incomplete.

use serde::Deserialize;

/// Pagination state of a single fetched connection page.
///
/// # Example
///
/// ```
/// use github_upvotes::github::pagination::PageInfo;
///
/// let info = PageInfo::new(Some("Y3Vyc29yOjEw".to_owned()), true);
/// assert!(info.has_next_page());
/// assert_eq!(info.end_cursor(), Some("Y3Vyc29yOjEw"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Cursor of the last node in the page; absent for empty pages.
    end_cursor: Option<String>,
    /// Whether more nodes exist after `end_cursor`.
    has_next_page: bool,
}

impl PageInfo {
    /// Creates page info from its raw parts.
    #[must_use]
    pub const fn new(end_cursor: Option<String>, has_next_page: bool) -> Self {
        Self {
            end_cursor,
            has_next_page,
        }
    }

    /// Returns the cursor marking the end of the current page.
    #[must_use]
    pub fn end_cursor(&self) -> Option<&str> {
        self.end_cursor.as_deref()
    }

    /// Returns true if more pages exist after the current one.
    #[must_use]
    pub const fn has_next_page(&self) -> bool {
        self.has_next_page
    }

    /// Returns true if this is the last page.
    #[must_use]
    pub const fn is_last_page(&self) -> bool {
        !self.has_next_page
    }
}

/// A bare `{ totalCount }` selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalCount {
    /// The reported total.
    pub total_count: u64,
}

impl TotalCount {
    /// Creates a total count selection.
    #[must_use]
    pub const fn new(total_count: u64) -> Self {
        Self { total_count }
    }
}

/// Anything that contributes upvotes when it appears as a connection node.
pub trait Upvotable {
    /// Upvotes contributed by this single node.
    fn upvotes(&self) -> u64;
}

/// A node that can be reacted to, such as a comment or a linked issue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Reactable {
    /// Reactions left on the node.
    pub reactions: TotalCount,
}

impl Reactable {
    /// Creates a reactable with the given number of reactions.
    #[must_use]
    pub const fn with_reactions(count: u64) -> Self {
        Self {
            reactions: TotalCount::new(count),
        }
    }
}

impl Upvotable for Reactable {
    fn upvotes(&self) -> u64 {
        self.reactions.total_count
    }
}

/// One fetched page of a GraphQL connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    /// Nodes of the current page only.
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
    /// Pagination state of this page.
    #[serde(default)]
    pub page_info: PageInfo,
    /// Total number of nodes across all pages.
    #[serde(default)]
    pub total_count: u64,
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            page_info: PageInfo::default(),
            total_count: 0,
        }
    }
}

impl<T> Connection<T> {
    /// Creates a connection page from its parts.
    #[must_use]
    pub const fn new(nodes: Vec<T>, page_info: PageInfo, total_count: u64) -> Self {
        Self {
            nodes,
            page_info,
            total_count,
        }
    }

    /// Returns true if the connection has another page.
    #[must_use]
    pub const fn has_next_page(&self) -> bool {
        self.page_info.has_next_page()
    }

    /// Returns the cursor marking the end of the current page.
    #[must_use]
    pub fn end_cursor(&self) -> Option<&str> {
        self.page_info.end_cursor()
    }
}

impl<T: Upvotable> Connection<T> {
    /// Sums the upvotes of the nodes in the current page.
    #[must_use]
    pub fn reactable_upvotes(&self) -> u64 {
        self.nodes.iter().map(Upvotable::upvotes).sum()
    }
}
