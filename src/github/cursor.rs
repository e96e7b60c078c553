//! Resumption cursors at the two nesting levels of a run.
//!
//! The [`OuterCursor`] marks a position in the project's item list and is
//! persisted between runs. The [`InnerCursorSet`] tracks one cursor per
//! nested connection of the single item being scored and is dropped as soon
//! as that item is finished.

use std::collections::{BTreeMap, BTreeSet};

use super::error::UpvoteError;
use super::models::{ConnectionKind, ConnectionPage};
use super::pagination::PageInfo;

/// Position in the top-level project item list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OuterCursor(Option<String>);

impl OuterCursor {
    /// Cursor pointing at the first page.
    #[must_use]
    pub const fn start() -> Self {
        Self(None)
    }

    /// Restores a persisted cursor; blank values mean "start over".
    #[must_use]
    pub fn resume_from(value: Option<&str>) -> Self {
        Self(
            value
                .map(str::trim)
                .filter(|cursor| !cursor.is_empty())
                .map(ToOwned::to_owned),
        )
    }

    /// Cursor value for the `after` argument; `None` requests the first page.
    #[must_use]
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// Returns true when pointing at the first page.
    #[must_use]
    pub const fn is_start(&self) -> bool {
        self.0.is_none()
    }

    /// Moves past a fully processed page.
    ///
    /// A page without an end cursor (an empty page) leaves the position
    /// unchanged.
    pub fn advance_past(&mut self, page_info: &PageInfo) {
        if let Some(end_cursor) = page_info.end_cursor() {
            self.0 = Some(end_cursor.to_owned());
        }
    }

    /// Value written to the cursor output; empty for the start position.
    #[must_use]
    pub fn output_value(&self) -> &str {
        self.0.as_deref().unwrap_or_default()
    }
}

/// Per-connection cursors for the item currently being scored.
///
/// A connection that reported no further page is exhausted: its cursor is
/// frozen at its last end cursor and later pages of it contribute nothing,
/// so re-querying the item for other connections never double counts it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InnerCursorSet {
    cursors: BTreeMap<ConnectionKind, String>,
    pending: BTreeSet<ConnectionKind>,
    exhausted: BTreeSet<ConnectionKind>,
}

impl InnerCursorSet {
    /// Cursor bound to the connection's `after` variable, if any.
    #[must_use]
    pub fn cursor(&self, kind: ConnectionKind) -> Option<&str> {
        self.cursors.get(&kind).map(String::as_str)
    }

    /// Returns true while any connection still has pages to fetch.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Returns true once the connection has reported its last page.
    #[must_use]
    pub fn is_exhausted(&self, kind: ConnectionKind) -> bool {
        self.exhausted.contains(&kind)
    }

    /// Adds the contributions of one fetched page and advances the cursors.
    ///
    /// # Errors
    ///
    /// Returns [`UpvoteError::MalformedResponse`] when a connection claims a
    /// next page without an end cursor, which would otherwise refetch the
    /// same page forever.
    pub fn absorb(&mut self, pages: &[ConnectionPage<'_>]) -> Result<u64, UpvoteError> {
        let mut upvotes = 0_u64;
        for page in pages {
            if self.is_exhausted(page.kind) {
                continue;
            }
            upvotes = upvotes.saturating_add(page.upvotes);
            if let Some(end_cursor) = page.page_info.end_cursor() {
                self.cursors.insert(page.kind, end_cursor.to_owned());
            }

            if !page.page_info.has_next_page() {
                self.pending.remove(&page.kind);
                self.exhausted.insert(page.kind);
            } else if page.page_info.end_cursor().is_none() {
                return Err(UpvoteError::MalformedResponse {
                    operation: "project item".to_owned(),
                    message: format!("{} reports another page without an end cursor", page.kind),
                });
            } else {
                self.pending.insert(page.kind);
            }
        }
        Ok(upvotes)
    }
}
