//! Pagination cursor for a single job's result set.
//!
//! Forward navigation rides the engine's continuation tokens; backward
//! navigation falls back to raw offsets because only forward tokens exist.
//! `start_index` is the offset of the next forward fetch and only ever
//! advances by the number of rows a fetch actually returned.

use crate::error::{ConsoleError, Result};

/// Default rows per page
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Parameters for one page fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFetch {
    /// Offset of the first row to fetch
    pub offset: u64,
    /// Continuation token to ride, when forward navigation has one
    pub token: Option<String>,
}

/// Mutable pagination state, owned by one session for the life of the runner.
#[derive(Debug, Clone)]
pub struct PaginationState {
    start_index: u64,
    page_size: u32,
    page_token: Option<String>,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl PaginationState {
    pub fn new(page_size: u32) -> Self {
        Self {
            start_index: 0,
            page_size,
            page_token: None,
        }
    }

    /// Discard all progress: offset back to 0, token gone. Run on every new
    /// job, since a token is only meaningful against the job that issued it.
    pub fn reset(&mut self) {
        self.start_index = 0;
        self.page_token = None;
    }

    /// The forward fetch from the current position
    pub fn next_fetch(&self) -> PageFetch {
        PageFetch {
            offset: self.start_index,
            token: self.page_token.clone(),
        }
    }

    /// The backward fetch: an offset-based refetch at
    /// `max(0, start_index - 2 * page_size)`, discarding the token.
    ///
    /// Fails with "no more previous pages" when the cursor is at the start.
    pub fn prev_fetch(&self) -> Result<PageFetch> {
        if self.start_index == 0 {
            return Err(ConsoleError::NoMorePreviousPages);
        }
        Ok(PageFetch {
            offset: self
                .start_index
                .saturating_sub(2 * u64::from(self.page_size)),
            token: None,
        })
    }

    /// Record a completed fetch: the cursor lands just past the rows that
    /// actually came back, and holds whatever token the engine returned.
    pub fn record_page(&mut self, page_start: u64, rows_returned: usize, token: Option<String>) {
        self.start_index = page_start + rows_returned as u64;
        self.page_token = token;
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn start_index(&self) -> u64 {
        self.start_index
    }

    /// A continuation token is in hand, so a forward page exists
    pub fn has_next(&self) -> bool {
        self.page_token.is_some()
    }
}
