use tracing::{debug, info, warn};

use super::favorites::{SavedJobs, ToggleOutcome};
use super::filters::{with_page, SearchFilters};
use crate::api::{JobSearchApi, SavedJobsApi};
use crate::error::ApiError;
use crate::models::{JobId, JobPosting, Page};

pub const LOAD_ERROR: &str = "Failed to load job listings. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub count: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub current_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            count: 0,
            has_next: false,
            has_previous: false,
            current_page: 1,
        }
    }
}

/// One search request, stamped with the navigation that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub generation: u64,
    pub params: Vec<(String, String)>,
}

/// Search results page state.
///
/// `location` (the current query string) is the source of truth. `filters`
/// is re-derived from it on every navigation and may then be edited
/// locally; edits reach the server only through [`apply_filters`].
///
/// [`apply_filters`]: JobSearchController::apply_filters
#[derive(Debug, Default)]
pub struct JobSearchController {
    location: Option<String>,
    pub filters: SearchFilters,
    pub pagination: Pagination,
    pub jobs: Vec<JobPosting>,
    pub loading: bool,
    pub error: Option<String>,
    pub favorites: SavedJobs,
    generation: u64,
}

impl JobSearchController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current query string without the leading `?`.
    pub fn location(&self) -> &str {
        self.location.as_deref().unwrap_or("")
    }

    /// Moves to `query_string`. Returns the request to issue, or `None` when
    /// the query string did not change.
    pub fn navigate(&mut self, query_string: &str) -> Option<SearchRequest> {
        let query_string = query_string.trim_start_matches('?');
        if self.location.as_deref() == Some(query_string) {
            return None;
        }
        self.location = Some(query_string.to_string());

        let (filters, page) = SearchFilters::parse(query_string);
        self.filters = filters;
        self.pagination.current_page = page;
        self.loading = true;
        self.error = None;
        self.generation += 1;

        debug!(generation = self.generation, page, "Search navigation");
        Some(SearchRequest {
            generation: self.generation,
            params: self.filters.api_params(page),
        })
    }

    /// Settles a request. Responses for anything but the latest navigation
    /// are dropped; returns whether the response was applied.
    pub fn receive(
        &mut self,
        request: &SearchRequest,
        result: Result<Page<JobPosting>, ApiError>,
    ) -> bool {
        if request.generation != self.generation {
            debug!(
                stale = request.generation,
                current = self.generation,
                "Discarding stale search response"
            );
            return false;
        }

        match result {
            Ok(page) => {
                self.pagination.count = page.count;
                self.pagination.has_next = page.next.is_some();
                self.pagination.has_previous = page.previous.is_some();
                self.jobs = page.results;
                info!(count = page.count, "Search results loaded");
            }
            Err(e) => {
                warn!("Job search failed: {}", e);
                self.jobs.clear();
                self.pagination = Pagination {
                    current_page: self.pagination.current_page,
                    ..Pagination::default()
                };
                self.error = Some(LOAD_ERROR.to_string());
            }
        }
        self.loading = false;
        true
    }

    /// Navigates and runs the resulting request, if any.
    pub fn load<A: JobSearchApi>(&mut self, api: &A, query_string: &str) {
        if let Some(request) = self.navigate(query_string) {
            let result = api.search_jobs(&request.params);
            self.receive(&request, result);
        }
    }

    /// Re-runs the current query string, e.g. from a retry button.
    pub fn reload<A: JobSearchApi>(&mut self, api: &A) {
        let current = self.location.take().unwrap_or_default();
        self.load(api, &current);
    }

    /// Query string for the locally edited filters, back on page 1.
    pub fn apply_filters(&self) -> String {
        self.filters.to_query_string(1)
    }

    /// Query string of the bare search path.
    pub fn reset_filters(&self) -> String {
        String::new()
    }

    /// Current query string with only `page` replaced.
    pub fn page_href(&self, page: u32) -> String {
        with_page(self.location(), page.max(1))
    }

    /// `None` on the last page, or when the page number cannot grow.
    pub fn next_page(&self) -> Option<String> {
        if !self.pagination.has_next {
            return None;
        }
        let next = self.pagination.current_page.checked_add(1)?;
        Some(self.page_href(next))
    }

    pub fn previous_page(&self) -> Option<String> {
        (self.pagination.has_previous && self.pagination.current_page > 1)
            .then(|| self.page_href(self.pagination.current_page - 1))
    }

    pub fn refresh_favorites<A: SavedJobsApi>(&mut self, api: &A) {
        self.favorites.refresh(api);
    }

    /// Heart-icon toggle for a job in the current results.
    pub fn toggle_favorite<A: SavedJobsApi>(&mut self, api: &A, job_id: JobId) -> ToggleOutcome {
        let title = self
            .jobs
            .iter()
            .find(|job| job.id == job_id)
            .map(|job| job.title.clone())
            .unwrap_or_default();
        self.favorites.toggle(api, job_id, &title)
    }
}
