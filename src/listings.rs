use serde_json::json;
use tracing::{debug, info, warn};

use crate::api::{ApplicationsApi, PostingApi};
use crate::models::{ApplicationStats, JobId, JobPosting};

pub const JOBS_PER_PAGE: usize = 5;

// Guard against a server that never stops returning `next`
const MAX_PAGES: u32 = 500;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusTab {
    #[default]
    All,
    Active,
    Draft,
    Closed,
}

impl StatusTab {
    pub fn matches(&self, status: Option<&str>) -> bool {
        match self {
            StatusTab::All => true,
            StatusTab::Active => status == Some("active"),
            StatusTab::Draft => status == Some("draft"),
            StatusTab::Closed => status == Some("closed"),
        }
    }
}

/// The recruiter's "manage listings" page: every posting they own, with
/// applicant counts joined in from the stats endpoint.
#[derive(Debug, Default)]
pub struct ManageListings {
    pub jobs: Vec<JobPosting>,
    pub stats: Option<ApplicationStats>,
    pub status_tab: StatusTab,
    pub search_term: String,
    pub current_page: usize,
    pub loading: bool,
    pub error: Option<String>,
}

impl ManageListings {
    pub fn new() -> Self {
        Self {
            current_page: 1,
            ..Default::default()
        }
    }

    pub fn load<A: PostingApi + ApplicationsApi>(&mut self, api: &A) {
        self.loading = true;
        self.error = None;
        match Self::fetch(api) {
            Ok((jobs, stats)) => {
                info!(count = jobs.len(), "Loaded job listings");
                self.jobs = jobs;
                self.stats = Some(stats);
            }
            Err(e) => {
                warn!("Failed to fetch job listings: {}", e);
                self.error = Some("Failed to fetch job listings. Please try again.".to_string());
            }
        }
        self.loading = false;
    }

    fn fetch<A: PostingApi + ApplicationsApi>(
        api: &A,
    ) -> Result<(Vec<JobPosting>, ApplicationStats), crate::error::ApiError> {
        let mut jobs = Vec::new();
        let mut page = 1;
        loop {
            let response = api.my_job_postings(page)?;
            debug!(page, results = response.results.len(), "Fetched postings page");
            jobs.extend(response.results);
            if response.next.is_none() || page >= MAX_PAGES {
                break;
            }
            page += 1;
        }

        let stats = api.application_stats()?;
        for job in &mut jobs {
            let count = stats
                .job_breakdown
                .get(&job.id.to_string())
                .map_or(0, |b| b.count as i64);
            job.applicants_count = Some(count);
        }
        Ok((jobs, stats))
    }

    /// Postings matching the tab and search term, newest first.
    pub fn filtered(&self) -> Vec<&JobPosting> {
        let term = self.search_term.to_lowercase();
        let contains = |field: &Option<String>| {
            field
                .as_deref()
                .is_some_and(|value| value.to_lowercase().contains(&term))
        };
        let mut jobs: Vec<&JobPosting> = self
            .jobs
            .iter()
            .filter(|job| self.status_tab.matches(job.status.as_deref()))
            .filter(|job| term.is_empty() || job.title.to_lowercase().contains(&term) || contains(&job.location))
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    pub fn total_pages(&self) -> usize {
        self.filtered().len().div_ceil(JOBS_PER_PAGE)
    }

    pub fn page(&self) -> Vec<&JobPosting> {
        let start = self.current_page.saturating_sub(1) * JOBS_PER_PAGE;
        self.filtered().into_iter().skip(start).take(JOBS_PER_PAGE).collect()
    }

    /// Flips a posting between active and draft.
    pub fn toggle_status<A: PostingApi>(&mut self, api: &A, job_id: JobId) -> Result<String, String> {
        let Some(job) = self.jobs.iter().find(|j| j.id == job_id) else {
            return Err(format!("No job posting with id {}", job_id));
        };
        let new_status = if job.status.as_deref() == Some("active") {
            "draft"
        } else {
            "active"
        };

        match api.update_job_posting(job_id, &json!({ "status": new_status })) {
            Ok(_) => {
                if let Some(job) = self.jobs.iter_mut().find(|j| j.id == job_id) {
                    job.status = Some(new_status.to_string());
                }
                info!(job_id, status = new_status, "Job status toggled");
                Ok(format!("Job has been set to {}.", new_status))
            }
            Err(e) => {
                warn!(job_id, "Failed to update job status: {}", e);
                Err("Failed to update job status.".to_string())
            }
        }
    }

    pub fn delete<A: PostingApi>(&mut self, api: &A, job_id: JobId) -> Result<String, String> {
        let title = self
            .jobs
            .iter()
            .find(|j| j.id == job_id)
            .map(|j| j.title.clone())
            .unwrap_or_else(|| format!("#{}", job_id));

        match api.delete_job_posting(job_id) {
            Ok(()) => {
                self.jobs.retain(|j| j.id != job_id);
                info!(job_id, "Job posting deleted");
                Ok(format!("Job \"{}\" has been deleted.", title))
            }
            Err(e) => {
                warn!(job_id, "Failed to delete job posting: {}", e);
                Err("Failed to delete job posting.".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::applications::ApplicationSubmission;
    use crate::error::ApiError;
    use crate::models::{Application, ApplicationStatus, Page};
    use serde_json::Value;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeRecruiter {
        pages: Vec<Vec<JobPosting>>,
        fail_update: bool,
        calls: RefCell<Vec<String>>,
    }

    impl PostingApi for FakeRecruiter {
        fn job_posting(&self, _id: JobId) -> Result<Value, ApiError> {
            unreachable!()
        }

        fn create_job_posting(&self, _payload: &Value) -> Result<JobPosting, ApiError> {
            unreachable!()
        }

        fn update_job_posting(&self, id: JobId, payload: &Value) -> Result<Value, ApiError> {
            self.calls.borrow_mut().push(format!("update {} {}", id, payload["status"]));
            if self.fail_update {
                return Err(ApiError::Status { status: 500, body: String::new() });
            }
            Ok(payload.clone())
        }

        fn delete_job_posting(&self, id: JobId) -> Result<(), ApiError> {
            self.calls.borrow_mut().push(format!("delete {}", id));
            Ok(())
        }

        fn my_job_postings(&self, page: u32) -> Result<Page<JobPosting>, ApiError> {
            self.calls.borrow_mut().push(format!("page {}", page));
            let index = page as usize - 1;
            Ok(Page {
                results: self.pages[index].clone(),
                count: 0,
                next: (index + 1 < self.pages.len()).then(|| format!("?page={}", page + 1)),
                previous: None,
            })
        }
    }

    impl ApplicationsApi for FakeRecruiter {
        fn submit_application(&self, _s: &ApplicationSubmission) -> Result<Value, ApiError> {
            unreachable!()
        }

        fn my_applications(&self) -> Result<Page<Application>, ApiError> {
            unreachable!()
        }

        fn application_details(&self, _id: &str) -> Result<Application, ApiError> {
            unreachable!()
        }

        fn recruiter_applications(&self, _job: Option<JobId>) -> Result<Page<Application>, ApiError> {
            unreachable!()
        }

        fn update_application_status(&self, _id: &str, _status: ApplicationStatus) -> Result<(), ApiError> {
            unreachable!()
        }

        fn withdraw_application(&self, _id: &str) -> Result<(), ApiError> {
            unreachable!()
        }

        fn application_stats(&self) -> Result<ApplicationStats, ApiError> {
            Ok(serde_json::from_value(json!({
                "total_applications": 6,
                "active_applications": 4,
                "job_breakdown": {"1": {"count": 4, "title": "Captain"}, "3": {"count": 2}}
            }))
            .unwrap())
        }
    }

    fn job(id: JobId, title: &str, location: &str, status: &str, created: &str) -> JobPosting {
        serde_json::from_value(json!({
            "id": id,
            "title": title,
            "location": location,
            "status": status,
            "created_at": created
        }))
        .unwrap()
    }

    fn recruiter() -> FakeRecruiter {
        let mut all: Vec<JobPosting> = (1..=7)
            .map(|i| {
                let status = if i % 2 == 0 { "draft" } else { "active" };
                job(i, &format!("Role {}", i), "Accra", status, &format!("2026-01-0{}", i))
            })
            .collect();
        all.push(job(8, "B787 Captain", "Nairobi", "closed", "2026-01-09"));
        FakeRecruiter {
            pages: all.chunks(3).map(|c| c.to_vec()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_load_follows_next_and_joins_counts() {
        let api = recruiter();
        let mut listings = ManageListings::new();
        listings.load(&api);

        assert_eq!(listings.jobs.len(), 8);
        assert_eq!(api.calls.borrow().as_slice(), ["page 1", "page 2", "page 3"]);
        assert_eq!(listings.jobs[0].applicants_count, Some(4));
        assert_eq!(listings.jobs[1].applicants_count, Some(0));
        assert_eq!(listings.jobs[2].applicants_count, Some(2));
    }

    #[test]
    fn test_filter_sort_and_paginate() {
        let api = recruiter();
        let mut listings = ManageListings::new();
        listings.load(&api);

        assert_eq!(listings.total_pages(), 2);
        let first: Vec<JobId> = listings.page().iter().map(|j| j.id).collect();
        assert_eq!(first, vec![8, 7, 6, 5, 4]);
        listings.current_page = 2;
        let second: Vec<JobId> = listings.page().iter().map(|j| j.id).collect();
        assert_eq!(second, vec![3, 2, 1]);

        listings.status_tab = StatusTab::Draft;
        let drafts: Vec<JobId> = listings.filtered().iter().map(|j| j.id).collect();
        assert_eq!(drafts, vec![6, 4, 2]);

        listings.status_tab = StatusTab::All;
        listings.search_term = "nairobi".to_string();
        assert_eq!(listings.filtered().len(), 1);
        listings.search_term = "ROLE 1".to_string();
        assert_eq!(listings.filtered()[0].id, 1);
    }

    #[test]
    fn test_toggle_status() {
        let api = recruiter();
        let mut listings = ManageListings::new();
        listings.load(&api);

        assert_eq!(listings.toggle_status(&api, 1), Ok("Job has been set to draft.".to_string()));
        assert_eq!(listings.jobs[0].status.as_deref(), Some("draft"));
        assert_eq!(listings.toggle_status(&api, 2), Ok("Job has been set to active.".to_string()));
        assert!(api.calls.borrow().contains(&"update 1 \"draft\"".to_string()));
    }

    #[test]
    fn test_toggle_failure_keeps_status() {
        let mut api = recruiter();
        api.fail_update = true;
        let mut listings = ManageListings::new();
        listings.load(&api);
        assert_eq!(listings.toggle_status(&api, 1), Err("Failed to update job status.".to_string()));
        assert_eq!(listings.jobs[0].status.as_deref(), Some("active"));
    }

    #[test]
    fn test_delete_removes_locally() {
        let api = recruiter();
        let mut listings = ManageListings::new();
        listings.load(&api);
        assert_eq!(
            listings.delete(&api, 8),
            Ok("Job \"B787 Captain\" has been deleted.".to_string())
        );
        assert!(listings.jobs.iter().all(|j| j.id != 8));
    }
}
