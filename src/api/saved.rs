use serde::Serialize;

use super::{ApiClient, SavedJobsApi};
use crate::error::ApiError;
use crate::models::{JobId, SavedSearch, SavedSearchId};

/// Saved searches double as per-job favorites: the record's query holds
/// `job_id:<id>` and its name holds the job title.
#[derive(Debug, Serialize, PartialEq)]
pub struct SaveJobPayload {
    pub name: String,
    pub query: String,
}

impl SaveJobPayload {
    pub fn for_job(job_id: JobId, title: &str) -> Self {
        Self {
            name: title.to_string(),
            query: format!("job_id:{}", job_id),
        }
    }
}

impl SavedJobsApi for ApiClient {
    fn saved_searches(&self) -> Result<Vec<SavedSearch>, ApiError> {
        self.get("/saved-searches/")
    }

    fn save_job(&self, job_id: JobId, title: &str) -> Result<SavedSearch, ApiError> {
        self.post("/saved-searches/", &SaveJobPayload::for_job(job_id, title))
    }

    fn unsave_job(&self, saved_search_id: SavedSearchId) -> Result<(), ApiError> {
        self.delete(&format!("/saved-searches/{}/", saved_search_id))
    }
}
