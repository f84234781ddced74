use serde::{Deserialize, Serialize};

use super::{ApiClient, JobSearchApi};
use crate::error::ApiError;
use crate::models::{JobId, JobPosting, Page, Suggestion};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMatch {
    pub job: JobPosting,
    #[serde(default)]
    pub match_score: f64,
    #[serde(default)]
    pub is_match: bool,
}

/// `/jobs/matching/` answers `{matches_count, matches: [...]}`; a bare list
/// is the only other shape accepted.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MatchingResponse {
    Wrapped { matches: Vec<JobMatch> },
    Bare(Vec<JobMatch>),
}

impl From<MatchingResponse> for Vec<JobMatch> {
    fn from(response: MatchingResponse) -> Self {
        match response {
            MatchingResponse::Wrapped { matches } => matches,
            MatchingResponse::Bare(matches) => matches,
        }
    }
}

impl ApiClient {
    pub fn job_details(&self, id: JobId) -> Result<JobPosting, ApiError> {
        self.get(&format!("/jobs/{}/", id))
    }

    pub fn search_suggestions(&self, query: &str, kind: &str) -> Result<Vec<Suggestion>, ApiError> {
        self.get_with_query("/jobs/suggestions/", &[("q", query), ("type", kind)])
    }

    pub fn recommended_jobs(&self) -> Result<Vec<JobMatch>, ApiError> {
        let response: MatchingResponse = self.get("/jobs/matching/")?;
        Ok(response.into())
    }
}

impl JobSearchApi for ApiClient {
    fn search_jobs(&self, params: &[(String, String)]) -> Result<Page<JobPosting>, ApiError> {
        self.get_with_query("/jobs/search/", params)
    }
}
