use serde_json::Value;

use super::{ApiClient, PostingApi};
use crate::error::ApiError;
use crate::models::{JobId, JobPosting, Page};

impl ApiClient {
    pub fn active_job_postings(&self) -> Result<Vec<JobPosting>, ApiError> {
        self.get("/job-postings/active/list/")
    }
}

impl PostingApi for ApiClient {
    fn job_posting(&self, id: JobId) -> Result<Value, ApiError> {
        self.get(&format!("/job-postings/{}/", id))
    }

    fn create_job_posting(&self, payload: &Value) -> Result<JobPosting, ApiError> {
        self.post("/job-postings/add/", payload)
    }

    fn update_job_posting(&self, id: JobId, payload: &Value) -> Result<Value, ApiError> {
        self.patch(&format!("/job-postings/update/{}/", id), payload)
    }

    fn delete_job_posting(&self, id: JobId) -> Result<(), ApiError> {
        self.delete(&format!("/job-postings/delete/{}/", id))
    }

    fn my_job_postings(&self, page: u32) -> Result<Page<JobPosting>, ApiError> {
        self.get(&format!("/recruiter/job-postings/list/?page={}", page))
    }
}
