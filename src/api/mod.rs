//! REST API access: the shared authenticated client plus one module per
//! resource. Controllers depend on the narrow traits below rather than on
//! `ApiClient`, so they can be driven by fakes in tests.

pub mod applications;
pub mod auth;
mod client;
pub mod documents;
pub mod jobs;
pub mod postings;
pub mod profile;
pub mod saved;

pub use client::{expires_session, ApiClient};

use serde_json::Value;

use crate::error::ApiError;
use crate::models::{
    Application, ApplicationStats, ApplicationStatus, JobId, JobPosting, Page, ProfessionalProfile,
    SavedSearch, SavedSearchId,
};
use applications::ApplicationSubmission;
use profile::ProfileUploads;

pub trait JobSearchApi {
    /// `params` are already serialized filter pairs, `page` included.
    fn search_jobs(&self, params: &[(String, String)]) -> Result<Page<JobPosting>, ApiError>;
}

pub trait SavedJobsApi {
    fn saved_searches(&self) -> Result<Vec<SavedSearch>, ApiError>;
    fn save_job(&self, job_id: JobId, title: &str) -> Result<SavedSearch, ApiError>;
    fn unsave_job(&self, saved_search_id: SavedSearchId) -> Result<(), ApiError>;
}

pub trait PostingApi {
    fn job_posting(&self, id: JobId) -> Result<Value, ApiError>;
    fn create_job_posting(&self, payload: &Value) -> Result<JobPosting, ApiError>;
    fn update_job_posting(&self, id: JobId, payload: &Value) -> Result<Value, ApiError>;
    fn delete_job_posting(&self, id: JobId) -> Result<(), ApiError>;
    fn my_job_postings(&self, page: u32) -> Result<Page<JobPosting>, ApiError>;
}

pub trait ApplicationsApi {
    fn submit_application(&self, submission: &ApplicationSubmission) -> Result<Value, ApiError>;
    fn my_applications(&self) -> Result<Page<Application>, ApiError>;
    fn application_details(&self, id: &str) -> Result<Application, ApiError>;
    fn recruiter_applications(&self, job: Option<JobId>) -> Result<Page<Application>, ApiError>;
    fn update_application_status(&self, id: &str, status: ApplicationStatus) -> Result<(), ApiError>;
    fn withdraw_application(&self, id: &str) -> Result<(), ApiError>;
    fn application_stats(&self) -> Result<ApplicationStats, ApiError>;
}

pub trait ProfileApi {
    fn professional_profile(&self) -> Result<ProfessionalProfile, ApiError>;
    fn update_professional_profile(&self, payload: &Value) -> Result<Value, ApiError>;
    /// Full submit: JSON update with documents, then any picture upload.
    fn submit_professional_profile(
        &self,
        profile: &ProfessionalProfile,
        uploads: &ProfileUploads,
    ) -> Result<Value, ApiError>;
}
