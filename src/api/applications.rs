use serde::Serialize;
use serde_json::Value;

use super::{ApiClient, ApplicationsApi};
use crate::error::ApiError;
use crate::models::{Application, ApplicationStats, ApplicationStatus, JobId, Page};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EncodedDocument {
    pub document_data: String, // data URL
    pub name: String,
    pub document_type: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ApplicationSubmission {
    pub job: JobId,
    pub cover_letter: String,
    pub documents: Vec<EncodedDocument>,
    pub answers: Value,
}

impl ApplicationsApi for ApiClient {
    fn submit_application(&self, submission: &ApplicationSubmission) -> Result<Value, ApiError> {
        self.post("/applications/", submission)
    }

    fn my_applications(&self) -> Result<Page<Application>, ApiError> {
        self.get("/applications/")
    }

    fn application_details(&self, id: &str) -> Result<Application, ApiError> {
        self.get(&format!("/applications/{}/", id))
    }

    fn recruiter_applications(&self, job: Option<JobId>) -> Result<Page<Application>, ApiError> {
        match job {
            Some(job) => self.get_with_query("/applications/", &[("job", job)]),
            None => self.get("/applications/"),
        }
    }

    fn update_application_status(&self, id: &str, status: ApplicationStatus) -> Result<(), ApiError> {
        let _: Value = self.patch(
            &format!("/applications/{}/", id),
            &serde_json::json!({ "status": status }),
        )?;
        Ok(())
    }

    fn withdraw_application(&self, id: &str) -> Result<(), ApiError> {
        let _: Value = self.post_empty(&format!("/applications/{}/withdraw/", id))?;
        Ok(())
    }

    fn application_stats(&self) -> Result<ApplicationStats, ApiError> {
        self.get("/applications/stats/")
    }
}
