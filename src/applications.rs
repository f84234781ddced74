//! Job applications: the applicant's submit form and list, and the
//! recruiter's review list.

use anyhow::{bail, Result};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::api::applications::{ApplicationSubmission, EncodedDocument};
use crate::api::documents::{file_name, read_data_url};
use crate::api::ApplicationsApi;
use crate::error::FieldErrors;
use crate::models::{Application, ApplicationStatus, JobId};

pub const MIN_COVER_LETTER_CHARS: usize = 100;
pub const COVER_LETTER_TOO_SHORT: &str = "Your cover letter must be at least 100 characters long.";

pub const DOCUMENT_TYPES: [&str; 7] = [
    "cv",
    "cover_letter",
    "certificate",
    "license",
    "reference",
    "portfolio",
    "other",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub path: PathBuf,
    pub document_type: String,
}

impl DocumentUpload {
    /// Parses `TYPE=PATH`, or a bare `PATH` which is filed as a CV.
    pub fn parse(arg: &str) -> Result<Self> {
        let (document_type, path) = match arg.split_once('=') {
            Some((kind, path)) if DOCUMENT_TYPES.contains(&kind) => (kind, path),
            Some((kind, _)) if !kind.contains(std::path::MAIN_SEPARATOR) => {
                bail!(
                    "Unknown document type '{}', expected one of: {}",
                    kind,
                    DOCUMENT_TYPES.join(", ")
                )
            }
            _ => ("cv", arg),
        };
        if path.is_empty() {
            bail!("Missing file path in '{}'", arg);
        }
        Ok(Self {
            path: PathBuf::from(path),
            document_type: document_type.to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ApplicationForm {
    pub job: JobId,
    pub cover_letter: String,
    pub additional_information: String,
    pub documents: Vec<DocumentUpload>,
}

impl ApplicationForm {
    pub fn new(job: JobId) -> Self {
        Self {
            job,
            cover_letter: String::new(),
            additional_information: String::new(),
            documents: Vec::new(),
        }
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.cover_letter.chars().count() < MIN_COVER_LETTER_CHARS {
            errors.insert("cover_letter".to_string(), COVER_LETTER_TOO_SHORT.to_string());
        }
        errors
    }

    /// Reads every attached file into an inline data URL.
    pub fn encode(&self) -> Result<ApplicationSubmission> {
        let documents = self
            .documents
            .iter()
            .map(|doc| {
                Ok(EncodedDocument {
                    document_data: read_data_url(&doc.path)?,
                    name: file_name(&doc.path),
                    document_type: doc.document_type.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ApplicationSubmission {
            job: self.job,
            cover_letter: self.cover_letter.clone(),
            documents,
            answers: json!({ "additional_information": self.additional_information }),
        })
    }

    /// Validates, encodes and submits. `Err` carries the message to show;
    /// nothing is sent when validation fails.
    pub fn submit<A: ApplicationsApi>(&self, api: &A) -> std::result::Result<Value, String> {
        if let Some(message) = self.validate().into_values().next() {
            return Err(message);
        }
        let submission = self.encode().map_err(|e| format!("{:#}", e))?;
        match api.submit_application(&submission) {
            Ok(created) => {
                info!(job = self.job, "Application submitted");
                Ok(created)
            }
            Err(e) => {
                warn!(job = self.job, "Application failed: {}", e);
                Err(e
                    .detail()
                    .unwrap_or_else(|| "An unexpected error occurred during application.".to_string()))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplicantStats {
    pub total: usize,
    pub active: usize,
    pub interviews: usize,
}

/// The applicant's own applications.
#[derive(Debug, Default)]
pub struct MyApplications {
    pub applications: Vec<Application>,
    pub loading: bool,
    pub error: Option<String>,
}

impl MyApplications {
    pub fn load<A: ApplicationsApi>(&mut self, api: &A) {
        self.loading = true;
        self.error = None;
        match api.my_applications() {
            Ok(page) => self.applications = page.results,
            Err(e) => {
                warn!("Failed to load applications: {}", e);
                self.error = Some("Failed to load your applications. Please try again later.".to_string());
            }
        }
        self.loading = false;
    }

    /// Fetches one application and folds its expanded job into the list.
    pub fn details<A: ApplicationsApi>(&mut self, api: &A, id: &str) -> Option<Application> {
        match api.application_details(id) {
            Ok(detail) => {
                if let Some(app) = self.applications.iter_mut().find(|a| a.id == id) {
                    app.job = detail.job.clone();
                }
                Some(detail)
            }
            Err(e) => {
                warn!(id, "Failed to fetch application details: {}", e);
                self.error = Some("Could not fetch application details.".to_string());
                None
            }
        }
    }

    /// Withdraws and marks the local entry withdrawn; the list is not
    /// refetched.
    pub fn withdraw<A: ApplicationsApi>(&mut self, api: &A, id: &str) -> bool {
        let Some(app) = self.applications.iter().find(|a| a.id == id) else {
            self.error = Some(format!("No application with id {}", id));
            return false;
        };
        if !app.status.can_withdraw() {
            self.error = Some(format!("A {} application cannot be withdrawn.", app.status.label().to_lowercase()));
            return false;
        }

        match api.withdraw_application(id) {
            Ok(()) => {
                if let Some(app) = self.applications.iter_mut().find(|a| a.id == id) {
                    app.status = ApplicationStatus::Withdrawn;
                }
                info!(id, "Application withdrawn");
                true
            }
            Err(e) => {
                warn!(id, "Withdraw failed: {}", e);
                self.error = Some("Failed to withdraw application.".to_string());
                false
            }
        }
    }

    pub fn stats(&self) -> ApplicantStats {
        ApplicantStats {
            total: self.applications.len(),
            active: self.applications.iter().filter(|a| !a.status.is_terminal()).count(),
            interviews: self
                .applications
                .iter()
                .filter(|a| a.status == ApplicationStatus::Interview)
                .count(),
        }
    }
}

/// Status tabs on the recruiter review page.
pub const REVIEW_FILTERS: [Option<ApplicationStatus>; 5] = [
    None,
    Some(ApplicationStatus::Submitted),
    Some(ApplicationStatus::UnderReview),
    Some(ApplicationStatus::Shortlisted),
    Some(ApplicationStatus::Interview),
];

/// Statuses a recruiter can pick from the row menu.
pub const REVIEW_STATUS_OPTIONS: [ApplicationStatus; 5] = [
    ApplicationStatus::Submitted,
    ApplicationStatus::UnderReview,
    ApplicationStatus::Shortlisted,
    ApplicationStatus::Interview,
    ApplicationStatus::Rejected,
];

/// Recruiter view of applications, optionally scoped to one posting.
#[derive(Debug, Default)]
pub struct ApplicationReview {
    pub job: Option<JobId>,
    pub applications: Vec<Application>,
    pub status_filter: Option<ApplicationStatus>,
    pub search_term: String,
    pub loading: bool,
    pub error: Option<String>,
}

impl ApplicationReview {
    pub fn new(job: Option<JobId>) -> Self {
        Self {
            job,
            ..Default::default()
        }
    }

    pub fn load<A: ApplicationsApi>(&mut self, api: &A) {
        self.loading = true;
        self.error = None;
        match api.recruiter_applications(self.job) {
            Ok(page) => self.applications = page.results,
            Err(e) => {
                warn!(job = ?self.job, "Failed to load applications: {}", e);
                self.error = Some("Could not load applications. Please try again later.".to_string());
            }
        }
        self.loading = false;
    }

    /// Optimistic status change; the whole list is restored on failure.
    pub fn update_status<A: ApplicationsApi>(&mut self, api: &A, id: &str, status: ApplicationStatus) -> bool {
        let original = self.applications.clone();
        let mut found = false;
        for app in self.applications.iter_mut().filter(|a| a.id == id) {
            app.status = status;
            found = true;
        }
        if !found {
            self.error = Some(format!("No application with id {}", id));
            return false;
        }

        match api.update_application_status(id, status) {
            Ok(()) => {
                info!(id, status = status.as_str(), "Application status updated");
                true
            }
            Err(e) => {
                warn!(id, "Status update failed, rolling back: {}", e);
                self.applications = original;
                self.error = Some("Failed to update status. Please try again.".to_string());
                false
            }
        }
    }

    /// Applications for the selected tab and search term, newest first.
    pub fn filtered(&self) -> Vec<&Application> {
        let term = self.search_term.to_lowercase();
        let mut apps: Vec<&Application> = self
            .applications
            .iter()
            .filter(|a| self.status_filter.is_none_or(|s| a.status == s))
            .filter(|a| {
                term.is_empty()
                    || a.applicant_name
                        .as_deref()
                        .is_some_and(|name| name.to_lowercase().contains(&term))
            })
            .collect();
        apps.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        apps
    }

    /// Count per status tab, `None` being "all".
    pub fn counts(&self) -> BTreeMap<&'static str, usize> {
        REVIEW_FILTERS
            .iter()
            .map(|filter| {
                let count = match filter {
                    None => self.applications.len(),
                    Some(status) => self.applications.iter().filter(|a| a.status == *status).count(),
                };
                (filter.map_or("all", |s| s.as_str()), count)
            })
            .collect()
    }
}
