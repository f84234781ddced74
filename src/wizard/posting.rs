use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::sync::LazyLock;
use tracing::{info, warn};

use super::{StepForm, Wizard};
use crate::api::PostingApi;
use crate::error::{ApiError, FieldErrors};
use crate::models::JobId;

/// Placeholder the API accepts in otherwise-required text fields.
pub const PLACEHOLDER: &str = "N/A";

pub const PUBLISH_INCOMPLETE: &str = "Please fill all required fields before publishing.";
pub const SUBMIT_FAILED: &str = "An error occurred. Please check the form.";

static EMAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").expect("valid regex"));

const DRAFT_FILLED: [&str; 6] = [
    "description",
    "responsibilities",
    "qualifications",
    "location",
    "contact_email",
    "department",
];

const NUMERIC_OPTIONAL: [&str; 4] = [
    "salary_min",
    "salary_max",
    "total_flying_hours_required",
    "specific_aircraft_hours_required",
];

const DATES: [&str; 2] = ["expected_start_date", "expiry_date"];

const PUBLISH_REQUIRED: [(&str, &str); 7] = [
    ("title", "Job title is required."),
    ("location", "Location is required."),
    ("department", "Department is required."),
    ("description", "Job description is required."),
    ("responsibilities", "Responsibilities are required."),
    ("qualifications", "Qualifications are required."),
    ("contact_email", "Contact email is required."),
];

pub const DEPARTMENTS: [&str; 13] = [
    "Flight Operations",
    "Aircraft Maintenance & Engineering",
    "Ground Operations",
    "Cabin Crew Services",
    "Air Traffic Control",
    "Airport Management",
    "Aviation Safety & Security",
    "Corporate & Administration",
    "Sales & Marketing",
    "Cargo & Logistics",
    "Training & Development",
    "Unmanned Aerial Systems (Drones)",
    "Other",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishStatus {
    Draft,
    Active,
}

impl PublishStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStatus::Draft => "draft",
            PublishStatus::Active => "active",
        }
    }
}

/// Recruiter job-posting form. Text inputs stay strings until the payload
/// is built, so half-typed numbers survive between steps.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JobPostingForm {
    pub title: String,
    pub aircraft_type: String,
    pub location: String,
    pub is_remote: bool,
    pub job_type: String,
    pub department: String,
    pub experience_level: String,
    pub description: String,
    pub responsibilities: String,
    pub qualifications: String,
    pub license_requirements: String,
    pub total_flying_hours_required: String,
    pub specific_aircraft_hours_required: String,
    pub medical_certification_required: String,
    pub contact_email: String,
    pub application_url: String,
    pub salary_min: String,
    pub salary_max: String,
    pub benefits: String,
    pub status: String,
    pub visibility: String,
    pub is_urgent: bool,
    pub expected_start_date: String,
    pub expiry_date: String,
}

impl JobPostingForm {
    pub fn new(contact_email: Option<&str>) -> Self {
        Self {
            title: String::new(),
            aircraft_type: String::new(),
            location: String::new(),
            is_remote: false,
            job_type: "full-time".to_string(),
            department: String::new(),
            experience_level: "entry".to_string(),
            description: String::new(),
            responsibilities: String::new(),
            qualifications: String::new(),
            license_requirements: String::new(),
            total_flying_hours_required: String::new(),
            specific_aircraft_hours_required: String::new(),
            medical_certification_required: String::new(),
            contact_email: contact_email.unwrap_or_default().to_string(),
            application_url: String::new(),
            salary_min: String::new(),
            salary_max: String::new(),
            benefits: String::new(),
            status: "draft".to_string(),
            visibility: "public".to_string(),
            is_urgent: false,
            expected_start_date: String::new(),
            expiry_date: String::new(),
        }
    }

    /// Form pre-filled from an existing posting. Unknown keys are ignored
    /// and timestamps are cut to their date part.
    pub fn from_existing(data: &Value, contact_email: Option<&str>) -> Self {
        let mut form = Self::new(contact_email);
        if let Value::Object(map) = data {
            for (key, value) in map {
                let text = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => continue,
                };
                form.set_field(key, &text);
            }
        }
        for date in [&mut form.expected_start_date, &mut form.expiry_date] {
            if let Some((day, _)) = date.split_once('T') {
                *date = day.to_string();
            }
        }
        form
    }

    fn text_mut(&mut self, name: &str) -> Option<&mut String> {
        Some(match name {
            "title" => &mut self.title,
            "aircraft_type" => &mut self.aircraft_type,
            "location" => &mut self.location,
            "job_type" => &mut self.job_type,
            "department" => &mut self.department,
            "experience_level" => &mut self.experience_level,
            "description" => &mut self.description,
            "responsibilities" => &mut self.responsibilities,
            "qualifications" => &mut self.qualifications,
            "license_requirements" => &mut self.license_requirements,
            "total_flying_hours_required" => &mut self.total_flying_hours_required,
            "specific_aircraft_hours_required" => &mut self.specific_aircraft_hours_required,
            "medical_certification_required" => &mut self.medical_certification_required,
            "contact_email" => &mut self.contact_email,
            "application_url" => &mut self.application_url,
            "salary_min" => &mut self.salary_min,
            "salary_max" => &mut self.salary_max,
            "benefits" => &mut self.benefits,
            "status" => &mut self.status,
            "visibility" => &mut self.visibility,
            "expected_start_date" => &mut self.expected_start_date,
            "expiry_date" => &mut self.expiry_date,
            _ => return None,
        })
    }

    fn text(&self, name: &str) -> &str {
        match name {
            "title" => &self.title,
            "location" => &self.location,
            "department" => &self.department,
            "description" => &self.description,
            "responsibilities" => &self.responsibilities,
            "qualifications" => &self.qualifications,
            "contact_email" => &self.contact_email,
            _ => "",
        }
    }

    fn format_checks(&self, errors: &mut FieldErrors) {
        if !self.contact_email.is_empty() && !EMAIL.is_match(&self.contact_email) {
            errors.insert("contact_email".to_string(), "Email is invalid.".to_string());
        }
        if let (Ok(min), Ok(max)) = (
            self.salary_min.trim().parse::<f64>(),
            self.salary_max.trim().parse::<f64>(),
        ) {
            if min > max {
                errors.insert(
                    "salary_min".to_string(),
                    "Minimum salary cannot be greater than maximum.".to_string(),
                );
            }
        }
    }

    /// Checks run before publishing. `"N/A"` left over from a draft counts
    /// as empty.
    pub fn validate_publish(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for (field, message) in PUBLISH_REQUIRED {
            if is_blank(self.text(field)) {
                errors.insert(field.to_string(), message.to_string());
            }
        }
        self.format_checks(&mut errors);
        errors
    }
}

impl StepForm for JobPostingForm {
    const STEPS: &'static [&'static str] = &[
        "Job Overview",
        "Description",
        "Qualifications",
        "Application Details",
        "Review & Publish",
    ];

    fn validate_step(&self, step: usize) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if step == 1 && is_blank(&self.title) {
            errors.insert("title".to_string(), "Job title is required.".to_string());
        }
        self.format_checks(&mut errors);
        errors
    }

    fn set_field(&mut self, name: &str, value: &str) -> bool {
        match name {
            "is_remote" | "is_urgent" => {
                let Ok(flag) = value.trim().parse::<bool>() else {
                    return false;
                };
                if name == "is_remote" {
                    self.is_remote = flag;
                } else {
                    self.is_urgent = flag;
                }
                true
            }
            _ => match self.text_mut(name) {
                Some(field) => {
                    *field = value.to_string();
                    true
                }
                None => false,
            },
        }
    }
}

fn is_blank(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed == PLACEHOLDER
}

/// Request body for create/update.
///
/// `aircraft_type` always falls back to `"N/A"`; drafts also fill the
/// API-required text fields with it. Empty numeric fields are left out and
/// empty dates are sent as null.
pub fn build_payload(form: &JobPostingForm, status: PublishStatus) -> Value {
    let is_draft = status == PublishStatus::Draft;
    let mut payload = match serde_json::to_value(form) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    payload.insert("status".to_string(), Value::String(status.as_str().to_string()));

    fill_placeholder(&mut payload, "aircraft_type");
    if is_draft {
        for field in DRAFT_FILLED {
            fill_placeholder(&mut payload, field);
        }
    }

    for field in NUMERIC_OPTIONAL {
        let raw = payload
            .get(field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();
        if raw.is_empty() {
            payload.remove(field);
        } else {
            payload.insert(field.to_string(), to_number(&raw));
        }
    }

    for field in DATES {
        if payload.get(field).and_then(Value::as_str).is_none_or(str::is_empty) {
            payload.insert(field.to_string(), Value::Null);
        }
    }

    Value::Object(payload)
}

fn fill_placeholder(payload: &mut Map<String, Value>, field: &str) {
    let empty = payload
        .get(field)
        .and_then(Value::as_str)
        .is_none_or(|s| s.trim().is_empty());
    if empty {
        payload.insert(field.to_string(), Value::String(PLACEHOLDER.to_string()));
    }
}

/// Whole numbers go out as integers; anything unparsable becomes null.
fn to_number(raw: &str) -> Value {
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
            Value::Number(Number::from(n as i64))
        }
        Ok(n) => Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null),
        Err(_) => Value::Null,
    }
}

/// Job-posting wizard plus the id of the posting it is editing. A first
/// save creates the posting; later saves update it.
#[derive(Debug, Clone)]
pub struct PostingWizard {
    pub wizard: Wizard<JobPostingForm>,
    pub job_id: Option<JobId>,
}

impl PostingWizard {
    pub fn new(contact_email: Option<&str>) -> Self {
        Self {
            wizard: Wizard::new(JobPostingForm::new(contact_email)),
            job_id: None,
        }
    }

    pub fn edit<A: PostingApi>(api: &A, job_id: JobId, contact_email: Option<&str>) -> Result<Self, ApiError> {
        let data = api.job_posting(job_id)?;
        Ok(Self {
            wizard: Wizard::new(JobPostingForm::from_existing(&data, contact_email)),
            job_id: Some(job_id),
        })
    }

    /// Saves as draft or publishes. `Ok` carries the confirmation, `Err`
    /// the notification to show; field errors land in `wizard.errors`.
    pub fn submit<A: PostingApi>(&mut self, api: &A, status: PublishStatus) -> Result<&'static str, &'static str> {
        let is_draft = status == PublishStatus::Draft;
        if !is_draft {
            // Walk the steps so the wizard stops on the first one that fails
            self.wizard.restart();
            if !self.wizard.advance_to_last() {
                return Err(PUBLISH_INCOMPLETE);
            }
            let errors = self.wizard.form.validate_publish();
            if !errors.is_empty() {
                self.wizard.show_errors(errors);
                return Err(PUBLISH_INCOMPLETE);
            }
        }

        let payload = build_payload(&self.wizard.form, status);
        let result = match self.job_id {
            Some(id) => api.update_job_posting(id, &payload).map(|_| (id, false)),
            None => api.create_job_posting(&payload).map(|job| (job.id, true)),
        };

        match result {
            Ok((id, created)) => {
                info!(job_id = id, status = status.as_str(), created, "Job posting saved");
                self.job_id = Some(id);
                self.wizard.form.status = status.as_str().to_string();
                self.wizard.errors.clear();
                if !is_draft {
                    self.wizard.complete();
                }
                Ok(match (is_draft, created) {
                    (true, true) => "Draft saved successfully!",
                    (true, false) => "Draft updated successfully!",
                    (false, true) => "Job published successfully!",
                    (false, false) => "Job updated successfully!",
                })
            }
            Err(e) => {
                warn!("Saving job posting failed: {}", e);
                if let Some(errors) = e.field_errors() {
                    self.wizard.show_errors(errors.clone());
                }
                Err(SUBMIT_FAILED)
            }
        }
    }
}
