use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub type JobId = i64;
pub type SavedSearchId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobPosting {
    pub id: JobId,
    pub title: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub job_type: Option<String>, // "full-time", "part-time", "contract", ...
    #[serde(default)]
    pub experience_level: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub aircraft_type: Option<String>,
    #[serde(default)]
    pub is_remote: bool,
    // DRF sends decimals as strings
    #[serde(default, deserialize_with = "de_opt_number")]
    pub salary_min: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub salary_max: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub responsibilities: Option<String>,
    #[serde(default)]
    pub qualifications: Option<String>,
    #[serde(default)]
    pub status: Option<String>, // "draft", "active", "closed"
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub recruiter_name: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub views: Option<i64>,
    #[serde(default)]
    pub applicants_count: Option<i64>,
}

impl JobPosting {
    pub fn employer(&self) -> Option<&str> {
        self.company_name
            .as_deref()
            .or(self.recruiter_name.as_deref())
    }

    pub fn salary_label(&self) -> String {
        format_salary(self.salary_min, self.salary_max)
    }
}

/// Salary range in the job card's "$80K - $120K" style.
pub fn format_salary(min: Option<f64>, max: Option<f64>) -> String {
    let k = |n: f64| format!("${:.0}K", n / 1000.0);
    match (min.filter(|v| *v > 0.0), max.filter(|v| *v > 0.0)) {
        (None, None) => "Competitive Salary".to_string(),
        (Some(min), Some(max)) => format!("{} - {}", k(min), k(max)),
        (Some(v), None) | (None, Some(v)) => format!("Up to {}", k(v)),
    }
}

/// Paginated list envelope used by every DRF list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            count: 0,
            next: None,
            previous: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    UnderReview,
    Shortlisted,
    Interview,
    OfferExtended,
    Hired,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 8] = [
        ApplicationStatus::Submitted,
        ApplicationStatus::UnderReview,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::Interview,
        ApplicationStatus::OfferExtended,
        ApplicationStatus::Hired,
        ApplicationStatus::Rejected,
        ApplicationStatus::Withdrawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::UnderReview => "under_review",
            ApplicationStatus::Shortlisted => "shortlisted",
            ApplicationStatus::Interview => "interview",
            ApplicationStatus::OfferExtended => "offer_extended",
            ApplicationStatus::Hired => "hired",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    /// No further workflow moves, including withdrawal by the applicant.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Hired | ApplicationStatus::Rejected | ApplicationStatus::Withdrawn
        )
    }

    pub fn can_withdraw(&self) -> bool {
        !self.is_terminal()
    }

    pub fn label(&self) -> String {
        let s = self.as_str().replace('_', " ");
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
            None => s,
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace([' ', '-'], "_");
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| format!("Unknown application status '{}'", s))
    }
}

/// Applications embed the job either as a nested object or a bare id.
/// Null when the posting was deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum JobRef {
    Detail(Box<JobPosting>),
    Id(JobId),
}

impl JobRef {
    pub fn id(&self) -> JobId {
        match self {
            JobRef::Detail(job) => job.id,
            JobRef::Id(id) => *id,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            JobRef::Detail(job) => Some(&job.title),
            JobRef::Id(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplicationDocument {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub document_type: String,
    #[serde(default)]
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Application {
    pub id: String,
    #[serde(default)]
    pub job: Option<JobRef>,
    #[serde(default)]
    pub applicant_name: Option<String>,
    #[serde(default)]
    pub applicant_email: Option<String>,
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub documents: Vec<ApplicationDocument>,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Application {
    pub fn job_title(&self) -> &str {
        self.job
            .as_ref()
            .and_then(JobRef::title)
            .unwrap_or("(job removed)")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobBreakdown {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub title: Option<String>,
}

/// `/applications/stats/` payload; recruiter and professional variants share
/// the counters they have in common.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationStats {
    #[serde(default)]
    pub total_applications: u64,
    #[serde(default)]
    pub active_applications: u64,
    #[serde(default)]
    pub new_applications: Option<u64>,
    #[serde(default)]
    pub interviews: Option<u64>,
    #[serde(default)]
    pub offers: Option<u64>,
    #[serde(default)]
    pub hired: Option<u64>,
    #[serde(default)]
    pub status_breakdown: HashMap<String, Value>,
    #[serde(default)]
    pub job_breakdown: HashMap<String, JobBreakdown>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SavedSearch {
    pub id: SavedSearchId,
    pub name: String,
    pub query: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    #[serde(default)]
    pub id: Option<Value>,
    pub email: String,
    #[serde(default)]
    pub role: Option<String>, // "professional", "recruiter", "admin"
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    /// Shallow merge of a profile response into the cached user.
    pub fn merged_with(&self, update: &Value) -> User {
        let mut base = serde_json::to_value(self).unwrap_or(Value::Null);
        if let (Value::Object(base_map), Value::Object(update_map)) = (&mut base, update) {
            for (k, v) in update_map {
                base_map.insert(k.clone(), v.clone());
            }
        }
        serde_json::from_value(base).unwrap_or_else(|_| self.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PersonalInfo {
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub nationality: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub professional_bio: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Experience {
    #[serde(default)]
    pub current_job_title: String,
    // free text in the form, integer on the wire
    #[serde(default, deserialize_with = "de_string_or_number")]
    pub years_of_experience: String,
    #[serde(default)]
    pub aviation_specialization: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfessionalProfile {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub specialization: String,
    #[serde(default, deserialize_with = "de_null_default")]
    pub personal_info: PersonalInfo,
    #[serde(default, deserialize_with = "de_null_default")]
    pub experience: Experience,
    #[serde(default)]
    pub professional_roles: Vec<Value>,
    #[serde(default)]
    pub documents: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    pub value: String,
}

fn de_opt_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn de_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

fn de_null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
