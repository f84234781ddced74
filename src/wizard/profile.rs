use regex::Regex;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Instant;
use tracing::{info, warn};

use super::autosave::Autosaver;
use super::{StepForm, Wizard};
use crate::api::profile::ProfileUploads;
use crate::api::ProfileApi;
use crate::error::{ApiError, FieldErrors};
use crate::models::ProfessionalProfile;
use crate::session::Session;

pub const SUBMIT_FAILED: &str = "An error occurred during submission. Please try again.";

// Optional leading +, then 7 to 15 digits once separators are stripped
static PHONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("valid regex"));

pub fn is_possible_phone_number(raw: &str) -> bool {
    let compact: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();
    PHONE.is_match(&compact)
}

/// Profile-completion form: the profile sections plus files picked for the
/// documents step.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub profile: ProfessionalProfile,
    pub uploads: ProfileUploads,
}

impl ProfileForm {
    /// Body of a background draft save. Documents only go with a submit.
    pub fn autosave_payload(&self) -> Value {
        json!({
            "full_name": self.profile.full_name,
            "specialization": self.profile.specialization,
            "personal_info": self.profile.personal_info,
            "experience": self.profile.experience,
        })
    }

    fn is_upload(name: &str) -> bool {
        matches!(name, "cv" | "aviation_licenses" | "profile_picture")
    }
}

impl StepForm for ProfileForm {
    const STEPS: &'static [&'static str] = &["Personal Info", "Experience", "Documents", "Submit"];

    fn validate_step(&self, step: usize) -> FieldErrors {
        let mut errors = FieldErrors::new();
        match step {
            1 => {
                if self.profile.full_name.trim().is_empty() {
                    errors.insert("full_name".to_string(), "Full name is required.".to_string());
                }
                let phone = &self.profile.personal_info.phone_number;
                if !phone.is_empty() && !is_possible_phone_number(phone) {
                    errors.insert(
                        "phone_number".to_string(),
                        "Please enter a valid phone number.".to_string(),
                    );
                }
            }
            2 => {
                let experience = &self.profile.experience;
                if experience.current_job_title.trim().is_empty() {
                    errors.insert(
                        "current_job_title".to_string(),
                        "Current job title is required.".to_string(),
                    );
                }
                let years = experience.years_of_experience.trim();
                if years.is_empty() {
                    errors.insert(
                        "years_of_experience".to_string(),
                        "Years of experience are required.".to_string(),
                    );
                } else {
                    match years.parse::<f64>() {
                        Ok(n) if n < 0.0 => {
                            errors.insert(
                                "years_of_experience".to_string(),
                                "Years of experience cannot be negative.".to_string(),
                            );
                        }
                        Ok(_) => {}
                        Err(_) => {
                            errors.insert(
                                "years_of_experience".to_string(),
                                "Years of experience must be a number.".to_string(),
                            );
                        }
                    }
                }
            }
            _ => {}
        }
        errors
    }

    fn set_field(&mut self, name: &str, value: &str) -> bool {
        let info = &mut self.profile.personal_info;
        let experience = &mut self.profile.experience;
        let target = match name {
            "full_name" => &mut self.profile.full_name,
            "specialization" => &mut self.profile.specialization,
            "phone_number" => &mut info.phone_number,
            "date_of_birth" => &mut info.date_of_birth,
            "nationality" => &mut info.nationality,
            "city" => &mut info.city,
            "country" => &mut info.country,
            "professional_bio" => &mut info.professional_bio,
            "current_job_title" => &mut experience.current_job_title,
            "years_of_experience" => &mut experience.years_of_experience,
            "aviation_specialization" => &mut experience.aviation_specialization,
            "cv" | "aviation_licenses" | "profile_picture" => {
                let path = (!value.is_empty()).then(|| PathBuf::from(value));
                match name {
                    "cv" => self.uploads.cv = path,
                    "aviation_licenses" => self.uploads.aviation_licenses = path,
                    _ => self.uploads.profile_picture = path,
                }
                return true;
            }
            _ => return false,
        };
        *target = value.to_string();
        true
    }
}

/// Profile wizard with draft autosave.
#[derive(Debug, Clone)]
pub struct ProfileWizard {
    pub wizard: Wizard<ProfileForm>,
    pub autosave: Autosaver,
}

impl ProfileWizard {
    pub fn new(profile: ProfessionalProfile) -> Self {
        Self {
            wizard: Wizard::new(ProfileForm {
                profile,
                uploads: ProfileUploads::default(),
            }),
            autosave: Autosaver::default(),
        }
    }

    pub fn load<A: ProfileApi>(api: &A) -> Result<Self, ApiError> {
        let profile = api.professional_profile()?;
        Ok(Self::new(profile))
    }

    /// Edits a field; profile edits schedule a draft save.
    pub fn edit(&mut self, name: &str, value: &str, now: Instant) -> bool {
        if !self.wizard.set_field(name, value) {
            return false;
        }
        if !ProfileForm::is_upload(name) {
            let payload = self.wizard.form.autosave_payload();
            self.autosave.mark_dirty(payload, now);
        }
        true
    }

    /// Runs a due autosave. Failures are logged by the autosaver only.
    pub fn tick<A: ProfileApi>(&mut self, api: &A, now: Instant) -> bool {
        self.autosave.poll(api, now)
    }

    /// Final submit. Every step is re-checked first; a failing step becomes
    /// the current one. On success the cached user is refreshed with the
    /// server's response and the wizard enters its success step.
    pub fn submit<A: ProfileApi>(&mut self, api: &A, session: &Session) -> bool {
        self.wizard.restart();
        if !self.wizard.advance_to_last() {
            return false;
        }

        self.autosave.cancel();
        let form = &self.wizard.form;
        match api.submit_professional_profile(&form.profile, &form.uploads) {
            Ok(data) => {
                if let Some(user) = session.user() {
                    if let Err(e) = session.update_user(user.merged_with(&data)) {
                        warn!("Could not cache updated user: {:#}", e);
                    }
                }
                info!("Professional profile submitted");
                self.wizard.complete();
                true
            }
            Err(e) => {
                warn!("Submission failed: {}", e);
                self.wizard.show_errors(FieldErrors::from([(
                    "submit".to_string(),
                    SUBMIT_FAILED.to_string(),
                )]));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LocalStore;
    use std::cell::RefCell;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeProfile {
        fail_submit: bool,
        drafts: RefCell<Vec<Value>>,
        submits: RefCell<Vec<ProfessionalProfile>>,
    }

    impl ProfileApi for FakeProfile {
        fn professional_profile(&self) -> Result<ProfessionalProfile, ApiError> {
            Ok(serde_json::from_value(json!({
                "full_name": "Amina Yusuf",
                "personal_info": null,
                "experience": {"current_job_title": "", "years_of_experience": 4}
            }))
            .unwrap())
        }

        fn update_professional_profile(&self, payload: &Value) -> Result<Value, ApiError> {
            self.drafts.borrow_mut().push(payload.clone());
            Ok(payload.clone())
        }

        fn submit_professional_profile(
            &self,
            profile: &ProfessionalProfile,
            _uploads: &ProfileUploads,
        ) -> Result<Value, ApiError> {
            self.submits.borrow_mut().push(profile.clone());
            if self.fail_submit {
                return Err(ApiError::Status { status: 500, body: String::new() });
            }
            Ok(json!({"full_name": profile.full_name, "profile_completed": true}))
        }
    }

    fn filled() -> ProfileWizard {
        let mut profile = ProfessionalProfile::default();
        profile.full_name = "Amina Yusuf".to_string();
        profile.experience.current_job_title = "First Officer".to_string();
        profile.experience.years_of_experience = "6".to_string();
        ProfileWizard::new(profile)
    }

    fn signed_in_session() -> Session {
        let session = Session::hydrate(LocalStore::open_in_memory().unwrap()).unwrap();
        let user = serde_json::from_value(json!({"email": "amina@example.com", "full_name": "A"})).unwrap();
        session.sign_in("token", Some(user)).unwrap();
        session
    }

    #[test]
    fn test_phone_plausibility() {
        assert!(is_possible_phone_number("+234 803 123 4567"));
        assert!(is_possible_phone_number("(020) 7946-0958"));
        assert!(!is_possible_phone_number("12345"));
        assert!(!is_possible_phone_number("+234-call-me"));
    }

    #[test]
    fn test_step_one_validation() {
        let mut wizard = ProfileWizard::new(ProfessionalProfile::default());
        let now = Instant::now();
        wizard.edit("phone_number", "abc", now);
        assert!(!wizard.wizard.handle_next());
        assert_eq!(wizard.wizard.current_step(), 1);
        assert_eq!(wizard.wizard.errors["full_name"], "Full name is required.");
        assert_eq!(wizard.wizard.errors["phone_number"], "Please enter a valid phone number.");
    }

    #[test]
    fn test_step_two_years_checks() {
        let mut form = ProfileForm::default();
        form.profile.experience.current_job_title = "Engineer".to_string();
        assert_eq!(form.validate_step(2)["years_of_experience"], "Years of experience are required.");
        form.set_field("years_of_experience", "-2");
        assert_eq!(
            form.validate_step(2)["years_of_experience"],
            "Years of experience cannot be negative."
        );
        form.set_field("years_of_experience", "0");
        assert!(form.validate_step(2).is_empty());
    }

    #[test]
    fn test_load_tolerates_null_sections() {
        let wizard = ProfileWizard::load(&FakeProfile::default()).unwrap();
        assert_eq!(wizard.wizard.form.profile.full_name, "Amina Yusuf");
        assert_eq!(wizard.wizard.form.profile.experience.years_of_experience, "4");
        assert_eq!(wizard.wizard.form.profile.personal_info.city, "");
    }

    #[test]
    fn test_edits_autosave_after_quiet_period() {
        let api = FakeProfile::default();
        let mut wizard = ProfileWizard::new(ProfessionalProfile::default());
        let start = Instant::now();
        wizard.edit("full_name", "Amina", start);
        wizard.edit("city", "Kano", start + Duration::from_millis(500));
        wizard.edit("cv", "/tmp/cv.pdf", start + Duration::from_millis(600));

        assert!(!wizard.tick(&api, start + Duration::from_millis(2000)));
        assert!(wizard.tick(&api, start + Duration::from_millis(2500)));

        let drafts = api.drafts.borrow();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0]["full_name"], "Amina");
        assert_eq!(drafts[0]["personal_info"]["city"], "Kano");
        assert!(drafts[0].get("documents").is_none());
        assert_eq!(wizard.wizard.form.uploads.cv, Some(PathBuf::from("/tmp/cv.pdf")));
    }

    #[test]
    fn test_submit_success_merges_user_and_completes() {
        let api = FakeProfile::default();
        let session = signed_in_session();
        let mut wizard = filled();
        wizard.edit("country", "Nigeria", Instant::now());

        assert!(wizard.submit(&api, &session));
        assert!(wizard.wizard.succeeded());
        assert_eq!(wizard.wizard.current_step(), 5);
        assert!(wizard.autosave.deadline().is_none());

        let user = session.user().unwrap();
        assert_eq!(user.full_name.as_deref(), Some("Amina Yusuf"));
        assert_eq!(user.extra["profile_completed"], true);
    }

    #[test]
    fn test_submit_failure_sets_submit_error() {
        let api = FakeProfile {
            fail_submit: true,
            ..Default::default()
        };
        let session = signed_in_session();
        let mut wizard = filled();
        assert!(!wizard.submit(&api, &session));
        assert_eq!(wizard.wizard.errors["submit"], SUBMIT_FAILED);
        assert!(!wizard.wizard.succeeded());
    }

    #[test]
    fn test_submit_returns_to_first_invalid_step() {
        let api = FakeProfile::default();
        let session = signed_in_session();
        let mut wizard = filled();
        wizard.wizard.handle_next();
        wizard.wizard.handle_next();
        wizard.wizard.handle_next();
        assert_eq!(wizard.wizard.current_step(), 4);

        wizard.edit("current_job_title", "", Instant::now());
        assert!(!wizard.submit(&api, &session));
        assert_eq!(wizard.wizard.current_step(), 2);
        assert!(wizard.wizard.errors.contains_key("current_job_title"));
        assert!(api.submits.borrow().is_empty());
    }
}
