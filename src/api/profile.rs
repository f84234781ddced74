use reqwest::blocking::multipart::{Form, Part};
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use tracing::debug;

use super::documents::{file_name, read_data_url};
use super::{ApiClient, ProfileApi};
use crate::error::ApiError;
use crate::models::ProfessionalProfile;

const PROFESSIONAL_UPDATE: &str = "/users/profile/professional/update/";
const RECRUITER_UPDATE: &str = "/users/profile/recruiter/update/";

/// Files attached to a full profile submit.
#[derive(Debug, Clone, Default)]
pub struct ProfileUploads {
    pub cv: Option<PathBuf>,
    pub aviation_licenses: Option<PathBuf>,
    pub profile_picture: Option<PathBuf>,
}

/// JSON body for the professional profile PATCH. Documents ride along as
/// data URLs only when a new file was picked.
pub fn profile_payload(profile: &ProfessionalProfile, documents: Map<String, Value>) -> Value {
    let mut payload = json!({
        "full_name": profile.full_name,
        "specialization": profile.specialization,
        "personal_info": profile.personal_info,
        "experience": profile.experience,
        "professional_roles": profile.professional_roles,
    });
    if !documents.is_empty() {
        payload["documents"] = Value::Object(documents);
    }
    payload
}

/// Multipart fields for the recruiter profile; nulls are skipped and
/// strings go in unquoted.
pub fn recruiter_form_fields(data: &Map<String, Value>) -> Vec<(String, String)> {
    data.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let text = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), text)
        })
        .collect()
}

impl ApiClient {
    pub fn recruiter_profile(&self) -> Result<Value, ApiError> {
        self.get("/users/profile/recruiter/list/")
    }

    pub fn update_recruiter_profile(&self, data: &Map<String, Value>) -> Result<Value, ApiError> {
        let form = recruiter_form_fields(data)
            .into_iter()
            .fold(Form::new(), |form, (k, v)| form.text(k, v));
        self.patch_multipart(RECRUITER_UPDATE, form)
    }
}

impl ProfileApi for ApiClient {
    fn professional_profile(&self) -> Result<ProfessionalProfile, ApiError> {
        self.get("/users/profile/professional/list/")
    }

    fn update_professional_profile(&self, payload: &Value) -> Result<Value, ApiError> {
        self.patch(PROFESSIONAL_UPDATE, payload)
    }

    fn submit_professional_profile(
        &self,
        profile: &ProfessionalProfile,
        uploads: &ProfileUploads,
    ) -> Result<Value, ApiError> {
        let mut documents = Map::new();
        if let Some(path) = &uploads.cv {
            documents.insert("cv".to_string(), Value::String(read_data_url(path)?));
        }
        if let Some(path) = &uploads.aviation_licenses {
            documents.insert(
                "aviation_licenses".to_string(),
                Value::String(read_data_url(path)?),
            );
        }

        let response = self.update_professional_profile(&profile_payload(profile, documents))?;

        if let Some(path) = &uploads.profile_picture {
            debug!("Uploading profile picture {}", path.display());
            let bytes = std::fs::read(path)
                .map_err(|e| ApiError::Store(format!("Failed to read {}: {}", path.display(), e)))?;
            let name = file_name(path);
            let mime = mime_guess::from_path(&name).first_or_octet_stream();
            let part = Part::bytes(bytes)
                .file_name(name)
                .mime_str(mime.essence_str())?;
            let _: Value = self.patch_multipart(PROFESSIONAL_UPDATE, Form::new().part("profile_picture", part))?;
        }

        Ok(response)
    }
}
