use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::ApiClient;
use crate::error::ApiError;
use crate::models::{LoginResponse, User};

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountKind {
    Professional,
    Recruiter,
}

impl AccountKind {
    fn register_path(&self) -> &'static str {
        match self {
            AccountKind::Professional => "/auth/register/professional/",
            AccountKind::Recruiter => "/auth/register/recruiter/",
        }
    }
}

impl ApiClient {
    /// Signs in and, when the response carries an access token, stores it
    /// together with the user in the session.
    pub fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        let response: LoginResponse = self.post("/auth/login/", credentials)?;
        if let Some(access) = &response.access {
            self.session().sign_in(access, response.user.clone())?;
            info!(email = %credentials.email, "Signed in");
        }
        Ok(response)
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        self.session().logout()?;
        Ok(())
    }

    pub fn register(&self, kind: AccountKind, data: &Value) -> Result<Value, ApiError> {
        self.post(kind.register_path(), data)
    }

    pub fn verify_email(&self, email: &str, otp: &str) -> Result<Value, ApiError> {
        self.post(
            "/auth/verify-email/",
            &serde_json::json!({ "email": email, "otp": otp }),
        )
    }

    pub fn resend_otp(&self, email: &str) -> Result<Value, ApiError> {
        self.post("/auth/resend-otp/", &serde_json::json!({ "email": email }))
    }

    pub fn request_password_reset(&self, email: &str) -> Result<Value, ApiError> {
        self.post("/auth/password/reset/", &serde_json::json!({ "email": email }))
    }

    pub fn confirm_password_reset(&self, data: &Value) -> Result<Value, ApiError> {
        self.post("/auth/password/reset/confirm/", data)
    }

    pub fn change_password(&self, old_password: &str, new_password: &str) -> Result<Value, ApiError> {
        self.post(
            "/auth/password/change/",
            &serde_json::json!({ "old_password": old_password, "new_password": new_password }),
        )
    }

    pub fn current_user(&self) -> Result<User, ApiError> {
        self.get("/users/profile/")
    }
}
