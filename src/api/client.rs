use reqwest::blocking::{multipart::Form, RequestBuilder};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::error::{parse_field_errors, ApiError};
use crate::session::Session;

// A 401 from these means bad credentials, not an expired session
const SESSION_EXEMPT_PATHS: [&str; 2] = ["/auth/login/", "/auth/token/refresh/"];

/// Whether a response should end the session.
pub fn expires_session(path: &str, status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED
        && !SESSION_EXEMPT_PATHS
            .iter()
            .any(|exempt| path.ends_with(exempt.trim_start_matches('/')))
}

/// Decodes a response body, or maps a failed status to an [`ApiError`].
///
/// A 401 outside the auth endpoints clears `session` and notifies its
/// subscribers; 400/401/403 bodies become field errors.
pub fn settle_response<R: DeserializeOwned>(
    path: &str,
    status: StatusCode,
    body: &str,
    session: &Session,
) -> Result<R, ApiError> {
    if status.is_success() {
        // 204 and empty 200s decode as JSON null
        let body = if body.trim().is_empty() { "null" } else { body };
        return Ok(serde_json::from_str(body)?);
    }

    if expires_session(path, status) {
        warn!(path, "Session expired, clearing stored credentials");
        if let Err(e) = session.expire() {
            warn!("Failed to clear session: {}", e);
        }
        return Err(ApiError::Unauthorized);
    }

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(ApiError::Validation(parse_field_errors(body)))
        }
        _ => Err(ApiError::Status {
            status: status.as_u16(),
            body: body.to_string(),
        }),
    }
}

/// The one configured HTTP client. Attaches the bearer token from the
/// session and turns a 401 into a session expiry.
pub struct ApiClient {
    http: reqwest::blocking::Client,
    base_url: String,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(config: &Config, session: Arc<Session>) -> Result<Self, ApiError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn execute<R: DeserializeOwned>(&self, path: &str, builder: RequestBuilder) -> Result<R, ApiError> {
        let response = builder.send()?;
        let status = response.status();
        trace!(path, status = status.as_u16(), "API response");

        let body = if status.is_success() {
            response.text()?
        } else {
            response.text().unwrap_or_default()
        };
        settle_response(path, status, &body, &self.session)
    }

    pub fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        debug!("GET {}", path);
        self.execute(path, self.request(Method::GET, path))
    }

    pub fn get_with_query<Q, R>(&self, path: &str, query: &Q) -> Result<R, ApiError>
    where
        Q: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!("GET {}", path);
        self.execute(path, self.request(Method::GET, path).query(query))
    }

    pub fn post<T, R>(&self, path: &str, payload: &T) -> Result<R, ApiError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!("POST {}", path);
        self.execute(path, self.request(Method::POST, path).json(payload))
    }

    pub fn post_empty<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        debug!("POST {}", path);
        self.execute(path, self.request(Method::POST, path))
    }

    pub fn patch<T, R>(&self, path: &str, payload: &T) -> Result<R, ApiError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!("PATCH {}", path);
        self.execute(path, self.request(Method::PATCH, path).json(payload))
    }

    pub fn patch_multipart<R: DeserializeOwned>(&self, path: &str, form: Form) -> Result<R, ApiError> {
        debug!("PATCH {} (multipart)", path);
        self.execute(path, self.request(Method::PATCH, path).multipart(form))
    }

    pub fn delete(&self, path: &str) -> Result<(), ApiError> {
        debug!("DELETE {}", path);
        let _: serde_json::Value = self.execute(path, self.request(Method::DELETE, path))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobPosting, Page, User};
    use crate::session::SessionEvent;
    use crate::store::{LocalStore, AUTH_TOKEN_KEY};
    use serde_json::Value;

    fn signed_in() -> Session {
        let session = Session::hydrate(LocalStore::open_in_memory().unwrap()).unwrap();
        let user: User = serde_json::from_value(serde_json::json!({"email": "ops@airline.test"})).unwrap();
        session.sign_in("token-123", Some(user)).unwrap();
        session
    }

    #[test]
    fn test_401_expires_session_except_auth_endpoints() {
        assert!(expires_session("/jobs/search/", StatusCode::UNAUTHORIZED));
        assert!(expires_session("/applications/stats/", StatusCode::UNAUTHORIZED));
        assert!(!expires_session("/auth/login/", StatusCode::UNAUTHORIZED));
        assert!(!expires_session("auth/token/refresh/", StatusCode::UNAUTHORIZED));
        assert!(!expires_session("/jobs/search/", StatusCode::FORBIDDEN));
        assert!(!expires_session("/jobs/search/", StatusCode::OK));
    }

    #[test]
    fn test_url_joining() {
        let session = Arc::new(Session::hydrate(LocalStore::open_in_memory().unwrap()).unwrap());
        let config = Config::from_lookup(|_| None).with_api_base_url("http://localhost:8000/api/v1/");
        let client = ApiClient::new(&config, session).unwrap();
        assert_eq!(client.url("/jobs/search/"), "http://localhost:8000/api/v1/jobs/search/");
        assert_eq!(client.url("users/profile/"), "http://localhost:8000/api/v1/users/profile/");
    }

    #[test]
    fn test_401_clears_session_and_emits_expired() {
        let session = signed_in();
        let events = session.subscribe();

        let result: Result<Value, _> = settle_response(
            "/applications/stats/",
            StatusCode::UNAUTHORIZED,
            r#"{"detail": "Given token not valid for any token type"}"#,
            &session,
        );

        assert!(matches!(result, Err(ApiError::Unauthorized)));
        assert_eq!(session.token(), None);
        assert!(session.user().is_none());
        assert_eq!(session.with_store(|s| s.get(AUTH_TOKEN_KEY).unwrap()), None);
        assert_eq!(events.try_recv(), Ok(SessionEvent::Expired));
    }

    #[test]
    fn test_401_on_login_keeps_session() {
        let session = signed_in();
        let events = session.subscribe();

        let result: Result<Value, _> = settle_response(
            "/auth/login/",
            StatusCode::UNAUTHORIZED,
            r#"{"detail": "No active account found with the given credentials"}"#,
            &session,
        );

        let err = result.unwrap_err();
        assert_eq!(
            err.detail().as_deref(),
            Some("No active account found with the given credentials")
        );
        assert_eq!(session.token().as_deref(), Some("token-123"));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_400_body_becomes_field_errors() {
        let session = signed_in();
        let result: Result<Value, _> = settle_response(
            "/job-postings/add/",
            StatusCode::BAD_REQUEST,
            r#"{"title": ["This field is required."], "salary_min": ["A valid number is required."]}"#,
            &session,
        );

        let err = result.unwrap_err();
        let errors = err.field_errors().unwrap();
        assert_eq!(errors.get("title").map(String::as_str), Some("This field is required."));
        assert!(errors.contains_key("salary_min"));
        assert_eq!(session.token().as_deref(), Some("token-123"));
    }

    #[test]
    fn test_success_bodies_decode_and_empty_is_null() {
        let session = signed_in();
        let page: Page<JobPosting> = settle_response(
            "/jobs/search/",
            StatusCode::OK,
            r#"{"results": [{"id": 4, "title": "Dispatcher"}], "count": 1, "next": null, "previous": null}"#,
            &session,
        )
        .unwrap();
        assert_eq!(page.results[0].id, 4);

        let empty: Value = settle_response("/job-postings/delete/4/", StatusCode::NO_CONTENT, "", &session).unwrap();
        assert_eq!(empty, Value::Null);

        let failed: Result<Value, _> =
            settle_response("/jobs/search/", StatusCode::BAD_GATEWAY, "upstream down", &session);
        assert!(matches!(failed, Err(ApiError::Status { status: 502, .. })));
    }

    #[test]
    #[ignore] // Needs a running API
    fn test_search_against_local_api() {
        let session = Arc::new(Session::hydrate(LocalStore::open_in_memory().unwrap()).unwrap());
        let client = ApiClient::new(&Config::from_env(), session).unwrap();
        let page: Page<JobPosting> = client.get("/jobs/search/?page=1").unwrap();
        assert!(page.count >= page.results.len() as u64);
    }
}
