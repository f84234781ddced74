use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::jobs::JobMatch;
use crate::error::ApiError;
use crate::models::ProfessionalProfile;
use crate::store::{LocalStore, NUDGE_DISMISSED_KEY};

pub const RECOMMENDED_PREVIEW: usize = 3;

/// What the profile card on the dashboard shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileNudge {
    /// Prompt to finish the profile, with the completion percentage.
    Incomplete(u8),
    /// "Profile complete" banner, dismissable for a week.
    Complete,
    Hidden,
}

fn filled_text(value: &str) -> bool {
    !value.trim().is_empty()
}

fn filled_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => filled_text(s),
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        Some(_) => true,
    }
}

/// Weighted completion percentage; no profile counts as 0%.
pub fn profile_completion(profile: Option<&ProfessionalProfile>) -> u8 {
    let Some(p) = profile else {
        return 0;
    };
    let fields: [(bool, u32); 7] = [
        (filled_text(&p.full_name), 10),
        (filled_text(&p.personal_info.phone_number), 15),
        (filled_text(&p.personal_info.professional_bio), 20),
        (filled_text(&p.experience.current_job_title), 15),
        (filled_text(&p.experience.years_of_experience), 10),
        (filled_value(p.documents.get("cv")), 15),
        (filled_value(p.documents.get("aviation_licenses")), 15),
    ];
    let total: u32 = fields.iter().map(|(_, weight)| weight).sum();
    let done: u32 = fields.iter().filter(|(filled, _)| *filled).map(|(_, weight)| weight).sum();
    ((done as f64 / total as f64) * 100.0).round() as u8
}

/// Until when the "profile complete" banner is hidden, if ever dismissed.
pub fn dismissed_until(store: &LocalStore) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = store.get(NUDGE_DISMISSED_KEY)? else {
        return Ok(None);
    };
    match raw.trim().parse::<i64>() {
        Ok(millis) => Ok(Utc.timestamp_millis_opt(millis).single()),
        Err(e) => {
            warn!("Ignoring unreadable nudge dismissal '{}': {}", raw, e);
            Ok(None)
        }
    }
}

pub fn is_dismissed(store: &LocalStore, now: DateTime<Utc>) -> Result<bool> {
    Ok(dismissed_until(store)?.is_some_and(|until| now < until))
}

/// Hides the banner for one week from `now`. Stored as epoch millis.
pub fn dismiss(store: &LocalStore, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let until = now + Duration::weeks(1);
    store.set(NUDGE_DISMISSED_KEY, &until.timestamp_millis().to_string())?;
    debug!(%until, "Profile nudge dismissed");
    Ok(until)
}

pub fn nudge(completion: u8, dismissed: bool) -> ProfileNudge {
    if completion < 100 {
        ProfileNudge::Incomplete(completion)
    } else if dismissed {
        ProfileNudge::Hidden
    } else {
        ProfileNudge::Complete
    }
}

/// First few recommendations; a failed fetch shows an empty list.
pub fn recommended_preview(result: Result<Vec<JobMatch>, ApiError>) -> Vec<JobMatch> {
    match result {
        Ok(mut matches) => {
            matches.truncate(RECOMMENDED_PREVIEW);
            matches
        }
        Err(e) => {
            warn!("Could not load recommended jobs: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    #[test]
    fn test_dismiss_for_one_week() {
        let store = LocalStore::open_in_memory().unwrap();
        let now = at(1_700_000_000_000);
        assert!(!is_dismissed(&store, now).unwrap());

        dismiss(&store, now).unwrap();
        assert_eq!(
            store.get(NUDGE_DISMISSED_KEY).unwrap().as_deref(),
            Some("1700604800000")
        );
        assert!(is_dismissed(&store, now + Duration::days(6)).unwrap());
        assert!(!is_dismissed(&store, now + Duration::weeks(1)).unwrap());
    }

    #[test]
    fn test_garbage_dismissal_is_ignored() {
        let store = LocalStore::open_in_memory().unwrap();
        store.set(NUDGE_DISMISSED_KEY, "soon").unwrap();
        assert!(!is_dismissed(&store, at(0)).unwrap());
    }

    #[test]
    fn test_profile_completion_weights() {
        assert_eq!(profile_completion(None), 0);

        let mut profile = ProfessionalProfile::default();
        profile.full_name = "Amina Yusuf".to_string();
        profile.personal_info.professional_bio = "Type-rated A320 captain.".to_string();
        assert_eq!(profile_completion(Some(&profile)), 30);

        profile.personal_info.phone_number = "+2348031234567".to_string();
        profile.experience.current_job_title = "Captain".to_string();
        profile.experience.years_of_experience = "12".to_string();
        profile.documents.insert("cv".to_string(), json!("https://cdn/cv.pdf"));
        profile.documents.insert("aviation_licenses".to_string(), json!(null));
        assert_eq!(profile_completion(Some(&profile)), 85);

        profile.documents.insert("aviation_licenses".to_string(), json!({"file": "atpl.pdf"}));
        assert_eq!(profile_completion(Some(&profile)), 100);
    }

    #[test]
    fn test_nudge_states() {
        assert_eq!(nudge(40, true), ProfileNudge::Incomplete(40));
        assert_eq!(nudge(100, false), ProfileNudge::Complete);
        assert_eq!(nudge(100, true), ProfileNudge::Hidden);
    }

    #[test]
    fn test_recommended_preview() {
        let matches: Vec<JobMatch> = (1..=5)
            .map(|id| serde_json::from_value(json!({"job": {"id": id, "title": "Role"}})).unwrap())
            .collect();
        assert_eq!(recommended_preview(Ok(matches)).len(), 3);
        assert!(recommended_preview(Err(ApiError::Unauthorized)).is_empty());
    }
}
