use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::api::SavedJobsApi;
use crate::error::ApiError;
use crate::models::{JobId, SavedSearch, SavedSearchId};

static JOB_ID_QUERY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"job_id:(\d+)").expect("valid regex"));

/// Job id encoded in a saved-search query, if the record is a saved job.
pub fn job_id_from_query(query: &str) -> Option<JobId> {
    JOB_ID_QUERY
        .captures(query)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Favorite state of one job. Absence from the map means unsaved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Favorite {
    Saved(SavedSearchId),
    PendingSave,
    PendingUnsave(SavedSearchId),
}

/// A toggle that has been applied optimistically and awaits the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingToggle {
    Save { job_id: JobId },
    Unsave { job_id: JobId, saved_id: SavedSearchId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Saved(SavedSearchId),
    Unsaved,
    RolledBack,
    /// A mutation for this job was already in flight.
    Ignored,
}

/// Saved-job membership with optimistic save/unsave.
#[derive(Debug, Clone, Default)]
pub struct SavedJobs {
    entries: HashMap<JobId, Favorite>,
}

impl SavedJobs {
    pub fn from_records(records: &[SavedSearch]) -> Self {
        let entries = records
            .iter()
            .filter_map(|record| {
                job_id_from_query(&record.query).map(|job_id| (job_id, Favorite::Saved(record.id)))
            })
            .collect();
        Self { entries }
    }

    /// Reloads membership from the server. Failure keeps the current map;
    /// it only drives heart icons and must not block the results view.
    pub fn refresh<A: SavedJobsApi>(&mut self, api: &A) {
        match api.saved_searches() {
            Ok(records) => *self = Self::from_records(&records),
            Err(e) => warn!("Could not fetch saved jobs list: {}", e),
        }
    }

    #[cfg(test)]
    pub fn state(&self, job_id: JobId) -> Option<Favorite> {
        self.entries.get(&job_id).copied()
    }

    /// What the heart icon shows. A pending save shows as saved and a
    /// pending unsave as unsaved.
    pub fn is_saved(&self, job_id: JobId) -> bool {
        matches!(
            self.entries.get(&job_id),
            Some(Favorite::Saved(_)) | Some(Favorite::PendingSave)
        )
    }

    pub fn is_pending(&self, job_id: JobId) -> bool {
        matches!(
            self.entries.get(&job_id),
            Some(Favorite::PendingSave) | Some(Favorite::PendingUnsave(_))
        )
    }

    /// Settled job -> saved-record pairs.
    #[cfg(test)]
    pub fn saved_ids(&self) -> HashMap<JobId, SavedSearchId> {
        self.entries
            .iter()
            .filter_map(|(job_id, fav)| match fav {
                Favorite::Saved(id) => Some((*job_id, *id)),
                _ => None,
            })
            .collect()
    }

    /// Applies the optimistic half of a toggle. Returns `None` while a
    /// previous toggle for the same job is unresolved.
    pub fn begin_toggle(&mut self, job_id: JobId) -> Option<PendingToggle> {
        match self.entries.get(&job_id).copied() {
            Some(Favorite::PendingSave) | Some(Favorite::PendingUnsave(_)) => None,
            Some(Favorite::Saved(saved_id)) => {
                self.entries.insert(job_id, Favorite::PendingUnsave(saved_id));
                Some(PendingToggle::Unsave { job_id, saved_id })
            }
            None => {
                self.entries.insert(job_id, Favorite::PendingSave);
                Some(PendingToggle::Save { job_id })
            }
        }
    }

    /// Settles a toggle. `created` is the new record id for a successful
    /// save; on failure the job returns to its state before the toggle.
    pub fn finish_toggle(
        &mut self,
        pending: PendingToggle,
        result: Result<Option<SavedSearchId>, ApiError>,
    ) -> ToggleOutcome {
        match (pending, result) {
            (PendingToggle::Save { job_id }, Ok(Some(created))) => {
                self.entries.insert(job_id, Favorite::Saved(created));
                ToggleOutcome::Saved(created)
            }
            (PendingToggle::Save { job_id }, Ok(None)) => {
                // No record id to unsave with later, so treat as failed
                warn!(job_id, "Save returned no record id, rolling back");
                self.entries.remove(&job_id);
                ToggleOutcome::RolledBack
            }
            (PendingToggle::Save { job_id }, Err(e)) => {
                warn!(job_id, "Saving job failed, rolling back: {}", e);
                self.entries.remove(&job_id);
                ToggleOutcome::RolledBack
            }
            (PendingToggle::Unsave { job_id, .. }, Ok(_)) => {
                self.entries.remove(&job_id);
                ToggleOutcome::Unsaved
            }
            (PendingToggle::Unsave { job_id, saved_id }, Err(e)) => {
                warn!(job_id, "Unsaving job failed, rolling back: {}", e);
                self.entries.insert(job_id, Favorite::Saved(saved_id));
                ToggleOutcome::RolledBack
            }
        }
    }

    pub fn toggle<A: SavedJobsApi>(&mut self, api: &A, job_id: JobId, title: &str) -> ToggleOutcome {
        let Some(pending) = self.begin_toggle(job_id) else {
            debug!(job_id, "Toggle ignored, request already in flight");
            return ToggleOutcome::Ignored;
        };
        let result = match pending {
            PendingToggle::Save { .. } => api.save_job(job_id, title).map(|record| Some(record.id)),
            PendingToggle::Unsave { saved_id, .. } => api.unsave_job(saved_id).map(|_| None),
        };
        self.finish_toggle(pending, result)
    }
}

/// The saved-jobs page: the raw records with optimistic removal.
#[derive(Debug, Default)]
pub struct SavedJobsList {
    pub records: Vec<SavedSearch>,
    pub loading: bool,
    pub error: Option<String>,
}

impl SavedJobsList {
    pub fn load<A: SavedJobsApi>(&mut self, api: &A) {
        self.loading = true;
        self.error = None;
        match api.saved_searches() {
            Ok(records) => self.records = records,
            Err(e) => {
                warn!("Failed to load saved jobs: {}", e);
                self.error = Some("Could not load your saved jobs. Please try again.".to_string());
            }
        }
        self.loading = false;
    }

    pub fn remove<A: SavedJobsApi>(&mut self, api: &A, saved_id: SavedSearchId) -> bool {
        let original = self.records.clone();
        self.records.retain(|r| r.id != saved_id);
        match api.unsave_job(saved_id) {
            Ok(()) => true,
            Err(e) => {
                warn!(saved_id, "Failed to unsave job: {}", e);
                self.error = Some("Failed to unsave job. Please try again.".to_string());
                self.records = original;
                false
            }
        }
    }
}
