//! Job search: the filter/query-string codec, the results controller and
//! saved-job favorites.

pub mod controller;
pub mod favorites;
pub mod filters;

pub use controller::JobSearchController;
pub use favorites::{SavedJobsList, ToggleOutcome};
pub use filters::{MultiSelect, SearchFilters};
