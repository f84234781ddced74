//! Job-search filter state and its query-string form.
//!
//! The query string is authoritative: filters are always re-derived from it
//! on navigation, and only an explicit apply writes local edits back.

use url::form_urlencoded;

pub const PAGE_KEY: &str = "page";

pub const JOB_TYPES: [&str; 4] = ["full-time", "part-time", "contract", "temporary"];

pub const EXPERIENCE_LEVELS: [&str; 4] = ["entry", "mid", "senior", "executive"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    pub query: String,
    pub location: String,
    pub department: String,
    pub job_type: Vec<String>,
    pub experience_level: Vec<String>,
    pub is_remote: bool,
    pub aircraft_type: String,
    pub min_salary: Option<u64>,
    pub max_salary: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiSelect {
    JobType,
    ExperienceLevel,
}

impl SearchFilters {
    /// Filters and page from a query string (leading `?` optional).
    ///
    /// Multi-select values are comma separated, `is_remote` is true only for
    /// the literal `true`, and a missing or unparsable page is page 1.
    pub fn parse(query_string: &str) -> (SearchFilters, u32) {
        let mut filters = SearchFilters::default();
        let mut page = 1;

        let raw = query_string.trim_start_matches('?');
        // Last value wins, like URLSearchParams.set
        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "query" => filters.query = value.into_owned(),
                "location" => filters.location = value.into_owned(),
                "department" => filters.department = value.into_owned(),
                "job_type" => filters.job_type = split_list(&value),
                "experience_level" => filters.experience_level = split_list(&value),
                "is_remote" => filters.is_remote = value == "true",
                "aircraft_type" => filters.aircraft_type = value.into_owned(),
                "min_salary" => filters.min_salary = value.trim().parse().ok(),
                "max_salary" => filters.max_salary = value.trim().parse().ok(),
                PAGE_KEY => page = value.trim().parse::<u32>().ok().filter(|p| *p >= 1).unwrap_or(1),
                _ => {}
            }
        }

        (filters, page)
    }

    /// Non-empty filters in a fixed key order. Lists are comma joined; empty
    /// strings, empty lists and `false` are left out.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        let mut text = |key: &'static str, value: &str| {
            if !value.is_empty() {
                pairs.push((key, value.to_string()));
            }
        };
        text("query", &self.query);
        text("location", &self.location);
        text("department", &self.department);
        text("job_type", &self.job_type.join(","));
        text("experience_level", &self.experience_level.join(","));
        if self.is_remote {
            pairs.push(("is_remote", "true".to_string()));
        }
        if !self.aircraft_type.is_empty() {
            pairs.push(("aircraft_type", self.aircraft_type.clone()));
        }
        if let Some(min) = self.min_salary {
            pairs.push(("min_salary", min.to_string()));
        }
        if let Some(max) = self.max_salary {
            pairs.push(("max_salary", max.to_string()));
        }
        pairs
    }

    /// Request parameters for `/jobs/search/`; `page` is always present.
    pub fn api_params(&self, page: u32) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .pairs()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        params.push((PAGE_KEY.to_string(), page.to_string()));
        params
    }

    pub fn to_query_string(&self, page: u32) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.pairs() {
            serializer.append_pair(key, &value);
        }
        serializer.append_pair(PAGE_KEY, &page.to_string());
        serializer.finish()
    }

    pub fn values_mut(&mut self, field: MultiSelect) -> &mut Vec<String> {
        match field {
            MultiSelect::JobType => &mut self.job_type,
            MultiSelect::ExperienceLevel => &mut self.experience_level,
        }
    }

    /// Checkbox behaviour: add the value if absent, remove it if present.
    pub fn toggle(&mut self, field: MultiSelect, value: &str) {
        let values = self.values_mut(field);
        if let Some(pos) = values.iter().position(|v| v == value) {
            values.remove(pos);
        } else {
            values.push(value.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs().is_empty()
    }
}

/// Rewrites only `page` in `query_string`, keeping every other parameter
/// (including ones this client does not know) in its original order.
pub fn with_page(query_string: &str, page: u32) -> String {
    let raw = query_string.trim_start_matches('?');
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    let mut replaced = false;
    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        if key == PAGE_KEY {
            if !replaced {
                serializer.append_pair(PAGE_KEY, &page.to_string());
                replaced = true;
            }
        } else {
            serializer.append_pair(&key, &value);
        }
    }
    if !replaced {
        serializer.append_pair(PAGE_KEY, &page.to_string());
    }
    serializer.finish()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect()
}
