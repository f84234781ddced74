use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::api::{JobSearchApi, SavedJobsApi};
use crate::models::JobPosting;
use crate::search::filters::{EXPERIENCE_LEVELS, JOB_TYPES};
use crate::search::{JobSearchController, MultiSelect, SearchFilters, ToggleOutcome};
use crate::wizard::posting::DEPARTMENTS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    /// Typing into the keyword box. Enter applies, Esc keeps the edit local.
    EditQuery,
}

struct AppState {
    search: JobSearchController,
    mode: Mode,
    selected: usize,
    scroll_offset: u16,
    message: Option<String>,
}

impl AppState {
    fn new(search: JobSearchController) -> Self {
        Self {
            search,
            mode: Mode::Browse,
            selected: 0,
            scroll_offset: 0,
            message: None,
        }
    }

    fn current_job(&self) -> Option<&JobPosting> {
        self.search.jobs.get(self.selected)
    }

    fn next(&mut self) {
        if !self.search.jobs.is_empty() && self.selected < self.search.jobs.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    fn go_to<A: JobSearchApi>(&mut self, api: &A, query_string: Option<String>) {
        let Some(query_string) = query_string else {
            return;
        };
        self.search.load(api, &query_string);
        self.selected = 0;
        self.scroll_offset = 0;
        self.message = self.search.error.clone();
    }

    fn toggle_saved<A: SavedJobsApi>(&mut self, api: &A) {
        let Some(job_id) = self.current_job().map(|job| job.id) else {
            return;
        };
        self.message = match self.search.toggle_favorite(api, job_id) {
            ToggleOutcome::Saved(_) => Some("Saved".to_string()),
            ToggleOutcome::Unsaved => Some("Removed from saved jobs".to_string()),
            ToggleOutcome::RolledBack => Some("Could not update saved jobs".to_string()),
            ToggleOutcome::Ignored => None,
        };
    }

    /// Whether the filter controls differ from what the results show.
    fn filters_edited(&self) -> bool {
        SearchFilters::parse(self.search.location()).0 != self.search.filters
    }

    fn cycle_department(&mut self) {
        let department = &mut self.search.filters.department;
        let next = match DEPARTMENTS.iter().position(|d| *d == department.as_str()) {
            Some(i) if i + 1 < DEPARTMENTS.len() => DEPARTMENTS[i + 1],
            Some(_) => "",
            None => DEPARTMENTS[0],
        };
        *department = next.to_string();
    }

    /// Applies one key press. Returns `false` when the browser should close.
    fn handle_key<A: JobSearchApi + SavedJobsApi>(&mut self, api: &A, code: KeyCode) -> bool {
        if self.mode == Mode::EditQuery {
            match code {
                KeyCode::Enter => {
                    self.mode = Mode::Browse;
                    let href = self.search.apply_filters();
                    self.go_to(api, Some(href));
                }
                KeyCode::Esc => self.mode = Mode::Browse,
                KeyCode::Backspace => {
                    self.search.filters.query.pop();
                }
                KeyCode::Char(c) => self.search.filters.query.push(c),
                _ => {}
            }
            return true;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.prev(),
            KeyCode::Char('J') | KeyCode::PageDown => self.scroll_down(),
            KeyCode::Char('K') | KeyCode::PageUp => self.scroll_up(),
            KeyCode::Char('s') => self.toggle_saved(api),
            KeyCode::Char('n') | KeyCode::Right => {
                let href = self.search.next_page();
                self.go_to(api, href);
            }
            KeyCode::Char('p') | KeyCode::Left => {
                let href = self.search.previous_page();
                self.go_to(api, href);
            }
            KeyCode::Char('r') => {
                self.search.reload(api);
                self.message = self.search.error.clone();
            }
            KeyCode::Char('/') => self.mode = Mode::EditQuery,
            KeyCode::Char(c @ '1'..='4') => {
                let value = JOB_TYPES[c as usize - '1' as usize];
                self.search.filters.toggle(MultiSelect::JobType, value);
            }
            KeyCode::Char(c @ '5'..='8') => {
                let value = EXPERIENCE_LEVELS[c as usize - '5' as usize];
                self.search.filters.toggle(MultiSelect::ExperienceLevel, value);
            }
            KeyCode::Char('m') => self.search.filters.is_remote = !self.search.filters.is_remote,
            KeyCode::Char('d') => self.cycle_department(),
            KeyCode::Char('a') => {
                let href = self.search.apply_filters();
                self.go_to(api, Some(href));
            }
            KeyCode::Char('x') => {
                let href = self.search.reset_filters();
                self.go_to(api, Some(href));
            }
            _ => {}
        }
        true
    }
}

/// Interactive result browser over the search controller.
pub fn run_browse<A: JobSearchApi + SavedJobsApi>(api: &A, query_string: &str) -> Result<()> {
    let mut search = JobSearchController::new();
    search.refresh_favorites(api);
    search.load(api, query_string);

    if let Some(error) = &search.error {
        println!("{}", error);
        return Ok(());
    }

    let mut state = AppState::new(search);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, api);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop<A: JobSearchApi + SavedJobsApi>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    api: &A,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if !state.handle_key(api, key.code) {
                break;
            }
            list_state.select(Some(state.selected));
        }
    }
    Ok(())
}

fn filter_summary(filters: &SearchFilters) -> String {
    if filters.is_empty() {
        return "No filters".to_string();
    }
    filters
        .pairs()
        .into_iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("  ")
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    // Filter bar
    let (label, style) = match state.mode {
        Mode::EditQuery => (
            format!(" Search: {}_", state.search.filters.query),
            Style::default().fg(Color::Yellow),
        ),
        Mode::Browse if state.filters_edited() => (
            format!(" {} (edited, a:apply)", filter_summary(&state.search.filters)),
            Style::default().fg(Color::Yellow),
        ),
        Mode::Browse => (
            format!(" {}", filter_summary(&state.search.filters)),
            Style::default().fg(Color::Cyan),
        ),
    };
    frame.render_widget(Paragraph::new(label).style(style), rows[0]);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[1]);

    // Left panel: results
    let items: Vec<ListItem> = state
        .search
        .jobs
        .iter()
        .map(|job| {
            let favorites = &state.search.favorites;
            let heart = if favorites.is_pending(job.id) {
                "~"
            } else if favorites.is_saved(job.id) {
                "♥"
            } else {
                " "
            };
            let title = if job.title.chars().count() > 35 {
                format!("{}...", job.title.chars().take(32).collect::<String>())
            } else {
                job.title.clone()
            };
            let location = job.location.as_deref().unwrap_or("?");
            ListItem::new(format!("{} #{:<4} {} | {}", heart, job.id, title, location))
        })
        .collect();

    let pagination = &state.search.pagination;
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Jobs ({} total, page {}) ",
            pagination.count, pagination.current_page
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: job detail
    let detail = build_detail(state);
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    // Footer help
    let footer = match (&state.message, state.mode) {
        (_, Mode::EditQuery) => " type keywords  Enter:search  Esc:done".to_string(),
        (Some(message), _) => format!(" {}", message),
        (None, _) => {
            " j/k:navigate  s:save  n/p:page  /:keywords  1-4:type  5-8:level  m:remote  d:dept  a:apply  x:reset  q:quit"
                .to_string()
        }
    };
    let help = Paragraph::new(footer).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[2]);
}

fn build_detail(state: &AppState) -> Text<'_> {
    let Some(job) = state.current_job() else {
        return Text::raw("No jobs found.");
    };

    let mut lines: Vec<Line> = Vec::new();

    // Header
    lines.push(Line::from(Span::styled(
        &job.title,
        Style::default().add_modifier(Modifier::BOLD),
    )));

    if let Some(employer) = job.employer() {
        lines.push(Line::from(format!("at {}", employer)));
    }

    let mut facts = Vec::new();
    if let Some(location) = &job.location {
        facts.push(location.clone());
    }
    if job.is_remote {
        facts.push("Remote".to_string());
    }
    if let Some(job_type) = &job.job_type {
        facts.push(job_type.clone());
    }
    if let Some(level) = &job.experience_level {
        facts.push(level.clone());
    }
    if !facts.is_empty() {
        lines.push(Line::from(facts.join(" · ")));
    }

    lines.push(Line::from(Span::styled(
        job.salary_label(),
        Style::default().fg(Color::Green),
    )));

    if state.search.favorites.is_saved(job.id) {
        lines.push(Line::from(Span::styled("Saved", Style::default().fg(Color::Magenta))));
    }

    lines.push(Line::from(""));

    let sections = [
        ("DESCRIPTION", &job.description),
        ("RESPONSIBILITIES", &job.responsibilities),
        ("QUALIFICATIONS", &job.qualifications),
    ];
    let mut any = false;
    for (label, body) in sections {
        let Some(body) = body.as_deref().filter(|b| !b.trim().is_empty()) else {
            continue;
        };
        any = true;
        lines.push(Line::from(Span::styled(
            label,
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(body, 70).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
        lines.push(Line::from(""));
    }

    if !any {
        lines.push(Line::from(Span::styled(
            format!("(Open the full posting with: winguport job {})", job.id),
            Style::default().fg(Color::DarkGray),
        )));
    }

    Text::from(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::models::{JobId, Page, SavedSearch, SavedSearchId};
    use crate::search::favorites::Favorite;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeBackend {
        searches: RefCell<Vec<Vec<(String, String)>>>,
    }

    impl JobSearchApi for FakeBackend {
        fn search_jobs(&self, params: &[(String, String)]) -> Result<Page<JobPosting>, ApiError> {
            self.searches.borrow_mut().push(params.to_vec());
            let job = serde_json::from_value(serde_json::json!({"id": 3, "title": "Line Engineer"})).unwrap();
            Ok(Page {
                results: vec![job],
                count: 1,
                next: None,
                previous: None,
            })
        }
    }

    impl SavedJobsApi for FakeBackend {
        fn saved_searches(&self) -> Result<Vec<SavedSearch>, ApiError> {
            Ok(Vec::new())
        }

        fn save_job(&self, job_id: JobId, title: &str) -> Result<SavedSearch, ApiError> {
            Ok(SavedSearch {
                id: 9,
                name: title.to_string(),
                query: format!("job_id:{}", job_id),
                created_at: None,
            })
        }

        fn unsave_job(&self, _saved_search_id: SavedSearchId) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn browsing(api: &FakeBackend, query_string: &str) -> AppState {
        let mut search = JobSearchController::new();
        search.load(api, query_string);
        AppState::new(search)
    }

    fn last_search(api: &FakeBackend) -> Vec<(String, String)> {
        api.searches.borrow().last().cloned().unwrap()
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_filter_keys_edit_locally_until_applied() {
        let api = FakeBackend::default();
        let mut state = browsing(&api, "query=pilot&page=3");

        state.handle_key(&api, KeyCode::Char('1'));
        state.handle_key(&api, KeyCode::Char('3'));
        state.handle_key(&api, KeyCode::Char('7'));
        state.handle_key(&api, KeyCode::Char('m'));
        assert_eq!(api.searches.borrow().len(), 1);
        assert!(state.filters_edited());
        assert_eq!(state.search.location(), "query=pilot&page=3");

        state.handle_key(&api, KeyCode::Char('a'));
        assert_eq!(api.searches.borrow().len(), 2);
        assert_eq!(
            last_search(&api),
            pairs(&[
                ("query", "pilot"),
                ("job_type", "full-time,contract"),
                ("experience_level", "senior"),
                ("is_remote", "true"),
                ("page", "1"),
            ])
        );
        assert!(!state.filters_edited());
    }

    #[test]
    fn test_checkbox_key_toggles_off_again() {
        let api = FakeBackend::default();
        let mut state = browsing(&api, "job_type=part-time");
        state.handle_key(&api, KeyCode::Char('2'));
        assert!(state.search.filters.job_type.is_empty());
    }

    #[test]
    fn test_keyword_entry_applies_on_enter() {
        let api = FakeBackend::default();
        let mut state = browsing(&api, "");

        state.handle_key(&api, KeyCode::Char('/'));
        for c in "atrx".chars() {
            state.handle_key(&api, KeyCode::Char(c));
        }
        state.handle_key(&api, KeyCode::Backspace);
        // 'q' is text while typing, not quit
        assert!(state.handle_key(&api, KeyCode::Char('q')));
        assert_eq!(state.search.filters.query, "atrq");
        assert_eq!(api.searches.borrow().len(), 1);

        state.handle_key(&api, KeyCode::Enter);
        assert_eq!(state.mode, Mode::Browse);
        assert_eq!(last_search(&api), pairs(&[("query", "atrq"), ("page", "1")]));
    }

    #[test]
    fn test_escape_leaves_keyword_edit_unapplied() {
        let api = FakeBackend::default();
        let mut state = browsing(&api, "");
        state.handle_key(&api, KeyCode::Char('/'));
        state.handle_key(&api, KeyCode::Char('b'));
        state.handle_key(&api, KeyCode::Esc);

        assert_eq!(state.mode, Mode::Browse);
        assert!(state.filters_edited());
        assert_eq!(api.searches.borrow().len(), 1);
    }

    #[test]
    fn test_reset_navigates_to_bare_path() {
        let api = FakeBackend::default();
        let mut state = browsing(&api, "query=pilot&is_remote=true&page=2");
        state.handle_key(&api, KeyCode::Char('x'));

        assert_eq!(state.search.location(), "");
        assert!(state.search.filters.is_empty());
        assert_eq!(last_search(&api), pairs(&[("page", "1")]));
    }

    #[test]
    fn test_department_cycles_through_list_and_back_to_all() {
        let api = FakeBackend::default();
        let mut state = browsing(&api, "");
        state.handle_key(&api, KeyCode::Char('d'));
        assert_eq!(state.search.filters.department, DEPARTMENTS[0]);
        for _ in 1..DEPARTMENTS.len() {
            state.handle_key(&api, KeyCode::Char('d'));
        }
        assert_eq!(state.search.filters.department, "Other");
        state.handle_key(&api, KeyCode::Char('d'));
        assert_eq!(state.search.filters.department, "");
    }

    #[test]
    fn test_save_key_and_quit() {
        let api = FakeBackend::default();
        let mut state = browsing(&api, "");
        state.handle_key(&api, KeyCode::Char('s'));
        assert_eq!(state.message.as_deref(), Some("Saved"));
        assert_eq!(state.search.favorites.state(3), Some(Favorite::Saved(9)));
        assert!(!state.handle_key(&api, KeyCode::Char('q')));
    }

    #[test]
    fn test_filter_summary() {
        assert_eq!(filter_summary(&SearchFilters::default()), "No filters");
        let (filters, _) = SearchFilters::parse("query=pilot&job_type=contract");
        assert_eq!(filter_summary(&filters), "query=pilot  job_type=contract");
    }
}
