mod api;
mod applications;
mod config;
mod dashboard;
mod error;
mod listings;
mod models;
mod search;
mod session;
mod store;
mod tui;
mod wizard;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Map, Value};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use api::auth::{AccountKind, Credentials};
use api::{ApiClient, ApplicationsApi, ProfileApi};
use applications::{ApplicationForm, ApplicationReview, DocumentUpload, MyApplications};
use config::Config;
use error::FieldErrors;
use listings::{ManageListings, StatusTab};
use models::{ApplicationStatus, JobId};
use search::{JobSearchController, SavedJobsList, SearchFilters, ToggleOutcome};
use session::{Session, SessionEvent};
use store::LocalStore;
use wizard::autosave::{AutosaveState, AUTOSAVE_DELAY};
use wizard::posting::{PostingWizard, PublishStatus};
use wizard::profile::ProfileWizard;

#[derive(Parser)]
#[command(name = "winguport")]
#[command(about = "Aviation job marketplace client - search, save, apply, and manage postings")]
struct Cli {
    /// API base URL (overrides WINGUPORT_API_BASE_URL / VITE_API_BASE_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Log requests and state changes to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session
    Login {
        email: String,

        /// Password (prompted on stdin when omitted)
        #[arg(long, env = "WINGUPORT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Clear the stored session
    Logout,

    /// Show the signed-in user
    Whoami {
        /// Re-fetch the user from the server
        #[arg(long)]
        refresh: bool,
    },

    /// Create an account
    Register {
        email: String,

        #[arg(long)]
        full_name: String,

        /// Register as a recruiter instead of a professional
        #[arg(long)]
        recruiter: bool,

        /// Company name (recruiters)
        #[arg(long)]
        company_name: Option<String>,

        #[arg(long, env = "WINGUPORT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Confirm an email address with the emailed code
    Verify { email: String, otp: String },

    /// Send a new verification code
    ResendOtp { email: String },

    /// Password reset and change
    Password {
        #[command(subcommand)]
        command: PasswordCommands,
    },

    /// Search job postings
    Search(SearchArgs),

    /// Browse search results interactively
    Browse(SearchArgs),

    /// Autocomplete suggestions
    Suggest {
        query: String,

        /// Suggestion type (title, location, ...)
        #[arg(short, long, default_value = "title")]
        kind: String,
    },

    /// Show job details
    Job { id: JobId },

    /// Jobs matched to your profile
    Recommended,

    /// Saved jobs
    Saved {
        #[command(subcommand)]
        command: SavedCommands,
    },

    /// Apply to a job
    Apply {
        job: JobId,

        /// File holding the cover letter (at least 100 characters)
        #[arg(long)]
        cover_letter: PathBuf,

        /// Attachment as TYPE=PATH (cv, cover_letter, certificate, license,
        /// reference, portfolio, other); a bare PATH is a CV
        #[arg(long = "doc")]
        docs: Vec<String>,

        /// Additional information for the recruiter
        #[arg(long)]
        info: Option<String>,
    },

    /// Your applications, or applicants to your postings
    Applications {
        #[command(subcommand)]
        command: ApplicationCommands,
    },

    /// Manage your job postings (recruiters)
    Postings {
        #[command(subcommand)]
        command: PostingCommands,
    },

    /// Professional profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Recruiter company profile
    Company {
        #[command(subcommand)]
        command: CompanyCommands,
    },

    /// Profile-completion reminder
    Nudge {
        #[command(subcommand)]
        command: NudgeCommands,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// Keywords
    query: Option<String>,

    #[arg(short, long)]
    location: Option<String>,

    #[arg(short, long)]
    department: Option<String>,

    /// Job types, comma separated or repeated (full-time, part-time, contract, ...)
    #[arg(long, value_delimiter = ',')]
    job_type: Vec<String>,

    /// Experience levels, comma separated or repeated
    #[arg(long, value_delimiter = ',')]
    experience_level: Vec<String>,

    #[arg(long)]
    remote: bool,

    #[arg(long)]
    aircraft_type: Option<String>,

    #[arg(long)]
    min_salary: Option<u64>,

    #[arg(long)]
    max_salary: Option<u64>,

    #[arg(short, long, default_value = "1")]
    page: u32,

    /// Raw query string, e.g. "?query=pilot&job_type=full-time&page=2"
    #[arg(long, conflicts_with_all = ["query", "location", "department", "job_type", "experience_level", "remote", "aircraft_type", "min_salary", "max_salary"])]
    url: Option<String>,
}

impl SearchArgs {
    fn query_string(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        let filters = SearchFilters {
            query: self.query.clone().unwrap_or_default(),
            location: self.location.clone().unwrap_or_default(),
            department: self.department.clone().unwrap_or_default(),
            job_type: self.job_type.clone(),
            experience_level: self.experience_level.clone(),
            is_remote: self.remote,
            aircraft_type: self.aircraft_type.clone().unwrap_or_default(),
            min_salary: self.min_salary,
            max_salary: self.max_salary,
        };
        filters.to_query_string(self.page.max(1))
    }
}

#[derive(Subcommand)]
enum PasswordCommands {
    /// Email a reset link
    Reset { email: String },

    /// Set a new password from a reset link
    Confirm {
        uid: String,
        token: String,
        #[arg(long, env = "WINGUPORT_NEW_PASSWORD", hide_env_values = true)]
        new_password: Option<String>,
    },

    /// Change the password of the signed-in account
    Change {
        #[arg(long)]
        old_password: String,
        #[arg(long)]
        new_password: String,
    },
}

#[derive(Subcommand)]
enum SavedCommands {
    /// List saved jobs
    List,

    /// Save a job
    Add { job_id: JobId },

    /// Remove a saved job
    Remove { job_id: JobId },
}

#[derive(Subcommand)]
enum ApplicationCommands {
    /// List your applications
    List,

    /// Show one application
    Show { id: String },

    /// Withdraw an application
    Withdraw {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Application counts
    Stats,

    /// Review applicants (recruiters)
    Review {
        /// Only applicants to this posting
        #[arg(short, long)]
        job: Option<JobId>,

        /// Status tab (submitted, under_review, shortlisted, interview)
        #[arg(short, long)]
        status: Option<String>,

        /// Applicant name contains
        #[arg(long)]
        search: Option<String>,
    },

    /// Move an applicant to a new status (recruiters)
    SetStatus {
        id: String,

        /// submitted, under_review, shortlisted, interview, rejected
        status: String,

        #[arg(short, long)]
        job: Option<JobId>,
    },
}

#[derive(Subcommand)]
enum PostingCommands {
    /// List your postings
    List {
        /// all, active, draft, closed
        #[arg(short, long, default_value = "all")]
        status: String,

        /// Title or location contains
        #[arg(long)]
        search: Option<String>,

        #[arg(short, long, default_value = "1")]
        page: usize,
    },

    /// Publicly active postings
    Active,

    /// Save a posting as draft
    Draft(PostingArgs),

    /// Publish a posting
    Publish(PostingArgs),

    /// Switch a posting between active and draft
    Toggle { id: JobId },

    /// Delete a posting
    Delete { id: JobId },
}

#[derive(Args)]
struct PostingArgs {
    /// Existing posting to edit
    #[arg(long)]
    edit: Option<JobId>,

    /// Field assignments, e.g. --set title="B737 Captain"
    #[arg(long = "set", value_parser = parse_key_val)]
    fields: Vec<(String, String)>,
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Show your professional profile
    Show,

    /// Edit profile fields; saved as a draft unless --submit is given
    Edit {
        /// Field assignments (full_name, phone_number, current_job_title,
        /// years_of_experience, cv, aviation_licenses, profile_picture, ...)
        #[arg(long = "set", value_parser = parse_key_val)]
        fields: Vec<(String, String)>,

        /// Validate every step and submit the full profile
        #[arg(long)]
        submit: bool,
    },
}

#[derive(Subcommand)]
enum CompanyCommands {
    /// Show the company profile
    Show,

    /// Update company fields
    Set {
        #[arg(long = "set", value_parser = parse_key_val, required = true)]
        fields: Vec<(String, String)>,
    },
}

#[derive(Subcommand)]
enum NudgeCommands {
    /// Show profile completion and whether the reminder is dismissed
    Status,

    /// Hide the "profile complete" banner for a week
    Dismiss,
}

fn parse_key_val(s: &str) -> Result<(String, String)> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got '{}'", s))?;
    Ok((key.trim().to_string(), value.to_string()))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "winguport=info" } else { "winguport=warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn prompt_password(given: Option<String>) -> Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("A password is required");
    }
    Ok(password)
}

/// Reads a yes/no answer. Anything but `y` or `yes` is a no.
fn confirm_from<R: BufRead>(mut reader: R, prompt: &str) -> Result<bool> {
    eprint!("{} [y/N] ", prompt);
    let mut line = String::new();
    reader.read_line(&mut line).context("Failed to read confirmation")?;
    let answer = line.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

fn confirm(prompt: &str) -> Result<bool> {
    confirm_from(std::io::stdin().lock(), prompt)
}

fn print_errors(errors: &FieldErrors) {
    for (field, message) in errors {
        println!("  {}: {}", field, message);
    }
}

fn print_job_table(jobs: &[models::JobPosting], saved: impl Fn(JobId) -> bool) {
    println!("{:<3}{:<6} {:<30} {:<20} {:<12} {:>20}", "", "ID", "TITLE", "LOCATION", "TYPE", "SALARY");
    println!("{}", "-".repeat(94));
    for job in jobs {
        println!(
            "{:<3}{:<6} {:<30} {:<20} {:<12} {:>20}",
            if saved(job.id) { "*" } else { "" },
            job.id,
            truncate(&job.title, 28),
            truncate(job.location.as_deref().unwrap_or(""), 18),
            truncate(job.job_type.as_deref().unwrap_or(""), 10),
            job.salary_label()
        );
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::from_env();
    if let Some(url) = &cli.api_url {
        config = config.with_api_base_url(url);
    }

    let store = LocalStore::open(&config.store_path())?;
    if let Some(path) = store.path() {
        tracing::debug!(path = %path.display(), "Opened local store");
    }
    let session = Arc::new(Session::hydrate(store)?);
    let events = session.subscribe();
    let api = ApiClient::new(&config, Arc::clone(&session))?;

    let result = run(cli.command, &api, &session);

    if events.try_iter().any(|event| event == SessionEvent::Expired) {
        eprintln!("Your session has expired. Run `winguport login` to sign in again.");
    }
    result
}

fn run(command: Commands, api: &ApiClient, session: &Session) -> Result<()> {
    match command {
        Commands::Login { email, password } => {
            let credentials = Credentials {
                email,
                password: prompt_password(password)?,
            };
            let response = api.login(&credentials)?;
            match response.access {
                Some(_) => {
                    let name = response
                        .user
                        .as_ref()
                        .and_then(|u| u.full_name.clone())
                        .unwrap_or_else(|| credentials.email.clone());
                    println!("Signed in as {}", name);
                }
                None => println!("Login response did not include an access token."),
            }
        }

        Commands::Logout => {
            api.logout()?;
            println!("Signed out.");
        }

        Commands::Whoami { refresh } => {
            if refresh {
                let user = api.current_user()?;
                session.update_user(user)?;
            }
            match session.user() {
                Some(user) => {
                    println!("Email: {}", user.email);
                    if let Some(name) = &user.full_name {
                        println!("Name: {}", name);
                    }
                    if let Some(role) = &user.role {
                        println!("Role: {}", role);
                    }
                }
                None if session.is_authenticated() => println!("Signed in (no cached user)."),
                None => println!("Not signed in."),
            }
        }

        Commands::Register {
            email,
            full_name,
            recruiter,
            company_name,
            password,
        } => {
            let password = prompt_password(password)?;
            let kind = if recruiter {
                AccountKind::Recruiter
            } else {
                AccountKind::Professional
            };
            let mut data = json!({
                "email": email,
                "full_name": full_name,
                "password": password,
                "password2": password,
            });
            if let Some(company) = company_name {
                data["company_name"] = Value::String(company);
            }
            match api.register(kind, &data) {
                Ok(_) => println!("Account created. Check {} for a verification code.", email),
                Err(e) => {
                    let Some(errors) = e.field_errors().cloned() else {
                        return Err(e.into());
                    };
                    println!("Registration failed:");
                    print_errors(&errors);
                }
            }
        }

        Commands::Verify { email, otp } => {
            api.verify_email(&email, &otp)?;
            println!("Email verified. You can now sign in.");
        }

        Commands::ResendOtp { email } => {
            api.resend_otp(&email)?;
            println!("A new code was sent to {}.", email);
        }

        Commands::Password { command } => match command {
            PasswordCommands::Reset { email } => {
                api.request_password_reset(&email)?;
                println!("If {} has an account, a reset link is on its way.", email);
            }
            PasswordCommands::Confirm {
                uid,
                token,
                new_password,
            } => {
                let password = prompt_password(new_password)?;
                api.confirm_password_reset(&json!({
                    "uid": uid,
                    "token": token,
                    "new_password": password,
                }))?;
                println!("Password reset. You can now sign in.");
            }
            PasswordCommands::Change {
                old_password,
                new_password,
            } => {
                api.change_password(&old_password, &new_password)?;
                println!("Password changed.");
            }
        },

        Commands::Search(args) => {
            let mut search = JobSearchController::new();
            search.refresh_favorites(api);
            search.load(api, &args.query_string());

            if let Some(error) = &search.error {
                println!("{}", error);
            } else if search.jobs.is_empty() {
                println!("No jobs found.");
            } else {
                print_job_table(&search.jobs, |id| search.favorites.is_saved(id));
                let p = &search.pagination;
                println!("\nPage {} - {} job(s) total", p.current_page, p.count);
                if let Some(next) = search.next_page() {
                    println!("Next page: winguport search --url '{}'", next);
                }
            }
        }

        Commands::Browse(args) => {
            tui::run_browse(api, &args.query_string())?;
        }

        Commands::Suggest { query, kind } => {
            for suggestion in api.search_suggestions(&query, &kind)? {
                match suggestion.kind {
                    Some(kind) => println!("{} ({})", suggestion.value, kind),
                    None => println!("{}", suggestion.value),
                }
            }
        }

        Commands::Job { id } => {
            let job = api.job_details(id)?;
            println!("Job #{}", job.id);
            println!("Title: {}", job.title);
            if let Some(employer) = job.employer() {
                println!("Employer: {}", employer);
            }
            if let Some(location) = &job.location {
                println!("Location: {}{}", location, if job.is_remote { " (remote)" } else { "" });
            }
            if let Some(department) = &job.department {
                println!("Department: {}", department);
            }
            if let Some(job_type) = &job.job_type {
                println!("Type: {}", job_type);
            }
            if let Some(level) = &job.experience_level {
                println!("Experience: {}", level);
            }
            println!("Salary: {}", job.salary_label());
            if let Some(created) = &job.created_at {
                println!("Posted: {}", created);
            }
            for (label, body) in [
                ("Description", &job.description),
                ("Responsibilities", &job.responsibilities),
                ("Qualifications", &job.qualifications),
            ] {
                if let Some(body) = body {
                    println!("\n--- {} ---\n{}", label, textwrap::fill(body, 80));
                }
            }
        }

        Commands::Recommended => {
            let matches = api.recommended_jobs()?;
            if matches.is_empty() {
                println!("No recommendations yet. Completing your profile improves matching.");
            } else {
                println!("{:<6} {:>6} {:<30} {:<20}", "ID", "SCORE", "TITLE", "LOCATION");
                println!("{}", "-".repeat(65));
                for m in matches {
                    println!(
                        "{:<6} {:>5.0}% {:<30} {:<20}",
                        m.job.id,
                        m.match_score,
                        truncate(&m.job.title, 28),
                        truncate(m.job.location.as_deref().unwrap_or(""), 18)
                    );
                }
            }
        }

        Commands::Saved { command } => match command {
            SavedCommands::List => {
                let mut list = SavedJobsList::default();
                list.load(api);
                if let Some(error) = &list.error {
                    println!("{}", error);
                } else if list.records.is_empty() {
                    println!("No saved jobs.");
                } else {
                    println!("{:<8} {:<8} {:<40} {:<20}", "SAVED", "JOB", "TITLE", "SAVED AT");
                    println!("{}", "-".repeat(78));
                    for record in &list.records {
                        let job = search::favorites::job_id_from_query(&record.query)
                            .map(|id| id.to_string())
                            .unwrap_or_else(|| "-".to_string());
                        println!(
                            "{:<8} {:<8} {:<40} {:<20}",
                            record.id,
                            job,
                            truncate(&record.name, 38),
                            truncate(record.created_at.as_deref().unwrap_or(""), 18)
                        );
                    }
                }
            }
            SavedCommands::Add { job_id } => {
                let mut search = JobSearchController::new();
                search.refresh_favorites(api);
                if search.favorites.is_saved(job_id) {
                    println!("Job #{} is already saved.", job_id);
                } else {
                    let title = api.job_details(job_id)?.title;
                    match search.favorites.toggle(api, job_id, &title) {
                        ToggleOutcome::Saved(_) => println!("Saved job #{} ({}).", job_id, title),
                        _ => println!("Could not save job #{}.", job_id),
                    }
                }
            }
            SavedCommands::Remove { job_id } => {
                let mut list = SavedJobsList::default();
                list.load(api);
                let record = list
                    .records
                    .iter()
                    .find(|r| search::favorites::job_id_from_query(&r.query) == Some(job_id))
                    .map(|r| r.id);
                match record {
                    Some(saved_id) if list.remove(api, saved_id) => {
                        println!("Removed job #{} from saved jobs.", job_id)
                    }
                    Some(_) => println!("{}", list.error.unwrap_or_default()),
                    None => println!("Job #{} is not saved.", job_id),
                }
            }
        },

        Commands::Apply {
            job,
            cover_letter,
            docs,
            info,
        } => {
            let mut form = ApplicationForm::new(job);
            form.cover_letter = std::fs::read_to_string(&cover_letter)
                .with_context(|| format!("Failed to read {}", cover_letter.display()))?;
            form.additional_information = info.unwrap_or_default();
            for doc in &docs {
                form.documents.push(DocumentUpload::parse(doc)?);
            }
            match form.submit(api) {
                Ok(_) => println!("Application submitted for job #{}.", job),
                Err(message) => println!("{}", message),
            }
        }

        Commands::Applications { command } => run_applications(command, api)?,

        Commands::Postings { command } => run_postings(command, api, session)?,

        Commands::Profile { command } => match command {
            ProfileCommands::Show => {
                let profile = api.professional_profile()?;
                println!("Name: {}", profile.full_name);
                if let Some(email) = &profile.email {
                    println!("Email: {}", email);
                }
                if !profile.specialization.is_empty() {
                    println!("Specialization: {}", profile.specialization);
                }
                let info = &profile.personal_info;
                for (label, value) in [
                    ("Phone", &info.phone_number),
                    ("City", &info.city),
                    ("Country", &info.country),
                    ("Nationality", &info.nationality),
                ] {
                    if !value.is_empty() {
                        println!("{}: {}", label, value);
                    }
                }
                let experience = &profile.experience;
                if !experience.current_job_title.is_empty() {
                    println!(
                        "Current role: {} ({} years)",
                        experience.current_job_title, experience.years_of_experience
                    );
                }
                if !info.professional_bio.is_empty() {
                    println!("\n{}", textwrap::fill(&info.professional_bio, 80));
                }
                println!(
                    "\nProfile completion: {}%",
                    dashboard::profile_completion(Some(&profile))
                );
            }
            ProfileCommands::Edit { fields, submit } => {
                let mut wizard = ProfileWizard::load(api)?;
                let now = Instant::now();
                for (name, value) in &fields {
                    if !wizard.edit(name, value, now) {
                        bail!("Unknown profile field '{}'", name);
                    }
                }

                if submit {
                    if wizard.submit(api, session) {
                        println!("Profile submitted.");
                    } else {
                        println!("Profile not submitted ({}):", wizard.wizard.step_title());
                        print_errors(&wizard.wizard.errors);
                    }
                } else if wizard.tick(api, now + AUTOSAVE_DELAY) {
                    match wizard.autosave.state() {
                        AutosaveState::Error => println!("Could not save the draft. Please try again."),
                        _ => println!("Draft saved."),
                    }
                } else {
                    println!("Nothing to save.");
                }
            }
        },

        Commands::Company { command } => match command {
            CompanyCommands::Show => {
                let profile = api.recruiter_profile()?;
                if let Value::Object(map) = profile {
                    for (key, value) in map {
                        match value {
                            Value::Null => {}
                            Value::String(s) => println!("{}: {}", key, s),
                            other => println!("{}: {}", key, other),
                        }
                    }
                }
            }
            CompanyCommands::Set { fields } => {
                let data: Map<String, Value> = fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect();
                api.update_recruiter_profile(&data)?;
                println!("Company profile updated.");
            }
        },

        Commands::Nudge { command } => {
            let now = chrono::Utc::now();
            match command {
                NudgeCommands::Status => {
                    let profile = match api.professional_profile() {
                        Ok(profile) => Some(profile),
                        Err(e) => {
                            tracing::warn!("Could not load profile: {}", e);
                            None
                        }
                    };
                    let completion = dashboard::profile_completion(profile.as_ref());
                    let dismissed = session.with_store(|store| dashboard::is_dismissed(store, now))?;
                    match dashboard::nudge(completion, dismissed) {
                        dashboard::ProfileNudge::Incomplete(pct) => {
                            println!("Profile {}% complete. Run `winguport profile edit` to finish it.", pct)
                        }
                        dashboard::ProfileNudge::Complete => {
                            println!("Profile complete! Your profile is ready for employers to discover.")
                        }
                        dashboard::ProfileNudge::Hidden => println!("Profile complete (reminder dismissed)."),
                    }
                    let recommended = dashboard::recommended_preview(api.recommended_jobs());
                    if !recommended.is_empty() {
                        println!("\nRecommended for you:");
                        for m in recommended {
                            println!("  #{} {} ({:.0}% match)", m.job.id, m.job.title, m.match_score);
                        }
                    }
                }
                NudgeCommands::Dismiss => {
                    let until = session.with_store(|store| dashboard::dismiss(store, now))?;
                    println!(
                        "Reminder hidden until {}.",
                        until.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
                    );
                }
            }
        }
    }

    Ok(())
}

fn run_applications(command: ApplicationCommands, api: &ApiClient) -> Result<()> {
    match command {
        ApplicationCommands::List => {
            let mut mine = MyApplications::default();
            mine.load(api);
            if let Some(error) = &mine.error {
                println!("{}", error);
            } else if mine.applications.is_empty() {
                println!("No applications yet.");
            } else {
                println!("{:<38} {:<16} {:<30} {:<12}", "ID", "STATUS", "JOB", "APPLIED");
                println!("{}", "-".repeat(98));
                for app in &mine.applications {
                    println!(
                        "{:<38} {:<16} {:<30} {:<12}",
                        app.id,
                        app.status.label(),
                        truncate(app.job_title(), 28),
                        truncate(app.created_at.as_deref().unwrap_or(""), 10)
                    );
                }
            }
        }

        ApplicationCommands::Show { id } => {
            let mut mine = MyApplications::default();
            let Some(app) = mine.details(api, &id) else {
                println!("{}", mine.error.unwrap_or_default());
                return Ok(());
            };
            println!("Application {}", app.id);
            println!("Job: {}", app.job_title());
            println!("Status: {}", app.status.label());
            if let Some(created) = &app.created_at {
                println!("Applied: {}", created);
            }
            if !app.documents.is_empty() {
                println!("\nDocuments:");
                for doc in &app.documents {
                    println!("  [{}] {}", doc.document_type, doc.name);
                }
            }
            if let Some(letter) = &app.cover_letter {
                println!("\n--- Cover Letter ---\n{}", textwrap::fill(letter, 80));
            }
        }

        ApplicationCommands::Withdraw { id, yes } => {
            if !yes && !confirm(&format!("Withdraw application {}?", id))? {
                println!("Cancelled.");
                return Ok(());
            }
            let mut mine = MyApplications::default();
            mine.load(api);
            if mine.withdraw(api, &id) {
                println!("Application {} withdrawn.", id);
            } else if let Some(error) = &mine.error {
                println!("{}", error);
            }
        }

        ApplicationCommands::Stats => {
            let mut mine = MyApplications::default();
            mine.load(api);
            let local = mine.stats();
            println!("Total:      {}", local.total);
            println!("Active:     {}", local.active);
            println!("Interviews: {}", local.interviews);

            let stats = api.application_stats()?;
            if !stats.job_breakdown.is_empty() {
                println!("\nApplicants per posting:");
                for (job_id, breakdown) in &stats.job_breakdown {
                    println!(
                        "  #{:<6} {:<30} {}",
                        job_id,
                        truncate(breakdown.title.as_deref().unwrap_or(""), 28),
                        breakdown.count
                    );
                }
            }
        }

        ApplicationCommands::Review { job, status, search } => {
            let mut review = ApplicationReview::new(job);
            review.status_filter = status
                .as_deref()
                .map(str::parse::<ApplicationStatus>)
                .transpose()
                .map_err(|e| anyhow!(e))?;
            review.search_term = search.unwrap_or_default();
            review.load(api);
            if let Some(error) = &review.error {
                println!("{}", error);
                return Ok(());
            }

            let counts = review
                .counts()
                .into_iter()
                .map(|(tab, count)| format!("{} {}", tab, count))
                .collect::<Vec<_>>()
                .join(" | ");
            println!("{}\n", counts);

            let apps = review.filtered();
            if apps.is_empty() {
                println!("No applications match.");
            } else {
                println!("{:<38} {:<24} {:<16} {:<24}", "ID", "APPLICANT", "STATUS", "JOB");
                println!("{}", "-".repeat(104));
                for app in apps {
                    println!(
                        "{:<38} {:<24} {:<16} {:<24}",
                        app.id,
                        truncate(app.applicant_name.as_deref().unwrap_or("?"), 22),
                        app.status.label(),
                        truncate(app.job_title(), 22)
                    );
                }
            }
        }

        ApplicationCommands::SetStatus { id, status, job } => {
            let status: ApplicationStatus = status.parse().map_err(|e: String| anyhow!(e))?;
            if !applications::REVIEW_STATUS_OPTIONS.contains(&status) {
                bail!(
                    "Status must be one of: {}",
                    applications::REVIEW_STATUS_OPTIONS
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            let mut review = ApplicationReview::new(job);
            review.load(api);
            if review.update_status(api, &id, status) {
                println!("Application {} is now {}.", id, status.label());
            } else if let Some(error) = &review.error {
                println!("{}", error);
            }
        }
    }
    Ok(())
}

fn run_postings(command: PostingCommands, api: &ApiClient, session: &Session) -> Result<()> {
    match command {
        PostingCommands::List { status, search, page } => {
            let mut listings = ManageListings::new();
            listings.status_tab = match status.as_str() {
                "all" => StatusTab::All,
                "active" => StatusTab::Active,
                "draft" => StatusTab::Draft,
                "closed" => StatusTab::Closed,
                other => bail!("Unknown status tab '{}' (all, active, draft, closed)", other),
            };
            listings.search_term = search.unwrap_or_default();
            listings.current_page = page.max(1);
            listings.load(api);

            if let Some(error) = &listings.error {
                println!("{}", error);
                return Ok(());
            }
            let jobs = listings.page();
            if jobs.is_empty() {
                println!("No job postings found.");
                return Ok(());
            }
            println!("{:<6} {:<8} {:<30} {:<20} {:>10}", "ID", "STATUS", "TITLE", "LOCATION", "APPLICANTS");
            println!("{}", "-".repeat(78));
            for job in jobs {
                println!(
                    "{:<6} {:<8} {:<30} {:<20} {:>10}",
                    job.id,
                    job.status.as_deref().unwrap_or("?"),
                    truncate(&job.title, 28),
                    truncate(job.location.as_deref().unwrap_or(""), 18),
                    job.applicants_count.unwrap_or(0)
                );
            }
            println!("\nPage {} of {}", listings.current_page, listings.total_pages().max(1));
        }

        PostingCommands::Active => {
            let jobs = api.active_job_postings()?;
            if jobs.is_empty() {
                println!("No active postings.");
            } else {
                print_job_table(&jobs, |_| false);
            }
        }

        PostingCommands::Draft(args) => save_posting(api, session, args, PublishStatus::Draft)?,

        PostingCommands::Publish(args) => save_posting(api, session, args, PublishStatus::Active)?,

        PostingCommands::Toggle { id } => {
            let mut listings = ManageListings::new();
            listings.load(api);
            match listings.toggle_status(api, id) {
                Ok(message) | Err(message) => println!("{}", message),
            }
        }

        PostingCommands::Delete { id } => {
            let mut listings = ManageListings::new();
            listings.load(api);
            match listings.delete(api, id) {
                Ok(message) | Err(message) => println!("{}", message),
            }
        }
    }
    Ok(())
}

fn save_posting(api: &ApiClient, session: &Session, args: PostingArgs, status: PublishStatus) -> Result<()> {
    let email = session.user().map(|u| u.email);
    let mut posting = match args.edit {
        Some(id) => PostingWizard::edit(api, id, email.as_deref())?,
        None => PostingWizard::new(email.as_deref()),
    };
    for (name, value) in &args.fields {
        if !posting.wizard.set_field(name, value) {
            bail!("Unknown or invalid posting field '{}={}'", name, value);
        }
    }

    match posting.submit(api, status) {
        Ok(message) => {
            println!("{}", message);
            if let Some(id) = posting.job_id {
                println!("Posting #{}", id);
            }
            if posting.wizard.succeeded() {
                println!("The posting is now live.");
            }
        }
        Err(message) => {
            println!("{}", message);
            let wizard = &posting.wizard;
            if status == PublishStatus::Active && !wizard.succeeded() {
                println!(
                    "Stopped at step {} of {} ({})",
                    wizard.current_step(),
                    wizard.step_count(),
                    wizard.step_title()
                );
            }
            print_errors(&wizard.errors);
        }
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
