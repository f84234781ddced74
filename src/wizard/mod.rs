//! Multi-step forms.
//!
//! [`Wizard`] is the step machine shared by the job-posting and profile
//! wizards: it only moves forward when the current step validates, always
//! allows moving back, and enters a terminal success state once a submit
//! succeeds. The forms themselves describe their steps through
//! [`StepForm`].

pub mod autosave;
pub mod posting;
pub mod profile;

use crate::error::FieldErrors;

pub trait StepForm {
    /// Step titles in order. Steps are numbered from 1.
    const STEPS: &'static [&'static str];

    /// Client-side checks for one step; empty means the step may advance.
    fn validate_step(&self, step: usize) -> FieldErrors;

    /// Sets a field by its wire name. Returns `false` for unknown fields or
    /// values that do not fit the field's type.
    fn set_field(&mut self, name: &str, value: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct Wizard<F: StepForm> {
    pub form: F,
    pub errors: FieldErrors,
    current_step: usize,
    succeeded: bool,
}

impl<F: StepForm> Wizard<F> {
    pub fn new(form: F) -> Self {
        Self {
            form,
            errors: FieldErrors::new(),
            current_step: 1,
            succeeded: false,
        }
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn step_title(&self) -> &'static str {
        F::STEPS
            .get(self.current_step.saturating_sub(1))
            .copied()
            .unwrap_or("Success")
    }

    pub fn step_count(&self) -> usize {
        F::STEPS.len()
    }

    pub fn is_last_step(&self) -> bool {
        self.current_step == F::STEPS.len()
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    /// Validates the current step and advances when it passes. On failure
    /// the step is unchanged and `errors` holds the messages.
    pub fn handle_next(&mut self) -> bool {
        if self.succeeded {
            return false;
        }
        let errors = self.form.validate_step(self.current_step);
        if !errors.is_empty() {
            self.errors = errors;
            return false;
        }
        self.errors.clear();
        self.current_step = (self.current_step + 1).min(F::STEPS.len());
        true
    }

    #[cfg(test)]
    pub fn handle_prev(&mut self) {
        if self.succeeded {
            return;
        }
        self.current_step = self.current_step.saturating_sub(1).max(1);
        self.errors.clear();
    }

    /// Back to the first step, unless the wizard already succeeded.
    pub fn restart(&mut self) {
        if !self.succeeded {
            self.current_step = 1;
            self.errors.clear();
        }
    }

    /// Steps forward until the last step, stopping at the first step that
    /// fails. True when the last step is reached and passes its own checks.
    pub fn advance_to_last(&mut self) -> bool {
        while !self.is_last_step() {
            if !self.handle_next() {
                return false;
            }
        }
        let errors = self.form.validate_step(self.current_step);
        if !errors.is_empty() {
            self.errors = errors;
            return false;
        }
        true
    }

    /// Edits a field and clears any error shown for it.
    pub fn set_field(&mut self, name: &str, value: &str) -> bool {
        let accepted = self.form.set_field(name, value);
        if accepted {
            self.errors.remove(name);
        }
        accepted
    }

    /// Replaces the displayed errors with ones from a failed submit.
    pub fn show_errors(&mut self, errors: FieldErrors) {
        self.errors = errors;
    }

    /// Enters the terminal success step, one past the last form step.
    pub fn complete(&mut self) {
        self.errors.clear();
        self.succeeded = true;
        self.current_step = F::STEPS.len() + 1;
    }
}
