//! Hand-rolled request body validators, matching the `{issues: [{path, message}]}`
//! shape every route returns on a 400.

use crate::domain::errors::{TownError, ValidationIssue};
use crate::domain::models::{BeadType, Priority};

#[derive(Default)]
pub struct Validator {
    issues: Vec<ValidationIssue>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require_non_empty(&mut self, path: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.issues.push(ValidationIssue::new(path, "must not be empty"));
        }
        self
    }

    pub fn require_max_len(&mut self, path: &str, value: &str, max: usize) -> &mut Self {
        if value.len() > max {
            self.issues.push(ValidationIssue::new(path, format!("must be at most {max} characters")));
        }
        self
    }

    pub fn require_one_of(&mut self, path: &str, value: &str, allowed: &[&str]) -> &mut Self {
        if !allowed.contains(&value) {
            self.issues.push(ValidationIssue::new(path, format!("must be one of {}", allowed.join(", "))));
        }
        self
    }

    pub fn check(&mut self, path: &str, ok: bool, message: &str) -> &mut Self {
        if !ok {
            self.issues.push(ValidationIssue::new(path, message));
        }
        self
    }

    pub fn finish(self) -> Result<(), TownError> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(TownError::Validation(self.issues))
        }
    }
}

pub fn validate_bead_type(path: &str, raw: &str) -> Result<BeadType, TownError> {
    BeadType::parse(raw).ok_or_else(|| {
        TownError::Validation(vec![ValidationIssue::new(path, format!("unknown bead type '{raw}'"))])
    })
}

pub fn validate_priority(path: &str, raw: &str) -> Result<Priority, TownError> {
    Priority::parse(raw).ok_or_else(|| {
        TownError::Validation(vec![ValidationIssue::new(path, format!("unknown priority '{raw}'"))])
    })
}
