//! Input validation for supervision planning.
//!
//! Checks structural integrity of teachers and floors before planning.
//! Detects:
//! - Duplicate IDs, abbreviations, e-mail addresses and floor names
//! - Preferred floors that do not exist
//! - Floors with a zero contingent
//! - Lesson periods outside the importable range
//!
//! All problems are collected; validation never stops at the first one.

use std::collections::HashSet;

use crate::models::duty::MAX_PERIOD;
use crate::models::{Floor, Teacher};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// Two teachers share an abbreviation or e-mail, or two floors a name.
    DuplicateKey,
    /// A teacher prefers a floor that doesn't exist.
    InvalidFloorReference,
    /// A floor requires zero teachers per break.
    EmptyContingent,
    /// A lesson period is outside 1..=20.
    InvalidPeriod,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates teachers and floors.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(teachers: &[Teacher], floors: &[Floor]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut floor_ids = HashSet::new();
    let mut floor_names = HashSet::new();
    for f in floors {
        if !floor_ids.insert(f.id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate floor ID: {}", f.id),
            ));
        }
        if !floor_names.insert(f.name.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateKey,
                format!("Duplicate floor name: {}", f.name),
            ));
        }
        if f.required_per_break == 0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyContingent,
                format!("Floor '{}' requires no teachers per break", f.name),
            ));
        }
    }

    let mut teacher_ids = HashSet::new();
    let mut abbreviations = HashSet::new();
    let mut emails = HashSet::new();
    for t in teachers {
        if !teacher_ids.insert(t.id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate teacher ID: {}", t.id),
            ));
        }
        if let Some(abbr) = t.abbreviation.as_deref().filter(|a| !a.is_empty()) {
            if !abbreviations.insert(abbr) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::DuplicateKey,
                    format!("Duplicate teacher abbreviation: {abbr}"),
                ));
            }
        }
        if let Some(email) = t.email.as_deref().filter(|e| !e.is_empty()) {
            if !emails.insert(email) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::DuplicateKey,
                    format!("Duplicate teacher e-mail: {email}"),
                ));
            }
        }
        if let Some(floor_id) = t.preferred_floor {
            if !floor_ids.contains(&floor_id) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidFloorReference,
                    format!(
                        "Teacher '{}' prefers unknown floor {}",
                        t.display_label(),
                        floor_id
                    ),
                ));
            }
        }
        for lesson in &t.lessons {
            if lesson.period == 0 || lesson.period > MAX_PERIOD {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidPeriod,
                    format!(
                        "Teacher '{}' has a lesson in period {} on {}",
                        t.display_label(),
                        lesson.period,
                        lesson.weekday
                    ),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
