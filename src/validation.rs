use chrono::NaiveDate;

use crate::error::CampusError;

pub const ROLL_NO_LEN: usize = 12;

pub fn require(field: &str, value: &str) -> Result<(), CampusError> {
    if value.trim().is_empty() {
        return Err(CampusError::validation(format!("{field} is required")));
    }
    Ok(())
}

pub fn roll_no(value: &str) -> Result<(), CampusError> {
    if value.chars().count() != ROLL_NO_LEN {
        return Err(CampusError::validation(format!(
            "Roll number must be {ROLL_NO_LEN} digits"
        )));
    }
    if !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(CampusError::validation(
            "Roll number must contain only numbers",
        ));
    }
    Ok(())
}

/// Splits a comma-separated subject list, keeping order and dropping blanks.
pub fn subjects(raw: &str) -> Result<Vec<String>, CampusError> {
    let subjects: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if subjects.is_empty() {
        return Err(CampusError::validation("at least one subject is required"));
    }
    Ok(subjects)
}

pub fn date(value: &str) -> Result<(), CampusError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| CampusError::validation(format!("'{value}' is not a YYYY-MM-DD date")))
}
