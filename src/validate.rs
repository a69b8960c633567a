//! Field-format validation for add/edit submissions.
//!
//! Reasons are stable strings surfaced verbatim to the submitting form,
//! so changing them is a compatibility break for UI tests.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::model::types::BookDraft;

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z\s.\-]+$").expect("name regex"));
static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date regex"));
static ISBN10_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\d{9}X|\d{10})$").expect("isbn10 regex"));
static ISBN13_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{13}$").expect("isbn13 regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid title")]
    Title,
    #[error("Invalid author")]
    Author,
    #[error("Invalid genre")]
    Genre,
    #[error("Invalid publication date")]
    PublicationDate,
    #[error("Invalid ISBN")]
    Isbn,
    #[error("Invalid stock")]
    Stock,
}

/// Letters, whitespace, dots, and hyphens only.
fn valid_name(name: &str) -> bool {
    NAME_RE.is_match(name)
}

/// `YYYY-MM-DD` shape and a real calendar date.
fn valid_date(date: &str) -> bool {
    DATE_RE.is_match(date) && NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok()
}

/// ISBN-10 or ISBN-13 shape; checksums are not verified.
fn valid_isbn(isbn: &str) -> bool {
    ISBN10_RE.is_match(isbn) || ISBN13_RE.is_match(isbn)
}

/// Check every field of a draft; the first failing field wins.
pub fn validate_book(draft: &BookDraft) -> Result<(), ValidationError> {
    if !valid_name(&draft.title) {
        return Err(ValidationError::Title);
    }
    if !valid_name(&draft.author) {
        return Err(ValidationError::Author);
    }
    if !valid_name(&draft.genre) {
        return Err(ValidationError::Genre);
    }
    if !valid_date(&draft.publication_date) {
        return Err(ValidationError::PublicationDate);
    }
    if !valid_isbn(&draft.isbn) {
        return Err(ValidationError::Isbn);
    }
    if draft.stock < 0 {
        return Err(ValidationError::Stock);
    }
    Ok(())
}
