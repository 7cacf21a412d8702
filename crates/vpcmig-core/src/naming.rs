//! Unique resource names.
//!
//! Copies of existing resources (instance templates, reserved addresses) get
//! a fresh name derived from the original plus a UTC timestamp suffix. The
//! result always satisfies the provider's naming rule: at most
//! [`MAX_NAME_LEN`] characters of `[a-z0-9-]`, starting with a letter and
//! not ending in a hyphen.

use chrono::{DateTime, Utc};

/// Longest name the compute provider accepts.
pub const MAX_NAME_LEN: usize = 63;

/// `{base}-{yyyymmddhhmmss}`, truncating `base` to fit.
pub fn unique_name(base: &str, at: DateTime<Utc>) -> String {
    let suffix = at.format("%Y%m%d%H%M%S").to_string();
    let budget = MAX_NAME_LEN - suffix.len() - 1;

    let mut stem: String = base
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .take(budget)
        .collect();
    while stem.ends_with('-') {
        stem.pop();
    }
    if !stem.starts_with(|c: char| c.is_ascii_lowercase()) {
        stem.insert(0, 'r');
        stem.truncate(budget);
    }

    format!("{stem}-{suffix}")
}

/// [`unique_name`] at the current time.
pub fn unique_name_now(base: &str) -> String {
    unique_name(base, Utc::now())
}
