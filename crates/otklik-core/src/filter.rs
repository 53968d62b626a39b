//! Pure evaluation of a vacancy against the configured acceptance criteria.
//!
//! `evaluate` never short-circuits: every failing check contributes its own
//! entry to `reasons`, so callers always see the full picture.

use serde::{Deserialize, Serialize};

use crate::models::Vacancy;

/// Acceptance criteria for one run. Immutable while a run is in progress;
/// reloaded between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Minimum acceptable salary; 0 disables the check.
    pub min_salary: u64,
    /// Maximum acceptable salary; 0 disables the check.
    pub max_salary: u64,
    /// Reject vacancies that do not list a salary at all.
    pub skip_if_no_salary: bool,
    /// Case-insensitive substrings matched against the company name.
    pub blacklisted_companies: Vec<String>,
    /// At least one must appear in title + snippet (if non-empty).
    pub required_keywords: Vec<String>,
    /// Any appearance in title + snippet rejects.
    pub excluded_keywords: Vec<String>,
}

/// Result of evaluating one vacancy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterVerdict {
    pub accepted: bool,
    pub reasons: Vec<String>,
}

impl FilterVerdict {
    /// Joined reasons for use as a skip message.
    pub fn summary(&self) -> String {
        self.reasons.join("; ")
    }
}

/// A salary range parsed from free-form listing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SalaryRange {
    pub from: Option<u64>,
    pub to: Option<u64>,
}

/// Evaluate a vacancy against the config. Pure; no side effects.
pub fn evaluate(vacancy: &Vacancy, config: &FilterConfig) -> FilterVerdict {
    let mut reasons = Vec::new();

    check_salary(vacancy, config, &mut reasons);
    check_company(vacancy, config, &mut reasons);
    check_keywords(vacancy, config, &mut reasons);

    FilterVerdict {
        accepted: reasons.is_empty(),
        reasons,
    }
}

fn check_salary(vacancy: &Vacancy, config: &FilterConfig, reasons: &mut Vec<String>) {
    let text = vacancy
        .salary_text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());

    let Some(text) = text else {
        if config.skip_if_no_salary {
            reasons.push("no salary listed".to_string());
        }
        return;
    };

    // Unparseable salary text never rejects.
    let Some(range) = parse_salary(text) else {
        return;
    };

    if config.min_salary > 0
        && let Some(upper) = range.to.or(range.from)
        && upper < config.min_salary
    {
        reasons.push(format!(
            "salary below minimum ({} < {})",
            upper, config.min_salary
        ));
    }

    if config.max_salary > 0
        && let Some(lower) = range.from.or(range.to)
        && lower > config.max_salary
    {
        reasons.push(format!(
            "salary above maximum ({} > {})",
            lower, config.max_salary
        ));
    }
}

fn check_company(vacancy: &Vacancy, config: &FilterConfig, reasons: &mut Vec<String>) {
    let company = vacancy.company.to_lowercase();
    for entry in &config.blacklisted_companies {
        let needle = entry.trim().to_lowercase();
        if !needle.is_empty() && company.contains(&needle) {
            reasons.push(format!("blacklisted company: {}", entry.trim()));
        }
    }
}

fn check_keywords(vacancy: &Vacancy, config: &FilterConfig, reasons: &mut Vec<String>) {
    let haystack = format!("{} {}", vacancy.title, vacancy.snippet).to_lowercase();

    if !config.required_keywords.is_empty() {
        let any_match = config
            .required_keywords
            .iter()
            .any(|kw| haystack.contains(&kw.to_lowercase()));
        if !any_match {
            reasons.push("no required keyword matched".to_string());
        }
    }

    for kw in &config.excluded_keywords {
        let needle = kw.to_lowercase();
        if !needle.is_empty() && haystack.contains(&needle) {
            reasons.push(format!("excluded keyword: {}", kw));
        }
    }
}

/// Parse free-form salary text into a numeric range.
///
/// Strips whitespace (including non-breaking thousands separators) and
/// currency markers, then reads the integer runs. Directional markers
/// («от»/"from", «до»/"up to") decide which bound a lone number fills;
/// two numbers are `{from, to}` in order; one number with no marker is
/// both bounds. Returns `None` when no number is found.
pub fn parse_salary(text: &str) -> Option<SalaryRange> {
    let normalized: String = text
        .chars()
        .map(|c| if c == '\u{a0}' || c == '\u{202f}' { ' ' } else { c })
        .collect::<String>()
        .to_lowercase();

    let numbers = extract_numbers(&normalized);
    if numbers.is_empty() {
        return None;
    }

    let has_from = normalized.contains("от") || normalized.contains("from");
    let has_to = normalized.contains("до") || normalized.contains("up to");

    if numbers.len() >= 2 {
        return Some(SalaryRange {
            from: Some(numbers[0]),
            to: Some(numbers[1]),
        });
    }

    let n = numbers[0];
    match (has_from, has_to) {
        (true, _) => Some(SalaryRange {
            from: Some(n),
            to: None,
        }),
        (false, true) => Some(SalaryRange {
            from: None,
            to: Some(n),
        }),
        (false, false) => Some(SalaryRange {
            from: Some(n),
            to: Some(n),
        }),
    }
}

/// Collect integer runs, merging digit groups separated by a single space
/// ("150 000" is one number, not two).
fn extract_numbers(text: &str) -> Vec<u64> {
    let mut numbers = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_ascii_digit() {
            current.push(c);
        } else if c == ' '
            && !current.is_empty()
            && chars.peek().is_some_and(|n| n.is_ascii_digit())
        {
            // Thousands separator inside one number.
            continue;
        } else if !current.is_empty() {
            if let Ok(n) = current.parse::<u64>() {
                numbers.push(n);
            }
            current.clear();
        }
    }
    if !current.is_empty()
        && let Ok(n) = current.parse::<u64>()
    {
        numbers.push(n);
    }
    numbers
}
