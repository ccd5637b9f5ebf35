//! Template-matching helpers shared by the answer and overall evaluators.
//!
//! The model is asked to reproduce a fixed plain-text template; these helpers pull
//! labelled scores and dash-bullet sections back out of it.

use regex::Regex;

/// Number of bullets every evaluation section is asked to contain.
pub const EXPECTED_BULLETS: usize = 3;

/// Runs a two-group `score / explanation` pattern.
///
/// Returns the raw integer (range is checked by the caller) and the trimmed
/// explanation line.
pub fn capture_scored_line(re: &Regex, text: &str) -> Option<(u32, String)> {
    let caps = re.captures(text)?;
    let score = caps.get(1)?.as_str().parse::<u32>().ok()?;
    let explanation = caps
        .get(2)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default();
    Some((score, explanation))
}

/// Runs a one-group score pattern.
pub fn capture_score(re: &Regex, text: &str) -> Option<u32> {
    re.captures(text)?.get(1)?.as_str().parse::<u32>().ok()
}

/// True for the 1–10 rating scale. Zero is reserved for "could not parse".
pub fn is_valid_rating(score: u32) -> bool {
    (1..=10).contains(&score)
}

/// Collects the dash bullets directly under the line that starts with `label:`.
///
/// Blank lines between the label and the first bullet are skipped; the section
/// ends at the first blank or non-bullet line after that.
pub fn bullet_section(text: &str, label: &str) -> Vec<String> {
    let mut lines = text.lines();
    let found = lines.by_ref().any(|line| {
        line.trim_start()
            .strip_prefix(label)
            .map(|rest| rest.trim_start().starts_with(':'))
            .unwrap_or(false)
    });
    if !found {
        return Vec::new();
    }

    let mut bullets = Vec::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            if bullets.is_empty() {
                continue;
            }
            break;
        }
        let Some(item) = line.strip_prefix('-') else {
            break;
        };
        let item = item.trim();
        if !item.is_empty() {
            bullets.push(item.to_string());
        }
    }
    bullets
}
