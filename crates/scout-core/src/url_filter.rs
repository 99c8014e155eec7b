//! Career-page URL classification.
//!
//! Favors recall: anything that looks vaguely like a jobs page passes here,
//! and the extractor's confidence score sorts out the noise later.

use url::Url;

/// Job aggregators. Any host containing one of these is rejected outright.
pub const AGGREGATOR_DOMAINS: &[&str] = &[
    "indeed.com",
    "linkedin.com",
    "glassdoor.com",
    "ziprecruiter.com",
    "monster.com",
    "naukri.com",
    "dice.com",
];

/// Path segments and ATS hosts that mark a career page.
const CAREER_PATTERNS: &[&str] = &[
    "/careers",
    "/jobs",
    "/join",
    "/work-with-us",
    "/opportunities",
    "boards.greenhouse.io",
    "jobs.lever.co",
    "careers.smartrecruiters.com",
];

const CAREER_KEYWORDS: &[&str] = &["career", "job", "hiring", "join", "work"];

/// Returns true if `url` plausibly points at a direct employer's career page.
///
/// Never panics; anything that fails to parse or has no host is rejected.
pub fn is_career_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };

    let host = host.to_ascii_lowercase();
    if AGGREGATOR_DOMAINS.iter().any(|d| host.contains(d)) {
        return false;
    }

    let full = url.to_lowercase();
    if matches_career_pattern(&full) {
        return true;
    }

    CAREER_KEYWORDS.iter().any(|kw| full.contains(kw))
}

fn matches_career_pattern(lower_url: &str) -> bool {
    if CAREER_PATTERNS.iter().any(|p| lower_url.contains(p)) {
        return true;
    }
    // Workday-hosted pages: "workday.com" followed by "careers" anywhere after it.
    // Tenant hosts ("<tenant>.wd5.myworkdayjobs.com") pass via the "job" keyword.
    lower_url
        .find("workday.com")
        .is_some_and(|idx| lower_url[idx..].contains("careers"))
}

/// Lower-cased host of `url`, if it parses.
pub fn domain_of(url: &str) -> Option<String> {
    Url::parse(url.trim())
        .ok()?
        .host_str()
        .map(|h| h.to_ascii_lowercase())
}
