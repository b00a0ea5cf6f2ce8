//! Git URL parsing for boot repository detection.

use std::sync::OnceLock;

use regex_lite::Regex;

fn git_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // scheme, optional user, host, then org path and repo; `.git` optional
        Regex::new(
            r"^(?:[a-z+]+://)?(?:[^@/]+@)?[^/:]+(?::\d+)?[/:](?P<org>[^/]+(?:/[^/]+)*?)/(?P<repo>[^/]+?)(?:\.git)?/?$",
        )
        .expect("git URL pattern is valid")
    })
}

/// Extract `(org, repo)` from an https or scp-style git URL.
pub fn parse_git_url(url: &str) -> Option<(String, String)> {
    let caps = git_url_pattern().captures(url.trim())?;
    let org = caps.name("org")?.as_str();
    let repo = caps.name("repo")?.as_str();
    Some((org.to_string(), repo.to_string()))
}
