//! User agent handling for HTTP requests.

/// Identifies the harvester to metadata APIs that ask for a polite client.
pub const USER_AGENT: &str = concat!("sciharvest/", env!("CARGO_PKG_VERSION"), " (research harvester)");

/// Browser user agents presented to publisher sites, which often refuse
/// non-browser clients.
pub const BROWSER_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
];

fn random_browser_user_agent() -> &'static str {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as usize)
        .unwrap_or(0);
    BROWSER_USER_AGENTS[nanos % BROWSER_USER_AGENTS.len()]
}

/// Resolve the user agent for PDF downloads.
/// - None or "browser" => a real browser user agent
/// - "default" => the sciharvest user agent
/// - other => custom user agent string
pub fn resolve_user_agent(config: Option<&str>) -> String {
    match config {
        None | Some("browser") => random_browser_user_agent().to_string(),
        Some("default") => USER_AGENT.to_string(),
        Some(custom) => custom.to_string(),
    }
}
