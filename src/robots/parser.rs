//! Robots.txt parser implementation
//!
//! Thin wrapper around the robotstxt crate's matcher.

use robotstxt::DefaultMatcher;

/// Parsed robots.txt data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRobots {
    /// Raw robots.txt content; `None` means everything is allowed
    content: Option<String>,
}

impl ParsedRobots {
    /// Creates a ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        if content.trim().is_empty() {
            return Self::allow_all();
        }

        Self {
            content: Some(content.to_string()),
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// Used when robots.txt is missing, unreachable or unreadable.
    pub fn allow_all() -> Self {
        Self { content: None }
    }

    /// Returns true if this instance carries no rules
    pub fn is_allow_all(&self) -> bool {
        self.content.is_none()
    }

    /// Checks if a URL is allowed for the given robots product token
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL or path to check
    /// * `agent_token` - Product token such as `Mozilla` or `SignalScan`
    pub fn is_allowed(&self, url: &str, agent_token: &str) -> bool {
        match &self.content {
            None => true,
            Some(content) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(content, agent_token, url)
            }
        }
    }
}

/// Derives the robots product token from a full user agent string
///
/// `Mozilla/5.0 (Windows NT ...)` becomes `Mozilla`; `SignalScan/1.0` becomes
/// `SignalScan`.
pub fn robots_token(user_agent: &str) -> String {
    let token: String = user_agent
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();

    if token.is_empty() {
        "*".to_string()
    } else {
        token
    }
}
