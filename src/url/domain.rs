use std::net::IpAddr;
use url::Url;

/// Second-level labels that sit under a two-letter country code
/// (`example.co.uk`, `example.com.br`)
const COUNTRY_SECOND_LEVELS: &[&str] = &["co", "com", "net", "org", "gov", "edu", "ac", "gob"];

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use signal_scan::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the `scheme://host:port` key used for per-host caches
pub fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let port = url.port_or_known_default()?;
    Some(format!("{}://{}:{}", url.scheme(), host.to_lowercase(), port))
}

/// Reduces user input to a bare `host[:port]`
///
/// Strips whitespace, the scheme, any path/query/fragment, and trailing dots
/// or slashes. The result is lowercase.
///
/// # Examples
///
/// ```
/// use signal_scan::url::normalize_domain_input;
///
/// assert_eq!(normalize_domain_input("  https://Example.com/about/ "), "example.com");
/// assert_eq!(normalize_domain_input("www.example.es"), "www.example.es");
/// ```
pub fn normalize_domain_input(input: &str) -> String {
    let lowered = input.trim().to_lowercase();
    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);

    let host_part = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();

    host_part.trim_end_matches('.').to_string()
}

/// Strips a leading `www.` label
pub fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Returns true when the host (optionally with a port) is an IP literal
pub fn is_ip_literal(host: &str) -> bool {
    let bare = host.trim_start_matches('[');
    if bare.contains(']') {
        return true;
    }
    let without_port = match bare.rsplit_once(':') {
        Some((h, port)) if port.chars().all(|c| c.is_ascii_digit()) && !h.contains(':') => h,
        _ => bare,
    };
    without_port.parse::<IpAddr>().is_ok()
}

/// Approximates the registrable domain of a host
///
/// Keeps the last two labels, or three when the host ends in a
/// country-code second level such as `co.uk`. IP literals and single-label
/// hosts are returned unchanged.
///
/// # Examples
///
/// ```
/// use signal_scan::url::registrable_domain;
///
/// assert_eq!(registrable_domain("blog.example.com"), "example.com");
/// assert_eq!(registrable_domain("shop.example.co.uk"), "example.co.uk");
/// ```
pub fn registrable_domain(host: &str) -> String {
    let host = host.to_lowercase();
    if is_ip_literal(&host) {
        return host;
    }

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() <= 2 {
        return labels.join(".");
    }

    let tld = labels[labels.len() - 1];
    let second = labels[labels.len() - 2];
    let keep = if tld.len() == 2 && COUNTRY_SECOND_LEVELS.contains(&second) {
        3
    } else {
        2
    };

    labels[labels.len() - keep..].join(".")
}

/// Returns true when `host` is `site` itself or one of its subdomains
pub fn is_same_site(host: &str, site: &str) -> bool {
    let host = host.to_lowercase();
    host == site || host.ends_with(&format!(".{}", site))
}

/// Swaps `.com` and `.es` on a bare domain
///
/// Only used by the opt-in sibling-TLD resolution strategy.
pub fn sibling_tld(domain: &str) -> Option<String> {
    let (host, port) = match domain.rsplit_once(':') {
        Some((h, p)) if p.chars().all(|c| c.is_ascii_digit()) => (h, Some(p)),
        _ => (domain, None),
    };

    let swapped = if let Some(stem) = host.strip_suffix(".com") {
        format!("{}.es", stem)
    } else if let Some(stem) = host.strip_suffix(".es") {
        format!("{}.com", stem)
    } else {
        return None;
    };

    Some(match port {
        Some(p) => format!("{}:{}", swapped, p),
        None => swapped,
    })
}
