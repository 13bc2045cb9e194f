//! URL normalization into job keys.
//!
//! A job key is the canonical form of a URL used for equality when
//! resolving jobs. Protocol (http vs https), a `www.` prefix, host case and
//! trailing slashes are not significant; the query string is, verbatim.

use url::Url;

/// Canonicalize a raw URL into a job key.
///
/// Total and pure: input that cannot be parsed as a URL comes back trimmed
/// but otherwise unchanged. Idempotent, so a key can be normalized again
/// without drifting.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let candidate = if has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let Ok(parsed) = Url::parse(&candidate) else {
        return trimmed.to_string();
    };
    let Some(host) = parsed.host_str() else {
        return trimmed.to_string();
    };

    let scheme = match parsed.scheme() {
        "http" | "https" => "https",
        other => other,
    };
    let lowered = host.to_ascii_lowercase();
    let host = strip_www(&lowered);
    let path = parsed.path().trim_end_matches('/');

    let mut key = format!("{scheme}://{host}{path}");
    if let Some(query) = parsed.query().filter(|q| !q.is_empty()) {
        key.push('?');
        key.push_str(query);
    }
    key
}

/// `scheme://` prefix per RFC 3986: a letter followed by letters, digits,
/// `+`, `-` or `.`.
fn has_scheme(s: &str) -> bool {
    let Some((scheme, _)) = s.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// Drop leading `www.` labels, keeping at least one label.
fn strip_www(host: &str) -> &str {
    let mut host = host;
    while let Some(rest) = host.strip_prefix("www.") {
        if rest.is_empty() {
            break;
        }
        host = rest;
    }
    host
}
