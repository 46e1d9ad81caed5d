//! URL and host utilities
//!
//! Request URLs arrive as plain strings from the browser. These helpers pull
//! out the hostname without a full URL parse; anything without an authority
//! section (`data:`, `blob:`, `about:`) has no host and is treated as
//! unparseable by callers.

// =============================================================================
// Scheme
// =============================================================================

/// Get the position after "://".
#[inline]
pub fn get_scheme_end(url: &str) -> Option<usize> {
    let bytes = url.as_bytes();

    let colon_pos = bytes.iter().position(|&b| b == b':')?;
    if colon_pos == 0 || !bytes[..colon_pos].iter().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.')) {
        return None;
    }

    if bytes.len() > colon_pos + 2
        && bytes[colon_pos + 1] == b'/'
        && bytes[colon_pos + 2] == b'/'
    {
        return Some(colon_pos + 3);
    }

    None
}

// =============================================================================
// Host Extraction
// =============================================================================

/// Get the start and end positions of the hostname in a URL.
#[inline]
pub fn get_host_position(url: &str) -> Option<(usize, usize)> {
    let scheme_end = get_scheme_end(url)?;
    let bytes = url.as_bytes();

    // Skip userinfo
    let mut host_start = scheme_end;
    for i in scheme_end..bytes.len() {
        match bytes[i] {
            b'@' => {
                host_start = i + 1;
                break;
            }
            b'/' | b'?' | b'#' => break,
            _ => {}
        }
    }

    // IPv6 literal keeps its brackets
    if bytes.get(host_start) == Some(&b'[') {
        let close = bytes[host_start..].iter().position(|&b| b == b']')?;
        return Some((host_start, host_start + close + 1));
    }

    let mut host_end = bytes.len();
    for i in host_start..bytes.len() {
        let b = bytes[i];
        if b == b'/' || b == b'?' || b == b'#' || b == b':' {
            host_end = i;
            break;
        }
    }

    Some((host_start, host_end))
}

/// Extract the lower-cased hostname of a URL.
///
/// Returns `None` when the URL has no authority or the host is empty.
pub fn extract_host(url: &str) -> Option<String> {
    let (start, end) = get_host_position(url.trim())?;
    let host = url.trim()[start..end].trim_end_matches('.');
    if host.is_empty() {
        return None;
    }
    Some(host.to_ascii_lowercase())
}

// =============================================================================
// Domain Relations
// =============================================================================

/// `host` equals `domain` or is a dot-separated subdomain of it.
#[inline]
pub fn is_same_or_subdomain(host: &str, domain: &str) -> bool {
    if domain.is_empty() {
        return false;
    }
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}

/// Check a host against a domain list using exact or dot-suffix matching.
pub fn matches_domain_list<S: AsRef<str>>(host: &str, domains: &[S]) -> bool {
    domains
        .iter()
        .any(|domain| is_same_or_subdomain(host, domain.as_ref()))
}
