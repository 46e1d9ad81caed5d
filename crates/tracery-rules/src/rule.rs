//! Declarative rule model
//!
//! Rules serialize to the browser's dynamic-rule JSON:
//!
//! ```json
//! { "id": 1, "priority": 1, "action": { "type": "block" },
//!   "condition": { "urlFilter": "||tracker.com^",
//!                  "resourceTypes": ["sub_frame", "script", ...],
//!                  "excludedInitiatorDomains": ["bank.org"] } }
//! ```
//!
//! The url filter syntax is the small subset the browser documents:
//! `||` host anchor, `|` start/end anchors, `^` separator and `*` wildcard.

use serde::{Deserialize, Serialize};

use tracery_core::types::ResourceType;
use tracery_core::url::{get_host_position, is_same_or_subdomain};

// =============================================================================
// Rule Model
// =============================================================================

/// What a matching rule does to the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleActionType {
    Block,
    Allow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleAction {
    #[serde(rename = "type")]
    pub kind: RuleActionType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub url_filter: String,
    pub resource_types: ResourceType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_initiator_domains: Vec<String>,
}

/// One dynamic rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarativeRule {
    pub id: u32,
    #[serde(default = "default_priority")]
    pub priority: u32,
    pub action: RuleAction,
    pub condition: RuleCondition,
}

fn default_priority() -> u32 {
    1
}

impl DeclarativeRule {
    /// Block rule for a domain and its subdomains.
    pub fn block_domain(id: u32, domain: &str, excluded_initiators: &[String]) -> Self {
        Self {
            id,
            priority: default_priority(),
            action: RuleAction { kind: RuleActionType::Block },
            condition: RuleCondition {
                url_filter: format!("||{}^", domain),
                resource_types: ResourceType::BLOCKABLE,
                excluded_initiator_domains: excluded_initiators.to_vec(),
            },
        }
    }

    /// Domain targeted by a `||domain^` filter.
    pub fn target_domain(&self) -> Option<&str> {
        self.condition
            .url_filter
            .strip_prefix("||")
            .and_then(|rest| rest.strip_suffix('^'))
    }

    /// Check the rule against the engine's structural constraints.
    pub fn validate(&self) -> Result<(), String> {
        if self.id == 0 {
            return Err("rule id must be positive".to_string());
        }
        if self.priority == 0 {
            return Err("priority must be positive".to_string());
        }
        if self.condition.resource_types.is_empty() {
            return Err("resourceTypes must not be empty".to_string());
        }
        for domain in &self.condition.excluded_initiator_domains {
            if domain.is_empty() || !domain.is_ascii() {
                return Err(format!("invalid initiator domain {:?}", domain));
            }
        }
        UrlFilter::compile(&self.condition.url_filter).map(|_| ())
    }
}

// =============================================================================
// Url Filter
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum FilterToken {
    Literal(String),
    /// `*`
    Wildcard,
    /// `^`
    Separator,
}

/// Compiled url filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlFilter {
    host_anchor: Option<String>,
    anchor_start: bool,
    anchor_end: bool,
    tokens: Vec<FilterToken>,
}

impl UrlFilter {
    pub fn compile(filter: &str) -> Result<Self, String> {
        if filter.is_empty() {
            return Err("urlFilter must not be empty".to_string());
        }
        if !filter.is_ascii() {
            return Err(format!("urlFilter {:?} must be ASCII", filter));
        }
        if filter.bytes().any(|b| b.is_ascii_whitespace()) {
            return Err(format!("urlFilter {:?} must not contain whitespace", filter));
        }
        if filter.starts_with("||*") {
            return Err(format!("urlFilter {:?} must not start with ||*", filter));
        }

        let lowered = filter.to_ascii_lowercase();
        let mut rest = lowered.as_str();
        let mut host_anchor = None;
        let mut anchor_start = false;

        if let Some(after) = rest.strip_prefix("||") {
            let end = after
                .find(|c| matches!(c, '/' | '^' | '*' | '?' | '#' | ':' | '|'))
                .unwrap_or(after.len());
            let host = after[..end].trim_matches('.');
            if host.is_empty() {
                return Err(format!("urlFilter {:?} has an empty host anchor", filter));
            }
            host_anchor = Some(host.to_string());
            rest = &after[end..];
        } else if let Some(after) = rest.strip_prefix('|') {
            anchor_start = true;
            rest = after;
        }

        let anchor_end = rest.ends_with('|');
        let rest = rest.trim_end_matches('|');
        if rest.contains('|') {
            return Err(format!("urlFilter {:?} has a misplaced anchor", filter));
        }

        let mut tokens = Vec::new();
        let mut literal = String::new();
        for ch in rest.chars() {
            match ch {
                '*' | '^' => {
                    if !literal.is_empty() {
                        tokens.push(FilterToken::Literal(std::mem::take(&mut literal)));
                    }
                    let token = if ch == '*' { FilterToken::Wildcard } else { FilterToken::Separator };
                    if !(token == FilterToken::Wildcard && tokens.last() == Some(&FilterToken::Wildcard)) {
                        tokens.push(token);
                    }
                }
                _ => literal.push(ch),
            }
        }
        if !literal.is_empty() {
            tokens.push(FilterToken::Literal(literal));
        }

        Ok(Self { host_anchor, anchor_start, anchor_end, tokens })
    }

    /// Match a request URL. Matching is case-insensitive.
    pub fn matches(&self, url: &str) -> bool {
        let lowered = url.to_ascii_lowercase();
        let bytes = lowered.as_bytes();

        let (mut pos, mut floating) = match &self.host_anchor {
            Some(domain) => {
                let (start, end) = match get_host_position(&lowered) {
                    Some(position) => position,
                    None => return false,
                };
                let host = lowered[start..end].trim_end_matches('.');
                if !is_same_or_subdomain(host, domain) {
                    return false;
                }
                (end, false)
            }
            None => (0, !self.anchor_start),
        };

        for token in &self.tokens {
            match token {
                FilterToken::Wildcard => floating = true,
                FilterToken::Literal(literal) => {
                    if floating {
                        match lowered[pos..].find(literal.as_str()) {
                            Some(found) => pos += found + literal.len(),
                            None => return false,
                        }
                    } else if lowered[pos..].starts_with(literal.as_str()) {
                        pos += literal.len();
                    } else {
                        return false;
                    }
                    floating = false;
                }
                FilterToken::Separator => {
                    if floating {
                        pos = match bytes[pos..].iter().position(|&b| is_separator(b)) {
                            Some(found) => pos + found + char_width(&lowered, pos + found),
                            None => bytes.len(),
                        };
                    } else if pos < bytes.len() {
                        if !is_separator(bytes[pos]) {
                            return false;
                        }
                        pos += char_width(&lowered, pos);
                    }
                    floating = false;
                }
            }
        }

        !self.anchor_end || floating || pos == bytes.len()
    }
}

/// Anything but a letter, a digit, or one of `_ - . %`. End of URL also counts.
#[inline]
fn is_separator(b: u8) -> bool {
    !(b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b'%'))
}

/// Byte length of the character starting at `pos`. Non-ASCII separators span
/// the whole character so `pos` stays on a char boundary.
fn char_width(text: &str, pos: usize) -> usize {
    text[pos..].chars().next().map_or(1, char::len_utf8)
}
