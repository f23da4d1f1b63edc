//! Message validation.
//!
//! A message in the watched chat is kept only if every link points at a
//! permitted domain, every attachment has a permitted extension, and it is not
//! bare chatter: it must carry a mention, be empty, or consist solely of
//! permitted links.
//!
//! Everything here is pure: no I/O, no logging, no shared state.

use serde::Serialize;
use url::Url;

use crate::{messaging::types::IncomingMessage, policy::Policy};

/// Schemes that count as links. Anything else (`javascript:`, `steam:`, ...)
/// is plain text even when it carries a host.
const LINK_SCHEMES: &[&str] = &["http", "https", "ftp"];

/// Keep/delete decision for one message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Permitted,
    Rejected,
}

impl Verdict {
    pub fn is_valid(self) -> bool {
        matches!(self, Verdict::Permitted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Permitted => "permitted",
            Verdict::Rejected => "rejected",
        }
    }
}

/// Counts derived from a message; the inputs of the verdict rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MessageStats {
    pub tokens: usize,
    pub urls: usize,
    pub valid_urls: usize,
    pub attachments: usize,
    pub valid_attachments: usize,
    pub has_mentions: bool,
    pub content_is_empty: bool,
}

impl MessageStats {
    pub fn all_urls_valid(&self) -> bool {
        self.urls == self.valid_urls
    }

    pub fn all_attachments_valid(&self) -> bool {
        self.attachments == self.valid_attachments
    }

    pub fn all_tokens_are_valid_urls(&self) -> bool {
        self.valid_urls == self.tokens
    }

    pub fn verdict(&self) -> Verdict {
        let exempt =
            self.has_mentions || self.content_is_empty || self.all_tokens_are_valid_urls();
        if self.all_urls_valid() && self.all_attachments_valid() && exempt {
            Verdict::Permitted
        } else {
            Verdict::Rejected
        }
    }
}

/// Whether `token` is an absolute http(s)/ftp URL with a host.
///
/// Never fails: anything unparsable is simply not a URL.
pub fn is_url(token: &str) -> bool {
    // The URL parser strips embedded tabs/newlines; a token containing them is
    // not a single link.
    if token.is_empty() || token.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return false;
    }
    match Url::parse(token) {
        Ok(url) => {
            LINK_SCHEMES.contains(&url.scheme()) && url.host_str().is_some_and(|h| !h.is_empty())
        }
        Err(_) => false,
    }
}

/// Whether `token` is a URL whose text contains a permitted domain.
pub fn is_permitted_url(token: &str, policy: &Policy) -> bool {
    is_url(token) && policy.mentions_permitted_domain(token)
}

/// Number of attachments whose extension the policy permits.
pub fn count_permitted_attachments(message: &IncomingMessage, policy: &Policy) -> usize {
    message
        .attachments
        .iter()
        .filter(|a| {
            a.extension()
                .is_some_and(|ext| policy.permits_extension(&ext))
        })
        .count()
}

pub fn tally(message: &IncomingMessage, policy: &Policy) -> MessageStats {
    let tokens = message.tokens();
    let (urls, valid_urls) = tokens.iter().fold((0, 0), |(urls, valid), t| {
        if !is_url(t) {
            return (urls, valid);
        }
        let permitted = policy.mentions_permitted_domain(t);
        (urls + 1, valid + usize::from(permitted))
    });

    MessageStats {
        tokens: tokens.len(),
        urls,
        valid_urls,
        attachments: message.attachments.len(),
        valid_attachments: count_permitted_attachments(message, policy),
        has_mentions: message.has_mentions(),
        content_is_empty: message.content.is_empty(),
    }
}

/// Classify a message against the policy.
pub fn evaluate(message: &IncomingMessage, policy: &Policy) -> Verdict {
    tally(message, policy).verdict()
}
