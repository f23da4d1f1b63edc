//! Moderation policy: which attachments and links are allowed in the watched chat.

use std::collections::BTreeSet;

/// Immutable moderation policy.
///
/// Built once from config before any message is evaluated and shared read-only
/// (behind an `Arc`) for the lifetime of the process.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Policy {
    permitted_extensions: BTreeSet<String>,
    permitted_domains: Vec<String>,
}

impl Policy {
    /// Extensions are normalised to lower case without a leading `.`; blank
    /// entries are ignored. Domain substrings are kept verbatim.
    pub fn new<E, D>(extensions: E, domains: D) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        let permitted_extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        let permitted_domains = domains
            .into_iter()
            .map(|d| d.as_ref().trim().to_string())
            .filter(|d| !d.is_empty())
            .collect();

        Self {
            permitted_extensions,
            permitted_domains,
        }
    }

    pub fn permitted_extensions(&self) -> impl Iterator<Item = &str> {
        self.permitted_extensions.iter().map(String::as_str)
    }

    pub fn permitted_domains(&self) -> &[String] {
        &self.permitted_domains
    }

    pub fn permits_extension(&self, ext: &str) -> bool {
        self.permitted_extensions.contains(ext)
    }

    /// True if any permitted domain occurs anywhere in `text`.
    ///
    /// Not a host match: `https://evil.test/?r=example.com` contains `example.com`.
    pub fn mentions_permitted_domain(&self, text: &str) -> bool {
        self.permitted_domains.iter().any(|d| text.contains(d.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_normalised() {
        let p = Policy::new([" PNG", ".gif", "", "jpg"], Vec::<String>::new());
        assert!(p.permits_extension("png"));
        assert!(p.permits_extension("gif"));
        assert!(p.permits_extension("jpg"));
        assert!(!p.permits_extension(""));
        assert_eq!(p.permitted_extensions().count(), 3);
    }

    #[test]
    fn domains_match_as_substrings() {
        let p = Policy::new(Vec::<String>::new(), ["youtube.com", " "]);
        assert_eq!(p.permitted_domains(), ["youtube.com".to_string()]);
        assert!(p.mentions_permitted_domain("https://www.youtube.com/watch?v=1"));
        assert!(p.mentions_permitted_domain("https://evil.test/?next=youtube.com"));
        assert!(!p.mentions_permitted_domain("https://YOUTUBE.COM/watch"));
    }
}
