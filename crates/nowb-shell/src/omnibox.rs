//! Address bar input resolution

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolution {
    /// Navigate directly
    Url { url: String },
    /// Run a query through the selected search engine
    Search { query: String, url: String },
    /// Refused while focus mode is on
    Blocked { site: String },
}

impl Resolution {
    pub fn url(&self) -> Option<&str> {
        match self {
            Resolution::Url { url } | Resolution::Search { url, .. } => Some(url),
            Resolution::Blocked { .. } => None,
        }
    }
}

/// Turn address bar text into something to load.
///
/// `blocked_sites` is only passed while focus mode is active; input
/// containing any of those substrings is refused.
pub fn resolve(
    text: &str,
    search_template: &str,
    blocked_sites: Option<&[String]>,
) -> Option<Resolution> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(sites) = blocked_sites {
        if let Some(site) = sites
            .iter()
            .find(|site| !site.is_empty() && text.contains(site.as_str()))
        {
            log::info!("Focus mode blocked navigation to {}", text);
            return Some(Resolution::Blocked { site: site.clone() });
        }
    }

    if text.starts_with("about:") {
        return Some(Resolution::Url {
            url: text.to_string(),
        });
    }

    if text.starts_with("http") || text.contains('.') {
        if let Some(url) = as_url(text) {
            return Some(Resolution::Url { url });
        }
    }

    Some(Resolution::Search {
        query: text.to_string(),
        url: format!("{}{}", search_template, urlencoding::encode(text)),
    })
}

/// Accept the text as a URL, adding `http://` when it has no scheme
fn as_url(text: &str) -> Option<String> {
    if text.contains(char::is_whitespace) {
        return None;
    }
    let candidate = if text.contains("://") {
        text.to_string()
    } else {
        format!("http://{}", text)
    };
    Url::parse(&candidate).ok().map(|_| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOGLE: &str = "https://www.google.com/search?q=";

    #[test]
    fn test_urls_pass_through() {
        assert_eq!(
            resolve("https://example.com/a", GOOGLE, None),
            Some(Resolution::Url {
                url: "https://example.com/a".into()
            })
        );
        assert_eq!(
            resolve("about:blank", GOOGLE, None).and_then(|r| r.url().map(String::from)),
            Some("about:blank".into())
        );
    }

    #[test]
    fn test_scheme_defaults_to_http() {
        assert_eq!(
            resolve("example.com", GOOGLE, None),
            Some(Resolution::Url {
                url: "http://example.com".into()
            })
        );
    }

    #[test]
    fn test_plain_text_is_searched() {
        assert_eq!(
            resolve("rust borrow checker", GOOGLE, None),
            Some(Resolution::Search {
                query: "rust borrow checker".into(),
                url: "https://www.google.com/search?q=rust%20borrow%20checker".into(),
            })
        );
        // a dot inside a sentence is still a search
        assert!(matches!(
            resolve("what is 1.5 times 2", GOOGLE, None),
            Some(Resolution::Search { .. })
        ));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(resolve("   ", GOOGLE, None), None);
    }

    #[test]
    fn test_focus_mode_blocks_sites() {
        let blocked = vec!["twitter.com".to_string()];
        assert_eq!(
            resolve("https://twitter.com/home", GOOGLE, Some(&blocked)),
            Some(Resolution::Blocked {
                site: "twitter.com".into()
            })
        );
        assert!(matches!(
            resolve("https://twitter.com/home", GOOGLE, None),
            Some(Resolution::Url { .. })
        ));
        assert!(matches!(
            resolve("example.org", GOOGLE, Some(&blocked)),
            Some(Resolution::Url { .. })
        ));
    }
}
