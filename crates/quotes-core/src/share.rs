//! Share links and download names for a quote.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::models::{Quote, QuoteId};

/// Social networks with a share intent URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SharePlatform {
    Twitter,
    Facebook,
    LinkedIn,
    WhatsApp,
}

impl SharePlatform {
    pub const ALL: [Self; 4] = [Self::Twitter, Self::Facebook, Self::LinkedIn, Self::WhatsApp];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Twitter => "Twitter",
            Self::Facebook => "Facebook",
            Self::LinkedIn => "LinkedIn",
            Self::WhatsApp => "WhatsApp",
        }
    }

    /// Intent URL sharing `text` and `page_url`.
    #[must_use]
    pub fn share_url(self, text: &str, page_url: &str) -> String {
        let text = urlencoding::encode(text);
        let url = urlencoding::encode(page_url);
        match self {
            Self::Twitter => format!("https://twitter.com/intent/tweet?text={text}&url={url}"),
            Self::Facebook => {
                format!("https://www.facebook.com/sharer/sharer.php?u={url}&quote={text}")
            }
            Self::LinkedIn => format!(
                "https://www.linkedin.com/sharing/share-offsite/?url={url}&summary={text}"
            ),
            Self::WhatsApp => format!("https://wa.me/?text={text}%20{url}"),
        }
    }
}

impl fmt::Display for SharePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One rendered share link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub platform: SharePlatform,
    pub url: String,
}

/// Absolute URL of a quote's page.
#[must_use]
pub fn quote_page_url(base_url: &str, id: &QuoteId) -> String {
    format!(
        "{}/quote/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(id.as_str())
    )
}

/// Share links for every supported platform.
#[must_use]
pub fn share_links(quote: &Quote, base_url: &str) -> Vec<ShareLink> {
    let text = quote.share_text();
    let page_url = quote_page_url(base_url, &quote.id);
    SharePlatform::ALL
        .into_iter()
        .map(|platform| ShareLink {
            platform,
            url: platform.share_url(&text, &page_url),
        })
        .collect()
}

/// `quote-<author>.png`, with whitespace runs turned into `-` and lowercased.
#[must_use]
pub fn download_file_name(author: &str) -> String {
    static WHITESPACE: OnceLock<Option<Regex>> = OnceLock::new();
    let slug = WHITESPACE
        .get_or_init(|| Regex::new(r"\s+").ok())
        .as_ref()
        .map_or_else(
            || author.split_whitespace().collect::<Vec<_>>().join("-"),
            |re| re.replace_all(author.trim(), "-").into_owned(),
        );
    format!("quote-{}.png", slug.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn quote() -> Quote {
        Quote {
            id: QuoteId::from("abc-123".to_string()),
            content: "Be yourself; everyone else is already taken.".to_string(),
            author: "Oscar Wilde".to_string(),
            category: Some("life".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            user_id: None,
        }
    }

    #[test]
    fn file_name_slugs_author() {
        assert_eq!(download_file_name("Oscar  Wilde"), "quote-oscar-wilde.png");
        assert_eq!(
            download_file_name("Martin Luther\tKing Jr."),
            "quote-martin-luther-king-jr..png"
        );
    }

    #[test]
    fn page_url_joins_base() {
        let id = QuoteId::from("abc-123".to_string());
        assert_eq!(
            quote_page_url("https://quotes.example.com/", &id),
            "https://quotes.example.com/quote/abc-123"
        );
    }

    #[test]
    fn links_encode_text_and_url() {
        let links = share_links(&quote(), "https://quotes.example.com");
        assert_eq!(links.len(), 4);

        let twitter = &links[0];
        assert_eq!(twitter.platform, SharePlatform::Twitter);
        assert!(twitter.url.starts_with("https://twitter.com/intent/tweet?text=%22Be%20yourself"));
        assert!(twitter
            .url
            .ends_with("&url=https%3A%2F%2Fquotes.example.com%2Fquote%2Fabc-123"));

        let whatsapp = &links[3];
        assert!(whatsapp.url.contains("Wilde%20https%3A%2F%2F"));
    }
}
