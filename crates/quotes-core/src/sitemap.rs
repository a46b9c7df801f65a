//! `sitemap.xml` generation.

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::Quote;
use crate::share::quote_page_url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFrequency {
    Daily,
    Weekly,
    Monthly,
}

impl ChangeFrequency {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    pub url: String,
    pub last_modified: DateTime<Utc>,
    pub change_frequency: ChangeFrequency,
    pub priority: f32,
}

/// Root page, one page per category, then one per quote.
#[must_use]
pub fn sitemap_entries(
    base_url: &str,
    categories: &[String],
    quotes: &[Quote],
    now: DateTime<Utc>,
) -> Vec<SitemapEntry> {
    let base_url = base_url.trim_end_matches('/');
    let mut entries = Vec::with_capacity(1 + categories.len() + quotes.len());

    entries.push(SitemapEntry {
        url: base_url.to_string(),
        last_modified: now,
        change_frequency: ChangeFrequency::Daily,
        priority: 1.0,
    });

    entries.extend(categories.iter().map(|category| SitemapEntry {
        url: format!("{base_url}/?category={}", urlencoding::encode(category)),
        last_modified: now,
        change_frequency: ChangeFrequency::Weekly,
        priority: 0.8,
    }));

    entries.extend(quotes.iter().map(|quote| SitemapEntry {
        url: quote_page_url(base_url, &quote.id),
        last_modified: quote.updated_at.max(quote.created_at),
        change_frequency: ChangeFrequency::Monthly,
        priority: 0.6,
    }));

    entries
}

/// Serialize entries as a sitemaps.org `urlset`.
#[must_use]
pub fn render_sitemap(entries: &[SitemapEntry]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );
    for entry in entries {
        // Writing to a String cannot fail.
        let _ = write!(
            xml,
            "  <url>\n    <loc>{}</loc>\n    <lastmod>{}</lastmod>\n    \
             <changefreq>{}</changefreq>\n    <priority>{:.1}</priority>\n  </url>\n",
            escape_xml(&entry.url),
            entry
                .last_modified
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            entry.change_frequency.as_str(),
            entry.priority,
        );
    }
    xml.push_str("</urlset>\n");
    xml
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuoteId;
    use chrono::TimeZone;

    fn quote(id: &str) -> Quote {
        let created = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        Quote {
            id: QuoteId::from(id.to_string()),
            content: "Content".to_string(),
            author: "Author".to_string(),
            category: None,
            created_at: created,
            updated_at: created,
            user_id: None,
        }
    }

    #[test]
    fn entries_cover_root_categories_and_quotes() {
        let now = Utc::now();
        let entries = sitemap_entries(
            "https://quotes.example.com/",
            &["self care".to_string(), "wisdom".to_string()],
            &[quote("q1")],
            now,
        );

        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].url, "https://quotes.example.com");
        assert!((entries[0].priority - 1.0).abs() < f32::EPSILON);
        assert_eq!(
            entries[1].url,
            "https://quotes.example.com/?category=self%20care"
        );
        assert_eq!(entries[1].change_frequency, ChangeFrequency::Weekly);
        assert_eq!(entries[3].url, "https://quotes.example.com/quote/q1");
        assert_eq!(entries[3].change_frequency, ChangeFrequency::Monthly);
        assert!((entries[3].priority - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn xml_escapes_and_formats() {
        let now = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let entries = sitemap_entries("https://q.example", &["a&b".to_string()], &[quote("x")], now);
        let xml = render_sitemap(&entries);

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<loc>https://q.example/?category=a%26b</loc>"));
        assert!(xml.contains("<lastmod>2024-01-02T03:04:05Z</lastmod>"));
        assert!(xml.contains("<priority>0.8</priority>"));
        assert!(xml.contains("<changefreq>daily</changefreq>"));
        assert_eq!(xml.matches("<url>").count(), 3);
    }
}
