//! Category palette

/// Styling bucket for a category label.
///
/// Categories are free text; six well-known names get their own colours and
/// everything else falls back to [`CategoryStyle::Default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryStyle {
    Motivation,
    Wisdom,
    Life,
    Inspiration,
    Leadership,
    Perseverance,
    Default,
}

impl CategoryStyle {
    /// Resolve the style for an optional category label (case-insensitive).
    #[must_use]
    pub fn for_category(category: Option<&str>) -> Self {
        let Some(category) = category else {
            return Self::Default;
        };
        match category.trim().to_lowercase().as_str() {
            "motivation" => Self::Motivation,
            "wisdom" => Self::Wisdom,
            "life" => Self::Life,
            "inspiration" => Self::Inspiration,
            "leadership" => Self::Leadership,
            "perseverance" => Self::Perseverance,
            _ => Self::Default,
        }
    }

    /// CSS class suffix used by the HTML renderer.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Motivation => "cat-motivation",
            Self::Wisdom => "cat-wisdom",
            Self::Life => "cat-life",
            Self::Inspiration => "cat-inspiration",
            Self::Leadership => "cat-leadership",
            Self::Perseverance => "cat-perseverance",
            Self::Default => "cat-default",
        }
    }

    /// Badge `(background, text)` colours as RGB for rendered images.
    #[must_use]
    pub const fn badge_colors(self) -> ([u8; 3], [u8; 3]) {
        match self {
            Self::Motivation => ([0xFF, 0xF7, 0xED], [0xEA, 0x58, 0x0C]),
            Self::Wisdom => ([0xF3, 0xE8, 0xFF], [0x7C, 0x3A, 0xED]),
            Self::Life => ([0xEC, 0xFD, 0xF5], [0x05, 0x96, 0x69]),
            Self::Inspiration => ([0xEF, 0xF6, 0xFF], [0x25, 0x63, 0xEB]),
            Self::Leadership => ([0xFF, 0xFB, 0xEB], [0xD9, 0x77, 0x06]),
            Self::Perseverance => ([0xFD, 0xF2, 0xF8], [0xE1, 0x1D, 0x48]),
            Self::Default => ([0xF3, 0xF4, 0xF6], [0x6B, 0x72, 0x80]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_names_match_case_insensitively() {
        assert_eq!(
            CategoryStyle::for_category(Some("Wisdom")),
            CategoryStyle::Wisdom
        );
        assert_eq!(
            CategoryStyle::for_category(Some("PERSEVERANCE")),
            CategoryStyle::Perseverance
        );
    }

    #[test]
    fn unknown_and_missing_categories_use_default() {
        assert_eq!(
            CategoryStyle::for_category(Some("humor")),
            CategoryStyle::Default
        );
        assert_eq!(CategoryStyle::for_category(None), CategoryStyle::Default);
        assert_eq!(CategoryStyle::Default.css_class(), "cat-default");
    }
}
