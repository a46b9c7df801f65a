//! 1200×630 social preview card.

use image::RgbaImage;

use super::{encode_png, normalize_for_glyphs, rgb, with_alpha, Canvas, TextBlock};
use crate::util::{normalize_text_option, truncate_with_ellipsis};
use crate::{Error, Result};

pub const SOCIAL_WIDTH: u32 = 1200;
pub const SOCIAL_HEIGHT: u32 = 630;
pub const DEFAULT_SOCIAL_QUOTE: &str = "Discover and share inspiring quotes";
pub const DEFAULT_SOCIAL_AUTHOR: &str = "Quote Explorer";
pub const MAX_SOCIAL_QUOTE_CHARS: usize = 200;

const PADDING: u32 = 80;
const TEXT_MAX_WIDTH: u32 = 900;
const QUOTE_SCALES: [u32; 3] = [5, 4, 3];
const AUTHOR_SCALE: u32 = 4;
const BRAND_SCALE: u32 = 3;

/// Text shown on a social card, after defaults and truncation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialCard {
    pub quote: String,
    pub author: String,
}

impl SocialCard {
    /// Build from the `quote` and `author` query parameters.
    ///
    /// Missing or blank values fall back to the site defaults. Quotes longer
    /// than [`MAX_SOCIAL_QUOTE_CHARS`] are cut and end in `...`.
    #[must_use]
    pub fn from_params(quote: Option<&str>, author: Option<&str>) -> Self {
        let quote = normalize_text_option(quote.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_SOCIAL_QUOTE.to_string());
        let author = normalize_text_option(author.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_SOCIAL_AUTHOR.to_string());

        Self {
            quote: truncate_with_ellipsis(&quote, MAX_SOCIAL_QUOTE_CHARS),
            author,
        }
    }
}

impl Default for SocialCard {
    fn default() -> Self {
        Self::from_params(None, None)
    }
}

/// Rasterize the card.
pub fn render_social_card(card: &SocialCard) -> Result<RgbaImage> {
    let mut canvas = Canvas::new(SOCIAL_WIDTH, SOCIAL_HEIGHT, 1, u64::MAX)?;
    canvas.fill_diagonal_gradient(rgb(0x66_7E_EA), rgb(0x76_4B_A2));

    // Highlights at 25%/25% and 75%/75%, fading out halfway to the far corner.
    let width = f64::from(SOCIAL_WIDTH);
    let height = f64::from(SOCIAL_HEIGHT);
    let glow_radius = (width * 0.75).hypot(height * 0.75) * 0.5;
    canvas.radial_glow(width * 0.25, height * 0.25, glow_radius, 0.1);
    canvas.radial_glow(width * 0.75, height * 0.75, glow_radius, 0.1);

    let quoted = format!("\"{}\"", normalize_for_glyphs(&card.quote));
    let author = format!("- {}", normalize_for_glyphs(&card.author));
    let author_gap = 40;
    let author_height = super::GLYPH_SIZE * AUTHOR_SCALE;
    let max_quote_height = SOCIAL_HEIGHT - 2 * PADDING - author_gap - author_height;
    let block = TextBlock::fit(&quoted, TEXT_MAX_WIDTH, max_quote_height, &QUOTE_SCALES);
    if block.lines.is_empty() {
        return Err(Error::Render("Nothing to draw on the social card".to_string()));
    }

    let content_height = block.height() + author_gap + author_height;
    let top = (SOCIAL_HEIGHT.saturating_sub(content_height)) / 2;
    let center_x = SOCIAL_WIDTH / 2;

    let shadow = with_alpha(rgb(0x00_00_00), 0.3);
    block.draw_centered(&mut canvas, center_x + 2, top + 4, shadow);
    block.draw_centered(&mut canvas, center_x, top, rgb(0xFF_FF_FF));

    let author_y = top + block.height() + author_gap;
    canvas.draw_text_centered(center_x + 1, author_y + 2, &author, AUTHOR_SCALE, shadow);
    canvas.draw_text_centered(center_x, author_y, &author, AUTHOR_SCALE, rgb(0xE5_E7_EB));

    draw_brand(&mut canvas);
    Ok(canvas.into_image())
}

/// Gradient "Q" badge and the site name in the bottom-right corner.
fn draw_brand(canvas: &mut Canvas) {
    let label = DEFAULT_SOCIAL_AUTHOR;
    let label_width = super::text_width(label, BRAND_SCALE);
    let label_height = super::GLYPH_SIZE * BRAND_SCALE;
    let right = SOCIAL_WIDTH - 60;
    let bottom = SOCIAL_HEIGHT - 40;
    let label_x = right - label_width;
    let label_y = bottom - 20 - label_height / 2;

    let badge_radius = 20;
    let badge_center_x = label_x - 12 - badge_radius;
    let badge_center_y = bottom - badge_radius;
    canvas.fill_gradient_circle(
        badge_center_x,
        badge_center_y,
        badge_radius,
        rgb(0x8B_5C_F6),
        rgb(0xEC_48_99),
    );
    canvas.draw_text_centered(
        badge_center_x,
        badge_center_y - 8,
        "Q",
        2,
        rgb(0xFF_FF_FF),
    );
    canvas.draw_text(
        label_x,
        label_y,
        label,
        BRAND_SCALE,
        with_alpha(rgb(0xFF_FF_FF), 0.8),
    );
}

/// Render and PNG-encode the card.
pub fn social_card_png(card: &SocialCard) -> Result<Vec<u8>> {
    let image = render_social_card(card)?;
    encode_png(&image)
}

/// Render on the blocking pool so request handlers stay responsive.
///
/// A panicking render is reported as [`Error::Render`].
pub async fn render_social_card_png(card: SocialCard) -> Result<Vec<u8>> {
    tokio::task::spawn_blocking(move || social_card_png(&card))
        .await
        .map_err(|error| Error::Render(format!("Social card worker failed: {error}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_params_use_defaults() {
        let card = SocialCard::from_params(None, Some("   "));
        assert_eq!(card.quote, "Discover and share inspiring quotes");
        assert_eq!(card.author, "Quote Explorer");
    }

    #[test]
    fn long_quote_is_truncated_to_200_chars() {
        let long = "x".repeat(250);
        let card = SocialCard::from_params(Some(&long), Some("Someone"));
        assert_eq!(card.quote.chars().count(), 203);
        assert!(card.quote.ends_with("..."));

        let exact = "y".repeat(200);
        let card = SocialCard::from_params(Some(&exact), None);
        assert_eq!(card.quote, exact);
    }

    #[test]
    fn renders_fixed_dimensions() {
        let card = SocialCard::from_params(Some(&"hope ".repeat(60)), Some("Anon"));
        let image = render_social_card(&card).unwrap();
        assert_eq!((image.width(), image.height()), (1200, 630));
        // Top-left corner carries the gradient start colour.
        let corner = image.get_pixel(0, 0);
        assert!(corner[2] > corner[1]);
    }

    #[tokio::test]
    async fn blocking_render_returns_png() {
        let bytes = render_social_card_png(SocialCard::default()).await.unwrap();
        assert_eq!(&bytes[..4], b"\x89PNG");
    }
}
