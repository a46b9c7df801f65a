use std::path::{Path, PathBuf};

use quotes_core::render::{
    join_share_card, render_social_card_png, spawn_share_card, ShareCard, SocialCard,
    DEFAULT_PIXEL_BUDGET,
};
use quotes_core::share::{quote_page_url, share_links};
use quotes_core::Quote;

use crate::commands::common::Backend;
use crate::commands::quotes::find_quote;
use crate::error::CliError;

/// Share text, page URL and one intent link per platform.
pub fn share_lines(quote: &Quote, site_url: &str) -> Vec<String> {
    let mut lines = vec![
        quote.share_text(),
        String::new(),
        format!("Page:     {}", quote_page_url(site_url, &quote.id)),
    ];
    lines.extend(
        share_links(quote, site_url)
            .into_iter()
            .map(|link| format!("{:<9} {}", format!("{}:", link.platform.label()), link.url)),
    );
    lines
}

/// Render the share card off the async runtime and write it to disk.
pub async fn write_share_image(
    quote: &Quote,
    output: Option<&Path>,
    pixel_budget: u64,
) -> Result<PathBuf, CliError> {
    let handle = spawn_share_card(ShareCard::from(quote), pixel_budget);
    let image = join_share_card(handle).await?;
    let path = output.map_or_else(|| PathBuf::from(&image.file_name), Path::to_path_buf);
    tokio::fs::write(&path, &image.png).await?;
    tracing::debug!(width = image.width, height = image.height, "Wrote share card");
    Ok(path)
}

pub async fn write_og_image(
    quote: Option<&str>,
    author: Option<&str>,
    output: &Path,
) -> Result<PathBuf, CliError> {
    let png = render_social_card_png(SocialCard::from_params(quote, author)).await?;
    tokio::fs::write(output, png).await?;
    Ok(output.to_path_buf())
}

pub async fn run_share(backend: &Backend, raw_id: &str) -> Result<(), CliError> {
    let quote = find_quote(&backend.store, raw_id).await?;
    for line in share_lines(&quote, &backend.site_url) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_image(
    backend: &Backend,
    raw_id: &str,
    output: Option<&Path>,
) -> Result<(), CliError> {
    let quote = find_quote(&backend.store, raw_id).await?;
    let path = write_share_image(&quote, output, DEFAULT_PIXEL_BUDGET).await?;
    println!("{}", path.display());
    Ok(())
}

pub async fn run_og(
    quote: Option<&str>,
    author: Option<&str>,
    output: &Path,
) -> Result<(), CliError> {
    let path = write_og_image(quote, author, output).await?;
    println!("{}", path.display());
    Ok(())
}
