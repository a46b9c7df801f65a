//! Server-rendered HTML views.

use std::fmt::Write as _;

use quotes_core::controller::{can_edit, QuoteForm, LOGIN_TO_ADD_MESSAGE};
use quotes_core::models::CategoryStyle;
use quotes_core::query::{page_numbers, FilterMode};
use quotes_core::share::{quote_page_url, share_links};
use quotes_core::{ListParams, Quote, QuotePage};
use serde_json::json;

const SITE_NAME: &str = "Quote Explorer";

const STYLES: &str = "body{font-family:system-ui,sans-serif;margin:0;background:#f9fafb;color:#111827}\
main{max-width:960px;margin:0 auto;padding:2rem 1rem}\
.grid{display:grid;grid-template-columns:repeat(auto-fill,minmax(280px,1fr));gap:1.5rem}\
.card{background:#fff;border-radius:.75rem;padding:1.5rem;box-shadow:0 4px 12px rgba(0,0,0,.08)}\
.badge{display:inline-block;padding:.2rem .6rem;border-radius:999px;font-size:.75rem;font-weight:600}\
.cat-motivation{background:#fff7ed;color:#ea580c}.cat-wisdom{background:#f3e8ff;color:#7c3aed}\
.cat-life{background:#ecfdf5;color:#059669}.cat-inspiration{background:#eff6ff;color:#2563eb}\
.cat-leadership{background:#fffbeb;color:#d97706}.cat-perseverance{background:#fdf2f8;color:#e11d48}\
.cat-default{background:#f3f4f6;color:#6b7280}\
.active{font-weight:700;text-decoration:underline}\
.error{background:#fef2f2;color:#b91c1c;padding:.75rem 1rem;border-radius:.5rem}\
.pagination{display:flex;justify-content:space-between;align-items:center;margin:2rem 0}";

/// Whether the list query succeeded.
#[derive(Debug)]
pub enum ListOutcome {
    Page(QuotePage),
    /// Store failure, shown inline instead of the list.
    Failed(String),
}

/// Everything the list page needs.
#[derive(Debug)]
pub struct ListView<'a> {
    pub params: &'a ListParams,
    pub outcome: ListOutcome,
    pub categories: &'a [String],
    pub user_id: Option<&'a str>,
    /// Prefilled add-quote form, kept after a failed submit.
    pub form: Option<&'a QuoteForm>,
    /// Outcome of the last form action, shown above the list.
    pub message: Option<&'a str>,
}

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn layout(title: &str, head: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n{head}<style>{STYLES}</style>\n</head>\n<body>\n\
         <header><nav><a href=\"/\"><strong>{SITE_NAME}</strong></a></nav></header>\n\
         <main>\n{body}</main>\n</body>\n</html>\n",
        escape_html(title)
    )
}

pub fn render_list_page(view: &ListView<'_>) -> String {
    let params = view.params;
    let mut body = String::new();

    render_account_bar(&mut body, view.user_id.is_some());
    body.push_str("<h1>Discover Inspiring Quotes</h1>\n");
    let _ = write!(
        body,
        "<form method=\"get\" action=\"/\" class=\"search\">\
         <input type=\"search\" name=\"search\" value=\"{}\" placeholder=\"Search quotes, authors or categories...\">",
        escape_html(&params.search)
    );
    if !params.category.is_empty() {
        let _ = write!(
            body,
            "<input type=\"hidden\" name=\"category\" value=\"{}\">",
            escape_html(&params.category)
        );
    }
    if let Some(filter) = params.filter.query_value() {
        let _ = write!(
            body,
            "<input type=\"hidden\" name=\"filter\" value=\"{filter}\">"
        );
    }
    body.push_str("<button type=\"submit\">Search</button></form>\n");

    render_filters(&mut body, view);
    if let Some(message) = view.message {
        let _ = writeln!(body, "<p class=\"error\">{}</p>", escape_html(message));
    }
    render_add_form(&mut body, view);

    match &view.outcome {
        ListOutcome::Failed(message) => {
            let _ = writeln!(body, "<p class=\"error\">{}</p>", escape_html(message));
        }
        ListOutcome::Page(page) if page.is_empty() => {
            body.push_str("<p class=\"empty\">No quotes found.</p>\n");
        }
        ListOutcome::Page(page) => {
            render_pagination(&mut body, params, page);
            body.push_str("<section class=\"grid\">\n");
            for quote in &page.quotes {
                render_quote_card(&mut body, quote, view.user_id);
            }
            body.push_str("</section>\n");
            render_pagination(&mut body, params, page);
        }
    }

    let title = if params.category.is_empty() {
        SITE_NAME.to_string()
    } else {
        format!("{} Quotes | {SITE_NAME}", params.category)
    };
    layout(&title, "", &body)
}

fn render_account_bar(body: &mut String, signed_in: bool) {
    if signed_in {
        body.push_str(
            "<form method=\"post\" action=\"/logout\" class=\"account\">\
             <button type=\"submit\">Sign Out</button></form>\n",
        );
    } else {
        body.push_str(
            "<nav class=\"account\"><a href=\"/login\">Login</a> \
             <a href=\"/signup\">Sign Up</a></nav>\n",
        );
    }
}

fn render_filters(body: &mut String, view: &ListView<'_>) {
    let params = view.params;
    body.push_str("<nav class=\"filters\">");
    let _ = write!(
        body,
        "<a href=\"{}\"{}>All Quotes</a> ",
        escape_html(&params.toggle_filter(FilterMode::All).href()),
        active_class(params.filter == FilterMode::All)
    );
    if view.user_id.is_some() {
        let _ = write!(
            body,
            "<a href=\"{}\"{}>My Quotes</a>",
            escape_html(&params.toggle_filter(FilterMode::Mine).href()),
            active_class(params.filter == FilterMode::Mine)
        );
    }
    body.push_str("</nav>\n");

    if view.categories.is_empty() {
        return;
    }
    body.push_str("<nav class=\"categories\">");
    for category in view.categories {
        let style = CategoryStyle::for_category(Some(category));
        let selected = *category == params.category;
        let _ = write!(
            body,
            "<a class=\"badge {}{}\" href=\"{}\">{}</a> ",
            style.css_class(),
            if selected { " active" } else { "" },
            escape_html(&params.toggle_category(category).href()),
            escape_html(category)
        );
    }
    body.push_str("</nav>\n");
}

fn render_add_form(body: &mut String, view: &ListView<'_>) {
    if view.user_id.is_none() {
        let _ = writeln!(body, "<p class=\"notice\">{LOGIN_TO_ADD_MESSAGE}</p>");
        return;
    }
    let empty = QuoteForm::default();
    let form = view.form.unwrap_or(&empty);

    body.push_str("<form method=\"post\" action=\"/quotes\" class=\"card add-quote\">\n<h2>Add a Quote</h2>\n");
    render_quote_fields(body, form);
    body.push_str("<button type=\"submit\">Add Quote</button>\n</form>\n");
}

fn render_quote_fields(body: &mut String, form: &QuoteForm) {
    let _ = write!(
        body,
        "<textarea name=\"content\" rows=\"3\" placeholder=\"Enter the quote...\" required>{}</textarea>\n\
         <input name=\"author\" placeholder=\"Quote author...\" value=\"{}\" required>\n\
         <input name=\"category\" placeholder=\"e.g., motivation, wisdom, life...\" value=\"{}\">\n",
        escape_html(&form.content),
        escape_html(&form.author),
        escape_html(form.category.as_deref().unwrap_or_default())
    );
}

fn render_quote_card(body: &mut String, quote: &Quote, user_id: Option<&str>) {
    let id = urlencoding::encode(quote.id.as_str());
    let style = CategoryStyle::for_category(quote.category.as_deref());
    let _ = write!(
        body,
        "<article class=\"card\">\n<blockquote><a href=\"/quote/{id}\">{}</a></blockquote>\n<cite>{}</cite>\n",
        escape_html(&quote.content),
        escape_html(&quote.author)
    );
    if let Some(category) = &quote.category {
        let _ = writeln!(
            body,
            "<span class=\"badge {}\">{}</span>",
            style.css_class(),
            escape_html(category)
        );
    }
    if can_edit(quote, user_id) {
        let _ = writeln!(
            body,
            "<div class=\"controls\"><a href=\"/quote/{id}/edit\">Edit</a>\
             <form method=\"post\" action=\"/quote/{id}/delete\"><button type=\"submit\">Delete</button></form></div>"
        );
    }
    body.push_str("</article>\n");
}

fn render_pagination(body: &mut String, params: &ListParams, page: &QuotePage) {
    if page.total_pages <= 1 {
        return;
    }
    let range = page.range();
    let _ = write!(
        body,
        "<nav class=\"pagination\"><div>Showing {} to {} of {} quotes</div><div>",
        range.start, range.end, range.total
    );

    if page.page <= 1 {
        body.push_str("<span class=\"disabled\">Previous</span> ");
    } else {
        let _ = write!(
            body,
            "<a href=\"{}\">Previous</a> ",
            escape_html(&params.with_page(page.page - 1).href())
        );
    }
    for number in page_numbers(page.page, page.total_pages) {
        if number == page.page {
            let _ = write!(body, "<span class=\"active\">{number}</span> ");
        } else {
            let _ = write!(
                body,
                "<a href=\"{}\">{number}</a> ",
                escape_html(&params.with_page(number).href())
            );
        }
    }
    if page.page >= page.total_pages {
        body.push_str("<span class=\"disabled\">Next</span>");
    } else {
        let _ = write!(
            body,
            "<a href=\"{}\">Next</a>",
            escape_html(&params.with_page(page.page + 1).href())
        );
    }
    body.push_str("</div></nav>\n");
}

fn active_class(active: bool) -> &'static str {
    if active {
        " class=\"active\""
    } else {
        ""
    }
}

/// Meta description for a quote page.
pub fn quote_description(quote: &Quote) -> String {
    match &quote.category {
        Some(category) => format!("{} - {} | {category} quotes", quote.content, quote.author),
        None => format!("{} - {}", quote.content, quote.author),
    }
}

pub fn og_image_path(quote: &Quote) -> String {
    format!(
        "/api/og?quote={}&author={}",
        urlencoding::encode(&quote.content),
        urlencoding::encode(&quote.author)
    )
}

/// schema.org `Quotation` document for a quote page.
pub fn quotation_json_ld(quote: &Quote, base_url: &str) -> serde_json::Value {
    let page_url = quote_page_url(base_url, &quote.id);
    json!({
        "@context": "https://schema.org",
        "@type": "Quotation",
        "text": quote.content,
        "author": {
            "@type": "Person",
            "name": quote.author,
        },
        "dateCreated": quote.created_at.to_rfc3339(),
        "url": page_url,
        "mainEntityOfPage": {
            "@type": "WebPage",
            "@id": page_url,
        },
    })
}

pub fn render_quote_page(quote: &Quote, base_url: &str, user_id: Option<&str>) -> String {
    let base_url = base_url.trim_end_matches('/');
    let headline = quote.headline();
    let description = quote_description(quote);
    let canonical = quote_page_url(base_url, &quote.id);
    let image = format!("{base_url}{}", og_image_path(quote));
    // `</script>` inside quote text must not end the JSON-LD block.
    let json_ld = quotation_json_ld(quote, base_url)
        .to_string()
        .replace("</", "<\\/");

    let mut head = String::new();
    let _ = write!(
        head,
        "<meta name=\"description\" content=\"{description}\">\n\
         <link rel=\"canonical\" href=\"{canonical}\">\n\
         <meta property=\"og:type\" content=\"article\">\n\
         <meta property=\"og:title\" content=\"{headline}\">\n\
         <meta property=\"og:description\" content=\"{description}\">\n\
         <meta property=\"og:url\" content=\"{canonical}\">\n\
         <meta property=\"og:image\" content=\"{image}\">\n\
         <meta property=\"og:image:width\" content=\"1200\">\n\
         <meta property=\"og:image:height\" content=\"630\">\n\
         <meta property=\"og:image:alt\" content=\"Quote by {author}\">\n\
         <meta name=\"twitter:card\" content=\"summary_large_image\">\n\
         <meta name=\"twitter:title\" content=\"{headline}\">\n\
         <meta name=\"twitter:description\" content=\"{description}\">\n\
         <meta name=\"twitter:image\" content=\"{image}\">\n\
         <script type=\"application/ld+json\">{json_ld}</script>\n",
        description = escape_html(&description),
        canonical = escape_html(&canonical),
        headline = escape_html(&headline),
        image = escape_html(&image),
        author = escape_html(&quote.author),
    );

    let id = urlencoding::encode(quote.id.as_str());
    let style = CategoryStyle::for_category(quote.category.as_deref());
    let mut body = String::new();
    let _ = write!(
        body,
        "<article class=\"card\">\n<blockquote><p>{}</p></blockquote>\n<cite>{}</cite>\n",
        escape_html(&quote.content),
        escape_html(&quote.author)
    );
    if let Some(category) = &quote.category {
        let _ = writeln!(
            body,
            "<span class=\"badge {}\">{}</span>",
            style.css_class(),
            escape_html(category)
        );
    }
    let _ = writeln!(
        body,
        "<p class=\"date\">Shared on {}</p>",
        quote.created_at.format("%B %-d, %Y")
    );
    if can_edit(quote, user_id) {
        let _ = writeln!(body, "<p><a href=\"/quote/{id}/edit\">Edit</a></p>");
    }
    body.push_str("</article>\n<section class=\"share\">\n<h2>Share this quote</h2>\n");
    for link in share_links(quote, base_url) {
        let _ = write!(
            body,
            "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a> ",
            escape_html(&link.url),
            link.platform.label()
        );
    }
    let _ = writeln!(
        body,
        "<a href=\"/quote/{id}/image.png\" download>Download Image</a>\n</section>"
    );

    match &quote.category {
        Some(category) => {
            let href = ListParams::default().toggle_category(category).href();
            let _ = writeln!(
                body,
                "<p><a href=\"{}\">Explore {} Quotes</a></p>",
                escape_html(&href),
                escape_html(category)
            );
        }
        None => body.push_str("<p><a href=\"/\">Explore All Quotes</a></p>\n"),
    }

    layout(&format!("{headline} | {SITE_NAME}"), &head, &body)
}

/// Edit form for an owned quote, with an optional inline error.
pub fn render_edit_page(quote: &Quote, form: &QuoteForm, error: Option<&str>) -> String {
    let id = urlencoding::encode(quote.id.as_str());
    let mut body = String::new();
    let _ = writeln!(
        body,
        "<form method=\"post\" action=\"/quote/{id}/edit\" class=\"card\">\n<h1>Edit Quote</h1>"
    );
    if let Some(message) = error {
        let _ = writeln!(body, "<p class=\"error\">{}</p>", escape_html(message));
    }
    render_quote_fields(&mut body, form);
    let _ = writeln!(
        body,
        "<button type=\"submit\">Save Changes</button> <a href=\"/quote/{id}\">Cancel</a>\n</form>"
    );
    layout(&format!("Edit Quote | {SITE_NAME}"), "", &body)
}

/// Which account form to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountForm {
    Login,
    SignUp,
}

impl AccountForm {
    pub const fn action(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::SignUp => "/signup",
        }
    }

    const fn heading(self) -> &'static str {
        match self {
            Self::Login => "Login to Continue",
            Self::SignUp => "Create Your Account",
        }
    }

    const fn submit_label(self) -> &'static str {
        match self {
            Self::Login => "Login",
            Self::SignUp => "Sign Up",
        }
    }

    const fn alternate(self) -> (&'static str, &'static str) {
        match self {
            Self::Login => ("/signup", "Don't have an account? Sign up"),
            Self::SignUp => ("/login", "Already have an account? Login"),
        }
    }
}

/// Email/password form; the password is never echoed back.
pub fn render_account_page(
    form: AccountForm,
    email: &str,
    error: Option<&str>,
    notice: Option<&str>,
) -> String {
    let mut body = String::new();
    let _ = writeln!(
        body,
        "<form method=\"post\" action=\"{}\" class=\"card account-form\">\n<h1>{}</h1>",
        form.action(),
        form.heading()
    );
    if let Some(message) = error {
        let _ = writeln!(body, "<p class=\"error\">{}</p>", escape_html(message));
    }
    if let Some(message) = notice {
        let _ = writeln!(body, "<p class=\"notice\">{}</p>", escape_html(message));
    }
    let (alternate_href, alternate_label) = form.alternate();
    let _ = write!(
        body,
        "<label for=\"email\">Email</label>\n\
         <input type=\"email\" id=\"email\" name=\"email\" value=\"{}\" placeholder=\"Enter your email...\" required>\n\
         <label for=\"password\">Password</label>\n\
         <input type=\"password\" id=\"password\" name=\"password\" placeholder=\"Enter your password...\" required>\n\
         <button type=\"submit\">{}</button>\n</form>\n\
         <p><a href=\"{alternate_href}\">{alternate_label}</a></p>\n",
        escape_html(email),
        form.submit_label()
    );
    layout(&format!("{} | {SITE_NAME}", form.submit_label()), "", &body)
}

pub fn render_not_found_page() -> String {
    let head = "<meta name=\"description\" content=\"The requested quote could not be found.\">\n";
    let body = "<h1>Quote Not Found</h1>\n\
                <p>The quote you are looking for does not exist or has been removed.</p>\n\
                <p><a href=\"/\">Explore All Quotes</a></p>\n";
    layout(&format!("Quote Not Found | {SITE_NAME}"), head, body)
}
