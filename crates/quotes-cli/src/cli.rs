use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "quotes")]
#[command(about = "Browse, search and share quotes from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// CLI profile name
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List quotes, newest first
    #[command(alias = "ls")]
    List {
        /// Match content, author or category
        #[arg(short, long)]
        search: Option<String>,
        /// Only quotes in this category
        #[arg(short, long)]
        category: Option<String>,
        /// Only quotes you added
        #[arg(long)]
        mine: bool,
        /// Page number (4 quotes per page)
        #[arg(short, long, default_value = "1", allow_hyphen_values = true)]
        page: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search interactively; each line typed replaces the search term
    Search {
        /// Only quotes in this category
        #[arg(short, long)]
        category: Option<String>,
        /// Only quotes you added
        #[arg(long)]
        mine: bool,
        /// Quiet time before a term is searched, in milliseconds
        #[arg(long, value_name = "MS", default_value_t = 500)]
        debounce_ms: u64,
    },
    /// Show one quote
    Show {
        /// Quote ID
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a quote
    #[command(alias = "new")]
    Add {
        /// Quote text
        content: Vec<String>,
        /// Who said it
        #[arg(short, long)]
        author: String,
        /// Optional category, e.g. wisdom
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Edit one of your quotes
    Edit {
        /// Quote ID
        id: String,
        /// New quote text
        #[arg(long)]
        content: Option<String>,
        /// New author
        #[arg(short, long)]
        author: Option<String>,
        /// New category (empty to clear)
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Delete one of your quotes
    Delete {
        /// Quote ID
        id: String,
    },
    /// List categories in use
    Categories {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print share text and social links for a quote
    Share {
        /// Quote ID
        id: String,
    },
    /// Render a quote's share card to a PNG file
    Image {
        /// Quote ID
        id: String,
        /// Output path (defaults to quote-<author>.png)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Render a 1200x630 social preview image
    Og {
        /// Quote text
        #[arg(short, long)]
        quote: Option<String>,
        /// Author line
        #[arg(short, long)]
        author: Option<String>,
        /// Output path
        #[arg(short, long, value_name = "PATH", default_value = "og.png")]
        output: PathBuf,
    },
    /// Show or update your profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Sign in, sign up or out
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Show your profile
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update display name and avatar URL
    Set {
        /// Display name (empty to clear)
        #[arg(long)]
        name: Option<String>,
        /// Avatar image URL (empty to clear)
        #[arg(long, value_name = "URL")]
        avatar_url: Option<String>,
    },
    /// Upload an avatar image and use it
    Avatar {
        /// Image file (max 5 MB)
        path: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in with email/password and store the session in the keychain
    Login {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Create an account
    Signup {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show auth status for the profile
    Status,
    /// Sign out and clear the stored session
    Logout,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update a profile
    Init {
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Public site URL used in share links
        #[arg(long, value_name = "URL")]
        site_url: Option<String>,
        /// Keep the current active profile
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the resolved profile
    Show,
}
