use clap::{Parser, ValueEnum};
use seek_page::FetcherKind;

#[derive(Parser, Debug)]
#[command(name = "seek-page")]
#[command(about = "LLM-guided crawler that answers questions about a website")]
#[command(version)]
pub struct Args {
    /// Base URL the search starts from
    pub url: String,

    /// A single free-text question about the site
    #[arg(short, long, conflicts_with = "questions_file")]
    pub question: Option<String>,

    /// Path to a JSON file with an {"id": "question"} object
    #[arg(long)]
    pub questions_file: Option<String>,

    /// JSON configuration string
    #[arg(short, long)]
    pub config: Option<String>,

    /// Path to a JSON configuration file
    #[arg(long, conflicts_with = "config")]
    pub config_file: Option<String>,

    /// Fetch strategy (http, webdriver)
    #[arg(short, long, value_enum)]
    pub fetcher: Option<FetcherArg>,

    /// Completion model to use (overrides SEEK_PAGE_MODEL)
    #[arg(short, long)]
    pub model: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FetcherArg {
    Http,
    Webdriver,
}

/// Convert from CLI argument fetcher type to internal fetcher kind
pub fn convert_fetcher_kind(arg: FetcherArg) -> FetcherKind {
    match arg {
        FetcherArg::Http => FetcherKind::Http,
        FetcherArg::Webdriver => FetcherKind::Webdriver,
    }
}
