use clap::Parser;
use seek_page::NavigatorBuilder;
use std::error::Error;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the site to question
    #[arg(short, long)]
    url: String,

    /// Question to answer about the site
    #[arg(short, long)]
    question: String,

    /// JSON configuration string
    #[arg(short, long)]
    config: Option<String>,

    /// Path to JSON configuration file
    #[arg(long)]
    config_file: Option<String>,

    /// Maximum link-follow depth
    #[arg(short, long)]
    max_depth: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize logger
    env_logger::init();

    // Parse command line arguments
    let args = Args::parse();

    println!("Searching {} for: {}", args.url, args.question);

    let mut builder = NavigatorBuilder::new(&args.url);

    // Apply configuration from file if specified
    if let Some(config_file) = args.config_file {
        println!("Loading configuration from file: {}", config_file);
        builder = builder.with_config_file(config_file)?;
    }

    // Apply configuration from string if specified (overrides file config)
    if let Some(config_str) = args.config {
        println!("Applying configuration from string");
        builder = builder.with_config_str(&config_str)?;
    }

    // Apply command-line overrides; the URL argument always wins
    builder = builder.with_base_url(&args.url);
    if let Some(max_depth) = args.max_depth {
        println!("Overriding max depth: {}", max_depth);
        builder = builder.with_max_depth(max_depth);
    }

    // Completion backend comes from OPENAI_API_KEY and friends
    let mut navigator = builder.build()?;

    let start_time = std::time::Instant::now();
    let answers = navigator.find_answers(args.question).await?;

    for answer in &answers {
        match &answer.answer {
            Some(text) => println!("Answer ({}% confidence): {}", answer.confidence, text),
            None => println!("No answer found on the site."),
        }
    }

    println!(
        "Visited {} page(s) in {:.2} seconds.",
        navigator.page_cache().len(),
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}
