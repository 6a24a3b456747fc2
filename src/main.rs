use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use indexmap::IndexMap;
use seek_page::completion::{OpenAiCompletion, OpenAiConfig};
use seek_page::{FetcherKind, NavigatorBuilder, NavigatorConfig, QuestionInput, answer_map};

mod args;
use args::{Args, convert_fetcher_kind};

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    if let Err(e) = run(args).await {
        ::log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    // Base configuration from file or inline JSON, then CLI overrides on top
    let mut config = if let Some(config_str) = &args.config {
        NavigatorConfig::from_json(config_str)?
    } else if let Some(config_file) = &args.config_file {
        NavigatorConfig::from_file(config_file)?
    } else {
        NavigatorConfig::new(&args.url)
    };
    config.base_url = args.url.clone();
    if let Some(fetcher) = args.fetcher {
        config.fetcher = convert_fetcher_kind(fetcher);
    }

    if config.fetcher == FetcherKind::Webdriver {
        println!("Note: the webdriver fetcher requires a WebDriver server (e.g. ChromeDriver).");
        println!(
            "Set WEBDRIVER_URL environment variable if not using the default {}",
            config.webdriver_url
        );
    }

    let input: QuestionInput = if let Some(question) = args.question {
        QuestionInput::Single(question)
    } else if let Some(path) = &args.questions_file {
        let contents = std::fs::read_to_string(path)?;
        let questions: IndexMap<String, String> = serde_json::from_str(&contents)?;
        QuestionInput::Keyed(questions)
    } else {
        return Err("Provide a question (--question) or a questions file (--questions-file)".into());
    };

    let mut builder = NavigatorBuilder::new(&args.url).with_config(config);
    if let Some(model) = args.model {
        let mut openai = OpenAiConfig::from_env();
        openai.model = model;
        builder = builder.with_completion(Arc::new(OpenAiCompletion::new(openai)?));
    }
    let mut navigator = builder.build()?;

    ::log::info!("Starting search against {}", navigator.config().base_url);
    let start_time = std::time::Instant::now();

    let answers = navigator.find_answers(input).await?;

    for answer in &answers {
        match &answer.answer {
            Some(text) => ::log::info!(
                "{}: {} ({}% confidence)",
                answer.question_id,
                text,
                answer.confidence
            ),
            None => ::log::info!("{}: no answer found", answer.question_id),
        }
    }
    ::log::info!(
        "Search complete - visited {} page(s) in {:.2} seconds",
        navigator.page_cache().len(),
        start_time.elapsed().as_secs_f64()
    );

    let output = serde_json::json!({
        "answers": answers,
        "results": answer_map(&answers),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
