use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use anthology_core::{db, PoetryAgent, RecommendationRequest, RunReport, Settings};

#[derive(Parser)]
#[command(name = "anthology")]
#[command(about = "Recommend classical poems from a prompt or an image", long_about = None)]
#[command(after_help = "\
Examples:
  # Prompt only
  anthology --prompt \"推荐一首关于春天的诗\"

  # Prompt with an exclusion
  anthology --prompt \"推荐一首关于春天的诗\" --negative-prompt \"不要包含悲伤情绪\"

  # Image only
  anthology --image photo.jpg

  # Everything
  anthology -u 1001 -p \"推荐一首关于春天的诗\" --negative-prompt \"不要包含悲伤情绪\" \\
      -i photo.jpg -c \"用户喜欢唐诗\" -m gpt-4 -n 1 --verbose
")]
struct Cli {
    /// Positive prompt (at least one of prompt or image is required)
    #[arg(short = 'p', long)]
    prompt: Option<String>,

    /// Negative prompt: characteristics to exclude
    #[arg(long)]
    negative_prompt: Option<String>,

    /// Image file path (at least one of prompt or image is required)
    #[arg(short = 'i', long)]
    image: Option<PathBuf>,

    /// User id, used to namespace stored images and records
    #[arg(short = 'u', long)]
    user_id: Option<i64>,

    /// Extra context for the recommendation
    #[arg(short = 'c', long)]
    context: Option<String>,

    /// Model override (defaults to the configured model)
    #[arg(short = 'm', long)]
    model: Option<String>,

    /// Number of poems to recommend
    #[arg(short = 'n', long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    count: u32,

    /// Recommendation type
    #[arg(short = 't', long, default_value = "推荐", value_parser = ["推荐", "赏析", "创作"])]
    rec_type: String,

    /// Path to a JSON config file layered over the environment
    #[arg(short = 'f', long)]
    config: Option<PathBuf>,

    /// Verbose output: full poem text and debug logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn init_logging(verbose: bool, log_level: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    let settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::from(4);
        }
    };

    init_logging(cli.verbose, &settings.log_level);
    tracing::debug!(rec_type = %cli.rec_type, "recommendation type");

    let mut conn = match db::establish(&settings.database_url) {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(error = %e, "failed to open database");
            eprintln!("Database error: {e}");
            return ExitCode::from(3);
        }
    };

    let request = RecommendationRequest {
        positive_prompt: cli.prompt,
        negative_prompt: cli.negative_prompt,
        image_path: cli.image,
        image_description: None,
        context: cli.context,
        user_id: cli.user_id,
        model: cli.model,
        count: cli.count as usize,
    };

    let agent = PoetryAgent::new(settings);
    match agent.run(&mut conn, request).await {
        Ok(report) => {
            print_report(&report, cli.verbose);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "recommendation failed");
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn print_report(report: &RunReport, verbose: bool) {
    println!(
        "Saved {} recommendation record(s): {:?}",
        report.record_ids.len(),
        report.record_ids
    );

    if let Some(description) = &report.image_description {
        println!("Image description: {description}");
    }

    for poem in &report.poems {
        if verbose {
            println!("{}", "=".repeat(50));
            println!("{} - {} ({})", poem.title, poem.author, poem.dynasty);
            println!("\n{}", poem.content);
            println!("\n{}", poem.appreciation);
        } else {
            println!("{} - {} ({})", poem.title, poem.author, poem.dynasty);
        }
    }
    if verbose {
        println!("{}", "=".repeat(50));
    }
}
