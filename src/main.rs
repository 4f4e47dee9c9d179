use clap::{Parser, Subcommand};
use patent_examer::{BatchOrchestrator, Config, ConsoleSink, JsonFileSink, PatentAnalyzer, ReportSink};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "patent-examer")]
#[command(about = "Summarize every Python function and flag the ones that may be patentable")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Log at debug level (includes LLM payloads)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a Python file or every Python file under a directory
    Analyze {
        /// Python file or folder to scan
        path: PathBuf,

        /// Output JSON file name
        #[arg(short, long, default_value = "patent_analysis.json")]
        out: PathBuf,

        /// Print the analyses instead of writing a report file
        #[arg(long)]
        console_only: bool,

        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Functions analyzed at the same time (overrides the config file)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Model identifier (overrides the config file)
        #[arg(long)]
        model: Option<String>,
    },
    /// Generate a default configuration file
    Config {
        /// Output path for the config file (defaults to ~/.patent-examer.toml)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze { path, out, console_only, config, concurrency, model } => {
            analyze(path, out, console_only, config, concurrency, model).await?;
        }
        Commands::Config { output } => {
            generate_config(output)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn analyze(
    target_path: PathBuf,
    out: PathBuf,
    console_only: bool,
    config_path: Option<PathBuf>,
    concurrency: Option<usize>,
    model: Option<String>,
) -> anyhow::Result<()> {
    println!("🚀 Starting Patent Examer");
    println!("=========================");

    let start_time = Instant::now();

    let mut config = match config_path {
        Some(config_path) => Config::load_from(&config_path)?,
        None => Config::load()?,
    };
    if let Some(concurrency) = concurrency {
        config.analysis.concurrency = concurrency;
    }
    if let Some(model) = model {
        config.llm.model = model;
    }
    config.validate()?;

    println!("🎯 Target: {}", target_path.display());
    println!("🤖 Model: {:?} / {}", config.llm.provider, config.llm.model);

    let sink: Box<dyn ReportSink> = if console_only {
        Box::new(ConsoleSink::new())
    } else {
        Box::new(JsonFileSink::new(out))
    };

    let analyzer = Arc::new(PatentAnalyzer::new(config.llm.clone())?);
    let orchestrator = BatchOrchestrator::new(&config, analyzer, sink);

    let (report, summary) = match orchestrator.run(&target_path).await {
        Ok(result) => result,
        Err(e @ patent_examer::ExamerError::InvalidInput { .. }) => {
            eprintln!("❌ {}", e);
            eprintln!("💡 Provide a .py file or a directory.");
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    println!();
    summary.print_summary();
    println!("\n✅ Analysis completed in {:.2}s", start_time.elapsed().as_secs_f64());
    println!(
        "📁 {} results saved to {}",
        report.records.len(),
        orchestrator.sink().describe()
    );

    Ok(())
}

fn generate_config(output_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config_path = output_path.unwrap_or_else(|| {
        Config::default_config_path().unwrap_or_else(|_| PathBuf::from("patent-examer.toml"))
    });

    println!("📝 Generating configuration file: {}", config_path.display());

    Config::write_documented(&config_path)?;

    println!("✅ Configuration file created successfully!");
    println!("💡 Set OPENAI_API_KEY (or ANTHROPIC_API_KEY) before running `patent-examer analyze`.");

    Ok(())
}
