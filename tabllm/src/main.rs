use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use llm_client::{Config, Gateway, ModelPreset, ProviderKind};
use std::io::Read;
use std::path::{Path, PathBuf};
use tabllm::{BatchProcessor, Input, Output, PromptTemplate, Strategy};

#[derive(Parser, Debug)]
#[command(
    name = "tabllm",
    about = "Run tabular data through an LLM",
    long_about = "Formats each row of a JSON table (or each value of a single column) with a prompt template and sends the prompts to an LLM, row by row or packed into token-bounded chunks"
)]
#[command(version)]
struct Args {
    /// Enable debug mode for verbose output
    #[arg(short, long, global = true, default_value_t = false)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process an input file
    Run(RunArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(ClapArgs, Debug)]
struct RunArgs {
    /// JSON input: array of objects, array of values, or object of columns ("-" for stdin)
    input: PathBuf,

    /// Prompt template, e.g. "Given the salary of {salary}, what is its square?"
    #[arg(short, long, conflicts_with = "template_file", required_unless_present = "template_file")]
    template: Option<String>,

    /// Read the prompt template from a file
    #[arg(long)]
    template_file: Option<PathBuf>,

    /// How rows are grouped into requests
    #[arg(short, long, value_enum, default_value_t = Strategy::Rows)]
    strategy: Strategy,

    /// Model preset to use (overrides default from config)
    #[arg(short, long)]
    model: Option<String>,

    /// Token budget per request (overrides the preset)
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Show the requests that would be sent, without sending them
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Set the default model preset
    SetDefault {
        /// Name of the preset to use as default
        preset: String,
    },
    /// List available presets
    List,
    /// Show current configuration
    Show,
    /// Add a new preset
    AddPreset {
        /// Preset name
        name: String,
        /// Provider (openai, huggingface)
        #[arg(short, long)]
        provider: String,
        /// Model identifier
        #[arg(short = 'M', long)]
        model: Option<String>,
        /// Token budget per request
        #[arg(long, default_value_t = llm_client::DEFAULT_MAX_TOKENS)]
        max_tokens: u32,
    },
}

/// Handle config subcommands
fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::SetDefault { preset } => {
            let mut config = Config::load()?;
            // Verify preset exists
            config.get_preset(preset)?;
            config.default_preset = preset.clone();
            config.save()?;
            println!("Default preset set to: {}", preset);
        }
        ConfigAction::List => {
            let config = Config::load()?;
            println!("Available presets:");
            for (name, preset) in &config.presets {
                let default_marker = if *name == config.default_preset {
                    " (default)"
                } else {
                    ""
                };
                println!(
                    "  {} - {} / {} / {} tokens{}",
                    name,
                    preset.provider,
                    preset.model.as_deref().unwrap_or("default model"),
                    preset.max_tokens,
                    default_marker
                );
            }
        }
        ConfigAction::Show => {
            let config = Config::load()?;
            let path = Config::config_path()?;
            println!("Config file: {}", path.display());
            println!();
            println!("{:#?}", config);
        }
        ConfigAction::AddPreset {
            name,
            provider,
            model,
            max_tokens,
        } => {
            let kind: ProviderKind = provider.parse()?;
            let mut config = Config::load()?;
            config.presets.insert(
                name.clone(),
                ModelPreset {
                    provider: kind.to_string(),
                    model: model.clone(),
                    max_tokens: *max_tokens,
                },
            );
            config.save()?;
            println!("Added preset: {}", name);
        }
    }
    Ok(())
}

/// Read and parse the JSON input
fn read_input(path: &Path) -> Result<Input> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input: {}", path.display()))?
    };

    let value: serde_json::Value =
        serde_json::from_str(&content).context("Input is not valid JSON")?;
    Ok(Input::from_json(value)?)
}

fn read_template(args: &RunArgs) -> Result<PromptTemplate> {
    let source = match (&args.template, &args.template_file) {
        (Some(template), _) => template.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read template: {}", path.display()))?
            .trim_end_matches('\n')
            .to_string(),
        (None, None) => anyhow::bail!("A template is required (--template or --template-file)"),
    };

    Ok(PromptTemplate::parse(&source)?)
}

/// Resolve the preset, applying command-line overrides
fn resolve_preset(config: &Config, args: &RunArgs) -> Result<ModelPreset> {
    let mut preset = config
        .resolve_preset(args.model.as_deref())
        .context("Failed to resolve model preset")?
        .clone();

    if let Some(max_tokens) = args.max_tokens {
        preset.max_tokens = max_tokens;
    }
    Ok(preset)
}

fn print_results(results: Vec<String>) {
    for (i, result) in results.iter().enumerate() {
        if i > 0 {
            println!("---");
        }
        println!("{}", result);
    }
}

async fn run(args: &RunArgs) -> Result<()> {
    let input = read_input(&args.input)?;
    let template = read_template(args)?;
    let config = Config::load().context("Failed to load LLM configuration")?;
    let preset = resolve_preset(&config, args)?;

    log::debug!(
        "Input: {} record(s), strategy: {:?}, budget: {} tokens",
        input.len(),
        args.strategy,
        preset.max_tokens
    );

    if args.dry_run {
        let planned = tabllm::plan(args.strategy, &template, input, preset.max_tokens as usize)?;
        match args.format {
            Format::Json => println!("{}", serde_json::to_string_pretty(&planned)?),
            Format::Text => {
                for (i, request) in planned.iter().enumerate() {
                    println!("# request {} (~{} tokens)", i, request.tokens);
                    println!("{}", request.prompt);
                }
            }
        }
        return Ok(());
    }

    let gateway = Gateway::from_config(&config, &preset)
        .with_context(|| format!("Failed to initialize provider '{}'", preset.provider))?;
    let processor = BatchProcessor::new(gateway, template);

    let output = processor
        .process(args.strategy, input)
        .await
        .context("Processing failed")?;

    match args.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&output)?),
        Format::Text => match output {
            Output::Single(result) => println!("{}", result),
            other => print_results(other.into_vec()),
        },
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match &args.command {
        Commands::Config { action } => handle_config_command(action),
        Commands::Run(run_args) => run(run_args).await,
    }
}
