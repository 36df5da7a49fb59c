// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use yamtwai::app_config::{self, Config, TranslationProvider};
use yamtwai::app_controller::Controller;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    #[value(name = "openai")]
    OpenAI,
    Ollama,
    #[value(name = "lmstudio")]
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate the content tree (default command)
    Translate(TranslateArgs),

    /// Translate the markdown files of one directory, without descending
    /// into subdirectories
    Simple(SimpleArgs),

    /// Generate shell completions for yamtwai
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct TranslateArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config: PathBuf,

    /// Content directory, overrides the configured one
    #[arg(short = 'd', long)]
    content_dir: Option<String>,

    /// Translate every language again and rewrite the history ledger
    #[arg(short, long)]
    retranslate: bool,

    /// List planned translations without calling the provider
    #[arg(long)]
    dry_run: bool,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(clap::Args, Debug, Clone)]
struct SimpleArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config: PathBuf,

    /// Directory holding the markdown files
    #[arg(default_value = ".")]
    dir: String,

    /// Source language code, overrides the configured one
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language codes, overrides the configured ones
    #[arg(short, long, value_delimiter = ',')]
    target_languages: Vec<String>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// API key of the active provider
    #[arg(short = 'k', long)]
    api_key: Option<String>,

    /// List planned translations without calling the provider
    #[arg(long)]
    dry_run: bool,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// YAMTwAI - Yet Another Markdown Translator with AI
///
/// Incrementally translates a tree of markdown documents into several
/// languages, keeping frontmatter and directory structure.
#[derive(Parser, Debug)]
#[command(name = "yamtwai")]
#[command(args_conflicts_with_subcommands = true)]
#[command(version)]
#[command(about = "AI-powered incremental markdown translation tool")]
#[command(long_about = "YAMTwAI translates every markdown document of a content tree into the configured languages.
Outputs are marked with `translated: true` and recorded in a history ledger, so a second run only
translates what is new.

EXAMPLES:
    yamtwai                                     # Translate using conf.json
    yamtwai --dry-run                           # Show what would be translated
    yamtwai -d site/content                     # Use another content directory
    yamtwai -p ollama -m llama3.1               # Use specific provider and model
    yamtwai --retranslate                       # Translate everything again
    yamtwai simple -t en,ja docs                # Translate the files of one directory
    yamtwai completions bash > yamtwai.bash     # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically. The OpenAI key may also come from OPENAI_API_KEY.

SUPPORTED PROVIDERS:
    openai    - OpenAI API (requires API key)
    ollama    - Local Ollama server (default: llama3.1)
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour for log level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let color = Self::color_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {:<5} {}\x1B[0m", color, now, record.level(), record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger accepts everything; the effective level is set through
    // log::set_max_level once the config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "yamtwai", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        Some(Commands::Simple(args)) => run_simple(args).await,
        None => run_translate(cli.translate).await,
    }
}

/// Load the configuration and apply environment and command line overrides
fn load_config(options: &TranslateArgs) -> Result<Config> {
    let mut config = Config::load_or_create(Path::new(&options.config))
        .with_context(|| format!("Failed to load config file: {:?}", options.config))?;

    config.apply_env_overrides();

    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(model) = &options.model {
        config.translation.set_model(model);
    }
    if let Some(content_dir) = &options.content_dir {
        config.content_dir = content_dir.clone();
    }
    if options.retranslate {
        config.retranslate = true;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    Ok(config)
}

/// Apply the log level given on the command line before the config is read
fn apply_cli_log_level(log_level: &Option<CliLogLevel>) {
    if let Some(cmd_log_level) = log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    apply_cli_log_level(&options.log_level);

    let config = load_config(&options)?;
    execute(config, true, options.dry_run).await
}

async fn run_simple(options: SimpleArgs) -> Result<()> {
    apply_cli_log_level(&options.log_level);

    let mut config = Config::load_or_create(Path::new(&options.config))
        .with_context(|| format!("Failed to load config file: {:?}", options.config))?;
    config.apply_env_overrides();

    config.use_single_directory(&options.dir);
    if let Some(source_language) = &options.source_language {
        config.source_language = source_language.clone();
    }
    if !options.target_languages.is_empty() {
        config.target_languages = options.target_languages.clone();
    }
    if let Some(model) = &options.model {
        config.translation.set_model(model);
    }
    if let Some(api_key) = &options.api_key {
        config.translation.set_api_key(api_key);
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    execute(config, false, options.dry_run).await
}

/// Plan or run the translation described by `config`
async fn execute(config: Config, recursive: bool, dry_run: bool) -> Result<()> {
    log::set_max_level(config.log_level.to_level_filter());

    let content_dir = config.content_path();
    if !content_dir.is_dir() {
        return Err(anyhow!("Content directory does not exist: {:?}", content_dir));
    }

    let controller = Controller::with_config(config)?.with_recursion(recursive);

    if dry_run {
        controller.dry_run()?;
        return Ok(());
    }

    info!(
        "Translating {:?} from {} into {}",
        content_dir,
        controller.config().source_language,
        controller.config().target_languages.join(", ")
    );

    let report = controller.run().await?;
    if !report.is_success() {
        warn!("{} document(s) failed, re-run to retry them", report.failures.len());
        std::process::exit(1);
    }

    Ok(())
}
