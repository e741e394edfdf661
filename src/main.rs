// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use bilisub::app_config::{self, Config};
use bilisub::file_utils::FileManager;
use bilisub::formats::ExportFormat;
use bilisub::navigation;
use bilisub::CaptionExporter;

/// CLI Wrapper for ExportFormat to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliExportFormat {
    Srt,
    Vtt,
    Txt,
    Timed,
    Json,
}

impl From<CliExportFormat> for ExportFormat {
    fn from(cli_format: CliExportFormat) -> Self {
        match cli_format {
            CliExportFormat::Srt => ExportFormat::Srt,
            CliExportFormat::Vtt => ExportFormat::Vtt,
            CliExportFormat::Txt => ExportFormat::PlainText,
            CliExportFormat::Timed => ExportFormat::TimedText,
            CliExportFormat::Json => ExportFormat::RawJson,
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
    /// Export the captions of a video to a file
    Export(ExportArgs),

    /// List the caption tracks a video offers
    List {
        /// Video page URL or id (BV…/av…)
        #[arg(value_name = "VIDEO")]
        video: String,
    },

    /// Generate shell completions for bilisub
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Video page URL or id (BV…/av…)
    #[arg(value_name = "VIDEO")]
    video: String,

    /// Output format (defaults to the configured format)
    #[arg(short, long, value_enum)]
    format: Option<CliExportFormat>,

    /// Preferred caption language (e.g., 'zh-CN', 'en')
    #[arg(short, long)]
    language: Option<String>,

    /// Directory to write the file to
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Force overwrite of an existing output file
    #[arg(long)]
    force: bool,
}

/// bilisub - Bilibili caption exporter
///
/// Downloads the captions of a Bilibili video and saves them as SRT,
/// WebVTT, plain or timed transcript, or JSON.
#[derive(Parser, Debug)]
#[command(name = "bilisub")]
#[command(version)]
#[command(about = "Export Bilibili captions to subtitle files")]
#[command(long_about = "bilisub fetches the caption tracks of a Bilibili video and exports one of them.

EXAMPLES:
    bilisub export BV1xx411c7mD                          # SRT in the current directory
    bilisub export -f vtt -l en 'https://www.bilibili.com/video/BV1xx411c7mD?p=2'
    bilisub export -f json -o subs/ av170001             # Raw cue dump
    bilisub list BV1xx411c7mD                            # Show available tracks
    bilisub completions bash > bilisub.bash              # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. Subtitle lists may require a logged-in session:
    set acquisition.session_cookie or BILISUB_COOKIE.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    /// Session cookie sent with API requests
    #[arg(long, env = "BILISUB_COOKIE", hide_env_values = true, global = true)]
    cookie: Option<String>,
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

    // @returns: Color and marker for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "❌"),
            Level::Warn => ("1;33", "🚧"),
            Level::Info => ("1;32", " "),
            Level::Debug => ("1;36", "🔍"),
            Level::Trace => ("1;35", "📋"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        // The logger is installed once at Trace; log::max_level does the filtering
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, marker) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", color, now, marker, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Installed once; the level is narrowed after the config is loaded
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "bilisub", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;
    log::set_max_level(config.log_level.to_level_filter());

    match cli.command {
        Commands::Export(args) => run_export(config, args).await,
        Commands::List { video } => run_list(config, &video).await,
        Commands::Completions { .. } => Ok(()),
    }
}

// Load or create the configuration, then apply command line overrides
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let config_path = Path::new(&cli.config_path);

    let mut config = if config_path.exists() {
        Config::from_file(config_path)?
    } else {
        warn!("Config file not found at '{}', creating default config.", cli.config_path);

        let config = Config::default();
        let config_json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize default config to JSON")?;
        FileManager::write_to_file(config_path, &config_json)
            .context(format!("Failed to write default config to file: {}", cli.config_path))?;
        config
    };

    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }
    if let Some(cookie) = &cli.cookie {
        config.acquisition.session_cookie = Some(cookie.clone());
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

fn open_video(config: Config, video: &str) -> Result<CaptionExporter<bilisub::providers::bilibili::BilibiliFetcher>> {
    let video_id = navigation::resolve_video_reference(video)
        .ok_or_else(|| anyhow!("Not a Bilibili video URL or id: {}", video))?;

    let exporter = CaptionExporter::from_config(config)?;
    exporter.open_video(&video_id);
    Ok(exporter)
}

async fn run_export(config: Config, args: ExportArgs) -> Result<()> {
    let format = args.format.map(ExportFormat::from).unwrap_or(config.default_format);
    let exporter = open_video(config, &args.video)?;

    let artifact = match exporter.request_export(format, args.language.as_deref()).await {
        Ok(artifact) => artifact,
        Err(e) if e.is_expected_absence() => {
            warn!("{}", e);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let output_path = FileManager::generate_output_path(&args.output, &artifact.filename);
    FileManager::write_new_file(&output_path, &artifact.content, args.force)?;

    info!("Success: {:?} ({})", output_path, artifact.mime_type);
    Ok(())
}

async fn run_list(config: Config, video: &str) -> Result<()> {
    let exporter = open_video(config, video)?;
    let video_id = exporter.current_video().unwrap_or_default();
    let tracks = exporter.list_tracks().await?;

    if tracks.is_empty() {
        warn!("No captions available for video {}", video_id);
        return Ok(());
    }

    let mut stdout = std::io::stdout();
    for track in tracks {
        writeln!(
            stdout,
            "{:<10} {:<24} {:<18} {} cues",
            track.language_code, track.language_name, track.source, track.cue_count
        )?;
    }
    Ok(())
}
