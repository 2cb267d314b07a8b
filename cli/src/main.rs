use std::borrow::Cow;
use std::path::PathBuf;

use anyhow::Context as AnyhowContext;
use clap::{Parser, Subcommand};
use flexi_logger::{FileSpec, LevelFilter, LogSpecification, Logger, LoggerHandle, WriteMode};

use ttu::{Context, DefaultContext};

mod dump;
use dump::Dump;

mod windows;
use windows::Windows;

mod transitions;
use transitions::Transitions;

mod golden;
use golden::Golden;

const SIMPLE_VERSION_STRING: &'static str =
    include!(concat!(env!("OUT_DIR"), "/simple_version_string"));
const VERSION_STRING: &'static str = include!(concat!(env!("OUT_DIR"), "/version_string"));

#[derive(Parser)]
#[command(name = "ttu")]
#[command(version(SIMPLE_VERSION_STRING))]
#[command(long_version(VERSION_STRING))]
struct Cli {
    #[arg(short = 'e', long, help = "Log to stderr instead of a file", action = clap::ArgAction::SetTrue, default_value_t = false)]
    log_stderr: bool,

    #[arg(short = 'f', long, help = "Send log output to the given file")]
    log_file: Option<PathBuf>,

    #[arg(short = 's', long, help = "Log spec for flexi_logger")]
    log_spec: Option<String>,

    #[arg(
        short = 'l',
        long,
        help = "Set the log level, 0 = warn, 1 = info, etc",
        default_value_t = 0
    )]
    log_level: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the full version string and exit
    #[command()]
    Version,

    /// Parse a trace and print its window manager states
    #[command()]
    Dump(Dump),

    /// List the windows seen across a trace
    #[command()]
    Windows(Windows),

    /// List the shell transitions recorded in a trace
    #[command()]
    Transitions(Transitions),

    /// Inspect and verify motion goldens
    #[command()]
    Golden(Golden),
}

impl Cli {
    fn configure_loggers(&self, ctx: &DefaultContext) -> anyhow::Result<LoggerHandle> {
        let log_spec = match &self.log_spec {
            Some(s) => {
                LogSpecification::parse(s).with_context(|| format!("parsing log spec {}", s))?
            }
            None => {
                if self.log_level > 0 {
                    let lvl = if self.log_level == 1 {
                        LevelFilter::Info
                    } else if self.log_level == 2 {
                        LevelFilter::Debug
                    } else {
                        LevelFilter::Trace
                    };
                    LogSpecification::builder().module("ttu", lvl).build()
                } else {
                    LogSpecification::env().with_context(|| "getting log spec from env")?
                }
            }
        };

        let mut logger = Logger::with(log_spec);

        if !self.log_stderr {
            let path = match &self.log_file {
                Some(v) => {
                    if v.is_absolute() {
                        Some(Cow::Borrowed(v))
                    } else {
                        let full_path = std::env::current_dir()?.join(v);
                        Some(Cow::Owned(full_path))
                    }
                }
                None => ctx.get_output_dir_child("log").map(Cow::Owned).ok(),
            };

            if let Some(p) = &path {
                logger = logger
                    .log_to_file(
                        FileSpec::try_from(p.as_ref()).with_context(|| "creating filespec")?,
                    )
                    .append()
                    .write_mode(WriteMode::BufferAndFlush);
            }
        }

        Ok(logger.start().with_context(|| "starting logger")?)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Version = &cli.command {
        println!("{}", VERSION_STRING);
        return Ok(());
    }

    let ctx = DefaultContext::default();

    let log_handle = cli.configure_loggers(&ctx)?;

    let res = match cli.command {
        Commands::Dump(c) => c.run(&ctx),
        Commands::Windows(c) => c.run(&ctx),
        Commands::Transitions(c) => c.run(&ctx),
        Commands::Golden(c) => c.run(&ctx),

        Commands::Version => panic!("unreachable"),
    };

    log_handle.flush();
    res
}
