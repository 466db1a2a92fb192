mod config;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use calq_ical::object::CALENDAR_CONTENT_TYPE;
use calq_ical::CalendarObject;

use config::*;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Command,

    #[clap(short, long, env = "CALQ_CONFIG", default_value = "calq.toml")]
    /// Path to the calq configuration file
    config_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report the issues of iCalendar files
    Validate {
        /// Only report invalid characters, not missing required fields
        #[clap(long)]
        lenient: bool,

        files: Vec<PathBuf>,
    },
    /// Print the files matching a filter of the configuration file
    Query {
        #[clap(short, long)]
        filter: String,

        files: Vec<PathBuf>,
    },
    /// Print the UID of iCalendar files
    Uid { files: Vec<PathBuf> },
}

fn tracer() {
    tracing_subscriber::fmt::init();
}

fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "calq=info,calq_ical=info")
    }

    // Abort on panic
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("{}", panic_info);
        eprintln!("{:?}", backtrace::Backtrace::new());
        std::process::abort();
    }));

    tracer();

    let args = Args::parse();

    match &args.command {
        Command::Validate { lenient, files } => {
            let config = optional_config(&args.config_file)?;
            let strict = config.validation.strict && !lenient;
            validate(files, strict)?;
        }
        Command::Query { filter, files } => {
            let config = read_config(args.config_file.clone()).with_context(|| {
                format!("read configuration {}", args.config_file.display())
            })?;
            let filter = config.filter(filter)?;
            for file in files {
                let obj = load(file)?;
                let name = file.display().to_string();
                if filter.check(&name, &obj)? {
                    println!("{}", name);
                }
            }
        }
        Command::Uid { files } => {
            for file in files {
                let obj = load(file)?;
                match obj.get_uid() {
                    Ok(uid) => println!("{}: {}", file.display(), uid),
                    Err(e) => println!("{}: {}", file.display(), e),
                }
            }
        }
    }

    Ok(())
}

/// The configuration file is only needed by `query`, defaults apply otherwise.
fn optional_config(config_file: &Path) -> Result<Config> {
    if !config_file.exists() {
        tracing::debug!(path=%config_file.display(), "no configuration file, using defaults");
        return Ok(Config::default());
    }
    read_config(config_file.to_path_buf())
        .with_context(|| format!("read configuration {}", config_file.display()))
}

fn load(file: &Path) -> Result<CalendarObject> {
    let raw = std::fs::read(file).with_context(|| format!("read {}", file.display()))?;
    let obj = CalendarObject::from_chunks(&[raw], CALENDAR_CONTENT_TYPE)
        .with_context(|| format!("parse {}", file.display()))?;
    tracing::trace!(path=%file.display(), summary=?obj.describe(), "loaded calendar object");
    Ok(obj)
}

fn validate(files: &[PathBuf], strict: bool) -> Result<()> {
    let mut invalid = 0usize;
    for file in files {
        let obj = load(file)?;
        let issues = obj.issues(strict).collect::<Vec<_>>();
        if issues.is_empty() {
            tracing::info!(path=%file.display(), strict, "calendar object is valid");
            continue;
        }

        invalid += 1;
        for issue in issues.iter() {
            println!("{}: {}", file.display(), issue);
        }
    }

    if strict && invalid > 0 {
        bail!("{} invalid calendar object(s)", invalid);
    }
    Ok(())
}
