use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use serde_json::json;

use sage::{
    log_set_stderr, BatchOptions, GlobalizeOutcome, ResourceRequest, Result, SageContext,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Resolve and globalize resources of a layered Sage project")]
struct Cli {
    /// Project configuration file
    #[arg(short, long, default_value = "sage.toml")]
    config: PathBuf,

    /// Log level written to stderr (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "warn")]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the file that wins for a resource
    Resolve {
        relative_path: String,
        #[arg(long, default_value = "")]
        category: String,
        #[arg(long, default_value = "")]
        locale: String,
        /// List every candidate path in lookup order
        #[arg(long)]
        candidates: bool,
    },
    /// Globalize one resource and print the merged document
    Globalize {
        relative_path: String,
        #[arg(long)]
        locale: String,
        #[arg(long, default_value = "")]
        category: String,
    },
    /// Globalize every resource of a category and print a JSON report
    Batch {
        category: String,
        #[arg(long)]
        locale: String,
        /// Write merged documents under this directory
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// File extensions to include (repeatable)
        #[arg(long = "ext")]
        extensions: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = log_set_stderr(cli.log_level) {
        eprintln!("sage: {err}");
    }
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("sage: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let context = SageContext::from_file(&cli.config)?;
    match cli.command {
        Command::Resolve {
            relative_path,
            category,
            locale,
            candidates,
        } => {
            let request = ResourceRequest::new(category, locale, relative_path);
            if candidates {
                for candidate in context.resolver.candidates(&request)? {
                    println!("{}\t{}", candidate.layer.name(), candidate.path.display());
                }
                return Ok(ExitCode::SUCCESS);
            }
            let resolved = context.resolver.resolve(&request)?;
            print_json(&json!({
                "request": request,
                "path": resolved.physical_path,
                "layer": resolved.layer.name(),
                "locale": resolved.locale,
            }));
        }
        Command::Globalize {
            relative_path,
            locale,
            category,
        } => {
            let request = ResourceRequest::new(category, locale, relative_path);
            match context.merger.globalize_resource(&request)? {
                GlobalizeOutcome::Globalized { document, summary } => {
                    print!("{document}");
                    if !summary.missing_phrases.is_empty() {
                        let missing: Vec<&str> =
                            summary.missing_phrases.iter().map(String::as_str).collect();
                        eprintln!("sage: missing phrases: {}", missing.join(", "));
                    }
                }
                GlobalizeOutcome::NotGlobalizable => {
                    eprintln!("sage: {request} has no phrase placeholders");
                }
            }
        }
        Command::Batch {
            category,
            locale,
            output,
            extensions,
        } => {
            let options = BatchOptions {
                output_dir: output,
                extensions,
            };
            let report = context
                .merger
                .globalize_category(&category, &locale, &options)?;
            print_json(&report);
            if !report.failures.is_empty() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(err) => eprintln!("sage: cannot encode output: {err}"),
    }
}
