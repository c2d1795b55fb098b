//! # edoc CLI entry point
//!
//! Parses command-line arguments, sets up logging and dispatches to the
//! subcommand handlers in the library crate.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use edoc_cli::assemble::{run_assemble, AssembleArgs};
use edoc_cli::qr::{run_qr, QrArgs};
use edoc_cli::sign::{run_sign, SignArgs};
use edoc_cli::submit::{run_submit, SubmitArgs};
use edoc_cli::validate::{run_validate, ValidateArgs};
use edoc_cli::verify::{run_verify, VerifyArgs};

/// Electronic document pipeline.
///
/// Signs tax documents, derives their verification codes, assembles and
/// validates transport envelopes, and submits them to the receiving service
/// with response-driven correction.
#[derive(Parser, Debug)]
#[command(name = "edoc", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign a business document.
    Sign(SignArgs),
    /// Verify signed documents in a file, envelope or package.
    Verify(VerifyArgs),
    /// Derive a verification URL from a field string.
    Qr(QrArgs),
    /// Sign documents and assemble them into an envelope.
    Assemble(AssembleArgs),
    /// Check an envelope against the structural rules.
    Validate(ValidateArgs),
    /// Submit documents with bounded correction.
    Submit(SubmitArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Commands::Sign(args) => run_sign(&args),
        Commands::Verify(args) => run_verify(&args),
        Commands::Qr(args) => run_qr(&args),
        Commands::Assemble(args) => run_assemble(&args),
        Commands::Validate(args) => run_validate(&args),
        Commands::Submit(args) => run_submit(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
