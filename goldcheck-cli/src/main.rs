//! goldcheck CLI binary.
//!
//! Entry point for the `goldcheck` command-line tool.

use std::process::ExitCode;

use clap::Parser;
use goldcheck_clock::SystemClock;
use goldcheck_cli::exit::{codes, exit_code};
use goldcheck_cli::signal::install_handler;
use goldcheck_cli::{
    execute_list, execute_regenerate, execute_verify, format_listing, prepare_list,
    prepare_regenerate, prepare_verify, Cli, Command, CommandError, ListArgs, RegenerateArgs,
    VerifyArgs,
};
use goldcheck_fs::RealFilesystem;
use goldcheck_harness::{ShutdownFlag, StderrLogger};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let shutdown = ShutdownFlag::new();
    install_handler(&shutdown);

    let result = match cli.command {
        Command::Verify(args) => run_verify(args, &shutdown),
        Command::Regenerate(args) => run_regenerate(args, &shutdown),
        Command::List(args) => run_list(args),
    };

    match result {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(exit_code(&e) as u8)
        }
    }
}

/// Run the verify command.
fn run_verify(args: VerifyArgs, shutdown: &ShutdownFlag) -> Result<i32, CommandError> {
    let fs = RealFilesystem;
    let clock = SystemClock;

    let settings = prepare_verify(&args, &fs)?;
    let producer = settings.require_producer()?;
    let logger = StderrLogger::new(settings.verbosity);

    let result = execute_verify(&args, &settings, producer, &fs, &clock, &logger, shutdown)?;
    print!("{}", result.rendered);

    Ok(if result.interrupted() {
        codes::SIGINT
    } else if result.report.passed() {
        codes::SUCCESS
    } else {
        codes::SUITE_FAILED
    })
}

/// Run the regenerate command.
fn run_regenerate(args: RegenerateArgs, shutdown: &ShutdownFlag) -> Result<i32, CommandError> {
    let fs = RealFilesystem;
    let clock = SystemClock;

    let settings = prepare_regenerate(&args, &fs)?;
    let producer = settings.require_producer()?;
    let logger = StderrLogger::new(settings.verbosity);

    let result = execute_regenerate(&args, &settings, producer, &fs, &clock, &logger, shutdown)?;
    print!("{}", result.rendered);

    Ok(if result.interrupted() {
        codes::SIGINT
    } else if result.report.passed() {
        codes::SUCCESS
    } else {
        codes::SUITE_FAILED
    })
}

/// Run the list command.
fn run_list(args: ListArgs) -> Result<i32, CommandError> {
    let fs = RealFilesystem;
    let clock = SystemClock;

    let settings = prepare_list(&args, &fs)?;
    let logger = StderrLogger::new(settings.verbosity);

    let fixtures = execute_list(&settings, &fs, &clock, &logger)?;
    print!("{}", format_listing(&fixtures));

    Ok(codes::SUCCESS)
}
