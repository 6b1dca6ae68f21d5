//! Punto de entrada ("driver").
//!
//! Este módulo lee la configuración y el programa, corre la tubería de
//! compilación y expone una CLI.

use anyhow::{self, bail, Context};
use clap::{self, crate_version, Arg};
use htsc::{
    codegen,
    config::{Config, Options},
    error::Diagnostics,
    CompileError, Pipeline,
};
use log::LevelFilter;

use std::{
    fs::{self, File},
    io::{self, Read},
};

fn main() -> anyhow::Result<()> {
    // Parsing de CLI
    let args = clap::App::new("HTS compiler")
        .version(crate_version!())
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .takes_value(true)
                .value_name("CONFIG")
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .takes_value(true)
                .value_name("OUTPUT")
                .default_value("-")
                .help("Output file ('-' for stdout)"),
        )
        .arg(Arg::new("no-optimize").long("no-optimize").help("Skip the optimization pass"))
        .arg(Arg::new("no-jobs").long("no-jobs").help("Do not run scheduled tasks"))
        .arg(
            Arg::new("strict")
                .long("strict")
                .help("Treat dropped characters as errors"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .multiple_occurrences(true)
                .help("Increase log verbosity"),
        )
        .arg(
            Arg::new("input")
                .required(true)
                .value_name("FILE")
                .help("Source file ('-' for stdin)"),
        )
        .get_matches();

    let level = match args.occurrences_of("verbose") {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .init();

    // Se extraen argumentos necesarios
    let config = match args.value_of("config") {
        Some(path) => {
            Config::load(path).with_context(|| format!("Failed to load configuration: {}", path))?
        }

        None => Config::default(),
    };

    let mut options = Options::empty();
    if args.is_present("no-optimize") {
        options |= Options::SKIP_OPTIMIZE;
    }

    if args.is_present("no-jobs") {
        options |= Options::SKIP_JOBS;
    }

    if args.is_present("strict") {
        options |= Options::STRICT_LEX;
    }

    let input = args.value_of("input").unwrap_or("-");
    let (name, text) = match input {
        "-" => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read from stdin")?;

            ("<stdin>", text)
        }

        path => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read source file: {}", path))?;

            (path, text)
        }
    };

    let pipeline = Pipeline::new(config.with_options(options));
    let compiled = match pipeline.compile(name, &text) {
        Ok(compiled) => compiled,

        Err(CompileError::Parse(error)) => {
            eprint!("{}", Diagnostics::from(error));
            bail!("Compilation of {} aborted", name);
        }

        Err(CompileError::Lex(warnings)) => {
            eprint!("{}", Diagnostics::from(warnings));
            bail!("Compilation of {} aborted", name);
        }

        Err(error) => return Err(error).context("Compilation failed"),
    };

    if !compiled.warnings.is_empty() {
        eprint!("{}", Diagnostics::from(compiled.warnings).kind("warning"));
    }

    match args.value_of("output").unwrap_or("-") {
        "-" => {
            let mut stdout = io::stdout();
            codegen::emit(&compiled.records, &mut stdout).context("Failed to emit to stdout")?;
        }

        path => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to open for writing: {}", path))?;

            codegen::emit(&compiled.records, &mut file)
                .with_context(|| format!("Failed to emit to file: {}", path))?;
        }
    }

    for outcome in &compiled.report.outcomes {
        eprintln!("{}", outcome);
    }

    let report = &compiled.report;
    if !report.is_success() {
        eprintln!(
            "{} job(s) failed, {} cancelled",
            report.failed(),
            report.cancelled()
        );
    }

    Ok(())
}
