//! Command-line shell that opens a database through the bridge and prepares statements.
#![forbid(unsafe_code)]

use std::error::Error;
use std::fs;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use limbo_bridge::{
    engine::SqliteEngine, ffi::BoundaryChannel, logging::init_logging, BridgeError, OpenOptions,
    OpenTarget, Session,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "limbo-bridge",
    version,
    about = "Open a database through the native bridge and prepare SQL statements"
)]
struct Cli {
    #[arg(value_name = "DATABASE", help = "Database path or sqlite:/jdbc:sqlite: locator")]
    database: String,

    #[arg(
        value_name = "SQL",
        help = "Statements to prepare; read from stdin, one per line, when omitted"
    )]
    sql: Vec<String>,

    #[arg(
        short = 'o',
        long = "option",
        value_name = "KEY=VALUE",
        value_parser = parse_key_val,
        help = "Open option (repeatable)"
    )]
    options: Vec<(String, String)>,

    #[arg(long, value_name = "FILE", help = "TOML file with open options")]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[arg(
        long,
        env = "LIMBO_BRIDGE_LOG",
        default_value = "warn",
        help = "tracing filter directive"
    )]
    log_level: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Serialize)]
struct PrepareReport<'a> {
    sql: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl<'a> PrepareReport<'a> {
    fn prepared(sql: &'a str) -> Self {
        Self {
            sql,
            status: "prepared",
            code: None,
            kind: None,
            message: None,
        }
    }

    fn failed(sql: &'a str, err: &BridgeError) -> Self {
        let (code, kind, message) = match err.primary() {
            BridgeError::Native(native) => (
                Some(native.code),
                Some(native.kind.to_string()),
                native.message.clone(),
            ),
            other => (None, None, other.to_string()),
        };
        Self {
            sql,
            status: "error",
            code,
            kind,
            message: Some(message),
        }
    }
}

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<bool, Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let (target, from_locator) = OpenTarget::from_arg(&cli.database)?;
    let from_file = match &cli.config {
        Some(path) => OpenOptions::from_toml_str(&fs::read_to_string(path)?)?,
        None => OpenOptions::default(),
    };
    let from_args = OpenOptions::from_properties(cli.options.iter().map(|(k, v)| (k, v)))?;
    let options = from_file.merge(from_locator).merge(from_args);

    let channel = BoundaryChannel::new(Arc::new(SqliteEngine::new()));
    let session = Session::open(&channel, &target, options)?;

    let statements = if cli.sql.is_empty() {
        read_statements(io::stdin().lock())?
    } else {
        cli.sql.clone()
    };

    let mut all_ok = true;
    for sql in &statements {
        let result = session.prepare(sql).and_then(|stmt| stmt.close());
        if let Err(err) = &result {
            all_ok = false;
            emit_failure(cli.format, sql, err)?;
        } else {
            emit(cli.format, &PrepareReport::prepared(sql), |report| {
                println!("prepared: {}", report.sql)
            })?;
        }
    }
    session.close()?;
    Ok(all_ok)
}

fn read_statements(input: impl BufRead) -> io::Result<Vec<String>> {
    let mut statements = Vec::new();
    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            statements.push(trimmed.to_string());
        }
    }
    Ok(statements)
}

fn emit_failure(format: OutputFormat, sql: &str, err: &BridgeError) -> Result<(), Box<dyn Error>> {
    let report = PrepareReport::failed(sql, err);
    emit(format, &report, |_| eprintln!("error: {sql}: {err}"))?;
    for cause in err.suppressed() {
        eprintln!("  suppressed: {cause}");
    }
    Ok(())
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: Fn(&T),
{
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(value)?),
        OutputFormat::Text => printer(value),
    }
    Ok(())
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))
}
