use clap::Parser;
use serde::Serialize;
use std::error::Error as _;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use almod::ast::Component;
use almod::diag::Diagnostic;
use almod::modifier::ClosedPort;
use almod::pipeline::{Operation, PipelineError, Script};

#[derive(Debug, Clone, clap::ValueEnum)]
enum EmitFormat {
    Text,
    Json,
    Ports,
}

#[derive(Parser, Debug)]
#[command(
    name = "almod",
    version,
    about = "Abstraction-layer model modifier — closes analog ports on flat dynamics components"
)]
struct Cli {
    /// Input component definition file
    source: PathBuf,

    /// Component to modify (required when the source defines several)
    #[arg(long)]
    component: Option<String>,

    /// Close an analog port, substituting VALUE (default 0) for its references (repeatable)
    #[arg(long, value_name = "PORT[=VALUE]", value_parser = parse_close)]
    close: Vec<(String, String)>,

    /// Close every analog reduce port with 0
    #[arg(long)]
    close_reduce: bool,

    /// Reduce port to keep open with --close-reduce (repeatable)
    #[arg(long, value_name = "NAME", requires = "close_reduce")]
    exclude: Vec<String>,

    /// JSON operation script, applied before operations given as flags
    #[arg(long)]
    script: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = EmitFormat::Text)]
    emit: EmitFormat,

    /// Output file path (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print phases and debug logging to stderr
    #[arg(long)]
    verbose: bool,
}

fn parse_close(arg: &str) -> Result<(String, String), String> {
    let (port, value) = match arg.split_once('=') {
        Some((port, value)) => (port.trim(), value.trim()),
        None => (arg.trim(), "0"),
    };
    if port.is_empty() {
        return Err("port name must not be empty".to_string());
    }
    if value.is_empty() {
        return Err(format!("missing value after `{}=`", port));
    }
    Ok((port.to_string(), value.to_string()))
}

#[derive(Serialize)]
struct JsonReport<'a> {
    components: &'a [Component],
    closed: &'a [ClosedPort],
}

fn init_logger(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("almod=debug,warn"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);

    if cli.verbose {
        eprintln!("almod: source = {}", cli.source.display());
        eprintln!("almod: emit   = {:?}", cli.emit);
    }

    // ── Build operation script ──
    let mut script = match &cli.script {
        Some(path) => {
            let text = match std::fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("almod: error: {}: {}", path.display(), e);
                    std::process::exit(2);
                }
            };
            match Script::from_json(&text) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("almod: error: {}: {}", path.display(), e);
                    std::process::exit(2);
                }
            }
        }
        None => Script::default(),
    };
    if cli.component.is_some() {
        script.component = cli.component.clone();
    }
    script
        .operations
        .extend(cli.close.iter().map(|(port, value)| Operation::ClosePort {
            port: port.clone(),
            value: value.clone(),
        }));
    if cli.close_reduce {
        script.operations.push(Operation::CloseReducePorts {
            exclude: cli.exclude.clone(),
        });
    }

    if cli.verbose {
        eprintln!("almod: {} operations", script.operations.len());
    }

    // ── Read source and run ──
    let source = match std::fs::read_to_string(&cli.source) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("almod: error: {}: {}", cli.source.display(), e);
            std::process::exit(2);
        }
    };

    let outcome = match almod::pipeline::run(&source, &script) {
        Ok(outcome) => outcome,
        Err(e) => {
            report_error(&e);
            std::process::exit(1);
        }
    };

    for diag in &outcome.diagnostics {
        print_diagnostic(diag);
    }
    if cli.verbose {
        for closed in &outcome.closed {
            eprintln!(
                "almod: closed {} ({} references -> {})",
                closed.port.name, closed.replaced, closed.value
            );
        }
    }

    // ── Emit ──
    let rendered = match cli.emit {
        EmitFormat::Text => almod::print::print_components(&outcome.components),
        EmitFormat::Json => {
            let report = JsonReport {
                components: &outcome.components,
                closed: &outcome.closed,
            };
            match serde_json::to_string_pretty(&report) {
                Ok(s) => s + "\n",
                Err(e) => {
                    eprintln!("almod: error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        EmitFormat::Ports => outcome
            .component()
            .ports()
            .iter()
            .map(|p| format!("{}\n", p))
            .collect(),
    };

    match &cli.output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, rendered) {
                eprintln!("almod: error: {}: {}", path.display(), e);
                std::process::exit(2);
            }
            if cli.verbose {
                eprintln!("almod: wrote {}", path.display());
            }
        }
        None => print!("{}", rendered),
    }
}

fn print_diagnostic(diag: &Diagnostic) {
    eprintln!("almod: {}", diag);
    for related in &diag.related_spans {
        eprintln!(
            "almod:   {} (bytes {}..{})",
            related.label, related.span.start, related.span.end
        );
    }
    for cause in &diag.cause_chain {
        eprintln!("almod:   note: {}", cause.message);
    }
}

fn report_error(err: &PipelineError) {
    eprintln!("almod: error: {}", err);
    match err {
        PipelineError::Parse { errors } => {
            for e in errors {
                eprintln!("almod: parse error: {}", e);
            }
        }
        PipelineError::InvalidModel { diagnostics, .. } => {
            for diag in diagnostics {
                print_diagnostic(diag);
            }
        }
        _ => {}
    }
    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("almod:   caused by: {}", cause);
        source = cause.source();
    }
}
