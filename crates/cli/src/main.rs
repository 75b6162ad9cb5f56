mod config;
mod serve;
mod telemetry;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use livecode_core::normalize;
use livecode_eval::{build_scope, evaluate_with, EvaluationResult, SandboxLimits};
use livecode_session::{
    CodeGenerator, EditorView, HttpGenerator, ImageInput, Orchestrator, PreviewRenderer, PreviewState,
    SessionState,
};

use crate::config::Config;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Live preview for generated UI components.
#[derive(Parser)]
#[command(name = "livecode", version, about = "Live preview for generated UI components")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Debug-level logging on stderr
    #[arg(long, global = true)]
    verbose: bool,

    /// Configuration file (default: ./livecode.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Strip fence markers and append the render harness
    Normalize {
        /// Raw generator output
        file: PathBuf,
    },

    /// Evaluate component source and report the outcome
    Eval {
        /// Canonical component source
        file: PathBuf,
        /// Treat the file as raw generator output and normalize it first
        #[arg(long)]
        raw: bool,
    },

    /// Evaluate and mount component source into a preview document
    Render {
        /// Canonical component source
        file: PathBuf,
        /// Treat the file as raw generator output and normalize it first
        #[arg(long)]
        raw: bool,
        /// Write the document here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Send a design image to the generator and evaluate the result
    Generate {
        /// Image file (png, jpeg, gif, webp, svg, bmp)
        image: PathBuf,
        /// Generator base URL (overrides config and LIVECODE_GENERATOR_URL)
        #[arg(long)]
        generator_url: Option<String>,
        /// Write the canonical source here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// List the identifiers and modules visible to component source
    Scope,

    /// Start the HTTP session server
    Serve {
        /// Port to listen on (overrides config and LIVECODE_PORT)
        #[arg(long)]
        port: Option<u16>,
        /// Generator base URL (overrides config and LIVECODE_GENERATOR_URL)
        #[arg(long)]
        generator_url: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    telemetry::init_tracing(
        cli.output == OutputFormat::Json,
        telemetry::level_for(cli.quiet, cli.verbose),
    );

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            report_error(&format!("error: {}", e), cli.output, cli.quiet);
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Normalize { file } => cmd_normalize(&file, cli.output, cli.quiet),
        Commands::Eval { file, raw } => {
            cmd_eval(&file, raw, &config.sandbox, cli.output, cli.quiet);
        }
        Commands::Render { file, raw, out } => {
            cmd_render(&file, raw, out.as_deref(), &config.sandbox, cli.output, cli.quiet);
        }
        Commands::Generate {
            image,
            generator_url,
            out,
        } => {
            if let Some(url) = generator_url {
                config.generator.url = url;
            }
            cmd_generate(&image, out.as_deref(), &config, cli.output, cli.quiet);
        }
        Commands::Scope => cmd_scope(cli.output),
        Commands::Serve {
            port,
            generator_url,
        } => {
            if let Some(port) = port {
                config.serve.port = port;
            }
            if let Some(url) = generator_url {
                config.generator.url = url;
            }
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    report_error(
                        &format!("error: failed to start runtime: {}", e),
                        cli.output,
                        cli.quiet,
                    );
                    process::exit(1);
                }
            };
            if let Err(e) = rt.block_on(serve::start_server(config)) {
                report_error(&format!("server error: {}", e), cli.output, cli.quiet);
                process::exit(1);
            }
        }
    }
}

fn read_source(path: &Path, output: OutputFormat, quiet: bool) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}

fn write_output(path: &Path, content: &str, output: OutputFormat, quiet: bool) {
    if let Err(e) = std::fs::write(path, content) {
        let msg = format!("error writing '{}': {}", path.display(), e);
        report_error(&msg, output, quiet);
        process::exit(1);
    }
}

fn cmd_normalize(file: &Path, output: OutputFormat, quiet: bool) {
    let raw = read_source(file, output, quiet);
    let canonical = normalize(&raw);
    match output {
        OutputFormat::Text => print!("{}", canonical),
        OutputFormat::Json => {
            let json = serde_json::json!({ "source": canonical.as_str() });
            println!(
                "{}",
                serde_json::to_string_pretty(&json).unwrap_or_default()
            );
        }
    }
}

/// Read `file`, normalize it when `raw`, and evaluate it.
fn load_and_evaluate(
    file: &Path,
    raw: bool,
    limits: &SandboxLimits,
    output: OutputFormat,
    quiet: bool,
) -> (String, EvaluationResult) {
    let text = read_source(file, output, quiet);
    let source = if raw {
        normalize(&text).into_string()
    } else {
        text
    };
    let result = evaluate_with(&source, &build_scope(), limits);
    tracing::debug!(file = %file.display(), outcome = result.outcome(), "evaluated");
    (source, result)
}

fn cmd_eval(file: &Path, raw: bool, limits: &SandboxLimits, output: OutputFormat, quiet: bool) {
    let (source, result) = load_and_evaluate(file, raw, limits, output, quiet);
    match (&result, output) {
        (EvaluationResult::Success(tree), OutputFormat::Text) => {
            if !quiet {
                println!("success");
                let text = tree.text_content();
                if !text.trim().is_empty() {
                    println!("text: {}", text.trim());
                }
            }
        }
        (EvaluationResult::Success(_), OutputFormat::Json) => {
            println!(
                "{}",
                serde_json::to_string_pretty(&result).unwrap_or_default()
            );
        }
        _ => {
            report_evaluation_failure(&source, &result, output, quiet);
            process::exit(1);
        }
    }
}

fn cmd_render(
    file: &Path,
    raw: bool,
    out: Option<&Path>,
    limits: &SandboxLimits,
    output: OutputFormat,
    quiet: bool,
) {
    let (source, result) = load_and_evaluate(file, raw, limits, output, quiet);
    if !result.is_success() {
        report_evaluation_failure(&source, &result, output, quiet);
        process::exit(1);
    }
    let mut preview = PreviewRenderer::new();
    preview.render(&result);
    if let PreviewState::MountFailed { message, .. } = preview.state() {
        report_error(&format!("mount error: {}", message), output, quiet);
        process::exit(1);
    }
    let document = preview.document();
    match out {
        Some(path) => {
            write_output(path, &document, output, quiet);
            if !quiet {
                match output {
                    OutputFormat::Text => println!("wrote {}", path.display()),
                    OutputFormat::Json => println!(
                        "{}",
                        serde_json::json!({ "written": path.display().to_string() })
                    ),
                }
            }
        }
        None => print!("{}", document),
    }
}

fn cmd_generate(
    image_path: &Path,
    out: Option<&Path>,
    config: &Config,
    output: OutputFormat,
    quiet: bool,
) {
    let image = match ImageInput::from_path(image_path) {
        Ok(i) => i,
        Err(e) => {
            report_error(&format!("error: {}", e), output, quiet);
            process::exit(1);
        }
    };
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            report_error(
                &format!("error: failed to start runtime: {}", e),
                output,
                quiet,
            );
            process::exit(1);
        }
    };

    let generator = HttpGenerator::new(config.generator.url.clone(), config.generator.timeout());
    let mut session = Orchestrator::new(build_scope(), config.sandbox);
    let ticket = session.upload(&image);
    let outcome = rt.block_on(generator.generate(&image));
    session.complete_generation(ticket, outcome);

    if let SessionState::Failed { message } = session.state() {
        report_error(&format!("generation failed: {}", message), output, quiet);
        process::exit(1);
    }
    let source = session.source().unwrap_or_default();
    if output == OutputFormat::Json {
        println!(
            "{}",
            serde_json::to_string_pretty(&session.snapshot()).unwrap_or_default()
        );
    } else {
        match out {
            Some(path) => write_output(path, source, output, quiet),
            None => print!("{}", source),
        }
    }
    if let Some(result) = session.last_result() {
        if !result.is_success() {
            if output == OutputFormat::Text {
                report_evaluation_failure(source, result, output, quiet);
            }
            process::exit(1);
        }
    }
}

fn cmd_scope(output: OutputFormat) {
    let scope = build_scope();
    match output {
        OutputFormat::Text => {
            for entry in scope.summary() {
                println!("{:<10} {}", entry.kind, entry.name);
            }
            for module in scope.module_names() {
                println!("{:<10} {}", "module", module);
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "bindings": scope.summary(),
                "modules": scope.module_names().collect::<Vec<_>>(),
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&json).unwrap_or_default()
            );
        }
    }
}

/// Print a compile or runtime error with an excerpt of the failing line.
fn report_evaluation_failure(
    source: &str,
    result: &EvaluationResult,
    output: OutputFormat,
    quiet: bool,
) {
    match output {
        OutputFormat::Json => {
            eprintln!(
                "{}",
                serde_json::to_string_pretty(result).unwrap_or_default()
            );
        }
        OutputFormat::Text => {
            if quiet {
                return;
            }
            let Some(diagnostic) = result.diagnostic() else {
                return;
            };
            eprintln!("{}: {}", result.outcome().replace('_', " "), diagnostic);
            let view = EditorView {
                source,
                diagnostic: Some(diagnostic),
                mount_error: None,
            };
            if let Some(excerpt) = view.excerpt() {
                eprintln!("{}", excerpt);
            }
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
