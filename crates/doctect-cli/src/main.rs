use clap::{Parser, Subcommand};
use doctect_core::{Document, LintSeverity, import_json, lint_document, resolve_text};
use doctect_render::{PlanConfig, PlanMode, plan_export, plan_page};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "doctect")]
#[command(about = "Doctect planner project tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lint a project; exits non-zero when any warning is found
    Check {
        /// Path to the project JSON
        file: PathBuf,
    },
    /// Resolve a text template as seen from a node
    Text {
        file: PathBuf,
        /// Node id
        node: String,
        /// Template, e.g. "{{title}} {{year}}"
        template: String,
    },
    /// Print the page plan of one node as JSON
    Plan {
        file: PathBuf,
        node: String,
        /// Plan for the editor canvas (placeholders for empty grids)
        #[arg(long)]
        canvas: bool,
        /// Blank cells shown for an empty grid on the canvas
        #[arg(long, default_value_t = 6)]
        placeholder_cells: usize,
    },
    /// Print the export plan (pages and outline) as JSON
    Export { file: PathBuf },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check { file } => load(&file).map(|doc| check(&doc)),
        Commands::Text {
            file,
            node,
            template,
        } => load(&file).and_then(|doc| {
            let node = doc
                .node_by_str(&node)
                .ok_or_else(|| format!("unknown node `{node}`"))?;
            println!("{}", resolve_text(&doc, &template, Some(node)));
            Ok(ExitCode::SUCCESS)
        }),
        Commands::Plan {
            file,
            node,
            canvas,
            placeholder_cells,
        } => load(&file).and_then(|doc| {
            let id = doc
                .node_by_str(&node)
                .map(|n| n.id)
                .ok_or_else(|| format!("unknown node `{node}`"))?;
            let config = PlanConfig {
                mode: if canvas {
                    PlanMode::Canvas
                } else {
                    PlanMode::Export
                },
                placeholder_cells,
            };
            let plan = plan_page(&doc, id, &config)
                .ok_or_else(|| format!("node `{node}` has no template"))?;
            print_json(&plan)
        }),
        Commands::Export { file } => {
            load(&file).and_then(|doc| print_json(&plan_export(&doc, &PlanConfig::export())))
        }
    };

    result.unwrap_or_else(|e| {
        eprintln!("error: {e}");
        ExitCode::FAILURE
    })
}

fn load(file: &Path) -> Result<Document, String> {
    let json = fs::read_to_string(file).map_err(|e| format!("{}: {e}", file.display()))?;
    let doc = import_json(&json).map_err(|e| format!("{}: {e}", file.display()))?;
    log::info!("loaded {} ({} nodes)", file.display(), doc.node_count());
    Ok(doc)
}

fn check(doc: &Document) -> ExitCode {
    let diags = lint_document(doc);
    let mut warnings = 0;
    for d in &diags {
        let level = match d.severity {
            LintSeverity::Warning => {
                warnings += 1;
                "warning"
            }
            LintSeverity::Info => "info",
        };
        println!("{level}[{}] @{}: {}", d.rule, d.node_id, d.message);
    }
    eprintln!(
        "{} nodes, {} diagnostics ({warnings} warnings)",
        doc.node_count(),
        diags.len()
    );
    if warnings > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<ExitCode, String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(ExitCode::SUCCESS)
}
