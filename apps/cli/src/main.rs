#![deny(warnings)]

//! Command-line front end for the prospecting plan canvas.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use persistence::{file_snapshot_store, FileStore, KvSnapshotStore, SnapshotStore};
use plan_core::money::{format_currency_display, format_number_display, format_percentage_display};
use plan_core::{Field, FieldKind, PlannerConfig};
use plan_export::{export_worksheet, ExportOptions, NoControls, TextCanvasExporter};
use plan_store::WorksheetStore;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_SHA"),
    " ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "plano", version, long_version = LONG_VERSION)]
#[command(about = "Prospecting plan canvas: fill in the worksheet and read the funnel it implies")]
struct Cli {
    /// Directory holding the saved worksheet
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the worksheet and its derived metrics
    Show {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// List the editable fields
    Fields,
    /// Set one field from raw input; use `-` to read the value from stdin
    Set { field: String, value: String },
    /// Export a snapshot of the worksheet
    Export {
        /// Output directory
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Override the renderer timeout
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

type Store = WorksheetStore<KvSnapshotStore<FileStore>>;

fn open_store(cli: &Cli, cfg: &PlannerConfig) -> Store {
    let dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(persistence::default_data_dir);
    info!(dir = %dir.display(), key = %cfg.storage_key, "opening worksheet");
    WorksheetStore::initialize(file_snapshot_store(dir, cfg.storage_key.clone()), cfg.funnel)
}

fn display_value<S: SnapshotStore>(store: &WorksheetStore<S>, field: Field) -> String {
    let state = store.state();
    match field.kind() {
        FieldKind::Currency => {
            let amount = if field == Field::SalesGoal {
                state.sales_goal
            } else {
                state.average_ticket
            };
            format_currency_display(amount)
        }
        FieldKind::Percentage => format_percentage_display(state.conversion_rate),
        FieldKind::Text => state.text(field).unwrap_or_default().to_string(),
    }
}

fn render_show<S: SnapshotStore>(store: &WorksheetStore<S>) -> String {
    let mut out = String::new();
    for field in Field::ALL {
        let value = display_value(store, field);
        if value.contains('\n') {
            out.push_str(&format!("{}:\n", field.label()));
            for line in value.lines() {
                out.push_str(&format!("    {line}\n"));
            }
        } else {
            out.push_str(&format!("{}: {}\n", field.label(), value));
        }
    }
    let m = store.derived_metrics();
    out.push_str("--\n");
    out.push_str(&format!(
        "Vendas no Mês: {}\nPor semana: {}\nPor dia útil: {}\n",
        format_number_display(m.sales_per_month),
        format_number_display(m.sales_per_week),
        format_number_display(m.sales_per_day)
    ));
    out.push_str(&format!(
        "Leads Necessários: {}\nCapacidade de Vendas: {} contatos/dia\n",
        format_number_display(m.required_leads),
        format_number_display(m.daily_outreach)
    ));
    out
}

fn render_json<S: SnapshotStore>(store: &WorksheetStore<S>) -> Result<String> {
    let doc = serde_json::json!({
        "worksheet": store.state(),
        "metrics": store.derived_metrics(),
    });
    Ok(serde_json::to_string_pretty(&doc)?)
}

fn render_fields() -> String {
    Field::ALL
        .iter()
        .map(|f| format!("{:<20} {:<18} {:?}\n", f.name(), f.key(), f.kind()))
        .collect()
}

fn read_value(raw: String) -> Result<String> {
    if raw != "-" {
        return Ok(raw);
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("reading value from stdin")?;
    Ok(buf)
}

async fn run(cli: Cli) -> Result<()> {
    let cfg = PlannerConfig::load_or_default(cli.config.as_deref())?;
    match &cli.command {
        Command::Fields => print!("{}", render_fields()),
        Command::Show { json } => {
            let store = open_store(&cli, &cfg);
            if *json {
                println!("{}", render_json(&store)?);
            } else {
                print!("{}", render_show(&store));
            }
        }
        Command::Set { field, value } => {
            let mut store = open_store(&cli, &cfg);
            let value = read_value(value.clone())?;
            let field = store.set_field_by_name(field, &value)?;
            store.flush()?;
            anyhow::ensure!(store.failed_writes() == 0, "worksheet could not be saved");
            println!("{}: {}", field.label(), display_value(&store, field));
            let m = store.derived_metrics();
            println!(
                "Vendas no Mês: {} | Leads: {} | Contatos/dia: {}",
                format_number_display(m.sales_per_month),
                format_number_display(m.required_leads),
                format_number_display(m.daily_outreach)
            );
        }
        Command::Export {
            out_dir,
            timeout_secs,
        } => {
            let store = open_store(&cli, &cfg);
            let mut options = ExportOptions::from(&cfg.export);
            if let Some(secs) = timeout_secs {
                options.timeout = Duration::from_secs(*secs);
            }
            let path = export_worksheet(
                &TextCanvasExporter,
                &NoControls,
                store.state(),
                store.derived_metrics(),
                &options,
                out_dir,
            )
            .await?;
            println!("{}", path.display());
        }
    }
    Ok(())
}

/// `RUST_LOG` directives when set and valid, otherwise `info`.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging setup
    let filter = log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse()).await
}
