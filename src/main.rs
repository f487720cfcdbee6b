//! route-policy: inspect and exercise policy files offline.
//!
//! ```text
//! route-policy check  policy.toml
//! route-policy state  policy.toml [--ingress] [--route NAME]
//! route-policy lookup policy.toml --uri /search?q=x [--method GET] [--ingress]
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use route_policy::config::{build_tables, load_config};
use route_policy::controller::ControllerTable;
use route_policy::error::join_errors;
use route_policy::observability::{logging, state};

#[derive(Parser)]
#[command(name = "route-policy")]
#[command(about = "Validate and inspect route policy files", long_about = None)]
struct Cli {
    /// Log level, overridden by RUST_LOG. Defaults to the file's [logging] level.
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a policy file and build its tables
    Check { file: PathBuf },
    /// Print the exported policy state of each controller as JSON
    State {
        file: PathBuf,
        /// Use the ingress table instead of egress
        #[arg(long)]
        ingress: bool,
        /// Only this route
        #[arg(long)]
        route: Option<String>,
    },
    /// Resolve a URI to its controller
    Lookup {
        file: PathBuf,
        #[arg(long)]
        uri: String,
        #[arg(long, default_value = "GET")]
        method: String,
        /// Use the ingress table instead of egress
        #[arg(long)]
        ingress: bool,
    },
}

impl Commands {
    fn file(&self) -> &PathBuf {
        match self {
            Commands::Check { file } | Commands::State { file, .. } | Commands::Lookup { file, .. } => file,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(cli.command.file())?;
    logging::init(cli.log_level.as_deref().unwrap_or(&config.logging.level));
    tracing::debug!(file = %cli.command.file().display(), "Policy file loaded");

    let (egress_table, ingress_table) = build_tables(&config).map_err(|errs| join_errors(&errs))?;
    let pick = |ingress: bool| if ingress { &ingress_table } else { &egress_table };

    match &cli.command {
        Commands::Check { file } => {
            println!(
                "{}: ok ({} egress routes, {} ingress routes)",
                file.display(),
                egress_table.count(),
                ingress_table.count()
            );
        }
        Commands::State { ingress, route, .. } => {
            let table: &ControllerTable = pick(*ingress);
            let mut out: BTreeMap<String, state::StateMap> = BTreeMap::new();
            match route {
                Some(name) => {
                    let ctrl = table
                        .lookup_by_name(name)
                        .ok_or_else(|| format!("unknown route [{name}]"))?;
                    out.insert(name.clone(), state::controller_state(&ctrl));
                }
                None => {
                    let default = table.default_controller();
                    out.insert(default.name().to_string(), state::controller_state(&default));
                    if !table.is_egress() {
                        let host = table.host();
                        out.insert(host.name().to_string(), state::controller_state(&host));
                    }
                    for name in table.names() {
                        if let Some(ctrl) = table.lookup_by_name(&name) {
                            out.insert(name, state::controller_state(&ctrl));
                        }
                    }
                }
            }
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Commands::Lookup {
            uri,
            method,
            ingress,
            ..
        } => {
            let ctrl = pick(*ingress).lookup_uri(uri, method);
            println!("{} ({:?})", ctrl.name(), ctrl.kind());
        }
    }

    Ok(())
}
