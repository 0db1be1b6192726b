//! Operator CLI entry point.

use std::time::Duration;

use anyhow::{Context, Result};
use bollard::Docker;
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};

use rs_replicaset_operator::adapters::{MongoAdminClient, SwarmTopologyObserver};
use rs_replicaset_operator::config::ConfigLoader;
use rs_replicaset_operator::{logging, Supervisor};

#[derive(Parser)]
#[command(name = "rs-replicaset-operator")]
#[command(about = "MongoDB replica-set control-loop operator for Docker Swarm", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the supervisor loop (default).
    Run,
    /// Run a single reconciliation cycle and print the result without looping.
    Check {
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::load().context("failed to load configuration")?;
    logging::init(&config);

    let docker = Docker::connect_with_local_defaults().context("failed to connect to the Docker daemon")?;
    let observer = Box::new(SwarmTopologyObserver::new(
        docker,
        config.mongo_service_name.clone(),
        config.overlay_network_name.clone(),
        config.mongo_port,
    ));
    let admin = Box::new(MongoAdminClient::new(Duration::from_secs(config.probe_timeout_sec)));

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            Supervisor::new(config, observer, admin).run().await;
            Ok(())
        }
        Commands::Check { json } => {
            let mut supervisor = Supervisor::new(config, observer, admin);
            let report = supervisor.run_cycle().await;
            print_report(&report, json);
            Ok(())
        }
    }
}

fn print_report(report: &rs_replicaset_operator::CycleReport, json: bool) {
    if json {
        let body = serde_json::json!({
            "cycle": report.cycle,
            "state": report.state_label,
            "action": format!("{:?}", report.action),
            "actuator_result": report.actuator_result.as_ref().map(|r| format!("{r:?}")),
            "bootstrap_ran": report.bootstrap_ran,
        });
        println!("{body}");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["field", "value"]);
    table.add_row(vec![Cell::new("cycle"), Cell::new(report.cycle)]);
    table.add_row(vec![Cell::new("state"), Cell::new(report.state_label)]);
    table.add_row(vec![Cell::new("action"), Cell::new(format!("{:?}", report.action))]);
    table.add_row(vec![
        Cell::new("actuator_result"),
        Cell::new(
            report
                .actuator_result
                .as_ref()
                .map(|r| format!("{r:?}"))
                .unwrap_or_else(|| "-".to_string()),
        ),
    ]);
    table.add_row(vec![Cell::new("bootstrap_ran"), Cell::new(report.bootstrap_ran)]);
    println!("{table}");
}
