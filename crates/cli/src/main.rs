//! qm - Command-line interface for the Quartermaster daemon

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9630";

#[derive(Parser)]
#[command(name = "qm")]
#[command(about = "Quartermaster quarterly partition scheduler CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "QUARTERMASTER_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,

    /// Print the raw JSON result
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ensure the current quarter's partition sheet exists
    Check,

    /// Run the partition health checks
    Maintenance,

    /// Show daemon status
    Status,

    /// List existing partition sheets
    Partitions,
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Deserialize)]
struct CheckResult {
    state: String,
    sheet_name: String,
    error: Option<String>,
}

#[derive(Deserialize, Tabled)]
struct CheckRow {
    name: String,
    status: String,
    details: String,
}

#[derive(Deserialize)]
struct MaintenanceResult {
    run_id: String,
    timestamp: String,
    overall: String,
    passed: usize,
    warnings: usize,
    failures: usize,
    checks: Vec<CheckRow>,
}

#[derive(Deserialize)]
struct NextRun {
    job: String,
    due: String,
}

#[derive(Deserialize)]
struct StatusResult {
    version: String,
    configuration_valid: bool,
    connected: bool,
    scheduler_running: bool,
    current_quarter: String,
    current_sheet_name: String,
    current_sheet_exists: bool,
    next_runs: Vec<NextRun>,
    uptime_seconds: u64,
}

async fn call_rpc(url: &str, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

fn colored_status(status: &str) -> String {
    match status {
        "pass" => status.green().to_string(),
        "warning" => status.yellow().to_string(),
        _ => status.red().bold().to_string(),
    }
}

fn yes_no(value: bool) -> String {
    if value {
        "yes".green().to_string()
    } else {
        "no".red().to_string()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let method = match cli.command {
        Commands::Check => "partition.check.v1",
        Commands::Maintenance => "admin.maintenance.v1",
        Commands::Status => "admin.status.v1",
        Commands::Partitions => "partition.list.v1",
    };
    let result = call_rpc(&cli.rpc_url, method, json!({})).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    match cli.command {
        Commands::Check => {
            let check: CheckResult = serde_json::from_value(result)?;
            match check.state.as_str() {
                "NO_TRANSITION" => println!(
                    "{} {} already exists, no transition needed",
                    "✓".green(),
                    check.sheet_name.bold()
                ),
                "TRANSITION_COMPLETE" => println!(
                    "{}",
                    format!("✓ Created partition {}", check.sheet_name).green().bold()
                ),
                _ => {
                    println!(
                        "{} Transition to {} failed: {}",
                        "✗".red(),
                        check.sheet_name.bold(),
                        check.error.unwrap_or_default()
                    );
                    std::process::exit(1);
                }
            }
        }

        Commands::Maintenance => {
            let report: MaintenanceResult = serde_json::from_value(result)?;
            println!(
                "{} {} ({})",
                "Maintenance run".cyan().bold(),
                report.run_id,
                report.timestamp
            );
            println!();

            let rows: Vec<CheckRow> = report
                .checks
                .into_iter()
                .map(|c| CheckRow {
                    status: colored_status(&c.status),
                    ..c
                })
                .collect();
            println!("{}", Table::new(rows));
            println!();
            println!(
                "  {} {}  ({} passed, {} warnings, {} failed)",
                "Overall:".bold(),
                colored_status(&report.overall),
                report.passed,
                report.warnings,
                report.failures
            );
        }

        Commands::Status => {
            let status: StatusResult = serde_json::from_value(result)?;
            println!("{}", "Quartermaster Status".cyan().bold());
            println!();
            println!("  {} {}", "RPC URL:".bold(), cli.rpc_url);
            println!("  {} {}", "Version:".bold(), status.version);
            println!("  {} {}", "Configuration valid:".bold(), yes_no(status.configuration_valid));
            println!("  {} {}", "Store connected:".bold(), yes_no(status.connected));
            println!("  {} {}", "Scheduler running:".bold(), yes_no(status.scheduler_running));
            println!();
            println!("  {} {}", "Current quarter:".bold(), status.current_quarter);
            println!(
                "  {} {} (exists: {})",
                "Current sheet:".bold(),
                status.current_sheet_name,
                yes_no(status.current_sheet_exists)
            );
            if !status.next_runs.is_empty() {
                println!();
                println!("  {}", "Next runs:".bold());
                for run in status.next_runs {
                    println!("    {} {}", run.due, run.job);
                }
            }
            println!();
            println!("  {} {} seconds", "Uptime:".bold(), status.uptime_seconds);
        }

        Commands::Partitions => {
            let partitions: Vec<String> = serde_json::from_value(result["partitions"].clone())?;
            if partitions.is_empty() {
                println!("{}", "No partition sheets yet".yellow());
            } else {
                for name in partitions {
                    println!("  {}", name);
                }
            }
        }
    }

    Ok(())
}
