//! Dispatch CLI - Command-line interface for the order dispatch daemon

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9630";

#[derive(Parser)]
#[command(name = "dispatch")]
#[command(about = "Order dispatch engine CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "DISPATCH_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a new order
    Order {
        /// Order class (NORMAL, PRIORITY, TOP_PRIORITY)
        class: String,
    },

    /// Add a bot
    AddBot,

    /// Remove the newest bot (its order, if any, returns to pending)
    RemoveBot,

    /// Show pending, processing and complete orders and all bots
    Status,

    /// List order classes by rank
    Classes,
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

#[derive(Deserialize, Tabled)]
struct SubmitResult {
    order_id: u64,
    class: String,
    state: String,
}

#[derive(Deserialize, Tabled)]
struct ClassRow {
    name: String,
    label: String,
    rank: u32,
}

#[derive(Deserialize)]
struct OrderClass {
    name: String,
}

#[derive(Deserialize)]
struct OrderView {
    id: u64,
    class: OrderClass,
    state: String,
    created_at: i64,
}

#[derive(Tabled)]
struct OrderRow {
    #[tabled(rename = "order")]
    id: String,
    class: String,
    state: String,
    created_at: String,
}

impl From<&OrderView> for OrderRow {
    fn from(o: &OrderView) -> Self {
        Self {
            id: format!("#{}", o.id),
            class: o.class.name.clone(),
            state: o.state.clone(),
            created_at: o.created_at.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct BotView {
    id: u64,
    state: String,
    current_order_id: Option<u64>,
}

#[derive(Tabled)]
struct BotRow {
    #[tabled(rename = "bot")]
    id: String,
    state: String,
    order: String,
}

impl From<&BotView> for BotRow {
    fn from(b: &BotView) -> Self {
        Self {
            id: format!("#{}", b.id),
            state: b.state.clone(),
            order: b
                .current_order_id
                .map(|id| format!("#{}", id))
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

#[derive(Deserialize)]
struct StatusView {
    pending: Vec<OrderView>,
    processing: Vec<OrderView>,
    complete: Vec<OrderView>,
    bots: Vec<BotView>,
    processing_duration_ms: u64,
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

fn print_orders(title: &str, orders: &[OrderView]) {
    println!("{} ({})", title.cyan().bold(), orders.len());
    if orders.is_empty() {
        println!("  {}", "none".dimmed());
    } else {
        let rows: Vec<OrderRow> = orders.iter().map(OrderRow::from).collect();
        println!("{}", Table::new(rows));
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Order { class } => {
            let params = json!({ "class": class });

            let result = call_rpc(&cli.rpc_url, "order.submit.v1", params).await?;
            let submit_result: SubmitResult = serde_json::from_value(result)?;

            println!("{}", "✓ Order submitted".green().bold());
            println!();
            println!("{}", Table::new(vec![submit_result]));
        }

        Commands::AddBot => {
            let result = call_rpc(&cli.rpc_url, "bot.add.v1", json!({})).await?;
            println!("{}", format!("✓ Bot #{} added", result["bot_id"]).green().bold());
        }

        Commands::RemoveBot => {
            let result = call_rpc(&cli.rpc_url, "bot.remove.v1", json!({})).await?;

            if !result["removed"].as_bool().unwrap_or(false) {
                println!("{}", "No bots to remove".yellow());
                return Ok(());
            }

            println!("{}", format!("✓ Bot #{} removed", result["bot_id"]).green().bold());
            if let Some(order_id) = result["requeued_order_id"].as_u64() {
                println!("  {} Order #{} returned to pending", "↺".bold(), order_id);
            }
        }

        Commands::Status => {
            let result = call_rpc(&cli.rpc_url, "dispatch.status.v1", json!({})).await?;
            let status: StatusView = serde_json::from_value(result)?;

            println!("  {} {}", "RPC URL:".bold(), cli.rpc_url);
            println!(
                "  {} {} ms",
                "Processing time:".bold(),
                status.processing_duration_ms
            );
            println!("  {} {} seconds", "Uptime:".bold(), status.uptime_seconds);
            println!();

            print_orders("Pending", &status.pending);
            print_orders("Processing", &status.processing);
            print_orders("Complete", &status.complete);

            println!("{} ({})", "Bots".cyan().bold(), status.bots.len());
            if status.bots.is_empty() {
                println!("  {}", "none".dimmed());
            } else {
                let rows: Vec<BotRow> = status.bots.iter().map(BotRow::from).collect();
                println!("{}", Table::new(rows));
            }
        }

        Commands::Classes => {
            let result = call_rpc(&cli.rpc_url, "dispatch.classes.v1", json!({})).await?;
            let classes: Vec<ClassRow> = serde_json::from_value(result)?;
            println!("{}", Table::new(classes));
        }
    }

    Ok(())
}
