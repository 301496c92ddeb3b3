//! Docpipe CLI - submit documents and follow their jobs

use anyhow::{Context, Result};
use base64::Engine as _;
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9627";

#[derive(Parser)]
#[command(name = "docpipe-cli")]
#[command(about = "Docpipe document pipeline CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "DOCPIPE_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a PDF for processing
    Submit {
        /// Path to the PDF
        path: PathBuf,

        /// Extraction strategy (fast-local, ai-vision)
        #[arg(short, long, default_value = "fast-local")]
        strategy: String,

        /// Poll until the job finishes and print the result
        #[arg(short, long)]
        wait: bool,
    },

    /// Show a job's current state
    Status {
        /// Job ID
        job_id: String,

        /// Print extracted content as well as the summary
        #[arg(long)]
        content: bool,
    },

    /// Poll a job until it completes or fails
    Wait {
        /// Job ID
        job_id: String,

        /// Poll interval in milliseconds
        #[arg(long, default_value = "500")]
        interval_ms: u64,

        /// Give up after this many seconds
        #[arg(long, default_value = "300")]
        timeout_secs: u64,
    },

    /// Show system statistics
    Stats,
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
    job_id: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct JobStatus {
    job_id: String,
    state: String,
    strategy: String,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    progress: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    error: Option<String>,
    attempts: i32,
}

impl JobStatus {
    fn is_terminal(&self) -> bool {
        matches!(self.state.as_str(), "completed" | "error")
    }
}

#[derive(Tabled)]
struct StatusRow {
    job_id: String,
    state: String,
    strategy: String,
    filename: String,
    progress: String,
    attempts: i32,
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

async fn fetch_status(url: &str, job_id: &str) -> Result<JobStatus> {
    let result = call_rpc(url, "doc.status.v1", json!({ "job_id": job_id })).await?;
    Ok(serde_json::from_value(result)?)
}

async fn wait_for(url: &str, job_id: &str, interval: Duration, timeout: Duration) -> Result<JobStatus> {
    let started = Instant::now();
    let mut last_progress = None;

    loop {
        let status = fetch_status(url, job_id).await?;
        if status.is_terminal() {
            return Ok(status);
        }
        if status.progress != last_progress {
            if let Some(progress) = &status.progress {
                println!("  {} {}", "…".dimmed(), progress);
            }
            last_progress = status.progress.clone();
        }
        if started.elapsed() >= timeout {
            anyhow::bail!(
                "Job {} still {} after {}s",
                job_id,
                status.state,
                timeout.as_secs()
            );
        }
        tokio::time::sleep(interval).await;
    }
}

fn print_status(status: &JobStatus, show_content: bool) {
    let row = StatusRow {
        job_id: status.job_id.clone(),
        state: status.state.clone(),
        strategy: status.strategy.clone(),
        filename: status.filename.clone().unwrap_or_default(),
        progress: status.progress.clone().unwrap_or_default(),
        attempts: status.attempts,
    };
    println!("{}", Table::new(vec![row]));

    match status.state.as_str() {
        "completed" => {
            println!();
            println!("{}", "Summary".cyan().bold());
            println!("{}", status.summary.as_deref().unwrap_or(""));
            if show_content {
                println!();
                println!("{}", "Content".cyan().bold());
                println!("{}", status.content.as_deref().unwrap_or(""));
            }
        }
        "error" => {
            println!();
            println!(
                "{} {}",
                "Error:".red().bold(),
                status.error.as_deref().unwrap_or("unknown")
            );
        }
        _ => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Submit {
            path,
            strategy,
            wait,
        } => {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(str::to_string);

            let params = json!({
                "document_base64": base64::engine::general_purpose::STANDARD.encode(&bytes),
                "strategy": strategy,
                "filename": filename,
            });

            let result = call_rpc(&cli.rpc_url, "doc.submit.v1", params).await?;
            let submit_result: SubmitResult = serde_json::from_value(result)?;
            let job_id = submit_result.job_id.clone();

            println!("{}", "✓ Document submitted".green().bold());
            println!();
            println!("{}", Table::new(vec![submit_result]));

            if wait {
                println!();
                let status = wait_for(
                    &cli.rpc_url,
                    &job_id,
                    Duration::from_millis(500),
                    Duration::from_secs(300),
                )
                .await?;
                print_status(&status, true);
            }
        }

        Commands::Status { job_id, content } => {
            let status = fetch_status(&cli.rpc_url, &job_id).await?;
            print_status(&status, content);
        }

        Commands::Wait {
            job_id,
            interval_ms,
            timeout_secs,
        } => {
            let status = wait_for(
                &cli.rpc_url,
                &job_id,
                Duration::from_millis(interval_ms),
                Duration::from_secs(timeout_secs),
            )
            .await?;
            print_status(&status, true);
            if status.state == "error" {
                std::process::exit(1);
            }
        }

        Commands::Stats => {
            println!("{}", "System Status".cyan().bold());
            println!();

            match call_rpc(&cli.rpc_url, "admin.stats.v1", json!({})).await {
                Ok(stats) => {
                    println!("  {} {}", "RPC URL:".bold(), cli.rpc_url);
                    println!("  {} {}", "Status:".bold(), "ONLINE".green());
                    println!();
                    println!("  {} {}", "Total Jobs:".bold(), stats["total_jobs"]);
                    println!("  {} {}", "Pending:".bold(), stats["pending_jobs"]);
                    println!("  {} {}", "Processing:".bold(), stats["processing_jobs"]);
                    println!("  {} {}", "Completed:".bold(), stats["completed_jobs"]);
                    println!("  {} {}", "Error:".bold(), stats["error_jobs"]);
                    println!("  {} {}", "Queue Depth:".bold(), stats["queue_depth"]);
                    println!();
                    println!("  {} {} seconds", "Uptime:".bold(), stats["uptime_seconds"]);
                }
                Err(e) => {
                    println!("  {} {}", "Status:".bold(), "ERROR".red());
                    println!("  {} {}", "Error:".bold(), e);
                }
            }
        }
    }

    Ok(())
}
