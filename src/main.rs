use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use crack_master::config::{DispatchPolicy, MasterConfig};
use crack_master::keyspace::Keyspace;
use crack_master::master::Master;
use crack_master::model::HashReport;
use crack_master::shutdown::shutdown_token;

#[derive(Parser, Debug)]
#[command(name = "crack-master")]
#[command(version)]
#[command(about = "Coordinator for distributed MD5 phone-number cracking")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Start the master server
    Server(ServerArgs),

    /// Worker registry commands
    Worker {
        #[command(flatten)]
        client: ClientArgs,

        #[command(subcommand)]
        command: WorkerCommands,
    },

    /// Hash submission and progress commands
    Hash {
        #[command(flatten)]
        client: ClientArgs,

        #[command(subcommand)]
        command: HashCommands,
    },
}

// =============================================================================
// Server Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ServerArgs {
    /// Port the master API listens on
    #[arg(long, default_value = "5000")]
    port: u16,

    /// Path of the SQLite database file
    #[arg(long, default_value = "MasterCracker.db")]
    db: PathBuf,

    /// Seconds between worker health-check passes
    #[arg(long, default_value = "10")]
    health_interval: u64,

    /// Seconds between periodic dispatch passes
    #[arg(long, default_value = "30")]
    dispatch_interval: u64,

    /// Seconds between in-flight job reconciliation scans
    #[arg(long, default_value = "30")]
    scan_interval: u64,

    /// Consecutive failed probes before a worker is marked unavailable
    #[arg(long, default_value = "5")]
    failure_threshold: u32,

    /// Timeout in seconds for health probes and status queries
    #[arg(long, default_value = "3")]
    probe_timeout: u64,

    /// Timeout in seconds for pushing a job to a worker
    #[arg(long, default_value = "5")]
    push_timeout: u64,

    /// Candidate passwords per job
    #[arg(long, default_value = "100000")]
    passwords_per_job: u64,

    /// Search the keyspace in plain numeric order instead of the
    /// popularity-ordered prefix ranges
    #[arg(long)]
    numeric_order: bool,

    /// What a dispatch pass does when no worker accepts a job
    #[arg(long, value_enum, default_value = "stop-on-unplaced")]
    dispatch_policy: DispatchPolicy,
}

// =============================================================================
// Client Arguments
// =============================================================================

#[derive(Parser, Debug)]
struct ClientArgs {
    /// Master address
    #[arg(long, short = 'a', default_value = "http://127.0.0.1:5000")]
    addr: String,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(clap::Subcommand, Debug)]
enum WorkerCommands {
    /// Register a worker with the master
    Add {
        /// Worker IP address
        #[arg(long)]
        ip: IpAddr,

        /// Worker port
        #[arg(long)]
        port: u16,
    },
    /// List registered workers
    List,
}

#[derive(clap::Subcommand, Debug)]
enum HashCommands {
    /// Submit digests to crack
    Submit {
        /// Hex MD5 digests
        digests: Vec<String>,
    },
    /// Show per-hash progress reports
    Reports,
}

// =============================================================================
// Client Response Types
// =============================================================================

#[derive(Deserialize)]
struct RegisterWorkerOutput {
    worker_id: i64,
}

#[derive(Deserialize)]
struct WorkerOutput {
    id: i64,
    address: String,
    status: String,
    last_seen: Option<String>,
    failed_checks: u32,
}

#[derive(Deserialize)]
struct SubmitHashesOutput {
    hashes_added: u64,
    jobs_created: u64,
}

#[derive(Deserialize)]
struct ErrorOutput {
    error: String,
}

// =============================================================================
// Server Implementation
// =============================================================================

async fn run_server(args: ServerArgs) -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let listen_addr: SocketAddr = format!("0.0.0.0:{}", args.port).parse()?;
    let keyspace = if args.numeric_order {
        Keyspace::numeric()
    } else {
        Keyspace::priority()
    };

    let config = MasterConfig {
        listen_addr,
        db_path: args.db,
        health_check_interval: Duration::from_secs(args.health_interval),
        dispatch_interval: Duration::from_secs(args.dispatch_interval),
        scan_interval: Duration::from_secs(args.scan_interval),
        failure_threshold: args.failure_threshold,
        probe_timeout: Duration::from_secs(args.probe_timeout),
        push_timeout: Duration::from_secs(args.push_timeout),
        passwords_per_job: args.passwords_per_job,
        keyspace,
        dispatch_policy: args.dispatch_policy,
    };

    tracing::info!(
        listen_addr = %config.listen_addr,
        db = %config.db_path.display(),
        passwords_per_job = config.passwords_per_job,
        "Starting crack-master"
    );

    let master = Arc::new(Master::new(config)?);
    master.run(shutdown_token()).await?;
    Ok(())
}

// =============================================================================
// Client Command Handlers
// =============================================================================

async fn fail_from_response(response: reqwest::Response) -> Box<dyn std::error::Error> {
    let status = response.status();
    match response.json::<ErrorOutput>().await {
        Ok(body) => format!("{}: {}", status, body.error).into(),
        Err(_) => format!("request failed with status {status}").into(),
    }
}

async fn handle_worker_add(
    client: &ClientArgs,
    ip: IpAddr,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = reqwest::Client::new()
        .post(format!("{}/workers", client.addr))
        .json(&serde_json::json!({ "ip": ip, "port": port }))
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(fail_from_response(response).await);
    }
    let output: RegisterWorkerOutput = response.json().await?;
    match client.output {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "worker_id": output.worker_id }))
        }
        OutputFormat::Table => {
            println!("Worker registered!");
            println!("Worker ID: {}", output.worker_id);
        }
    }
    Ok(())
}

async fn handle_worker_list(client: &ClientArgs) -> Result<(), Box<dyn std::error::Error>> {
    let response = reqwest::Client::new()
        .get(format!("{}/workers", client.addr))
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(fail_from_response(response).await);
    }
    let workers: Vec<WorkerOutput> = response.json().await?;
    match client.output {
        OutputFormat::Json => {
            let rows: Vec<_> = workers
                .iter()
                .map(|w| {
                    serde_json::json!({
                        "id": w.id,
                        "address": w.address,
                        "status": w.status,
                        "last_seen": w.last_seen,
                        "failed_checks": w.failed_checks,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        OutputFormat::Table => {
            println!(
                "{:<6} {:<22} {:<12} {:<26} FAILED",
                "ID", "ADDRESS", "STATUS", "LAST SEEN"
            );
            println!("{}", "-".repeat(75));
            for w in workers {
                println!(
                    "{:<6} {:<22} {:<12} {:<26} {}",
                    w.id,
                    w.address,
                    w.status,
                    w.last_seen.as_deref().unwrap_or("never"),
                    w.failed_checks
                );
            }
        }
    }
    Ok(())
}

async fn handle_hash_submit(
    client: &ClientArgs,
    digests: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    if digests.is_empty() {
        return Err("no digests given".into());
    }
    let response = reqwest::Client::new()
        .post(format!("{}/hashes", client.addr))
        .json(&serde_json::json!({ "hashes": digests }))
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(fail_from_response(response).await);
    }
    let output: SubmitHashesOutput = response.json().await?;
    match client.output {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({
                "hashes_added": output.hashes_added,
                "jobs_created": output.jobs_created,
            })
        ),
        OutputFormat::Table => {
            println!("Hashes submitted!");
            println!("New hashes: {}", output.hashes_added);
            println!("Jobs created: {}", output.jobs_created);
        }
    }
    Ok(())
}

async fn handle_hash_reports(client: &ClientArgs) -> Result<(), Box<dyn std::error::Error>> {
    let response = reqwest::Client::new()
        .get(format!("{}/hash-reports", client.addr))
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(fail_from_response(response).await);
    }
    let reports: Vec<HashReport> = response.json().await?;
    match client.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Table => {
            println!(
                "{:<34} {:<12} {:<14} PROGRESS",
                "DIGEST", "STATUS", "PLAINTEXT"
            );
            println!("{}", "-".repeat(72));
            for r in reports {
                let progress = match (r.completed_jobs, r.total_jobs) {
                    (Some(done), Some(total)) => format!("{done}/{total}"),
                    _ => "-".to_string(),
                };
                println!(
                    "{:<34} {:<12} {:<14} {}",
                    r.digest,
                    r.status,
                    r.plaintext.as_deref().unwrap_or("-"),
                    progress
                );
            }
        }
    }
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    match args.command {
        Commands::Server(server_args) => {
            run_server(server_args).await?;
        }
        Commands::Worker { client, command } => match command {
            WorkerCommands::Add { ip, port } => {
                handle_worker_add(&client, ip, port).await?;
            }
            WorkerCommands::List => {
                handle_worker_list(&client).await?;
            }
        },
        Commands::Hash { client, command } => match command {
            HashCommands::Submit { digests } => {
                handle_hash_submit(&client, digests).await?;
            }
            HashCommands::Reports => {
                handle_hash_reports(&client).await?;
            }
        },
    }

    Ok(())
}
