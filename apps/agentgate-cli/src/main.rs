use agentgate_api::Settings;
use agentgate_discovery::ScanRequest;
use agentgate_kernel::Gateway;
use agentgate_protocol::{Message, ThreadId};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "agentgate")]
#[command(about = "Drive the agentgate gateway from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Command,
    #[command(flatten)]
    settings: Settings,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the local address and the subnet a scan would target.
    Network {
        #[arg(long)]
        subnet: Option<String>,
    },
    /// Probe a subnet for JSON-RPC and device-REST servers.
    Scan {
        #[arg(long)]
        subnet: Option<String>,
        #[arg(long, default_value = "80,8000,8080,8090")]
        ports: String,
        #[arg(long, default_value_t = 1.2)]
        timeout: f64,
        #[arg(long, default_value_t = 64)]
        max_hosts: i64,
        /// Register what was found in this process's registry.
        #[arg(long)]
        save: bool,
        #[arg(long, default_value = "discovered")]
        prefix: String,
    },
    /// List the servers configured through the environment.
    Servers,
    /// Run one agent turn and print the answer.
    Ask {
        message: String,
        #[arg(long, default_value = "default")]
        thread: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let (builder, _warnings) = cli.settings.builder();
    let gateway = builder.build();

    run(&gateway, cli.command).await
}

async fn run(gateway: &Gateway, command: Command) -> Result<()> {
    match command {
        Command::Network { subnet } => {
            let info = gateway
                .network_info(subnet.as_deref())
                .context("reading network info")?;
            print_json(&info)
        }
        Command::Scan {
            subnet,
            ports,
            timeout,
            max_hosts,
            save,
            prefix,
        } => {
            let request = ScanRequest {
                subnet_cidr: subnet.unwrap_or_default(),
                ports_csv: ports,
                timeout_seconds: timeout,
                max_hosts,
                save,
                name_prefix: prefix,
            };
            let result = gateway.scan(request).await.context("scanning subnet")?;
            info!(found = result.found_count, scan_ms = result.scan_ms, "scan finished");
            print_json(&result)
        }
        Command::Servers => print_json(&json!({ "servers": gateway.registry().list() })),
        Command::Ask { message, thread } => {
            let thread_id = ThreadId::from_string(thread);
            let outcome = gateway
                .invoke(vec![Message::user(message)], thread_id.clone())
                .await
                .context("running agent turn")?;
            print_json(&json!({
                "response": outcome.response,
                "thread_id": thread_id,
                "messages": outcome.messages,
            }))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("rendering output")?;
    println!("{rendered}");
    Ok(())
}
