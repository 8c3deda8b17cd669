use anyhow::Result;
use clap::{Parser, Subcommand};
use k8s_toolkit::{
    CheckRunner, ClusterClient, HealthChecker, KubeClusterClient, OutputFormat, Settings,
    default_checks, render,
};
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[clap(
    name = "k8s-toolkit",
    about = "Kubernetes toolkit for DevOps operations",
    version,
    author
)]
struct Args {
    /// Path to the config file
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to kubeconfig file
    #[clap(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Kubernetes namespace
    #[clap(short, long, global = true)]
    namespace: Option<String>,

    /// Output format
    #[clap(short, long, global = true, value_enum)]
    output: Option<OutputFormat>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check cluster health (API server, nodes, system pods, resources, volumes)
    Health,
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Command::Version => {
            println!("k8s-toolkit version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Health => {
            let mut settings = Settings::load(args.config.as_deref())?;
            if args.kubeconfig.is_some() {
                settings.kubeconfig = args.kubeconfig;
            }
            if args.namespace.is_some() {
                settings.namespace = args.namespace;
            }
            if let Some(output) = args.output {
                settings.output = output;
            }

            let client: Arc<dyn ClusterClient> =
                Arc::new(KubeClusterClient::connect(&settings).await?);
            let checker =
                HealthChecker::new(CheckRunner::new(default_checks(client, &settings)));

            let health = checker.run().await;
            println!("{}", render(&health, settings.output)?);

            let code = health.exit_code();
            if code != 0 {
                info!("Exiting with status {}", code);
                std::process::exit(code);
            }
            Ok(())
        }
    }
}
