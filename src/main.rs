//! Application Operator - Argo CD Applications on behalf of tenants

use clap::Parser;
use kube::{Client, CustomResourceExt};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application_operator::config::{OperatorConfig, DEFAULT_DESTINATION_SERVER};
use application_operator::controller;
use application_operator::crd::Application;

/// Application Operator - keeps Argo CD Applications in sync with ops.csas.cz Applications
#[derive(Parser, Debug)]
#[command(name = "application-operator", version, about, long_about = None)]
struct Cli {
    /// Generate the Application CRD manifest and exit
    #[arg(long)]
    crd: bool,

    /// Namespace Argo CD Applications are created in (usually Argo CD's own)
    #[arg(long, env = "TARGET_NAMESPACE")]
    target_namespace: Option<String>,

    /// API server URL used as the Argo CD destination
    #[arg(long, env = "DESTINATION_SERVER", default_value = DEFAULT_DESTINATION_SERVER)]
    destination_server: Option<String>,

    /// Value for the app.kubernetes.io/managed-by label on created Applications
    #[arg(long, env = "OPERATOR_NAME")]
    operator_name: Option<String>,

    /// Only watch owners in this namespace (default: all namespaces)
    #[arg(long, env = "WATCH_NAMESPACE")]
    watch_namespace: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        eprintln!("CRITICAL: Failed to install crypto provider: {:?}", e);
        std::process::exit(1);
    }

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if cli.crd {
        let crd = serde_yaml::to_string(&Application::crd())
            .map_err(|e| anyhow::anyhow!("Failed to serialize CRD: {}", e))?;
        println!("{crd}");
        return Ok(());
    }

    let config = OperatorConfig::new(
        cli.target_namespace,
        cli.destination_server,
        cli.operator_name,
        cli.watch_namespace,
    )?;

    tracing::info!("Application operator starting...");

    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create Kubernetes client: {}", e))?;

    controller::run(client, config).await;

    tracing::info!("Application operator shutting down");
    Ok(())
}
