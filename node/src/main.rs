use anyhow::{Context, Result};
use clap::{Arg, Command};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fsp_chain::RpcClient;
use fsp_contracts::Contracts;
use fsp_epoch::ChainId;
use fsp_observer::{Notifier, Observer};

mod settings;

use settings::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("fsp-observer")
        .about("Liveness and correctness observer for Flare systems-protocol voters")
        .arg(
            Arg::new("metrics-port")
                .long("metrics-port")
                .value_name("PORT")
                .help("Port for the Prometheus exporter (overrides METRICS_PORT)"),
        )
        .arg(
            Arg::new("avg-block-time")
                .long("avg-block-time")
                .value_name("SECONDS")
                .help("Assumed block cadence for the bootstrap search (overrides AVG_BLOCK_TIME)"),
        )
        .get_matches();

    let mut config = AppConfig::load()?;
    if let Some(port) = matches.get_one::<String>("metrics-port") {
        config.metrics_port = port.parse().context("--metrics-port must be a port")?;
    }
    if let Some(secs) = matches.get_one::<String>("avg-block-time") {
        config.avg_block_time = secs.parse().context("--avg-block-time must be seconds")?;
    }

    init_logging(&config);
    init_metrics(&config);

    let client = RpcClient::new(&config.rpc_url)?;
    let chain_id = client
        .chain_id()
        .await
        .with_context(|| format!("unable to reach rpc at {}", config.rpc_url))?;
    let chain = ChainId::try_from(chain_id)?;
    info!(
        chain = chain.name(),
        identity = %config.identity_address,
        "starting observer"
    );

    let contracts = Contracts::resolve(&client)
        .await
        .context("resolving contract manifest")?;
    let notifier = Notifier::from_settings(&config.notifications);
    if notifier.sink_count() == 0 {
        info!("no notification sinks configured; messages go to the log only");
    }

    let observer = Observer::new(
        client,
        contracts,
        chain,
        config.identity_address,
        notifier,
        config.avg_block_time,
    );

    tokio::select! {
        result = observer.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(())
        }
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_metrics(config: &AppConfig) {
    let listener = ([0, 0, 0, 0], config.metrics_port);
    match PrometheusBuilder::new().with_http_listener(listener).install() {
        Ok(()) => {
            fsp_observer::metrics::describe();
            info!(port = config.metrics_port, "prometheus exporter listening");
        }
        Err(err) => {
            warn!("failed to start prometheus exporter: {err}");
        }
    }
}
