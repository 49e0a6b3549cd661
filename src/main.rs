use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use routeshot::config::{Args, Config};
use routeshot::directions::DirectionsClient;
use routeshot::{api, Pipeline, Snapshotter};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Args::parse()).await {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = Config::from_args(args)?;
    config.log();

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    let local = listener.local_addr()?;

    let directions = DirectionsClient::new(config.directions.clone())?;
    if !directions.has_access_token() {
        log::warn!("No directions API access token configured; image requests will fail");
    }

    let pipeline = Pipeline::new(
        directions,
        config.scene.clone(),
        snapshotter(&config)?,
        render_base(local).parse()?,
    )
    .with_archive_dir(config.archive_dir.clone());

    let router = api::router::router(api::AppState::new(pipeline), config.leaflet_dir.as_deref());

    log::info!("Listening on http://{local}");
    api::serve(listener, router).await?;

    Ok(())
}

/// Address the local browser uses to reach this server
fn render_base(local: SocketAddr) -> String {
    let host = if local.ip().is_unspecified() {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    } else {
        local.ip()
    };
    format!("http://{}", SocketAddr::new(host, local.port()))
}

#[cfg(feature = "cdp")]
fn snapshotter(config: &Config) -> anyhow::Result<Arc<dyn Snapshotter>> {
    Ok(Arc::new(routeshot::cdp::CdpSnapshotter::new(config.snapshot.clone())))
}

#[cfg(not(feature = "cdp"))]
fn snapshotter(_config: &Config) -> anyhow::Result<Arc<dyn Snapshotter>> {
    anyhow::bail!("routeshot was built without a browser backend; enable the `cdp` feature")
}
