use std::path::Path;
use std::sync::Arc;
use strata_proxy::config::ProxyConfig;
use strata_proxy::keyexchange::KeyExchange;
use strata_proxy::reconstruction::{run_reconstruction, ReconstructionSettings, WorldEvent};
use strata_proxy::relay::{serve_connection, ProxyContext};
use strata_proxy::save::{run_save_worker, SaveMessage, SaveSettings};
use strata_region::WorldStorage;
use strata_registry::RegistryLoader;
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting strata...");

    let config = Arc::new(ProxyConfig::load(Path::new("config/strata.toml"))?);
    info!(
        "Config loaded: local port {}, remote {}:{}, output {}",
        config.local_port,
        config.remote_host,
        config.remote_port,
        config.output_dir.display()
    );

    let loader = Arc::new(RegistryLoader::new(&config.registry_dir));
    loader.verify()?;
    let keys = KeyExchange::generate()?;

    // Save worker, fed by reconstruction. Both run on blocking threads.
    let mut workers = Vec::new();
    let world_tx = if config.write_chunks {
        let storage = WorldStorage::new(&config.output_dir)?;
        let (save_tx, save_rx) = mpsc::channel::<SaveMessage>(config.save_queue);
        let save_settings = SaveSettings::from_config(&config);
        let runtime = Handle::current();
        workers.push(tokio::task::spawn_blocking(move || {
            run_save_worker(save_rx, storage, save_settings, runtime)
        }));

        let (world_tx, world_rx) = mpsc::channel::<WorldEvent>(config.chunk_queue);
        let settings = ReconstructionSettings {
            cache_radius: config.cache_radius(),
            level_name: config.remote_host.clone(),
            seed: config.seed,
            world_gen: config.enable_world_gen,
        };
        workers.push(tokio::task::spawn_blocking(move || {
            run_reconstruction(world_rx, Some(save_tx), settings)
        }));
        Some(world_tx)
    } else {
        info!("Chunk writing disabled, relaying only");
        None
    };

    let (fatal_tx, mut fatal_rx) = mpsc::channel(1);
    let ctx = Arc::new(ProxyContext::new(
        config.clone(),
        loader,
        keys,
        world_tx,
        fatal_tx,
    ));

    let listener = TcpListener::bind(("0.0.0.0", config.local_port)).await?;
    info!("Listening on 0.0.0.0:{}", config.local_port);

    let outcome = tokio::select! {
        _ = accept_loop(listener, ctx.clone()) => Ok(()),
        Some(e) = fatal_rx.recv() => Err(e),
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            Ok(())
        }
    };

    // Dropping the last sender lets the workers flush and stop.
    drop(ctx);
    for worker in workers {
        if let Err(e) = worker.await {
            warn!("Worker ended abnormally: {}", e);
        }
    }
    outcome
}

/// One client at a time: the next connection is accepted once the current
/// one has been torn down.
async fn accept_loop(listener: TcpListener, ctx: Arc<ProxyContext>) {
    loop {
        match listener.accept().await {
            Ok((socket, peer)) => {
                info!("New connection from {}", peer);
                match serve_connection(socket, ctx.clone()).await {
                    Ok(()) => info!("Connection {} closed", peer),
                    Err(e) => warn!("Connection {} ended: {:#}", peer, e),
                }
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
