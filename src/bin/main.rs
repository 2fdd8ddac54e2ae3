use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use eyre::WrapErr;
use listenfd::ListenFd;
use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tiny_http_files::config::Config;
use tiny_http_files::infrastructure::server_impl::server::serve;
use tiny_http_files::AnyResult;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "tiny_http_files=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> AnyResult<()> {
    let server_data = Arc::new(config.validate()?);
    let listener = bind(&config).await?;

    info!(address = %listener.local_addr()?, "listening for connections");
    info!(directory = %server_data.directory.display(), "serving files");

    tokio::select! {
        res = serve(listener, server_data) => res,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            Ok(())
        }
    }
}

/// Reuses a socket handed over by the parent process (systemfd and friends),
/// otherwise binds `host:port`.
async fn bind(config: &Config) -> AnyResult<TcpListener> {
    let mut listenfd = ListenFd::from_env();
    if let Some(inherited) = listenfd.take_tcp_listener(0)? {
        inherited.set_nonblocking(true)?;
        return Ok(TcpListener::from_std(inherited)?);
    }

    let address = config.address();
    TcpListener::bind(&address)
        .await
        .wrap_err_with(|| format!("failed to bind to {address}"))
}
