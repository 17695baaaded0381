//! pixgate server: signature, IP and size gate for an image-serving API.
//!
//! # Usage
//!
//! ```text
//! SECRET_KEY=... ALLOWED_SIZES=100x100,200x200 pixgate-server
//! pixgate-server signature --key secret --method POST --url /upload --path a.png
//! pixgate-server version
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PIXGATE_CONFIG_PATH` | *(unset)* | TOML configuration file |
//! | `GATEWAY_LISTEN` | `0.0.0.0:3001` | Bind address |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |
//! | `SECRET_KEY` | *(unset)* | Signing key; unset disables the signature gate |
//! | `ALLOWED_IPS` | *(empty)* | Comma-separated client address allowlist |
//! | `ALLOWED_SIZES` | *(empty)* | Comma-separated `WIDTHxHEIGHT` allowlist |
//! | `SIZE_POLICY` | `fail-open` | Handling of malformed `w`/`h` |
//! | `UPLOAD_PATH` | `/upload` | Upload endpoint guarded for `POST` |
//! | `TRUST_FORWARDED_HEADERS` | `false` | Honour `X-Forwarded-For`/`X-Real-IP` |

mod handler;
mod signature;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use pixgate_core::PixGateConfig;
use pixgate_http::GateHttpService;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::handler::GateOnlyHandler;
use crate::signature::SignatureArgs;

/// Server version reported by `version` and the health check.
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "pixgate-server", version = VERSION)]
#[command(about = "Signature, IP and size gate in front of an image-serving API")]
struct Cli {
    /// Configuration file path.
    #[arg(short, long, env = "PIXGATE_CONFIG_PATH", global = true)]
    config: Option<PathBuf>,

    /// Probe the running server's health endpoint and exit.
    #[arg(long)]
    health_check: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the gate server (default).
    Serve,
    /// Print the signature the server expects for a request.
    #[command(visible_alias = "s")]
    Signature(SignatureArgs),
    /// Print the version number.
    #[command(visible_alias = "v")]
    Version,
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Accept connections until Ctrl-C, then wait for in-flight requests.
///
/// Every connection gets its own service copy bound to the TCP peer, which is
/// the address the IP gate sees unless forwarded headers are trusted.
async fn serve(listener: TcpListener, service: GateHttpService<GateOnlyHandler>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => {
                    let conn = http.serve_connection(
                        TokioIo::new(stream),
                        service.with_peer_addr(peer_addr),
                    );
                    let conn = graceful.watch(conn.into_owned());
                    tokio::spawn(async move {
                        if let Err(e) = conn.await {
                            debug!(%peer_addr, error = %e, "connection closed with error");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "accept failed"),
            },
            _ = &mut ctrl_c => break,
        }
    }

    info!("shutdown requested, draining gate connections");
    graceful.shutdown().await;
    Ok(())
}

/// Probe `/healthcheck` on a running gate over loopback.
///
/// The probe passes the IP gate like any client, so a restricted allowlist
/// must include the loopback address.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request =
        format!("GET /healthcheck HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains("\"Ok\"") {
        Ok(())
    } else if response.contains("403 Forbidden") {
        anyhow::bail!(
            "health endpoint at {addr} rejected the probe; allow 127.0.0.1 in ALLOWED_IPS"
        )
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

/// Address to probe for a server bound to `listen`.
fn probe_addr(listen: &str) -> String {
    listen.replace("0.0.0.0", "127.0.0.1")
}

async fn run_server(config: PixGateConfig) -> Result<()> {
    init_tracing(&config.log_level)?;

    let security = &config.security;
    info!(
        signing_enabled = security.signing_enabled(),
        allowed_ips = security.allowed_ips.len(),
        allowed_sizes = security.allowed_sizes.len(),
        size_policy = %security.size_policy,
        upload_path = %security.upload_path,
        trust_forwarded_headers = security.trust_forwarded_headers,
        "initializing gate pipeline",
    );

    let service = GateHttpService::new(Arc::new(GateOnlyHandler), security);

    let addr: SocketAddr = config
        .gateway_listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, version = VERSION, "starting pixgate server");

    serve(listener, service).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Version) => {
            println!("pixgate {VERSION}");
            return Ok(());
        }
        Some(Command::Signature(args)) => {
            return signature::run(&args, &mut std::io::stdout().lock());
        }
        Some(Command::Serve) | None => {}
    }

    let config =
        PixGateConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    // Docker HEALTHCHECK.
    if cli.health_check {
        if let Err(e) = run_health_check(&probe_addr(&config.gateway_listen)).await {
            eprintln!("{e:#}");
            std::process::exit(1);
        }
        return Ok(());
    }

    run_server(config).await
}
