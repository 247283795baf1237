//! shortwire demo: point-to-point chat over a TCP stand-in transport
//!
//! One terminal listens, another dials. Stdin lines go down the stream;
//! received bytes are printed as text, or hex when they are not UTF-8.

mod net;

use std::error::Error;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

use shortwire_core::{LinkConfig, LinkEvent};
use shortwire_link::LinkManager;

use crate::net::TcpTransport;

#[derive(Parser)]
#[command(name = "shortwire", about = "Point-to-point stream link demo")]
struct Cli {
    /// Increase log verbosity
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Wait for one inbound connection
    Listen {
        /// Local address to listen on
        #[arg(long, default_value = "127.0.0.1:7100")]
        bind: String,
    },
    /// Connect to a listening peer
    Dial {
        /// Peer address, e.g. 127.0.0.1:7100
        peer: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if let Err(e) = run(cli.command).await {
        error!("{e}");
        std::process::exit(1);
    }
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}

async fn run(command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Listen { bind } => {
            let transport = Arc::new(TcpTransport::new(bind.parse()?));
            let (manager, events) = LinkManager::new(transport, LinkConfig::default());
            manager.listen()?;
            info!(%bind, "waiting for a peer");
            chat(manager, events).await
        }
        Command::Dial { peer } => {
            let transport = Arc::new(TcpTransport::new("127.0.0.1:0".parse()?));
            let (manager, events) = LinkManager::new(transport, LinkConfig::default());
            manager.dial(&peer)?;
            info!(%peer, "dialing");
            chat(manager, events).await
        }
    }
}

/// Pump stdin into the link and link events onto the terminal until either
/// side goes away.
async fn chat(
    manager: LinkManager,
    mut events: UnboundedReceiver<LinkEvent>,
) -> Result<(), Box<dyn Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                None => break,
                Some(LinkEvent::Connected { peer }) => info!(%peer, "connected"),
                Some(LinkEvent::DataReceived { data, .. }) => println!("<< {}", render(&data)),
                Some(LinkEvent::DataSent { len }) => debug!(len, "sent"),
                Some(LinkEvent::WriteFailed { reason }) => warn!(%reason, "send failed"),
                Some(LinkEvent::Disconnected { peer, reason }) => {
                    warn!(%peer, %reason, "disconnected");
                    break;
                }
                Some(LinkEvent::AcceptFailed { reason }) => {
                    error!(%reason, "accept failed");
                    break;
                }
                Some(LinkEvent::ConnectFailed { peer, reason }) => {
                    error!(%peer, %reason, "connect failed");
                    break;
                }
            },
            line = lines.next_line() => match line? {
                Some(line) => {
                    if !line.is_empty() {
                        if let Err(e) = manager.send(line.as_bytes()).await {
                            warn!(reason = %e, "not sent");
                        }
                    }
                }
                None => break,
            },
        }
    }
    manager.stop().await;
    Ok(())
}

/// Text payloads print as-is; anything else falls back to hex.
fn render(data: &[u8]) -> String {
    match std::str::from_utf8(data) {
        Ok(text) => text.to_string(),
        Err(_) => hex::encode(data),
    }
}
