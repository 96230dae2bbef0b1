// worldd - world server stub
//
// Answers the realm server's keepalive polls and the "this guy wanna play"
// player-handoff notification. The actual game simulation is out of scope;
// this binary exists so the keepalive protocol has a real peer to dial.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use realm_shared::config::get_config;
use realm_shared::keepalive::KeepaliveFrame;
use realm_shared::log::initialize_logging;

#[derive(Parser, Debug)]
#[command(name = "worldd")]
#[command(about = "World server keepalive stub")]
#[command(version)]
struct Args {
    /// Path to the world server configuration file
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    {
        let mut config = get_config().lock();
        if !config.set_source(&args.config, "Worldd_") {
            eprintln!("Could not find configuration file {}.", args.config);
            return Err(anyhow::anyhow!("configuration file not found"));
        }
    }

    let log_dir = {
        let config = get_config().lock();
        let dir = config.get_string_default("log", "dir", "");
        if dir.is_empty() { None } else { Some(dir) }
    };
    let log_level = {
        let config = get_config().lock();
        config.get_string_default("log", "level", "info")
    };
    initialize_logging(log_dir.as_deref(), &log_level, "worldd");

    tracing::info!("world server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("using configuration file: {}", args.config);

    let game_port = {
        let config = get_config().lock();
        if !config.is_set("net", "game_port") {
            tracing::error!("missing required configuration key [net].game_port");
            return Err(anyhow::anyhow!("missing required configuration key [net].game_port"));
        }
        config.get_int_default("net", "game_port", 0)
    };
    let bind_ip = {
        let config = get_config().lock();
        config.get_string_default("net", "bind_ip", "0.0.0.0")
    };
    let realm_comm_port = {
        let config = get_config().lock();
        if !config.is_set("realm", "comm_port") {
            tracing::error!("missing required configuration key [realm].comm_port");
            return Err(anyhow::anyhow!("missing required configuration key [realm].comm_port"));
        }
        config.get_int_default("realm", "comm_port", 0)
    };
    let realm_address = {
        let config = get_config().lock();
        if !config.is_set("realm", "address") {
            tracing::error!("missing required configuration key [realm].address");
            return Err(anyhow::anyhow!("missing required configuration key [realm].address"));
        }
        config.get_string("realm", "address")
    };
    tracing::debug!(
        "expecting keepalive polls from realm server at {}:{}",
        realm_address, realm_comm_port
    );

    let bind_addr = format!("{}:{}", bind_ip, game_port);
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening for keepalive connections on {}", bind_addr);

    // Whether this process currently answers "alive" to a keepalive ping.
    // Defaults true; nothing in this repo ever flips it false, but the wire
    // format supports it and the realm-side client understands both replies.
    let alive = Arc::new(AtomicBool::new(true));
    let realm_address = Arc::new(realm_address);

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        let alive = alive.clone();
                        let realm_address = realm_address.clone();
                        tokio::spawn(async move {
                            handle_keepalive_connection(stream, addr, alive, realm_address).await;
                        });
                    }
                    Err(e) => {
                        tracing::error!("failed to accept connection: {}", e);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down...");
                break;
            }
        }
    }

    Ok(())
}

async fn handle_keepalive_connection(
    mut stream: tokio::net::TcpStream,
    addr: std::net::SocketAddr,
    alive: Arc<AtomicBool>,
    expected_realm_address: Arc<String>,
) {
    if addr.ip().to_string() != *expected_realm_address {
        tracing::debug!(
            "rejecting keepalive connection from {}, expected realm at {}",
            addr, expected_realm_address
        );
        return;
    }

    let mut leading = [0u8; 2];
    if stream.read_exact(&mut leading).await.is_err() {
        return;
    }
    if leading[0] != realm_shared::keepalive::LEADING_BYTE {
        tracing::debug!("unexpected frame from {}, closing", addr);
        return;
    }

    match KeepaliveFrame::decode(&leading[1..]) {
        Some(KeepaliveFrame::AreYouAlive) => {
            let reply = if alive.load(Ordering::SeqCst) {
                KeepaliveFrame::YesIAmAlive
            } else {
                KeepaliveFrame::NoIAmDead
            };
            let _ = stream.write_all(&reply.encode()).await;
        }
        other => {
            tracing::debug!("unhandled keepalive frame {:?} from {}", other, addr);
        }
    }
}
