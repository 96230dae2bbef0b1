// realmd - realm authentication server
//
// Handles SRP6 login and realm-list distribution for game clients, and
// polls each configured world server for liveness over a private keepalive
// protocol. Realms are a fixed snapshot read from config at startup; there
// is no live realm registration.

mod auth_codes;
mod auth_socket;
mod keepalive_client;
mod protocol;
mod realm_list;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use realm_shared::config::get_config;
use realm_shared::credential_store::SqlCredentialStore;
use realm_shared::database::Database;
use realm_shared::log::initialize_logging;

use realm_list::RealmList;

#[derive(Parser, Debug)]
#[command(name = "realmd")]
#[command(about = "Realm authentication server")]
#[command(version)]
struct Args {
    /// Path to the realm server configuration file
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    {
        let mut config = get_config().lock();
        if !config.set_source(&args.config, "Realmd_") {
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
    initialize_logging(log_dir.as_deref(), &log_level, "realmd");

    tracing::info!("realm server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("using configuration file: {}", args.config);
    tracing::info!("<Ctrl-C> to stop.");

    let mut login_db = Database::new("Login");
    let db_string = {
        let config = get_config().lock();
        config.get_string("default", "LoginDatabaseInfo")
    };
    if db_string.is_empty() {
        tracing::error!("database not specified in configuration");
        return Err(anyhow::anyhow!("database not specified"));
    }
    if let Err(e) = login_db.initialize(&db_string).await {
        tracing::error!("cannot connect to database: {}", e);
        return Err(anyhow::anyhow!("database connection failed"));
    }
    let db = Arc::new(login_db);
    let credentials = Arc::new(SqlCredentialStore::new((*db).clone()));

    let realm_list = {
        let config = get_config().lock();
        Arc::new(RealmList::from_config(&config))
    };
    if realm_list.is_empty() {
        tracing::error!("no realms configured; expected at least one [world*] section");
        return Err(anyhow::anyhow!("no realms configured"));
    }
    tracing::info!("{} realm(s) loaded", realm_list.len());

    let stop_event = Arc::new(AtomicBool::new(false));
    for realm in realm_list.realms() {
        keepalive_client::spawn(realm.clone(), stop_event.clone());
    }

    let ping_interval_minutes = {
        let config = get_config().lock();
        config.get_int_default("default", "MaxPingTime", 30) as u64
    };
    let db_ping = db.clone();
    let stop_ping = stop_event.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(
            ping_interval_minutes * realm_shared::MINUTE as u64,
        ));
        loop {
            interval.tick().await;
            if stop_ping.load(Ordering::SeqCst) {
                break;
            }
            tracing::debug!("pinging database to keep the connection alive");
            if let Err(e) = db_ping.ping().await {
                tracing::error!("database ping failed: {}", e);
            }
        }
    });

    let bind_ip = {
        let config = get_config().lock();
        config.get_string_default("net", "bind_ip", "0.0.0.0")
    };
    let port = {
        let config = get_config().lock();
        if !config.is_set("net", "realm_port") {
            tracing::error!("missing required configuration key [net].realm_port");
            return Err(anyhow::anyhow!("missing required configuration key [net].realm_port"));
        }
        config.get_int_default("net", "realm_port", 0)
    };
    let idle_timeout = {
        let config = get_config().lock();
        tokio::time::Duration::from_secs(config.get_int_default("net", "idle_timeout_secs", 30) as u64)
    };
    let bind_addr = format!("{}:{}", bind_ip, port);
    let listener = TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", bind_addr);

    ctrlc::set_handler({
        let stop_event = stop_event.clone();
        move || {
            tracing::info!("received shutdown signal");
            stop_event.store(true, Ordering::SeqCst);
        }
    })?;

    // At most one live session per peer address.
    let connections: Arc<parking_lot::Mutex<std::collections::HashSet<std::net::IpAddr>>> =
        Arc::new(parking_lot::Mutex::new(std::collections::HashSet::new()));

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        if !connections.lock().insert(addr.ip()) {
                            tracing::debug!("rejecting duplicate connection from {}", addr);
                            continue;
                        }
                        let credentials = credentials.clone();
                        let realm_list = realm_list.clone();
                        let connections = connections.clone();
                        tokio::spawn(async move {
                            auth_socket::handle_connection(stream, addr, credentials, realm_list, idle_timeout).await;
                            connections.lock().remove(&addr.ip());
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

    tracing::info!("halting process...");
    Ok(())
}
