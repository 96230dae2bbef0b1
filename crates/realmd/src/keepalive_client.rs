// Outbound half of the realm/world keepalive protocol: one background task
// per configured world server, periodically asking "are you alive" and
// logging the answer. Purely advisory - nothing here gates the realm list
// reply, since the realm list is a static config snapshot regardless of
// whether a given world server answers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use realm_shared::keepalive::KeepaliveFrame;

use crate::realm_list::RealmRecord;

const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Spawns the polling task for a single world server. Returns a handle the
/// caller can use to observe the last known alive/dead status.
pub fn spawn(realm: RealmRecord, stop: Arc<AtomicBool>) -> Arc<AtomicBool> {
    let last_known_alive = Arc::new(AtomicBool::new(false));
    let alive_flag = last_known_alive.clone();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PING_INTERVAL);
        loop {
            interval.tick().await;
            if stop.load(Ordering::SeqCst) {
                break;
            }

            match ping_once(&realm).await {
                Ok(true) => {
                    alive_flag.store(true, Ordering::SeqCst);
                    tracing::trace!("world server '{}' answered alive", realm.name);
                }
                Ok(false) => {
                    alive_flag.store(false, Ordering::SeqCst);
                    tracing::debug!("world server '{}' answered dead", realm.name);
                }
                Err(e) => {
                    alive_flag.store(false, Ordering::SeqCst);
                    tracing::debug!("world server '{}' unreachable: {}", realm.name, e);
                }
            }
        }
    });

    last_known_alive
}

async fn ping_once(realm: &RealmRecord) -> Result<bool, anyhow::Error> {
    let addr = format!("{}:{}", realm.address, realm.comm_port);
    let mut stream = TcpStream::connect(&addr).await?;

    stream.write_all(&KeepaliveFrame::AreYouAlive.encode()).await?;

    let mut opcode = [0u8; 2];
    stream.read_exact(&mut opcode).await?;
    match KeepaliveFrame::decode(&opcode[1..]) {
        Some(KeepaliveFrame::YesIAmAlive) => Ok(true),
        Some(KeepaliveFrame::NoIAmDead) => Ok(false),
        _ => Err(anyhow::anyhow!("unexpected keepalive reply from {}", addr)),
    }
}
