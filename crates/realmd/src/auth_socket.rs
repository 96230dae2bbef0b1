// Per-connection authentication state machine: CHALLENGE -> PROOF ->
// REALMLIST. The same listener also answers inbound keepalive frames
// (leading byte 0xFF) from a world-server peer, independent of session
// state, since those connections never go through the challenge/proof
// exchange at all.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use realm_shared::auth::Srp6Session;
use realm_shared::credential_store::{CredentialError, CredentialStore};
use realm_shared::keepalive::{self, KeepaliveFrame};

use crate::auth_codes::{AuthCmd, MAX_USERNAME_LEN};
use crate::protocol::{
    LogonChallengeRequest, LogonChallengeResponse, LogonProofRequest, LogonProofResponse,
};
use crate::realm_list::RealmList;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Challenge,
    Proof,
    RealmListReady,
}

/// Drives one client connection end to end. Returns once the connection is
/// closed, times out, or sends something the state machine rejects.
pub async fn handle_connection<CS: CredentialStore>(
    mut stream: TcpStream,
    addr: SocketAddr,
    credentials: Arc<CS>,
    realm_list: Arc<RealmList>,
    idle_timeout: Duration,
) {
    tracing::debug!("accepted connection from {}", addr);

    let mut state = SessionState::Challenge;
    let mut srp = Srp6Session::new();
    let mut username: Vec<u8> = Vec::new();

    loop {
        let cmd_byte = match timeout(idle_timeout, stream.read_u8()).await {
            Ok(Ok(byte)) => byte,
            Ok(Err(_)) => {
                tracing::debug!("connection from {} closed", addr);
                return;
            }
            Err(_) => {
                tracing::debug!("connection from {} idle for {:?}, closing", addr, idle_timeout);
                return;
            }
        };

        if cmd_byte == keepalive::LEADING_BYTE {
            if handle_keepalive_frame(&mut stream, addr, &realm_list).await.is_err() {
                return;
            }
            continue;
        }

        let cmd = match AuthCmd::from_u8(cmd_byte) {
            Some(cmd) => cmd,
            None => {
                tracing::debug!("unknown opcode {:#04x} from {}", cmd_byte, addr);
                return;
            }
        };

        let expected = match cmd {
            AuthCmd::LogonChallenge => SessionState::Challenge,
            AuthCmd::LogonProof => SessionState::Proof,
            AuthCmd::RealmList => SessionState::RealmListReady,
        };

        if expected != state {
            tracing::debug!(
                "rejecting {:?} while in state {:?} from {}",
                cmd, state, addr
            );
            return;
        }

        let outcome = match cmd {
            AuthCmd::LogonChallenge => {
                handle_logon_challenge(&mut stream, &credentials, &mut srp, &mut username).await
            }
            AuthCmd::LogonProof => handle_logon_proof(&mut stream, &mut srp, &username).await,
            AuthCmd::RealmList => handle_realm_list(&mut stream, &realm_list).await,
        };

        match outcome {
            Ok(next_state) => state = next_state,
            Err(e) => {
                tracing::debug!("session with {} ended: {}", addr, e);
                return;
            }
        }
    }
}

async fn handle_logon_challenge<CS: CredentialStore>(
    stream: &mut TcpStream,
    credentials: &Arc<CS>,
    srp: &mut Srp6Session,
    username_out: &mut Vec<u8>,
) -> Result<SessionState, anyhow::Error> {
    let mut header = vec![0u8; LogonChallengeRequest::MIN_SIZE];
    stream.read_exact(&mut header).await?;

    let username_len = header[LogonChallengeRequest::MIN_SIZE - 1] as usize;
    if username_len >= MAX_USERNAME_LEN {
        return Err(anyhow::anyhow!("username too long"));
    }
    let mut username_buf = vec![0u8; username_len];
    stream.read_exact(&mut username_buf).await?;

    header.extend_from_slice(&username_buf);
    let request = LogonChallengeRequest::from_bytes(&header)
        .ok_or_else(|| anyhow::anyhow!("malformed logon challenge body"))?;

    let username = String::from_utf8_lossy(&request.username).to_uppercase();

    let credential = match credentials.lookup(&username).await {
        Ok(credential) => credential,
        Err(CredentialError::NotFound) => {
            tracing::debug!("unknown account '{}'", username);
            return Err(anyhow::anyhow!("unknown account"));
        }
        Err(CredentialError::Unavailable(e)) => {
            tracing::error!("credential store unavailable: {}", e);
            return Err(anyhow::anyhow!("credential store unavailable"));
        }
    };

    let challenge = srp.process_challenge(&credential.pw_hash, &credential.salt);
    *username_out = request.username;

    let mut crc_salt = [0u8; 16];
    rand::thread_rng().fill(&mut crc_salt);

    let response = LogonChallengeResponse {
        server_public: challenge.server_public,
        g: challenge.g,
        n: challenge.n,
        salt: challenge.salt,
        crc_salt,
    };
    stream.write_all(&response.to_bytes()).await?;

    Ok(SessionState::Proof)
}

async fn handle_logon_proof(
    stream: &mut TcpStream,
    srp: &mut Srp6Session,
    username: &[u8],
) -> Result<SessionState, anyhow::Error> {
    let mut buf = [0u8; LogonProofRequest::SIZE];
    stream.read_exact(&mut buf).await?;
    let request = LogonProofRequest::from_bytes(&buf)
        .ok_or_else(|| anyhow::anyhow!("malformed logon proof body"))?;

    let proof = srp
        .process_proof(username, &request.a)
        .map_err(|e| anyhow::anyhow!(e))?;

    if !Srp6Session::proof_matches(&proof.m1_expected, &request.m1) {
        tracing::info!("wrong password during authentication");
        return Err(anyhow::anyhow!("proof mismatch"));
    }

    let response = LogonProofResponse { m2: proof.m2 };
    stream.write_all(&response.to_bytes()).await?;

    Ok(SessionState::RealmListReady)
}

async fn handle_realm_list(
    stream: &mut TcpStream,
    realm_list: &Arc<RealmList>,
) -> Result<SessionState, anyhow::Error> {
    let mut padding = [0u8; 4];
    stream.read_exact(&mut padding).await?;

    stream.write_all(&realm_list.encode()).await?;
    Ok(SessionState::RealmListReady)
}

/// Handles everything after a leading 0xFF byte, independent of the client
/// session state machine above. Only a peer whose IP matches a configured
/// realm entry gets a reply; anything else is a protocol violation and
/// closes the connection.
async fn handle_keepalive_frame(
    stream: &mut TcpStream,
    addr: SocketAddr,
    realm_list: &Arc<RealmList>,
) -> Result<(), anyhow::Error> {
    let known_peer = realm_list
        .realms()
        .iter()
        .any(|realm| realm.address == addr.ip().to_string());
    if !known_peer {
        return Err(anyhow::anyhow!("keepalive frame from unregistered peer"));
    }

    let mut opcode = [0u8; 1];
    stream.read_exact(&mut opcode).await?;

    let mut rest = vec![opcode[0]];
    if opcode[0] == keepalive::THIS_GUY_WANNA_PLAY {
        let mut ip_buf = [0u8; 15];
        let n = stream.read(&mut ip_buf).await?;
        rest.extend_from_slice(&ip_buf[..n]);
    }

    match KeepaliveFrame::decode(&rest) {
        Some(KeepaliveFrame::AreYouAlive) => {
            tracing::trace!("keepalive ping from {}", addr);
            stream
                .write_all(&KeepaliveFrame::YesIAmAlive.encode())
                .await?;
        }
        Some(KeepaliveFrame::ThisGuyWannaPlay { ascii_ip }) => {
            tracing::debug!("world server at {} reports player from {}", addr, ascii_ip);
        }
        Some(other) => {
            tracing::debug!("unexpected keepalive frame {:?} from {}", other, addr);
        }
        None => {
            return Err(anyhow::anyhow!("malformed keepalive frame"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use realm_shared::credential_store::Credential;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::net::TcpListener;

    struct StaticCredentialStore {
        accounts: Mutex<HashMap<String, Credential>>,
    }

    impl StaticCredentialStore {
        fn with_one(username: &str, credential: Credential) -> Self {
            let mut accounts = HashMap::new();
            accounts.insert(username.to_uppercase(), credential);
            StaticCredentialStore {
                accounts: Mutex::new(accounts),
            }
        }
    }

    impl CredentialStore for StaticCredentialStore {
        async fn lookup(&self, username: &str) -> Result<Credential, CredentialError> {
            self.accounts
                .lock()
                .unwrap()
                .get(&username.to_uppercase())
                .copied()
                .ok_or(CredentialError::NotFound)
        }
    }

    fn sample_challenge_bytes(username: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(AuthCmd::LogonChallenge as u8);
        buf.push(0u8); // error
        buf.extend_from_slice(&0u16.to_le_bytes()); // size (unused by us)
        buf.extend_from_slice(b"WoW\0");
        buf.extend_from_slice(&[1, 12, 1]);
        buf.extend_from_slice(&5875u16.to_le_bytes());
        buf.extend_from_slice(b"68x\0");
        buf.extend_from_slice(b"niW\0");
        buf.extend_from_slice(b"SUne");
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&[127, 0, 0, 1]);
        buf.push(username.len() as u8);
        buf.extend_from_slice(username);
        buf
    }

    #[tokio::test]
    async fn unknown_account_closes_the_connection_without_a_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let local_addr = listener.local_addr().unwrap();
        let store = Arc::new(StaticCredentialStore::with_one(
            "PLAYER",
            Credential {
                salt: [1u8; 32],
                pw_hash: [2u8; 20],
            },
        ));
        let realms = Arc::new(RealmList::from_config(&realm_shared::config::Config::new()));

        let server = tokio::spawn(async move {
            let (stream, addr) = listener.accept().await.unwrap();
            handle_connection(stream, addr, store, realms, Duration::from_secs(30)).await;
        });

        let mut client = TcpStream::connect(local_addr).await.unwrap();
        client
            .write_all(&sample_challenge_bytes(b"NOBODY"))
            .await
            .unwrap();

        let mut reply = [0u8; 1];
        let n = client.read(&mut reply).await.unwrap_or(0);
        assert_eq!(n, 0, "server must not answer an unknown account");

        server.await.unwrap();
    }

    #[tokio::test]
    async fn known_account_receives_a_logon_challenge_reply() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let local_addr = listener.local_addr().unwrap();
        let store = Arc::new(StaticCredentialStore::with_one(
            "PLAYER",
            Credential {
                salt: [1u8; 32],
                pw_hash: [2u8; 20],
            },
        ));
        let realms = Arc::new(RealmList::from_config(&realm_shared::config::Config::new()));

        let server = tokio::spawn(async move {
            let (stream, addr) = listener.accept().await.unwrap();
            handle_connection(stream, addr, store, realms, Duration::from_secs(30)).await;
        });

        let mut client = TcpStream::connect(local_addr).await.unwrap();
        client
            .write_all(&sample_challenge_bytes(b"PLAYER"))
            .await
            .unwrap();

        let mut reply = vec![0u8; 118];
        client.read_exact(&mut reply).await.unwrap();
        assert_eq!(reply[0], AuthCmd::LogonChallenge as u8);
        assert_eq!(reply[1], 0x00);

        drop(client);
        server.await.unwrap();
    }
}
