// Credential store: the external collaborator the connection state machine
// consults during RS_CLIENT_LOGON_CHALLENGE. The trait boundary exists so
// the state machine can be exercised in tests against an in-memory fake
// instead of a real database.

use crate::database::{Database, FieldExt};

/// `salt`/`pw_hash` as decoded from the account table's hex columns.
#[derive(Debug, Clone, Copy)]
pub struct Credential {
    pub salt: [u8; 32],
    pub pw_hash: [u8; 20],
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("no account with that username")]
    NotFound,
    #[error("credential store unavailable: {0}")]
    Unavailable(#[from] anyhow::Error),
}

pub trait CredentialStore: Send + Sync {
    fn lookup(
        &self,
        username: &str,
    ) -> impl std::future::Future<Output = Result<Credential, CredentialError>> + Send;
}

/// SQL-backed implementation against `account(id, username, pwHash, gmlevel, joindate)`.
/// `gmlevel`/`joindate` are carried in the schema for compatibility with the
/// original data model but are not read here; the authentication core only
/// ever needs `pwHash` and `salt`.
pub struct SqlCredentialStore {
    db: Database,
}

impl SqlCredentialStore {
    pub fn new(db: Database) -> Self {
        SqlCredentialStore { db }
    }
}

impl CredentialStore for SqlCredentialStore {
    async fn lookup(&self, username: &str) -> Result<Credential, CredentialError> {
        let escaped = Database::escape_string(username);
        let sql = format!(
            "SELECT pwHash, salt FROM account WHERE username = '{}'",
            escaped
        );

        let row = self
            .db
            .query_one(&sql)
            .await
            .map_err(CredentialError::Unavailable)?
            .ok_or(CredentialError::NotFound)?;

        let pw_hash_hex = row.get_string(0);
        let salt_hex = row.get_string(1);

        let pw_hash = decode_hex_fixed::<20>(&pw_hash_hex)
            .map_err(|e| CredentialError::Unavailable(anyhow::anyhow!(e)))?;
        let salt = decode_hex_fixed::<32>(&salt_hex)
            .map_err(|e| CredentialError::Unavailable(anyhow::anyhow!(e)))?;

        Ok(Credential { salt, pw_hash })
    }
}

fn decode_hex_fixed<const N: usize>(hex: &str) -> Result<[u8; N], String> {
    let hex = hex.trim();
    if hex.len() != N * 2 {
        return Err(format!(
            "expected {} hex characters, got {}",
            N * 2,
            hex.len()
        ));
    }
    let mut out = [0u8; N];
    for i in 0..N {
        out[i] = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
            .map_err(|e| format!("invalid hex at byte {}: {}", i, e))?;
    }
    Ok(out)
}
