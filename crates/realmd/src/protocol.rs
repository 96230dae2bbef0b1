// Wire protocol structures for the challenge/proof exchange.
// Rust equivalents of the packed structs exchanged between the client and
// this realm server. Fields named `unk*`/reserved are parsed and discarded;
// encoders always write zero for them unless otherwise noted.

use realm_shared::util::ByteBuffer;

use crate::auth_codes::MAX_USERNAME_LEN;

/// RS_CLIENT_LOGON_CHALLENGE body (the `cmd` byte has already been consumed
/// by the caller). Only `username` is used by the core; every other field
/// is parsed so the decoder can validate sizes, then discarded.
#[derive(Debug, Clone)]
pub struct LogonChallengeRequest {
    pub username: Vec<u8>,
}

impl LogonChallengeRequest {
    /// error(1) + size(2) + gamename(4) + v1v2v3(3) + build(2) + platform(4)
    /// + os(4) + country(4) + tz_bias(4) + ip(4) + I_len(1) = 33
    pub const MIN_SIZE: usize = 1 + 2 + 4 + 3 + 2 + 4 + 4 + 4 + 4 + 4 + 1;

    pub fn from_bytes(data: &[u8]) -> Option<LogonChallengeRequest> {
        if data.len() < Self::MIN_SIZE {
            return None;
        }
        let username_len = data[Self::MIN_SIZE - 1] as usize;
        if username_len >= MAX_USERNAME_LEN {
            return None;
        }
        let username_end = Self::MIN_SIZE + username_len;
        if data.len() < username_end {
            return None;
        }
        Some(LogonChallengeRequest {
            username: data[Self::MIN_SIZE..username_end].to_vec(),
        })
    }
}

/// RS_SERVER_LOGON_CHALLENGE reply.
pub struct LogonChallengeResponse {
    pub server_public: [u8; 32],
    pub g: u8,
    pub n: [u8; 32],
    pub salt: [u8; 32],
    pub crc_salt: [u8; 16],
}

impl LogonChallengeResponse {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = ByteBuffer::new();
        buf.write_u8(0x00); // cmd
        buf.write_u8(0x00); // error
        buf.write_u8(0x00); // unk
        buf.append(&self.server_public);
        buf.write_u8(1); // g_len
        buf.write_u8(self.g);
        buf.write_u8(32); // N_len
        buf.append(&self.n);
        buf.append(&self.salt);
        buf.append(&self.crc_salt);
        buf.write_u8(0x00); // unk
        buf.contents().to_vec()
    }
}

/// RS_CLIENT_LOGON_PROOF body (`cmd` already consumed). Only `a`/`m1` are
/// used; `crc_hash`/`number_of_keys`/the trailing unk byte are parsed and
/// discarded.
#[derive(Debug, Clone)]
pub struct LogonProofRequest {
    pub a: [u8; 32],
    pub m1: [u8; 20],
}

impl LogonProofRequest {
    pub const SIZE: usize = 32 + 20 + 20 + 1 + 1;

    pub fn from_bytes(data: &[u8]) -> Option<LogonProofRequest> {
        if data.len() < Self::SIZE {
            return None;
        }
        let mut a = [0u8; 32];
        a.copy_from_slice(&data[0..32]);
        let mut m1 = [0u8; 20];
        m1.copy_from_slice(&data[32..52]);
        Some(LogonProofRequest { a, m1 })
    }
}

/// RS_SERVER_LOGON_PROOF reply (the legacy build-5875-compatible layout:
/// no survey id, no post-2.x trailing flags field).
pub struct LogonProofResponse {
    pub m2: [u8; 20],
}

impl LogonProofResponse {
    pub const SIZE: usize = 1 + 1 + 20 + 4;

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = ByteBuffer::with_capacity(Self::SIZE);
        buf.write_u8(0x01); // cmd
        buf.write_u8(0x00); // error
        buf.append(&self.m2);
        buf.write_u32(0); // accountflags, always 0
        buf.contents().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_challenge_bytes(username: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.push(0u8); // error
        buf.extend_from_slice(&0u16.to_le_bytes()); // size
        buf.extend_from_slice(b"WoW\0"); // gamename
        buf.extend_from_slice(&[1, 12, 1]); // v1 v2 v3
        buf.extend_from_slice(&5875u16.to_le_bytes()); // build
        buf.extend_from_slice(b"68x\0"); // platform
        buf.extend_from_slice(b"niW\0"); // os
        buf.extend_from_slice(b"SUne"); // country
        buf.extend_from_slice(&0u32.to_le_bytes()); // tz
        buf.extend_from_slice(&[127, 0, 0, 1]); // ip
        buf.push(username.len() as u8);
        buf.extend_from_slice(username);
        buf
    }

    #[test]
    fn logon_challenge_extracts_username_and_ignores_the_rest() {
        let bytes = sample_challenge_bytes(b"PLAYER");
        let req = LogonChallengeRequest::from_bytes(&bytes).unwrap();
        assert_eq!(req.username, b"PLAYER");
    }

    #[test]
    fn logon_challenge_rejects_usernames_at_the_length_ceiling() {
        let long_name = vec![b'A'; MAX_USERNAME_LEN];
        let bytes = sample_challenge_bytes(&long_name);
        assert!(LogonChallengeRequest::from_bytes(&bytes).is_none());
    }

    #[test]
    fn logon_challenge_response_has_no_version_challenge_field() {
        let resp = LogonChallengeResponse {
            server_public: [1u8; 32],
            g: 7,
            n: [2u8; 32],
            salt: [3u8; 32],
            crc_salt: [4u8; 16],
        };
        let bytes = resp.to_bytes();
        // cmd + error + unk + B(32) + g_len + g + N_len + N(32) + salt(32)
        // + crc_salt(16) + unk = 3 + 32 + 2 + 32 + 32 + 16 + 1 = 118
        assert_eq!(bytes.len(), 118);
    }

    #[test]
    fn logon_proof_response_is_the_legacy_26_byte_layout() {
        let resp = LogonProofResponse { m2: [9u8; 20] };
        assert_eq!(resp.to_bytes().len(), LogonProofResponse::SIZE);
    }
}
