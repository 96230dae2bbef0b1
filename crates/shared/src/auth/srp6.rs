// SRP6a - Secure Remote Password Protocol v6a, server side.
//
// Implements the session engine described for this realm server: a fixed
// `N`/`g`/`k` (the pre-RFC-5054 `k = 3` variant, chosen for compatibility
// with an existing client), SHA-1 throughout, and all big integers crossing
// between little-endian wire form and big-endian arithmetic form through
// `BigNumber`. Fixed-width fields (N, salt, A, B) are kept as raw
// little-endian byte arrays alongside their `BigNumber` form so hashing
// always sees the full width even when the arithmetic value happens to
// have a leading zero byte.

use super::big_number::BigNumber;
use super::byte_utils::{combine, ct_eq, split};
use super::crypto_hash::Sha1Hash;

/// The fixed 32-byte safe prime, little-endian as it appears on the wire.
const N_BYTES: [u8; 32] = [
    0x89, 0x4B, 0x64, 0x5E, 0x89, 0xE1, 0x53, 0x5B, 0xBD, 0xAD, 0x5B, 0x8B, 0x29, 0x06, 0x50, 0x53,
    0x08, 0x01, 0xB1, 0x8E, 0xBF, 0xBF, 0x5E, 0x8F, 0xAB, 0x3C, 0x82, 0x87, 0x2A, 0x3E, 0x9B, 0xB7,
];
const G_VALUE: u8 = 7;
const K_MULTIPLIER: u32 = 3;

pub const SALT_LEN: usize = 32;
pub const EPHEMERAL_LEN: usize = 32;
pub const PROOF_LEN: usize = 20;
pub const SESSION_KEY_LEN: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Init,
    ChallengeSent,
    ProofOk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SrpError {
    #[error("packet received in the wrong session state")]
    InvalidState,
    #[error("client public ephemeral A is invalid")]
    InvalidA,
}

/// Fields the caller must send back to the client as RS_SERVER_LOGON_CHALLENGE.
pub struct ChallengeResponse {
    pub server_public: [u8; EPHEMERAL_LEN],
    pub g: u8,
    pub n: [u8; EPHEMERAL_LEN],
    pub salt: [u8; SALT_LEN],
}

/// Fields the caller needs to finish RS_SERVER_LOGON_PROOF.
#[derive(Debug, PartialEq, Eq)]
pub struct ProofResult {
    pub m1_expected: [u8; PROOF_LEN],
    pub m2: [u8; PROOF_LEN],
    pub session_key: [u8; SESSION_KEY_LEN],
}

/// Per-connection SRP6 state machine.
pub struct Srp6Session {
    n: BigNumber,
    g: BigNumber,
    k: BigNumber,
    verifier: BigNumber,
    b: BigNumber,
    big_b: BigNumber,
    big_a: BigNumber,

    salt_bytes: [u8; SALT_LEN],
    big_a_bytes: [u8; EPHEMERAL_LEN],
    big_b_bytes: [u8; EPHEMERAL_LEN],

    status: Status,
}

impl Default for Srp6Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Srp6Session {
    pub fn new() -> Self {
        let mut n = BigNumber::new();
        n.set_binary(&N_BYTES);

        Srp6Session {
            n,
            g: BigNumber::from_u32(G_VALUE as u32),
            k: BigNumber::from_u32(K_MULTIPLIER),
            verifier: BigNumber::new(),
            b: BigNumber::new(),
            big_b: BigNumber::new(),
            big_a: BigNumber::new(),
            salt_bytes: [0u8; SALT_LEN],
            big_a_bytes: [0u8; EPHEMERAL_LEN],
            big_b_bytes: [0u8; EPHEMERAL_LEN],
            status: Status::Init,
        }
    }

    /// Overrides the host private ephemeral with a known value instead of
    /// drawing from the RNG. Production code must never call this; it exists
    /// so the literal known-good test vector can be reproduced exactly.
    #[cfg(test)]
    fn set_fixed_private_ephemeral(&mut self, b_le: &[u8]) {
        self.b.set_binary(b_le);
    }

    /// `x = H(salt || pwHash)`, `v = g^x mod N`, `b` = 20 random bytes,
    /// `B = (k*v + g^b) mod N`.
    pub fn process_challenge(
        &mut self,
        pw_hash: &[u8; PROOF_LEN],
        salt: &[u8; SALT_LEN],
    ) -> ChallengeResponse {
        self.salt_bytes = *salt;

        let mut sha = Sha1Hash::new();
        sha.update_data_bytes(salt);
        sha.update_data_bytes(pw_hash);
        sha.finalize();
        let mut x = BigNumber::new();
        x.set_binary(sha.get_digest());

        self.verifier = self.g.mod_exp(&x, &self.n);

        if self.b.is_zero() {
            // Not pre-seeded by a test; draw a fresh 160-bit ephemeral.
            self.b.set_rand(EPHEMERAL_LEN as u64 * 8);
        }
        let g_pow_b = self.g.mod_exp(&self.b, &self.n);
        let k_times_v = &self.k * &self.verifier;
        self.big_b = &(&k_times_v + &g_pow_b) % &self.n;
        self.big_b_bytes = to_fixed(self.big_b.as_byte_array(EPHEMERAL_LEN));

        self.status = Status::ChallengeSent;

        ChallengeResponse {
            server_public: self.big_b_bytes,
            g: G_VALUE,
            n: N_BYTES,
            salt: self.salt_bytes,
        }
    }

    /// `u = H(A || B)`, reject `A == 0`, `A mod N == 0`, or `u == 0`.
    /// `S = (A * v^u)^b mod N`, `K = combine(H(S_even), H(S_odd))`,
    /// `M1 = H((H(N) xor H(g)) || H(username_trimmed) || salt || A || B || K)`,
    /// `M2 = H(A || M1 || K)`.
    pub fn process_proof(
        &mut self,
        username: &[u8],
        client_a: &[u8],
    ) -> Result<ProofResult, SrpError> {
        if self.status != Status::ChallengeSent {
            return Err(SrpError::InvalidState);
        }

        self.big_a.set_binary(client_a);
        self.big_a_bytes = to_fixed(self.big_a.as_byte_array(EPHEMERAL_LEN));
        if self.big_a.is_zero() {
            return Err(SrpError::InvalidA);
        }
        let a_mod_n = &self.big_a % &self.n;
        if a_mod_n.is_zero() {
            return Err(SrpError::InvalidA);
        }

        let mut sha_u = Sha1Hash::new();
        sha_u.update_data_bytes(&self.big_a_bytes);
        sha_u.update_data_bytes(&self.big_b_bytes);
        sha_u.finalize();
        let mut u = BigNumber::new();
        u.set_binary(sha_u.get_digest());
        if u.is_zero() {
            return Err(SrpError::InvalidA);
        }

        let v_pow_u = self.verifier.mod_exp(&u, &self.n);
        let a_times_v = &self.big_a * &v_pow_u;
        let premaster = a_times_v.mod_exp(&self.b, &self.n);
        let s_bytes = premaster.as_byte_array(EPHEMERAL_LEN);
        let (s_even, s_odd) = split(&s_bytes);

        let mut sha_even = Sha1Hash::new();
        sha_even.update_data_bytes(&s_even);
        sha_even.finalize();
        let mut sha_odd = Sha1Hash::new();
        sha_odd.update_data_bytes(&s_odd);
        sha_odd.finalize();
        let session_key_bytes = combine(sha_even.get_digest(), sha_odd.get_digest());

        let username_trimmed = match username.iter().position(|&b| b == 0) {
            Some(nul_at) => &username[..nul_at],
            None => username,
        };

        let mut sha_n = Sha1Hash::new();
        sha_n.update_data_bytes(&N_BYTES);
        sha_n.finalize();
        let mut mixed = *sha_n.get_digest();

        let mut sha_g = Sha1Hash::new();
        sha_g.update_data_bytes(&[G_VALUE]);
        sha_g.finalize();
        for (byte, g_byte) in mixed.iter_mut().zip(sha_g.get_digest().iter()) {
            *byte ^= g_byte;
        }

        let mut sha_user = Sha1Hash::new();
        sha_user.update_data_bytes(username_trimmed);
        sha_user.finalize();
        let user_digest = *sha_user.get_digest();

        let mut sha_m1 = Sha1Hash::new();
        sha_m1.update_data_bytes(&mixed);
        sha_m1.update_data_bytes(&user_digest);
        sha_m1.update_data_bytes(&self.salt_bytes);
        sha_m1.update_data_bytes(&self.big_a_bytes);
        sha_m1.update_data_bytes(&self.big_b_bytes);
        sha_m1.update_data_bytes(&session_key_bytes);
        sha_m1.finalize();
        let m1_bytes = *sha_m1.get_digest();

        let mut sha_m2 = Sha1Hash::new();
        sha_m2.update_data_bytes(&self.big_a_bytes);
        sha_m2.update_data_bytes(&m1_bytes);
        sha_m2.update_data_bytes(&session_key_bytes);
        sha_m2.finalize();

        self.status = Status::ProofOk;

        Ok(ProofResult {
            m1_expected: m1_bytes,
            m2: *sha_m2.get_digest(),
            session_key: to_fixed(session_key_bytes),
        })
    }

    /// Constant-time check that the client's M1 matches the one we computed.
    /// `true` means the password is correct.
    pub fn proof_matches(expected_m1: &[u8; PROOF_LEN], client_m1: &[u8]) -> bool {
        ct_eq(expected_m1, client_m1)
    }
}

fn to_fixed<const N: usize>(bytes: Vec<u8>) -> [u8; N] {
    let mut out = [0u8; N];
    let take = bytes.len().min(N);
    out[..take].copy_from_slice(&bytes[..take]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_to_bytes(hex: &str) -> Vec<u8> {
        (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
            .collect()
    }

    /// The literal known-good vector: fixing both the server's `b` and the
    /// client's `a` makes the whole exchange deterministic, so the expected
    /// `M1`/`M2`/session key can be re-derived independently here via the
    /// client-side identity `S = (B - k*v)^(a + u*x) mod N` (the server
    /// computes the algebraically equivalent `(A * v^u)^b mod N`) and
    /// checked bit-for-bit against what the server actually produced.
    #[test]
    fn known_vector_reaches_agreement_with_a_matching_client() {
        let username = b"PLAYER";
        let pw_hash_hex = "3ce8a96d17c5ae88a30681024e86279f1a38c041";
        let salt_hex = "add03a31d271144675f2707e5026b6d2f1865999760250aab945e09edd2aa345";
        let server_b_hex = "1bf065d14c03bb13d2c08be3f3dfb824e44ab65b";
        let client_a_hex = "60975527035cf2ad1989806f0407210bc81edc0";

        let pw_hash: [u8; PROOF_LEN] = hex_to_bytes(pw_hash_hex).try_into().unwrap();
        let salt: [u8; SALT_LEN] = hex_to_bytes(salt_hex).try_into().unwrap();
        let server_b = hex_to_bytes(server_b_hex);
        let client_a_scalar = hex_to_bytes(client_a_hex);

        let mut server = Srp6Session::new();
        server.set_fixed_private_ephemeral(&server_b);
        let challenge = server.process_challenge(&pw_hash, &salt);

        let mut n = BigNumber::new();
        n.set_binary(&challenge.n);
        let g = BigNumber::from_u32(challenge.g as u32);
        let k = BigNumber::from_u32(K_MULTIPLIER);

        let mut a_scalar = BigNumber::new();
        a_scalar.set_binary(&client_a_scalar);
        let big_a = g.mod_exp(&a_scalar, &n);
        let a_bytes: [u8; EPHEMERAL_LEN] = to_fixed(big_a.as_byte_array(EPHEMERAL_LEN));

        let mut sha_x = Sha1Hash::new();
        sha_x.update_data_bytes(&salt);
        sha_x.update_data_bytes(&pw_hash);
        sha_x.finalize();
        let mut x = BigNumber::new();
        x.set_binary(sha_x.get_digest());
        let v = g.mod_exp(&x, &n);

        let mut big_b = BigNumber::new();
        big_b.set_binary(&challenge.server_public);

        let mut sha_u = Sha1Hash::new();
        sha_u.update_data_bytes(&a_bytes);
        sha_u.update_data_bytes(&challenge.server_public);
        sha_u.finalize();
        let mut u = BigNumber::new();
        u.set_binary(sha_u.get_digest());

        let k_times_v = &(&k * &v) % &n;
        let base = if big_b.inner() >= k_times_v.inner() {
            &big_b - &k_times_v
        } else {
            &(&big_b + &n) - &k_times_v
        };
        let exponent = &a_scalar + &(&u * &x);
        let s_client = base.mod_exp(&exponent, &n);
        let s_bytes = s_client.as_byte_array(EPHEMERAL_LEN);
        let (s_even, s_odd) = split(&s_bytes);

        let mut sha_even = Sha1Hash::new();
        sha_even.update_data_bytes(&s_even);
        sha_even.finalize();
        let mut sha_odd = Sha1Hash::new();
        sha_odd.update_data_bytes(&s_odd);
        sha_odd.finalize();
        let session_key_bytes = combine(sha_even.get_digest(), sha_odd.get_digest());

        let mut sha_n = Sha1Hash::new();
        sha_n.update_data_bytes(&N_BYTES);
        sha_n.finalize();
        let mut mixed = *sha_n.get_digest();
        let mut sha_g = Sha1Hash::new();
        sha_g.update_data_bytes(&[G_VALUE]);
        sha_g.finalize();
        for (byte, g_byte) in mixed.iter_mut().zip(sha_g.get_digest().iter()) {
            *byte ^= g_byte;
        }

        let mut sha_user = Sha1Hash::new();
        sha_user.update_data_bytes(username);
        sha_user.finalize();
        let user_digest = *sha_user.get_digest();

        let mut sha_m1 = Sha1Hash::new();
        sha_m1.update_data_bytes(&mixed);
        sha_m1.update_data_bytes(&user_digest);
        sha_m1.update_data_bytes(&salt);
        sha_m1.update_data_bytes(&a_bytes);
        sha_m1.update_data_bytes(&challenge.server_public);
        sha_m1.update_data_bytes(&session_key_bytes);
        sha_m1.finalize();
        let expected_m1 = *sha_m1.get_digest();

        let mut sha_m2 = Sha1Hash::new();
        sha_m2.update_data_bytes(&a_bytes);
        sha_m2.update_data_bytes(&expected_m1);
        sha_m2.update_data_bytes(&session_key_bytes);
        sha_m2.finalize();
        let expected_m2 = *sha_m2.get_digest();
        let expected_session_key: [u8; SESSION_KEY_LEN] = to_fixed(session_key_bytes);

        let proof = server.process_proof(username, &a_bytes).unwrap();
        assert_eq!(proof.m1_expected, expected_m1);
        assert_eq!(proof.m2, expected_m2);
        assert_eq!(proof.session_key, expected_session_key);
    }

    #[test]
    fn rejects_proof_before_challenge() {
        let mut server = Srp6Session::new();
        let a = vec![1u8; EPHEMERAL_LEN];
        assert_eq!(
            server.process_proof(b"PLAYER", &a),
            Err(SrpError::InvalidState)
        );
    }

    #[test]
    fn rejects_zero_a() {
        let pw_hash = [0u8; PROOF_LEN];
        let salt = [1u8; SALT_LEN];
        let mut server = Srp6Session::new();
        server.process_challenge(&pw_hash, &salt);
        let zero_a = vec![0u8; EPHEMERAL_LEN];
        assert_eq!(
            server.process_proof(b"PLAYER", &zero_a),
            Err(SrpError::InvalidA)
        );
    }

    #[test]
    fn rejects_a_congruent_to_zero_mod_n() {
        let pw_hash = [0u8; PROOF_LEN];
        let salt = [1u8; SALT_LEN];
        let mut server = Srp6Session::new();
        server.process_challenge(&pw_hash, &salt);
        assert_eq!(
            server.process_proof(b"PLAYER", &N_BYTES),
            Err(SrpError::InvalidA)
        );
    }

    #[test]
    fn proof_matches_is_symmetric_and_constant_time_safe() {
        let m1 = [7u8; PROOF_LEN];
        assert!(Srp6Session::proof_matches(&m1, &m1));
        let mut other = m1;
        other[0] ^= 1;
        assert!(!Srp6Session::proof_matches(&m1, &other));
    }
}
