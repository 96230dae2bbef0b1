// Auth module - cryptographic primitives and authentication protocols

pub mod big_number;
pub mod byte_utils;
pub mod crypto_hash;
pub mod srp6;

pub use big_number::BigNumber;
pub use crypto_hash::Sha1Hash;
pub use srp6::{ChallengeResponse, ProofResult, SrpError, Srp6Session};
