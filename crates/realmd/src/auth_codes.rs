// Wire opcodes for the authentication protocol.

/// First byte of every inbound client frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AuthCmd {
    LogonChallenge = 0x00,
    LogonProof = 0x01,
    RealmList = 0x10,
}

impl AuthCmd {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0x00 => Some(AuthCmd::LogonChallenge),
            0x01 => Some(AuthCmd::LogonProof),
            0x10 => Some(AuthCmd::RealmList),
            _ => None,
        }
    }
}

/// A username field at or above this length is rejected at parse time
/// rather than silently truncated.
pub const MAX_USERNAME_LEN: usize = 20;
