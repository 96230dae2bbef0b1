// Inter-server keepalive protocol between the realm process and each
// configured world process: one-byte opcodes behind a leading 0xFF marker.
// No persistent state; specified for completeness rather than for any
// gating behavior in the realm-list response.

pub const LEADING_BYTE: u8 = 0xFF;

pub const ARE_YOU_ALIVE: u8 = 0x00;
pub const YES_I_AM_ALIVE: u8 = 0x01;
pub const NO_I_AM_DEAD: u8 = 0x02;
pub const THIS_GUY_WANNA_PLAY: u8 = 0x64;

/// A decoded keepalive frame (the leading 0xFF has already been consumed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeepaliveFrame {
    AreYouAlive,
    YesIAmAlive,
    NoIAmDead,
    ThisGuyWannaPlay { ascii_ip: String },
}

impl KeepaliveFrame {
    /// Decodes everything after the leading 0xFF byte.
    pub fn decode(rest: &[u8]) -> Option<KeepaliveFrame> {
        let (opcode, payload) = rest.split_first()?;
        match *opcode {
            ARE_YOU_ALIVE => Some(KeepaliveFrame::AreYouAlive),
            YES_I_AM_ALIVE => Some(KeepaliveFrame::YesIAmAlive),
            NO_I_AM_DEAD => Some(KeepaliveFrame::NoIAmDead),
            THIS_GUY_WANNA_PLAY => Some(KeepaliveFrame::ThisGuyWannaPlay {
                ascii_ip: String::from_utf8_lossy(payload).into_owned(),
            }),
            _ => None,
        }
    }

    /// Encodes the full frame including the leading 0xFF byte.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![LEADING_BYTE];
        match self {
            KeepaliveFrame::AreYouAlive => out.push(ARE_YOU_ALIVE),
            KeepaliveFrame::YesIAmAlive => out.push(YES_I_AM_ALIVE),
            KeepaliveFrame::NoIAmDead => out.push(NO_I_AM_DEAD),
            KeepaliveFrame::ThisGuyWannaPlay { ascii_ip } => {
                out.push(THIS_GUY_WANNA_PLAY);
                out.extend_from_slice(ascii_ip.as_bytes());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn are_you_alive_roundtrips() {
        let frame = KeepaliveFrame::AreYouAlive;
        let encoded = frame.encode();
        assert_eq!(encoded, vec![0xFF, 0x00]);
        assert_eq!(KeepaliveFrame::decode(&encoded[1..]), Some(frame));
    }

    #[test]
    fn this_guy_wanna_play_carries_the_ip() {
        let frame = KeepaliveFrame::ThisGuyWannaPlay {
            ascii_ip: "10.0.0.5".to_string(),
        };
        let encoded = frame.encode();
        assert_eq!(encoded[0], 0xFF);
        assert_eq!(encoded[1], 0x64);
        assert_eq!(KeepaliveFrame::decode(&encoded[1..]), Some(frame));
    }

    #[test]
    fn unknown_opcode_fails_to_decode() {
        assert_eq!(KeepaliveFrame::decode(&[0x77]), None);
    }
}
