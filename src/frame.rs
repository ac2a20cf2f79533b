//! Command frame construction.
//!
//! A command frame is `%NN#` + command code + optional `<sign><payload>` +
//! `**` + CR. The `**` stands in for the block check characters, which the
//! sensor accepts in place of a real checksum.

use crate::types::{Sign, Signed7, Unsigned5};

pub const CR: u8 = b'\r';
/// Placeholder for the two BCC characters.
pub const BCC_SKIP: &[u8; 2] = b"**";

/// Build one command frame.
///
/// The payload is only emitted when non-empty, preceded by `sign` when one is
/// given. Neither the command code nor the payload are validated here; a
/// malformed code is transmitted as given and rejected by the device.
///
/// ```
/// use hlg1_proto::frame::build_frame;
/// use hlg1_proto::Sign;
/// assert_eq!(build_frame(b"%01#", b"WBD", b"00001", Some(Sign::Plus)), b"%01#WBD+00001**\r");
/// assert_eq!(build_frame(b"%01#", b"RMD", b"", Some(Sign::Plus)), b"%01#RMD**\r");
/// ```
pub fn build_frame(prefix: &[u8], command: &[u8], payload: &[u8], sign: Option<Sign>) -> Vec<u8> {
    let mut frame =
        Vec::with_capacity(prefix.len() + command.len() + 1 + payload.len() + BCC_SKIP.len() + 1);
    frame.extend_from_slice(prefix);
    frame.extend_from_slice(command);
    if !payload.is_empty() {
        if let Some(sign) = sign {
            frame.push(sign.as_byte());
        }
        frame.extend_from_slice(payload);
    }
    frame.extend_from_slice(BCC_SKIP);
    frame.push(CR);
    frame
}

/// Payload of a command frame, already range-checked for its field width.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Payload {
    None,
    /// Five digits, sent with a `+`.
    Unsigned(Unsigned5),
    /// Seven digits, sign taken from the value.
    Signed(Signed7),
    /// 1-based inclusive sample range, ten digits, no sign.
    Range(Unsigned5, Unsigned5),
}

impl Payload {
    pub(crate) fn encode(&self, prefix: &[u8], command: &[u8]) -> Vec<u8> {
        match self {
            Self::None => build_frame(prefix, command, b"", None),
            Self::Unsigned(v) => build_frame(prefix, command, &v.to_bytes(), Some(Sign::Plus)),
            Self::Signed(v) => build_frame(prefix, command, &v.magnitude_bytes(), Some(v.sign())),
            Self::Range(start, end) => {
                let mut digits = [0; 10];
                digits[..5].copy_from_slice(&start.to_bytes());
                digits[5..].copy_from_slice(&end.to_bytes());
                build_frame(prefix, command, &digits, None)
            }
        }
    }
}
