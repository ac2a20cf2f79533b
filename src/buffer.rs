use crate::frame::CR;

/// Accumulates received bytes until a complete response frame is present.
#[derive(Debug)]
pub struct Buffer {
    data: Vec<u8>,
}

impl Buffer {
    pub fn new() -> Buffer {
        Buffer {
            data: Vec::with_capacity(32),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Append `bytes`, returning how many of them were taken. Nothing past the
    /// first CR is accepted.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        if self.is_complete() {
            return 0;
        }
        let take = bytes
            .iter()
            .position(|b| *b == CR)
            .map_or(bytes.len(), |pos| pos + 1);
        self.data.extend_from_slice(&bytes[..take]);
        take
    }

    /// True once the frame terminator has been received.
    pub fn is_complete(&self) -> bool {
        self.data.last() == Some(&CR)
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_until_cr() {
        let mut buf = Buffer::new();
        assert_eq!(buf.write(b"%01$RBR"), 7);
        assert!(!buf.is_complete());
        assert_eq!(buf.write(b"+00001**\r%01"), 9);
        assert!(buf.is_complete());
        assert_eq!(buf.len(), 16);
        assert_eq!(buf.write(b"more"), 0);
        assert_eq!(buf.as_ref(), b"%01$RBR+00001**\r");
    }

    #[test]
    fn test_empty_write() {
        let mut buf = Buffer::new();
        assert_eq!(buf.write(b""), 0);
        assert_eq!(buf.len(), 0);
        assert!(!buf.is_complete());
    }
}
