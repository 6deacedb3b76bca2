//! One-shot frame assembly: the inverse of [`crate::framing::Deframer`].

use crate::cipher::BlockCipher;
use crate::error::{Error, ErrorCode, Result};
use crate::framing::checksum::Checksum;

/// Assembles `channel:payload$HHHH\n`, optionally padding and encrypting
/// it block-by-block under `cipher`.
///
/// `payload` must not contain the message terminator (`\n`) — callers
/// are expected to have already rejected that via
/// [`crate::codec::join`], but this is re-checked defensively.
pub fn encode(channel: u16, payload: &str, cipher: &dyn BlockCipher) -> Result<Vec<u8>> {
    if payload.contains('\n') {
        return Err(Error::fatal(ErrorCode::TerminatorInPayload));
    }

    let mut body = format!("{}:{}", channel, payload).into_bytes();
    let checksum = Checksum::of(&body);

    body.extend_from_slice(format!("${:04x}", checksum).as_bytes());
    body.push(b'\n');

    let block_size = cipher.block_size().max(1);
    if block_size > 1 {
        while body.len() % block_size != 0 {
            body.push(b' ');
        }
        for block in body.chunks_mut(block_size) {
            cipher.encrypt_block(block);
        }
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::NullCipher;

    #[test]
    fn plain_frame_shape() {
        let framed = encode(1, "gDC", &NullCipher).unwrap();
        let s = String::from_utf8(framed).unwrap();
        assert!(s.starts_with("1:gDC$"));
        assert!(s.ends_with('\n'));
        assert_eq!(s.len(), "1:gDC$".len() + 4 + 1);
    }

    #[test]
    fn rejects_embedded_terminator() {
        let err = encode(1, "a\nb", &NullCipher).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::TerminatorInPayload));
    }
}
