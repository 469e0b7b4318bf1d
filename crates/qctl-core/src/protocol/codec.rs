//! Wire codec for qctl messages.
//!
//! Format: 4-byte little-endian length prefix + bincode-encoded payload
//!
//! The codec ensures:
//! - Messages are length-prefixed for stream framing
//! - Maximum message size is enforced
//! - Partial reads return Ok(None) to support streaming

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::constants::{FRAME_HEADER_LEN, MAX_MESSAGE_SIZE};
use crate::error::{Error, Result};

/// Codec for length-prefixed bincode encoding of requests and responses.
pub struct Codec;

impl Codec {
    /// Encode a message to bytes with length prefix.
    pub fn encode<M: Serialize>(msg: &M) -> Result<Bytes> {
        let payload = bincode::serialize(msg).map_err(|e| Error::Codec {
            message: format!("serialization failed: {}", e),
        })?;

        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(Error::Codec {
                message: format!(
                    "message too large: {} bytes (max {})",
                    payload.len(),
                    MAX_MESSAGE_SIZE
                ),
            });
        }

        let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
        buf.put_u32_le(payload.len() as u32);
        buf.put_slice(&payload);

        Ok(buf.freeze())
    }

    /// Decode a message from a buffer.
    ///
    /// Returns:
    /// - Ok(Some(msg)) if a complete message was decoded (buffer is advanced)
    /// - Ok(None) if more data is needed (buffer unchanged)
    /// - Err if the data is invalid
    pub fn decode<M: DeserializeOwned>(buf: &mut BytesMut) -> Result<Option<M>> {
        if buf.len() < FRAME_HEADER_LEN {
            return Ok(None);
        }

        let len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;

        // Reject oversized frames before waiting for their bytes
        if len > MAX_MESSAGE_SIZE {
            return Err(Error::Codec {
                message: format!("message length {} exceeds maximum {}", len, MAX_MESSAGE_SIZE),
            });
        }

        if buf.len() < FRAME_HEADER_LEN + len {
            return Ok(None);
        }

        buf.advance(FRAME_HEADER_LEN);
        let payload = buf.split_to(len);
        let msg = bincode::deserialize(&payload).map_err(|e| Error::Codec {
            message: format!("deserialization failed: {}", e),
        })?;

        Ok(Some(msg))
    }

    /// Decode from a slice (convenience for testing).
    pub fn decode_slice<M: DeserializeOwned>(data: &[u8]) -> Result<Option<M>> {
        let mut buf = BytesMut::from(data);
        Self::decode(&mut buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Access, Request, Response, UserRegion, Verb};

    fn sample_request() -> Request {
        Request {
            request_id: 3,
            command: Verb::ExchangeFromPointer.code().0,
            arg: 0,
            region: Some(UserRegion::int(5, Access::ReadWrite)),
            thread_id: Some(4242),
        }
    }

    #[test]
    fn request_roundtrip() {
        let req = sample_request();
        let encoded = Codec::encode(&req).unwrap();
        let decoded: Request = Codec::decode_slice(&encoded).unwrap().unwrap();
        assert_eq!(req, decoded);
    }

    #[test]
    fn response_with_negative_result() {
        let resp = Response {
            request_id: 9,
            result: -25,
            region: None,
        };
        let encoded = Codec::encode(&resp).unwrap();
        let decoded: Response = Codec::decode_slice(&encoded).unwrap().unwrap();
        assert_eq!(decoded.result, -25);
    }

    #[test]
    fn decode_partial_returns_none() {
        let encoded = Codec::encode(&sample_request()).unwrap();
        let partial = &encoded[..encoded.len() / 2];
        assert!(Codec::decode_slice::<Request>(partial).unwrap().is_none());
    }

    #[test]
    fn decode_header_only_returns_none() {
        let mut buf = BytesMut::new();
        buf.put_u32_le(100);
        assert!(Codec::decode::<Request>(&mut buf).unwrap().is_none());
        // Buffer untouched while incomplete
        assert_eq!(buf.len(), FRAME_HEADER_LEN);
    }

    #[test]
    fn decode_oversized_length_fails() {
        let mut buf = BytesMut::new();
        buf.put_u32_le((MAX_MESSAGE_SIZE + 1) as u32);
        assert!(Codec::decode::<Request>(&mut buf).is_err());
    }

    #[test]
    fn decode_two_frames_back_to_back() {
        let first = Codec::encode(&sample_request()).unwrap();
        let mut second_req = sample_request();
        second_req.request_id = 4;
        let second = Codec::encode(&second_req).unwrap();

        let mut buf = BytesMut::new();
        buf.extend_from_slice(&first);
        buf.extend_from_slice(&second);

        let a: Request = Codec::decode(&mut buf).unwrap().unwrap();
        let b: Request = Codec::decode(&mut buf).unwrap().unwrap();
        assert_eq!(a.request_id, 3);
        assert_eq!(b.request_id, 4);
        assert!(buf.is_empty());
    }
}
