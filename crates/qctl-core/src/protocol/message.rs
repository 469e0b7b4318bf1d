//! Request/response messages and the caller memory they carry.

use serde::{Deserialize, Serialize};

use crate::constants::INT_PAYLOAD_LEN;

/// Protection of a caller memory region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl Access {
    pub fn readable(self) -> bool {
        matches!(self, Access::ReadOnly | Access::ReadWrite)
    }

    pub fn writable(self) -> bool {
        matches!(self, Access::WriteOnly | Access::ReadWrite)
    }
}

/// Caller memory that a pointer argument refers to.
///
/// The caller ships the bytes with the request and receives them back,
/// possibly modified, with the response. A request without a region is the
/// equivalent of a null pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegion {
    pub data: Vec<u8>,
    pub access: Access,
}

impl UserRegion {
    pub fn new(data: Vec<u8>, access: Access) -> Self {
        Self { data, access }
    }

    /// A region holding one integer.
    pub fn int(value: i32, access: Access) -> Self {
        Self::new(value.to_le_bytes().to_vec(), access)
    }

    /// A zero-filled writable buffer of `len` bytes.
    pub fn out(len: usize) -> Self {
        Self::new(vec![0; len], Access::WriteOnly)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Integer stored at the start of the region, ignoring protection.
    ///
    /// Used by callers to look at their own memory after a call.
    pub fn peek_int(&self) -> Option<i32> {
        let bytes: [u8; INT_PAYLOAD_LEN] = self.data.get(..INT_PAYLOAD_LEN)?.try_into().ok()?;
        Some(i32::from_le_bytes(bytes))
    }
}

/// A single command sent to the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Echoed back in the matching [`Response`].
    pub request_id: u32,
    /// Raw command code (see [`CommandCode`](super::CommandCode)).
    pub command: u32,
    /// Raw argument for value verbs.
    pub arg: i64,
    /// Caller memory for pointer verbs.
    pub region: Option<UserRegion>,
    /// Thread id of the issuing execution context, if the caller knows it.
    pub thread_id: Option<i32>,
}

/// The endpoint's answer to a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub request_id: u32,
    /// Zero or a verb-specific value on success, negative errno on failure.
    pub result: i64,
    /// The request's region after the call.
    pub region: Option<UserRegion>,
}
