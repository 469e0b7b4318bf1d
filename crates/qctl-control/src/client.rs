//! Control socket client.
//!
//! Connects to a running qctl endpoint and issues verbs over the
//! length-prefixed request/response protocol. Every request carries the
//! issuing thread's id so the endpoint can tell threads of one process
//! apart.

use std::path::Path;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

use qctl_core::constants::{INT_PAYLOAD_LEN, SNAPSHOT_LEN};
use qctl_core::protocol::{Access, Codec, CommandCode, Request, Response, UserRegion, Verb};
use qctl_core::{Error, Result, SnapshotRecord};

/// Client for communicating with a qctl control socket.
pub struct ControlClient {
    stream: UnixStream,
    read_buffer: BytesMut,
    next_id: u32,
}

impl ControlClient {
    /// Connect to the control socket at `path`.
    pub async fn connect(path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(path).await?;
        tracing::debug!(path = %path.display(), "Connected to control socket");

        Ok(Self {
            stream,
            read_buffer: BytesMut::with_capacity(1024),
            next_id: 1,
        })
    }

    /// Issue a raw command and return the endpoint's response unchanged.
    ///
    /// Nothing is interpreted: a negative `result` is returned as-is.
    pub async fn call(
        &mut self,
        command: CommandCode,
        arg: i64,
        region: Option<UserRegion>,
    ) -> Result<Response> {
        let request_id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        let request = Request {
            request_id,
            command: command.0,
            arg,
            region,
            thread_id: Some(nix::unistd::gettid().as_raw()),
        };

        let frame = Codec::encode(&request)?;
        self.stream.write_all(&frame).await?;
        self.stream.flush().await?;

        let response = self.read_response().await?;
        if response.request_id != request_id {
            return Err(Error::Protocol {
                message: format!(
                    "response id {} does not match request id {}",
                    response.request_id, request_id
                ),
            });
        }

        Ok(response)
    }

    async fn read_response(&mut self) -> Result<Response> {
        loop {
            if let Some(response) = Codec::decode::<Response>(&mut self.read_buffer)? {
                return Ok(response);
            }

            let n = self.stream.read_buf(&mut self.read_buffer).await?;
            if n == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "control socket closed",
                )
                .into());
            }
        }
    }

    /// Issue a verb, turning a negative result code into an error.
    async fn call_checked(
        &mut self,
        verb: Verb,
        arg: i64,
        region: Option<UserRegion>,
    ) -> Result<Response> {
        let response = self.call(verb.code(), arg, region).await?;
        if response.result < 0 {
            return Err(Error::from_result_code(response.result));
        }
        Ok(response)
    }

    fn returned_int(response: &Response) -> Result<i32> {
        response
            .region
            .as_ref()
            .and_then(UserRegion::peek_int)
            .ok_or_else(|| Error::Protocol {
                message: "response carries no integer payload".to_string(),
            })
    }

    // =========================================================================
    // Parameter store
    // =========================================================================

    /// Restore the default quantum.
    pub async fn reset(&mut self) -> Result<()> {
        self.call_checked(Verb::Reset, 0, None).await.map(|_| ())
    }

    /// Set the quantum through a pointer argument.
    pub async fn set(&mut self, value: i32) -> Result<()> {
        let region = UserRegion::int(value, Access::ReadOnly);
        self.call_checked(Verb::SetFromPointer, 0, Some(region))
            .await
            .map(|_| ())
    }

    /// Set the quantum by value.
    pub async fn tell(&mut self, value: i32) -> Result<()> {
        self.call_checked(Verb::TellValue, value as i64, None)
            .await
            .map(|_| ())
    }

    /// Read the quantum through a pointer argument.
    pub async fn get(&mut self) -> Result<i32> {
        let region = UserRegion::out(INT_PAYLOAD_LEN);
        let response = self.call_checked(Verb::GetToPointer, 0, Some(region)).await?;
        Self::returned_int(&response)
    }

    /// Read the quantum as the raw result code.
    ///
    /// A negative stored value cannot be told apart from an error code, so
    /// the raw code is returned for the caller to interpret.
    pub async fn query(&mut self) -> Result<i64> {
        Ok(self.call(Verb::QueryValue.code(), 0, None).await?.result)
    }

    /// Swap in `value`, returning the previous quantum.
    pub async fn exchange(&mut self, value: i32) -> Result<i32> {
        let region = UserRegion::int(value, Access::ReadWrite);
        let response = self
            .call_checked(Verb::ExchangeFromPointer, 0, Some(region))
            .await?;
        Self::returned_int(&response)
    }

    /// Store `value` by value; the previous quantum is the raw result code.
    ///
    /// Same caveat as [`query`](Self::query) for negative values.
    pub async fn shift(&mut self, value: i32) -> Result<i64> {
        Ok(self
            .call(Verb::ShiftValue.code(), value as i64, None)
            .await?
            .result)
    }

    // =========================================================================
    // Ledger
    // =========================================================================

    /// Register the calling thread and return its snapshot.
    pub async fn register(&mut self) -> Result<SnapshotRecord> {
        let region = UserRegion::out(SNAPSHOT_LEN);
        let response = self.call_checked(Verb::Register, 0, Some(region)).await?;
        let region = response.region.ok_or_else(|| Error::Protocol {
            message: "register response carries no snapshot".to_string(),
        })?;
        SnapshotRecord::from_bytes(&region.data)
    }
}
