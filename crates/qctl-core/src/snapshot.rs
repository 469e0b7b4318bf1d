//! Point-in-time copy of a caller's scheduling and identity attributes.

use std::fmt;

use bytes::{Buf, BufMut, BytesMut};

use crate::constants::SNAPSHOT_LEN;
use crate::error::{Error, Result};

/// Scheduling/identity attributes of the execution context that issued a
/// `Register` call.
///
/// Produced fresh for every call and handed back to the caller; the
/// endpoint never stores it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotRecord {
    /// Scheduler state (0 = running/runnable, positive = sleeping/stopped).
    pub state: i64,
    /// Stack pointer as last seen by the scheduler.
    pub stack: u64,
    /// CPU the context last ran on.
    pub cpu: i32,
    /// Effective priority.
    pub prio: i32,
    /// Priority derived from the nice value.
    pub static_prio: i32,
    /// Priority before priority-inheritance boosting.
    pub normal_prio: i32,
    /// Realtime priority (0 for normal tasks).
    pub rt_priority: i32,
    /// Thread id.
    pub pid: i32,
    /// Thread-group (process) id.
    pub tgid: i32,
    /// Voluntary context switches.
    pub nvcsw: u64,
    /// Involuntary context switches.
    pub nivcsw: u64,
}

impl SnapshotRecord {
    /// Encode into the fixed little-endian layout.
    pub fn to_bytes(&self) -> [u8; SNAPSHOT_LEN] {
        let mut buf = BytesMut::with_capacity(SNAPSHOT_LEN);
        buf.put_i64_le(self.state);
        buf.put_u64_le(self.stack);
        buf.put_i32_le(self.cpu);
        buf.put_i32_le(self.prio);
        buf.put_i32_le(self.static_prio);
        buf.put_i32_le(self.normal_prio);
        buf.put_i32_le(self.rt_priority);
        buf.put_i32_le(self.pid);
        buf.put_i32_le(self.tgid);
        buf.put_u64_le(self.nvcsw);
        buf.put_u64_le(self.nivcsw);

        let mut out = [0u8; SNAPSHOT_LEN];
        out.copy_from_slice(&buf);
        out
    }

    /// Decode from the fixed layout. Trailing bytes are ignored.
    pub fn from_bytes(mut data: &[u8]) -> Result<Self> {
        if data.len() < SNAPSHOT_LEN {
            return Err(Error::Codec {
                message: format!(
                    "snapshot too short: {} bytes (need {})",
                    data.len(),
                    SNAPSHOT_LEN
                ),
            });
        }

        Ok(Self {
            state: data.get_i64_le(),
            stack: data.get_u64_le(),
            cpu: data.get_i32_le(),
            prio: data.get_i32_le(),
            static_prio: data.get_i32_le(),
            normal_prio: data.get_i32_le(),
            rt_priority: data.get_i32_le(),
            pid: data.get_i32_le(),
            tgid: data.get_i32_le(),
            nvcsw: data.get_u64_le(),
            nivcsw: data.get_u64_le(),
        })
    }
}

impl fmt::Display for SnapshotRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "state: {}, stack {:x}, cpu {}, prio {}, sprio {}, nprio {}, rtprio {}, pid {}, tgid {}, nv {}, niv {}",
            self.state,
            self.stack,
            self.cpu,
            self.prio,
            self.static_prio,
            self.normal_prio,
            self.rt_priority,
            self.pid,
            self.tgid,
            self.nvcsw,
            self.nivcsw
        )
    }
}
