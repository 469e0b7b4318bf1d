//! Identity of the execution context issuing a command.
//!
//! The endpoint never looks up "the current task" implicitly. Each request
//! is turned into an explicit [`CallerContext`] from the peer credentials of
//! the connection and the thread id the caller declares, and that context
//! is what the ledger and the snapshot see.

use std::path::PathBuf;

use qctl_core::SnapshotRecord;

/// `MAX_RT_PRIO`: `/proc` reports priorities offset by this much.
const MAX_RT_PRIO: i32 = 100;
/// Static priority of a task with nice 0.
const DEFAULT_STATIC_PRIO: i32 = 120;

const SCHED_FIFO: i32 = 1;
const SCHED_RR: i32 = 2;
const SCHED_DEADLINE: i32 = 6;

/// Who is calling: thread id and owning process id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallerContext {
    /// Thread id of the caller.
    pub caller_id: i32,
    /// Process (thread-group) id of the caller.
    pub group_id: i32,
}

impl CallerContext {
    pub fn new(caller_id: i32, group_id: i32) -> Self {
        Self {
            caller_id,
            group_id,
        }
    }

    /// Build a context from the peer's process id and the thread id it
    /// declared.
    ///
    /// A declared thread id that is not a thread of the peer process is
    /// ignored and the process id stands in for it. Without peer credentials
    /// both ids are 0.
    pub fn resolve(peer_pid: Option<i32>, declared_tid: Option<i32>) -> Self {
        let Some(pid) = peer_pid else {
            return Self::new(0, 0);
        };

        match declared_tid {
            Some(tid) if tid == pid || task_dir(pid, tid).exists() => Self::new(tid, pid),
            Some(tid) => {
                tracing::debug!(pid, tid, "Declared thread id not in peer process, using pid");
                Self::new(pid, pid)
            }
            None => Self::new(pid, pid),
        }
    }

    /// The context of the calling thread of this process.
    pub fn current() -> Self {
        let pid = std::process::id() as i32;
        Self::new(nix::unistd::gettid().as_raw(), pid)
    }

    /// Capture the scheduling attributes of this context.
    ///
    /// Attributes that cannot be read (the task already exited, no procfs)
    /// are left at zero; the ids are always filled in.
    pub fn snapshot(&self) -> SnapshotRecord {
        let mut snap = SnapshotRecord {
            pid: self.caller_id,
            tgid: self.group_id,
            ..SnapshotRecord::default()
        };

        let dir = task_dir(self.group_id, self.caller_id);
        if let Ok(stat) = std::fs::read_to_string(dir.join("stat")) {
            if let Some(fields) = StatFields::parse(&stat) {
                fields.apply(&mut snap);
            }
        }
        if let Ok(status) = std::fs::read_to_string(dir.join("status")) {
            apply_status(&status, &mut snap);
        }

        snap
    }
}

fn task_dir(pid: i32, tid: i32) -> PathBuf {
    PathBuf::from(format!("/proc/{}/task/{}", pid, tid))
}

/// The `/proc/<pid>/task/<tid>/stat` fields the snapshot needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StatFields {
    state: char,
    priority: i32,
    nice: i32,
    kstkesp: u64,
    processor: i32,
    rt_priority: i32,
    policy: i32,
}

impl StatFields {
    /// Parse a stat line. The command name may contain spaces and
    /// parentheses, so fields are counted from the last `)`.
    fn parse(line: &str) -> Option<Self> {
        let rest = &line[line.rfind(')')? + 1..];
        let fields: Vec<&str> = rest.split_whitespace().collect();
        // fields[0] is field 3 (state) of proc(5)
        let field = |n: usize| fields.get(n - 3).copied();

        Some(Self {
            state: field(3)?.chars().next()?,
            priority: field(18)?.parse().ok()?,
            nice: field(19)?.parse().ok()?,
            kstkesp: field(29)?.parse().ok()?,
            processor: field(39)?.parse().ok()?,
            rt_priority: field(40)?.parse().ok()?,
            policy: field(41)?.parse().ok()?,
        })
    }

    fn apply(&self, snap: &mut SnapshotRecord) {
        snap.state = task_state(self.state);
        snap.stack = self.kstkesp;
        snap.cpu = self.processor;
        snap.prio = self.priority + MAX_RT_PRIO;
        snap.static_prio = DEFAULT_STATIC_PRIO + self.nice;
        snap.rt_priority = self.rt_priority;
        snap.normal_prio = match self.policy {
            SCHED_FIFO | SCHED_RR => MAX_RT_PRIO - 1 - self.rt_priority,
            SCHED_DEADLINE => -1,
            _ => snap.static_prio,
        };
    }
}

/// Map the one-letter state of `/proc` back to the scheduler's bit value.
fn task_state(code: char) -> i64 {
    match code {
        'R' => 0x0000,
        'S' => 0x0001,
        'D' => 0x0002,
        'T' => 0x0004,
        't' => 0x0008,
        'X' => 0x0010,
        'Z' => 0x0020,
        'P' => 0x0040,
        'I' => 0x0402,
        _ => 0,
    }
}

fn apply_status(status: &str, snap: &mut SnapshotRecord) {
    for line in status.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key {
            "voluntary_ctxt_switches" => snap.nvcsw = value.parse().unwrap_or(0),
            "nonvoluntary_ctxt_switches" => snap.nivcsw = value.parse().unwrap_or(0),
            _ => {}
        }
    }
}
