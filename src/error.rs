//! Error types for configuring and driving a simulation.

use thiserror::Error;

/// Bad input rejected by `Simulator::configure` or the text parsers.
///
/// A validation failure never leaves partial state behind: the simulator
/// stays `Uninitialized`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Memory size must be a positive integer.")]
    NonPositiveMemorySize,

    #[error("Page size must be a positive integer.")]
    NonPositivePageSize,

    #[error("Memory size {memory_size} holds no frames of page size {page_size}.")]
    NoFrames { memory_size: u64, page_size: u64 },

    #[error("TLB capacity must be at least 1.")]
    ZeroTlbCapacity,

    #[error("Process ID cannot be empty.")]
    EmptyPid,

    #[error("Size missing for process {0}.")]
    MissingProcessSize(String),

    #[error("Invalid size for process {pid}: {value}")]
    InvalidProcessSize { pid: String, value: String },

    #[error("Size for process {0} must be positive.")]
    NonPositiveProcessSize(String),

    #[error("Duplicate PID: {0}")]
    DuplicatePid(String),

    #[error("At least one process must be defined.")]
    NoProcesses,

    #[error("Address sequence must be in PID:VA format, found {0:?}.")]
    MalformedAccess(String),

    #[error("Invalid virtual address in sequence: {0}")]
    InvalidAddress(String),

    #[error("Invalid PID {0} in sequence.")]
    UnknownPid(String),

    #[error("Address {address} out of range for process {pid} (size {size}).")]
    AddressOutOfRange { pid: String, address: u64, size: u64 },

    #[error("Address sequence cannot be empty.")]
    EmptySequence,

    #[error("Unknown replacement policy: {0}")]
    UnknownPolicy(String),
}

/// Errors from driving a `Simulator`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    #[error("simulation is not configured")]
    NotConfigured,

    #[error("no process with PID {0}")]
    UnknownProcess(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Errors from loading and running a scenario file.
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("scenario has no `{0}` line")]
    MissingKey(&'static str),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Sim(#[from] SimError),
}

/// A broken engine invariant, reported by `Simulator::check_invariants`.
///
/// Seeing one of these means the engine itself is wrong, not its input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("frame {frame} holds {pid}:{page} but its page table entry is {entry:?}")]
    FrameNotMapped {
        frame: usize,
        pid: String,
        page: usize,
        entry: Option<usize>,
    },

    #[error("page table of {pid} maps page {page} to frame {frame}, which holds something else")]
    DanglingPageTableEntry { pid: String, page: usize, frame: usize },

    #[error("page table of {pid} maps page {page} to frame {frame}, past the {frames} frames")]
    FrameOutOfRange {
        pid: String,
        page: usize,
        frame: usize,
        frames: usize,
    },

    #[error("frame {frame} holds {pid}:{page}, which is not a known page")]
    UnknownOccupant { frame: usize, pid: String, page: usize },

    #[error("TLB holds {len} entries, capacity is {capacity}")]
    TlbOverflow { len: usize, capacity: usize },

    #[error("{faults} faults + {hits} hits != {steps} steps")]
    CounterMismatch { faults: u64, hits: u64, steps: usize },
}

pub type SimResult<T> = Result<T, SimError>;
