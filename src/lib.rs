pub mod constants;
pub mod engine;
pub mod error;
pub mod io;
pub mod memory;
pub mod policy;
pub mod process;
pub mod stats;
pub mod translation;

// Re-export commonly used items for convenience
pub use constants::*;
pub use engine::{AddressAccess, Outcome, SimConfig, SimState, Simulator, StepRecord};
pub use error::{InvariantViolation, ScenarioError, SimError, SimResult, ValidationError};
pub use memory::{Frame, FramePool, Tlb, TlbEntry};
pub use policy::{PolicyKind, ReplacementPolicy};
pub use process::{Process, ProcessSpec};
pub use stats::Statistics;
pub use translation::{PageKey, VirtualAddress};
