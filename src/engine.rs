//! Step-driven paging simulation.
//!
//! A `Simulator` starts `Uninitialized`. `configure` validates a `SimConfig`
//! and builds the processes, the frame pool and an empty TLB in one go;
//! each `step` then serves exactly one access of the reference string:
//!
//! ```text
//! TLB ──hit──▶ done
//!  │ miss
//!  ▼
//! page table ──hit──▶ refresh TLB ──▶ done
//!  │ unmapped
//!  ▼
//! page fault ──▶ policy picks frame ──▶ unmap old owner ──▶ map ──▶ refresh TLB
//! ```
//!
//! `reset` drops everything and returns to `Uninitialized`. A step is never
//! observable half-done, so reset is always safe between calls.

use std::collections::HashMap;

use log::{debug, info};

use crate::constants::DEFAULT_TLB_CAPACITY;
use crate::error::{InvariantViolation, SimError, SimResult, ValidationError};
use crate::memory::{Frame, FramePool, Tlb, TlbEntry};
use crate::policy::{PolicyKind, ReplacementPolicy};
use crate::process::{Process, ProcessSpec};
use crate::stats::Statistics;
use crate::translation::PageKey;

/// One element of the reference string: `pid` touches `va`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressAccess {
    pub pid: String,
    pub va: u64,
}

impl AddressAccess {
    pub fn new(pid: impl Into<String>, va: u64) -> Self {
        AddressAccess { pid: pid.into(), va }
    }
}

impl std::fmt::Display for AddressAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.pid, self.va)
    }
}

/// Everything needed to start a simulation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    pub memory_size: u64,
    pub page_size: u64,
    pub tlb_capacity: usize,
    pub policy: PolicyKind,
    pub processes: Vec<ProcessSpec>,
    pub accesses: Vec<AddressAccess>,
}

impl SimConfig {
    pub fn new(memory_size: u64, page_size: u64) -> Self {
        SimConfig {
            memory_size,
            page_size,
            tlb_capacity: DEFAULT_TLB_CAPACITY,
            policy: PolicyKind::default(),
            processes: Vec::new(),
            accesses: Vec::new(),
        }
    }

    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_tlb_capacity(mut self, capacity: usize) -> Self {
        self.tlb_capacity = capacity;
        self
    }

    pub fn with_process(mut self, pid: impl Into<String>, size: u64) -> Self {
        self.processes.push(ProcessSpec::new(pid, size));
        self
    }

    pub fn with_access(mut self, pid: impl Into<String>, va: u64) -> Self {
        self.accesses.push(AddressAccess::new(pid, va));
        self
    }

    pub fn with_accesses(mut self, accesses: impl IntoIterator<Item = AddressAccess>) -> Self {
        self.accesses.extend(accesses);
        self
    }

    pub fn num_frames(&self) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        (self.memory_size / self.page_size) as usize
    }

    /// Check every input, in the order the checks are reported
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.memory_size == 0 {
            return Err(ValidationError::NonPositiveMemorySize);
        }
        if self.page_size == 0 {
            return Err(ValidationError::NonPositivePageSize);
        }
        if self.num_frames() == 0 {
            return Err(ValidationError::NoFrames {
                memory_size: self.memory_size,
                page_size: self.page_size,
            });
        }
        if self.tlb_capacity == 0 {
            return Err(ValidationError::ZeroTlbCapacity);
        }

        let mut sizes: HashMap<&str, u64> = HashMap::new();
        for spec in &self.processes {
            if spec.pid.is_empty() {
                return Err(ValidationError::EmptyPid);
            }
            if spec.size == 0 {
                return Err(ValidationError::NonPositiveProcessSize(spec.pid.clone()));
            }
            if sizes.insert(spec.pid.as_str(), spec.size).is_some() {
                return Err(ValidationError::DuplicatePid(spec.pid.clone()));
            }
        }
        if sizes.is_empty() {
            return Err(ValidationError::NoProcesses);
        }

        for access in &self.accesses {
            let Some(&size) = sizes.get(access.pid.as_str()) else {
                return Err(ValidationError::UnknownPid(access.pid.clone()));
            };
            if access.va >= size {
                return Err(ValidationError::AddressOutOfRange {
                    pid: access.pid.clone(),
                    address: access.va,
                    size,
                });
            }
        }
        if self.accesses.is_empty() {
            return Err(ValidationError::EmptySequence);
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimState {
    Uninitialized,
    Configured,
    Running,
    Completed,
}

/// How an access was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    TlbHit,
    PageTableHit,
    PageFault,
}

impl Outcome {
    pub fn is_hit(&self) -> bool {
        !matches!(self, Outcome::PageFault)
    }
}

/// Result of one `step`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    /// Position of the access in the reference string
    pub step: usize,
    pub pid: String,
    pub va: u64,
    pub page: usize,
    pub offset: u64,
    pub outcome: Outcome,
    pub frame: usize,
    pub physical_address: u64,
    /// Page pushed out of `frame` to make room, on a fault with no free frame
    pub evicted: Option<PageKey>,
}

impl std::fmt::Display for StepRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Process {}: Accessing VA {} (Page {}, Offset {}): ",
            self.pid, self.va, self.page, self.offset
        )?;
        match self.outcome {
            Outcome::TlbHit => write!(f, "TLB Hit!")?,
            Outcome::PageTableHit => write!(f, "TLB Miss, Page Table Hit!")?,
            Outcome::PageFault => {
                write!(f, "Page Fault! ")?;
                if let Some(old) = &self.evicted {
                    write!(f, "Evicted {}. ", old)?;
                }
                write!(f, "Loaded into Frame {}.", self.frame)?;
            }
        }
        write!(f, " Physical Address: {}", self.physical_address)
    }
}

/// State that exists only between a successful configure and a reset
#[derive(Debug)]
struct Session {
    page_size: u64,
    processes: Vec<Process>,
    by_pid: HashMap<String, usize>,
    frames: FramePool,
    tlb: Tlb,
    policy: Box<dyn ReplacementPolicy>,
    accesses: Vec<AddressAccess>,
    /// `accesses` resolved to pages, for lookahead
    references: Vec<PageKey>,
    next: usize,
    page_faults: u64,
    hits: u64,
}

impl Session {
    /// Build from an already validated config
    fn build(config: &SimConfig) -> Result<Self, ValidationError> {
        let mut processes = Vec::with_capacity(config.processes.len());
        let mut by_pid = HashMap::with_capacity(config.processes.len());
        for spec in &config.processes {
            by_pid.insert(spec.pid.clone(), processes.len());
            let process = Process::new(spec.pid.as_str(), spec.size, config.page_size)?;
            debug!(
                "process {}: {} bytes in {} pages",
                process.pid(),
                process.size(),
                process.num_pages()
            );
            processes.push(process);
        }

        let references = config
            .accesses
            .iter()
            .map(|a| PageKey::new(a.pid.as_str(), (a.va / config.page_size) as usize))
            .collect();

        Ok(Session {
            page_size: config.page_size,
            processes,
            by_pid,
            frames: FramePool::new(config.num_frames()),
            tlb: Tlb::new(config.tlb_capacity),
            policy: config.policy.build(),
            accesses: config.accesses.clone(),
            references,
            next: 0,
            page_faults: 0,
            hits: 0,
        })
    }

    fn is_done(&self) -> bool {
        self.next >= self.accesses.len()
    }

    fn process(&self, pid: &str) -> Option<&Process> {
        self.by_pid.get(pid).map(|&idx| &self.processes[idx])
    }

    /// Serve the next access. Caller checks `is_done` first.
    fn serve(&mut self) -> StepRecord {
        let step = self.next;
        let AddressAccess { pid, va } = self.accesses[step].clone();
        let key = self.references[step].clone();
        let owner = self.by_pid[&pid];

        debug_assert!(self.processes[owner].contains(va), "{}:{} escaped validation", pid, va);
        let addr = self.processes[owner].split(va);
        let resident = self.processes[owner].frame_of(addr.page);

        let (outcome, frame, evicted) =
            if let Some(frame) = self.tlb.lookup(&pid, addr.page, resident) {
                (Outcome::TlbHit, frame, None)
            } else if let Some(frame) = resident {
                self.tlb.refresh(&pid, addr.page, frame);
                (Outcome::PageTableHit, frame, None)
            } else {
                let (frame, evicted) = self.fault_in(&key, step);
                self.processes[owner].map(addr.page, frame);
                self.tlb.refresh(&pid, addr.page, frame);
                (Outcome::PageFault, frame, evicted)
            };

        if outcome.is_hit() {
            self.hits += 1;
            self.policy.touch(&key);
        } else {
            self.page_faults += 1;
        }
        self.next += 1;

        StepRecord {
            step,
            pid,
            va,
            page: addr.page,
            offset: addr.offset,
            outcome,
            frame,
            physical_address: addr.to_physical(frame, self.page_size),
            evicted,
        }
    }

    /// Find a frame for `key` and hand it over, unmapping whoever held it
    fn fault_in(&mut self, key: &PageKey, step: usize) -> (usize, Option<PageKey>) {
        let future = &self.references[step + 1..];
        let frame = match self.policy.select_victim(&self.frames, key, future) {
            Some(frame) if frame < self.frames.len() => frame,
            other => panic!(
                "{} policy could not place {} (answered {:?}) with {} of {} frames occupied",
                self.policy.kind(),
                key,
                other,
                self.frames.occupied_count(),
                self.frames.len()
            ),
        };

        let evicted = self.frames.get(frame).and_then(Frame::occupant).cloned();
        if let Some(old) = &evicted {
            debug!("evicting {} from frame {}", old, frame);
            let old_owner = self.by_pid[&old.pid];
            self.processes[old_owner].unmap(old.page);
        }
        self.frames.assign(frame, key.clone());

        (frame, evicted)
    }

    fn stats(&self) -> Statistics {
        Statistics::new(
            self.page_faults,
            self.hits,
            self.tlb.hits(),
            self.tlb.misses(),
            self.frames.utilization(),
        )
    }

    fn check_invariants(&self) -> Result<(), InvariantViolation> {
        for (frame, key) in self.frames.occupied() {
            let Some(process) = self.process(&key.pid).filter(|p| key.page < p.num_pages()) else {
                return Err(InvariantViolation::UnknownOccupant {
                    frame,
                    pid: key.pid.clone(),
                    page: key.page,
                });
            };
            let entry = process.frame_of(key.page);
            if entry != Some(frame) {
                return Err(InvariantViolation::FrameNotMapped {
                    frame,
                    pid: key.pid.clone(),
                    page: key.page,
                    entry,
                });
            }
        }

        for process in &self.processes {
            for (page, entry) in process.page_table().iter().enumerate() {
                let Some(frame) = *entry else { continue };
                let Some(slot) = self.frames.get(frame) else {
                    return Err(InvariantViolation::FrameOutOfRange {
                        pid: process.pid().to_string(),
                        page,
                        frame,
                        frames: self.frames.len(),
                    });
                };
                if !slot.occupant().is_some_and(|k| k.matches(process.pid(), page)) {
                    return Err(InvariantViolation::DanglingPageTableEntry {
                        pid: process.pid().to_string(),
                        page,
                        frame,
                    });
                }
            }
        }

        if self.tlb.len() > self.tlb.capacity() {
            return Err(InvariantViolation::TlbOverflow {
                len: self.tlb.len(),
                capacity: self.tlb.capacity(),
            });
        }

        if self.page_faults + self.hits != self.next as u64 {
            return Err(InvariantViolation::CounterMismatch {
                faults: self.page_faults,
                hits: self.hits,
                steps: self.next,
            });
        }

        Ok(())
    }
}

/// The paging simulation state machine
#[derive(Debug)]
pub struct Simulator {
    state: SimState,
    session: Option<Session>,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    pub fn new() -> Self {
        Simulator {
            state: SimState::Uninitialized,
            session: None,
        }
    }

    /// Validate `config` and build a fresh simulation from it.
    ///
    /// On failure any previous simulation is discarded and the simulator is
    /// left `Uninitialized`.
    pub fn configure(&mut self, config: &SimConfig) -> Result<(), ValidationError> {
        let session = match config.validate().and_then(|()| Session::build(config)) {
            Ok(session) => session,
            Err(e) => {
                self.reset();
                return Err(e);
            }
        };
        info!(
            "configured {} frames of {} bytes, {} processes, {} accesses, policy {}, TLB {}",
            session.frames.len(),
            config.page_size,
            session.processes.len(),
            session.accesses.len(),
            config.policy,
            config.tlb_capacity
        );
        self.session = Some(session);
        self.state = SimState::Configured;
        Ok(())
    }

    /// Serve the next access.
    ///
    /// Returns `Ok(None)` once the reference string is exhausted; nothing is
    /// mutated in that case.
    pub fn step(&mut self) -> SimResult<Option<StepRecord>> {
        let session = self.session.as_mut().ok_or(SimError::NotConfigured)?;
        if session.is_done() {
            self.state = SimState::Completed;
            return Ok(None);
        }

        let record = session.serve();
        debug!("step {}: {}", record.step, record);
        debug_assert_eq!(session.check_invariants(), Ok(()));

        if session.is_done() {
            info!("simulation completed: {}", session.stats());
            self.state = SimState::Completed;
        } else {
            self.state = SimState::Running;
        }
        Ok(Some(record))
    }

    /// Step until the reference string is exhausted
    pub fn run_to_completion(&mut self) -> SimResult<Vec<StepRecord>> {
        let mut records = Vec::with_capacity(self.remaining());
        while let Some(record) = self.step()? {
            records.push(record);
        }
        Ok(records)
    }

    /// Drop all simulation state and return to `Uninitialized`
    pub fn reset(&mut self) {
        if self.session.take().is_some() {
            info!("simulation reset");
        }
        self.state = SimState::Uninitialized;
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    /// Number of accesses served so far
    pub fn current_step(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.next)
    }

    pub fn total_steps(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.accesses.len())
    }

    pub fn remaining(&self) -> usize {
        self.total_steps() - self.current_step()
    }

    pub fn policy(&self) -> Option<PolicyKind> {
        self.session.as_ref().map(|s| s.policy.kind())
    }

    pub fn page_size(&self) -> Option<u64> {
        self.session.as_ref().map(|s| s.page_size)
    }

    pub fn frame_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.frames.len())
    }

    /// Process ids in configuration order
    pub fn pids(&self) -> Vec<&str> {
        self.session
            .as_ref()
            .map(|s| s.processes.iter().map(Process::pid).collect())
            .unwrap_or_default()
    }

    fn session(&self) -> SimResult<&Session> {
        self.session.as_ref().ok_or(SimError::NotConfigured)
    }

    pub fn process(&self, pid: &str) -> SimResult<&Process> {
        self.session()?
            .process(pid)
            .ok_or_else(|| SimError::UnknownProcess(pid.to_string()))
    }

    /// Page table of `pid`: frame per page, `None` when not resident
    pub fn page_table_of(&self, pid: &str) -> SimResult<&[Option<usize>]> {
        Ok(self.process(pid)?.page_table())
    }

    pub fn frame_table_snapshot(&self) -> SimResult<&[Frame]> {
        Ok(self.session()?.frames.frames())
    }

    pub fn frame_pool(&self) -> SimResult<&FramePool> {
        Ok(&self.session()?.frames)
    }

    /// TLB entries, oldest first
    pub fn tlb_snapshot(&self) -> SimResult<Vec<TlbEntry>> {
        Ok(self.session()?.tlb.entries().cloned().collect())
    }

    pub fn tlb(&self) -> SimResult<&Tlb> {
        Ok(&self.session()?.tlb)
    }

    /// Current counters; all zero before configuration
    pub fn stats_snapshot(&self) -> Statistics {
        self.session
            .as_ref()
            .map(Session::stats)
            .unwrap_or_default()
    }

    /// Verify the frame/page-table bijection, the TLB bound and the
    /// step counters. Always `Ok` when unconfigured.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        match &self.session {
            Some(session) => session.check_invariants(),
            None => Ok(()),
        }
    }
}
