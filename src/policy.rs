//! Page replacement policies.
//!
//! A policy is asked for a frame every time a page fault happens. When the
//! pool still has a free frame the policy hands back the lowest free index;
//! otherwise it names a resident page to evict. The engine owns the frame
//! pool and only lends it to the policy for the duration of the call.

use std::collections::VecDeque;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::memory::FramePool;
use crate::translation::PageKey;

/// Selects the frame that will receive a faulting page
pub trait ReplacementPolicy: std::fmt::Debug {
    fn kind(&self) -> PolicyKind;

    /// Choose the frame for `incoming`.
    ///
    /// `future` is the unprocessed tail of the reference string, in order,
    /// excluding the access being served. Returns `None` only if the
    /// policy's own bookkeeping disagrees with the pool, which is a bug.
    fn select_victim(
        &mut self,
        frames: &FramePool,
        incoming: &PageKey,
        future: &[PageKey],
    ) -> Option<usize>;

    /// Called on every TLB or page table hit of a resident page
    fn touch(&mut self, _key: &PageKey) {}
}

/// Which replacement policy a simulation runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolicyKind {
    #[default]
    Fifo,
    /// Evicts the page loaded longest ago; hits do not refresh recency
    FaultOrderLru,
    /// Evicts the page used longest ago; every hit refreshes recency
    TrueLru,
    /// Belady: evicts the page referenced furthest in the future
    Optimal,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 4] = [
        PolicyKind::Fifo,
        PolicyKind::FaultOrderLru,
        PolicyKind::TrueLru,
        PolicyKind::Optimal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Fifo => "FIFO",
            PolicyKind::FaultOrderLru => "FaultOrderLRU",
            PolicyKind::TrueLru => "TrueLRU",
            PolicyKind::Optimal => "Optimal",
        }
    }

    /// Fresh policy instance with empty bookkeeping
    pub fn build(&self) -> Box<dyn ReplacementPolicy> {
        match self {
            PolicyKind::Fifo => Box::new(Fifo::default()),
            PolicyKind::FaultOrderLru => Box::new(FaultOrderLru::default()),
            PolicyKind::TrueLru => Box::new(TrueLru::default()),
            PolicyKind::Optimal => Box::new(Optimal),
        }
    }
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Plain "LRU" is the fault-order variant
        match s.trim().to_ascii_lowercase().as_str() {
            "fifo" => Ok(PolicyKind::Fifo),
            "lru" | "fault-order-lru" | "faultorderlru" => Ok(PolicyKind::FaultOrderLru),
            "true-lru" | "truelru" => Ok(PolicyKind::TrueLru),
            "optimal" | "opt" | "belady" => Ok(PolicyKind::Optimal),
            _ => Err(ValidationError::UnknownPolicy(s.trim().to_string())),
        }
    }
}

/// Resident pages in the order they were loaded, oldest at the front
#[derive(Debug, Default, Clone)]
struct LoadQueue {
    order: VecDeque<PageKey>,
}

impl LoadQueue {
    fn select(&mut self, frames: &FramePool, incoming: &PageKey) -> Option<usize> {
        if let Some(free) = frames.first_free() {
            self.order.push_back(incoming.clone());
            return Some(free);
        }

        let victim = self.order.pop_front()?;
        let frame = frames.find(&victim)?;
        self.order.push_back(incoming.clone());
        Some(frame)
    }

    fn promote(&mut self, key: &PageKey) {
        if let Some(idx) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(idx) {
                self.order.push_back(k);
            }
        }
    }
}

/// First-in first-out: evicts the page that has been resident longest
#[derive(Debug, Default, Clone)]
pub struct Fifo {
    queue: LoadQueue,
}

impl Fifo {
    /// Resident pages, oldest first
    pub fn queue(&self) -> impl Iterator<Item = &PageKey> + '_ {
        self.queue.order.iter()
    }
}

impl ReplacementPolicy for Fifo {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Fifo
    }

    fn select_victim(
        &mut self,
        frames: &FramePool,
        incoming: &PageKey,
        _future: &[PageKey],
    ) -> Option<usize> {
        self.queue.select(frames, incoming)
    }
}

/// LRU ordered by load time only.
///
/// A page enters the list when a fault loads it and is never moved by later
/// hits, so in practice it evicts like FIFO. Use `TrueLru` for recency.
#[derive(Debug, Default, Clone)]
pub struct FaultOrderLru {
    list: LoadQueue,
}

impl ReplacementPolicy for FaultOrderLru {
    fn kind(&self) -> PolicyKind {
        PolicyKind::FaultOrderLru
    }

    fn select_victim(
        &mut self,
        frames: &FramePool,
        incoming: &PageKey,
        _future: &[PageKey],
    ) -> Option<usize> {
        self.list.select(frames, incoming)
    }
}

/// Recency-based LRU: every hit moves the page to the most-recent end
#[derive(Debug, Default, Clone)]
pub struct TrueLru {
    list: LoadQueue,
}

impl TrueLru {
    /// Resident pages, least recently used first
    pub fn recency(&self) -> impl Iterator<Item = &PageKey> + '_ {
        self.list.order.iter()
    }
}

impl ReplacementPolicy for TrueLru {
    fn kind(&self) -> PolicyKind {
        PolicyKind::TrueLru
    }

    fn select_victim(
        &mut self,
        frames: &FramePool,
        incoming: &PageKey,
        _future: &[PageKey],
    ) -> Option<usize> {
        self.list.select(frames, incoming)
    }

    fn touch(&mut self, key: &PageKey) {
        self.list.promote(key);
    }
}

/// Belady's optimal replacement. Needs the whole future reference string.
///
/// Ties (several pages never referenced again, or equal distances) go to
/// the lowest frame index.
#[derive(Debug, Default, Clone, Copy)]
pub struct Optimal;

/// Index in `future` of the next reference to `key`, `None` if never
pub fn next_use(key: &PageKey, future: &[PageKey]) -> Option<usize> {
    future.iter().position(|k| k == key)
}

impl ReplacementPolicy for Optimal {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Optimal
    }

    fn select_victim(
        &mut self,
        frames: &FramePool,
        _incoming: &PageKey,
        future: &[PageKey],
    ) -> Option<usize> {
        if let Some(free) = frames.first_free() {
            return Some(free);
        }

        let mut best: Option<(usize, usize)> = None;
        for (frame, key) in frames.occupied() {
            let distance = next_use(key, future).unwrap_or(usize::MAX);
            match best {
                Some((_, best_distance)) if distance <= best_distance => {}
                _ => best = Some((frame, distance)),
            }
        }
        best.map(|(frame, _)| frame)
    }
}
