use std::collections::VecDeque;

use log::trace;

use crate::translation::PageKey;

/// One physical frame: free, or holding exactly one page of one process
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Frame {
    #[default]
    Free,
    Occupied(PageKey),
}

impl Frame {
    pub fn is_free(&self) -> bool {
        matches!(self, Frame::Free)
    }

    pub fn occupant(&self) -> Option<&PageKey> {
        match self {
            Frame::Free => None,
            Frame::Occupied(key) => Some(key),
        }
    }
}

/// Fixed-length arena of physical frames shared by every process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePool {
    frames: Vec<Frame>,
}

impl FramePool {
    /// Create a pool of `num_frames` free frames
    pub fn new(num_frames: usize) -> Self {
        FramePool {
            frames: vec![Frame::Free; num_frames],
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    pub fn get(&self, frame: usize) -> Option<&Frame> {
        self.frames.get(frame)
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Lowest-index free frame
    pub fn first_free(&self) -> Option<usize> {
        self.frames.iter().position(Frame::is_free)
    }

    /// Frame holding `key`, if resident
    pub fn find(&self, key: &PageKey) -> Option<usize> {
        self.frames
            .iter()
            .position(|frame| frame.occupant() == Some(key))
    }

    /// Iterate `(frame index, occupant)` over occupied frames, lowest index first
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &PageKey)> + '_ {
        self.frames
            .iter()
            .enumerate()
            .filter_map(|(idx, frame)| frame.occupant().map(|key| (idx, key)))
    }

    pub fn occupied_count(&self) -> usize {
        self.frames.iter().filter(|frame| !frame.is_free()).count()
    }

    /// Place `key` in `frame`, returning whoever was there before
    pub fn assign(&mut self, frame: usize, key: PageKey) -> Option<PageKey> {
        match std::mem::replace(&mut self.frames[frame], Frame::Occupied(key)) {
            Frame::Free => None,
            Frame::Occupied(old) => Some(old),
        }
    }

    /// Occupied frames as a percentage of all frames
    pub fn utilization(&self) -> f64 {
        if self.frames.is_empty() {
            return 0.0;
        }
        self.occupied_count() as f64 * 100.0 / self.frames.len() as f64
    }
}

impl std::fmt::Display for FramePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Physical Memory:")?;
        for (idx, frame) in self.frames.iter().enumerate() {
            match frame {
                Frame::Free => writeln!(f, "Frame {}: Free", idx)?,
                Frame::Occupied(key) => {
                    writeln!(f, "Frame {}: PID {} Page {}", idx, key.pid, key.page)?
                }
            }
        }
        Ok(())
    }
}

/// A cached `(pid, page) -> frame` translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlbEntry {
    pub pid: String,
    pub page: usize,
    pub frame: usize,
}

/// Translation lookaside buffer.
///
/// Entries are kept oldest first and evicted FIFO on overflow, whatever
/// replacement policy the frame pool is using. Lookups are linear; the
/// buffer is a handful of entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlb {
    entries: VecDeque<TlbEntry>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl Tlb {
    pub fn new(capacity: usize) -> Self {
        Tlb {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            hits: 0,
            misses: 0,
        }
    }

    /// Look up `(pid, page)`, counting a hit or a miss.
    ///
    /// `resident` is the frame the page table currently holds for the page.
    /// An entry that names any other frame is stale: it is dropped and the
    /// lookup counts as a miss, so a reassigned frame is never reported.
    pub fn lookup(&mut self, pid: &str, page: usize, resident: Option<usize>) -> Option<usize> {
        let found = self
            .entries
            .iter()
            .position(|entry| entry.page == page && entry.pid == pid);

        match found {
            Some(idx) if Some(self.entries[idx].frame) == resident => {
                self.hits += 1;
                resident
            }
            Some(idx) => {
                if let Some(stale) = self.entries.remove(idx) {
                    trace!(
                        "dropping stale TLB entry {}:{} -> frame {}",
                        stale.pid, stale.page, stale.frame
                    );
                }
                self.misses += 1;
                None
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert a translation, evicting the oldest entry when full
    pub fn refresh(&mut self, pid: &str, page: usize, frame: usize) {
        if self.entries.len() >= self.capacity {
            if let Some(old) = self.entries.pop_front() {
                trace!("TLB full, evicting {}:{} -> frame {}", old.pid, old.page, old.frame);
            }
        }
        trace!("TLB insert {}:{} -> frame {}", pid, page, frame);
        self.entries.push_back(TlbEntry {
            pid: pid.to_string(),
            page,
            frame,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn entries(&self) -> impl Iterator<Item = &TlbEntry> + '_ {
        self.entries.iter()
    }
}

impl std::fmt::Display for Tlb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "TLB:")?;
        for e in &self.entries {
            writeln!(f, "PID {}, Page {} -> Frame {}", e.pid, e.page, e.frame)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Frame pool
    // =========================================================================

    #[test]
    fn test_pool_initialization() {
        let pool = FramePool::new(4);
        assert_eq!(pool.len(), 4);
        assert_eq!(pool.occupied_count(), 0);
        assert_eq!(pool.first_free(), Some(0));
        assert_eq!(pool.utilization(), 0.0);
    }

    #[test]
    fn test_assign_and_find() {
        let mut pool = FramePool::new(3);
        assert_eq!(pool.assign(1, PageKey::new("A", 0)), None);

        assert_eq!(pool.find(&PageKey::new("A", 0)), Some(1));
        assert_eq!(pool.find(&PageKey::new("A", 1)), None);
        assert_eq!(pool.first_free(), Some(0));
    }

    #[test]
    fn test_assign_returns_previous_occupant() {
        let mut pool = FramePool::new(1);
        pool.assign(0, PageKey::new("A", 0));
        let old = pool.assign(0, PageKey::new("B", 2));
        assert_eq!(old, Some(PageKey::new("A", 0)));
        assert_eq!(pool.get(0), Some(&Frame::Occupied(PageKey::new("B", 2))));
    }

    #[test]
    fn test_first_free_skips_occupied() {
        let mut pool = FramePool::new(3);
        pool.assign(0, PageKey::new("A", 0));
        pool.assign(1, PageKey::new("A", 1));
        assert_eq!(pool.first_free(), Some(2));
        pool.assign(2, PageKey::new("A", 2));
        assert_eq!(pool.first_free(), None);
    }

    #[test]
    fn test_utilization() {
        let mut pool = FramePool::new(4);
        pool.assign(0, PageKey::new("A", 0));
        assert_eq!(pool.utilization(), 25.0);
        pool.assign(3, PageKey::new("A", 1));
        assert_eq!(pool.utilization(), 50.0);
    }

    #[test]
    fn test_occupied_iter_in_frame_order() {
        let mut pool = FramePool::new(4);
        pool.assign(2, PageKey::new("B", 0));
        pool.assign(0, PageKey::new("A", 5));
        let occupied: Vec<_> = pool.occupied().map(|(idx, key)| (idx, key.to_string())).collect();
        assert_eq!(occupied, vec![(0, "A:5".to_string()), (2, "B:0".to_string())]);
    }

    #[test]
    fn test_pool_display() {
        let mut pool = FramePool::new(2);
        pool.assign(0, PageKey::new("A", 1));
        assert_eq!(
            pool.to_string(),
            "Physical Memory:\nFrame 0: PID A Page 1\nFrame 1: Free\n"
        );
    }

    // =========================================================================
    // TLB
    // =========================================================================

    #[test]
    fn test_tlb_miss_then_hit() {
        let mut tlb = Tlb::new(4);
        assert_eq!(tlb.lookup("A", 0, Some(2)), None);
        tlb.refresh("A", 0, 2);
        assert_eq!(tlb.lookup("A", 0, Some(2)), Some(2));
        assert_eq!(tlb.hits(), 1);
        assert_eq!(tlb.misses(), 1);
    }

    #[test]
    fn test_tlb_distinguishes_pids() {
        let mut tlb = Tlb::new(4);
        tlb.refresh("A", 0, 0);
        assert_eq!(tlb.lookup("B", 0, None), None);
        assert_eq!(tlb.misses(), 1);
    }

    #[test]
    fn test_tlb_evicts_oldest() {
        let mut tlb = Tlb::new(2);
        tlb.refresh("A", 0, 0);
        tlb.refresh("A", 1, 1);
        tlb.refresh("A", 2, 2);

        assert_eq!(tlb.len(), 2);
        let pages: Vec<usize> = tlb.entries().map(|e| e.page).collect();
        assert_eq!(pages, vec![1, 2]);
    }

    #[test]
    fn test_tlb_hit_does_not_reorder() {
        let mut tlb = Tlb::new(2);
        tlb.refresh("A", 0, 0);
        tlb.refresh("A", 1, 1);
        // A hit on the oldest entry does not save it from eviction
        assert_eq!(tlb.lookup("A", 0, Some(0)), Some(0));
        tlb.refresh("A", 2, 2);
        let pages: Vec<usize> = tlb.entries().map(|e| e.page).collect();
        assert_eq!(pages, vec![1, 2]);
    }

    #[test]
    fn test_tlb_stale_entry_is_a_miss() {
        let mut tlb = Tlb::new(4);
        tlb.refresh("A", 0, 0);

        // Page A:0 was evicted from frame 0 since the entry was cached
        assert_eq!(tlb.lookup("A", 0, None), None);
        assert_eq!(tlb.misses(), 1);
        assert_eq!(tlb.hits(), 0);
        assert!(tlb.is_empty());
    }

    #[test]
    fn test_tlb_stale_entry_moved_frame() {
        let mut tlb = Tlb::new(4);
        tlb.refresh("A", 0, 0);
        // A:0 now lives in frame 1
        assert_eq!(tlb.lookup("A", 0, Some(1)), None);
        assert_eq!(tlb.len(), 0);
    }

    #[test]
    fn test_tlb_display() {
        let mut tlb = Tlb::new(2);
        tlb.refresh("A", 3, 1);
        assert_eq!(tlb.to_string(), "TLB:\nPID A, Page 3 -> Frame 1\n");
    }
}
