use crate::error::ValidationError;
use crate::translation::VirtualAddress;

/// A process as the caller describes it: an id and a size in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub pid: String,
    pub size: u64,
}

impl ProcessSpec {
    pub fn new(pid: impl Into<String>, size: u64) -> Self {
        ProcessSpec { pid: pid.into(), size }
    }
}

/// One process and its single-level page table.
///
/// Entry `i` of the page table is `Some(frame)` while page `i` is resident
/// and `None` otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Process {
    pid: String,
    size: u64,
    page_size: u64,
    page_table: Vec<Option<usize>>,
}

impl Process {
    /// Create a process with every page unmapped
    pub fn new(pid: impl Into<String>, size: u64, page_size: u64) -> Result<Self, ValidationError> {
        let pid = pid.into();
        if pid.is_empty() {
            return Err(ValidationError::EmptyPid);
        }
        if size == 0 {
            return Err(ValidationError::NonPositiveProcessSize(pid));
        }
        if page_size == 0 {
            return Err(ValidationError::NonPositivePageSize);
        }

        let num_pages = size.div_ceil(page_size) as usize;
        Ok(Process {
            pid,
            size,
            page_size,
            page_table: vec![None; num_pages],
        })
    }

    pub fn pid(&self) -> &str {
        &self.pid
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn num_pages(&self) -> usize {
        self.page_table.len()
    }

    #[inline]
    pub fn page_number(&self, va: u64) -> usize {
        (va / self.page_size) as usize
    }

    #[inline]
    pub fn offset(&self, va: u64) -> u64 {
        va % self.page_size
    }

    pub fn split(&self, va: u64) -> VirtualAddress {
        VirtualAddress::split(va, self.page_size)
    }

    pub fn contains(&self, va: u64) -> bool {
        va < self.size
    }

    /// Frame currently holding `page`, if resident
    #[inline]
    pub fn frame_of(&self, page: usize) -> Option<usize> {
        self.page_table.get(page).copied().flatten()
    }

    pub fn map(&mut self, page: usize, frame: usize) {
        self.page_table[page] = Some(frame);
    }

    pub fn unmap(&mut self, page: usize) {
        self.page_table[page] = None;
    }

    pub fn page_table(&self) -> &[Option<usize>] {
        &self.page_table
    }
}

/// Renders the page table the way the page-table panel shows it
pub struct PageTableView<'a>(pub &'a Process);

impl std::fmt::Display for PageTableView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Page Table (PID {}):", self.0.pid)?;
        for (page, entry) in self.0.page_table.iter().enumerate() {
            match entry {
                Some(frame) => writeln!(f, "Page {}: Frame {}", page, frame)?,
                None => writeln!(f, "Page {}: Not in memory", page)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count_rounds_up() {
        let p = Process::new("A", 12, 4).unwrap();
        assert_eq!(p.num_pages(), 3);

        let p = Process::new("B", 13, 4).unwrap();
        assert_eq!(p.num_pages(), 4);

        let p = Process::new("C", 1, 4096).unwrap();
        assert_eq!(p.num_pages(), 1);
    }

    #[test]
    fn test_starts_unmapped() {
        let p = Process::new("A", 16, 4).unwrap();
        assert!(p.page_table().iter().all(Option::is_none));
    }

    #[test]
    fn test_page_number_and_offset() {
        let p = Process::new("A", 64, 16).unwrap();
        assert_eq!(p.page_number(0), 0);
        assert_eq!(p.page_number(15), 0);
        assert_eq!(p.page_number(16), 1);
        assert_eq!(p.offset(33), 1);
        assert_eq!(p.split(33), VirtualAddress { va: 33, page: 2, offset: 1 });
    }

    #[test]
    fn test_rejects_bad_sizes() {
        assert_eq!(
            Process::new("A", 0, 4),
            Err(ValidationError::NonPositiveProcessSize("A".to_string()))
        );
        assert_eq!(Process::new("A", 8, 0), Err(ValidationError::NonPositivePageSize));
        assert_eq!(Process::new("", 8, 4), Err(ValidationError::EmptyPid));
    }

    #[test]
    fn test_map_unmap() {
        let mut p = Process::new("A", 16, 4).unwrap();
        p.map(2, 7);
        assert_eq!(p.frame_of(2), Some(7));
        p.unmap(2);
        assert_eq!(p.frame_of(2), None);
        // Out-of-range pages are simply not resident
        assert_eq!(p.frame_of(99), None);
    }

    #[test]
    fn test_contains() {
        let p = Process::new("A", 16, 4).unwrap();
        assert!(p.contains(0));
        assert!(p.contains(15));
        assert!(!p.contains(16));
    }

    #[test]
    fn test_page_table_view() {
        let mut p = Process::new("A", 8, 4).unwrap();
        p.map(0, 2);
        let text = PageTableView(&p).to_string();
        assert_eq!(
            text,
            "Page Table (PID A):\nPage 0: Frame 2\nPage 1: Not in memory\n"
        );
    }
}
