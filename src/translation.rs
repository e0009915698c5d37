/// Represents the decomposed components of a virtual address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualAddress {
    pub va: u64,
    pub page: usize,
    pub offset: u64,
}

impl VirtualAddress {
    /// Split a raw VA into page number and offset for the given page size
    pub fn split(va: u64, page_size: u64) -> Self {
        let page = (va / page_size) as usize;
        let offset = va % page_size;

        VirtualAddress { va, page, offset }
    }

    /// Physical address of this VA once its page sits in `frame`
    #[inline]
    pub fn to_physical(&self, frame: usize, page_size: u64) -> u64 {
        physical_address(frame, page_size, self.offset)
    }
}

impl std::fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "VA {} (Page {}, Offset {})",
            self.va, self.page, self.offset
        )
    }
}

/// PA = frame * page_size + offset
#[inline]
pub fn physical_address(frame: usize, page_size: u64, offset: u64) -> u64 {
    frame as u64 * page_size + offset
}

/// A virtual page of one process; the unit the frame pool, TLB and
/// replacement policies track.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub pid: String,
    pub page: usize,
}

impl PageKey {
    pub fn new(pid: impl Into<String>, page: usize) -> Self {
        PageKey { pid: pid.into(), page }
    }

    #[inline]
    pub fn matches(&self, pid: &str, page: usize) -> bool {
        self.page == page && self.pid == pid
    }
}

impl std::fmt::Display for PageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.pid, self.page)
    }
}
