/// Cumulative counters for one simulation run, plus the derived ratios
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Statistics {
    pub page_faults: u64,
    pub hits: u64,
    pub tlb_hits: u64,
    pub tlb_misses: u64,
    /// TLB hits as a percentage of TLB lookups
    pub tlb_hit_ratio: f64,
    /// Occupied frames as a percentage of all frames
    pub memory_utilization: f64,
}

impl Statistics {
    pub fn new(
        page_faults: u64,
        hits: u64,
        tlb_hits: u64,
        tlb_misses: u64,
        memory_utilization: f64,
    ) -> Self {
        let lookups = tlb_hits + tlb_misses;
        let tlb_hit_ratio = if lookups == 0 {
            0.0
        } else {
            tlb_hits as f64 * 100.0 / lookups as f64
        };

        Statistics {
            page_faults,
            hits,
            tlb_hits,
            tlb_misses,
            tlb_hit_ratio,
            memory_utilization,
        }
    }

    /// Accesses served so far
    pub fn accesses(&self) -> u64 {
        self.page_faults + self.hits
    }
}

impl std::fmt::Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Page Faults: {} | Hits: {} | TLB Hit Ratio: {:.2}% | Memory Utilization: {:.2}%",
            self.page_faults, self.hits, self.tlb_hit_ratio, self.memory_utilization
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_ratio_without_lookups() {
        let stats = Statistics::new(0, 0, 0, 0, 0.0);
        assert_eq!(stats.tlb_hit_ratio, 0.0);
        assert_eq!(stats.accesses(), 0);
    }

    #[test]
    fn test_hit_ratio() {
        let stats = Statistics::new(3, 1, 1, 3, 75.0);
        assert_eq!(stats.tlb_hit_ratio, 25.0);
        assert_eq!(stats.accesses(), 4);
    }

    #[test]
    fn test_display() {
        let stats = Statistics::new(1, 2, 1, 2, 50.0);
        assert_eq!(
            stats.to_string(),
            "Page Faults: 1 | Hits: 2 | TLB Hit Ratio: 33.33% | Memory Utilization: 50.00%"
        );
    }
}
