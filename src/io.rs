use std::fs;
use std::path::Path;

use crate::constants::{ACCESS_SEPARATOR, COMMENT_MARKER, LIST_SEPARATOR};
use crate::engine::{AddressAccess, SimConfig, Simulator, StepRecord};
use crate::error::{ScenarioError, ValidationError};
use crate::policy::PolicyKind;
use crate::process::{PageTableView, ProcessSpec};

/// Parse a reference string such as `"A:0, A:4, B:12"`.
///
/// Empty items are skipped; whether pids exist and addresses are in range
/// is left to `SimConfig::validate`.
pub fn parse_access_sequence(text: &str) -> Result<Vec<AddressAccess>, ValidationError> {
    let mut accesses = Vec::new();
    for item in text.split(LIST_SEPARATOR).map(str::trim) {
        if item.is_empty() {
            continue;
        }
        let Some((pid, va)) = item.split_once(ACCESS_SEPARATOR) else {
            return Err(ValidationError::MalformedAccess(item.to_string()));
        };
        let (pid, va) = (pid.trim(), va.trim());
        if pid.is_empty() {
            return Err(ValidationError::MalformedAccess(item.to_string()));
        }
        let va: u64 = va
            .parse()
            .map_err(|_| ValidationError::InvalidAddress(va.to_string()))?;
        accesses.push(AddressAccess::new(pid, va));
    }
    Ok(accesses)
}

/// Parse a process list such as `"A:16, B:32"`.
///
/// Items with a blank pid are skipped, like empty rows in an input form.
pub fn parse_process_list(text: &str) -> Result<Vec<ProcessSpec>, ValidationError> {
    let mut specs = Vec::new();
    for item in text.split(LIST_SEPARATOR).map(str::trim) {
        let (pid, size) = match item.split_once(ACCESS_SEPARATOR) {
            Some((pid, size)) => (pid.trim(), size.trim()),
            None => (item, ""),
        };
        if pid.is_empty() {
            continue;
        }
        if size.is_empty() {
            return Err(ValidationError::MissingProcessSize(pid.to_string()));
        }
        specs.push(ProcessSpec::new(pid, parse_size(pid, size)?));
    }
    Ok(specs)
}

/// Parse a process size; zero and negative numbers are rejected as such,
/// anything else that is not an integer is invalid
fn parse_size(pid: &str, value: &str) -> Result<u64, ValidationError> {
    let non_positive = || ValidationError::NonPositiveProcessSize(pid.to_string());
    if let Some(magnitude) = value.strip_prefix('-') {
        if magnitude.parse::<u64>().is_ok() {
            return Err(non_positive());
        }
    }
    match value.parse::<u64>() {
        Ok(0) => Err(non_positive()),
        Ok(size) => Ok(size),
        Err(_) => Err(ValidationError::InvalidProcessSize {
            pid: pid.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Contents of a scenario file.
///
/// ```text
/// # two frames, FIFO
/// memory 8
/// page 4
/// tlb 4
/// policy fifo
/// process A 12
/// processes B:8, C:4
/// sequence A:0, A:4, A:8
/// sequence A:0
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub memory_size: Option<u64>,
    pub page_size: Option<u64>,
    pub tlb_capacity: Option<usize>,
    pub policy: Option<PolicyKind>,
    pub processes: Vec<ProcessSpec>,
    pub accesses: Vec<AddressAccess>,
}

impl Scenario {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ScenarioError> {
        let mut scenario = Scenario::default();

        for (idx, raw) in content.lines().enumerate() {
            let line = idx + 1;
            let text = match raw.split_once(COMMENT_MARKER) {
                Some((before, _)) => before,
                None => raw,
            }
            .trim();
            if text.is_empty() {
                continue;
            }

            let (keyword, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
            let rest = rest.trim();
            let syntax = |message: String| ScenarioError::Syntax { line, message };

            match keyword.to_ascii_lowercase().as_str() {
                "memory" => {
                    scenario.memory_size = Some(parse_number(rest, "memory size").map_err(syntax)?);
                }
                "page" => {
                    scenario.page_size = Some(parse_number(rest, "page size").map_err(syntax)?);
                }
                "tlb" => {
                    let capacity: usize = parse_number(rest, "TLB capacity").map_err(syntax)?;
                    scenario.tlb_capacity = Some(capacity);
                }
                "policy" => {
                    let policy = rest.parse::<PolicyKind>().map_err(|e| syntax(e.to_string()))?;
                    scenario.policy = Some(policy);
                }
                "process" => {
                    let tokens: Vec<&str> = rest.split_whitespace().collect();
                    let [pid, size] = tokens[..] else {
                        return Err(syntax(format!(
                            "process line has {} tokens, expected <pid> <size>",
                            tokens.len()
                        )));
                    };
                    let size = parse_size(pid, size).map_err(|e| syntax(e.to_string()))?;
                    scenario.processes.push(ProcessSpec::new(pid, size));
                }
                "processes" => {
                    let specs = parse_process_list(rest).map_err(|e| syntax(e.to_string()))?;
                    scenario.processes.extend(specs);
                }
                "sequence" => {
                    let accesses =
                        parse_access_sequence(rest).map_err(|e| syntax(e.to_string()))?;
                    scenario.accesses.extend(accesses);
                }
                other => return Err(syntax(format!("unknown keyword `{}`", other))),
            }
        }

        Ok(scenario)
    }

    /// Build the simulation config; `memory` and `page` lines are required
    pub fn to_config(&self) -> Result<SimConfig, ScenarioError> {
        let memory_size = self.memory_size.ok_or(ScenarioError::MissingKey("memory"))?;
        let page_size = self.page_size.ok_or(ScenarioError::MissingKey("page"))?;

        let mut config = SimConfig::new(memory_size, page_size)
            .with_accesses(self.accesses.iter().cloned());
        config.processes = self.processes.clone();
        if let Some(policy) = self.policy {
            config = config.with_policy(policy);
        }
        if let Some(capacity) = self.tlb_capacity {
            config = config.with_tlb_capacity(capacity);
        }
        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(token: &str, what: &str) -> Result<T, String> {
    token
        .parse()
        .map_err(|_| format!("invalid {}: `{}`", what, token))
}

/// Step log, final statistics and the resulting memory layout
pub fn render_report(records: &[StepRecord], sim: &Simulator) -> Result<String, ScenarioError> {
    let mut out = String::new();
    for record in records {
        out.push_str(&record.to_string());
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&sim.stats_snapshot().to_string());
    out.push_str("\n\n");

    for pid in sim.pids() {
        out.push_str(&PageTableView(sim.process(pid)?).to_string());
        out.push('\n');
    }
    out.push_str(&sim.frame_pool()?.to_string());
    out.push('\n');
    out.push_str(&sim.tlb()?.to_string());
    Ok(out)
}

pub fn write_report<P: AsRef<Path>>(
    path: P,
    records: &[StepRecord],
    sim: &Simulator,
) -> Result<(), ScenarioError> {
    let content = render_report(records, sim)?;
    fs::write(path.as_ref(), content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Access sequences
    // =========================================================================

    #[test]
    fn test_parse_sequence() {
        let seq = parse_access_sequence("A:0, A:4,B:12").unwrap();
        assert_eq!(
            seq,
            vec![
                AddressAccess::new("A", 0),
                AddressAccess::new("A", 4),
                AddressAccess::new("B", 12),
            ]
        );
    }

    #[test]
    fn test_parse_sequence_skips_empty_items() {
        let seq = parse_access_sequence(" , A:1,, ").unwrap();
        assert_eq!(seq, vec![AddressAccess::new("A", 1)]);
        assert!(parse_access_sequence("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_sequence_malformed() {
        assert_eq!(
            parse_access_sequence("A:0, A4"),
            Err(ValidationError::MalformedAccess("A4".to_string()))
        );
        assert_eq!(
            parse_access_sequence(":4"),
            Err(ValidationError::MalformedAccess(":4".to_string()))
        );
    }

    #[test]
    fn test_parse_sequence_bad_address() {
        assert_eq!(
            parse_access_sequence("A:x"),
            Err(ValidationError::InvalidAddress("x".to_string()))
        );
        // Negative addresses are never valid
        assert_eq!(
            parse_access_sequence("A:-4"),
            Err(ValidationError::InvalidAddress("-4".to_string()))
        );
        // Too many separators leave a non-numeric address
        assert_eq!(
            parse_access_sequence("A:1:2"),
            Err(ValidationError::InvalidAddress("1:2".to_string()))
        );
    }

    // =========================================================================
    // Process lists
    // =========================================================================

    #[test]
    fn test_parse_process_list() {
        let specs = parse_process_list("A:16, B : 32").unwrap();
        assert_eq!(specs, vec![ProcessSpec::new("A", 16), ProcessSpec::new("B", 32)]);
    }

    #[test]
    fn test_parse_process_list_skips_blank_pid() {
        let specs = parse_process_list("A:16, :8, ").unwrap();
        assert_eq!(specs, vec![ProcessSpec::new("A", 16)]);
    }

    #[test]
    fn test_parse_process_list_errors() {
        assert_eq!(
            parse_process_list("A"),
            Err(ValidationError::MissingProcessSize("A".to_string()))
        );
        assert_eq!(
            parse_process_list("A:big"),
            Err(ValidationError::InvalidProcessSize {
                pid: "A".to_string(),
                value: "big".to_string()
            })
        );
    }

    #[test]
    fn test_parse_process_list_non_positive_size() {
        assert_eq!(
            parse_process_list("A:-4"),
            Err(ValidationError::NonPositiveProcessSize("A".to_string()))
        );
        assert_eq!(
            parse_process_list("A:8, B:0"),
            Err(ValidationError::NonPositiveProcessSize("B".to_string()))
        );
        assert_eq!(
            parse_process_list("A:-x").unwrap_err().to_string(),
            "Invalid size for process A: -x"
        );
    }

    #[test]
    fn test_scenario_negative_process_size() {
        let err = Scenario::parse("memory 8\nprocess A -4").unwrap_err();
        assert!(matches!(err, ScenarioError::Syntax { line: 2, .. }));
        assert_eq!(err.to_string(), "line 2: Size for process A must be positive.");
    }

    // =========================================================================
    // Scenario files
    // =========================================================================

    const SCENARIO_C: &str = "\
# FIFO eviction with two frames
memory 8
page 4
policy fifo
process A 12
sequence A:0, A:4   # first two fill memory
sequence A:8, A:0
";

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::parse(SCENARIO_C).unwrap();
        assert_eq!(scenario.memory_size, Some(8));
        assert_eq!(scenario.page_size, Some(4));
        assert_eq!(scenario.policy, Some(PolicyKind::Fifo));
        assert_eq!(scenario.tlb_capacity, None);
        assert_eq!(scenario.processes, vec![ProcessSpec::new("A", 12)]);
        assert_eq!(scenario.accesses.len(), 4);

        let config = scenario.to_config().unwrap();
        assert_eq!(config.num_frames(), 2);
        assert_eq!(config.tlb_capacity, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_scenario_processes_line() {
        let scenario = Scenario::parse("processes A:8, B:4\ntlb 2\npolicy optimal").unwrap();
        assert_eq!(scenario.processes.len(), 2);
        assert_eq!(scenario.tlb_capacity, Some(2));
        assert_eq!(scenario.policy, Some(PolicyKind::Optimal));
    }

    #[test]
    fn test_parse_scenario_syntax_errors() {
        let err = Scenario::parse("memory 8\npage four").unwrap_err();
        assert!(matches!(err, ScenarioError::Syntax { line: 2, .. }));

        let err = Scenario::parse("process A").unwrap_err();
        assert!(matches!(err, ScenarioError::Syntax { line: 1, .. }));

        let err = Scenario::parse("frames 4").unwrap_err();
        assert!(err.to_string().contains("unknown keyword"));

        let err = Scenario::parse("policy clock").unwrap_err();
        assert!(err.to_string().contains("clock"));

        let err = Scenario::parse("\n\nsequence A0").unwrap_err();
        assert!(matches!(err, ScenarioError::Syntax { line: 3, .. }));
    }

    #[test]
    fn test_scenario_requires_sizes() {
        let scenario = Scenario::parse("page 4\nprocess A 4\nsequence A:0").unwrap();
        let err = scenario.to_config().unwrap_err();
        assert!(matches!(err, ScenarioError::MissingKey("memory")));
        assert_eq!(err.to_string(), "scenario has no `memory` line");

        let scenario = Scenario::parse("memory 16").unwrap();
        let err = scenario.to_config().unwrap_err();
        assert!(matches!(err, ScenarioError::MissingKey("page")));
    }

    // =========================================================================
    // Reports
    // =========================================================================

    #[test]
    fn test_render_report() {
        let config = Scenario::parse(SCENARIO_C).unwrap().to_config().unwrap();
        let mut sim = Simulator::new();
        sim.configure(&config).unwrap();
        let records = sim.run_to_completion().unwrap();

        let report = render_report(&records, &sim).unwrap();
        assert!(report.starts_with("Process A: Accessing VA 0 (Page 0, Offset 0): Page Fault!"));
        assert!(report.contains("Page Faults: 4 | Hits: 0"));
        assert!(report.contains("Page 0: Frame 1"));
        assert!(report.contains("Page 1: Not in memory"));
        assert!(report.contains("Frame 0: PID A Page 2"));
        assert!(report.contains("TLB:\n"));
    }

    #[test]
    fn test_render_report_unconfigured() {
        let sim = Simulator::new();
        assert!(render_report(&[], &sim).is_err());
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.txt");

        let config = SimConfig::new(16, 4).with_process("A", 16).with_access("A", 0);
        let mut sim = Simulator::new();
        sim.configure(&config).unwrap();
        let records = sim.run_to_completion().unwrap();

        write_report(&path, &records, &sim).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, render_report(&records, &sim).unwrap());
    }
}
