//! Paging simulator - Main Entry Point
//!
//! Usage: vm-simulator [OPTIONS] <SCENARIO>
//!
//! Runs every access in the scenario file and prints the step log, the
//! final statistics, each page table, physical memory and the TLB.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::{LevelFilter, info};

use vm_simulator::io::{Scenario, render_report, write_report};
use vm_simulator::{PolicyKind, ScenarioError, Simulator};

#[derive(Parser, Debug)]
#[command(name = "vm-simulator")]
#[command(about = "Step through a paging workload with a TLB and a replacement policy")]
#[command(version)]
struct Cli {
    /// Scenario file (memory, page, tlb, policy, process and sequence lines)
    scenario: PathBuf,

    /// Replacement policy, overriding the scenario (fifo, lru, true-lru, optimal)
    #[arg(short, long)]
    policy: Option<PolicyKind>,

    /// TLB capacity, overriding the scenario
    #[arg(short, long)]
    tlb: Option<usize>,

    /// Also write the report to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // RUST_LOG, when set, wins over the flag
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn run(cli: &Cli) -> Result<(), ScenarioError> {
    let scenario = Scenario::from_file(&cli.scenario)?;
    let mut config = scenario.to_config()?;
    if let Some(policy) = cli.policy {
        config = config.with_policy(policy);
    }
    if let Some(capacity) = cli.tlb {
        config = config.with_tlb_capacity(capacity);
    }

    let mut sim = Simulator::new();
    sim.configure(&config)?;
    let records = sim.run_to_completion()?;

    print!("{}", render_report(&records, &sim)?);

    if let Some(path) = &cli.output {
        write_report(path, &records, &sim)?;
        info!("report written to {}", path.display());
    }

    Ok(())
}
