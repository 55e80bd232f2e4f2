// Scenario Runner - Load and execute scenario YAML files
//
// Usage:
//   cargo run --bin scenario_runner scenarios/heavy_load.yaml
//   cargo run --bin scenario_runner scenarios/  (runs all .yaml files in directory)
//   cargo run --bin scenario_runner scenarios/heavy_load.yaml --seed 0x1234...

use std::env;
use std::fs;
use std::path::Path;
use std::time::Instant;

use bp_sim::bp_config::parse_seed_hex;
use bp_sim::bp_event_sinks::{ConsoleEventSink, CsvEventSink, MultiEventSink};
use bp_sim::{
    AggregateSummary, EventScheduler, PolicyKind, ReplicaSet, RunStatistics, SimulationConfig,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use simple_logger::SimpleLogger;

/// Scenario file format
#[derive(Debug, Deserialize)]
struct ScenarioFile {
    /// Scenario metadata
    #[serde(default)]
    meta: ScenarioMeta,

    /// Simulation configuration
    config: ScenarioConfig,

    /// Output options
    #[serde(default)]
    output: OutputOptions,
}

#[derive(Debug, Default, Deserialize)]
struct ScenarioMeta {
    name: Option<String>,
    description: Option<String>,
    hypothesis: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScenarioConfig {
    num_peers: usize,
    policy: PolicyKind,
    num_blocks: usize,
    arrival_rate: f64,

    #[serde(default = "default_replicas")]
    replicas: usize,
}

#[derive(Debug, Default, Deserialize)]
struct OutputOptions {
    /// Export the event trace of the first replica
    events_csv: Option<String>,

    /// Log every event of the first replica (trace level)
    #[serde(default)]
    console_events: bool,

    /// Write the reduced result and all run records as YAML
    results_yaml: Option<String>,
}

#[derive(Serialize)]
struct ScenarioReport<'a> {
    name: &'a str,
    summary: &'a AggregateSummary,
    runs: &'a [RunStatistics],
}

fn default_replicas() -> usize {
    1
}

fn main() {
    SimpleLogger::new().init().unwrap();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <scenario.yaml | directory/> [--seed SEED_HEX]", args[0]);
        eprintln!("\nExamples:");
        eprintln!("  {} scenarios/heavy_load.yaml", args[0]);
        eprintln!("  {} scenarios/", args[0]);
        eprintln!("  {} scenarios/heavy_load.yaml --seed 0x123456...", args[0]);
        std::process::exit(1);
    }

    let path = Path::new(&args[1]);

    // Parse optional seed
    let seed = if args.len() >= 4 && args[2] == "--seed" {
        match parse_seed_hex(&args[3]) {
            Ok(seed) => Some(seed),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        None
    };

    if path.is_file() {
        run_scenario_file(path, seed);
    } else if path.is_dir() {
        run_scenario_directory(path, seed);
    } else {
        eprintln!("Error: Path does not exist: {}", path.display());
        std::process::exit(1);
    }
}

fn run_scenario_directory(dir: &Path, seed: Option<[u8; 32]>) {
    let mut scenarios = Vec::new();

    // Find all .yaml files
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            let ext = path.extension().and_then(|s| s.to_str());
            if ext == Some("yaml") || ext == Some("yml") {
                scenarios.push(path);
            }
        }
    }

    scenarios.sort();

    if scenarios.is_empty() {
        eprintln!("No .yaml files found in {}", dir.display());
        std::process::exit(1);
    }

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  SCENARIO RUNNER - Multiple Scenarios                 ║");
    println!("╚════════════════════════════════════════════════════════╝\n");
    println!("Found {} scenario(s) to run\n", scenarios.len());

    for (i, scenario_path) in scenarios.iter().enumerate() {
        println!("\n{}/{} Running: {}\n", i + 1, scenarios.len(), scenario_path.display());
        run_scenario_file(scenario_path, seed);
    }

    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  All scenarios complete!                               ║");
    println!("╚════════════════════════════════════════════════════════╝\n");
}

fn run_scenario_file(path: &Path, seed: Option<[u8; 32]>) {
    println!("Loading scenario from: {}", path.display());

    let yaml_content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Failed to read {}: {}", path.display(), e);
        std::process::exit(1);
    });

    let scenario: ScenarioFile = serde_yaml::from_str(&yaml_content).unwrap_or_else(|e| {
        eprintln!("Failed to parse {}: {}", path.display(), e);
        std::process::exit(1);
    });

    let name = scenario.meta.name.clone().unwrap_or_else(|| {
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("scenario")
            .to_string()
    });

    // Print scenario header
    println!("\n╔════════════════════════════════════════════════════════╗");
    println!("║  {}  {}", name, " ".repeat(54_usize.saturating_sub(name.len())));
    println!("╚════════════════════════════════════════════════════════╝\n");

    if let Some(ref desc) = scenario.meta.description {
        println!("{}\n", desc);
    }

    if let Some(ref hypothesis) = scenario.meta.hypothesis {
        println!("Hypothesis:");
        println!("  {}\n", hypothesis);
    }

    let config = SimulationConfig {
        num_peers: scenario.config.num_peers,
        policy: scenario.config.policy,
        num_blocks: scenario.config.num_blocks,
        arrival_rate: scenario.config.arrival_rate,
        seed,
    };

    let replica_set = ReplicaSet::new(config, scenario.config.replicas).unwrap_or_else(|e| {
        eprintln!("Invalid configuration in {}: {}", path.display(), e);
        std::process::exit(1);
    });

    println!("Starting simulation...\n");
    let start = Instant::now();

    let result = replica_set.run().unwrap_or_else(|e| {
        eprintln!("Simulation failed for {}: {}", path.display(), e);
        std::process::exit(1);
    });

    result.print_summary();
    println!("Time Elapsed: {:?}", start.elapsed());

    if scenario.output.events_csv.is_some() || scenario.output.console_events {
        trace_first_replica(&replica_set, &scenario.output);
    }

    if let Some(ref out) = scenario.output.results_yaml {
        let report = ScenarioReport {
            name: &name,
            summary: &result.summary,
            runs: &result.runs,
        };
        match serde_yaml::to_string(&report) {
            Ok(yaml) => {
                if let Err(e) = fs::write(out, yaml) {
                    warn!("Failed to write {}: {}", out, e);
                } else {
                    info!("Results written to {}", out);
                }
            }
            Err(e) => warn!("Failed to serialize results: {}", e),
        }
    }

    println!("\n✓ Scenario complete!\n");
}

/// Re-run the first replica with tracing; same seed gives the same run
fn trace_first_replica(replica_set: &ReplicaSet, output: &OutputOptions) {
    let Some(config) = replica_set.replica_configs().into_iter().next() else {
        return;
    };

    let mut sink = MultiEventSink::new();
    if output.console_events {
        sink.add_sink(Box::new(ConsoleEventSink::new(true)));
    }
    if let Some(ref csv_path) = output.events_csv {
        match CsvEventSink::new(csv_path) {
            Ok(csv) => sink.add_sink(Box::new(csv)),
            Err(e) => {
                warn!("Failed to create {}: {}", csv_path, e);
                return;
            }
        }
    }

    match EventScheduler::new(config) {
        Ok(scheduler) => {
            scheduler.run_with_sink(&mut sink);
            if let Some(ref csv_path) = output.events_csv {
                info!("Event trace written to {}", csv_path);
            }
        }
        Err(e) => warn!("Tracing skipped: {}", e),
    }
}
