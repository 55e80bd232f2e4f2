use std::time::Instant;

use log::{error, info};
use simple_logger::SimpleLogger;

use bp_sim::{PolicyKind, ReplicaSet, SimulationConfig};

const NUM_PEERS: usize = 100;
const BLOCKS_PER_REPLICA: usize = 30000;
const REPLICAS: usize = 5;
const ARRIVAL_RATES: [f64; 4] = [0.5, 0.7, 0.9, 0.95];
const POLICIES: [PolicyKind; 2] = [PolicyKind::OldestFirst, PolicyKind::Opportunistic];

fn main() {
    SimpleLogger::new().init().unwrap();

    info!("starting");

    for rate in ARRIVAL_RATES {
        for policy in POLICIES {
            let config = SimulationConfig {
                num_peers: NUM_PEERS,
                policy,
                num_blocks: BLOCKS_PER_REPLICA,
                arrival_rate: rate,
                seed: None,
            };
            run(config, REPLICAS);
        }
    }

    info!("done.");
}

fn run(config: SimulationConfig, replicas: usize) {
    let start = Instant::now();

    let result = match ReplicaSet::new(config, replicas).and_then(|set| set.run()) {
        Ok(result) => result,
        Err(e) => {
            error!("invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    result.print_summary();
    println!("Time Elapsed: {:?}", start.elapsed());
}
