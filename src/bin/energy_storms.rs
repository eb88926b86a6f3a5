//! Simplified simulation of high-energy particle storms.
//!
//! ```text
//! energy_storms <size> <storm_1_file> [ <storm_i_file> ] ...
//! ```
//!
//! Without `mpi-support` the layer is shared by `STORMS_WORKERS` in-process
//! workers (default 1). Under MPI (`cargo mpirun -n 4 --features mpi-support
//! --bin energy_storms -- ...`) every rank is a worker. `STORMS_THREADS`
//! sizes each worker's thread pool. Only the coordinator prints.

use std::process::ExitCode;
use std::time::Instant;

use energy_storms::prelude::*;

fn env_usize(name: &str) -> Result<Option<usize>, StormError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| StormError::InvalidConfig(format!("{name}=`{raw}`: {e}"))),
        Err(_) => Ok(None),
    }
}

fn load(args: &[String]) -> Result<(EngineConfig, Vec<Storm>), StormError> {
    let layer_size: usize = args[1]
        .parse()
        .map_err(|_| StormError::InvalidConfig(format!("layer size `{}` is not a positive integer", args[1])))?;
    let storms = args[2..]
        .iter()
        .map(read_storm_file)
        .collect::<Result<Vec<_>, _>>()?;
    let config = EngineConfig {
        threads: env_usize("STORMS_THREADS")?,
        ..EngineConfig::new(layer_size)
    };
    config.validate()?;
    Ok((config, storms))
}

#[cfg(not(feature = "mpi-support"))]
fn run(args: &[String]) -> Result<Option<RunReport>, StormError> {
    let (config, storms) = load(args)?;
    let workers = env_usize("STORMS_WORKERS")?.unwrap_or(1);
    let start = Instant::now();
    let results = simulate_in_process(&config, &storms, workers)?;
    Ok(Some(RunReport::new(start.elapsed(), results)))
}

#[cfg(feature = "mpi-support")]
fn simulate(comm: &MpiComm, args: &[String]) -> Result<Option<RunReport>, StormError> {
    let (config, storms) = load(args)?;
    let mut engine = StormEngine::new(config, comm)?;
    comm.barrier()?;
    let start = Instant::now();
    let results = engine.run(&storms)?;
    comm.barrier()?;
    let elapsed = start.elapsed();
    Ok(engine.is_coordinator().then(|| RunReport::new(elapsed, results)))
}

#[cfg(feature = "mpi-support")]
fn run(args: &[String]) -> Result<Option<RunReport>, StormError> {
    let comm = MpiComm::new()?;
    let outcome = simulate(&comm, args);
    if let Err(e) = &outcome {
        // one worker's failure ends the whole run
        comm.abort(&e.to_string());
    }
    outcome
}

fn main() -> ExitCode {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <size> <storm_1_file> [ <storm_i_file> ] ... ", args[0]);
        return ExitCode::FAILURE;
    }
    match run(&args) {
        Ok(Some(report)) => {
            println!("\n{report}");
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
