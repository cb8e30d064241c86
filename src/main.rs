//! Command-line driver of the coke reactor model.
//!
//! ```text
//! coke_reactor [k1 k2 k3 A0 B0 C0 Tfinal Tgrid Npoints] [key=value ...] [--config file.json] [--solver rk4|dopri5]
//! ```

use coke_reactor::config::RunConfig;
use coke_reactor::driver::{DriverError, Simulation};
use coke_reactor::report::{coke_profile_table, outlet_table, site_density_line};

use log::{debug, error};
use std::process;

const PROFILE_COLUMNS: usize = 8;

fn main() {
    // Initialize logging
    env_logger::init();

    if let Err(e) = run() {
        error!("{}", e);
        eprintln!("An error occurred: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<(), DriverError> {
    let config = RunConfig::from_args(std::env::args().skip(1))?;
    println!("{}", site_density_line(config.active_sites));

    let simulation = Simulation::new(config)?;
    debug!("{:?}", simulation.config());
    let result = simulation.run()?;

    println!("Outlet concentration vs time");
    outlet_table(&result.trajectory).printstd();
    println!();
    println!("Time evolution of coke concentration in the reactor");
    coke_profile_table(&result.trajectory, PROFILE_COLUMNS).printstd();
    println!();
    println!("{}", result.stats);
    Ok(())
}
