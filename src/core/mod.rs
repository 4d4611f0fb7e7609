mod engine;
mod solver;
mod types;

pub use engine::{compute_max_net_worth, run_simulation};
pub use solver::{find_optimal_purchase_age, scan_purchase_ages};
pub use types::{
    AgeNetWorth, FINAL_AGE, InitialConditions, PurchaseScan, SimulationParameters,
    SimulationResult,
};
