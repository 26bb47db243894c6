pub mod policy;
pub mod reports;
pub mod scenarios;
pub mod simulation;
pub mod tester;

pub use scenarios::{SCENARIO_KEYS, get_scenario, list_scenarios};
pub use tester::*;
