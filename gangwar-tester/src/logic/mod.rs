pub mod reports;
pub mod scenarios;
pub mod tester;
pub mod world;

pub use scenarios::{get_scenario, list_scenarios, scenario_names};
pub use tester::*;
