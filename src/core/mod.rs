mod model;
mod solver;
mod types;

pub use model::{
    duration, final_capital, interest_rate, monthly_contribution, solve, starting_capital,
};
pub use solver::{DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE, bisect};
pub use types::{Scenario, TargetQuantity};
