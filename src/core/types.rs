#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TargetQuantity {
    FinalCapital,
    StartingCapital,
    InterestRate,
    Duration,
    MonthlyContribution,
}

/// The five quantities of a savings plan. Exactly one of them is the unknown
/// being solved for; its field value is ignored by the dispatch.
#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    pub starting_capital: f64,
    pub annual_rate_pct: f64,
    pub duration_years: f64,
    pub final_capital: f64,
    pub monthly_contribution: f64,
}
