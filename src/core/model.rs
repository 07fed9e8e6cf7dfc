use super::solver::{self, bisect};
use super::types::{Scenario, TargetQuantity};

/// Upper bound of the bracket search when solving for the duration.
const MAX_TEST_YEARS: f64 = 200.0;

fn month_count(years: f64) -> u32 {
    // Truncation toward zero; partial months do not receive a contribution.
    (years * 12.0) as u32
}

fn monthly_growth_factor(yearly_rate: f64) -> f64 {
    (1.0 + yearly_rate).powf(1.0 / 12.0)
}

/// Accumulated value of the monthly contributions after `years`, with the
/// contribution made in month `m` weighted by `j^m` (compounding starts at
/// month 1, not month 0).
fn contribution_accumulation(yearly_rate: f64, years: f64, monthly_contribution: f64) -> f64 {
    let months = month_count(years);
    let j = monthly_growth_factor(yearly_rate);

    let mut sum = 0.0;
    for m in 1..=months {
        sum += monthly_contribution * j.powi(m as i32);
    }
    sum
}

/// Capital after `years` of compound growth plus monthly contributions.
pub fn final_capital(
    starting_capital: f64,
    annual_rate_pct: f64,
    years: f64,
    monthly_contribution: f64,
) -> f64 {
    let yearly_rate = annual_rate_pct / 100.0;
    starting_capital * (1.0 + yearly_rate).powf(years)
        + contribution_accumulation(yearly_rate, years, monthly_contribution)
}

/// Starting capital required to reach `final_capital`. May go negative when
/// the contributions alone already exceed the target.
pub fn starting_capital(
    final_capital: f64,
    annual_rate_pct: f64,
    years: f64,
    monthly_contribution: f64,
) -> f64 {
    let yearly_rate = annual_rate_pct / 100.0;
    let contribution_sum = contribution_accumulation(yearly_rate, years, monthly_contribution);
    (final_capital - contribution_sum) / (1.0 + yearly_rate).powf(years)
}

/// Annual interest rate (in percent) required to reach `target_capital`,
/// searched over 0% to 100%. `Some(0.0)` means a zero rate already meets the
/// target; `None` means no rate in range does.
pub fn interest_rate(
    starting_capital: f64,
    years: f64,
    target_capital: f64,
    monthly_contribution: f64,
) -> Option<f64> {
    // At exact equality the objective is zero at the left endpoint, which a
    // bisection bracket cannot use; zero is the answer, not a search failure.
    let min_final_capital = starting_capital + monthly_contribution * years * 12.0;
    if target_capital <= min_final_capital {
        return Some(0.0);
    }

    let objective = |rate: f64| {
        final_capital(starting_capital, rate * 100.0, years, monthly_contribution) - target_capital
    };

    bisect(
        objective,
        0.0,
        1.0,
        solver::DEFAULT_TOLERANCE,
        solver::DEFAULT_MAX_ITERATIONS,
    )
    .map(|rate| rate * 100.0)
}

/// Duration in years required to reach `target_capital`. The search horizon
/// is capped at 200 years; `None` means the target is not reachable by then.
pub fn duration(
    starting_capital: f64,
    annual_rate_pct: f64,
    target_capital: f64,
    monthly_contribution: f64,
) -> Option<f64> {
    // Zero also stands in for "unreachable by waiting longer": a target at or
    // below the starting capital never needs time, whether it is already met
    // or cannot be approached through growth at all.
    if target_capital <= starting_capital {
        return Some(0.0);
    }

    let objective = |years: f64| {
        final_capital(starting_capital, annual_rate_pct, years, monthly_contribution)
            - target_capital
    };

    let mut max_years = None;
    let mut current_years = 1.0;
    while current_years <= MAX_TEST_YEARS {
        if objective(current_years) > 0.0 {
            max_years = Some(current_years);
            break;
        }
        current_years *= 2.0;
    }
    let max_years = max_years?;

    bisect(
        objective,
        0.0,
        max_years,
        solver::DEFAULT_TOLERANCE,
        solver::DEFAULT_MAX_ITERATIONS,
    )
}

/// Monthly contribution required to reach `final_capital`. Closed form: the
/// accumulation is linear in the contribution amount.
pub fn monthly_contribution(
    starting_capital: f64,
    annual_rate_pct: f64,
    years: f64,
    final_capital: f64,
) -> f64 {
    let yearly_rate = annual_rate_pct / 100.0;
    let months = month_count(years);

    let starting_capital_future_value = starting_capital * (1.0 + yearly_rate).powf(years);
    let target_contributions = final_capital - starting_capital_future_value;

    // No months means no deposits: without the guard the contribution factor
    // collapses to zero and the division below produces inf or NaN.
    if target_contributions < 0.0 || months == 0 {
        return 0.0;
    }

    if yearly_rate == 0.0 {
        return target_contributions / months as f64;
    }

    let j = monthly_growth_factor(yearly_rate);
    let contribution_factor = j * (j.powi(months as i32) - 1.0) / (j - 1.0);
    target_contributions / contribution_factor
}

/// Dispatches to the calculation matching `target`, reading the other four
/// quantities from `scenario`. Closed-form targets always return `Some`.
pub fn solve(target: TargetQuantity, scenario: &Scenario) -> Option<f64> {
    match target {
        TargetQuantity::FinalCapital => Some(final_capital(
            scenario.starting_capital,
            scenario.annual_rate_pct,
            scenario.duration_years,
            scenario.monthly_contribution,
        )),
        TargetQuantity::StartingCapital => Some(starting_capital(
            scenario.final_capital,
            scenario.annual_rate_pct,
            scenario.duration_years,
            scenario.monthly_contribution,
        )),
        TargetQuantity::InterestRate => interest_rate(
            scenario.starting_capital,
            scenario.duration_years,
            scenario.final_capital,
            scenario.monthly_contribution,
        ),
        TargetQuantity::Duration => duration(
            scenario.starting_capital,
            scenario.annual_rate_pct,
            scenario.final_capital,
            scenario.monthly_contribution,
        ),
        TargetQuantity::MonthlyContribution => Some(monthly_contribution(
            scenario.starting_capital,
            scenario.annual_rate_pct,
            scenario.duration_years,
            scenario.final_capital,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assume, proptest};

    fn assert_approx(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    #[test]
    fn final_capital_matches_hand_computed_accumulation() {
        // 1000 at 5% for 10 years with 50/month: 1000 * 1.05^10 plus
        // sum_{m=1..120} 50 * 1.05^(m/12).
        assert_approx(final_capital(1000.0, 5.0, 10.0, 50.0), 9378.50, 0.5);
    }

    #[test]
    fn final_capital_without_contributions_is_pure_compound_growth() {
        assert_approx(final_capital(1000.0, 5.0, 10.0, 0.0), 1628.89, 0.01);
    }

    #[test]
    fn final_capital_at_zero_rate_is_starting_capital_plus_contributions() {
        assert_approx(final_capital(0.0, 0.0, 5.0, 100.0), 6000.0, 1e-9);
    }

    #[test]
    fn partial_months_are_truncated() {
        // 0.99 years is 11.88 months; only 11 full contributions land.
        assert_approx(final_capital(0.0, 0.0, 0.99, 100.0), 1100.0, 1e-9);
    }

    #[test]
    fn contribution_accumulation_agrees_with_geometric_series() {
        for rate_pct in [0.5, 2.0, 5.0, 9.0] {
            let yearly_rate = rate_pct / 100.0;
            let months = month_count(15.0);
            let j = monthly_growth_factor(yearly_rate);
            let closed_form = 75.0 * j * (j.powi(months as i32) - 1.0) / (j - 1.0);
            assert_approx(
                contribution_accumulation(yearly_rate, 15.0, 75.0),
                closed_form,
                1e-5,
            );
        }
    }

    #[test]
    fn final_capital_is_strictly_increasing_in_rate() {
        let mut previous = final_capital(1000.0, 0.0, 10.0, 50.0);
        for rate_pct in 1..=15 {
            let current = final_capital(1000.0, rate_pct as f64, 10.0, 50.0);
            assert!(
                current > previous,
                "rate {rate_pct}%: {current} is not above {previous}"
            );
            previous = current;
        }
    }

    #[test]
    fn final_capital_is_strictly_increasing_in_whole_years() {
        let mut previous = final_capital(1000.0, 5.0, 0.0, 50.0);
        for years in 1..=40 {
            let current = final_capital(1000.0, 5.0, years as f64, 50.0);
            assert!(
                current > previous,
                "year {years}: {current} is not above {previous}"
            );
            previous = current;
        }
    }

    #[test]
    fn starting_capital_recovers_concrete_scenario() {
        let fc = final_capital(1000.0, 5.0, 10.0, 50.0);
        assert_approx(starting_capital(fc, 5.0, 10.0, 50.0), 1000.0, 1e-6);
    }

    #[test]
    fn starting_capital_goes_negative_when_contributions_exceed_target() {
        // 50/month for 10 years alone overshoots a 1000 target.
        assert!(starting_capital(1000.0, 5.0, 10.0, 50.0) < 0.0);
    }

    #[test]
    fn interest_rate_recovers_concrete_scenario() {
        let fc = final_capital(1000.0, 5.0, 10.0, 50.0);
        let rate = interest_rate(1000.0, 10.0, fc, 50.0).expect("rate expected");
        assert_approx(rate, 5.0, 0.01);
    }

    #[test]
    fn interest_rate_short_circuits_to_zero_when_target_is_already_met() {
        assert_eq!(interest_rate(1000.0, 10.0, 1000.0, 0.0), Some(0.0));
    }

    #[test]
    fn interest_rate_short_circuits_when_contributions_alone_suffice() {
        // 100/month for 5 years is 6000 at 0% growth, above the 5000 target.
        assert_eq!(interest_rate(0.0, 5.0, 5000.0, 100.0), Some(0.0));
    }

    #[test]
    fn interest_rate_is_none_outside_the_searchable_range() {
        // Even 100% p.a. cannot turn 1000 into a billion within one year.
        assert_eq!(interest_rate(1000.0, 1.0, 1e9, 0.0), None);
    }

    #[test]
    fn duration_recovers_concrete_scenario() {
        let fc = final_capital(1000.0, 5.0, 10.0, 50.0);
        let years = duration(1000.0, 5.0, fc, 50.0).expect("duration expected");
        assert_approx(years, 10.0, 0.1);
    }

    #[test]
    fn duration_is_zero_when_target_is_at_or_below_start() {
        assert_eq!(duration(1000.0, 5.0, 900.0, 50.0), Some(0.0));
        assert_eq!(duration(1000.0, 5.0, 1000.0, 50.0), Some(0.0));
    }

    #[test]
    fn duration_is_none_beyond_the_search_horizon() {
        // No growth and no contributions: the balance never moves.
        assert_eq!(duration(1.0, 0.0, 1e12, 0.0), None);
    }

    #[test]
    fn duration_without_contributions_matches_compound_growth() {
        // 1000 at 5% reaches 1628.89 just before the ten-year mark.
        let years = duration(1000.0, 5.0, 1628.0, 0.0).expect("duration expected");
        assert_approx(years, 9.99, 0.05);
    }

    #[test]
    fn monthly_contribution_recovers_concrete_scenario() {
        let fc = final_capital(1000.0, 5.0, 10.0, 50.0);
        assert_approx(monthly_contribution(1000.0, 5.0, 10.0, fc), 50.0, 1e-6);
    }

    #[test]
    fn monthly_contribution_at_zero_rate_divides_evenly() {
        assert_approx(monthly_contribution(0.0, 0.0, 5.0, 6000.0), 100.0, 0.0);
    }

    #[test]
    fn monthly_contribution_is_zero_when_start_already_exceeds_target() {
        assert_approx(monthly_contribution(10_000.0, 5.0, 10.0, 5000.0), 0.0, 0.0);
    }

    #[test]
    fn monthly_contribution_is_zero_for_zero_duration_at_zero_rate() {
        assert_approx(monthly_contribution(0.0, 0.0, 0.0, 1000.0), 0.0, 0.0);
    }

    #[test]
    fn monthly_contribution_stays_finite_when_no_month_fits_the_duration() {
        // Zero years, and a fraction of a year too short for a single deposit.
        assert_approx(monthly_contribution(0.0, 5.0, 0.0, 1000.0), 0.0, 0.0);
        assert_approx(monthly_contribution(500.0, 5.0, 0.05, 1000.0), 0.0, 0.0);
    }

    #[test]
    fn solve_dispatches_every_target() {
        let scenario = Scenario {
            starting_capital: 1000.0,
            annual_rate_pct: 5.0,
            duration_years: 10.0,
            final_capital: final_capital(1000.0, 5.0, 10.0, 50.0),
            monthly_contribution: 50.0,
        };

        let fc = solve(TargetQuantity::FinalCapital, &scenario).expect("value expected");
        assert_approx(fc, scenario.final_capital, 1e-9);

        let sc = solve(TargetQuantity::StartingCapital, &scenario).expect("value expected");
        assert_approx(sc, 1000.0, 1e-6);

        let rate = solve(TargetQuantity::InterestRate, &scenario).expect("value expected");
        assert_approx(rate, 5.0, 0.01);

        let years = solve(TargetQuantity::Duration, &scenario).expect("value expected");
        assert_approx(years, 10.0, 0.1);

        let contribution =
            solve(TargetQuantity::MonthlyContribution, &scenario).expect("value expected");
        assert_approx(contribution, 50.0, 1e-6);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_starting_capital_round_trips(
            start in 0u32..100_000,
            rate_bp in 0u32..1200,
            years_q in 0u32..121,
            contribution in 0u32..1000
        ) {
            let sc = start as f64;
            let rate_pct = rate_bp as f64 / 100.0;
            let years = years_q as f64 / 4.0;
            let mc = contribution as f64;

            let fc = final_capital(sc, rate_pct, years, mc);
            let recovered = starting_capital(fc, rate_pct, years, mc);
            prop_assert!((recovered - sc).abs() < 1e-4);
        }

        #[test]
        fn prop_monthly_contribution_round_trips(
            start in 0u32..100_000,
            rate_bp in 0u32..1200,
            years_q in 1u32..121,
            contribution in 0u32..1000
        ) {
            let sc = start as f64;
            let rate_pct = rate_bp as f64 / 100.0;
            let years = years_q as f64 / 4.0;
            let mc = contribution as f64;

            // Fewer than one full month leaves the contribution unobservable.
            prop_assume!(month_count(years) > 0);

            let fc = final_capital(sc, rate_pct, years, mc);
            let recovered = monthly_contribution(sc, rate_pct, years, fc);
            prop_assert!((recovered - mc).abs() < 1e-4);
        }

        #[test]
        fn prop_final_capital_grows_with_rate(
            start in 1u32..100_000,
            rate_bp in 0u32..1200,
            years in 1u32..41,
            contribution in 0u32..1000
        ) {
            let sc = start as f64;
            let rate_pct = rate_bp as f64 / 100.0;
            let years = years as f64;
            let mc = contribution as f64;

            let base = final_capital(sc, rate_pct, years, mc);
            let bumped = final_capital(sc, rate_pct + 0.5, years, mc);
            prop_assert!(bumped > base);
        }

        #[test]
        fn prop_interest_rate_never_panics_and_stays_in_range(
            start in 0u32..100_000,
            years in 1u32..41,
            target in 0u32..2_000_000,
            contribution in 0u32..1000
        ) {
            let result = interest_rate(
                start as f64,
                years as f64,
                target as f64,
                contribution as f64,
            );
            if let Some(rate) = result {
                prop_assert!((0.0..=100.0).contains(&rate));
            }
        }

        #[test]
        fn prop_duration_solution_reproduces_the_target(
            start in 1u32..50_000,
            rate_bp in 100u32..1000,
            contribution in 0u32..500,
            // 1% growth over the 200-year horizon reaches roughly x3.5, so
            // targets are kept below x3 to stay reachable.
            factor_pct in 110u32..300
        ) {
            let sc = start as f64;
            let rate_pct = rate_bp as f64 / 100.0;
            let mc = contribution as f64;
            let target = sc * factor_pct as f64 / 100.0;

            let years = duration(sc, rate_pct, target, mc).expect("reachable target");
            prop_assert!(years >= 0.0);
            // Truncated months make the objective a step function in time, so
            // allow one month of slack around the crossing.
            let reached = final_capital(sc, rate_pct, years + 1.0 / 12.0, mc);
            prop_assert!(reached >= target - 1e-4);
        }
    }
}
