//! Parameter sweeps over the turn controller.
//!
//! Every `(speed, kp, kd)` combination is an independent trial on its own fresh mouse, so trials
//! run in parallel. A trial that does not converge within the tick cap is reported, not retried.

use rayon::prelude::*;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{Mouse, MouseConfig, PdGains, Position, TurnError, TurnOutcome};

/// Most values a single [`Steps`] range may expand to.
pub const MAX_STEPS: usize = 100_000;

#[derive(Error, Clone, Debug, PartialEq)]
pub enum SweepError {
    #[error("range {start}..={stop} step {step} must be finite")]
    NonFiniteRange { start: f64, stop: f64, step: f64 },
    #[error("range {start}..={stop} step {step} expands to more than {max} values", max = MAX_STEPS)]
    TooManySteps { start: f64, stop: f64, step: f64 },
}

/// Inclusive range of evenly spaced values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Steps {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl Steps {
    pub const fn new(start: f64, stop: f64, step: f64) -> Self {
        Self { start, stop, step }
    }

    /// A single value.
    pub const fn fixed(value: f64) -> Self {
        Self::new(value, value, 1.0)
    }

    /// `start`, `start + step`, ... up to and including `stop`. A non-positive step or an empty
    /// range yields only `start`.
    pub fn values(&self) -> Result<Vec<f64>, SweepError> {
        let Self { start, stop, step } = *self;
        if !(start.is_finite() && stop.is_finite() && step.is_finite()) {
            return Err(SweepError::NonFiniteRange { start, stop, step });
        }
        if step <= 0.0 || stop <= start {
            return Ok(vec![start]);
        }
        let count = ((stop - start) / step + 1e-9).floor();
        if count >= MAX_STEPS as f64 {
            return Err(SweepError::TooManySteps { start, stop, step });
        }
        Ok((0..=count as usize)
            .map(|i| start + i as f64 * step)
            .collect())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SweepConfig {
    pub speeds: Vec<f64>,
    pub kp_values: Vec<f64>,
    pub kd_values: Vec<f64>,
    pub dt_millis: f64,
    /// Ticks after which a trial counts as not converging.
    pub max_ticks: u64,
}

impl SweepConfig {
    pub fn grid(
        speeds: Steps,
        kp: Steps,
        kd: Steps,
        dt_millis: f64,
        max_ticks: u64,
    ) -> Result<Self, SweepError> {
        Ok(Self {
            speeds: speeds.values()?,
            kp_values: kp.values()?,
            kd_values: kd.values()?,
            dt_millis,
            max_ticks,
        })
    }

    /// Every combination, speed-major, then kp, then kd.
    pub fn trials(&self) -> Vec<(f64, PdGains)> {
        self.speeds
            .iter()
            .flat_map(|&speed| {
                self.kp_values.iter().flat_map(move |&kp| {
                    self.kd_values
                        .iter()
                        .map(move |&kd| (speed, PdGains::new(kp, kd)))
                })
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrialResult {
    pub base_speed: f64,
    pub gains: PdGains,
    pub outcome: Result<TurnOutcome, TurnError>,
}

impl TrialResult {
    pub fn converged(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Run every trial of `config` on the reference mouse. Results keep the order of
/// [`SweepConfig::trials`].
pub fn run_turn_sweep(config: &SweepConfig) -> Vec<TrialResult> {
    run_turn_sweep_with(config, &MouseConfig::default())
}

pub fn run_turn_sweep_with(config: &SweepConfig, mouse_config: &MouseConfig) -> Vec<TrialResult> {
    let trials = config.trials();
    info!(trials = trials.len(), dt_millis = config.dt_millis, "starting turn sweep");

    let results: Vec<TrialResult> = trials
        .par_iter()
        .map(|&(base_speed, gains)| run_trial(config, mouse_config, base_speed, gains))
        .collect();

    let converged = results.iter().filter(|r| r.converged()).count();
    info!(
        converged,
        capped = results.len() - converged,
        "turn sweep finished"
    );
    results
}

fn run_trial(
    config: &SweepConfig,
    mouse_config: &MouseConfig,
    base_speed: f64,
    gains: PdGains,
) -> TrialResult {
    let mut mouse = Mouse::new(Position::default(), mouse_config.clone());
    let outcome =
        mouse.simulate_right_turn_90_bounded(base_speed, gains, config.dt_millis, config.max_ticks);
    if let Err(error) = &outcome {
        warn!(base_speed, kp = gains.kp, kd = gains.kd, %error, "trial capped");
    }
    TrialResult {
        base_speed,
        gains,
        outcome,
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinMax {
    pub min: f64,
    pub max: f64,
}

impl MinMax {
    fn of(values: impl Iterator<Item = f64>) -> Option<Self> {
        values.fold(None, |acc, value| match acc {
            None => Some(Self {
                min: value,
                max: value,
            }),
            Some(Self { min, max }) => Some(Self {
                min: min.min(value),
                max: max.max(value),
            }),
        })
    }
}

/// Spread of the converged trials at one base speed. Ranges are `None` if nothing converged.
#[derive(Clone, Debug, PartialEq)]
pub struct SpeedSummary {
    pub base_speed: f64,
    pub converged: usize,
    pub capped: usize,
    pub total_error: Option<MinMax>,
    pub center_shift: Option<MinMax>,
    /// Over the absolute angle error.
    pub angle_error: Option<MinMax>,
}

/// One summary per distinct speed, in order of first appearance.
pub fn summarize_by_speed(results: &[TrialResult]) -> Vec<SpeedSummary> {
    let mut speeds: Vec<f64> = Vec::new();
    for result in results {
        if !speeds.contains(&result.base_speed) {
            speeds.push(result.base_speed);
        }
    }

    speeds
        .into_iter()
        .map(|base_speed| {
            let trials = results
                .iter()
                .filter(|r| r.base_speed == base_speed)
                .collect::<Vec<_>>();
            let outcomes = trials
                .iter()
                .filter_map(|r| r.outcome.as_ref().ok())
                .collect::<Vec<_>>();
            let range = |metric: Metric| MinMax::of(outcomes.iter().map(|o| metric.value(o)));

            SpeedSummary {
                base_speed,
                converged: outcomes.len(),
                capped: trials.len() - outcomes.len(),
                total_error: range(Metric::TotalError),
                center_shift: range(Metric::CenterShift),
                angle_error: range(Metric::AngleError),
            }
        })
        .collect()
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Metric {
    TotalError,
    CenterShift,
    /// Absolute angle error.
    AngleError,
}

impl Metric {
    pub fn value(self, outcome: &TurnOutcome) -> f64 {
        match self {
            Metric::TotalError => outcome.total_error,
            Metric::CenterShift => outcome.center_shift,
            Metric::AngleError => outcome.angle_error.abs(),
        }
    }
}

/// The `n` converged trials with the lowest `metric`, best first.
pub fn best_by(results: &[TrialResult], metric: Metric, n: usize) -> Vec<&TrialResult> {
    let mut ranked = results
        .iter()
        .filter_map(|r| r.outcome.as_ref().ok().map(|o| (metric.value(o), r)))
        .collect::<Vec<_>>();
    ranked.sort_by(|(a, _), (b, _)| a.total_cmp(b));
    ranked.into_iter().take(n).map(|(_, r)| r).collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::domain::TurnState;

    fn outcome(total_error: f64, center_shift: f64, angle_error: f64) -> TurnOutcome {
        TurnOutcome {
            total_error,
            center_shift,
            angle_error,
            ticks: 10,
        }
    }

    fn trial(base_speed: f64, kp: f64, outcome: Option<TurnOutcome>) -> TrialResult {
        TrialResult {
            base_speed,
            gains: PdGains::new(kp, 0.0),
            outcome: outcome.ok_or(TurnError::DidNotConverge {
                ticks: 100,
                state: TurnState::BothActive,
            }),
        }
    }

    #[rstest]
    #[case::quarters(Steps::new(0.0, 1.0, 0.25), vec![0.0, 0.25, 0.5, 0.75, 1.0])]
    #[case::tenths(Steps::new(0.0, 0.3, 0.1), vec![0.0, 0.1, 0.2, 0.30000000000000004])]
    #[case::stop_between_steps(Steps::new(80.0, 105.0, 10.0), vec![80.0, 90.0, 100.0])]
    #[case::fixed(Steps::fixed(90.0), vec![90.0])]
    #[case::zero_step(Steps::new(1.0, 2.0, 0.0), vec![1.0])]
    #[case::reversed(Steps::new(2.0, 1.0, 0.5), vec![2.0])]
    fn test_steps_values(#[case] steps: Steps, #[case] expected: Vec<f64>) {
        assert_eq!(steps.values(), Ok(expected));
    }

    #[rstest]
    #[case::tiny_step(Steps::new(0.0, 1e308, 1e-300))]
    #[case::just_over_limit(Steps::new(0.0, 100_000.0, 1.0))]
    fn test_steps_values_rejects_huge_ranges(#[case] steps: Steps) {
        assert_eq!(
            steps.values(),
            Err(SweepError::TooManySteps {
                start: steps.start,
                stop: steps.stop,
                step: steps.step
            })
        );
    }

    #[test]
    fn test_steps_values_at_limit() {
        let values = Steps::new(0.0, 99_999.0, 1.0).values().unwrap();
        assert_eq!(values.len(), MAX_STEPS);
    }

    #[rstest]
    #[case::infinite_stop(Steps::new(0.0, f64::INFINITY, 1.0))]
    #[case::nan_step(Steps::new(0.0, 1.0, f64::NAN))]
    fn test_steps_values_rejects_non_finite(#[case] steps: Steps) {
        assert!(matches!(
            steps.values(),
            Err(SweepError::NonFiniteRange { .. })
        ));
    }

    #[test]
    fn test_grid_propagates_range_errors() {
        let result = SweepConfig::grid(
            Steps::fixed(90.0),
            Steps::new(0.0, 1.0, 1e-12),
            Steps::fixed(0.0),
            0.1,
            100,
        );
        assert!(matches!(result, Err(SweepError::TooManySteps { .. })));
    }

    #[test]
    fn test_trial_results_clone() {
        let capped = trial(0.0, 0.0, None);
        let converged = trial(90.0, 0.5, Some(outcome(380.0, 2.0, 1.0)));
        let results = vec![capped, converged];
        assert_eq!(results.clone(), results);
        assert_eq!(summarize_by_speed(&results.clone()).len(), 2);
    }

    #[test]
    fn test_trials_order() {
        let config = SweepConfig::grid(
            Steps::new(80.0, 90.0, 10.0),
            Steps::new(0.0, 1.0, 1.0),
            Steps::new(0.5, 1.0, 0.5),
            0.1,
            100,
        )
        .unwrap();
        assert_eq!(
            config.trials(),
            vec![
                (80.0, PdGains::new(0.0, 0.5)),
                (80.0, PdGains::new(0.0, 1.0)),
                (80.0, PdGains::new(1.0, 0.5)),
                (80.0, PdGains::new(1.0, 1.0)),
                (90.0, PdGains::new(0.0, 0.5)),
                (90.0, PdGains::new(0.0, 1.0)),
                (90.0, PdGains::new(1.0, 0.5)),
                (90.0, PdGains::new(1.0, 1.0)),
            ]
        );
    }

    #[test]
    fn test_run_turn_sweep_matches_single_trials() {
        let config = SweepConfig {
            speeds: vec![0.0, 90.0],
            kp_values: vec![0.0, 0.4],
            kd_values: vec![0.0, 0.3],
            dt_millis: 0.1,
            max_ticks: 200,
        };
        let results = run_turn_sweep(&config);
        assert_eq!(results.len(), 8);

        for (result, (base_speed, gains)) in std::iter::zip(&results, config.trials()) {
            let mut mouse = Mouse::at(Position::default());
            assert_eq!(result.base_speed, base_speed);
            assert_eq!(result.gains, gains);
            assert_eq!(
                result.outcome,
                mouse.simulate_right_turn_90_bounded(base_speed, gains, 0.1, 200)
            );
        }

        assert_eq!(
            results[0].outcome,
            Err(TurnError::DidNotConverge {
                ticks: 200,
                state: TurnState::BothActive
            })
        );
        assert!(results[4..].iter().all(TrialResult::converged));

        let untuned = results[4].outcome.as_ref().unwrap();
        assert_eq!(untuned.ticks, 8);
        assert_abs_diff_eq!(untuned.angle_error, -5.272427827758122, epsilon = 1e-9);
    }

    #[test]
    fn test_summarize_by_speed() {
        let results = vec![
            trial(90.0, 0.0, Some(outcome(400.0, 0.0, -5.0))),
            trial(120.0, 0.0, None),
            trial(90.0, 0.5, Some(outcome(380.0, 2.0, 1.0))),
            trial(90.0, 1.0, None),
            trial(120.0, 0.5, Some(outcome(300.0, 1.5, -0.5))),
        ];

        assert_eq!(
            summarize_by_speed(&results),
            vec![
                SpeedSummary {
                    base_speed: 90.0,
                    converged: 2,
                    capped: 1,
                    total_error: Some(MinMax {
                        min: 380.0,
                        max: 400.0
                    }),
                    center_shift: Some(MinMax { min: 0.0, max: 2.0 }),
                    angle_error: Some(MinMax { min: 1.0, max: 5.0 }),
                },
                SpeedSummary {
                    base_speed: 120.0,
                    converged: 1,
                    capped: 1,
                    total_error: Some(MinMax {
                        min: 300.0,
                        max: 300.0
                    }),
                    center_shift: Some(MinMax { min: 1.5, max: 1.5 }),
                    angle_error: Some(MinMax { min: 0.5, max: 0.5 }),
                },
            ]
        );
    }

    #[test]
    fn test_summary_without_converged_trials() {
        let summary = summarize_by_speed(&[trial(0.0, 0.0, None)]);
        assert_eq!(summary[0].converged, 0);
        assert_eq!(summary[0].capped, 1);
        assert_eq!(summary[0].angle_error, None);
    }

    #[rstest]
    #[case::total_error(Metric::TotalError, vec![0.5, 0.0])]
    #[case::center_shift(Metric::CenterShift, vec![1.0, 0.5])]
    #[case::angle_error(Metric::AngleError, vec![0.0, 1.0])]
    fn test_best_by(#[case] metric: Metric, #[case] expected_kp: Vec<f64>) {
        let results = vec![
            trial(90.0, 0.0, Some(outcome(400.0, 3.0, -0.1))),
            trial(90.0, 0.5, Some(outcome(380.0, 2.0, 4.0))),
            trial(90.0, 0.7, None),
            trial(90.0, 1.0, Some(outcome(450.0, 0.5, -2.0))),
        ];
        let best = best_by(&results, metric, 2)
            .into_iter()
            .map(|r| r.gains.kp)
            .collect::<Vec<_>>();
        assert_eq!(best, expected_kp);
    }
}
