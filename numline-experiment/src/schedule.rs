use crate::config::BlockConfig;
use numline_core::{ConfigError, Target};
use rand::Rng;
use rand::seq::SliceRandom;
use rand::seq::index;

/// Ordered targets of one block, each paired with its ground-truth fraction.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockSchedule {
    entries: Vec<Target>,
}

impl BlockSchedule {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn targets(&self) -> Vec<f64> {
        self.entries.iter().map(|t| t.value).collect()
    }

    pub fn fractions(&self) -> Vec<f64> {
        self.entries.iter().map(|t| t.fraction).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.entries.iter()
    }
}

/// Builds the shuffled target sequence of a block.
///
/// Random targets are drawn first (distinct integers from `[start, end)` for
/// whole-number blocks, uniform fractions otherwise), the wanted numbers are
/// appended verbatim, and the combined pairs are shuffled together.
pub fn schedule_block<R: Rng>(
    block: &BlockConfig,
    rng: &mut R,
) -> Result<BlockSchedule, ConfigError> {
    block.check_feasible()?;

    let line = block.line;
    let generate = block.generated_count();
    let mut entries = Vec::with_capacity(block.trials);

    if block.whole_numbers {
        let first = line.start.ceil();
        let available = block.available_whole_numbers();
        for offset in index::sample(rng, available, generate).into_iter() {
            let value = first + offset as f64;
            entries.push(Target {
                value,
                fraction: line.fraction_of(value),
            });
        }
    } else {
        for _ in 0..generate {
            let fraction: f64 = rng.random();
            entries.push(Target {
                value: line.value_at(fraction),
                fraction,
            });
        }
    }

    entries.extend(block.wanted.iter().map(|&value| Target {
        value,
        fraction: line.fraction_of(value),
    }));
    entries.shuffle(rng);

    tracing::debug!(
        block = block.index + 1,
        generated = generate,
        wanted = block.wanted.len(),
        "block scheduled"
    );
    Ok(BlockSchedule { entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use numline_core::LineSegment;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn block(trials: usize, whole: bool, wanted: &[f64], start: f64, end: f64) -> BlockConfig {
        BlockConfig {
            index: 0,
            trials,
            whole_numbers: whole,
            wanted: wanted.to_vec(),
            show_target: true,
            line: LineSegment::new(start, end),
        }
    }

    #[test]
    fn whole_number_block_contains_wanted_and_distinct_integers() {
        let b = block(5, true, &[3.0, 7.0], 0.0, 10.0);
        for seed in 0..50 {
            let schedule = schedule_block(&b, &mut StdRng::seed_from_u64(seed)).unwrap();
            let targets = schedule.targets();
            assert_eq!(targets.len(), 5);
            assert!(targets.contains(&3.0) && targets.contains(&7.0));
            for t in schedule.iter() {
                assert_eq!(t.value.fract(), 0.0);
                assert!((0.0..10.0).contains(&t.value));
                assert!((t.fraction - t.value / 10.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn generated_integers_are_pairwise_distinct() {
        // No wanted numbers, so every entry is generated.
        let b = block(20, true, &[], 100.0, 120.0);
        let schedule = schedule_block(&b, &mut StdRng::seed_from_u64(7)).unwrap();
        let distinct: HashSet<i64> = schedule.targets().iter().map(|v| *v as i64).collect();
        assert_eq!(distinct.len(), 20);
        assert!(distinct.iter().all(|v| (100..120).contains(v)));
    }

    #[test]
    fn whole_fraction_is_relative_to_start() {
        let b = block(4, true, &[15.0], 10.0, 20.0);
        let schedule = schedule_block(&b, &mut StdRng::seed_from_u64(3)).unwrap();
        for t in schedule.iter() {
            assert!((t.fraction - (t.value - 10.0) / 10.0).abs() < 1e-12);
        }
    }

    #[test]
    fn fractional_block_stays_inside_line() {
        let b = block(3, false, &[], -5.0, 5.0);
        for seed in 0..50 {
            let schedule = schedule_block(&b, &mut StdRng::seed_from_u64(seed)).unwrap();
            assert_eq!(schedule.len(), 3);
            for t in schedule.iter() {
                assert!((0.0..1.0).contains(&t.fraction));
                assert!(t.value > -5.0 && t.value < 5.0);
                assert!((t.value - (10.0 * t.fraction - 5.0)).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn length_matches_trial_count_for_any_split() {
        let mut rng = StdRng::seed_from_u64(11);
        for trials in 0..12 {
            for wanted_count in 0..=trials {
                let wanted: Vec<f64> = (0..wanted_count).map(|i| i as f64).collect();
                for whole in [true, false] {
                    let b = block(trials, whole, &wanted, 0.0, 12.0);
                    let schedule = schedule_block(&b, &mut rng).unwrap();
                    assert_eq!(schedule.len(), trials);
                    assert_eq!(schedule.fractions().len(), trials);
                }
            }
        }
    }

    #[test]
    fn wanted_pairs_survive_the_shuffle() {
        let b = block(6, false, &[-2.5, 4.0], -5.0, 5.0);
        let schedule = schedule_block(&b, &mut StdRng::seed_from_u64(5)).unwrap();
        for wanted in [-2.5, 4.0] {
            let t = schedule.iter().find(|t| t.value == wanted).unwrap();
            assert!((t.fraction - (wanted + 5.0) / 10.0).abs() < 1e-12);
        }
    }

    #[test]
    fn infeasible_request_fails_instead_of_truncating() {
        let b = block(12, true, &[1.0], 0.0, 10.0);
        let err = schedule_block(&b, &mut StdRng::seed_from_u64(1)).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InfeasibleSampling {
                requested: 11,
                available: 10,
                ..
            }
        ));
    }

    #[test]
    fn exhaustive_sampling_uses_every_integer() {
        let b = block(10, true, &[], 0.0, 10.0);
        let schedule = schedule_block(&b, &mut StdRng::seed_from_u64(9)).unwrap();
        let mut values = schedule.targets();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(values, (0..10).map(|v| v as f64).collect::<Vec<_>>());
    }
}
