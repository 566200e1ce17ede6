//! Batch planner properties over generated cost sequences

use kline_harvester::downloader::planner::plan_batches;
use kline_harvester::Symbol;

/// Deterministic pseudo-random costs with plenty of zeros and a few giants
fn costs(seed: u64, n: usize) -> Vec<(Symbol, u32)> {
    let mut state = seed;
    (0..n)
        .map(|i| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let roll = (state >> 33) % 100;
            let cost = match roll {
                0..=29 => 0,
                30..=94 => (state >> 40) as u32 % 200 + 1,
                _ => 1500 + (state >> 45) as u32 % 500,
            };
            (Symbol::new(format!("SYM{i}")), cost)
        })
        .collect()
}

#[test]
fn test_batches_respect_ceiling_unless_alone() {
    for seed in 0..20 {
        for ceiling in [1, 50, 300, 1100] {
            for batch in plan_batches(ceiling, costs(seed, 300)) {
                assert!(!batch.is_empty());
                assert!(
                    batch.total_cost() <= u64::from(ceiling) || batch.len() == 1,
                    "seed {seed} ceiling {ceiling}: batch of {} weighs {}",
                    batch.len(),
                    batch.total_cost()
                );
            }
        }
    }
}

#[test]
fn test_batches_cover_non_zero_input_in_order() {
    for seed in 0..20 {
        let input = costs(seed, 300);
        let expected: Vec<Symbol> = input
            .iter()
            .filter(|(_, c)| *c > 0)
            .map(|(s, _)| s.clone())
            .collect();

        let flattened: Vec<Symbol> = plan_batches(1100, input)
            .iter()
            .flat_map(|b| b.symbols().cloned().collect::<Vec<_>>())
            .collect();

        assert_eq!(flattened, expected, "seed {seed}");
    }
}
