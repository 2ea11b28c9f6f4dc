//! Tests for the weighted selection primitive

#[cfg(test)]
mod tests {
    use hexkmc::engine::{weighted_choice, weighted_sample};
    use hexkmc::io::error::KmcError;
    use rand::{SeedableRng, rngs::StdRng};

    // Verifies empirical frequencies track the weights
    // Verified by selecting uniformly regardless of weight
    #[test]
    fn test_distribution_follows_weights() {
        let entries = [("heavy", 3.0), ("light", 1.0)];
        let mut rng = StdRng::seed_from_u64(5);
        let draws = 100_000;
        let mut heavy = 0u32;
        for _ in 0..draws {
            if *weighted_choice(&entries, &mut rng).unwrap() == "heavy" {
                heavy += 1;
            }
        }
        let fraction = f64::from(heavy) / f64::from(draws);
        assert!((fraction - 0.75).abs() < 0.01, "heavy fraction {fraction}");
    }

    // Verifies zero-weight entries can never be selected
    // Verified by keeping zero weights in the cumulative table
    #[test]
    fn test_zero_weight_impossible() {
        let entries = [("never", 0.0), ("always", 2.0)];
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..1000 {
            assert_eq!(*weighted_choice(&entries, &mut rng).unwrap(), "always");
        }
    }

    // Verifies a negative weight is rejected naming the offending entry
    #[test]
    fn test_negative_weight_rejected() {
        let entries = [("ok", 1.0), ("bad", -0.5)];
        let mut rng = StdRng::seed_from_u64(5);
        match weighted_choice(&entries, &mut rng) {
            Err(KmcError::NegativeWeight { value, weight }) => {
                assert!(value.contains("bad"));
                assert!((weight - -0.5).abs() < f64::EPSILON);
            }
            other => panic!("expected NegativeWeight, got {other:?}"),
        }
    }

    // Verifies an empty or all-zero entry list is rejected
    #[test]
    fn test_empty_choice_rejected() {
        let mut rng = StdRng::seed_from_u64(5);
        let empty: [(&str, f64); 0] = [];
        assert!(matches!(
            weighted_choice(&empty, &mut rng),
            Err(KmcError::EmptyChoice)
        ));
        let zeros = [("a", 0.0), ("b", 0.0)];
        assert!(matches!(
            weighted_choice(&zeros, &mut rng),
            Err(KmcError::EmptyChoice)
        ));
    }

    // Verifies sampling with replacement returns the requested count of
    // valid entries
    #[test]
    fn test_weighted_sample() {
        let entries = [("a", 1.0), ("b", 2.0), ("c", 0.0)];
        let mut rng = StdRng::seed_from_u64(5);
        let picks = weighted_sample(&entries, 50, &mut rng).unwrap();
        assert_eq!(picks.len(), 50);
        assert!(picks.iter().all(|p| **p == "a" || **p == "b"));
    }
}
