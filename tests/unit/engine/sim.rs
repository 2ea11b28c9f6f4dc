//! Tests for engine construction and single-step behavior

#[cfg(test)]
mod tests {
    use hexkmc::engine::{Kind, KmcEngine, UpdateMode};
    use hexkmc::io::error::KmcError;
    use hexkmc::rules::{CreateVacancy, FillVacancy, MigrateVacancy, Rule};
    use hexkmc::state::{DefectState, Lattice};
    use std::collections::HashMap;

    fn natural(rate: f64) -> HashMap<Kind, f64> {
        HashMap::from([(Kind::Natural, rate)])
    }

    // Verifies a rule missing a required kind rate is rejected at
    // construction
    #[test]
    fn test_missing_rate_rejected() {
        let state = DefectState::new(Lattice::new([4, 4]));
        let rules: Vec<(Box<dyn Rule>, _)> = vec![(
            Box::new(MigrateVacancy::new()) as Box<dyn Rule>,
            HashMap::from([(Kind::Direct, 1.0)]),
        )];
        assert!(matches!(
            KmcEngine::new(state, rules, UpdateMode::Incremental, 0),
            Err(KmcError::MissingRate { rule: "migrate_vacancy", kind: "assisted" })
        ));
    }

    // Verifies a negative rate is rejected at construction
    #[test]
    fn test_negative_rate_rejected() {
        let state = DefectState::new(Lattice::new([4, 4]));
        let rules: Vec<(Box<dyn Rule>, _)> =
            vec![(Box::new(CreateVacancy::new()) as Box<dyn Rule>, natural(-1.0))];
        assert!(matches!(
            KmcEngine::new(state, rules, UpdateMode::Incremental, 0),
            Err(KmcError::Config { .. })
        ));
    }

    // Verifies the first step on a pristine lattice creates one divacancy
    // and records the full channel weight
    // Verified by weighting channels by rate alone instead of count * rate
    #[test]
    fn test_first_step_on_pristine_lattice() {
        let state = DefectState::new(Lattice::new([2, 2]));
        let rules: Vec<(Box<dyn Rule>, _)> =
            vec![(Box::new(CreateVacancy::new()) as Box<dyn Rule>, natural(1.5))];
        let mut engine = KmcEngine::new(state, rules, UpdateMode::Incremental, 0).unwrap();

        let record = engine.perform_random_move().unwrap();
        assert_eq!(record.step, 1);
        assert_eq!(record.rule, "create_vacancy");
        assert_eq!(record.kind, "natural");
        assert!((record.rate - 1.5).abs() < f64::EPSILON);
        // 4 pristine sites, one channel
        assert!((record.total_rate - 6.0).abs() < 1e-12);
        assert_eq!(record.zobrist, None);
        assert_eq!(engine.state().vacancy_count(), 1);
        engine.validate().unwrap();
    }

    // Verifies exhaustion is reported as the distinct terminal condition
    #[test]
    fn test_exhaustion() {
        let state = DefectState::new(Lattice::new([3, 3]));
        let rules: Vec<(Box<dyn Rule>, _)> =
            vec![(Box::new(FillVacancy::new()) as Box<dyn Rule>, natural(1.0))];
        let mut engine = KmcEngine::new(state, rules, UpdateMode::Incremental, 0).unwrap();

        let err = engine.perform_random_move().unwrap_err();
        assert!(err.is_exhaustion());
        assert!(matches!(err, KmcError::NoEligibleMoves { step: 0 }));
        assert_eq!(engine.step(), 0);
    }

    // Verifies the fingerprint is carried in step records when enabled
    #[test]
    fn test_fingerprint_in_records() {
        let mut state = DefectState::new(Lattice::new([3, 3]));
        state.enable_fingerprint(99);
        let rules: Vec<(Box<dyn Rule>, _)> =
            vec![(Box::new(CreateVacancy::new()) as Box<dyn Rule>, natural(1.0))];
        let mut engine = KmcEngine::new(state, rules, UpdateMode::Incremental, 0).unwrap();

        let record = engine.perform_random_move().unwrap();
        assert!(record.zobrist.is_some());
        assert_eq!(record.zobrist, engine.state().fingerprint_key());
        engine.validate().unwrap();
    }

    // Verifies full-recompute mode steps and validates like incremental
    #[test]
    fn test_full_recompute_mode() {
        let state = DefectState::new(Lattice::new([3, 3]));
        let rules: Vec<(Box<dyn Rule>, _)> = vec![
            (Box::new(CreateVacancy::new()) as Box<dyn Rule>, natural(1.0)),
            (Box::new(FillVacancy::new()) as Box<dyn Rule>, natural(1.0)),
        ];
        let mut engine = KmcEngine::new(state, rules, UpdateMode::FullRecompute, 4).unwrap();
        for _ in 0..20 {
            engine.perform_random_move().unwrap();
            engine.validate().unwrap();
        }
        assert_eq!(engine.step(), 20);
    }
}
