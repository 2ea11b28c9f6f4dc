//! Tests for kind-set bookkeeping and ambiguity resolution in the move cache

#[cfg(test)]
mod tests {
    use hexkmc::engine::{IncrementalMoveCache, Kind, KindSet};
    use hexkmc::io::error::KmcError;
    use hexkmc::rules::Move;
    use hexkmc::state::Node;
    use rand::{SeedableRng, rngs::StdRng};

    fn site(a: i32, b: i32) -> Move {
        Move::Site(Node(a, b))
    }

    // Verifies kind-set operations in isolation
    // Verified by making without() clear the whole mask
    #[test]
    fn test_kindset_operations() {
        let set = KindSet::singleton(Kind::Direct).with(Kind::Assisted);
        assert!(set.contains(Kind::Direct));
        assert!(set.contains(Kind::Assisted));
        assert!(!set.contains(Kind::Natural));
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Kind::Direct, Kind::Assisted]);

        let reduced = set.without(Kind::Direct);
        assert_eq!(reduced, KindSet::singleton(Kind::Assisted));
        assert!(reduced.without(Kind::Assisted).is_empty());
    }

    // Verifies add unions kinds and rejects duplicates
    // Verified by making add overwrite instead of union
    #[test]
    fn test_add_and_duplicate() {
        let mut cache = IncrementalMoveCache::new();
        cache.add(site(0, 0), Kind::Direct).unwrap();
        cache.add(site(0, 0), Kind::Assisted).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.kinds_of(&site(0, 0)),
            Some(KindSet::singleton(Kind::Direct).with(Kind::Assisted))
        );
        assert!(matches!(
            cache.add(site(0, 0), Kind::Direct),
            Err(KmcError::DuplicateKind { .. })
        ));
    }

    // Verifies clear_one narrows the set and drops the move when it empties
    // Verified by leaving an empty-kind move in the cache
    #[test]
    fn test_clear_one() {
        let mut cache = IncrementalMoveCache::new();
        cache.add(site(0, 0), Kind::Direct).unwrap();
        cache.add(site(0, 0), Kind::Assisted).unwrap();

        cache.clear_one(site(0, 0), Kind::Direct).unwrap();
        assert_eq!(
            cache.kinds_of(&site(0, 0)),
            Some(KindSet::singleton(Kind::Assisted))
        );

        cache.clear_one(site(0, 0), Kind::Assisted).unwrap();
        assert!(!cache.has_move(&site(0, 0)));
        assert!(cache.is_empty());
    }

    // Verifies clearing an unassociated kind is an error
    #[test]
    fn test_clear_one_kind_not_present() {
        let mut cache = IncrementalMoveCache::new();
        cache.add(site(0, 0), Kind::Direct).unwrap();
        assert!(matches!(
            cache.clear_one(site(0, 0), Kind::Natural),
            Err(KmcError::KindNotPresent { .. })
        ));
        assert!(matches!(
            cache.clear_one(site(1, 1), Kind::Direct),
            Err(KmcError::KindNotPresent { .. })
        ));
    }

    // Verifies clear_all removes a move regardless of its kinds and
    // tolerates absence
    #[test]
    fn test_clear_all() {
        let mut cache = IncrementalMoveCache::new();
        cache.add(site(0, 0), Kind::Direct).unwrap();
        cache.add(site(0, 0), Kind::Assisted).unwrap();
        cache.clear_all(&site(0, 0));
        assert!(cache.is_empty());
        // absent move is a no-op
        cache.clear_all(&site(0, 0));
    }

    // Verifies undecided_counts groups by exact kind-set, sorted
    // Verified by grouping by first kind instead of full set
    #[test]
    fn test_undecided_counts() {
        let mut cache = IncrementalMoveCache::new();
        for b in 0..3 {
            cache.add(site(0, b), Kind::Natural).unwrap();
        }
        for b in 0..2 {
            cache.add(site(1, b), Kind::Direct).unwrap();
            cache.add(site(1, b), Kind::Assisted).unwrap();
        }
        let counts = cache.undecided_counts();
        assert_eq!(
            counts,
            vec![
                (KindSet::singleton(Kind::Natural), 3),
                (KindSet::singleton(Kind::Direct).with(Kind::Assisted), 2),
            ]
        );
    }

    // Verifies decide conserves the total move count across kinds
    // Verified by dropping the final remainder assignment
    #[test]
    fn test_decide_conserves_counts() {
        let mut cache = IncrementalMoveCache::new();
        for b in 0..7 {
            cache.add(site(0, b), Kind::Natural).unwrap();
        }
        for b in 0..13 {
            cache.add(site(1, b), Kind::Direct).unwrap();
            cache.add(site(1, b), Kind::Assisted).unwrap();
        }
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let decision = cache.decide(&mut rng);
            assert_eq!(decision.count(Kind::Natural), 7);
            assert_eq!(decision.count(Kind::Direct) + decision.count(Kind::Assisted), 13);
        }
    }

    // Verifies ambiguous moves split evenly between their kinds over many
    // decide rounds
    // Verified by always assigning ambiguous moves to the first kind
    #[test]
    fn test_decide_fairness() {
        let mut cache = IncrementalMoveCache::new();
        cache.add(site(0, 0), Kind::Direct).unwrap();
        cache.add(site(0, 0), Kind::Assisted).unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        let rounds = 10_000;
        let mut direct = 0u64;
        for _ in 0..rounds {
            direct += cache.decide(&mut rng).count(Kind::Direct);
        }
        let fraction = direct as f64 / rounds as f64;
        assert!((fraction - 0.5).abs() < 0.05, "direct fraction {fraction}");
    }

    // Verifies pick returns a move decided to the requested kind
    #[test]
    fn test_pick_returns_decided_move() {
        let mut cache = IncrementalMoveCache::new();
        for b in 0..5 {
            cache.add(site(0, b), Kind::Natural).unwrap();
        }
        let mut rng = StdRng::seed_from_u64(9);
        let decision = cache.decide(&mut rng);
        assert_eq!(decision.count(Kind::Natural), 5);
        for _ in 0..20 {
            let mv = cache.pick(Kind::Natural, &decision, &mut rng, 5).unwrap();
            assert!(cache.has_move(&mv));
        }
    }

    // Verifies a stale expected total is rejected as a sources mismatch
    // Verified by skipping the total comparison in pick
    #[test]
    fn test_pick_sources_mismatch() {
        let mut cache = IncrementalMoveCache::new();
        for b in 0..5 {
            cache.add(site(0, b), Kind::Natural).unwrap();
        }
        let mut rng = StdRng::seed_from_u64(9);
        let decision = cache.decide(&mut rng);
        assert!(matches!(
            cache.pick(Kind::Natural, &decision, &mut rng, 4),
            Err(KmcError::SourcesMismatch { expected: 4, actual: 5, .. })
        ));
    }

    // Verifies validate_against accepts identical caches and names a
    // divergent move otherwise
    #[test]
    fn test_validate_against() {
        let mut live = IncrementalMoveCache::new();
        let mut fresh = IncrementalMoveCache::new();
        for b in 0..4 {
            live.add(site(0, b), Kind::Natural).unwrap();
            fresh.add(site(0, b), Kind::Natural).unwrap();
        }
        live.validate_against(&fresh, "test").unwrap();

        fresh.add(site(9, 9), Kind::Natural).unwrap();
        assert!(matches!(
            live.validate_against(&fresh, "test"),
            Err(KmcError::CacheDivergence { rule: "test", .. })
        ));

        live.add(site(9, 9), Kind::Direct).unwrap();
        assert!(live.validate_against(&fresh, "test").is_err());
    }
}
