//! Tests for trefoil formation and dissociation
//!
//! The trefoil partner star of a node (a, b) in axial coordinates is
//! (a±2, b∓2), (a±2, b), (a, b±2); the triple used throughout these tests,
//! {(0,0), (0,2), (2,0)}, is pairwise trefoil-adjacent on a 6x6 cell.

#[cfg(test)]
mod tests {
    use hexkmc::rules::{CreateTrefoil, DestroyTrefoil, Move, MoveInfo, Rule};
    use hexkmc::state::{DefectState, Lattice, LayerMask, Node};

    const TRIPLE: [Node; 3] = [Node(0, 0), Node(0, 2), Node(2, 0)];

    fn three_divacancies() -> DefectState {
        let mut state = DefectState::new(Lattice::new([6, 6]));
        for node in TRIPLE {
            state.create_vacancy(node, LayerMask::BOTH);
        }
        state
    }

    // Verifies three mutually adjacent divacancies yield exactly one
    // formation move
    // Verified by skipping the mutual-adjacency check
    #[test]
    fn test_formation_enumeration() {
        let state = three_divacancies();
        let mut rule = CreateTrefoil::new();
        rule.initialize_moves(&state).unwrap();
        assert_eq!(rule.cache().len(), 1);
        assert!(rule.cache().has_move(&Move::Triple(TRIPLE)));
    }

    // Verifies two divacancies alone yield no formation move
    #[test]
    fn test_no_formation_from_pair() {
        let mut state = DefectState::new(Lattice::new([6, 6]));
        state.create_vacancy(Node(0, 0), LayerMask::BOTH);
        state.create_vacancy(Node(0, 2), LayerMask::BOTH);

        let mut rule = CreateTrefoil::new();
        rule.initialize_moves(&state).unwrap();
        assert!(rule.cache().is_empty());
    }

    // Verifies formation rotates the three divacancies into one trefoil
    // and the callbacks keep both trefoil rules consistent
    #[test]
    fn test_formation_and_dissociation_round_trip() {
        let mut state = three_divacancies();
        let mut create = CreateTrefoil::new();
        let mut destroy = DestroyTrefoil::new();
        create.initialize_moves(&state).unwrap();
        destroy.initialize_moves(&state).unwrap();
        assert!(destroy.cache().is_empty());

        let mv = Move::Triple(TRIPLE);
        let changed = create.nodes_affected_by(&mv);
        create.pre_status_change(&state, &changed);
        destroy.pre_status_change(&state, &changed);
        create.perform(&mv, &mut state);
        create.post_status_change(&state, &changed).unwrap();
        destroy.post_status_change(&state, &changed).unwrap();

        assert_eq!(state.trefoil_count(), 1);
        assert_eq!(state.vacancy_count(), 0);
        assert_eq!(state.trefoil_nodes_at(Node(0, 0)), Some(TRIPLE));
        create.validate(&state).unwrap();
        destroy.validate(&state).unwrap();
        assert_eq!(destroy.cache().len(), 1);
        assert_eq!(create.info(&mv), MoveInfo::Cluster { nodes: TRIPLE });

        // and back
        destroy.pre_status_change(&state, &changed);
        create.pre_status_change(&state, &changed);
        destroy.perform(&mv, &mut state);
        destroy.post_status_change(&state, &changed).unwrap();
        create.post_status_change(&state, &changed).unwrap();

        assert_eq!(state.trefoil_count(), 0);
        assert_eq!(state.vacancy_count(), 3);
        create.validate(&state).unwrap();
        destroy.validate(&state).unwrap();
        state.validate().unwrap();
    }
}
