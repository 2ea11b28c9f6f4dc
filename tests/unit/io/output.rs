//! Tests for the run document stream and snapshot persistence

#[cfg(test)]
mod tests {
    use hexkmc::engine::StepRecord;
    use hexkmc::io::error::KmcError;
    use hexkmc::io::output::{RunDocument, RunWriter, load_snapshot, save_snapshot};
    use hexkmc::rules::MoveInfo;
    use hexkmc::state::{DefectState, Lattice, LayerMask, Node};
    use std::io::Write;
    use std::path::Path;

    // Sink that accepts a fixed number of bytes and then refuses writes
    struct ChokedWriter {
        capacity: usize,
    }

    impl Write for ChokedWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if buf.len() <= self.capacity {
                self.capacity -= buf.len();
                Ok(buf.len())
            } else {
                Err(std::io::Error::other("sink refused the write"))
            }
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn header_len() -> usize {
        let mut buffer = Vec::new();
        RunWriter::new(&mut buffer, &Lattice::new([4, 4]))
            .unwrap()
            .finish()
            .unwrap();
        buffer.len() - 2
    }

    fn record(step: u64) -> StepRecord {
        StepRecord {
            step,
            rule: "create_vacancy".to_string(),
            kind: "natural".to_string(),
            move_info: MoveInfo::Site { node: Node(1, 2) },
            rate: 1.0,
            total_rate: 16.0,
            zobrist: None,
        }
    }

    // Verifies the streamed document parses back with header and events
    // intact
    // Verified by omitting the comma between events
    #[test]
    fn test_run_document_round_trip() {
        let lattice = Lattice::new([4, 4]);
        let mut buffer = Vec::new();
        {
            let mut writer = RunWriter::new(&mut buffer, &lattice).unwrap();
            writer.record(&record(1)).unwrap();
            writer.record(&record(2)).unwrap();
            assert_eq!(writer.events(), 2);
            writer.finish().unwrap();
        }

        let document: RunDocument = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(document.lattice.lattice_type, "hexagonal");
        assert_eq!(document.lattice.coord_format, "axial");
        assert_eq!(document.lattice.dim, [4, 4]);
        assert_eq!(document.events.len(), 2);
        assert_eq!(document.events[1].step, 2);
    }

    // Verifies an empty run still produces a well-formed document
    #[test]
    fn test_empty_run_document() {
        let lattice = Lattice::new([4, 4]);
        let mut buffer = Vec::new();
        RunWriter::new(&mut buffer, &lattice)
            .unwrap()
            .finish()
            .unwrap();
        let document: RunDocument = serde_json::from_slice(&buffer).unwrap();
        assert!(document.events.is_empty());
    }

    // Verifies the record field names that form the output contract
    // Verified by renaming the move field back to move_info
    #[test]
    fn test_record_field_contract() {
        let value = serde_json::to_value(record(3)).unwrap();
        assert_eq!(value["step"], 3);
        assert_eq!(value["rule"], "create_vacancy");
        assert_eq!(value["kind"], "natural");
        assert_eq!(value["move"]["action"], "site");
        assert_eq!(value["move"]["node"], serde_json::json!([1, 2]));
        // absent fingerprint is omitted, not null
        assert!(value.get("zobrist").is_none());

        let mut with_key = record(3);
        with_key.zobrist = Some(7);
        let value = serde_json::to_value(with_key).unwrap();
        assert_eq!(value["zobrist"], 7);
    }

    // Verifies move descriptions serialize with their action tags
    #[test]
    fn test_move_info_shapes() {
        let hop = MoveInfo::Hop {
            was: Node(0, 0),
            now: Node(1, 0),
        };
        let value = serde_json::to_value(hop).unwrap();
        assert_eq!(value["action"], "hop");
        assert_eq!(value["was"], serde_json::json!([0, 0]));

        let cluster = MoveInfo::Cluster {
            nodes: [Node(0, 0), Node(0, 2), Node(2, 0)],
        };
        let value = serde_json::to_value(cluster).unwrap();
        assert_eq!(value["action"], "cluster");

        let flip = MoveInfo::Flip { node: Node(4, 4) };
        assert_eq!(serde_json::to_value(flip).unwrap()["action"], "flip");
    }

    // Verifies a failed record write reports the operation and target
    // instead of an anonymous I/O error
    // Verified by routing record errors through the blanket From impl
    #[test]
    fn test_record_write_failure_names_operation() {
        let lattice = Lattice::new([4, 4]);
        let sink = ChokedWriter {
            capacity: header_len(),
        };
        let mut writer = RunWriter::new(sink, &lattice).unwrap();
        let err = writer.record(&record(1)).unwrap_err();
        match err {
            KmcError::FileSystem {
                path, operation, ..
            } => {
                assert_eq!(operation, "write step record");
                assert_eq!(path, Path::new("<buffer>"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    // Verifies a failed trailer write reports the close operation
    #[test]
    fn test_finish_write_failure_names_operation() {
        let lattice = Lattice::new([4, 4]);
        let sink = ChokedWriter {
            capacity: header_len(),
        };
        let writer = RunWriter::new(sink, &lattice).unwrap();
        let err = writer.finish().unwrap_err();
        let KmcError::FileSystem { operation, .. } = err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(operation, "close run document");
    }

    // Verifies a failed document creation carries the requested path
    #[test]
    fn test_create_failure_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("run.json");
        let err = RunWriter::create(&path, &Lattice::new([4, 4])).unwrap_err();
        let KmcError::FileSystem {
            path: reported,
            operation,
            ..
        } = err
        else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(reported, path);
        assert_eq!(operation, "create run document");
    }

    // Verifies snapshots survive the file round trip
    #[test]
    fn test_snapshot_file_round_trip() {
        let mut state = DefectState::new(Lattice::new([6, 6]));
        state.create_vacancy(Node(3, 3), LayerMask::BOTH);
        state.create_vacancy(Node(1, 4), LayerMask::TOP);
        let snapshot = state.snapshot();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        save_snapshot(&path, &snapshot).unwrap();
        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded, snapshot);

        let rebuilt = DefectState::from_snapshot(&loaded).unwrap();
        rebuilt.validate().unwrap();
    }

    // Verifies a missing snapshot file surfaces as a file system error
    #[test]
    fn test_missing_snapshot_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(load_snapshot(&path).is_err());
    }
}
