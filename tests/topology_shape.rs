//! Structural tests for the four DEVStone topologies.
//!
//! These tests check shape properties that hold for every width and depth:
//! - model counts per level and overall
//! - which couplings each kind produces
//! - determinism of repeated builds

use std::collections::HashSet;

use devstone::coupling::{Component, CoupledModel};
use devstone::topology::{build, BenchmarkKind, TopologyBuilder, TopologyParams};
use devstone::{ChildIndex, NoWorkload, PortName, StoneConfig, TopologyError};

// ============================================================================
// Helpers
// ============================================================================

const SHAPES: [(u32, u32); 6] = [(1, 1), (1, 4), (2, 2), (3, 3), (5, 4), (8, 2)];

fn quick(kind: BenchmarkKind, width: u32, depth: u32) -> CoupledModel {
    let params = TopologyParams::new(kind, width, depth, StoneConfig::default());
    TopologyBuilder::new(params)
        .with_workload(std::sync::Arc::new(NoWorkload))
        .build()
        .unwrap()
}

fn child_name(model: &CoupledModel, idx: ChildIndex) -> &str {
    model.child(idx).map(Component::name).unwrap()
}

// ============================================================================
// Shared properties
// ============================================================================

#[test]
fn test_atomic_count_matches_formula() {
    for kind in BenchmarkKind::ALL {
        for (width, depth) in SHAPES {
            let root = quick(kind, width, depth);
            let params = TopologyParams::new(kind, width, depth, StoneConfig::default());
            assert_eq!(
                root.atomic_count() as u64,
                params.expected_atomic_count(),
                "{} W={} D={}",
                kind,
                width,
                depth
            );
            assert_eq!(root.coupled_count(), depth as usize);
            assert_eq!(root.atomics().len(), root.atomic_count());
        }
    }
}

#[test]
fn test_every_level_has_single_eoc_from_wrapped() {
    for kind in BenchmarkKind::ALL {
        for (width, depth) in SHAPES {
            let root = quick(kind, width, depth);
            let levels = root.levels();
            assert_eq!(levels.len(), depth as usize);

            for (i, level) in levels.iter().enumerate() {
                assert_eq!(level.level(), depth - i as u32);
                assert_eq!(level.eoc().len(), 1);
                let eoc = level.eoc()[0];
                assert_eq!(eoc.to_port, PortName::Out);
                if level.level() > 1 {
                    assert_eq!(eoc.from, ChildIndex(0));
                    assert!(level.children()[0].is_coupled());
                } else {
                    assert_eq!(level.children().len(), 1);
                    assert!(level.children()[0].is_atomic());
                }
            }
        }
    }
}

#[test]
fn test_ids_unique_and_builds_deterministic() {
    for kind in BenchmarkKind::ALL {
        let a = quick(kind, 5, 4);
        let b = quick(kind, 5, 4);
        assert_eq!(a.to_tree(), b.to_tree());

        let mut ids = HashSet::new();
        for level in a.levels() {
            assert!(ids.insert(level.id()));
        }
        for atomic in a.atomics() {
            assert!(ids.insert(atomic.id()));
        }
    }
}

#[test]
fn test_width_one_is_a_chain_of_containers() {
    for kind in BenchmarkKind::ALL {
        let root = quick(kind, 1, 5);
        assert_eq!(root.atomic_count(), 1);
        for level in root.levels() {
            assert_eq!(level.children().len(), 1);
            assert!(level.ic().is_empty());
        }
    }
}

#[test]
fn test_invalid_parameters() {
    for kind in BenchmarkKind::ALL {
        assert!(matches!(
            build(kind, 0, 3, 0, 0, 1.0),
            Err(TopologyError::InvalidParameter(_))
        ));
        assert!(matches!(
            build(kind, 3, 0, 0, 0, 1.0),
            Err(TopologyError::InvalidParameter(_))
        ));
    }
}

// ============================================================================
// LI
// ============================================================================

#[test]
fn test_li_fans_out_without_internal_couplings() {
    let root = quick(BenchmarkKind::LI, 6, 4);
    for level in root.levels() {
        assert!(level.ic().is_empty());
        assert_eq!(level.eic().len(), level.children().len());
        assert!(level.eic().iter().all(|c| c.from_port == PortName::In));
    }
}

#[test]
fn test_li_three_by_three() {
    let root = build(BenchmarkKind::LI, 3, 3, 100, 100, 1.0).unwrap();

    assert_eq!(root.name(), "L3_coupled");
    assert_eq!(root.atomic_count(), 5);
    assert_eq!(root.children().len(), 3);
    assert_eq!(root.eic().len(), 3);
    assert!(root.ic().is_empty());

    let names: Vec<&str> = root.children().iter().map(Component::name).collect();
    assert_eq!(names, vec!["L2_coupled", "stone_L2_0_0", "stone_L2_1_0"]);

    let l1 = root.levels()[2];
    assert_eq!(l1.name(), "L1_coupled");
    assert_eq!(l1.children()[0].name(), "stone_L0_0_0");
}

// ============================================================================
// HI / HO
// ============================================================================

#[test]
fn test_hi_and_ho_chain_leaves_in_order() {
    for kind in [BenchmarkKind::HI, BenchmarkKind::HO] {
        let root = quick(kind, 5, 3);
        for level in root.levels().into_iter().filter(|l| l.level() > 1) {
            // sub plus four leaves
            assert_eq!(level.children().len(), 5);
            assert_eq!(level.ic().len(), 3);
            for (i, ic) in level.ic().iter().enumerate() {
                assert_eq!(ic.from, ChildIndex(i + 1));
                assert_eq!(ic.to, ChildIndex(i + 2));
                assert_eq!((ic.from_port, ic.to_port), (PortName::Out, PortName::In));
            }
            assert_eq!(level.eic().len(), 5);
            assert!(level.eic().iter().all(|c| c.from_port == PortName::In));
        }
    }
}

#[test]
fn test_hi_width_two_has_no_chain() {
    let root = quick(BenchmarkKind::HI, 2, 4);
    for level in root.levels() {
        assert!(level.ic().is_empty());
    }
}

#[test]
fn test_ho_matches_hi_structure() {
    let hi = quick(BenchmarkKind::HI, 4, 3);
    let ho = quick(BenchmarkKind::HO, 4, 3);
    assert_eq!(hi.to_tree(), ho.to_tree());
}

// ============================================================================
// HOmod
// ============================================================================

#[test]
fn test_homod_ports_and_column_sizes() {
    let root = quick(BenchmarkKind::HOmod, 4, 3);
    for level in root.levels() {
        assert!(level.has_input(PortName::Broadcast));
        assert!(level.has_input(PortName::Feedback));
        assert!(!level.has_input(PortName::In));
    }

    let top = &root;
    // sub plus columns of 2, 3 and 4 rows
    assert_eq!(top.children().len(), 1 + 2 + 3 + 4);
    for column in 0..3u32 {
        let rows = top
            .direct_atomics()
            .filter(|a| a.address().column == column)
            .count();
        assert_eq!(rows as u32, column + 2);
    }
}

#[test]
fn test_homod_inputs_reach_first_and_last_rows() {
    let root = quick(BenchmarkKind::HOmod, 4, 2);

    let broadcast: Vec<_> = root
        .eic()
        .iter()
        .filter(|c| c.from_port == PortName::Broadcast)
        .collect();
    assert_eq!(broadcast.len(), 1);
    assert_eq!(broadcast[0].to, ChildIndex(0));

    let mut fed: Vec<String> = root
        .eic()
        .iter()
        .filter(|c| c.from_port == PortName::Feedback)
        .map(|c| child_name(&root, c.to).to_string())
        .collect();
    fed.sort();
    assert_eq!(
        fed,
        vec![
            "stone_L1_0_0",
            "stone_L1_0_1",
            "stone_L1_1_0",
            "stone_L1_1_2",
            "stone_L1_2_0",
            "stone_L1_2_3",
        ]
    );
}

#[test]
fn test_homod_rows_feed_back_into_wrapped() {
    let root = quick(BenchmarkKind::HOmod, 3, 2);

    // one IC per leaf, no fan-out
    assert_eq!(root.ic().len(), 5);
    let mut sources = HashSet::new();
    for ic in root.ic() {
        assert!(sources.insert(ic.from));
    }

    let into_sub: Vec<&str> = root
        .ic()
        .iter()
        .filter(|c| c.to == ChildIndex(0))
        .map(|c| child_name(&root, c.from))
        .collect();
    assert_eq!(into_sub, vec!["stone_L1_0_0", "stone_L1_1_0"]);
    assert!(root
        .ic()
        .iter()
        .filter(|c| c.to == ChildIndex(0))
        .all(|c| c.to_port == PortName::Feedback));

    let upward: Vec<(&str, &str)> = root
        .ic()
        .iter()
        .filter(|c| c.to != ChildIndex(0))
        .map(|c| (child_name(&root, c.from), child_name(&root, c.to)))
        .collect();
    assert_eq!(
        upward,
        vec![
            ("stone_L1_0_1", "stone_L1_0_0"),
            ("stone_L1_1_1", "stone_L1_1_0"),
            ("stone_L1_1_2", "stone_L1_1_1"),
        ]
    );
}
