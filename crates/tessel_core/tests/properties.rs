use proptest::prelude::*;
use std::collections::BTreeSet;
use tessel_core::config::{BroadPhaseConfig, GridConfig};
use tessel_core::spatial::{
    Aabb, BroadPhase, CellSpan, EntityHandle, EntitySet, HashGrid, MapId, MapRegistry,
    PairDeduplicator,
};

const CELL: f32 = 64.0;

fn grid() -> HashGrid {
    HashGrid::new(&GridConfig {
        cell_size: CELL,
        ..GridConfig::default()
    })
}

fn aabb() -> impl Strategy<Value = Aabb> {
    (-600.0f32..600.0, -600.0f32..600.0, 0.0f32..200.0, 0.0f32..200.0)
        .prop_map(|(x, y, w, h)| Aabb::from_rect(x, y, w, h))
}

fn query(grid: &HashGrid, bounds: &Aabb) -> EntitySet {
    let mut found = EntitySet::new();
    grid.query_bounds(&mut found, bounds);
    found
}

fn expanded(bounds: &Aabb, by: f32) -> Aabb {
    Aabb::new(bounds.min - by, bounds.max + by)
}

fn shares_cell(a: CellSpan, b: CellSpan) -> bool {
    a.iter().any(|cell| b.contains(cell))
}

proptest! {
    #[test]
    fn overlapping_entities_are_always_found(
        boxes in prop::collection::vec(aabb(), 1..40),
        area in aabb(),
    ) {
        let mut grid = grid();
        for (i, bounds) in boxes.iter().enumerate() {
            grid.insert(EntityHandle::new(i as u32), *bounds).unwrap();
        }
        let found = query(&grid, &area);

        for (i, bounds) in boxes.iter().enumerate() {
            if bounds.overlaps(&area) {
                prop_assert!(found.contains(EntityHandle::new(i as u32)));
            }
        }
        // Extra hits come from shared cells, never from further away.
        for entity in found.iter() {
            let bounds = boxes[entity.index() as usize];
            prop_assert!(bounds.overlaps(&expanded(&area, CELL)));
        }
    }

    #[test]
    fn moved_entity_is_found_only_at_its_new_bounds(from in aabb(), to in aabb()) {
        let mut grid = grid();
        let entity = EntityHandle::new(7);
        grid.insert(entity, from).unwrap();
        grid.move_entity(entity, from, to).unwrap();

        prop_assert!(query(&grid, &to).contains(entity));
        if !shares_cell(grid.span_for(&from), grid.span_for(&to)) {
            prop_assert!(!query(&grid, &from).contains(entity));
        }
        prop_assert!(grid.verify().is_ok());
    }

    #[test]
    fn removal_shrinks_each_occupied_bucket_by_one(
        boxes in prop::collection::vec(aabb(), 2..30),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut grid = grid();
        for (i, bounds) in boxes.iter().enumerate() {
            grid.insert(EntityHandle::new(i as u32), *bounds).unwrap();
        }
        let victim_idx = pick.index(boxes.len());
        let victim = EntityHandle::new(victim_idx as u32);
        let cells: Vec<_> = grid.span_for(&boxes[victim_idx]).iter().collect();
        let before: Vec<_> = cells.iter().map(|&c| grid.bucket_len(c)).collect();

        prop_assert!(grid.remove(victim));

        for (cell, len) in cells.iter().zip(before) {
            prop_assert_eq!(grid.bucket_len(*cell), len - 1);
        }
        prop_assert!(!query(&grid, &boxes[victim_idx]).contains(victim));
        prop_assert!(!query(&grid, &expanded(&boxes[victim_idx], 500.0)).contains(victim));
        prop_assert!(grid.verify().is_ok());
    }

    #[test]
    fn pair_keys_ignore_argument_order(a in any::<u32>(), b in any::<u32>()) {
        let (a, b) = (EntityHandle::new(a), EntityHandle::new(b));
        let mut seen = PairDeduplicator::new();
        prop_assert!(!seen.mark_and_test_seen(a, b));
        prop_assert!(seen.mark_and_test_seen(b, a));

        seen.clear();
        prop_assert!(!seen.mark_and_test_seen(b, a));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn broad_phase_matches_brute_force(
        boxes in prop::collection::vec(aabb(), 0..60),
        workers in 0usize..4,
    ) {
        let mut maps = MapRegistry::new(GridConfig::default());
        let map = MapId::new(0);
        for (i, bounds) in boxes.iter().enumerate() {
            maps.grid(map).insert(EntityHandle::new(i as u32), *bounds).unwrap();
        }
        let mut broad = BroadPhase::new(&BroadPhaseConfig {
            worker_threads: workers,
            pair_capacity: 64,
        })
        .unwrap();
        broad.run(&maps);

        let got: Vec<(u32, u32)> = broad
            .pairs()
            .iter()
            .map(|p| (p.first.index(), p.second.index()))
            .collect();
        let unique: BTreeSet<_> = got.iter().copied().collect();
        prop_assert_eq!(unique.len(), got.len());

        let mut expected = BTreeSet::new();
        for i in 0..boxes.len() {
            for j in i + 1..boxes.len() {
                if boxes[i].overlaps(&boxes[j]) {
                    expected.insert((i as u32, j as u32));
                }
            }
        }
        prop_assert_eq!(unique, expected);
    }
}
