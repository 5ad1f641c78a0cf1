//! Grid substrate tests: bounded storage and region iteration. Block values
//! are opaque `BlockId`s; nothing here depends on game semantics.

use std::collections::HashSet;

use blockforge_engine::world::block::BlockId;
use blockforge_engine::world::chunk::{Chunk, ChunkSection, SECTION_SIZE};
use blockforge_engine::world::position::{BlockPos, LocalBlockPos};
use blockforge_engine::world::region::Cuboid;
use blockforge_engine::world::{Dimensions, World};

const STONE: BlockId = BlockId(1);

// ---------------------------------------------------------------------------
// World storage
// ---------------------------------------------------------------------------

#[test]
fn out_of_bounds_reads_are_none() {
    let world = World::new(Dimensions::new(16, 16, 16));
    assert_eq!(world.get_block(BlockPos::new(0, 0, 0)), Some(BlockId::AIR));
    assert_eq!(world.get_block(BlockPos::new(15, 15, 15)), Some(BlockId::AIR));
    assert_eq!(world.get_block(BlockPos::new(16, 0, 0)), None);
    assert_eq!(world.get_block(BlockPos::new(0, -1, 0)), None);
    assert_eq!(world.get_block(BlockPos::new(0, 0, 16)), None);
}

#[test]
fn out_of_bounds_writes_are_dropped() {
    let world = World::new(Dimensions::new(8, 8, 8));
    assert!(!world.set_block(BlockPos::new(-1, 0, 0), STONE));
    assert!(!world.set_block(BlockPos::new(0, 8, 0), STONE));
    assert_eq!(world.chunk_count(), 0);
    assert!(world.set_block(BlockPos::new(7, 7, 7), STONE));
    assert_eq!(world.get_block(BlockPos::new(7, 7, 7)), Some(STONE));
}

#[test]
fn writing_air_into_empty_column_allocates_nothing() {
    let world = World::new(Dimensions::new(64, 16, 64));
    world.set_block(BlockPos::new(40, 3, 40), BlockId::AIR);
    assert_eq!(world.chunk_count(), 0);
}

#[test]
fn fill_layers_covers_whole_plane() {
    let world = World::new(Dimensions::new(20, 8, 20));
    world.fill_layers(0..=1, STONE);
    for x in 0..20 {
        for z in 0..20 {
            assert_eq!(world.get_block(BlockPos::new(x, 0, z)), Some(STONE));
            assert_eq!(world.get_block(BlockPos::new(x, 1, z)), Some(STONE));
            assert_eq!(world.get_block(BlockPos::new(x, 2, z)), Some(BlockId::AIR));
        }
    }
    // 20 wide spans two chunk columns on each horizontal axis.
    assert_eq!(world.chunk_count(), 4);
}

#[test]
fn section_is_released_once_cleared() {
    let mut chunk = Chunk::new();
    let a = LocalBlockPos { x: 1, y: 2, z: 3 };
    let b = LocalBlockPos { x: 4, y: 5, z: 6 };
    chunk.set_block(a, STONE);
    chunk.set_block(b, STONE);
    assert_eq!(chunk.section_count(), 1);

    chunk.set_block(a, BlockId::AIR);
    assert_eq!(chunk.section_count(), 1);
    chunk.set_block(b, BlockId::AIR);
    assert_eq!(chunk.section_count(), 0);
}

#[test]
fn filled_section_tracks_solid_count() {
    let mut section = ChunkSection::new_filled(STONE);
    assert!(!section.is_empty());
    for x in 0..SECTION_SIZE as u8 {
        for y in 0..SECTION_SIZE as u8 {
            for z in 0..SECTION_SIZE as u8 {
                section.set(x, y, z, BlockId::AIR);
            }
        }
    }
    assert!(section.is_empty());
}

// ---------------------------------------------------------------------------
// Region geometry
// ---------------------------------------------------------------------------

#[test]
fn corners_normalise_in_any_order() {
    let a = BlockPos::new(5, 1, -2);
    let b = BlockPos::new(-3, 4, 7);
    let r = Cuboid::from_corners(a, b);
    assert_eq!(r, Cuboid::from_corners(b, a));
    assert_eq!(r.min, BlockPos::new(-3, 1, -2));
    assert_eq!(r.max, BlockPos::new(5, 4, 7));
    assert_eq!(r.size(), (9, 4, 10));
}

#[test]
fn strided_iteration_visits_each_cell_once() {
    // Deliberately not a multiple of the stride on either horizontal axis.
    let r = Cuboid::from_corners(BlockPos::new(-5, 0, 3), BlockPos::new(30, 2, 21));
    let cells: Vec<_> = r.iter_strided(16).collect();
    let unique: HashSet<_> = cells.iter().copied().collect();
    assert_eq!(cells.len() as u64, r.volume());
    assert_eq!(unique.len(), cells.len());
    assert!(cells.iter().all(|p| r.contains(*p)));
}

#[test]
fn strided_iteration_groups_by_column() {
    let r = Cuboid::from_corners(BlockPos::new(0, 0, 0), BlockPos::new(31, 0, 0));
    let cells: Vec<_> = r.iter_strided(16).collect();
    // The first 16 cells all belong to the first stride column.
    assert!(cells[..16].iter().all(|p| p.x < 16));
    assert!(cells[16..].iter().all(|p| p.x >= 16));
}

#[test]
fn single_cell_volumes() {
    let p = BlockPos::new(3, 3, 3);
    let r = Cuboid::from_corners(p, p);
    assert_eq!(r.volume(), 1);
    assert_eq!(r.shell_volume(), 1);
    assert_eq!(r.shell().count(), 1);
    assert_eq!(r.ellipsoid(16).collect::<Vec<_>>(), vec![p]);
    assert_eq!(r.ellipsoid_volume(), 1);
}

#[test]
fn shell_matches_shell_volume() {
    let shapes = [
        (BlockPos::new(0, 0, 0), BlockPos::new(2, 2, 2)),
        (BlockPos::new(0, 0, 0), BlockPos::new(9, 4, 6)),
        (BlockPos::new(0, 0, 0), BlockPos::new(5, 0, 5)),
        (BlockPos::new(0, 0, 0), BlockPos::new(0, 7, 0)),
        (BlockPos::new(0, 0, 0), BlockPos::new(1, 1, 1)),
        (BlockPos::new(2, 2, 2), BlockPos::new(3, 9, 2)),
    ];
    for (a, b) in shapes {
        let r = Cuboid::from_corners(a, b);
        let cells: Vec<_> = r.shell().collect();
        let unique: HashSet<_> = cells.iter().copied().collect();
        assert_eq!(cells.len() as u64, r.shell_volume(), "shell of {:?}", r);
        assert_eq!(unique.len(), cells.len(), "duplicate cells in shell of {:?}", r);
        for p in &cells {
            let on_face = p.x == r.min.x
                || p.x == r.max.x
                || p.y == r.min.y
                || p.y == r.max.y
                || p.z == r.min.z
                || p.z == r.max.z;
            assert!(on_face, "{:?} is not on a face of {:?}", p, r);
        }
    }
}

#[test]
fn hollow_3x3x3_skips_only_centre() {
    let r = Cuboid::from_corners(BlockPos::new(0, 0, 0), BlockPos::new(2, 2, 2));
    let cells: HashSet<_> = r.shell().collect();
    assert_eq!(cells.len(), 26);
    assert!(!cells.contains(&BlockPos::new(1, 1, 1)));
}

#[test]
fn ellipsoid_is_symmetric_and_inside_box() {
    let r = Cuboid::from_corners(BlockPos::new(0, 0, 0), BlockPos::new(10, 6, 8));
    let cells: HashSet<_> = r.ellipsoid(16).collect();
    assert!(!cells.is_empty());
    for p in &cells {
        assert!(r.contains(*p));
        let mirrored = BlockPos::new(r.max.x - (p.x - r.min.x), p.y, p.z);
        assert!(cells.contains(&mirrored), "{:?} has no mirror", p);
    }
    // The centre is always inside, the corners never are.
    assert!(cells.contains(&BlockPos::new(5, 3, 4)));
    assert!(!cells.contains(&r.min));
    assert!(!cells.contains(&r.max));
}

#[test]
fn extreme_corners_do_not_overflow() {
    let r = Cuboid::from_corners(BlockPos::new(i32::MIN, 0, 0), BlockPos::new(i32::MAX, 0, 0));
    let (rx, ry, rz) = r.ellipsoid_radii();
    assert!(rx > 2.0e9, "{}", rx);
    assert_eq!((ry, rz), (0.25, 0.25));
    assert!(r.ellipsoid_volume() > 0);

    let edge = BlockPos::new(i32::MAX, i32::MIN, 0);
    assert_eq!(edge.offset(1, 0, 0).x, i32::MAX);
    assert_eq!(edge.below().y, i32::MIN);
}

#[test]
fn full_range_span_counts_without_wrapping() {
    let r = Cuboid::from_corners(BlockPos::new(i32::MIN, 0, 0), BlockPos::new(i32::MAX, 0, 0));
    assert_eq!(r.volume(), 1u64 << 32);
    assert_eq!(r.shell_volume(), 1u64 << 32);
    assert_eq!(r.size().0, u32::MAX);
}
