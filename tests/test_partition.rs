// tests/test_partition.rs -- Row partitioning properties.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use sobel_mt::partition::{partition, RowRange};

fn check_cover(height: usize, workers: usize) {
    let ranges = partition(height, workers);
    assert_eq!(ranges.len(), workers);
    assert_eq!(ranges[0].start, 0);
    assert_eq!(ranges[workers - 1].end, height);
    for pair in ranges.windows(2) {
        // Ordered and contiguous, hence disjoint.
        assert_eq!(pair[0].end, pair[1].start, "{height} rows / {workers}");
    }
    let total: usize = ranges.iter().map(RowRange::len).sum();
    assert_eq!(total, height);

    // Balanced: lengths differ by at most one, longer ranges first.
    let lens: Vec<usize> = ranges.iter().map(RowRange::len).collect();
    assert!(lens.windows(2).all(|p| p[0] >= p[1]));
    assert!(lens[0] - lens[workers - 1] <= 1);
}

#[test]
fn ranges_cover_height_exactly() {
    for height in 1..=64 {
        for workers in 1..=8 {
            check_cover(height, workers);
        }
    }
}

#[test]
fn random_shapes_cover_height_exactly() {
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..200 {
        let height = rng.random_range(1..5000);
        let workers = rng.random_range(1..17);
        check_cover(height, workers);
    }
}

#[test]
fn every_row_belongs_to_exactly_one_range() {
    let ranges = partition(37, 5);
    for y in 0..37 {
        let owners = ranges.iter().filter(|r| r.contains(y)).count();
        assert_eq!(owners, 1, "row {y}");
    }
}

#[test]
fn interior_rows_of_all_ranges_are_one_to_height_minus_one() {
    let height = 29;
    let interior: Vec<usize> = partition(height, 4)
        .into_iter()
        .flat_map(|r| r.interior(height))
        .collect();
    assert_eq!(interior, (1..height - 1).collect::<Vec<_>>());
}

#[test]
fn vga_split_matches_two_halves() {
    assert_eq!(
        partition(480, 2),
        vec![RowRange::new(0, 240), RowRange::new(240, 480)]
    );
}
