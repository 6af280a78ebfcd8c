//! Sort and merge routines against the reference layout, for every element
//! type, width and direction

use std::cmp::Ordering;

use rand::rngs::StdRng;
use rand::SeedableRng;
use vxsort_gen::{generate, Direction, GeneratorConfig, Machine, NetworkFamily, SortLane};

/// Ascending runs of `lanes` values per vector, lanes ordered by `direction`
fn reference_layout<T: SortLane>(values: &[T], lanes: usize, direction: Direction) -> Vec<T> {
    let mut sorted = values.to_vec();
    sorted.sort_by(T::order);
    if direction == Direction::Descending {
        for chunk in sorted.chunks_mut(lanes) {
            chunk.reverse();
        }
    }
    sorted
}

fn assert_same<T: SortLane>(got: &[T], expected: &[T], what: &str) {
    assert_eq!(got.len(), expected.len());
    for (i, (g, e)) in got.iter().zip(expected).enumerate() {
        assert!(g.same(e), "{what}: position {i}: got {g:?}, expected {e:?}\n{got:?}");
    }
}

fn random_values<T: SortLane>(n: usize, rng: &mut StdRng) -> Vec<T> {
    (0..n).map(|_| T::random(rng)).collect()
}

fn family_for<T: SortLane>() -> NetworkFamily {
    generate(T::ELEMENT, &GeneratorConfig::default()).unwrap()
}

fn check_sorts<T: SortLane>() {
    let family = family_for::<T>();
    let machine = Machine::new(&family);
    let lanes = family.lanes();
    let mut rng = StdRng::seed_from_u64(0xB170);

    for width in 1..=family.max_vectors() {
        for direction in Direction::ALL {
            for _ in 0..3 {
                let input = random_values::<T>(width * lanes, &mut rng);
                let mut values = input.clone();
                machine.sort_vectors(width, direction, &mut values).unwrap();
                let expected = reference_layout(&input, lanes, direction);
                assert_same(&values, &expected, &format!("{} sort {width} {direction}", T::ELEMENT));
            }
        }
    }
}

fn check_power_of_two_merges<T: SortLane>() {
    let family = family_for::<T>();
    let machine = Machine::new(&family);
    let lanes = family.lanes();
    let mut rng = StdRng::seed_from_u64(0x3E26);

    for width in [1, 2, 4, 8, 16] {
        let n = width * lanes;
        for direction in Direction::ALL {
            for peak in [0, 1, n / 3, n / 2, n - 1, n] {
                let mut input = random_values::<T>(n, &mut rng);
                input[..peak].sort_by(T::order);
                input[peak..].sort_by(|a, b| b.order(a));
                let mut valley = input.clone();
                valley.reverse();

                for bitonic in [input, valley] {
                    let mut values = bitonic.clone();
                    machine.merge_vectors(width, direction, &mut values).unwrap();
                    let expected = reference_layout(&bitonic, lanes, direction);
                    assert_same(
                        &values,
                        &expected,
                        &format!("{} merge {width} {direction} peak {peak}", T::ELEMENT),
                    );
                }
            }
        }
    }
}

fn lane_max<T: SortLane>(a: T, b: T) -> T {
    match a.order(&b) {
        Ordering::Greater => a,
        _ => b,
    }
}

/// The upper half left by flipping a sorted run against an oppositely sorted one
fn flipped_upper_half<T: SortLane>(
    width: usize,
    lanes: usize,
    direction: Direction,
    rng: &mut StdRng,
) -> Vec<T> {
    let first = width.next_power_of_two();
    let a = reference_layout(&random_values::<T>(first * lanes, rng), lanes, direction);
    let b = reference_layout(&random_values::<T>(width * lanes, rng), lanes, direction.reversed());
    let mut upper = b;
    for r in 0..width {
        let mirror = first - 1 - r;
        for lane in 0..lanes {
            let i = r * lanes + lane;
            upper[i] = lane_max(a[mirror * lanes + lane], upper[i]);
        }
    }
    upper
}

fn check_flip_merges<T: SortLane>() {
    let family = family_for::<T>();
    let machine = Machine::new(&family);
    let lanes = family.lanes();
    let mut rng = StdRng::seed_from_u64(0xF11B);

    for width in 1..=family.max_vectors() {
        for direction in Direction::ALL {
            for _ in 0..3 {
                let input = flipped_upper_half::<T>(width, lanes, direction, &mut rng);
                let mut values = input.clone();
                machine.merge_vectors(width, direction, &mut values).unwrap();
                let expected = reference_layout(&input, lanes, direction);
                assert_same(&values, &expected, &format!("{} flip merge {width} {direction}", T::ELEMENT));
            }
        }
    }
}

macro_rules! property_tests {
    ($($name:ident: $ty:ty),* $(,)?) => {
        mod sorts {
            use super::*;
            $(#[test] fn $name() { check_sorts::<$ty>(); })*
        }
        mod power_of_two_merges {
            use super::*;
            $(#[test] fn $name() { check_power_of_two_merges::<$ty>(); })*
        }
        mod flip_merges {
            use super::*;
            $(#[test] fn $name() { check_flip_merges::<$ty>(); })*
        }
    };
}

property_tests! {
    i32_lanes: i32,
    u32_lanes: u32,
    i64_lanes: i64,
    u64_lanes: u64,
    f32_lanes: f32,
    f64_lanes: f64,
}
