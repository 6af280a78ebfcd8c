//! Concrete end-to-end scenarios run through the software machine

use vxsort_gen::{generate, Direction, ElementType, GeneratorConfig, Machine};

#[test]
fn test_single_vector_ascending() {
    let family = generate(ElementType::I32, &GeneratorConfig::default()).unwrap();
    let machine = Machine::new(&family);

    let mut values = [5, 3, 8, 1, 9, 2, 7, 4];
    machine.sort_vectors(1, Direction::Ascending, &mut values).unwrap();
    assert_eq!(values, [1, 2, 3, 4, 5, 7, 8, 9]);
}

#[test]
fn test_two_vectors_reversed_input() {
    let family = generate(ElementType::I32, &GeneratorConfig::default()).unwrap();
    let machine = Machine::new(&family);

    let mut values: Vec<i32> = (1..=16).rev().collect();
    machine.sort_vectors(2, Direction::Ascending, &mut values).unwrap();
    assert_eq!(values, (1..=16).collect::<Vec<i32>>());
}

#[test]
fn test_length_eleven_leaves_tail_untouched() {
    let family = generate(ElementType::I32, &GeneratorConfig::default()).unwrap();
    let machine = Machine::new(&family);

    let mut memory = [40, 7, -3, 12, 99, 0, 5, 5, -80, 21, 6, 111, 222, 333, 444, 555];
    let tail = memory[11..].to_vec();
    machine.dispatch(&mut memory, 11).unwrap();

    assert_eq!(&memory[..11], &[-80, -3, 0, 5, 5, 6, 7, 12, 21, 40, 99]);
    assert_eq!(&memory[11..], &tail[..]);
}

#[test]
fn test_length_eleven_in_exact_buffer() {
    let family = generate(ElementType::I32, &GeneratorConfig::default()).unwrap();
    let machine = Machine::new(&family);

    let mut memory = [11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1];
    machine.sort(&mut memory).unwrap();
    assert_eq!(memory, [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
}

#[test]
fn test_descending_layout_of_three_vectors() {
    let family = generate(ElementType::U32, &GeneratorConfig::default()).unwrap();
    let machine = Machine::new(&family);

    let mut values: Vec<u32> = (0..24).map(|i| (i * 7) % 24).collect();
    machine.sort_vectors(3, Direction::Descending, &mut values).unwrap();
    // blocks ascending across vectors, lanes descending within each
    let expected: Vec<u32> = (0..3u32)
        .flat_map(|v| (0..8u32).rev().map(move |l| v * 8 + l))
        .collect();
    assert_eq!(values, expected);
}

#[test]
fn test_sorted_input_is_idempotent() {
    let family = generate(ElementType::F64, &GeneratorConfig::default()).unwrap();
    let machine = Machine::new(&family);

    let sorted: Vec<f64> = (0..40).map(|i| i as f64 * 0.25 - 3.0).collect();
    let mut values = sorted.clone();
    machine.sort_vectors(10, Direction::Ascending, &mut values).unwrap();
    assert_eq!(values, sorted);
    machine.sort_vectors(10, Direction::Ascending, &mut values).unwrap();
    assert_eq!(values, sorted);
}

/// Descending layout of `values` over vectors of `lanes`
fn descending_layout<T: Copy>(values: &[T], lanes: usize) -> Vec<T> {
    values
        .chunks(lanes)
        .flat_map(|chunk| chunk.iter().rev().copied())
        .collect()
}

#[test]
fn test_descending_layout_is_idempotent() {
    let family = generate(ElementType::I64, &GeneratorConfig::default()).unwrap();
    let machine = Machine::new(&family);
    let ascending: Vec<i64> = (0..28).map(|i| i * 1_000_003 - 9_000_000).collect();
    let layout = descending_layout(&ascending, 4);
    let mut values = layout.clone();
    machine.sort_vectors(7, Direction::Descending, &mut values).unwrap();
    assert_eq!(values, layout);
    machine.sort_vectors(7, Direction::Descending, &mut values).unwrap();
    assert_eq!(values, layout);

    let family = generate(ElementType::F32, &GeneratorConfig::default()).unwrap();
    let machine = Machine::new(&family);
    let ascending: Vec<f32> = (0..40).map(|i| i as f32 * 1.5 - 20.0).collect();
    let layout = descending_layout(&ascending, 8);
    let mut values = layout.clone();
    machine.sort_vectors(5, Direction::Descending, &mut values).unwrap();
    assert_eq!(values, layout);
    machine.sort_vectors(5, Direction::Descending, &mut values).unwrap();
    assert_eq!(values, layout);
}

#[test]
fn test_float_extremes() {
    let family = generate(ElementType::F32, &GeneratorConfig::default()).unwrap();
    let machine = Machine::new(&family);

    let mut memory = [
        f32::INFINITY,
        1.5,
        f32::MIN,
        f32::NEG_INFINITY,
        0.0,
        f32::MAX,
        -2.0,
        f32::MIN_POSITIVE,
        7.0,
    ];
    machine.sort(&mut memory).unwrap();
    assert_eq!(
        memory,
        [
            f32::NEG_INFINITY,
            f32::MIN,
            -2.0,
            0.0,
            f32::MIN_POSITIVE,
            1.5,
            7.0,
            f32::MAX,
            f32::INFINITY,
        ]
    );
}
