//! Exhaustive length sweep of a generated family
//!
//! Every length the dispatcher accepts is run through the machine against a
//! set of fixed patterns and seeded random inputs, and compared with a
//! reference sort. The buffer extends one register past the input so that
//! any write beyond `length` shows up as a changed tail.

use aligned_vec::AVec;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::config::VerifyConfig;
use crate::error::{GenError, Result};
use crate::machine::{Machine, SortLane};
use crate::network::NetworkFamily;
use crate::types::ElementType;

/// Alignment of verification buffers, one AVX2 register
const BUFFER_ALIGN: usize = 32;

/// Outcome of a successful sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub element: ElementType,
    /// Number of distinct lengths checked
    pub lengths: usize,
    /// Total inputs run through the dispatcher
    pub cases: usize,
}

/// Fixed inputs of `length` elements, followed by `trials` random ones.
/// A zero length has no inputs.
pub fn inputs<T: SortLane>(length: usize, trials: usize, rng: &mut StdRng) -> Vec<Vec<T>> {
    if length == 0 {
        return Vec::new();
    }
    let random: Vec<T> = (0..length).map(|_| T::random(rng)).collect();
    let mut ascending = random.clone();
    ascending.sort_by(T::order);
    let mut descending = ascending.clone();
    descending.reverse();
    let constant = vec![random[0]; length];
    let extremes: Vec<T> = (0..length)
        .map(|i| match i % 3 {
            0 => T::max_value(),
            1 => T::min_value(),
            _ => random[i],
        })
        .collect();

    let mut cases = vec![ascending, descending, constant, extremes];
    cases.extend((0..trials).map(|_| (0..length).map(|_| T::random(rng)).collect()));
    cases
}

/// Runs one input through the dispatcher and compares with the reference sort
pub fn check_case<T: SortLane>(machine: &Machine<'_>, input: &[T], rng: &mut StdRng) -> Result<()> {
    let length = input.len();
    let tail: Vec<T> = (0..machine.family().lanes()).map(|_| T::random(rng)).collect();
    let mut buffer: AVec<T> = AVec::from_iter(
        BUFFER_ALIGN,
        input.iter().copied().chain(tail.iter().copied()),
    );
    machine.dispatch(&mut buffer[..], length)?;

    let mut expected = input.to_vec();
    expected.sort_by(T::order);
    let failed = |detail: String| GenError::VerificationFailed {
        element: T::ELEMENT,
        length,
        detail,
    };
    if let Some(i) = (0..length).find(|&i| !buffer[i].same(&expected[i])) {
        return Err(failed(format!(
            "position {i}: got {:?}, expected {:?} (input {input:?})",
            buffer[i], expected[i]
        )));
    }
    if let Some(i) = (0..tail.len()).find(|&i| buffer[length + i].to_bits() != tail[i].to_bits()) {
        return Err(failed(format!("wrote past the end at offset {}", length + i)));
    }
    Ok(())
}

fn check_length<T: SortLane>(machine: &Machine<'_>, length: usize, config: &VerifyConfig) -> Result<usize> {
    let mut rng = StdRng::seed_from_u64(config.seed ^ (length as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    let cases = inputs::<T>(length, config.trials, &mut rng);

    // an exact-size buffer must never fault
    let mut exact = cases[cases.len() - 1].clone();
    machine.dispatch(&mut exact, length)?;

    for input in &cases {
        check_case(machine, input, &mut rng)?;
    }
    Ok(cases.len())
}

/// Checks every length `1..=max_vectors * lanes` of `family`
pub fn verify_family<T: SortLane>(family: &NetworkFamily, config: &VerifyConfig) -> Result<VerifyReport> {
    if T::ELEMENT != family.element {
        return Err(GenError::ElementMismatch {
            expected: family.element,
            found: T::ELEMENT,
        });
    }
    let machine = Machine::new(family);
    let max_length = family.dispatcher.max_length();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads.max(1))
        .build()?;

    let cases: Vec<usize> = pool.install(|| {
        (1..=max_length)
            .into_par_iter()
            .map(|length| check_length::<T>(&machine, length, config))
            .collect::<Result<Vec<_>>>()
    })?;

    let report = VerifyReport {
        element: family.element,
        lengths: max_length,
        cases: cases.iter().sum(),
    };
    tracing::info!(
        element = %report.element,
        lengths = report.lengths,
        cases = report.cases,
        "family_verified"
    );
    Ok(report)
}

/// [`verify_family`] for a family whose element type is only known at run time
pub fn verify_any(family: &NetworkFamily, config: &VerifyConfig) -> Result<VerifyReport> {
    match family.element {
        ElementType::I32 => verify_family::<i32>(family, config),
        ElementType::U32 => verify_family::<u32>(family, config),
        ElementType::I64 => verify_family::<i64>(family, config),
        ElementType::U64 => verify_family::<u64>(family, config),
        ElementType::F32 => verify_family::<f32>(family, config),
        ElementType::F64 => verify_family::<f64>(family, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::network::generate;

    fn quick() -> VerifyConfig {
        VerifyConfig {
            trials: 2,
            seed: 7,
            threads: 2,
        }
    }

    #[test]
    fn test_verify_small_families() {
        let config = GeneratorConfig::with_max_vectors(3);
        for element in ElementType::ALL {
            let family = generate(element, &config).unwrap();
            let report = verify_any(&family, &quick()).unwrap();
            assert_eq!(report.lengths, 3 * family.lanes());
            assert_eq!(report.cases, report.lengths * 6);
        }
    }

    #[test]
    fn test_verify_rejects_wrong_lane_type() {
        let family = generate(ElementType::I64, &GeneratorConfig::with_max_vectors(1)).unwrap();
        assert!(matches!(
            verify_family::<u64>(&family, &quick()),
            Err(GenError::ElementMismatch { .. })
        ));
    }

    #[test]
    fn test_inputs_include_extremes() {
        let mut rng = StdRng::seed_from_u64(1);
        let cases = inputs::<i32>(5, 1, &mut rng);
        assert_eq!(cases.len(), 5);
        assert!(cases[3].contains(&i32::MAX));
        assert!(cases[3].contains(&i32::MIN));
        assert!(inputs::<f64>(0, 3, &mut rng).is_empty());
    }
}
