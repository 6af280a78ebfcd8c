//! Configuration for network generation and verification

use crate::error::{GenError, Result};

/// The instruction set generated routines target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetIsa {
    /// Intel/AMD x86_64 with AVX2 (256-bit registers)
    Avx2,
}

impl TargetIsa {
    /// Get the vector register width in bytes for this ISA
    pub fn vector_width_bytes(&self) -> usize {
        match self {
            TargetIsa::Avx2 => 32, // 256 bits
        }
    }

    /// Feature name used in `#[target_feature(enable = ...)]`
    pub fn target_feature(&self) -> &'static str {
        match self {
            TargetIsa::Avx2 => "avx2",
        }
    }

    /// Prefix of the per-type module in emitted source
    pub fn module_prefix(&self) -> &'static str {
        match self {
            TargetIsa::Avx2 => "avx2",
        }
    }

    /// Whether the running CPU can execute routines generated for this ISA
    pub fn host_supports(&self) -> bool {
        #[cfg(target_arch = "x86_64")]
        {
            match self {
                TargetIsa::Avx2 => std::is_x86_feature_detected!("avx2"),
            }
        }

        #[cfg(not(target_arch = "x86_64"))]
        {
            false
        }
    }
}

/// Parameters of one generation run
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Target instruction set
    pub isa: TargetIsa,

    /// Largest network width (in vectors) to generate
    pub max_bitonic_vectors: usize,

    /// Compound routines up to this width get an inline hint
    pub inline_max_vectors: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            isa: TargetIsa::Avx2,
            max_bitonic_vectors: 16,
            inline_max_vectors: 8,
        }
    }
}

impl GeneratorConfig {
    /// Create a config generating widths 1..=`max_bitonic_vectors`
    pub fn with_max_vectors(max_bitonic_vectors: usize) -> Self {
        Self {
            max_bitonic_vectors,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        // Two-digit symbols (sort_16v_...) bound the width from above
        if self.max_bitonic_vectors == 0 || self.max_bitonic_vectors > 99 {
            return Err(GenError::WidthOutOfRange {
                width: self.max_bitonic_vectors,
                max: 99,
            });
        }
        Ok(())
    }
}

/// Parameters of a verification sweep
#[derive(Debug, Clone)]
pub struct VerifyConfig {
    /// Random inputs per length, on top of the fixed patterns
    pub trials: usize,
    /// Seed for the random inputs
    pub seed: u64,
    /// Number of worker threads
    pub threads: usize,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            trials: 4,
            seed: 0x5EED,
            threads: num_cpus::get(), // Use all available cores
        }
    }
}
