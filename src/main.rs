//! `vxsort-gen`: generates, verifies and lists AVX2 bitonic sorting networks.
//!
//! **Usage:**
//! ```text
//! vxsort-gen generate [--types i32,f64] [--out sort_avx2.rs] [--max-vectors 16]
//! vxsort-gen verify [--types u64] [--trials 4] [--seed 24301]
//! vxsort-gen list [--types i32]
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use vxsort_gen::{
    generate_all, render_source, verify_any, ElementType, GeneratorConfig, VerifyConfig,
    WriterSink,
};

#[derive(Parser)]
#[command(name = "vxsort-gen", version, about = "Generate branchless AVX2 bitonic sorting networks")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Generation {
    /// Element types, comma separated
    #[arg(long, value_delimiter = ',', default_value = "i32,u32,i64,u64,f32,f64")]
    types: Vec<ElementType>,

    /// Largest network width in vectors
    #[arg(long, default_value_t = 16)]
    max_vectors: usize,
}

impl Generation {
    fn config(&self) -> GeneratorConfig {
        GeneratorConfig::with_max_vectors(self.max_vectors)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Render the routines as Rust source
    Generate {
        #[command(flatten)]
        generation: Generation,

        /// Output file; stdout when absent
        #[arg(long)]
        out: Option<PathBuf>,

        /// Compound routines up to this width are marked #[inline]
        #[arg(long, default_value_t = 8)]
        inline_max: usize,
    },
    /// Run every dispatcher length through the software machine
    Verify {
        #[command(flatten)]
        generation: Generation,

        /// Random inputs per length
        #[arg(long, default_value_t = 4)]
        trials: usize,

        #[arg(long, default_value_t = 0x5EED)]
        seed: u64,

        /// Worker threads; all cores when absent
        #[arg(long)]
        threads: Option<usize>,
    },
    /// Print every routine symbol in emission order
    List {
        #[command(flatten)]
        generation: Generation,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    vxsort_gen::logging::init_tracing(cli.verbose)
        .context("failed to install tracing subscriber")?;

    match cli.command {
        Command::Generate {
            generation,
            out,
            inline_max,
        } => {
            let config = GeneratorConfig {
                inline_max_vectors: inline_max,
                ..generation.config()
            };
            let families = generate_all(&generation.types, &config)?;
            match out {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("failed to create {}", path.display()))?;
                    let mut sink = WriterSink::new(BufWriter::new(file));
                    render_source(&families, &mut sink)?;
                    sink.into_inner()
                        .flush()
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    let routines: usize = families.iter().map(|f| f.table.len() + 1).sum();
                    eprintln!("Wrote {routines} routines to {}", path.display());
                }
                None => {
                    let mut sink = WriterSink::new(io::stdout().lock());
                    render_source(&families, &mut sink)?;
                }
            }
        }
        Command::Verify {
            generation,
            trials,
            seed,
            threads,
        } => {
            let verify = VerifyConfig {
                trials,
                seed,
                threads: threads.unwrap_or_else(num_cpus::get),
            };
            let families = generate_all(&generation.types, &generation.config())?;
            for family in &families {
                let report = verify_any(family, &verify)
                    .with_context(|| format!("verification of {} failed", family.element))?;
                println!(
                    "{}: {} lengths, {} cases OK",
                    report.element, report.lengths, report.cases
                );
            }
        }
        Command::List { generation } => {
            let families = generate_all(&generation.types, &generation.config())?;
            for family in &families {
                println!("{} ({} lanes):", family.element, family.lanes());
                for symbol in family.symbols() {
                    println!("  {symbol}");
                }
            }
        }
    }
    Ok(())
}
