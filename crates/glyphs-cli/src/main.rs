#![forbid(unsafe_code)]
#![deny(
    rust_2018_idioms,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo
)]

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use glyphs_core::engine::naive::cluster_naive;
use glyphs_core::engine::quadtree_engine::cluster_quadtree;
use glyphs_core::{
    AreaLinearSquares, CancelToken, CircularLinear, EngineParams, GrowFn, LinearSquares,
    LogarithmicSquares,
};

#[derive(Parser, Debug)]
#[command(
    name = "glyphs-cli",
    about = "Cluster growing weighted glyphs into a dendrogram",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Cluster a set of points read from a file into a dendrogram.
    Cluster {
        /// Input points file (.csv, .tsv, or whitespace-delimited .txt)
        #[arg(long)]
        input: PathBuf,

        /// Output dendrogram path (.json or .cbor)
        #[arg(long, default_value = "dendrogram.json")]
        out: PathBuf,

        /// Which engine to run
        #[arg(value_enum, long, default_value_t = AlgorithmOpt::Quadtree)]
        algorithm: AlgorithmOpt,

        /// Which grow function glyphs use
        #[arg(value_enum, long, default_value_t = GrowFnOpt::LinearSquares)]
        grow: GrowFnOpt,

        /// Leaf capacity before a quadtree cell splits
        #[arg(long, default_value_t = 10)]
        max_glyphs_per_cell: usize,

        /// Smallest allowed quadtree cell side
        #[arg(long, default_value_t = 1e-4)]
        min_cell_size: f64,

        /// Wall-clock timeout in seconds; exits with status 124 if exceeded
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Generate a synthetic set of points and write it to a file.
    Simulate {
        /// Number of points to generate
        #[arg(long, default_value_t = 200)]
        count: usize,

        /// Width of the generation area
        #[arg(long, default_value_t = 1000.0)]
        width: f64,

        /// Height of the generation area
        #[arg(long, default_value_t = 1000.0)]
        height: f64,

        /// Random seed
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Arrange points into this many clusters instead of uniformly
        #[arg(long)]
        clusters: Option<usize>,

        /// Output points path (.csv)
        #[arg(long, default_value = "points.csv")]
        out: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum AlgorithmOpt {
    Naive,
    Quadtree,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum GrowFnOpt {
    LinearSquares,
    LogarithmicSquares,
    AreaLinearSquares,
    CircularLinear,
}

impl GrowFnOpt {
    fn as_grow_fn(self) -> Box<dyn GrowFn> {
        match self {
            GrowFnOpt::LinearSquares => Box::new(LinearSquares),
            GrowFnOpt::LogarithmicSquares => Box::new(LogarithmicSquares),
            GrowFnOpt::AreaLinearSquares => Box::new(AreaLinearSquares),
            GrowFnOpt::CircularLinear => Box::new(CircularLinear),
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Cluster {
            input,
            out,
            algorithm,
            grow,
            max_glyphs_per_cell,
            min_cell_size,
            timeout_secs,
        } => cluster(input, out, algorithm, grow, max_glyphs_per_cell, min_cell_size, timeout_secs),
        Cmd::Simulate {
            count,
            width,
            height,
            seed,
            clusters,
            out,
        } => simulate(count, width, height, seed, clusters, out),
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_level(true).compact();

    let _ = tracing_subscriber::registry().with(filter).with(fmt_layer).try_init();
}

#[allow(clippy::too_many_arguments)]
fn cluster(
    input: PathBuf,
    out: PathBuf,
    algorithm: AlgorithmOpt,
    grow: GrowFnOpt,
    max_glyphs_per_cell: usize,
    min_cell_size: f64,
    timeout_secs: Option<u64>,
) -> Result<()> {
    let points = glyphs_io::read_points(&input)
        .with_context(|| format!("reading points from {}", input.display()))?;
    if points.is_empty() {
        bail!("input {} contained no points", input.display());
    }
    info!(count = points.len(), ?algorithm, "clustering");

    let grow_fn = grow.as_grow_fn();
    let params = EngineParams {
        max_glyphs_per_cell,
        min_cell_size,
        ..EngineParams::default()
    };
    let cancel = CancelToken::new();

    let start = Instant::now();
    let (dendrogram, cancelled) = std::thread::scope(|scope| -> Result<_> {
        if let Some(secs) = timeout_secs {
            let cancel = cancel.clone();
            scope.spawn(move || {
                std::thread::sleep(Duration::from_secs(secs));
                cancel.cancel();
            });
        }
        let outcome = scope
            .spawn(|| run_engine(algorithm, &points, grow_fn.as_ref(), &params, &cancel))
            .join()
            .map_err(|_| anyhow::anyhow!("clustering worker thread panicked"))??;
        Ok((outcome.dendrogram, outcome.cancelled))
    })?;
    let elapsed = start.elapsed();

    if cancelled {
        eprintln!("clustering timed out after {:.3} seconds", elapsed.as_secs_f64());
        std::process::exit(124);
    }

    glyphs_io::write_dendrogram(&out, &dendrogram)
        .with_context(|| format!("writing dendrogram to {}", out.display()))?;

    println!("clustering took {:.6} seconds", elapsed.as_secs_f64());
    println!("wrote dendrogram with {} nodes to {}", dendrogram.len(), out.display());
    Ok(())
}

fn run_engine(
    algorithm: AlgorithmOpt,
    points: &[(glyphs_core::Point, u32)],
    grow_fn: &dyn GrowFn,
    params: &EngineParams,
    cancel: &CancelToken,
) -> Result<glyphs_core::ClusterOutcome> {
    match algorithm {
        AlgorithmOpt::Naive => Ok(cluster_naive(points, grow_fn, cancel)),
        AlgorithmOpt::Quadtree => {
            cluster_quadtree(points, grow_fn, params, cancel).context("quadtree engine failed")
        }
    }
}

fn simulate(
    count: usize,
    width: f64,
    height: f64,
    seed: u64,
    clusters: Option<usize>,
    out: PathBuf,
) -> Result<()> {
    let points = match clusters {
        Some(k) => {
            let per_cluster = count / k.max(1);
            glyphs_io::generator::generate_clustered(k, per_cluster, width, height, width / 50.0, seed)
        }
        None => glyphs_io::generator::generate_uniform(count, width, height, 1, 3, seed),
    };

    if let Some(dir) = out.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        }
    }
    let mut writer = csv_like_writer(&out)?;
    for (p, w) in &points {
        use std::io::Write as _;
        writeln!(writer, "{},{},{}", p.x, p.y, w)?;
    }
    println!("wrote {} points to {}", points.len(), out.display());
    Ok(())
}

fn csv_like_writer(path: &PathBuf) -> Result<std::io::BufWriter<std::fs::File>> {
    let f = std::fs::File::create(path).with_context(|| format!("create {}", path.display()))?;
    Ok(std::io::BufWriter::new(f))
}
