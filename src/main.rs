//! Command-line interface for logsim
//!
//! # Usage Examples
//!
//! ## Generate a synthetic corpus
//! ```bash
//! logsim generate --output data/logs_data_3_000.csv --rows 3000 --seed 42
//! ```
//!
//! ## Sustained-load simulation
//! ```bash
//! logsim simulate \
//!   --postgres "host=localhost user=postgres dbname=logs" \
//!   --table logs_insert_test \
//!   --source data/logs_data_3_000.csv \
//!   --duration-minutes 2 --workers 3 \
//!   --min-batch-size 100 --max-batch-size 1000 \
//!   --min-delay-sec 0.1 --max-delay-sec 5.0 \
//!   --emit-metrics metrics.jsonl
//! ```
//!
//! ## Insert strategy benchmark
//! ```bash
//! logsim bench \
//!   --source data/logs_data_3_000.csv \
//!   --methods single,bulk,batched --batch-size 500 \
//!   --results insertion_results.csv
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use logsim::bench::{BenchConfig, InsertMethod};
use logsim::config::SimulatorConfig;
use logsim::postgres::PostgresConnector;
use logsim::report::save_results;
use logsim::simulator::LoadSimulator;
use logsim::StoreOpts;
use logsim_generator::CsvPopulator;

#[derive(Parser)]
#[command(name = "logsim")]
#[command(about = "A sustained-load log ingestion simulator for PostgreSQL")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sustained-load ingestion simulation
    Simulate {
        /// Target store options
        #[command(flatten)]
        store: StoreOpts,

        /// Log CSV file feeding the producer (reread when exhausted)
        #[arg(long, value_name = "FILE")]
        source: PathBuf,

        /// Total run duration in minutes
        #[arg(long, default_value = "2")]
        duration_minutes: u64,

        /// Smallest produced batch
        #[arg(long, default_value = "100")]
        min_batch_size: usize,

        /// Largest produced batch
        #[arg(long, default_value = "1000")]
        max_batch_size: usize,

        /// Shortest pause between batches, in seconds
        #[arg(long, default_value = "0.1")]
        min_delay_sec: f64,

        /// Longest pause between batches, in seconds
        #[arg(long, default_value = "5.0")]
        max_delay_sec: f64,

        /// Concurrent insert workers
        #[arg(long, default_value = "3")]
        workers: usize,

        /// Batch queue capacity
        #[arg(long, default_value = "10000")]
        max_queue_size: usize,

        /// Pool size (default: workers + 2)
        #[arg(long)]
        pool_size: Option<usize>,

        /// Emit metrics snapshots to this JSONL file during the run
        #[arg(long, value_name = "PATH")]
        emit_metrics: Option<PathBuf>,
    },

    /// Generate a synthetic log corpus CSV
    Generate {
        /// Output CSV path
        #[arg(long, value_name = "FILE")]
        output: PathBuf,

        /// Number of records to generate
        #[arg(long, default_value = "3000")]
        rows: u64,

        /// Generation seed; the same seed reproduces the same corpus
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Benchmark insert strategies against the target table
    Bench {
        /// Target store options
        #[command(flatten)]
        store: StoreOpts,

        /// Log CSV file loaded as the benchmark corpus
        #[arg(long, value_name = "FILE")]
        source: PathBuf,

        /// Insert strategies to measure, in order
        #[arg(long, value_enum, value_delimiter = ',', default_values_t = [InsertMethod::Single, InsertMethod::Bulk, InsertMethod::Batched])]
        methods: Vec<InsertMethod>,

        /// Chunk size for the batched strategy
        #[arg(long, default_value = "500")]
        batch_size: usize,

        /// Write the results table to this CSV file
        #[arg(long, value_name = "FILE")]
        results: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            store,
            source,
            duration_minutes,
            min_batch_size,
            max_batch_size,
            min_delay_sec,
            max_delay_sec,
            workers,
            max_queue_size,
            pool_size,
            emit_metrics,
        } => {
            let mut config = SimulatorConfig::new(source, store.table.clone())
                .with_duration(Duration::from_secs(duration_minutes * 60))
                .with_batch_size_range(min_batch_size, max_batch_size)
                .with_delay_range(
                    Duration::from_secs_f64(min_delay_sec),
                    Duration::from_secs_f64(max_delay_sec),
                )
                .with_workers_count(workers)
                .with_max_queue_size(max_queue_size)
                .with_retry(store.retry_policy());
            if let Some(size) = pool_size {
                config = config.with_pool_size(size);
            }

            let connector = PostgresConnector::new(&store.postgres)
                .context("invalid PostgreSQL connection string")?;
            let simulator = LoadSimulator::new(config, Arc::new(connector)).await?;

            // Ctrl-C flips the running flag; loops drain and exit on their
            // own.
            let stop = simulator.stop_handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("interrupt received");
                    stop.stop();
                }
            });

            let metrics_task = emit_metrics.map(|path| {
                tracing::info!("metrics emission enabled: {}", path.display());
                simulator
                    .metrics()
                    .start_emission_task(path, Duration::from_secs(1))
            });

            let report = simulator.run().await?;

            if let Some(task) = metrics_task {
                task.abort();
            }

            tracing::info!("{}", report.summary());
        }

        Commands::Generate { output, rows, seed } => {
            tracing::info!("generating {rows} log records (seed={seed}) into {output:?}");

            let metrics = CsvPopulator::new(seed)
                .populate(&output, rows)
                .with_context(|| format!("failed to generate corpus at {output:?}"))?;

            tracing::info!(
                "generated {:?}: {} rows, {} bytes in {:?}",
                output,
                metrics.rows_written,
                metrics.file_size_bytes,
                metrics.total_duration
            );
        }

        Commands::Bench {
            store,
            source,
            methods,
            batch_size,
            results,
        } => {
            let connector = PostgresConnector::new(&store.postgres)
                .context("invalid PostgreSQL connection string")?;

            let config = BenchConfig {
                source_path: source,
                target_table: store.table.clone(),
                methods,
                batch_size,
                retry: store.retry_policy(),
            };

            let report = logsim::bench::run_bench(config, Arc::new(connector)).await?;
            tracing::info!("{}", report.summary());

            if let Some(path) = results {
                save_results(&path, &report)?;
                tracing::info!("results saved to {}", path.display());
            }
        }
    }

    Ok(())
}
