#![doc = include_str!("../README.md")]

use clap::Parser;
use cpu_time::ProcessTime;
use groupby::stats::GroupStatsPrinter;
use groupby::{group_with_stats, Aggregate, Column, GroupConf, RowSelection};
use rand::Rng;
use std::hint::black_box;

#[derive(Parser)]
#[command(author, version, about)]
/// Benchmarks the grouping engine against a sort-then-scan baseline.
struct Conf {
    /// Number of rows
    #[arg(short = 'n', long, default_value_t = 1_000_000)]
    rows: usize,

    /// Number of distinct group keys (drawn uniformly)
    #[arg(short = 'g', long, default_value_t = 10_000)]
    groups: i64,

    /// Number of timed runs
    #[arg(short = 'r', long, default_value_t = 5)]
    runs: u32,

    /// Force 128-bit hashing (disable the integer bijection)
    #[arg(long)]
    force_hash: bool,

    /// Keep the histogram workers off the thread pool
    #[arg(long)]
    st: bool,

    /// Print per-invocation engine stats
    #[arg(short = 'v', long)]
    verbose: bool,
}

/// The baseline: stable-sort row indices by key, then scan for boundaries and
/// per-group sums. Returns `(groups, checksum)` for cross-checking.
fn sort_then_scan(keys: &[i64], values: &[f64]) -> (usize, f64) {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by_key(|&i| keys[i]);
    let mut groups = 0;
    let mut checksum = 0.0;
    let mut run_sum = 0.0;
    for (pos, &row) in order.iter().enumerate() {
        if pos == 0 || keys[row] != keys[order[pos - 1]] {
            groups += 1;
            checksum += run_sum;
            run_sum = 0.0;
        }
        run_sum += values[row];
    }
    checksum += run_sum;
    (groups, checksum)
}

fn engine_run(keys: &[i64], values: &[f64], conf: &GroupConf, verbose: bool) -> (usize, f64) {
    let by = [Column::Int(keys)];
    let index = if verbose {
        group_with_stats(&by, &RowSelection::default(), conf, &mut GroupStatsPrinter::stdout())
    } else {
        group_with_stats(&by, &RowSelection::default(), conf, &mut ())
    }
    .expect("grouping failed");
    let table = index.aggregate(&[values], &[Aggregate::Sum]).expect("aggregation failed");
    (index.group_count(), table.columns[0].iter().sum())
}

fn main() {
    let conf: Conf = Conf::parse();
    let mut rng = rand::rng();
    let keys: Vec<i64> = (0..conf.rows).map(|_| rng.random_range(0..conf.groups.max(1))).collect();
    let values: Vec<f64> = (0..conf.rows).map(|_| rng.random_range(-1.0e3..1.0e3)).collect();

    let engine_conf = GroupConf {
        use_multiple_threads: !conf.st,
        force_hash: conf.force_hash,
    };

    println!(
        "{} rows, {} distinct keys, {} runs{}{}",
        conf.rows,
        conf.groups,
        conf.runs,
        if conf.force_hash { ", forced 128-bit hash" } else { "" },
        if conf.st { ", single-threaded" } else { "" }
    );

    let (engine_groups, engine_checksum) = engine_run(&keys, &values, &engine_conf, conf.verbose);
    let start = ProcessTime::now();
    for _ in 0..conf.runs {
        black_box(engine_run(&keys, &values, &engine_conf, false));
    }
    let engine_seconds = start.elapsed().as_secs_f64() / conf.runs as f64;

    let (baseline_groups, baseline_checksum) = sort_then_scan(&keys, &values);
    let start = ProcessTime::now();
    for _ in 0..conf.runs {
        black_box(sort_then_scan(&keys, &values));
    }
    let baseline_seconds = start.elapsed().as_secs_f64() / conf.runs as f64;

    assert_eq!(engine_groups, baseline_groups);
    assert!((engine_checksum - baseline_checksum).abs() <= 1e-6 * baseline_checksum.abs().max(1.0));

    println!("engine:    {:9.3} ms/run  ({} groups)", engine_seconds * 1e3, engine_groups);
    println!("baseline:  {:9.3} ms/run  (sort then scan)", baseline_seconds * 1e3);
    println!("speedup:   {:9.1}x", baseline_seconds / engine_seconds);
}
