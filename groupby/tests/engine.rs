use std::collections::BTreeMap;

use groupby::{
    group, group_with_stats, is_missing, Aggregate, Column, GroupConf, RowSelection, MISSING,
};
use rand::Rng;

fn no_selection() -> RowSelection<'static> {
    RowSelection::default()
}

#[test]
fn single_group_sum_mean_sd() {
    let by = [Column::Int(&[1, 1, 1])];
    let values = [2.0, 3.0, 5.0];
    let index = group(&by, &no_selection(), &GroupConf::default()).unwrap();
    assert_eq!(index.group_count(), 1);

    let table = index
        .aggregate(&[&values], &[Aggregate::Sum, Aggregate::Mean, Aggregate::Sd])
        .unwrap();
    assert_eq!(table.columns[0], [10.0]);
    assert_eq!(table.columns[1], [10.0 / 3.0]);
    let mean: f64 = 10.0 / 3.0;
    let sd = (((2.0 - mean).powi(2) + (3.0 - mean).powi(2) + (5.0 - mean).powi(2)) / 2.0).sqrt();
    assert!((table.columns[2][0] - sd).abs() < 1e-12);
}

#[test]
fn median_and_percentiles_of_two() {
    let by = [Column::Int(&[1, 1])];
    let values = [4.0, 6.0];
    let index = group(&by, &no_selection(), &GroupConf::default()).unwrap();
    let table = index
        .aggregate(
            &[&values],
            &[
                Aggregate::Median,
                Aggregate::Pctile(10.0),
                Aggregate::Pctile(90.0),
                Aggregate::Pctile(50.0),
            ],
        )
        .unwrap();
    assert_eq!(table.columns[0], [5.0]);
    assert_eq!(table.columns[1], [4.0]);
    assert_eq!(table.columns[2], [6.0]);
    assert_eq!(table.columns[3], [5.0]);
}

#[test]
fn missing_values_are_skipped() {
    let by = [Column::Int(&[1, 1, 1])];
    let values = [MISSING, 2.0, 4.0];
    let index = group(&by, &no_selection(), &GroupConf::default()).unwrap();
    let table = index
        .aggregate(
            &[&values],
            &[
                Aggregate::Sum,
                Aggregate::Mean,
                Aggregate::Count,
                Aggregate::FirstNm,
                Aggregate::First,
            ],
        )
        .unwrap();
    assert_eq!(table.columns[0], [6.0]);
    assert_eq!(table.columns[1], [3.0]);
    assert_eq!(table.columns[2], [2.0]);
    assert_eq!(table.columns[3], [2.0]);
    assert!(is_missing(table.columns[4][0]));
}

#[test]
fn first_and_last_follow_original_row_order() {
    // group keys deliberately interleaved
    let by = [Column::Int(&[7, 3, 7, 3, 7])];
    let values = [1.0, 10.0, 2.0, 20.0, 3.0];
    let index = group(&by, &no_selection(), &GroupConf::default()).unwrap();
    assert_eq!(index.group_count(), 2);

    let table = index.aggregate(&[&values], &[Aggregate::First, Aggregate::Last]).unwrap();
    // group of key 3 sorts first under the bijection
    assert_eq!(table.columns[0], [10.0, 1.0]);
    assert_eq!(table.columns[1], [20.0, 3.0]);

    // stability: within each group the original row order is preserved
    for j in 0..index.group_count() {
        let rows: Vec<usize> = index.group_rows(j).collect();
        let mut sorted = rows.clone();
        sorted.sort_unstable();
        assert_eq!(rows, sorted);
    }
}

#[test]
fn bijection_and_forced_hash_agree() {
    let x = [0i64, 0, 1, 0];
    let y = [0i64, 1, 0, 0];
    let by = [Column::Int(&x), Column::Int(&y)];
    let values = [1.0, 2.0, 3.0, 4.0];

    let fast = group(&by, &no_selection(), &GroupConf::default()).unwrap();
    let forced = group(&by, &no_selection(), &GroupConf::forced_hash()).unwrap();
    assert!(fast.is_bijection());
    assert!(!forced.is_bijection());
    assert_eq!(fast.group_count(), 3);
    assert_eq!(forced.group_count(), 3);

    // per-row aggregates must be identical even though group order may differ
    for func in [Aggregate::Sum, Aggregate::Count, Aggregate::Mean] {
        assert_eq!(
            fast.broadcast(&values, func).unwrap(),
            forced.broadcast(&values, func).unwrap()
        );
    }
    // both modes induce the same partition of rows
    let fast_labels = fast.labels().unwrap();
    let forced_labels = forced.labels().unwrap();
    for i in 0..4 {
        for k in 0..4 {
            assert_eq!(
                fast_labels[i] == fast_labels[k],
                forced_labels[i] == forced_labels[k]
            );
        }
    }
}

#[test]
fn string_columns_group_by_content() {
    let by = [Column::Str { bytes: b"ababab", width: 2 }, Column::Int(&[1, 1, 1])];
    let values = [5.0, 7.0, 11.0];
    let index = group(&by, &no_selection(), &GroupConf::st()).unwrap();
    assert_eq!(index.group_count(), 1);
    let table = index.aggregate(&[&values], &[Aggregate::Sum]).unwrap();
    assert_eq!(table.columns[0], [23.0]);
}

#[test]
fn selection_mask_and_range_filter_rows() {
    let by = [Column::Int(&[1, 2, 1, 2, 1, 2])];
    let values = [1.0, 10.0, 2.0, 20.0, 4.0, 40.0];
    let mask = [true, true, false, true, true, true];
    let selection = RowSelection { mask: Some(&mask), range: Some(1..6) };
    let index = group(&by, &selection, &GroupConf::default()).unwrap();

    // rows 1, 3, 4, 5 survive: group 1 = {4}, group 2 = {1, 3, 5}
    assert_eq!(index.len(), 4);
    assert_eq!(index.group_count(), 2);
    let table = index.aggregate(&[&values], &[Aggregate::Sum, Aggregate::Count]).unwrap();
    assert_eq!(table.columns[0], [4.0, 70.0]);
    assert_eq!(table.columns[1], [1.0, 3.0]);

    // filtered-out rows broadcast as missing (0 for tags)
    let labels = index.labels().unwrap();
    assert!(is_missing(labels[0]));
    assert!(is_missing(labels[2]));
    assert_eq!(labels[4], 1.0);
    assert_eq!(labels[1], 2.0);
    let tags = index.tags().unwrap();
    assert_eq!(tags, [0.0, 1.0, 0.0, 0.0, 1.0, 0.0]);
}

#[test]
fn broadcast_spreads_group_results() {
    let by = [Column::Int(&[5, 6, 5])];
    let values = [1.0, 9.0, 3.0];
    let index = group(&by, &no_selection(), &GroupConf::default()).unwrap();
    let sums = index.broadcast(&values, Aggregate::Sum).unwrap();
    assert_eq!(sums, [4.0, 9.0, 4.0]);
    let labels = index.broadcast(&values, Aggregate::Group).unwrap();
    assert_eq!(labels, [1.0, 2.0, 1.0]);
    let tags = index.broadcast(&values, Aggregate::Tag).unwrap();
    assert_eq!(tags, [1.0, 1.0, 0.0]);
}

#[test]
fn distinct_and_unique_key() {
    let by = [Column::Int(&[4, 9, 4, 2])];
    let index = group(&by, &no_selection(), &GroupConf::default()).unwrap();
    // first row of each group, groups in sorted key order (bijection)
    assert_eq!(index.distinct().unwrap(), vec![3, 0, 1]);
    assert!(!index.is_unique_key());

    let by = [Column::Int(&[4, 9, 2])];
    let index = group(&by, &no_selection(), &GroupConf::default()).unwrap();
    assert!(index.is_unique_key());
}

#[test]
fn ordered_levels_sort_by_tuple_not_by_hash() {
    let x = [3i64, -1, 3, 7];
    let s = b"bbaabbcc";
    let by = [Column::Int(&x), Column::Str { bytes: s, width: 2 }];
    let index = group(&by, &no_selection(), &GroupConf::forced_hash()).unwrap();
    assert_eq!(index.group_count(), 3);

    let order = index.ordered_levels(&by).unwrap();
    // tuples: (-1, "aa") < (3, "bb") < (7, "cc")
    let keys_in_order: Vec<i64> = order
        .iter()
        .map(|&j| x[index.group_rows(j as usize).next().unwrap()])
        .collect();
    assert_eq!(keys_in_order, vec![-1, 3, 7]);
}

#[test]
fn percent_sums_to_one_hundred() {
    let by = [Column::Int(&[1, 2, 2, 3, 3, 3])];
    let values = [1.0; 6];
    let index = group(&by, &no_selection(), &GroupConf::default()).unwrap();
    let table = index.aggregate(&[&values], &[Aggregate::Percent]).unwrap();
    let total: f64 = table.columns[0].iter().sum();
    assert!((total - 100.0).abs() < 1e-12);
    assert_eq!(table.columns[0], [100.0 / 6.0, 200.0 / 6.0, 300.0 / 6.0]);
}

#[test]
fn sums_and_counts_are_additive_under_splits() {
    let coarse_keys = [1i64, 1, 1, 1, 1, 1];
    let fine_keys = [1i64, 2, 1, 2, 1, 2];
    let values = [1.0, 2.0, 4.0, 8.0, 16.0, 32.0];

    let coarse = group(&[Column::Int(&coarse_keys)], &no_selection(), &GroupConf::default()).unwrap();
    let fine = group(
        &[Column::Int(&coarse_keys), Column::Int(&fine_keys)],
        &no_selection(),
        &GroupConf::default(),
    )
    .unwrap();

    let funcs = [Aggregate::Sum, Aggregate::Count, Aggregate::Mean];
    let coarse_table = coarse.aggregate(&[&values], &funcs).unwrap();
    let fine_table = fine.aggregate(&[&values], &funcs).unwrap();

    let fine_sum: f64 = fine_table.columns[0].iter().sum();
    let fine_count: f64 = fine_table.columns[1].iter().sum();
    assert_eq!(coarse_table.columns[0], [fine_sum]);
    assert_eq!(coarse_table.columns[1], [fine_count]);
    // the coarse mean is the count-weighted combination of the fine means
    let weighted: f64 = fine_table.columns[2]
        .iter()
        .zip(fine_table.columns[1].iter())
        .map(|(m, c)| m * c)
        .sum::<f64>()
        / fine_count;
    assert!((coarse_table.columns[2][0] - weighted).abs() < 1e-12);
}

#[test]
fn collision_count_reaches_the_stats_collector() {
    let by = [Column::Int(&[1, 2, 1])];
    let mut collisions = 0usize;
    let index =
        group_with_stats(&by, &no_selection(), &GroupConf::default(), &mut collisions).unwrap();
    // genuine xxh3 collisions are essentially impossible on 3 rows, and the
    // bijection rules them out entirely
    assert_eq!(collisions, 0);
    assert_eq!(index.collisions(), 0);
}

#[test]
fn group_index_invariants_on_random_input() {
    let mut rng = rand::rng();
    for _ in 0..20 {
        let n: usize = rng.random_range(1..500);
        let x: Vec<i64> = (0..n).map(|_| rng.random_range(-5..5)).collect();
        let y: Vec<i64> = (0..n).map(|_| rng.random_range(0..7)).collect();
        let by = [Column::Int(&x), Column::Int(&y)];
        let conf = if rng.random() { GroupConf::default() } else { GroupConf::forced_hash() };
        let index = group(&by, &no_selection(), &conf).unwrap();

        // info shape: starts at 0, ends at N, strictly increasing
        let info = index.info();
        assert_eq!(info[0], 0);
        assert_eq!(*info.last().unwrap(), n as u64);
        assert!(info.windows(2).all(|w| w[0] < w[1]));

        // J equals the number of distinct by-tuples
        let mut reference: BTreeMap<(i64, i64), Vec<usize>> = BTreeMap::new();
        for i in 0..n {
            reference.entry((x[i], y[i])).or_default().push(i);
        }
        assert_eq!(index.group_count(), reference.len());

        // every group matches the reference partition, in original row order
        for j in 0..index.group_count() {
            let rows: Vec<usize> = index.group_rows(j).collect();
            let key = (x[rows[0]], y[rows[0]]);
            assert_eq!(&rows, reference.get(&key).unwrap());
        }
    }
}

#[test]
fn aggregates_match_reference_on_random_input() {
    let mut rng = rand::rng();
    for _ in 0..10 {
        let n: usize = rng.random_range(1..300);
        let keys: Vec<i64> = (0..n).map(|_| rng.random_range(0..12)).collect();
        let values: Vec<f64> = (0..n)
            .map(|_| if rng.random_range(0..5) == 0 { MISSING } else { rng.random_range(-10.0..10.0) })
            .collect();
        let by = [Column::Int(&keys)];
        let index = group(&by, &no_selection(), &GroupConf::default()).unwrap();

        let table = index
            .aggregate(&[&values], &[Aggregate::Sum, Aggregate::Count, Aggregate::Min, Aggregate::Max])
            .unwrap();

        let mut reference: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
        for i in 0..n {
            reference.entry(keys[i]).or_default().push(values[i]);
        }
        // bijection mode sorts groups by key
        for (j, (_, group_values)) in reference.iter().enumerate() {
            let nonmiss: Vec<f64> =
                group_values.iter().copied().filter(|v| !is_missing(*v)).collect();
            if nonmiss.is_empty() {
                assert!(is_missing(table.columns[0][j]));
                assert_eq!(table.columns[1][j], 0.0);
                assert!(is_missing(table.columns[2][j]));
            } else {
                let sum: f64 = nonmiss.iter().sum();
                assert!((table.columns[0][j] - sum).abs() < 1e-9);
                assert_eq!(table.columns[1][j], nonmiss.len() as f64);
                let min = nonmiss.iter().copied().fold(f64::INFINITY, f64::min);
                let max = nonmiss.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                assert_eq!(table.columns[2][j], min);
                assert_eq!(table.columns[3][j], max);
            }
        }
    }
}

#[test]
fn missing_by_values_form_their_own_group() {
    let floats = [1.0, MISSING, 1.0, MISSING, 2.0];
    let by = [Column::Float(&floats)];
    let values = [1.0, 10.0, 2.0, 20.0, 5.0];
    let index = group(&by, &no_selection(), &GroupConf::default()).unwrap();
    assert_eq!(index.group_count(), 3);

    let sums = index.broadcast(&values, Aggregate::Sum).unwrap();
    assert_eq!(sums, [3.0, 30.0, 3.0, 30.0, 5.0]);
}

#[test]
fn large_wide_keys_go_through_radix_and_stay_correct() {
    let mut rng = rand::rng();
    let n: usize = 20_000;
    let keys: Vec<i64> = (0..n).map(|_| rng.random_range(0..(1i64 << 40))).collect();
    let values: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let by = [Column::Int(&keys)];
    let index = group(&by, &no_selection(), &GroupConf::default()).unwrap();

    let mut reference: BTreeMap<i64, f64> = BTreeMap::new();
    for i in 0..n {
        *reference.entry(keys[i]).or_default() += values[i];
    }
    assert_eq!(index.group_count(), reference.len());
    let table = index.aggregate(&[&values], &[Aggregate::Sum]).unwrap();
    let engine_total: f64 = table.columns[0].iter().sum();
    let reference_total: f64 = reference.values().sum();
    assert!((engine_total - reference_total).abs() < 1e-6);
}
