use std::path::{Path, PathBuf};

use super::*;
use crate::catalog::{
    CatalogEntry, CatalogError, CatalogStore, DiskCatalog, LOAD_CLASS, MERGE_CLASS, SORT_CLASS,
};
use crate::testing::{
    CatalogCall, MemoryCatalog, catalog_id, disk, header_at, init_tracing, spectrum,
    write_spectrum,
};
use crate::uvdata::{SortKey, UvData, read_header, read_uv_fits};

const REST_FREQUENCY: f64 = 1.665e9;

fn input_path(i: usize) -> PathBuf {
    PathBuf::from(format!("obs/W3OH_feed{i}.fits"))
}

/// Two records per input, the later one first so sorting has work to do.
fn input_rows(i: usize) -> Vec<(f64, f64)> {
    let t = i as f64;
    vec![(t + 0.75, 258.0), (t + 0.25, 259.0)]
}

/// Model catalog with one registered input per frequency.
fn model(frequencies: &[f64]) -> (MemoryCatalog, Vec<PathBuf>) {
    init_tracing();
    let mut catalog = MemoryCatalog::new();
    let mut paths = Vec::new();
    for (i, &frequency) in frequencies.iter().enumerate() {
        let path = input_path(i);
        catalog = catalog.with_file(&path, spectrum("W3OH", frequency, &input_rows(i)));
        paths.push(path);
    }
    (catalog, paths)
}

fn session(paths: &[PathBuf]) -> CombinationSession {
    CombinationSession::new(catalog_id(1024), paths, CombineConfig::default())
}

fn raw(sequence: u32) -> CatalogEntry {
    CatalogEntry::new("W3OH", LOAD_CLASS, sequence, DEFAULT_WORKING_DISK)
}

fn combined(sequence: u32) -> CatalogEntry {
    CatalogEntry::new("W3OH", MERGE_CLASS, sequence, DEFAULT_WORKING_DISK)
}

fn times(data: &UvData) -> Vec<f64> {
    (0..data.row_count()).map(|i| data.time(i)).collect()
}

#[test]
fn single_input_is_sorted_and_exported_without_merging() {
    let (mut catalog, paths) = model(&[REST_FREQUENCY]);

    let result = session(&paths).run(&mut catalog).unwrap();

    assert_eq!(result.accepted_count, 1);
    assert!(result.rejected.is_empty());
    assert_eq!(catalog.merges(), 0);
    assert_eq!(catalog.sorts(), 1);
    assert_eq!(catalog.exports(), 1);
    assert_eq!(result.output_path, PathBuf::from("obs/W3OH_dbcon.fits"));
    assert_eq!(catalog.zaps(), vec![(raw(1), 0)]);
    assert_eq!(catalog.entry_count(catalog_id(1024)), 1);
    assert_eq!(result.output_entry.class_tag, SORT_CLASS);

    let exported = catalog.exported(&result.output_path).unwrap();
    assert_eq!(times(&exported), vec![0.25, 0.75]);
}

#[test]
fn three_inputs_fold_into_one_entry() {
    let (mut catalog, paths) = model(&[REST_FREQUENCY; 3]);

    let result = session(&paths).run(&mut catalog).unwrap();

    assert_eq!(result.accepted_count, 3);
    assert_eq!(
        catalog.calls(),
        vec![
            CatalogCall::Clear,
            CatalogCall::Load(paths[0].clone()),
            CatalogCall::Load(paths[1].clone()),
            CatalogCall::Load(paths[2].clone()),
            CatalogCall::Merge {
                first: raw(1),
                second: raw(2),
                sequence: 1,
            },
            CatalogCall::Merge {
                first: combined(1),
                second: raw(3),
                sequence: 2,
            },
            CatalogCall::Zap {
                entry: combined(1),
                position: 3,
            },
            CatalogCall::Zap {
                entry: raw(3),
                position: 2,
            },
            CatalogCall::Zap {
                entry: raw(2),
                position: 1,
            },
            CatalogCall::Zap {
                entry: raw(1),
                position: 0,
            },
            CatalogCall::Sort(combined(2)),
            CatalogCall::Zap {
                entry: combined(2),
                position: 0,
            },
            CatalogCall::Export(result.output_path.clone()),
        ]
    );

    let exported = catalog.exported(&result.output_path).unwrap();
    assert_eq!(
        times(&exported),
        vec![0.25, 0.75, 1.25, 1.75, 2.25, 2.75]
    );
    assert_eq!(exported.sort_order, Some(SortKey::TimeBaseline));
}

#[test]
fn off_frequency_input_is_dropped() {
    let (mut catalog, paths) = model(&[REST_FREQUENCY, REST_FREQUENCY + 5.0e5, REST_FREQUENCY]);

    let result = session(&paths).run(&mut catalog).unwrap();

    assert_eq!(result.accepted_count, 2);
    assert_eq!(result.rejected, vec![paths[1].clone()]);
    assert_eq!(result.reference_frequency, REST_FREQUENCY);
    assert_eq!(catalog.merges(), 1);
    assert_eq!(catalog.sorts(), 1);
    assert_eq!(catalog.exports(), 1);

    // The rejected load is zapped straight away, so the third input reuses
    // its sequence number.
    assert_eq!(
        catalog.zaps(),
        vec![
            (raw(2), 1),
            (raw(2), 1),
            (raw(1), 0),
            (combined(1), 0),
        ]
    );
    let exported = catalog.exported(&result.output_path).unwrap();
    assert_eq!(times(&exported), vec![0.25, 0.75, 2.25, 2.75]);
}

#[test]
fn no_inputs_is_an_error() {
    let (mut catalog, _) = model(&[]);

    let err = session(&[]).run(&mut catalog).unwrap_err();

    assert!(matches!(
        err,
        CombineError::NoInput {
            loaded: 0,
            rejected: 0
        }
    ));
    assert_eq!(catalog.sorts(), 0);
    assert_eq!(catalog.exports(), 0);
    assert_eq!(catalog.calls(), vec![CatalogCall::Clear]);
}

#[test]
fn merger_rejects_empty_input() {
    let mut catalog = MemoryCatalog::new();
    let err = merge_accepted(&mut catalog, catalog_id(1), &[], disk(2)).unwrap_err();
    assert!(matches!(err, CombineError::NoInput { .. }));
}

#[test]
fn load_failure_stops_the_session() {
    let (mut catalog, mut paths) = model(&[REST_FREQUENCY]);
    paths.push(PathBuf::from("obs/missing.fits"));

    let err = session(&paths).run(&mut catalog).unwrap_err();

    assert!(matches!(
        err,
        CombineError::Catalog(CatalogError::Load { .. })
    ));
    assert_eq!(catalog.merges(), 0);
}

#[test]
fn incompatible_records_fail_the_merge() {
    init_tracing();
    let narrow = UvData::new("W3OH", header_at(REST_FREQUENCY), 1, vec![0.5, 258.0, 1.0]);
    let mut catalog = MemoryCatalog::new()
        .with_file(input_path(0), spectrum("W3OH", REST_FREQUENCY, &input_rows(0)))
        .with_file(input_path(1), narrow);

    let err = session(&[input_path(0), input_path(1)])
        .run(&mut catalog)
        .unwrap_err();

    assert!(matches!(
        err,
        CombineError::Catalog(CatalogError::Engine {
            operation: "merge",
            ..
        })
    ));
    assert_eq!(catalog.exports(), 0);
}

#[test]
fn every_fold_leaves_exactly_one_entry() {
    for n in 2..=6 {
        let (mut catalog, paths) = model(&vec![REST_FREQUENCY; n]);

        session(&paths).run(&mut catalog).unwrap();

        let zaps = catalog.zaps();
        let raw_zaps: Vec<usize> = zaps
            .iter()
            .filter(|(entry, _)| entry.class_tag == LOAD_CLASS)
            .map(|&(_, position)| position)
            .collect();
        let merge_zaps = zaps
            .iter()
            .filter(|(entry, _)| entry.class_tag == MERGE_CLASS)
            .count();

        assert_eq!(raw_zaps.len(), n, "raw zaps for {n} inputs");
        // Intermediate results plus the final merged entry after sorting.
        assert_eq!(merge_zaps, n - 2 + 1, "merge zaps for {n} inputs");
        assert!(
            raw_zaps.windows(2).all(|w| w[0] > w[1]),
            "raw zaps out of order for {n} inputs: {raw_zaps:?}"
        );
        assert_eq!(catalog.merges(), n - 1);
        assert_eq!(catalog.entry_count(catalog_id(1024)), 1);
    }
}

#[test]
fn positional_zaps_must_run_newest_first() {
    let id = catalog_id(1);
    let working = disk(2);
    let load_three = || {
        let (mut catalog, paths) = model(&[REST_FREQUENCY; 3]);
        let entries: Vec<_> = paths
            .iter()
            .map(|path| catalog.load(id, path, working).unwrap())
            .collect();
        (catalog, entries)
    };

    // Newest first: every position still names the entry it named at load time.
    let (mut catalog, entries) = load_three();
    for position in (0..3).rev() {
        let entry = catalog.entry_at(id, working, position).unwrap();
        assert_eq!(entry, entries[position as usize]);
        catalog.zap(id, &entry).unwrap();
    }
    assert!(catalog.entries(id, working).unwrap().is_empty());

    // Oldest first: removing position 0 shifts the rest down.
    let (mut catalog, entries) = load_three();
    let entry = catalog.entry_at(id, working, 0).unwrap();
    catalog.zap(id, &entry).unwrap();
    assert_eq!(catalog.entry_at(id, working, 1).unwrap(), entries[2]);
    assert!(matches!(
        catalog.entry_at(id, working, 2),
        Err(CatalogError::NotFound { len: 2, .. })
    ));
}

#[test]
fn existing_output_is_removed_first() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("W3OH_feed0.fits");
    let destination = dir.path().join("W3OH_dbcon.fits");
    std::fs::write(&destination, b"stale output").unwrap();
    let mut catalog = MemoryCatalog::new().with_file(
        &input,
        spectrum("W3OH", REST_FREQUENCY, &input_rows(0)),
    );

    let result = session(&[input]).run(&mut catalog).unwrap();

    assert_eq!(result.output_path, destination);
    // The model store keeps exports in memory, so the old file must be gone.
    assert!(!destination.exists());
    assert!(catalog.exported(&destination).is_some());
}

#[test]
fn export_failure_is_reported_with_destination() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("W3OH_feed0.fits");
    write_spectrum(dir.path(), "W3OH_feed0.fits", "W3OH", REST_FREQUENCY, &input_rows(0));
    let mut config = CombineConfig::default();
    config.output_suffix = "_dbcon/nested".to_string();
    let mut catalog = disk_catalog(dir.path());

    let err = CombinationSession::new(catalog_id(3), [&input], config)
        .run(&mut catalog)
        .unwrap_err();

    assert!(matches!(
        err,
        CombineError::Export { ref path, .. } if path.ends_with("W3OH_dbcon/nested.fits")
    ));
}

fn disk_catalog(root: &Path) -> DiskCatalog {
    DiskCatalog::new(vec![root.join("DA01"), root.join("DA02")])
}

#[test]
fn disk_catalog_session_round_trip() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let paths: Vec<PathBuf> = (0..3)
        .map(|i| {
            write_spectrum(
                dir.path(),
                &format!("W3OH_12_20_feed{i}.fits"),
                "W3OH",
                REST_FREQUENCY,
                &input_rows(i),
            )
        })
        .collect();
    let destination = dir.path().join("W3OH_12_20_dbcon.fits");
    std::fs::write(&destination, b"stale output").unwrap();
    let mut catalog = disk_catalog(dir.path());
    let id = catalog_id(1024);

    let result = CombinationSession::new(id, &paths, CombineConfig::default())
        .run(&mut catalog)
        .unwrap();

    assert_eq!(result.output_path, destination);
    let exported = read_uv_fits(&destination).unwrap();
    assert_eq!(exported.row_count(), 6);
    assert_eq!(
        times(&exported),
        vec![0.25, 0.75, 1.25, 1.75, 2.25, 2.75]
    );

    let (_, header) = read_header(&destination).unwrap();
    assert_eq!(ImagingParameters::from_header(&header), result.parameters);

    assert_eq!(
        catalog.entries(id, DEFAULT_WORKING_DISK).unwrap(),
        vec![result.output_entry.clone()]
    );
    assert!(catalog.entries(id, disk(1)).unwrap().is_empty());

    // A second run starts from a cleared catalog.
    let again = CombinationSession::new(id, &paths, CombineConfig::default())
        .run(&mut catalog)
        .unwrap();
    assert_eq!(again.output_entry, result.output_entry);
}
