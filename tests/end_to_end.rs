//! File-level runs: generate, aggregate, write, verify.

use std::fs::{self, File};
use std::io::{BufWriter, Write};

use groupstat::generate::{generate, GenerateOptions};
use groupstat::verify::{verify_files, DEFAULT_TOLERANCE};
use groupstat::{aggregate_file, write_summaries, Error, Format, MalformedPolicy, Options, Separator};

#[test]
fn aggregate_file_writes_sorted_summaries() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("measurements.txt");
    fs::write(&input, "Paris;10.0\nParis;20.0\nLondon;5.5\nX;-5.0\nX;3.0\nX;0.0\nBerlin;notanumber\n").unwrap();

    let (table, report) = aggregate_file(&input, Options::default()).unwrap();
    assert_eq!(report.lines, 7);
    assert_eq!(report.skipped, 1);

    let mut out = Vec::new();
    write_summaries(&mut out, table.finalize_sorted(), &Format::default()).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "London;5.500000;5.500000;5.500000\n\
         Paris;15.000000;10.000000;20.000000\n\
         X;-0.666667;-5.000000;3.000000\n"
    );
}

#[test]
fn empty_file_yields_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty.txt");
    File::create(&input).unwrap();

    let (table, report) = aggregate_file(&input, Options::default()).unwrap();
    assert!(table.is_empty());
    assert_eq!(table.finalize().count(), 0);
    assert_eq!(report.lines, 0);
}

#[test]
fn missing_file_is_an_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("nope.txt");
    let err = aggregate_file(&input, Options::default()).unwrap_err();
    assert!(matches!(err, Error::Open { ref path, .. } if path == &input));
}

#[test]
fn abort_policy_stops_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("bad.txt");
    fs::write(&input, "a;1\nb\n").unwrap();

    let options = Options { policy: MalformedPolicy::Abort, ..Options::default() };
    let err = aggregate_file(&input, options).unwrap_err();
    assert!(matches!(err, Error::Malformed { line_no: 2, .. }));
    assert!(err.to_string().contains("line 2"));
}

#[test]
fn generated_samples_verify_against_truth() {
    let dir = tempfile::tempdir().unwrap();
    let samples = dir.path().join("test_sample.txt");
    let truth = dir.path().join("test_sample_results_truth.txt");
    let calculated = dir.path().join("test_sample_results_calculated.txt");

    let options = GenerateOptions { cities: 12, measurements: 2_000, ..GenerateOptions::default() };
    {
        let mut samples_out = BufWriter::new(File::create(&samples).unwrap());
        let mut truth_out = BufWriter::new(File::create(&truth).unwrap());
        generate(&mut samples_out, &mut truth_out, &options).unwrap();
        truth_out.flush().unwrap();
    }

    let (table, report) = aggregate_file(&samples, Options::default()).unwrap();
    assert_eq!(report.accepted, 24_000);
    assert_eq!(table.len(), 12);

    let mut out = BufWriter::new(File::create(&calculated).unwrap());
    write_summaries(&mut out, table.finalize(), &Format::default()).unwrap();
    drop(out);

    let report = verify_files(&truth, &calculated, &Separator::default(), DEFAULT_TOLERANCE).unwrap();
    assert_eq!(report.checked, 12);
    assert!(report.is_success(), "{:?}", report.failures);
}

#[test]
fn verify_flags_a_tampered_result() {
    let dir = tempfile::tempdir().unwrap();
    let truth = dir.path().join("truth.txt");
    let calculated = dir.path().join("calculated.txt");
    fs::write(&truth, "Paris;15.0;10.0;20.0\nLondon;5.5;5.5;5.5\n").unwrap();
    fs::write(&calculated, "Paris;15.0;10.0;20.0\nLondon;5.6;5.5;5.5\n").unwrap();

    let report = verify_files(&truth, &calculated, &Separator::default(), DEFAULT_TOLERANCE).unwrap();
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].key(), "London");
}
