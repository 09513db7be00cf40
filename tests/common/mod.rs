//! Shared fixtures for integration tests

use std::io::Write;
use std::path::{Path, PathBuf};

/// Write a JSONL sample file into `dir` and return its path
pub fn write_samples(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).expect("create fixture file");
    for line in lines {
        writeln!(file, "{line}").expect("write fixture line");
    }
    path
}

/// One JSONL sample line for the default meter
pub fn sample_line(timestamp: &str, power_kw: f64) -> String {
    format!(r#"{{"timestamp": "{timestamp}", "power_kw": {power_kw}}}"#)
}

/// One JSONL sample line with an explicit meter
pub fn meter_sample_line(timestamp: &str, power_kw: f64, meter: &str) -> String {
    format!(r#"{{"timestamp": "{timestamp}", "power_kw": {power_kw}, "meter": "{meter}"}}"#)
}
