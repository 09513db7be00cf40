//! Sample file discovery and JSONL streaming
//!
//! Power samples arrive as JSONL files exported from a measurement source:
//! one object per line with a timestamp, a `power_kw` value (alias `kw`),
//! and an optional `meter` id. Paths may name files or directories;
//! directories are scanned recursively for `*.jsonl`. When no path is given
//! on the command line, `$KAPSTAT_DATA_PATH` is consulted.
//!
//! Malformed lines are the boundary's problem, not the core's: they are
//! logged and skipped, never fatal.
//!
//! # Examples
//!
//! ```no_run
//! use kapstat::data_loader::DataLoader;
//! use futures::StreamExt;
//!
//! # async fn example() -> kapstat::Result<()> {
//! let loader = DataLoader::new(vec!["samples/".into()])?;
//! let samples = loader.load_samples();
//! tokio::pin!(samples);
//! while let Some(result) = samples.next().await {
//!     let sample = result?;
//!     println!("{} {} {:.2} kW", sample.meter, sample.timestamp.inner(), sample.power_kw);
//! }
//! # Ok(())
//! # }
//! ```

use crate::error::{KapstatError, Result};
use crate::types::{PowerSample, RawSampleRecord};
use futures::stream::Stream;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Discovers and streams JSONL sample files
pub struct DataLoader {
    sample_paths: Vec<PathBuf>,
}

impl DataLoader {
    /// Create a loader over the given paths
    ///
    /// Falls back to `$KAPSTAT_DATA_PATH` when `paths` is empty. Paths that
    /// do not exist are dropped with a warning; ending up with none at all
    /// is [`KapstatError::NoSampleData`].
    pub fn new(paths: Vec<PathBuf>) -> Result<Self> {
        let mut candidates = paths;
        if candidates.is_empty()
            && let Ok(env_path) = std::env::var("KAPSTAT_DATA_PATH")
        {
            candidates.push(PathBuf::from(env_path));
        }

        let sample_paths: Vec<PathBuf> = candidates
            .into_iter()
            .filter(|path| {
                if path.exists() {
                    true
                } else {
                    warn!("Ignoring missing path: {}", path.display());
                    false
                }
            })
            .collect();

        if sample_paths.is_empty() {
            return Err(KapstatError::NoSampleData);
        }

        debug!("Using {} sample path(s)", sample_paths.len());
        Ok(Self { sample_paths })
    }

    /// The paths samples are loaded from (files and/or directories)
    pub fn paths(&self) -> &[PathBuf] {
        &self.sample_paths
    }

    /// Resolve the concrete list of JSONL files, sorted for a stable replay order
    pub fn find_jsonl_files(&self) -> Vec<PathBuf> {
        let mut jsonl_files = Vec::new();

        for base_path in &self.sample_paths {
            if base_path.is_file() {
                jsonl_files.push(base_path.clone());
                continue;
            }
            for entry in WalkDir::new(base_path)
                .into_iter()
                .filter_map(|entry| entry.ok())
            {
                let path = entry.path();
                if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("jsonl") {
                    jsonl_files.push(path.to_path_buf());
                }
            }
        }

        jsonl_files.sort();
        debug!("Found {} JSONL file(s)", jsonl_files.len());
        jsonl_files
    }

    /// Stream samples from all files in order
    ///
    /// Files stream line by line; records that fail to parse (bad JSON, bad
    /// timestamp, non-finite power) are skipped with a warning.
    pub fn load_samples(&self) -> impl Stream<Item = Result<PowerSample>> + '_ {
        async_stream::stream! {
            for file_path in self.find_jsonl_files() {
                let samples = Self::parse_jsonl_stream(file_path);
                tokio::pin!(samples);
                while let Some(result) = futures::StreamExt::next(&mut samples).await {
                    yield result;
                }
            }
        }
    }

    /// Parse a single JSONL file as a stream
    fn parse_jsonl_stream(path: PathBuf) -> impl Stream<Item = Result<PowerSample>> {
        async_stream::stream! {
            let file = match tokio::fs::File::open(&path).await {
                Ok(f) => f,
                Err(e) => {
                    yield Err(e.into());
                    return;
                }
            };

            let reader = BufReader::new(file);
            let mut lines = reader.lines();
            let mut line_number = 0;

            while let Ok(Some(line)) = lines.next_line().await {
                line_number += 1;

                if line.trim().is_empty() {
                    continue;
                }

                match serde_json::from_str::<RawSampleRecord>(&line) {
                    Ok(raw) => {
                        if let Some(sample) = PowerSample::from_raw(raw) {
                            yield Ok(sample);
                        } else {
                            warn!(
                                "Skipping invalid sample at line {} in {}",
                                line_number,
                                path.display()
                            );
                        }
                    }
                    Err(e) => {
                        warn!(
                            "Failed to parse line {} in {}: {}",
                            line_number,
                            path.display(),
                            e
                        );
                    }
                }
            }
        }
    }
}
