use std::{fs, path::Path};

use anyhow::Context;
use trun_core::MemoryStore;
use trun_model::Run;

/// Parse a JSON array of runs.
pub fn parse(raw: &str) -> Result<Vec<Run>, serde_json::Error> {
    serde_json::from_str(raw)
}

/// Load the runs in `path` into `store`; returns how many were created.
pub fn load(path: &Path, store: &MemoryStore) -> anyhow::Result<usize> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file {}", path.display()))?;
    let runs =
        parse(&raw).with_context(|| format!("invalid seed file {}", path.display()))?;

    let count = runs.len();
    for run in runs {
        let key = run.key();
        store
            .create(run)
            .with_context(|| format!("failed to seed run {key}"))?;
    }
    Ok(count)
}
