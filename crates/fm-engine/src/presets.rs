//! Preset persistence: a flat key,value table, one row per parameter.
//!
//! Headerless two-column CSV in canonical key order, the format the
//! renderer-side tooling exchanges. Values are renderer-side (not
//! normalized).

use std::path::Path;

use fm_types::{FmResult, ParameterDomain, PresetError};

/// Writes a preset table. Rows keep the order of `params`.
pub fn write_preset(path: &Path, params: &[(String, f64)]) -> FmResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| PresetError::Csv(e.to_string()))?;
    for (key, value) in params {
        writer
            .write_record([key.as_str(), &value.to_string()])
            .map_err(|e| PresetError::Csv(e.to_string()))?;
    }
    writer
        .flush()
        .map_err(|e| PresetError::Csv(e.to_string()))?;
    Ok(())
}

/// Reads a preset table back as `(key, value)` pairs in file order.
pub fn read_preset(path: &Path) -> FmResult<Vec<(String, f64)>> {
    if !path.exists() {
        return Err(PresetError::NotFound {
            path: path.display().to_string(),
        }
        .into());
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| PresetError::Csv(e.to_string()))?;

    let mut params = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| PresetError::Csv(e.to_string()))?;
        if record.len() < 2 {
            return Err(PresetError::Malformed {
                row,
                message: format!("expected 2 fields, got {}", record.len()),
            }
            .into());
        }
        let key = record[0].to_string();
        let value: f64 = record[1].trim().parse().map_err(|e| PresetError::Malformed {
            row,
            message: format!("bad float {:?}: {e}", &record[1]),
        })?;
        params.push((key, value));
    }
    Ok(params)
}

/// Loads a preset and normalizes it through `domain` into a unit-cube
/// seed vector. Keys missing from the preset or unknown to the domain are
/// configuration errors.
pub fn seed_from_preset(domain: &ParameterDomain, path: &Path) -> FmResult<Vec<f64>> {
    let params = read_preset(path)?;
    Ok(domain.normalize_table(&params)?)
}
