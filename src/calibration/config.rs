//! Config documents: TOML files made of `[section]` tables holding
//! `key = value` options.
//!
//! Hand-written calibration files mix quoted and bare numbers, so every numeric
//! accessor accepts either a TOML number or a string that parses as one.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use toml::{Table, Value};

use crate::error::RecalibError;

/// Reads and parses a config document.
pub fn load_config(path: &Path) -> Result<Table> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse_config(&text).with_context(|| format!("Failed to parse config file {}", path.display()))
}

pub fn parse_config(text: &str) -> Result<Table> {
    Ok(text.parse::<Table>()?)
}

/// Borrows the table named `name`.
pub fn section<'a>(doc: &'a Table, name: &str) -> Result<&'a Table> {
    doc.get(name)
        .and_then(Value::as_table)
        .ok_or_else(|| RecalibError::MissingSection(name.to_string()).into())
}

/// Options of `section` that belong to one interferometer, i.e. keys of the form
/// `{ifo}_{field}`, returned with the `{ifo}_` prefix removed.
///
/// The `model` field is left out: it selects the model rather than configuring it.
pub fn ifo_options(section: &Table, ifo: &str) -> Table {
    let prefix = format!("{}_", ifo);
    section
        .iter()
        .filter_map(|(key, value)| {
            key.strip_prefix(&prefix)
                .filter(|field| *field != "model")
                .map(|field| (field.to_string(), value.clone()))
        })
        .collect()
}

fn lookup<'a>(section: &'a Table, section_name: &str, key: &str) -> Result<&'a Value> {
    section.get(key).ok_or_else(|| {
        RecalibError::MissingOption {
            section: section_name.to_string(),
            key: key.to_string(),
        }
        .into()
    })
}

fn invalid(key: &str, value: &Value) -> anyhow::Error {
    RecalibError::InvalidOption {
        key: key.to_string(),
        value: value.to_string(),
    }
    .into()
}

pub fn option_str(section: &Table, section_name: &str, key: &str) -> Result<String> {
    match lookup(section, section_name, key)? {
        Value::String(s) => Ok(s.trim().to_string()),
        other => Err(invalid(key, other)),
    }
}

pub fn option_f64(section: &Table, section_name: &str, key: &str) -> Result<f64> {
    let value = lookup(section, section_name, key)?;
    let parsed = match value {
        Value::Float(f) => Some(*f),
        Value::Integer(i) => Some(*i as f64),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|f| f.is_finite())
        .ok_or_else(|| invalid(key, value))
}

pub fn option_usize(section: &Table, section_name: &str, key: &str) -> Result<usize> {
    let value = lookup(section, section_name, key)?;
    let parsed = match value {
        Value::Integer(i) => usize::try_from(*i).ok(),
        Value::String(s) => s.trim().parse::<usize>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| invalid(key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
[calibration]
H1_model = "cubic_spline"
H1_n_points = "5"
H1_minimum_frequency = 10
H1_amplitude_sigma = 0.1
L1_model = "none"
"#;

    #[test]
    fn test_numbers_accepted_quoted_or_bare() {
        let doc = parse_config(DOC).unwrap();
        let calib = section(&doc, "calibration").unwrap();
        assert_eq!(option_usize(calib, "calibration", "H1_n_points").unwrap(), 5);
        assert_eq!(
            option_f64(calib, "calibration", "H1_minimum_frequency").unwrap(),
            10.0
        );
        assert_eq!(
            option_f64(calib, "calibration", "H1_amplitude_sigma").unwrap(),
            0.1
        );
    }

    #[test]
    fn test_ifo_options_strip_label_and_skip_model() {
        let doc = parse_config(DOC).unwrap();
        let calib = section(&doc, "calibration").unwrap();
        let h1 = ifo_options(calib, "H1");
        assert_eq!(h1.len(), 3);
        assert!(h1.contains_key("n_points"));
        assert!(!h1.contains_key("model"));
        assert!(ifo_options(calib, "L1").is_empty());
    }

    #[test]
    fn test_missing_and_invalid_options() {
        let doc = parse_config(DOC).unwrap();
        let calib = section(&doc, "calibration").unwrap();

        let err = option_f64(calib, "calibration", "H1_phase_sigma").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RecalibError>(),
            Some(RecalibError::MissingOption { .. })
        ));

        let err = option_f64(calib, "calibration", "H1_model").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RecalibError>(),
            Some(RecalibError::InvalidOption { .. })
        ));

        assert!(section(&doc, "variable_params").is_err());
    }
}
