//! Balance options from YAML plus command-line overrides.

use std::path::Path;

use anyhow::{Context, Result};
use linekit_balance::{
    EnumGroupNumbering, EnumMissingKeyPolicy, SpecBalanceOptions, derive_default_balance_options,
    derive_english_balance_options,
};

use crate::cli::ArgsOverrides;

/// Load options from a YAML file; absent keys keep their defaults.
pub fn from_file(path: &Path) -> Result<SpecBalanceOptions> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let options: SpecBalanceOptions = serde_yaml::from_str(&content)
        .with_context(|| format!("parse config {}", path.display()))?;
    Ok(options)
}

/// Resolve options: file (or preset) first, then flags.
pub fn load_balance_options(
    path: Option<&Path>,
    overrides: &ArgsOverrides,
) -> Result<SpecBalanceOptions> {
    let mut options = match path {
        Some(path) => from_file(path)?,
        None if overrides.if_english => derive_english_balance_options(),
        None => derive_default_balance_options(),
    };

    if let Some(marker) = &overrides.walking_marker {
        options.walking_marker = marker.clone();
    }
    if overrides.if_number_from_start {
        options.rule_numbering = EnumGroupNumbering::FromStart;
    }
    if overrides.if_keep_missing {
        options.rule_missing_key = EnumMissingKeyPolicy::Keep;
    }
    options.walking_marker = options.walking_marker.trim().to_string();
    Ok(options)
}
