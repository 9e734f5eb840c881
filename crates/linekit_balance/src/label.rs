//! Segment label and colour-category text.

use crate::conf::C_LABEL_SEPARATOR;
use crate::spec::{SpecBalanceOptions, SpecElementRow};

/// Text shown for an absent task or duration.
const C_LABEL_MISSING_VALUE: &str = "-";

/// Format a duration the way the table shows it: integral values without a
/// fractional part, everything else in shortest decimal form.
pub fn format_time_value(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e15 {
        return format!("{}", x as i64);
    }
    format!("{x}")
}

/// Build `ID:{id} | {location} | {task} | {time}{suffix}`.
pub fn derive_label(row: &SpecElementRow, id: u32, options: &SpecBalanceOptions) -> String {
    let c_location = row
        .location
        .as_deref()
        .unwrap_or(&options.label_missing_location);
    let c_task = row.task.as_deref().unwrap_or(C_LABEL_MISSING_VALUE);
    let c_time = match (row.time, row.time_text.as_deref()) {
        (Some(_), Some(c_text)) => format!("{c_text}{}", options.label_time_suffix),
        (Some(x), None) => format!("{}{}", format_time_value(x), options.label_time_suffix),
        (None, _) => C_LABEL_MISSING_VALUE.to_string(),
    };

    [format!("ID:{id}"), c_location.to_string(), c_task.to_string(), c_time]
        .join(C_LABEL_SEPARATOR)
}

/// Colour category: the location when present, otherwise the task.
pub fn derive_color_category(row: &SpecElementRow, options: &SpecBalanceOptions) -> String {
    row.location
        .clone()
        .or_else(|| row.task.clone())
        .unwrap_or_else(|| options.label_missing_location.clone())
}
