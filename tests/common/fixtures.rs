//! Training table fixtures

#![allow(dead_code)]

use super::constants::*;
use chromatica::mood::JOINT_SPACE_SIZE;
use std::path::Path;

fn format_row(label: usize, features: &[f64; 12]) -> String {
    let values: Vec<String> = features.iter().map(|v| v.to_string()).collect();
    format!("{},{}\n", label, values.join(","))
}

/// Deterministic, in-range features for a joint slot.
pub fn reference_row(slot: usize) -> [f64; 12] {
    let t = slot as f64 / (JOINT_SPACE_SIZE - 1) as f64;
    [
        t,
        1.0 - t,
        0.25 + t / 2.0,
        0.1,
        (slot % 12) as f64 - 1.0,
        0.2,
        -50.0 + 40.0 * t,
        (slot % 2) as f64,
        0.05,
        60.0 + 120.0 * t,
        3.0 + (slot % 5) as f64,
        t,
    ]
}

/// Write a table holding one row labelled `label`.
pub fn write_single_row_table(dir: &Path, label: usize, features: &[f64; 12]) {
    let text = format!("{}\n{}", TABLE_HEADER, format_row(label, features));
    std::fs::write(dir.join(TABLE_FILE), text).expect("Failed to write fixture table");
}

/// Write a table with one [`reference_row`] per joint slot, in slot order.
pub fn write_full_table(dir: &Path) {
    let mut text = format!("{}\n", TABLE_HEADER);
    for slot in 0..JOINT_SPACE_SIZE {
        text.push_str(&format_row(slot, &reference_row(slot)));
    }
    std::fs::write(dir.join(TABLE_FILE), text).expect("Failed to write fixture table");
}
