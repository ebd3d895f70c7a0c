use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use tracing::warn;

/// Rows of the table range currently visible under the active filter.
///
/// The first entry is the header row; data rows follow.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct VisibleView {
    #[serde(default)]
    pub value: Vec<RangeViewRow>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeViewRow {
    #[serde(default)]
    pub cell_addresses: Vec<Vec<String>>,
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

/// First data row of a filtered view.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedRow {
    pub cell_addresses: Vec<String>,
    pub values: Vec<serde_json::Value>,
}

pub fn find_row(view: &VisibleView) -> Option<MatchedRow> {
    if view.value.len() < 2 {
        return None;
    }
    if view.value.len() > 2 {
        warn!(
            "Filter matched {} rows; updating the first one",
            view.value.len() - 1
        );
    }
    let entry = &view.value[1];
    Some(MatchedRow {
        cell_addresses: entry.cell_addresses.first().cloned().unwrap_or_default(),
        values: entry.values.first().cloned().unwrap_or_default(),
    })
}

/// Zero-based table row index for the first cell of a matched row.
///
/// Sheet row 1 holds the table header, so sheet row `n` is table row `n - 2`.
/// Column letters, `$` markers and a `Sheet!` qualifier are ignored.
pub fn find_index(cell_addresses: &[String]) -> Option<usize> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^(?:.*!)?\$?[A-Za-z]+\$?(\d+)$").unwrap());

    let cell = cell_addresses.first()?;
    let row: usize = re.captures(cell.trim())?.get(1)?.as_str().parse().ok()?;
    row.checked_sub(2)
}
