use std::fmt;

use tracing::{debug, error, info};

use crate::error::{ReindexError, Result};
use crate::fetcher::PageSource;
use crate::locator::{find_index, find_row};
use crate::row::ResourcePath;
use crate::settings::{RawSettings, Settings};
use crate::workbook::IndexSheet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    ConfigInvalid,
    PathExcluded,
    IndexNotFound,
    ResourceUnavailable,
}

/// Terminal state of one reindex run.
#[derive(Debug)]
pub enum Outcome {
    Skipped(SkipReason),
    Failed(ReindexError),
    Updated { index: usize },
    Inserted,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Skipped(reason) => write!(f, "skipped: {:?}", reason),
            Outcome::Failed(err) => write!(f, "failed: {}", err),
            Outcome::Updated { index } => write!(f, "updated row {}", index),
            Outcome::Inserted => write!(f, "inserted"),
        }
    }
}

/// Gate a path before any network work: config first, then naming convention.
pub fn admit(raw: &RawSettings, path: &ResourcePath) -> std::result::Result<Settings, SkipReason> {
    let settings = raw.validate().map_err(|_| SkipReason::ConfigInvalid)?;
    info!("Resource published: path {}", path.as_str());
    if !path.is_eligible() {
        info!("Path is not an indexable merch card, skipping");
        return Err(SkipReason::PathExcluded);
    }
    Ok(settings)
}

/// Re-index a single resource into the sheet at `index_file`.
///
/// Updates the row already keyed by the resource path, or appends one.
pub async fn reindex<P, S>(pages: &P, sheet: &S, index_file: &str, path: &ResourcePath) -> Outcome
where
    P: PageSource,
    S: IndexSheet,
{
    if !path.is_eligible() {
        return Outcome::Skipped(SkipReason::PathExcluded);
    }
    match run(pages, sheet, index_file, path).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Reindex of {} failed: {}", path.as_str(), e);
            Outcome::Failed(e)
        }
    }
}

async fn run<P, S>(pages: &P, sheet: &S, index_file: &str, path: &ResourcePath) -> Result<Outcome>
where
    P: PageSource,
    S: IndexSheet,
{
    let Some(item_id) = sheet.item_id(index_file).await? else {
        error!("No index item id found.");
        return Ok(Outcome::Skipped(SkipReason::IndexNotFound));
    };

    let key = path.index_key();
    let Some(row) = pages.fetch(key).await? else {
        return Ok(Outcome::Skipped(SkipReason::ResourceUnavailable));
    };

    let session = sheet.create_session(&item_id).await?;
    sheet.clear_filter(&item_id, &session).await?;
    sheet.apply_filter(&item_id, &session, key).await?;
    let view = sheet.visible_rows(&item_id, &session).await?;

    match find_row(&view) {
        Some(matched) => {
            debug!("Existing row values: {:?}", matched.values);
            let index = find_index(&matched.cell_addresses).ok_or_else(|| {
                ReindexError::Decode(format!(
                    "unreadable cell address {:?}",
                    matched.cell_addresses.first()
                ))
            })?;
            sheet.update_row(&item_id, &row, index).await?;
            Ok(Outcome::Updated { index })
        }
        None => {
            sheet.add_row(&item_id, &row).await?;
            Ok(Outcome::Inserted)
        }
    }
}
