//! Catalog view model.
//!
//! Holds the last listing fetched from the server and the category filter
//! selected by the user. Filtering is purely local over the full listing.

use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use byhub_shared::{Category, PackageRecord};

use crate::error::ClientError;

#[derive(Debug, Clone, Default)]
pub struct CatalogView {
    records: Vec<PackageRecord>,
    skipped: usize,
    selected: Option<Category>,
}

impl CatalogView {
    pub fn new(records: Vec<PackageRecord>) -> Self {
        Self {
            records,
            ..Self::default()
        }
    }

    pub fn records(&self) -> &[PackageRecord] {
        &self.records
    }

    /// Number of listing entries that could not be decoded.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn selected(&self) -> Option<Category> {
        self.selected
    }

    /// Select a category, or `None` for all.
    pub fn select(&mut self, category: Option<Category>) {
        self.selected = category;
    }

    pub fn filtered(&self) -> impl Iterator<Item = &PackageRecord> + '_ {
        let selected = self.selected;
        self.records
            .iter()
            .filter(move |r| selected.map_or(true, |c| r.category == c))
    }

    pub fn find(&self, id: Uuid) -> Option<&PackageRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Replace the listing, keeping the current selection.
    pub fn replace(&mut self, fresh: CatalogView) {
        self.records = fresh.records;
        self.skipped = fresh.skipped;
    }

    /// Record count per category, in display order.
    pub fn counts(&self) -> Vec<(Category, usize)> {
        Category::ALL
            .into_iter()
            .map(|c| (c, self.records.iter().filter(|r| r.category == c).count()))
            .collect()
    }
}

/// Decode a `GET /api/apps` body.
///
/// A body that is not an array is an error. Individual entries that fail to
/// decode are skipped so one bad record never hides the rest.
pub fn decode_listing(body: Value) -> Result<CatalogView, ClientError> {
    let Value::Array(entries) = body else {
        return Err(ClientError::Decode("app listing is not an array".to_string()));
    };

    let mut view = CatalogView::default();
    for entry in entries {
        match serde_json::from_value::<PackageRecord>(entry) {
            Ok(record) => view.records.push(record),
            Err(e) => {
                warn!(error = %e, "Skipping malformed catalog entry");
                view.skipped += 1;
            }
        }
    }
    Ok(view)
}
