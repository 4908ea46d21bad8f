//! Catalog operations on [`PackageRecord`] rows.

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::params;
use uuid::Uuid;

use byhub_shared::{AppFields, AppStatus, Category, PackageRecord};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::StoredApp;

const APP_COLUMNS: &str = "id, name, version, developer, category, description, size, \
                           upload_date, status, icon_url, asset_ref";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new record for an already-stored asset.
    ///
    /// Assigns a fresh id, captures the upload date and sets the status to
    /// `Verified`.
    pub fn insert_app(&self, fields: &AppFields, asset_ref: &str) -> Result<PackageRecord> {
        let record = PackageRecord {
            id: Uuid::new_v4(),
            name: fields.name.clone(),
            version: fields.version.clone(),
            developer: fields.developer.clone(),
            category: fields.category,
            description: fields.description.clone(),
            size: fields.size.clone(),
            // Stored at microsecond precision; truncate so the returned
            // record matches what a later read yields.
            upload_date: Utc::now().trunc_subsecs(6),
            status: AppStatus::Verified,
            icon_url: fields.icon_url.clone(),
        };

        self.conn().execute(
            "INSERT INTO apps (id, name, version, developer, category, description, size,
                               upload_date, status, icon_url, asset_ref)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.id.to_string(),
                record.name,
                record.version,
                record.developer,
                record.category.as_str(),
                record.description,
                record.size,
                format_timestamp(&record.upload_date),
                record.status.as_str(),
                record.icon_url,
                asset_ref,
            ],
        )?;

        tracing::debug!(id = %record.id, asset_ref, "inserted app record");
        Ok(record)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// List every record, newest upload first.
    ///
    /// Rows that cannot be decoded are logged and skipped so one bad row
    /// never hides the rest of the catalog.
    pub fn list_apps(&self) -> Result<Vec<PackageRecord>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {APP_COLUMNS} FROM apps ORDER BY upload_date DESC, rowid DESC"
        ))?;

        let rows = stmt.query_map([], row_to_app)?;

        let mut apps = Vec::new();
        for row in rows {
            match row {
                Ok(stored) => apps.push(stored.record),
                Err(e) => tracing::warn!(error = %e, "skipping undecodable app row"),
            }
        }
        Ok(apps)
    }

    /// Fetch a single record with its asset reference.
    pub fn get_app(&self, id: Uuid) -> Result<StoredApp> {
        self.conn()
            .query_row(
                &format!("SELECT {APP_COLUMNS} FROM apps WHERE id = ?1"),
                params![id.to_string()],
                row_to_app,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Replace all mutable fields. `status`, `upload_date` and `asset_ref`
    /// are untouched. Returns `false` if no such record exists.
    pub fn update_app(&self, id: Uuid, fields: &AppFields) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE apps
             SET name = ?1, version = ?2, developer = ?3, category = ?4,
                 description = ?5, size = ?6, icon_url = ?7
             WHERE id = ?8",
            params![
                fields.name,
                fields.version,
                fields.developer,
                fields.category.as_str(),
                fields.description,
                fields.size,
                fields.icon_url,
                id.to_string(),
            ],
        )?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    // only removes the db record, not the asset on disk
    pub fn delete_app(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM apps WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

/// Fixed-width UTC timestamps so that text ordering matches time ordering.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn row_to_app(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredApp> {
    let id_str: String = row.get(0)?;
    let category_str: String = row.get(4)?;
    let upload_str: String = row.get(7)?;
    let status_str: String = row.get(8)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| conversion_error(0, e))?;

    let category: Category = category_str
        .parse()
        .map_err(|e| conversion_error(4, e))?;

    let upload_date: DateTime<Utc> = DateTime::parse_from_rfc3339(&upload_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(7, e))?;

    let status = AppStatus::parse(&status_str).ok_or_else(|| {
        conversion_error(
            8,
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unknown status {status_str}"),
            ),
        )
    })?;

    Ok(StoredApp {
        record: PackageRecord {
            id,
            name: row.get(1)?,
            version: row.get(2)?,
            developer: row.get(3)?,
            category,
            description: row.get(5)?,
            size: row.get(6)?,
            upload_date,
            status,
            icon_url: row.get(9)?,
        },
        asset_ref: row.get(10)?,
    })
}
