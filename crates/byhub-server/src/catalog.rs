//! The catalog service: binds the asset store, the catalog database and the
//! session issuer into the operations exposed over HTTP.
//!
//! Mutating operations take an [`AdminSession`], which can only be obtained
//! from a verified token, so an unauthenticated caller never reaches the
//! stores.

use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};
use uuid::Uuid;

use byhub_shared::{
    format_size, AppFieldsInput, PackageRecord, SafetyReport, SessionIssuer, UserIdentity,
};
use byhub_store::{check_credentials, Database};

use crate::analyzer::SafetyAnalyzer;
use crate::asset_store::{AssetFile, AssetStore, StagedAsset};
use crate::auth::AdminSession;
use crate::error::ServerError;

#[derive(Clone)]
pub struct CatalogService {
    db: Arc<Mutex<Database>>,
    assets: Arc<AssetStore>,
    sessions: SessionIssuer,
    analyzer: Arc<dyn SafetyAnalyzer>,
}

impl CatalogService {
    pub fn new(
        db: Arc<Mutex<Database>>,
        assets: Arc<AssetStore>,
        sessions: SessionIssuer,
        analyzer: Arc<dyn SafetyAnalyzer>,
    ) -> Self {
        Self {
            db,
            assets,
            sessions,
            analyzer,
        }
    }

    pub fn sessions(&self) -> &SessionIssuer {
        &self.sessions
    }

    pub fn assets(&self) -> &AssetStore {
        &self.assets
    }

    /// Run a store operation on the blocking pool.
    ///
    /// The connection is shared by every request; holding the lock on an
    /// async worker would stall unrelated requests.
    async fn with_db<T, F>(&self, f: F) -> Result<T, ServerError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, ServerError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let guard = db
                .lock()
                .map_err(|e| ServerError::Internal(format!("Database lock poisoned: {e}")))?;
            f(&guard)
        })
        .await
        .map_err(|e| ServerError::Internal(format!("Store task failed: {e}")))?
    }

    // ------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------

    /// Verify credentials and issue a session token.
    ///
    /// Unknown usernames and wrong passwords produce the same error. Only the
    /// user lookup holds the database lock; the password hash is checked on
    /// its own blocking task.
    pub async fn authenticate(
        &self,
        username: String,
        password: String,
    ) -> Result<(String, UserIdentity), ServerError> {
        let user = self.with_db(move |db| Ok(db.find_user(&username)?)).await?;

        let identity = tokio::task::spawn_blocking(move || check_credentials(user, &password))
            .await
            .map_err(|e| ServerError::Internal(format!("Credential check failed: {e}")))??
            .ok_or(ServerError::InvalidCredentials)?;

        let token = self.sessions.issue(&identity);
        info!(user = %identity.username, "Admin logged in");
        Ok((token, identity))
    }

    // ------------------------------------------------------------------
    // Public reads
    // ------------------------------------------------------------------

    pub async fn list_apps(&self) -> Result<Vec<PackageRecord>, ServerError> {
        self.with_db(|db| Ok(db.list_apps()?)).await
    }

    pub async fn get_app(&self, id: Uuid) -> Result<PackageRecord, ServerError> {
        self.with_db(move |db| Ok(db.get_app(id)?.record)).await
    }

    /// Resolve a record's binary for download.
    ///
    /// An unknown id is [`ServerError::AppNotFound`]; a record whose asset is
    /// gone is [`ServerError::AssetMissing`].
    pub async fn download_app(&self, id: Uuid) -> Result<AssetFile, ServerError> {
        let stored = self.with_db(move |db| Ok(db.get_app(id)?)).await?;

        match self.assets.open(&stored.asset_ref).await {
            Err(ServerError::AssetMissing) => {
                warn!(id = %id, asset_ref = %stored.asset_ref, "Catalog record has no asset on disk");
                Err(ServerError::AssetMissing)
            }
            other => other,
        }
    }

    // ------------------------------------------------------------------
    // Admin mutations
    // ------------------------------------------------------------------

    /// Publish a staged binary, then create its record.
    ///
    /// Metadata is validated before the binary is committed; on any failure
    /// up to the commit the staged file is discarded. The record is only
    /// inserted once the asset is durably stored, so it is never listed
    /// without a downloadable binary. If the insert fails the asset is left
    /// orphaned and logged with its reference.
    pub async fn upload_app(
        &self,
        session: &AdminSession,
        input: AppFieldsInput,
        package: StagedAsset,
    ) -> Result<PackageRecord, ServerError> {
        let mut fields = input.validate()?;
        if fields.size.is_empty() {
            fields.size = format_size(package.len());
        }

        let size = package.len();
        let asset_ref = package.commit().await?;

        let insert_ref = asset_ref.clone();
        let record = match self
            .with_db(move |db| Ok(db.insert_app(&fields, &insert_ref)?))
            .await
        {
            Ok(record) => record,
            Err(e) => {
                error!(
                    asset_ref = %asset_ref,
                    error = %e,
                    "Catalog insert failed after asset write; asset is orphaned"
                );
                return Err(e);
            }
        };

        info!(
            id = %record.id,
            name = %record.name,
            asset_ref = %asset_ref,
            size,
            by = %session.0.username,
            "App uploaded"
        );
        Ok(record)
    }

    /// Replace the mutable fields of a record.
    pub async fn update_app(
        &self,
        session: &AdminSession,
        id: Uuid,
        input: AppFieldsInput,
    ) -> Result<(), ServerError> {
        let fields = input.validate()?;

        let updated = self.with_db(move |db| Ok(db.update_app(id, &fields)?)).await?;
        if !updated {
            return Err(ServerError::AppNotFound);
        }

        info!(id = %id, by = %session.0.username, "App updated");
        Ok(())
    }

    /// Remove a record. Its asset stays on disk.
    pub async fn delete_app(&self, session: &AdminSession, id: Uuid) -> Result<(), ServerError> {
        let deleted = self.with_db(move |db| Ok(db.delete_app(id)?)).await?;
        if !deleted {
            return Err(ServerError::AppNotFound);
        }

        info!(id = %id, by = %session.0.username, "App deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Advisory analysis
    // ------------------------------------------------------------------

    pub async fn analyze(
        &self,
        _session: &AdminSession,
        name: &str,
        description: &str,
    ) -> Result<SafetyReport, ServerError> {
        self.analyzer
            .analyze(name, description)
            .await
            .map_err(|e| {
                warn!(error = %e, "Safety analysis unavailable");
                ServerError::AnalysisUnavailable
            })
    }
}
