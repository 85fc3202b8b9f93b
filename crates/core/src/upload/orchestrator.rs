use std::sync::Arc;
use tracing::{debug, info, warn};

use super::UploadError;
use crate::metrics;
use crate::pack::Pack;
use crate::store::{asset_path, PackRecord, PackStore, StickerRecord, StoreError, UploadOutcome};
use crate::transcoder::{StickerAsset, TrayAsset, TRAY_FILENAME};

const WEBP_CONTENT_TYPE: &str = "image/webp";
const PNG_CONTENT_TYPE: &str = "image/png";

/// What an upload did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Record id of the pack; `None` when the record already existed.
    pub pack_record_id: Option<String>,
    /// Assets written by this call (tray included).
    pub uploaded: usize,
    /// Assets found already present.
    pub skipped: usize,
    pub sticker_records: usize,
    pub sticker_record_failures: usize,
    /// The pack record existed before this call.
    pub already_committed: bool,
}

/// Commits transcoded packs to a [`PackStore`].
pub struct Uploader {
    store: Arc<dyn PackStore>,
}

impl Uploader {
    pub fn new(store: Arc<dyn PackStore>) -> Self {
        Self { store }
    }

    /// Uploads a pack and creates its metadata.
    ///
    /// Returning `Ok` means the pack record exists, which is the commit
    /// point. Any earlier failure leaves the pack uncommitted.
    pub async fn upload(
        &self,
        pack: &Pack,
        tray: &TrayAsset,
        stickers: &[StickerAsset],
    ) -> Result<UploadReport, UploadError> {
        let mut report = UploadReport::default();

        self.store
            .ensure_namespace(&pack.identifier)
            .await
            .map_err(|source| UploadError::Namespace {
                pack: pack.identifier.clone(),
                source,
            })?;

        let tray_path = asset_path(&pack.identifier, TRAY_FILENAME);
        self.put(&tray_path, &tray.bytes, PNG_CONTENT_TYPE, &mut report)
            .await?;

        for sticker in stickers {
            let path = asset_path(&pack.identifier, &sticker.output_filename);
            self.put(&path, &sticker.output, WEBP_CONTENT_TYPE, &mut report)
                .await?;
        }

        let record = PackRecord {
            identifier: pack.identifier.clone(),
            name: pack.name.clone(),
            publisher: pack.publisher.clone(),
            is_animated: pack.is_animated,
            lang: pack.lang().to_string(),
            tray_image_file: TRAY_FILENAME.to_string(),
            sticker_count: stickers.len(),
        };

        let record_id = match self.store.create_pack_record(&record).await {
            Ok(id) => id,
            Err(StoreError::Conflict(_)) => {
                info!(pack = %pack.identifier, "Pack record already exists, treating as committed");
                report.already_committed = true;
                return Ok(report);
            }
            Err(source) => {
                return Err(UploadError::PackRecord {
                    pack: pack.identifier.clone(),
                    source,
                })
            }
        };

        for sticker in stickers {
            let record = StickerRecord {
                pack_record_id: record_id.clone(),
                pack_identifier: pack.identifier.clone(),
                name: sticker.output_filename.clone(),
                emojis: sticker.emojis.clone(),
                size_bytes: sticker.size_bytes(),
            };
            match self.store.create_sticker_record(&record).await {
                Ok(_) => report.sticker_records += 1,
                Err(e) => {
                    report.sticker_record_failures += 1;
                    warn!(
                        pack = %pack.identifier,
                        sticker = %sticker.output_filename,
                        error = %e,
                        "Failed to create sticker record"
                    );
                }
            }
        }

        report.pack_record_id = Some(record_id);
        info!(
            pack = %pack.identifier,
            uploaded = report.uploaded,
            skipped = report.skipped,
            stickers = report.sticker_records,
            "Pack committed"
        );
        Ok(report)
    }

    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
        report: &mut UploadReport,
    ) -> Result<(), UploadError> {
        let asset_error = |source| UploadError::Asset {
            path: path.to_string(),
            source,
        };

        if self.store.asset_exists(path).await.map_err(asset_error)? {
            debug!(path, "Skipping existing asset");
            report.skipped += 1;
            metrics::ASSETS_SKIPPED.inc();
            return Ok(());
        }

        match self
            .store
            .upload_asset(path, bytes, content_type)
            .await
            .map_err(asset_error)?
        {
            UploadOutcome::Uploaded { .. } => {
                report.uploaded += 1;
                metrics::ASSETS_UPLOADED.inc();
            }
            UploadOutcome::AlreadyPresent { .. } => {
                report.skipped += 1;
                metrics::ASSETS_SKIPPED.inc();
            }
        }
        Ok(())
    }
}
