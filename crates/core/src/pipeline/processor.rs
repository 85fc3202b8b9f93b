use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{AssetTally, PackOutcome, PackReport, PipelineConfig, PipelineError, SkipReason};
use crate::compliance::{validate_pack, ComplianceRules};
use crate::discovery::Pacer;
use crate::metrics;
use crate::pack::{output_filename, Pack};
use crate::transcoder::{StickerAsset, Transcoder};
use crate::upload::Uploader;
use crate::upstream::StickerApi;

/// Runs a single new pack from validation to commit.
///
/// Holds no mutable state, so several packs of a batch can run at once.
pub struct PackProcessor {
    api: Arc<dyn StickerApi>,
    transcoder: Transcoder,
    uploader: Uploader,
    rules: ComplianceRules,
    config: PipelineConfig,
    download_pacer: Pacer,
}

impl PackProcessor {
    pub fn new(
        api: Arc<dyn StickerApi>,
        transcoder: Transcoder,
        uploader: Uploader,
        rules: ComplianceRules,
        config: PipelineConfig,
        download_pacer: Pacer,
    ) -> Self {
        Self {
            api,
            transcoder,
            uploader,
            rules,
            config,
            download_pacer,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn process(&self, pack: &Pack) -> PackReport {
        let mut tally = AssetTally::default();
        let outcome = self.run(pack, &mut tally).await;

        match &outcome {
            PackOutcome::Committed {
                assets,
                failed_assets,
            } => info!(
                pack = %pack.identifier,
                name = %pack.name,
                assets,
                failed_assets,
                "Pack ingested"
            ),
            PackOutcome::Skipped(reason) => {
                debug!(pack = %pack.identifier, reason = reason.label(), "Pack skipped")
            }
            PackOutcome::Failed(e) => warn!(
                pack = %pack.identifier,
                kind = e.kind(),
                error = %e,
                "Pack failed"
            ),
        }

        PackReport {
            identifier: pack.identifier.clone(),
            outcome,
            tally,
        }
    }

    async fn run(&self, pack: &Pack, tally: &mut AssetTally) -> PackOutcome {
        let report = validate_pack(pack, &self.rules);
        if !report.is_accepted() {
            debug!(pack = %pack.identifier, reasons = %report.summary(), "Pack rejected");
            return PackOutcome::Skipped(SkipReason::Rejected(report.reasons));
        }

        let stickers = self.transcode_assets(pack, tally).await;

        if stickers.is_empty() {
            return PackOutcome::Failed(PipelineError::NoValidAssets);
        }
        if stickers.len() < self.rules.min_assets {
            return PackOutcome::Skipped(SkipReason::TooFewAssets {
                valid: stickers.len(),
            });
        }

        let tray = match self.transcoder.derive_tray(&stickers[0]).await {
            Ok(tray) => tray,
            Err(e) => return PackOutcome::Failed(PipelineError::Tray(e)),
        };

        match self.uploader.upload(pack, &tray, &stickers).await {
            Ok(upload) if upload.already_committed => PackOutcome::Skipped(SkipReason::Duplicate),
            Ok(_) => PackOutcome::Committed {
                assets: stickers.len(),
                failed_assets: tally.failed,
            },
            Err(e) => PackOutcome::Failed(e.into()),
        }
    }

    /// Downloads and transcodes assets in order until enough are valid.
    ///
    /// Failures are per asset and never abort the pack. A file whose output
    /// name is already taken by an earlier valid sticker counts as failed.
    async fn transcode_assets(&self, pack: &Pack, tally: &mut AssetTally) -> Vec<StickerAsset> {
        let mut stickers = Vec::new();
        let mut taken = HashSet::new();

        for file in &pack.resource_files {
            if stickers.len() >= self.config.max_valid_assets {
                break;
            }
            let name = output_filename(file);
            if taken.contains(&name) {
                tally.failed += 1;
                metrics::record_sticker("name_collision");
                warn!(pack = %pack.identifier, file = %file, "Asset output name collides, skipped");
                continue;
            }
            let Some(url) = pack.asset_url(file) else {
                tally.failed += 1;
                continue;
            };

            self.download_pacer.wait().await;
            tally.downloads += 1;
            let bytes = match self.api.download(&url).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    tally.failed += 1;
                    metrics::record_sticker("download");
                    warn!(pack = %pack.identifier, file = %file, error = %e, "Asset download failed");
                    continue;
                }
            };

            match self
                .transcoder
                .transcode_sticker(file, bytes, pack.is_animated)
                .await
            {
                Ok(sticker) => {
                    tally.transcoded += 1;
                    metrics::record_sticker("success");
                    metrics::observe_sticker_bytes(sticker.animated, sticker.size_bytes());
                    taken.insert(name);
                    stickers.push(sticker);
                }
                Err(e) => {
                    tally.failed += 1;
                    metrics::record_sticker(e.kind());
                    warn!(
                        pack = %pack.identifier,
                        file = %file,
                        kind = e.kind(),
                        error = %e,
                        "Asset skipped"
                    );
                }
            }
        }

        stickers
    }
}
