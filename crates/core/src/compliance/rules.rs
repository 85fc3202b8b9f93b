use serde::{Deserialize, Serialize};

use super::types::{ComplianceReport, RejectReason};
use crate::pack::Pack;

/// Bounds a pack must satisfy before any asset is downloaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceRules {
    #[serde(default = "default_min_assets")]
    pub min_assets: usize,
    #[serde(default = "default_max_assets")]
    pub max_assets: usize,
    /// Accepted source extensions, lower-case, with leading dot.
    #[serde(default = "default_extensions")]
    pub accepted_extensions: Vec<String>,
}

fn default_min_assets() -> usize {
    3
}

fn default_max_assets() -> usize {
    30
}

fn default_extensions() -> Vec<String> {
    vec![".webp".to_string(), ".png".to_string(), ".gif".to_string()]
}

impl Default for ComplianceRules {
    fn default() -> Self {
        Self {
            min_assets: default_min_assets(),
            max_assets: default_max_assets(),
            accepted_extensions: default_extensions(),
        }
    }
}

impl ComplianceRules {
    fn extension_accepted(&self, file: &str) -> bool {
        let lower = file.to_lowercase();
        self.accepted_extensions
            .iter()
            .any(|ext| lower.ends_with(ext.as_str()))
    }
}

/// Checks a pack against the rules, collecting every violation.
pub fn validate_pack(pack: &Pack, rules: &ComplianceRules) -> ComplianceReport {
    let mut reasons = Vec::new();

    if pack.name.trim().is_empty() {
        reasons.push(RejectReason::EmptyName);
    }
    if pack.publisher.trim().is_empty() {
        reasons.push(RejectReason::EmptyPublisher);
    }
    if pack
        .resource_url_prefix
        .as_deref()
        .map_or(true, |p| p.trim().is_empty())
    {
        reasons.push(RejectReason::MissingUrlPrefix);
    }

    let count = pack.resource_files.len();
    if count == 0 {
        reasons.push(RejectReason::MissingAssets);
    } else if count < rules.min_assets {
        reasons.push(RejectReason::TooFewAssets {
            count,
            min: rules.min_assets,
        });
    } else if count > rules.max_assets {
        reasons.push(RejectReason::TooManyAssets {
            count,
            max: rules.max_assets,
        });
    }

    for file in &pack.resource_files {
        if !rules.extension_accepted(file) {
            reasons.push(RejectReason::UnsupportedExtension { file: file.clone() });
        }
    }

    ComplianceReport { reasons }
}
