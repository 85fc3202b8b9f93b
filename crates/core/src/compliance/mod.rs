//! Compliance validation for discovered packs.
//!
//! Pure and synchronous: a [`Pack`](crate::pack::Pack) goes in, a
//! [`ComplianceReport`] listing every violated rule comes out.

mod rules;
mod types;

pub use rules::{validate_pack, ComplianceRules};
pub use types::{ComplianceReport, RejectReason};
