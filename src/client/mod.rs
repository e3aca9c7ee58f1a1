//! Search/Detail client module
//!
//! This module talks to the external catalog gateway and normalizes its
//! loosely shaped JSON payloads into typed results.
//!
//! # Components
//!
//! - `GatewayClient`: rate-limit-friendly HTTP calls for search and detail
//! - payload normalization: ordered candidate-key resolution over raw JSON,
//!   separated from the HTTP layer so it can be tested without a server

mod gateway;
mod payload;

pub use gateway::GatewayClient;
pub use payload::{parse_detail_payload, parse_search_payload};

use crate::guard::{CandidateFields, FieldSet};
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

/// Errors produced by gateway calls
///
/// Every failure mode the orchestrators need to distinguish is a variant
/// here; nothing is signaled through panics or sentinel values.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The provider blocked the call (credentials or quota). Never retried;
    /// aborts the whole run.
    #[error("access denied by provider (HTTP {status})")]
    AccessDenied { status: u16 },

    /// Network-level trouble worth retrying: timeouts, connection errors,
    /// rate pressure, server-side 5xx.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The call answered but the payload cannot be used: malformed JSON,
    /// missing required fields, unexpected 4xx. Never retried.
    #[error("permanent failure: {0}")]
    Permanent(String),
}

impl ClientError {
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent(_))
    }

    /// Short kind name recorded on usage rows and staged identifiers
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AccessDenied { .. } => "access_denied",
            Self::Transient(_) => "transient",
            Self::Permanent(_) => "permanent",
        }
    }
}

/// Normalized result of one search call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    /// Identifiers in the order the provider listed them
    pub identifiers: Vec<String>,

    /// Prices keyed by identifier; zero and unparseable prices are absent
    pub prices: HashMap<String, f64>,
}

/// Normalized result of one detail call
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDetail {
    pub external_ref: String,

    /// Parsed specification fields; a field the payload lacked or that
    /// failed to parse is None here and listed in `missing`
    pub fields: CandidateFields,

    /// Fields flagged for manual review instead of being guessed
    pub missing: FieldSet,
}

/// Tie-break rule when one search response repeats an identifier with
/// different prices
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceTieBreak {
    /// Keep the last occurrence (observed provider behavior)
    #[default]
    LastWins,

    /// Keep the first occurrence (usually the higher-ranked placement)
    FirstWins,
}
