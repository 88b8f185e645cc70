//! Custom error types for tidy-aws.

use thiserror::Error;

use crate::report::ReportKind;

/// Errors raised by the inventory client when a read call cannot complete.
#[derive(Error, Debug, Clone)]
pub enum InventoryError {
    #[error("[{0}] {1}")]
    AwsSdk(String, String),

    #[error("[{0}] AWS credentials error: {1}")]
    AwsCredentials(String, String),

    #[error("[{0}] AWS region not configured: {1}")]
    AwsRegion(String, String),
}

impl InventoryError {
    /// Create an inventory error from an AWS SDK error.
    /// Analyzes the error message to pick the credentials or region variant.
    pub fn aws<E: std::fmt::Debug + std::fmt::Display>(operation: &str, err: E) -> Self {
        let err_debug = format!("{:?}", err);
        let err_display = err.to_string();
        let operation = operation.to_string();

        let combined_lower = format!("{} {}", err_display, err_debug).to_lowercase();

        if CREDENTIAL_MARKERS
            .iter()
            .any(|marker| combined_lower.contains(marker))
        {
            return InventoryError::AwsCredentials(
                operation,
                Self::extract_error_details(&err_debug, &err_display),
            );
        }

        if REGION_MARKERS
            .iter()
            .any(|marker| combined_lower.contains(marker))
        {
            return InventoryError::AwsRegion(
                operation,
                Self::extract_error_details(&err_debug, &err_display),
            );
        }

        InventoryError::AwsSdk(
            operation,
            Self::extract_error_details(&err_debug, &err_display),
        )
    }

    /// Extract a single-line message from an AWS SDK error.
    fn extract_error_details(debug_str: &str, display_str: &str) -> String {
        // Pattern: message: Some("actual error message")
        if let Some(pos) = debug_str.find("message: Some(\"") {
            let start = pos + "message: Some(\"".len();
            let rest = &debug_str[start..];
            if let Some(end) = rest.find('"') {
                return rest[..end].to_string();
            }
        }

        if !display_str.to_lowercase().contains("service error") {
            return display_str.to_string();
        }

        "AWS API request failed".to_string()
    }
}

const CREDENTIAL_MARKERS: &[&str] = &[
    "no credentials",
    "credentials not found",
    "invalid credentials",
    "expired token",
    "expiredtoken",
    "the security token included in the request is invalid",
    "the security token included in the request is expired",
    "unrecognized client",
    "invalidclienttokenid",
    "signaturedoesnotmatch",
    "access denied",
    "accessdenied",
    "unauthorizedoperation",
    "not authorized",
];

const REGION_MARKERS: &[&str] = &["no region", "region not found", "missing region"];

/// Errors that abort an analysis run.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The active-reference set could not be built. Continuing with a
    /// partial set would report in-use images and snapshots as stale.
    #[error("failed to build active reference set: {0}")]
    ActiveReferences(#[source] InventoryError),
}

/// A single report whose listing call failed while the others completed.
#[derive(Error, Debug)]
#[error("{report} report failed: {source}")]
pub struct ReportFailure {
    pub report: ReportKind,
    #[source]
    pub source: InventoryError,
}

pub type Result<T, E = InventoryError> = std::result::Result<T, E>;
