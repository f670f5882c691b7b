//! Errors raised while talking to an execution environment

use slotpath_core::LayoutError;
use thiserror::Error;

/// Failures of a slot reader backed by a node
#[derive(Debug, Error)]
pub enum EthereumError {
    #[error("RPC request failed: {0}")]
    Request(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed RPC response: {0}")]
    MalformedResponse(String),

    #[error("Invalid hex in storage value: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to create runtime: {0}")]
    Runtime(String),
}

impl From<EthereumError> for LayoutError {
    fn from(err: EthereumError) -> Self {
        LayoutError::SlotRead(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converts_to_slot_read() {
        let err: LayoutError = EthereumError::Rpc {
            code: -32602,
            message: "invalid argument".into(),
        }
        .into();
        assert!(matches!(err, LayoutError::SlotRead(_)));
        assert_eq!(
            err.to_string(),
            "Slot read failed: RPC error -32602: invalid argument"
        );
    }
}
