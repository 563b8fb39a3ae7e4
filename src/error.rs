// src/error.rs
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::Record;

/// Failures of the record store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("preparing data dir {}: {source}", .path.display())]
    DataDir {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("reading {record}: {source}")]
    Read {
        record: Record,
        #[source]
        source: std::io::Error,
    },

    #[error("writing {record}: {source}")]
    Write {
        record: Record,
        #[source]
        source: std::io::Error,
    },

    #[error("decoding {record}: {source}")]
    Decode {
        record: Record,
        #[source]
        source: serde_json::Error,
    },

    #[error("encoding {record}: {source}")]
    Encode {
        record: Record,
        #[source]
        source: serde_json::Error,
    },
}

/// Everything a request can fail with. Each variant has a fixed status code.
#[derive(Error, Debug)]
pub enum CanteenError {
    #[error("{0}")]
    Validation(String),

    #[error("already rated this dish today")]
    Duplicate,

    #[error("wrong admin password")]
    Unauthorized,

    #[error("wrong mystery code")]
    InvalidCode,

    #[error("storage failure")]
    Storage(#[from] StoreError),
}

impl CanteenError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            CanteenError::Validation(_) | CanteenError::Duplicate => StatusCode::BAD_REQUEST,
            CanteenError::Unauthorized | CanteenError::InvalidCode => StatusCode::UNAUTHORIZED,
            CanteenError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for CanteenError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(format!("malformed request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for CanteenError {
    fn into_response(self) -> Response {
        if let CanteenError::Storage(ref e) = self {
            // Details stay in the log; the client only learns it was storage.
            tracing::error!(target: "store", error = %e, "record store failure");
        }
        let status = self.status();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
