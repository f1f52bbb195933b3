use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MessagePack encode error: {0}")]
    MsgpackEncode(#[from] rmp_serde::encode::Error),

    #[error("MessagePack decode error: {0}")]
    MsgpackDecode(#[from] rmp_serde::decode::Error),

    #[error("result matrix error: {0}")]
    Core(#[from] tsgrid_core::GridError),

    #[error("unsupported bundle format for {0} (expected .json, .msgpack or .mpk)")]
    UnsupportedFormat(PathBuf),

    #[error("bundle format version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("duplicate {kind} id {id} in bundle")]
    DuplicateId { kind: &'static str, id: u64 },
}
