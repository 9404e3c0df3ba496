//! Error taxonomy for the client runtime.
//!
//! Every error is handled at the dispatch boundary: a bad frame is logged
//! and skipped, and the frame stream continues. Nothing here propagates
//! past [`crate::runtime::LivePage`].

use livepage_path::NodePath;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ClientError {
    /// Unknown opcode or malformed frame.
    #[error("PROTOCOL: {0}")]
    Protocol(String),

    /// An operand path is absent from the registry.
    #[error("RESOLUTION: {0}")]
    Resolution(NodePath),

    /// Externally supplied code threw or its deferred result rejected.
    #[error("EVAL: {0}")]
    Eval(String),

    /// A named file is absent from the selected set.
    #[error("UPLOAD: {0}")]
    Upload(String),
}
