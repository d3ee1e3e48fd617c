use datafusion::arrow::error::ArrowError;
use datafusion::common::DataFusionError;
use datafusion::parquet::errors::ParquetError;
use std::io;
use thiserror::Error;

/// Result alias used throughout the converter.
pub type Result<T> = std::result::Result<T, VcfArrowError>;

/// A single record whose fields disagree with the header declarations.
///
/// The stream skips the record and keeps going; the error is logged and
/// retained until drained with [`crate::stream::VcfArrowStream::take_decode_errors`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record {record_number} at {locus}: {message}")]
pub struct RecordDecodeError {
    /// 1-based ordinal of the data record in the file
    pub record_number: u64,
    /// `CHROM:POS` of the record, or `?` when it could not be read
    pub locus: String,
    /// What went wrong
    pub message: String,
}

/// Errors raised by the VCF/BCF to Arrow converter.
#[derive(Debug, Error)]
pub enum VcfArrowError {
    /// The input could not be opened.
    #[error("failed to open {path}: {source}")]
    Open {
        /// Input path
        path: String,
        /// Underlying I/O failure
        source: io::Error,
    },
    /// The header is unreadable, or the requested fields/samples do not exist.
    #[error("schema error: {0}")]
    Schema(String),
    /// A record could not be decoded against the header.
    #[error(transparent)]
    RecordDecode(#[from] RecordDecodeError),
    /// The underlying file failed mid-stream. The stream is unusable afterwards.
    #[error("stream I/O error after record {record_number}: {source}")]
    StreamIO {
        /// Number of records read before the failure
        record_number: u64,
        /// Underlying I/O failure
        source: io::Error,
    },
    /// A whole-file conversion or query failed; no partial result exists.
    #[error("materialization failed: {0}")]
    Materialization(#[source] Box<VcfArrowError>),
    /// An option value was rejected before any work started.
    #[error("invalid option: {0}")]
    InvalidOption(String),
    /// Pulling from a stream after it failed with a fatal error.
    #[error("stream is closed")]
    Closed,
    /// I/O error outside of record streaming (e.g., writing output).
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Arrow error while assembling batches.
    #[error(transparent)]
    Arrow(#[from] ArrowError),
    /// Parquet writer error.
    #[error(transparent)]
    Parquet(#[from] ParquetError),
    /// Error reported by the SQL engine, passed through unmodified.
    #[error(transparent)]
    DataFusion(#[from] DataFusionError),
}

impl VcfArrowError {
    /// Wraps an error raised during a whole-file operation.
    ///
    /// Already wrapped errors are not wrapped twice.
    pub fn materialization(err: VcfArrowError) -> Self {
        match err {
            VcfArrowError::Materialization(_) => err,
            other => VcfArrowError::Materialization(Box::new(other)),
        }
    }

    /// Returns true if the error ends the stream it was raised by.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, VcfArrowError::RecordDecode(_))
    }
}

impl From<VcfArrowError> for DataFusionError {
    fn from(err: VcfArrowError) -> Self {
        match err {
            VcfArrowError::DataFusion(e) => e,
            VcfArrowError::Arrow(e) => DataFusionError::ArrowError(Box::new(e), None),
            other => DataFusionError::External(Box::new(other)),
        }
    }
}

impl From<VcfArrowError> for ArrowError {
    fn from(err: VcfArrowError) -> Self {
        match err {
            VcfArrowError::Arrow(e) => e,
            other => ArrowError::ExternalError(Box::new(other)),
        }
    }
}
