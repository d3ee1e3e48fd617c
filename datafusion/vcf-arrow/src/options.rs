use crate::error::{Result, VcfArrowError};
use datafusion_vcf_arrow_core::compression::CompressionType;

/// Rows per batch when the caller does not choose.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Which transcripts of a VEP-style annotation to keep per record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TranscriptMode {
    /// Every comma-separated transcript
    #[default]
    All,
    /// Only the first transcript
    First,
}

/// Options for parsing VEP/SnpEff/bcftools-csq annotations into a nested column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VepOptions {
    /// INFO tag to parse (`CSQ`, `BCSQ`, `ANN`); detected when `None`
    pub tag: Option<String>,
    /// Sub-fields to keep, in header order; all when `None`
    pub columns: Option<Vec<String>>,
    /// Transcript selection
    pub transcripts: TranscriptMode,
}

/// Options controlling how a VCF/BCF file is decoded into Arrow batches.
///
/// ```rust
/// use datafusion_vcf_arrow::options::VcfReadOptions;
///
/// let options = VcfReadOptions::default()
///     .with_batch_size(1024)
///     .with_info_fields(vec!["DP".to_string(), "AF".to_string()])
///     .with_region("1:10000-20000");
/// assert_eq!(options.batch_size, 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcfReadOptions {
    /// Rows per emitted batch
    pub batch_size: usize,
    /// INFO fields to expose (None = all declared, empty = none)
    pub info_fields: Option<Vec<String>>,
    /// FORMAT fields to expose per sample (None = all declared, empty = no sample columns)
    pub format_fields: Option<Vec<String>>,
    /// Samples to expose, in output order (None = all, in header order)
    pub samples: Option<Vec<String>>,
    /// Restrict output to records overlapping `chrom[:start[-end]]`
    pub region: Option<String>,
    /// TBI/CSI index for region queries; `<path>.tbi` or `<path>.csi` is used when present
    pub index: Option<String>,
    /// Worker threads for BGZF decompression (None or 1 = single-threaded)
    pub threads: Option<usize>,
    /// Input compression; detected from content by default
    pub compression: CompressionType,
    /// Parse VEP-style annotations into a nested `VEP` column
    pub vep: Option<VepOptions>,
}

impl Default for VcfReadOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            info_fields: None,
            format_fields: None,
            samples: None,
            region: None,
            index: None,
            threads: None,
            compression: CompressionType::AUTO,
            vep: None,
        }
    }
}

impl VcfReadOptions {
    /// Sets the number of rows per batch.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Restricts INFO columns to the given fields.
    pub fn with_info_fields(mut self, fields: Vec<String>) -> Self {
        self.info_fields = Some(fields);
        self
    }

    /// Restricts FORMAT children of every sample struct to the given fields.
    pub fn with_format_fields(mut self, fields: Vec<String>) -> Self {
        self.format_fields = Some(fields);
        self
    }

    /// Drops all INFO columns.
    pub fn without_info(self) -> Self {
        self.with_info_fields(Vec::new())
    }

    /// Drops all sample columns.
    pub fn without_format(self) -> Self {
        self.with_format_fields(Vec::new())
    }

    /// Restricts sample columns to the given samples, in the given order.
    pub fn with_samples(mut self, samples: Vec<String>) -> Self {
        self.samples = Some(samples);
        self
    }

    /// Restricts output to records overlapping a region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Reads region queries through the given TBI/CSI index.
    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    /// Enables multithreaded BGZF decompression.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Overrides compression detection.
    pub fn with_compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    /// Enables annotation parsing.
    pub fn with_vep(mut self, vep: VepOptions) -> Self {
        self.vep = Some(vep);
        self
    }

    /// Rejects option values that can never work.
    ///
    /// # Errors
    ///
    /// Returns [`VcfArrowError::InvalidOption`] for a zero batch size or thread
    /// count, or an index without a region
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(VcfArrowError::InvalidOption(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        if self.threads == Some(0) {
            return Err(VcfArrowError::InvalidOption(
                "threads must be greater than 0".to_string(),
            ));
        }
        if self.index.is_some() && self.region.is_none() {
            return Err(VcfArrowError::InvalidOption(
                "index is only used together with a region".to_string(),
            ));
        }
        Ok(())
    }
}
