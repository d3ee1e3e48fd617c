use crate::builder::BatchBuilder;
use crate::decoder::RecordDecoder;
use crate::error::{RecordDecodeError, Result, VcfArrowError};
use crate::options::VcfReadOptions;
use crate::region::GenomicRegion;
use crate::schema::VcfSchema;
use crate::storage::{VariantRecord, VcfLocalReader};
use datafusion::arrow::array::{RecordBatch, RecordBatchReader};
use datafusion::arrow::datatypes::SchemaRef;
use datafusion::arrow::error::ArrowError;
use log::{debug, warn};
use noodles::vcf::Header;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Active,
    Exhausted,
    Failed,
}

/// Pull-based conversion of one VCF/BCF file into Arrow record batches.
///
/// The stream owns its file handle. It is released when the file is fully
/// read, after a fatal error, or by [`VcfArrowStream::close`], whichever
/// comes first. A stream is a single cursor and is not shared between callers.
///
/// ```rust,no_run
/// use datafusion_vcf_arrow::{VcfArrowStream, VcfReadOptions};
///
/// # fn example() -> datafusion_vcf_arrow::Result<()> {
/// let mut stream = VcfArrowStream::open("data/variants.vcf.gz", VcfReadOptions::default())?;
/// while let Some(batch) = stream.next_batch()? {
///     println!("{} rows", batch.num_rows());
/// }
/// # Ok(())
/// # }
/// ```
pub struct VcfArrowStream {
    path: String,
    reader: Option<VcfLocalReader>,
    record: VariantRecord,
    header: Header,
    schema: VcfSchema,
    decoder: RecordDecoder,
    builder: BatchBuilder,
    batch_size: usize,
    region: Option<GenomicRegion>,
    state: StreamState,
    records_read: u64,
    skipped: u64,
    decode_errors: Vec<RecordDecodeError>,
}

impl VcfArrowStream {
    /// Opens a file, reads its header and derives the batch schema.
    ///
    /// # Errors
    ///
    /// Returns [`VcfArrowError::InvalidOption`] for unusable options,
    /// [`VcfArrowError::Open`] if the file cannot be opened and
    /// [`VcfArrowError::Schema`] if the header is invalid or does not contain
    /// the requested fields or samples
    pub fn open<P: AsRef<Path>>(path: P, options: VcfReadOptions) -> Result<Self> {
        options.validate()?;
        let path = path.as_ref().to_string_lossy().into_owned();

        let mut reader = VcfLocalReader::new(&path, &options)?;
        let header = reader
            .read_header()
            .map_err(|e| VcfArrowError::Schema(format!("{path}: invalid header: {e}")))?;
        let region = options
            .region
            .as_deref()
            .map(|text| GenomicRegion::resolve(text, |name| header.contigs().contains_key(name)))
            .transpose()?;
        if let Some(region) = &region {
            if let Some(indexed) = reader.for_region(&path, &header, region, &options)? {
                reader = indexed;
            }
        }
        let schema = VcfSchema::from_header(&header, &options)?;
        let decoder = RecordDecoder::new(&schema, &header);
        let builder = BatchBuilder::new(&schema, options.batch_size)?;
        let record = reader.new_record();

        debug!(
            "Opened {} ({}{}) with {} columns, batch size {}{}",
            path,
            if reader.is_bcf() { "BCF" } else { "VCF" },
            if reader.is_indexed() { ", indexed" } else { "" },
            schema.schema().fields().len(),
            options.batch_size,
            region
                .as_ref()
                .map(|r| format!(", region {r}"))
                .unwrap_or_default()
        );

        Ok(Self {
            path,
            reader: Some(reader),
            record,
            header,
            schema,
            decoder,
            builder,
            batch_size: options.batch_size,
            region,
            state: StreamState::Active,
            records_read: 0,
            skipped: 0,
            decode_errors: Vec::new(),
        })
    }

    /// Schema shared by every batch of this stream.
    pub fn schema(&self) -> SchemaRef {
        self.schema.schema()
    }

    /// Header of the input file.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Names of the samples exposed as columns, in column order.
    pub fn sample_names(&self) -> Vec<String> {
        self.schema.samples().iter().map(|s| s.name.clone()).collect()
    }

    /// Number of records read from the file so far, including skipped ones.
    ///
    /// With an index, only records in the chunks overlapping the region are read.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Number of records skipped because they could not be decoded.
    pub fn skipped_records(&self) -> u64 {
        self.skipped
    }

    /// Drains the decode errors recorded so far.
    pub fn take_decode_errors(&mut self) -> Vec<RecordDecodeError> {
        std::mem::take(&mut self.decode_errors)
    }

    /// Releases the file handle. Later pulls return `Ok(None)`.
    pub fn close(&mut self) {
        if self.reader.take().is_some() {
            debug!("Closed {} after {} records", self.path, self.records_read);
        }
        if self.state == StreamState::Active {
            self.state = StreamState::Exhausted;
        }
    }

    fn fail(&mut self) {
        self.reader = None;
        self.state = StreamState::Failed;
    }

    /// Reads the next batch of at most `batch_size` rows.
    ///
    /// Returns `Ok(None)` once the file is exhausted, and on every call after
    /// that. Records that fail to decode are skipped and recorded; see
    /// [`VcfArrowStream::take_decode_errors`].
    ///
    /// # Errors
    ///
    /// Returns [`VcfArrowError::StreamIO`] if the file cannot be read further.
    /// The stream is unusable afterwards and returns [`VcfArrowError::Closed`].
    pub fn next_batch(&mut self) -> Result<Option<RecordBatch>> {
        match self.state {
            StreamState::Exhausted => return Ok(None),
            StreamState::Failed => return Err(VcfArrowError::Closed),
            StreamState::Active => {}
        }

        while self.builder.len() < self.batch_size {
            let Some(reader) = self.reader.as_mut() else {
                self.state = StreamState::Exhausted;
                break;
            };
            match reader.read_record(&mut self.record) {
                Ok(0) => {
                    debug!(
                        "Reached end of {} after {} records ({} skipped)",
                        self.path, self.records_read, self.skipped
                    );
                    self.close();
                    break;
                }
                Ok(_) => self.records_read += 1,
                Err(source) => {
                    let record_number = self.records_read;
                    self.fail();
                    return Err(VcfArrowError::StreamIO {
                        record_number,
                        source,
                    });
                }
            }

            let result =
                self.decoder
                    .decode(self.record.as_record(), &self.header, self.records_read);
            let decoded = match result {
                Ok(decoded) => decoded,
                Err(e) => {
                    warn!("Skipping {}", e);
                    self.skipped += 1;
                    self.decode_errors.push(e);
                    continue;
                }
            };

            if let Some(region) = &self.region {
                if !region.overlaps(&decoded.chrom, decoded.pos as u64, decoded.end as u64) {
                    continue;
                }
            }

            if let Err(e) = self.builder.append(&decoded) {
                self.fail();
                return Err(e.into());
            }
        }

        if self.builder.is_empty() {
            return Ok(None);
        }
        match self.builder.finish() {
            Ok(batch) => {
                debug!("Emitting batch of {} rows from {}", batch.num_rows(), self.path);
                Ok(Some(batch))
            }
            Err(e) => {
                self.fail();
                Err(e.into())
            }
        }
    }
}

impl Iterator for VcfArrowStream {
    type Item = std::result::Result<RecordBatch, ArrowError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_batch() {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => None,
            // A failed stream ends the iterator after reporting its error once.
            Err(VcfArrowError::Closed) => None,
            Err(e) => Some(Err(e.into())),
        }
    }
}

impl RecordBatchReader for VcfArrowStream {
    fn schema(&self) -> SchemaRef {
        self.schema.schema()
    }
}
