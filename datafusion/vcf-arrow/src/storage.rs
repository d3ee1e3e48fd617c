use crate::error::{Result, VcfArrowError};
use crate::options::VcfReadOptions;
use crate::region::GenomicRegion;
use crate::schema::{
    format_number_to_string, format_type_to_string, info_number_to_string, info_type_to_string,
};
use datafusion::arrow::array::{RecordBatch, StringBuilder};
use datafusion::arrow::datatypes::{DataType, Field, Schema};
use datafusion_vcf_arrow_core::compression::{CompressionType, get_compression_type};
use flate2::read::MultiGzDecoder;
use log::debug;
use noodles::bcf;
use noodles::bgzf;
use noodles::bgzf::VirtualPosition;
use noodles::bgzf::io::Seek as _;
use noodles::core::Position;
use noodles::core::region::Interval;
use noodles::csi::{self, BinningIndex};
use noodles::csi::binning_index::index::reference_sequence::bin::Chunk;
use noodles::tabix;
use noodles::vcf;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::vec;

const BCF_MAGIC: &[u8] = b"BCF";

/// Unified reader for local VCF and BCF files with multiple compression format support.
///
/// The variant is chosen from the file content, not its extension.
pub enum VcfLocalReader {
    /// BGZF-compressed VCF, single-threaded decompression
    BGZF(vcf::io::Reader<bgzf::Reader<File>>),
    /// BGZF-compressed VCF with worker threads for decompression
    BGZFThreaded(vcf::io::Reader<bgzf::MultithreadedReader<File>>),
    /// GZIP-compressed VCF (single or multi-member)
    GZIP(vcf::io::Reader<BufReader<MultiGzDecoder<File>>>),
    /// Uncompressed VCF
    PLAIN(vcf::io::Reader<BufReader<File>>),
    /// BGZF-compressed BCF
    BCF(bcf::io::Reader<bgzf::Reader<File>>),
    /// BGZF-compressed VCF read through a TBI/CSI index
    IndexedVCF(vcf::io::Reader<ChunkReader>),
    /// BCF read through a CSI index
    IndexedBCF(bcf::io::Reader<ChunkReader>),
}

/// BGZF reader limited to the index chunks that may hold records of one region.
///
/// Bytes past the end of a chunk are never returned, so only records whose
/// chunks the index lists are decoded.
pub struct ChunkReader {
    inner: bgzf::Reader<File>,
    chunks: vec::IntoIter<Chunk>,
    chunk_end: Option<VirtualPosition>,
}

impl ChunkReader {
    fn new(inner: bgzf::Reader<File>, chunks: Vec<Chunk>) -> Self {
        Self {
            inner,
            chunks: chunks.into_iter(),
            chunk_end: None,
        }
    }

    /// Readable bytes left in the current chunk, seeking to the next chunk when
    /// it is used up. 0 means every chunk has been read.
    fn available(&mut self) -> io::Result<usize> {
        loop {
            let Some(end) = self.chunk_end else {
                match self.chunks.next() {
                    Some(chunk) => {
                        self.inner.seek_to_virtual_position(chunk.start())?;
                        self.chunk_end = Some(chunk.end());
                        continue;
                    }
                    None => return Ok(0),
                }
            };

            let len = self.inner.fill_buf()?.len();
            let position = self.inner.virtual_position();
            if len == 0 || position >= end {
                self.chunk_end = None;
                continue;
            }
            if position.compressed() == end.compressed() {
                let left = usize::from(end.uncompressed() - position.uncompressed());
                return Ok(len.min(left));
            }
            return Ok(len);
        }
    }
}

impl BufRead for ChunkReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        let available = self.available()?;
        if available == 0 {
            return Ok(&[]);
        }
        let buf = self.inner.fill_buf()?;
        Ok(&buf[..available])
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt);
    }
}

impl Read for ChunkReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = {
            let src = self.fill_buf()?;
            let n = src.len().min(buf.len());
            buf[..n].copy_from_slice(&src[..n]);
            n
        };
        self.consume(n);
        Ok(n)
    }
}

/// Reusable record buffer matching the reader it was created for.
pub enum VariantRecord {
    /// Text VCF record
    Vcf(vcf::Record),
    /// Binary BCF record
    Bcf(bcf::Record),
}

impl VariantRecord {
    /// Borrows the record through the format-independent record trait.
    pub fn as_record(&self) -> &dyn vcf::variant::Record {
        match self {
            VariantRecord::Vcf(record) => record,
            VariantRecord::Bcf(record) => record,
        }
    }
}

/// Finds the index for a region query: the explicit path, else `<path>.tbi`
/// (VCF only) or `<path>.csi` next to the input.
fn find_index(file_path: &str, explicit: Option<&str>, is_bcf: bool) -> Option<String> {
    if let Some(index_path) = explicit {
        return Some(index_path.to_string());
    }
    let extensions: &[&str] = if is_bcf { &["csi"] } else { &["tbi", "csi"] };
    extensions
        .iter()
        .map(|ext| format!("{file_path}.{ext}"))
        .find(|candidate| Path::new(candidate).is_file())
}

fn load_index(index_path: &str) -> io::Result<Box<dyn BinningIndex>> {
    if index_path.ends_with(".csi") {
        Ok(Box::new(csi::read(index_path)?))
    } else {
        Ok(Box::new(tabix::read(index_path)?))
    }
}

/// Position of `name` in the reference sequence list the index was built with.
fn reference_sequence_id(
    index: &dyn BinningIndex,
    header: &vcf::Header,
    is_bcf: bool,
    name: &str,
) -> Option<usize> {
    if is_bcf {
        return header.string_maps().contigs().get_index_of(name);
    }
    match index.header() {
        Some(index_header) => index_header
            .reference_sequence_names()
            .get_index_of(name.as_bytes()),
        None => header.contigs().get_index_of(name),
    }
}

fn region_interval(region: &GenomicRegion) -> Result<Interval> {
    let position = |p: u64| {
        usize::try_from(p)
            .ok()
            .and_then(Position::new)
            .ok_or_else(|| VcfArrowError::InvalidOption(format!("region {region}: bad position")))
    };
    let interval = match (region.start, region.end) {
        (Some(start), Some(end)) => Interval::from(position(start)?..=position(end)?),
        (Some(start), None) => Interval::from(position(start)?..),
        (None, Some(end)) => Interval::from(..=position(end)?),
        (None, None) => Interval::from(..),
    };
    Ok(interval)
}

fn open_file(file_path: &str) -> Result<File> {
    File::open(file_path).map_err(|source| VcfArrowError::Open {
        path: file_path.to_string(),
        source,
    })
}

/// Returns true if the decompressed content of a BGZF file starts with the BCF magic.
fn is_bgzf_bcf(file_path: &str) -> Result<bool> {
    let mut reader = bgzf::Reader::new(open_file(file_path)?);
    let buf = reader.fill_buf().map_err(|source| VcfArrowError::Open {
        path: file_path.to_string(),
        source,
    })?;
    Ok(buf.starts_with(BCF_MAGIC))
}

fn starts_with_bcf_magic(file_path: &str) -> Result<bool> {
    let mut reader = BufReader::new(open_file(file_path)?);
    let buf = reader.fill_buf().map_err(|source| VcfArrowError::Open {
        path: file_path.to_string(),
        source,
    })?;
    Ok(buf.starts_with(BCF_MAGIC))
}

impl VcfLocalReader {
    /// Opens a local VCF/BCF file, detecting compression and format from its content.
    ///
    /// # Arguments
    ///
    /// * `file_path` - Path to the local file
    /// * `options` - Read options; `compression` and `threads` are used here
    ///
    /// # Errors
    ///
    /// Returns [`VcfArrowError::Open`] if the file cannot be opened and
    /// [`VcfArrowError::Schema`] for uncompressed BCF
    pub fn new(file_path: &str, options: &VcfReadOptions) -> Result<Self> {
        let compression_type =
            get_compression_type(file_path, options.compression).map_err(|source| {
                VcfArrowError::Open {
                    path: file_path.to_string(),
                    source,
                }
            })?;
        debug!(
            "Opening {} with compression {:?}",
            file_path, compression_type
        );

        match compression_type {
            CompressionType::BGZF if is_bgzf_bcf(file_path)? => {
                if options.threads.is_some_and(|t| t > 1) {
                    debug!("Multithreaded decompression is not used for BCF input");
                }
                Ok(VcfLocalReader::BCF(bcf::io::Reader::new(open_file(
                    file_path,
                )?)))
            }
            CompressionType::BGZF => match options.threads.and_then(NonZeroUsize::new) {
                Some(worker_count) if worker_count.get() > 1 => {
                    debug!(
                        "Reading VCF file from local storage with {} threads",
                        worker_count
                    );
                    let inner = bgzf::MultithreadedReader::with_worker_count(
                        worker_count,
                        open_file(file_path)?,
                    );
                    Ok(VcfLocalReader::BGZFThreaded(vcf::io::Reader::new(inner)))
                }
                _ => Ok(VcfLocalReader::BGZF(vcf::io::Reader::new(
                    bgzf::Reader::new(open_file(file_path)?),
                ))),
            },
            CompressionType::GZIP => {
                let inner = BufReader::new(MultiGzDecoder::new(open_file(file_path)?));
                Ok(VcfLocalReader::GZIP(vcf::io::Reader::new(inner)))
            }
            CompressionType::NONE | CompressionType::AUTO => {
                if starts_with_bcf_magic(file_path)? {
                    return Err(VcfArrowError::Schema(format!(
                        "{file_path}: uncompressed BCF is not supported"
                    )));
                }
                Ok(VcfLocalReader::PLAIN(vcf::io::Reader::new(BufReader::new(
                    open_file(file_path)?,
                ))))
            }
        }
    }

    /// Returns true for BCF input.
    pub fn is_bcf(&self) -> bool {
        matches!(self, VcfLocalReader::BCF(_) | VcfLocalReader::IndexedBCF(_))
    }

    /// Returns true if the reader goes through a TBI/CSI index.
    pub fn is_indexed(&self) -> bool {
        matches!(
            self,
            VcfLocalReader::IndexedVCF(_) | VcfLocalReader::IndexedBCF(_)
        )
    }

    /// Opens a reader over only the index chunks that may overlap `region`.
    ///
    /// Returns `Ok(None)` when no index is given or found next to the input,
    /// or the input is not BGZF-compressed; the caller then filters while
    /// streaming. Records in the chunks may still fall outside the region.
    ///
    /// # Errors
    ///
    /// Returns [`VcfArrowError::Open`] if the index or the input cannot be
    /// read and [`VcfArrowError::InvalidOption`] if an explicit index is given
    /// for input that cannot be indexed
    pub fn for_region(
        &self,
        file_path: &str,
        header: &vcf::Header,
        region: &GenomicRegion,
        options: &VcfReadOptions,
    ) -> Result<Option<Self>> {
        let bgzf_input = matches!(
            self,
            VcfLocalReader::BGZF(_) | VcfLocalReader::BGZFThreaded(_) | VcfLocalReader::BCF(_)
        );
        if !bgzf_input {
            if let Some(index_path) = &options.index {
                return Err(VcfArrowError::InvalidOption(format!(
                    "index {index_path} requires BGZF-compressed input"
                )));
            }
            return Ok(None);
        }

        let is_bcf = self.is_bcf();
        let Some(index_path) = find_index(file_path, options.index.as_deref(), is_bcf) else {
            debug!("No index for {}; filtering {} while streaming", file_path, region);
            return Ok(None);
        };
        let index = load_index(&index_path).map_err(|source| VcfArrowError::Open {
            path: index_path.clone(),
            source,
        })?;

        let chunks = match reference_sequence_id(index.as_ref(), header, is_bcf, &region.chrom) {
            Some(id) => index
                .query(id, region_interval(region)?)
                .map_err(|e| VcfArrowError::InvalidOption(format!("region {region}: {e}")))?,
            None => Vec::new(),
        };
        if matches!(self, VcfLocalReader::BGZFThreaded(_)) {
            debug!("Indexed reads of {} use single-threaded decompression", file_path);
        }
        debug!(
            "Reading {} chunks of {} for region {} via {}",
            chunks.len(),
            file_path,
            region,
            index_path
        );

        let inner = ChunkReader::new(bgzf::Reader::new(open_file(file_path)?), chunks);
        Ok(Some(if is_bcf {
            VcfLocalReader::IndexedBCF(bcf::io::Reader::from(inner))
        } else {
            VcfLocalReader::IndexedVCF(vcf::io::Reader::new(inner))
        }))
    }

    /// Reads the header, leaving the cursor at the first data record.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the header is malformed or unreadable
    pub fn read_header(&mut self) -> io::Result<vcf::Header> {
        match self {
            VcfLocalReader::BGZF(reader) => reader.read_header(),
            VcfLocalReader::BGZFThreaded(reader) => reader.read_header(),
            VcfLocalReader::GZIP(reader) => reader.read_header(),
            VcfLocalReader::PLAIN(reader) => reader.read_header(),
            VcfLocalReader::BCF(reader) => reader.read_header(),
            VcfLocalReader::IndexedVCF(_) | VcfLocalReader::IndexedBCF(_) => Err(
                io::Error::other("indexed readers start past the header"),
            ),
        }
    }

    /// Creates an empty record buffer of the right kind for this reader.
    pub fn new_record(&self) -> VariantRecord {
        match self {
            VcfLocalReader::BCF(_) | VcfLocalReader::IndexedBCF(_) => {
                VariantRecord::Bcf(bcf::Record::default())
            }
            _ => VariantRecord::Vcf(vcf::Record::default()),
        }
    }

    /// Reads the next record into `record`.
    ///
    /// Returns the number of bytes read; 0 means end of file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the record cannot be framed or the buffer
    /// does not belong to this reader
    pub fn read_record(&mut self, record: &mut VariantRecord) -> io::Result<usize> {
        match (self, record) {
            (VcfLocalReader::BGZF(reader), VariantRecord::Vcf(record)) => {
                reader.read_record(record)
            }
            (VcfLocalReader::BGZFThreaded(reader), VariantRecord::Vcf(record)) => {
                reader.read_record(record)
            }
            (VcfLocalReader::GZIP(reader), VariantRecord::Vcf(record)) => {
                reader.read_record(record)
            }
            (VcfLocalReader::PLAIN(reader), VariantRecord::Vcf(record)) => {
                reader.read_record(record)
            }
            (VcfLocalReader::IndexedVCF(reader), VariantRecord::Vcf(record)) => {
                reader.read_record(record)
            }
            (VcfLocalReader::BCF(reader), VariantRecord::Bcf(record)) => reader.read_record(record),
            (VcfLocalReader::IndexedBCF(reader), VariantRecord::Bcf(record)) => {
                reader.read_record(record)
            }
            _ => Err(io::Error::other(
                "record buffer does not match the reader format",
            )),
        }
    }
}

/// Opens a file and reads only its header.
///
/// # Errors
///
/// Returns [`VcfArrowError::Open`] or [`VcfArrowError::Schema`]
pub fn get_local_vcf_header(file_path: &str, options: &VcfReadOptions) -> Result<vcf::Header> {
    let mut reader = VcfLocalReader::new(file_path, options)?;
    reader
        .read_header()
        .map_err(|e| VcfArrowError::Schema(format!("{file_path}: invalid header: {e}")))
}

/// Lists every INFO and FORMAT declaration of a header as a RecordBatch.
///
/// Columns: `category` (INFO or FORMAT), `name`, `number`, `type`, `description`.
///
/// # Errors
///
/// Returns an error if the batch cannot be assembled
pub fn describe_header(header: &vcf::Header) -> Result<RecordBatch> {
    let mut categories = StringBuilder::new();
    let mut names = StringBuilder::new();
    let mut numbers = StringBuilder::new();
    let mut types = StringBuilder::new();
    let mut descriptions = StringBuilder::new();

    for (name, info) in header.infos() {
        categories.append_value("INFO");
        names.append_value(name);
        numbers.append_value(info_number_to_string(info.number()));
        types.append_value(info_type_to_string(&info.ty()));
        descriptions.append_value(info.description());
    }
    for (name, format) in header.formats() {
        categories.append_value("FORMAT");
        names.append_value(name);
        numbers.append_value(format_number_to_string(format.number()));
        types.append_value(format_type_to_string(&format.ty()));
        descriptions.append_value(format.description());
    }

    let schema = Schema::new(vec![
        Field::new("category", DataType::Utf8, false),
        Field::new("name", DataType::Utf8, false),
        Field::new("number", DataType::Utf8, false),
        Field::new("type", DataType::Utf8, false),
        Field::new("description", DataType::Utf8, false),
    ]);
    Ok(RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(categories.finish()),
            Arc::new(names.finish()),
            Arc::new(numbers.finish()),
            Arc::new(types.finish()),
            Arc::new(descriptions.finish()),
        ],
    )?)
}

/// Reads the header of a file and describes its INFO/FORMAT declarations.
///
/// ```rust,no_run
/// use datafusion_vcf_arrow::storage::describe_vcf;
///
/// # fn example() -> datafusion_vcf_arrow::Result<()> {
/// let fields = describe_vcf("data/variants.vcf.gz")?;
/// println!("{} declared fields", fields.num_rows());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`VcfArrowError::Open`] or [`VcfArrowError::Schema`]
pub fn describe_vcf<P: AsRef<Path>>(file_path: P) -> Result<RecordBatch> {
    let file_path = file_path.as_ref().to_string_lossy();
    let header = get_local_vcf_header(&file_path, &VcfReadOptions::default())?;
    describe_header(&header)
}
