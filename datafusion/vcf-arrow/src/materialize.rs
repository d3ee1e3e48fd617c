use crate::error::{Result, VcfArrowError};
use crate::options::VcfReadOptions;
use crate::stream::VcfArrowStream;
use datafusion::arrow::array::RecordBatch;
use datafusion::arrow::compute::concat_batches;
use log::info;
use std::path::Path;

/// Reads a whole file into a single in-memory RecordBatch.
///
/// Rows appear in file order. Records that fail to decode are skipped exactly
/// as in streaming; any other failure discards everything read so far.
///
/// # Errors
///
/// Returns [`VcfArrowError::Materialization`] wrapping the cause
pub fn vcf_to_arrow<P: AsRef<Path>>(path: P, options: VcfReadOptions) -> Result<RecordBatch> {
    materialize(path.as_ref(), options).map_err(VcfArrowError::materialization)
}

fn materialize(path: &Path, options: VcfReadOptions) -> Result<RecordBatch> {
    let mut stream = VcfArrowStream::open(path, options)?;
    let schema = stream.schema();
    let mut batches = Vec::new();
    while let Some(batch) = stream.next_batch()? {
        batches.push(batch);
    }
    stream.close();

    let table = concat_batches(&schema, &batches)?;
    info!(
        "Materialized {} rows from {} ({} records skipped)",
        table.num_rows(),
        path.display(),
        stream.skipped_records()
    );
    Ok(table)
}
