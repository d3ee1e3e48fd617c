//! SQL over a VCF/BCF file exposed as the relation `vcf`.

use crate::error::{Result, VcfArrowError};
use crate::options::VcfReadOptions;
use crate::table_provider::VcfTableProvider;
use datafusion::arrow::array::RecordBatch;
use datafusion::arrow::compute::concat_batches;
use datafusion::common::DataFusionError;
use datafusion::prelude::{SessionConfig, SessionContext};
use log::debug;
use std::path::Path;
use std::sync::Arc;

/// Name under which [`vcf_query`] registers the file.
pub const VCF_TABLE_NAME: &str = "vcf";

/// Creates a session whose identifiers keep their case, so `CHROM` and `POS`
/// resolve without quoting.
pub fn create_vcf_session(batch_size: usize) -> SessionContext {
    let config = SessionConfig::new()
        .with_batch_size(batch_size)
        .set_bool("datafusion.sql_parser.enable_ident_normalization", false);
    SessionContext::new_with_config(config)
}

/// Registers a VCF/BCF file as a table of `ctx`.
///
/// # Errors
///
/// Returns the error raised while reading the header or registering the table
pub fn register_vcf<P: AsRef<Path>>(
    ctx: &SessionContext,
    table_name: &str,
    path: P,
    options: VcfReadOptions,
) -> Result<()> {
    let path = path.as_ref().to_string_lossy().into_owned();
    let provider = VcfTableProvider::new(path, options).map_err(vcf_error)?;
    ctx.register_table(table_name, Arc::new(provider))?;
    Ok(())
}

/// Recovers a converter error carried through DataFusion, if there is one.
fn find_vcf_error(err: DataFusionError) -> std::result::Result<VcfArrowError, DataFusionError> {
    use datafusion::arrow::error::ArrowError;

    match err {
        DataFusionError::External(source) => source
            .downcast::<VcfArrowError>()
            .map(|e| *e)
            .map_err(DataFusionError::External),
        DataFusionError::ArrowError(arrow, backtrace) => match *arrow {
            ArrowError::ExternalError(source) => source
                .downcast::<VcfArrowError>()
                .map(|e| *e)
                .map_err(|source| {
                    DataFusionError::ArrowError(
                        Box::new(ArrowError::ExternalError(source)),
                        backtrace,
                    )
                }),
            other => Err(DataFusionError::ArrowError(Box::new(other), backtrace)),
        },
        DataFusionError::Context(context, inner) => find_vcf_error(*inner)
            .map_err(|inner| DataFusionError::Context(context, Box::new(inner))),
        other => Err(other),
    }
}

fn vcf_error(err: DataFusionError) -> VcfArrowError {
    find_vcf_error(err).unwrap_or_else(VcfArrowError::DataFusion)
}

/// Runs `sql` against the file registered as `vcf` and collects the result.
///
/// # Errors
///
/// SQL planning errors are returned as [`VcfArrowError::DataFusion`]; failures
/// while reading the file as [`VcfArrowError::Materialization`]
pub async fn vcf_query_async<P: AsRef<Path>>(
    path: P,
    sql: &str,
    options: VcfReadOptions,
) -> Result<RecordBatch> {
    let ctx = create_vcf_session(options.batch_size);
    register_vcf(&ctx, VCF_TABLE_NAME, path, options)?;

    let df = ctx.sql(sql).await?;
    let schema = Arc::new(df.schema().as_arrow().clone());
    let batches = df.collect().await.map_err(|e| match find_vcf_error(e) {
        Ok(vcf) => VcfArrowError::materialization(vcf),
        Err(other) => VcfArrowError::DataFusion(other),
    })?;
    let schema = batches.first().map(|b| b.schema()).unwrap_or(schema);
    debug!("Query returned {} batches", batches.len());
    Ok(concat_batches(&schema, &batches)?)
}

/// Runs `sql` against the file registered as `vcf` on a private runtime.
///
/// ```rust,no_run
/// use datafusion_vcf_arrow::{VcfReadOptions, vcf_query};
///
/// # fn example() -> datafusion_vcf_arrow::Result<()> {
/// let counts = vcf_query(
///     "data/variants.vcf.gz",
///     "SELECT CHROM, COUNT(*) AS n FROM vcf GROUP BY CHROM",
///     VcfReadOptions::default(),
/// )?;
/// println!("{} contigs", counts.num_rows());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// See [`vcf_query_async`]; must not be called from inside an async runtime
pub fn vcf_query<P: AsRef<Path>>(
    path: P,
    sql: &str,
    options: VcfReadOptions,
) -> Result<RecordBatch> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(vcf_query_async(path, sql, options))
}
