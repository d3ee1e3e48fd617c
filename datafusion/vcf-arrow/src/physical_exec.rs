use crate::error::VcfArrowError;
use crate::options::VcfReadOptions;
use crate::stream::VcfArrowStream;
use datafusion::arrow::array::RecordBatch;
use datafusion::arrow::datatypes::SchemaRef;
use datafusion::arrow::error::ArrowError;
use datafusion::common::DataFusionError;
use datafusion::physical_plan::stream::RecordBatchStreamAdapter;
use datafusion::physical_plan::{DisplayAs, DisplayFormatType, ExecutionPlan, PlanProperties};
use datafusion_execution::{SendableRecordBatchStream, TaskContext};
use futures::channel::mpsc::Sender;
use futures::executor::block_on;
use futures::{SinkExt, StreamExt};
use log::{debug, info};
use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Physical scan of one VCF/BCF file through [`VcfArrowStream`].
///
/// The stream runs on a dedicated thread and hands batches over a bounded
/// channel, so decoding never blocks the async executor.
pub struct VcfExec {
    pub(crate) file_path: String,
    pub(crate) options: VcfReadOptions,
    /// Projected output schema
    pub(crate) schema: SchemaRef,
    pub(crate) projection: Option<Vec<usize>>,
    pub(crate) cache: PlanProperties,
    pub(crate) limit: Option<usize>,
}

impl Debug for VcfExec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VcfExec")
            .field("file_path", &self.file_path)
            .field("projection", &self.projection)
            .field("limit", &self.limit)
            .finish()
    }
}

impl DisplayAs for VcfExec {
    fn fmt_as(&self, _t: DisplayFormatType, f: &mut Formatter) -> std::fmt::Result {
        let proj_str = match &self.projection {
            Some(_) => self
                .schema
                .fields()
                .iter()
                .map(|f| f.name().as_str())
                .collect::<Vec<_>>()
                .join(", "),
            None => "*".to_string(),
        };
        write!(f, "VcfArrowExec: projection=[{}]", proj_str)?;
        if let Some(limit) = self.limit {
            write!(f, ", limit={}", limit)?;
        }
        Ok(())
    }
}

/// Applies the projection and the remaining row limit to one batch.
fn shape_batch(
    batch: RecordBatch,
    projection: Option<&Vec<usize>>,
    remaining: Option<usize>,
) -> Result<RecordBatch, ArrowError> {
    let batch = match projection {
        Some(indices) => batch.project(indices)?,
        None => batch,
    };
    Ok(match remaining {
        Some(remaining) if remaining < batch.num_rows() => batch.slice(0, remaining),
        _ => batch,
    })
}

/// Drives a stream to the end (or the limit) and sends every batch.
fn scan_to_channel(
    file_path: &str,
    options: VcfReadOptions,
    projection: Option<&Vec<usize>>,
    limit: Option<usize>,
    tx: &mut Sender<Result<RecordBatch, ArrowError>>,
) -> Result<(), VcfArrowError> {
    let mut stream = VcfArrowStream::open(file_path, options)?;
    let mut remaining = limit;
    let mut rows = 0usize;
    while remaining != Some(0) {
        let Some(batch) = stream.next_batch()? else {
            break;
        };
        let batch = shape_batch(batch, projection, remaining)?;
        rows += batch.num_rows();
        remaining = remaining.map(|r| r - batch.num_rows());
        if block_on(tx.send(Ok(batch))).is_err() {
            debug!("Receiver dropped; stopping scan of {}", file_path);
            break;
        }
    }
    stream.close();
    debug!(
        "VCF scan of {}: {} rows, {} records skipped",
        file_path,
        rows,
        stream.skipped_records()
    );
    Ok(())
}

impl ExecutionPlan for VcfExec {
    fn name(&self) -> &str {
        "VcfArrowExec"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn properties(&self) -> &PlanProperties {
        &self.cache
    }

    fn children(&self) -> Vec<&Arc<dyn ExecutionPlan>> {
        vec![]
    }

    fn with_new_children(
        self: Arc<Self>,
        _children: Vec<Arc<dyn ExecutionPlan>>,
    ) -> datafusion::common::Result<Arc<dyn ExecutionPlan>> {
        Ok(self)
    }

    fn execute(
        &self,
        partition: usize,
        context: Arc<TaskContext>,
    ) -> datafusion::common::Result<SendableRecordBatchStream> {
        info!(
            "{}: executing partition={} for {}",
            self.name(),
            partition,
            self.file_path
        );
        let batch_size = context.session_config().batch_size();
        let options = self.options.clone().with_batch_size(batch_size);
        let file_path = self.file_path.clone();
        let projection = self.projection.clone();
        let limit = self.limit;

        let (mut tx, rx) = futures::channel::mpsc::channel::<Result<RecordBatch, ArrowError>>(2);

        std::thread::spawn(move || {
            if let Err(e) =
                scan_to_channel(&file_path, options, projection.as_ref(), limit, &mut tx)
            {
                let _ = block_on(tx.send(Err(ArrowError::from(e))));
            }
        });

        let stream =
            rx.map(|item| item.map_err(|e| DataFusionError::ArrowError(Box::new(e), None)));
        Ok(Box::pin(RecordBatchStreamAdapter::new(
            self.schema.clone(),
            stream,
        )))
    }
}
