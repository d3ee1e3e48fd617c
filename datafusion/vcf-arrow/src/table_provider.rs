use crate::options::VcfReadOptions;
use crate::physical_exec::VcfExec;
use crate::region::GenomicRegion;
use crate::schema::VcfSchema;
use crate::storage::get_local_vcf_header;
use async_trait::async_trait;
use datafusion::arrow::datatypes::{Field, Schema, SchemaRef};
use datafusion::catalog::{Session, TableProvider};
use datafusion::datasource::TableType;
use datafusion::logical_expr::{Expr, TableProviderFilterPushDown};
use datafusion::physical_expr::{EquivalenceProperties, Partitioning};
use datafusion::physical_plan::{
    ExecutionPlan, PlanProperties,
    execution_plan::{Boundedness, EmissionType},
};
use log::debug;
use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

/// DataFusion table over one VCF/BCF file.
///
/// The schema is derived from the header when the provider is created. Scans
/// decode the whole file sequentially; predicates are evaluated by DataFusion
/// after decoding.
///
/// ```rust,no_run
/// use datafusion::prelude::SessionContext;
/// use datafusion_vcf_arrow::{VcfReadOptions, VcfTableProvider};
/// use std::sync::Arc;
///
/// # async fn example() -> datafusion::error::Result<()> {
/// let ctx = SessionContext::new();
/// let provider = VcfTableProvider::new(
///     "data/variants.vcf.gz".to_string(),
///     VcfReadOptions::default(),
/// )?;
/// ctx.register_table("variants", Arc::new(provider))?;
/// let df = ctx.sql("SELECT \"CHROM\", COUNT(*) FROM variants GROUP BY \"CHROM\"").await?;
/// df.show().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct VcfTableProvider {
    /// Path to the VCF/BCF file
    file_path: String,
    /// Read options applied to every scan
    options: VcfReadOptions,
    /// Arrow schema derived from the header
    schema: SchemaRef,
}

impl VcfTableProvider {
    /// Creates a new VCF table provider.
    ///
    /// # Arguments
    ///
    /// * `file_path` - Path to the VCF/BCF file
    /// * `options` - Field/sample selection, region and decompression options
    ///
    /// # Errors
    ///
    /// Returns an error if the options are invalid, the file cannot be read,
    /// or the header does not contain the requested fields or samples
    pub fn new(file_path: String, options: VcfReadOptions) -> datafusion::common::Result<Self> {
        options.validate()?;
        let header = get_local_vcf_header(&file_path, &options)?;
        if let Some(region) = &options.region {
            GenomicRegion::resolve(region, |name| header.contigs().contains_key(name))?;
        }
        let schema = VcfSchema::from_header(&header, &options)?.schema();
        debug!(
            "VcfTableProvider for {} with {} columns",
            file_path,
            schema.fields().len()
        );
        Ok(Self {
            file_path,
            options,
            schema,
        })
    }
}

fn project_schema(schema: &SchemaRef, projection: Option<&Vec<usize>>) -> SchemaRef {
    match projection {
        Some(indices) => {
            let projected_fields: Vec<Field> =
                indices.iter().map(|&i| schema.field(i).clone()).collect();
            Arc::new(Schema::new_with_metadata(
                projected_fields,
                schema.metadata().clone(),
            ))
        }
        None => schema.clone(),
    }
}

#[async_trait]
impl TableProvider for VcfTableProvider {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn table_type(&self) -> TableType {
        TableType::Base
    }

    fn supports_filters_pushdown(
        &self,
        filters: &[&Expr],
    ) -> datafusion::common::Result<Vec<TableProviderFilterPushDown>> {
        Ok(vec![TableProviderFilterPushDown::Unsupported; filters.len()])
    }

    async fn scan(
        &self,
        _state: &dyn Session,
        projection: Option<&Vec<usize>>,
        _filters: &[Expr],
        limit: Option<usize>,
    ) -> datafusion::common::Result<Arc<dyn ExecutionPlan>> {
        debug!("VcfTableProvider::scan projection={:?}", projection);
        let schema = project_schema(&self.schema, projection);

        Ok(Arc::new(VcfExec {
            cache: PlanProperties::new(
                EquivalenceProperties::new(schema.clone()),
                Partitioning::UnknownPartitioning(1),
                EmissionType::Final,
                Boundedness::Bounded,
            ),
            file_path: self.file_path.clone(),
            options: self.options.clone(),
            schema,
            projection: projection.cloned(),
            limit,
        }))
    }
}
