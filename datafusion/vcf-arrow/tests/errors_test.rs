mod common;

use common::{create_test_vcf_file, write_vcf};
use datafusion_vcf_arrow::{
    VcfArrowError, VcfArrowStream, VcfReadOptions, VcfTableProvider, describe_vcf,
};

fn open_err(path: &std::path::Path, options: VcfReadOptions) -> VcfArrowError {
    VcfArrowStream::open(path, options)
        .err()
        .expect("open should fail")
}

#[test]
fn test_missing_file() {
    let err = VcfArrowStream::open("/nonexistent/input.vcf", VcfReadOptions::default())
        .err()
        .unwrap();
    assert!(matches!(err, VcfArrowError::Open { .. }));
    assert!(err.is_fatal());
}

#[test]
fn test_zero_batch_size() -> std::io::Result<()> {
    let file = create_test_vcf_file()?;
    let err = open_err(file.path(), VcfReadOptions::default().with_batch_size(0));
    assert!(matches!(err, VcfArrowError::InvalidOption(_)));
    Ok(())
}

#[test]
fn test_invalid_region() -> std::io::Result<()> {
    let file = create_test_vcf_file()?;
    let err = open_err(file.path(), VcfReadOptions::default().with_region("1:500-100"));
    assert!(matches!(err, VcfArrowError::InvalidOption(_)));
    Ok(())
}

#[test]
fn test_unknown_sample() -> std::io::Result<()> {
    let file = create_test_vcf_file()?;
    let options = VcfReadOptions::default().with_samples(vec!["NA12878".to_string()]);
    let err = open_err(file.path(), options);
    assert!(matches!(err, VcfArrowError::Schema(_)));
    Ok(())
}

#[test]
fn test_duplicate_sample() -> std::io::Result<()> {
    let file = create_test_vcf_file()?;
    let options = VcfReadOptions::default()
        .with_samples(vec!["HG00096".to_string(), "HG00096".to_string()]);
    let err = open_err(file.path(), options);
    assert!(matches!(err, VcfArrowError::Schema(_)));
    Ok(())
}

#[test]
fn test_unknown_info_and_format_fields() -> std::io::Result<()> {
    let file = create_test_vcf_file()?;

    let options = VcfReadOptions::default().with_info_fields(vec!["MQ".to_string()]);
    assert!(matches!(
        open_err(file.path(), options),
        VcfArrowError::Schema(_)
    ));

    let options = VcfReadOptions::default().with_format_fields(vec!["GQ".to_string()]);
    assert!(matches!(
        open_err(file.path(), options),
        VcfArrowError::Schema(_)
    ));
    Ok(())
}

#[test]
fn test_invalid_header() -> std::io::Result<()> {
    let file = write_vcf("this is not a VCF file\n")?;
    let err = open_err(file.path(), VcfReadOptions::default());
    assert!(matches!(err, VcfArrowError::Schema(_)));
    Ok(())
}

#[test]
fn test_info_column_renamed_on_collision() -> std::io::Result<()> {
    let content = concat!(
        "##fileformat=VCFv4.3\n",
        "##INFO=<ID=POS,Number=1,Type=Integer,Description=\"Shadowing POS\">\n",
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n",
        "1\t100\t.\tA\tG\t50\tPASS\tPOS=7\n",
    );
    let file = write_vcf(content)?;
    let stream = VcfArrowStream::open(file.path(), VcfReadOptions::default()).unwrap();
    assert!(stream.schema().field_with_name("INFO_POS").is_ok());
    Ok(())
}

#[test]
fn test_table_provider_rejects_bad_options() -> std::io::Result<()> {
    let file = create_test_vcf_file()?;
    let path = file.path().to_string_lossy().into_owned();
    assert!(VcfTableProvider::new(path.clone(), VcfReadOptions::default()).is_ok());
    assert!(
        VcfTableProvider::new(path, VcfReadOptions::default().with_batch_size(0)).is_err()
    );
    Ok(())
}

#[test]
fn test_describe_vcf() -> std::io::Result<()> {
    use datafusion::arrow::array::AsArray;

    let file = create_test_vcf_file()?;
    let fields = describe_vcf(file.path()).unwrap();
    assert_eq!(fields.num_rows(), 6);

    let category = fields.column(0).as_string::<i32>();
    let name = fields.column(1).as_string::<i32>();
    let number = fields.column(2).as_string::<i32>();
    assert_eq!(category.value(0), "INFO");
    assert_eq!(name.value(0), "DP");
    assert_eq!(number.value(1), "A");
    assert_eq!(category.value(5), "FORMAT");
    assert_eq!(name.value(5), "AD");
    assert_eq!(number.value(5), "R");
    Ok(())
}
