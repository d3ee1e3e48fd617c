mod common;

use common::{SAMPLE_RECORDS, SAMPLE_VCF, create_test_vcf_file};
use datafusion::arrow::array::{Array, AsArray, StructArray};
use datafusion_vcf_arrow::{VcfArrowStream, VcfReadOptions, vcf_to_arrow};
use noodles::bcf;
use noodles::vcf;
use noodles::vcf::variant::io::Write as _;
use tempfile::NamedTempFile;

/// [`SAMPLE_VCF`] with its bare `.` sample column written out per FORMAT key
/// for the BCF encoder.
fn bcf_source() -> String {
    SAMPLE_VCF.replace("\t.\t0|1:7:3,4", "\t./.:.:.\t0|1:7:3,4")
}

fn create_test_bcf_file() -> std::io::Result<NamedTempFile> {
    let source = bcf_source();
    let mut reader = vcf::io::Reader::new(source.as_bytes());
    let header = reader.read_header()?;

    let file = tempfile::Builder::new().suffix(".bcf").tempfile()?;
    let mut writer = bcf::io::Writer::new(file.reopen()?);
    writer.write_header(&header)?;
    for result in reader.records() {
        let record = result?;
        writer.write_variant_record(&header, &record)?;
    }
    drop(writer);
    Ok(file)
}

#[test]
fn test_bcf_matches_vcf() -> std::io::Result<()> {
    let vcf_file = create_test_vcf_file()?;
    let bcf_file = create_test_bcf_file()?;
    let options = VcfReadOptions::default().with_batch_size(4);

    let expected = vcf_to_arrow(vcf_file.path(), options.clone()).unwrap();
    let actual = vcf_to_arrow(bcf_file.path(), options).unwrap();

    assert_eq!(actual.num_rows(), SAMPLE_RECORDS);
    assert_eq!(actual.schema().fields().len(), expected.schema().fields().len());
    for (a, e) in actual.schema().fields().iter().zip(expected.schema().fields()) {
        assert_eq!(a.name(), e.name());
        assert_eq!(a.is_nullable(), e.is_nullable());
    }
    for column in [
        "CHROM", "POS", "ID", "REF", "ALT", "QUAL", "FILTER", "DP", "AF", "DB",
    ] {
        assert_eq!(
            actual.column_by_name(column).unwrap().as_ref(),
            expected.column_by_name(column).unwrap().as_ref(),
            "{column}"
        );
    }

    let sample = |batch: &datafusion::arrow::array::RecordBatch| -> String {
        let hg00096 = batch
            .column_by_name("HG00096")
            .unwrap()
            .as_any()
            .downcast_ref::<StructArray>()
            .unwrap()
            .clone();
        hg00096
            .column_by_name("GT")
            .unwrap()
            .as_string::<i32>()
            .value(0)
            .to_string()
    };
    assert_eq!(sample(&actual), "0|1");
    assert_eq!(sample(&actual), sample(&expected));

    // A sample with nothing called is null in both encodings.
    let hg00097 = actual.column_by_name("HG00097").unwrap().as_struct();
    assert!(hg00097.is_null(8));
    assert!(!hg00097.is_null(7));
    Ok(())
}

#[test]
fn test_bcf_stream_reports_samples() -> std::io::Result<()> {
    let bcf_file = create_test_bcf_file()?;
    let options = VcfReadOptions::default()
        .with_samples(vec!["HG00097".to_string()])
        .with_region("1:30000-50000");
    let mut stream = VcfArrowStream::open(bcf_file.path(), options).unwrap();

    assert_eq!(stream.sample_names(), vec!["HG00097"]);
    let batch = stream.next_batch().unwrap().unwrap();
    assert_eq!(batch.num_rows(), 3);
    assert!(stream.next_batch().unwrap().is_none());
    Ok(())
}
