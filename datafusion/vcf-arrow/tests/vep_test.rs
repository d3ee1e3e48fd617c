mod common;

use common::write_vcf;
use datafusion::arrow::array::{
    Array, AsArray, Float32Array, Int32Array, ListArray, StructArray,
};
use datafusion::arrow::datatypes::DataType;
use datafusion_vcf_arrow::{
    TranscriptMode, VcfArrowError, VcfArrowStream, VcfReadOptions, VepOptions, vcf_query,
};

const VEP_VCF: &str = concat!(
    "##fileformat=VCFv4.2\n",
    "##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Total Depth\">\n",
    "##INFO=<ID=CSQ,Number=.,Type=String,Description=\"Consequence annotations from Ensembl VEP. Format: Allele|Consequence|IMPACT|SYMBOL|DISTANCE|gnomADe_AF\">\n",
    "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n",
    "1\t100\t.\tA\tG\t50\tPASS\tDP=10;CSQ=G|missense_variant&splice_region_variant|MODERATE|GENE1||0.0012,G|upstream_gene_variant|MODIFIER|GENE2|3000|.\n",
    "1\t200\t.\tC\tT\t50\tPASS\tDP=3\n",
    "1\t300\t.\tG\tA\t50\tPASS\tCSQ=A|intron_variant|MODIFIER|GENE3\n",
);

fn vep_options(transcripts: TranscriptMode) -> VcfReadOptions {
    VcfReadOptions::default().with_vep(VepOptions {
        tag: None,
        columns: None,
        transcripts,
    })
}

#[test]
fn test_annotation_column() -> std::io::Result<()> {
    let file = write_vcf(VEP_VCF)?;
    let mut stream = VcfArrowStream::open(file.path(), vep_options(TranscriptMode::All)).unwrap();
    let schema = stream.schema();
    let vep_field = schema.field_with_name("VEP").unwrap();
    let DataType::List(item) = vep_field.data_type() else {
        panic!("VEP must be a list");
    };
    let DataType::Struct(children) = item.data_type() else {
        panic!("VEP items must be structs");
    };
    let names: Vec<&str> = children.iter().map(|f| f.name().as_str()).collect();
    assert_eq!(
        names,
        vec!["Allele", "Consequence", "IMPACT", "SYMBOL", "DISTANCE", "gnomADe_AF"]
    );

    let batch = stream.next_batch().unwrap().unwrap();
    assert_eq!(batch.num_rows(), 3);
    let vep = batch
        .column_by_name("VEP")
        .unwrap()
        .as_any()
        .downcast_ref::<ListArray>()
        .unwrap();

    assert_eq!(vep.value_length(0), 2);
    assert!(vep.is_null(1));
    assert_eq!(vep.value_length(2), 1);

    let first = vep.value(0);
    let transcripts = first.as_any().downcast_ref::<StructArray>().unwrap();
    let symbol = transcripts.column_by_name("SYMBOL").unwrap().as_string::<i32>();
    assert_eq!(symbol.value(0), "GENE1");
    assert_eq!(symbol.value(1), "GENE2");

    let consequence = transcripts
        .column_by_name("Consequence")
        .unwrap()
        .as_any()
        .downcast_ref::<ListArray>()
        .unwrap();
    assert_eq!(consequence.value_length(0), 2);

    let distance = transcripts
        .column_by_name("DISTANCE")
        .unwrap()
        .as_any()
        .downcast_ref::<Int32Array>()
        .unwrap();
    assert!(distance.is_null(0));
    assert_eq!(distance.value(1), 3000);

    let af = transcripts
        .column_by_name("gnomADe_AF")
        .unwrap()
        .as_any()
        .downcast_ref::<Float32Array>()
        .unwrap();
    assert!((af.value(0) - 0.0012).abs() < 1e-6);
    assert!(af.is_null(1));

    // Missing trailing sub-fields are null.
    let third = vep.value(2);
    let transcripts = third.as_any().downcast_ref::<StructArray>().unwrap();
    assert!(transcripts.column_by_name("DISTANCE").unwrap().is_null(0));
    Ok(())
}

#[test]
fn test_first_transcript_only() -> std::io::Result<()> {
    let file = write_vcf(VEP_VCF)?;
    let options = VcfReadOptions::default().with_vep(VepOptions {
        tag: Some("CSQ".to_string()),
        columns: Some(vec!["SYMBOL".to_string(), "IMPACT".to_string()]),
        transcripts: TranscriptMode::First,
    });
    let mut stream = VcfArrowStream::open(file.path(), options).unwrap();
    let batch = stream.next_batch().unwrap().unwrap();

    let vep = batch
        .column_by_name("VEP")
        .unwrap()
        .as_any()
        .downcast_ref::<ListArray>()
        .unwrap();
    assert_eq!(vep.value_length(0), 1);
    let first = vep.value(0);
    let transcripts = first.as_any().downcast_ref::<StructArray>().unwrap();
    assert_eq!(transcripts.num_columns(), 2);
    assert_eq!(transcripts.column(0).as_string::<i32>().value(0), "MODERATE");
    assert_eq!(transcripts.column(1).as_string::<i32>().value(0), "GENE1");
    Ok(())
}

#[test]
fn test_missing_annotation_tag() -> std::io::Result<()> {
    let file = write_vcf(VEP_VCF)?;
    let options = VcfReadOptions::default().with_vep(VepOptions {
        tag: Some("ANN".to_string()),
        ..VepOptions::default()
    });
    let err = VcfArrowStream::open(file.path(), options).err().unwrap();
    assert!(matches!(err, VcfArrowError::Schema(_)));
    Ok(())
}

#[test]
fn test_undeclared_annotation_is_skipped() -> std::io::Result<()> {
    let content = concat!(
        "##fileformat=VCFv4.2\n",
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n",
        "1\t100\t.\tA\tG\t50\tPASS\t.\n",
    );
    let file = write_vcf(content)?;
    let stream = VcfArrowStream::open(file.path(), vep_options(TranscriptMode::All)).unwrap();
    assert!(stream.schema().field_with_name("VEP").is_err());
    Ok(())
}

#[test]
fn test_query_annotation() -> std::io::Result<()> {
    let file = write_vcf(VEP_VCF)?;
    let result = vcf_query(
        file.path(),
        "SELECT POS FROM vcf WHERE VEP IS NOT NULL ORDER BY POS",
        vep_options(TranscriptMode::All),
    )
    .unwrap();
    assert_eq!(result.num_rows(), 2);
    Ok(())
}

#[test]
fn test_unparseable_annotation_numbers_keep_the_record() -> std::io::Result<()> {
    let content = concat!(
        "##fileformat=VCFv4.2\n",
        "##INFO=<ID=CSQ,Number=.,Type=String,Description=\"Consequence annotations from Ensembl VEP. Format: Allele|SYMBOL|AF|CANONICAL\">\n",
        "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n",
        "1\t100\t.\tA\tG\t50\tPASS\tCSQ=G|GENE1|0.1&0.2|YES\n",
        "1\t200\t.\tC\tT\t50\tPASS\tCSQ=T|GENE2|0.5|1\n",
    );
    let file = write_vcf(content)?;
    let mut stream = VcfArrowStream::open(file.path(), vep_options(TranscriptMode::All)).unwrap();
    let batch = stream.next_batch().unwrap().unwrap();
    assert_eq!(batch.num_rows(), 2);
    assert_eq!(stream.skipped_records(), 0);
    assert!(stream.take_decode_errors().is_empty());

    let vep = batch.column_by_name("VEP").unwrap().as_list::<i32>();
    let first = vep.value(0);
    let transcripts = first.as_struct();
    assert_eq!(
        transcripts.column_by_name("SYMBOL").unwrap().as_string::<i32>().value(0),
        "GENE1"
    );
    assert!(transcripts.column_by_name("AF").unwrap().is_null(0));
    assert!(transcripts.column_by_name("CANONICAL").unwrap().is_null(0));

    let second = vep.value(1);
    let canonical = second
        .as_struct()
        .column_by_name("CANONICAL")
        .unwrap()
        .as_any()
        .downcast_ref::<Int32Array>()
        .unwrap()
        .value(0);
    assert_eq!(canonical, 1);
    Ok(())
}
