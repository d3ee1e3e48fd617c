#![allow(dead_code)]

use datafusion::physical_plan::ExecutionPlan;
use flate2::Compression;
use flate2::write::GzEncoder;
use noodles::bgzf;
use std::io::Write;
use tempfile::NamedTempFile;

/// Eleven records on chromosome 1 for three samples.
///
/// Record 3 has no QUAL, records 3 and 5 carry `q10` and `.` filters, record 8
/// is multi-allelic, record 9 has AD `10,.` and a fully missing sample, and
/// HG00096 has no called genotype in record 4.
pub const SAMPLE_VCF: &str = concat!(
    "##fileformat=VCFv4.3\n",
    "##FILTER=<ID=PASS,Description=\"All filters passed\">\n",
    "##FILTER=<ID=q10,Description=\"Quality below 10\">\n",
    "##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Total Depth\">\n",
    "##INFO=<ID=AF,Number=A,Type=Float,Description=\"Allele Frequency\">\n",
    "##INFO=<ID=DB,Number=0,Type=Flag,Description=\"dbSNP membership\">\n",
    "##FORMAT=<ID=GT,Number=1,Type=String,Description=\"Genotype\">\n",
    "##FORMAT=<ID=DP,Number=1,Type=Integer,Description=\"Read Depth\">\n",
    "##FORMAT=<ID=AD,Number=R,Type=Integer,Description=\"Allelic depths\">\n",
    "##contig=<ID=1,length=249250621>\n",
    "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tHG00096\tHG00097\tHG00099\n",
    "1\t10583\trs58108140\tG\tA\t25\tPASS\tDP=100;AF=0.15;DB\tGT:DP:AD\t0|1:10:5,5\t0|0:12:12,0\t1|1:8:0,8\n",
    "1\t10611\trs189107123\tC\tG\t30\tPASS\tDP=90;AF=0.02\tGT:DP:AD\t0|0:9:9,0\t0|1:11:6,5\t0|0:7:7,0\n",
    "1\t13302\trs180734498\tC\tT\t.\tq10\tDP=40;AF=0.11\tGT:DP:AD\t0|0:.:.\t1|0:5:2,3\t0|0:6:6,0\n",
    "1\t13327\t.\tG\tC\t40\tPASS\tDP=70;AF=0.03\tGT:DP:AD\t./.:.:.\t0|0:10:10,0\t0|1:9:4,5\n",
    "1\t13957\trs201747181\tTC\tT\t50\t.\tDP=60;AF=0.01\tGT:DP:AD\t0|0:8:8,0\t0|0:7:7,0\t0|0:9:9,0\n",
    "1\t13980\trs151276478\tT\tC\t60\tPASS\tDP=55;AF=0.02\tGT:DP:AD\t0|1:6:3,3\t0|0:5:5,0\t0|0:4:4,0\n",
    "1\t30923\trs140337953\tG\tT\t70\tPASS\tDP=80;AF=0.73\tGT:DP:AD\t1|1:10:.,10\t1|0:8:4,4\t1|1:9:0,9\n",
    "1\t46402\t.\tC\tCTGT,CT\t80\tPASS\tDP=75;AF=0.2,0.05\tGT:DP:AD\t0/1:10:5,4,1\t1/2:12:2,5,5\t0/0:8:8,0,0\n",
    "1\t47190\trs200430748\tG\tGA\t90\tPASS\tDP=65;AF=0.06\tGT:DP:AD\t0|0:10:10,.\t.\t0|1:7:3,4\n",
    "1\t51476\trs187298206\tT\tC\t45\tPASS\tDP=50;AF=0.01\tGT:DP:AD\t0|0:5:5,0\t0|0:6:6,0\t0|0:7:7,0\n",
    "1\t51479\trs116400033\tT\tA\t55\tPASS\tDP=85;AF=0.11\tGT:DP:AD\t0|1:9:4,5\t0|0:8:8,0\t1|0:10:6,4\n",
);

/// Number of records in [`SAMPLE_VCF`].
pub const SAMPLE_RECORDS: usize = 11;

/// Sample names of [`SAMPLE_VCF`], in header order.
pub const SAMPLE_NAMES: [&str; 3] = ["HG00096", "HG00097", "HG00099"];

/// Writes text to a temporary `.vcf` file.
pub fn write_vcf(content: &str) -> std::io::Result<NamedTempFile> {
    let mut file = tempfile::Builder::new().suffix(".vcf").tempfile()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(file)
}

/// Writes [`SAMPLE_VCF`] uncompressed.
pub fn create_test_vcf_file() -> std::io::Result<NamedTempFile> {
    write_vcf(SAMPLE_VCF)
}

/// Writes [`SAMPLE_VCF`] BGZF-compressed.
pub fn create_test_bgzf_file() -> std::io::Result<NamedTempFile> {
    let file = tempfile::Builder::new().suffix(".vcf.gz").tempfile()?;
    let mut writer = bgzf::Writer::new(file.reopen()?);
    writer.write_all(SAMPLE_VCF.as_bytes())?;
    writer.finish()?;
    Ok(file)
}

/// Writes [`SAMPLE_VCF`] as a plain (non-blocked) GZIP stream.
pub fn create_test_gzip_file() -> std::io::Result<NamedTempFile> {
    let file = tempfile::Builder::new().suffix(".vcf.gz").tempfile()?;
    let mut encoder = GzEncoder::new(file.reopen()?, Compression::default());
    encoder.write_all(SAMPLE_VCF.as_bytes())?;
    encoder.finish()?;
    Ok(file)
}

/// Names of every operator in a physical plan, depth first.
pub fn plan_operators(plan: &dyn ExecutionPlan) -> Vec<String> {
    let mut names = vec![plan.name().to_string()];
    for child in plan.children() {
        names.extend(plan_operators(child.as_ref()));
    }
    names
}

/// Output columns of the VCF scan at the bottom of a single-input plan.
pub fn scan_columns(plan: &dyn ExecutionPlan) -> Vec<String> {
    match plan.children().first() {
        Some(child) => scan_columns(child.as_ref()),
        None => {
            assert_eq!(plan.name(), "VcfArrowExec");
            plan.schema()
                .fields()
                .iter()
                .map(|f| f.name().clone())
                .collect()
        }
    }
}

/// Writes `records` sites-only records to a BGZF file spanning many blocks.
pub fn create_large_bgzf_file(records: usize) -> std::io::Result<NamedTempFile> {
    let file = tempfile::Builder::new().suffix(".vcf.gz").tempfile()?;
    let mut writer = bgzf::Writer::new(file.reopen()?);
    writer.write_all(
        concat!(
            "##fileformat=VCFv4.3\n",
            "##INFO=<ID=DP,Number=1,Type=Integer,Description=\"Total Depth\">\n",
            "##contig=<ID=1,length=249250621>\n",
            "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n",
        )
        .as_bytes(),
    )?;
    for i in 0..records {
        writeln!(
            writer,
            "1\t{}\trs{}\tA\tG\t{}\tPASS\tDP={}",
            100 + i * 7,
            1_000_000 + i * 13,
            i % 97,
            i % 251
        )?;
    }
    writer.finish()?;
    Ok(file)
}

/// Start offsets of every BGZF block in `data`.
pub fn bgzf_block_offsets(data: &[u8]) -> Vec<usize> {
    let mut offsets = Vec::new();
    let mut offset = 0;
    while offset + 18 <= data.len() {
        offsets.push(offset);
        let bsize = u16::from_le_bytes([data[offset + 16], data[offset + 17]]) as usize;
        offset += bsize + 1;
    }
    offsets
}

/// Cuts a BGZF file in the middle of a data block past its midpoint.
pub fn truncate_bgzf_mid_block(file: &NamedTempFile) -> std::io::Result<()> {
    let data = std::fs::read(file.path())?;
    let offsets = bgzf_block_offsets(&data);
    let start = offsets
        .iter()
        .copied()
        .find(|&o| o > data.len() / 2)
        .expect("fixture spans several blocks");
    std::fs::write(file.path(), &data[..start + 30])
}
