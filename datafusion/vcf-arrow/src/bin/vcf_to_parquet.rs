use datafusion_vcf_arrow::{ParquetCompression, VcfReadOptions, vcf_to_parquet};
use log::info;
use std::time::Instant;

const USAGE: &str = "usage: vcf_to_parquet <input> <output.parquet> [codec] [batch_size]";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 || args.len() > 4 {
        eprintln!("{USAGE}");
        std::process::exit(2);
    }

    let compression = match args.get(2) {
        Some(name) => ParquetCompression::from_name(name)?,
        None => ParquetCompression::default(),
    };
    let mut options = VcfReadOptions::default();
    if let Some(batch_size) = args.get(3) {
        options = options.with_batch_size(batch_size.parse()?);
    }

    let start = Instant::now();
    let rows = vcf_to_parquet(&args[0], &args[1], options, compression)?;
    info!(
        "Converted {} to {} in {:?}",
        args[0],
        args[1],
        start.elapsed()
    );
    println!("{rows} rows written to {}", args[1]);
    Ok(())
}
