use crate::error::VcfArrowError;
use std::fmt;
use std::str::FromStr;

/// A genomic region in 1-based closed coordinates.
///
/// Parsed from `chrom`, `chrom:start` or `chrom:start-end`; thousands separators
/// in positions are accepted. Contig names containing `:` are kept whole when the
/// text after the last `:` is not a position range, or when the whole text names
/// a declared contig (see [`GenomicRegion::resolve`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomicRegion {
    /// Chromosome/reference sequence name
    pub chrom: String,
    /// 1-based inclusive start position (None = from beginning of chromosome)
    pub start: Option<u64>,
    /// 1-based inclusive end position (None = to end of chromosome)
    pub end: Option<u64>,
}

impl GenomicRegion {
    /// Returns true if `[start, end]` on `chrom` overlaps this region.
    pub fn overlaps(&self, chrom: &str, start: u64, end: u64) -> bool {
        chrom == self.chrom
            && self.start.is_none_or(|s| end >= s)
            && self.end.is_none_or(|e| start <= e)
    }

    /// Parses a region, treating the whole text as a contig name when
    /// `is_contig` accepts it.
    ///
    /// # Errors
    ///
    /// Returns [`VcfArrowError::InvalidOption`] for malformed regions
    pub fn resolve(text: &str, is_contig: impl Fn(&str) -> bool) -> Result<Self, VcfArrowError> {
        let name = text.trim();
        if !name.is_empty() && is_contig(name) {
            return Ok(GenomicRegion {
                chrom: name.to_string(),
                start: None,
                end: None,
            });
        }
        name.parse()
    }
}

fn parse_position(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(|c| *c != ',').collect();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn parse_interval(text: &str) -> Option<(u64, Option<u64>)> {
    match text.split_once('-') {
        Some((start, "")) => Some((parse_position(start)?, None)),
        Some((start, end)) => Some((parse_position(start)?, Some(parse_position(end)?))),
        None => Some((parse_position(text)?, None)),
    }
}

impl FromStr for GenomicRegion {
    type Err = VcfArrowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VcfArrowError::InvalidOption("empty region".to_string()));
        }

        let (chrom, interval) = match s.rsplit_once(':') {
            Some((chrom, rest)) if !chrom.is_empty() => match parse_interval(rest) {
                Some(interval) => (chrom, Some(interval)),
                None => (s, None),
            },
            _ => (s, None),
        };

        let (start, end) = match interval {
            Some((start, end)) => {
                if start == 0 {
                    return Err(VcfArrowError::InvalidOption(format!(
                        "region {s}: positions are 1-based"
                    )));
                }
                if end.is_some_and(|end| end < start) {
                    return Err(VcfArrowError::InvalidOption(format!(
                        "region {s}: end is before start"
                    )));
                }
                (Some(start), end)
            }
            None => (None, None),
        };

        Ok(GenomicRegion {
            chrom: chrom.to_string(),
            start,
            end,
        })
    }
}

impl fmt::Display for GenomicRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (Some(start), Some(end)) => write!(f, "{}:{}-{}", self.chrom, start, end),
            (Some(start), None) => write!(f, "{}:{}", self.chrom, start),
            (None, Some(end)) => write!(f, "{}:1-{}", self.chrom, end),
            (None, None) => write!(f, "{}", self.chrom),
        }
    }
}
