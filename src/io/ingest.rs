//! CSV ingest for multiplicity × pT tables.
//!
//! The input is a long-format table, one row per `(multiplicity, pT bin)`:
//!
//! ```text
//! multiplicity,pt_low,pt_high,content[,error]
//! ```
//!
//! Rows are grouped by multiplicity and each group becomes one
//! [`BinnedHistogram`]. Row-level problems are collected as [`RowError`]s and
//! the row is skipped; a structurally broken class (overlapping bins) is a
//! hard error because no projection of it would be meaningful.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::histogram::BinnedHistogram;

const REQUIRED_COLUMNS: [&str; 4] = ["multiplicity", "pt_low", "pt_high", "content"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// One 1D pT histogram per multiplicity class.
#[derive(Debug, Clone, Default)]
pub struct MultiplicityTable {
    classes: BTreeMap<u32, BinnedHistogram>,
}

impl MultiplicityTable {
    /// The pT histogram of a single multiplicity class.
    pub fn projection(&self, multiplicity: u32) -> Option<&BinnedHistogram> {
        self.classes.get(&multiplicity)
    }

    /// Available multiplicity classes, ascending.
    pub fn multiplicities(&self) -> impl Iterator<Item = u32> + '_ {
        self.classes.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Ingest output: the table plus bookkeeping about skipped rows.
#[derive(Debug, Clone)]
pub struct IngestedTable {
    pub table: MultiplicityTable,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

#[derive(Debug, Clone, Copy)]
struct TableRow {
    multiplicity: u32,
    pt_low: f64,
    pt_high: f64,
    content: f64,
    error: Option<f64>,
}

/// Load a multiplicity table from a CSV file.
pub fn load_multiplicity_table(path: &Path) -> Result<IngestedTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    info!(path = %path.display(), "loading multiplicity table");
    read_multiplicity_table(file)
}

/// Parse a multiplicity table from any CSV source.
pub fn read_multiplicity_table<R: Read>(source: R) -> Result<IngestedTable, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);
    for name in REQUIRED_COLUMNS {
        if !header_map.contains_key(name) {
            return Err(AppError::new(2, format!("Missing required column: `{name}`")));
        }
    }

    let mut grouped: BTreeMap<u32, Vec<TableRow>> = BTreeMap::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse_row(&record, &header_map) {
            Ok(row) => grouped.entry(row.multiplicity).or_default().push(row),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    for e in &row_errors {
        warn!(line = e.line, "skipping row: {}", e.message);
    }

    let rows_used: usize = grouped.values().map(Vec::len).sum();
    if rows_used == 0 {
        return Err(AppError::new(3, "No valid rows in multiplicity table."));
    }

    let mut classes = BTreeMap::new();
    for (mult, rows) in grouped {
        classes.insert(mult, build_class(mult, rows)?);
    }
    debug!(classes = classes.len(), rows_used, rows_read, "multiplicity table loaded");

    Ok(IngestedTable {
        table: MultiplicityTable { classes },
        row_errors,
        rows_read,
        rows_used,
    })
}

fn build_class(mult: u32, mut rows: Vec<TableRow>) -> Result<BinnedHistogram, AppError> {
    rows.sort_by(|a, b| a.pt_low.total_cmp(&b.pt_low));

    let with_errors = rows.iter().filter(|r| r.error.is_some()).count();
    let errors = if with_errors == rows.len() {
        Some(rows.iter().filter_map(|r| r.error).collect())
    } else {
        if with_errors > 0 {
            warn!(
                multiplicity = mult,
                "{with_errors} of {} rows carry an error; dropping errors for this class",
                rows.len()
            );
        }
        None
    };

    let edges = rows.iter().map(|r| (r.pt_low, r.pt_high)).collect();
    let contents = rows.iter().map(|r| r.content).collect();
    let histogram = BinnedHistogram::from_bin_edges(edges, contents, errors)
        .map_err(|e| AppError::new(2, format!("Multiplicity class {mult}: {e}")))?;

    if let (Some(first), Some(last)) = (histogram.edges().first(), histogram.edges().last()) {
        debug!(
            multiplicity = mult,
            bins = histogram.edges().len(),
            pt_min = first.0,
            pt_max = last.1,
            total = histogram.total(),
            "class loaded"
        );
    }
    Ok(histogram)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_row(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<TableRow, String> {
    let mult_raw = get_required(record, header_map, "multiplicity")?;
    let multiplicity = mult_raw
        .parse::<u32>()
        .map_err(|_| format!("Invalid `multiplicity` '{mult_raw}' (expected a non-negative integer)."))?;

    let pt_low = parse_f64(get_required(record, header_map, "pt_low")?, "pt_low")?;
    let pt_high = parse_f64(get_required(record, header_map, "pt_high")?, "pt_high")?;
    if pt_high <= pt_low {
        return Err(format!("`pt_high` ({pt_high}) must exceed `pt_low` ({pt_low})."));
    }

    let content = parse_f64(get_required(record, header_map, "content")?, "content")?;
    if content < 0.0 {
        return Err(format!("Negative `content` ({content})."));
    }

    let error = match get_optional(record, header_map, "error") {
        Some(s) => {
            let e = parse_f64(s, "error")?;
            if e < 0.0 {
                return Err(format!("Negative `error` ({e})."));
            }
            Some(e)
        }
        None => None,
    };

    Ok(TableRow {
        multiplicity,
        pt_low,
        pt_high,
        content,
        error,
    })
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_f64(s: &str, name: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(format!("Invalid `{name}` value '{s}'.")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::HistogramView;

    #[test]
    fn groups_rows_by_multiplicity() {
        let csv = "\
multiplicity,pt_low,pt_high,content,error
10,1.0,2.0,5.0,0.5
10,0.5,1.0,8.0,0.8
25,0.5,1.0,9.0,0.9
";
        let ingest = read_multiplicity_table(csv.as_bytes()).unwrap();
        assert_eq!(ingest.rows_read, 3);
        assert_eq!(ingest.rows_used, 3);
        assert!(ingest.row_errors.is_empty());
        assert_eq!(ingest.table.multiplicities().collect::<Vec<_>>(), vec![10, 25]);

        // Rows arrive out of order but the projection is sorted by pT.
        let h = ingest.table.projection(10).unwrap();
        assert_eq!(h.len(), 2);
        assert!((h.bin(0).center - 0.75).abs() < 1e-12);
        assert_eq!(h.bin(0).error, Some(0.8));
        assert!((h.bin(1).width - 1.0).abs() < 1e-12);
        assert!(ingest.table.projection(40).is_none());
    }

    #[test]
    fn skips_bad_rows_and_reports_lines() {
        let csv = "\
multiplicity,pt_low,pt_high,content
10,0.5,1.0,8.0
10,1.0,0.9,1.0
10,1.0,2.0,-3.0
ten,1.0,2.0,1.0
10,2.0,3.0,nan
10,3.0,4.0,2.0
";
        let ingest = read_multiplicity_table(csv.as_bytes()).unwrap();
        assert_eq!(ingest.rows_read, 6);
        assert_eq!(ingest.rows_used, 2);
        let lines: Vec<usize> = ingest.row_errors.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 4, 5, 6]);

        let h = ingest.table.projection(10).unwrap();
        assert!(!h.has_errors());
        assert_eq!(h.contents(), &[8.0, 2.0]);
    }

    #[test]
    fn header_names_are_normalized() {
        let csv = "\u{feff}Multiplicity, PT_LOW ,pt_high,Content\n5,0,1,1\n";
        let ingest = read_multiplicity_table(csv.as_bytes()).unwrap();
        assert!(ingest.table.projection(5).is_some());
    }

    #[test]
    fn missing_column_is_an_input_error() {
        let err = read_multiplicity_table("multiplicity,pt_low,content\n1,0,1\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("pt_high"));
    }

    #[test]
    fn overlapping_bins_are_a_hard_error() {
        let csv = "multiplicity,pt_low,pt_high,content\n10,0,2,1\n10,1,3,1\n";
        let err = read_multiplicity_table(csv.as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("class 10"));
    }

    #[test]
    fn partial_errors_are_dropped_for_the_class() {
        let csv = "multiplicity,pt_low,pt_high,content,error\n10,0,1,4,0.2\n10,1,2,3,\n";
        let ingest = read_multiplicity_table(csv.as_bytes()).unwrap();
        assert!(!ingest.table.projection(10).unwrap().has_errors());
    }

    #[test]
    fn no_usable_rows_is_insufficient_data() {
        let csv = "multiplicity,pt_low,pt_high,content\n10,1,0,1\n";
        let err = read_multiplicity_table(csv.as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
