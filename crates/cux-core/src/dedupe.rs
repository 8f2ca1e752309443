//! Deduplicates rows in an exported CSV by configurable key columns.
//!
//! Resumed exports can re-fetch a page and append duplicate rows; this
//! companion pass removes them after the fact.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// Key columns used when none are given.
pub const DEFAULT_KEYS: &[&str] = &["sub"];

#[derive(Debug, Clone)]
pub struct DedupeOptions {
    pub input: PathBuf,
    /// Defaults to `<input-stem>_deduplicated.<ext>`.
    pub output: Option<PathBuf>,
    /// Column names forming the uniqueness key.
    pub keys: Vec<String>,
    /// Keep the first occurrence of a key (false = keep the last).
    pub keep_first: bool,
    /// Report duplicates without writing anything.
    pub dry_run: bool,
}

impl DedupeOptions {
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            output: None,
            keys: DEFAULT_KEYS.iter().map(|s| s.to_string()).collect(),
            keep_first: true,
            dry_run: false,
        }
    }

    fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(p) => p.clone(),
            None => default_output_path(&self.input),
        }
    }
}

/// What the pass found (and wrote, unless dry-run).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupeReport {
    pub total_rows: usize,
    pub unique_rows: usize,
    /// Distinct keys that appeared more than once.
    pub duplicate_keys: usize,
    pub rows_removed: usize,
    /// Absent for dry runs.
    pub output: Option<PathBuf>,
}

/// Deduplicate `opts.input` by the configured key columns.
pub fn dedupe(opts: &DedupeOptions) -> Result<DedupeReport> {
    let mut reader = csv::Reader::from_path(&opts.input)
        .with_context(|| format!("open input CSV {}", opts.input.display()))?;
    let header = reader
        .headers()
        .context("read CSV header")?
        .clone();
    if header.is_empty() {
        bail!("CSV file is empty or has no header row");
    }

    let key_indices = resolve_key_indices(&header, &opts.keys)?;

    // Output order is first-occurrence order either way; keep-last only
    // replaces the row content in place.
    let mut order: Vec<csv::StringRecord> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut duplicate_keys: HashSet<String> = HashSet::new();
    let mut total_rows = 0usize;

    for record in reader.records() {
        let record = record.context("read CSV row")?;
        total_rows += 1;
        let key = row_key(&record, &key_indices);
        match seen.get(&key) {
            Some(&idx) => {
                duplicate_keys.insert(key);
                if !opts.keep_first {
                    order[idx] = record;
                }
            }
            None => {
                seen.insert(key, order.len());
                order.push(record);
            }
        }
    }

    let report = DedupeReport {
        total_rows,
        unique_rows: order.len(),
        duplicate_keys: duplicate_keys.len(),
        rows_removed: total_rows - order.len(),
        output: (!opts.dry_run).then(|| opts.output_path()),
    };

    tracing::info!("total rows: {}", report.total_rows);
    tracing::info!("unique entities: {}", report.unique_rows);
    tracing::info!("duplicate entries found: {}", report.duplicate_keys);

    if opts.dry_run {
        tracing::info!("dry run - no changes made");
        return Ok(report);
    }

    let out_path = opts.output_path();
    let mut writer = csv::Writer::from_path(&out_path)
        .with_context(|| format!("create output CSV {}", out_path.display()))?;
    writer.write_record(&header).context("write CSV header")?;
    for record in &order {
        writer.write_record(record).context("write CSV row")?;
    }
    writer.flush().context("flush output CSV")?;

    tracing::info!("deduplicated data written to {}", out_path.display());
    tracing::info!("removed {} duplicate rows", report.rows_removed);
    Ok(report)
}

/// Map key column names to header positions; all must exist.
fn resolve_key_indices(header: &csv::StringRecord, keys: &[String]) -> Result<Vec<usize>> {
    let mut indices = Vec::with_capacity(keys.len());
    let mut missing = Vec::new();
    for key in keys {
        match header.iter().position(|h| h == key) {
            Some(idx) => indices.push(idx),
            None => missing.push(key.as_str()),
        }
    }
    if !missing.is_empty() {
        bail!(
            "key fields not found in CSV: {} (available: {})",
            missing.join(", "),
            header.iter().collect::<Vec<_>>().join(", ")
        );
    }
    Ok(indices)
}

fn row_key(record: &csv::StringRecord, indices: &[usize]) -> String {
    let parts: Vec<&str> = indices
        .iter()
        .map(|&i| record.get(i).unwrap_or(""))
        .collect();
    parts.join("\u{1f}")
}

/// `users.csv` -> `users_deduplicated.csv`.
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{}_deduplicated.{}", stem, ext.to_string_lossy()),
        None => format!("{}_deduplicated", stem),
    };
    input.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_csv(dir: &Path, rows: &[&str]) -> PathBuf {
        let path = dir.join("users.csv");
        std::fs::write(&path, rows.join("\n") + "\n").unwrap();
        path
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::Reader::from_path(path).unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn keep_first_drops_later_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_csv(
            dir.path(),
            &[
                "sub,email",
                "1,first@x.com",
                "2,two@x.com",
                "1,second@x.com",
            ],
        );

        let report = dedupe(&DedupeOptions::new(input)).unwrap();
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.unique_rows, 2);
        assert_eq!(report.duplicate_keys, 1);
        assert_eq!(report.rows_removed, 1);

        let out = report.output.unwrap();
        assert!(out.to_string_lossy().ends_with("users_deduplicated.csv"));
        let rows = read_rows(&out);
        assert_eq!(rows, vec![vec!["1", "first@x.com"], vec!["2", "two@x.com"]]);
    }

    #[test]
    fn keep_last_replaces_content_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_csv(
            dir.path(),
            &[
                "sub,email",
                "1,first@x.com",
                "2,two@x.com",
                "1,second@x.com",
            ],
        );

        let mut opts = DedupeOptions::new(input);
        opts.keep_first = false;
        let report = dedupe(&opts).unwrap();

        // Row order stays first-occurrence; content comes from the last.
        let rows = read_rows(&report.output.unwrap());
        assert_eq!(rows, vec![vec!["1", "second@x.com"], vec!["2", "two@x.com"]]);
    }

    #[test]
    fn composite_keys_distinguish_rows() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_csv(
            dir.path(),
            &[
                "sub,email,locale",
                "1,a@x.com,en",
                "1,a@x.com,en",
                "1,b@x.com,en",
            ],
        );

        let mut opts = DedupeOptions::new(input);
        opts.keys = vec!["sub".into(), "email".into()];
        let report = dedupe(&opts).unwrap();
        assert_eq!(report.unique_rows, 2);
        assert_eq!(report.rows_removed, 1);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_csv(dir.path(), &["sub", "1", "1"]);

        let mut opts = DedupeOptions::new(input.clone());
        opts.dry_run = true;
        let report = dedupe(&opts).unwrap();

        assert_eq!(report.duplicate_keys, 1);
        assert!(report.output.is_none());
        assert!(!default_output_path(&input).exists());
    }

    #[test]
    fn missing_key_column_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_csv(dir.path(), &["email", "a@x.com"]);

        let err = dedupe(&DedupeOptions::new(input)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("sub"), "{}", msg);
        assert!(msg.contains("email"), "{}", msg);
    }

    #[test]
    fn explicit_output_path_respected() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_csv(dir.path(), &["sub", "1", "2"]);
        let out = dir.path().join("clean.csv");

        let mut opts = DedupeOptions::new(input);
        opts.output = Some(out.clone());
        let report = dedupe(&opts).unwrap();
        assert_eq!(report.output, Some(out.clone()));
        assert!(out.exists());
    }

    #[test]
    fn default_output_path_inserts_suffix() {
        assert_eq!(
            default_output_path(Path::new("/tmp/users.csv")),
            PathBuf::from("/tmp/users_deduplicated.csv")
        );
        assert_eq!(
            default_output_path(Path::new("plain")),
            PathBuf::from("plain_deduplicated")
        );
    }
}
