use numline_core::{ConfigError, TrialRecord};
use rand::Rng;
use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Durable destination of the session's records.
pub trait ResultSink {
    /// Writes every record of the session. Called once per session.
    fn write_all(&mut self, records: &[TrialRecord]) -> io::Result<()>;

    fn describe(&self) -> String;
}

/// Writes `<participant>_<ddd>_beh.csv`: a header row, then one row per trial.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    /// Picks a file name with a random three-digit suffix inside `dir`.
    pub fn new<R: Rng>(dir: impl AsRef<Path>, participant: &str, rng: &mut R) -> Self {
        let suffix: u16 = rng.random_range(100..=999);
        let path = dir
            .as_ref()
            .join(format!("{participant}_{suffix}_beh.csv"));
        Self { path }
    }

    /// Like [`CsvSink::new`], then writes the header so an unusable output
    /// location is reported before the session starts.
    pub fn create<R: Rng>(
        dir: impl AsRef<Path>,
        participant: &str,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        let sink = Self::new(dir, participant, rng);
        sink.prepare().map_err(|e| ConfigError::InvalidValue {
            key: "output_dir",
            reason: format!("cannot create {}: {e}", sink.path.display()),
        })?;
        Ok(sink)
    }

    /// Creates the file with only the header row.
    pub fn prepare(&self) -> io::Result<()> {
        let records: [TrialRecord; 0] = [];
        write_csv(&self.path, &records)
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn csv_field(s: &str) -> Cow<'_, str> {
    if s.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", s.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(s)
    }
}

fn write_row<W: Write, S: AsRef<str>>(out: &mut W, fields: &[S]) -> io::Result<()> {
    let line = fields
        .iter()
        .map(|f| csv_field(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    writeln!(out, "{line}")
}

fn write_csv(path: &Path, records: &[TrialRecord]) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write_row(&mut out, &TrialRecord::HEADER)?;
    for record in records {
        write_row(&mut out, &record.fields())?;
    }
    out.flush()
}

impl ResultSink for CsvSink {
    fn write_all(&mut self, records: &[TrialRecord]) -> io::Result<()> {
        write_csv(&self.path, records)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Keeps records in memory; clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    written: Arc<Mutex<Vec<Vec<TrialRecord>>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// One entry per `write_all` call.
    pub fn writes(&self) -> Vec<Vec<TrialRecord>> {
        self.written
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default()
    }
}

impl ResultSink for MemorySink {
    fn write_all(&mut self, records: &[TrialRecord]) -> io::Result<()> {
        self.written
            .lock()
            .map_err(|_| io::Error::other("memory sink poisoned"))?
            .push(records.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Append-only record buffer that writes itself to its sink exactly once.
///
/// `flush` writes explicitly; if the log is dropped without a flush (early
/// return, abort, panic unwinding) the drop handler writes instead.
pub struct ResultLog<S: ResultSink> {
    records: Vec<TrialRecord>,
    sink: S,
    flushed: bool,
}

impl<S: ResultSink> ResultLog<S> {
    pub fn new(sink: S) -> Self {
        Self {
            records: Vec::new(),
            sink,
            flushed: false,
        }
    }

    pub fn push(&mut self, record: TrialRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    /// Writes all records. Later calls are no-ops, even after a failed write.
    pub fn flush(&mut self) -> io::Result<()> {
        if self.flushed {
            return Ok(());
        }
        self.flushed = true;
        self.sink.write_all(&self.records)?;
        tracing::info!(
            records = self.records.len(),
            sink = %self.sink.describe(),
            "results saved"
        );
        Ok(())
    }
}

impl<S: ResultSink> Drop for ResultLog<S> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::error!(error = %e, sink = %self.sink.describe(), "failed to save results");
        }
    }
}
