//! Append-only trial ledgers.
//!
//! Every trial outcome is written to a tab-separated file as soon as it is
//! known, so a killed campaign leaves a complete record of the work done.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use et_types::{
    EtResult, HyperParams, LedgerError, Metric, Stage, TrialRecord, UnknownCause,
};

/// Ledger column names, in file order.
pub const LEDGER_HEADER: [&str; 8] = [
    "stage",
    "trial",
    "beta1",
    "beta2",
    "eta",
    "min_metric",
    "iters",
    "report_path",
];

/// In-memory view of one ledger file, kept in sync with disk on every append.
#[derive(Debug)]
pub struct TrialLedger {
    path: PathBuf,
    records: Vec<TrialRecord>,
}

impl TrialLedger {
    /// Creates an empty ledger file with its header row, truncating any
    /// previous file at the same path.
    pub fn create(path: impl Into<PathBuf>) -> EtResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| LedgerError::Open {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
            }
        }
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(&path)
            .map_err(|e| LedgerError::Open {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        writer
            .write_record(LEDGER_HEADER)
            .and_then(|_| writer.flush().map_err(csv::Error::from))
            .map_err(|e| LedgerError::Write {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            path,
            records: Vec::new(),
        })
    }

    /// Loads a ledger written by [`TrialLedger::create`] and subsequent
    /// appends. Unknown metrics reload with their cause collapsed to
    /// [`UnknownCause::Unrecorded`].
    pub fn load(path: impl Into<PathBuf>) -> EtResult<Self> {
        let path = path.into();
        let display = path.display().to_string();
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_path(&path)
            .map_err(|e| LedgerError::Open {
                path: display.clone(),
                message: e.to_string(),
            })?;

        let headers = reader
            .headers()
            .map_err(|e| LedgerError::Open {
                path: display.clone(),
                message: e.to_string(),
            })?
            .clone();
        if headers.iter().ne(LEDGER_HEADER) {
            return Err(LedgerError::MalformedHeader {
                path: display,
                found: headers.iter().collect::<Vec<_>>().join("\t"),
            }
            .into());
        }

        let mut records = Vec::new();
        for (index, row) in reader.records().enumerate() {
            // Header occupies line 1.
            let line = index + 2;
            let row = row.map_err(|e| LedgerError::MalformedRow {
                path: display.clone(),
                line,
                message: e.to_string(),
            })?;
            records.push(parse_row(&row, &display, line)?);
        }
        Ok(Self { path, records })
    }

    /// Appends one record, flushing to disk before the in-memory copy is kept.
    pub fn append(&mut self, record: TrialRecord) -> EtResult<()> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| LedgerError::Write {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;
        let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(file);
        writer
            .write_record(Self::row(&record))
            .and_then(|_| writer.flush().map_err(csv::Error::from))
            .map_err(|e| LedgerError::Write {
                path: self.path.display().to_string(),
                message: e.to_string(),
            })?;
        self.records.push(record);
        Ok(())
    }

    /// Cell values for one record, matching [`LEDGER_HEADER`].
    pub fn row(record: &TrialRecord) -> [String; 8] {
        [
            record.stage.as_str().to_string(),
            record.trial.clone(),
            format!("{:.6}", record.params.beta1),
            format!("{:.6}", record.params.beta2),
            format!("{:.6}", record.params.eta),
            record.metric.to_string(),
            record.iters.to_string(),
            record.report_path.display().to_string(),
        ]
    }

    pub fn path(&self) -> &Path {
        &self.path
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

    /// Records ordered best metric first, unknowns last, ties in insertion
    /// order.
    pub fn ranked_view(&self) -> Vec<&TrialRecord> {
        let mut view: Vec<&TrialRecord> = self.records.iter().collect();
        view.sort_by(|a, b| a.metric.rank_cmp(&b.metric));
        view
    }

    /// Best finite-metric record, if any trial produced one.
    pub fn best(&self) -> Option<&TrialRecord> {
        self.ranked_view()
            .into_iter()
            .find(|r| r.metric.is_finite())
    }
}

fn row_error(path: &str, line: usize, message: String) -> LedgerError {
    LedgerError::MalformedRow {
        path: path.to_string(),
        line,
        message,
    }
}

fn parse_float(raw: &str, column: &str, path: &str, line: usize) -> Result<f64, LedgerError> {
    raw.parse::<f64>()
        .map_err(|_| row_error(path, line, format!("bad {column} value {raw:?}")))
}

fn parse_row(row: &csv::StringRecord, path: &str, line: usize) -> Result<TrialRecord, LedgerError> {
    if row.len() != LEDGER_HEADER.len() {
        return Err(row_error(
            path,
            line,
            format!(
                "expected {} columns, found {}",
                LEDGER_HEADER.len(),
                row.len()
            ),
        ));
    }

    let stage = Stage::parse(&row[0])
        .ok_or_else(|| row_error(path, line, format!("unknown stage {:?}", &row[0])))?;
    let params = HyperParams::new(
        parse_float(&row[2], "beta1", path, line)?,
        parse_float(&row[3], "beta2", path, line)?,
        parse_float(&row[4], "eta", path, line)?,
    );
    let metric = match &row[5] {
        "inf" => Metric::Unknown(UnknownCause::Unrecorded),
        raw => match raw.parse::<f64>() {
            Ok(value) if value.is_finite() => Metric::Value(value),
            Ok(_) => Metric::Unknown(UnknownCause::Unrecorded),
            Err(_) => {
                return Err(row_error(path, line, format!("bad min_metric value {raw:?}")))
            }
        },
    };
    let iters = row[6]
        .parse::<u32>()
        .map_err(|_| row_error(path, line, format!("bad iters value {:?}", &row[6])))?;

    Ok(TrialRecord {
        stage,
        trial: row[1].to_string(),
        params,
        metric,
        iters,
        report_path: PathBuf::from(&row[7]),
    })
}
