//! Handlers consuming the discrepancy stream, either reporting each
//! discrepancy or repairing the local records to match the chain

pub mod fix;
pub mod report;

use std::fmt::{self, Display, Formatter};

use tracing::{error, info, warn};

use crate::{
    discrepancy::{Category, Discrepancy},
    errors::ReconcileError,
};

pub use fix::FixHandler;
pub use report::ReportHandler;

/// The message logged when a comparison finds nothing to reconcile
pub const UP_TO_DATE_MESSAGE: &str = "Your project is up to date.";

/// A consumer of discrepancies
pub trait DiscrepancyHandler {
    /// Handle a single discrepancy
    fn apply(&mut self, discrepancy: &Discrepancy) -> Result<(), ReconcileError>;

    /// Consume the handler, summarizing what it did
    fn finish(self) -> ReconciliationOutcome;
}

/// Feed every discrepancy, in order, through a handler
pub fn run_handler<H: DiscrepancyHandler>(
    mut handler: H,
    discrepancies: &[Discrepancy],
) -> Result<ReconciliationOutcome, ReconcileError> {
    if discrepancies.is_empty() {
        info!("{UP_TO_DATE_MESSAGE}");
    }

    for discrepancy in discrepancies {
        handler.apply(discrepancy)?;
    }

    Ok(handler.finish())
}

/// The severity of a log line emitted by a handler
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// Expected drift
    Info,
    /// A recoverable ambiguity or an assumption made during a repair
    Warn,
    /// Unregistered or orphaned state
    Error,
}

/// A line emitted by a handler, kept so callers can inspect what was logged
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogLine {
    /// The severity the line was logged at
    pub severity: Severity,
    /// The category of the discrepancy the line concerns
    pub category: Category,
    /// The logged message
    pub message: String,
}

impl LogLine {
    /// Create a line and emit it to the logger
    pub(crate) fn emit(severity: Severity, category: Category, message: String) -> Self {
        match severity {
            Severity::Info => info!("{message}"),
            Severity::Warn => warn!("{message}"),
            Severity::Error => error!("{message}"),
        }

        Self {
            severity,
            category,
            message,
        }
    }
}

impl Display for LogLine {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// A summary of a handler's run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconciliationOutcome {
    /// The number of discrepancies handled
    pub discrepancies: usize,
    /// Whether the local records were modified
    pub mutated: bool,
    /// The number of discrepancies with no deterministic repair
    pub ambiguities: usize,
    /// The number of repairs that relied on an unverified assumption
    pub integrity_warnings: usize,
    /// Every line the handler logged, in order
    pub lines: Vec<LogLine>,
}

impl ReconciliationOutcome {
    /// Whether every discrepancy was handled without ambiguity
    pub fn is_success(&self) -> bool {
        self.ambiguities == 0
    }

    /// Whether no discrepancy was found at all
    pub fn is_up_to_date(&self) -> bool {
        self.discrepancies == 0
    }

    /// The lines logged at the given severity
    pub fn lines_at(&self, severity: Severity) -> impl Iterator<Item = &LogLine> {
        self.lines.iter().filter(move |l| l.severity == severity)
    }
}
