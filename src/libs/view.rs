//! Console table rendering for run summaries.

use prettytable::{format, row, Table};

use crate::orchestrator::OrchestratorReport;

/// Renders the per-table outcome of an orchestrator run as a console table.
pub struct View {}

impl View {
    pub fn run_report(report: &OrchestratorReport) {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(row!["TABLE", "RESULT", "DETAIL"]);

        for table_name in &report.succeeded {
            table.add_row(row![table_name, "ok", ""]);
        }
        for (table_name, error) in &report.failed {
            table.add_row(row![table_name, "failed", error]);
        }

        table.printstd();
    }
}
