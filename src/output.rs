//! Rendering of analysis results as table, CSV, JSON or SQL text.

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::Table;
use tabled::settings::Style;

use crate::analysis::Analysis;
use crate::report::{Cell, Record, ReportKind, Reports};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// kubectl-style tables
    #[default]
    Table,
    /// Comma separated values, one section per report
    Csv,
    /// Single JSON document
    Json,
    /// SQL INSERT statements
    Sql,
}

/// Render every report that ran, in report order.
pub fn render(analysis: &Analysis, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => render_json(analysis),
        OutputFormat::Table => Ok(render_sections(analysis, &TableSection)),
        OutputFormat::Csv => Ok(render_sections(analysis, &CsvSection)),
        OutputFormat::Sql => Ok(render_sections(analysis, &SqlSection)),
    }
}

/// Renders one report section in a text format.
trait SectionWriter {
    fn section<R: Record>(&self, kind: ReportKind, rows: &[R]) -> String;

    fn failures(&self, analysis: &Analysis) -> String;
}

fn render_sections<W: SectionWriter>(analysis: &Analysis, writer: &W) -> String {
    let reports = &analysis.reports;
    let mut sections = Vec::new();

    let mut ran = Sections::new(writer, &mut sections);
    ran.report(ReportKind::Volumes, &reports.volumes);
    ran.report(ReportKind::ElasticIps, &reports.elastic_ips);
    ran.report(ReportKind::Snapshots, &reports.snapshots);
    ran.report(ReportKind::Images, &reports.images);
    ran.report(
        ReportKind::ClassicLoadBalancers,
        &reports.classic_load_balancers,
    );
    ran.report(ReportKind::LoadBalancers, &reports.load_balancers);
    ran.report(ReportKind::Instances, &reports.instances);
    ran.report(ReportKind::InstanceTypes, &reports.instance_types);

    if !analysis.failures.is_empty() {
        sections.push(writer.failures(analysis));
    }

    sections.join("\n")
}

/// Appends the section of every report that ran.
struct Sections<'a, W> {
    writer: &'a W,
    out: &'a mut Vec<String>,
}

impl<'a, W: SectionWriter> Sections<'a, W> {
    fn new(writer: &'a W, out: &'a mut Vec<String>) -> Self {
        Self { writer, out }
    }

    fn report<R: Record>(&mut self, kind: ReportKind, rows: &Option<Vec<R>>) {
        if let Some(rows) = rows {
            self.out.push(self.writer.section(kind, rows));
        }
    }
}

struct TableSection;

impl SectionWriter for TableSection {
    fn section<R: Record>(&self, kind: ReportKind, rows: &[R]) -> String {
        let title = format!("{} ({}):", kind.title(), rows.len()).bold();
        if rows.is_empty() {
            return format!("{}\n  {} none found\n", title, "✓".green());
        }

        let mut table = Table::new(rows);
        table.with(Style::blank());
        format!("{}\n{}\n", title, table)
    }

    fn failures(&self, analysis: &Analysis) -> String {
        let mut out = format!("{}\n", "Failed reports:".red().bold());
        for failure in &analysis.failures {
            out.push_str(&format!("  {} {}\n", "✗".red(), failure));
        }
        out
    }
}

struct CsvSection;

impl SectionWriter for CsvSection {
    fn section<R: Record>(&self, kind: ReportKind, rows: &[R]) -> String {
        let mut out = format!("# {}\n", kind.table_name());
        out.push_str(&R::COLUMNS.join(","));
        out.push('\n');
        for row in rows {
            let fields: Vec<String> = row
                .cells()
                .iter()
                .map(|c| csv_field(&c.to_string()))
                .collect();
            out.push_str(&fields.join(","));
            out.push('\n');
        }
        out
    }

    fn failures(&self, analysis: &Analysis) -> String {
        let mut out = String::from("# failures\nreport,error\n");
        for failure in &analysis.failures {
            out.push_str(&format!(
                "{},{}\n",
                failure.report,
                csv_field(&failure.source.to_string())
            ));
        }
        out
    }
}

struct SqlSection;

impl SectionWriter for SqlSection {
    fn section<R: Record>(&self, kind: ReportKind, rows: &[R]) -> String {
        let mut out = format!("-- {} ({} rows)\n", kind.title(), rows.len());
        let columns = R::COLUMNS.join(", ");
        for row in rows {
            let values: Vec<String> = row.cells().iter().map(sql_literal).collect();
            out.push_str(&format!(
                "INSERT INTO {} ({}) VALUES ({});\n",
                kind.table_name(),
                columns,
                values.join(", ")
            ));
        }
        out
    }

    fn failures(&self, analysis: &Analysis) -> String {
        let mut out = String::new();
        for failure in &analysis.failures {
            out.push_str(&format!(
                "-- FAILED {}\n",
                failure.to_string().replace('\n', " ")
            ));
        }
        out
    }
}

#[derive(Serialize)]
struct FailureDocument {
    report: ReportKind,
    error: String,
}

#[derive(Serialize)]
struct AnalysisDocument<'a> {
    #[serde(flatten)]
    reports: &'a Reports,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failures: Vec<FailureDocument>,
}

fn render_json(analysis: &Analysis) -> anyhow::Result<String> {
    let document = AnalysisDocument {
        reports: &analysis.reports,
        failures: analysis
            .failures
            .iter()
            .map(|f| FailureDocument {
                report: f.report,
                error: f.source.to_string(),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Quote a CSV field when it contains a separator, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn sql_literal(cell: &Cell) -> String {
    match cell {
        Cell::Number(n) => n.to_string(),
        Cell::Text(s) => format!("'{}'", s.replace('\'', "''")),
    }
}
