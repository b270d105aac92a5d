use crate::batch::FileAnalysisResult;
use crate::complexity::{Classification, ScoreBand};
use crate::core::Severity;
use crate::energy::LineEnergy;
use crate::pipeline::{AnalysisReport, ComparisonReport, RefactorOutcome};
use crate::suggestions::Suggestion;
use colored::*;
use std::io::Write;

pub trait OutputWriter {
    fn write_analysis(&mut self, report: &AnalysisReport) -> anyhow::Result<()>;
    fn write_refactor(&mut self, outcome: &RefactorOutcome) -> anyhow::Result<()>;
    fn write_comparison(&mut self, comparison: &ComparisonReport) -> anyhow::Result<()>;
    fn write_batch(&mut self, results: &[FileAnalysisResult]) -> anyhow::Result<()>;
}

pub struct JsonWriter<W: Write> {
    writer: W,
}

impl<W: Write> JsonWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    fn emit<T: serde::Serialize + ?Sized>(&mut self, value: &T) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        self.writer.write_all(json.as_bytes())?;
        writeln!(self.writer)?;
        Ok(())
    }
}

impl<W: Write> OutputWriter for JsonWriter<W> {
    fn write_analysis(&mut self, report: &AnalysisReport) -> anyhow::Result<()> {
        self.emit(report)
    }

    fn write_refactor(&mut self, outcome: &RefactorOutcome) -> anyhow::Result<()> {
        self.emit(outcome)
    }

    fn write_comparison(&mut self, comparison: &ComparisonReport) -> anyhow::Result<()> {
        self.emit(comparison)
    }

    fn write_batch(&mut self, results: &[FileAnalysisResult]) -> anyhow::Result<()> {
        let rows: Vec<_> = results.iter().map(FileAnalysisResult::row).collect();
        self.emit(&rows)
    }
}

/// Human-readable report with colored severity and score bands.
pub struct TerminalWriter<W: Write> {
    writer: W,
    show_lines: bool,
}

impl<W: Write> TerminalWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            show_lines: false,
        }
    }

    pub fn with_line_map(mut self, show_lines: bool) -> Self {
        self.show_lines = show_lines;
        self
    }

    fn write_header(&mut self, title: &str) -> anyhow::Result<()> {
        writeln!(self.writer, "{}", title.bold().blue())?;
        writeln!(self.writer, "{}", "=".repeat(title.len()).blue())?;
        Ok(())
    }

    fn write_classification(&mut self, label: &str, classification: &Classification) -> anyhow::Result<()> {
        writeln!(
            self.writer,
            "  {label}: {} (score {}, {})",
            classification.label.to_string().bold(),
            colorize_score(classification.score, classification.band),
            classification.band
        )?;
        Ok(())
    }

    fn write_suggestions(&mut self, suggestions: &[Suggestion]) -> anyhow::Result<()> {
        if suggestions.is_empty() {
            writeln!(self.writer, "  {}", "No inefficiency patterns found.".green())?;
            return Ok(());
        }
        writeln!(self.writer, "{}", "Suggestions:".bold())?;
        for (index, suggestion) in suggestions.iter().enumerate() {
            writeln!(
                self.writer,
                "  {}. [{}] line {}: {} (~{}% savings, {})",
                index + 1,
                colorize_severity(suggestion.severity),
                suggestion.line,
                suggestion.message,
                suggestion.estimated_savings_percent,
                suggestion.disposition
            )?;
            for example_line in suggestion.example.lines() {
                writeln!(self.writer, "       {}", example_line.dimmed())?;
            }
        }
        Ok(())
    }
}

fn colorize_score(score: u32, band: ScoreBand) -> ColoredString {
    let text = score.to_string();
    match band {
        ScoreBand::Low => text.green(),
        ScoreBand::Moderate => text.yellow(),
        ScoreBand::High => text.red(),
    }
}

fn colorize_severity(severity: Severity) -> ColoredString {
    let text = severity.to_string();
    match severity {
        Severity::Critical => text.red().bold(),
        Severity::High => text.red(),
        Severity::Medium => text.yellow(),
        Severity::Low => text.normal(),
    }
}

fn colorize_energy(energy: LineEnergy) -> ColoredString {
    let text = energy.to_string();
    match energy {
        LineEnergy::High => text.red(),
        LineEnergy::Medium => text.yellow(),
        LineEnergy::Low => text.green(),
    }
}

fn signed(delta: i64) -> String {
    if delta > 0 {
        format!("+{delta}")
    } else {
        delta.to_string()
    }
}

impl<W: Write> OutputWriter for TerminalWriter<W> {
    fn write_analysis(&mut self, report: &AnalysisReport) -> anyhow::Result<()> {
        self.write_header(&format!("energylens: {}", report.path.display()))?;
        self.write_classification("Complexity", &report.classification)?;
        writeln!(
            self.writer,
            "  Estimated runtime: {:.2} ms",
            report.estimated_runtime_ms
        )?;
        writeln!(
            self.writer,
            "  Lines: {} total, {} code, {} high-energy",
            report.code_stats.total_lines,
            report.code_stats.code_lines(),
            report.high_energy_lines()
        )?;
        if let Some(estimate) = &report.energy_estimate {
            writeln!(
                self.writer,
                "  Predicted energy: {:.4} J ({:.1}% confidence)",
                estimate.energy_joules, estimate.confidence_percent
            )?;
        }
        writeln!(self.writer)?;
        self.write_suggestions(&report.suggestions)?;

        if self.show_lines {
            writeln!(self.writer)?;
            writeln!(self.writer, "{}", "Line energy:".bold())?;
            for (line, energy) in report.line_energy.iter() {
                writeln!(self.writer, "  {line:>5} {}", colorize_energy(energy))?;
            }
        }
        Ok(())
    }

    fn write_refactor(&mut self, outcome: &RefactorOutcome) -> anyhow::Result<()> {
        self.write_header(&format!("energylens refactor: {}", outcome.path.display()))?;
        self.write_classification("Before", &outcome.before)?;
        self.write_classification("After", &outcome.after)?;
        writeln!(self.writer)?;

        if outcome.changed() {
            writeln!(self.writer, "{}", "Applied:".bold())?;
            for entry in &outcome.plan.entries {
                writeln!(
                    self.writer,
                    "  {} lines {}: {} -> {}",
                    entry.pattern_id.to_string().green(),
                    entry.original_span,
                    entry.complexity_before,
                    entry.complexity_after
                )?;
            }
        } else {
            writeln!(self.writer, "  No automatic rewrites applied.")?;
        }
        for skipped in &outcome.superseded {
            writeln!(
                self.writer,
                "  {} line {}: superseded by {}",
                skipped.pattern_match.pattern_id.to_string().yellow(),
                skipped.pattern_match.first_line(),
                skipped.by
            )?;
        }
        for refused in &outcome.unsupported {
            writeln!(
                self.writer,
                "  {} line {}: {}",
                refused.pattern_match.pattern_id.to_string().yellow(),
                refused.pattern_match.first_line(),
                refused.reason
            )?;
        }
        writeln!(self.writer)?;
        self.write_suggestions(&outcome.suggestions)
    }

    fn write_comparison(&mut self, comparison: &ComparisonReport) -> anyhow::Result<()> {
        self.write_header(&format!(
            "energylens compare: {} vs {}",
            comparison.original.display(),
            comparison.optimized.display()
        ))?;
        self.write_classification("Original", &comparison.before)?;
        self.write_classification("Optimized", &comparison.after)?;
        writeln!(
            self.writer,
            "  Score change: {}",
            signed(comparison.score_delta)
        )?;
        writeln!(
            self.writer,
            "  High-energy lines: {} -> {}",
            comparison.high_energy_lines_before, comparison.high_energy_lines_after
        )?;

        let changed: Vec<_> = comparison
            .feature_deltas
            .iter()
            .filter(|delta| delta.delta != 0.0)
            .collect();
        if !changed.is_empty() {
            writeln!(self.writer, "{}", "Feature changes:".bold())?;
            for delta in changed {
                writeln!(self.writer, "  {}: {:+}", delta.name, delta.delta)?;
            }
        }

        let verdict = if comparison.improved() {
            "Improved".green().bold()
        } else {
            "No improvement".yellow().bold()
        };
        writeln!(self.writer, "{verdict}")?;
        Ok(())
    }

    fn write_batch(&mut self, results: &[FileAnalysisResult]) -> anyhow::Result<()> {
        self.write_header("energylens batch")?;
        let mut failures = 0;
        for result in results {
            match &result.result {
                Ok(report) => writeln!(
                    self.writer,
                    "  {:<10} {:>4}  {:>2} patterns  {}",
                    report.classification.label.to_string(),
                    colorize_score(report.classification.score, report.classification.band),
                    report.matches.len(),
                    result.path.display()
                )?,
                Err(e) => {
                    failures += 1;
                    writeln!(
                        self.writer,
                        "  {:<10} {:>4}  {}  {}",
                        "error".red(),
                        "-",
                        result.path.display(),
                        e
                    )?
                }
            }
        }
        writeln!(
            self.writer,
            "\n{} files analyzed, {} failed",
            results.len(),
            failures
        )?;
        Ok(())
    }
}
