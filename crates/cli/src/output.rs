//! Terminal output for reports and summaries

use clap::ValueEnum;
use colored::Colorize;
use processor::reporter::{SummaryReport, TotalsRow};
use processor::{MergeReport, PipelineStats};
use review_rollup_types::EntitySummary;
use serde::Serialize;

use crate::CliResult;

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables
    #[default]
    Table,
    /// One JSON document per item
    Json,
}

/// Renders rollup results in the selected format
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    format: OutputFormat,
}

impl Printer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn merge_report(&self, report: &MergeReport) -> CliResult<()> {
        if self.format == OutputFormat::Json {
            return print_json(report);
        }

        let status = if !report.failed.is_empty() {
            "ABORTED".red().bold()
        } else if report.cancelled {
            "CANCELLED".yellow().bold()
        } else {
            "MERGED".green().bold()
        };

        println!("{} {}", status, report.window.to_string().bold());
        println!(
            "  rows {}  inserted {}  combined {}  rejected {}  skipped {}  ({} ms)",
            report.rows_total,
            report.inserted.len().to_string().green(),
            report.combined.len().to_string().cyan(),
            colour_count(report.rejected.len()),
            colour_count(report.skipped.len()),
            report.elapsed.as_millis()
        );

        for rejection in &report.rejected {
            println!("  {} {}: {}", "rejected".yellow(), rejection.entity_id, rejection.reason);
        }
        for failure in &report.failed {
            println!("  {} {}: {}", "failed".red(), failure.entity_id, failure.error);
        }

        Ok(())
    }

    pub fn summary_report(&self, report: &SummaryReport) -> CliResult<()> {
        if self.format == OutputFormat::Json {
            return print_json(report);
        }

        println!();
        println!("{}", "Totals".bold().cyan());
        print_totals_header("");
        print_totals_row("", &report.totals);

        println!();
        println!("{}", "By day of latest activity".bold().cyan());
        print_totals_header(&format!("{:<12}", "date"));
        for day in &report.daily {
            print_totals_row(&format!("{:<12}", day.date), &day.totals);
        }
        println!();

        Ok(())
    }

    pub fn entity(&self, summary: &EntitySummary) -> CliResult<()> {
        if self.format == OutputFormat::Json {
            return print_json(summary);
        }

        println!("{}", summary.entity_id.bold().cyan());
        println!("  rating          {:.4}", summary.rating);
        println!("  useful          {}", summary.useful);
        println!("  funny           {}", summary.funny);
        println!("  cool            {}", summary.cool);
        println!("  latest activity {}", summary.latest_activity_at.format("%Y-%m-%d %H:%M:%S"));
        println!("  reviews         {}", summary.sample_count);

        Ok(())
    }

    pub fn stats(&self, stats: &PipelineStats) -> CliResult<()> {
        if self.format == OutputFormat::Json {
            return print_json(stats);
        }

        println!("{}", "Run summary".bold().cyan());
        println!("  windows   {}", stats.windows_processed);
        println!("  rows      {}", stats.rows_aggregated);
        println!("  inserted  {}", stats.rows_inserted.to_string().green());
        println!("  combined  {}", stats.rows_combined.to_string().cyan());
        println!("  rejected  {}", colour_count(stats.rows_rejected as usize));
        println!("  skipped   {}", colour_count(stats.rows_skipped as usize));

        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn colour_count(count: usize) -> colored::ColoredString {
    if count == 0 {
        count.to_string().normal()
    } else {
        count.to_string().yellow()
    }
}

fn print_totals_header(prefix: &str) {
    println!(
        "{}{}",
        prefix.dimmed(),
        format!(
            "{:>10} {:>12} {:>12} {:>12} {:>12}  {}",
            "rows", "sum_rating", "sum_useful", "sum_funny", "sum_cool", "max_latest"
        )
        .dimmed()
    );
}

fn print_totals_row(prefix: &str, totals: &TotalsRow) {
    let latest = totals
        .max_latest_activity_at
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());

    println!(
        "{}{:>10} {:>12.2} {:>12} {:>12} {:>12}  {}",
        prefix,
        totals.row_count,
        totals.sum_rating,
        totals.sum_useful,
        totals.sum_funny,
        totals.sum_cool,
        latest
    );
}
