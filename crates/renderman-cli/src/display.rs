//! Display formatting for CLI output
//!
//! Reports go to stdout; progress and failure notices go to stderr.

use console::{Style, style};
use renderman_engine::{RenderEvent, RenderResult};
use renderman_sync::{
    ChangeType, DiffReport, DiffStatus, FileDiff, LineType, SkippedUnit, WriteAction, WriteReport,
};

/// Format count with proper pluralization
pub fn pluralize(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

/// Per-unit progress line on stderr
pub fn display_progress(event: &RenderEvent<'_>) {
    match event {
        RenderEvent::Started { total } => {
            eprintln!(
                "{} Rendering {}",
                style("→").blue(),
                pluralize(*total, "unit", "units")
            );
        }
        RenderEvent::UnitFinished { id, ok, elapsed } => {
            let icon = if *ok {
                style("✓").green()
            } else {
                style("✗").red()
            };
            eprintln!(
                "  {} {} {}",
                icon,
                id,
                style(format!("({:.1}s)", elapsed.as_secs_f64())).dim()
            );
        }
    }
}

/// Warnings collected while rendering, on stderr
pub fn display_warnings(result: &RenderResult) {
    for (path, unit) in &result.units {
        for warning in &unit.warnings {
            eprintln!(
                "  {} {}: {}",
                style("⚠").yellow(),
                style(path.display()).dim(),
                warning
            );
        }
    }
}

/// Units that failed to render, on stderr
pub fn display_skipped(skipped: &[SkippedUnit]) {
    if skipped.is_empty() {
        return;
    }

    eprintln!();
    eprintln!(
        "  {} {} failed to render:",
        style("✗").red(),
        pluralize(skipped.len(), "unit", "units")
    );
    for unit in skipped {
        eprintln!(
            "    {} {} {}",
            style("→").blue(),
            style(unit.path.display()).yellow(),
            style(format!("[{}]", unit.kind)).dim()
        );
        for line in unit.reason.lines() {
            eprintln!("      {}", line);
        }
    }
}

/// Human-readable diff report
pub fn display_diff_report(report: &DiffReport) {
    for file in report.differing() {
        display_file_diff(file);
    }

    if !report.skipped.is_empty() {
        println!(
            "{} {}",
            style("skipped").red().bold(),
            style("(render failed, not compared)").dim()
        );
        for unit in &report.skipped {
            println!("  {} {}", style("?").red(), unit.path.display());
        }
        println!();
    }

    let verdict = if report.in_sync() && report.is_complete() {
        style("✓").green()
    } else {
        style("✗").red()
    };
    println!("{} {}", verdict, style(report.summary()).bold());
}

/// Outputs that could not be compared, on stderr
pub fn display_unreadable(report: &DiffReport) {
    for file in &report.unreadable {
        eprintln!(
            "  {} {}: {}",
            style("✗").red(),
            file.path.display(),
            file.error
        );
    }
}

fn display_file_diff(file: &FileDiff) {
    let (label, color) = match file.status {
        DiffStatus::Added => ("added", Style::new().green()),
        DiffStatus::Removed => ("removed", Style::new().red()),
        DiffStatus::Changed => ("changed", Style::new().yellow()),
        DiffStatus::Unchanged => return,
    };
    println!(
        "{} {}",
        color.apply_to(format!("{:<8}", label)).bold(),
        style(file.path.display()).bold()
    );

    for change in &file.changes {
        match change.change_type {
            ChangeType::Added | ChangeType::Removed if file.status != DiffStatus::Changed => {
                println!("  {} {}", color.apply_to("•"), change.display_name());
            }
            ChangeType::Added => {
                println!("  {} {} (new document)", style("+").green(), change.display_name());
                print_lines(&change.diff.lines);
            }
            ChangeType::Removed => {
                println!("  {} {} (document removed)", style("-").red(), change.display_name());
                print_lines(&change.diff.lines);
            }
            ChangeType::Modified => {
                println!("  {} {}", style("~").yellow(), change.display_name());
                if !change.fields.is_empty() {
                    println!(
                        "    {} {}",
                        style("fields:").blue(),
                        change.fields.join(", ")
                    );
                }
                print_lines(&change.diff.lines);
            }
        }
    }
    println!();
}

fn print_lines(lines: &[renderman_sync::DiffLine]) {
    for line in lines {
        match line.line_type {
            LineType::Added => println!("    {}", style(format!("+{}", line.content)).green()),
            LineType::Removed => println!("    {}", style(format!("-{}", line.content)).red()),
            LineType::Context => println!("    {}", style(format!(" {}", line.content)).dim()),
            LineType::Hunk => println!("    {}", style(&line.content).cyan()),
        }
    }
}

/// Summary of an `update`
pub fn display_write_report(report: &WriteReport) {
    for file in &report.files {
        let icon = match file.action {
            WriteAction::Created => style("+").green(),
            WriteAction::Updated => style("~").yellow(),
            WriteAction::Unchanged => continue,
        };
        println!("  {} {}", icon, file.path.display());
    }

    for path in &report.stale {
        println!(
            "  {} {} {}",
            style("!").red(),
            path.display(),
            style("(stale, remove manually)").dim()
        );
    }

    for failure in &report.failed {
        eprintln!(
            "  {} {}: {}",
            style("✗").red(),
            failure.path.display(),
            failure.error
        );
    }

    let ok = report.is_complete();
    let icon = if ok { style("✓").green() } else { style("✗").red() };
    println!("{} {}", icon, style(report.summary()).bold());
}
