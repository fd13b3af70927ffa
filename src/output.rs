//! CLI output formatting.
//!
//! Every entity follows the same two-level pattern: a header line with a
//! positional index and the file name, then indented context lines.
//!
//! ## Normalize / check
//!
//! ```text
//! 001 sig.png
//!     Original: 100 x 50 pixels
//!     Resized: 354 x 177 pixels
//!     Bounds: min 354 x 108, max 945 x 287
//!     Output: out/resized_sig.png
//! 002 empty.png
//!     Error: empty.png is empty
//!
//! Processed 2 files: 1 ok, 1 failed
//! ```
//!
//! ## Categories
//!
//! ```text
//! portrait-photo (pasfoto)
//!     Minimum: 276 x 355 pixels
//!     Maximum: 551 x 709 pixels
//! ```
//!
//! Each `format_*` function returns `Vec<String>` and is pure; the `print_*`
//! wrappers write to stdout.

use crate::bounds::BoundsTable;
use crate::normalize::Report;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn pixels((w, h): (u32, u32)) -> String {
    format!("{} x {} pixels", w, h)
}

/// Format one report as a header plus context lines.
pub fn format_report(index: usize, report: &Report) -> Vec<String> {
    let mut lines = vec![format!("{} {}", format_index(index), report.filename)];
    let ctx = indent(1);

    if let Some(error) = &report.error {
        lines.push(format!("{ctx}Error: {error}"));
    }
    if let Some(orig) = report.orig_size {
        lines.push(format!("{ctx}Original: {}", pixels(orig)));
    }
    if let Some(resized) = report.resized_size {
        lines.push(format!("{ctx}Resized: {}", pixels(resized)));
    }
    if let (Some((min_w, min_h)), Some((max_w, max_h))) = (report.min_size, report.max_size) {
        lines.push(format!(
            "{ctx}Bounds: min {min_w} x {min_h}, max {max_w} x {max_h}"
        ));
    }
    if report.meets_minimum == Some(false) {
        lines.push(format!("{ctx}Warning: below the category minimum"));
    }
    if let Some(output) = &report.output {
        lines.push(format!("{ctx}Output: {output}"));
    }
    lines
}

/// Format all reports followed by a blank line and a summary.
pub fn format_reports(reports: &[Report]) -> Vec<String> {
    let mut lines: Vec<String> = reports
        .iter()
        .enumerate()
        .flat_map(|(i, r)| format_report(i + 1, r))
        .collect();

    let ok = reports.iter().filter(|r| r.success).count();
    let failed = reports.len() - ok;
    let noun = if reports.len() == 1 { "file" } else { "files" };
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines.push(format!(
        "Processed {} {noun}: {ok} ok, {failed} failed",
        reports.len()
    ));
    lines
}

/// Format the category bounds table.
pub fn format_bounds_table(table: &BoundsTable) -> Vec<String> {
    let mut lines = Vec::new();
    for (category, spec) in table.iter() {
        lines.push(format!("{} ({})", category.label(), category.dutch_label()));
        lines.push(format!(
            "{}Minimum: {}",
            indent(1),
            pixels(spec.min.as_tuple())
        ));
        lines.push(format!(
            "{}Maximum: {}",
            indent(1),
            pixels(spec.max.as_tuple())
        ));
    }
    lines
}

pub fn print_reports(reports: &[Report]) {
    for line in format_reports(reports) {
        println!("{}", line);
    }
}

pub fn print_bounds_table(table: &BoundsTable) {
    for line in format_bounds_table(table) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::Category;
    use crate::normalize::ErrorKind;

    fn success() -> Report {
        Report {
            filename: "sig.png".into(),
            success: true,
            category: Some(Category::Signature),
            error: None,
            error_kind: None,
            orig_size: Some((100, 50)),
            resized_size: Some((354, 177)),
            min_size: Some((354, 108)),
            max_size: Some((945, 287)),
            meets_minimum: Some(true),
            output: Some("out/resized_sig.png".into()),
        }
    }

    #[test]
    fn success_report_lines() {
        assert_eq!(
            format_report(1, &success()),
            vec![
                "001 sig.png",
                "    Original: 100 x 50 pixels",
                "    Resized: 354 x 177 pixels",
                "    Bounds: min 354 x 108, max 945 x 287",
                "    Output: out/resized_sig.png",
            ]
        );
    }

    #[test]
    fn failure_report_lines() {
        let report = Report::failure(
            "empty.png",
            Some(ErrorKind::EmptyInput),
            "empty.png is empty".into(),
        );
        assert_eq!(
            format_report(2, &report),
            vec!["002 empty.png", "    Error: empty.png is empty"]
        );
    }

    #[test]
    fn minimum_warning_is_shown() {
        let report = Report {
            meets_minimum: Some(false),
            output: None,
            ..success()
        };
        let lines = format_report(1, &report);
        assert_eq!(lines.last().unwrap(), "    Warning: below the category minimum");
    }

    #[test]
    fn summary_counts() {
        let failed = Report::failure("x.png", None, "cannot read".into());
        let lines = format_reports(&[success(), failed]);
        assert_eq!(lines.last().unwrap(), "Processed 2 files: 1 ok, 1 failed");
        assert_eq!(lines[lines.len() - 2], "");
    }

    #[test]
    fn summary_for_no_files() {
        assert_eq!(format_reports(&[]), vec!["Processed 0 files: 0 ok, 0 failed"]);
    }

    #[test]
    fn bounds_table_lines() {
        let lines = format_bounds_table(&BoundsTable::standard().unwrap());
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[0], "portrait-photo (pasfoto)");
        assert_eq!(lines[1], "    Minimum: 276 x 355 pixels");
        assert_eq!(lines[2], "    Maximum: 551 x 709 pixels");
        assert_eq!(lines[3], "signature (handtekening)");
        assert_eq!(lines[8], "    Maximum: 945 x 382 pixels");
    }
}
