use super::*;
use colored::*;

const COLUMNS: [(&str, usize); 9] = [
    ("total", 6),
    ("issues", 6),
    ("comments", 8),
    ("prs", 5),
    ("merged", 6),
    ("pr-cmts", 7),
    ("commits", 7),
    ("blame", 8),
    ("days", 5),
];

fn cells(row: &DisplayRow) -> [String; 9] {
    [
        row.total.to_string(),
        row.issues.to_string(),
        row.comments.to_string(),
        row.prs_submitted.to_string(),
        row.prs_merged.to_string(),
        row.pr_comments.to_string(),
        row.commits.to_string(),
        format!("{:.1}%", row.blame_percent),
        row.active_days.to_string(),
    ]
}

fn format_line(name: &str, name_width: usize, cells: &[String]) -> String {
    let padding = name_width.saturating_sub(name.chars().count());
    let mut line = format!("{}{}", name, " ".repeat(padding));
    for ((_, width), cell) in COLUMNS.iter().zip(cells) {
        line.push_str(&format!(" | {:>width$}", cell, width = *width));
    }
    line
}

/// Aligned plain-text table; the header is colored when the terminal allows.
pub fn format_table(title: &str, rows: &[DisplayRow]) -> String {
    let name_width = rows
        .iter()
        .map(|r| r.name.chars().count())
        .chain(std::iter::once("name".len()))
        .max()
        .unwrap_or(4);

    let labels: Vec<String> = COLUMNS.iter().map(|(label, _)| label.to_string()).collect();
    let header = format_line("name", name_width, &labels);
    let rule = "-".repeat(header.chars().count());

    let mut lines = vec![
        title.bright_cyan().bold().to_string(),
        header.bold().to_string(),
        rule.clone(),
    ];
    lines.extend(rows.iter().map(|row| format_line(&row.name, name_width, &cells(row))));
    lines.push(rule);

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub fn format_summary(summary: &RepoSummary) -> String {
    format!(
        "Issues: {} open, {} closed. Pull requests: {}.",
        summary.open_issues, summary.closed_issues, summary.pull_requests
    )
}

pub fn print_report(report: &Report) {
    for repo in &report.repos {
        println!("{}", format_table(&repo.name, &repo.rows));
        if let Some(summary) = &repo.summary {
            println!("{}\n", format_summary(summary));
        }
    }
    println!("{}", format_table("total", &report.total));
    if let Some(summary) = &report.summary {
        println!("{}\n", format_summary(summary));
    }

    if !report.missing.is_empty() {
        println!("{}", "Missing repositories:".yellow().bold());
        for missing in &report.missing {
            println!("  {} ({})", missing.repo.yellow(), missing.reason);
        }
    }
}
