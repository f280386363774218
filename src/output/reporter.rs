use super::*;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use super::html::HtmlGenerator;

/// Page names the reporter writes besides one page per repository.
pub const TOTAL_PAGE: &str = "total";
pub const COMBINED_PAGE: &str = "report";

pub struct Reporter {
    format: OutputFormat,
    output_dir: PathBuf,
}

impl Reporter {
    pub fn new(format: OutputFormat, output_dir: &Path) -> Self {
        Self {
            format,
            output_dir: output_dir.to_path_buf(),
        }
    }

    /// Write the report into the output directory and return the files written.
    ///
    /// HTML output is one page per repository, `total.html` and a combined
    /// `report.html`; JSON output is a single `report.json`.
    pub async fn generate_report(&self, report: &Report) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "Failed to create output directory {}",
                self.output_dir.display()
            )
        })?;

        let mut written = Vec::new();
        match self.format {
            OutputFormat::Html => {
                let mut generator = HtmlGenerator::new()?;
                for repo in &report.repos {
                    let html = generator.render_table(
                        &repo.name,
                        repo.url.as_deref(),
                        repo.summary,
                        report.since,
                        &repo.rows,
                    )?;
                    written.push(self.save(&format!("{}.html", repo.name), &html)?);
                }
                let total = generator.render_table(
                    TOTAL_PAGE,
                    None,
                    report.summary,
                    report.since,
                    &report.total,
                )?;
                written.push(self.save(&format!("{}.html", TOTAL_PAGE), &total)?);

                let combined = generator.generate(report).await?;
                written.push(self.save(&format!("{}.html", COMBINED_PAGE), &combined)?);
            }
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(report)?;
                written.push(self.save(&format!("{}.json", COMBINED_PAGE), &json)?);
            }
        }
        Ok(written)
    }

    fn save(&self, filename: &str, content: &str) -> Result<PathBuf> {
        let path = self.output_dir.join(filename);
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Saved table: {}", path.display());
        Ok(path)
    }
}
