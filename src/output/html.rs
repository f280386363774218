use super::*;
use anyhow::{anyhow, Context as _};
use chrono::Utc;
use rust_embed::RustEmbed;
use serde_json::Value;
use std::collections::HashMap;
use tera::{Context, Tera};

#[derive(RustEmbed)]
#[folder = "src/output/templates/"]
#[include = "*.html"]
struct Templates;

#[derive(RustEmbed)]
#[folder = "src/output/assets/"]
#[include = "*.css"]
struct Assets;

pub struct HtmlGenerator {
    tera: Tera,
}

impl HtmlGenerator {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        let mut templates = Vec::new();
        for file in Templates::iter() {
            let name = file.as_ref().to_string();
            let content = Templates::get(&name)
                .ok_or_else(|| anyhow!("Template {} not found", name))?;
            let content = String::from_utf8(content.data.into_owned())
                .map_err(|e| anyhow!("Invalid UTF-8 in template {}: {}", name, e))?;
            templates.push((name, content));
        }
        // Registered together so the macro import resolves.
        tera.add_raw_templates(templates)
            .context("Failed to load report templates")?;

        tera.register_filter("percent", Self::percent_filter);

        Ok(Self { tera })
    }

    fn load_asset(&self, filename: &str) -> Result<String> {
        let asset = Assets::get(filename).ok_or_else(|| anyhow!("Asset {} not found", filename))?;
        let content = std::str::from_utf8(&asset.data)
            .map_err(|e| anyhow!("Invalid UTF-8 in asset {}: {}", filename, e))?;
        Ok(content.to_string())
    }

    /// `75.0` -> `75.00%`, with zero shown as a bare `0%`.
    fn percent_filter(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
        let percent = value.as_f64().unwrap_or(0.0);
        let text = if percent == 0.0 {
            "0%".to_string()
        } else {
            format!("{:.2}%", percent)
        };
        Ok(Value::String(text))
    }

    fn base_context(&self, since: NaiveDate) -> Result<Context> {
        let mut context = Context::new();
        context.insert("css_content", &self.load_asset("styles.css")?);
        context.insert("since", &since.to_string());
        context.insert(
            "generated_date",
            &Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        );
        Ok(context)
    }

    /// A standalone page holding a single table.
    pub fn render_table(
        &self,
        title: &str,
        url: Option<&str>,
        summary: Option<RepoSummary>,
        since: NaiveDate,
        rows: &[DisplayRow],
    ) -> Result<String> {
        let mut context = self.base_context(since)?;
        context.insert("title", title);
        context.insert("url", &url);
        context.insert("summary", &summary);
        context.insert("rows", rows);
        self.tera
            .render("table.html", &context)
            .with_context(|| format!("Failed to render table {}", title))
    }
}

impl OutputGenerator for HtmlGenerator {
    async fn generate(&mut self, report: &Report) -> Result<String> {
        let mut context = self.base_context(report.since)?;
        context.insert("report", report);
        let html = self
            .tera
            .render("report.html", &context)
            .context("Failed to render report")?;
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::fixtures;

    #[test]
    fn percent_filter_formats_two_decimals() {
        let args = HashMap::new();
        assert_eq!(
            HtmlGenerator::percent_filter(&Value::from(75.0), &args).unwrap(),
            Value::String("75.00%".to_string())
        );
        assert_eq!(
            HtmlGenerator::percent_filter(&Value::from(0.0), &args).unwrap(),
            Value::String("0%".to_string())
        );
    }

    #[tokio::test]
    async fn report_lists_every_table() {
        let report = fixtures::report();
        let mut generator = HtmlGenerator::new().unwrap();

        let html = generator.generate(&report).await.unwrap();

        assert!(html.contains("<h2>Total</h2>"));
        assert!(html.contains("https://github.com/ActivityWatch/aw-core"));
        assert!(html.contains("<td>Erik Bjäreholt</td>"));
        assert!(html.contains("75.00%"));
        assert!(!html.contains("github-actions[bot]"));
        assert!(html.contains("aw-qt"));
        assert!(html.contains("rate limited"));
        assert!(html.contains("Issues: 3 open, 5 closed. Pull requests: 4."));
    }

    #[test]
    fn single_table_page() {
        let report = fixtures::report();
        let generator = HtmlGenerator::new().unwrap();

        let html = generator
            .render_table("aw-core", None, None, report.since, &report.repos[0].rows)
            .unwrap();

        assert!(html.contains("<title>aw-core</title>"));
        assert!(html.contains("<td>xylix</td>"));
        assert!(html.contains("2023-01-01"));
        assert!(!html.contains("class=\"summary\""));
    }
}
