use std::fs;
use std::path::Path;

use maud::{html, Markup, PreEscaped, DOCTYPE};
use plotly::Plot;

const PLOTLY_JS: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// A titled block of HTML fragments and inline plots.
pub struct ReportSection {
    title: String,
    content: Vec<Markup>,
}

impl ReportSection {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            content: Vec::new(),
        }
    }

    pub fn add_content(&mut self, content: Markup) {
        self.content.push(content);
    }

    /// Embed `plot` as an inline div; plotly.js is loaded once by the page.
    pub fn add_plot(&mut self, plot: Plot) {
        self.content.push(PreEscaped(plot.to_inline_html(None)));
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    fn render(&self) -> Markup {
        html! {
            section class="report-section" {
                h2 { (self.title) }
                @for block in &self.content {
                    div class="report-block" { (block) }
                }
            }
        }
    }
}

/// A single self-contained HTML page.
pub struct Report {
    software_name: String,
    version: String,
    logo: Option<String>,
    title: String,
    sections: Vec<ReportSection>,
}

impl Report {
    pub fn new(software_name: &str, version: &str, logo: Option<&str>, title: &str) -> Self {
        Self {
            software_name: software_name.to_string(),
            version: version.to_string(),
            logo: logo.map(str::to_string),
            title: title.to_string(),
            sections: Vec::new(),
        }
    }

    pub fn add_section(&mut self, section: ReportSection) {
        self.sections.push(section);
    }

    pub fn sections(&self) -> &[ReportSection] {
        &self.sections
    }

    pub fn render(&self) -> Markup {
        let generated = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="utf-8";
                    title { (self.title) }
                    script src=(PLOTLY_JS) {}
                    style {
                        "body { font-family: sans-serif; margin: 2em; }"
                        "table { border-collapse: collapse; }"
                        "td, th { border: 1px solid #ccc; padding: 4px 8px; text-align: right; }"
                        ".drift { color: #b00020; font-weight: bold; }"
                    }
                }
                body {
                    header {
                        @if let Some(logo) = &self.logo {
                            img src=(logo) alt=(self.software_name) height="64";
                        }
                        h1 { (self.title) }
                        p { (self.software_name) " v" (self.version) " | generated " (generated) }
                    }
                    @for section in &self.sections {
                        (section.render())
                    }
                }
            }
        }
    }

    /// Write the rendered page, creating parent directories.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.render().into_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_sections_in_order() {
        let mut report = Report::new("credit", "0.1.0", None, "Model Monitoring");
        let mut first = ReportSection::new("Summary");
        first.add_content(html! { p { "rows: 5" } });
        report.add_section(first);
        report.add_section(ReportSection::new("Drift"));

        let page = report.render().into_string();
        assert!(page.starts_with("<!DOCTYPE html>"));
        let summary = page.find("<h2>Summary</h2>").unwrap();
        let drift = page.find("<h2>Drift</h2>").unwrap();
        assert!(summary < drift);
        assert!(page.contains("rows: 5"));
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs").join("report.html");
        Report::new("credit", "0.1.0", None, "t").save_to_file(&path).unwrap();
        assert!(path.exists());
    }
}
