//! Output formatting for reports, listings and hierarchy dumps

use console::Style;
use droidprobe::{
    HarnessConfig, RunReport, Scenario, ScenarioReport, UiNode, Verdict, WakeOutcome,
};
use serde_json::json;

use crate::commands::{OutputFormat, ReportFormat};
use crate::error::CliResult;

/// Applies styles only when color is enabled
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    use_color: bool,
}

impl Palette {
    /// Palette with colors on or off
    #[must_use]
    pub const fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    fn paint(self, text: &str, style: &Style) -> String {
        if self.use_color {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn pass(self, text: &str) -> String {
        self.paint(text, &Style::new().green().bold())
    }

    fn fail(self, text: &str) -> String {
        self.paint(text, &Style::new().red().bold())
    }

    fn error(self, text: &str) -> String {
        self.paint(text, &Style::new().magenta().bold())
    }

    fn dim(self, text: &str) -> String {
        self.paint(text, &Style::new().dim())
    }

    fn heading(self, text: &str) -> String {
        self.paint(text, &Style::new().cyan().bold())
    }
}

/// Render a run report in the requested format
pub fn render_report(
    report: &RunReport,
    format: ReportFormat,
    palette: Palette,
    quiet: bool,
) -> CliResult<String> {
    match format {
        ReportFormat::Text if quiet => Ok(format!("{}\n", report.summary())),
        ReportFormat::Text => Ok(render_text(report, palette)),
        ReportFormat::Json => Ok(format!("{}\n", report.to_json()?)),
        ReportFormat::Junit => Ok(report.render_junit()),
    }
}

/// Human-readable report: one block per scenario, then the summary
#[must_use]
pub fn render_text(report: &RunReport, palette: Palette) -> String {
    let mut out = String::new();
    out.push_str(&palette.heading(&format!(
        "{} on {}",
        report.package, report.device
    )));
    out.push('\n');

    for scenario in &report.scenarios {
        out.push_str(&render_scenario(scenario, palette));
    }

    let summary = report.summary();
    out.push('\n');
    out.push_str(&if report.all_passed() {
        palette.pass(&summary)
    } else {
        palette.fail(&summary)
    });
    out.push('\n');
    out
}

fn render_scenario(scenario: &ScenarioReport, palette: Palette) -> String {
    let tag = match &scenario.verdict {
        Verdict::Passed => palette.pass("PASS "),
        Verdict::Failed { .. } => palette.fail("FAIL "),
        Verdict::Errored { .. } => palette.error("ERROR"),
    };
    let mut out = format!(
        "  {tag} {} {}\n",
        scenario.name,
        palette.dim(&format!("({} ms)", scenario.duration_ms))
    );

    if let Some(reason) = scenario.verdict.reason() {
        out.push_str(&format!("        {reason}\n"));
    }
    if let Some(overlay) = &scenario.start_overlay {
        out.push_str(&palette.dim(&format!("        started under overlay {overlay}")));
        out.push('\n');
    }
    if let WakeOutcome::FailedIgnored { reason } = &scenario.wake {
        out.push_str(&palette.dim(&format!("        wake failed: {reason}")));
        out.push('\n');
    }
    if !scenario.baseline_restored {
        out.push_str(&palette.dim("        device not restored to baseline"));
        out.push('\n');
    }
    out
}

/// Render the scenario catalogue
pub fn render_scenarios(scenarios: &[Box<dyn Scenario>], format: OutputFormat) -> CliResult<String> {
    match format {
        OutputFormat::Text => {
            let width = scenarios.iter().map(|s| s.name().len()).max().unwrap_or(0);
            Ok(scenarios
                .iter()
                .map(|s| format!("{:<width$}  {}\n", s.name(), s.description()))
                .collect())
        }
        OutputFormat::Json => {
            let entries: Vec<_> = scenarios
                .iter()
                .map(|s| json!({ "name": s.name(), "description": s.description() }))
                .collect();
            Ok(format!("{}\n", serde_json::to_string_pretty(&entries)?))
        }
    }
}

/// Render the effective prompt patterns and the order they are tried in
pub fn render_patterns(config: &HarnessConfig, format: OutputFormat) -> CliResult<String> {
    let patterns = config.permissions.effective_patterns();
    let order = &config.permissions.order;

    match format {
        OutputFormat::Text => {
            let mut out = format!(
                "order: {}\n",
                order
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            for category in patterns.categories() {
                let marker = if order.contains(&category) { '*' } else { ' ' };
                out.push_str(&format!(
                    "{marker} {category}: {}\n",
                    patterns.labels(category).join(", ")
                ));
            }
            Ok(out)
        }
        OutputFormat::Json => {
            let doc = json!({ "order": order, "patterns": patterns });
            Ok(format!("{}\n", serde_json::to_string_pretty(&doc)?))
        }
    }
}

/// Names of the harness queries a node would satisfy
#[must_use]
pub fn node_marks(node: &UiNode, config: &HarnessConfig) -> Vec<String> {
    let mut marks = Vec::new();
    if config.settings_query().matches(node) {
        marks.push("settings".to_string());
    }
    let patterns = config.permissions.effective_patterns();
    for category in patterns.categories() {
        if patterns.query(category).matches(node) {
            marks.push(format!("prompt:{category}"));
        }
    }
    marks
}

/// One line per node, annotated with the queries it matches
#[must_use]
pub fn render_nodes(nodes: &[UiNode], config: &HarnessConfig, palette: Palette) -> String {
    let mut out = String::new();
    for node in nodes {
        let class = node.class.rsplit('.').next().unwrap_or(&node.class);
        out.push_str(&format!(
            "{} {class} text={:?} desc={:?}",
            palette.dim(&node.bounds.to_string()),
            node.text,
            node.content_desc
        ));
        if node.clickable {
            out.push_str(" clickable");
        }
        let marks = node_marks(node, config);
        if !marks.is_empty() {
            out.push(' ');
            out.push_str(&palette.heading(&format!("[{}]", marks.join(", "))));
        }
        out.push('\n');
    }
    out
}
