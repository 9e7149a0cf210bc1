//! Ledger rendering: tree, indented table, JSON and TOML.

use colored::Colorize;
use itertools::Itertools;
use termtree::Tree;

use crate::application::ApplicationError;
use crate::cli::error::{CliError, CliResult};
use crate::config::{DisplayConfig, OutputFormat};
use crate::domain::{InputValues, Ledger, Node, Variance};

/// Shown for nodes that have not been through the variance engine yet.
const NO_VARIANCE: &str = "0%";

/// Rendering knobs resolved from config and CLI flags.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub format: OutputFormat,
    pub indent: usize,
    pub color: bool,
}

impl From<&DisplayConfig> for RenderOptions {
    fn from(display: &DisplayConfig) -> Self {
        Self {
            format: display.format,
            indent: display.indent,
            color: display.color,
        }
    }
}

/// Render `ledger` in the configured format.
pub fn render(ledger: &Ledger, inputs: &InputValues, opts: &RenderOptions) -> CliResult<String> {
    match opts.format {
        OutputFormat::Tree => Ok(to_tree(ledger, opts).to_string()),
        OutputFormat::Table => Ok(to_table(ledger, inputs, opts)),
        OutputFormat::Json => serde_json::to_string_pretty(ledger.nodes())
            .map_err(|e| serialize_err("json", e)),
        OutputFormat::Toml => {
            toml::to_string_pretty(ledger).map_err(|e| serialize_err("toml", e))
        }
    }
}

fn serialize_err(format: &str, e: impl std::error::Error + Send + Sync + 'static) -> CliError {
    ApplicationError::OperationFailed {
        context: format!("serialize ledger as {format}"),
        source: Box::new(e),
    }
    .into()
}

fn variance_text(node: &Node) -> String {
    node.variance
        .map(|v| v.to_string())
        .unwrap_or_else(|| NO_VARIANCE.to_string())
}

fn paint_variance(text: String, variance: Option<Variance>, color: bool) -> String {
    if !color {
        return text;
    }
    match variance {
        Some(Variance::Percent(p)) if p > 0.0 => text.green().to_string(),
        Some(Variance::Percent(p)) if p < 0.0 => text.red().to_string(),
        Some(Variance::Infinite { .. }) | Some(Variance::Undefined) => text.yellow().to_string(),
        _ => text,
    }
}

/// Build a termtree with one branch per top-level node under a total row.
pub fn to_tree(ledger: &Ledger, opts: &RenderOptions) -> Tree<String> {
    fn branch(node: &Node, opts: &RenderOptions) -> Tree<String> {
        let variance = paint_variance(variance_text(node), node.variance, opts.color);
        let label = format!("{} {:.2} ({})", node.label, node.value, variance);
        Tree::new(label).with_leaves(node.children().iter().map(|c| branch(c, opts)))
    }

    let total: f64 = ledger.nodes().iter().map(|n| n.value).sum();
    Tree::new(format!("Total {total:.2}"))
        .with_leaves(ledger.nodes().iter().map(|n| branch(n, opts)))
}

/// Label/Value/Input/Variance table with per-level label indentation.
pub fn to_table(ledger: &Ledger, inputs: &InputValues, opts: &RenderOptions) -> String {
    let rows: Vec<_> = ledger
        .walk()
        .into_iter()
        .map(|(depth, node)| {
            (
                format!("{}{}", " ".repeat(depth * opts.indent), node.label),
                format!("{:.2}", node.value),
                inputs.get(&node.id).map(|a| a.to_string()).unwrap_or_default(),
                variance_text(node),
                node.variance,
            )
        })
        .collect();

    let headers = ["Label", "Value", "Input", "Variance %"];
    let w_label = col_width(rows.iter().map(|r| &r.0), headers[0]);
    let w_value = col_width(rows.iter().map(|r| &r.1), headers[1]);
    let w_input = col_width(rows.iter().map(|r| &r.2), headers[2]);
    let w_var = col_width(rows.iter().map(|r| &r.3), headers[3]);

    let header = format!(
        "{:<w_label$}  {:>w_value$}  {:>w_input$}  {:>w_var$}",
        headers[0], headers[1], headers[2], headers[3]
    );
    let header = if opts.color {
        header.bold().to_string()
    } else {
        header
    };

    std::iter::once(header)
        .chain(rows.into_iter().map(|(label, value, input, var, variance)| {
            let var = paint_variance(format!("{var:>w_var$}"), variance, opts.color);
            format!("{label:<w_label$}  {value:>w_value$}  {input:>w_input$}  {var}")
        }))
        .join("\n")
}

fn col_width<'a>(cells: impl Iterator<Item = &'a String>, header: &str) -> usize {
    cells
        .map(|c| c.chars().count())
        .chain(std::iter::once(header.chars().count()))
        .max()
        .unwrap_or(0)
}
