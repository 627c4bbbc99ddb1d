use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One command's result, renderable in every output format.
pub trait Render: Serialize {
    fn header(&self) -> Vec<&'static str>;
    fn rows(&self) -> Vec<Vec<String>>;
    /// Single-line human summary.
    fn summary(&self) -> String;
}

pub fn print<T: Render>(output: &T, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(output.header());
            for row in output.rows() {
                table.add_row(row);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{}", output.summary());
            for row in output.rows() {
                println!("  {}", row.join("  "));
            }
        }
    }
}

/// Compact JSON for table cells; long values are cut.
pub fn json_cell(value: &serde_json::Value) -> String {
    const MAX_CELL: usize = 120;
    let rendered = value.to_string();
    if rendered.chars().count() <= MAX_CELL {
        return rendered;
    }
    let cut: String = rendered.chars().take(MAX_CELL).collect();
    format!("{cut}...")
}
