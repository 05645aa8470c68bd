//! Output formatting

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Parse a configured format name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name, true).ok()
    }

    pub fn print<T: Serialize>(&self, data: &T) -> Result<(), String> {
        match self {
            OutputFormat::Json | OutputFormat::Table => {
                println!("{}", serde_json::to_string_pretty(data).map_err(|e| e.to_string())?);
            }
            OutputFormat::Yaml => {
                print!("{}", serde_yaml::to_string(data).map_err(|e| e.to_string())?);
            }
        }
        Ok(())
    }

    /// Print `rows` as a table, or `data` in the structured formats.
    pub fn print_rows<T, R>(&self, data: &T, rows: Vec<R>) -> Result<(), String>
    where
        T: Serialize,
        R: Tabled,
    {
        match self {
            OutputFormat::Table if rows.is_empty() => {
                println!("{}", "(none)".dimmed());
                Ok(())
            }
            OutputFormat::Table => {
                println!("{}", Table::new(rows).with(Style::rounded()));
                Ok(())
            }
            _ => self.print(data),
        }
    }
}

pub fn heading(text: &str) {
    println!("{}", text.bold());
}

pub fn success(text: &str) {
    println!("{} {}", "✓".green(), text);
}

pub fn percent(value: f64) -> String {
    format!("{:.1}%", value)
}

pub fn optional(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}
