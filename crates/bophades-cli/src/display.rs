//! Terminal report formatting

use std::fmt;

use bophades_types::{math, OHM_DECIMALS};
use colored::*;

const WIDTH: usize = 64;
const LABEL_WIDTH: usize = 24;

/// One-line status markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Note,
    Warn,
    Fail,
}

impl Status {
    fn marker(self) -> ColoredString {
        match self {
            Status::Ok => "ok".green().bold(),
            Status::Note => "--".blue(),
            Status::Warn => "!!".yellow().bold(),
            Status::Fail => "xx".red().bold(),
        }
    }
}

/// Print a status line; failures go to stderr
pub fn status(kind: Status, message: &str) {
    let line = format!("  [{}] {}", kind.marker(), message);
    match kind {
        Status::Fail => eprintln!("{line}"),
        _ => println!("{line}"),
    }
}

/// `== Title ====` rule across the report width
pub fn heading(title: &str) {
    let fill = WIDTH.saturating_sub(title.chars().count() + 4);
    println!();
    println!("{} {} {}", "==".bright_black(), title.bold(), "=".repeat(fill).bright_black());
}

/// Label column padded so values line up within a section
pub fn row(label: &str, value: impl fmt::Display) {
    println!("  {:<width$} {}", label, value.to_string().cyan(), width = LABEL_WIDTH);
}

/// Indented sub-item under the previous row
pub fn detail(key: &str, value: impl fmt::Display) {
    println!("      {} {}", format!("{key}:").bright_black(), value);
}

/// Token base units rendered with the token's decimals
#[derive(Debug, Clone, Copy)]
pub struct Amount<'a> {
    pub raw: u128,
    pub decimals: u8,
    pub symbol: Option<&'a str>,
}

impl<'a> Amount<'a> {
    pub fn of(raw: u128, decimals: u8, symbol: &'a str) -> Self {
        Self { raw, decimals, symbol: Some(symbol) }
    }

    pub fn bare(raw: u128, decimals: u8) -> Self {
        Self { raw, decimals, symbol: None }
    }

    pub fn ohm(raw: u128) -> Self {
        Self::of(raw, OHM_DECIMALS, "OHM")
    }
}

impl fmt::Display for Amount<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&math::format_units(self.raw, self.decimals))?;
        if let Some(symbol) = self.symbol {
            write!(f, " {symbol}")?;
        }
        Ok(())
    }
}
