use std::io::{self, Write};

use serde::Serialize;

use crate::app::{CheckResult, GenerateResult, SummaryResult};

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_generate(result: &GenerateResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_summary(result: &SummaryResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_check(result: &CheckResult) -> io::Result<()> {
        Self::print_json(result)
    }

    /// Writes an already rendered document, such as an ISA-JSON investigation.
    pub fn print_document(document: &str) -> io::Result<()> {
        let mut stdout = io::stdout();
        stdout.write_all(document.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        Self::print_document(&json)
    }
}
