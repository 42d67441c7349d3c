// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2022 Adrian <adrian.eddy at gmail>

use std::path::Path;
use std::process::Command;
use serde::{ Serialize, Deserialize };

use crate::{ Result, TrackerError };

/// External command line tool turning a raw flight log into CSV.
/// Invoked as `program [args...] <input> <output_csv>`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogConverter {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for LogConverter {
    fn default() -> Self {
        if cfg!(target_os = "windows") {
            Self { program: "drone_log\\TXTlogToCSVtool".into(), args: Vec::new() }
        } else {
            Self { program: "wine".into(), args: vec!["drone_log/TXTlogToCSVtool".into()] }
        }
    }
}

impl LogConverter {
    pub fn new(program: &str) -> Self {
        Self { program: program.to_owned(), args: Vec::new() }
    }

    pub fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        log::info!("Converting {} -> {} with {}", input.display(), output.display(), self.program);

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(input)
            .arg(output)
            .status()
            .map_err(|e| TrackerError::ExternalTool(format!("cannot run {}: {e}", self.program)))?;

        log::info!("{} exited with {status}", self.program);
        if !status.success() {
            return Err(TrackerError::ExternalTool(format!("{} exited with {status}", self.program)));
        }
        if !output.exists() {
            return Err(TrackerError::ExternalTool(format!("{} produced no output file {}", self.program, output.display())));
        }
        Ok(())
    }
}
