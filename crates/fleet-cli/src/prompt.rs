//! Interactive version prompt.

use std::io::{BufRead, Write};
use std::process::Command;

use anyhow::Context;
use tracing::debug;

use fleet_core::FleetError;

/// Latest release tag from `sem-info tag latest`, if the tool is installed
/// and answers with something.
pub fn latest_tag() -> Option<String> {
    let output = match Command::new("sem-info").args(["tag", "latest"]).output() {
        Ok(output) => output,
        Err(e) => {
            debug!(error = %e, "sem-info unavailable, no default version");
            return None;
        }
    };
    if !output.status.success() {
        return None;
    }
    let tag = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!tag.is_empty()).then_some(tag)
}

/// Ask for a version until a non-blank answer (or the default) is given.
///
/// A blank answer takes `default`. End of input without a usable version
/// is an input error.
pub fn prompt_version<R, W>(input: &mut R, output: &mut W, default: Option<&str>) -> anyhow::Result<String>
where
    R: BufRead,
    W: Write,
{
    let default = default.map(str::trim).filter(|d| !d.is_empty());
    let hint = default.map(|d| format!(" Default[{d}]")).unwrap_or_default();

    loop {
        write!(output, "Specify version to deploy{hint}: ")?;
        output.flush()?;

        let mut line = String::new();
        let read = input.read_line(&mut line).context("reading version from stdin")?;

        let answer = line.trim();
        if !answer.is_empty() {
            return Ok(answer.to_string());
        }
        if let Some(d) = default {
            return Ok(d.to_string());
        }
        if read == 0 {
            writeln!(output)?;
            return Err(FleetError::Input("no version supplied".to_string()).into());
        }
        writeln!(output, "\nEnter a valid version\n")?;
    }
}
