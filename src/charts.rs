//! Aerodrome chart packs and the chart-pack merger.
//!
//! Chart packs live under `{aip}/{ICAO}/*.pdf` in the local AIP cache.
//! Merging walks an external-tool chain (ghostscript, then pdftk); when no
//! tool is available or every tool fails, the merge degrades to a byte-copy
//! of the first input. That lossy degradation is the documented policy, not
//! best effort.

use crate::error::DocketError;
use crate::util;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Filename tokens that mark a file as part of the chart pack. The trailing
/// space in `"AD "` is significant.
const CHART_TYPES: [&str; 5] = ["VAC", "ADC", "PDC", "AERODROME", "AD "];

/// Collect the chart pack for one ICAO code.
///
/// Directory iteration order is filesystem-dependent and intentionally not
/// sorted; callers must not rely on a stable ordering.
pub fn chart_pack(icao: &str, aip_base: &Path) -> Vec<PathBuf> {
    let icao = icao.trim().to_uppercase();
    let airport_dir = aip_base.join(&icao);
    let Ok(entries) = fs::read_dir(&airport_dir) else {
        return Vec::new();
    };

    let mut charts = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let upper = name.to_uppercase();
        if CHART_TYPES.iter().any(|token| upper.contains(token)) {
            charts.push(path);
        }
    }
    charts
}

/// One candidate in the merge fallback chain.
#[derive(Debug, Clone)]
pub enum MergeCommand {
    Ghostscript,
    Pdftk,
    /// User-configured argv; `{inputs}` and `{output}` are substituted.
    Custom(Vec<String>),
}

impl MergeCommand {
    fn program(&self) -> &str {
        match self {
            MergeCommand::Ghostscript => "gs",
            MergeCommand::Pdftk => "pdftk",
            MergeCommand::Custom(argv) => argv.first().map(String::as_str).unwrap_or(""),
        }
    }

    fn argv(&self, inputs: &[PathBuf], output: &Path) -> Vec<OsString> {
        match self {
            MergeCommand::Ghostscript => {
                let mut args: Vec<OsString> = vec![
                    "-dBATCH".into(),
                    "-dNOPAUSE".into(),
                    "-q".into(),
                    "-sDEVICE=pdfwrite".into(),
                ];
                let mut out_flag = OsString::from("-sOutputFile=");
                out_flag.push(output.as_os_str());
                args.push(out_flag);
                args.extend(inputs.iter().map(|path| path.as_os_str().to_os_string()));
                args
            }
            MergeCommand::Pdftk => {
                let mut args: Vec<OsString> =
                    inputs.iter().map(|path| path.as_os_str().to_os_string()).collect();
                args.push("cat".into());
                args.push("output".into());
                args.push(output.as_os_str().to_os_string());
                args
            }
            MergeCommand::Custom(argv) => {
                let mut args = Vec::new();
                for word in argv.iter().skip(1) {
                    match word.as_str() {
                        "{inputs}" => {
                            args.extend(inputs.iter().map(|path| path.as_os_str().to_os_string()));
                        }
                        "{output}" => args.push(output.as_os_str().to_os_string()),
                        other => args.push(other.into()),
                    }
                }
                args
            }
        }
    }
}

pub struct ChartMerger {
    chain: Vec<MergeCommand>,
}

impl Default for ChartMerger {
    fn default() -> Self {
        ChartMerger {
            chain: vec![MergeCommand::Ghostscript, MergeCommand::Pdftk],
        }
    }
}

impl ChartMerger {
    /// Build the chain from an optional configured override command.
    pub fn from_override(merge_tool: Option<&str>) -> ChartMerger {
        match merge_tool {
            Some(command) => match shell_words::split(command) {
                Ok(argv) if !argv.is_empty() => ChartMerger {
                    chain: vec![MergeCommand::Custom(argv)],
                },
                _ => {
                    tracing::warn!(command, "unparseable merge-tool override, using defaults");
                    ChartMerger::default()
                }
            },
            None => ChartMerger::default(),
        }
    }

    /// Replace the tool chain outright. An empty chain forces the copy-first
    /// degradation for multi-file input.
    pub fn with_chain(chain: Vec<MergeCommand>) -> ChartMerger {
        ChartMerger { chain }
    }

    /// Merge an ordered list of chart PDFs into `output`.
    ///
    /// Fails on empty input or any missing/unreadable input; never produces
    /// a partial merge. A single input is byte-copied. Multiple inputs walk
    /// the tool chain; the first tool that exits zero and leaves the output
    /// in place wins. With no working tool, only the first input is kept.
    pub fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), DocketError> {
        if inputs.is_empty() {
            return Err(DocketError::ChartMerge("no input files".to_string()));
        }
        for input in inputs {
            let readable = input.is_file() && fs::File::open(input).is_ok();
            if !readable {
                return Err(DocketError::ChartMerge(format!(
                    "unreadable input {}",
                    input.display()
                )));
            }
        }

        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                DocketError::ChartMerge(format!("create {}: {err}", parent.display()))
            })?;
        }

        if inputs.len() == 1 {
            return copy_into_place(&inputs[0], output);
        }

        for tool in &self.chain {
            let program = tool.program();
            if program.is_empty() || which::which(program).is_err() {
                tracing::debug!(program, "merge tool not on PATH");
                continue;
            }
            match Command::new(program).args(tool.argv(inputs, output)).output() {
                Ok(out) if out.status.success() && output.exists() => {
                    util::restrict_permissions(output)
                        .map_err(|err| DocketError::ChartMerge(err.to_string()))?;
                    tracing::debug!(program, inputs = inputs.len(), "chart merge succeeded");
                    return Ok(());
                }
                Ok(out) => {
                    tracing::debug!(
                        program,
                        status = %out.status,
                        stderr = %String::from_utf8_lossy(&out.stderr).trim(),
                        "merge tool failed"
                    );
                }
                Err(err) => {
                    tracing::debug!(program, %err, "merge tool could not be spawned");
                }
            }
        }

        // Lossy degradation: keep the first input, drop the rest.
        tracing::warn!(
            dropped = inputs.len() - 1,
            output = %output.display(),
            "no merge tool available, keeping first chart only"
        );
        copy_into_place(&inputs[0], output)
    }
}

fn copy_into_place(source: &Path, output: &Path) -> Result<(), DocketError> {
    fs::copy(source, output).map_err(|err| {
        DocketError::ChartMerge(format!(
            "copy {} to {}: {err}",
            source.display(),
            output.display()
        ))
    })?;
    util::restrict_permissions(output).map_err(|err| DocketError::ChartMerge(err.to_string()))
}
