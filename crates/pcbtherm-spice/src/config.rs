//! Simulator configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpiceError};

/// Analysis line written to the netlist.
///
/// The network has no storage elements, so a transient run settles at the
/// steady state and its last point equals the operating point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Analysis {
    /// `.op`
    Op,
    /// `.tran step stop`
    Tran { step: f64, stop: f64 },
}

impl Default for Analysis {
    fn default() -> Self {
        Analysis::Tran {
            step: 0.1,
            stop: 0.1,
        }
    }
}

impl Analysis {
    /// Netlist control lines for this analysis.
    pub fn control_lines(&self) -> Vec<String> {
        match self {
            Analysis::Op => vec![".op".to_string()],
            Analysis::Tran { step, stop } => {
                vec![format!(".tran {step} {stop}"), ".print tran".to_string()]
            }
        }
    }
}

/// How to run the external simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpiceConfig {
    /// Program to execute, looked up on `PATH` when not absolute.
    pub program: String,
    /// Arguments; `{netlist}`, `{raw}` and `{log}` are replaced by file paths.
    pub args: Vec<String>,
    /// Base name of the netlist, raw and log files.
    pub basename: String,
    /// Directory for simulator files. A fresh temporary directory when unset.
    pub work_dir: Option<PathBuf>,
    /// Leave the simulator files behind after the run.
    pub keep_files: bool,
    pub timeout_secs: u64,
    pub analysis: Analysis,
    /// Separator between the x and y parts of node names.
    pub node_separator: String,
}

impl Default for SpiceConfig {
    fn default() -> Self {
        Self {
            program: "Xyce".to_string(),
            args: ["{netlist}", "-a", "-r", "{raw}", "-l", "{log}"]
                .into_iter()
                .map(String::from)
                .collect(),
            basename: "therm".to_string(),
            work_dir: None,
            keep_files: false,
            timeout_secs: 600,
            analysis: Analysis::default(),
            node_separator: "U".to_string(),
        }
    }
}

/// Paths of the files exchanged with the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimFiles {
    pub netlist: PathBuf,
    pub raw: PathBuf,
    pub log: PathBuf,
}

impl SpiceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.program.trim().is_empty() {
            return Err(SpiceError::InvalidConfig("empty program name".into()));
        }
        if self.basename.trim().is_empty() {
            return Err(SpiceError::InvalidConfig("empty file basename".into()));
        }
        if self.timeout_secs == 0 {
            return Err(SpiceError::InvalidConfig("timeout must be positive".into()));
        }
        if self.node_separator.is_empty()
            || self.node_separator.chars().any(|c| c.is_whitespace() || c.is_ascii_digit())
        {
            return Err(SpiceError::InvalidConfig(format!(
                "node separator '{}' must be non-empty and free of digits and whitespace",
                self.node_separator
            )));
        }
        if let Analysis::Tran { step, stop } = self.analysis {
            if !(step > 0.0 && stop > 0.0) {
                return Err(SpiceError::InvalidConfig(format!(
                    "transient step {step} and stop {stop} must be positive"
                )));
            }
        }
        Ok(())
    }

    /// File names inside `dir`.
    pub fn files_in(&self, dir: &Path) -> SimFiles {
        SimFiles {
            netlist: dir.join(format!("{}.cki", self.basename)),
            raw: dir.join(format!("{}.asc", self.basename)),
            log: dir.join(format!("{}.txt", self.basename)),
        }
    }

    /// Arguments with the placeholders substituted.
    pub fn expand_args(&self, files: &SimFiles) -> Vec<String> {
        let netlist = files.netlist.display().to_string();
        let raw = files.raw.display().to_string();
        let log = files.log.display().to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{netlist}", &netlist)
                    .replace("{raw}", &raw)
                    .replace("{log}", &log)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_command_line() {
        let config = SpiceConfig::default();
        config.validate().unwrap();
        let files = config.files_in(Path::new("/tmp/run"));
        assert_eq!(files.netlist, PathBuf::from("/tmp/run/therm.cki"));
        assert_eq!(
            config.expand_args(&files),
            vec![
                "/tmp/run/therm.cki",
                "-a",
                "-r",
                "/tmp/run/therm.asc",
                "-l",
                "/tmp/run/therm.txt"
            ]
        );
    }

    #[test]
    fn analysis_lines() {
        assert_eq!(Analysis::Op.control_lines(), vec![".op"]);
        assert_eq!(
            Analysis::default().control_lines(),
            vec![".tran 0.1 0.1", ".print tran"]
        );
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: SpiceConfig =
            serde_json::from_str(r#"{"program": "ngspice", "analysis": {"type": "op"}}"#).unwrap();
        assert_eq!(config.program, "ngspice");
        assert_eq!(config.analysis, Analysis::Op);
        assert_eq!(config.basename, "therm");
        assert_eq!(config.timeout_secs, 600);
    }

    #[test]
    fn invalid_settings_rejected() {
        let mut config = SpiceConfig::default();
        config.node_separator = "1".into();
        assert!(matches!(config.validate(), Err(SpiceError::InvalidConfig(_))));

        let mut config = SpiceConfig::default();
        config.analysis = Analysis::Tran { step: 0.0, stop: 1.0 };
        assert!(config.validate().is_err());

        let mut config = SpiceConfig::default();
        config.program = " ".into();
        assert!(config.validate().is_err());
    }
}
