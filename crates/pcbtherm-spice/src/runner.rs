//! Simulator subprocess handling.

use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::config::{SimFiles, SpiceConfig};
use crate::error::{Result, SpiceError};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A child process that is killed and reaped when dropped.
#[derive(Debug)]
pub struct ScopedProcess {
    child: Option<Child>,
}

impl ScopedProcess {
    pub fn spawn(mut command: Command) -> std::io::Result<Self> {
        let child = command.spawn()?;
        Ok(Self { child: Some(child) })
    }

    /// Process id of the running child.
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Wait for the child to exit, killing it once `timeout` has elapsed.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Result<ExitStatus> {
        let start = Instant::now();
        loop {
            let Some(child) = self.child.as_mut() else {
                return Err(SpiceError::InvalidConfig("process already reaped".into()));
            };
            let status = child
                .try_wait()
                .map_err(|e| SpiceError::io("simulator process", e))?;
            if let Some(status) = status {
                self.child = None;
                return Ok(status);
            }
            if start.elapsed() >= timeout {
                self.terminate();
                return Err(SpiceError::Timeout {
                    secs: timeout.as_secs(),
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn terminate(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                log::debug!("kill of simulator process {} failed: {e}", child.id());
            }
            let _ = child.wait();
        }
    }
}

impl Drop for ScopedProcess {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Run the configured simulator on the files in `files` and wait for it.
pub fn run_simulator(config: &SpiceConfig, files: &SimFiles, work_dir: &Path) -> Result<()> {
    let mut command = Command::new(&config.program);
    command
        .args(config.expand_args(files))
        .current_dir(work_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    log::debug!(
        "Running {} {}",
        config.program,
        config.expand_args(files).join(" ")
    );
    let mut process = ScopedProcess::spawn(command).map_err(|source| SpiceError::Spawn {
        program: config.program.clone(),
        source,
    })?;
    let status = process.wait_timeout(Duration::from_secs(config.timeout_secs))?;

    if status.success() {
        Ok(())
    } else {
        Err(SpiceError::ExitStatus {
            status: status.to_string(),
            log_tail: log_tail(&files.log),
        })
    }
}

/// Last non-empty line of the simulator log, when there is one.
fn log_tail(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    text.lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

/// First line the simulator prints for its version flag.
pub fn simulator_version(config: &SpiceConfig) -> Result<String> {
    let output = Command::new(&config.program)
        .arg("-v")
        .stdin(Stdio::null())
        .output()
        .map_err(|source| SpiceError::Spawn {
            program: config.program.clone(),
            source,
        })?;
    let text = String::from_utf8_lossy(&output.stdout);
    Ok(text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("unknown version")
        .to_string())
}

/// Whether the configured simulator can be started.
pub fn is_simulator_available(config: &SpiceConfig) -> bool {
    simulator_version(config).is_ok()
}
