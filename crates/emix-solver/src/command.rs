//! External install-command execution.
//!
//! Each supported solver maps to one precomputed, static argument vector for
//! the AMPL module installer. Commands are looked up from a fixed table and
//! never built by concatenating caller input into a shell string, so solver
//! names present no shell-injection surface.

use crate::error::{SolverError, SolverResult};
use crate::SolverName;
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// Poll interval while waiting for the child process.
const WAIT_POLL: Duration = Duration::from_millis(50);

/// A static install command for one solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallCommand {
    argv: &'static [&'static str],
}

impl InstallCommand {
    /// Look up the install command for a solver from the fixed table.
    pub fn for_solver(name: SolverName) -> Self {
        let argv: &'static [&'static str] = match name {
            SolverName::Highs => &["python3", "-m", "amplpy.modules", "install", "highs"],
            SolverName::Cbc => &["python3", "-m", "amplpy.modules", "install", "cbc"],
            SolverName::Scip => &["python3", "-m", "amplpy.modules", "install", "scip"],
            SolverName::Couenne => &["python3", "-m", "amplpy.modules", "install", "couenne"],
            SolverName::Gurobi => &["python3", "-m", "amplpy.modules", "install", "gurobi"],
        };
        Self { argv }
    }

    /// The literal command line a human operator can run manually.
    pub fn display(&self) -> String {
        self.argv.join(" ")
    }

    /// The argument vector.
    pub fn argv(&self) -> &'static [&'static str] {
        self.argv
    }

    /// Run the command with a bounded wait, capturing combined
    /// stdout/stderr.
    ///
    /// The child is always reaped before this returns: on timeout it is
    /// killed and waited on, and its exit is reported as
    /// [`SolverError::Timeout`]. A nonzero exit status is not an error at
    /// this level; callers inspect [`CommandOutcome::success`].
    pub fn run(&self, timeout: Duration) -> SolverResult<CommandOutcome> {
        let mut child = Command::new(self.argv[0])
            .args(&self.argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(SolverError::ProcessStart)?;

        // Drain both pipes on helper threads so a chatty installer cannot
        // deadlock against a full pipe buffer while we poll for exit.
        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");
        let out_reader = std::thread::spawn(move || read_all(stdout));
        let err_reader = std::thread::spawn(move || read_all(stderr));

        let status = match wait_with_deadline(&mut child, timeout) {
            Ok(status) => status,
            Err(err) => {
                // Kill, reap, and let the readers observe EOF before
                // surfacing the timeout.
                let _ = child.kill();
                let _ = child.wait();
                let _ = out_reader.join();
                let _ = err_reader.join();
                return Err(err);
            }
        };

        let mut output = out_reader.join().unwrap_or_default();
        let err_output = err_reader.join().unwrap_or_default();
        if !err_output.is_empty() {
            if !output.is_empty() && !output.ends_with('\n') {
                output.push('\n');
            }
            output.push_str(&err_output);
        }

        Ok(CommandOutcome {
            success: status,
            output,
        })
    }
}

/// Result of one external command invocation.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Combined stdout/stderr text.
    pub output: String,
}

fn read_all(mut source: impl Read) -> String {
    let mut buf = Vec::new();
    let _ = source.read_to_end(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Poll the child until exit or deadline. Returns whether the exit status
/// was success, or `SolverError::Timeout` once the deadline passes.
fn wait_with_deadline(child: &mut Child, timeout: Duration) -> SolverResult<bool> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status.success());
        }
        if Instant::now() >= deadline {
            return Err(SolverError::Timeout {
                seconds: timeout.as_secs(),
            });
        }
        std::thread::sleep(WAIT_POLL);
    }
}
