//! run_python_file tool - execute a script inside the sandbox root

use std::ffi::OsStr;
use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

use crate::config::SandboxConfig;
use crate::sandbox::Root;
use crate::tools::{ParamType, Tool, ToolContext, ToolError, ToolSpec};

use super::{optional_string_array, required_str, truncate_chars};

/// Default wall-clock limit for a script
pub const DEFAULT_SCRIPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Captured result of a finished script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutput {
    /// Trimmed standard output
    pub stdout: String,
    /// Trimmed standard error
    pub stderr: String,
    /// Exit code, `None` if the process was killed by a signal
    pub exit_code: Option<i32>,
}

impl ScriptOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

impl fmt::Display for ScriptOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sections = Vec::new();

        if !self.stdout.is_empty() {
            sections.push(format!("STDOUT:\n{}", self.stdout));
        }
        if !self.stderr.is_empty() {
            sections.push(format!("STDERR:\n{}", self.stderr));
        }
        match self.exit_code {
            Some(0) => {}
            Some(code) => sections.push(format!("Process exited with code {}", code)),
            None => sections.push("Process terminated by a signal".to_string()),
        }

        if sections.is_empty() {
            write!(f, "No output produced.")
        } else {
            write!(f, "{}", sections.join("\n"))
        }
    }
}

/// Execute a script with an interpreter, confined to the sandbox root
pub struct RunScriptTool {
    interpreter: String,
    extension: String,
    timeout: Duration,
    max_output_chars: usize,
}

impl RunScriptTool {
    pub fn new(interpreter: impl Into<String>, extension: impl Into<String>, timeout: Duration) -> Self {
        let interpreter = interpreter.into();
        let extension = extension.into();
        debug!(%interpreter, %extension, ?timeout, "RunScriptTool::new: called");
        Self {
            interpreter,
            extension,
            timeout,
            max_output_chars: SandboxConfig::default().max_output_chars,
        }
    }

    pub fn from_config(config: &SandboxConfig) -> Self {
        Self::new(
            config.interpreter.clone(),
            config.script_extension.clone(),
            Duration::from_millis(config.script_timeout_ms),
        )
        .with_max_output_chars(config.max_output_chars)
    }

    /// Cap each captured stream at `max_chars` characters
    pub fn with_max_output_chars(mut self, max_chars: usize) -> Self {
        self.max_output_chars = max_chars;
        self
    }

    /// Run the script at `path` with `args`
    ///
    /// The process runs with the root as its working directory, stdin
    /// closed and both output streams captured. On timeout the whole
    /// process group is killed before the error is returned.
    pub async fn run(&self, root: &Root, path: &str, args: &[String]) -> Result<ScriptOutput, ToolError> {
        debug!(%path, ?args, "RunScriptTool::run: called");
        let script = root.resolve(path).map_err(|e| ToolError::from_path("execute", path, e))?;

        let is_file = tokio::fs::metadata(&script).await.map(|m| m.is_file()).unwrap_or(false);
        if !is_file {
            debug!(?script, "RunScriptTool::run: script not found");
            return Err(ToolError::NotAFile { path: path.to_string() });
        }

        if script.extension() != Some(OsStr::new(&self.extension)) {
            debug!(?script, extension = %self.extension, "RunScriptTool::run: wrong extension");
            return Err(ToolError::NotExecutableKind {
                path: path.to_string(),
                extension: self.extension.clone(),
            });
        }

        let mut cmd = tokio::process::Command::new(&self.interpreter);
        cmd.arg(&script)
            .args(args)
            .current_dir(root.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group so a timeout can take down grandchildren too
        #[cfg(unix)]
        cmd.process_group(0);

        debug!(interpreter = %self.interpreter, "RunScriptTool::run: spawning script");
        let mut child = cmd
            .spawn()
            .map_err(|e| ToolError::Handler(format!("Failed to start {}: {}", self.interpreter, e)))?;
        let pid = child.id();

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(ToolError::Handler("Script output streams were not captured".to_string()));
        };
        // Worst case of four UTF-8 bytes per kept character
        let limit = self.max_output_chars.saturating_mul(4) as u64;

        let collect = async {
            let (stdout, stderr, status) =
                tokio::join!(read_bounded(stdout, limit), read_bounded(stderr, limit), child.wait());
            Ok::<_, std::io::Error>((stdout?, stderr?, status?))
        };

        let (stdout, stderr, status) = match tokio::time::timeout(self.timeout, collect).await {
            Ok(Ok(collected)) => {
                debug!(status = ?collected.2, "RunScriptTool::run: script completed");
                collected
            }
            Ok(Err(e)) => {
                debug!(%e, "RunScriptTool::run: failed to collect output");
                return Err(ToolError::Handler(format!("Failed to collect script output: {}", e)));
            }
            Err(_) => {
                warn!(%path, timeout = ?self.timeout, "Script timed out, killing process group");
                kill_process_group(pid);
                return Err(ToolError::Timeout {
                    path: path.to_string(),
                    timeout: self.timeout,
                });
            }
        };

        Ok(ScriptOutput {
            stdout: self.capture(stdout),
            stderr: self.capture(stderr),
            exit_code: status.code(),
        })
    }

    fn capture(&self, stream: BoundedOutput) -> String {
        let text = String::from_utf8_lossy(&stream.bytes);
        let trimmed = text.trim();
        match truncate_chars(trimmed, self.max_output_chars) {
            (kept, truncated) if truncated || stream.overflowed => {
                debug!(original_len = trimmed.len(), "RunScriptTool::capture: truncating long output");
                format!("{}\n[...output truncated at {} characters]", kept, self.max_output_chars)
            }
            (kept, _) => kept.to_string(),
        }
    }
}

/// One output stream, cut off at the read limit
struct BoundedOutput {
    bytes: Vec<u8>,
    overflowed: bool,
}

/// Read at most `limit` bytes from `reader`, then drain the rest to EOF
///
/// Draining keeps the script from blocking on a full pipe; only the first
/// `limit` bytes are ever held in memory.
async fn read_bounded<R>(reader: R, limit: u64) -> std::io::Result<BoundedOutput>
where
    R: AsyncRead + Unpin,
{
    let mut bytes = Vec::new();
    let mut limited = reader.take(limit);
    limited.read_to_end(&mut bytes).await?;

    let mut rest = limited.into_inner();
    let discarded = tokio::io::copy(&mut rest, &mut tokio::io::sink()).await?;
    if discarded > 0 {
        debug!(kept = bytes.len(), discarded, "read_bounded: output exceeded limit");
    }

    Ok(BoundedOutput {
        bytes,
        overflowed: discarded > 0,
    })
}

impl Default for RunScriptTool {
    fn default() -> Self {
        Self::from_config(&SandboxConfig::default())
    }
}

/// SIGKILL every process in the script's group
///
/// The direct child is already gone via `kill_on_drop`; this reaches
/// anything it spawned.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(pid) = pid else {
        debug!("kill_process_group: child already reaped");
        return;
    };

    if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        debug!(pid, %e, "kill_process_group: killpg failed (group likely gone)");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

#[async_trait]
impl Tool for RunScriptTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "run_python_file",
            format!(
                "Executes a .{} file in the working directory with optional arguments. Times out after {}s.",
                self.extension,
                self.timeout.as_secs()
            ),
        )
        .param(
            "file_path",
            ParamType::String,
            true,
            "Path to the script relative to the working directory.",
        )
        .param("args", ParamType::Array, false, "Command-line arguments for the script")
    }

    async fn execute(&self, input: Value, ctx: &ToolContext) -> Result<String, ToolError> {
        debug!(?input, "RunScriptTool::execute: called");
        let path = required_str(&input, "file_path")?;
        let args = optional_string_array(&input, "args")?;

        let output = self.run(ctx.root(), path, &args).await?;
        Ok(output.to_string())
    }
}
