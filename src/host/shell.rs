//! NM-021: Synchronous shell execution for `hiddenConsole` and `shell()`.

use super::ExecOutput;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Run shell text through `bash` and wait for it.
///
/// The text is fed on stdin verbatim; callers do their own quoting.
pub fn exec(script: &str, cwd: Option<&Path>) -> Result<ExecOutput, String> {
    let mut command = Command::new("bash");
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let mut child = command
        .spawn()
        .map_err(|e| format!("failed to spawn bash: {}", e))?;

    if let Some(ref mut stdin) = child.stdin {
        stdin
            .write_all(script.as_bytes())
            .map_err(|e| format!("stdin write error: {}", e))?;
    }

    let output = child
        .wait_with_output()
        .map_err(|e| format!("wait error: {}", e))?;

    Ok(ExecOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Run shell text and fail on a non-zero exit.
pub fn exec_checked(script: &str, cwd: Option<&Path>) -> Result<ExecOutput, String> {
    let out = exec(script, cwd)?;
    if out.success() {
        Ok(out)
    } else {
        Err(format!("exit code {}: {}", out.exit_code, out.stderr.trim()))
    }
}
