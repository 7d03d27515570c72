//! RZ-010: Local execution of external tools.

use super::{ExecOutput, ToolCommand};
use std::fs::File;
use std::process::{Command, Stdio};

/// Run a tool as a child process and wait for it.
///
/// Stdin is closed. When `stdout_file` is set the child's stdout goes
/// straight to that file and `ExecOutput.stdout` is empty.
pub fn exec_local(cmd: &ToolCommand) -> Result<ExecOutput, String> {
    let mut command = Command::new(&cmd.program);
    command
        .args(&cmd.args)
        .envs(cmd.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stderr(Stdio::piped());

    match cmd.stdout_file {
        Some(ref path) => {
            let file = File::create(path)
                .map_err(|e| format!("cannot create {}: {}", path.display(), e))?;
            command.stdout(Stdio::from(file));
        }
        None => {
            command.stdout(Stdio::piped());
        }
    }

    let output = command
        .spawn()
        .map_err(|e| format!("failed to spawn {}: {}", cmd.program, e))?
        .wait_with_output()
        .map_err(|e| format!("wait error: {}", e))?;

    Ok(ExecOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> ToolCommand {
        ToolCommand::new("sh").args(["-c", script])
    }

    #[test]
    fn test_rz010_local_echo() {
        let out = exec_local(&sh("echo hello")).unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[test]
    fn test_rz010_local_failure() {
        let out = exec_local(&sh("exit 42")).unwrap();
        assert!(!out.success());
        assert_eq!(out.exit_code, 42);
    }

    #[test]
    fn test_rz010_local_stderr() {
        let out = exec_local(&sh("echo err >&2")).unwrap();
        assert!(out.success());
        assert!(out.stderr.contains("err"));
    }

    #[test]
    fn test_rz010_local_env_override() {
        let out = exec_local(&sh("echo $REZ_TMP_DIR").env("REZ_TMP_DIR", "/scratch")).unwrap();
        assert_eq!(out.stdout.trim(), "/scratch");
    }

    #[test]
    fn test_rz010_local_stdout_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bake");
        let out = exec_local(&sh("echo 'export FOO=1'").stdout_to(&path)).unwrap();
        assert!(out.success());
        assert!(out.stdout.is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "export FOO=1\n");
    }

    #[test]
    fn test_rz010_local_missing_program() {
        let result = exec_local(&ToolCommand::new("rez-env-no-such-tool-xyz"));
        assert!(result.unwrap_err().contains("failed to spawn"));
    }

    #[test]
    fn test_rz010_local_signal_killed() {
        let out = exec_local(&sh("kill -9 $$")).unwrap();
        assert_eq!(out.exit_code, -1);
    }
}
