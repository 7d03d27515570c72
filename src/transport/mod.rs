//! RZ-010: Process transport: run external tools (resolver, dot renderer,
//! wrapper expander) as blocking child processes.

pub mod local;

use std::path::PathBuf;

/// Output from running an external tool.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A fully described tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Environment overrides for the child only
    pub env: Vec<(String, String)>,
    /// Send stdout to this file instead of capturing it
    pub stdout_file: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, name: &str, value: impl Into<String>) -> Self {
        self.env.push((name.to_string(), value.into()));
        self
    }

    pub fn stdout_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout_file = Some(path.into());
        self
    }

    /// Command line for log output.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Run a tool on this host.
pub fn exec(cmd: &ToolCommand) -> Result<ExecOutput, String> {
    tracing::debug!(command = %cmd.display(), "running external tool");
    local::exec_local(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rz010_exec_output_success() {
        let ok = ExecOutput { exit_code: 0, stdout: "ok".into(), stderr: "".into() };
        assert!(ok.success());
        let fail = ExecOutput { exit_code: 1, stdout: "".into(), stderr: "err".into() };
        assert!(!fail.success());
        let sig = ExecOutput { exit_code: -1, stdout: "".into(), stderr: "".into() };
        assert!(!sig.success());
    }

    #[test]
    fn test_rz010_builder_and_display() {
        let cmd = ToolCommand::new("rez-config")
            .arg("--print-env")
            .args(["--mode=latest", "foo"])
            .env("REZ_PACKAGES_PATH", "/x");
        assert_eq!(cmd.display(), "rez-config --print-env --mode=latest foo");
        assert_eq!(cmd.env, vec![("REZ_PACKAGES_PATH".to_string(), "/x".to_string())]);
        assert!(cmd.stdout_file.is_none());
    }

    #[test]
    fn test_rz010_exec_delegates_to_local() {
        let out = exec(&ToolCommand::new("sh").args(["-c", "echo delegated"])).unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "delegated");
    }
}
