//! RZ-009: Script generation: shell hand-off.
//!
//! Produces two things:
//! - the companion source file an interactive shell starts with
//!   (`bash --rcfile`), chaining the bake file, the user's rcfile and the
//!   post-init hook
//! - the hand-off script printed on stdout for the calling shell to eval:
//!   exports, then either a batch `bash -s` or an interactive `bash --rcfile`,
//!   then removal of the handed-off temp files

use super::artifacts::remove_quietly;
use super::config::ShellConfig;
use super::error::EnvError;
use super::executor::EnvSession;
use super::types::{EnvExports, EnvOptions, EnvironmentContext};
use std::io::Write;
use std::path::Path;

/// POSIX single-quote a value.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// `export NAME='value';` for each exported variable.
pub fn export_lines(exports: &EnvExports) -> String {
    exports
        .iter()
        .map(|(name, value)| format!("export {}={};\n", name, shell_quote(value)))
        .collect()
}

/// Contents of the source file for the interactive path.
pub fn source_file_contents(
    bake: &Path,
    rcfile: Option<&Path>,
    quiet: bool,
    shell: &ShellConfig,
) -> String {
    let mut s = format!("source {}\n", shell_quote(&bake.to_string_lossy()));
    if let Some(rc) = rcfile {
        s.push_str(&format!("source {}\n", shell_quote(&rc.to_string_lossy())));
    }
    s.push_str(&format!("source {}\n", shell.bashrc_hook));
    if !quiet {
        s.push_str("echo\n");
        s.push_str("echo You are now in a new environment.\n");
        s.push_str(&format!("{}\n", shell.context_info));
    }
    s
}

/// Full hand-off script for the calling shell.
pub fn handoff_script(
    session: &EnvSession,
    opts: &EnvOptions,
    ctx: &EnvironmentContext,
) -> String {
    let bake = shell_quote(&session.files.bake.to_string_lossy());
    let mut s = export_lines(&session.exports);

    if opts.stdin {
        s.push_str(&format!("source {};\n", bake));
        match opts.rcfile {
            Some(ref rc) => s.push_str(&format!("source {};\n", shell_quote(&rc.to_string_lossy()))),
            None if ctx.has_bashrc => s.push_str("source ~/.bashrc &> /dev/null;\n"),
            None => {}
        }
        // rez-config must be available even if the rcfile doesn't source it
        s.push_str("source $REZ_PATH/init.sh;\n");
        s.push_str("bash -s;\n");
        s.push_str("ret=$?;\n");
    } else {
        let source = shell_quote(&session.files.source.to_string_lossy());
        s.push_str(&format!("bash --rcfile {};\n", source));
        s.push_str("ret=$?;\n");
        s.push_str(&format!("rm -f {};\n", source));
    }

    s.push_str(&format!("rm -f {};\n", bake));
    s
}

/// Consumes a resolved session and starts (or arranges) the new shell.
pub trait ShellSpawner {
    fn spawn(
        &mut self,
        session: &EnvSession,
        opts: &EnvOptions,
        ctx: &EnvironmentContext,
    ) -> Result<(), EnvError>;
}

/// Writes the hand-off script for the caller to eval. The emitted script
/// deletes the bake and source files once the shell exits.
pub struct ScriptHandoff<W: Write> {
    out: W,
}

impl<W: Write> ScriptHandoff<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ShellSpawner for ScriptHandoff<W> {
    fn spawn(
        &mut self,
        session: &EnvSession,
        opts: &EnvOptions,
        ctx: &EnvironmentContext,
    ) -> Result<(), EnvError> {
        let script = handoff_script(session, opts, ctx);
        let written = self
            .out
            .write_all(script.as_bytes())
            .and_then(|()| self.out.flush());
        if let Err(e) = written {
            // nobody will run the rm lines
            for path in [&session.files.bake, &session.files.source] {
                remove_quietly(path);
            }
            return Err(EnvError::io("cannot write hand-off script for", &session.files.bake, e));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::artifacts::HandedOff;
    use crate::core::types::{CONTEXT_FILE_VAR, PROMPT_VAR, RAW_REQUEST_VAR};
    use std::path::PathBuf;

    fn session() -> EnvSession {
        let mut exports = EnvExports::default();
        exports.push(RAW_REQUEST_VAR, "foo-1.0 bar");
        exports.push(CONTEXT_FILE_VAR, "/tmp/.rez-context.abc");
        exports.push(PROMPT_VAR, ">");
        EnvSession {
            request: "foo-1.0 bar".into(),
            raw_request: "foo-1.0 bar".into(),
            files: HandedOff {
                bake: PathBuf::from("/tmp/.rez-context.abc"),
                source: PathBuf::from("/tmp/.rez-context.abc.source"),
            },
            exports,
        }
    }

    #[test]
    fn test_rz009_shell_quote() {
        assert_eq!(shell_quote("foo bar"), "'foo bar'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_rz009_export_lines() {
        let out = export_lines(&session().exports);
        assert!(out.contains("export REZ_RAW_REQUEST='foo-1.0 bar';\n"));
        assert!(out.contains("export REZ_CONTEXT_FILE='/tmp/.rez-context.abc';\n"));
    }

    #[test]
    fn test_rz009_source_file_not_quiet() {
        let s = source_file_contents(
            Path::new("/tmp/ctx"),
            Some(Path::new("/home/u/.rezrc")),
            false,
            &ShellConfig::default(),
        );
        assert_eq!(
            s,
            "source '/tmp/ctx'\nsource '/home/u/.rezrc'\nsource rez-env-bashrc\necho\n\
             echo You are now in a new environment.\nrez-context-info\n"
        );
    }

    #[test]
    fn test_rz009_source_file_quiet() {
        let s = source_file_contents(Path::new("/tmp/ctx"), None, true, &ShellConfig::default());
        assert_eq!(s, "source '/tmp/ctx'\nsource rez-env-bashrc\n");
    }

    #[test]
    fn test_rz009_interactive_script() {
        let s = handoff_script(&session(), &EnvOptions::default(), &EnvironmentContext::default());
        assert!(s.contains("bash --rcfile '/tmp/.rez-context.abc.source';\nret=$?;\n"));
        assert!(s.contains("rm -f '/tmp/.rez-context.abc.source';\n"));
        assert!(s.ends_with("rm -f '/tmp/.rez-context.abc';\n"));
        assert!(!s.contains("bash -s"));
    }

    #[test]
    fn test_rz009_stdin_script_with_bashrc() {
        let opts = EnvOptions { stdin: true, ..Default::default() };
        let ctx = EnvironmentContext { has_bashrc: true, ..Default::default() };
        let s = handoff_script(&session(), &opts, &ctx);
        assert!(s.contains("source '/tmp/.rez-context.abc';\n"));
        assert!(s.contains("source ~/.bashrc &> /dev/null;\n"));
        assert!(s.contains("source $REZ_PATH/init.sh;\nbash -s;\nret=$?;\n"));
        assert!(!s.contains("--rcfile"));
    }

    #[test]
    fn test_rz009_stdin_script_with_rcfile() {
        let opts = EnvOptions {
            stdin: true,
            rcfile: Some(PathBuf::from("/home/u/.rezrc")),
            ..Default::default()
        };
        let ctx = EnvironmentContext { has_bashrc: true, ..Default::default() };
        let s = handoff_script(&session(), &opts, &ctx);
        assert!(s.contains("source '/home/u/.rezrc';\n"));
        assert!(!s.contains(".bashrc"));
    }

    #[test]
    fn test_rz009_script_handoff_writes() {
        let mut spawner = ScriptHandoff::new(Vec::new());
        spawner
            .spawn(&session(), &EnvOptions::default(), &EnvironmentContext::default())
            .unwrap();
        let out = String::from_utf8(spawner.into_inner()).unwrap();
        assert!(out.starts_with("export REZ_RAW_REQUEST='foo-1.0 bar';"));
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_rz009_failed_handoff_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session();
        s.files.bake = dir.path().join("bake");
        s.files.source = dir.path().join("bake.source");
        std::fs::write(&s.files.bake, "export X=1").unwrap();
        std::fs::write(&s.files.source, "source bake").unwrap();

        let err = ScriptHandoff::new(BrokenPipe)
            .spawn(&s, &EnvOptions::default(), &EnvironmentContext::default())
            .unwrap_err();
        assert!(matches!(err, EnvError::Io { .. }));
        assert!(!s.files.bake.exists());
        assert!(!s.files.source.exists());
    }
}
