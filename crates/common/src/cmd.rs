use crate::logger;

/// Errors produced by external tool invocations.
#[derive(Debug, thiserror::Error)]
pub enum CmdError {
    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: xshell::Error,
    },
    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Thin wrapper over [`xshell::Cmd`] that captures output and logs the
/// command line in verbose mode.
pub struct Cmd<'a> {
    inner: xshell::Cmd<'a>,
}

impl<'a> Cmd<'a> {
    pub fn new(cmd: xshell::Cmd<'a>) -> Self {
        Self { inner: cmd }
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.inner = self.inner.env(key, value);
        self
    }

    /// Runs the command to completion and returns its stdout.
    pub fn run(self) -> Result<String, CmdError> {
        let command = self.inner.to_string();
        logger::debug(format!("Running: {command}"));

        let output = self
            .inner
            .quiet()
            .ignore_status()
            .output()
            .map_err(|source| CmdError::Spawn {
                command: command.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(CmdError::Failed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}
