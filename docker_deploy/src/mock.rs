//! A scripted `CommandExecutor` for tests

use std::{process::ExitStatus, sync::Mutex};

use stacked_errors::Result;

use crate::{Command, CommandExecutor, CommandResult};

#[cfg(unix)]
pub(crate) fn exit_status(code: i32) -> ExitStatus {
    std::os::unix::process::ExitStatusExt::from_raw(code << 8)
}

#[cfg(windows)]
pub(crate) fn exit_status(code: i32) -> ExitStatus {
    std::os::windows::process::ExitStatusExt::from_raw(code as u32)
}

/// Records every command line it is asked to execute. A command whose line
/// starts with the prefix of a response gets that response, the first match
/// wins. Unmatched commands succeed with empty output.
#[derive(Debug, Default)]
pub(crate) struct MockExecutor {
    responses: Vec<(String, i32, String)>,
    pub(crate) issued: Mutex<Vec<String>>,
}

impl MockExecutor {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(mut self, prefix: &str, code: i32, stdout: &str) -> Self {
        self.responses
            .push((prefix.to_owned(), code, stdout.to_owned()));
        self
    }

    pub(crate) fn issued(&self) -> Vec<String> {
        self.issued.lock().unwrap().clone()
    }
}

impl CommandExecutor for MockExecutor {
    async fn execute(&self, command: Command) -> Result<CommandResult> {
        let line = command.get_unified_command();
        self.issued.lock().unwrap().push(line.clone());
        let (code, stdout) = self
            .responses
            .iter()
            .find(|(prefix, ..)| line.starts_with(prefix.as_str()))
            .map(|(_, code, stdout)| (*code, stdout.clone()))
            .unwrap_or_default();
        let stderr = if code == 0 {
            String::new()
        } else {
            format!("mock failure of `{line}`")
        };
        Ok(CommandResult {
            command,
            status: Some(exit_status(code)),
            stdout: stdout.into_bytes(),
            stderr: stderr.into_bytes(),
        })
    }
}
