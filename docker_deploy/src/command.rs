use core::fmt;
use std::{
    borrow::Cow,
    ffi::{OsStr, OsString},
    fmt::{Debug, Display},
    process::ExitStatus,
    str::Utf8Error,
};

use stacked_errors::{DisplayStr, Error, Result};

use crate::{command_runner, DeployError};

/// An OS command, a thin layer over `tokio::process::Command` that records the
/// output of the process and carries enough information to produce useful
/// failure messages.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Command {
    /// The program to run.
    pub program: OsString,
    /// All the arguments that will be passed to the program
    pub args: Vec<OsString>,
    /// If set, executors echo the captured stdout and stderr to the standard
    /// streams of the current process after the command completes
    pub debug: bool,
}

impl Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!(
            "Command {{ program: {:?},",
            DisplayStr(&self.get_unified_command()),
        ))?;
        if self.debug {
            f.write_fmt(format_args!(" debug: true,"))?;
        }
        f.write_fmt(format_args!(" }}"))
    }
}

impl Command {
    /// Creates a new `Command` for launching the `program`. This has no
    /// preprocessing of the input like [Command::new] does.
    pub fn new_os_str(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().into(),
            ..Default::default()
        }
    }

    /// Creates a `Command` that only sets the `program` and `args`.
    /// `program_with_args` is separated by whitespace, the first part becomes
    /// the progam, and the the others are inserted as args.
    ///
    /// In case an argument has spaces, it should be put into `arg` as an
    /// unbroken `&str`.
    ///
    /// ```
    /// use docker_deploy::Command;
    ///
    /// let command = Command::new("docker ps -a").arg("--format").arg("{{.Names}}");
    /// assert_eq!(command.get_unified_command(), "docker ps -a --format {{.Names}}");
    /// ```
    pub fn new(program_with_args: impl AsRef<str>) -> Self {
        let mut program = String::new();
        let mut args: Vec<OsString> = vec![];
        for (i, part) in program_with_args.as_ref().split_whitespace().enumerate() {
            if i == 0 {
                part.clone_into(&mut program)
            } else {
                args.push(part.into());
            }
        }
        Self {
            program: program.into(),
            args,
            ..Default::default()
        }
    }

    /// Adds an argument
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().into());
        self
    }

    /// Adds arguments to be passed to the program
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|s| s.as_ref().into()));
        self
    }

    /// Sets `debug`
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Gets the program and args interspersed with spaces
    pub fn get_unified_command(&self) -> String {
        let mut command = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            command.push(' ');
            command += arg.to_string_lossy().as_ref();
        }
        command
    }

    /// Spawns the command and waits for it to complete, returning the command
    /// result. Note: If this function succeeds, it only means that the process
    /// could be spawned and waited on, use `assert_success` or check the
    /// `status` on the `CommandResult` for the exit status.
    ///
    /// If the program cannot be found, the error contains
    /// [DeployError::ProgramNotFound].
    pub async fn run_to_completion(self) -> Result<CommandResult> {
        command_runner::run_to_completion(self).await
    }
}

/// The result of a [Command](crate::Command)
#[must_use]
#[derive(Clone, Default)]
pub struct CommandResult {
    // the command information is kept around for failures
    pub command: Command,
    pub status: Option<ExitStatus>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl Debug for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!(
            "CommandResult {{\ncommand: {:?},\nstatus: {:?},\n",
            self.command, self.status
        ))?;
        // move the commas out of the way of the stdout and stderr
        let stdout = self.stdout_as_utf8_lossy();
        if !stdout.is_empty() {
            f.write_fmt(format_args!("stdout: {}\n,", stdout))?;
        }
        let stderr = self.stderr_as_utf8_lossy();
        if !stderr.is_empty() {
            f.write_fmt(format_args!("stderr: {}\n,", stderr))?;
        }
        f.write_fmt(format_args!("}}"))
    }
}

impl Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{:#?}", self))
    }
}

impl CommandResult {
    /// Returns if the command completed with a successful return status
    pub fn successful(&self) -> bool {
        if let Some(status) = self.status.as_ref() {
            status.success()
        } else {
            false
        }
    }

    /// Returns the exit code, if the command completed with one
    pub fn code(&self) -> Option<i32> {
        self.status.as_ref().and_then(|status| status.code())
    }

    /// Returns a [DeployError::CommandFailed] with the command line, exit code,
    /// and captured output if the command was not successful
    pub fn assert_success(&self) -> Result<()> {
        if self.successful() {
            Ok(())
        } else {
            Err(Error::from_err_locationless(DeployError::CommandFailed {
                command: self.command.get_unified_command(),
                code: self.code(),
                stdout: self.stdout_as_utf8_lossy().trim_end().to_owned(),
                stderr: self.stderr_as_utf8_lossy().trim_end().to_owned(),
            }))
        }
    }

    /// Returns `str::from_utf8(&self.stdout)`
    pub fn stdout_as_utf8(&self) -> std::result::Result<&str, Utf8Error> {
        std::str::from_utf8(&self.stdout)
    }

    /// Returns `str::from_utf8(&self.stderr)`
    pub fn stderr_as_utf8(&self) -> std::result::Result<&str, Utf8Error> {
        std::str::from_utf8(&self.stderr)
    }

    /// Returns `String::from_utf8_lossy(&self.stdout)`
    pub fn stdout_as_utf8_lossy(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.stdout)
    }

    /// Returns `String::from_utf8_lossy(&self.stderr)`
    pub fn stderr_as_utf8_lossy(&self) -> Cow<str> {
        String::from_utf8_lossy(&self.stderr)
    }
}
