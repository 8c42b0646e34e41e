use std::{
    future::Future,
    io,
    process::Stdio,
    sync::atomic::{AtomicUsize, Ordering},
};

use owo_colors::{AnsiColors, OwoColorize};
use stacked_errors::{Error, Result, StackableErr};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    process,
};
use tracing::{debug, info};

use crate::{Command, CommandResult, DeployError};

// note that most things should use `_locationless`, especially if they are
// expected to be able to error under normal `Command` running circumstances,
// the string info should be enough

pub(crate) async fn run_to_completion(this: Command) -> Result<CommandResult> {
    let mut cmd = process::Command::new(&this.program);
    cmd.args(&this.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    let output = match cmd.output().await {
        Ok(output) => output,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::from_err_locationless(DeployError::ProgramNotFound {
                program: this.program.to_string_lossy().into_owned(),
            }))
        }
        Err(e) => {
            return Err(Error::from_err_locationless(e)).stack_err_with_locationless(|| {
                format!("{this:?}.run_to_completion() -> failed to spawn or wait on process")
            })
        }
    };
    Ok(CommandResult {
        command: this,
        status: Some(output.status),
        stdout: output.stdout,
        stderr: output.stderr,
    })
}

/// Something that can run a [Command] to completion. Container runtimes are
/// generic over this so that the exact commands they issue can be observed
/// without spawning processes.
pub trait CommandExecutor {
    fn execute(&self, command: Command) -> impl Future<Output = Result<CommandResult>>;
}

/// Runs commands as real OS processes. Commands with `debug` set have their
/// captured output echoed with a colored line prefix after they complete.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl CommandExecutor for SystemExecutor {
    async fn execute(&self, command: Command) -> Result<CommandResult> {
        let debug = command.debug;
        if debug {
            info!("Executing command: {}", command.get_unified_command());
        } else {
            debug!("Executing command: {}", command.get_unified_command());
        }
        let comres = command.run_to_completion().await?;
        debug!(status = ?comres.status, "command completed");
        if debug {
            echo_output(&comres).await.stack()?;
        }
        Ok(comres)
    }
}

const TERMINAL_COLORS: [AnsiColors; 6] = [
    AnsiColors::Cyan,
    AnsiColors::Magenta,
    AnsiColors::Blue,
    AnsiColors::Yellow,
    AnsiColors::Green,
    AnsiColors::BrightCyan,
];

static NEXT_COLOR: AtomicUsize = AtomicUsize::new(0);

/// Cycles through a set of colors that are readable on most terminals, so that
/// output from consecutive commands can be told apart
pub fn next_terminal_color() -> AnsiColors {
    TERMINAL_COLORS[NEXT_COLOR.fetch_add(1, Ordering::Relaxed) % TERMINAL_COLORS.len()]
}

/// Writes the captured stdout and stderr of `comres` to the standard streams of
/// this process, prefixing every line
pub async fn echo_output(comres: &CommandResult) -> Result<()> {
    let program = comres.command.program.to_string_lossy();
    let color = next_terminal_color();
    let stdout_prefix = format!("{program}  | ").color(color).to_string();
    let stderr_prefix = format!("{program} E| ").color(color).to_string();
    write_prefixed(&mut tokio::io::stdout(), &comres.stdout, &stdout_prefix)
        .await
        .stack_err("echo_output -> failed to write to stdout")?;
    write_prefixed(&mut tokio::io::stderr(), &comres.stderr, &stderr_prefix)
        .await
        .stack_err("echo_output -> failed to write to stderr")?;
    Ok(())
}

/// Writes `bytes` line by line with `prefix` inserted before every line.
/// Invalid UTF-8 is replaced, and a final newline is added if missing.
pub(crate) async fn write_prefixed<W: AsyncWrite + Unpin>(
    w: &mut W,
    bytes: &[u8],
    prefix: &str,
) -> io::Result<()> {
    if bytes.is_empty() {
        return Ok(())
    }
    let mut buf = Vec::with_capacity(bytes.len());
    // `lines_with_terminator` avoids the issue with `lines` where a final newline
    // is indistinguishable from no newline
    for line in bstr::ByteSlice::lines_with_terminator(bytes) {
        buf.extend_from_slice(prefix.as_bytes());
        buf.extend_from_slice(bstr::ByteSlice::to_str_lossy(line).as_bytes());
    }
    if buf.last() != Some(&b'\n') {
        buf.push(b'\n');
    }
    w.write_all(&buf).await?;
    w.flush().await
}
