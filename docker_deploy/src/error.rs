use std::fmt;

/// Failure kinds that callers may want to tell apart. These are pushed onto
/// `stacked_errors::Error` stacks like any other error.
#[derive(Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeployError {
    /// The OS could not find the program to spawn
    #[error("`{program}` was not found, make sure it is installed and on PATH")]
    ProgramNotFound { program: String },
    /// The command ran but did not exit successfully
    #[error(
        "`{command}` failed with {}\nstdout: {stdout}\nstderr: {stderr}",
        exit_code_str(.code)
    )]
    CommandFailed {
        command: String,
        /// `None` if the process was terminated by a signal
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

// the `Display` output is what should show up in error stacks
impl fmt::Debug for DeployError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn exit_code_str(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code (terminated by signal)".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failed_display() {
        let e = DeployError::CommandFailed {
            command: "docker pull nginx:latest".to_owned(),
            code: Some(1),
            stdout: String::new(),
            stderr: "manifest unknown".to_owned(),
        };
        let s = e.to_string();
        assert!(s.contains("`docker pull nginx:latest` failed with exit code 1"));
        assert!(s.contains("stderr: manifest unknown"));

        let e = DeployError::CommandFailed {
            command: "docker stop app".to_owned(),
            code: None,
            stdout: String::new(),
            stderr: String::new(),
        };
        assert!(e.to_string().contains("terminated by signal"));
    }

    #[test]
    fn program_not_found_display() {
        let e = DeployError::ProgramNotFound {
            program: "docker".to_owned(),
        };
        assert_eq!(
            e.to_string(),
            "`docker` was not found, make sure it is installed and on PATH"
        );
    }
}
