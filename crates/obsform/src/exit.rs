use std::process::ExitCode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Status {
    Success,
    Error,
}

/// Outcome of a command: an exit status and an optional summary for stderr.
#[derive(Debug)]
pub struct Exit {
    status: Status,
    message: Option<String>,
}

impl Exit {
    #[must_use]
    pub fn success() -> Self {
        Self {
            status: Status::Success,
            message: None,
        }
    }

    #[must_use]
    pub fn error() -> Self {
        Self {
            status: Status::Error,
            message: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Print the summary unless `quiet` and turn the outcome into a process
    /// exit code.
    pub fn report(self, quiet: bool) -> ExitCode {
        if let Some(message) = self.message.filter(|_| !quiet) {
            eprintln!("{message}");
        }
        match self.status {
            Status::Success => ExitCode::SUCCESS,
            Status::Error => ExitCode::FAILURE,
        }
    }
}
