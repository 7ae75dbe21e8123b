use std::fmt;

/// Command name plus its fully formed argument vector
///
/// Arguments are passed to the process as-is; no shell is involved and no
/// quoting is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    command: String,
    args: Vec<String>,
}

impl Invocation {
    /// Create a new invocation
    pub fn new<I, S>(command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Get the command name
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Get the arguments in order
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
