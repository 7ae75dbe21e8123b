/// Operating systems where a command is invoked by its bare name and
/// resolved through the search path
const KNOWN_SYSTEMS: &[&str] = &[
    "linux", "macos", "windows", "freebsd", "netbsd", "openbsd", "dragonfly", "illumos",
    "solaris",
];

/// Host platform used to decide how a command is invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    os: String,
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

impl Platform {
    /// Platform the binary was compiled for
    pub fn current() -> Self {
        Self::named(std::env::consts::OS)
    }

    /// Platform with an explicit OS name (as in `std::env::consts::OS`)
    pub fn named(os: impl Into<String>) -> Self {
        Self { os: os.into() }
    }

    /// Get the OS name
    pub fn os(&self) -> &str {
        &self.os
    }

    /// Program to execute for `command`, or `None` when the OS is unknown
    pub fn program_for(&self, command: &str) -> Option<String> {
        if KNOWN_SYSTEMS.contains(&self.os.as_str()) {
            Some(command.to_string())
        } else {
            None
        }
    }
}
