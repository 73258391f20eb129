//! Run-time settings passed explicitly into every command.
//!
//! The library never reads environment variables itself. The CLI builds one
//! `Settings` value from its flags (clap also consults the environment for
//! some of them) and hands it down.

/// Settings shared by all commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Suppress informational output on stdout.
    pub quiet: bool,
    /// Fetch named refs with `--depth 1`.
    ///
    /// Must be disabled for transports that do not support shallow
    /// capabilities, e.g. the dumb http transport.
    pub shallow_fetch: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quiet: false,
            shallow_fetch: true,
        }
    }
}

impl Settings {
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn shallow_fetch(mut self, shallow_fetch: bool) -> Self {
        self.shallow_fetch = shallow_fetch;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(!settings.quiet);
        assert!(settings.shallow_fetch);
    }

    #[test]
    fn test_builder_methods() {
        let settings = Settings::default().quiet(true).shallow_fetch(false);
        assert!(settings.quiet);
        assert!(!settings.shallow_fetch);
    }
}
