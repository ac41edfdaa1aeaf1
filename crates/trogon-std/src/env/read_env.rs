use std::env::VarError;
use std::str::FromStr;

/// Read access to environment variables.
///
/// Configuration is resolved through this trait so tests can supply values
/// without touching the process environment.
pub trait ReadEnv {
    fn var(&self, key: &str) -> Result<String, VarError>;

    /// Returns the value only when it is set and not blank.
    fn non_empty(&self, key: &str) -> Option<String> {
        self.var(key).ok().filter(|v| !v.trim().is_empty())
    }

    /// Parses the value, yielding `None` when unset or unparsable.
    fn parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        self.var(key).ok().and_then(|v| v.trim().parse().ok())
    }
}
