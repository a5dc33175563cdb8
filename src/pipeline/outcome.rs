use std::fmt;

/// Result of a pipeline step. `Skipped` is a gap the caller steps over;
/// `Fatal` ends the current fetch cycle.
pub enum Outcome<T> {
    Value(T),
    Skipped(String),
    Fatal(anyhow::Error),
}

impl<T> Outcome<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Outcome::Value(value) => Some(value),
            Outcome::Skipped(_) | Outcome::Fatal(_) => None,
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Outcome::Value(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Outcome::Fatal(_))
    }
}

impl<T: fmt::Debug> fmt::Debug for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Outcome::Skipped(reason) => f.debug_tuple("Skipped").field(reason).finish(),
            Outcome::Fatal(err) => f.debug_tuple("Fatal").field(&format_args!("{err:#}")).finish(),
        }
    }
}
