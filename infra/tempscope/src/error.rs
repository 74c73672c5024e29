use std::borrow::Cow;

/// Errors surfaced by scope construction, name issuance and file opening.
///
/// Teardown failures are deliberately absent: deleting a scope is best-effort and
/// never reported to the caller.
#[derive(Debug, thiserror::Error)]
pub enum TempScopeError {
    #[error("Invalid argument{}: {message}", format_context(.context))]
    InvalidArgument { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Scope construction failure{}: {source}", format_context(.context))]
    Construction { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Temp file open failure{}: {source}", format_context(.context))]
    Open { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

pub type Result<T> = std::result::Result<T, TempScopeError>;

impl TempScopeError {
    pub(crate) fn invalid(
        message: impl Into<Cow<'static, str>>,
        context: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::InvalidArgument { message: message.into(), context: Some(context.into()) }
    }
}

impl From<config::ConfigError> for TempScopeError {
    #[inline]
    fn from(source: config::ConfigError) -> Self {
        Self::Config { source, context: None }
    }
}

/// Attaches human-readable context to scope errors.
pub trait TempScopeErrorExt<T> {
    /// Sets the context of the error, replacing any previous one.
    ///
    /// # Errors
    /// Returns the original error with its context updated.
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T>;
}

impl<T> TempScopeErrorExt<T> for Result<T> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Self {
        self.map_err(|mut e| {
            match &mut e {
                TempScopeError::InvalidArgument { context: c, .. }
                | TempScopeError::Construction { context: c, .. }
                | TempScopeError::Open { context: c, .. }
                | TempScopeError::Config { context: c, .. } => *c = Some(context.into()),
            }
            e
        })
    }
}

impl<T> TempScopeErrorExt<T> for std::result::Result<T, config::ConfigError> {
    #[inline]
    fn context(self, context: impl Into<Cow<'static, str>>) -> Result<T> {
        self.map_err(|source| TempScopeError::Config { source, context: Some(context.into()) })
    }
}

/// Maps raw I/O failures onto the variant matching the failed step.
pub(crate) trait IoResultExt<T> {
    fn construction(self, context: impl Into<Cow<'static, str>>) -> Result<T>;
    fn open(self, context: impl Into<Cow<'static, str>>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    #[inline]
    fn construction(self, context: impl Into<Cow<'static, str>>) -> Result<T> {
        self.map_err(|source| TempScopeError::Construction { source, context: Some(context.into()) })
    }

    #[inline]
    fn open(self, context: impl Into<Cow<'static, str>>) -> Result<T> {
        self.map_err(|source| TempScopeError::Open { source, context: Some(context.into()) })
    }
}

fn format_context(context: &Option<Cow<'static, str>>) -> Cow<'static, str> {
    context.as_ref().map_or(Cow::Borrowed(""), |c| Cow::Owned(format!(" ({c})")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_appends_context() {
        let err = TempScopeError::invalid("empty", "Extension must not be empty");
        assert_eq!(err.to_string(), "Invalid argument (Extension must not be empty): empty");
    }

    #[test]
    fn context_replaces_previous_context() {
        let res: Result<()> = Err(TempScopeError::invalid("x", "first"));
        let err = res.context("second").expect_err("error expected");
        assert!(err.to_string().contains("(second)"));
    }

    #[test]
    fn io_errors_map_to_step_variants() {
        let res: std::io::Result<()> = Err(std::io::Error::other("boom"));
        let err = res.open("opening").expect_err("error expected");
        assert!(matches!(err, TempScopeError::Open { .. }));
        assert!(err.to_string().contains("boom"));
    }
}
