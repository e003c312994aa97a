use tracing::{error, info, warn};

/// A non-fatal condition worth surfacing to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    Info(String),
    Warning(String),
    Error(String),
}

pub type DiagnosticCallback<'a> = Box<dyn Fn(&Diagnostic) + Send + Sync + 'a>;

/// Injected diagnostics sink.
///
/// Every diagnostic is logged through `tracing`; callers that want to inspect
/// diagnostics programmatically attach a callback.
#[derive(Default)]
pub struct DiagnosticReporter<'a> {
    callback: Option<DiagnosticCallback<'a>>,
}

impl<'a> DiagnosticReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: DiagnosticCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    pub fn report(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::Info(message) => info!("{message}"),
            Diagnostic::Warning(message) => warn!("{message}"),
            Diagnostic::Error(message) => error!("{message}"),
        }
        if let Some(cb) = &self.callback {
            cb(&diagnostic);
        }
    }

    #[inline]
    pub fn warn(&self, message: impl Into<String>) {
        self.report(Diagnostic::Warning(message.into()));
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.report(Diagnostic::Error(message.into()));
    }
}
