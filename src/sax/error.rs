use std::{borrow::Cow, sync::Arc};

use crate::error::{XMLError, XMLErrorLevel};

/// A locatable diagnostic reported through an
/// [`ErrorHandler`](crate::sax::handler::ErrorHandler).
///
/// Immutable once constructed. `line` and `column` are 1-based;
/// `system_id` is empty when the document has no identifier.
#[derive(Debug, Clone)]
pub struct SAXParseError {
    pub error: XMLError,
    pub level: XMLErrorLevel,
    pub line: usize,
    pub column: usize,
    pub system_id: Arc<str>,
    pub message: Cow<'static, str>,
}

impl std::fmt::Display for SAXParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}[line:{},column:{}]:{}:{}",
            self.system_id, self.line, self.column, self.level, self.message,
        )
    }
}

impl std::error::Error for SAXParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

macro_rules! diagnostic {
    ($reader:expr, $code:ident, $level:expr, $message:expr) => {
        $crate::sax::error::SAXParseError {
            error: $crate::error::XMLError::$code,
            level: $level,
            line: $reader.locator.line(),
            column: $reader.locator.column(),
            system_id: $reader.locator.system_id(),
            message: $message,
        }
    };
}

/// Report a fatal condition: deliver the diagnostic to the error handler if
/// one is registered, record it for the caller of the parse operation, and
/// transition to `Aborted`. Call sites must stop parsing by returning the
/// matching error code afterwards.
macro_rules! fatal_error {
    ($reader:expr, $code:ident, $message:literal, $( $args:expr ),+) => {
        $crate::sax::error::fatal_error!(@impl, $reader, $code, ::std::borrow::Cow::Owned(format!($message, $( $args ),+)))
    };
    ($reader:expr, $code:ident, $message:literal) => {
        $crate::sax::error::fatal_error!(@impl, $reader, $code, ::std::borrow::Cow::Borrowed($message))
    };
    (@impl, $reader:expr, $code:ident, $message:expr) => {
        if $reader.state != $crate::sax::parser::ParserState::Aborted {
            let diagnostic = $crate::sax::error::diagnostic!(
                $reader,
                $code,
                $crate::error::XMLErrorLevel::FatalError,
                $message
            );
            $reader.state = $crate::sax::parser::ParserState::Aborted;
            if let Some(handler) = $reader.error_handler.as_deref_mut()
                && let Err(abort) = handler.fatal_error(&diagnostic)
            {
                $reader.abort_diagnostic = Some(diagnostic);
                return Err(abort);
            }
            $reader.abort_diagnostic = Some(diagnostic);
        }
    };
}

/// Report a recoverable error. Parsing continues unless the handler signals
/// failure or `HaltOnRecoverableError` is enabled.
macro_rules! error {
    ($reader:expr, $code:ident, $message:literal, $( $args:expr ),+) => {
        $crate::sax::error::error!(@impl, $reader, $code, ::std::borrow::Cow::Owned(format!($message, $( $args ),+)))
    };
    ($reader:expr, $code:ident, $message:literal) => {
        $crate::sax::error::error!(@impl, $reader, $code, ::std::borrow::Cow::Borrowed($message))
    };
    (@impl, $reader:expr, $code:ident, $message:expr) => {
        if $reader.state != $crate::sax::parser::ParserState::Aborted {
            let diagnostic = $crate::sax::error::diagnostic!(
                $reader,
                $code,
                $crate::error::XMLErrorLevel::Error,
                $message
            );
            if let Some(handler) = $reader.error_handler.as_deref_mut()
                && let Err(abort) = handler.error(&diagnostic)
            {
                $reader.state = $crate::sax::parser::ParserState::Aborted;
                return Err(abort);
            }
            if $reader
                .config
                .is_enable($crate::sax::parser::ParserOption::HaltOnRecoverableError)
            {
                $reader.state = $crate::sax::parser::ParserState::Aborted;
                $reader.abort_diagnostic = Some(diagnostic);
                return Err($crate::error::XMLError::$code);
            }
        }
    };
}

/// Report a warning. Parsing always continues unless the handler signals
/// failure.
macro_rules! warning {
    ($reader:expr, $code:ident, $message:literal, $( $args:expr ),+) => {
        $crate::sax::error::warning!(@impl, $reader, $code, ::std::borrow::Cow::Owned(format!($message, $( $args ),+)))
    };
    ($reader:expr, $code:ident, $message:literal) => {
        $crate::sax::error::warning!(@impl, $reader, $code, ::std::borrow::Cow::Borrowed($message))
    };
    (@impl, $reader:expr, $code:ident, $message:expr) => {
        if $reader.state != $crate::sax::parser::ParserState::Aborted {
            let diagnostic = $crate::sax::error::diagnostic!(
                $reader,
                $code,
                $crate::error::XMLErrorLevel::Warning,
                $message
            );
            if let Some(handler) = $reader.error_handler.as_deref_mut()
                && let Err(abort) = handler.warning(&diagnostic)
            {
                $reader.state = $crate::sax::parser::ParserState::Aborted;
                return Err(abort);
            }
        }
    };
}

/// Deliver one content event if a handler is registered and the parse has
/// not been aborted. A handler-signaled failure aborts the parse.
macro_rules! dispatch {
    ($reader:expr, $method:ident $(, $args:expr )* $(,)?) => {
        if $reader.state != $crate::sax::parser::ParserState::Aborted
            && let Some(handler) = $reader.content_handler.as_deref_mut()
            && let Err(abort) = handler.$method($( $args ),*)
        {
            $reader.state = $crate::sax::parser::ParserState::Aborted;
            return Err(abort);
        }
    };
}

pub(crate) use {diagnostic, dispatch, error, fatal_error, warning};
