use std::sync::Arc;

use crate::sax::error::SAXParseError;

/// Severity of a reported condition.
///
/// `Warning` and `Error` are recoverable: the parser keeps delivering events
/// after reporting them (unless halting on recoverable errors is enabled).
/// `FatalError` always terminates the parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XMLErrorLevel {
    FatalError,
    Error,
    Warning,
}

impl std::fmt::Display for XMLErrorLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::FatalError => write!(f, "fatal error"),
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum XMLError {
    // general errors
    InternalError,
    // attribute collection errors
    AttributeIndexOutOfRange,
    DuplicateAttribute,
    // configuration errors
    UnrecognizedFeature,
    UnsupportedFeature,
    // parser errors
    ParserUnsupportedEncoding,
    ParserEmptyName,
    ParserEmptyQName,
    ParserEmptyQNamePrefix,
    ParserEmptyQNameLocalPart,
    ParserInvalidCharacter,
    ParserInvalidXMLDecl,
    ParserInvalidXMLVersion,
    ParserInvalidEncodingDecl,
    ParserInvalidSDDecl,
    ParserInvalidComment,
    ParserInvalidCDSect,
    ParserInvalidProcessingInstruction,
    ParserUnacceptablePITarget,
    ParserUnacceptablePatternInCharData,
    ParserInvalidDoctypeDecl,
    ParserInvalidSystemLiteral,
    ParserInvalidPubidLiteral,
    ParserInvalidExternalID,
    ParserInvalidStartOrEmptyTag,
    ParserInvalidEndTag,
    ParserMismatchElementType,
    ParserInvalidAttribute,
    ParserInvalidAttValue,
    ParserInvalidCharacterReference,
    ParserInvalidEntityReference,
    ParserEntityNotFound,
    ParserUnacceptableNamespaceName,
    ParserUndefinedNamespace,
    ParserUnexpectedDocumentContent,
    ParserUnexpectedEOF,
    // terminal failure of one parse operation, carrying the diagnostic
    // delivered (or that would have been delivered) to the error handler
    FatalParse(Box<SAXParseError>),
    // I/O errors
    IOError(Arc<std::io::Error>),
    // decoder errors
    DecoderInvalidUTF8,
}

impl std::fmt::Display for XMLError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FatalParse(diagnostic) => write!(f, "{diagnostic}"),
            Self::IOError(err) => write!(f, "I/O error: {err}"),
            err => write!(f, "{err:?}"),
        }
    }
}

impl std::error::Error for XMLError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FatalParse(diagnostic) => Some(diagnostic.as_ref()),
            Self::IOError(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for XMLError {
    fn from(value: std::io::Error) -> Self {
        Self::IOError(Arc::new(value))
    }
}
