use std::sync::Arc;

use crate::{
    error::XMLError,
    sax::{Locator, attributes::Attributes, error::SAXParseError},
};

/// Receiver for the logical content of an XML document.
///
/// All methods except [`set_document_locator`](ContentHandler::set_document_locator)
/// return a `Result`; an `Err` aborts the parse immediately and is surfaced
/// unchanged by the parse operation that triggered the callback.
///
/// All methods have default implementations that do nothing, so implementors
/// only need to override the events they care about.
#[allow(unused_variables)]
pub trait ContentHandler {
    /// Receive the position provider for the current parse.
    ///
    /// Invoked once per parse, before any other event. The locator remains
    /// valid for the whole parse and reports the position of the event
    /// currently being delivered.
    fn set_document_locator(&mut self, locator: Arc<Locator>) {}

    /// Report the beginning of the document.
    fn start_document(&mut self) -> Result<(), XMLError> {
        Ok(())
    }

    /// Report the end of the document.
    ///
    /// Delivered only when the parse runs to completion.
    fn end_document(&mut self) -> Result<(), XMLError> {
        Ok(())
    }

    /// Report the start of a prefix/URI mapping scope.
    ///
    /// `prefix` is `None` for a default namespace declaration. Delivered
    /// immediately before the `start_element` event of the declaring element.
    fn start_prefix_mapping(
        &mut self,
        prefix: Option<&str>,
        uri: &str,
    ) -> Result<(), XMLError> {
        Ok(())
    }

    /// Report the end of a prefix/URI mapping scope.
    ///
    /// Delivered immediately after the `end_element` event of the declaring
    /// element, in reverse declaration order.
    fn end_prefix_mapping(&mut self, prefix: Option<&str>) -> Result<(), XMLError> {
        Ok(())
    }

    /// Report the start of an element.
    ///
    /// `uri` and `local_name` are `None` when namespace processing is
    /// disabled, or when the element name is not in any namespace.
    /// `atts` is valid only for the duration of this call; implementors that
    /// need the attributes afterwards must clone them.
    fn start_element(
        &mut self,
        uri: Option<&str>,
        local_name: Option<&str>,
        qname: &str,
        atts: &Attributes,
    ) -> Result<(), XMLError> {
        Ok(())
    }

    /// Report the end of an element.
    ///
    /// Delivered for empty-element tags as well, immediately after the
    /// corresponding `start_element`.
    fn end_element(
        &mut self,
        uri: Option<&str>,
        local_name: Option<&str>,
        qname: &str,
    ) -> Result<(), XMLError> {
        Ok(())
    }

    /// Report character data.
    ///
    /// A contiguous run of character data may be split into multiple events.
    fn characters(&mut self, data: &str) -> Result<(), XMLError> {
        Ok(())
    }

    /// Report whitespace a validating parser determined to be ignorable.
    fn ignorable_whitespace(&mut self, data: &str) -> Result<(), XMLError> {
        Ok(())
    }

    /// Report a processing instruction.
    ///
    /// `data` is `None` when the instruction has no data part.
    fn processing_instruction(
        &mut self,
        target: &str,
        data: Option<&str>,
    ) -> Result<(), XMLError> {
        Ok(())
    }

    /// Report an entity that was skipped rather than expanded.
    fn skipped_entity(&mut self, name: &str) -> Result<(), XMLError> {
        Ok(())
    }
}

/// Receiver for parse diagnostics.
///
/// An `Err` from any method aborts the parse immediately and is surfaced
/// unchanged by the parse operation. Returning `Ok(())` from
/// [`fatal_error`](ErrorHandler::fatal_error) does not resume parsing; a
/// fatal condition always terminates the parse.
///
/// All methods have default implementations that do nothing.
#[allow(unused_variables)]
pub trait ErrorHandler {
    /// Receive notification of a warning.
    fn warning(&mut self, error: &SAXParseError) -> Result<(), XMLError> {
        Ok(())
    }

    /// Receive notification of a recoverable error.
    fn error(&mut self, error: &SAXParseError) -> Result<(), XMLError> {
        Ok(())
    }

    /// Receive notification of a non-recoverable error.
    fn fatal_error(&mut self, error: &SAXParseError) -> Result<(), XMLError> {
        Ok(())
    }
}

/// Convenience base handler.
///
/// Ignores all content events and writes diagnostics to standard error.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHandler;

impl ContentHandler for DefaultHandler {}

impl ErrorHandler for DefaultHandler {
    fn warning(&mut self, error: &SAXParseError) -> Result<(), XMLError> {
        eprintln!("{error}");
        Ok(())
    }

    fn error(&mut self, error: &SAXParseError) -> Result<(), XMLError> {
        eprintln!("{error}");
        Ok(())
    }

    fn fatal_error(&mut self, error: &SAXParseError) -> Result<(), XMLError> {
        eprintln!("{error}");
        Ok(())
    }
}
