use std::{
    collections::HashMap,
    fs::File,
    io::Read,
    mem::replace,
    path::Path,
    sync::Arc,
};

use crate::{
    XML_XML_NAMESPACE, XMLVersion,
    error::XMLError,
    sax::{
        Locator,
        attributes::Attributes,
        error::{SAXParseError, fatal_error},
        handler::{ContentHandler, ErrorHandler},
        source::InputSource,
    },
};

/// `http://xml.org/sax/features/namespaces`
pub const FEATURE_NAMESPACES: &str = "http://xml.org/sax/features/namespaces";
/// `http://xml.org/sax/features/namespace-prefixes`
pub const FEATURE_NAMESPACE_PREFIXES: &str = "http://xml.org/sax/features/namespace-prefixes";
/// `http://xml.org/sax/features/validation`
pub const FEATURE_VALIDATION: &str = "http://xml.org/sax/features/validation";
/// `http://xml.org/sax/features/external-general-entities`
pub const FEATURE_EXTERNAL_GENERAL_ENTITIES: &str =
    "http://xml.org/sax/features/external-general-entities";
/// `http://xml.org/sax/features/external-parameter-entities`
pub const FEATURE_EXTERNAL_PARAMETER_ENTITIES: &str =
    "http://xml.org/sax/features/external-parameter-entities";
/// `http://xml.org/sax/features/string-interning`
pub const FEATURE_STRING_INTERNING: &str = "http://xml.org/sax/features/string-interning";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParserOption {
    /// Perform namespace processing and report expanded names.
    Namespaces = 0,
    /// Include namespace declaration attributes in reported attribute lists.
    NamespacePrefixes = 1,
    /// Treat recoverable errors as terminal.
    HaltOnRecoverableError = 2,
}

impl std::ops::BitOr<Self> for ParserOption {
    type Output = ParserConfig;

    fn bitor(self, rhs: Self) -> Self::Output {
        ParserConfig {
            flags: (1 << self as i32) | (1 << rhs as i32),
        }
    }
}

impl std::ops::BitOr<ParserConfig> for ParserOption {
    type Output = ParserConfig;

    fn bitor(self, rhs: ParserConfig) -> Self::Output {
        ParserConfig {
            flags: rhs.flags | (1 << self as i32),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParserConfig {
    flags: u64,
}

impl ParserConfig {
    pub fn is_enable(&self, option: ParserOption) -> bool {
        self.flags & (1 << option as i32) != 0
    }

    pub fn set_option(&mut self, option: ParserOption, flag: bool) {
        if flag {
            self.flags |= 1 << (option as i32);
        } else {
            self.flags &= !(1 << (option as i32));
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            flags: 1 << ParserOption::Namespaces as i32,
        }
    }
}

impl std::ops::BitOr<Self> for ParserConfig {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        ParserConfig {
            flags: self.flags | rhs.flags,
        }
    }
}

impl std::ops::BitOr<ParserOption> for ParserConfig {
    type Output = Self;

    fn bitor(self, rhs: ParserOption) -> Self::Output {
        ParserConfig {
            flags: self.flags | (1 << rhs as i32),
        }
    }
}

impl std::ops::BitOrAssign<ParserOption> for ParserConfig {
    fn bitor_assign(&mut self, rhs: ParserOption) {
        self.flags |= 1 << rhs as i32;
    }
}

impl std::ops::BitOrAssign<Self> for ParserConfig {
    fn bitor_assign(&mut self, rhs: Self) {
        self.flags |= rhs.flags;
    }
}

/// Lifecycle of one parse operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    NotStarted,
    InProgress,
    Completed,
    Aborted,
}

pub struct XMLReader<'a> {
    pub(crate) source: InputSource<'a>,
    pub(crate) content_handler: Option<Box<dyn ContentHandler + 'a>>,
    pub(crate) error_handler: Option<Box<dyn ErrorHandler + 'a>>,
    pub(crate) locator: Arc<Locator>,
    pub(crate) config: ParserConfig,

    // Parser Context
    pub(crate) state: ParserState,
    pub(crate) version: XMLVersion,
    pub(crate) encoding: Option<String>,
    pub(crate) standalone: Option<bool>,
    /// In-scope namespace bindings as `(prefix, uri, old_pos)`.
    /// `prefix` is empty for the default namespace, `uri` is empty for an
    /// undeclaration, and `old_pos` is the position of the binding this one
    /// shadows (or `usize::MAX`).
    pub(crate) namespaces: Vec<(Arc<str>, Arc<str>, usize)>,
    /// Map from prefix to the position of its innermost binding.
    pub(crate) prefix_map: HashMap<Arc<str>, usize>,
    /// Working attribute list reused across `start_element` events.
    pub(crate) atts: Attributes,
    pub(crate) has_doctype: bool,
    /// Diagnostic recorded by the terminal failure, if any.
    pub(crate) abort_diagnostic: Option<SAXParseError>,
}

impl<'a> XMLReader<'a> {
    /// Register `handler` and return the previous one.
    pub fn set_content_handler(
        &mut self,
        handler: impl ContentHandler + 'a,
    ) -> Option<Box<dyn ContentHandler + 'a>> {
        replace(&mut self.content_handler, Some(Box::new(handler)))
    }

    /// Register `handler` and return the previous one.
    pub fn set_error_handler(
        &mut self,
        handler: impl ErrorHandler + 'a,
    ) -> Option<Box<dyn ErrorHandler + 'a>> {
        replace(&mut self.error_handler, Some(Box::new(handler)))
    }

    /// Remove the registered content handler, if any.
    pub fn take_content_handler(&mut self) -> Option<Box<dyn ContentHandler + 'a>> {
        self.content_handler.take()
    }

    /// Remove the registered error handler, if any.
    pub fn take_error_handler(&mut self) -> Option<Box<dyn ErrorHandler + 'a>> {
        self.error_handler.take()
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    /// Look up the value of a feature by its URI.
    ///
    /// Recognized features that this parser does not implement fail with
    /// [`XMLError::UnsupportedFeature`]; unknown URIs fail with
    /// [`XMLError::UnrecognizedFeature`].
    pub fn get_feature(&self, name: &str) -> Result<bool, XMLError> {
        match name {
            FEATURE_NAMESPACES => Ok(self.config.is_enable(ParserOption::Namespaces)),
            FEATURE_NAMESPACE_PREFIXES => {
                Ok(self.config.is_enable(ParserOption::NamespacePrefixes))
            }
            FEATURE_VALIDATION
            | FEATURE_EXTERNAL_GENERAL_ENTITIES
            | FEATURE_EXTERNAL_PARAMETER_ENTITIES
            | FEATURE_STRING_INTERNING => Err(XMLError::UnsupportedFeature),
            _ => Err(XMLError::UnrecognizedFeature),
        }
    }

    /// Set the value of a feature by its URI.
    ///
    /// Features cannot be modified while a parse is in progress.
    /// Recognized features that this parser cannot enable accept `false` and
    /// fail with [`XMLError::UnsupportedFeature`] on `true`; unknown URIs
    /// fail with [`XMLError::UnrecognizedFeature`].
    pub fn set_feature(&mut self, name: &str, value: bool) -> Result<(), XMLError> {
        if self.state == ParserState::InProgress {
            return Err(XMLError::UnsupportedFeature);
        }
        match name {
            FEATURE_NAMESPACES => {
                self.config.set_option(ParserOption::Namespaces, value);
                Ok(())
            }
            FEATURE_NAMESPACE_PREFIXES => {
                self.config.set_option(ParserOption::NamespacePrefixes, value);
                Ok(())
            }
            FEATURE_VALIDATION
            | FEATURE_EXTERNAL_GENERAL_ENTITIES
            | FEATURE_EXTERNAL_PARAMETER_ENTITIES
            | FEATURE_STRING_INTERNING => {
                if value {
                    Err(XMLError::UnsupportedFeature)
                } else {
                    Ok(())
                }
            }
            _ => Err(XMLError::UnrecognizedFeature),
        }
    }

    /// Parse the document read from `path`.
    ///
    /// The path is used as the system identifier of the document.
    pub fn parse_uri(&mut self, path: impl AsRef<Path>) -> Result<(), XMLError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        self.parse_reader(file, path.to_str())
    }

    /// Parse the document read from `reader`.
    pub fn parse_reader(
        &mut self,
        reader: impl Read + 'a,
        system_id: Option<&str>,
    ) -> Result<(), XMLError> {
        self.reset_context(system_id);
        let result = 'parse: {
            match InputSource::from_reader(reader) {
                Ok(source) => self.source = source,
                Err(XMLError::ParserUnsupportedEncoding) => {
                    fatal_error!(
                        self,
                        ParserUnsupportedEncoding,
                        "The input does not seem to be encoded in a supported encoding."
                    );
                    break 'parse Err(XMLError::ParserUnsupportedEncoding);
                }
                Err(err) => break 'parse Err(err),
            }
            self.parse_document()
        };
        self.finish(result)
    }

    /// Parse the document contained in `content`.
    pub fn parse_str(&mut self, content: &str, system_id: Option<&str>) -> Result<(), XMLError> {
        self.reset_context(system_id);
        self.source = InputSource::from_content(content);
        let result = self.parse_document();
        self.finish(result)
    }

    fn reset_context(&mut self, system_id: Option<&str>) {
        self.source = InputSource::default();
        self.locator = Arc::new(Locator::new(system_id.unwrap_or_default().into(), 1, 1));
        self.state = ParserState::NotStarted;
        self.version = XMLVersion::default();
        self.encoding = None;
        self.standalone = None;
        self.namespaces.clear();
        self.prefix_map.clear();
        // The "xml" prefix is bound in every document.
        let xml: Arc<str> = "xml".into();
        self.namespaces
            .push((xml.clone(), XML_XML_NAMESPACE.into(), usize::MAX));
        self.prefix_map.insert(xml, 0);
        self.atts.clear();
        self.atts
            .set_namespace_mode(self.config.is_enable(ParserOption::Namespaces));
        self.has_doctype = false;
        self.abort_diagnostic = None;
    }

    fn finish(&mut self, result: Result<(), XMLError>) -> Result<(), XMLError> {
        match result {
            Ok(()) => {
                self.state = ParserState::Completed;
                Ok(())
            }
            Err(err) => {
                self.state = ParserState::Aborted;
                if let Some(diagnostic) = self.abort_diagnostic.take() {
                    Err(XMLError::FatalParse(Box::new(diagnostic)))
                } else {
                    Err(err)
                }
            }
        }
    }
}

#[derive(Default)]
pub struct XMLReaderBuilder<'a> {
    content_handler: Option<Box<dyn ContentHandler + 'a>>,
    error_handler: Option<Box<dyn ErrorHandler + 'a>>,
    config: ParserConfig,
}

impl<'a> XMLReaderBuilder<'a> {
    pub fn new() -> Self {
        Self {
            content_handler: None,
            error_handler: None,
            config: ParserConfig::default(),
        }
    }

    pub fn set_content_handler(mut self, handler: impl ContentHandler + 'a) -> Self {
        self.content_handler = Some(Box::new(handler));
        self
    }

    pub fn set_error_handler(mut self, handler: impl ErrorHandler + 'a) -> Self {
        self.error_handler = Some(Box::new(handler));
        self
    }

    /// Enable or disable namespace processing. Enabled by default.
    pub fn namespaces(mut self, enable: bool) -> Self {
        self.config.set_option(ParserOption::Namespaces, enable);
        self
    }

    /// Include namespace declaration attributes in reported attribute
    /// lists. Disabled by default.
    pub fn namespace_prefixes(mut self, enable: bool) -> Self {
        self.config.set_option(ParserOption::NamespacePrefixes, enable);
        self
    }

    /// Abort the parse at the first recoverable error instead of reporting
    /// it and continuing. Disabled by default.
    pub fn halt_on_recoverable_error(mut self, enable: bool) -> Self {
        self.config
            .set_option(ParserOption::HaltOnRecoverableError, enable);
        self
    }

    pub fn build(self) -> XMLReader<'a> {
        XMLReader {
            source: InputSource::default(),
            content_handler: self.content_handler,
            error_handler: self.error_handler,
            locator: Arc::new(Locator::new("".into(), 1, 1)),
            config: self.config,
            state: ParserState::NotStarted,
            version: XMLVersion::default(),
            encoding: None,
            standalone: None,
            namespaces: vec![],
            prefix_map: HashMap::new(),
            atts: Attributes::new(),
            has_doctype: false,
            abort_diagnostic: None,
        }
    }
}
