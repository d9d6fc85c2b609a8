use std::{cell::RefCell, rc::Rc};

use minisax::{
    error::{XMLError, XMLErrorLevel},
    sax::{
        attributes::Attributes,
        error::SAXParseError,
        handler::{ContentHandler, ErrorHandler},
        parser::{
            FEATURE_NAMESPACE_PREFIXES, FEATURE_NAMESPACES, FEATURE_VALIDATION, ParserState,
            XMLReaderBuilder,
        },
    },
};

/// Shared event journal filled by the recording handlers.
#[derive(Default, Clone)]
struct Events(Rc<RefCell<Vec<String>>>);

impl Events {
    fn push(&self, event: impl Into<String>) {
        self.0.borrow_mut().push(event.into());
    }

    fn snapshot(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    fn characters_joined(&self) -> String {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| e.strip_prefix("characters "))
            .collect()
    }
}

fn name_repr(uri: Option<&str>, local_name: Option<&str>, qname: &str) -> String {
    match (uri, local_name) {
        (Some(uri), Some(local_name)) => format!("{{{uri}}}{local_name}"),
        _ => qname.to_string(),
    }
}

fn atts_repr(atts: &Attributes) -> String {
    let mut ret = String::new();
    for att in atts {
        match (&att.uri, &att.local_name) {
            (Some(uri), Some(local_name)) => {
                ret.push_str(&format!(" {{{uri}}}{local_name}={:?}", att.value))
            }
            _ => ret.push_str(&format!(" {}={:?}", att.qname, att.value)),
        }
    }
    ret
}

struct Recorder {
    events: Events,
    /// Abort the parse from within `start_element` for this QName.
    abort_at: Option<&'static str>,
}

impl Recorder {
    fn new(events: &Events) -> Self {
        Self {
            events: events.clone(),
            abort_at: None,
        }
    }
}

impl ContentHandler for Recorder {
    fn start_document(&mut self) -> Result<(), XMLError> {
        self.events.push("start_document");
        Ok(())
    }

    fn end_document(&mut self) -> Result<(), XMLError> {
        self.events.push("end_document");
        Ok(())
    }

    fn start_prefix_mapping(&mut self, prefix: Option<&str>, uri: &str) -> Result<(), XMLError> {
        self.events
            .push(format!("xmlns {}={}", prefix.unwrap_or("-"), uri));
        Ok(())
    }

    fn end_prefix_mapping(&mut self, prefix: Option<&str>) -> Result<(), XMLError> {
        self.events
            .push(format!("end-xmlns {}", prefix.unwrap_or("-")));
        Ok(())
    }

    fn start_element(
        &mut self,
        uri: Option<&str>,
        local_name: Option<&str>,
        qname: &str,
        atts: &Attributes,
    ) -> Result<(), XMLError> {
        self.events.push(format!(
            "start {}{}",
            name_repr(uri, local_name, qname),
            atts_repr(atts)
        ));
        if self.abort_at == Some(qname) {
            return Err(XMLError::InternalError);
        }
        Ok(())
    }

    fn end_element(
        &mut self,
        uri: Option<&str>,
        local_name: Option<&str>,
        qname: &str,
    ) -> Result<(), XMLError> {
        self.events
            .push(format!("end {}", name_repr(uri, local_name, qname)));
        Ok(())
    }

    fn characters(&mut self, data: &str) -> Result<(), XMLError> {
        self.events.push(format!("characters {data}"));
        Ok(())
    }

    fn ignorable_whitespace(&mut self, data: &str) -> Result<(), XMLError> {
        self.events.push(format!("ignorable {data}"));
        Ok(())
    }

    fn processing_instruction(
        &mut self,
        target: &str,
        data: Option<&str>,
    ) -> Result<(), XMLError> {
        self.events
            .push(format!("pi {} {}", target, data.unwrap_or("-")));
        Ok(())
    }

    fn skipped_entity(&mut self, name: &str) -> Result<(), XMLError> {
        self.events.push(format!("skipped {name}"));
        Ok(())
    }
}

struct Diagnostics(Events);

impl ErrorHandler for Diagnostics {
    fn warning(&mut self, error: &SAXParseError) -> Result<(), XMLError> {
        self.0.push(format!("warning {:?}", error.error));
        Ok(())
    }

    fn error(&mut self, error: &SAXParseError) -> Result<(), XMLError> {
        self.0.push(format!("error {:?}", error.error));
        Ok(())
    }

    fn fatal_error(&mut self, error: &SAXParseError) -> Result<(), XMLError> {
        self.0.push(format!("fatal {:?}", error.error));
        Ok(())
    }
}

#[test]
fn well_formed_document_event_sequence() {
    let events = Events::default();
    let mut reader = XMLReaderBuilder::new()
        .set_content_handler(Recorder::new(&events))
        .build();
    reader.parse_str(r#"<a x="1"><b/></a>"#, None).unwrap();

    assert_eq!(reader.state(), ParserState::Completed);
    assert_eq!(
        events.snapshot(),
        [
            "start_document",
            "start a x=\"1\"",
            "start b",
            "end b",
            "end a",
            "end_document",
        ]
    );
}

#[test]
fn mismatched_tags_report_one_fatal_error_and_stop() {
    let events = Events::default();
    let diagnostics = Events::default();
    let mut reader = XMLReaderBuilder::new()
        .set_content_handler(Recorder::new(&events))
        .set_error_handler(Diagnostics(diagnostics.clone()))
        .build();
    let result = reader.parse_str("<a>\n<b></c></a>", Some("mem://doc"));

    assert_eq!(reader.state(), ParserState::Aborted);
    let Err(XMLError::FatalParse(diagnostic)) = result else {
        panic!("a fatal diagnostic must surface as the parse result");
    };
    assert!(matches!(
        diagnostic.error,
        XMLError::ParserMismatchElementType
    ));
    assert_eq!(diagnostic.level, XMLErrorLevel::FatalError);
    assert_eq!(diagnostic.system_id.as_ref(), "mem://doc");
    assert_eq!(diagnostic.line, 2);
    assert!(diagnostic.column > 1);

    assert_eq!(
        diagnostics.snapshot(),
        ["fatal ParserMismatchElementType"]
    );
    // no events may be delivered after the fatal error
    assert_eq!(
        events.snapshot(),
        ["start_document", "start a", "characters \n", "start b"]
    );
}

#[test]
fn namespace_processing_reports_expanded_names() {
    let events = Events::default();
    let mut reader = XMLReaderBuilder::new()
        .set_content_handler(Recorder::new(&events))
        .build();
    reader
        .parse_str(
            r#"<x:r xmlns:x="http://example.org/ns" x:id="1"><x:c/></x:r>"#,
            None,
        )
        .unwrap();

    assert_eq!(
        events.snapshot(),
        [
            "start_document",
            "xmlns x=http://example.org/ns",
            "start {http://example.org/ns}r {http://example.org/ns}id=\"1\"",
            "start {http://example.org/ns}c",
            "end {http://example.org/ns}c",
            "end {http://example.org/ns}r",
            "end-xmlns x",
            "end_document",
        ]
    );
}

#[test]
fn default_namespace_applies_to_elements_only() {
    let events = Events::default();
    let mut reader = XMLReaderBuilder::new()
        .set_content_handler(Recorder::new(&events))
        .build();
    reader
        .parse_str(r#"<doc xmlns="urn:d" id="7"/>"#, None)
        .unwrap();

    assert_eq!(
        events.snapshot(),
        [
            "start_document",
            "xmlns -=urn:d",
            // unprefixed attributes are in no namespace
            "start {urn:d}doc id=\"7\"",
            "end {urn:d}doc",
            "end-xmlns -",
            "end_document",
        ]
    );
}

#[test]
fn duplicate_attributes_are_fatal() {
    let mut reader = XMLReaderBuilder::new().build();
    let result = reader.parse_str(r#"<a b="1" b="2"/>"#, None);
    let Err(XMLError::FatalParse(diagnostic)) = result else {
        panic!("duplicate attributes must be fatal");
    };
    assert!(matches!(diagnostic.error, XMLError::DuplicateAttribute));
}

#[test]
fn duplicate_expanded_names_are_fatal_despite_distinct_prefixes() {
    let mut reader = XMLReaderBuilder::new().build();
    let result = reader.parse_str(
        r#"<a xmlns:p="urn:u" xmlns:q="urn:u" p:x="1" q:x="2"/>"#,
        None,
    );
    let Err(XMLError::FatalParse(diagnostic)) = result else {
        panic!("attributes with the same expanded name must be fatal");
    };
    assert!(matches!(diagnostic.error, XMLError::DuplicateAttribute));
}

#[test]
fn references_are_expanded_into_character_data() {
    let events = Events::default();
    let mut reader = XMLReaderBuilder::new()
        .set_content_handler(Recorder::new(&events))
        .build();
    reader
        .parse_str("<a>2 &lt; 3 &#65;&#x42;</a>", None)
        .unwrap();
    assert_eq!(events.characters_joined(), "2 < 3 AB");
}

#[test]
fn cdata_sections_are_reported_as_character_data() {
    let events = Events::default();
    let mut reader = XMLReaderBuilder::new()
        .set_content_handler(Recorder::new(&events))
        .build();
    reader
        .parse_str("<a><![CDATA[2 < 3 & <not-a-tag/>]]></a>", None)
        .unwrap();
    assert_eq!(events.characters_joined(), "2 < 3 & <not-a-tag/>");
}

#[test]
fn processing_instructions_inside_and_outside_the_root() {
    let events = Events::default();
    let mut reader = XMLReaderBuilder::new()
        .set_content_handler(Recorder::new(&events))
        .build();
    reader
        .parse_str("<?go there now?><a><?stop?></a>", None)
        .unwrap();

    assert_eq!(
        events.snapshot(),
        [
            "start_document",
            "pi go there now",
            "start a",
            "pi stop -",
            "end a",
            "end_document",
        ]
    );
}

#[test]
fn handler_failure_aborts_the_parse() {
    let events = Events::default();
    let mut recorder = Recorder::new(&events);
    recorder.abort_at = Some("b");
    let mut reader = XMLReaderBuilder::new().set_content_handler(recorder).build();
    let result = reader.parse_str("<a><b/><c/></a>", None);

    // the handler's own error comes back unchanged
    assert!(matches!(result, Err(XMLError::InternalError)));
    assert_eq!(reader.state(), ParserState::Aborted);
    assert_eq!(events.snapshot(), ["start_document", "start a", "start b"]);
}

#[test]
fn error_handler_failure_aborts_the_parse() {
    struct FailOnError(Events);
    impl ErrorHandler for FailOnError {
        fn error(&mut self, error: &SAXParseError) -> Result<(), XMLError> {
            self.0.push(format!("error {:?}", error.error));
            Err(XMLError::InternalError)
        }
    }

    let events = Events::default();
    let diagnostics = Events::default();
    let mut reader = XMLReaderBuilder::new()
        .set_content_handler(Recorder::new(&events))
        .set_error_handler(FailOnError(diagnostics.clone()))
        .build();
    let result = reader.parse_str(r#"<p:a xmlns:q="urn:u"><c/></p:a>"#, None);

    // the handler's own error comes back unchanged
    assert!(matches!(result, Err(XMLError::InternalError)));
    assert_eq!(reader.state(), ParserState::Aborted);
    assert_eq!(diagnostics.snapshot(), ["error ParserUndefinedNamespace"]);
    // no events may be delivered after the handler signals failure
    assert_eq!(events.snapshot(), ["start_document", "xmlns q=urn:u"]);
}

#[test]
fn undefined_prefix_is_recoverable_by_default() {
    let events = Events::default();
    let diagnostics = Events::default();
    let mut reader = XMLReaderBuilder::new()
        .set_content_handler(Recorder::new(&events))
        .set_error_handler(Diagnostics(diagnostics.clone()))
        .build();
    reader.parse_str(r#"<p:a xmlns:q="urn:u"/>"#, None).unwrap();

    assert_eq!(reader.state(), ParserState::Completed);
    assert_eq!(
        diagnostics.snapshot(),
        ["error ParserUndefinedNamespace"]
    );
    // the element resolves to no namespace and the parse continues
    assert_eq!(
        events.snapshot(),
        [
            "start_document",
            "xmlns q=urn:u",
            "start p:a",
            "end p:a",
            "end-xmlns q",
            "end_document",
        ]
    );
}

#[test]
fn undefined_prefix_is_terminal_when_halting_on_recoverable_errors() {
    let diagnostics = Events::default();
    let mut reader = XMLReaderBuilder::new()
        .set_error_handler(Diagnostics(diagnostics.clone()))
        .halt_on_recoverable_error(true)
        .build();
    let result = reader.parse_str(r#"<p:a xmlns:q="urn:u"/>"#, None);

    assert_eq!(reader.state(), ParserState::Aborted);
    let Err(XMLError::FatalParse(diagnostic)) = result else {
        panic!("halting mode must surface the recoverable error as terminal");
    };
    assert!(matches!(
        diagnostic.error,
        XMLError::ParserUndefinedNamespace
    ));
    assert_eq!(diagnostic.level, XMLErrorLevel::Error);
    assert_eq!(diagnostics.snapshot(), ["error ParserUndefinedNamespace"]);
}

#[test]
fn unsupported_xml_version_is_a_warning() {
    let diagnostics = Events::default();
    let mut reader = XMLReaderBuilder::new()
        .set_error_handler(Diagnostics(diagnostics.clone()))
        .build();
    reader
        .parse_str("<?xml version=\"1.1\"?><a/>", None)
        .unwrap();
    assert_eq!(reader.state(), ParserState::Completed);
    assert_eq!(diagnostics.snapshot(), ["warning ParserInvalidXMLVersion"]);
}

#[test]
fn full_xml_declaration_is_accepted() {
    let mut reader = XMLReaderBuilder::new().build();
    reader
        .parse_str(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?><a/>",
            None,
        )
        .unwrap();
    assert_eq!(reader.state(), ParserState::Completed);
}

#[test]
fn undeclared_entity_is_skipped_when_a_doctype_may_declare_it() {
    let events = Events::default();
    let diagnostics = Events::default();
    let mut reader = XMLReaderBuilder::new()
        .set_content_handler(Recorder::new(&events))
        .set_error_handler(Diagnostics(diagnostics.clone()))
        .build();
    reader
        .parse_str("<!DOCTYPE a [<!ENTITY foo \"bar\">]><a>&foo;</a>", None)
        .unwrap();

    assert_eq!(reader.state(), ParserState::Completed);
    assert_eq!(diagnostics.snapshot(), ["error ParserEntityNotFound"]);
    assert!(events.snapshot().contains(&"skipped foo".to_string()));
}

#[test]
fn undeclared_entity_is_fatal_without_a_doctype() {
    let mut reader = XMLReaderBuilder::new().build();
    let result = reader.parse_str("<a>&foo;</a>", None);
    let Err(XMLError::FatalParse(diagnostic)) = result else {
        panic!("an undeclarable entity must be fatal");
    };
    assert!(matches!(diagnostic.error, XMLError::ParserEntityNotFound));
}

#[test]
fn missing_file_reports_an_io_error() {
    let mut reader = XMLReaderBuilder::new().build();
    let result = reader.parse_uri("no-such-file.xml");
    assert!(matches!(result, Err(XMLError::IOError(_))));
    assert_eq!(reader.state(), ParserState::NotStarted);
}

#[test]
fn feature_lookup_and_configuration() {
    let mut reader = XMLReaderBuilder::new().build();
    assert_eq!(reader.get_feature(FEATURE_NAMESPACES).unwrap(), true);
    assert_eq!(
        reader.get_feature(FEATURE_NAMESPACE_PREFIXES).unwrap(),
        false
    );

    reader.set_feature(FEATURE_NAMESPACE_PREFIXES, true).unwrap();
    assert_eq!(
        reader.get_feature(FEATURE_NAMESPACE_PREFIXES).unwrap(),
        true
    );

    // recognized but not implementable
    assert!(matches!(
        reader.get_feature(FEATURE_VALIDATION),
        Err(XMLError::UnsupportedFeature)
    ));
    reader.set_feature(FEATURE_VALIDATION, false).unwrap();
    assert!(matches!(
        reader.set_feature(FEATURE_VALIDATION, true),
        Err(XMLError::UnsupportedFeature)
    ));

    // unknown URIs
    assert!(matches!(
        reader.get_feature("http://example.org/features/unknown"),
        Err(XMLError::UnrecognizedFeature)
    ));
    assert!(matches!(
        reader.set_feature("http://example.org/features/unknown", true),
        Err(XMLError::UnrecognizedFeature)
    ));
}

#[test]
fn qnames_are_opaque_without_namespace_processing() {
    let events = Events::default();
    let mut reader = XMLReaderBuilder::new()
        .set_content_handler(Recorder::new(&events))
        .namespaces(false)
        .build();
    reader
        .parse_str(r#"<p:a xmlns:p="urn:u" p:b="1"/>"#, None)
        .unwrap();

    assert_eq!(
        events.snapshot(),
        [
            "start_document",
            // no prefix mapping events, declarations stay ordinary attributes
            "start p:a xmlns:p=\"urn:u\" p:b=\"1\"",
            "end p:a",
            "end_document",
        ]
    );
}

#[test]
fn namespace_declarations_are_reported_when_prefixes_are_enabled() {
    let events = Events::default();
    let mut reader = XMLReaderBuilder::new()
        .set_content_handler(Recorder::new(&events))
        .namespace_prefixes(true)
        .build();
    reader.parse_str(r#"<a xmlns:p="urn:u" p:x="1"/>"#, None).unwrap();

    assert_eq!(
        events.snapshot(),
        [
            "start_document",
            "xmlns p=urn:u",
            "start a {http://www.w3.org/2000/xmlns/}p=\"urn:u\" {urn:u}x=\"1\"",
            "end a",
            "end-xmlns p",
            "end_document",
        ]
    );
}

#[test]
fn whitespace_in_content_is_never_reported_as_ignorable() {
    let events = Events::default();
    let mut reader = XMLReaderBuilder::new()
        .set_content_handler(Recorder::new(&events))
        .build();
    reader.parse_str("<a> <b/> </a>", None).unwrap();

    let snapshot = events.snapshot();
    assert!(snapshot.iter().all(|e| !e.starts_with("ignorable")));
    assert_eq!(
        snapshot,
        [
            "start_document",
            "start a",
            "characters  ",
            "start b",
            "end b",
            "characters  ",
            "end a",
            "end_document",
        ]
    );
}

#[test]
fn attribute_values_are_normalized() {
    let events = Events::default();
    let mut reader = XMLReaderBuilder::new()
        .set_content_handler(Recorder::new(&events))
        .build();
    reader
        .parse_str("<a x=\"one\ttwo\nthree &amp; four\"/>", None)
        .unwrap();
    assert_eq!(
        events.snapshot()[1],
        "start a x=\"one two three & four\""
    );
}

#[test]
fn reader_is_reusable_after_a_failed_parse() {
    let events = Events::default();
    let mut reader = XMLReaderBuilder::new()
        .set_content_handler(Recorder::new(&events))
        .build();
    assert!(reader.parse_str("<a><b></a>", None).is_err());
    assert_eq!(reader.state(), ParserState::Aborted);

    reader.parse_str("<a/>", None).unwrap();
    assert_eq!(reader.state(), ParserState::Completed);
    let snapshot = events.snapshot();
    assert_eq!(snapshot.last().map(String::as_str), Some("end_document"));
}
