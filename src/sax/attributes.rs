use std::{ops::Index, sync::Arc};

use crate::error::XMLError;

/// Declared attribute types as reported by `get_type`.
///
/// Without a DTD every attribute is `CDATA`; unknown type strings also
/// default to `CDATA`. Enumerated types are reported as `NMTOKEN`, matching
/// the SAX convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttributeType {
    #[default]
    CDATA,
    ID,
    IDREF,
    IDREFS,
    ENTITY,
    ENTITIES,
    NMTOKEN,
    NMTOKENS,
    NOTATION,
}

impl AttributeType {
    pub fn as_str(&self) -> &'static str {
        match *self {
            Self::CDATA => "CDATA",
            Self::ID => "ID",
            Self::IDREF => "IDREF",
            Self::IDREFS => "IDREFS",
            Self::ENTITY => "ENTITY",
            Self::ENTITIES => "ENTITIES",
            Self::NMTOKEN => "NMTOKEN",
            Self::NMTOKENS => "NMTOKENS",
            Self::NOTATION => "NOTATION",
        }
    }

    fn from_type_string(s: &str) -> Self {
        match s {
            "ID" => Self::ID,
            "IDREF" => Self::IDREF,
            "IDREFS" => Self::IDREFS,
            "ENTITY" => Self::ENTITY,
            "ENTITIES" => Self::ENTITIES,
            "NMTOKEN" => Self::NMTOKEN,
            "NMTOKENS" => Self::NMTOKENS,
            "NOTATION" => Self::NOTATION,
            _ => Self::CDATA,
        }
    }
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One attribute occurrence.
///
/// `uri` and `local_name` are `None` when the attribute has no namespace
/// or was read without namespace processing. `value` has all character and
/// entity references already expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub uri: Option<Arc<str>>,
    pub local_name: Option<Arc<str>>,
    pub qname: Arc<str>,
    pub atttype: AttributeType,
    pub value: Arc<str>,
    pub(crate) nsdecl: bool,
}

impl Attribute {
    /// Check if this attribute is a namespace declaration (`xmlns` or `xmlns:*`).
    pub fn is_nsdecl(&self) -> bool {
        self.nsdecl
    }
}

/// An ordered list of attributes, scoped to one `start_element` call.
///
/// The list handed to [`ContentHandler::start_element`](crate::sax::handler::ContentHandler::start_element)
/// is owned by the parser and reused for the next element as soon as the
/// callback returns. Consumers that need attribute data beyond that window
/// must take their own copy with [`Clone`]; the clone shares the immutable
/// string payloads but no mutable state.
///
/// Storage is a plain vector in insertion (document) order; all name lookups
/// are linear scans. Elements rarely carry enough attributes for a map to
/// pay for its allocations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    entries: Vec<Attribute>,
    namespace_mode: bool,
}

impl Attributes {
    /// A new, empty list enforcing uniqueness on `(uri, local_name)` pairs.
    pub fn new() -> Self {
        Self {
            entries: vec![],
            namespace_mode: true,
        }
    }

    /// A new, empty list enforcing uniqueness on qualified names instead of
    /// `(uri, local_name)` pairs, for use without namespace processing.
    pub fn without_namespaces() -> Self {
        Self {
            entries: vec![],
            namespace_mode: false,
        }
    }

    pub(crate) fn set_namespace_mode(&mut self, on: bool) {
        self.namespace_mode = on;
    }

    /// The number of attributes contained in this list.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if this list has no attributes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one attribute.
    ///
    /// An empty `uri` means "no namespace" and an empty `atttype` (or an
    /// unknown type string) defaults to `CDATA`. Returns the index of the
    /// new entry, or [`XMLError::DuplicateAttribute`] if an entry with the
    /// same `(uri, local_name)` pair (same `qname` without namespace mode)
    /// is already present.
    pub fn add_attribute(
        &mut self,
        uri: &str,
        local_name: &str,
        qname: &str,
        atttype: &str,
        value: &str,
    ) -> Result<usize, XMLError> {
        self.push(Attribute {
            uri: (!uri.is_empty()).then(|| uri.into()),
            local_name: (!local_name.is_empty()).then(|| local_name.into()),
            qname: qname.into(),
            atttype: AttributeType::from_type_string(atttype),
            value: value.into(),
            nsdecl: false,
        })
    }

    pub(crate) fn push(&mut self, attribute: Attribute) -> Result<usize, XMLError> {
        let duplicated = if self.namespace_mode {
            self.entries
                .iter()
                .any(|a| a.uri == attribute.uri && a.local_name == attribute.local_name)
        } else {
            self.entries.iter().any(|a| a.qname == attribute.qname)
        };
        if duplicated {
            return Err(XMLError::DuplicateAttribute);
        }
        self.entries.push(attribute);
        Ok(self.entries.len() - 1)
    }

    fn entry(&self, index: usize) -> Result<&Attribute, XMLError> {
        self.entries
            .get(index)
            .ok_or(XMLError::AttributeIndexOutOfRange)
    }

    /// Get the namespace name of `index`-th attribute. Empty if the
    /// attribute has no namespace.
    pub fn get_uri(&self, index: usize) -> Result<&str, XMLError> {
        Ok(self.entry(index)?.uri.as_deref().unwrap_or(""))
    }

    /// Get the local name of `index`-th attribute. Empty if the attribute
    /// was read without namespace processing.
    pub fn get_local_name(&self, index: usize) -> Result<&str, XMLError> {
        Ok(self.entry(index)?.local_name.as_deref().unwrap_or(""))
    }

    /// Get the qualified name of `index`-th attribute, as written in markup.
    pub fn get_qname(&self, index: usize) -> Result<&str, XMLError> {
        Ok(self.entry(index)?.qname.as_ref())
    }

    /// Get the declared type of `index`-th attribute. `"CDATA"` if unknown.
    pub fn get_type(&self, index: usize) -> Result<&str, XMLError> {
        Ok(self.entry(index)?.atttype.as_str())
    }

    /// Get the value of `index`-th attribute.
    pub fn get_value(&self, index: usize) -> Result<&str, XMLError> {
        Ok(self.entry(index)?.value.as_ref())
    }

    /// Get the index of an attribute whose QName is `qname`.
    pub fn get_index_by_qname(&self, qname: &str) -> Option<usize> {
        self.entries.iter().position(|a| a.qname.as_ref() == qname)
    }

    /// Get the index of an attribute whose expanded name is
    /// `{namespace_name}local_name`.
    pub fn get_index_by_expanded_name(
        &self,
        namespace_name: Option<&str>,
        local_name: &str,
    ) -> Option<usize> {
        self.entries.iter().position(|a| {
            a.uri.as_deref() == namespace_name && a.local_name.as_deref() == Some(local_name)
        })
    }

    /// Get the value of an attribute whose QName is `qname`.
    ///
    /// `None` is not an error: it reports that no such attribute exists.
    pub fn get_value_by_qname(&self, qname: &str) -> Option<&str> {
        let index = self.get_index_by_qname(qname)?;
        self.get_value(index).ok()
    }

    /// Get the value of an attribute whose expanded name is
    /// `{namespace_name}local_name`.
    pub fn get_value_by_expanded_name(
        &self,
        namespace_name: Option<&str>,
        local_name: &str,
    ) -> Option<&str> {
        let index = self.get_index_by_expanded_name(namespace_name, local_name)?;
        self.get_value(index).ok()
    }

    /// Get the declared type of an attribute whose QName is `qname`.
    pub fn get_type_by_qname(&self, qname: &str) -> Option<&str> {
        let index = self.get_index_by_qname(qname)?;
        self.get_type(index).ok()
    }

    /// Get the declared type of an attribute whose expanded name is
    /// `{namespace_name}local_name`.
    pub fn get_type_by_expanded_name(
        &self,
        namespace_name: Option<&str>,
        local_name: &str,
    ) -> Option<&str> {
        let index = self.get_index_by_expanded_name(namespace_name, local_name)?;
        self.get_type(index).ok()
    }

    /// Truncate to zero entries, keeping the allocation for reuse.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.entries.iter()
    }
}

impl Index<usize> for Attributes {
    type Output = Attribute;

    fn index(&self, index: usize) -> &Self::Output {
        &self.entries[index]
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type IntoIter = std::slice::Iter<'a, Attribute>;
    type Item = &'a Attribute;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_accessors_round_trip() {
        let mut atts = Attributes::new();
        atts.add_attribute("urn:a", "x", "p:x", "ID", "1").unwrap();
        atts.add_attribute("", "y", "y", "", "2").unwrap();

        assert_eq!(atts.len(), 2);
        assert_eq!(atts.get_uri(0).unwrap(), "urn:a");
        assert_eq!(atts.get_local_name(0).unwrap(), "x");
        assert_eq!(atts.get_qname(0).unwrap(), "p:x");
        assert_eq!(atts.get_type(0).unwrap(), "ID");
        assert_eq!(atts.get_value(0).unwrap(), "1");
        assert_eq!(atts.get_uri(1).unwrap(), "");
        assert_eq!(atts.get_type(1).unwrap(), "CDATA");
        assert_eq!(atts.get_value(1).unwrap(), "2");
    }

    #[test]
    fn out_of_range_access_fails() {
        let mut atts = Attributes::new();
        atts.add_attribute("", "a", "a", "", "1").unwrap();

        for index in [1, 2, usize::MAX] {
            assert!(matches!(
                atts.get_value(index),
                Err(XMLError::AttributeIndexOutOfRange)
            ));
            assert!(matches!(
                atts.get_qname(index),
                Err(XMLError::AttributeIndexOutOfRange)
            ));
        }
    }

    #[test]
    fn lookup_by_name() {
        let mut atts = Attributes::new();
        atts.add_attribute("urn:a", "x", "p:x", "", "1").unwrap();
        atts.add_attribute("", "x", "x", "", "2").unwrap();

        assert_eq!(atts.get_value_by_qname("p:x"), Some("1"));
        assert_eq!(atts.get_value_by_qname("x"), Some("2"));
        assert_eq!(atts.get_value_by_qname("q:x"), None);
        assert_eq!(atts.get_value_by_expanded_name(Some("urn:a"), "x"), Some("1"));
        assert_eq!(atts.get_value_by_expanded_name(None, "x"), Some("2"));
        assert_eq!(atts.get_value_by_expanded_name(Some("urn:b"), "x"), None);
        assert_eq!(atts.get_type_by_qname("p:x"), Some("CDATA"));
        assert_eq!(atts.get_type_by_qname("missing"), None);
    }

    #[test]
    fn duplicate_expanded_name_is_rejected() {
        let mut atts = Attributes::new();
        atts.add_attribute("urn:a", "x", "p:x", "", "1").unwrap();
        // same (uri, local_name) under a different prefix
        assert!(matches!(
            atts.add_attribute("urn:a", "x", "q:x", "", "2"),
            Err(XMLError::DuplicateAttribute)
        ));
        assert_eq!(atts.len(), 1);
        // a different namespace is fine
        atts.add_attribute("urn:b", "x", "r:x", "", "3").unwrap();
    }

    #[test]
    fn qname_uniqueness_without_namespaces() {
        let mut atts = Attributes::without_namespaces();
        // same (uri, local) pair but distinct qnames: accepted in this mode
        atts.add_attribute("urn:a", "x", "p:x", "", "1").unwrap();
        atts.add_attribute("urn:a", "x", "q:x", "", "2").unwrap();
        assert!(matches!(
            atts.add_attribute("", "", "p:x", "", "3"),
            Err(XMLError::DuplicateAttribute)
        ));
    }

    #[test]
    fn duplicate_empty_qnames_are_equal() {
        let mut atts = Attributes::without_namespaces();
        atts.add_attribute("", "", "", "", "").unwrap();
        assert!(matches!(
            atts.add_attribute("", "", "", "", ""),
            Err(XMLError::DuplicateAttribute)
        ));
    }

    #[test]
    fn copy_is_an_independent_snapshot() {
        let mut atts = Attributes::new();
        atts.add_attribute("urn:a", "x", "p:x", "NMTOKEN", "1").unwrap();
        atts.add_attribute("", "y", "y", "", "2").unwrap();

        let copy = atts.clone();
        assert_eq!(copy.len(), atts.len());
        for i in 0..atts.len() {
            assert_eq!(copy.get_uri(i).unwrap(), atts.get_uri(i).unwrap());
            assert_eq!(
                copy.get_local_name(i).unwrap(),
                atts.get_local_name(i).unwrap()
            );
            assert_eq!(copy.get_qname(i).unwrap(), atts.get_qname(i).unwrap());
            assert_eq!(copy.get_type(i).unwrap(), atts.get_type(i).unwrap());
            assert_eq!(copy.get_value(i).unwrap(), atts.get_value(i).unwrap());
        }

        // mutating the original must not affect the copy
        atts.clear();
        atts.add_attribute("", "z", "z", "", "9").unwrap();
        assert_eq!(copy.len(), 2);
        assert_eq!(copy.get_value(0).unwrap(), "1");
        assert_eq!(copy.get_value(1).unwrap(), "2");
    }

    #[test]
    fn clear_keeps_the_list_reusable() {
        let mut atts = Attributes::new();
        atts.add_attribute("", "a", "a", "", "1").unwrap();
        atts.clear();
        assert!(atts.is_empty());
        // the name freed by clear can be added again
        atts.add_attribute("", "a", "a", "", "2").unwrap();
        assert_eq!(atts.get_value_by_qname("a"), Some("2"));
    }
}
