use std::sync::Arc;

use crate::{
    XML_NS_NAMESPACE, XML_XML_NAMESPACE, XMLVersion,
    error::XMLError,
    sax::{
        attributes::{Attribute, AttributeType},
        error::{dispatch, error, fatal_error},
        parser::{ParserOption, XMLReader},
    },
};

impl XMLReader<'_> {
    /// ```text
    /// [39] element ::= EmptyElemTag | STag content ETag       [WFC: Element Type Match]
    /// [40] STag ::= '<' Name (S Attribute)* S? '>'            [WFC: Unique Att Spec]
    /// [42] ETag ::= '</' Name S? '>'
    /// [44] EmptyElemTag ::= '<' Name (S Attribute)* S? '/>'   [WFC: Unique Att Spec]
    /// ```
    pub(crate) fn parse_element(&mut self) -> Result<(), XMLError> {
        let old_ns_stack_depth = self.namespaces.len();
        let mut name = String::new();
        let mut prefix_length = 0;
        let (empty, uri) = self.parse_start_or_empty_tag(&mut name, &mut prefix_length)?;

        if !empty {
            self.parse_content()?;
            self.source.grow()?;

            // parse end tag

            if !self.source.content_bytes().starts_with(b"</") {
                fatal_error!(
                    self,
                    ParserInvalidEndTag,
                    "'</' is not found at the head of the end tag."
                );
                return Err(XMLError::ParserInvalidEndTag);
            }
            // skip '</'
            self.source.advance(2)?;
            self.locator.update_column(|c| c + 2);

            let mut end_tag_name = String::new();
            if self.config.is_enable(ParserOption::Namespaces) {
                self.parse_qname(&mut end_tag_name)?;
            } else {
                self.parse_name(&mut end_tag_name)?;
            }

            if name != end_tag_name {
                fatal_error!(
                    self,
                    ParserMismatchElementType,
                    "The start tag ('{}') and end tag ('{}') names do not match.",
                    name,
                    end_tag_name
                );
                return Err(XMLError::ParserMismatchElementType);
            }

            self.skip_whitespaces()?;
            self.source.grow()?;

            if !self.source.content_bytes().starts_with(b">") {
                fatal_error!(self, ParserInvalidEndTag, "The end tag does not end with '>'.");
                return Err(XMLError::ParserInvalidEndTag);
            }
            // skip '>'
            self.source.advance(1)?;
            self.locator.update_column(|c| c + 1);
        }

        let local_name = self
            .config
            .is_enable(ParserOption::Namespaces)
            .then(|| name[prefix_length + (prefix_length > 0) as usize..].to_owned());
        dispatch!(
            self,
            end_element,
            uri.as_deref(),
            local_name.as_deref(),
            &name
        );

        // resume the namespace stack
        while self.namespaces.len() > old_ns_stack_depth {
            let (pre, _, old_position) = self.namespaces.pop().unwrap();
            dispatch!(
                self,
                end_prefix_mapping,
                (!pre.is_empty()).then_some(pre.as_ref())
            );

            if old_position != usize::MAX {
                *self.prefix_map.get_mut(&pre).unwrap() = old_position;
            } else {
                self.prefix_map.remove(&pre);
            }
        }

        Ok(())
    }

    /// Return `(empty, uri)` where `empty` indicates an empty-element tag
    /// and `uri` is the resolved namespace name of the element.
    fn parse_start_or_empty_tag(
        &mut self,
        name: &mut String,
        prefix_length: &mut usize,
    ) -> Result<(bool, Option<Arc<str>>), XMLError> {
        self.source.grow()?;

        if !self.source.content_bytes().starts_with(b"<") {
            fatal_error!(
                self,
                ParserInvalidStartOrEmptyTag,
                "StartTag or EmptyTag must start with '<'."
            );
            return Err(XMLError::ParserInvalidStartOrEmptyTag);
        }
        // skip '<'
        self.source.advance(1)?;
        self.locator.update_column(|c| c + 1);

        let namespaces = self.config.is_enable(ParserOption::Namespaces);
        if namespaces {
            *prefix_length = self.parse_qname(name)?;
        } else {
            self.parse_name(name)?;
        }

        let ns_base = self.namespaces.len();
        let mut s = self.skip_whitespaces()?;
        self.source.grow()?;
        if self.source.is_empty() {
            fatal_error!(self, ParserUnexpectedEOF, "Unexpected EOF.");
            return Err(XMLError::ParserUnexpectedEOF);
        }

        let mut atts = vec![];
        let mut att_name = String::new();
        let mut att_value = String::new();
        let xml_ns_namespace: Arc<str> = XML_NS_NAMESPACE.into();
        while !matches!(self.source.content_bytes()[0], b'/' | b'>') {
            if s == 0 {
                fatal_error!(
                    self,
                    ParserInvalidStartOrEmptyTag,
                    "Whitespaces are required before attribute names."
                );
                return Err(XMLError::ParserInvalidStartOrEmptyTag);
            }

            att_name.clear();
            let mut att_prefix_length = 0;
            if namespaces {
                att_prefix_length = self.parse_qname(&mut att_name)?;
            } else {
                self.parse_name(&mut att_name)?;
            }

            self.skip_whitespaces()?;
            self.source.grow()?;
            if !self.source.content_bytes().starts_with(b"=") {
                fatal_error!(
                    self,
                    ParserInvalidAttribute,
                    "'=' is not found after an attribute name in start or empty tag."
                );
                return Err(XMLError::ParserInvalidAttribute);
            }
            // skip '='
            self.source.advance(1)?;
            self.locator.update_column(|c| c + 1);

            self.skip_whitespaces()?;

            att_value.clear();
            self.parse_att_value(&mut att_value)?;

            if namespaces {
                let mut uri = None;
                if (att_prefix_length == 5 && &att_name[..att_prefix_length] == "xmlns")
                    || att_name == "xmlns"
                {
                    // This is a namespace declaration. Register the namespace.
                    let prefix = if att_name == "xmlns" {
                        if att_value == XML_NS_NAMESPACE || att_value == XML_XML_NAMESPACE {
                            error!(
                                self,
                                ParserUnacceptableNamespaceName,
                                "Namespace '{}' cannot be declared as default namespace.",
                                att_value
                            );
                        }
                        ""
                    } else {
                        let prefix = &att_name[att_prefix_length + 1..];
                        if att_value.is_empty()
                            && matches!(self.version, XMLVersion::XML10 | XMLVersion::Unknown)
                        {
                            error!(
                                self,
                                ParserUnacceptableNamespaceName,
                                "Empty namespace name is not allowed in Namespaces in XML 1.0."
                            );
                        } else if att_value == XML_NS_NAMESPACE {
                            error!(
                                self,
                                ParserUnacceptableNamespaceName,
                                "The namespace '{}' cannot be declared explicitly.",
                                XML_NS_NAMESPACE
                            );
                        } else if prefix != "xml" && att_value == XML_XML_NAMESPACE {
                            error!(
                                self,
                                ParserUnacceptableNamespaceName,
                                "The namespace '{}' cannot bind prefixes other than 'xml'.",
                                att_value
                            );
                        } else if prefix == "xml" && att_value != XML_XML_NAMESPACE {
                            error!(
                                self,
                                ParserUnacceptableNamespaceName,
                                "The namespace '{}' cannot bind the prefix 'xml'.",
                                att_value
                            );
                        } else if prefix == "xmlns" {
                            error!(
                                self,
                                ParserUnacceptableNamespaceName,
                                "Any namespaces cannot bind 'xmlns' explicitly."
                            );
                        }
                        prefix
                    };
                    let pos = self.namespaces.len();
                    if let Some((pre, &old)) = self.prefix_map.get_key_value(prefix) {
                        self.namespaces
                            .push((pre.clone(), att_value.as_str().into(), old));
                        *self.prefix_map.get_mut(prefix).unwrap() = pos;
                    } else {
                        let prefix: Arc<str> = prefix.into();
                        self.namespaces
                            .push((prefix.clone(), att_value.as_str().into(), usize::MAX));
                        self.prefix_map.insert(prefix, pos);
                    }
                    uri = Some(xml_ns_namespace.clone());
                }
                // The namespace name may be overwritten by declarations that
                // appear later in this tag, so leave `uri` unset for ordinary
                // attributes and resolve after reading all attributes.
                let nsdecl = uri.is_some();
                atts.push(Attribute {
                    uri,
                    local_name: Some(att_name[att_prefix_length + (att_prefix_length > 0) as usize..].into()),
                    qname: att_name.as_str().into(),
                    atttype: AttributeType::CDATA,
                    value: att_value.as_str().into(),
                    nsdecl,
                });
            } else {
                atts.push(Attribute {
                    uri: None,
                    local_name: None,
                    qname: att_name.as_str().into(),
                    atttype: AttributeType::CDATA,
                    value: att_value.as_str().into(),
                    nsdecl: false,
                });
            }

            s = self.skip_whitespaces()?;
            if self.source.content_bytes().is_empty() {
                self.source.grow()?;
                if self.source.content_bytes().is_empty() {
                    fatal_error!(self, ParserUnexpectedEOF, "Unexpected EOF.");
                    return Err(XMLError::ParserUnexpectedEOF);
                }
            }
        }

        // resolve namespaces for attributes
        if namespaces {
            for att in &mut atts {
                if att.is_nsdecl() {
                    continue;
                }
                let len = att.local_name.as_deref().unwrap().len();
                if len == att.qname.len() {
                    // According to the namespace specification, attribute names without prefixes
                    // do not belong to the default namespace, but rather belong to no namespace.
                    continue;
                }

                let prefix = &att.qname[..att.qname.len() - len - 1];
                if let Some(&pos) = self.prefix_map.get(prefix) {
                    att.uri = Some(self.namespaces[pos].1.clone());
                } else {
                    error!(
                        self,
                        ParserUndefinedNamespace,
                        "The namespace name for the prefix '{}' has not been declared.",
                        prefix
                    );
                }
            }
        }
        // [WFC: Unique Att Spec] / [NSC: Attributes Unique]
        for (i, att) in atts.iter().enumerate() {
            for prev in atts.iter().take(i) {
                let duplicated = if namespaces {
                    att.local_name == prev.local_name && att.uri == prev.uri
                } else {
                    att.qname == prev.qname
                };
                if duplicated {
                    fatal_error!(
                        self,
                        DuplicateAttribute,
                        "The attribute '{}' is duplicated.",
                        att.qname
                    );
                    return Err(XMLError::DuplicateAttribute);
                }
            }
        }

        // parse the tag close
        let empty = match self.source.content_bytes()[0] {
            b'/' => {
                self.source.grow()?;
                if !self.source.content_bytes().starts_with(b"/>") {
                    fatal_error!(
                        self,
                        ParserInvalidStartOrEmptyTag,
                        "EmptyTag must close with '/>'."
                    );
                    return Err(XMLError::ParserInvalidStartOrEmptyTag);
                }
                // skip '/>'
                self.source.advance(2)?;
                self.locator.update_column(|c| c + 2);
                true
            }
            _ => {
                // skip '>'
                self.source.advance(1)?;
                self.locator.update_column(|c| c + 1);
                false
            }
        };

        // rebuild the shared attribute list for this element
        let report_nsdecls = self.config.is_enable(ParserOption::NamespacePrefixes);
        self.atts.clear();
        self.atts.set_namespace_mode(namespaces);
        for att in atts {
            if att.is_nsdecl() && !report_nsdecls {
                continue;
            }
            self.atts.push(att)?;
        }

        for pos in ns_base..self.namespaces.len() {
            let (prefix, uri, _) = self.namespaces[pos].clone();
            dispatch!(
                self,
                start_prefix_mapping,
                (!prefix.is_empty()).then_some(prefix.as_ref()),
                &uri
            );
        }

        let uri = self.resolve_element_namespace(name, *prefix_length)?;
        let local_name =
            namespaces.then(|| &name[*prefix_length + (*prefix_length > 0) as usize..]);
        dispatch!(
            self,
            start_element,
            uri.as_deref(),
            local_name,
            name,
            &self.atts
        );

        Ok((empty, uri))
    }

    /// Resolve the namespace name of an element whose QName has the given
    /// prefix length. Reports a recoverable error and resolves to no
    /// namespace when the prefix is unbound.
    fn resolve_element_namespace(
        &mut self,
        name: &str,
        prefix_length: usize,
    ) -> Result<Option<Arc<str>>, XMLError> {
        if !self.config.is_enable(ParserOption::Namespaces) {
            return Ok(None);
        }

        if prefix_length > 0 {
            if let Some(&pos) = self.prefix_map.get(&name[..prefix_length]) {
                let uri = &self.namespaces[pos].1;
                if !uri.is_empty() {
                    return Ok(Some(uri.clone()));
                }
            }
            error!(
                self,
                ParserUndefinedNamespace,
                "The prefix '{}' is not bound to any namespaces.",
                &name[..prefix_length]
            );
            Ok(None)
        } else if let Some(&pos) = self.prefix_map.get("") {
            // An empty namespace name undeclares the default namespace.
            let uri = &self.namespaces[pos].1;
            Ok((!uri.is_empty()).then(|| uri.clone()))
        } else {
            Ok(None)
        }
    }
}
