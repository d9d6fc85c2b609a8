mod cdsect;
mod char_data;
mod comment;
mod content;
mod element;
mod literals;
mod pi;
mod tokens;
mod xmldecl;

use crate::{
    error::XMLError,
    sax::{
        error::{dispatch, fatal_error},
        parser::{ParserOption, ParserState, XMLReader},
    },
};

impl XMLReader<'_> {
    /// ```text
    /// [1] document ::= prolog element Misc*
    /// ```
    pub(crate) fn parse_document(&mut self) -> Result<(), XMLError> {
        if let Some(handler) = self.content_handler.as_deref_mut() {
            handler.set_document_locator(self.locator.clone());
        }
        self.state = ParserState::InProgress;
        dispatch!(self, start_document);

        self.parse_prolog()?;
        self.parse_element()?;
        self.parse_misc()?;

        self.source.grow()?;
        if !self.source.is_empty() {
            fatal_error!(
                self,
                ParserUnexpectedDocumentContent,
                "Extra content is found after the document element."
            );
            return Err(XMLError::ParserUnexpectedDocumentContent);
        }

        dispatch!(self, end_document);
        Ok(())
    }

    /// ```text
    /// [22] prolog ::= XMLDecl? Misc* (doctypedecl Misc*)?
    /// ```
    pub(crate) fn parse_prolog(&mut self) -> Result<(), XMLError> {
        self.source.grow()?;
        let content = self.source.content_bytes();
        // '<?xml' must be followed by whitespace or '?' to be an XML
        // declaration; otherwise it is a processing instruction whose
        // target merely starts with "xml".
        if content.starts_with(b"<?xml")
            && content
                .get(5)
                .is_some_and(|&b| matches!(b, b'\x20' | b'\t' | b'\r' | b'\n' | b'?'))
        {
            self.parse_xmldecl()?;
        }
        self.parse_misc()?;
        self.source.grow()?;
        if self.source.content_bytes().starts_with(b"<!DOCTYPE") {
            self.parse_doctypedecl()?;
            self.parse_misc()?;
        }
        Ok(())
    }

    /// ```text
    /// [27] Misc ::= Comment | PI | S
    /// ```
    pub(crate) fn parse_misc(&mut self) -> Result<(), XMLError> {
        self.skip_whitespaces()?;
        self.source.grow()?;

        loop {
            match self.source.content_bytes() {
                [b'<', b'!', b'-', b'-', ..] => self.parse_comment()?,
                [b'<', b'?', ..] => self.parse_pi()?,
                _ => break Ok(()),
            }
            self.skip_whitespaces()?;
            self.source.grow()?;
        }
    }

    /// ```text
    /// [28] doctypedecl ::= '<!DOCTYPE' S Name (S ExternalID)? S? ('[' intSubset ']' S?)? '>'
    /// ```
    ///
    /// The declaration is checked for well-formedness but not processed;
    /// no declarations it contains take effect.
    pub(crate) fn parse_doctypedecl(&mut self) -> Result<(), XMLError> {
        self.source.grow()?;
        if !self.source.content_bytes().starts_with(b"<!DOCTYPE") {
            fatal_error!(
                self,
                ParserInvalidDoctypeDecl,
                "The document type declaration must start with '<!DOCTYPE'."
            );
            return Err(XMLError::ParserInvalidDoctypeDecl);
        }
        // skip '<!DOCTYPE'
        self.source.advance(9)?;
        self.locator.update_column(|c| c + 9);

        if self.skip_whitespaces()? == 0 {
            fatal_error!(
                self,
                ParserInvalidDoctypeDecl,
                "Whitespaces are required after '<!DOCTYPE'."
            );
            return Err(XMLError::ParserInvalidDoctypeDecl);
        }

        let mut name = String::new();
        if self.config.is_enable(ParserOption::Namespaces) {
            self.parse_qname(&mut name)?;
        } else {
            self.parse_name(&mut name)?;
        }

        let s = self.skip_whitespaces()?;
        self.source.grow()?;
        if self.source.is_empty() {
            fatal_error!(self, ParserUnexpectedEOF, "Unexpected EOF.");
            return Err(XMLError::ParserUnexpectedEOF);
        }

        // If the following character is neither '[' nor '>', then there is an ExternalID.
        if !matches!(self.source.content_bytes()[0], b'[' | b'>') {
            if s == 0 {
                fatal_error!(
                    self,
                    ParserInvalidDoctypeDecl,
                    "Whitespaces are required between Name and ExternalID."
                );
                return Err(XMLError::ParserInvalidDoctypeDecl);
            }
            let mut system_id = String::new();
            let mut public_id = None;
            self.parse_external_id(&mut system_id, &mut public_id)?;
            self.skip_whitespaces()?;
        }

        self.source.grow()?;
        if self.source.content_bytes().starts_with(b"[") {
            // skip '['
            self.source.advance(1)?;
            self.locator.update_column(|c| c + 1);

            self.skip_int_subset()?;

            self.source.grow()?;
            if !self.source.content_bytes().starts_with(b"]") {
                fatal_error!(
                    self,
                    ParserInvalidDoctypeDecl,
                    "']' for the end of internal DTD subset is not found."
                );
                return Err(XMLError::ParserInvalidDoctypeDecl);
            }
            // skip ']'
            self.source.advance(1)?;
            self.locator.update_column(|c| c + 1);

            self.skip_whitespaces()?;
        }

        self.source.grow()?;
        if !self.source.content_bytes().starts_with(b">") {
            fatal_error!(
                self,
                ParserInvalidDoctypeDecl,
                "Document type declaration does not close with '>'."
            );
            return Err(XMLError::ParserInvalidDoctypeDecl);
        }
        // skip '>'
        self.source.advance(1)?;
        self.locator.update_column(|c| c + 1);

        self.has_doctype = true;
        Ok(())
    }

    /// Skip the internal DTD subset without interpreting it. Quoted
    /// literals and comments are recognized so that a ']' inside them does
    /// not terminate the subset.
    fn skip_int_subset(&mut self) -> Result<(), XMLError> {
        loop {
            self.source.grow()?;
            if self.source.content_bytes().starts_with(b"<!--") {
                self.parse_comment()?;
                continue;
            }
            match self.source.peek_char()? {
                Some(']') => return Ok(()),
                Some(quote @ ('"' | '\'')) => {
                    self.source.next_char()?;
                    self.locator.update_column(|c| c + 1);
                    loop {
                        match self.source.next_char()? {
                            Some(c) if c == quote => {
                                self.locator.update_column(|c| c + 1);
                                break;
                            }
                            Some('\n') => {
                                self.locator.update_line(|l| l + 1);
                                self.locator.set_column(1);
                            }
                            Some(_) => self.locator.update_column(|c| c + 1),
                            None => {
                                fatal_error!(self, ParserUnexpectedEOF, "Unexpected EOF.");
                                return Err(XMLError::ParserUnexpectedEOF);
                            }
                        }
                    }
                }
                Some('\n') => {
                    self.source.next_char()?;
                    self.locator.update_line(|l| l + 1);
                    self.locator.set_column(1);
                }
                Some(_) => {
                    self.source.next_char()?;
                    self.locator.update_column(|c| c + 1);
                }
                None => {
                    fatal_error!(self, ParserUnexpectedEOF, "Unexpected EOF.");
                    return Err(XMLError::ParserUnexpectedEOF);
                }
            }
        }
    }

    /// ```text
    /// [75] ExternalID ::= 'SYSTEM' S SystemLiteral
    ///                   | 'PUBLIC' S PubidLiteral S SystemLiteral
    /// ```
    pub(crate) fn parse_external_id(
        &mut self,
        system_id: &mut String,
        public_id: &mut Option<String>,
    ) -> Result<(), XMLError> {
        self.source.grow()?;
        match self.source.content_bytes() {
            [b'S', b'Y', b'S', b'T', b'E', b'M', ..] => {
                // skip 'SYSTEM'
                self.source.advance(6)?;
                self.locator.update_column(|c| c + 6);
                if self.skip_whitespaces()? == 0 {
                    fatal_error!(
                        self,
                        ParserInvalidExternalID,
                        "Whitespaces are required after 'SYSTEM' in ExternalID."
                    );
                    return Err(XMLError::ParserInvalidExternalID);
                }
                *public_id = None;
                self.parse_system_literal(system_id)?;
            }
            [b'P', b'U', b'B', b'L', b'I', b'C', ..] => {
                // skip 'PUBLIC'
                self.source.advance(6)?;
                self.locator.update_column(|c| c + 6);
                if self.skip_whitespaces()? == 0 {
                    fatal_error!(
                        self,
                        ParserInvalidExternalID,
                        "Whitespaces are required after 'PUBLIC' in ExternalID."
                    );
                    return Err(XMLError::ParserInvalidExternalID);
                }
                self.parse_pubid_literal(public_id.get_or_insert_default())?;
                if self.skip_whitespaces()? == 0 {
                    fatal_error!(
                        self,
                        ParserInvalidExternalID,
                        "Whitespaces are required after PubidLiteral in ExternalID."
                    );
                    return Err(XMLError::ParserInvalidExternalID);
                }
                self.parse_system_literal(system_id)?;
            }
            _ => {
                fatal_error!(
                    self,
                    ParserInvalidExternalID,
                    "ExternalID must start with 'SYSTEM' or 'PUBLIC'."
                );
                return Err(XMLError::ParserInvalidExternalID);
            }
        }
        Ok(())
    }
}
