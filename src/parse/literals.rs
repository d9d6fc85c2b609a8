use crate::{
    error::XMLError,
    sax::{error::fatal_error, parser::XMLReader},
};

impl XMLReader<'_> {
    /// ```text
    /// [11] SystemLiteral ::= ('"' [^"]* '"') | ("'" [^']* "'")
    /// ```
    pub(crate) fn parse_system_literal(&mut self, buffer: &mut String) -> Result<(), XMLError> {
        let quote = match self.source.next_char()? {
            Some(c @ ('"' | '\'')) => c,
            Some(c) => {
                fatal_error!(
                    self,
                    ParserInvalidSystemLiteral,
                    "A character '0x{:X}' is not correct quotation mark for SystemLiteral.",
                    c as u32
                );
                return Err(XMLError::ParserInvalidSystemLiteral);
            }
            None => {
                fatal_error!(self, ParserUnexpectedEOF, "Unexpected EOF.");
                return Err(XMLError::ParserUnexpectedEOF);
            }
        };
        self.locator.update_column(|c| c + 1);

        // Since BNF does not explicitly use Char, we do not perform a check using `self.is_char`.
        while let Some(c) = self.source.next_char_if(|c| c != quote)? {
            match c {
                '\r' => {
                    if self.source.peek_char()? != Some('\n') {
                        self.locator.update_line(|l| l + 1);
                        self.locator.set_column(1);
                        buffer.push('\n');
                    }
                }
                '\n' => {
                    self.locator.update_line(|l| l + 1);
                    self.locator.set_column(1);
                    buffer.push('\n');
                }
                c => {
                    self.locator.update_column(|c| c + 1);
                    buffer.push(c);
                }
            }
        }

        match self.source.next_char()? {
            Some(c) if c == quote => {
                self.locator.update_column(|c| c + 1);
                Ok(())
            }
            Some(_) => {
                self.locator.update_column(|c| c + 1);
                fatal_error!(
                    self,
                    ParserInvalidSystemLiteral,
                    "SystemLiteral does not close with the correct quotation mark."
                );
                Err(XMLError::ParserInvalidSystemLiteral)
            }
            None => {
                fatal_error!(self, ParserUnexpectedEOF, "Unexpected EOF.");
                Err(XMLError::ParserUnexpectedEOF)
            }
        }
    }

    /// ```text
    /// [12] PubidLiteral ::= '"' PubidChar* '"' | "'" (PubidChar - "'")* "'"
    /// ```
    pub(crate) fn parse_pubid_literal(&mut self, buffer: &mut String) -> Result<(), XMLError> {
        let quote = match self.source.next_char()? {
            Some(c @ ('"' | '\'')) => c,
            Some(c) => {
                fatal_error!(
                    self,
                    ParserInvalidPubidLiteral,
                    "A character '0x{:X}' is not correct quotation mark for PubidLiteral.",
                    c as u32
                );
                return Err(XMLError::ParserInvalidPubidLiteral);
            }
            None => {
                fatal_error!(self, ParserUnexpectedEOF, "Unexpected EOF.");
                return Err(XMLError::ParserUnexpectedEOF);
            }
        };
        self.locator.update_column(|c| c + 1);

        while let Some(c) = self
            .source
            .next_char_if(|c| self.version.is_pubid_char(c) && c != quote)?
        {
            match c {
                '\r' => {
                    if self.source.peek_char()? != Some('\n') {
                        self.locator.update_line(|l| l + 1);
                        self.locator.set_column(1);
                        buffer.push('\n');
                    }
                }
                '\n' => {
                    self.locator.update_line(|l| l + 1);
                    self.locator.set_column(1);
                    buffer.push('\n');
                }
                c => {
                    self.locator.update_column(|c| c + 1);
                    buffer.push(c);
                }
            }
        }

        match self.source.next_char()? {
            Some(c) if c == quote => {
                self.locator.update_column(|c| c + 1);
                Ok(())
            }
            Some(_) => {
                self.locator.update_column(|c| c + 1);
                fatal_error!(
                    self,
                    ParserInvalidPubidLiteral,
                    "PubidLiteral does not close with the correct quotation mark."
                );
                Err(XMLError::ParserInvalidPubidLiteral)
            }
            None => {
                fatal_error!(self, ParserUnexpectedEOF, "Unexpected EOF.");
                Err(XMLError::ParserUnexpectedEOF)
            }
        }
    }

    /// ```text
    /// [10] AttValue ::= '"' ([^<&"] | Reference)* '"'
    ///                 | "'" ([^<&'] | Reference)* "'"
    /// ```
    ///
    /// Whitespace in the value is normalized to a single space per character,
    /// and references are expanded in place.
    pub(crate) fn parse_att_value(&mut self, buffer: &mut String) -> Result<(), XMLError> {
        let quote = match self.source.next_char()? {
            Some(c @ ('"' | '\'')) => c,
            Some(c) => {
                fatal_error!(
                    self,
                    ParserInvalidAttValue,
                    "A character '0x{:X}' is not correct quotation mark for AttValue.",
                    c as u32
                );
                return Err(XMLError::ParserInvalidAttValue);
            }
            None => {
                fatal_error!(self, ParserUnexpectedEOF, "Unexpected EOF.");
                return Err(XMLError::ParserUnexpectedEOF);
            }
        };
        self.locator.update_column(|c| c + 1);

        loop {
            self.source.grow()?;
            match self.source.peek_char()? {
                Some(c) if c == quote => {
                    self.source.next_char()?;
                    self.locator.update_column(|c| c + 1);
                    return Ok(());
                }
                Some('<') => {
                    fatal_error!(
                        self,
                        ParserInvalidAttValue,
                        "'<' must not appear in an attribute value."
                    );
                    return Err(XMLError::ParserInvalidAttValue);
                }
                Some('&') => {
                    if self.source.content_bytes().starts_with(b"&#") {
                        buffer.push(self.parse_char_ref()?);
                    } else {
                        buffer.push_str(self.parse_predefined_entity_ref()?);
                    }
                }
                Some(c @ ('\t' | '\n')) => {
                    self.source.next_char()?;
                    if c == '\n' {
                        self.locator.update_line(|l| l + 1);
                        self.locator.set_column(1);
                    } else {
                        self.locator.update_column(|c| c + 1);
                    }
                    buffer.push('\x20');
                }
                Some('\r') => {
                    self.source.next_char()?;
                    // CRLF is normalized to a single line feed beforehand,
                    // so it becomes a single space.
                    if self.source.peek_char()? == Some('\n') {
                        self.source.next_char()?;
                    }
                    self.locator.update_line(|l| l + 1);
                    self.locator.set_column(1);
                    buffer.push('\x20');
                }
                Some(c) if self.is_char(c) => {
                    self.source.next_char()?;
                    self.locator.update_column(|c| c + 1);
                    buffer.push(c);
                }
                Some(c) => {
                    fatal_error!(
                        self,
                        ParserInvalidCharacter,
                        "A character '0x{:X}' is not allowed in XML documents.",
                        c as u32
                    );
                    return Err(XMLError::ParserInvalidCharacter);
                }
                None => {
                    fatal_error!(self, ParserUnexpectedEOF, "Unexpected EOF.");
                    return Err(XMLError::ParserUnexpectedEOF);
                }
            }
        }
    }

    /// ```text
    /// [66] CharRef ::= '&#' [0-9]+ ';' | '&#x' [0-9a-fA-F]+ ';'
    /// ```
    ///
    /// The input must be positioned at `&#`.
    pub(crate) fn parse_char_ref(&mut self) -> Result<char, XMLError> {
        // skip '&#'
        self.source.advance(2)?;
        self.locator.update_column(|c| c + 2);

        let mut code = 0u32;
        let mut digits = 0usize;
        let overflow = 0x0011_0000u32;
        if self.source.next_char_if(|c| c == 'x')?.is_some() {
            self.locator.update_column(|c| c + 1);
            while let Some(c) = self.source.next_char_if(|c| c.is_ascii_hexdigit())? {
                code = (code * 16 + c.to_digit(16).unwrap()).min(overflow);
                digits += 1;
                self.locator.update_column(|c| c + 1);
            }
        } else {
            while let Some(c) = self.source.next_char_if(|c| c.is_ascii_digit())? {
                code = (code * 10 + c.to_digit(10).unwrap()).min(overflow);
                digits += 1;
                self.locator.update_column(|c| c + 1);
            }
        }

        if digits == 0 || self.source.next_char_if(|c| c == ';')?.is_none() {
            fatal_error!(
                self,
                ParserInvalidCharacterReference,
                "A character reference must be '&#' [0-9]+ ';' or '&#x' [0-9a-fA-F]+ ';'."
            );
            return Err(XMLError::ParserInvalidCharacterReference);
        }
        self.locator.update_column(|c| c + 1);

        match char::from_u32(code).filter(|&c| self.is_char(c)) {
            Some(c) => Ok(c),
            None => {
                fatal_error!(
                    self,
                    ParserInvalidCharacterReference,
                    "The character '0x{:X}' is not allowed in XML documents.",
                    code
                );
                Err(XMLError::ParserInvalidCharacterReference)
            }
        }
    }

    /// Parse `'&' Name ';'` and expand it as one of the five predefined
    /// entities. Other entities are not resolvable in attribute values
    /// because this parser does not process entity declarations.
    ///
    /// The input must be positioned at `&`.
    fn parse_predefined_entity_ref(&mut self) -> Result<&'static str, XMLError> {
        // skip '&'
        self.source.advance(1)?;
        self.locator.update_column(|c| c + 1);

        let mut name = String::new();
        self.parse_name(&mut name)?;
        if self.source.next_char_if(|c| c == ';')?.is_none() {
            fatal_error!(
                self,
                ParserInvalidEntityReference,
                "An entity reference must end with ';'."
            );
            return Err(XMLError::ParserInvalidEntityReference);
        }
        self.locator.update_column(|c| c + 1);

        match name.as_str() {
            "lt" => Ok("<"),
            "gt" => Ok(">"),
            "amp" => Ok("&"),
            "apos" => Ok("'"),
            "quot" => Ok("\""),
            _ => {
                fatal_error!(
                    self,
                    ParserEntityNotFound,
                    "The entity '{}' cannot be resolved in an attribute value.",
                    name
                );
                Err(XMLError::ParserEntityNotFound)
            }
        }
    }
}
