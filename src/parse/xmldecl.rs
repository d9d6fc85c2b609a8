use crate::{
    ENCODING_NAME_LIMIT_LENGTH, XML_VERSION_NUM_LIMIT_LENGTH, XMLVersion,
    error::XMLError,
    sax::{
        error::{fatal_error, warning},
        parser::XMLReader,
    },
};

impl XMLReader<'_> {
    /// ```text
    /// [23] XMLDecl ::= '<?xml' VersionInfo EncodingDecl? SDDecl? S? '?>'
    /// [24] VersionInfo ::= S 'version' Eq ("'" VersionNum "'" | '"' VersionNum '"')
    /// [26] VersionNum ::= '1.' [0-9]+
    /// ```
    pub(crate) fn parse_xmldecl(&mut self) -> Result<(), XMLError> {
        self.source.grow()?;
        if !self.source.content_bytes().starts_with(b"<?xml") {
            fatal_error!(
                self,
                ParserInvalidXMLDecl,
                "XML declaration must start with '<?xml'."
            );
            return Err(XMLError::ParserInvalidXMLDecl);
        }
        // skip '<?xml'
        self.source.advance(5)?;
        self.locator.update_column(|c| c + 5);

        // parse VersionInfo
        if self.skip_whitespaces()? == 0 {
            fatal_error!(
                self,
                ParserInvalidXMLDecl,
                "Whitespaces are required between '<?xml' and 'version'."
            );
            return Err(XMLError::ParserInvalidXMLDecl);
        }

        if !self.source.content_bytes().starts_with(b"version") {
            fatal_error!(
                self,
                ParserInvalidXMLDecl,
                "VersionInfo is not found in XMLDecl."
            );
            return Err(XMLError::ParserInvalidXMLDecl);
        }
        // skip 'version'
        self.source.advance(7)?;
        self.locator.update_column(|c| c + 7);

        self.skip_whitespaces()?;
        if !self.source.content_bytes().starts_with(b"=") {
            fatal_error!(
                self,
                ParserInvalidXMLDecl,
                "'=' is not found after 'version' in XMLDecl."
            );
            return Err(XMLError::ParserInvalidXMLDecl);
        }
        // skip '='
        self.source.advance(1)?;
        self.locator.update_column(|c| c + 1);
        self.skip_whitespaces()?;

        let quote = match self.source.next_char()? {
            Some(c @ ('"' | '\'')) => c,
            _ => {
                fatal_error!(
                    self,
                    ParserInvalidXMLDecl,
                    "The quotation marks in the version number are incorrect."
                );
                return Err(XMLError::ParserInvalidXMLDecl);
            }
        };
        self.locator.update_column(|c| c + 1);

        self.source.grow()?;
        let content = self.source.content_bytes();
        let limit = content.len().min(XML_VERSION_NUM_LIMIT_LENGTH);
        let mut cur = 0;
        while cur < limit && (content[cur].is_ascii_digit() || content[cur] == b'.') {
            cur += 1;
        }
        if cur == 0 || cur == limit {
            fatal_error!(
                self,
                ParserInvalidXMLVersion,
                "Invalid XML version number is found."
            );
            return Err(XMLError::ParserInvalidXMLVersion);
        }
        let version = match &content[..cur] {
            [b'1', b'.', b'0'] => XMLVersion::XML10,
            [b'1', b'.', rest @ ..] if !rest.is_empty() && rest.iter().all(u8::is_ascii_digit) => {
                XMLVersion::Unknown
            }
            _ => {
                fatal_error!(
                    self,
                    ParserInvalidXMLVersion,
                    "Invalid XML version number is found."
                );
                return Err(XMLError::ParserInvalidXMLVersion);
            }
        };
        if content[cur] != quote as u8 {
            fatal_error!(
                self,
                ParserInvalidXMLDecl,
                "The quotation marks in the version number are incorrect."
            );
            return Err(XMLError::ParserInvalidXMLDecl);
        }
        self.source.advance(cur + 1)?;
        self.locator.update_column(|c| c + cur + 1);

        if version == XMLVersion::Unknown {
            warning!(
                self,
                ParserInvalidXMLVersion,
                "Unsupported XML version number is found. Fallback to XML 1.0."
            );
        }

        // parse EncodingDecl
        let mut s = self.skip_whitespaces()?;
        self.source.grow()?;
        let mut encoding = None;
        if self.source.content_bytes().starts_with(b"encoding") {
            if s == 0 {
                fatal_error!(
                    self,
                    ParserInvalidXMLDecl,
                    "Whitespaces are required before 'encoding'."
                );
                return Err(XMLError::ParserInvalidXMLDecl);
            }
            encoding = Some(self.parse_encoding_decl()?);
            s = self.skip_whitespaces()?;
            self.source.grow()?;
        }

        // parse SDDecl
        let mut standalone = None;
        if self.source.content_bytes().starts_with(b"standalone") {
            if s == 0 {
                fatal_error!(
                    self,
                    ParserInvalidXMLDecl,
                    "Whitespaces are required before 'standalone'."
                );
                return Err(XMLError::ParserInvalidXMLDecl);
            }
            standalone = Some(self.parse_sddecl()?);
            self.skip_whitespaces()?;
            self.source.grow()?;
        }

        if !self.source.content_bytes().starts_with(b"?>") {
            fatal_error!(self, ParserInvalidXMLDecl, "XMLDecl is not closed with '?>'.");
            return Err(XMLError::ParserInvalidXMLDecl);
        }
        // skip '?>'
        self.source.advance(2)?;
        self.locator.update_column(|c| c + 2);

        // The input has already been decoded as UTF-8, so any declared
        // encoding whose ASCII range does not coincide with UTF-8 cannot
        // be honored.
        if let Some(encoding) = encoding.as_deref()
            && !encoding.eq_ignore_ascii_case("UTF-8")
            && !encoding.eq_ignore_ascii_case("US-ASCII")
            && !encoding.eq_ignore_ascii_case("ASCII")
        {
            fatal_error!(
                self,
                ParserUnsupportedEncoding,
                "The declared encoding '{}' is not supported.",
                encoding
            );
            return Err(XMLError::ParserUnsupportedEncoding);
        }

        self.version = version;
        self.encoding = encoding;
        self.standalone = standalone;
        Ok(())
    }

    /// ```text
    /// [80] EncodingDecl ::= S 'encoding' Eq ('"' EncName '"' | "'" EncName "'")
    /// ```
    fn parse_encoding_decl(&mut self) -> Result<String, XMLError> {
        if !self.source.content_bytes().starts_with(b"encoding") {
            fatal_error!(
                self,
                ParserInvalidEncodingDecl,
                "'encoding' is not found for EncodingDecl."
            );
            return Err(XMLError::ParserInvalidEncodingDecl);
        }
        // skip 'encoding'
        self.source.advance(8)?;
        self.locator.update_column(|c| c + 8);

        self.skip_whitespaces()?;
        if self.source.next_char()? != Some('=') {
            fatal_error!(
                self,
                ParserInvalidEncodingDecl,
                "'=' is not found after 'encoding' in EncodingDecl."
            );
            return Err(XMLError::ParserInvalidEncodingDecl);
        }
        self.locator.update_column(|c| c + 1);
        self.skip_whitespaces()?;

        let quote = match self.source.next_char()? {
            Some(c @ ('"' | '\'')) => c,
            _ => {
                fatal_error!(
                    self,
                    ParserInvalidEncodingDecl,
                    "The quotation marks in the encoding name are incorrect."
                );
                return Err(XMLError::ParserInvalidEncodingDecl);
            }
        };
        self.locator.update_column(|c| c + 1);

        let encoding = self.parse_enc_name()?;

        match self.source.next_char()? {
            Some(c) if c == quote => {
                self.locator.update_column(|c| c + 1);
                Ok(encoding)
            }
            Some(_) => {
                fatal_error!(
                    self,
                    ParserInvalidEncodingDecl,
                    "The quotation marks in the encoding name are incorrect."
                );
                Err(XMLError::ParserInvalidEncodingDecl)
            }
            None => {
                fatal_error!(self, ParserUnexpectedEOF, "Unexpected EOF.");
                Err(XMLError::ParserUnexpectedEOF)
            }
        }
    }

    /// ```text
    /// [81] EncName ::= [A-Za-z] ([A-Za-z0-9._] | '-')*
    /// ```
    fn parse_enc_name(&mut self) -> Result<String, XMLError> {
        self.source.grow()?;

        let content = self.source.content_bytes();
        if content.is_empty() {
            fatal_error!(self, ParserUnexpectedEOF, "Unexpected EOF.");
            return Err(XMLError::ParserUnexpectedEOF);
        }

        if !content[0].is_ascii_alphabetic() {
            fatal_error!(
                self,
                ParserInvalidEncodingDecl,
                "The first character of an encoding name must be ASCII alphabetic."
            );
            return Err(XMLError::ParserInvalidEncodingDecl);
        }

        let limit = ENCODING_NAME_LIMIT_LENGTH.min(content.len());
        let mut cur = 0;
        while cur < limit
            && (content[cur].is_ascii_alphanumeric() || matches!(content[cur], b'.' | b'_' | b'-'))
        {
            cur += 1;
        }

        if cur == limit {
            fatal_error!(
                self,
                ParserInvalidEncodingDecl,
                "Too long encoding name is found."
            );
            return Err(XMLError::ParserInvalidEncodingDecl);
        }

        let ret = unsafe {
            // # Safety
            // `content[..cur]` contains only ASCII characters,
            // so this operation is safe.
            String::from_utf8_unchecked(content[..cur].to_owned())
        };
        self.source.advance(cur)?;
        self.locator.update_column(|c| c + cur);
        Ok(ret)
    }

    /// ```text
    /// [32] SDDecl ::= S 'standalone' Eq
    ///                 (("'" ('yes' | 'no') "'") | ('"' ('yes' | 'no') '"'))
    /// ```
    fn parse_sddecl(&mut self) -> Result<bool, XMLError> {
        self.source.grow()?;
        if !self.source.content_bytes().starts_with(b"standalone") {
            fatal_error!(
                self,
                ParserInvalidSDDecl,
                "'standalone' is not found for SDDecl."
            );
            return Err(XMLError::ParserInvalidSDDecl);
        }
        // skip 'standalone'
        self.source.advance(10)?;
        self.locator.update_column(|c| c + 10);

        self.skip_whitespaces()?;
        self.source.grow()?;
        if !self.source.content_bytes().starts_with(b"=") {
            fatal_error!(self, ParserInvalidSDDecl, "'=' is not found for SDDecl.");
            return Err(XMLError::ParserInvalidSDDecl);
        }
        // skip '='
        self.source.advance(1)?;
        self.locator.update_column(|c| c + 1);
        self.skip_whitespaces()?;

        let quote = match self.source.next_char()? {
            Some(c @ ('"' | '\'')) => c,
            _ => {
                fatal_error!(
                    self,
                    ParserInvalidSDDecl,
                    "The quotation marks in the standalone declaration are incorrect."
                );
                return Err(XMLError::ParserInvalidSDDecl);
            }
        };
        self.locator.update_column(|c| c + 1);

        let ret = match self.source.content_bytes() {
            [b'y', b'e', b's', ..] => {
                self.source.advance(3)?;
                self.locator.update_column(|c| c + 3);
                true
            }
            [b'n', b'o', ..] => {
                self.source.advance(2)?;
                self.locator.update_column(|c| c + 2);
                false
            }
            _ => {
                fatal_error!(
                    self,
                    ParserInvalidSDDecl,
                    "The value of SDDecl must be either 'yes' or 'no'."
                );
                return Err(XMLError::ParserInvalidSDDecl);
            }
        };

        if self.source.next_char()? != Some(quote) {
            fatal_error!(
                self,
                ParserInvalidSDDecl,
                "The quotation marks in the standalone declaration are incorrect."
            );
            return Err(XMLError::ParserInvalidSDDecl);
        }
        self.locator.update_column(|c| c + 1);

        Ok(ret)
    }
}
