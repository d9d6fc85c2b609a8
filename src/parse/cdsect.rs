use crate::{
    CHARDATA_CHUNK_LENGTH,
    error::XMLError,
    sax::{
        error::{dispatch, fatal_error},
        parser::XMLReader,
    },
};

impl XMLReader<'_> {
    /// ```text
    /// [18] CDSect  ::= CDStart CData CDEnd
    /// [19] CDStart ::= '<![CDATA['
    /// [20] CData   ::= (Char* - (Char* ']]>' Char*))
    /// [21] CDEnd   ::= ']]>'
    /// ```
    ///
    /// The section content is reported as ordinary character data.
    pub(crate) fn parse_cdsect(&mut self) -> Result<(), XMLError> {
        self.source.grow()?;
        if !self.source.content_bytes().starts_with(b"<![CDATA[") {
            fatal_error!(
                self,
                ParserInvalidCDSect,
                "A CDATA section must start with '<![CDATA['."
            );
            return Err(XMLError::ParserInvalidCDSect);
        }
        // skip '<![CDATA['
        self.source.advance(9)?;
        self.locator.update_column(|c| c + 9);

        let mut buffer = String::new();
        loop {
            if self.source.content_bytes().len() < 3 {
                self.source.grow()?;
            }
            if self.source.content_bytes().starts_with(b"]]>") {
                // skip ']]>'
                self.source.advance(3)?;
                self.locator.update_column(|c| c + 3);
                break;
            }

            match self.source.next_char()? {
                Some('\r') => {
                    if self.source.peek_char()? == Some('\n') {
                        self.source.next_char()?;
                    }
                    self.locator.update_line(|l| l + 1);
                    self.locator.set_column(1);
                    buffer.push('\n');
                }
                Some('\n') => {
                    self.locator.update_line(|l| l + 1);
                    self.locator.set_column(1);
                    buffer.push('\n');
                }
                Some(c) if self.is_char(c) => {
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

            if buffer.len() >= CHARDATA_CHUNK_LENGTH {
                dispatch!(self, characters, &buffer);
                buffer.clear();
            }
        }

        if !buffer.is_empty() {
            dispatch!(self, characters, &buffer);
        }
        Ok(())
    }
}
