use crate::{
    error::XMLError,
    sax::{error::fatal_error, parser::XMLReader},
};

impl XMLReader<'_> {
    /// ```text
    /// [15] Comment ::= '<!--' ((Char - '-') | ('-' (Char - '-')))* '-->'
    /// ```
    ///
    /// Comments are checked for well-formedness and discarded; there is no
    /// event for them.
    pub(crate) fn parse_comment(&mut self) -> Result<(), XMLError> {
        self.source.grow()?;
        if !self.source.content_bytes().starts_with(b"<!--") {
            fatal_error!(self, ParserInvalidComment, "Comment does not start with '<!--'.");
            return Err(XMLError::ParserInvalidComment);
        }
        // skip '<!--'
        self.source.advance(4)?;
        self.locator.update_column(|c| c + 4);

        loop {
            if self.source.content_bytes().len() < 3 {
                self.source.grow()?;
            }
            if self.source.content_bytes().starts_with(b"-->") {
                // skip '-->'
                self.source.advance(3)?;
                self.locator.update_column(|c| c + 3);
                return Ok(());
            }

            match self.source.next_char()? {
                Some('-') => {
                    self.locator.update_column(|c| c + 1);
                    if self.source.peek_char()? == Some('-') {
                        fatal_error!(
                            self,
                            ParserInvalidComment,
                            "Comment must not contain '--' except for delimiters."
                        );
                        return Err(XMLError::ParserInvalidComment);
                    }
                }
                Some('\r') => {
                    if self.source.peek_char()? == Some('\n') {
                        self.source.next_char()?;
                    }
                    self.locator.update_line(|l| l + 1);
                    self.locator.set_column(1);
                }
                Some('\n') => {
                    self.locator.update_line(|l| l + 1);
                    self.locator.set_column(1);
                }
                Some(c) if self.is_char(c) => {
                    self.locator.update_column(|c| c + 1);
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
}
