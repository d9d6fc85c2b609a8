use crate::{
    error::XMLError,
    sax::{
        error::{dispatch, fatal_error},
        parser::XMLReader,
    },
};

impl XMLReader<'_> {
    /// ```text
    /// [16] PI       ::= '<?' PITarget (S (Char* - (Char* '?>' Char*)))? '?>'
    /// [17] PITarget ::= Name - (('X' | 'x') ('M' | 'm') ('L' | 'l'))
    /// ```
    pub(crate) fn parse_pi(&mut self) -> Result<(), XMLError> {
        self.source.grow()?;
        if !self.source.content_bytes().starts_with(b"<?") {
            fatal_error!(
                self,
                ParserInvalidProcessingInstruction,
                "A processing instruction must start with '<?'."
            );
            return Err(XMLError::ParserInvalidProcessingInstruction);
        }
        // skip '<?'
        self.source.advance(2)?;
        self.locator.update_column(|c| c + 2);

        let mut target = String::new();
        self.parse_name(&mut target)?;
        if target.eq_ignore_ascii_case("xml") {
            fatal_error!(
                self,
                ParserUnacceptablePITarget,
                "The target '{}' is reserved and cannot be used as a PI target.",
                target
            );
            return Err(XMLError::ParserUnacceptablePITarget);
        }

        let s = self.skip_whitespaces()?;
        self.source.grow()?;

        let mut data = None::<String>;
        if !self.source.content_bytes().starts_with(b"?>") {
            if s == 0 {
                fatal_error!(
                    self,
                    ParserInvalidProcessingInstruction,
                    "Whitespaces are required between the PI target and data."
                );
                return Err(XMLError::ParserInvalidProcessingInstruction);
            }

            let buffer = data.get_or_insert_default();
            loop {
                if self.source.content_bytes().len() < 2 {
                    self.source.grow()?;
                }
                if self.source.content_bytes().starts_with(b"?>") {
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
            }
        }
        // skip '?>'
        self.source.advance(2)?;
        self.locator.update_column(|c| c + 2);

        dispatch!(self, processing_instruction, &target, data.as_deref());
        Ok(())
    }
}
