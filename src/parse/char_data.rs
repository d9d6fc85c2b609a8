use memchr::memchr3;

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
    /// [14] CharData ::= [^<&]* - ([^<&]* ']]>' [^<&]*)
    /// ```
    ///
    /// Character references are expanded in place. Long runs are delivered
    /// in chunks of roughly `CHARDATA_CHUNK_LENGTH` bytes.
    pub(crate) fn parse_char_data(&mut self) -> Result<(), XMLError> {
        let mut buffer = String::new();
        loop {
            if self.source.content_bytes().len() < 3 {
                self.source.grow()?;
            }
            match self.source.content_bytes() {
                [] | [b'<', ..] => break,
                [b'&', b'#', ..] => {
                    buffer.push(self.parse_char_ref()?);
                    if buffer.len() >= CHARDATA_CHUNK_LENGTH {
                        dispatch!(self, characters, &buffer);
                        buffer.clear();
                    }
                    continue;
                }
                [b'&', ..] => break,
                [b']', b']', b'>', ..] => {
                    if !buffer.is_empty() {
                        dispatch!(self, characters, &buffer);
                        buffer.clear();
                    }
                    fatal_error!(
                        self,
                        ParserUnacceptablePatternInCharData,
                        "']]>' must not appear in character data except as the end of a CDATA section."
                    );
                    return Err(XMLError::ParserUnacceptablePatternInCharData);
                }
                _ => {}
            }

            // consume plain character data up to the next delimiter in one pass
            let content = self.source.content_str();
            let bound = memchr3(b'<', b'&', b']', content.as_bytes()).unwrap_or(content.len());
            let total = content.len();
            let mut consumed = 0;
            let mut iter = content[..bound].chars().peekable();
            while let Some(&c) = iter.peek() {
                match c {
                    '\r' => {
                        if consumed + 1 == total {
                            // CRLF may be split across refills
                            break;
                        }
                        iter.next();
                        consumed += 1;
                        if iter.peek() == Some(&'\n') {
                            iter.next();
                            consumed += 1;
                        }
                        self.locator.update_line(|l| l + 1);
                        self.locator.set_column(1);
                        buffer.push('\n');
                    }
                    '\n' => {
                        iter.next();
                        consumed += 1;
                        self.locator.update_line(|l| l + 1);
                        self.locator.set_column(1);
                        buffer.push('\n');
                    }
                    c if self.is_char(c) => {
                        iter.next();
                        consumed += c.len_utf8();
                        self.locator.update_column(|c| c + 1);
                        buffer.push(c);
                    }
                    // invalid characters are reported by the per-char path
                    _ => break,
                }
            }

            if consumed > 0 {
                self.source.advance(consumed)?;
            } else {
                // a lone ']', a trailing '\r', or an invalid character
                let Some(c) = self.source.next_char()? else {
                    break;
                };
                match c {
                    '\r' => {
                        if self.source.peek_char()? == Some('\n') {
                            self.source.next_char()?;
                        }
                        self.locator.update_line(|l| l + 1);
                        self.locator.set_column(1);
                        buffer.push('\n');
                    }
                    '\n' => {
                        self.locator.update_line(|l| l + 1);
                        self.locator.set_column(1);
                        buffer.push('\n');
                    }
                    c if self.is_char(c) => {
                        self.locator.update_column(|c| c + 1);
                        buffer.push(c);
                    }
                    c => {
                        if !buffer.is_empty() {
                            dispatch!(self, characters, &buffer);
                            buffer.clear();
                        }
                        fatal_error!(
                            self,
                            ParserInvalidCharacter,
                            "A character '0x{:X}' is not allowed in XML documents.",
                            c as u32
                        );
                        return Err(XMLError::ParserInvalidCharacter);
                    }
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
