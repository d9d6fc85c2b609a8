use std::io::Read;

use crate::error::XMLError;

const INPUT_CHUNK: usize = 4096;
const GROW_THRESHOLD: usize = 16;

/// Byte source feeding the parser.
///
/// Bytes are pulled from the wrapped reader into a fixed chunk buffer and
/// validated as UTF-8 into `decoded` incrementally, so multi-byte sequences
/// split across read boundaries are handled transparently.
pub struct InputSource<'a> {
    source: Box<dyn Read + 'a>,
    buffer: [u8; INPUT_CHUNK],
    decoded: String,
    /// Start position of the undecoded range of `buffer`
    buffer_next: usize,
    /// End position of data read into `buffer`
    buffer_end: usize,
    /// Start position of unused data in `decoded`
    decoded_next: usize,
    /// Whether `source` has reached EOF
    eof: bool,
}

impl<'a> InputSource<'a> {
    pub fn from_reader(reader: impl Read + 'a) -> Result<Self, XMLError> {
        let mut ret = Self::default();
        ret.decoded
            .reserve(INPUT_CHUNK.saturating_sub(ret.decoded.capacity()));
        ret.source = Box::new(reader);
        ret.eof = false;

        // Handling strange implementations that write only one byte per read
        for _ in 0..INPUT_CHUNK {
            let read = ret.source.read(&mut ret.buffer[ret.buffer_end..])?;
            ret.buffer_end += read;
            if read == 0 {
                ret.eof = true;
                break;
            }
            if ret.buffer_end == INPUT_CHUNK {
                break;
            }
        }
        if ret.buffer_end < 4 {
            // The minimum byte count for well-formed XML is 4 bytes
            // (a document containing only an empty tag with a length of 1),
            // so if the number of bytes read is less than 4 bytes,
            // encoding detection is not possible.
            return Ok(ret);
        }

        match ret.buffer[..4] {
            // UCS-4 BOM, any octet order
            [0x00, 0x00, 0xFE, 0xFF]
            | [0xFF, 0xFE, 0x00, 0x00]
            | [0x00, 0x00, 0xFF, 0xFE]
            | [0xFE, 0xFF, 0x00, 0x00] => return Err(XMLError::ParserUnsupportedEncoding),
            // UTF-16 BOM, big- or little-endian
            [0xFE, 0xFF, ..] | [0xFF, 0xFE, ..] => {
                return Err(XMLError::ParserUnsupportedEncoding);
            }
            // UTF-8 BOM
            [0xEF, 0xBB, 0xBF, ..] => {
                ret.buffer_next = 3;
            }
            // UCS-4 or another 32-bit encoding without a BOM
            [0x00, 0x00, 0x00, 0x3C]
            | [0x3C, 0x00, 0x00, 0x00]
            | [0x00, 0x00, 0x3C, 0x00]
            | [0x00, 0x3C, 0x00, 0x00] => return Err(XMLError::ParserUnsupportedEncoding),
            // UTF-16 or UCS-2 without a BOM
            [0x00, 0x3C, 0x00, 0x3F] | [0x3C, 0x00, 0x3F, 0x00] => {
                return Err(XMLError::ParserUnsupportedEncoding);
            }
            // EBCDIC (in some flavor)
            [0x4C, 0x6F, 0xA7, 0x94] => return Err(XMLError::ParserUnsupportedEncoding),
            // Anything else is an ASCII-compatible 8-bit encoding.
            // Assume UTF-8; the XML declaration may still name another one,
            // which the parser rejects when it reads the declaration.
            _ => {}
        }
        Ok(ret)
    }

    pub fn from_content(str: &str) -> Self {
        Self {
            source: Box::new(std::io::empty()),
            buffer: [0; _],
            decoded: str.to_owned(),
            buffer_next: 0,
            buffer_end: 0,
            decoded_next: 0,
            eof: true,
        }
    }

    pub fn grow(&mut self) -> Result<(), XMLError> {
        if !self.eof {
            let rem = self.buffer_end - self.buffer_next;
            if rem < GROW_THRESHOLD {
                self.buffer
                    .copy_within(self.buffer_next..self.buffer_end, 0);
                self.buffer_next = 0;
                self.buffer_end = rem;
                let mut read = 1;
                while self.buffer_end < INPUT_CHUNK && read != 0 {
                    read = self.source.read(&mut self.buffer[self.buffer_end..])?;
                    self.buffer_end += read;
                }
                self.eof = read == 0;
            }
        }

        let rem = self.buffer_end - self.buffer_next;
        if rem > 0 {
            let cap = self.decoded.capacity() - self.decoded.len();
            if cap < GROW_THRESHOLD {
                self.decoded.drain(..self.decoded_next);
                self.decoded.shrink_to(INPUT_CHUNK);
                self.decoded_next = 0;
            }
            let chunk = &self.buffer[self.buffer_next..self.buffer_end];
            match std::str::from_utf8(chunk) {
                Ok(valid) => {
                    self.decoded.push_str(valid);
                    self.buffer_next = self.buffer_end;
                }
                Err(err) => {
                    let valid = err.valid_up_to();
                    if err.error_len().is_some() || (self.eof && valid < chunk.len()) {
                        // An invalid sequence, or a sequence truncated by EOF
                        return Err(XMLError::DecoderInvalidUTF8);
                    }
                    if valid > 0 {
                        // Incomplete trailing sequence; decode up to it and
                        // wait for more bytes.
                        self.decoded
                            .push_str(unsafe { std::str::from_utf8_unchecked(&chunk[..valid]) });
                        self.buffer_next += valid;
                    }
                }
            }
        }
        Ok(())
    }

    pub fn content_bytes(&self) -> &[u8] {
        &self.decoded.as_bytes()[self.decoded_next..]
    }

    pub fn content_str(&self) -> &str {
        &self.decoded[self.decoded_next..]
    }

    pub fn next_char(&mut self) -> Result<Option<char>, XMLError> {
        Ok(self
            .peek_char()?
            .inspect(|c| self.decoded_next += c.len_utf8()))
    }

    pub fn next_char_if(
        &mut self,
        pred: impl FnOnce(char) -> bool,
    ) -> Result<Option<char>, XMLError> {
        Ok(self
            .peek_char()?
            .filter(|c| pred(*c))
            .inspect(|c| self.decoded_next += c.len_utf8()))
    }

    pub fn peek_char(&mut self) -> Result<Option<char>, XMLError> {
        if let Some(c) = self.content_str().chars().next() {
            return Ok(Some(c));
        }
        self.grow()?;
        Ok(self.content_str().chars().next())
    }

    pub fn advance(&mut self, mut len: usize) -> Result<(), XMLError> {
        while len > 0 {
            self.grow()?;
            let l = len.min(self.decoded.len() - self.decoded_next);
            assert!(l > 0);
            assert!(self.decoded.is_char_boundary(self.decoded_next + l));
            self.decoded_next += l;
            len -= l;
        }
        Ok(())
    }

    /// Returns `true` if both the decoded but unused string
    /// and the read but undecoded data are 0 bytes.
    ///
    /// # Note
    /// Returning `true` does not mean that EOF has been reached.
    /// If all of the read data has been decoded and you continue to consume the decoded strings
    /// without explicitly calling `grow`, this function may return `true` before reaching EOF.
    pub fn is_empty(&self) -> bool {
        self.decoded.len() - self.decoded_next == 0 && self.buffer_end - self.buffer_next == 0
    }
}

impl Default for InputSource<'_> {
    fn default() -> Self {
        Self {
            source: Box::new(std::io::empty()),
            buffer: [0; INPUT_CHUNK],
            decoded: String::new(),
            buffer_next: 0,
            buffer_end: 0,
            decoded_next: 0,
            eof: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multibyte_sequence_split_across_reads() {
        // one-byte-per-call reader forces the decoder to see partial sequences
        struct OneByte<'a>(&'a [u8]);
        impl Read for OneByte<'_> {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if self.0.is_empty() || buf.is_empty() {
                    return Ok(0);
                }
                buf[0] = self.0[0];
                self.0 = &self.0[1..];
                Ok(1)
            }
        }

        let data = "<a>\u{3042}\u{1F600}</a>".as_bytes();
        let mut source = InputSource::from_reader(OneByte(data)).unwrap();
        let mut out = String::new();
        while let Some(c) = source.next_char().unwrap() {
            out.push(c);
        }
        assert_eq!(out, "<a>\u{3042}\u{1F600}</a>");
    }

    #[test]
    fn utf8_bom_is_skipped() {
        let mut source =
            InputSource::from_reader(&[0xEF, 0xBB, 0xBF, b'<', b'a', b'/', b'>'][..]).unwrap();
        assert_eq!(source.next_char().unwrap(), Some('<'));
    }

    #[test]
    fn utf16_input_is_rejected() {
        let data = [0xFF, 0xFE, b'<', 0x00, b'a', 0x00];
        assert!(matches!(
            InputSource::from_reader(&data[..]),
            Err(XMLError::ParserUnsupportedEncoding)
        ));
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let data = [b'<', b'a', b'>', 0xC0, 0xAF, b'<', b'/', b'a', b'>'];
        let mut source = InputSource::from_reader(&data[..]).unwrap();
        let mut err = None;
        loop {
            match source.next_char() {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(e) => {
                    err = Some(e);
                    break;
                }
            }
        }
        assert!(matches!(err, Some(XMLError::DecoderInvalidUTF8)));
    }
}
