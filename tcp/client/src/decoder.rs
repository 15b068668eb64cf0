//! Incremental UTF-8 decoding of received chunks
//!
//! TCP gives no guarantee that a multi-byte character arrives in one read.
//! The decoder keeps an incomplete trailing sequence until the next chunk
//! completes it, so valid input is reproduced byte-for-byte whatever the
//! chunk boundaries are.

use crate::error::ProbeError;

/// How invalid byte sequences are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeMode {
    /// Replace each invalid sequence with U+FFFD
    Lossy,
    /// Fail with [`ProbeError::Decode`]
    Strict,
}

/// Decoded text of one chunk
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    /// Invalid sequences replaced while decoding this chunk
    pub replacements: u64,
}

/// Stateful chunk decoder
#[derive(Debug)]
pub struct Utf8Decoder {
    mode: DecodeMode,
    /// Bytes of a character started in a previous chunk
    pending: Vec<u8>,
    /// Stream offset of the first pending byte
    offset: u64,
}

impl Utf8Decoder {
    pub fn new(mode: DecodeMode) -> Self {
        Self {
            mode,
            pending: Vec::new(),
            offset: 0,
        }
    }

    /// Decode `chunk`, prefixed by whatever was left over
    pub fn decode(&mut self, chunk: &[u8]) -> Result<Decoded, ProbeError> {
        self.pending.extend_from_slice(chunk);

        let mut decoded = Decoded::default();
        let mut consumed = 0;

        loop {
            let rest = &self.pending[consumed..];
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    decoded.text.push_str(valid);
                    consumed = self.pending.len();
                    break;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    decoded
                        .text
                        .push_str(&String::from_utf8_lossy(&rest[..valid_up_to]));

                    match e.error_len() {
                        // Truncated character at the end: wait for more bytes
                        None => {
                            consumed += valid_up_to;
                            break;
                        }
                        Some(len) => {
                            if self.mode == DecodeMode::Strict {
                                let bytes = rest[valid_up_to..valid_up_to + len].to_vec();
                                let offset = self.offset + (consumed + valid_up_to) as u64;
                                self.pending.clear();
                                return Err(ProbeError::Decode { offset, bytes });
                            }
                            decoded.text.push(char::REPLACEMENT_CHARACTER);
                            decoded.replacements += 1;
                            consumed += valid_up_to + len;
                        }
                    }
                }
            }
        }

        self.pending.drain(..consumed);
        self.offset += consumed as u64;
        Ok(decoded)
    }

    /// Flush a truncated character left at end of stream
    pub fn finish(&mut self) -> Result<Decoded, ProbeError> {
        if self.pending.is_empty() {
            return Ok(Decoded::default());
        }

        let bytes = std::mem::take(&mut self.pending);
        match self.mode {
            DecodeMode::Strict => Err(ProbeError::Decode {
                offset: self.offset,
                bytes,
            }),
            DecodeMode::Lossy => Ok(Decoded {
                text: char::REPLACEMENT_CHARACTER.to_string(),
                replacements: 1,
            }),
        }
    }

    /// Bytes held back waiting for the rest of a character
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
