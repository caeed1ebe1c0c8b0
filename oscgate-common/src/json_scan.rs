//! Single-pass streaming JSON scanner
//!
//! Tokenizes JSON into structural events without building a parse tree.
//! The scanner owns two reusable, bounded buffers (current key, current
//! value); [`JsonScanner::next_event`] advances the state machine by one
//! event and the payload accessors read whatever the event left behind,
//! so a whole request is scanned with no per-event allocation.
//!
//! Known limitations, kept by design for wire compatibility with the
//! gateway's clients:
//! - only `\/` is unescaped (to `/`); every other backslash sequence is
//!   passed through literally
//! - a bare token ends at the next `{` `}` `[` `]` `,`, which is then
//!   pushed back for re-processing
//! - malformed input degrades to best-effort events and stops at end of
//!   input; it is never an error

use std::borrow::Cow;

/// Default capacity for the key and value buffers.
pub const SCAN_BUFFER_SIZE: usize = 256;

/// Structural event produced by the scanner.
///
/// `Pair` and `Value` leave their text in [`JsonScanner::key`] and
/// [`JsonScanner::value`]; the buffers stay valid until the next call to
/// [`JsonScanner::next_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonEvent {
    /// `{`
    StartObject,
    /// `}`
    EndObject,
    /// `[`
    StartArray,
    /// `]`
    EndArray,
    /// A quoted string in key position; the key buffer holds it.
    Pair,
    /// A quoted string or bare token in value position; key and value
    /// buffers hold the enclosing key and the value text.
    Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// parsing nothing
    Neutral,
    /// a `:` was seen; the next token is a value
    Value,
    /// inside an array; repeated values share the enclosing key
    Array,
}

/// Pull-based JSON scanner over a byte slice.
pub struct JsonScanner<'a> {
    input: &'a [u8],
    /// number of bytes consumed; capped by `max_read`
    pos: usize,
    max_read: usize,
    unget: Option<u8>,
    eof: bool,
    depth: i32,
    state: ScanState,
    key: Vec<u8>,
    value: Vec<u8>,
    buf_cap: usize,
    truncated: bool,
}

impl<'a> JsonScanner<'a> {
    /// Scanner over `input`, reading at most `max_read` bytes, with the
    /// default buffer capacity.
    pub fn new(input: &'a [u8], max_read: usize) -> Self {
        Self::with_capacity(input, max_read, SCAN_BUFFER_SIZE)
    }

    /// Scanner with an explicit key/value buffer capacity.
    pub fn with_capacity(input: &'a [u8], max_read: usize, buf_cap: usize) -> Self {
        Self {
            input,
            pos: 0,
            max_read: max_read.min(input.len()),
            unget: None,
            eof: false,
            depth: 0,
            state: ScanState::Neutral,
            key: Vec::new(),
            value: Vec::new(),
            buf_cap,
            truncated: false,
        }
    }

    /// Current object nesting depth. Already incremented when a
    /// `StartObject` is delivered and decremented for `EndObject`.
    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Key left behind by the last `Pair` or `Value` event.
    pub fn key(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }

    /// Value left behind by the last `Value` event.
    pub fn value(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }

    /// True once any key or value exceeded the buffer capacity and was cut.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Stop scanning; every subsequent `next_event` returns `None`.
    pub fn abort(&mut self) {
        self.eof = true;
    }

    /// Advance to the next structural event, or `None` at end of input.
    pub fn next_event(&mut self) -> Option<JsonEvent> {
        loop {
            let c = self.get_char()?;

            if c.is_ascii_whitespace() {
                continue;
            }

            match c {
                b'{' => {
                    self.state = ScanState::Neutral;
                    self.depth += 1;
                    return Some(JsonEvent::StartObject);
                }
                b'}' => {
                    self.depth -= 1;
                    return Some(JsonEvent::EndObject);
                }
                b'[' => {
                    self.state = ScanState::Array;
                    return Some(JsonEvent::StartArray);
                }
                b']' => {
                    self.state = ScanState::Neutral;
                    return Some(JsonEvent::EndArray);
                }
                b'"' => match self.state {
                    ScanState::Neutral => {
                        self.read_string(true);
                        return Some(JsonEvent::Pair);
                    }
                    ScanState::Value | ScanState::Array => {
                        self.read_string(false);
                        if self.state != ScanState::Array {
                            self.state = ScanState::Neutral;
                        }
                        return Some(JsonEvent::Value);
                    }
                },
                b':' => {
                    self.state = ScanState::Value;
                }
                b',' => {
                    if self.state != ScanState::Array {
                        self.state = ScanState::Neutral;
                    }
                }
                first => {
                    if self.state == ScanState::Value || self.state == ScanState::Array {
                        self.read_bare_token(first);
                        return Some(JsonEvent::Value);
                    }
                    // stray character outside any value context: skip
                }
            }
        }
    }

    /// Next byte from the input, honoring the one-slot unget and the
    /// read budget.
    fn get_char(&mut self) -> Option<u8> {
        if self.eof {
            return None;
        }
        if let Some(c) = self.unget.take() {
            return Some(c);
        }
        if self.pos >= self.max_read {
            self.eof = true;
            return None;
        }
        let c = self.input[self.pos];
        self.pos += 1;
        Some(c)
    }

    fn unget_char(&mut self, c: u8) {
        if self.eof {
            return;
        }
        self.unget = Some(c);
    }

    /// Read a quoted string into the key or value buffer, up to the
    /// closing unescaped quote.
    fn read_string(&mut self, into_key: bool) {
        if into_key {
            self.key.clear();
        } else {
            self.value.clear();
        }
        let mut last: u8 = 0;
        while let Some(c) = self.get_char() {
            if c == b'"' && last != b'\\' {
                break;
            }
            let buf = if into_key { &mut self.key } else { &mut self.value };
            if c == b'/' && last == b'\\' {
                // the only escape this scanner resolves
                buf.pop();
                buf.push(b'/');
            } else if buf.len() < self.buf_cap {
                buf.push(c);
            } else {
                self.truncated = true;
            }
            last = c;
        }
    }

    /// Read a bare token into the value buffer until a structural
    /// character, which is pushed back.
    fn read_bare_token(&mut self, first: u8) {
        self.value.clear();
        self.value.push(first);
        while let Some(c) = self.get_char() {
            if matches!(c, b'{' | b'}' | b'[' | b']' | b',') {
                self.unget_char(c);
                break;
            }
            if self.value.len() < self.buf_cap {
                self.value.push(c);
            } else {
                self.truncated = true;
            }
        }
    }
}
