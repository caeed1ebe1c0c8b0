//! OSC message encoding and UDP transport
//!
//! Builds OSC 1.0 packets: addressed messages with a single typed
//! argument, optionally wrapped in a `#bundle` container carrying the
//! immediate-send time tag. The argument type is inferred from the
//! variable's text value, so `"42"` goes out as an int32, `"-3.5"` as a
//! float32 and everything else as a string.

use std::net::UdpSocket;

use tracing::debug;

use crate::error::{Error, Result};

/// `#bundle` header length: 8 bytes of tag + 8 bytes of time tag.
const BUNDLE_HEADER_LEN: usize = 16;

/// OSC time tag meaning "execute immediately".
const TIME_TAG_IMMEDIATE: u64 = 1;

/// A single typed OSC argument.
#[derive(Debug, Clone, PartialEq)]
pub enum OscArg {
    Int(i32),
    Float(f32),
    Str(String),
}

impl OscArg {
    /// Infer the wire type from a value's text representation.
    ///
    /// A value of optional leading `-`, digits, and at most one `.`
    /// followed by digits is numeric: integer without a `.`, float with
    /// one. Everything else, including a lone `-` and text with a second
    /// `.`, stays a string.
    pub fn infer(text: &str) -> OscArg {
        let bytes = text.as_bytes();
        let mut p = 0;
        if bytes.first() == Some(&b'-') {
            p = 1;
        }
        if p < bytes.len() && (bytes[p].is_ascii_digit() || bytes[p] == b'.') {
            while p < bytes.len() && bytes[p].is_ascii_digit() {
                p += 1;
            }
            if p == bytes.len() {
                // wrap on overflow, as the C conversion did
                let v = text.parse::<i64>().unwrap_or(0);
                return OscArg::Int(v as i32);
            }
            if bytes[p] == b'.' {
                p += 1;
                while p < bytes.len() && bytes[p].is_ascii_digit() {
                    p += 1;
                }
                if p == bytes.len() {
                    return OscArg::Float(text.parse::<f32>().unwrap_or(0.0));
                }
            }
        }
        OscArg::Str(text.to_string())
    }

    fn type_tag(&self) -> &'static str {
        match self {
            OscArg::Int(_) => ",i",
            OscArg::Float(_) => ",f",
            OscArg::Str(_) => ",s",
        }
    }
}

/// Reusable buffer holding one outbound packet: either a single message
/// or a `#bundle` of length-prefixed messages.
#[derive(Debug, Default)]
pub struct OscPacket {
    buf: Vec<u8>,
    bundle: bool,
}

impl OscPacket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the buffer and start a new packet. A wrapped packet begins
    /// with the 16-byte bundle header and the immediate time tag.
    pub fn begin(&mut self, wrap: bool) {
        self.buf.clear();
        self.bundle = wrap;
        if wrap {
            write_padded_str(&mut self.buf, "#bundle");
            self.buf.extend_from_slice(&TIME_TAG_IMMEDIATE.to_be_bytes());
        }
    }

    /// Append one message: address pattern, type tag, typed payload.
    /// Inside a bundle each message gets a 4-byte big-endian size prefix.
    pub fn append_message(&mut self, address: &str, arg: &OscArg) {
        let size_slot = if self.bundle {
            self.buf.extend_from_slice(&[0u8; 4]);
            Some(self.buf.len() - 4)
        } else {
            None
        };
        let start = self.buf.len();

        write_padded_str(&mut self.buf, address);
        write_padded_str(&mut self.buf, arg.type_tag());
        match arg {
            OscArg::Int(v) => self.buf.extend_from_slice(&v.to_be_bytes()),
            OscArg::Float(v) => self.buf.extend_from_slice(&v.to_be_bytes()),
            OscArg::Str(s) => write_padded_str(&mut self.buf, s),
        }

        if let Some(slot) = size_slot {
            let size = (self.buf.len() - start) as u32;
            self.buf[slot..slot + 4].copy_from_slice(&size.to_be_bytes());
        }
    }

    /// Packet bytes as they would go on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Transmit the packet as one datagram.
    ///
    /// A wrapped packet with no appended messages is a successful no-op;
    /// an unwrapped empty buffer is an error.
    pub fn send(&self, transport: &dyn OscTransport) -> Result<()> {
        if self.bundle && self.buf.len() == BUNDLE_HEADER_LEN {
            return Ok(());
        }
        if self.buf.is_empty() {
            return Err(Error::Transport("empty packet".into()));
        }
        transport.send(&self.buf)
    }
}

/// NUL-terminate and pad to a 4-byte boundary.
fn write_padded_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
    while buf.len() % 4 != 0 {
        buf.push(0);
    }
}

/// Datagram sink for outbound packets. The gateway sends over UDP; tests
/// substitute a recording implementation.
pub trait OscTransport: Send {
    fn send(&self, packet: &[u8]) -> Result<()>;
}

/// One-shot UDP sender. Opens a socket per send; resolution and socket
/// errors collapse into a single transport failure.
pub struct UdpTransport {
    host: String,
    port: u16,
}

impl UdpTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }
}

impl OscTransport for UdpTransport {
    fn send(&self, packet: &[u8]) -> Result<()> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))
            .map_err(|e| Error::Transport(format!("socket: {e}")))?;
        socket
            .send_to(packet, (self.host.as_str(), self.port))
            .map_err(|e| Error::Transport(format!("{}:{}: {e}", self.host, self.port)))?;
        debug!(host = %self.host, port = self.port, len = packet.len(), "sent OSC packet");
        Ok(())
    }
}

/// Propagation target: prefix filter plus transport plus the reusable
/// outbound buffer.
pub struct OscRoute {
    prefix: String,
    transport: Box<dyn OscTransport>,
    packet: OscPacket,
}

impl OscRoute {
    pub fn new(prefix: impl Into<String>, transport: Box<dyn OscTransport>) -> Self {
        Self {
            prefix: prefix.into(),
            transport,
            packet: OscPacket::new(),
        }
    }

    /// Whether a variable name is routed to the OSC host. An empty
    /// prefix routes every write.
    pub fn matches(&self, name: &str) -> bool {
        name.starts_with(&self.prefix)
    }

    /// Open a fresh outbound packet.
    pub fn begin(&mut self, wrap: bool) {
        self.packet.begin(wrap);
    }

    /// Append one message addressed by the variable name, with the
    /// argument type inferred from the value text.
    pub fn append(&mut self, name: &str, value: &str) {
        let arg = OscArg::infer(value);
        self.packet.append_message(name, &arg);
    }

    /// Send whatever was appended since `begin`.
    pub fn flush(&mut self) -> Result<()> {
        self.packet.send(&*self.transport)
    }

    /// Single-message convenience used on every propagated write.
    pub fn send_single(&mut self, name: &str, value: &str) -> Result<()> {
        self.begin(false);
        self.append(name, value);
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn infers_integer() {
        assert_eq!(OscArg::infer("42"), OscArg::Int(42));
        assert_eq!(OscArg::infer("-7"), OscArg::Int(-7));
        assert_eq!(OscArg::infer("0"), OscArg::Int(0));
    }

    #[test]
    fn infers_float() {
        assert_eq!(OscArg::infer("-3.5"), OscArg::Float(-3.5));
        assert_eq!(OscArg::infer("3."), OscArg::Float(3.0));
        assert_eq!(OscArg::infer(".5"), OscArg::Float(0.5));
    }

    #[test]
    fn falls_back_to_string() {
        assert_eq!(OscArg::infer("abc"), OscArg::Str("abc".into()));
        assert_eq!(OscArg::infer("3.4.5"), OscArg::Str("3.4.5".into()));
        assert_eq!(OscArg::infer("-"), OscArg::Str("-".into()));
        assert_eq!(OscArg::infer(""), OscArg::Str("".into()));
        assert_eq!(OscArg::infer("12a"), OscArg::Str("12a".into()));
        assert_eq!(OscArg::infer("3.x"), OscArg::Str("3.x".into()));
    }

    #[test]
    fn int_message_wire_format() {
        let mut packet = OscPacket::new();
        packet.begin(false);
        packet.append_message("/a", &OscArg::Int(42));
        assert_eq!(
            packet.as_bytes(),
            [b'/', b'a', 0, 0, b',', b'i', 0, 0, 0, 0, 0, 42]
        );
    }

    #[test]
    fn string_payload_is_padded() {
        let mut packet = OscPacket::new();
        packet.begin(false);
        packet.append_message("/s", &OscArg::Str("hello".into()));
        let bytes = packet.as_bytes();
        assert_eq!(&bytes[0..4], b"/s\0\0");
        assert_eq!(&bytes[4..8], b",s\0\0");
        // "hello" + NUL padded to 8
        assert_eq!(&bytes[8..16], b"hello\0\0\0");
        assert_eq!(bytes.len() % 4, 0);
    }

    #[test]
    fn bundle_wraps_with_header_and_size_prefix() {
        let mut packet = OscPacket::new();
        packet.begin(true);
        packet.append_message("/a", &OscArg::Float(0.5));
        let bytes = packet.as_bytes();
        assert_eq!(&bytes[0..8], b"#bundle\0");
        assert_eq!(&bytes[8..16], &1u64.to_be_bytes());
        // 12-byte message behind a 4-byte size prefix
        assert_eq!(&bytes[16..20], &12u32.to_be_bytes());
        assert_eq!(&bytes[20..24], b"/a\0\0");
        assert_eq!(&bytes[24..28], b",f\0\0");
        assert_eq!(&bytes[28..32], &0.5f32.to_be_bytes());
    }

    struct Recording(Mutex<Vec<Vec<u8>>>);

    impl OscTransport for &Recording {
        fn send(&self, packet: &[u8]) -> Result<()> {
            self.0.lock().unwrap().push(packet.to_vec());
            Ok(())
        }
    }

    #[test]
    fn header_only_bundle_send_is_noop() {
        let recording = Recording(Mutex::new(Vec::new()));
        let mut packet = OscPacket::new();
        packet.begin(true);
        packet.send(&&recording).unwrap();
        assert!(recording.0.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_unwrapped_send_is_an_error() {
        let recording = Recording(Mutex::new(Vec::new()));
        let mut packet = OscPacket::new();
        packet.begin(false);
        assert!(packet.send(&&recording).is_err());
    }
}
