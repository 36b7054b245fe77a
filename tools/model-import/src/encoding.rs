//! Text encoding detection and format sniffing
//!
//! ASCII FBX files are sometimes saved as UTF-16. The importers only accept
//! UTF-8, so the fallback ladder transcodes them first. [`sniff_format`]
//! produces the magic-byte summary attached to exhausted-ladder diagnostics.

use std::borrow::Cow;
use std::fmt;

/// Files shorter than this are never treated as BOM-less UTF-16
const HEURISTIC_MIN_LEN: usize = 512;
/// Bytes inspected by the zero-byte heuristic
const HEURISTIC_WINDOW: usize = 4096;

const FBX_BINARY_MAGIC: &[u8] = b"Kaydara FBX Binary  ";
const GLB_MAGIC: &[u8] = b"glTF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl TextEncoding {
    /// Detect the encoding and the length of its byte-order mark.
    ///
    /// Without a BOM, a file over 512 bytes whose first 4 KiB has more than
    /// 1/8 zero bytes at odd (LE) or even (BE) offsets is taken as UTF-16.
    pub fn detect(bytes: &[u8]) -> (Self, usize) {
        match bytes {
            [0xEF, 0xBB, 0xBF, ..] => return (Self::Utf8, 3),
            [0xFF, 0xFE, ..] => return (Self::Utf16Le, 2),
            [0xFE, 0xFF, ..] => return (Self::Utf16Be, 2),
            _ => {}
        }

        if bytes.len() > HEURISTIC_MIN_LEN {
            let window = &bytes[..bytes.len().min(HEURISTIC_WINDOW)];
            let zero_even = window.iter().step_by(2).filter(|&&b| b == 0).count();
            let zero_odd = window.iter().skip(1).step_by(2).filter(|&&b| b == 0).count();
            let threshold = window.len() / 8;
            if zero_odd > threshold {
                return (Self::Utf16Le, 0);
            }
            if zero_even > threshold {
                return (Self::Utf16Be, 0);
            }
        }

        (Self::Utf8, 0)
    }

    pub fn is_utf16(self) -> bool {
        !matches!(self, Self::Utf8)
    }
}

/// Decode `bytes` to UTF-8 text, transcoding UTF-16 and stripping any BOM.
///
/// Unpaired surrogates and invalid UTF-8 sequences become replacement
/// characters; decoding never fails.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let (encoding, bom) = TextEncoding::detect(bytes);
    let body = &bytes[bom..];
    match encoding {
        TextEncoding::Utf8 => String::from_utf8_lossy(body),
        TextEncoding::Utf16Le => Cow::Owned(decode_utf16(body, u16::from_le_bytes)),
        TextEncoding::Utf16Be => Cow::Owned(decode_utf16(body, u16::from_be_bytes)),
    }
}

fn decode_utf16(body: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units = body.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

/// What a file looks like from its first bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatSniff {
    Empty,
    FbxBinary { version: u32 },
    FbxText { encoding: TextEncoding },
    Glb { version: u32 },
    GltfJson,
    Text,
    Unknown,
}

impl fmt::Display for FormatSniff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::FbxBinary { version } => write!(f, "Binary v{version}"),
            Self::FbxText { encoding } => match encoding {
                TextEncoding::Utf8 => write!(f, "ASCII UTF-8"),
                TextEncoding::Utf16Le => write!(f, "ASCII UTF-16LE"),
                TextEncoding::Utf16Be => write!(f, "ASCII UTF-16BE"),
            },
            Self::Glb { version } => write!(f, "glTF binary v{version}"),
            Self::GltfJson => write!(f, "glTF JSON"),
            Self::Text => write!(f, "Text"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Classify a file by magic bytes and encoding
pub fn sniff_format(bytes: &[u8]) -> FormatSniff {
    if bytes.is_empty() {
        return FormatSniff::Empty;
    }
    if bytes.len() >= 27 && bytes.starts_with(FBX_BINARY_MAGIC) {
        let version = u32::from_le_bytes([bytes[23], bytes[24], bytes[25], bytes[26]]);
        return FormatSniff::FbxBinary { version };
    }
    if bytes.len() >= 12 && bytes.starts_with(GLB_MAGIC) {
        let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        return FormatSniff::Glb { version };
    }

    let (encoding, _) = TextEncoding::detect(bytes);
    if encoding.is_utf16() {
        return FormatSniff::FbxText { encoding };
    }

    // Printable view of the head, stopping at the first NUL
    let head: String = bytes
        .iter()
        .take(64)
        .take_while(|&&b| b != 0)
        .map(|&b| if (32..127).contains(&b) { b as char } else { '.' })
        .collect();

    const FBX_MARKERS: [&str; 4] = ["; FBX", "FBXHeaderExtension", "Objects:", "Vertices:"];
    if FBX_MARKERS.iter().any(|m| head.contains(m)) {
        return FormatSniff::FbxText { encoding };
    }

    let text = decode_text(&bytes[..bytes.len().min(1024)]);
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') && trimmed.contains("\"asset\"") {
        return FormatSniff::GltfJson;
    }
    let printable = bytes
        .iter()
        .take(256)
        .all(|&b| matches!(b, b'\t' | b'\n' | b'\r' | 32..=126 | 0x80..=0xFF));
    if printable {
        return FormatSniff::Text;
    }
    FormatSniff::Unknown
}
