// SPDX-License-Identifier: MIT
use std::fmt::Write as _;

use base64::Engine;
use piff::ChunkHeader;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::DumpFormat;

const HEX_LINE: usize = 16;
const BASE64_LINE: usize = 76;

/// One chunk as printed by the viewer
#[derive(Debug, Serialize)]
pub struct ChunkView<'a> {
    pub index: usize,
    #[serde(flatten)]
    pub header: &'a ChunkHeader,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    /// Payload octets shown (a prefix when the dump is limited)
    #[serde(skip)]
    pub shown: Option<&'a [u8]>,
}

impl<'a> ChunkView<'a> {
    pub fn new(index: usize, header: &'a ChunkHeader) -> Self {
        Self {
            index,
            header,
            sha256: None,
            shown: None,
        }
    }

    pub fn render_text(&self, dump: DumpFormat) -> String {
        let mut out = format!(
            "-- #{} {}: octetCount:{}",
            self.index, self.header.type_tag, self.header.payload_len
        );
        if let Some(offset) = self.header.start_offset {
            let _ = write!(out, " offset:{}", offset);
        }
        out.push('\n');
        if let Some(sha256) = &self.sha256 {
            let _ = writeln!(out, "   sha256:{}", sha256);
        }
        if let Some(shown) = self.shown {
            out.push_str(&dump_payload(shown, dump));
            if shown.len() < self.header.payload_len as usize {
                let _ = writeln!(
                    out,
                    "   ... {} more octets",
                    self.header.payload_len as usize - shown.len()
                );
            }
        }
        out
    }

    pub fn render_json(&self, dump: DumpFormat) -> serde_json::Result<String> {
        let mut value = serde_json::to_value(self)?;
        if let (Some(shown), serde_json::Value::Object(map)) = (self.shown, &mut value) {
            match dump {
                DumpFormat::Hex => {
                    map.insert("hex".into(), hex::encode(shown).into());
                }
                DumpFormat::Base64 => {
                    map.insert(
                        "base64".into(),
                        base64::engine::general_purpose::STANDARD
                            .encode(shown)
                            .into(),
                    );
                }
                DumpFormat::None => {}
            }
        }
        serde_json::to_string(&value)
    }
}

pub fn sha256_hex(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

pub fn dump_payload(payload: &[u8], dump: DumpFormat) -> String {
    match dump {
        DumpFormat::Hex => hex_dump(payload),
        DumpFormat::Base64 => base64_dump(payload),
        DumpFormat::None => String::new(),
    }
}

/// Canonical hex dump: offset, sixteen octets, ASCII gutter
pub fn hex_dump(payload: &[u8]) -> String {
    let mut out = String::new();
    for (line_no, line) in payload.chunks(HEX_LINE).enumerate() {
        let _ = write!(out, "{:08x}  ", line_no * HEX_LINE);
        for i in 0..HEX_LINE {
            match line.get(i) {
                Some(octet) => {
                    let _ = write!(out, "{:02x} ", octet);
                }
                None => out.push_str("   "),
            }
            if i == 7 {
                out.push(' ');
            }
        }
        out.push_str(" |");
        out.extend(line.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        }));
        out.push_str("|\n");
    }
    out
}

pub fn base64_dump(payload: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(payload);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / BASE64_LINE + 1);
    // base64 output is ASCII, so byte chunks are valid str boundaries
    for line in encoded.as_bytes().chunks(BASE64_LINE) {
        out.extend(line.iter().map(|&b| b as char));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use piff::TypeTag;

    #[test]
    fn test_hex_dump_layout() {
        let dump = hex_dump(b"cafe babe\n");
        assert_eq!(
            dump,
            "00000000  63 61 66 65 20 62 61 62  65 0a                    |cafe babe.|\n"
        );
    }

    #[test]
    fn test_hex_dump_multiple_lines() {
        let dump = hex_dump(&[0u8; 20]);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("00000010  00 00 00 00 "));
    }

    #[test]
    fn test_base64_dump_wraps() {
        let dump = base64_dump(&[0xffu8; 100]);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), BASE64_LINE);
        assert_eq!(base64_dump(b"hi"), "aGk=\n");
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_render_text() {
        let header = ChunkHeader {
            type_tag: TypeTag::new(*b"cafe"),
            payload_len: 8,
            start_offset: Some(10),
        };
        let mut view = ChunkView::new(0, &header);
        view.shown = Some(b"00:c");
        let text = view.render_text(DumpFormat::Hex);
        assert!(text.starts_with("-- #0 cafe: octetCount:8 offset:10\n"));
        assert!(text.contains("|00:c|"));
        assert!(text.ends_with("   ... 4 more octets\n"));
    }

    #[test]
    fn test_render_json() {
        let header = ChunkHeader::new(TypeTag::new(*b"logs"), 2);
        let mut view = ChunkView::new(3, &header);
        view.shown = Some(b"ok");
        let json: serde_json::Value =
            serde_json::from_str(&view.render_json(DumpFormat::Hex).unwrap()).unwrap();
        assert_eq!(json["index"], 3);
        assert_eq!(json["type_tag"], "logs");
        assert_eq!(json["payload_len"], 2);
        assert_eq!(json["hex"], "6f6b");
        assert!(json.get("start_offset").is_none());
    }
}
