// src/framing.rs

//! Wire framing: `base64(zlib(json)) + 0x04`.
//!
//! Every [`Packet`](crate::message::Packet) is JSON-encoded, deflated,
//! base64-encoded, then terminated with a single EOT byte so a stream
//! reader can find frame boundaries without a length prefix.

use crate::errors::{NetworkError, Result};
use crate::message::Packet;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Marks the end of a frame on the wire
pub const EOT: u8 = 0x04;

/// Encodes a packet into a complete wire frame, EOT byte included
pub fn encode(packet: &Packet) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(packet)?;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(6));
    encoder.write_all(&json)?;
    let compressed = encoder.finish()?;

    let mut framed = BASE64.encode(compressed).into_bytes();
    framed.push(EOT);
    Ok(framed)
}

/// Decodes a single frame body (base64 text, EOT already stripped)
pub fn decode(frame: &[u8]) -> Result<Packet> {
    let compressed = BASE64
        .decode(frame)
        .map_err(|e| NetworkError::Base64(e.to_string()))?;

    let mut decoder = ZlibDecoder::new(&compressed[..]);
    let mut json = Vec::new();
    decoder.read_to_end(&mut json)?;

    Ok(serde_json::from_slice(&json)?)
}

/// Accumulates bytes from a stream and yields complete packets as EOT
/// markers arrive
#[derive(Default)]
pub struct FrameReader {
    buffer: Vec<u8>,
}

impl FrameReader {
    /// Creates an empty reader
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends newly-read bytes to the internal buffer
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Pops and decodes the next complete frame, if one is buffered
    pub fn next_frame(&mut self) -> Option<Result<Packet>> {
        let pos = self.buffer.iter().position(|b| *b == EOT)?;
        let frame: Vec<u8> = self.buffer.drain(..=pos).collect();
        Some(decode(&frame[..frame.len() - 1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Packet;

    #[test]
    fn test_roundtrip() {
        let packet = Packet::HandshakeChallenge {
            challenge: "abc123".to_string(),
        };
        let framed = encode(&packet).unwrap();
        assert_eq!(*framed.last().unwrap(), EOT);

        let decoded = decode(&framed[..framed.len() - 1]).unwrap();
        match decoded {
            Packet::HandshakeChallenge { challenge } => assert_eq!(challenge, "abc123"),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn test_frame_reader_single_chunk() {
        let packet = Packet::HandshakeChallenge {
            challenge: "xyz".to_string(),
        };
        let framed = encode(&packet).unwrap();

        let mut reader = FrameReader::new();
        reader.push(&framed);

        assert!(reader.next_frame().is_some());
        assert!(reader.next_frame().is_none());
    }

    #[test]
    fn test_frame_reader_split_across_pushes() {
        let packet = Packet::HandshakeChallenge {
            challenge: "split".to_string(),
        };
        let framed = encode(&packet).unwrap();
        let (first, second) = framed.split_at(framed.len() / 2);

        let mut reader = FrameReader::new();
        reader.push(first);
        assert!(reader.next_frame().is_none());

        reader.push(second);
        assert!(reader.next_frame().is_some());
    }

    #[test]
    fn test_frame_reader_two_packets_one_push() {
        let a = encode(&Packet::HandshakeChallenge {
            challenge: "a".to_string(),
        })
        .unwrap();
        let b = encode(&Packet::HandshakeChallenge {
            challenge: "b".to_string(),
        })
        .unwrap();

        let mut reader = FrameReader::new();
        reader.push(&a);
        reader.push(&b);

        assert!(reader.next_frame().is_some());
        assert!(reader.next_frame().is_some());
        assert!(reader.next_frame().is_none());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = decode(b"not valid base64 at all!!!");
        assert!(result.is_err());
    }
}
