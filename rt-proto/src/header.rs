use crate::error::CodecError;
use crate::opcode::OpCode;
use byteorder::{BigEndian, ByteOrder};

pub const MAGIC_NUMBER: u16 = 0xA1B2;
pub const HEADER_SIZE: usize = 16;

/// Fixed 16-byte packet header. Every multi-byte field is big-endian on the wire, independent of
/// the body's little-endian POD encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub magic: u16,
    pub sequence_id: u16,
    pub body_size: u32,
    pub ack_id: u16,
    pub op_code: OpCode,
    pub reserved: u8,
    pub session_id: u32,
}

impl Header {
    pub fn new(op_code: OpCode) -> Header {
        Header {
            magic: MAGIC_NUMBER,
            sequence_id: 0,
            body_size: 0,
            ack_id: 0,
            op_code,
            reserved: 0,
            session_id: 0,
        }
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        BigEndian::write_u16(&mut buf[0..2], self.magic);
        BigEndian::write_u16(&mut buf[2..4], self.sequence_id);
        BigEndian::write_u32(&mut buf[4..8], self.body_size);
        BigEndian::write_u16(&mut buf[8..10], self.ack_id);
        buf[10] = self.op_code.as_u8();
        buf[11] = self.reserved;
        BigEndian::write_u32(&mut buf[12..16], self.session_id);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Header, CodecError> {
        if buf.len() < HEADER_SIZE {
            return Err(CodecError::OutOfBounds);
        }
        let magic = BigEndian::read_u16(&buf[0..2]);
        if magic != MAGIC_NUMBER {
            return Err(CodecError::InvalidMagic);
        }
        Ok(Header {
            magic,
            sequence_id: BigEndian::read_u16(&buf[2..4]),
            body_size: BigEndian::read_u32(&buf[4..8]),
            ack_id: BigEndian::read_u16(&buf[8..10]),
            op_code: OpCode::try_from(buf[10])?,
            reserved: buf[11],
            session_id: BigEndian::read_u32(&buf[12..16]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let mut h = Header::new(OpCode::Ping);
        h.sequence_id = 7;
        h.body_size = 42;
        h.ack_id = 6;
        h.session_id = 0xDEAD_BEEF;

        let buf = h.encode();
        let back = Header::decode(&buf).unwrap();
        assert_eq!(h, back);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut buf = Header::new(OpCode::Hello).encode();
        buf[0] = 0x00;
        assert_eq!(Header::decode(&buf), Err(CodecError::InvalidMagic));
    }
}
