use crate::error::CodecError;
use crate::header::{Header, HEADER_SIZE};
use crate::opcode::OpCode;

pub const MAX_STRING_SIZE: usize = 2048;
pub const MAX_VECTOR_SIZE: usize = 8192;
pub const MAX_BODY_SIZE: usize = 64 * 1024;

/// A POD value that can be written to / read from a packet body in little-endian byte order.
pub trait Pod: Sized + Copy {
    const SIZE: usize;
    fn to_le(self, out: &mut [u8]);
    fn from_le(buf: &[u8]) -> Self;
}

macro_rules! impl_pod {
    ($t:ty) => {
        impl Pod for $t {
            const SIZE: usize = std::mem::size_of::<$t>();
            fn to_le(self, out: &mut [u8]) {
                out[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
            }
            fn from_le(buf: &[u8]) -> Self {
                let mut bytes = [0u8; std::mem::size_of::<$t>()];
                bytes.copy_from_slice(&buf[..Self::SIZE]);
                <$t>::from_le_bytes(bytes)
            }
        }
    };
}

impl_pod!(u8);
impl_pod!(i8);
impl_pod!(u16);
impl_pod!(i16);
impl_pod!(u32);
impl_pod!(i32);
impl_pod!(u64);
impl_pod!(i64);
impl_pod!(f32);
impl_pod!(f64);

/// A header plus a mutable body buffer and an independent read cursor.
///
/// Body payload fields are little-endian POD; the header's own integer fields are big-endian
/// (see [`Header::encode`]). Strings and vectors are length-prefixed with a little-endian `u32`
/// count, capped at [`MAX_STRING_SIZE`] / [`MAX_VECTOR_SIZE`] respectively.
#[derive(Debug, Clone)]
pub struct Packet {
    pub header: Header,
    pub body: Vec<u8>,
    read_pos: usize,
}

impl Default for Packet {
    fn default() -> Self {
        Packet::new(OpCode::None)
    }
}

impl Packet {
    pub fn new(op_code: OpCode) -> Packet {
        Packet { header: Header::new(op_code), body: Vec::new(), read_pos: 0 }
    }

    pub fn reset_read(&mut self) {
        self.read_pos = 0;
    }

    pub fn write_pod<T: Pod>(&mut self, value: T) -> &mut Self {
        let start = self.body.len();
        self.body.resize(start + T::SIZE, 0);
        value.to_le(&mut self.body[start..]);
        self
    }

    pub fn read_pod<T: Pod>(&mut self) -> Result<T, CodecError> {
        if self.read_pos + T::SIZE > self.body.len() {
            return Err(CodecError::OutOfBounds);
        }
        let v = T::from_le(&self.body[self.read_pos..]);
        self.read_pos += T::SIZE;
        Ok(v)
    }

    pub fn write_str(&mut self, s: &str) -> Result<&mut Self, CodecError> {
        if s.len() > MAX_STRING_SIZE {
            return Err(CodecError::StringTooLarge);
        }
        self.write_pod(s.len() as u32);
        self.body.extend_from_slice(s.as_bytes());
        Ok(self)
    }

    pub fn read_str(&mut self) -> Result<String, CodecError> {
        let len = self.read_pod::<u32>()? as usize;
        if len > MAX_STRING_SIZE {
            return Err(CodecError::StringTooLarge);
        }
        if self.read_pos + len > self.body.len() {
            return Err(CodecError::OutOfBounds);
        }
        let bytes = &self.body[self.read_pos..self.read_pos + len];
        let s = String::from_utf8_lossy(bytes).into_owned();
        self.read_pos += len;
        Ok(s)
    }

    /// Writes `s` into a fixed `len`-byte field, zero-padded, truncating if too long. Mirrors the
    /// embedded `char[N]` fields (`username[32]`, `roomName[64]`, `message[256]`) of the payload
    /// structs, which are not length-prefixed.
    pub fn write_fixed_str(&mut self, s: &str, len: usize) -> &mut Self {
        let mut buf = vec![0u8; len];
        let bytes = s.as_bytes();
        let n = bytes.len().min(len);
        buf[..n].copy_from_slice(&bytes[..n]);
        self.body.extend_from_slice(&buf);
        self
    }

    pub fn read_fixed_str(&mut self, len: usize) -> Result<String, CodecError> {
        if self.read_pos + len > self.body.len() {
            return Err(CodecError::OutOfBounds);
        }
        let bytes = &self.body[self.read_pos..self.read_pos + len];
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let s = String::from_utf8_lossy(&bytes[..end]).into_owned();
        self.read_pos += len;
        Ok(s)
    }

    pub fn write_vec<T: Pod>(&mut self, items: &[T]) -> Result<&mut Self, CodecError> {
        if items.len() > MAX_VECTOR_SIZE {
            return Err(CodecError::VectorTooLarge);
        }
        self.write_pod(items.len() as u32);
        for &item in items {
            self.write_pod(item);
        }
        Ok(self)
    }

    pub fn read_vec<T: Pod>(&mut self) -> Result<Vec<T>, CodecError> {
        let count = self.read_pod::<u32>()? as usize;
        if count > MAX_VECTOR_SIZE {
            return Err(CodecError::VectorTooLarge);
        }
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.read_pod()?);
        }
        Ok(out)
    }

    /// Serializes header (body size filled in) followed by the body, as a contiguous buffer.
    pub fn serialize(&self) -> Vec<u8> {
        let mut header = self.header;
        header.body_size = self.body.len() as u32;
        let mut out = Vec::with_capacity(HEADER_SIZE + self.body.len());
        out.extend_from_slice(&header.encode());
        out.extend_from_slice(&self.body);
        out
    }

    pub fn deserialize(data: &[u8]) -> Result<Packet, CodecError> {
        let header = Header::decode(data)?;
        if header.body_size as usize > MAX_BODY_SIZE {
            return Err(CodecError::BodyTooLarge);
        }
        let body_start = HEADER_SIZE;
        let body_end = body_start + header.body_size as usize;
        if body_end > data.len() {
            return Err(CodecError::OutOfBounds);
        }
        Ok(Packet { header, body: data[body_start..body_end].to_vec(), read_pos: 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pod_round_trip() {
        let mut p = Packet::new(OpCode::Ping);
        p.write_pod(1u8).write_pod(2u16).write_pod(3u32).write_pod(4.5f32);

        let bytes = p.serialize();
        let mut back = Packet::deserialize(&bytes).unwrap();

        assert_eq!(back.header.op_code, OpCode::Ping);
        assert_eq!(back.read_pod::<u8>().unwrap(), 1);
        assert_eq!(back.read_pod::<u16>().unwrap(), 2);
        assert_eq!(back.read_pod::<u32>().unwrap(), 3);
        assert_eq!(back.read_pod::<f32>().unwrap(), 4.5);
    }

    #[test]
    fn string_round_trip() {
        let mut p = Packet::new(OpCode::RoomChatSent);
        p.write_str("gg wp").unwrap();
        let bytes = p.serialize();
        let mut back = Packet::deserialize(&bytes).unwrap();
        assert_eq!(back.read_str().unwrap(), "gg wp");
    }

    #[test]
    fn fixed_str_pads_and_trims_nulls() {
        let mut p = Packet::new(OpCode::LoginRequest);
        p.write_fixed_str("bob", 32);
        let bytes = p.serialize();
        let mut back = Packet::deserialize(&bytes).unwrap();
        assert_eq!(back.read_fixed_str(32).unwrap(), "bob");
    }

    #[test]
    fn string_over_cap_is_rejected() {
        let mut p = Packet::new(OpCode::RoomChatSent);
        let huge = "x".repeat(MAX_STRING_SIZE + 1);
        assert_eq!(p.write_str(&huge), Err(CodecError::StringTooLarge));
    }

    #[test]
    fn vector_round_trip_and_cap() {
        let mut p = Packet::new(OpCode::RoomList);
        let items: Vec<u32> = (0..10).collect();
        p.write_vec(&items).unwrap();
        let bytes = p.serialize();
        let mut back = Packet::deserialize(&bytes).unwrap();
        assert_eq!(back.read_vec::<u32>().unwrap(), items);

        let mut p2 = Packet::new(OpCode::RoomList);
        let too_many = vec![0u8; MAX_VECTOR_SIZE + 1];
        assert_eq!(p2.write_vec(&too_many), Err(CodecError::VectorTooLarge));
    }

    #[test]
    fn read_past_end_is_out_of_bounds() {
        let mut p = Packet::new(OpCode::Ping);
        p.write_pod(1u8);
        let bytes = p.serialize();
        let mut back = Packet::deserialize(&bytes).unwrap();
        back.read_pod::<u8>().unwrap();
        assert_eq!(back.read_pod::<u32>(), Err(CodecError::OutOfBounds));
    }

    #[test]
    fn body_too_large_is_rejected_at_deserialize() {
        let mut header = Header::new(OpCode::Ping);
        header.body_size = (MAX_BODY_SIZE + 1) as u32;
        let mut buf = header.encode().to_vec();
        buf.extend(std::iter::repeat(0u8).take(16));
        assert_eq!(Packet::deserialize(&buf), Err(CodecError::BodyTooLarge));
    }
}
