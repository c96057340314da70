//! Byte cursor for the little-endian wire format.
//!
//! A [`Reader`] walks a borrowed buffer and a [`Writer`] fills a buffer that is
//! pre-sized to the encoded length of what is being written. Types that know
//! their own wire layout implement [`Decode`] and [`Encode`].

use alloc::vec::Vec;

/// Errors raised while decoding wire data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// A read ran past the end of the buffer.
    #[error("unexpected end of data: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },
    /// A varint used a longer encoding than its value requires.
    #[error("non-canonical varint")]
    NonCanonicalVarInt,
    /// A length field does not fit in memory on this platform.
    #[error("length {0} does not fit in usize")]
    LengthOverflow(u64),
}

/// A type that can be read from the wire.
pub trait Decode: Sized {
    /// Decode one value, advancing the reader past it.
    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, DecodeError>;

    /// Decode one value from the start of `bytes`. Trailing bytes are ignored.
    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::decode_from(&mut Reader::new(bytes))
    }
}

/// A type that can be written to the wire.
pub trait Encode {
    /// Exact number of bytes [`Encode::encode_to`] will write.
    fn encoded_len(&self) -> usize;

    /// Append the wire encoding to `writer`.
    fn encode_to(&self, writer: &mut Writer);

    /// Encode into a fresh buffer of exactly [`Encode::encoded_len`] bytes.
    fn encode(&self) -> Vec<u8> {
        let len = self.encoded_len();
        let mut writer = Writer::with_capacity(len);
        self.encode_to(&mut writer);
        debug_assert_eq!(writer.len(), len, "encoded length mismatch");
        writer.into_inner()
    }
}

/// Reading half of the cursor.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Reader { buf, offset: 0 }
    }

    /// Current read position.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    /// Whether every byte has been consumed.
    pub fn is_eof(&self) -> bool {
        self.offset >= self.buf.len()
    }

    /// The unread tail, without advancing.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.offset..]
    }

    /// Read the next `n` bytes.
    pub fn read_slice(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining() {
            return Err(DecodeError::UnexpectedEof {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    /// Read a fixed-size byte array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_slice(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    /// Big-endian `u32`, only used by the checkpoint bundle.
    pub fn read_u32_be(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    /// Read a canonical Bitcoin varint, returning the value and how many bytes
    /// it occupied.
    pub fn read_var_int(&mut self) -> Result<(u64, usize), DecodeError> {
        let (value, len, min) = match self.read_u8()? {
            0xfd => (u64::from(self.read_u16()?), 3, 0xfd),
            0xfe => (u64::from(self.read_u32()?), 5, 0x1_0000),
            0xff => (self.read_u64()?, 9, 0x1_0000_0000),
            n => (u64::from(n), 1, 0),
        };
        if value < min {
            return Err(DecodeError::NonCanonicalVarInt);
        }
        Ok((value, len))
    }

    /// Read a varint that is used as an in-memory length.
    pub fn read_length(&mut self) -> Result<usize, DecodeError> {
        let (value, _) = self.read_var_int()?;
        usize::try_from(value).map_err(|_| DecodeError::LengthOverflow(value))
    }

    /// Read varint-prefixed bytes.
    pub fn read_var_bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.read_length()?;
        self.read_slice(len)
    }

    /// Read a varint count followed by that many items.
    pub fn read_list<T, F>(&mut self, mut item: F) -> Result<Vec<T>, DecodeError>
    where
        F: FnMut(&mut Self) -> Result<T, DecodeError>,
    {
        let count = self.read_length()?;
        // Every item takes at least one byte, so this bounds the allocation.
        let mut list = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            list.push(item(self)?);
        }
        Ok(list)
    }

    /// Decode a nested object from the unread tail and advance by exactly its
    /// encoded length.
    pub fn read_object<T: Decode + Encode>(&mut self) -> Result<T, DecodeError> {
        let object = T::decode(self.rest())?;
        self.read_slice(object.encoded_len())?;
        Ok(object)
    }
}

/// Writing half of the cursor.
#[derive(Debug, Clone, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Writer {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.write_slice(&value.to_le_bytes());
    }

    pub fn write_u32_be(&mut self, value: u32) {
        self.write_slice(&value.to_be_bytes());
    }

    /// Write a Bitcoin varint in its shortest form.
    pub fn write_var_int(&mut self, value: u64) {
        if value < 0xfd {
            self.write_u8(value as u8);
        } else if value <= 0xffff {
            self.write_u8(0xfd);
            self.write_slice(&(value as u16).to_le_bytes());
        } else if value <= 0xffff_ffff {
            self.write_u8(0xfe);
            self.write_u32(value as u32);
        } else {
            self.write_u8(0xff);
            self.write_u64(value);
        }
    }

    /// Write varint-prefixed bytes.
    pub fn write_var_bytes(&mut self, bytes: &[u8]) {
        self.write_var_int(bytes.len() as u64);
        self.write_slice(bytes);
    }

    /// Write a varint count followed by each item.
    pub fn write_list<T, F>(&mut self, items: &[T], mut item: F)
    where
        F: FnMut(&mut Self, &T),
    {
        self.write_var_int(items.len() as u64);
        for value in items {
            item(self, value);
        }
    }

    pub fn write_object<T: Encode>(&mut self, object: &T) {
        object.encode_to(self);
    }
}

/// Number of bytes [`Writer::write_var_int`] uses for `value`.
pub fn var_int_len(value: u64) -> usize {
    match value {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}
