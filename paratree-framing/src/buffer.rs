use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::Error;

/// The number of extra bytes reserved on top of a doubled buffer whenever a
/// [`FramedBuffer`] has to grow to accommodate a write.
const GROWTH_SLACK: usize = 4096;

/// A fixed-size value that can be written to and read from a [`FramedBuffer`]
/// without a length prefix.
pub trait FramePrimitive: Sized + Copy {
    /// The exact number of bytes this value occupies on the wire.
    const SIZE: usize;

    /// Appends this value's raw bytes to `buf`.
    fn write_to(&self, buf: &mut Vec<u8>);

    /// Reads a value of this type from `cursor`, advancing it by [`Self::SIZE`].
    fn read_from(cursor: &mut Cursor<&[u8]>) -> Result<Self, Error>;
}

macro_rules! impl_frame_primitive_int {
    ($ty:ty, $write_fn:ident, $read_fn:ident) => {
        impl FramePrimitive for $ty {
            const SIZE: usize = std::mem::size_of::<$ty>();

            fn write_to(&self, buf: &mut Vec<u8>) {
                buf.$write_fn::<LittleEndian>(*self)
                    .expect("writing into a Vec<u8> cannot fail");
            }

            fn read_from(cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
                Ok(cursor.$read_fn::<LittleEndian>()?)
            }
        }
    };
}

impl_frame_primitive_int!(u16, write_u16, read_u16);
impl_frame_primitive_int!(i16, write_i16, read_i16);
impl_frame_primitive_int!(u32, write_u32, read_u32);
impl_frame_primitive_int!(i32, write_i32, read_i32);
impl_frame_primitive_int!(u64, write_u64, read_u64);
impl_frame_primitive_int!(i64, write_i64, read_i64);
impl_frame_primitive_int!(f32, write_f32, read_f32);
impl_frame_primitive_int!(f64, write_f64, read_f64);

impl FramePrimitive for u8 {
    const SIZE: usize = 1;

    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.push(*self);
    }

    fn read_from(cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        Ok(cursor.read_u8()?)
    }
}

impl FramePrimitive for i8 {
    const SIZE: usize = 1;

    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.push(*self as u8);
    }

    fn read_from(cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        Ok(cursor.read_i8()?)
    }
}

impl FramePrimitive for bool {
    const SIZE: usize = 1;

    fn write_to(&self, buf: &mut Vec<u8>) {
        buf.push(if *self { 1 } else { 0 });
    }

    fn read_from(cursor: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        Ok(cursor.read_u8()? != 0)
    }
}

/// A length-prefixed, cursor-driven byte container carrying a type tag plus
/// payload, used both for in-memory node descriptions and for on-wire
/// messages.
///
/// The type tag is set once at construction and is never rewritten. Writes
/// append to the end of the written region; reads advance an independent
/// cursor from the start. A buffer written as `[A then B then C]` decodes
/// back, on a fresh cursor, as the same sequence in order.
#[derive(Debug, Clone)]
pub struct FramedBuffer {
    type_tag: String,
    data: Vec<u8>,
    pos: usize,
}

impl FramedBuffer {
    /// Creates an empty buffer carrying the given type tag.
    pub fn new(type_tag: impl Into<String>) -> Self {
        FramedBuffer {
            type_tag: type_tag.into(),
            data: Vec::new(),
            pos: 0,
        }
    }

    /// Rebuilds a buffer from its type tag and already-written payload,
    /// positioning the read cursor at the start.
    pub fn from_parts(type_tag: impl Into<String>, data: Vec<u8>) -> Self {
        FramedBuffer {
            type_tag: type_tag.into(),
            data,
            pos: 0,
        }
    }

    /// This buffer's type tag, set once at construction.
    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    /// The number of bytes written so far.
    pub fn written_len(&self) -> usize {
        self.data.len()
    }

    /// The number of unread bytes remaining under the cursor.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Rewinds the read cursor to the start, so the buffer can be decoded
    /// again from scratch.
    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// Grows the backing storage so that `needed` additional bytes can be
    /// appended without a second reallocation down the line.
    fn grow_for(&mut self, needed: usize) {
        let remaining_capacity = self.data.capacity() - self.data.len();
        if remaining_capacity < needed {
            let target = 2 * (self.data.len() + needed) + GROWTH_SLACK;
            self.data.reserve(target - self.data.capacity());
        }
    }

    /// Appends the raw bytes of a fixed-size primitive.
    pub fn write<T: FramePrimitive>(&mut self, value: T) {
        self.grow_for(T::SIZE);
        value.write_to(&mut self.data);
    }

    /// Appends a 4-byte signed length prefix followed by `items`' raw bytes.
    pub fn write_slice<T: FramePrimitive>(&mut self, items: &[T]) {
        self.write(items.len() as i32);
        self.grow_for(items.len() * T::SIZE);
        for item in items {
            item.write_to(&mut self.data);
        }
    }

    /// Appends a length prefix followed by the UTF-8 bytes of `s`.
    pub fn write_str(&mut self, s: &str) {
        self.write_bytes(s.as_bytes());
    }

    /// Appends a length prefix followed by raw bytes, verbatim.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write(bytes.len() as i32);
        self.grow_for(bytes.len());
        self.data.extend_from_slice(bytes);
    }

    /// Appends another framed buffer as a nested, length-prefixed payload
    /// (type tag included), for composite knowledge (e.g. a node carrying
    /// an encoded subproblem description).
    pub fn write_nested(&mut self, nested: &FramedBuffer) {
        self.write_bytes(&nested.to_wire());
    }

    fn cursor(&self) -> Result<Cursor<&[u8]>, Error> {
        Ok(Cursor::new(&self.data[self.pos..]))
    }

    fn advance_or_overrun(&mut self, consumed: usize, requested: usize) -> Result<(), Error> {
        if self.pos + consumed > self.data.len() {
            return Err(Error::DecodeOverrun {
                pos: self.pos,
                requested,
                written: self.data.len(),
            });
        }
        self.pos += consumed;
        Ok(())
    }

    /// Reads a fixed-size primitive, advancing the cursor.
    pub fn read<T: FramePrimitive>(&mut self) -> Result<T, Error> {
        if self.remaining() < T::SIZE {
            return Err(Error::DecodeOverrun {
                pos: self.pos,
                requested: T::SIZE,
                written: self.data.len(),
            });
        }
        let mut cursor = self.cursor()?;
        let value = T::read_from(&mut cursor)?;
        self.advance_or_overrun(T::SIZE, T::SIZE)?;
        Ok(value)
    }

    fn read_len_prefix(&mut self) -> Result<usize, Error> {
        let len = self.read::<i32>()?;
        if len < 0 {
            return Err(Error::SizeMismatch(len));
        }
        Ok(len as usize)
    }

    /// Reads a length-prefixed sequence of fixed-size primitives.
    pub fn read_vec<T: FramePrimitive>(&mut self) -> Result<Vec<T>, Error> {
        let n = self.read_len_prefix()?;
        let needed = n * T::SIZE;
        if self.remaining() < needed {
            return Err(Error::DecodeOverrun {
                pos: self.pos,
                requested: needed,
                written: self.data.len(),
            });
        }
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.read::<T>()?);
        }
        Ok(out)
    }

    /// Reads a length-prefixed blob of raw bytes, verbatim.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>, Error> {
        let n = self.read_len_prefix()?;
        if self.remaining() < n {
            return Err(Error::DecodeOverrun {
                pos: self.pos,
                requested: n,
                written: self.data.len(),
            });
        }
        let bytes = self.data[self.pos..self.pos + n].to_vec();
        self.advance_or_overrun(n, n)?;
        Ok(bytes)
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, Error> {
        let bytes = self.read_bytes()?;
        Ok(String::from_utf8(bytes)?)
    }

    /// Reads back a buffer previously written with [`Self::write_nested`].
    pub fn read_nested(&mut self) -> Result<FramedBuffer, Error> {
        let bytes = self.read_bytes()?;
        FramedBuffer::from_wire(&bytes)
    }

    /// Serializes this buffer for transmission: a length-prefixed type tag
    /// followed by the length-prefixed written payload.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.type_tag.len() + self.data.len());
        out.write_i32::<LittleEndian>(self.type_tag.len() as i32).unwrap();
        out.extend_from_slice(self.type_tag.as_bytes());
        out.write_i32::<LittleEndian>(self.data.len() as i32).unwrap();
        out.extend_from_slice(&self.data);
        out
    }

    /// Parses a buffer previously produced by [`Self::to_wire`].
    pub fn from_wire(bytes: &[u8]) -> Result<FramedBuffer, Error> {
        let mut cursor = Cursor::new(bytes);
        let tag_len = cursor.read_i32::<LittleEndian>()?;
        if tag_len < 0 {
            return Err(Error::SizeMismatch(tag_len));
        }
        let tag_len = tag_len as usize;
        let mut tag_buf = vec![0u8; tag_len];
        std::io::Read::read_exact(&mut cursor, &mut tag_buf).map_err(|_| Error::DecodeOverrun {
            pos: 4,
            requested: tag_len,
            written: bytes.len(),
        })?;
        let type_tag = String::from_utf8(tag_buf)?;

        let payload_len = cursor.read_i32::<LittleEndian>()?;
        if payload_len < 0 {
            return Err(Error::SizeMismatch(payload_len));
        }
        let payload_len = payload_len as usize;
        let mut payload = vec![0u8; payload_len];
        std::io::Read::read_exact(&mut cursor, &mut payload).map_err(|_| Error::DecodeOverrun {
            pos: 8 + tag_len,
            requested: payload_len,
            written: bytes.len(),
        })?;

        Ok(FramedBuffer::from_parts(type_tag, payload))
    }
}
