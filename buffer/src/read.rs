use std::marker::PhantomData;
use std::str;

use crate::error::ReadError;
use crate::scalar::Scalar;
use crate::{FILE_IDENTIFIER_LEN, SIZE_UOFFSET, SIZE_VOFFSET};

/// A location inside an encoded buffer: the buffer itself plus a byte
/// offset from its start. Cheap to copy; navigation produces new positions
/// and never mutates the buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Position<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Position<'a> {
    /// The position of the root uoffset: the very start of the buffer.
    pub fn new(buf: &'a [u8]) -> Position<'a> {
        Position { buf, offset: 0 }
    }

    pub fn buffer(&self) -> &'a [u8] {
        self.buf
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The position `delta` bytes further into the buffer. Bounds are
    /// checked when something is read, not here.
    pub fn at(&self, delta: usize) -> Position<'a> {
        Position {
            buf: self.buf,
            offset: self.offset + delta,
        }
    }

    fn bytes(&self, len: usize) -> Result<&'a [u8], ReadError> {
        let end = self.offset.checked_add(len);
        match end {
            Some(end) if end <= self.buf.len() => Ok(&self.buf[self.offset..end]),
            _ => Err(ReadError::parsing(
                self.offset,
                format!("unexpected end of buffer reading {} bytes", len),
            )),
        }
    }

    /// Decodes a little-endian scalar at this position.
    pub fn scalar<T: Scalar>(&self) -> Result<T, ReadError> {
        Ok(T::read_le(self.bytes(T::SIZE)?))
    }

    /// Reads the u32 offset stored here and advances by it, landing on the
    /// first byte of the referenced object. Stored offsets are relative to
    /// their own location, so no further adjustment is needed.
    pub fn follow_uoffset(&self) -> Result<Position<'a>, ReadError> {
        let off: u32 = self.scalar()?;
        let target = self.offset + off as usize;
        if target > self.buf.len() {
            return Err(ReadError::parsing(
                self.offset,
                format!("offset {} points past the end of the buffer", off),
            ));
        }
        Ok(Position {
            buf: self.buf,
            offset: target,
        })
    }

    /// Decodes the string object at this position: a 4-byte length followed
    /// by that many bytes of UTF-8. The trailing NUL is not part of the
    /// returned slice. The result aliases the buffer; nothing is copied.
    pub fn string(&self) -> Result<&'a str, ReadError> {
        let len: u32 = self.scalar()?;
        let bytes = self.at(SIZE_UOFFSET).bytes(len as usize)?;
        str::from_utf8(bytes).map_err(|source| ReadError::Utf8DecodingError {
            message: source.to_string(),
            byte: bytes.get(source.valid_up_to()).copied(),
        })
    }
}

/// A table navigator: the table's position paired with its vtable's. Typed
/// table wrappers are thin wrappers around this pair, mapping field names to
/// slot indexes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Table<'a> {
    position: Position<'a>,
    vtable: Position<'a>,
}

impl<'a> Table<'a> {
    /// Follows the root uoffset at the start of the buffer to the root
    /// table.
    pub fn root(buf: &'a [u8]) -> Result<Table<'a>, ReadError> {
        Table::from_position(Position::new(buf).follow_uoffset()?)
    }

    /// Reads the soffset at a table's position and resolves its vtable.
    pub fn from_position(position: Position<'a>) -> Result<Table<'a>, ReadError> {
        let soffset: i32 = position.scalar()?;
        let vtable_offset = position.offset as i64 - soffset as i64;
        if vtable_offset < 0 || vtable_offset as usize > position.buf.len() {
            return Err(ReadError::parsing(
                position.offset,
                format!("vtable offset {} is out of bounds", vtable_offset),
            ));
        }
        Ok(Table {
            position,
            vtable: Position {
                buf: position.buf,
                offset: vtable_offset as usize,
            },
        })
    }

    pub fn position(&self) -> Position<'a> {
        self.position
    }

    /// Looks a field slot up in the vtable. `None` means the field is
    /// absent: either the vtable is too short to cover the slot, or the
    /// slot holds 0.
    pub fn field_position(&self, slot: usize) -> Result<Option<Position<'a>>, ReadError> {
        let vtable_size: u16 = self.vtable.scalar()?;
        let entry = SIZE_VOFFSET * (2 + slot);
        if entry >= vtable_size as usize {
            return Ok(None);
        }
        let voffset: u16 = self.vtable.at(entry).scalar()?;
        if voffset == 0 {
            return Ok(None);
        }
        Ok(Some(self.position.at(voffset as usize)))
    }

    /// Reads a scalar field, substituting the schema-declared default when
    /// the field is absent.
    pub fn scalar_field<T: Scalar>(&self, slot: usize, default: T) -> Result<T, ReadError> {
        match self.field_position(slot)? {
            Some(position) => position.scalar(),
            None => Ok(default),
        }
    }

    /// Reads a string field. Absent fields are `None`; wrap with
    /// [required] when the schema marks the field required.
    pub fn string_field(&self, slot: usize) -> Result<Option<&'a str>, ReadError> {
        match self.field_position(slot)? {
            Some(position) => Ok(Some(position.follow_uoffset()?.string()?)),
            None => Ok(None),
        }
    }

    /// Reads a child table field.
    pub fn table_field(&self, slot: usize) -> Result<Option<Table<'a>>, ReadError> {
        match self.field_position(slot)? {
            Some(position) => Ok(Some(Table::from_position(position.follow_uoffset()?)?)),
            None => Ok(None),
        }
    }

    /// Reads an inline struct field: the returned position is the struct's
    /// first byte, fields live at their fixed offsets from it.
    pub fn struct_field(&self, slot: usize) -> Result<Option<Position<'a>>, ReadError> {
        self.field_position(slot)
    }

    /// Reads a vector field.
    pub fn vector_field<T: Read<'a>>(&self, slot: usize) -> Result<Option<Vector<'a, T>>, ReadError> {
        match self.field_position(slot)? {
            Some(position) => Ok(Some(Vector::from_position(position.follow_uoffset()?)?)),
            None => Ok(None),
        }
    }

    /// Reads a union field pair: the type tag at `type_slot` and the value
    /// at `type_slot + 1`. A 0 tag (or an absent one) is the `NONE`
    /// variant. Mapping the tag to a concrete table type is the wrapper's
    /// job; unknown tags should surface as [ReadError::UnionUnknown].
    pub fn union_field(&self, type_slot: usize) -> Result<Option<(u8, Table<'a>)>, ReadError> {
        let tag = self.scalar_field::<u8>(type_slot, 0)?;
        if tag == 0 {
            return Ok(None);
        }
        match self.field_position(type_slot + 1)? {
            Some(position) => Ok(Some((tag, Table::from_position(position.follow_uoffset()?)?))),
            None => Err(ReadError::parsing(
                self.position.offset,
                "union type tag is set but the union value is missing".to_owned(),
            )),
        }
    }
}

/// Turns an optional field into a hard requirement, failing with
/// [ReadError::MissingField] when it is absent.
pub fn required<T>(value: Option<T>, field_name: &str) -> Result<T, ReadError> {
    value.ok_or_else(|| ReadError::MissingField {
        field_name: field_name.to_owned(),
    })
}

/// Returns whether the buffer carries the given 4-byte file identifier in
/// the slot right after the root uoffset. Never fails: a short buffer is
/// simply not identified.
pub fn check_file_identifier(buf: &[u8], identifier: &[u8; FILE_IDENTIFIER_LEN]) -> bool {
    buf.len() >= SIZE_UOFFSET + FILE_IDENTIFIER_LEN
        && &buf[SIZE_UOFFSET..SIZE_UOFFSET + FILE_IDENTIFIER_LEN] == identifier
}

/// A value that can be read out of a vector slot: an inline size plus a
/// read step. Scalars read in place; strings and tables occupy a uoffset
/// slot and follow it. Struct wrappers implement this with their computed
/// inline size to get typed struct vectors.
pub trait Read<'a>: Sized {
    const INLINE_SIZE: usize;

    fn read(position: Position<'a>) -> Result<Self, ReadError>;
}

macro_rules! impl_read_scalar {
    ($($ty:ty),*) => {
        $(
            impl<'a> Read<'a> for $ty {
                const INLINE_SIZE: usize = <$ty as Scalar>::SIZE;

                fn read(position: Position<'a>) -> Result<$ty, ReadError> {
                    position.scalar()
                }
            }
        )*
    };
}

impl_read_scalar!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64, bool);

impl<'a> Read<'a> for &'a str {
    const INLINE_SIZE: usize = SIZE_UOFFSET;

    fn read(position: Position<'a>) -> Result<&'a str, ReadError> {
        position.follow_uoffset()?.string()
    }
}

impl<'a> Read<'a> for Table<'a> {
    const INLINE_SIZE: usize = SIZE_UOFFSET;

    fn read(position: Position<'a>) -> Result<Table<'a>, ReadError> {
        Table::from_position(position.follow_uoffset()?)
    }
}

/// A lazy view of an encoded vector: elements decode on access, nothing is
/// materialized up front.
pub struct Vector<'a, T> {
    position: Position<'a>,
    len: u32,
    _element: PhantomData<T>,
}

impl<'a, T> Copy for Vector<'a, T> {}

impl<'a, T> Clone for Vector<'a, T> {
    fn clone(&self) -> Vector<'a, T> {
        *self
    }
}

impl<'a, T: Read<'a>> Vector<'a, T> {
    fn from_position(position: Position<'a>) -> Result<Vector<'a, T>, ReadError> {
        let len: u32 = position.scalar()?;
        let span = (len as usize).checked_mul(T::INLINE_SIZE);
        let elements = position.at(SIZE_UOFFSET);
        match span {
            Some(span) if elements.offset + span <= position.buf.len() => Ok(Vector {
                position: elements,
                len,
                _element: PhantomData,
            }),
            _ => Err(ReadError::parsing(
                position.offset,
                format!("vector of length {} overruns the buffer", len),
            )),
        }
    }

    pub fn len(&self) -> u32 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The position of the first element, mainly useful for alignment
    /// checks and struct wrappers.
    pub fn position(&self) -> Position<'a> {
        self.position
    }

    /// Decodes the element at `index`.
    pub fn get(&self, index: u32) -> Result<T, ReadError> {
        if index >= self.len {
            return Err(ReadError::VectorIndexOutOfBounds {
                length: self.len,
                index,
            });
        }
        T::read(self.position.at(index as usize * T::INLINE_SIZE))
    }

    pub fn iter(&self) -> VectorIter<'a, T> {
        VectorIter {
            vector: *self,
            index: 0,
        }
    }
}

pub struct VectorIter<'a, T> {
    vector: Vector<'a, T>,
    index: u32,
}

impl<'a, T: Read<'a>> Iterator for VectorIter<'a, T> {
    type Item = Result<T, ReadError>;

    fn next(&mut self) -> Option<Result<T, ReadError>> {
        if self.index >= self.vector.len() {
            return None;
        }
        let item = self.vector.get(self.index);
        self.index += 1;
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{Builder, UnionWrite};

    #[test]
    fn scalar_fields_and_defaults() {
        let mut builder = Builder::new();
        builder.start_table(3);
        builder.push_slot::<u16>(0, 5, 0);
        builder.push_slot::<i32>(2, -9, 0);
        let root = builder.end_table();
        let bytes = builder.finish(root, None);

        let table = Table::root(&bytes).unwrap();
        assert_eq!(table.scalar_field::<u16>(0, 0), Ok(5));
        // Slot 1 was never written: its declared default comes back.
        assert_eq!(table.scalar_field::<u64>(1, 42), Ok(42));
        assert_eq!(table.scalar_field::<i32>(2, 0), Ok(-9));
        // Slots past the vtable are absent too.
        assert_eq!(table.scalar_field::<u8>(7, 3), Ok(3));
    }

    #[test]
    fn string_fields() {
        let mut builder = Builder::new();
        let name = builder.create_string("🍕");
        builder.start_table(2);
        builder.push_offset_slot(0, name);
        let root = builder.end_table();
        let bytes = builder.finish(root, None);

        let table = Table::root(&bytes).unwrap();
        assert_eq!(table.string_field(0), Ok(Some("🍕")));
        assert_eq!(table.string_field(1), Ok(None));
        assert_eq!(
            required(table.string_field(1).unwrap(), "name"),
            Err(ReadError::MissingField {
                field_name: "name".to_owned()
            })
        );
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let mut builder = Builder::new();
        let name = builder.create_string("ab");
        builder.start_table(1);
        builder.push_offset_slot(0, name);
        let root = builder.end_table();
        let mut bytes = builder.finish(root, None);

        // Corrupt the second string byte with a lone continuation byte.
        let position = bytes.len() - 3;
        bytes[position] = 0xBF;

        let table = Table::root(&bytes).unwrap();
        match table.string_field(0) {
            Err(ReadError::Utf8DecodingError { byte, .. }) => assert_eq!(byte, Some(0xBF)),
            other => panic!("expected a utf8 error, got {:?}", other),
        }
    }

    #[test]
    fn vector_bounds() {
        let mut builder = Builder::new();
        let numbers = builder.create_vector::<u32>(&[10, 20, 30]);
        builder.start_table(1);
        builder.push_offset_slot(0, numbers);
        let root = builder.end_table();
        let bytes = builder.finish(root, None);

        let table = Table::root(&bytes).unwrap();
        let vector = table.vector_field::<u32>(0).unwrap().unwrap();
        assert_eq!(vector.len(), 3);
        assert_eq!(vector.get(0), Ok(10));
        assert_eq!(vector.get(2), Ok(30));
        assert_eq!(
            vector.get(3),
            Err(ReadError::VectorIndexOutOfBounds {
                length: 3,
                index: 3
            })
        );
        let collected: Result<Vec<u32>, ReadError> = vector.iter().collect();
        assert_eq!(collected, Ok(vec![10, 20, 30]));
    }

    #[test]
    fn vector_of_strings() {
        let mut builder = Builder::new();
        let first = builder.create_string("one");
        let second = builder.create_string("two");
        let items = builder.create_vector_of_offsets(&[first, second]);
        builder.start_table(1);
        builder.push_offset_slot(0, items);
        let root = builder.end_table();
        let bytes = builder.finish(root, None);

        let table = Table::root(&bytes).unwrap();
        let vector = table.vector_field::<&str>(0).unwrap().unwrap();
        assert_eq!(vector.get(0), Ok("one"));
        assert_eq!(vector.get(1), Ok("two"));
    }

    #[test]
    fn union_fields() {
        let mut builder = Builder::new();
        let text = builder.create_string("blade");
        builder.start_table(1);
        builder.push_offset_slot(0, text);
        let sword = builder.end_table();

        builder.start_table(3);
        builder.push_union_slot(0, Some(UnionWrite { tag: 1, value: sword }));
        let root = builder.end_table();
        let bytes = builder.finish(root, None);

        let table = Table::root(&bytes).unwrap();
        let (tag, value) = table.union_field(0).unwrap().unwrap();
        assert_eq!(tag, 1);
        assert_eq!(value.string_field(0), Ok(Some("blade")));
        // A never-written union reads as NONE.
        assert_eq!(table.union_field(2).unwrap().map(|(tag, _)| tag), None);
    }

    #[test]
    fn file_identifier_probe() {
        let mut builder = Builder::new();
        builder.start_table(0);
        let root = builder.end_table();
        let bytes = builder.finish(root, Some(b"MONS"));
        assert!(check_file_identifier(&bytes, b"MONS"));
        assert!(!check_file_identifier(&bytes, b"XXXX"));
        assert!(!check_file_identifier(&[1, 2, 3], b"MONS"));
    }

    #[test]
    fn truncated_buffer_is_a_parsing_error() {
        assert!(matches!(
            Table::root(&[1, 0]),
            Err(ReadError::ParsingError { .. })
        ));
        // A root offset pointing past the end.
        assert!(matches!(
            Table::root(&[200, 0, 0, 0]),
            Err(ReadError::ParsingError { .. })
        ));
    }
}
