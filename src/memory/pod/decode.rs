//! Record decoding against a field descriptor table

use super::{ensure_pod, FieldKind, FieldSpec, StructSpec};
use crate::core::types::{Addr, MemSize, MemoryError, MemoryResult};
use crate::memory::source::MemoryRead;
use crate::memory::view::OffsetView;

/// A record type with a declared foreign layout.
///
/// `SPEC` is the descriptor table; `decode` builds the native record from
/// the decoder, one field at a time. Construction is all-or-nothing: a
/// failing field aborts the record, so callers never see a half-initialised
/// value.
pub trait Pod: Sized {
    const SPEC: &'static StructSpec;

    fn decode(fields: &mut FieldDecoder<'_, '_>) -> MemoryResult<Self>;
}

/// Returns the descriptor of a [`Pod`] type; usable as the `pointee`
/// function of a [`FieldKind::ValidPointer`] descriptor
pub fn spec_of<T: Pod>() -> &'static StructSpec {
    T::SPEC
}

/// Drives record materialisation against a byte source.
///
/// Lenient by default: pointer fields that fail validation are cleared to
/// null and decoding continues. In strict mode any pointer-validation
/// failure aborts the whole materialisation.
pub struct Materializer<'a> {
    source: &'a dyn MemoryRead,
    strict: bool,
}

impl<'a> Materializer<'a> {
    /// Creates a lenient materialiser over a byte source
    pub fn new(source: &'a dyn MemoryRead) -> Self {
        Materializer {
            source,
            strict: false,
        }
    }

    /// Switches to strict mode
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Reads `T::SPEC.size` bytes at `addr` and materialises the record,
    /// following `ValidPointer` fields recursively
    pub fn read<T: Pod>(&self, addr: Addr) -> MemoryResult<T> {
        ensure_pod(T::SPEC)?;
        let view = self
            .source
            .read_blob(addr, MemSize::from(T::SPEC.size))?;
        self.decode_unchecked(&view)
    }

    /// Materialises a record from an already captured view
    pub fn decode<T: Pod>(&self, view: &OffsetView) -> MemoryResult<T> {
        ensure_pod(T::SPEC)?;
        self.decode_unchecked(view)
    }

    /// Reads and materialises `count` consecutive records starting at
    /// `addr`
    pub fn read_slice<T: Pod>(&self, addr: Addr, count: usize) -> MemoryResult<Vec<T>> {
        ensure_pod(T::SPEC)?;
        let total = MemSize::from(T::SPEC.size * count);
        let view = self.source.read_blob(addr, total)?;
        let mut records = Vec::with_capacity(count);
        for i in 0..count {
            let element = view.off_blob(
                MemSize::from(i * T::SPEC.size),
                MemSize::from(T::SPEC.size),
            )?;
            records.push(self.decode_unchecked(&element)?);
        }
        Ok(records)
    }

    fn decode_unchecked<T: Pod>(&self, view: &OffsetView) -> MemoryResult<T> {
        if view.len() < T::SPEC.size {
            return Err(MemoryError::partial(view.len(), T::SPEC.size));
        }
        let mut fields = FieldDecoder {
            mat: self,
            spec: T::SPEC,
            view,
        };
        T::decode(&mut fields)
    }
}

/// Typed access to the fields of one record window, resolved through the
/// record's descriptor table.
pub struct FieldDecoder<'m, 'a> {
    mat: &'m Materializer<'a>,
    spec: &'static StructSpec,
    view: &'m OffsetView,
}

macro_rules! primitive_accessor {
    ($name:ident, $ty:ty, $kind:pat, $reader:ident) => {
        pub fn $name(&self, name: &str) -> MemoryResult<$ty> {
            let field = self.lookup(name)?;
            if !matches!(field.kind, $kind) {
                return Err(self.kind_mismatch(field, stringify!($ty)));
            }
            self.view.$reader(MemSize::from(field.offset))
        }
    };
}

impl<'m, 'a> FieldDecoder<'m, 'a> {
    fn lookup(&self, name: &str) -> MemoryResult<&'static FieldSpec> {
        self.spec.field(name).ok_or_else(|| {
            MemoryError::SchemaNotPod(format!("{}: no field named {}", self.spec.name, name))
        })
    }

    fn kind_mismatch(&self, field: &FieldSpec, requested: &str) -> MemoryError {
        MemoryError::SchemaNotPod(format!(
            "{}: field {} is declared {:?}, decoded as {}",
            self.spec.name, field.name, field.kind, requested
        ))
    }

    /// The absolute foreign address this record was read from
    pub fn record_addr(&self) -> Addr {
        self.view.base()
    }

    primitive_accessor!(u8, u8, FieldKind::U8, off_u8);
    primitive_accessor!(u16, u16, FieldKind::U16, off_u16);
    primitive_accessor!(u32, u32, FieldKind::U32, off_u32);
    primitive_accessor!(u64, u64, FieldKind::U64, off_u64);
    primitive_accessor!(i8, i8, FieldKind::I8, off_i8);
    primitive_accessor!(i16, i16, FieldKind::I16, off_i16);
    primitive_accessor!(i32, i32, FieldKind::I32, off_i32);
    primitive_accessor!(i64, i64, FieldKind::I64, off_i64);
    primitive_accessor!(f32, f32, FieldKind::F32, off_f32);
    primitive_accessor!(f64, f64, FieldKind::F64, off_f64);

    /// Decodes a fixed-width byte array as a C string: the logical value
    /// ends at the first `\0`, trailing bytes are dropped
    pub fn char_array(&self, name: &str) -> MemoryResult<String> {
        let field = self.lookup(name)?;
        if !matches!(field.kind, FieldKind::CharArray) {
            return Err(self.kind_mismatch(field, "char array"));
        }
        self.view
            .off_nts(MemSize::from(field.offset), MemSize::from(field.width))
    }

    /// Reads a `Pointer` field's address without dereferencing it
    pub fn pointer(&self, name: &str) -> MemoryResult<Addr> {
        let field = self.lookup(name)?;
        if !matches!(field.kind, FieldKind::Pointer) {
            return Err(self.kind_mismatch(field, "pointer"));
        }
        self.raw_pointer(field)
    }

    fn raw_pointer(&self, field: &FieldSpec) -> MemoryResult<Addr> {
        let offset = MemSize::from(field.offset);
        let value = match field.width {
            4 => self.view.off_u32(offset)? as u64,
            _ => self.view.off_u64(offset)?,
        };
        Ok(Addr::new(value))
    }

    /// Resolves a `ValidPointer` field: validates the address against the
    /// source and materialises the pointee.
    ///
    /// In lenient mode a null, invalid or unreadable pointee collapses to
    /// `None`; `required` nulls and `err_on_invalid` targets abort instead,
    /// as does any failure in strict mode.
    pub fn follow<T: Pod>(&mut self, name: &str) -> MemoryResult<Option<Box<T>>> {
        let field = self.lookup(name)?;
        let FieldKind::ValidPointer {
            pointee,
            required,
            err_on_invalid,
        } = field.kind
        else {
            return Err(self.kind_mismatch(field, "valid pointer"));
        };
        let declared = pointee();
        if declared.name != T::SPEC.name || declared.size != T::SPEC.size {
            return Err(MemoryError::SchemaNotPod(format!(
                "{}: field {} points at {}, decoded as {}",
                self.spec.name, field.name, declared.name, T::SPEC.name
            )));
        }

        let addr = self.raw_pointer(field)?;
        let fail_hard = self.mat.strict || err_on_invalid;

        if addr.is_null() {
            if required && self.mat.strict {
                return Err(MemoryError::NullPointer(field.name.to_string()));
            }
            return Ok(None);
        }
        if !self.mat.source.is_valid_address(addr) {
            if fail_hard {
                return Err(MemoryError::invalid_pointer(field.name, addr));
            }
            return Ok(None);
        }

        match self.mat.read::<T>(addr) {
            Ok(record) => Ok(Some(Box::new(record))),
            Err(err) if fail_hard => Err(err),
            Err(_) => Ok(None),
        }
    }

    /// Decodes an embedded record from the bytes already captured for this
    /// record
    pub fn inline<T: Pod>(&mut self, name: &str) -> MemoryResult<T> {
        let field = self.lookup(name)?;
        if !matches!(field.kind, FieldKind::Inline(_)) {
            return Err(self.kind_mismatch(field, "inline record"));
        }
        let window = self
            .view
            .off_blob(MemSize::from(field.offset), MemSize::from(field.width))?;
        self.mat.decode_unchecked(&window)
    }
}

/// Materialises a record at `addr` in lenient mode
pub fn read_pod<T: Pod>(source: &dyn MemoryRead, addr: Addr) -> MemoryResult<T> {
    Materializer::new(source).read(addr)
}

/// Materialises a record at `addr`, aborting on any pointer-validation
/// failure
pub fn read_pod_strict<T: Pod>(source: &dyn MemoryRead, addr: Addr) -> MemoryResult<T> {
    Materializer::new(source).strict().read(addr)
}

/// Materialises `count` consecutive records starting at `addr`
pub fn read_pod_slice<T: Pod>(
    source: &dyn MemoryRead,
    addr: Addr,
    count: usize,
) -> MemoryResult<Vec<T>> {
    Materializer::new(source).read_slice(addr, count)
}
