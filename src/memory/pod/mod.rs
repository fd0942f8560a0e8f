//! Schema-driven materialisation of foreign records
//!
//! A record type describes its foreign layout once, as an explicit field
//! descriptor table ([`StructSpec`]); the materialiser walks the table
//! instead of introspecting a live type. Pointer-typed fields carry their
//! pointee's descriptor, so recursive following is table-driven and
//! terminates when a pointee has no further `ValidPointer` fields.

mod decode;

pub use decode::{
    read_pod, read_pod_slice, read_pod_strict, spec_of, FieldDecoder, Materializer, Pod,
};

use crate::core::types::{MemoryError, MemoryResult};

/// How one field of a foreign record is interpreted
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    /// Fixed-width byte array treated as a C string: the first `\0`
    /// terminates the logical value and trailing bytes are dropped
    CharArray,
    /// A foreign address that is held but never dereferenced
    Pointer,
    /// A pointer that is validated against the source and whose pointee is
    /// recursively materialised
    ValidPointer {
        pointee: fn() -> &'static StructSpec,
        /// A null value is an error instead of a cleared field
        required: bool,
        /// An invalid pointer aborts the record even in lenient mode
        err_on_invalid: bool,
    },
    /// A nested record embedded in-line; its bytes are part of this record
    Inline(fn() -> &'static StructSpec),
    /// Ignored entirely (padding, unknown tags)
    Skip,
}

/// One field of a record: name, byte offset, width and interpretation
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
    pub kind: FieldKind,
}

/// The foreign layout of a record type
#[derive(Debug)]
pub struct StructSpec {
    pub name: &'static str,
    pub size: usize,
    pub fields: &'static [FieldSpec],
}

impl StructSpec {
    /// Looks a field up by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

fn expected_width(kind: &FieldKind) -> Option<usize> {
    match kind {
        FieldKind::U8 | FieldKind::I8 => Some(1),
        FieldKind::U16 | FieldKind::I16 => Some(2),
        FieldKind::U32 | FieldKind::I32 | FieldKind::F32 => Some(4),
        FieldKind::U64 | FieldKind::I64 | FieldKind::F64 => Some(8),
        _ => None,
    }
}

fn check_spec(
    spec: &'static StructSpec,
    visited: &mut Vec<*const StructSpec>,
) -> MemoryResult<()> {
    let key = spec as *const StructSpec;
    if visited.contains(&key) {
        return Ok(());
    }
    visited.push(key);

    let fail = |msg: String| Err(MemoryError::SchemaNotPod(format!("{}: {}", spec.name, msg)));

    if spec.size == 0 {
        return fail("record size is zero".to_string());
    }

    for field in spec.fields {
        if let Some(expected) = expected_width(&field.kind) {
            if field.width != expected {
                return fail(format!(
                    "field {} declares width {} for a {}-byte primitive",
                    field.name, field.width, expected
                ));
            }
        }
        match &field.kind {
            FieldKind::CharArray if field.width == 0 => {
                return fail(format!("char array field {} has zero width", field.name));
            }
            FieldKind::Pointer if !matches!(field.width, 4 | 8) => {
                return fail(format!(
                    "pointer field {} must be 4 or 8 bytes, not {}",
                    field.name, field.width
                ));
            }
            FieldKind::ValidPointer { pointee, .. } => {
                if !matches!(field.width, 4 | 8) {
                    return fail(format!(
                        "pointer field {} must be 4 or 8 bytes, not {}",
                        field.name, field.width
                    ));
                }
                check_spec(pointee(), visited)?;
            }
            FieldKind::Inline(inner) => {
                let inner = inner();
                if field.width != inner.size {
                    return fail(format!(
                        "inline field {} declares width {} but {} is {} bytes",
                        field.name, field.width, inner.name, inner.size
                    ));
                }
                check_spec(inner, visited)?;
            }
            _ => {}
        }

        let end = field
            .offset
            .checked_add(field.width)
            .ok_or_else(|| MemoryError::SchemaNotPod(format!(
                "{}: field {} offset overflows",
                spec.name, field.name
            )))?;
        if end > spec.size {
            return fail(format!(
                "field {} [{}..{}] exceeds record size {}",
                field.name, field.offset, end, spec.size
            ));
        }
    }

    Ok(())
}

/// Verifies recursively that a schema describes plain-old-data.
///
/// Structural checks: primitive widths, pointer widths, inline sizes and
/// field bounds, applied to the whole pointee graph (cycle-safe).
/// Violations are programmer errors surfaced as `SchemaNotPod`.
pub fn ensure_pod(spec: &'static StructSpec) -> MemoryResult<()> {
    let mut visited = Vec::new();
    check_spec(spec, &mut visited)
}

#[cfg(test)]
mod tests {
    use super::*;

    static GOOD: StructSpec = StructSpec {
        name: "Good",
        size: 16,
        fields: &[
            FieldSpec {
                name: "id",
                offset: 0,
                width: 4,
                kind: FieldKind::I32,
            },
            FieldSpec {
                name: "label",
                offset: 4,
                width: 8,
                kind: FieldKind::CharArray,
            },
            FieldSpec {
                name: "raw",
                offset: 12,
                width: 4,
                kind: FieldKind::Skip,
            },
        ],
    };

    static BAD_WIDTH: StructSpec = StructSpec {
        name: "BadWidth",
        size: 8,
        fields: &[FieldSpec {
            name: "value",
            offset: 0,
            width: 2,
            kind: FieldKind::U32,
        }],
    };

    static OUT_OF_BOUNDS: StructSpec = StructSpec {
        name: "OutOfBounds",
        size: 4,
        fields: &[FieldSpec {
            name: "value",
            offset: 2,
            width: 4,
            kind: FieldKind::U32,
        }],
    };

    fn node_spec() -> &'static StructSpec {
        &NODE
    }

    // self-referential schema: a linked-list node
    static NODE: StructSpec = StructSpec {
        name: "Node",
        size: 16,
        fields: &[
            FieldSpec {
                name: "value",
                offset: 0,
                width: 8,
                kind: FieldKind::U64,
            },
            FieldSpec {
                name: "next",
                offset: 8,
                width: 8,
                kind: FieldKind::ValidPointer {
                    pointee: node_spec,
                    required: false,
                    err_on_invalid: false,
                },
            },
        ],
    };

    #[test]
    fn test_valid_schema() {
        assert!(ensure_pod(&GOOD).is_ok());
    }

    #[test]
    fn test_primitive_width_mismatch() {
        let err = ensure_pod(&BAD_WIDTH).unwrap_err();
        assert!(matches!(err, MemoryError::SchemaNotPod(msg) if msg.contains("value")));
    }

    #[test]
    fn test_field_out_of_bounds() {
        let err = ensure_pod(&OUT_OF_BOUNDS).unwrap_err();
        assert!(matches!(err, MemoryError::SchemaNotPod(msg) if msg.contains("exceeds")));
    }

    #[test]
    fn test_cyclic_schema_terminates() {
        assert!(ensure_pod(&NODE).is_ok());
    }

    #[test]
    fn test_field_lookup() {
        assert_eq!(GOOD.field("id").map(|f| f.offset), Some(0));
        assert!(GOOD.field("missing").is_none());
    }
}
