//! Text emission: the accessor header and the mini-table source file.
//!
//! Both emitters are pure functions over a [`FileLayout`]; they carry no
//! state of their own and their output is deterministic (messages and enums
//! by fully-qualified name, fields by number, extensions by fully-qualified
//! name).

mod header;
mod source;

#[cfg(test)]
mod emit_tests;

pub use header::header_text;
pub use source::source_text;

use mintab_schema::{ByPlatform, DefaultValue, FieldDef, FieldType};

use crate::file_layout::ExtensionInfo;
use crate::names;

/// Render a per-platform value, collapsing when both sides agree.
pub(crate) fn size_pair(v: ByPlatform<u16>) -> String {
    if v.p32 == v.p64 {
        v.p32.to_string()
    } else {
        format!("UPB_SIZE({}, {})", v.p32, v.p64)
    }
}

pub(crate) fn int_pair(p32: i16, p64: i16) -> String {
    if p32 == p64 {
        p32.to_string()
    } else {
        format!("UPB_SIZE({p32}, {p64})")
    }
}

/// The C-side view of a field's value type: raw proto type, default, and
/// (for message fields) the resolved target.
pub(crate) struct TypeRef<'a> {
    pub field_type: FieldType,
    pub default: Option<&'a DefaultValue>,
    /// `(target fully-qualified name, defined in another file)`.
    pub target: Option<(String, bool)>,
}

impl<'a> TypeRef<'a> {
    pub fn of_field(field: &'a FieldDef, file_name: &str) -> Self {
        let target = field.sub().map(|def| {
            (def.full_name().to_owned(), def.file() != file_name)
        });
        Self {
            field_type: field.field_type(),
            default: field.default(),
            target,
        }
    }

    pub fn of_extension(ext: &'a ExtensionInfo, file_name: &str) -> Self {
        let target = ext
            .target
            .as_ref()
            .map(|def| (def.full_name().to_owned(), def.file() != file_name));
        Self {
            field_type: ext.descriptor.field_type,
            default: ext.descriptor.default.as_ref(),
            target,
        }
    }
}

/// C type of a single value of this field.
pub(crate) fn ctype(r: &TypeRef<'_>, is_const: bool) -> String {
    let maybe_const = if is_const { "const " } else { "" };
    match r.field_type {
        FieldType::Message | FieldType::Group => {
            let (fqname, cross_file) = r
                .target
                .as_ref()
                .expect("sub-message fields are linked after commit");
            let maybe_struct = if *cross_file { "struct " } else { "" };
            format!("{maybe_const}{maybe_struct}{}*", names::message_name(fqname))
        }
        FieldType::Bool => "bool".to_owned(),
        FieldType::Float => "float".to_owned(),
        FieldType::Double => "double".to_owned(),
        FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32 | FieldType::Enum => {
            "int32_t".to_owned()
        }
        FieldType::UInt32 | FieldType::Fixed32 => "uint32_t".to_owned(),
        FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64 => "int64_t".to_owned(),
        FieldType::UInt64 | FieldType::Fixed64 => "uint64_t".to_owned(),
        FieldType::String | FieldType::Bytes => "upb_StringView".to_owned(),
    }
}

/// Element size as a log-2 initializer, for array resize/append.
pub(crate) fn size_lg2(r: &TypeRef<'_>) -> &'static str {
    match r.field_type {
        FieldType::Message | FieldType::Group => "UPB_SIZE(2, 3)",
        FieldType::String | FieldType::Bytes => "UPB_SIZE(3, 4)",
        FieldType::Bool => "1",
        FieldType::Double
        | FieldType::Int64
        | FieldType::UInt64
        | FieldType::SInt64
        | FieldType::Fixed64
        | FieldType::SFixed64 => "3",
        _ => "2",
    }
}

fn float_literal(value: f32) -> String {
    if value == f32::INFINITY {
        "kUpb_FltInfinity".to_owned()
    } else if value == f32::NEG_INFINITY {
        "-kUpb_FltInfinity".to_owned()
    } else {
        format!("{value}")
    }
}

fn double_literal(value: f64) -> String {
    if value == f64::INFINITY {
        "kUpb_Infinity".to_owned()
    } else if value == f64::NEG_INFINITY {
        "-kUpb_Infinity".to_owned()
    } else {
        format!("{value}")
    }
}

/// Escape bytes into a C string literal body.
pub(crate) fn c_escape(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\{:03o}", b)),
        }
    }
    out
}

/// C initializer for the field's default value.
pub(crate) fn default_literal(r: &TypeRef<'_>) -> String {
    match r.field_type {
        FieldType::Message | FieldType::Group => "NULL".to_owned(),
        FieldType::String | FieldType::Bytes => {
            let bytes: &[u8] = match r.default {
                Some(DefaultValue::String(s)) => s.as_bytes(),
                Some(DefaultValue::Bytes(b)) => b,
                _ => &[],
            };
            format!("upb_StringView_FromString(\"{}\")", c_escape(bytes))
        }
        FieldType::Bool => match r.default {
            Some(DefaultValue::Bool(true)) => "true".to_owned(),
            _ => "false".to_owned(),
        },
        FieldType::Float => {
            let v = match r.default {
                Some(DefaultValue::Float(v)) => *v,
                _ => 0.0,
            };
            float_literal(v)
        }
        FieldType::Double => {
            let v = match r.default {
                Some(DefaultValue::Double(v)) => *v,
                _ => 0.0,
            };
            double_literal(v)
        }
        FieldType::Enum => {
            let v = match r.default {
                Some(DefaultValue::Enum(v)) => *v,
                _ => 0,
            };
            // A number rather than a symbol, so the enum's header need not
            // be included.
            format!("{v}")
        }
        FieldType::Int32 | FieldType::SInt32 | FieldType::SFixed32 => {
            let v = match r.default {
                Some(DefaultValue::Int32(v)) => *v,
                _ => 0,
            };
            format!("_upb_Int32_FromI({v})")
        }
        FieldType::Int64 | FieldType::SInt64 | FieldType::SFixed64 => {
            let v = match r.default {
                Some(DefaultValue::Int64(v)) => *v,
                _ => 0,
            };
            format!("_upb_Int64_FromLL({v}ll)")
        }
        FieldType::UInt32 | FieldType::Fixed32 => {
            let v = match r.default {
                Some(DefaultValue::UInt32(v)) => *v,
                _ => 0,
            };
            format!("_upb_UInt32_FromU({v}u)")
        }
        FieldType::UInt64 | FieldType::Fixed64 => {
            let v = match r.default {
                Some(DefaultValue::UInt64(v)) => *v,
                _ => 0,
            };
            format!("_upb_UInt64_FromULL({v}ull)")
        }
    }
}

/// Whether the default differs from the zero value (which decides whether
/// getters must consult the hazzer).
pub(crate) fn has_nonzero_default(r: &TypeRef<'_>) -> bool {
    match r.default {
        None => false,
        Some(DefaultValue::Bool(v)) => *v,
        Some(DefaultValue::Int32(v)) => *v != 0,
        Some(DefaultValue::Int64(v)) => *v != 0,
        Some(DefaultValue::UInt32(v)) => *v != 0,
        Some(DefaultValue::UInt64(v)) => *v != 0,
        Some(DefaultValue::Float(v)) => *v != 0.0,
        Some(DefaultValue::Double(v)) => *v != 0.0,
        Some(DefaultValue::String(v)) => !v.is_empty(),
        Some(DefaultValue::Bytes(v)) => !v.is_empty(),
        Some(DefaultValue::Enum(v)) => *v != 0,
    }
}

/// Leading comment on both generated files.
pub(crate) fn file_warning(file_name: &str, out: &mut String) {
    out.push_str(&format!(
        "/* This file was generated by the mintab compiler from the input\n \
         * file:\n \
         *\n \
         *     {file_name}\n \
         *\n \
         * Do not edit -- your changes will be discarded when the file is\n \
         * regenerated. */\n\n"
    ));
}
