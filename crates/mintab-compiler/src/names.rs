//! Symbol naming for emitted C code.

use mintab_core::ident::{strip_extension, to_c_ident};

/// C type name for a message: `pkg.Outer.Inner` -> `pkg_Outer_Inner`.
pub fn message_name(fqname: &str) -> String {
    to_c_ident(fqname)
}

/// Name of a message's mini-table symbol.
pub fn message_init(fqname: &str) -> String {
    format!("{}_msg_init", to_c_ident(fqname))
}

/// Name of an enum's mini-table symbol.
pub fn enum_init(fqname: &str) -> String {
    format!("{}_enum_init", to_c_ident(fqname))
}

/// Generated header name for an imported file.
pub fn header_filename(file_name: &str) -> String {
    format!("{}.upb.h", strip_extension(file_name))
}

/// Name of the file-level aggregate table.
pub fn file_layout_name(file_name: &str) -> String {
    format!("{}_upb_file_layout", to_c_ident(file_name))
}

/// Symbol for an enum value. Enum values scope to the enum's parent, so the
/// enum's own name does not appear:
/// `pkg.Color` / `RED` -> `pkg_RED`.
pub fn enum_value_symbol(enum_fqname: &str, value_name: &str) -> String {
    match enum_fqname.rfind('.') {
        Some(i) => to_c_ident(&format!("{}.{}", &enum_fqname[..i], value_name)),
        None => to_c_ident(value_name),
    }
}

/// Name of an extension's record symbol.
pub fn extension_layout(ident_base: &str, ext_name: &str) -> String {
    format!("{ident_base}_{ext_name}_ext")
}
