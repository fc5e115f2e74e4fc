//! C identifier helpers for emitted code.

/// Turn a fully-qualified proto name or file path into a C identifier.
///
/// # Examples
/// ```
/// use mintab_core::ident::to_c_ident;
/// assert_eq!(to_c_ident("pkg.Outer.Inner"), "pkg_Outer_Inner");
/// assert_eq!(to_c_ident("google/protobuf/descriptor.proto"), "google_protobuf_descriptor_proto");
/// ```
pub fn to_c_ident(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Turn a file name into a preprocessor guard fragment.
///
/// # Examples
/// ```
/// use mintab_core::ident::to_preproc;
/// assert_eq!(to_preproc("pkg/api.proto"), "PKG_API_PROTO");
/// ```
pub fn to_preproc(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Strip the final extension from a file name, if any.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) => &name[..idx],
        None => name,
    }
}
