//! Short type names for diagnostics

/// Strip module paths from a Rust type name.
///
/// Examples:
/// - `e5e_core::protocol::Event` -> `Event`
/// - `alloc::vec::Vec<i32>` -> `Vec<i32>`
/// - `core::option::Option<alloc::string::String>` -> `Option<String>`
pub fn short_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    // Start of the path segment currently being copied
    let mut segment_start = 0;

    let mut chars = full_name.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            result.truncate(segment_start);
            continue;
        }

        result.push(c);
        if !(c.is_alphanumeric() || c == '_') {
            segment_start = result.len();
        }
    }

    result
}

/// Short name of `T`, as shown in decode errors.
pub fn type_name_of<T: ?Sized>() -> String {
    short_type_name(std::any::type_name::<T>())
}
