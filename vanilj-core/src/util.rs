//! Identifier helpers.

use uuid::Uuid;

/// A random (version 4) UUID in hyphenated form.
pub fn generate_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// The first eight characters of a fresh UUID.
pub fn generate_short_uuid() -> String {
    let mut id = generate_uuid();
    id.truncate(8);
    id
}
