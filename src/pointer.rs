//! JSON Pointer and URI-fragment helpers.
//!
//! Schema locations are `<document>#<pointer>` with the pointer percent-encoded
//! the way a URI fragment has to be. Instance locations are `#<pointer>` and are
//! never percent-encoded, matching what validators print.

/// Escape one reference token (`~` → `~0`, `/` → `~1`).
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

pub fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Split a JSON pointer into unescaped reference tokens. `""` is the root.
pub fn segments(pointer: &str) -> Vec<String> {
    if pointer.is_empty() {
        return Vec::new();
    }
    pointer
        .strip_prefix('/')
        .unwrap_or(pointer)
        .split('/')
        .map(unescape_token)
        .collect()
}

pub fn append(location: &str, token: &str) -> String {
    format!("{location}/{}", escape_token(token))
}

pub fn append_index(location: &str, index: usize) -> String {
    format!("{location}/{index}")
}

// ------------------------------ Fragments --------------------------------- //

fn is_fragment_safe(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'-' | b'.' | b'_' | b'~' | b'!' | b'$' | b'&' | b'\'' | b'(' | b')' | b'*' | b'+'
                | b',' | b';' | b'=' | b':' | b'@' | b'/' | b'?'
        )
}

/// Percent-encode a JSON pointer for use as a URI fragment.
pub fn encode_fragment(pointer: &str) -> String {
    let mut out = String::with_capacity(pointer.len());
    for b in pointer.bytes() {
        if is_fragment_safe(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

/// Decode `%XX` escapes. Returns `None` for truncated escapes or invalid UTF-8.
pub fn decode_fragment(fragment: &str) -> Option<String> {
    let bytes = fragment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = fragment.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Join a document URI and an (unencoded) pointer into a schema location.
pub fn schema_location(document: &str, pointer: &str) -> String {
    format!("{document}#{}", encode_fragment(pointer))
}

/// Split a schema location into its document URI and decoded pointer.
pub fn split_location(location: &str) -> Option<(&str, String)> {
    match location.split_once('#') {
        Some((document, fragment)) => Some((document, decode_fragment(fragment)?)),
        None => Some((location, String::new())),
    }
}

/// Re-encode a schema location so differently-escaped spellings compare equal.
pub fn canonical_location(location: &str) -> String {
    match split_location(location) {
        Some((document, pointer)) => schema_location(document, &pointer),
        None => location.to_string(),
    }
}

/// Last reference token of a location, unescaped.
pub fn last_token(location: &str) -> Option<String> {
    let (_, tail) = location.rsplit_once('/')?;
    Some(unescape_token(tail))
}
