//! Class-file constant pool rewriting
//!
//! Only `CONSTANT_Utf8` entries are touched. Every symbolic reference in a
//! class (class names, descriptors, signatures, string literals) bottoms out
//! in one of them, and rewriting never changes the number of pool slots, so
//! the rest of the file is copied verbatim.

use crate::error::{BuildError, BuildResult};

const MAGIC: u32 = 0xCAFE_BABE;

const TAG_UTF8: u8 = 1;
const TAG_INTEGER: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_LONG: u8 = 5;
const TAG_DOUBLE: u8 = 6;
const TAG_CLASS: u8 = 7;
const TAG_STRING: u8 = 8;
const TAG_FIELDREF: u8 = 9;
const TAG_METHODREF: u8 = 10;
const TAG_INTERFACE_METHODREF: u8 = 11;
const TAG_NAME_AND_TYPE: u8 = 12;
const TAG_METHOD_HANDLE: u8 = 15;
const TAG_METHOD_TYPE: u8 = 16;
const TAG_DYNAMIC: u8 = 17;
const TAG_INVOKE_DYNAMIC: u8 = 18;
const TAG_MODULE: u8 = 19;
const TAG_PACKAGE: u8 = 20;

/// Whether `bytes` starts with the class-file magic number
pub fn is_class_file(bytes: &[u8]) -> bool {
    read_u32(bytes, 0) == Some(MAGIC)
}

/// Rewrite every Utf8 constant through `rewrite`
///
/// `rewrite` returns `None` to keep an entry unchanged. Returns `None` when
/// nothing changed.
pub fn rewrite_utf8_constants<F>(path: &str, bytes: &[u8], rewrite: F) -> BuildResult<Option<Vec<u8>>>
where
    F: Fn(&[u8]) -> Option<Vec<u8>>,
{
    let malformed = |reason: &str| BuildError::ClassFormat {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    if !is_class_file(bytes) {
        return Err(malformed("missing magic number"));
    }

    // magic(4) minor(2) major(2) constant_pool_count(2)
    let count = read_u16(bytes, 8).ok_or_else(|| malformed("truncated header"))?;
    let mut output: Option<Vec<u8>> = None;
    let mut copied_to = 0usize;
    let mut offset = 10usize;
    let mut index = 1u16;

    while index < count {
        let tag = *bytes
            .get(offset)
            .ok_or_else(|| malformed("truncated constant pool"))?;

        let (size, slots) = match tag {
            TAG_UTF8 => {
                let length = read_u16(bytes, offset + 1)
                    .ok_or_else(|| malformed("truncated utf8 constant"))?
                    as usize;
                let start = offset + 3;
                let value = bytes
                    .get(start..start + length)
                    .ok_or_else(|| malformed("truncated utf8 constant"))?;

                if let Some(rewritten) = rewrite(value) {
                    let new_length = u16::try_from(rewritten.len())
                        .map_err(|_| malformed("relocated constant exceeds 65535 bytes"))?;
                    let out = output.get_or_insert_with(|| Vec::with_capacity(bytes.len() + 64));
                    out.extend_from_slice(&bytes[copied_to..offset]);
                    out.push(TAG_UTF8);
                    out.extend_from_slice(&new_length.to_be_bytes());
                    out.extend_from_slice(&rewritten);
                    copied_to = start + length;
                }
                (3 + length, 1)
            }
            TAG_INTEGER | TAG_FLOAT => (5, 1),
            TAG_LONG | TAG_DOUBLE => (9, 2),
            TAG_CLASS | TAG_STRING | TAG_METHOD_TYPE | TAG_MODULE | TAG_PACKAGE => (3, 1),
            TAG_FIELDREF | TAG_METHODREF | TAG_INTERFACE_METHODREF | TAG_NAME_AND_TYPE
            | TAG_DYNAMIC | TAG_INVOKE_DYNAMIC => (5, 1),
            TAG_METHOD_HANDLE => (4, 1),
            other => return Err(malformed(&format!("unknown constant pool tag {}", other))),
        };

        if offset + size > bytes.len() {
            return Err(malformed("truncated constant pool"));
        }
        offset += size;
        index = index.saturating_add(slots);
    }

    Ok(output.map(|mut out| {
        out.extend_from_slice(&bytes[copied_to..]);
        out
    }))
}

/// Read the Utf8 constants of a class file (used by tests and diagnostics)
pub fn utf8_constants(path: &str, bytes: &[u8]) -> BuildResult<Vec<String>> {
    let collected = std::cell::RefCell::new(Vec::new());
    rewrite_utf8_constants(path, bytes, |value| {
        collected
            .borrow_mut()
            .push(String::from_utf8_lossy(value).into_owned());
        None
    })?;
    Ok(collected.into_inner())
}

fn read_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    let slice = bytes.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([slice[0], slice[1]]))
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let slice = bytes.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
}
