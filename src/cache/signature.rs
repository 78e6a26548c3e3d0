//! Structural signatures
//!
//! A signature captures only the field-name shape of a call's arguments:
//! object key names are concatenated recursively, arrays are descended, and
//! leaf values are omitted entirely. Two calls with the same shape but
//! different data produce the same signature. The accumulated shape string
//! is condensed to a fixed-width digest for use as a cache key.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Computes the structural signature of an argument list.
pub fn structural_signature(args: &[Value]) -> String {
    let mut shape = String::new();
    for arg in args {
        walk(arg, &mut shape);
        shape.push('|');
    }

    let digest = Sha256::digest(shape.as_bytes());
    hex_encode(&digest)
}

fn walk(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            out.push('{');
            for (key, child) in map {
                out.push_str(key);
                out.push(':');
                walk(child, out);
                out.push(',');
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for item in items {
                walk(item, out);
                out.push(',');
            }
            out.push(']');
        }
        // Leaf values contribute nothing: the signature depends on shape,
        // never on data.
        _ => {}
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}
