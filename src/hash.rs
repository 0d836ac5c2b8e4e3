// Content hashing for change detection
//
// Profiles are compared by the SHA-256 of a canonical JSON rendering, so two
// documents that differ only in key order hash identically.

use crate::store::{Profile, METADATA_KEYS};
use serde_json::{Number, Value};
use sha2::{Digest, Sha256};
use std::fmt;

/// 256-bit content hash of a canonicalized profile
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.to_hex())
    }
}

/// Hash the full document, engine metadata included.
pub fn digest(profile: &Profile) -> ContentHash {
    let canonical = canonical_json(profile);
    ContentHash(Sha256::digest(canonical.as_bytes()).into())
}

/// Hash the caller-owned body only (`last_sync`, `sync_hash` and
/// `last_cloud_sync` removed). Replica equality is decided on this.
pub fn body_digest(profile: &Profile) -> ContentHash {
    if !METADATA_KEYS.iter().any(|k| profile.contains_key(*k)) {
        return digest(profile);
    }
    let mut body = profile.clone();
    for key in METADATA_KEYS {
        body.remove(key);
    }
    digest(&body)
}

/// Render a profile in canonical form.
///
/// Keys are sorted at every nesting level, items are separated by `", "`,
/// keys from values by `": "`, and every character outside printable ASCII
/// is written as a `\uXXXX` escape. Floats use the shortest round-trip
/// digits, switching to exponent form (`1e+20`, `1e-05`) below `1e-4` and
/// from `1e16` up. Existing `sync_hash` values were computed over this
/// layout, except for integers too large for 64 bits, which are read back
/// as floats.
pub fn canonical_json(profile: &Profile) -> String {
    let mut out = String::with_capacity(256);
    write_object(&mut out, profile);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => write_object(out, map),
    }
}

fn write_object(out: &mut String, map: &Profile) {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();

    out.push('{');
    for (i, key) in keys.into_iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_string(out, key);
        out.push_str(": ");
        write_value(out, &map[key]);
    }
    out.push('}');
}

fn write_number(out: &mut String, n: &Number) {
    match n.as_f64() {
        Some(f) if n.is_f64() => write_float(out, f),
        _ => out.push_str(&n.to_string()),
    }
}

fn write_float(out: &mut String, f: f64) {
    // `{:e}` yields the shortest round-trip digits, e.g. `-1.25e-7`
    let sci = format!("{:e}", f);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();

    out.push_str(sign);
    if (-4..16).contains(&exp) {
        if exp < 0 {
            out.push_str("0.");
            out.extend(std::iter::repeat('0').take((-exp - 1) as usize));
            out.push_str(&digits);
        } else {
            let point = exp as usize + 1;
            if digits.len() <= point {
                out.push_str(&digits);
                out.extend(std::iter::repeat('0').take(point - digits.len()));
                out.push_str(".0");
            } else {
                out.push_str(&digits[..point]);
                out.push('.');
                out.push_str(&digits[point..]);
            }
        }
    } else {
        out.push_str(&digits[..1]);
        if digits.len() > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        let exp_sign = if exp < 0 { '-' } else { '+' };
        out.push_str(&format!("e{}{:02}", exp_sign, exp.abs()));
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            ' '..='~' => out.push(c),
            _ => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{:04x}", unit));
                }
            }
        }
    }
    out.push('"');
}
