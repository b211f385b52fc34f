use crate::typing::ColumnDescriptor;
use dump_common::DumpOptions;

/// A single result-set cell in its raw textual/byte form, exactly as the
/// server's text protocol returned it (hex-projected columns arrive as
/// already hex-encoded ASCII, per §4.3 step 2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Null,
    Raw(Vec<u8>),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CellValue::Null => None,
            CellValue::Raw(b) => Some(b.as_slice()),
        }
    }
}

impl From<mysql::Value> for CellValue {
    fn from(value: mysql::Value) -> Self {
        use mysql::Value;
        match value {
            Value::NULL => CellValue::Null,
            Value::Bytes(b) => CellValue::Raw(b),
            Value::Int(i) => CellValue::Raw(i.to_string().into_bytes()),
            Value::UInt(u) => CellValue::Raw(u.to_string().into_bytes()),
            Value::Float(f) => CellValue::Raw(f.to_string().into_bytes()),
            Value::Double(d) => CellValue::Raw(d.to_string().into_bytes()),
            Value::Date(y, m, d, h, i, s, micro) => CellValue::Raw(
                format!(
                    "{y:04}-{m:02}-{d:02} {h:02}:{i:02}:{s:02}{}",
                    if micro > 0 {
                        format!(".{micro:06}")
                    } else {
                        String::new()
                    }
                )
                .into_bytes(),
            ),
            Value::Time(neg, days, h, i, s, micro) => {
                let total_hours = days as u64 * 24 + h as u64;
                let sign = if neg { "-" } else { "" };
                CellValue::Raw(
                    format!(
                        "{sign}{total_hours:02}:{i:02}:{s:02}{}",
                        if micro > 0 {
                            format!(".{micro:06}")
                        } else {
                            String::new()
                        }
                    )
                    .into_bytes(),
                )
            }
        }
    }
}

/// Encodes one cell to its SQL literal (§4.3). The hook (§4.7), if any,
/// has already run by the time this is called — encoding is always
/// driven by `descriptor`, never by whatever the hook handed back.
pub fn encode_cell(value: &CellValue, descriptor: &ColumnDescriptor, opts: &DumpOptions) -> String {
    let bytes = match value {
        CellValue::Null => return "NULL".to_string(),
        CellValue::Raw(b) => b,
    };

    if opts.hex_blob && descriptor.is_blob {
        if descriptor.type_keyword == "bit" || !bytes.is_empty() {
            let mut out = String::with_capacity(bytes.len() + 2);
            out.push_str("0x");
            out.push_str(&String::from_utf8_lossy(bytes));
            return out;
        }
        return "''".to_string();
    }

    if descriptor.is_numeric {
        return String::from_utf8_lossy(bytes).into_owned();
    }

    quote_string(bytes)
}

/// Escapes embedded quotes/backslashes the way the MySQL text protocol
/// requires for a single-quoted string literal under default `sql_mode`
/// (`NO_BACKSLASH_ESCAPES` is not assumed).
pub(crate) fn quote_string(bytes: &[u8]) -> String {
    // Escaped bytes are built up raw, not through `char`/`String::push` —
    // a byte >= 0x80 is a continuation byte of a multi-byte UTF-8
    // sequence, and `b as char` would reinterpret it as a lone Latin-1
    // codepoint, corrupting every non-ASCII value on re-encode.
    let mut out = Vec::with_capacity(bytes.len() + 2);
    out.push(b'\'');
    for &b in bytes {
        match b {
            b'\'' => out.extend_from_slice(b"\\'"),
            b'\\' => out.extend_from_slice(b"\\\\"),
            0 => out.extend_from_slice(b"\\0"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            0x1a => out.extend_from_slice(b"\\Z"),
            other => out.push(other),
        }
    }
    out.push(b'\'');
    String::from_utf8_lossy(&out).into_owned()
}
