//! Reading a model's field mapping table.
//!
//! Generated models translate between frontend property paths and legacy
//! backend field names with an object literal:
//!
//! ```ts
//! fieldMappingKeys = {
//!     'cliente.id': 'ClienteId',
//!     'cliente.name': 'ClienteNome',
//!     razaoSocial: 'RazaoSocial',
//! };
//! ```

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

// SAFETY: These regexes are compile-time constants and are validated by tests.
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"fieldMappingKeys\s*(?::[^=\n]+)?=\s*\{").expect("static regex must compile")
});
static PAIR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"]?([\w.\[\]]+)['"]?\s*:\s*['"](.+?)['"]"#).expect("static regex must compile")
});

/// Byte span of the mapping table's braces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingBlock {
    /// Offset of the opening `{`.
    pub open: usize,
    /// Offset of the matching `}`.
    pub close: usize,
}

impl MappingBlock {
    pub fn body<'s>(&self, source: &'s str) -> &'s str {
        &source[self.open + 1..self.close]
    }

    /// Zero-based line of the opening brace.
    pub fn header_line(&self, source: &str) -> usize {
        line_of(source, self.open)
    }

    /// Zero-based line of the closing brace.
    pub fn closing_line(&self, source: &str) -> usize {
        line_of(source, self.close)
    }
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].bytes().filter(|&b| b == b'\n').count()
}

/// One `frontend: 'Legacy'` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub frontend: String,
    pub legacy: String,
}

/// Locates the `fieldMappingKeys = { … }` table.
///
/// Braces inside string literals and line comments are ignored. Returns
/// `None` when there is no table or it is never closed.
pub fn find_mapping_block(source: &str) -> Option<MappingBlock> {
    let header = HEADER_RE.find(source)?;
    let open = header.end() - 1;
    let close = matching_brace(source, open)?;
    Some(MappingBlock { open, close })
}

fn matching_brace(source: &str, open: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None => match b {
                b'\'' | b'"' | b'`' => quote = Some(b),
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    while i < bytes.len() && bytes[i] != b'\n' {
                        i += 1;
                    }
                    continue;
                }
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// Ordered pairs of the mapping table; empty when there is none.
pub fn parse_mapping_pairs(source: &str) -> Vec<FieldMapping> {
    let Some(block) = find_mapping_block(source) else {
        return Vec::new();
    };
    PAIR_RE
        .captures_iter(block.body(source))
        .map(|caps| FieldMapping {
            frontend: caps[1].to_string(),
            legacy: caps[2].to_string(),
        })
        .collect()
}

/// Legacy field name → frontend property path.
///
/// When two frontend paths map the same legacy name the later one wins.
///
/// # Examples
///
/// ```
/// use formsync_reconcile::parse_field_mappings;
///
/// let model = "export class Conta {\n  fieldMappingKeys = {\n    'cliente.name': 'ClienteNome',\n    email: \"Email\",\n  };\n}";
/// let map = parse_field_mappings(model);
/// assert_eq!(map["ClienteNome"], "cliente.name");
/// assert_eq!(map["Email"], "email");
/// ```
pub fn parse_field_mappings(source: &str) -> BTreeMap<String, String> {
    parse_mapping_pairs(source)
        .into_iter()
        .map(|m| (m.legacy, m.frontend))
        .collect()
}
