//! Recognizer patterns
//!
//! One compiled regex per source construct. All patterns are case-insensitive;
//! none of them depend on each other.

use regex::Regex;

use crate::error::Result;

/// Words that a COBOL verb recognizer may capture but that never name a file
const RESERVED_SUBJECTS: &[&str] = &[
    "FROM", "INTO", "FILE", "QUEUE", "DATASET", "NEXT", "RECORD", "SQL", "CICS",
    "END-EXEC", "TO", "AT", "END", "INVALID", "KEY", "WITH", "IS", "BY", "USING",
    "OF", "IN", "SET", "WHERE", "VALUES", "TABLE",
];

/// Compiled recognizers for every supported construct
#[derive(Debug)]
pub struct Recognizers {
    pub(crate) file_assign: Regex,
    pub(crate) fd: Regex,
    pub(crate) read: Regex,
    pub(crate) write: Regex,
    pub(crate) rewrite: Regex,
    pub(crate) delete: Regex,
    pub(crate) sql_block: Regex,
    pub(crate) sql_verb: Regex,
    pub(crate) sql_table: Regex,
    pub(crate) sql_update_target: Regex,
    pub(crate) copy: Regex,
    pub(crate) cics: Regex,
    pub(crate) mq_call: Regex,
    pub(crate) xml_generate: Regex,
    pub(crate) xml_parse: Regex,
    pub(crate) logical_binding: Regex,
    pub(crate) jcl_dd: Regex,
}

impl Recognizers {
    pub fn new() -> Result<Self> {
        Ok(Self {
            file_assign: Regex::new(r"(?i)\bSELECT\s+(\S+)\s+ASSIGN\b")?,
            fd: Regex::new(r"(?i)\bFD\s+(\S+)")?,
            read: Regex::new(&verb_pattern("READ"))?,
            write: Regex::new(&verb_pattern("WRITE"))?,
            rewrite: Regex::new(&verb_pattern("REWRITE"))?,
            delete: Regex::new(&verb_pattern("DELETE"))?,
            sql_block: Regex::new(r"(?is)EXEC\s+SQL(.*?)END-EXEC")?,
            sql_verb: Regex::new(r"(?i)\b(SELECT|INSERT|UPDATE|DELETE)\b")?,
            sql_table: Regex::new(r#"(?i)\bFROM\s+([A-Z0-9_."]+)|\bINTO\s+([A-Z0-9_."]+)"#)?,
            sql_update_target: Regex::new(r#"(?i)\bUPDATE\s+([A-Z0-9_."]+)\s+SET\b"#)?,
            copy: Regex::new(r#"(?i)\bCOPY\s+["']?([A-Z0-9_.\-/]+)["']?"#)?,
            cics: Regex::new(
                r#"(?i)EXEC\s+CICS\s+(READ|REWRITE|WRITE|DELETE)\s+(FILE|DATASET|QUEUE)\s*\(\s*([\w\-.'"]+)\s*\)"#,
            )?,
            mq_call: Regex::new(r#"(?i)CALL\s+["']MQ(PUT|GET|OPEN|CLOSE)["']"#)?,
            xml_generate: Regex::new(r"(?i)\bXML\s+GENERATE\s+([A-Z0-9\-]+)")?,
            xml_parse: Regex::new(r"(?i)\bXML\s+PARSE\s+([A-Z0-9\-]+)")?,
            logical_binding: Regex::new(r#"(?i)\bSELECT\s+(\S+)\s+ASSIGN\s+TO\s+([A-Z0-9_\-'"]+)"#)?,
            jcl_dd: Regex::new(r"(?im)^\s*//(\S*)\s+DD\s+(?:[^\n]*?,)?DSN(?:AME)?=([^,\s]+)")?,
        })
    }
}

/// `VERB operand`, but not inside a hyphenated word such as the `END-READ`
/// scope terminator. The leading boundary is consumed, so the operand is group 1.
pub(crate) fn verb_pattern(verb: &str) -> String {
    format!(r"(?i)(?:^|[^\w-]){}\s+(\S+)", verb)
}

/// Trim whitespace, surrounding quotes and statement punctuation, then upper-case
pub fn normalize_subject(raw: &str) -> Option<String> {
    let trimmed = raw
        .trim()
        .trim_matches(|c: char| matches!(c, '.' | ',' | ';' | '"' | '\''))
        .trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

/// Normalize a subject captured by a COBOL verb, dropping reserved words and
/// parenthesized fragments such as `FILE('ACCT')`
pub fn normalize_file_subject(raw: &str) -> Option<String> {
    let subject = normalize_subject(raw)?;
    if subject.contains('(') || subject.contains(')') {
        return None;
    }
    if RESERVED_SUBJECTS.contains(&subject.as_str()) {
        return None;
    }
    Some(subject)
}

/// Normalize an SQL table reference; embedded identifier quotes are removed
pub fn normalize_table(raw: &str) -> Option<String> {
    let unquoted = raw.replace(['\n', '\r'], " ").replace('"', "");
    normalize_subject(&unquoted)
}

/// Split a `COPY` operand into its logical name (no extension) and physical
/// name (`.CPY` appended unless it already ends in `.CPY`/`.COPYBOOK`).
///
/// The logical name stops at the first dot, so a dotted member name keeps only
/// its first segment.
pub fn copy_names(raw: &str) -> Option<(String, String)> {
    let name = raw
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'')
        .trim_end_matches('.');
    let base = name.rsplit('/').next().unwrap_or(name).to_uppercase();
    let logical = base.split('.').next().unwrap_or("").to_string();
    if logical.is_empty() {
        return None;
    }
    let physical = if base.ends_with(".CPY") || base.ends_with(".COPYBOOK") {
        base
    } else {
        format!("{}.CPY", base)
    };
    Some((logical, physical))
}
