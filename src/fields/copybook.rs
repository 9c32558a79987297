//! Copybook field declarations
//!
//! Parses lines shaped like `05  ACCT-BAL  PIC S9(7)V99 VALUE ZERO.` into
//! [`FieldRecord`]s. Each field remembers the nearest preceding `01` record so
//! whole-record `WRITE`/`REWRITE` statements can be attributed to its fields.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One declared data item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub name: String,
    pub level: u8,
    pub pic: String,
    pub value: String,
    #[serde(rename = "static")]
    pub is_static: bool,
    /// Owning `01` record, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<String>,
}

/// Fields declared across one or more copybooks, first declaration wins
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopybookLayout {
    pub record_names: BTreeSet<String>,
    pub fields: BTreeMap<String, FieldRecord>,
}

impl CopybookLayout {
    /// Add another copybook's declarations without overwriting known names
    pub fn merge(&mut self, other: CopybookLayout) {
        self.record_names.extend(other.record_names);
        for (name, field) in other.fields {
            self.fields.entry(name).or_insert(field);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Names of fields owned by a record (including the record item itself)
    pub fn fields_of_record<'a>(&'a self, record: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        self.fields
            .values()
            .filter(move |f| f.record.as_deref() == Some(record))
            .map(|f| &f.name)
    }

    /// Fields with a `VALUE` clause
    pub fn static_fields(&self) -> BTreeSet<String> {
        self.fields
            .values()
            .filter(|f| f.is_static)
            .map(|f| f.name.clone())
            .collect()
    }
}

/// Declaration parser
#[derive(Debug)]
pub struct CopybookParser {
    declaration: Regex,
}

impl CopybookParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            declaration: Regex::new(
                r"(?i)^(?:\d{6})?\s*(\d{2})\s+([A-Z0-9\-]+)(?:\s+PIC(?:TURE)?\s+([\w()\.\-]+))?(?:\s+VALUE\s+([^.\n]+))?",
            )?,
        })
    }

    /// Parse every declaration line of one copybook
    pub fn parse(&self, text: &str) -> CopybookLayout {
        let mut layout = CopybookLayout::default();
        let mut current_record: Option<String> = None;

        for line in text.lines() {
            let Some(caps) = self.declaration.captures(line) else {
                continue;
            };
            let Ok(level) = caps[1].parse::<u8>() else {
                continue;
            };
            let name = caps[2].to_uppercase();

            match level {
                1 => {
                    layout.record_names.insert(name.clone());
                    current_record = Some(name.clone());
                }
                77 => current_record = None,
                _ => {}
            }

            if name == "FILLER" {
                continue;
            }

            let pic = caps
                .get(3)
                .map(|m| m.as_str().trim_end_matches('.').to_uppercase())
                .unwrap_or_default();
            let value = caps
                .get(4)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();

            let field = FieldRecord {
                name: name.clone(),
                level,
                pic,
                is_static: !value.is_empty(),
                value,
                record: if level == 77 { None } else { current_record.clone() },
            };
            layout.fields.entry(name).or_insert(field);
        }

        layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCTREC: &str = "\
       01  ACCT-REC.
           05  ACCT-ID          PIC X(10).
           05  ACCT-BAL         PIC S9(7)V99 COMP-3.
           05  ACCT-STATUS      PIC X VALUE 'A'.
               88  ACCT-ACTIVE  VALUE 'A'.
           05  FILLER           PIC X(5).
       77  WS-COUNTER           PIC 9(4) VALUE ZERO.
";

    fn parser() -> CopybookParser {
        CopybookParser::new().unwrap()
    }

    #[test]
    fn test_parse_declarations() {
        let layout = parser().parse(ACCTREC);
        assert_eq!(layout.record_names.iter().collect::<Vec<_>>(), vec!["ACCT-REC"]);
        assert_eq!(layout.fields.len(), 6);

        let bal = &layout.fields["ACCT-BAL"];
        assert_eq!(bal.level, 5);
        assert_eq!(bal.pic, "S9(7)V99");
        assert!(!bal.is_static);
        assert_eq!(bal.record.as_deref(), Some("ACCT-REC"));

        let status = &layout.fields["ACCT-STATUS"];
        assert_eq!(status.pic, "X");
        assert_eq!(status.value, "'A'");
        assert!(status.is_static);
    }

    #[test]
    fn test_filler_is_not_a_field() {
        let layout = parser().parse(ACCTREC);
        assert!(!layout.contains("FILLER"));
    }

    #[test]
    fn test_level_77_has_no_record() {
        let layout = parser().parse(ACCTREC);
        let counter = &layout.fields["WS-COUNTER"];
        assert_eq!(counter.record, None);
        assert!(counter.is_static);
    }

    #[test]
    fn test_trailing_period_removed_from_picture() {
        let layout = parser().parse("       05  CUST-NAME  PIC X(30).");
        assert_eq!(layout.fields["CUST-NAME"].pic, "X(30)");
    }

    #[test]
    fn test_sequence_area_tolerated() {
        let layout = parser().parse("000100 01  ORDER-REC.\n000200     05  ORDER-ID  PIC 9(8).");
        assert!(layout.record_names.contains("ORDER-REC"));
        assert_eq!(layout.fields["ORDER-ID"].record.as_deref(), Some("ORDER-REC"));
    }

    #[test]
    fn test_first_declaration_wins() {
        let mut layout = parser().parse("       05  SHARED-ID  PIC X(4).\n       05  SHARED-ID  PIC 9(9).");
        assert_eq!(layout.fields["SHARED-ID"].pic, "X(4)");

        layout.merge(parser().parse("       05  SHARED-ID  PIC X(99).\n       05  OTHER  PIC X."));
        assert_eq!(layout.fields["SHARED-ID"].pic, "X(4)");
        assert!(layout.contains("OTHER"));
    }

    #[test]
    fn test_fields_of_record() {
        let layout = parser().parse(ACCTREC);
        let owned: Vec<&String> = layout.fields_of_record("ACCT-REC").collect();
        assert!(owned.iter().any(|n| n.as_str() == "ACCT-ID"));
        assert!(owned.iter().any(|n| n.as_str() == "ACCT-REC"));
        assert!(!owned.iter().any(|n| n.as_str() == "WS-COUNTER"));
    }
}
