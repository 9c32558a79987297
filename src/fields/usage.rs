//! Field usage classification
//!
//! Scans program text for references to known copybook fields and sorts them
//! into `input` (read as a condition or source) and `derived_or_updated`
//! (written as a destination) by the verb around them. A field can land in
//! both sets.

use std::collections::BTreeSet;

use regex::Regex;

use super::copybook::CopybookLayout;
use crate::error::Result;

/// Fields seen as inputs and as destinations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldUsage {
    pub input: BTreeSet<String>,
    pub derived_or_updated: BTreeSet<String>,
}

impl FieldUsage {
    /// Union of both sets
    pub fn used(&self) -> BTreeSet<String> {
        self.input.union(&self.derived_or_updated).cloned().collect()
    }

    pub fn merge(&mut self, other: FieldUsage) {
        self.input.extend(other.input);
        self.derived_or_updated.extend(other.derived_or_updated);
    }
}

/// Verb patterns used to classify references
#[derive(Debug)]
pub struct UsageScanner {
    word: Regex,
    condition: Regex,
    move_stmt: Regex,
    /// Arithmetic verbs whose captured operand is the destination
    destinations: Vec<Regex>,
    sql_block: Regex,
    sql_host_var: Regex,
    sql_insert_or_update: Regex,
    sql_select: Regex,
    sql_into: Regex,
    sql_set: Regex,
    sql_where: Regex,
    record_write: Regex,
}

impl UsageScanner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            word: Regex::new(r"\b[A-Z][A-Z0-9\-]+\b")?,
            condition: Regex::new(r"(?:^|[^\w-])IF\s+([^.]+)\.")?,
            move_stmt: Regex::new(r"\bMOVE\s+([A-Z0-9\-]+)\s+TO\s+([A-Z0-9\-]+)")?,
            destinations: vec![
                Regex::new(r"\bCOMPUTE\s+([A-Z0-9\-]+)\s*=")?,
                Regex::new(r"\bADD\s+.+\s+TO\s+([A-Z0-9\-]+)")?,
                Regex::new(r"\bSUBTRACT\s+.+\s+FROM\s+([A-Z0-9\-]+)")?,
                Regex::new(r"\bMULTIPLY\s+.+\s+BY\s+([A-Z0-9\-]+)")?,
                Regex::new(r"\bDIVIDE\s+.+\s+INTO\s+([A-Z0-9\-]+)")?,
            ],
            sql_block: Regex::new(r"(?s)EXEC\s+SQL(.*?)END-EXEC")?,
            sql_host_var: Regex::new(r":([A-Z0-9_\-]+)")?,
            sql_insert_or_update: Regex::new(r"\b(?:INSERT|UPDATE)\b")?,
            sql_select: Regex::new(r"\bSELECT\b")?,
            sql_into: Regex::new(r"\bINTO\s+([A-Z0-9_:,\s\-]+)")?,
            sql_set: Regex::new(r"\bSET\s+([A-Z0-9_:=\s,\-]+)")?,
            sql_where: Regex::new(r"\bWHERE\s+([A-Z0-9_:\s=<>,\-+*/()]+)")?,
            record_write: Regex::new(r"(?:^|[^\w-])(?:WRITE|REWRITE)\s+([A-Z0-9\-]+)")?,
        })
    }

    /// Classify references to `layout`'s fields within one chunk's text
    pub fn scan(&self, text: &str, layout: &CopybookLayout) -> FieldUsage {
        let upper = text.to_uppercase();
        let mut usage = FieldUsage::default();

        let referenced: BTreeSet<&str> = self
            .word
            .find_iter(&upper)
            .map(|m| m.as_str())
            .filter(|w| layout.contains(w))
            .collect();
        if referenced.is_empty() {
            return usage;
        }

        self.conditions(&upper, &referenced, &mut usage);
        self.moves(&upper, layout, &mut usage);
        self.arithmetic(&upper, layout, &mut usage);
        self.sql_host_variables(&upper, layout, &mut usage);
        self.record_writes(&upper, layout, &mut usage);

        usage
    }

    /// Anything inside `IF ... .` is read
    fn conditions(&self, upper: &str, referenced: &BTreeSet<&str>, usage: &mut FieldUsage) {
        for caps in self.condition.captures_iter(upper) {
            for word in self.word.find_iter(&caps[1]) {
                if referenced.contains(word.as_str()) {
                    usage.input.insert(word.as_str().to_string());
                }
            }
        }
    }

    fn moves(&self, upper: &str, layout: &CopybookLayout, usage: &mut FieldUsage) {
        for caps in self.move_stmt.captures_iter(upper) {
            if layout.contains(&caps[1]) {
                usage.input.insert(caps[1].to_string());
            }
            if layout.contains(&caps[2]) {
                usage.derived_or_updated.insert(caps[2].to_string());
            }
        }
    }

    fn arithmetic(&self, upper: &str, layout: &CopybookLayout, usage: &mut FieldUsage) {
        for pattern in &self.destinations {
            for caps in pattern.captures_iter(upper) {
                if layout.contains(&caps[1]) {
                    usage.derived_or_updated.insert(caps[1].to_string());
                }
            }
        }
    }

    /// Host variables: written values of INSERT/UPDATE and WHERE operands are
    /// inputs, `SELECT ... INTO` receivers are updated
    fn sql_host_variables(&self, upper: &str, layout: &CopybookLayout, usage: &mut FieldUsage) {
        for block in self.sql_block.captures_iter(upper) {
            let body = &block[1];

            if self.sql_insert_or_update.is_match(body) {
                if let Some(set) = self.sql_set.captures(body) {
                    self.host_vars_into(&set[1], layout, &mut usage.input);
                }
                self.host_vars_into(body, layout, &mut usage.input);
            }

            if self.sql_select.is_match(body) {
                for into in self.sql_into.captures_iter(body) {
                    self.host_vars_into(&into[1], layout, &mut usage.derived_or_updated);
                }
                if let Some(clause) = self.sql_where.captures(body) {
                    self.host_vars_into(&clause[1], layout, &mut usage.input);
                }
            }
        }
    }

    fn host_vars_into(&self, clause: &str, layout: &CopybookLayout, set: &mut BTreeSet<String>) {
        for caps in self.sql_host_var.captures_iter(clause) {
            if layout.contains(&caps[1]) {
                set.insert(caps[1].to_string());
            }
        }
    }

    /// `WRITE rec` / `REWRITE rec` updates every field of a known record
    fn record_writes(&self, upper: &str, layout: &CopybookLayout, usage: &mut FieldUsage) {
        for caps in self.record_write.captures_iter(upper) {
            let record = &caps[1];
            if layout.record_names.contains(record) {
                usage
                    .derived_or_updated
                    .extend(layout.fields_of_record(record).cloned());
            }
        }
    }
}
