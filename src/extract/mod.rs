//! Entity Extraction
//!
//! Independent pattern recognizers, one per mainframe source construct. Each
//! recognizer turns a chunk's text into `(subject, operation, program)`
//! observations; the program is the chunk filename. Recognizers share no state
//! and can run in any order, because aggregation only counts and unions.

pub mod patterns;

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{LineageError, Result};
pub use patterns::{copy_names, normalize_file_subject, normalize_subject, normalize_table, Recognizers};

// =============================================================================
// Operation Kinds
// =============================================================================

/// Verb of a file-style I/O statement (also used for CICS commands)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoVerb {
    Read,
    Write,
    Rewrite,
    Delete,
}

impl IoVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            IoVerb::Read => "READ",
            IoVerb::Write => "WRITE",
            IoVerb::Rewrite => "REWRITE",
            IoVerb::Delete => "DELETE",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "READ" => Some(IoVerb::Read),
            "WRITE" => Some(IoVerb::Write),
            "REWRITE" => Some(IoVerb::Rewrite),
            "DELETE" => Some(IoVerb::Delete),
            _ => None,
        }
    }
}

/// MQ API call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MqVerb {
    Put,
    Get,
    Open,
    Close,
}

impl MqVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            MqVerb::Put => "PUT",
            MqVerb::Get => "GET",
            MqVerb::Open => "OPEN",
            MqVerb::Close => "CLOSE",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PUT" => Some(MqVerb::Put),
            "GET" => Some(MqVerb::Get),
            "OPEN" => Some(MqVerb::Open),
            "CLOSE" => Some(MqVerb::Close),
            _ => None,
        }
    }
}

/// Operation observed against a subject.
///
/// Serializes as its textual tag (`READ`, `CICS_READ`, `ASSIGN:DDVSAM`, ...)
/// and orders by that tag, so maps keyed by it print sorted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// `SELECT x ASSIGN`
    Assign,
    /// `FD x`
    Fd,
    /// COBOL `READ` / `WRITE` / `REWRITE` / `DELETE`, and SQL `DELETE`
    Io(IoVerb),
    /// SQL `SELECT`
    Select,
    /// SQL `INSERT`
    Insert,
    /// SQL `UPDATE`
    Update,
    /// `COPY name`
    Copy,
    /// `EXEC CICS <verb> FILE|QUEUE(name)`
    Cics(IoVerb),
    /// `CALL 'MQ<verb>'`
    Mq(MqVerb),
    XmlGenerate,
    XmlParse,
    /// Logical file bound to a DD name: `ASSIGN:<ddname>`
    AssignTo(String),
    /// JCL `DD DSN=`
    JclDd,
}

impl OperationKind {
    /// Textual tag used as the map key in lineage reports
    pub fn tag(&self) -> Cow<'static, str> {
        match self {
            OperationKind::Assign => Cow::Borrowed("ASSIGN"),
            OperationKind::Fd => Cow::Borrowed("FD"),
            OperationKind::Io(verb) => Cow::Borrowed(verb.as_str()),
            OperationKind::Select => Cow::Borrowed("SELECT"),
            OperationKind::Insert => Cow::Borrowed("INSERT"),
            OperationKind::Update => Cow::Borrowed("UPDATE"),
            OperationKind::Copy => Cow::Borrowed("COPY"),
            OperationKind::Cics(verb) => Cow::Owned(format!("CICS_{}", verb.as_str())),
            OperationKind::Mq(verb) => Cow::Owned(format!("MQ{}", verb.as_str())),
            OperationKind::XmlGenerate => Cow::Borrowed("XML_GENERATE"),
            OperationKind::XmlParse => Cow::Borrowed("XML_PARSE"),
            OperationKind::AssignTo(ddname) => Cow::Owned(format!("ASSIGN:{}", ddname)),
            OperationKind::JclDd => Cow::Borrowed("JCL_DD"),
        }
    }

    /// SQL verb keyword to operation
    pub fn from_sql_verb(verb: &str) -> Option<Self> {
        match verb.to_ascii_uppercase().as_str() {
            "SELECT" => Some(OperationKind::Select),
            "INSERT" => Some(OperationKind::Insert),
            "UPDATE" => Some(OperationKind::Update),
            "DELETE" => Some(OperationKind::Io(IoVerb::Delete)),
            _ => None,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

impl FromStr for OperationKind {
    type Err = LineageError;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        let op = match upper.as_str() {
            "ASSIGN" => OperationKind::Assign,
            "FD" => OperationKind::Fd,
            "SELECT" => OperationKind::Select,
            "INSERT" => OperationKind::Insert,
            "UPDATE" => OperationKind::Update,
            "COPY" => OperationKind::Copy,
            "XML_GENERATE" => OperationKind::XmlGenerate,
            "XML_PARSE" => OperationKind::XmlParse,
            "JCL_DD" => OperationKind::JclDd,
            other => {
                if let Some(verb) = IoVerb::parse(other) {
                    OperationKind::Io(verb)
                } else if let Some(verb) = other.strip_prefix("CICS_").and_then(IoVerb::parse) {
                    OperationKind::Cics(verb)
                } else if let Some(verb) = other.strip_prefix("MQ").and_then(MqVerb::parse) {
                    OperationKind::Mq(verb)
                } else if other.starts_with("ASSIGN:") {
                    OperationKind::AssignTo(s.trim()["ASSIGN:".len()..].to_string())
                } else {
                    return Err(LineageError::InvalidInput(format!("unknown operation tag: {}", s)));
                }
            }
        };
        Ok(op)
    }
}

impl PartialOrd for OperationKind {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OperationKind {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tag().cmp(&other.tag())
    }
}

impl Serialize for OperationKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.tag())
    }
}

impl<'de> Deserialize<'de> for OperationKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        tag.parse().map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Observations
// =============================================================================

/// Which lineage map an observation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Files, datasets, copybooks, queues, XML elements, DSNs, logical names
    Files,
    /// SQL tables and views
    Tables,
}

/// One extracted fact: `program` performs `op` on `subject`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Observation {
    pub target: Target,
    pub subject: String,
    pub op: OperationKind,
    pub program: String,
}

impl Observation {
    fn file(subject: String, op: OperationKind, program: &str) -> Self {
        Self { target: Target::Files, subject, op, program: program.to_string() }
    }

    fn table(subject: String, op: OperationKind, program: &str) -> Self {
        Self { target: Target::Tables, subject, op, program: program.to_string() }
    }
}

// =============================================================================
// Constructs
// =============================================================================

/// Source construct families with a dedicated recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Construct {
    /// `SELECT x ASSIGN ...`
    FileSelect,
    /// `FD x`
    FileDescription,
    /// `READ/WRITE/REWRITE/DELETE x`
    FileIo,
    /// `EXEC SQL ... END-EXEC`
    SqlBlock,
    /// `COPY name`
    Copy,
    /// `EXEC CICS <verb> FILE|QUEUE(name)`
    Cics,
    /// `CALL 'MQPUT'` and friends
    MqCall,
    /// `XML GENERATE` / `XML PARSE`
    Xml,
    /// `SELECT logical ASSIGN TO ddname`
    LogicalBinding,
    /// JCL `//step DD DSN=...`
    JclDd,
}

impl Construct {
    pub const ALL: [Construct; 10] = [
        Construct::FileSelect,
        Construct::FileDescription,
        Construct::FileIo,
        Construct::SqlBlock,
        Construct::Copy,
        Construct::Cics,
        Construct::MqCall,
        Construct::Xml,
        Construct::LogicalBinding,
        Construct::JclDd,
    ];
}

/// Runs every recognizer over a chunk's text
#[derive(Debug)]
pub struct EntityExtractor {
    patterns: Recognizers,
}

impl EntityExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self { patterns: Recognizers::new()? })
    }

    /// All observations for one chunk, construct by construct
    pub fn extract(&self, program: &str, text: &str) -> Vec<Observation> {
        let mut out = Vec::new();
        for construct in Construct::ALL {
            self.extract_into(construct, program, text, &mut out);
        }
        out
    }

    /// Observations from a single construct's recognizer
    pub fn extract_construct(&self, construct: Construct, program: &str, text: &str) -> Vec<Observation> {
        let mut out = Vec::new();
        self.extract_into(construct, program, text, &mut out);
        out
    }

    fn extract_into(&self, construct: Construct, program: &str, text: &str, out: &mut Vec<Observation>) {
        match construct {
            Construct::FileSelect => self.file_selects(program, text, out),
            Construct::FileDescription => self.file_descriptions(program, text, out),
            Construct::FileIo => self.file_io(program, text, out),
            Construct::SqlBlock => self.sql_blocks(program, text, out),
            Construct::Copy => self.copies(program, text, out),
            Construct::Cics => self.cics(program, text, out),
            Construct::MqCall => self.mq_calls(program, text, out),
            Construct::Xml => self.xml(program, text, out),
            Construct::LogicalBinding => self.logical_bindings(program, text, out),
            Construct::JclDd => self.jcl_dds(program, text, out),
        }
    }

    fn file_selects(&self, program: &str, text: &str, out: &mut Vec<Observation>) {
        for caps in self.patterns.file_assign.captures_iter(text) {
            if let Some(subject) = normalize_file_subject(&caps[1]) {
                out.push(Observation::file(subject, OperationKind::Assign, program));
            }
        }
    }

    fn file_descriptions(&self, program: &str, text: &str, out: &mut Vec<Observation>) {
        for caps in self.patterns.fd.captures_iter(text) {
            if let Some(subject) = normalize_file_subject(&caps[1]) {
                out.push(Observation::file(subject, OperationKind::Fd, program));
            }
        }
    }

    fn file_io(&self, program: &str, text: &str, out: &mut Vec<Observation>) {
        let verbs = [
            (&self.patterns.read, IoVerb::Read),
            (&self.patterns.write, IoVerb::Write),
            (&self.patterns.rewrite, IoVerb::Rewrite),
            (&self.patterns.delete, IoVerb::Delete),
        ];
        for (pattern, verb) in verbs {
            for caps in pattern.captures_iter(text) {
                if let Some(subject) = normalize_file_subject(&caps[1]) {
                    out.push(Observation::file(subject, OperationKind::Io(verb), program));
                }
            }
        }
    }

    fn sql_blocks(&self, program: &str, text: &str, out: &mut Vec<Observation>) {
        for block in self.patterns.sql_block.captures_iter(text) {
            let body = &block[1];
            let Some(op) = self
                .patterns
                .sql_verb
                .captures(body)
                .and_then(|v| OperationKind::from_sql_verb(&v[1]))
            else {
                continue;
            };

            for caps in self.patterns.sql_table.captures_iter(body) {
                let Some(raw) = caps.get(1).or_else(|| caps.get(2)) else {
                    continue;
                };
                if let Some(table) = normalize_table(raw.as_str()) {
                    out.push(Observation::table(table, op.clone(), program));
                }
            }
            for caps in self.patterns.sql_update_target.captures_iter(body) {
                if let Some(table) = normalize_table(&caps[1]) {
                    out.push(Observation::table(table, op.clone(), program));
                }
            }
        }
    }

    fn copies(&self, program: &str, text: &str, out: &mut Vec<Observation>) {
        for caps in self.patterns.copy.captures_iter(text) {
            if let Some((logical, physical)) = copy_names(&caps[1]) {
                out.push(Observation::file(format!("COPYBOOK:{}", logical), OperationKind::Copy, program));
                out.push(Observation::file(format!("COPYBOOK:{}", physical), OperationKind::Copy, program));
            }
        }
    }

    fn cics(&self, program: &str, text: &str, out: &mut Vec<Observation>) {
        for caps in self.patterns.cics.captures_iter(text) {
            let Some(verb) = IoVerb::parse(&caps[1]) else {
                continue;
            };
            if let Some(subject) = normalize_subject(&caps[3]) {
                out.push(Observation::file(subject, OperationKind::Cics(verb), program));
            }
        }
    }

    fn mq_calls(&self, program: &str, text: &str, out: &mut Vec<Observation>) {
        for caps in self.patterns.mq_call.captures_iter(text) {
            if let Some(verb) = MqVerb::parse(&caps[1]) {
                out.push(Observation::file("MQ".to_string(), OperationKind::Mq(verb), program));
            }
        }
    }

    fn xml(&self, program: &str, text: &str, out: &mut Vec<Observation>) {
        let verbs = [
            (&self.patterns.xml_generate, OperationKind::XmlGenerate),
            (&self.patterns.xml_parse, OperationKind::XmlParse),
        ];
        for (pattern, op) in verbs {
            for caps in pattern.captures_iter(text) {
                if let Some(subject) = normalize_subject(&caps[1]) {
                    out.push(Observation::file(subject, op.clone(), program));
                }
            }
        }
    }

    fn logical_bindings(&self, program: &str, text: &str, out: &mut Vec<Observation>) {
        for caps in self.patterns.logical_binding.captures_iter(text) {
            let (Some(logical), Some(ddname)) = (normalize_file_subject(&caps[1]), normalize_subject(&caps[2])) else {
                continue;
            };
            out.push(Observation::file(
                format!("LOGICAL:{}", logical),
                OperationKind::AssignTo(ddname),
                program,
            ));
        }
    }

    fn jcl_dds(&self, program: &str, text: &str, out: &mut Vec<Observation>) {
        for caps in self.patterns.jcl_dd.captures_iter(text) {
            if let Some(dsn) = normalize_subject(&caps[2]) {
                out.push(Observation::file(format!("DSN:{}", dsn), OperationKind::JclDd, program));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> EntityExtractor {
        EntityExtractor::new().unwrap()
    }

    fn tags(observations: &[Observation]) -> Vec<(String, String)> {
        observations
            .iter()
            .map(|o| (o.subject.clone(), o.op.to_string()))
            .collect()
    }

    #[test]
    fn test_file_select_and_binding() {
        let ex = extractor();
        let text = "           SELECT VSAMFILE ASSIGN TO DDVSAM.";
        assert_eq!(
            tags(&ex.extract_construct(Construct::FileSelect, "PGMA.CBL", text)),
            vec![("VSAMFILE".to_string(), "ASSIGN".to_string())]
        );
        assert_eq!(
            tags(&ex.extract_construct(Construct::LogicalBinding, "PGMA.CBL", text)),
            vec![("LOGICAL:VSAMFILE".to_string(), "ASSIGN:DDVSAM".to_string())]
        );
    }

    #[test]
    fn test_file_io_verbs() {
        let ex = extractor();
        let text = "READ ACCTFILE.\nWRITE ACCT-REC.\nREWRITE ACCT-REC.\nDELETE ACCTFILE RECORD.";
        let got = tags(&ex.extract_construct(Construct::FileIo, "P.CBL", text));
        assert_eq!(
            got,
            vec![
                ("ACCTFILE".to_string(), "READ".to_string()),
                ("ACCT-REC".to_string(), "WRITE".to_string()),
                ("ACCT-REC".to_string(), "REWRITE".to_string()),
                ("ACCTFILE".to_string(), "DELETE".to_string()),
            ]
        );
    }

    #[test]
    fn test_scope_terminators_add_no_subjects() {
        let ex = extractor();
        let text = "           READ ACCTFILE\n               AT END SET WS-EOF TO TRUE\n           END-READ\n\
                    \x20          PERFORM 100-PROCESS.\n\
                    \x20          WRITE ACCT-REC\n           END-WRITE\n           MOVE 1 TO WS-COUNT.\n\
                    \x20          REWRITE ACCT-REC END-REWRITE\n           DELETE ACCTFILE END-DELETE\n\
                    \x20          GO TO 900-EXIT.";
        let got = tags(&ex.extract_construct(Construct::FileIo, "P.CBL", text));
        assert_eq!(
            got,
            vec![
                ("ACCTFILE".to_string(), "READ".to_string()),
                ("ACCT-REC".to_string(), "WRITE".to_string()),
                ("ACCT-REC".to_string(), "REWRITE".to_string()),
                ("ACCTFILE".to_string(), "DELETE".to_string()),
            ]
        );
    }

    #[test]
    fn test_case_insensitive() {
        let ex = extractor();
        let got = tags(&ex.extract_construct(Construct::FileIo, "P.CBL", "read acctfile next."));
        assert_eq!(got, vec![("ACCTFILE".to_string(), "READ".to_string())]);
    }

    #[test]
    fn test_sql_block_tables() {
        let ex = extractor();
        let text = "EXEC SQL\n  SELECT BAL INTO :WS-BAL\n  FROM ACCOUNTS WHERE ID = :WS-ID\nEND-EXEC.\n\
                    EXEC SQL INSERT INTO AUDIT_LOG VALUES (:WS-ID) END-EXEC.\n\
                    EXEC SQL UPDATE ACCOUNTS SET BAL = :WS-BAL END-EXEC.";
        let got = tags(&ex.extract_construct(Construct::SqlBlock, "P.CBL", text));
        assert_eq!(
            got,
            vec![
                ("ACCOUNTS".to_string(), "SELECT".to_string()),
                ("AUDIT_LOG".to_string(), "INSERT".to_string()),
                ("ACCOUNTS".to_string(), "UPDATE".to_string()),
            ]
        );
    }

    #[test]
    fn test_sql_delete_does_not_leak_into_files() {
        let ex = extractor();
        let text = "EXEC SQL DELETE FROM ORDERS WHERE ID = :ID END-EXEC.";
        let obs = ex.extract("P.CBL", text);
        assert!(obs.iter().all(|o| o.subject != "FROM"));
        assert!(obs
            .iter()
            .any(|o| o.target == Target::Tables && o.subject == "ORDERS" && o.op.to_string() == "DELETE"));
    }

    #[test]
    fn test_unterminated_sql_block_is_ignored() {
        let ex = extractor();
        let text = "EXEC SQL SELECT A INTO :B FROM T1";
        assert!(ex.extract_construct(Construct::SqlBlock, "P.CBL", text).is_empty());
    }

    #[test]
    fn test_copy_dual_emission() {
        let ex = extractor();
        let got = tags(&ex.extract_construct(Construct::Copy, "P.CBL", "       COPY CUSTMAST."));
        assert_eq!(
            got,
            vec![
                ("COPYBOOK:CUSTMAST".to_string(), "COPY".to_string()),
                ("COPYBOOK:CUSTMAST.CPY".to_string(), "COPY".to_string()),
            ]
        );
    }

    #[test]
    fn test_cics_commands() {
        let ex = extractor();
        let text = "EXEC CICS READ FILE('ACCTFIL') INTO(WS-REC) END-EXEC.\n\
                    EXEC CICS WRITE QUEUE(AUDITQ) FROM(WS-REC) END-EXEC.";
        let got = tags(&ex.extract_construct(Construct::Cics, "P.CICS", text));
        assert_eq!(
            got,
            vec![
                ("ACCTFIL".to_string(), "CICS_READ".to_string()),
                ("AUDITQ".to_string(), "CICS_WRITE".to_string()),
            ]
        );
        // The COBOL READ recognizer must not pick up FILE('ACCTFIL')
        assert!(ex.extract_construct(Construct::FileIo, "P.CICS", text).is_empty());
    }

    #[test]
    fn test_mq_and_xml() {
        let ex = extractor();
        let text = "CALL 'MQPUT' USING HCONN.\nCALL \"MQGET\" USING HCONN.\n\
                    XML GENERATE XML-OUT FROM CUST-REC.\nXML PARSE XML-IN PROCESSING PROCEDURE P1.";
        let got = tags(&ex.extract("P.CBL", text));
        assert!(got.contains(&("MQ".to_string(), "MQPUT".to_string())));
        assert!(got.contains(&("MQ".to_string(), "MQGET".to_string())));
        assert!(got.contains(&("XML-OUT".to_string(), "XML_GENERATE".to_string())));
        assert!(got.contains(&("XML-IN".to_string(), "XML_PARSE".to_string())));
    }

    #[test]
    fn test_jcl_dd_statements() {
        let ex = extractor();
        let text = "//NIGHTLY  JOB (ACCT),'RUN'\n\
                    //STEP1    EXEC PGM=ACCTPGM\n\
                    //ACCTIN   DD DSN=PROD.ACCT.MASTER,DISP=SHR\n\
                    //ACCTOUT  DD DISP=(NEW,CATLG),DSN=PROD.ACCT.BACKUP\n\
                    //         DD DSNAME=PROD.ACCT.EXTRA,DISP=SHR";
        let got = tags(&ex.extract_construct(Construct::JclDd, "NIGHTLY.JCL", text));
        assert_eq!(
            got,
            vec![
                ("DSN:PROD.ACCT.MASTER".to_string(), "JCL_DD".to_string()),
                ("DSN:PROD.ACCT.BACKUP".to_string(), "JCL_DD".to_string()),
                ("DSN:PROD.ACCT.EXTRA".to_string(), "JCL_DD".to_string()),
            ]
        );
    }

    #[test]
    fn test_no_constructs() {
        let ex = extractor();
        assert!(ex.extract("P.CBL", "       DISPLAY 'HELLO'.").is_empty());
    }

    #[test]
    fn test_operation_tag_round_trip() {
        for tag in ["ASSIGN", "FD", "READ", "DELETE", "CICS_REWRITE", "MQCLOSE", "XML_PARSE", "ASSIGN:DDVSAM", "JCL_DD"] {
            let op: OperationKind = tag.parse().unwrap();
            assert_eq!(op.to_string(), tag);
        }
        assert!("BOGUS".parse::<OperationKind>().is_err());
    }

    #[test]
    fn test_operation_ordering_is_by_tag() {
        let mut ops = vec![
            OperationKind::Io(IoVerb::Write),
            OperationKind::Assign,
            OperationKind::Io(IoVerb::Read),
        ];
        ops.sort();
        let tags: Vec<String> = ops.iter().map(|o| o.to_string()).collect();
        assert_eq!(tags, vec!["ASSIGN", "READ", "WRITE"]);
    }
}
