//! Legacy XML export reader.
//!
//! An export is a tree of nodes in which every element matching the
//! configured record name, at any depth, is one record. Leaf children
//! become fields; absent fields mean "no data". The reader validates
//! nothing and never mutates the source, so reads are idempotent and
//! repeatable across runs.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use crate::core::{RawRecord, Value};
use crate::error::{MigrateError, Result};

/// A tree-structured XML source file.
#[derive(Debug, Clone)]
pub struct XmlSource {
    path: PathBuf,
    record_element: String,
}

impl XmlSource {
    /// Create a source for `path`, yielding one record per
    /// `record_element` occurrence.
    ///
    /// Fails with a precondition error if the file does not exist, so
    /// callers can refuse to start destructive work against a partial
    /// export set.
    pub fn open(path: impl Into<PathBuf>, record_element: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(MigrateError::Precondition(format!(
                "XML source not found: {}",
                path.display()
            )));
        }
        Ok(Self {
            path,
            record_element: record_element.into(),
        })
    }

    /// Source file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Start a fresh pass over the records, in document order.
    ///
    /// Each call re-opens the file, so the sequence is restartable from
    /// scratch.
    pub fn records(&self) -> Result<RecordIter> {
        let reader = Reader::from_file(&self.path)?;
        debug!("Reading records from {}", self.path.display());
        Ok(RecordIter {
            reader,
            record_element: self.record_element.clone(),
            buf: Vec::new(),
        })
    }
}

/// Lazy iterator over the records of one XML source.
pub struct RecordIter {
    reader: Reader<BufReader<File>>,
    record_element: String,
    buf: Vec<u8>,
}

impl RecordIter {
    /// Read the fields of one record, positioned just past its start tag.
    fn read_record(&mut self) -> Result<RawRecord> {
        let mut record = RawRecord::new();
        let mut field: Option<String> = None;
        let mut text = String::new();

        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) => {
                    field = Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                    text.clear();
                }
                Event::Empty(e) => {
                    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                    record.push(name, Value::Null);
                    field = None;
                }
                Event::Text(t) => {
                    if field.is_some() {
                        text.push_str(&t.unescape()?);
                    }
                }
                Event::CData(t) => {
                    if field.is_some() {
                        text.push_str(&String::from_utf8_lossy(&t.into_inner()));
                    }
                }
                Event::End(e) => {
                    if e.local_name().as_ref() == self.record_element.as_bytes() {
                        return Ok(record);
                    }
                    if let Some(name) = field.take() {
                        let value = if text.is_empty() {
                            Value::Null
                        } else {
                            Value::Text(std::mem::take(&mut text))
                        };
                        record.push(name, value);
                    }
                }
                Event::Eof => {
                    return Err(MigrateError::Io(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "XML document ended inside a record",
                    )));
                }
                _ => {}
            }
        }
    }
}

/// What the top-level scan saw at one event.
enum Scan {
    RecordStart,
    EmptyRecord,
    Eof,
    Other,
}

impl Iterator for RecordIter {
    type Item = Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            let scan = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e))
                    if e.local_name().as_ref() == self.record_element.as_bytes() =>
                {
                    Scan::RecordStart
                }
                Ok(Event::Empty(e))
                    if e.local_name().as_ref() == self.record_element.as_bytes() =>
                {
                    Scan::EmptyRecord
                }
                Ok(Event::Eof) => Scan::Eof,
                Ok(_) => Scan::Other,
                Err(e) => return Some(Err(e.into())),
            };
            match scan {
                Scan::RecordStart => return Some(self.read_record()),
                Scan::EmptyRecord => return Some(Ok(RawRecord::new())),
                Scan::Eof => return None,
                Scan::Other => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_xml(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn collect(source: &XmlSource) -> Vec<RawRecord> {
        source
            .records()
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_missing_file_is_precondition() {
        let err = XmlSource::open("/nonexistent/pat.xml", "Table_Contenu").unwrap_err();
        assert!(matches!(err, MigrateError::Precondition(_)));
    }

    #[test]
    fn test_reads_records_in_document_order() {
        let file = write_xml(
            r#"<?xml version="1.0"?>
<Export>
  <Table_Contenu><CDEP>1</CDEP><NOMP>Doe</NOMP></Table_Contenu>
  <Table_Contenu><CDEP>2</CDEP></Table_Contenu>
</Export>"#,
        );
        let source = XmlSource::open(file.path(), "Table_Contenu").unwrap();
        let records = collect(&source);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text("CDEP"), Some("1"));
        assert_eq!(records[0].text("NOMP"), Some("Doe"));
        assert_eq!(records[1].text("CDEP"), Some("2"));
        assert_eq!(records[1].text("NOMP"), None);
    }

    #[test]
    fn test_records_found_at_any_depth() {
        let file = write_xml(
            r#"<Root><Outer><Inner>
<Table_Contenu><CDEP>7</CDEP></Table_Contenu>
</Inner></Outer>
<Table_Contenu><CDEP>8</CDEP></Table_Contenu></Root>"#,
        );
        let source = XmlSource::open(file.path(), "Table_Contenu").unwrap();
        let records = collect(&source);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text("CDEP"), Some("7"));
        assert_eq!(records[1].text("CDEP"), Some("8"));
    }

    #[test]
    fn test_empty_and_entity_fields() {
        let file = write_xml(
            "<R><Table_Contenu><TEL/><ADP>12 &amp; 14</ADP><NOMP></NOMP></Table_Contenu></R>",
        );
        let source = XmlSource::open(file.path(), "Table_Contenu").unwrap();
        let records = collect(&source);
        assert_eq!(records[0].get("TEL"), Some(&Value::Null));
        assert_eq!(records[0].text("ADP"), Some("12 & 14"));
        assert_eq!(records[0].get("NOMP"), Some(&Value::Null));
    }

    #[test]
    fn test_multiline_text_survives() {
        let file = write_xml(
            "<R><Table_Contenu><STRAIT>line one\nline two\n\npara two</STRAIT></Table_Contenu></R>",
        );
        let source = XmlSource::open(file.path(), "Table_Contenu").unwrap();
        let records = collect(&source);
        assert_eq!(records[0].text("STRAIT"), Some("line one\nline two\n\npara two"));
    }

    #[test]
    fn test_restartable_from_scratch() {
        let file = write_xml("<R><Table_Contenu><CDEP>1</CDEP></Table_Contenu></R>");
        let source = XmlSource::open(file.path(), "Table_Contenu").unwrap();
        assert_eq!(collect(&source).len(), 1);
        assert_eq!(collect(&source).len(), 1);
    }
}
