//! Shared plumbing for Office Open XML packages: a thin XML writer over
//! `quick_xml` and zip packaging/unpackaging fully in memory.

use crate::utils::error::{ReportError, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const RELS_CONTENT_TYPE: &str = "application/vnd.openxmlformats-package.relationships+xml";
pub const NS_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const NS_PACKAGE_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";
pub const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
pub const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";

pub struct XmlBuilder {
    writer: Writer<Vec<u8>>,
}

impl Default for XmlBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlBuilder {
    pub fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    pub fn declaration(&mut self) -> Result<&mut Self> {
        self.writer.write_event(Event::Decl(BytesDecl::new(
            "1.0",
            Some("UTF-8"),
            Some("yes"),
        )))?;
        Ok(self)
    }

    pub fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<&mut Self> {
        let mut element = BytesStart::new(name);
        for attr in attrs {
            element.push_attribute(*attr);
        }
        self.writer.write_event(Event::Start(element))?;
        Ok(self)
    }

    pub fn end(&mut self, name: &str) -> Result<&mut Self> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(self)
    }

    pub fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<&mut Self> {
        let mut element = BytesStart::new(name);
        for attr in attrs {
            element.push_attribute(*attr);
        }
        self.writer.write_event(Event::Empty(element))?;
        Ok(self)
    }

    pub fn text(&mut self, text: &str) -> Result<&mut Self> {
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(self)
    }

    /// `<name attrs>text</name>`
    pub fn text_element(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> Result<&mut Self> {
        self.start(name, attrs)?;
        self.text(text)?;
        self.end(name)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.writer.into_inner()
    }

    pub fn into_string(self) -> Result<String> {
        String::from_utf8(self.into_bytes())
            .map_err(|e| ReportError::export("XML part", format!("invalid UTF-8: {}", e)))
    }
}

/// Content types and package relationships shared by every package we write.
pub fn content_types(defaults: &[(&str, &str)], overrides: &[(&str, &str)]) -> Result<Vec<u8>> {
    let mut xml = XmlBuilder::new();
    xml.declaration()?;
    xml.start("Types", &[("xmlns", NS_CONTENT_TYPES)])?;
    xml.empty(
        "Default",
        &[("Extension", "rels"), ("ContentType", RELS_CONTENT_TYPE)],
    )?;
    xml.empty(
        "Default",
        &[("Extension", "xml"), ("ContentType", "application/xml")],
    )?;
    for (extension, content_type) in defaults {
        xml.empty(
            "Default",
            &[("Extension", extension), ("ContentType", content_type)],
        )?;
    }
    for (part, content_type) in overrides {
        xml.empty(
            "Override",
            &[("PartName", part), ("ContentType", content_type)],
        )?;
    }
    xml.end("Types")?;
    Ok(xml.into_bytes())
}

/// `(id, type, target)` relationship list.
pub fn relationships(rels: &[(&str, &str, &str)]) -> Result<Vec<u8>> {
    let mut xml = XmlBuilder::new();
    xml.declaration()?;
    xml.start("Relationships", &[("xmlns", NS_PACKAGE_RELATIONSHIPS)])?;
    for (id, rel_type, target) in rels {
        xml.empty(
            "Relationship",
            &[("Id", id), ("Type", rel_type), ("Target", target)],
        )?;
    }
    xml.end("Relationships")?;
    Ok(xml.into_bytes())
}

/// Zip entries collected in memory; nothing touches storage until
/// [`PackageWriter::finish`] has produced the full archive.
#[derive(Default)]
pub struct PackageWriter {
    entries: Vec<(String, Vec<u8>)>,
}

impl PackageWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: impl Into<String>, data: Vec<u8>) {
        self.entries.push((name.into(), data));
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, data) in &self.entries {
            zip.start_file(name.as_str(), options)?;
            zip.write_all(data)?;
        }
        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

pub struct PackageReader {
    archive: ZipArchive<Cursor<Vec<u8>>>,
}

impl PackageReader {
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        let archive = ZipArchive::new(Cursor::new(bytes))?;
        Ok(Self { archive })
    }

    pub fn read_part(&mut self, name: &str) -> Result<Vec<u8>> {
        self.read_optional(name)?
            .ok_or_else(|| ReportError::workbook(format!("package part '{}' is missing", name)))
    }

    pub fn read_optional(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        Ok(Some(data))
    }

    /// Every entry in archive order, directories excluded.
    pub fn entries(&mut self) -> Result<Vec<(String, Vec<u8>)>> {
        let mut entries = Vec::with_capacity(self.archive.len());
        for i in 0..self.archive.len() {
            let mut file = self.archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            entries.push((file.name().to_string(), data));
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_escaped() {
        let mut xml = XmlBuilder::new();
        xml.text_element("t", &[], "A & B <C>").unwrap();
        assert_eq!(xml.into_string().unwrap(), "<t>A &amp; B &lt;C&gt;</t>");
    }

    #[test]
    fn test_package_round_trip() {
        let mut package = PackageWriter::new();
        package.add("a.xml", b"<a/>".to_vec());
        package.add("dir/b.xml", b"<b/>".to_vec());
        let bytes = package.finish().unwrap();

        let mut reader = PackageReader::new(bytes).unwrap();
        assert_eq!(reader.read_part("dir/b.xml").unwrap(), b"<b/>".to_vec());
        assert!(reader.read_optional("missing.xml").unwrap().is_none());
        assert!(reader.read_part("missing.xml").is_err());

        let names: Vec<String> = reader.entries().unwrap().into_iter().map(|e| e.0).collect();
        assert_eq!(names, vec!["a.xml", "dir/b.xml"]);
    }
}
