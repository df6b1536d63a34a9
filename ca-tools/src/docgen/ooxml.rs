//! Shared plumbing for Office Open XML packages (docx, xlsx, pptx).

use crate::error::Result;
use std::borrow::Cow;
use std::io::{Cursor, Write};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

pub(crate) const XML_DECLARATION: &str =
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

pub(crate) const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
pub(crate) const NS_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

pub(crate) struct PackageWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
}

impl PackageWriter {
    pub(crate) fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    pub(crate) fn add(&mut self, name: &str, contents: &str) -> Result<()> {
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.zip.start_file(name, options)?;
        self.zip.write_all(contents.as_bytes())?;
        Ok(())
    }

    pub(crate) fn finish(self) -> Result<Vec<u8>> {
        let cursor = self.zip.finish()?;
        Ok(cursor.into_inner())
    }
}

/// Escapes text for element bodies and attribute values, dropping control
/// characters XML 1.0 cannot carry.
pub(crate) fn xml_text(raw: &str) -> Cow<'_, str> {
    if raw.chars().any(is_forbidden_xml_char) {
        let cleaned: String = raw.chars().filter(|c| !is_forbidden_xml_char(*c)).collect();
        return Cow::Owned(quick_xml::escape::escape(cleaned.as_str()).into_owned());
    }
    quick_xml::escape::escape(raw)
}

fn is_forbidden_xml_char(c: char) -> bool {
    c < '\u{20}' && !matches!(c, '\t' | '\n' | '\r')
}

/// `_rels/.rels` pointing at the package's main part.
pub(crate) fn root_relationships(main_part: &str) -> String {
    format!(
        r#"{XML_DECLARATION}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_OFFICE_DOCUMENT}" Target="{main_part}"/></Relationships>"#
    )
}

pub(crate) struct Relationship<'a> {
    pub id: String,
    pub rel_type: &'a str,
    pub target: String,
}

pub(crate) fn relationships(rels: &[Relationship<'_>]) -> String {
    let mut out = format!(
        r#"{XML_DECLARATION}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#
    );
    for rel in rels {
        out.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
            rel.id, rel.rel_type, rel.target
        ));
    }
    out.push_str("</Relationships>");
    out
}

/// `[Content_Types].xml` with the xml/rels defaults plus per-part overrides.
pub(crate) fn content_types(overrides: &[(String, &str)]) -> String {
    let mut out = format!(
        r#"{XML_DECLARATION}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>"#
    );
    for (part, content_type) in overrides {
        out.push_str(&format!(
            r#"<Override PartName="{part}" ContentType="{content_type}"/>"#
        ));
    }
    out.push_str("</Types>");
    out
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::{Cursor, Read};

    pub(crate) fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("zip archive");
        let mut file = archive.by_name(name).expect("part present");
        let mut out = String::new();
        file.read_to_string(&mut out).expect("utf-8 part");
        out
    }

    pub(crate) fn part_names(bytes: &[u8]) -> Vec<String> {
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("zip archive");
        archive.file_names().map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xml_text_escapes_markup_and_drops_control_chars() {
        assert_eq!(xml_text("a < b & c"), "a &lt; b &amp; c");
        assert_eq!(xml_text("bell\u{7}tab\t"), "belltab\t");
    }

    #[test]
    fn package_round_trips_parts() {
        let mut pkg = PackageWriter::new();
        pkg.add("[Content_Types].xml", &content_types(&[])).unwrap();
        pkg.add("_rels/.rels", &root_relationships("word/document.xml"))
            .unwrap();
        let bytes = pkg.finish().unwrap();

        let names = test_support::part_names(&bytes);
        assert!(names.contains(&"_rels/.rels".to_string()));
        let rels = test_support::read_part(&bytes, "_rels/.rels");
        assert!(rels.contains(r#"Target="word/document.xml""#));
    }
}
