use super::ooxml::{
    NS_RELATIONSHIPS, PackageWriter, Relationship, XML_DECLARATION, content_types, relationships,
    root_relationships, xml_text,
};
use crate::error::Result;

pub(crate) const EXTENSION: &str = "docx";
pub(crate) const HEADING: &str = "Generated Document";

const NS_WORDPROCESSING: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Renders a document with a title heading and `content` as one paragraph.
/// Line breaks inside `content` become soft breaks within that paragraph.
pub(crate) fn render_docx(content: &str) -> Result<Vec<u8>> {
    let mut pkg = PackageWriter::new();
    pkg.add(
        "[Content_Types].xml",
        &content_types(&[
            (
                "/word/document.xml".to_string(),
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
            ),
            (
                "/word/styles.xml".to_string(),
                "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml",
            ),
        ]),
    )?;
    pkg.add("_rels/.rels", &root_relationships("word/document.xml"))?;
    pkg.add(
        "word/_rels/document.xml.rels",
        &relationships(&[Relationship {
            id: "rId1".to_string(),
            rel_type: "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles",
            target: "styles.xml".to_string(),
        }]),
    )?;
    pkg.add("word/styles.xml", &styles_xml())?;
    pkg.add("word/document.xml", &document_xml(content))?;
    pkg.finish()
}

fn document_xml(content: &str) -> String {
    let mut body = String::new();
    body.push_str(&format!(
        r#"<w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t>{}</w:t></w:r></w:p>"#,
        xml_text(HEADING)
    ));

    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    body.push_str("<w:p><w:r>");
    for (idx, line) in normalized.split('\n').enumerate() {
        if idx > 0 {
            body.push_str("<w:br/>");
        }
        body.push_str(&format!(
            r#"<w:t xml:space="preserve">{}</w:t>"#,
            xml_text(line)
        ));
    }
    body.push_str("</w:r></w:p>");

    format!(
        r#"{XML_DECLARATION}<w:document xmlns:w="{NS_WORDPROCESSING}" xmlns:r="{NS_RELATIONSHIPS}"><w:body>{body}<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr></w:body></w:document>"#
    )
}

fn styles_xml() -> String {
    format!(
        r#"{XML_DECLARATION}<w:styles xmlns:w="{NS_WORDPROCESSING}"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:cs="Calibri"/><w:sz w:val="22"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="160" w:line="259" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style><w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:spacing w:after="80"/></w:pPr><w:rPr><w:sz w:val="56"/><w:color w:val="17365D"/><w:kern w:val="28"/></w:rPr></w:style></w:styles>"#
    )
}
