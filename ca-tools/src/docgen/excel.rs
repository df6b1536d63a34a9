use super::ooxml::{
    NS_RELATIONSHIPS, PackageWriter, Relationship, XML_DECLARATION, content_types, relationships,
    root_relationships, xml_text,
};
use crate::error::{Result, ToolError};

pub(crate) const EXTENSION: &str = "xlsx";
pub(crate) const DEFAULT_STEM_SOURCE: &str = "excel_data";
const SHEET_NAME: &str = "Sheet1";
const NS_SPREADSHEET: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

#[derive(Debug, PartialEq)]
pub(crate) struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// A column is numeric when every non-empty cell in it parses as a finite number.
    fn numeric_columns(&self) -> Vec<bool> {
        (0..self.headers.len())
            .map(|col| {
                let mut saw_value = false;
                for row in &self.rows {
                    let cell = row.get(col).map(|c| c.trim()).unwrap_or("");
                    if cell.is_empty() {
                        continue;
                    }
                    saw_value = true;
                    if parse_number(cell).is_none() {
                        return false;
                    }
                }
                saw_value
            })
            .collect()
    }
}

/// Header row plus records. Broken quoting and rows longer than the header
/// are rejected; short rows are padded with empty cells.
pub(crate) fn parse_csv(csv_data: &str) -> Result<Table> {
    check_quoting(csv_data)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ToolError::Csv("no columns to parse from input".to_string()));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.len() > headers.len() {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            return Err(ToolError::Csv(format!(
                "expected {} fields in line {line}, saw {}",
                headers.len(),
                record.len()
            )));
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }
    Ok(Table { headers, rows })
}

#[derive(Clone, Copy)]
enum QuoteState {
    FieldStart,
    Unquoted,
    Quoted,
    /// A `"` inside a quoted field: either an escaped quote or the close.
    QuoteInQuoted,
}

/// The csv reader folds stray text after a closing quote into the field and
/// treats EOF as closing an open quote. Both are errors here.
fn check_quoting(csv_data: &str) -> Result<()> {
    let mut state = QuoteState::FieldStart;
    let mut line = 1usize;
    let mut opened_at = 1usize;
    for c in csv_data.chars() {
        state = match (state, c) {
            (QuoteState::FieldStart, '"') => {
                opened_at = line;
                QuoteState::Quoted
            }
            (QuoteState::FieldStart | QuoteState::Unquoted, ',' | '\n' | '\r') => {
                QuoteState::FieldStart
            }
            (QuoteState::FieldStart | QuoteState::Unquoted, _) => QuoteState::Unquoted,
            (QuoteState::Quoted, '"') => QuoteState::QuoteInQuoted,
            (QuoteState::Quoted, _) => QuoteState::Quoted,
            (QuoteState::QuoteInQuoted, '"') => QuoteState::Quoted,
            (QuoteState::QuoteInQuoted, ',' | '\n' | '\r') => QuoteState::FieldStart,
            (QuoteState::QuoteInQuoted, other) => {
                return Err(ToolError::Csv(format!(
                    "unexpected character {other:?} after closing quote in line {line}"
                )));
            }
        };
        if c == '\n' {
            line += 1;
        }
    }
    if matches!(state, QuoteState::Quoted) {
        return Err(ToolError::Csv(format!(
            "unterminated quote opened in line {opened_at}"
        )));
    }
    Ok(())
}

/// Stem source for the output filename: the first CSV line.
pub(crate) fn stem_source(csv_data: &str) -> &str {
    csv_data.lines().next().unwrap_or(DEFAULT_STEM_SOURCE)
}

pub(crate) fn render_xlsx(table: &Table) -> Result<Vec<u8>> {
    let mut pkg = PackageWriter::new();
    pkg.add(
        "[Content_Types].xml",
        &content_types(&[
            (
                "/xl/workbook.xml".to_string(),
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml",
            ),
            (
                "/xl/worksheets/sheet1.xml".to_string(),
                "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml",
            ),
            (
                "/xl/styles.xml".to_string(),
                "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml",
            ),
        ]),
    )?;
    pkg.add("_rels/.rels", &root_relationships("xl/workbook.xml"))?;
    pkg.add(
        "xl/_rels/workbook.xml.rels",
        &relationships(&[
            Relationship {
                id: "rId1".to_string(),
                rel_type:
                    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet",
                target: "worksheets/sheet1.xml".to_string(),
            },
            Relationship {
                id: "rId2".to_string(),
                rel_type: "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles",
                target: "styles.xml".to_string(),
            },
        ]),
    )?;
    pkg.add(
        "xl/workbook.xml",
        &format!(
            r#"{XML_DECLARATION}<workbook xmlns="{NS_SPREADSHEET}" xmlns:r="{NS_RELATIONSHIPS}"><sheets><sheet name="{SHEET_NAME}" sheetId="1" r:id="rId1"/></sheets></workbook>"#
        ),
    )?;
    pkg.add("xl/styles.xml", &styles_xml())?;
    pkg.add("xl/worksheets/sheet1.xml", &sheet_xml(table))?;
    pkg.finish()
}

fn sheet_xml(table: &Table) -> String {
    let numeric = table.numeric_columns();
    let mut data = String::new();

    data.push_str(r#"<row r="1">"#);
    for (col, header) in table.headers.iter().enumerate() {
        data.push_str(&inline_string_cell(&cell_ref(col, 1), header, Some(1)));
    }
    data.push_str("</row>");

    for (idx, row) in table.rows.iter().enumerate() {
        let row_num = idx + 2;
        data.push_str(&format!(r#"<row r="{row_num}">"#));
        for (col, cell) in row.iter().enumerate() {
            let reference = cell_ref(col, row_num);
            let trimmed = cell.trim();
            if trimmed.is_empty() {
                continue;
            }
            match numeric.get(col).copied().unwrap_or(false).then(|| parse_number(trimmed)) {
                Some(Some(n)) => data.push_str(&format!(r#"<c r="{reference}"><v>{n}</v></c>"#)),
                _ => data.push_str(&inline_string_cell(&reference, cell, None)),
            }
        }
        data.push_str("</row>");
    }

    format!(
        r#"{XML_DECLARATION}<worksheet xmlns="{NS_SPREADSHEET}"><sheetData>{data}</sheetData></worksheet>"#
    )
}

fn inline_string_cell(reference: &str, value: &str, style: Option<u32>) -> String {
    let style_attr = style.map(|s| format!(r#" s="{s}""#)).unwrap_or_default();
    format!(
        r#"<c r="{reference}"{style_attr} t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
        xml_text(value)
    )
}

fn styles_xml() -> String {
    format!(
        r#"{XML_DECLARATION}<styleSheet xmlns="{NS_SPREADSHEET}"><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="2"><border><left/><right/><top/><bottom/><diagonal/></border><border><left style="thin"/><right style="thin"/><top style="thin"/><bottom style="thin"/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="1" xfId="0" applyFont="1" applyBorder="1"/></cellXfs></styleSheet>"#
    )
}

fn parse_number(cell: &str) -> Option<f64> {
    if !cell
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
    {
        return None;
    }
    cell.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Zero-based column, one-based row to an A1 reference.
fn cell_ref(col: usize, row: usize) -> String {
    let mut letters = Vec::new();
    let mut n = col + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.reverse();
    format!("{}{row}", letters.into_iter().collect::<String>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docgen::ooxml::test_support::read_part;

    #[test]
    fn parse_csv_reads_headers_and_quoted_fields() {
        let table = parse_csv("name,team\n\"Doe, Jane\",Finance\nRaj,IT\n").unwrap();
        assert_eq!(table.headers, vec!["name", "team"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][0], "Doe, Jane");
    }

    #[test]
    fn parse_csv_rejects_rows_longer_than_header() {
        let err = parse_csv("a,b\n1,2,3\n").expect_err("ragged row");
        assert!(matches!(err, ToolError::Csv(_)));
        assert!(err.to_string().contains("expected 2 fields"), "{err}");
    }

    #[test]
    fn parse_csv_pads_short_rows() {
        let table = parse_csv("a,b,c\n1\n4,5,6\n").unwrap();
        assert_eq!(table.rows[0], vec!["1", "", ""]);
        assert_eq!(table.rows[1], vec!["4", "5", "6"]);
    }

    #[test]
    fn parse_csv_rejects_unterminated_quote() {
        let err = parse_csv("name\n\"Jane\n").expect_err("open quote");
        assert!(matches!(err, ToolError::Csv(_)));
        assert!(err.to_string().contains("unterminated quote opened in line 2"), "{err}");
    }

    #[test]
    fn parse_csv_rejects_text_after_closing_quote() {
        let err = parse_csv("a,b\n\"x\"y,2\n").expect_err("trailing text");
        assert!(matches!(err, ToolError::Csv(_)));
        assert!(err.to_string().contains("after closing quote in line 2"), "{err}");
    }

    #[test]
    fn parse_csv_accepts_escaped_quotes_and_crlf() {
        let table = parse_csv("quote,n\r\n\"She said \"\"hi\"\"\",1\r\n").unwrap();
        assert_eq!(table.rows[0][0], "She said \"hi\"");
        assert_eq!(table.rows[0][1], "1");
    }

    #[test]
    fn parse_csv_rejects_empty_input() {
        let err = parse_csv("").expect_err("empty csv");
        assert!(err.to_string().contains("no columns"));
    }

    #[test]
    fn cell_refs_roll_over_after_z() {
        assert_eq!(cell_ref(0, 1), "A1");
        assert_eq!(cell_ref(25, 3), "Z3");
        assert_eq!(cell_ref(26, 2), "AA2");
        assert_eq!(cell_ref(701, 9), "ZZ9");
        assert_eq!(cell_ref(702, 9), "AAA9");
    }

    #[test]
    fn numeric_columns_are_written_as_numbers() {
        let table = parse_csv("item,qty,code\nPens,12,A1\nPads,3.5,7\n").unwrap();
        let bytes = render_xlsx(&table).unwrap();
        let sheet = read_part(&bytes, "xl/worksheets/sheet1.xml");
        assert!(sheet.contains(r#"<c r="B2"><v>12</v></c>"#));
        assert!(sheet.contains(r#"<c r="B3"><v>3.5</v></c>"#));
        // mixed column stays text
        assert!(sheet.contains(r#"<c r="C3" t="inlineStr"><is><t xml:space="preserve">7</t>"#));
        assert!(sheet.contains(r#"<c r="A1" s="1" t="inlineStr">"#));
    }

    #[test]
    fn stem_source_is_first_line() {
        assert_eq!(stem_source("Region,Sales\nEU,4\n"), "Region,Sales");
        assert_eq!(stem_source(""), DEFAULT_STEM_SOURCE);
    }
}
