//! Single-page bonafide certificate PDFs.

use super::fingerprint::{ContentFingerprint, Fingerprinter};
use super::helvetica::{Face, encode_win_ansi, text_width, wrap_text};
use super::naming;
use crate::error::{Result, ToolError};
use chrono::NaiveDate;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, StringFormat, dictionary};
use rand::Rng;
use serde::Deserialize;

pub(crate) const EXTENSION: &str = "pdf";
pub(crate) const FILENAME_PREFIX: &str = "Bonafide";
pub const TITLE: &str = "BONAFIDE CERTIFICATE";
const WATERMARK: &str = "BONAFIDE";
const ISSUE_DATE_FORMAT: &str = "%d %B %Y";

// A4 in points.
const PAGE_W: f32 = 595.0;
const PAGE_H: f32 = 842.0;
const MARGIN_X: f32 = 70.0;
const BODY_SIZE: f32 = 13.0;
const BODY_MIN_SIZE: f32 = 8.0;
const BODY_LEADING_RATIO: f32 = 1.6;
const BODY_TOP: f32 = 600.0;
// Lowest body baseline; the date and signature block sit below it.
const BODY_FLOOR: f32 = 230.0;

const NAVY: (f32, f32, f32) = (0.11, 0.20, 0.38);

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CertificateRequest {
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub issue_date: Option<String>,
    #[serde(default)]
    pub certificate_id: Option<String>,
}

/// A request with every optional field resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRecord {
    pub name: String,
    pub program: String,
    pub issue_date: String,
    pub certificate_id: String,
}

impl CertificateRecord {
    /// Blank or missing date/id fall back to `today` and a fresh id.
    pub fn resolve<R: Rng + ?Sized>(
        request: CertificateRequest,
        today: NaiveDate,
        rng: &mut R,
    ) -> Result<Self> {
        let name = request.name.trim().to_string();
        let program = request.program.trim().to_string();
        if name.is_empty() {
            return Err(ToolError::InvalidArguments(
                "certificate name must not be empty".to_string(),
            ));
        }
        if program.is_empty() {
            return Err(ToolError::InvalidArguments(
                "certificate program must not be empty".to_string(),
            ));
        }

        let issue_date = non_blank(request.issue_date)
            .unwrap_or_else(|| today.format(ISSUE_DATE_FORMAT).to_string());
        let certificate_id = non_blank(request.certificate_id)
            .unwrap_or_else(|| naming::certificate_id(today, rng));

        Ok(Self {
            name,
            program,
            issue_date,
            certificate_id,
        })
    }

    pub fn fingerprint(&self) -> ContentFingerprint {
        Fingerprinter::new(EXTENSION)
            .field(&self.name)
            .field(&self.program)
            .field(&self.issue_date)
            .field(&self.certificate_id)
            .finish()
    }

    pub fn body_text(&self) -> String {
        format!(
            "This is to certify that {} is a bonafide member of {}. This certificate is issued on {} at the request of the individual for whatever official purpose it may serve.",
            self.name, self.program, self.issue_date
        )
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Collects page drawing operations.
struct Canvas {
    ops: Vec<Operation>,
}

impl Canvas {
    fn new() -> Self {
        Self { ops: Vec::new() }
    }

    fn op(&mut self, operator: &str, operands: Vec<Object>) {
        self.ops.push(Operation::new(operator, operands));
    }

    fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, width: f32, rgb: (f32, f32, f32)) {
        self.op("q", vec![]);
        self.op("w", vec![width.into()]);
        self.op("RG", vec![rgb.0.into(), rgb.1.into(), rgb.2.into()]);
        self.op("re", vec![x.into(), y.into(), w.into(), h.into()]);
        self.op("S", vec![]);
        self.op("Q", vec![]);
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, rgb: (f32, f32, f32)) {
        self.op("q", vec![]);
        self.op("rg", vec![rgb.0.into(), rgb.1.into(), rgb.2.into()]);
        self.op("re", vec![x.into(), y.into(), w.into(), h.into()]);
        self.op("f", vec![]);
        self.op("Q", vec![]);
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), width: f32) {
        self.op("q", vec![]);
        self.op("w", vec![width.into()]);
        self.op("m", vec![from.0.into(), from.1.into()]);
        self.op("l", vec![to.0.into(), to.1.into()]);
        self.op("S", vec![]);
        self.op("Q", vec![]);
    }

    /// Text with an explicit text matrix `[a b c d x y]`.
    fn text_with_matrix(&mut self, face: Face, size: f32, gray: f32, matrix: [f32; 6], text: &str) {
        self.op("BT", vec![]);
        self.op("g", vec![gray.into()]);
        self.op("Tf", vec![face.resource_name().into(), size.into()]);
        self.op("Tm", matrix.iter().map(|v| (*v).into()).collect());
        self.op(
            "Tj",
            vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
        );
        self.op("ET", vec![]);
    }

    fn text(&mut self, face: Face, size: f32, gray: f32, x: f32, y: f32, text: &str) {
        self.text_with_matrix(face, size, gray, [1.0, 0.0, 0.0, 1.0, x, y], text);
    }

    fn centered_text(&mut self, face: Face, size: f32, gray: f32, y: f32, text: &str) {
        let x = (PAGE_W - text_width(face, text, size)) / 2.0;
        self.text(face, size, gray, x, y, text);
    }
}

pub(crate) fn render_certificate(record: &CertificateRecord, issuer: &str) -> Result<Vec<u8>> {
    let mut canvas = Canvas::new();

    // Watermark first so everything else paints over it.
    let (sin, cos) = std::f32::consts::FRAC_PI_4.sin_cos();
    let mark_size = 84.0;
    let mark_w = text_width(Face::Bold, WATERMARK, mark_size);
    let start_x = PAGE_W / 2.0 - (mark_w / 2.0) * cos;
    let start_y = PAGE_H / 2.0 - (mark_w / 2.0) * sin - 40.0;
    canvas.text_with_matrix(
        Face::Bold,
        mark_size,
        0.93,
        [cos, sin, -sin, cos, start_x, start_y],
        WATERMARK,
    );

    canvas.stroke_rect(20.0, 20.0, PAGE_W - 40.0, PAGE_H - 40.0, 3.0, NAVY);
    canvas.stroke_rect(30.0, 30.0, PAGE_W - 60.0, PAGE_H - 60.0, 1.0, NAVY);

    canvas.fill_rect(30.0, PAGE_H - 110.0, PAGE_W - 60.0, 80.0, NAVY);
    canvas.centered_text(Face::Bold, 22.0, 1.0, PAGE_H - 70.0, issuer);
    canvas.centered_text(Face::Regular, 10.0, 1.0, PAGE_H - 92.0, "Human Resources");

    canvas.centered_text(Face::Bold, 26.0, 0.0, 690.0, TITLE);
    canvas.line((MARGIN_X + 90.0, 675.0), (PAGE_W - MARGIN_X - 90.0, 675.0), 1.0);

    let body = layout_body(&record.body_text())?;
    let mut y = BODY_TOP;
    for line in &body.lines {
        canvas.text(Face::Regular, body.size, 0.1, MARGIN_X, y, line);
        y -= body.leading;
    }

    canvas.text(
        Face::Regular,
        11.0,
        0.1,
        MARGIN_X,
        200.0,
        &format!("Date: {}", record.issue_date),
    );
    let sig_left = PAGE_W - MARGIN_X - 160.0;
    canvas.line((sig_left, 210.0), (PAGE_W - MARGIN_X, 210.0), 0.8);
    canvas.text(Face::Bold, 11.0, 0.1, sig_left, 195.0, "Authorized Signatory");
    canvas.text(Face::Regular, 10.0, 0.3, sig_left, 180.0, issuer);

    canvas.centered_text(
        Face::Regular,
        9.0,
        0.35,
        45.0,
        &format!("Certificate ID: {}", record.certificate_id),
    );

    build_document(canvas, record)
}

struct BodyLayout {
    size: f32,
    leading: f32,
    lines: Vec<String>,
}

impl BodyLayout {
    fn last_baseline(&self) -> f32 {
        BODY_TOP - self.lines.len().saturating_sub(1) as f32 * self.leading
    }
}

/// Wraps the body at the largest size, in half-point steps, whose last line
/// stays above the signature block.
fn layout_body(text: &str) -> Result<BodyLayout> {
    let budget = PAGE_W - 2.0 * MARGIN_X;
    let mut size = BODY_SIZE;
    while size >= BODY_MIN_SIZE {
        let layout = BodyLayout {
            size,
            leading: size * BODY_LEADING_RATIO,
            lines: wrap_text(Face::Regular, text, size, budget),
        };
        if layout.last_baseline() >= BODY_FLOOR {
            return Ok(layout);
        }
        size -= 0.5;
    }
    Err(ToolError::InvalidArguments(
        "certificate text is too long to fit on one page".to_string(),
    ))
}

fn build_document(canvas: Canvas, record: &CertificateRecord) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = lopdf::Dictionary::new();
    for face in [Face::Regular, Face::Bold] {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => face.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(face.resource_name(), font_id);
    }
    let resources_id = doc.add_object(dictionary! {
        "Font" => fonts,
    });

    let content = Content {
        operations: canvas.ops,
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_W.into(), PAGE_H.into()],
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(encode_win_ansi(TITLE), StringFormat::Literal),
        "Subject" => Object::String(encode_win_ansi(&record.certificate_id), StringFormat::Literal),
        "Author" => Object::String(encode_win_ansi(&record.name), StringFormat::Literal),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

pub(crate) fn filename_stem(record: &CertificateRecord, max_len: usize) -> String {
    format!(
        "{FILENAME_PREFIX}_{}",
        naming::sanitize_stem(&record.name, max_len)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, program: &str) -> CertificateRequest {
        CertificateRequest {
            name: name.to_string(),
            program: program.to_string(),
            issue_date: None,
            certificate_id: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()
    }

    #[test]
    fn resolve_fills_defaults() {
        let mut rng = rand::thread_rng();
        let record =
            CertificateRecord::resolve(request("Jane Doe", "Data Platform"), today(), &mut rng)
                .unwrap();
        assert_eq!(record.issue_date, "14 October 2026");
        assert!(record.certificate_id.starts_with("BON-20261014-"));
    }

    #[test]
    fn resolve_keeps_explicit_fields_and_treats_blank_as_missing() {
        let mut req = request("  Jane Doe ", "Data Platform");
        req.issue_date = Some("1 March 2026".to_string());
        req.certificate_id = Some("   ".to_string());
        let record = CertificateRecord::resolve(req, today(), &mut rand::thread_rng()).unwrap();
        assert_eq!(record.name, "Jane Doe");
        assert_eq!(record.issue_date, "1 March 2026");
        assert!(record.certificate_id.starts_with("BON-"));
    }

    #[test]
    fn resolve_requires_name_and_program() {
        let err = CertificateRecord::resolve(request(" ", "X"), today(), &mut rand::thread_rng())
            .expect_err("blank name");
        assert!(err.to_string().contains("name must not be empty"));
        let err = CertificateRecord::resolve(request("Jane", ""), today(), &mut rand::thread_rng())
            .expect_err("blank program");
        assert!(err.to_string().contains("program must not be empty"));
    }

    #[test]
    fn fingerprint_covers_every_field() {
        let base = CertificateRecord {
            name: "Jane".to_string(),
            program: "Ops".to_string(),
            issue_date: "1 March 2026".to_string(),
            certificate_id: "BON-20260301-AAAAAA".to_string(),
        };
        let mut other_id = base.clone();
        other_id.certificate_id = "BON-20260301-AAAAAB".to_string();
        let mut other_date = base.clone();
        other_date.issue_date = "2 March 2026".to_string();

        assert_eq!(base.fingerprint(), base.clone().fingerprint());
        assert_ne!(base.fingerprint(), other_id.fingerprint());
        assert_ne!(base.fingerprint(), other_date.fingerprint());
    }

    #[test]
    fn rendered_pdf_is_a_single_page() {
        let record = CertificateRecord {
            name: "Jane Doe".to_string(),
            program: "the Platform Engineering team".to_string(),
            issue_date: "14 October 2026".to_string(),
            certificate_id: "BON-20261014-Q7X2KD".to_string(),
        };
        let bytes = render_certificate(&record, "Company Assistant").unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    fn record_with_program(program: String) -> CertificateRecord {
        CertificateRecord {
            name: "Jane Doe".to_string(),
            program,
            issue_date: "14 October 2026".to_string(),
            certificate_id: "BON-20261014-Q7X2KD".to_string(),
        }
    }

    #[test]
    fn short_body_keeps_full_size() {
        let record = record_with_program("Data Platform".to_string());
        let body = layout_body(&record.body_text()).unwrap();
        assert_eq!(body.size, BODY_SIZE);
    }

    #[test]
    fn long_body_shrinks_above_signature_block() {
        let program = (0..40)
            .map(|i| format!("Department of Applied Research Working Group {i:02}"))
            .collect::<Vec<_>>()
            .join(" ");
        assert!(program.len() > 40 * 45);
        let record = record_with_program(program);

        let body = layout_body(&record.body_text()).unwrap();
        assert!(body.size < BODY_SIZE);
        assert!(body.last_baseline() > 215.0, "{}", body.last_baseline());
        assert!(render_certificate(&record, "Company Assistant").is_ok());
    }

    #[test]
    fn body_that_cannot_fit_is_rejected() {
        let record = record_with_program("Operations ".repeat(2000));
        let err = render_certificate(&record, "Company Assistant").expect_err("too long");
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn filename_stem_uses_sanitized_name() {
        let record = CertificateRecord {
            name: "Dr. Jane O'Neil".to_string(),
            program: "Ops".to_string(),
            issue_date: "x".to_string(),
            certificate_id: "y".to_string(),
        };
        assert_eq!(filename_stem(&record, 50), "Bonafide_Dr_Jane_ONeil");
    }
}
