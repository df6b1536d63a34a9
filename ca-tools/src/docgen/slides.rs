//! PowerPoint rendering against a fixed built-in template.
//!
//! Placeholder numbering follows the template: index 10 is the slide title and
//! index 0 is the body/content region. A slide's first string goes to the
//! title; the remaining strings are joined line by line into the body.

use super::fingerprint::{ContentFingerprint, Fingerprinter};
use super::ooxml::{
    NS_RELATIONSHIPS, PackageWriter, Relationship, XML_DECLARATION, content_types, relationships,
    root_relationships, xml_text,
};
use super::outcome::PartialFailure;
use crate::error::Result;
use serde::{Deserialize, Serialize};

pub(crate) const EXTENSION: &str = "pptx";
pub const TITLE_PLACEHOLDER_IDX: u32 = 10;
pub const BODY_PLACEHOLDER_IDX: u32 = 0;

const NS_DRAWING: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_PRESENTATION: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const REL_SLIDE_MASTER: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
const REL_SLIDE_LAYOUT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
const REL_SLIDE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
const REL_THEME: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
const SLIDE_CX: i64 = 12_192_000;
const SLIDE_CY: i64 = 6_858_000;
const MASTER_ID: u64 = 2_147_483_648;
const FIRST_SLIDE_ID: u64 = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slide {
    pub layout: i64,
    #[serde(default)]
    pub placeholders: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderRole {
    CenterTitle,
    Title,
    Subtitle,
    Body,
}

impl PlaceholderRole {
    fn ph_type(self) -> &'static str {
        match self {
            Self::CenterTitle => "ctrTitle",
            Self::Title => "title",
            Self::Subtitle => "subTitle",
            Self::Body => "body",
        }
    }

    fn font_size(self) -> u32 {
        match self {
            Self::CenterTitle => 4400,
            Self::Title => 3600,
            Self::Subtitle => 2400,
            Self::Body => 2000,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Frame {
    pub x: i64,
    pub y: i64,
    pub cx: i64,
    pub cy: i64,
}

#[derive(Debug, Clone)]
pub struct PlaceholderSpec {
    pub idx: u32,
    pub name: &'static str,
    pub role: PlaceholderRole,
    pub frame: Frame,
}

#[derive(Debug, Clone)]
pub struct SlideLayout {
    pub name: &'static str,
    pub placeholders: Vec<PlaceholderSpec>,
}

#[derive(Debug, Clone)]
pub struct SlideTemplate {
    layouts: Vec<SlideLayout>,
}

impl SlideTemplate {
    /// Layouts 0..=4: title slide, title and content, section header, title only, blank.
    pub fn built_in() -> Self {
        let title = |role, frame| PlaceholderSpec {
            idx: TITLE_PLACEHOLDER_IDX,
            name: "Title",
            role,
            frame,
        };
        let body = |name, role, frame| PlaceholderSpec {
            idx: BODY_PLACEHOLDER_IDX,
            name,
            role,
            frame,
        };
        let top_title = Frame {
            x: 838_200,
            y: 365_125,
            cx: 10_515_600,
            cy: 1_325_563,
        };

        Self {
            layouts: vec![
                SlideLayout {
                    name: "Title Slide",
                    placeholders: vec![
                        title(
                            PlaceholderRole::CenterTitle,
                            Frame {
                                x: 1_524_000,
                                y: 1_122_363,
                                cx: 9_144_000,
                                cy: 2_387_600,
                            },
                        ),
                        body(
                            "Subtitle",
                            PlaceholderRole::Subtitle,
                            Frame {
                                x: 1_524_000,
                                y: 3_602_038,
                                cx: 9_144_000,
                                cy: 1_655_762,
                            },
                        ),
                    ],
                },
                SlideLayout {
                    name: "Title and Content",
                    placeholders: vec![
                        title(PlaceholderRole::Title, top_title),
                        body(
                            "Content",
                            PlaceholderRole::Body,
                            Frame {
                                x: 838_200,
                                y: 1_825_625,
                                cx: 10_515_600,
                                cy: 4_351_338,
                            },
                        ),
                    ],
                },
                SlideLayout {
                    name: "Section Header",
                    placeholders: vec![
                        title(
                            PlaceholderRole::Title,
                            Frame {
                                x: 831_850,
                                y: 1_709_738,
                                cx: 10_515_600,
                                cy: 2_852_737,
                            },
                        ),
                        body(
                            "Text",
                            PlaceholderRole::Body,
                            Frame {
                                x: 831_850,
                                y: 4_589_463,
                                cx: 10_515_600,
                                cy: 1_500_187,
                            },
                        ),
                    ],
                },
                SlideLayout {
                    name: "Title Only",
                    placeholders: vec![title(PlaceholderRole::Title, top_title)],
                },
                SlideLayout {
                    name: "Blank",
                    placeholders: Vec::new(),
                },
            ],
        }
    }

    pub fn layout(&self, index: i64) -> Option<&SlideLayout> {
        usize::try_from(index).ok().and_then(|i| self.layouts.get(i))
    }
}

impl Default for SlideTemplate {
    fn default() -> Self {
        Self::built_in()
    }
}

/// Layout indices and every placeholder string, framed and in order.
pub(crate) fn fingerprint(slides: &[Slide]) -> ContentFingerprint {
    let mut fp = Fingerprinter::new(EXTENSION).number(slides.len() as i64);
    for slide in slides {
        fp = fp
            .number(slide.layout)
            .number(slide.placeholders.len() as i64);
        for text in &slide.placeholders {
            fp = fp.field(text);
        }
    }
    fp.finish()
}

pub(crate) fn stem_source(slides: &[Slide]) -> String {
    slides
        .iter()
        .map(|s| s.placeholders.join(" "))
        .collect::<Vec<_>>()
        .join(" ")
}

type Fill = std::result::Result<String, String>;

/// Text a placeholder should receive, the reason it gets none, or `None` for
/// placeholders the mapping does not touch.
pub(crate) fn placeholder_text(idx: u32, placeholders: &[String]) -> Option<Fill> {
    match idx {
        TITLE_PLACEHOLDER_IDX => Some(
            placeholders
                .first()
                .cloned()
                .ok_or_else(|| "no title text supplied".to_string()),
        ),
        BODY_PLACEHOLDER_IDX => Some(if placeholders.len() > 1 {
            Ok(placeholders[1..].join("\n"))
        } else {
            Err("no content text supplied".to_string())
        }),
        _ => None,
    }
}

struct PlannedSlide<'t> {
    layout_index: usize,
    fills: Vec<(&'t PlaceholderSpec, String)>,
}

fn plan_slides<'t>(
    template: &'t SlideTemplate,
    slides: &[Slide],
) -> (Vec<PlannedSlide<'t>>, Vec<PartialFailure>) {
    let mut planned = Vec::new();
    let mut failures = Vec::new();

    for (slide_idx, slide) in slides.iter().enumerate() {
        let Some(layout) = template.layout(slide.layout) else {
            let reason = format!(
                "layout index {} out of range (template has {} layouts)",
                slide.layout,
                template.layouts.len()
            );
            tracing::warn!(slide = slide_idx, layout = slide.layout, %reason, "slide skipped");
            failures.push(PartialFailure::SlideSkipped {
                slide: slide_idx,
                reason,
            });
            continue;
        };

        let mut fills = Vec::new();
        for ph in &layout.placeholders {
            match placeholder_text(ph.idx, &slide.placeholders) {
                Some(Ok(text)) => fills.push((ph, text)),
                Some(Err(reason)) => {
                    tracing::warn!(
                        slide = slide_idx,
                        placeholder = ph.idx,
                        placeholder_name = ph.name,
                        %reason,
                        "failed to set placeholder text"
                    );
                    failures.push(PartialFailure::PlaceholderSkipped {
                        slide: slide_idx,
                        placeholder: ph.idx,
                        reason,
                    });
                }
                None => {}
            }
        }
        planned.push(PlannedSlide {
            layout_index: slide.layout as usize,
            fills,
        });
    }
    (planned, failures)
}

pub(crate) struct RenderedSlides {
    pub bytes: Vec<u8>,
    pub slides_rendered: usize,
    pub partial_failures: Vec<PartialFailure>,
}

pub(crate) fn render_pptx(template: &SlideTemplate, slides: &[Slide]) -> Result<RenderedSlides> {
    for (idx, layout) in template.layouts.iter().enumerate() {
        tracing::debug!(
            layout = idx,
            layout_name = layout.name,
            placeholders = ?layout.placeholders.iter().map(|p| (p.idx, p.name)).collect::<Vec<_>>(),
            "template layout"
        );
    }

    let (planned, partial_failures) = plan_slides(template, slides);
    let layout_count = template.layouts.len();

    let mut pkg = PackageWriter::new();

    let mut overrides = vec![
        (
            "/ppt/presentation.xml".to_string(),
            "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml",
        ),
        (
            "/ppt/slideMasters/slideMaster1.xml".to_string(),
            "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml",
        ),
        (
            "/ppt/theme/theme1.xml".to_string(),
            "application/vnd.openxmlformats-officedocument.theme+xml",
        ),
    ];
    for n in 1..=layout_count {
        overrides.push((
            format!("/ppt/slideLayouts/slideLayout{n}.xml"),
            "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml",
        ));
    }
    for n in 1..=planned.len() {
        overrides.push((
            format!("/ppt/slides/slide{n}.xml"),
            "application/vnd.openxmlformats-officedocument.presentationml.slide+xml",
        ));
    }
    pkg.add("[Content_Types].xml", &content_types(&overrides))?;
    pkg.add("_rels/.rels", &root_relationships("ppt/presentation.xml"))?;

    // presentation.xml: rId1 master, rId2 theme, rId3.. slides
    let mut pres_rels = vec![
        Relationship {
            id: "rId1".to_string(),
            rel_type: REL_SLIDE_MASTER,
            target: "slideMasters/slideMaster1.xml".to_string(),
        },
        Relationship {
            id: "rId2".to_string(),
            rel_type: REL_THEME,
            target: "theme/theme1.xml".to_string(),
        },
    ];
    for n in 1..=planned.len() {
        pres_rels.push(Relationship {
            id: format!("rId{}", n + 2),
            rel_type: REL_SLIDE,
            target: format!("slides/slide{n}.xml"),
        });
    }
    pkg.add("ppt/_rels/presentation.xml.rels", &relationships(&pres_rels))?;
    pkg.add("ppt/presentation.xml", &presentation_xml(planned.len()))?;

    let mut master_rels: Vec<Relationship<'_>> = (1..=layout_count)
        .map(|n| Relationship {
            id: format!("rId{n}"),
            rel_type: REL_SLIDE_LAYOUT,
            target: format!("../slideLayouts/slideLayout{n}.xml"),
        })
        .collect();
    master_rels.push(Relationship {
        id: format!("rId{}", layout_count + 1),
        rel_type: REL_THEME,
        target: "../theme/theme1.xml".to_string(),
    });
    pkg.add(
        "ppt/slideMasters/_rels/slideMaster1.xml.rels",
        &relationships(&master_rels),
    )?;
    pkg.add("ppt/slideMasters/slideMaster1.xml", &master_xml(layout_count))?;
    pkg.add("ppt/theme/theme1.xml", &theme_xml())?;

    for (idx, layout) in template.layouts.iter().enumerate() {
        let n = idx + 1;
        pkg.add(
            &format!("ppt/slideLayouts/_rels/slideLayout{n}.xml.rels"),
            &relationships(&[Relationship {
                id: "rId1".to_string(),
                rel_type: REL_SLIDE_MASTER,
                target: "../slideMasters/slideMaster1.xml".to_string(),
            }]),
        )?;
        pkg.add(
            &format!("ppt/slideLayouts/slideLayout{n}.xml"),
            &layout_xml(layout),
        )?;
    }

    for (idx, slide) in planned.iter().enumerate() {
        let n = idx + 1;
        pkg.add(
            &format!("ppt/slides/_rels/slide{n}.xml.rels"),
            &relationships(&[Relationship {
                id: "rId1".to_string(),
                rel_type: REL_SLIDE_LAYOUT,
                target: format!("../slideLayouts/slideLayout{}.xml", slide.layout_index + 1),
            }]),
        )?;
        pkg.add(&format!("ppt/slides/slide{n}.xml"), &slide_xml(slide))?;
    }

    Ok(RenderedSlides {
        bytes: pkg.finish()?,
        slides_rendered: planned.len(),
        partial_failures,
    })
}

fn namespaces() -> String {
    format!(r#"xmlns:a="{NS_DRAWING}" xmlns:r="{NS_RELATIONSHIPS}" xmlns:p="{NS_PRESENTATION}""#)
}

fn group_header() -> &'static str {
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#
}

fn presentation_xml(slide_count: usize) -> String {
    let slide_ids = if slide_count == 0 {
        String::new()
    } else {
        let ids: String = (0..slide_count)
            .map(|i| {
                format!(
                    r#"<p:sldId id="{}" r:id="rId{}"/>"#,
                    FIRST_SLIDE_ID + i as u64,
                    i + 3
                )
            })
            .collect();
        format!("<p:sldIdLst>{ids}</p:sldIdLst>")
    };
    format!(
        r#"{XML_DECLARATION}<p:presentation {}><p:sldMasterIdLst><p:sldMasterId id="{MASTER_ID}" r:id="rId1"/></p:sldMasterIdLst>{slide_ids}<p:sldSz cx="{SLIDE_CX}" cy="{SLIDE_CY}"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
        namespaces()
    )
}

fn master_xml(layout_count: usize) -> String {
    let layout_ids: String = (1..=layout_count)
        .map(|n| {
            format!(
                r#"<p:sldLayoutId id="{}" r:id="rId{n}"/>"#,
                MASTER_ID + n as u64
            )
        })
        .collect();
    format!(
        r#"{XML_DECLARATION}<p:sldMaster {}><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree>{}</p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst>{layout_ids}</p:sldLayoutIdLst></p:sldMaster>"#,
        namespaces(),
        group_header()
    )
}

fn layout_xml(layout: &SlideLayout) -> String {
    let shapes: String = layout
        .placeholders
        .iter()
        .enumerate()
        .map(|(i, ph)| placeholder_shape(i as u32 + 2, ph, None))
        .collect();
    format!(
        r#"{XML_DECLARATION}<p:sldLayout {} preserve="1"><p:cSld name="{}"><p:spTree>{}{shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#,
        namespaces(),
        xml_text(layout.name),
        group_header()
    )
}

fn slide_xml(slide: &PlannedSlide<'_>) -> String {
    let shapes: String = slide
        .fills
        .iter()
        .enumerate()
        .map(|(i, (ph, text))| placeholder_shape(i as u32 + 2, ph, Some(text)))
        .collect();
    format!(
        r#"{XML_DECLARATION}<p:sld {}><p:cSld><p:spTree>{}{shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
        namespaces(),
        group_header()
    )
}

fn placeholder_shape(shape_id: u32, ph: &PlaceholderSpec, text: Option<&str>) -> String {
    let paragraphs = match text {
        Some(text) => text
            .split('\n')
            .map(|line| {
                format!(
                    r#"<a:p><a:r><a:rPr lang="en-US" sz="{}" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
                    ph.role.font_size(),
                    xml_text(line)
                )
            })
            .collect::<String>(),
        None => r#"<a:p><a:endParaRPr lang="en-US"/></a:p>"#.to_string(),
    };
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{shape_id}" name="{} {}"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="{}" idx="{}"/></p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm></p:spPr><p:txBody><a:bodyPr/><a:lstStyle/>{paragraphs}</p:txBody></p:sp>"#,
        ph.name,
        ph.idx,
        ph.role.ph_type(),
        ph.idx,
        ph.frame.x,
        ph.frame.y,
        ph.frame.cx,
        ph.frame.cy,
    )
}

fn theme_xml() -> String {
    let accents = [
        ("accent1", "4472C4"),
        ("accent2", "ED7D31"),
        ("accent3", "A5A5A5"),
        ("accent4", "FFC000"),
        ("accent5", "5B9BD5"),
        ("accent6", "70AD47"),
        ("hlink", "0563C1"),
        ("folHlink", "954F72"),
    ];
    let accent_xml: String = accents
        .iter()
        .map(|(name, rgb)| format!(r#"<a:{name}><a:srgbClr val="{rgb}"/></a:{name}>"#))
        .collect();
    let solid = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    let line = format!(r#"<a:ln w="6350">{solid}</a:ln>"#);
    let effect = "<a:effectStyle><a:effectLst/></a:effectStyle>";
    format!(
        r#"{XML_DECLARATION}<a:theme xmlns:a="{NS_DRAWING}" name="Company"><a:themeElements><a:clrScheme name="Company"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="1F3864"/></a:dk2><a:lt2><a:srgbClr val="E7E6E6"/></a:lt2>{accent_xml}</a:clrScheme><a:fontScheme name="Company"><a:majorFont><a:latin typeface="Calibri Light"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Company"><a:fillStyleLst>{solid}{solid}{solid}</a:fillStyleLst><a:lnStyleLst>{line}{line}{line}</a:lnStyleLst><a:effectStyleLst>{effect}{effect}{effect}</a:effectStyleLst><a:bgFillStyleLst>{solid}{solid}{solid}</a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docgen::ooxml::test_support::{part_names, read_part};

    fn slide(layout: i64, texts: &[&str]) -> Slide {
        Slide {
            layout,
            placeholders: texts.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn title_goes_to_idx_10_and_content_to_idx_0() {
        let texts = vec!["Title".to_string(), "Content".to_string()];
        assert_eq!(
            placeholder_text(TITLE_PLACEHOLDER_IDX, &texts),
            Some(Ok("Title".to_string()))
        );
        assert_eq!(
            placeholder_text(BODY_PLACEHOLDER_IDX, &texts),
            Some(Ok("Content".to_string()))
        );
        assert_eq!(placeholder_text(13, &texts), None);
    }

    #[test]
    fn extra_strings_are_joined_into_the_body() {
        let texts = vec!["Agenda".to_string(), "Intro".to_string(), "Q&A".to_string()];
        assert_eq!(
            placeholder_text(BODY_PLACEHOLDER_IDX, &texts),
            Some(Ok("Intro\nQ&A".to_string()))
        );
    }

    #[test]
    fn renders_two_slides_with_mapped_placeholders() {
        let template = SlideTemplate::built_in();
        let slides = vec![
            slide(0, &["Title", "Date"]),
            slide(1, &["Title", "Content"]),
        ];
        let rendered = render_pptx(&template, &slides).unwrap();
        assert_eq!(rendered.slides_rendered, 2);
        assert!(rendered.partial_failures.is_empty());

        let second = read_part(&rendered.bytes, "ppt/slides/slide2.xml");
        let title_at = second.find(r#"idx="10""#).expect("title placeholder");
        let body_at = second.find(r#"idx="0""#).expect("body placeholder");
        let title_text = second.find("<a:t>Title</a:t>").unwrap();
        let body_text = second.find("<a:t>Content</a:t>").unwrap();
        assert!(title_at < title_text && title_text < body_at);
        assert!(body_at < body_text);

        let rels = read_part(&rendered.bytes, "ppt/slides/_rels/slide2.xml.rels");
        assert!(rels.contains("slideLayout2.xml"));
    }

    #[test]
    fn out_of_range_layout_skips_only_that_slide() {
        let template = SlideTemplate::built_in();
        let slides = vec![
            slide(1, &["Kept", "Body"]),
            slide(42, &["Dropped", "Body"]),
            slide(-1, &["Also dropped"]),
            slide(3, &["Also kept"]),
        ];
        let rendered = render_pptx(&template, &slides).unwrap();
        assert_eq!(rendered.slides_rendered, 2);
        assert_eq!(rendered.partial_failures.len(), 2);
        assert!(matches!(
            rendered.partial_failures[0],
            PartialFailure::SlideSkipped { slide: 1, .. }
        ));

        let names = part_names(&rendered.bytes);
        assert!(names.iter().any(|n| n == "ppt/slides/slide2.xml"));
        assert!(!names.iter().any(|n| n == "ppt/slides/slide3.xml"));
        let second = read_part(&rendered.bytes, "ppt/slides/slide2.xml");
        assert!(second.contains("Also kept"));
        let pres = read_part(&rendered.bytes, "ppt/presentation.xml");
        assert_eq!(pres.matches("<p:sldId ").count(), 2);
    }

    #[test]
    fn missing_body_text_is_reported_not_fatal() {
        let template = SlideTemplate::built_in();
        let rendered = render_pptx(&template, &[slide(1, &["Only a title"])]).unwrap();
        assert_eq!(rendered.slides_rendered, 1);
        assert_eq!(
            rendered.partial_failures,
            vec![PartialFailure::PlaceholderSkipped {
                slide: 0,
                placeholder: BODY_PLACEHOLDER_IDX,
                reason: "no content text supplied".to_string(),
            }]
        );
        let xml = read_part(&rendered.bytes, "ppt/slides/slide1.xml");
        assert!(xml.contains("Only a title"));
    }

    #[test]
    fn fingerprint_covers_layout_and_boundaries() {
        let a = fingerprint(&[slide(0, &["A", "B"])]);
        let b = fingerprint(&[slide(1, &["A", "B"])]);
        let c = fingerprint(&[slide(0, &["A B"])]);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, fingerprint(&[slide(0, &["A", "B"])]));
    }

    #[test]
    fn stem_source_joins_all_text() {
        let slides = vec![slide(0, &["Kickoff", "Monday"]), slide(1, &["Goals"])];
        assert_eq!(stem_source(&slides), "Kickoff Monday Goals");
    }
}
