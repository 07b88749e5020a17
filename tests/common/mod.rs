//! Shared fixtures: in-memory decks, a scripted converter and a fake renderer.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{DynamicImage, Rgb, RgbImage};
use quick_xml::events::Event;
use quick_xml::Reader;
use slide_visuals::{DeckConverter, PageRenderer, RenderedPages, SlideVisualsError};
use std::io::{Cursor, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

// ── Decks ────────────────────────────────────────────────────────────────────

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

pub const TITLE: &str = r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:t>Agenda</a:t></a:r></a:p></p:txBody></p:sp>"#;
pub const BODY: &str = r#"<p:sp><p:nvSpPr><p:cNvPr id="3" name="Content Placeholder 2"/><p:cNvSpPr/><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#;
pub const TEXT_BOX: &str = r#"<p:sp><p:nvSpPr><p:cNvPr id="4" name="TextBox 3"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:sp>"#;
pub const ARROW: &str = r#"<p:sp><p:nvSpPr><p:cNvPr id="5" name="Right Arrow 4"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr><a:prstGeom prst="rightArrow"><a:avLst/></a:prstGeom></p:spPr></p:sp>"#;
pub const PICTURE: &str = r#"<p:pic><p:nvPicPr><p:cNvPr id="6" name="Picture 5"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="rId2"/></p:blipFill><p:spPr/></p:pic>"#;
pub const CHART: &str = r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="7" name="Chart 6"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr><p:xfrm/><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/chart"/></a:graphic></p:graphicFrame>"#;
pub const TABLE: &str = r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="8" name="Table 7"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr><p:xfrm/><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl/></a:graphicData></a:graphic></p:graphicFrame>"#;
pub const CONNECTOR: &str = r#"<p:cxnSp><p:nvCxnSpPr><p:cNvPr id="9" name="Straight Connector 8"/><p:cNvCxnSpPr/><p:nvPr/></p:nvCxnSpPr><p:spPr><a:prstGeom prst="line"/></p:spPr></p:cxnSp>"#;

pub fn group(children: &str) -> String {
    format!(
        r#"<p:grpSp><p:nvGrpSpPr><p:cNvPr id="20" name="Group 19"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{children}</p:grpSp>"#
    )
}

/// Build a `.pptx` whose slides hold the given shape-tree contents, in order.
pub fn pptx(slides: &[&str]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    let mut put = |name: &str, body: String| {
        writer.start_file(name, options).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    };

    put(
        "[Content_Types].xml",
        r#"<?xml version="1.0"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#.to_string(),
    );
    put(
        "_rels/.rels",
        r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="ppt/presentation.xml"/></Relationships>"#.to_string(),
    );

    let mut ids = String::new();
    let mut rels = String::new();
    for i in 0..slides.len() {
        ids.push_str(&format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, i + 10));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide{}.xml"/>"#,
            i + 10,
            i + 1
        ));
    }
    put(
        "ppt/presentation.xml",
        format!(r#"<?xml version="1.0"?><p:presentation {NS}><p:sldIdLst>{ids}</p:sldIdLst></p:presentation>"#),
    );
    put(
        "ppt/_rels/presentation.xml.rels",
        format!(r#"<?xml version="1.0"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#),
    );

    for (i, shapes) in slides.iter().enumerate() {
        put(
            &format!("ppt/slides/slide{}.xml", i + 1),
            format!(
                r#"<?xml version="1.0"?><p:sld {NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{shapes}</p:spTree></p:cSld></p:sld>"#
            ),
        );
    }
    drop(put);
    writer.finish().unwrap().into_inner()
}

/// Seven slides; 2, 4, 5 and 7 carry visual shapes.
pub fn mixed_deck() -> Vec<u8> {
    let grouped = group(&format!("{TEXT_BOX}{TEXT_BOX}"));
    pptx(&[
        &format!("{TITLE}{BODY}"),
        &format!("{TITLE}{PICTURE}"),
        &format!("{TITLE}{TEXT_BOX}{CONNECTOR}"),
        &format!("{TITLE}{CHART}{TABLE}"),
        &grouped,
        TEXT_BOX,
        ARROW,
    ])
}

pub const MIXED_DECK_VISUAL_SLIDES: [usize; 4] = [2, 4, 5, 7];

/// Three text-only slides.
pub fn text_only_deck() -> Vec<u8> {
    pptx(&[TITLE, &format!("{TITLE}{BODY}"), TEXT_BOX])
}

// ── Converter ────────────────────────────────────────────────────────────────

pub enum Reply {
    Pdf,
    Status(u16, &'static str),
}

/// Converter that answers from a script and counts its calls.
pub struct ScriptedConverter {
    reply: Reply,
    pub calls: AtomicUsize,
    pub last_name: Mutex<Option<String>>,
}

impl ScriptedConverter {
    pub fn ok() -> Self {
        Self::with(Reply::Pdf)
    }

    pub fn failing(status: u16, body: &'static str) -> Self {
        Self::with(Reply::Status(status, body))
    }

    fn with(reply: Reply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_name: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeckConverter for ScriptedConverter {
    async fn convert(&self, deck: &[u8], file_name: &str) -> Result<Vec<u8>, SlideVisualsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_name.lock().unwrap() = Some(file_name.to_string());
        assert!(deck.starts_with(b"PK\x03\x04"), "converter got a non-zip body");
        match self.reply {
            Reply::Pdf => Ok(b"%PDF-1.7\n% fake\n".to_vec()),
            Reply::Status(status, body) => Err(SlideVisualsError::ConversionFailed {
                status,
                body: body.to_string(),
            }),
        }
    }
}

// ── Renderer ─────────────────────────────────────────────────────────────────

/// Renderer for a PDF of `pages` pages; page `i` is a 40×30 image whose red
/// channel is `i`, so tests can tell which page ended up where.
pub struct FakeRenderer {
    pub pages: usize,
    pub requested: Mutex<Vec<usize>>,
}

impl FakeRenderer {
    pub fn new(pages: usize) -> Self {
        Self {
            pages,
            requested: Mutex::new(Vec::new()),
        }
    }
}

impl PageRenderer for FakeRenderer {
    fn render(
        &self,
        pdf: &[u8],
        page_indices: &[usize],
    ) -> Result<RenderedPages, SlideVisualsError> {
        assert!(pdf.starts_with(b"%PDF"));
        self.requested.lock().unwrap().extend_from_slice(page_indices);
        let images = page_indices
            .iter()
            .copied()
            .filter(|&i| i < self.pages)
            .map(|i| {
                let img = RgbImage::from_pixel(40, 30, Rgb([i as u8, 10, 20]));
                (i, DynamicImage::ImageRgb8(img))
            })
            .collect();
        Ok(RenderedPages {
            page_count: self.pages,
            images,
        })
    }
}

/// Red channel of the top-left pixel of a PNG, i.e. the page it was rendered from.
pub fn page_of(png: &[u8]) -> u8 {
    image::load_from_memory(png).unwrap().to_rgb8().get_pixel(0, 0).0[0]
}

// ── DOCX reading ─────────────────────────────────────────────────────────────

/// One block of the document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading(u8, String),
    Picture(String),
    Other,
}

pub fn read_part(docx: &[u8], name: &str) -> Vec<u8> {
    let mut archive = ZipArchive::new(Cursor::new(docx)).unwrap();
    let mut part = archive.by_name(name).unwrap();
    let mut bytes = Vec::new();
    part.read_to_end(&mut bytes).unwrap();
    bytes
}

/// Paragraphs of `word/document.xml`: headings with their level, pictures
/// with their relationship id.
pub fn blocks(docx: &[u8]) -> Vec<Block> {
    let xml = String::from_utf8(read_part(docx, "word/document.xml")).unwrap();
    let mut reader = Reader::from_str(&xml);
    let mut out = Vec::new();
    let mut style: Option<String> = None;
    let mut text = String::new();
    let mut picture: Option<String> = None;

    loop {
        match reader.read_event().unwrap() {
            Event::Start(e) if e.name().as_ref() == b"w:p" => {
                style = None;
                text.clear();
                picture = None;
            }
            Event::Empty(e) if e.name().as_ref() == b"w:pStyle" => {
                let v = e.try_get_attribute("w:val").unwrap().unwrap();
                style = Some(String::from_utf8(v.value.to_vec()).unwrap());
            }
            Event::Empty(e) if e.name().as_ref() == b"a:blip" => {
                let v = e.try_get_attribute("r:embed").unwrap().unwrap();
                picture = Some(String::from_utf8(v.value.to_vec()).unwrap());
            }
            Event::Text(t) => text.push_str(&t.unescape().unwrap()),
            Event::End(e) if e.name().as_ref() == b"w:p" => {
                let block = match (style.as_deref(), picture.take()) {
                    (_, Some(rel)) => Block::Picture(rel),
                    (Some("Heading1"), None) => Block::Heading(1, text.clone()),
                    (Some("Heading2"), None) => Block::Heading(2, text.clone()),
                    _ => Block::Other,
                };
                out.push(block);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    out
}

/// Media part targeted by relationship `rel_id` in the document rels.
pub fn image_target(docx: &[u8], rel_id: &str) -> String {
    let xml = String::from_utf8(read_part(docx, "word/_rels/document.xml.rels")).unwrap();
    let mut reader = Reader::from_str(&xml);
    loop {
        match reader.read_event().unwrap() {
            Event::Empty(e) if e.name().as_ref() == b"Relationship" => {
                let id = e.try_get_attribute("Id").unwrap().unwrap();
                if id.value.as_ref() == rel_id.as_bytes() {
                    let target = e.try_get_attribute("Target").unwrap().unwrap();
                    return format!("word/{}", String::from_utf8(target.value.to_vec()).unwrap());
                }
            }
            Event::Eof => panic!("relationship {rel_id} not found"),
            _ => {}
        }
    }
}
