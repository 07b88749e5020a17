//! Word document assembly.
//!
//! Writes a minimal WordprocessingML package by hand: one `Heading1`
//! paragraph with the title, then for every slide image a `Heading2`
//! "Slide N" paragraph followed by a paragraph holding the picture inline.
//!
//! ```text
//! [Content_Types].xml
//! _rels/.rels
//! docProps/core.xml
//! word/document.xml
//! word/styles.xml
//! word/_rels/document.xml.rels
//! word/media/image{N}.png
//! ```

use crate::error::SlideVisualsError;
use crate::output::SlideImage;
use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// English Metric Units per inch.
const EMU_PER_INCH: f64 = 914_400.0;

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

const CONTENT_TYPES: &str = r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#;

const STYLES: &str = r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:eastAsia="Calibri" w:cs="Calibri"/><w:sz w:val="22"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="160" w:line="259" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="480" w:after="0"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:color w:val="365F91"/><w:sz w:val="28"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="200" w:after="0"/><w:outlineLvl w:val="1"/></w:pPr><w:rPr><w:b/><w:color w:val="4F81BD"/><w:sz w:val="26"/></w:rPr></w:style></w:styles>"#;

const DOCUMENT_OPEN: &str = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture"><w:body>"#;

// US Letter, 1 in margins: 6.5 in of text width.
const SECTION: &str = r#"<w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr></w:body></w:document>"#;

const STYLES_REL_ID: &str = "rId1";

/// Build the `.docx` for `images` under the level-1 heading `title`.
///
/// Pictures are `width_inches` wide; their height keeps the pixel aspect
/// ratio. Images are written in ascending slide order whatever order they
/// arrive in.
pub fn assemble_document(
    title: &str,
    images: &[SlideImage],
    width_inches: f32,
) -> Result<Vec<u8>, SlideVisualsError> {
    let mut ordered: Vec<&SlideImage> = images.iter().collect();
    ordered.sort_by_key(|img| img.slide_number);

    let mut package = DocxPackage::new();
    package.add("[Content_Types].xml", with_decl(CONTENT_TYPES).as_bytes())?;
    package.add("_rels/.rels", with_decl(PACKAGE_RELS).as_bytes())?;
    package.add("docProps/core.xml", core_properties(title).as_bytes())?;
    package.add("word/styles.xml", with_decl(STYLES).as_bytes())?;

    let mut body = String::from(XML_DECL);
    body.push_str(DOCUMENT_OPEN);
    body.push_str(&heading("Heading1", title));

    let mut rels = Vec::with_capacity(ordered.len());
    for (i, img) in ordered.iter().enumerate() {
        let n = i + 1;
        let rel_id = format!("rId{}", n + 1);
        let media = format!("media/image{n}.png");

        body.push_str(&heading("Heading2", &format!("Slide {}", img.slide_number)));
        body.push_str(&picture(n, &rel_id, img, width_inches));

        package.add(&format!("word/{media}"), &img.png)?;
        rels.push((rel_id, media));
    }
    body.push_str(SECTION);

    package.add("word/document.xml", body.as_bytes())?;
    package.add("word/_rels/document.xml.rels", document_rels(&rels).as_bytes())?;

    let bytes = package.finish()?;
    debug!(
        "Assembled document: {} pictures, {} bytes",
        ordered.len(),
        bytes.len()
    );
    Ok(bytes)
}

struct DocxPackage {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
}

impl DocxPackage {
    fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    fn add(&mut self, part: &str, data: &[u8]) -> Result<(), SlideVisualsError> {
        self.writer
            .start_file(part, self.options)
            .map_err(|e| SlideVisualsError::DocumentAssemblyFailed(format!("{part}: {e}")))?;
        self.writer
            .write_all(data)
            .map_err(|e| SlideVisualsError::DocumentAssemblyFailed(format!("{part}: {e}")))
    }

    fn finish(self) -> Result<Vec<u8>, SlideVisualsError> {
        self.writer
            .finish()
            .map(Cursor::into_inner)
            .map_err(|e| SlideVisualsError::DocumentAssemblyFailed(e.to_string()))
    }
}

fn with_decl(xml: &str) -> String {
    format!("{XML_DECL}{xml}")
}

fn heading(style: &str, text: &str) -> String {
    format!(
        r#"<w:p><w:pPr><w:pStyle w:val="{style}"/></w:pPr><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
        escape(text)
    )
}

/// Picture extent in EMU for a `width_inches` wide rendering of `img`.
fn extent(img: &SlideImage, width_inches: f32) -> (u64, u64) {
    let cx = (width_inches as f64 * EMU_PER_INCH).round();
    let cy = if img.width == 0 {
        0.0
    } else {
        (cx * img.height as f64 / img.width as f64).round()
    };
    (cx as u64, cy as u64)
}

fn picture(n: usize, rel_id: &str, img: &SlideImage, width_inches: f32) -> String {
    let (cx, cy) = extent(img, width_inches);
    let name = format!("image{n}.png");
    format!(
        concat!(
            r#"<w:p><w:r><w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0">"#,
            r#"<wp:extent cx="{cx}" cy="{cy}"/><wp:docPr id="{n}" name="Picture {n}"/>"#,
            r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
            r#"<a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:pic><pic:nvPicPr><pic:cNvPr id="0" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
            r#"<pic:blipFill><a:blip r:embed="{rel_id}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
            r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr></pic:pic>"#,
            r#"</a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#,
        ),
        cx = cx,
        cy = cy,
        n = n,
        name = name,
        rel_id = rel_id,
    )
}

fn document_rels(images: &[(String, String)]) -> String {
    let mut xml = String::from(XML_DECL);
    xml.push_str(
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    xml.push_str(&format!(
        r#"<Relationship Id="{STYLES_REL_ID}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#
    ));
    for (rel_id, target) in images {
        xml.push_str(&format!(
            r#"<Relationship Id="{rel_id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="{target}"/>"#
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

fn core_properties(title: &str) -> String {
    format!(
        concat!(
            "{decl}",
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" "#,
            r#"xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" "#,
            r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
            "<dc:title>{title}</dc:title><dc:creator>slide-visuals</dc:creator>",
            "</cp:coreProperties>",
        ),
        decl = XML_DECL,
        title = escape(title),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::events::Event;
    use quick_xml::Reader;
    use std::io::Read;
    use zip::ZipArchive;

    fn image(slide_number: usize, width: u32, height: u32) -> SlideImage {
        SlideImage {
            slide_number,
            width,
            height,
            png: format!("png-of-slide-{slide_number}").into_bytes(),
        }
    }

    fn read_part(docx: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(docx)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut text = String::new();
        part.read_to_string(&mut text).unwrap();
        text
    }

    /// Paragraph styles and texts, plus `"<picture>"` for each drawing.
    fn outline(document_xml: &str) -> Vec<String> {
        let mut reader = Reader::from_str(document_xml);
        let mut out = Vec::new();
        loop {
            match reader.read_event().unwrap() {
                Event::Empty(e) if e.name().as_ref() == b"w:pStyle" => {
                    let val = e.try_get_attribute("w:val").unwrap().unwrap();
                    out.push(String::from_utf8(val.value.to_vec()).unwrap());
                }
                Event::Text(t) => out.push(t.unescape().unwrap().into_owned()),
                Event::Start(e) if e.name().as_ref() == b"w:drawing" => {
                    out.push("<picture>".into())
                }
                Event::Eof => break,
                _ => {}
            }
        }
        out
    }

    #[test]
    fn headings_and_pictures_in_slide_order() {
        let docx = assemble_document(
            "Slides with Visual Elements",
            &[image(7, 400, 300), image(2, 400, 300)],
            6.0,
        )
        .unwrap();

        let doc = read_part(&docx, "word/document.xml");
        assert_eq!(
            outline(&doc),
            vec![
                "Heading1",
                "Slides with Visual Elements",
                "Heading2",
                "Slide 2",
                "<picture>",
                "Heading2",
                "Slide 7",
                "<picture>",
            ]
        );

        assert_eq!(read_part(&docx, "word/media/image1.png"), "png-of-slide-2");
        assert_eq!(read_part(&docx, "word/media/image2.png"), "png-of-slide-7");

        let rels = read_part(&docx, "word/_rels/document.xml.rels");
        assert!(rels.contains(r#"Id="rId2""#) && rels.contains("media/image1.png"));
        assert!(rels.contains(r#"Target="styles.xml""#));
    }

    #[test]
    fn picture_is_six_inches_wide_and_keeps_aspect() {
        let (cx, cy) = extent(&image(1, 960, 540), 6.0);
        assert_eq!(cx, 5_486_400);
        assert_eq!(cy, 3_086_100);
    }

    #[test]
    fn empty_image_list_still_has_title() {
        let docx = assemble_document("Only a title", &[], 6.0).unwrap();
        let doc = read_part(&docx, "word/document.xml");
        assert_eq!(outline(&doc), vec!["Heading1", "Only a title"]);
    }

    #[test]
    fn title_is_escaped() {
        let docx = assemble_document("R&D <2024>", &[], 6.0).unwrap();
        let doc = read_part(&docx, "word/document.xml");
        assert!(doc.contains("R&amp;D &lt;2024&gt;"));
        assert!(read_part(&docx, "docProps/core.xml").contains("<dc:title>R&amp;D &lt;2024&gt;</dc:title>"));
    }

    #[test]
    fn package_has_required_parts() {
        let docx = assemble_document("T", &[image(1, 10, 10)], 6.0).unwrap();
        let archive = ZipArchive::new(Cursor::new(docx.as_slice())).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "docProps/core.xml",
            "word/document.xml",
            "word/styles.xml",
            "word/_rels/document.xml.rels",
            "word/media/image1.png",
        ] {
            assert!(names.contains(&part), "missing {part}");
        }
        let styles = read_part(&docx, "word/styles.xml");
        assert!(styles.contains(r#"w:styleId="Heading1""#));
        assert!(styles.contains(r#"w:styleId="Heading2""#));
    }
}
