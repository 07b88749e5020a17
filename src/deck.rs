//! PPTX reading: slide order and the category of every top-level shape.
//!
//! A `.pptx` file is an OPC package (a ZIP archive of XML parts). This module
//! reads just enough of it to answer one question per slide: *which kinds of
//! shapes sit directly on the slide?*
//!
//! ## Slide order
//!
//! Part names (`slide7.xml`) say nothing about order. The order users see is
//! the `p:sldIdLst` list in the presentation part; each entry points at a
//! slide part through the presentation part's relationships. Slide numbers are
//! 1-based positions in that list, which is also the page order the
//! conversion service produces.
//!
//! ## Shape categories
//!
//! Only the direct children of `p:cSld/p:spTree` are classified. A group is a
//! single `Group` shape regardless of what it contains, and every rule looks
//! at the shape's *own* properties, never at those of nested shapes:
//!
//! | Element | Rule | Kind |
//! |---|---|---|
//! | `p:sp` | has `nvSpPr/nvPr/ph` | `Placeholder` |
//! | `p:sp` | has `spPr/custGeom` | `Freeform` |
//! | `p:sp` | has `spPr/prstGeom`, not a text box | `AutoShape` |
//! | `p:sp` | `cNvSpPr@txBox` set | `TextBox` |
//! | `p:pic` | has `nvPr/videoFile` | `Media`, else `Picture` |
//! | `p:graphicFrame` | `graphicData@uri` | `Chart` / `Table` / `Diagram` / `OleObject` |
//! | `p:grpSp` | | `Group` |
//! | `p:cxnSp` | | `Connector` |
//! | `p:contentPart` | | `ContentPart` |
//!
//! Other children of the shape tree (`mc:AlternateContent`, extension lists)
//! are not shapes and are skipped.

use crate::error::SlideVisualsError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::{Cursor, Read};
use std::str::FromStr;
use tracing::{debug, warn};
use zip::ZipArchive;

/// Category of a shape placed directly on a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShapeKind {
    /// Preset geometry (rectangle, arrow, callout …) that is not a text box.
    AutoShape,
    /// Custom geometry drawn point by point.
    Freeform,
    /// Plain text box.
    TextBox,
    /// Layout placeholder (title, body, date, footer …).
    Placeholder,
    /// Embedded or linked picture.
    Picture,
    /// Video clip.
    Media,
    /// Table inside a graphic frame.
    Table,
    /// Chart inside a graphic frame.
    Chart,
    /// SmartArt diagram.
    Diagram,
    /// Embedded or linked OLE object.
    OleObject,
    /// Group of shapes.
    Group,
    /// Connector line.
    Connector,
    /// Ink content part.
    ContentPart,
    /// Anything the rules above do not recognise.
    Other,
}

/// Shape kinds that make a slide count as carrying visual content.
pub const DEFAULT_VISUAL_KINDS: &[ShapeKind] = &[
    ShapeKind::Picture,
    ShapeKind::Table,
    ShapeKind::Chart,
    ShapeKind::Group,
    ShapeKind::AutoShape,
    ShapeKind::Freeform,
];

impl ShapeKind {
    /// Every kind, in declaration order.
    pub const ALL: [ShapeKind; 14] = [
        ShapeKind::AutoShape,
        ShapeKind::Freeform,
        ShapeKind::TextBox,
        ShapeKind::Placeholder,
        ShapeKind::Picture,
        ShapeKind::Media,
        ShapeKind::Table,
        ShapeKind::Chart,
        ShapeKind::Diagram,
        ShapeKind::OleObject,
        ShapeKind::Group,
        ShapeKind::Connector,
        ShapeKind::ContentPart,
        ShapeKind::Other,
    ];

    /// Stable kebab-case name, also accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            ShapeKind::AutoShape => "auto-shape",
            ShapeKind::Freeform => "freeform",
            ShapeKind::TextBox => "text-box",
            ShapeKind::Placeholder => "placeholder",
            ShapeKind::Picture => "picture",
            ShapeKind::Media => "media",
            ShapeKind::Table => "table",
            ShapeKind::Chart => "chart",
            ShapeKind::Diagram => "diagram",
            ShapeKind::OleObject => "ole-object",
            ShapeKind::Group => "group",
            ShapeKind::Connector => "connector",
            ShapeKind::ContentPart => "content-part",
            ShapeKind::Other => "other",
        }
    }

    /// Whether this kind is in [`DEFAULT_VISUAL_KINDS`].
    pub fn is_visual_by_default(&self) -> bool {
        DEFAULT_VISUAL_KINDS.contains(self)
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShapeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        ShapeKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == wanted || k.as_str().replace('-', "") == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = ShapeKind::ALL.iter().map(|k| k.as_str()).collect();
                format!("unknown shape kind '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// A shape placed directly on a slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub kind: ShapeKind,
    /// `cNvPr@name`, e.g. "Picture 3".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// One slide of the deck.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slide {
    /// 1-based position in the deck.
    pub number: usize,
    /// Package path of the slide part, e.g. `ppt/slides/slide3.xml`.
    pub part_name: String,
    /// `p:sld@show="0"`: hidden in slide show.
    pub hidden: bool,
    pub shapes: Vec<Shape>,
}

impl Slide {
    /// True when at least one top-level shape has a kind in `kinds`.
    pub fn has_any(&self, kinds: &[ShapeKind]) -> bool {
        self.shapes.iter().any(|s| kinds.contains(&s.kind))
    }
}

/// The slides of a deck, in presentation order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deck {
    pub slides: Vec<Slide>,
}

impl Deck {
    /// Parse a `.pptx` held in memory.
    ///
    /// `name` is used only in error messages.
    pub fn from_bytes(bytes: &[u8], name: &str) -> Result<Self, SlideVisualsError> {
        let corrupt = |detail: String| SlideVisualsError::CorruptPresentation {
            name: name.to_string(),
            detail,
        };

        let mut package = Package::open(bytes).map_err(corrupt)?;

        let presentation_part = package.main_part().map_err(corrupt)?;
        let presentation_xml = package.read(&presentation_part).map_err(corrupt)?;
        let rel_ids = parse_slide_id_list(&presentation_xml).map_err(corrupt)?;
        let rels = package.relationships(&presentation_part).map_err(corrupt)?;

        let mut slides = Vec::with_capacity(rel_ids.len());
        for rel_id in rel_ids {
            let Some(part_name) = rels.get(&rel_id) else {
                return Err(corrupt(format!(
                    "slide relationship '{rel_id}' is missing from {presentation_part}"
                )));
            };
            let xml = package.read(part_name).map_err(corrupt)?;
            let scanned = scan_slide(&xml).map_err(|e| corrupt(format!("{part_name}: {e}")))?;

            let number = slides.len() + 1;
            debug!(
                "Slide {} ({}): {} top-level shapes",
                number,
                part_name,
                scanned.shapes.len()
            );
            slides.push(Slide {
                number,
                part_name: part_name.clone(),
                hidden: scanned.hidden,
                shapes: scanned.shapes,
            });
        }

        Ok(Deck { slides })
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    /// Look up a slide by its 1-based number.
    pub fn slide(&self, number: usize) -> Option<&Slide> {
        number.checked_sub(1).and_then(|i| self.slides.get(i))
    }
}

// ── OPC package access ───────────────────────────────────────────────────

const OFFICE_DOCUMENT_REL: &str = "/officeDocument";
const SLIDE_REL: &str = "/slide";
const DEFAULT_PRESENTATION_PART: &str = "ppt/presentation.xml";

/// Largest XML part read from a package. Slide and relationship parts are
/// kilobytes; anything past this is a zip bomb or a lying size field.
pub const MAX_PART_BYTES: u64 = 64 * 1024 * 1024;

/// Initial buffer size; the declared size in the zip directory is not trusted.
const READ_CHUNK: u64 = 64 * 1024;

struct Package<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
}

/// One `Relationship` element.
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
    external: bool,
}

impl<'a> Package<'a> {
    fn open(bytes: &'a [u8]) -> Result<Self, String> {
        let archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;
        Ok(Self { archive })
    }

    fn read(&mut self, part_name: &str) -> Result<Vec<u8>, String> {
        let mut file = self
            .archive
            .by_name(part_name)
            .map_err(|e| format!("part '{part_name}': {e}"))?;
        let declared = file.size();
        read_capped(&mut file, declared, MAX_PART_BYTES)
            .map_err(|e| format!("part '{part_name}': {e}"))
    }

    fn contains(&self, part_name: &str) -> bool {
        self.archive.file_names().any(|n| n == part_name)
    }

    /// Resolve the presentation part through `_rels/.rels`.
    fn main_part(&mut self) -> Result<String, String> {
        if self.contains("_rels/.rels") {
            let xml = self.read("_rels/.rels")?;
            let rels = parse_relationships(&xml)?;
            if let Some(rel) = rels
                .iter()
                .find(|r| !r.external && r.rel_type.ends_with(OFFICE_DOCUMENT_REL))
            {
                let part = resolve_target("", &rel.target);
                if self.contains(&part) {
                    return Ok(part);
                }
                warn!("Package points at missing main part '{}'", part);
            }
        }
        if self.contains(DEFAULT_PRESENTATION_PART) {
            return Ok(DEFAULT_PRESENTATION_PART.to_string());
        }
        Err("no presentation part (ppt/presentation.xml) in package".to_string())
    }

    /// Map relationship id → resolved slide part name for `source_part`.
    fn relationships(&mut self, source_part: &str) -> Result<HashMap<String, String>, String> {
        let (dir, file) = match source_part.rfind('/') {
            Some(i) => (&source_part[..i], &source_part[i + 1..]),
            None => ("", source_part),
        };
        let rels_part = if dir.is_empty() {
            format!("_rels/{file}.rels")
        } else {
            format!("{dir}/_rels/{file}.rels")
        };

        let xml = self.read(&rels_part)?;
        Ok(parse_relationships(&xml)?
            .into_iter()
            .filter(|r| !r.external && r.rel_type.ends_with(SLIDE_REL))
            .map(|r| (r.id, resolve_target(dir, &r.target)))
            .collect())
    }
}

/// Read at most `cap` bytes from `reader`, failing when there is more.
///
/// `declared` only sizes the first allocation, and never above [`READ_CHUNK`].
fn read_capped(reader: impl Read, declared: u64, cap: u64) -> Result<Vec<u8>, String> {
    let mut buf = Vec::with_capacity(declared.min(READ_CHUNK).min(cap) as usize);
    reader
        .take(cap + 1)
        .read_to_end(&mut buf)
        .map_err(|e| e.to_string())?;
    if buf.len() as u64 > cap {
        return Err(format!("larger than the {cap}-byte part limit"));
    }
    Ok(buf)
}

/// Resolve a relationship target against the source part's directory.
///
/// Targets are either package-absolute (`/ppt/slides/slide1.xml`) or
/// relative, possibly with `..` segments.
fn resolve_target(base_dir: &str, target: &str) -> String {
    let joined = if let Some(abs) = target.strip_prefix('/') {
        abs.to_string()
    } else if base_dir.is_empty() {
        target.to_string()
    } else {
        format!("{base_dir}/{target}")
    };

    let mut segments: Vec<&str> = Vec::new();
    for seg in joined.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

fn attr_value(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local)
        .map(|a| decode_value(&a.value))
}

fn decode_value(raw: &[u8]) -> String {
    let s = String::from_utf8_lossy(raw);
    match quick_xml::escape::unescape(&s) {
        Ok(v) => v.into_owned(),
        Err(_) => s.into_owned(),
    }
}

fn parse_relationships(xml: &[u8]) -> Result<Vec<Relationship>, String> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut rels = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let id = attr_value(&e, b"Id").unwrap_or_default();
                    let target = attr_value(&e, b"Target").unwrap_or_default();
                    if !id.is_empty() && !target.is_empty() {
                        rels.push(Relationship {
                            id,
                            rel_type: attr_value(&e, b"Type").unwrap_or_default(),
                            target,
                            external: attr_value(&e, b"TargetMode").as_deref() == Some("External"),
                        });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("relationships: {e}")),
            _ => {}
        }
        buf.clear();
    }
    Ok(rels)
}

/// Relationship ids of `p:sldIdLst/p:sldId`, in list order.
fn parse_slide_id_list(xml: &[u8]) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut ids = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"sldId" {
                    // r:id is the prefixed `id`; the bare `id` is the numeric slide id.
                    let rel_id = e
                        .attributes()
                        .flatten()
                        .find(|a| a.key.local_name().as_ref() == b"id" && a.key.prefix().is_some())
                        .map(|a| decode_value(&a.value));
                    if let Some(rel_id) = rel_id {
                        ids.push(rel_id);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("presentation part: {e}")),
            _ => {}
        }
        buf.clear();
    }
    Ok(ids)
}

// ── Slide scanning ───────────────────────────────────────────────────────

struct ScannedSlide {
    hidden: bool,
    shapes: Vec<Shape>,
}

const SHAPE_TAGS: &[&[u8]] = &[
    b"sp",
    b"pic",
    b"graphicFrame",
    b"grpSp",
    b"cxnSp",
    b"contentPart",
];

const URI_CHART: &str = "http://schemas.openxmlformats.org/drawingml/2006/chart";
const URI_CHARTEX: &str = "http://schemas.microsoft.com/office/drawing/2014/chartex";
const URI_TABLE: &str = "http://schemas.openxmlformats.org/drawingml/2006/table";
const URI_DIAGRAM: &str = "http://schemas.openxmlformats.org/drawingml/2006/diagram";
const URI_OLE: &str = "http://schemas.openxmlformats.org/presentationml/2006/ole";

/// What one top-level shape element says about itself.
#[derive(Default)]
struct ShapeFeatures {
    tag: Vec<u8>,
    name: Option<String>,
    placeholder: bool,
    text_box: bool,
    custom_geometry: bool,
    preset_geometry: bool,
    video: bool,
    graphic_uri: Option<String>,
}

impl ShapeFeatures {
    fn new(tag: &[u8]) -> Self {
        Self {
            tag: tag.to_vec(),
            ..Self::default()
        }
    }

    /// Record element `name` found at `path` (element names between the
    /// shape element and `name`, exclusive).
    fn observe(&mut self, path: &[Vec<u8>], name: &[u8], e: &BytesStart<'_>) {
        let in_nv_pr = path.len() == 2 && path[0].starts_with(b"nv") && path[1] == b"nvPr";
        match name {
            b"ph" if in_nv_pr => self.placeholder = true,
            b"videoFile" if in_nv_pr => self.video = true,
            b"cNvPr" if path.len() == 1 && path[0].starts_with(b"nv") => {
                self.name = attr_value(e, b"name");
            }
            b"cNvSpPr" if path.len() == 1 && path[0] == b"nvSpPr" => {
                self.text_box = matches!(attr_value(e, b"txBox").as_deref(), Some("1" | "true"));
            }
            b"custGeom" if path.len() == 1 && path[0] == b"spPr" => self.custom_geometry = true,
            b"prstGeom" if path.len() == 1 && path[0] == b"spPr" => self.preset_geometry = true,
            b"graphicData" if path.len() == 1 && path[0] == b"graphic" => {
                self.graphic_uri = attr_value(e, b"uri");
            }
            _ => {}
        }
    }

    fn into_shape(self) -> Shape {
        let kind = match self.tag.as_slice() {
            b"sp" => {
                if self.placeholder {
                    ShapeKind::Placeholder
                } else if self.custom_geometry {
                    ShapeKind::Freeform
                } else if self.preset_geometry && !self.text_box {
                    ShapeKind::AutoShape
                } else if self.text_box {
                    ShapeKind::TextBox
                } else {
                    ShapeKind::Other
                }
            }
            b"pic" if self.video => ShapeKind::Media,
            b"pic" => ShapeKind::Picture,
            b"graphicFrame" => match self.graphic_uri.as_deref() {
                Some(URI_CHART | URI_CHARTEX) => ShapeKind::Chart,
                Some(URI_TABLE) => ShapeKind::Table,
                Some(URI_DIAGRAM) => ShapeKind::Diagram,
                Some(URI_OLE) => ShapeKind::OleObject,
                _ => ShapeKind::Other,
            },
            b"grpSp" => ShapeKind::Group,
            b"cxnSp" => ShapeKind::Connector,
            b"contentPart" => ShapeKind::ContentPart,
            _ => ShapeKind::Other,
        };
        Shape {
            kind,
            name: self.name,
        }
    }
}

/// Walk one slide part and classify the direct children of its shape tree.
fn scan_slide(xml: &[u8]) -> Result<ScannedSlide, String> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut scanner = SlideScanner::default();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => scanner.open(&e, false),
            Ok(Event::Empty(e)) => scanner.open(&e, true),
            Ok(Event::End(_)) => {
                if scanner.close() {
                    // The shape tree is closed; nothing after it is a shape.
                    break;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "XML error at byte {}: {e}",
                    reader.buffer_position()
                ))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(ScannedSlide {
        hidden: scanner.hidden,
        shapes: scanner.shapes,
    })
}

#[derive(Default)]
struct SlideScanner {
    hidden: bool,
    shapes: Vec<Shape>,
    /// Local names of the currently open elements.
    stack: Vec<Vec<u8>>,
    /// Stack index of the open `spTree`.
    tree: Option<usize>,
    current: Option<ShapeFeatures>,
}

impl SlideScanner {
    fn open(&mut self, e: &BytesStart<'_>, is_empty: bool) {
        let name = e.local_name().as_ref().to_vec();
        let depth = self.stack.len();

        if depth == 0 && name == b"sld" {
            self.hidden = attr_value(e, b"show").as_deref() == Some("0");
        }

        match self.tree {
            None => {
                if name == b"spTree" && self.stack.last().map(Vec::as_slice) == Some(b"cSld") {
                    self.tree = Some(depth);
                }
            }
            Some(t) if depth == t + 1 => {
                self.current = SHAPE_TAGS
                    .contains(&name.as_slice())
                    .then(|| ShapeFeatures::new(&name));
            }
            Some(t) if depth > t + 1 => {
                if let Some(features) = self.current.as_mut() {
                    features.observe(&self.stack[t + 2..], &name, e);
                }
            }
            Some(_) => {}
        }

        if is_empty {
            self.finish_shape(depth);
            if self.tree == Some(depth) {
                // `<p:spTree/>`: an empty tree.
                self.tree = None;
            }
        } else {
            self.stack.push(name);
        }
    }

    /// Returns `true` once the shape tree itself has been closed.
    fn close(&mut self) -> bool {
        self.stack.pop();
        let depth = self.stack.len();
        self.finish_shape(depth);
        self.tree == Some(depth)
    }

    fn finish_shape(&mut self, depth: usize) {
        if self.tree.is_some_and(|t| depth == t + 1) {
            if let Some(features) = self.current.take() {
                self.shapes.push(features.into_shape());
            }
        }
    }
}
