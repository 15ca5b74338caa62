//! Property brochures as PowerPoint decks
//!
//! Writes the smallest OOXML package PowerPoint and LibreOffice will open:
//! one master, one blank layout, one theme and a slide per [`Slide`].

use std::io::{Cursor, Write};

use bson::{Bson, Document};
use once_cell::sync::Lazy;
use quick_xml::escape::escape;
use regex::Regex;
use thiserror::Error;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::models::{Property, PropertyKind};

pub const PPTX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

static UNSAFE_FILE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/:*?"<>|]+"#).expect("invalid file name regex"));

const SLIDE_W: i64 = 12_192_000;
const SLIDE_H: i64 = 6_858_000;
const MARGIN: i64 = 457_200;

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const CT: &str = "application/vnd.openxmlformats-officedocument";
const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

#[derive(Debug, Error)]
pub enum DeckError {
    #[error("failed to write presentation archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("failed to write presentation: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlideBody {
    Lines(Vec<String>),
    Bullets(Vec<String>),
    /// Two-column label/value table
    Table(Vec<(String, String)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    pub title: String,
    pub body: SlideBody,
}

impl Slide {
    pub fn new(title: impl Into<String>, body: SlideBody) -> Self {
        Self {
            title: title.into(),
            body,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deck {
    pub slides: Vec<Slide>,
}

impl Deck {
    pub fn push(&mut self, slide: Slide) {
        self.slides.push(slide);
    }

    /// Render the deck as `.pptx` bytes.
    pub fn to_pptx(&self) -> Result<Vec<u8>, DeckError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let count = self.slides.len();

        let mut part = |name: &str, body: String| -> Result<(), DeckError> {
            zip.start_file(name, options)?;
            zip.write_all(body.as_bytes())?;
            Ok(())
        };

        part("[Content_Types].xml", content_types(count))?;
        part(
            "_rels/.rels",
            rels(&[("rId1", "officeDocument", "ppt/presentation.xml")]),
        )?;
        part("ppt/presentation.xml", presentation(count))?;

        let mut pres_rels = vec![(
            "rId1".to_owned(),
            "slideMaster",
            "slideMasters/slideMaster1.xml".to_owned(),
        )];
        for n in 1..=count {
            pres_rels.push((format!("rId{}", n + 1), "slide", format!("slides/slide{n}.xml")));
        }
        pres_rels.push((format!("rId{}", count + 2), "theme", "theme/theme1.xml".to_owned()));
        let pres_rels: Vec<(&str, &str, &str)> = pres_rels
            .iter()
            .map(|(id, ty, target)| (id.as_str(), *ty, target.as_str()))
            .collect();
        part("ppt/_rels/presentation.xml.rels", rels(&pres_rels))?;

        part("ppt/slideMasters/slideMaster1.xml", slide_master())?;
        part(
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            rels(&[
                ("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
                ("rId2", "theme", "../theme/theme1.xml"),
            ]),
        )?;
        part("ppt/slideLayouts/slideLayout1.xml", slide_layout())?;
        part(
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            rels(&[("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]),
        )?;
        part("ppt/theme/theme1.xml", theme())?;

        for (i, slide) in self.slides.iter().enumerate() {
            let n = i + 1;
            part(&format!("ppt/slides/slide{n}.xml"), slide_xml(slide, i == 0))?;
            part(
                &format!("ppt/slides/_rels/slide{n}.xml.rels"),
                rels(&[("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml")]),
            )?;
        }

        Ok(zip.finish()?.into_inner())
    }
}

/// Download name for a building's deck.
pub fn deck_file_name(building_name: &str) -> String {
    let stem = UNSAFE_FILE_CHARS.replace_all(building_name.trim(), "_");
    let stem = if stem.is_empty() { "property".into() } else { stem };
    format!("{stem}.pptx")
}

/// `pantryArea` → `Pantry Area`, `parking4Wheeler` → `Parking 4 Wheeler`.
pub fn title_case(key: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    for c in key.chars() {
        let digit_starts = c.is_ascii_digit() && !current.chars().any(|p| p.is_ascii_digit());
        let boundary = c == '_' || c.is_uppercase() || digit_starts;
        if boundary && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        if c != '_' {
            current.push(c);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn summary_label(key: &str) -> String {
    match key {
        "seaterOffered" => "Seating Capacity".to_owned(),
        "rentPerSeat" => "Rent per Seat".to_owned(),
        "furnishingLevel" => "Furnishing".to_owned(),
        "lockInPeriod" => "Lock-in Period".to_owned(),
        "powerAndBackup" => "Power & Backup".to_owned(),
        "ocAvailability" => "OC Availability".to_owned(),
        other => title_case(other),
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn display_value(value: &Bson) -> Option<String> {
    match value {
        Bson::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Bson::Double(n) => Some(format_number(*n)),
        Bson::Int32(n) => Some(n.to_string()),
        Bson::Int64(n) => Some(n.to_string()),
        Bson::Boolean(b) => Some(if *b { "Yes" } else { "No" }.to_owned()),
        _ => None,
    }
}

fn to_doc<T: serde::Serialize>(value: &T) -> Document {
    bson::to_document(value).unwrap_or_default()
}

/// Amenity lines: enabled flags by name, text amenities as `Name: value`.
pub fn amenity_lines(amenities: &Document) -> Vec<String> {
    amenities
        .iter()
        .filter_map(|(key, value)| match value {
            Bson::Boolean(true) => Some(title_case(key)),
            Bson::String(s) if !s.trim().is_empty() => {
                Some(format!("{}: {}", title_case(key), s.trim()))
            }
            _ => None,
        })
        .collect()
}

/// Brochure for a single property.
pub fn property_deck<K: PropertyKind>(property: &Property<K>) -> Deck {
    let mut deck = Deck::default();
    let location = &property.location;

    let mut cover = Vec::new();
    let place: Vec<&str> = [location.address.as_deref(), location.city.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if !place.is_empty() {
        cover.push(place.join(", "));
    }
    cover.push(format!("{} · {}", K::LABEL, property.property_id));
    cover.push(property.availability_status.as_str().to_owned());
    deck.push(Slide::new(&property.building_name, SlideBody::Lines(cover)));

    let mut summary: Vec<(String, String)> = to_doc(&property.general_info)
        .iter()
        .filter_map(|(key, value)| display_value(value).map(|v| (summary_label(key), v)))
        .collect();
    if let Some(area) = location.area_sqft {
        summary.push(("Area".to_owned(), format!("{} sq ft", format_number(area))));
    }
    summary.push((
        "Availability".to_owned(),
        property.availability_status.as_str().to_owned(),
    ));
    if let Some(date) = property.availability_date {
        summary.push(("Available From".to_owned(), date.to_chrono().format("%d %b %Y").to_string()));
    }
    deck.push(Slide::new("Executive Summary", SlideBody::Table(summary)));

    let mut amenities = amenity_lines(&to_doc(&property.amenities));
    if amenities.is_empty() {
        amenities.push("No amenities listed".to_owned());
    }
    deck.push(Slide::new("Amenities", SlideBody::Bullets(amenities)));

    let mut connectivity = Vec::new();
    let fields = [
        ("Address", &location.address),
        ("City", &location.city),
        ("Zone", &location.zone),
        ("Location", &location.location_of_property),
        ("Map", &location.link),
    ];
    for (label, value) in fields {
        if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
            connectivity.push(format!("{label}: {value}"));
        }
    }
    let lists = [
        ("Metro", &property.transit.metro_stations),
        ("Bus", &property.transit.bus_stations),
        ("Train", &property.transit.train_stations),
        ("Airports", &property.transit.airports),
        ("Hospitals", &property.public_facilities.hospitals),
        ("Restaurants", &property.public_facilities.restaurants),
        ("ATMs", &property.public_facilities.atms),
    ];
    for (label, items) in lists {
        if !items.is_empty() {
            connectivity.push(format!("{label}: {}", items.join(", ")));
        }
    }
    if connectivity.is_empty() {
        connectivity.push("Location details not provided".to_owned());
    }
    deck.push(Slide::new(
        "Location & Connectivity",
        SlideBody::Bullets(connectivity),
    ));

    if !property.images.is_empty() {
        deck.push(Slide::new(
            "Gallery",
            SlideBody::Bullets(property.images.clone()),
        ));
    }

    deck
}

fn rels(entries: &[(&str, &str, &str)]) -> String {
    let mut xml = format!(
        r#"{XML_DECL}<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#
    );
    for (id, ty, target) in entries {
        xml.push_str(&format!(
            r#"<Relationship Id="{id}" Type="{REL}/{ty}" Target="{target}"/>"#
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

fn content_types(slides: usize) -> String {
    let mut xml = format!(
        r#"{XML_DECL}<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="{CT}.presentationml.presentation.main+xml"/><Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="{CT}.presentationml.slideMaster+xml"/><Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="{CT}.presentationml.slideLayout+xml"/><Override PartName="/ppt/theme/theme1.xml" ContentType="{CT}.theme+xml"/>"#
    );
    for n in 1..=slides {
        xml.push_str(&format!(
            r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="{CT}.presentationml.slide+xml"/>"#
        ));
    }
    xml.push_str("</Types>");
    xml
}

fn presentation(slides: usize) -> String {
    let ids: String = (1..=slides)
        .map(|n| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 255 + n, n + 1))
        .collect();
    format!(
        r#"{XML_DECL}<p:presentation {NS}><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{ids}</p:sldIdLst><p:sldSz cx="{SLIDE_W}" cy="{SLIDE_H}"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#
    )
}

const GROUP_HEADER: &str = r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#;

fn slide_master() -> String {
    format!(
        r#"{XML_DECL}<p:sldMaster {NS}><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg><p:spTree>{GROUP_HEADER}</p:spTree></p:cSld><p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#
    )
}

fn slide_layout() -> String {
    format!(
        r#"{XML_DECL}<p:sldLayout {NS} type="blank" preserve="1"><p:cSld name="Blank"><p:spTree>{GROUP_HEADER}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"#
    )
}

fn theme() -> String {
    let colors = [
        ("dk1", "1F2933"),
        ("lt1", "FFFFFF"),
        ("dk2", "243B53"),
        ("lt2", "F0F4F8"),
        ("accent1", "2F80ED"),
        ("accent2", "27AE60"),
        ("accent3", "F2994A"),
        ("accent4", "9B51E0"),
        ("accent5", "56CCF2"),
        ("accent6", "EB5757"),
        ("hlink", "2D9CDB"),
        ("folHlink", "6FCF97"),
    ];
    let scheme: String = colors
        .iter()
        .map(|(name, rgb)| format!(r#"<a:{name}><a:srgbClr val="{rgb}"/></a:{name}>"#))
        .collect();
    let fill = r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#;
    let line = format!(r#"<a:ln w="6350">{fill}</a:ln>"#);
    let effect = "<a:effectStyle><a:effectLst/></a:effectStyle>";
    let font = r#"<a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/>"#;
    format!(
        r#"{XML_DECL}<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Leasehub"><a:themeElements><a:clrScheme name="Leasehub">{scheme}</a:clrScheme><a:fontScheme name="Leasehub"><a:majorFont>{font}</a:majorFont><a:minorFont>{font}</a:minorFont></a:fontScheme><a:fmtScheme name="Leasehub"><a:fillStyleLst>{fills}</a:fillStyleLst><a:lnStyleLst>{lines}</a:lnStyleLst><a:effectStyleLst>{effects}</a:effectStyleLst><a:bgFillStyleLst>{fills}</a:bgFillStyleLst></a:fmtScheme></a:themeElements></a:theme>"#,
        fills = fill.repeat(3),
        lines = line.repeat(3),
        effects = effect.repeat(3),
    )
}

fn run(text: &str, size: u32, bold: bool) -> String {
    let b = if bold { r#" b="1""# } else { "" };
    format!(
        r#"<a:r><a:rPr lang="en-US" sz="{size}"{b} dirty="0"/><a:t>{}</a:t></a:r>"#,
        escape(text)
    )
}

fn text_box(id: u32, name: &str, (x, y, cx, cy): (i64, i64, i64, i64), paragraphs: &str) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr><p:txBody><a:bodyPr wrap="square"><a:normAutofit/></a:bodyPr><a:lstStyle/>{paragraphs}</p:txBody></p:sp>"#
    )
}

fn table(rows: &[(String, String)], (x, y, cx): (i64, i64, i64)) -> String {
    let row_h = 370_840i64;
    let label_w = cx * 2 / 5;
    let cell = |text: &str, bold: bool| {
        format!(
            r#"<a:tc><a:txBody><a:bodyPr/><a:lstStyle/><a:p>{}</a:p></a:txBody><a:tcPr/></a:tc>"#,
            run(text, 1400, bold)
        )
    };
    let body: String = rows
        .iter()
        .map(|(label, value)| {
            format!(
                r#"<a:tr h="{row_h}">{}{}</a:tr>"#,
                cell(label, true),
                cell(value, false)
            )
        })
        .collect();
    let cy = row_h * rows.len().max(1) as i64;
    format!(
        r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="3" name="Summary"/><p:cNvGraphicFramePr><a:graphicFrameLocks noGrp="1"/></p:cNvGraphicFramePr><p:nvPr/></p:nvGraphicFramePr><p:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></p:xfrm><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table"><a:tbl><a:tblPr bandRow="1"/><a:tblGrid><a:gridCol w="{label_w}"/><a:gridCol w="{value_w}"/></a:tblGrid>{body}</a:tbl></a:graphicData></a:graphic></p:graphicFrame>"#,
        value_w = cx - label_w
    )
}

fn slide_xml(slide: &Slide, cover: bool) -> String {
    let width = SLIDE_W - 2 * MARGIN;
    let (title_y, title_size) = if cover { (2_286_000, 4400) } else { (MARGIN, 3200) };
    let title = text_box(
        2,
        "Title",
        (MARGIN, title_y, width, 1_143_000),
        &format!("<a:p>{}</a:p>", run(&slide.title, title_size, true)),
    );
    let body_y = title_y + 1_143_000 + 114_300;
    let body_frame = (MARGIN, body_y, width, SLIDE_H - body_y - MARGIN);

    let body = match &slide.body {
        SlideBody::Lines(lines) => {
            let paragraphs: String = lines
                .iter()
                .map(|line| format!("<a:p>{}</a:p>", run(line, 2000, false)))
                .collect();
            text_box(3, "Body", body_frame, &paragraphs)
        }
        SlideBody::Bullets(items) => {
            let paragraphs: String = items
                .iter()
                .map(|item| {
                    format!(
                        r#"<a:p><a:pPr marL="342900" indent="-342900"><a:buFont typeface="Arial"/><a:buChar char="&#8226;"/></a:pPr>{}</a:p>"#,
                        run(item, 1800, false)
                    )
                })
                .collect();
            text_box(3, "Body", body_frame, &paragraphs)
        }
        SlideBody::Table(rows) => table(rows, (MARGIN, body_y, width)),
    };

    format!(
        r#"{XML_DECL}<p:sld {NS}><p:cSld><p:spTree>{GROUP_HEADER}{title}{body}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#
    )
}
