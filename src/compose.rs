//! Composite docket generation.
//!
//! The composite opens with three branded pages (cover, contents checklist,
//! flight summary) and then imports every page of every present slot PDF in
//! canonical order. Imported pages keep their original MediaBox, so page
//! size and orientation survive untouched; nothing is rescaled or
//! re-paginated.

use crate::error::DocketError;
use crate::flight::FlightMetadata;
use crate::slots::Slot;
use crate::util;
use chrono::Local;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::fs;
use std::path::{Path, PathBuf};

// A4 portrait, points.
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN_X: i64 = 43;

const DISCLAIMER: [&str; 3] = [
    "This document is an assembled flight docket containing operational",
    "planning artefacts, briefings, and charts. Verify currency and",
    "applicability of all included material before flight.",
];

struct TextLine {
    x: i64,
    y: i64,
    size: i64,
    bold: bool,
    text: String,
}

impl TextLine {
    fn new(x: i64, y: i64, size: i64, bold: bool, text: impl Into<String>) -> TextLine {
        TextLine {
            x,
            y,
            size,
            bold,
            text: text.into(),
        }
    }
}

/// Compose the docket PDF at `output`.
///
/// `ordered` must follow the canonical slot order. Presence is re-checked
/// here, at render time: the checklist page and the set of imported
/// documents are driven by the same existence probe, so they always agree
/// even when a resolved file was removed after resolution.
pub fn compose(
    output: &Path,
    operator: &str,
    logo: Option<&Path>,
    flight: &FlightMetadata,
    ordered: &[(Slot, Option<PathBuf>)],
) -> Result<(), DocketError> {
    let presence: Vec<(Slot, Option<&Path>)> = ordered
        .iter()
        .map(|(slot, path)| {
            let live = path.as_deref().filter(|path| path.is_file());
            (*slot, live)
        })
        .collect();

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let font_bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_regular,
            "F2" => font_bold,
        },
    });

    let mut kids: Vec<Object> = Vec::new();

    let cover_id = text_page(&mut doc, pages_id, resources_id, &cover_lines(operator, flight))?;
    kids.push(cover_id.into());
    embed_logo(&mut doc, cover_id, logo);

    let index_id = text_page(&mut doc, pages_id, resources_id, &index_lines(&presence))?;
    kids.push(index_id.into());

    let summary_id = text_page(&mut doc, pages_id, resources_id, &summary_lines(flight))?;
    kids.push(summary_id.into());

    for (slot, path) in &presence {
        if let Some(path) = path {
            import_pdf(&mut doc, pages_id, &mut kids, path).map_err(|err| {
                DocketError::Compose(format!("import {} ({}): {err}", path.display(), slot.key()))
            })?;
        }
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| DocketError::Compose(format!("create {}: {err}", parent.display())))?;
    }
    doc.save(output)
        .map_err(|err| DocketError::Compose(format!("write {}: {err}", output.display())))?;
    util::restrict_permissions(output).map_err(|err| DocketError::Compose(err.to_string()))?;
    Ok(())
}

fn cover_lines(operator: &str, flight: &FlightMetadata) -> Vec<TextLine> {
    let generated = Local::now().format("%Y-%m-%d %H:%M %z");
    let mut lines = vec![
        TextLine::new(MARGIN_X, 660, 22, true, format!("{operator} Flight Docket")),
        TextLine::new(
            MARGIN_X,
            620,
            12,
            false,
            format!("Route: {} -> {}", flight.departure, flight.destination),
        ),
        TextLine::new(
            MARGIN_X,
            600,
            12,
            false,
            format!("Aircraft: {} / {}", flight.aircraft_type, flight.registration),
        ),
        TextLine::new(MARGIN_X, 580, 12, false, format!("Generated: {generated}")),
    ];
    let mut y = 540;
    for part in DISCLAIMER {
        lines.push(TextLine::new(MARGIN_X, y, 10, false, part));
        y -= 14;
    }
    lines
}

fn index_lines(presence: &[(Slot, Option<&Path>)]) -> Vec<TextLine> {
    let mut lines = vec![TextLine::new(MARGIN_X, 770, 16, true, "Contents and Checklist")];
    let mut y = 730;
    for (slot, path) in presence {
        let mark = if path.is_some() { "Included" } else { "Missing" };
        lines.push(TextLine::new(
            MARGIN_X,
            y,
            11,
            false,
            format!("{}: {mark}", slot.label()),
        ));
        y -= 20;
    }
    lines
}

fn summary_lines(flight: &FlightMetadata) -> Vec<TextLine> {
    let pairs = [
        ("Aircraft Type", flight.aircraft_type.clone()),
        ("Registration", flight.registration.clone()),
        ("Callsign", flight.callsign.clone()),
        ("Departure", flight.departure.clone()),
        ("Destination", flight.destination.clone()),
        ("Alternates", flight.alternates.join(", ")),
        ("ETD (Local)", flight.etd_local.clone()),
    ];
    let mut lines = vec![TextLine::new(MARGIN_X, 770, 16, true, "Flight Summary")];
    let mut y = 730;
    for (key, value) in pairs {
        lines.push(TextLine::new(MARGIN_X, y, 11, true, format!("{key}:")));
        lines.push(TextLine::new(170, y, 11, false, value));
        y -= 20;
    }
    lines
}

/// Append one A4 portrait text page and return its object id.
fn text_page(
    doc: &mut Document,
    pages_id: ObjectId,
    resources_id: ObjectId,
    lines: &[TextLine],
) -> Result<ObjectId, DocketError> {
    let mut operations = Vec::new();
    for line in lines {
        let font = if line.bold { "F2" } else { "F1" };
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec![font.into(), line.size.into()]));
        operations.push(Operation::new("Td", vec![line.x.into(), line.y.into()]));
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(line.text.as_str())],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
    let content = Content { operations };
    let encoded = content
        .encode()
        .map_err(|err| DocketError::Compose(format!("encode page content: {err}")))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        "Contents" => content_id,
        "Resources" => resources_id,
    });
    Ok(page_id)
}

/// Place the operator logo on the cover when it exists and decodes. A
/// missing or undecodable logo never blocks docket generation.
fn embed_logo(doc: &mut Document, cover_id: ObjectId, logo: Option<&Path>) {
    let Some(logo) = logo.filter(|path| path.is_file()) else {
        return;
    };
    match lopdf::xobject::image(logo) {
        Ok(image) => {
            if let Err(err) = doc.insert_image(cover_id, image, (43.0, 742.0), (113.0, 57.0)) {
                tracing::warn!(logo = %logo.display(), %err, "could not place logo on cover");
            }
        }
        Err(err) => {
            tracing::warn!(logo = %logo.display(), %err, "could not decode logo");
        }
    }
}

/// Inheritable page-tree attributes that must be copied down before a page
/// is re-parented into the composite.
const INHERITED_KEYS: [&[u8]; 4] = [b"MediaBox", b"Resources", b"Rotate", b"CropBox"];

fn import_pdf(
    doc: &mut Document,
    pages_id: ObjectId,
    kids: &mut Vec<Object>,
    path: &Path,
) -> Result<(), lopdf::Error> {
    let mut src = Document::load(path)?;
    src.renumber_objects_with(doc.max_id + 1);
    doc.max_id = src.max_id;

    let page_ids: Vec<ObjectId> = src.get_pages().into_values().collect();

    // Resolve inherited attributes while the source page tree is intact.
    let mut fixes: Vec<(ObjectId, Vec<(Vec<u8>, Object)>)> = Vec::new();
    for &page_id in &page_ids {
        let mut missing = Vec::new();
        let dict = src.get_object(page_id)?.as_dict()?;
        for key in INHERITED_KEYS {
            if !dict.has(key) {
                if let Some(value) = inherited_attribute(&src, dict, key) {
                    missing.push((key.to_vec(), value));
                }
            }
        }
        fixes.push((page_id, missing));
    }

    for (page_id, missing) in fixes {
        let dict = src.get_object_mut(page_id)?.as_dict_mut()?;
        for (key, value) in missing {
            dict.set(key, value);
        }
        dict.set("Parent", pages_id);
    }

    // Carry everything across except the source catalog and page-tree nodes;
    // pages have been re-parented above.
    for (id, object) in src.objects {
        let node_type = object
            .as_dict()
            .ok()
            .and_then(|dict| dict.get(b"Type").ok())
            .and_then(|value| value.as_name().ok());
        if node_type.is_some_and(|name| name == b"Catalog" || name == b"Pages") {
            continue;
        }
        doc.objects.insert(id, object);
    }

    kids.extend(page_ids.into_iter().map(Object::from));
    Ok(())
}

fn inherited_attribute(src: &Document, page: &lopdf::Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").ok()?.as_reference().ok()?;
    loop {
        let dict = src.get_object(parent).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
}
