//! End-to-end pipeline scenarios over a temporary storage root.

use flight_docket::config::{Config, StoragePaths};
use flight_docket::pipeline;
use flight_docket::repo::DocketRepository;
use flight_docket::resolver::SlotSources;
use flight_docket::slots::Slot;
use flight_docket::staged::StagedStore;
use flight_docket::util;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

fn write_pdf(path: &Path, pages: usize) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let mut kids: Vec<Object> = Vec::new();
    for page_no in 0..pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(format!("page {page_no}"))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
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
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    doc.save(path).unwrap();
}

fn test_config(root: &Path) -> Config {
    Config {
        paths: StoragePaths::under(root),
        ..Config::default()
    }
}

fn required_uploads(root: &Path) -> HashMap<Slot, PathBuf> {
    let mut uploads = HashMap::new();
    for slot in [
        Slot::AcceptedFlightPlan,
        Slot::MassBalance,
        Slot::Performance,
        Slot::Notams,
    ] {
        let path = root.join("inbox").join(slot.file_name());
        write_pdf(&path, 1);
        uploads.insert(slot, path);
    }
    uploads
}

fn json_manifests(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let Ok(entries) = fs::read_dir(&current) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "json") {
                found.push(path);
            }
        }
    }
    found
}

#[test]
fn all_required_no_optional_yields_seven_pages_and_a_matching_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let staged_store = StagedStore::open(&config.paths.staging).unwrap();

    let flight = flight_docket::FlightMetadata::new(
        "C172", "G-ABCD", "OTR12", "EGMA", "LEGR", "", "09:30",
    )
    .unwrap();
    let sources = SlotSources {
        uploads: required_uploads(dir.path()),
        staged: HashMap::new(),
    };

    let outcome = pipeline::assemble(&config, &staged_store, flight, &sources).unwrap();
    let record = outcome.record;

    // 3 brand pages + 4 single-page required documents.
    let composite = Document::load(&record.generated_pdf).unwrap();
    assert_eq!(composite.get_pages().len(), 7);

    // Chart packs were empty for both ICAOs.
    assert_eq!(record.files["charts_departure"], None);
    assert_eq!(record.files["charts_destination"], None);
    assert_eq!(record.files["charts_alternates"], None);
    assert!(record.files["accepted_flight_plan"].is_some());
    assert_eq!(record.files["sigwx"], None);

    // The recorded hash is the sha256 of the composite on disk.
    let sha256 = util::sha256_file(&record.generated_pdf).unwrap();
    assert_eq!(record.hashes.generated_pdf_sha256, sha256);

    // The persisted manifest round-trips deep-equal.
    let repository = DocketRepository::new(config.paths.dockets.clone());
    let loaded = repository.load_by_id(&record.id).expect("manifest saved");
    assert_eq!(loaded, record);
}

#[test]
fn chart_packs_flow_into_the_composite() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let staged_store = StagedStore::open(&config.paths.staging).unwrap();

    // Two-page departure chart in the AIP cache; single file, so the merge
    // is a byte-copy and needs no external tool.
    write_pdf(&config.paths.aip.join("EGMA").join("EGMA_VAC_1.pdf"), 2);

    let flight = flight_docket::FlightMetadata::new(
        "C172", "G-ABCD", "", "EGMA", "LEGR", "", "",
    )
    .unwrap();
    let sources = SlotSources {
        uploads: required_uploads(dir.path()),
        staged: HashMap::new(),
    };

    let outcome = pipeline::assemble(&config, &staged_store, flight, &sources).unwrap();
    let record = outcome.record;

    let composite = Document::load(&record.generated_pdf).unwrap();
    assert_eq!(composite.get_pages().len(), 7 + 2);
    assert!(record.files["charts_departure"].is_some());
    assert_eq!(record.files["charts_destination"], None);
}

#[test]
fn missing_required_upload_persists_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let staged_store = StagedStore::open(&config.paths.staging).unwrap();

    let flight = flight_docket::FlightMetadata::new(
        "C172", "G-ABCD", "", "EGMA", "LEGR", "", "",
    )
    .unwrap();
    let mut uploads = required_uploads(dir.path());
    uploads.remove(&Slot::MassBalance);
    let sources = SlotSources {
        uploads,
        staged: HashMap::new(),
    };

    let err = pipeline::assemble(&config, &staged_store, flight, &sources).unwrap_err();
    assert!(matches!(
        err,
        flight_docket::DocketError::MissingRequiredSource(_)
    ));

    // No manifest anywhere under the dockets tree, no composite output.
    assert!(json_manifests(&config.paths.dockets).is_empty());
    let generated: Vec<_> = fs::read_dir(&config.paths.generated)
        .map(|entries| entries.flatten().collect())
        .unwrap_or_default();
    assert!(generated.is_empty());
}

#[test]
fn staged_fetch_feeds_a_slot_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let staged_store = StagedStore::open(&config.paths.staging).unwrap();

    let fetched = dir.path().join("fetched").join("metar_taf.pdf");
    write_pdf(&fetched, 1);
    let key = staged_store.stage(&fetched).unwrap();

    let flight = flight_docket::FlightMetadata::new(
        "C172", "G-ABCD", "", "EGMA", "LEGR", "", "",
    )
    .unwrap();
    let mut staged = HashMap::new();
    staged.insert(Slot::MetarTaf, key);
    let sources = SlotSources {
        uploads: required_uploads(dir.path()),
        staged,
    };

    let outcome = pipeline::assemble(&config, &staged_store, flight, &sources).unwrap();
    let record = outcome.record;

    let composite = Document::load(&record.generated_pdf).unwrap();
    assert_eq!(composite.get_pages().len(), 8);
    assert!(record.files["metar_taf"].is_some());
}
