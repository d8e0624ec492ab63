//! Slot source resolution.
//!
//! Each slot is resolved in a fixed preference order: a staged fetch result,
//! then a direct upload, then (for chart slots) a merged chart pack, then
//! absent. Resolved content is copied into the per-run working directory
//! under the slot's fixed filename with restricted permissions. A required
//! slot exhausting every source aborts the run before any compose or persist
//! work happens.

use crate::charts::{self, ChartMerger};
use crate::error::DocketError;
use crate::flight::FlightMetadata;
use crate::slots::{Slot, CANONICAL_ORDER};
use crate::staged::StagedStore;
use crate::util;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Caller-supplied inputs for one run: validated upload paths and staged
/// fetch keys, both keyed by slot.
#[derive(Debug, Default)]
pub struct SlotSources {
    pub uploads: HashMap<Slot, PathBuf>,
    pub staged: HashMap<Slot, String>,
}

pub struct ResolveContext<'a> {
    pub workdir: &'a Path,
    pub aip_base: &'a Path,
    pub staged_store: &'a StagedStore,
    pub merger: &'a ChartMerger,
    pub max_upload_bytes: u64,
}

/// Resolve every slot in canonical order.
pub fn resolve_all(
    ctx: &ResolveContext<'_>,
    flight: &FlightMetadata,
    sources: &SlotSources,
) -> Result<Vec<(Slot, Option<PathBuf>)>, DocketError> {
    util::ensure_dir(ctx.workdir).map_err(|err| DocketError::Storage(err.to_string()))?;

    let mut resolved = Vec::with_capacity(CANONICAL_ORDER.len());
    for slot in CANONICAL_ORDER {
        let path = resolve_slot(ctx, flight, sources, slot)?;
        tracing::debug!(
            slot = slot.key(),
            resolved = path.is_some(),
            "slot resolution"
        );
        resolved.push((slot, path));
    }
    Ok(resolved)
}

fn resolve_slot(
    ctx: &ResolveContext<'_>,
    flight: &FlightMetadata,
    sources: &SlotSources,
    slot: Slot,
) -> Result<Option<PathBuf>, DocketError> {
    if let Some(key) = sources.staged.get(&slot) {
        if let Some(path) = take_staged(ctx, slot, key) {
            return Ok(Some(path));
        }
    }

    if let Some(upload) = sources.uploads.get(&slot) {
        if let Some(path) = accept_upload(ctx, slot, upload) {
            return Ok(Some(path));
        }
    }

    if slot.is_chart() {
        return Ok(resolve_charts(ctx, flight, slot));
    }

    if slot.required() {
        return Err(DocketError::MissingRequiredSource(slot.key().to_string()));
    }
    Ok(None)
}

/// Consume a staged-fetch entry. The key is spent regardless of whether the
/// copy succeeds; a failed copy falls through to the next source.
fn take_staged(ctx: &ResolveContext<'_>, slot: Slot, key: &str) -> Option<PathBuf> {
    let staged = ctx.staged_store.take(key)?;
    if !staged.is_file() {
        tracing::warn!(slot = slot.key(), key, "staged entry vanished");
        return None;
    }
    let dest = ctx.workdir.join(slot.file_name());
    let copied = fs::copy(&staged, &dest);
    let _ = fs::remove_file(&staged);
    match copied {
        Ok(_) => {
            if let Err(err) = util::restrict_permissions(&dest) {
                tracing::warn!(slot = slot.key(), %err, "could not restrict staged copy");
            }
            Some(dest)
        }
        Err(err) => {
            tracing::warn!(slot = slot.key(), key, %err, "staged copy failed");
            None
        }
    }
}

/// Re-check the collaborator's upload preconditions (magic bytes, size cap)
/// before moving the file into the working directory.
fn accept_upload(ctx: &ResolveContext<'_>, slot: Slot, upload: &Path) -> Option<PathBuf> {
    if !util::looks_like_pdf(upload) {
        tracing::warn!(slot = slot.key(), upload = %upload.display(), "upload is not a PDF");
        return None;
    }
    let size = fs::metadata(upload).map(|meta| meta.len()).unwrap_or(0);
    if size == 0 || size > ctx.max_upload_bytes {
        tracing::warn!(slot = slot.key(), size, "upload outside size limits");
        return None;
    }
    let dest = ctx.workdir.join(slot.file_name());
    match fs::copy(upload, &dest) {
        Ok(_) => {
            if let Err(err) = util::restrict_permissions(&dest) {
                tracing::warn!(slot = slot.key(), %err, "could not restrict upload copy");
            }
            Some(dest)
        }
        Err(err) => {
            tracing::warn!(slot = slot.key(), %err, "upload copy failed");
            None
        }
    }
}

/// Chart slots draw on the AIP cache: departure and destination each merge
/// their own pack, the alternates slot merges the union of every alternate's
/// pack. An empty pack or a failed merge leaves the slot absent.
fn resolve_charts(
    ctx: &ResolveContext<'_>,
    flight: &FlightMetadata,
    slot: Slot,
) -> Option<PathBuf> {
    let pack: Vec<PathBuf> = match slot {
        Slot::ChartsDeparture => charts::chart_pack(&flight.departure, ctx.aip_base),
        Slot::ChartsDestination => charts::chart_pack(&flight.destination, ctx.aip_base),
        Slot::ChartsAlternates => flight
            .alternates
            .iter()
            .flat_map(|icao| charts::chart_pack(icao, ctx.aip_base))
            .collect(),
        _ => Vec::new(),
    };
    if pack.is_empty() {
        return None;
    }

    let dest = ctx.workdir.join(slot.file_name());
    match ctx.merger.merge(&pack, &dest) {
        Ok(()) => Some(dest),
        Err(err) => {
            tracing::warn!(slot = slot.key(), %err, "chart merge failed, slot left absent");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        _dir: tempfile::TempDir,
        workdir: PathBuf,
        aip: PathBuf,
        staging: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let workdir = dir.path().join("work");
        let aip = dir.path().join("aip");
        let staging = dir.path().join("staging");
        fs::create_dir_all(&aip).unwrap();
        Fixture {
            workdir,
            aip,
            staging,
            _dir: dir,
        }
    }

    fn flight() -> FlightMetadata {
        FlightMetadata::new("C172", "G-ABCD", "", "EGMA", "LEGR", "LEMD", "09:30").unwrap()
    }

    fn write_fake_pdf(path: &Path, body: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut bytes = b"%PDF-1.4\n".to_vec();
        bytes.extend_from_slice(body);
        fs::write(path, bytes).unwrap();
    }

    fn uploads_for_required(fx: &Fixture) -> HashMap<Slot, PathBuf> {
        let mut uploads = HashMap::new();
        for slot in CANONICAL_ORDER.iter().filter(|slot| slot.required()) {
            let path = fx.aip.join(format!("upload_{}.pdf", slot.key()));
            write_fake_pdf(&path, slot.key().as_bytes());
            uploads.insert(*slot, path);
        }
        uploads
    }

    fn context<'a>(fx: &'a Fixture, store: &'a StagedStore, merger: &'a ChartMerger) -> ResolveContext<'a> {
        ResolveContext {
            workdir: &fx.workdir,
            aip_base: &fx.aip,
            staged_store: store,
            merger,
            max_upload_bytes: 30 * 1024 * 1024,
        }
    }

    #[test]
    fn missing_required_slot_aborts() {
        let fx = fixture();
        let store = StagedStore::open(&fx.staging).unwrap();
        let merger = ChartMerger::with_chain(Vec::new());
        let ctx = context(&fx, &store, &merger);

        let mut sources = SlotSources {
            uploads: uploads_for_required(&fx),
            staged: HashMap::new(),
        };
        sources.uploads.remove(&Slot::Notams);

        let err = resolve_all(&ctx, &flight(), &sources).unwrap_err();
        match err {
            DocketError::MissingRequiredSource(slot) => assert_eq!(slot, "notams"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn required_uploads_land_under_fixed_names() {
        let fx = fixture();
        let store = StagedStore::open(&fx.staging).unwrap();
        let merger = ChartMerger::with_chain(Vec::new());
        let ctx = context(&fx, &store, &merger);

        let sources = SlotSources {
            uploads: uploads_for_required(&fx),
            staged: HashMap::new(),
        };

        let resolved = resolve_all(&ctx, &flight(), &sources).unwrap();
        let plan = resolved
            .iter()
            .find(|(slot, _)| *slot == Slot::AcceptedFlightPlan)
            .and_then(|(_, path)| path.clone())
            .expect("required slot resolved");
        assert_eq!(plan, fx.workdir.join("accepted_flight_plan.pdf"));
        assert!(plan.is_file());

        // Optional slots with no source stay absent.
        let sigwx = resolved.iter().find(|(slot, _)| *slot == Slot::Sigwx).unwrap();
        assert!(sigwx.1.is_none());
    }

    #[test]
    fn staged_entry_wins_over_upload_and_is_consumed() {
        let fx = fixture();
        let store = StagedStore::open(&fx.staging).unwrap();
        let merger = ChartMerger::with_chain(Vec::new());
        let ctx = context(&fx, &store, &merger);

        let fetched = fx.aip.join("fetched_notams.pdf");
        write_fake_pdf(&fetched, b"from the notam service");
        let key = store.stage(&fetched).unwrap();

        let mut sources = SlotSources {
            uploads: uploads_for_required(&fx),
            staged: HashMap::new(),
        };
        sources.staged.insert(Slot::Notams, key.clone());

        let resolved = resolve_all(&ctx, &flight(), &sources).unwrap();
        let notams = resolved
            .iter()
            .find(|(slot, _)| *slot == Slot::Notams)
            .and_then(|(_, path)| path.clone())
            .unwrap();
        let body = fs::read(&notams).unwrap();
        assert!(body.ends_with(b"from the notam service"));
        assert!(store.take(&key).is_none(), "key must be spent");
    }

    #[test]
    fn non_pdf_upload_is_rejected_and_required_slot_fails() {
        let fx = fixture();
        let store = StagedStore::open(&fx.staging).unwrap();
        let merger = ChartMerger::with_chain(Vec::new());
        let ctx = context(&fx, &store, &merger);

        let mut sources = SlotSources {
            uploads: uploads_for_required(&fx),
            staged: HashMap::new(),
        };
        let bogus = fx.aip.join("bogus.pdf");
        fs::write(&bogus, b"plain text, no magic").unwrap();
        sources.uploads.insert(Slot::Performance, bogus);

        let err = resolve_all(&ctx, &flight(), &sources).unwrap_err();
        assert!(matches!(err, DocketError::MissingRequiredSource(_)));
    }

    #[test]
    fn chart_slots_merge_from_the_aip_cache() {
        let fx = fixture();
        let store = StagedStore::open(&fx.staging).unwrap();
        let merger = ChartMerger::with_chain(Vec::new());
        let ctx = context(&fx, &store, &merger);

        // One chart for the departure, none for destination or alternates.
        write_fake_pdf(&fx.aip.join("EGMA").join("EGMA_VAC.pdf"), b"vac egma");

        let sources = SlotSources {
            uploads: uploads_for_required(&fx),
            staged: HashMap::new(),
        };

        let resolved = resolve_all(&ctx, &flight(), &sources).unwrap();
        let by_slot: HashMap<Slot, Option<PathBuf>> = resolved.into_iter().collect();

        let departure = by_slot[&Slot::ChartsDeparture].clone().expect("merged");
        assert_eq!(departure, fx.workdir.join("charts_departure.pdf"));
        let body = fs::read(&departure).unwrap();
        assert!(body.ends_with(b"vac egma"), "singleton merge is a byte copy");

        assert!(by_slot[&Slot::ChartsDestination].is_none());
        assert!(by_slot[&Slot::ChartsAlternates].is_none());
    }
}
