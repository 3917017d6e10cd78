//! End-to-end issuance and attribution against a durable ledger.

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use image::{ImageFormat, Rgb, RgbImage};
use tracemark_attribution::{
    ArtifactReference, AttributionError, AttributionResult, CarrierType, CodeGenerator,
    CodecKind, CodecRegistry, FileLedger, JsonScheme, LeakAttributionService, Requester,
    SyncMode, TrackingCode, TrackingLedger,
};
use tracemark_ledger::{LedgerError, LedgerReader};

fn t1() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 20, 9, 15, 0).unwrap()
}

fn scripted(codes: &[&str]) -> impl CodeGenerator {
    let queue: VecDeque<TrackingCode> = codes
        .iter()
        .map(|c| TrackingCode::parse(c).unwrap())
        .collect();
    let queue = Mutex::new(queue);
    move || {
        let mut queue = queue.lock().unwrap();
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        }
    }
}

fn open_ledger(dir: &tempfile::TempDir) -> Arc<dyn TrackingLedger> {
    Arc::new(FileLedger::open(&dir.path().join("issued.log"), SyncMode::EveryWrite).unwrap())
}

fn service(codes: &[&str], ledger: Arc<dyn TrackingLedger>, scheme: JsonScheme) -> LeakAttributionService {
    LeakAttributionService::new(scripted(codes), CodecRegistry::new(scheme), ledger).with_clock(t1)
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) * 3 % 256) as u8])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn winter_card() -> ArtifactReference {
    ArtifactReference::new("WinterEvent", "CharacterCard", "v1.0")
}

#[test]
fn scenario_a_issue_and_attribute_image() {
    let dir = tempfile::tempdir().unwrap();
    let issued = {
        let svc = service(&["AB12CD34"], open_ledger(&dir), JsonScheme::Field);
        svc.issue(&png(64, 48), CarrierType::Image, &Requester::new("U1"), &winter_card())
            .unwrap()
    };
    assert_eq!(issued.record.tracking_code.as_str(), "AB12CD34");
    assert_eq!(issued.extension, Some("png"));
    assert_eq!(issued.file_name("card.jpg"), "card.png");

    // A later process with a fresh handle on the same log.
    let svc = service(&["00000000"], open_ledger(&dir), JsonScheme::Field);
    match svc.verify_file(&issued.content, "leaked.png").unwrap() {
        AttributionResult::Attributed { record, recovered_by } => {
            assert_eq!(recovered_by, CodecKind::ImageLsb);
            assert_eq!(record.requester.id, "U1");
            assert_eq!(record.artifact, winter_card());
            assert_eq!(record.issued_at, t1());
            assert_eq!(record.tracking_code.as_str(), "AB12CD34");
        }
        other => panic!("expected attribution, got {other:?}"),
    }
}

#[test]
fn scenario_b_tiny_image_is_rejected_without_a_record() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = open_ledger(&dir);
    let svc = service(&["AB12CD34"], ledger.clone(), JsonScheme::Field);

    let err = svc
        .issue(&png(4, 4), CarrierType::Image, &Requester::new("U1"), &winter_card())
        .unwrap_err();
    assert!(matches!(
        err,
        AttributionError::InsufficientCapacity {
            required_bits: 104,
            available_bits: 48
        }
    ));
    assert!(ledger.is_empty().unwrap());
}

#[test]
fn scenario_c_text_files_are_unsupported() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&["AB12CD34"], open_ledger(&dir), JsonScheme::Field);
    assert_eq!(
        svc.verify_file(b"just some notes", "readme.txt").unwrap(),
        AttributionResult::UnsupportedFormat
    );
}

#[test]
fn scenario_d_legacy_sequence_survives_extension_removal() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = open_ledger(&dir);
    let legacy = service(&["5EED0001"], ledger.clone(), JsonScheme::ZeroWidth);
    let original = r#"{"data":{"name":"Card"},"extensions":{"tracking_id":"5EED0001"}}"#;
    let issued = legacy
        .issue(original.as_bytes(), CarrierType::Json, &Requester::new("U7"), &winter_card())
        .unwrap();

    let edited = String::from_utf8(issued.content)
        .unwrap()
        .replace(r#","extensions":{"tracking_id":"5EED0001"}"#, "");
    assert!(!edited.contains("extensions"));

    let current = service(&["00000000"], ledger, JsonScheme::Field);
    match current.verify(edited.as_bytes(), CarrierType::Json).unwrap() {
        AttributionResult::Attributed { record, recovered_by } => {
            assert_eq!(recovered_by, CodecKind::JsonZeroWidth);
            assert_eq!(record.tracking_code.as_str(), "5EED0001");
            assert_eq!(record.requester.id, "U7");
        }
        other => panic!("expected attribution, got {other:?}"),
    }
}

#[test]
fn forced_collision_still_issues_a_fresh_code() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = open_ledger(&dir);
    service(&["AAAAAAAA"], ledger.clone(), JsonScheme::Field)
        .issue(b"{}", CarrierType::Json, &Requester::new("U1"), &winter_card())
        .unwrap();

    let svc = service(&["AAAAAAAA", "BBBBBBBB"], ledger.clone(), JsonScheme::Field);
    let issued = svc
        .issue(b"{}", CarrierType::Json, &Requester::new("U2"), &winter_card())
        .unwrap();
    assert_eq!(issued.record.tracking_code.as_str(), "BBBBBBBB");

    let first = ledger
        .lookup_by_code(&TrackingCode::parse("AAAAAAAA").unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(first.requester.id, "U1");
    assert_eq!(ledger.len().unwrap(), 2);
}

#[test]
fn empty_data_object_gets_canonical_field() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&["0D0D0D0D"], open_ledger(&dir), JsonScheme::Field);
    let issued = svc
        .issue(br#"{"data":{}}"#, CarrierType::Json, &Requester::new("U1"), &winter_card())
        .unwrap();

    let doc: serde_json::Value = serde_json::from_slice(&issued.content).unwrap();
    assert_eq!(doc["data"]["extensions"]["tracking_id"], "0D0D0D0D");
    assert!(svc
        .verify(&issued.content, CarrierType::Json)
        .unwrap()
        .is_attributed());
}

#[test]
fn jpeg_carriers_come_back_as_png() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&["1A2B3C4D"], open_ledger(&dir), JsonScheme::Field);

    let img = RgbImage::from_pixel(40, 40, Rgb([120, 80, 200]));
    let mut jpeg = Cursor::new(Vec::new());
    img.write_to(&mut jpeg, ImageFormat::Jpeg).unwrap();

    let issued = svc
        .issue(jpeg.get_ref(), CarrierType::from_filename("card.jpeg"), &Requester::new("U3"), &winter_card())
        .unwrap();
    assert_eq!(image::guess_format(&issued.content).unwrap(), ImageFormat::Png);
    assert_eq!(
        svc.verify_file(&issued.content, "card.png")
            .unwrap()
            .tracking_code()
            .map(TrackingCode::as_str),
        Some("1A2B3C4D")
    );
}

#[test]
fn oversized_record_fails_closed_and_history_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let svc = service(&["00000001", "00000002", "00000003"], open_ledger(&dir), JsonScheme::Field);

    svc.issue(b"{}", CarrierType::Json, &Requester::new("U1"), &winter_card())
        .unwrap();
    let oversized = ArtifactReference::new("WinterEvent", "x".repeat(70 * 1024), "v1.0");
    let err = svc
        .issue(b"{}", CarrierType::Json, &Requester::new("U2"), &oversized)
        .unwrap_err();
    assert!(matches!(
        err,
        AttributionError::StorageFailure(LedgerError::RecordTooLarge { .. })
    ));
    svc.issue(b"{}", CarrierType::Json, &Requester::new("U3"), &winter_card())
        .unwrap();
    drop(svc);

    let ledger = open_ledger(&dir);
    assert_eq!(ledger.len().unwrap(), 2);
    let requesters: Vec<String> = ledger
        .lookup_by_post("WinterEvent", 10, false)
        .unwrap()
        .into_iter()
        .map(|r| r.requester.id)
        .collect();
    assert_eq!(requesters, vec!["U1", "U3"]);
}
