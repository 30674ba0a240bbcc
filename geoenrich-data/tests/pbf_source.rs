//! The PBF-backed entity source against real and broken input.
//!
//! `testcounty` holds a level 4 boundary relation (1000) around a square way
//! (100) over nodes 1-4, a cafe node (10) and the street Storgata (way 200
//! over nodes 20 and 21). `headerless` holds the same data block without the
//! leading `OSMHeader` blob.

mod support;

use std::io::Write;
use std::path::PathBuf;

use geoenrich_core::{EnrichedRecord, EntityKind};
use geoenrich_data::{
    Entity, EntityFilter, EntitySource, MemberKind, PbfSource, PipelineConfig, PipelineError,
    SourceError, enrich_osm_pbf,
};
use rstest::{fixture, rstest};
use support::{decode_fixture, fixtures_dir};
use tempfile::{NamedTempFile, TempDir, TempPath};

#[fixture]
fn scratch() -> TempDir {
    TempDir::new().expect("create scratch directory")
}

#[fixture]
fn garbage() -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp file");
    file.write_all(&[0xff; 64]).expect("write garbage");
    file
}

#[fixture]
fn empty() -> NamedTempFile {
    NamedTempFile::new().expect("create temp file")
}

#[fixture]
fn testcounty() -> TempPath {
    decode_fixture(&fixtures_dir(), "testcounty")
}

#[fixture]
fn headerless() -> TempPath {
    decode_fixture(&fixtures_dir(), "headerless")
}

fn scan_all(source: &PbfSource, filter: &EntityFilter) -> Vec<Entity> {
    source
        .scan(filter)
        .expect("scan starts")
        .collect::<Result<_, _>>()
        .expect("fixture decodes")
}

fn ids(entities: &[Entity]) -> Vec<i64> {
    entities.iter().map(Entity::id).collect()
}

#[rstest]
fn missing_files_fail_to_open(scratch: TempDir) {
    let missing: PathBuf = scratch.path().join("missing.osm.pbf");
    match PbfSource::open(&missing) {
        Err(SourceError::Open { path, .. }) => assert_eq!(path, missing),
        other => panic!("expected open error, got {other:?}"),
    }
}

#[rstest]
fn garbage_is_rejected_before_any_stage(garbage: NamedTempFile) {
    let err = PbfSource::open(garbage.path()).expect_err("garbage is not PBF");
    assert!(matches!(err, SourceError::Decode { .. }), "got {err:?}");
}

#[rstest]
fn empty_files_are_not_pbf(empty: NamedTempFile) {
    let err = PbfSource::open(empty.path()).expect_err("empty file is not PBF");
    assert!(matches!(err, SourceError::NotPbf { .. }), "got {err:?}");
}

#[rstest]
fn data_without_a_header_is_not_pbf(headerless: TempPath) {
    let err = PbfSource::open(&headerless).expect_err("missing OSMHeader");
    assert!(matches!(err, SourceError::NotPbf { .. }), "got {err:?}");
}

#[rstest]
fn pipeline_reports_open_failures(scratch: TempDir) {
    let mut records: Vec<EnrichedRecord> = Vec::new();
    let err = enrich_osm_pbf(
        scratch.path().join("absent.osm.pbf"),
        PipelineConfig::default(),
        &mut records,
    )
    .expect_err("missing input");
    assert!(matches!(err, PipelineError::Open(SourceError::Open { .. })));
    assert!(records.is_empty());
}

#[rstest]
fn pipeline_refuses_empty_input(empty: NamedTempFile) {
    let mut records: Vec<EnrichedRecord> = Vec::new();
    let err = enrich_osm_pbf(empty.path(), PipelineConfig::default(), &mut records)
        .expect_err("empty input");
    assert!(matches!(err, PipelineError::Open(SourceError::NotPbf { .. })));
    assert!(records.is_empty());
}

#[rstest]
#[case(EntityKind::Node, vec![1, 2, 3, 4, 10, 20, 21])]
#[case(EntityKind::Way, vec![100, 200])]
#[case(EntityKind::Relation, vec![1000])]
fn scans_yield_only_the_requested_kind(
    testcounty: TempPath,
    #[case] kind: EntityKind,
    #[case] expected: Vec<i64>,
) {
    let source = PbfSource::open(&testcounty).expect("fixture opens");
    let entities = scan_all(&source, &EntityFilter::only(kind));
    assert!(entities.iter().all(|entity| entity.kind() == kind));
    assert_eq!(ids(&entities), expected);
}

#[rstest]
fn dense_nodes_keep_location_and_tags(testcounty: TempPath) {
    let source = PbfSource::open(&testcounty).expect("fixture opens");
    let cafe = scan_all(&source, &EntityFilter::only(EntityKind::Node))
        .into_iter()
        .find_map(|entity| match entity {
            Entity::Node(node) if node.id == 10 => Some(node),
            _ => None,
        })
        .expect("cafe node");
    assert!((cafe.location.y - 60.0003).abs() < 1e-7, "lat {}", cafe.location.y);
    assert!((cafe.location.x - 10.0).abs() < 1e-7, "lon {}", cafe.location.x);
    assert_eq!(cafe.tags.get("name").map(String::as_str), Some("Cafe"));
    assert_eq!(cafe.tags.get("amenity").map(String::as_str), Some("cafe"));
}

#[rstest]
fn ways_keep_their_node_order(testcounty: TempPath) {
    let source = PbfSource::open(&testcounty).expect("fixture opens");
    let ways = scan_all(&source, &EntityFilter::only(EntityKind::Way));
    let Some(Entity::Way(ring)) = ways.first() else {
        panic!("expected the boundary way first, got {ways:?}");
    };
    assert_eq!(ring.node_ids, vec![1, 2, 3, 4, 1]);
}

#[rstest]
fn relation_members_keep_kind_and_role(testcounty: TempPath) {
    let source = PbfSource::open(&testcounty).expect("fixture opens");
    let relations = scan_all(&source, &EntityFilter::only(EntityKind::Relation));
    let Some(Entity::Relation(county)) = relations.first() else {
        panic!("expected one relation, got {relations:?}");
    };
    let members: Vec<_> = county
        .members
        .iter()
        .map(|member| (member.kind, member.id, member.role.as_str()))
        .collect();
    assert_eq!(
        members,
        vec![
            (MemberKind::Way, 100, "outer"),
            (MemberKind::Node, 1, "admin_centre"),
        ]
    );
    assert_eq!(county.tags.get("name").map(String::as_str), Some("Testcounty"));
}

#[rstest]
fn tagless_scans_carry_empty_tag_maps(testcounty: TempPath) {
    let source = PbfSource::open(&testcounty).expect("fixture opens");
    let entities = scan_all(&source, &EntityFilter::all().without_tags());
    assert_eq!(entities.len(), 10);
    assert!(entities.iter().all(|entity| entity.tags().is_empty()));
}

#[rstest]
fn every_scan_rereads_the_file(testcounty: TempPath) {
    let source = PbfSource::open(&testcounty)
        .expect("fixture opens")
        .with_channel_capacity(1);
    let filter = EntityFilter::only(EntityKind::Node);
    let first = ids(&scan_all(&source, &filter));
    let second = ids(&scan_all(&source, &filter));
    assert_eq!(first.len(), 7);
    assert_eq!(first, second);
}

#[rstest]
fn dropping_a_stream_early_releases_the_decoder(testcounty: TempPath) {
    let source = PbfSource::open(&testcounty)
        .expect("fixture opens")
        .with_channel_capacity(1);
    let mut stream = source.scan(&EntityFilter::all()).expect("scan starts");
    assert!(matches!(stream.next(), Some(Ok(_))));
    drop(stream);
    assert_eq!(scan_all(&source, &EntityFilter::all()).len(), 10);
}

#[rstest]
fn a_panicking_decoder_is_reported(testcounty: TempPath) {
    let source = PbfSource::open(&testcounty).expect("fixture opens");
    let filter = EntityFilter::only(EntityKind::Node)
        .with_predicate(|entity| entity.id() < 10 || panic!("predicate failure"));
    let outcome: Vec<_> = source.scan(&filter).expect("scan starts").collect();
    assert_eq!(outcome.len(), 5, "four nodes then the failure: {outcome:?}");
    assert!(matches!(
        outcome.last(),
        Some(Err(SourceError::WorkerPanicked { .. }))
    ));
}

#[rstest]
fn fixture_enriches_the_cafe(testcounty: TempPath) {
    let mut records: Vec<EnrichedRecord> = Vec::new();
    let report =
        enrich_osm_pbf(&testcounty, PipelineConfig::default(), &mut records).expect("pipeline");
    assert_eq!(report.records, 1);
    assert_eq!(report.counties, 1);
    let [cafe] = records.as_slice() else {
        panic!("expected one record, got {records:?}");
    };
    assert_eq!(cafe.id, 10);
    assert_eq!(cafe.kind, EntityKind::Node);
    assert_eq!(cafe.name, "Cafe");
    let county = cafe.county.as_ref().expect("county resolved");
    assert_eq!(county.name, "Testcounty");
    assert_eq!(county.code.as_deref(), Some("03"));
    assert!(cafe.municipality.is_none());
    assert_eq!(cafe.street.as_deref(), Some("Storgata"));
}
