//! Shared helpers for tests that read the encoded PBF fixtures.

use base64::{Engine as _, engine::general_purpose};
use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::{Builder, TempPath};

/// Directory containing the encoded fixture blobs.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Decode `tests/fixtures/{stem}.osm.pbf.b64` into a temporary `.osm.pbf` file.
pub fn decode_fixture(dir: &Path, stem: &str) -> TempPath {
    let encoded_path = dir.join(format!("{stem}.osm.pbf.b64"));
    let encoded = fs::read_to_string(&encoded_path).unwrap_or_else(|err| {
        panic!("failed to read base64 fixture {encoded_path:?}: {err}");
    });
    let cleaned: String = encoded
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    let decoded = general_purpose::STANDARD
        .decode(cleaned.as_bytes())
        .unwrap_or_else(|err| {
            panic!("failed to decode base64 fixture {encoded_path:?}: {err}");
        });
    let mut tempfile = Builder::new()
        .prefix(stem)
        .suffix(".osm.pbf")
        .tempfile()
        .unwrap_or_else(|err| panic!("failed to create temporary fixture for {stem}: {err}"));
    tempfile
        .write_all(&decoded)
        .unwrap_or_else(|err| panic!("failed to write decoded fixture for {stem}: {err}"));
    tempfile
        .flush()
        .unwrap_or_else(|err| panic!("failed to flush decoded fixture for {stem}: {err}"));
    tempfile.into_temp_path()
}
