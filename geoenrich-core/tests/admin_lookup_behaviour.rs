//! Behavioural tests for county and municipality lookup.

use geo::Coord;
use geoenrich_core::{
    AdminBoundaryIndexBuilder, AdminIndexConfig, AdministrativeBoundary, lat_lon,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;

type Lookup = (Option<String>, Option<String>);

fn square(id: i64, name: &str, level: u8, south: f64, west: f64, size: f64) -> AdministrativeBoundary {
    let ring = vec![
        lat_lon(south, west),
        lat_lon(south, west + size),
        lat_lon(south + size, west + size),
        lat_lon(south + size, west),
    ];
    AdministrativeBoundary::from_ring(id, name, level, None, "NO", ring).expect("square ring")
}

fn look_up(boundaries: &RefCell<Vec<AdministrativeBoundary>>, points: &[Coord<f64>]) -> (Vec<Lookup>, usize) {
    let mut builder = AdminBoundaryIndexBuilder::new(AdminIndexConfig::default());
    for boundary in boundaries.borrow().iter().cloned() {
        builder.add(boundary);
    }
    let mut index = builder.build();
    let lookups = points
        .iter()
        .map(|point| {
            let (county, municipality) = index.find_county_and_municipality(*point);
            (
                county.map(|b| b.name.clone()),
                municipality.map(|b| b.name.clone()),
            )
        })
        .collect();
    (lookups, index.cache_len())
}

#[fixture]
fn boundaries() -> RefCell<Vec<AdministrativeBoundary>> {
    RefCell::new(Vec::new())
}

#[fixture]
fn lookups() -> RefCell<Vec<Lookup>> {
    RefCell::new(Vec::new())
}

#[fixture]
fn cache_size() -> RefCell<usize> {
    RefCell::new(0)
}

#[given("a county covering a ten degree square")]
fn big_county(#[from(boundaries)] boundaries: &RefCell<Vec<AdministrativeBoundary>>) {
    boundaries
        .borrow_mut()
        .push(square(1, "Big county", 4, 0.0, 0.0, 10.0));
}

#[given("a smaller county inside it")]
fn small_county(#[from(boundaries)] boundaries: &RefCell<Vec<AdministrativeBoundary>>) {
    boundaries
        .borrow_mut()
        .push(square(2, "Small county", 4, 2.0, 2.0, 2.0));
}

#[given("a municipality inside the smaller county")]
fn municipality(#[from(boundaries)] boundaries: &RefCell<Vec<AdministrativeBoundary>>) {
    boundaries
        .borrow_mut()
        .push(square(3, "Town", 7, 2.5, 2.5, 0.5));
}

#[given("a county far to the north east")]
fn far_county(#[from(boundaries)] boundaries: &RefCell<Vec<AdministrativeBoundary>>) {
    boundaries
        .borrow_mut()
        .push(square(4, "Far county", 4, 30.0, 30.0, 2.0));
}

#[when("I look up a point inside the municipality")]
fn look_up_inside(
    #[from(boundaries)] boundaries: &RefCell<Vec<AdministrativeBoundary>>,
    #[from(lookups)] lookups: &RefCell<Vec<Lookup>>,
) {
    let (found, _) = look_up(boundaries, &[lat_lon(2.75, 2.75)]);
    *lookups.borrow_mut() = found;
}

#[when("I look up a point between the two counties near the far one")]
fn look_up_between(
    #[from(boundaries)] boundaries: &RefCell<Vec<AdministrativeBoundary>>,
    #[from(lookups)] lookups: &RefCell<Vec<Lookup>>,
) {
    let (found, _) = look_up(boundaries, &[lat_lon(28.0, 28.0)]);
    *lookups.borrow_mut() = found;
}

#[when("I look up the same point twice")]
fn look_up_twice(
    #[from(boundaries)] boundaries: &RefCell<Vec<AdministrativeBoundary>>,
    #[from(lookups)] lookups: &RefCell<Vec<Lookup>>,
    #[from(cache_size)] cache_size: &RefCell<usize>,
) {
    let point = lat_lon(5.0, 5.0);
    let (found, cached) = look_up(boundaries, &[point, point]);
    *lookups.borrow_mut() = found;
    *cache_size.borrow_mut() = cached;
}

#[then("the smaller county is returned")]
fn smaller_county_returned(#[from(lookups)] lookups: &RefCell<Vec<Lookup>>) {
    let lookups = lookups.borrow();
    let (county, _) = lookups.first().expect("one lookup");
    assert_eq!(county.as_deref(), Some("Small county"));
}

#[then("the municipality is returned")]
fn municipality_returned(#[from(lookups)] lookups: &RefCell<Vec<Lookup>>) {
    let lookups = lookups.borrow();
    let (_, municipality) = lookups.first().expect("one lookup");
    assert_eq!(municipality.as_deref(), Some("Town"));
}

#[then("the far county is returned")]
fn far_county_returned(#[from(lookups)] lookups: &RefCell<Vec<Lookup>>) {
    let lookups = lookups.borrow();
    let (county, _) = lookups.first().expect("one lookup");
    assert_eq!(county.as_deref(), Some("Far county"));
}

#[then("no municipality is returned")]
fn no_municipality(#[from(lookups)] lookups: &RefCell<Vec<Lookup>>) {
    let lookups = lookups.borrow();
    let (_, municipality) = lookups.first().expect("one lookup");
    assert!(municipality.is_none(), "no municipalities were indexed");
}

#[then("both lookups agree")]
fn lookups_agree(#[from(lookups)] lookups: &RefCell<Vec<Lookup>>) {
    let lookups = lookups.borrow();
    assert_eq!(lookups.len(), 2);
    assert_eq!(lookups.first(), lookups.get(1));
}

#[then("the cache holds one entry")]
fn single_cache_entry(#[from(cache_size)] cache_size: &RefCell<usize>) {
    assert_eq!(*cache_size.borrow(), 1);
}

#[scenario(path = "tests/features/admin_lookup.feature", index = 0)]
fn scenario_nested_boundaries(
    boundaries: RefCell<Vec<AdministrativeBoundary>>,
    lookups: RefCell<Vec<Lookup>>,
    cache_size: RefCell<usize>,
) {
    let _ = (boundaries, lookups, cache_size);
}

#[scenario(path = "tests/features/admin_lookup.feature", index = 1)]
fn scenario_outside_every_boundary(
    boundaries: RefCell<Vec<AdministrativeBoundary>>,
    lookups: RefCell<Vec<Lookup>>,
    cache_size: RefCell<usize>,
) {
    let _ = (boundaries, lookups, cache_size);
}

#[scenario(path = "tests/features/admin_lookup.feature", index = 2)]
fn scenario_repeated_lookup(
    boundaries: RefCell<Vec<AdministrativeBoundary>>,
    lookups: RefCell<Vec<Lookup>>,
    cache_size: RefCell<usize>,
) {
    let _ = (boundaries, lookups, cache_size);
}
