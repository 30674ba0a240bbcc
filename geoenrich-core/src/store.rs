//! Packed coordinate storage keyed by OSM identifier.
//!
//! Coordinates are kept as fixed-point offsets from the south-west corner of
//! the WGS84 range (`-90`, `-180`), scaled by `1e5`. That gives roughly 1.1 m
//! of precision while storing each entry in two `i32`s next to its key,
//! instead of one heap-allocated pair per node.

use geo::Coord;

const LAT_BASE: f64 = -90.0;
const LON_BASE: f64 = -180.0;
const SCALE: f64 = 100_000.0;
const LOAD_FACTOR: f64 = 0.7;
const HASH_MULTIPLIER: i64 = 2_654_435_761;
const MIN_CAPACITY: usize = 16;
const EMPTY: i64 = 0;

/// Open-addressed map from `i64` identifiers to coordinates.
///
/// Collisions are resolved by linear probing. Key `0` marks an empty slot, so
/// identifier `0` lives in a dedicated side slot instead of the table. The
/// table doubles once occupancy reaches 70% and never shrinks.
///
/// # Examples
/// ```
/// use geoenrich_core::{CoordinateStore, lat_lon};
///
/// let mut store = CoordinateStore::with_capacity(8);
/// store.put(42, lat_lon(59.91, 10.75));
///
/// let coord = store.get(42).expect("stored coordinate");
/// assert!((coord.y - 59.91).abs() < 1e-5);
/// assert!(store.get(7).is_none());
/// ```
#[derive(Debug, Clone)]
pub struct CoordinateStore {
    keys: Vec<i64>,
    lats: Vec<i32>,
    lons: Vec<i32>,
    size: usize,
    zero: Option<(i32, i32)>,
}

impl Default for CoordinateStore {
    fn default() -> Self {
        Self::with_capacity(MIN_CAPACITY)
    }
}

impl CoordinateStore {
    /// Create an empty store sized for roughly `capacity` slots.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_CAPACITY);
        Self {
            keys: vec![EMPTY; capacity],
            lats: vec![0; capacity],
            lons: vec![0; capacity],
            size: 0,
            zero: None,
        }
    }

    /// Insert or overwrite the coordinate stored for `id`.
    pub fn put(&mut self, id: i64, coord: Coord<f64>) {
        let packed = (encode(coord.y, LAT_BASE), encode(coord.x, LON_BASE));
        if id == EMPTY {
            if self.zero.replace(packed).is_none() {
                self.size += 1;
            }
            return;
        }
        if self.insert_packed(id, packed) {
            self.size += 1;
            if self.table_len() as f64 >= self.capacity() as f64 * LOAD_FACTOR {
                self.grow();
            }
        }
    }

    /// Fetch the coordinate stored for `id`, if any.
    #[must_use]
    pub fn get(&self, id: i64) -> Option<Coord<f64>> {
        let (lat, lon) = if id == EMPTY {
            self.zero?
        } else {
            let slot = self.find_slot(id)?;
            (*self.lats.get(slot)?, *self.lons.get(slot)?)
        };
        Some(Coord {
            x: decode(lon, LON_BASE),
            y: decode(lat, LAT_BASE),
        })
    }

    /// Return whether a coordinate is stored for `id`.
    #[must_use]
    pub fn contains(&self, id: i64) -> bool {
        if id == EMPTY {
            self.zero.is_some()
        } else {
            self.find_slot(id).is_some()
        }
    }

    /// Number of identifiers with a stored coordinate.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.size
    }

    /// Return whether the store holds no coordinates.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of slots in the probing table.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.keys.len()
    }

    fn table_len(&self) -> usize {
        self.size - usize::from(self.zero.is_some())
    }

    fn slot_for(&self, id: i64) -> usize {
        let capacity = i64::try_from(self.capacity()).unwrap_or(i64::MAX);
        let hashed = id.wrapping_mul(HASH_MULTIPLIER).rem_euclid(capacity);
        usize::try_from(hashed).unwrap_or_default()
    }

    fn find_slot(&self, id: i64) -> Option<usize> {
        let capacity = self.capacity();
        let mut slot = self.slot_for(id);
        for _ in 0..capacity {
            match self.keys.get(slot) {
                Some(&key) if key == id => return Some(slot),
                Some(&EMPTY) | None => return None,
                Some(_) => slot = (slot + 1) % capacity,
            }
        }
        None
    }

    /// Write into the table, returning `true` when `id` was not present.
    fn insert_packed(&mut self, id: i64, (lat, lon): (i32, i32)) -> bool {
        let capacity = self.capacity();
        let mut slot = self.slot_for(id);
        loop {
            match self.keys.get(slot).copied() {
                Some(EMPTY) => {
                    self.write_slot(slot, id, lat, lon);
                    return true;
                }
                Some(key) if key == id => {
                    self.write_slot(slot, id, lat, lon);
                    return false;
                }
                _ => slot = (slot + 1) % capacity,
            }
        }
    }

    fn write_slot(&mut self, slot: usize, id: i64, lat: i32, lon: i32) {
        if let (Some(key), Some(lat_slot), Some(lon_slot)) = (
            self.keys.get_mut(slot),
            self.lats.get_mut(slot),
            self.lons.get_mut(slot),
        ) {
            *key = id;
            *lat_slot = lat;
            *lon_slot = lon;
        }
    }

    fn grow(&mut self) {
        let capacity = self.capacity() * 2;
        let keys = std::mem::replace(&mut self.keys, vec![EMPTY; capacity]);
        let lats = std::mem::replace(&mut self.lats, vec![0; capacity]);
        let lons = std::mem::replace(&mut self.lons, vec![0; capacity]);
        for ((id, lat), lon) in keys.into_iter().zip(lats).zip(lons) {
            if id != EMPTY {
                self.insert_packed(id, (lat, lon));
            }
        }
        log::debug!("coordinate store grew to {capacity} slots");
    }
}

fn encode(value: f64, base: f64) -> i32 {
    // The WGS84 range scaled by 1e5 stays below 36_000_000, well inside i32.
    ((value - base) * SCALE).round() as i32
}

fn decode(value: i32, base: f64) -> f64 {
    f64::from(value) / SCALE + base
}
