//! CSV store loader.
//!
//! # CSV format
//!
//! Two files: one row per vehicle, one row per package.
//!
//! ```csv
//! vehicle_id,origin_lng,origin_lat
//! 1,-73.9857,40.7484
//! 2,-73.9772,40.7527
//! ```
//!
//! ```csv
//! package_id,vehicle_id,dest_lng,dest_lat,delivered
//! 10,1,-73.9800,40.7500,false
//! 11,1,,,
//! 12,2,-73.9700,40.7600,true
//! ```
//!
//! Empty coordinates mean "no geocoded address": the package is still
//! assigned but cannot be delivered by proximity.  An empty `delivered`
//! column means `false`; `true`/`false`/`1`/`0` are accepted.
//!
//! A package naming a vehicle absent from the vehicles file is an error.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use fleet_core::{GeoPoint, PackageId, VehicleId};

use crate::{InMemoryStore, PackageRecord, SimError, SimResult};

// ── CSV records ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct VehicleRow {
    vehicle_id: u32,
    origin_lng: f64,
    origin_lat: f64,
}

#[derive(Deserialize)]
struct PackageRow {
    package_id: u32,
    vehicle_id: u32,
    dest_lng:   Option<f64>,
    dest_lat:   Option<f64>,
    delivered:  Option<String>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load an [`InMemoryStore`] from a vehicles CSV and a packages CSV.
pub fn load_store_csv(vehicles: &Path, packages: &Path) -> SimResult<InMemoryStore> {
    let vehicles = std::fs::File::open(vehicles).map_err(SimError::Io)?;
    let packages = std::fs::File::open(packages).map_err(SimError::Io)?;
    load_store_readers(vehicles, packages)
}

/// Like [`load_store_csv`] but accepts any `Read` sources.
pub fn load_store_readers<V: Read, P: Read>(vehicles: V, packages: P) -> SimResult<InMemoryStore> {
    let mut store = InMemoryStore::new();

    // ── Vehicles ──────────────────────────────────────────────────────────
    let mut reader = csv::Reader::from_reader(vehicles);
    for result in reader.deserialize::<VehicleRow>() {
        let row = result.map_err(|e| SimError::Parse(e.to_string()))?;
        store.add_vehicle(
            VehicleId(row.vehicle_id),
            GeoPoint::new(row.origin_lng, row.origin_lat),
        );
    }

    // ── Packages ──────────────────────────────────────────────────────────
    let mut reader = csv::Reader::from_reader(packages);
    for result in reader.deserialize::<PackageRow>() {
        let row = result.map_err(|e| SimError::Parse(e.to_string()))?;
        let vehicle = VehicleId(row.vehicle_id);
        if !store.has_vehicle(vehicle) {
            return Err(SimError::Parse(format!(
                "package {} references unknown vehicle {}",
                row.package_id, row.vehicle_id
            )));
        }
        let destination = match (row.dest_lng, row.dest_lat) {
            (Some(lng), Some(lat)) => Some(GeoPoint::new(lng, lat)),
            _ => None,
        };
        store.add_package(PackageRecord {
            id: PackageId(row.package_id),
            vehicle,
            destination,
            delivered: parse_delivered(row.delivered.as_deref())?,
        });
    }

    Ok(store)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn parse_delivered(s: Option<&str>) -> SimResult<bool> {
    match s.map(str::trim) {
        None | Some("") => Ok(false),
        Some("true" | "1") => Ok(true),
        Some("false" | "0") => Ok(false),
        Some(other) => Err(SimError::Parse(format!(
            "invalid delivered flag {other:?}: expected true, false, 1, or 0"
        ))),
    }
}
