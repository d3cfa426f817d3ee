//! The package/vehicle store collaborator.

use std::collections::BTreeMap;

use fleet_core::{GeoPoint, PackageId, VehicleId};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{FleetObserver, SimError, SimResult};

/// One package as the store knows it.
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct PackageRecord {
    pub id:          PackageId,
    pub vehicle:     VehicleId,
    /// `None` when the store has no coordinates for the address.
    pub destination: Option<GeoPoint>,
    pub delivered:   bool,
}

/// Read access to vehicles and their packages, plus delivered write-back.
///
/// The orchestrator only reads snapshots; writing delivered status back is
/// requested through [`StoreWriteBack`], never done by the fleet itself.
pub trait PackageStore {
    /// Every vehicle the store knows, ascending.
    fn vehicles(&self) -> Vec<VehicleId>;

    /// Where `vehicle` currently is.
    fn vehicle_origin(&self, vehicle: VehicleId) -> Option<GeoPoint>;

    /// Snapshot of the packages assigned to `vehicle`, in assignment order.
    fn packages_for(&self, vehicle: VehicleId) -> Vec<PackageRecord>;

    /// Record that `package` was delivered.
    fn mark_delivered(&mut self, vehicle: VehicleId, package: PackageId) -> SimResult<()>;
}

// ── InMemoryStore ─────────────────────────────────────────────────────────────

/// A [`PackageStore`] held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    origins:  BTreeMap<VehicleId, GeoPoint>,
    packages: Vec<PackageRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or move) a vehicle.
    pub fn add_vehicle(&mut self, vehicle: VehicleId, origin: GeoPoint) {
        self.origins.insert(vehicle, origin);
    }

    /// Assign a package.  Assignment order is the stop order.
    pub fn add_package(&mut self, record: PackageRecord) {
        self.packages.push(record);
    }

    pub fn has_vehicle(&self, vehicle: VehicleId) -> bool {
        self.origins.contains_key(&vehicle)
    }

    pub fn package(&self, id: PackageId) -> Option<&PackageRecord> {
        self.packages.iter().find(|p| p.id == id)
    }

    pub fn packages(&self) -> &[PackageRecord] {
        &self.packages
    }
}

impl PackageStore for InMemoryStore {
    fn vehicles(&self) -> Vec<VehicleId> {
        self.origins.keys().copied().collect()
    }

    fn vehicle_origin(&self, vehicle: VehicleId) -> Option<GeoPoint> {
        self.origins.get(&vehicle).copied()
    }

    fn packages_for(&self, vehicle: VehicleId) -> Vec<PackageRecord> {
        self.packages
            .iter()
            .filter(|p| p.vehicle == vehicle)
            .cloned()
            .collect()
    }

    fn mark_delivered(&mut self, vehicle: VehicleId, package: PackageId) -> SimResult<()> {
        let record = self
            .packages
            .iter_mut()
            .find(|p| p.id == package && p.vehicle == vehicle)
            .ok_or(SimError::UnknownPackage { vehicle, package })?;
        record.delivered = true;
        Ok(())
    }
}

// ── StoreWriteBack ────────────────────────────────────────────────────────────

/// A [`FleetObserver`] that writes each delivery back to a [`PackageStore`].
///
/// Errors from the store are kept because observer hooks return nothing.
/// After the run, check with [`take_error`][Self::take_error].
pub struct StoreWriteBack<S: PackageStore> {
    store:      S,
    last_error: Option<SimError>,
}

impl<S: PackageStore> StoreWriteBack<S> {
    pub fn new(store: S) -> Self {
        Self { store, last_error: None }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Take the first write-back error, if any.
    pub fn take_error(&mut self) -> Option<SimError> {
        self.last_error.take()
    }

    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S: PackageStore> FleetObserver for StoreWriteBack<S> {
    fn on_package_delivered(&mut self, vehicle: VehicleId, package: PackageId) {
        if let Err(e) = self.store.mark_delivered(vehicle, package) {
            warn!(%vehicle, %package, error = %e, "delivered write-back failed");
            // Keep only the first error.
            if self.last_error.is_none() {
                self.last_error = Some(e);
            }
        }
    }
}
