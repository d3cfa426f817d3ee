//! city_run — a handful of delivery vans working a synthetic downtown.
//!
//! Packages are scattered around downtown Mobile, Alabama with a fixed seed,
//! routed with the straight-line provider, and driven in real time at a 120×
//! time scale until every van has finished its route.
//!
//! ```text
//! cargo run -p city_run                     # default DeliveryConfig
//! cargo run -p city_run -- config.json      # DeliveryConfig from JSON
//! RUST_LOG=debug cargo run -p city_run      # per-delivery logging
//! ```
//!
//! Output lands in `./output/` (`fleet_events.csv`, `tick_summaries.csv`).

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fleet_core::{DeliveryConfig, GeoPoint, PackageId, SystemClock, VehicleId};
use fleet_output::{CsvWriter, OutputObserver};
use fleet_route::StraightLineRouter;
use fleet_sim::{
    run_until_idle, CancelToken, FleetBuilder, FleetObserver, InMemoryStore, IntervalScheduler,
    PackageRecord, PackageStore, StoreWriteBack,
};

// ── Constants ─────────────────────────────────────────────────────────────────

const VAN_COUNT:          u32 = 4;
const PACKAGES_PER_VAN:   u32 = 6;
const SEED:               u64 = 42;
const TIME_SCALE:         f64 = 120.0;
/// Half-width of the square packages are scattered over, in degrees (~1.5 km).
const SCATTER_DEG:        f64 = 0.014;
const POSITION_INTERVAL:  u64 = 10;

/// Downtown Mobile, AL.
const DEPOT: GeoPoint = GeoPoint { lng: -88.0431, lat: 30.6954 };

// ── Store ─────────────────────────────────────────────────────────────────────

fn build_store(rng: &mut SmallRng) -> InMemoryStore {
    let mut store = InMemoryStore::new();
    let mut next_package = 1u32;

    for v in 1..=VAN_COUNT {
        let vehicle = VehicleId(v);
        store.add_vehicle(vehicle, jitter(rng, DEPOT, 0.002));

        for _ in 0..PACKAGES_PER_VAN {
            store.add_package(PackageRecord {
                id:          PackageId(next_package),
                vehicle,
                destination: Some(jitter(rng, DEPOT, SCATTER_DEG)),
                delivered:   false,
            });
            next_package += 1;
        }
    }

    // One address the geocoder never resolved.
    store.add_package(PackageRecord {
        id:          PackageId(next_package),
        vehicle:     VehicleId(1),
        destination: None,
        delivered:   false,
    });
    store
}

fn jitter(rng: &mut SmallRng, around: GeoPoint, half_width: f64) -> GeoPoint {
    GeoPoint::new(
        around.lng + rng.gen_range(-half_width..=half_width),
        around.lat + rng.gen_range(-half_width..=half_width),
    )
}

// ── Observer: per-van tallies ─────────────────────────────────────────────────

#[derive(Default)]
struct Tally {
    delivered: BTreeMap<VehicleId, usize>,
    completed: BTreeMap<VehicleId, usize>,
}

impl FleetObserver for Tally {
    fn on_package_delivered(&mut self, vehicle: VehicleId, _package: PackageId) {
        *self.delivered.entry(vehicle).or_default() += 1;
    }

    fn on_route_completed(&mut self, vehicle: VehicleId, delivered_count: usize) {
        self.completed.insert(vehicle, delivered_count);
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 1. Configuration.
    let config: DeliveryConfig = match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {path}"))?
        }
        None => DeliveryConfig::default(),
    };
    info!(?config, "configuration loaded");

    // 2. Package store.
    let mut rng = SmallRng::seed_from_u64(SEED);
    let store = build_store(&mut rng);
    info!(vans = VAN_COUNT, packages = store.packages().len(), "store built");

    // 3. Fleet and routes.
    let mut fleet = FleetBuilder::new(SystemClock::new()).config(config).build()?;
    let report = fleet.generate_all_routes(store.vehicles(), &StraightLineRouter::default(), &store);
    for (vehicle, err) in &report.failed {
        warn!(%vehicle, error = %err, "no route");
    }
    for handle in &report.created {
        fleet.set_time_scale(handle.vehicle, TIME_SCALE)?;
        fleet.start(handle.vehicle)?;
    }

    // 4. Observers: CSV output, store write-back, tallies.
    let out_dir = Path::new("./output");
    std::fs::create_dir_all(out_dir)?;
    let csv = OutputObserver::new(CsvWriter::new(out_dir)?).with_position_interval(POSITION_INTERVAL);
    let mut observer = (csv, (StoreWriteBack::new(store), Tally::default()));

    // 5. Run.
    let wall = Instant::now();
    let mut scheduler = IntervalScheduler::new(fleet.config().tick_interval());
    let ticks = run_until_idle(&mut fleet, &mut scheduler, &CancelToken::new(), &mut observer);

    let (mut csv, (mut write_back, tally)) = observer;
    csv.finish();
    if let Some(e) = csv.take_error() {
        warn!(error = %e, "output error");
    }
    if let Some(e) = write_back.take_error() {
        warn!(error = %e, "write-back error");
    }

    // 6. Summary.
    println!();
    println!("=== city_run: {ticks} ticks in {:.1?} ===", wall.elapsed());
    for snapshot in fleet.snapshots() {
        println!(
            "  {:<14} {:>9}  {:>5.1}%  delivered {:>2}  missed {:>2}  (completion event: {:?})",
            snapshot.vehicle.to_string(),
            format!("{:?}", snapshot.state),
            snapshot.progress * 100.0,
            tally.delivered.get(&snapshot.vehicle).copied().unwrap_or(0),
            snapshot.remaining,
            tally.completed.get(&snapshot.vehicle),
        );
    }
    let store = write_back.into_inner();
    let delivered = store.packages().iter().filter(|p| p.delivered).count();
    println!("  store: {delivered}/{} packages marked delivered", store.packages().len());
    println!("  output: {}", out_dir.display());

    Ok(())
}
