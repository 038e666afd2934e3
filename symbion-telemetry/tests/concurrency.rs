//! Concurrent ingestion and reset through the registry

use std::sync::Arc;
use std::thread;
use symbion_telemetry::{Entity, EntityRegistry, ResourceCategory, TelemetryConfig};

const WRITERS: usize = 8;
const SAMPLES: usize = 200;

fn registry() -> Arc<EntityRegistry> {
    let mut config = TelemetryConfig::default();
    config.history_limit = WRITERS * SAMPLES;
    config.host.cpu_core_count = Some(2);
    Arc::new(EntityRegistry::new(config))
}

#[test]
fn distinct_keys_lose_no_samples() {
    let registry = registry();
    registry.create_host("h1", None).unwrap();

    let handles: Vec<_> = (0..WRITERS)
        .map(|w| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let iface = format!("eth{w}");
                for i in 0..SAMPLES {
                    registry
                        .add_host_sample("h1", "bandwidth", &iface, i as f64)
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let shared = registry.get("h1").unwrap();
    let entity = shared.read();
    let host = entity.as_host().unwrap();
    assert_eq!(host.resource_keys(ResourceCategory::Bandwidth).len(), WRITERS);
    for w in 0..WRITERS {
        let series = host
            .resource_series(ResourceCategory::Bandwidth, &format!("eth{w}"))
            .unwrap();
        let expected: Vec<f64> = (0..SAMPLES).map(|i| i as f64).collect();
        assert_eq!(series.values(), expected);
    }
}

#[test]
fn same_metric_appends_are_whole() {
    let registry = registry();
    registry.create_connection("c1", None).unwrap();

    let handles: Vec<_> = (0..WRITERS)
        .map(|w| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..SAMPLES {
                    registry
                        .ingest("c1", "traffic", (w * SAMPLES + i) as f64)
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let shared = registry.get("c1").unwrap();
    let entity = shared.read();
    let mut values = entity.core().series("traffic").unwrap().values();
    assert_eq!(values.len(), WRITERS * SAMPLES);

    // each writer's samples keep their relative order
    for w in 0..WRITERS {
        let own: Vec<f64> = values
            .iter()
            .copied()
            .filter(|v| (*v as usize) / SAMPLES == w)
            .collect();
        assert!(own.windows(2).all(|pair| pair[0] < pair[1]));
    }
    values.sort_by(f64::total_cmp);
    values.dedup();
    assert_eq!(values.len(), WRITERS * SAMPLES);
}

#[test]
fn readers_never_see_half_reset() {
    let registry = registry();
    registry.create_host("h1", None).unwrap();

    let writer = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for round in 0..SAMPLES {
                let shared = registry.get("h1").unwrap();
                let mut entity = shared.write();
                let host = entity.as_host_mut().unwrap();
                host.add_resource_sample(ResourceCategory::Bandwidth, "eth0", round as f64);
                host.add_resource_sample(ResourceCategory::DriveRead, "sda", round as f64);
                drop(entity);
                registry.reset_host_cycles();
            }
        })
    };

    let reader = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            for _ in 0..SAMPLES {
                let shared = registry.get("h1").unwrap();
                let entity = shared.read();
                let snapshot = entity.as_host().unwrap().resource_snapshot();
                // both maps are filled and cleared together
                assert_eq!(snapshot.bandwidth.is_empty(), snapshot.drive_read.is_empty());
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
}
