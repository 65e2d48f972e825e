//! mapsync-replay — drive the MapSync overlays from a recorded event scenario.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use mapsync_core::{FeatureClickEvent, HostEvent, MapCenter, MapSyncConfig, ViewContext};
use mapsync_host::{EventBus, LayerStateStore, LayerSwitcher, RecordingMap};
use mapsync_runtime::{FeatureOverlay, TileOverlay};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod scenario;

use scenario::{ReplaySource, Scenario, Step};

fn resolve_data_dir() -> PathBuf {
    std::env::var("MAPSYNC_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("replay") => {
            let Some(path) = args.get(2) else {
                eprintln!("Usage: mapsync-replay replay <scenario.json>");
                std::process::exit(1);
            };
            replay(Path::new(path)).await
        }
        Some("--help") | Some("-h") | Some("help") | None => {
            println!("mapsync-replay — replay host events against the MapSync overlays");
            println!();
            println!("Usage: mapsync-replay <command>");
            println!();
            println!("Commands:");
            println!("  replay <scenario.json>   Replay a scenario file");
            println!("  help                     Show this help message");
            println!();
            println!("Environment:");
            println!("  MAPSYNC_DATA_DIR         Config and layer state directory (default: data)");
            println!("  MAPSYNC_DATA_URL         Record endpoint when the scenario has no records");
            println!("  MAPSYNC_MIN_ZOOM         Minimum zoom for fetching records");
            Ok(())
        }
        Some(other) => {
            eprintln!(
                "Unknown command: {}. Use 'mapsync-replay help' for usage.",
                other
            );
            std::process::exit(1);
        }
    }
}

async fn replay(path: &Path) -> anyhow::Result<()> {
    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = MapSyncConfig::from_env(&data_dir)?;
    info!("{} ({}) initialized", config.script_name, config.script_id);
    let scenario = Scenario::load(path)
        .map_err(|e| anyhow::anyhow!("Failed to load scenario {}: {}", path.display(), e))?;
    info!(
        "Replaying {} steps from {}",
        scenario.steps.len(),
        path.display()
    );

    let bus = EventBus::new();
    let events = Arc::new(bus.clone());
    let start = ViewContext {
        center: MapCenter::default(),
        zoom: 0,
    };
    let map = Arc::new(RecordingMap::new(start).with_event_bus(bus.clone()));
    let store = Arc::new(LayerStateStore::open(&config.layer_state_file()));
    let source = Arc::new(ReplaySource::for_scenario(
        &scenario,
        &config.feature_layer.data_url,
    ));

    let feature = Arc::new(
        FeatureOverlay::new(
            config.feature_layer.clone(),
            map.clone(),
            events.clone(),
            source.clone(),
        )
        .with_state_store(store.clone())
        .with_click_handler(Arc::new(|click: &FeatureClickEvent| {
            println!("clicked {}", click.feature_id);
        })),
    );
    let tile = Arc::new(
        TileOverlay::new(config.tile_layer.clone(), map.clone(), events.clone())
            .with_state_store(store),
    );

    let _feature_toggle = feature.install()?;
    let _tile_toggle = tile.install()?;

    let mut restores: Vec<JoinHandle<mapsync_core::Result<bool>>> = Vec::new();
    restores.extend(feature.restore_when_ready().map(tokio::spawn));
    restores.extend(tile.restore_when_ready().map(tokio::spawn));

    for (index, step) in scenario.steps.iter().enumerate() {
        match step {
            Step::Ready => {
                bus.emit(HostEvent::Ready);
                for restore in restores.drain(..) {
                    if let Err(e) = restore.await? {
                        warn!("Restore failed: {}", e);
                    }
                }
            }
            Step::Toggle { layer, checked } => {
                if let Err(e) = map.set_layer_checkbox_checked(layer, *checked) {
                    warn!("Toggle of {} failed: {}", layer, e);
                }
            }
            Step::Move { records, .. } => {
                if let Some(records) = records {
                    if !source.replace(records.clone()) {
                        warn!("Step {}: records ignored for the HTTP source", index);
                    }
                }
                if let Some(view) = step.view() {
                    map.set_view(view.zoom, view.center);
                }
                bus.emit(HostEvent::MapMoveEnd);
            }
            Step::Click { layer, feature_id } => {
                bus.emit(HostEvent::FeatureClicked(FeatureClickEvent {
                    feature_id: feature_id.clone(),
                    layer_name: layer.clone(),
                }));
            }
        }

        // Wait for passes this step spawned so the log shows their result.
        feature.settle().await;
        info!(
            "Step {} {:?}: {} {:?}, rendered {:?}",
            index,
            step,
            feature.name(),
            feature.state(),
            feature.rendered_ids()
        );
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "feature_layer": feature.name(),
            "state": feature.state(),
            "rendered": feature.rendered_ids(),
            "tile_layer": tile.name(),
            "tile_state": tile.state(),
        }))?
    );
    Ok(())
}
