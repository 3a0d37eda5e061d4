//! Scripted headless run against a live backend.
//!
//! Starts the engine with the recording marker backend, runs one
//! radius search, narrows it with a text filter, and prints what a map
//! widget would have rendered at each step.
//!
//! ```sh
//! PLACELET_API=http://localhost:8001 cargo run --example headless
//! ```

use placelet::{
    api::{SearchParams, SearchQuery},
    core::{config::ExplorerConfig, geo::LatLng},
    explorer::Explorer,
    markers::headless::HeadlessBackend,
    session::store::MemoryCredentialStore,
    HttpApi,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut config = ExplorerConfig::default();
    if let Ok(base_url) = std::env::var("PLACELET_API") {
        config.api.base_url = base_url;
    }

    let credentials = Arc::new(MemoryCredentialStore::new());
    let api = Arc::new(HttpApi::new(&config.api, credentials.clone()));
    let backend = HeadlessBackend::new();
    let mut explorer = Explorer::new(api, credentials, Box::new(backend.clone()), config);

    println!("searching 50 km around Burlington, VT");
    explorer.run_search(
        SearchQuery::Radius {
            center: LatLng::new(44.4759, -73.2121),
            km: 50.0,
        },
        SearchParams::default(),
    );
    settle(&mut explorer).await;
    report(&explorer, &backend);

    println!("\nfiltering for 'brew'");
    explorer.set_filter("brew");
    settle(&mut explorer).await;
    report(&explorer, &backend);

    println!("\nbackend op log:");
    for op in backend.ops() {
        println!("  {op:?}");
    }

    Ok(())
}

async fn settle(explorer: &mut Explorer) {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        explorer.pump();
        if !explorer.is_busy() || Instant::now() > deadline {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

fn report(explorer: &Explorer, backend: &HeadlessBackend) {
    let filtered = explorer.filtered();
    println!(
        "{} of {} places shown, {} markers ({})",
        filtered.len(),
        explorer.results().places.len(),
        backend.live_marker_count(),
        if explorer.markers().is_clustered() {
            "clustered"
        } else {
            "direct"
        }
    );
    for place in filtered.iter().take(10) {
        println!(
            "  [{}] {} ({})",
            place.id,
            place.name,
            place
                .kind
                .map(|k| k.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        );
    }
}
