use placelet::{
    api::{shapes::PlaceDraft, ExportFormat, SearchParams, SearchQuery},
    core::{config::ExplorerConfig, geo::LatLng, place::ListKind},
    explorer::{events::ExplorerEvent, Explorer},
    markers::headless::HeadlessBackend,
    session::store::MemoryCredentialStore,
    HttpApi, PlaceKind,
};
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Terminal REPL over the explorer engine, using the headless marker
/// backend in place of a map widget.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut config = ExplorerConfig::default();
    if let Ok(base_url) = std::env::var("PLACELET_API") {
        config.api.base_url = base_url;
    }

    let credentials = Arc::new(MemoryCredentialStore::new());
    let api = Arc::new(HttpApi::new(&config.api, credentials.clone()));
    let backend = HeadlessBackend::new();
    let mut explorer = Explorer::new(api, credentials, Box::new(backend.clone()), config);

    explorer.check_sessions().await;
    explorer.refresh_stats();
    settle(&mut explorer).await;
    drain(&mut explorer, &backend);

    println!("placelet explorer — type 'help' for commands");
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let parts: Vec<&str> = line.trim().split_whitespace().collect();
        match parts.as_slice() {
            [] => continue,
            ["quit"] | ["exit"] => break,
            ["help"] => print_help(),
            ["radius", lat, lon, km] => {
                match (lat.parse(), lon.parse(), km.parse()) {
                    (Ok(lat), Ok(lon), Ok(km)) => {
                        explorer.run_search(
                            SearchQuery::Radius {
                                center: LatLng::new(lat, lon),
                                km,
                            },
                            SearchParams::default(),
                        );
                    }
                    _ => println!("usage: radius <lat> <lon> <km>"),
                }
            }
            ["nearest", lat, lon, k] => {
                match (lat.parse(), lon.parse(), k.parse()) {
                    (Ok(lat), Ok(lon), Ok(k)) => {
                        explorer.run_search(
                            SearchQuery::Nearest {
                                center: LatLng::new(lat, lon),
                                k,
                            },
                            SearchParams::default(),
                        );
                    }
                    _ => println!("usage: nearest <lat> <lon> <k>"),
                }
            }
            ["list", kind] => match parse_list_kind(kind) {
                Some(kind) => {
                    explorer.load_personal_list(kind, false);
                }
                None => println!("usage: list visited|wishlist|liked"),
            },
            ["group", id] => match id.parse() {
                Ok(group_id) => explorer.load_group_places(group_id, "group"),
                Err(_) => println!("usage: group <id>"),
            },
            ["filter", rest @ ..] => explorer.set_filter(&rest.join(" ")),
            ["login", username, password] => {
                if let Err(e) = explorer.login_role(username, password).await {
                    println!("login failed: {}", e.user_message());
                }
            }
            ["account", username, password] => {
                if let Err(e) = explorer.login_account(username, password).await {
                    println!("account login failed: {}", e.user_message());
                }
            }
            ["logout"] => explorer.logout_role().await,
            ["logout-account"] => explorer.logout_account().await,
            ["stats"] => explorer.refresh_stats(),
            ["add", name, lat, lon, kind] => {
                match (lat.parse(), lon.parse(), kind.parse::<PlaceKind>()) {
                    (Ok(lat), Ok(lon), Ok(kind)) => {
                        explorer.add_place(PlaceDraft::new(*name, lat, lon, kind));
                    }
                    _ => println!("usage: add <name> <lat> <lon> <type>"),
                }
            }
            ["upload", path] => match std::fs::read(path) {
                Ok(bytes) => {
                    explorer.upload_csv(path, bytes);
                }
                Err(e) => println!("cannot read {path}: {e}"),
            },
            ["groups"] => match explorer.my_groups().await {
                Ok(groups) if groups.is_empty() => println!("no groups"),
                Ok(groups) => {
                    for group in groups {
                        println!("  [{}] {}", group.group_id, group.name);
                    }
                }
                Err(e) => println!("groups failed: {}", e.user_message()),
            },
            ["density", lat, lon] | ["density", lat, lon, _] => {
                let radius = parts.get(3).and_then(|s| s.parse().ok());
                match (lat.parse(), lon.parse()) {
                    (Ok(lat), Ok(lon)) => {
                        match explorer.density(LatLng::new(lat, lon), radius).await {
                            Ok(report) => println!(
                                "{} places within {} km ({:.2} per 1000 km²)",
                                report.count, report.radius_km, report.density_per_1000_km2
                            ),
                            Err(e) => println!("density failed: {}", e.user_message()),
                        }
                    }
                    _ => println!("usage: density <lat> <lon> [km]"),
                }
            }
            ["export", format, path] => {
                let format = match *format {
                    "csv" => ExportFormat::Csv,
                    "geojson" => ExportFormat::GeoJson,
                    _ => {
                        println!("usage: export csv|geojson <path>");
                        continue;
                    }
                };
                match explorer.export(format, &SearchParams::default()).await {
                    Ok(payload) => match std::fs::write(path, &payload.bytes) {
                        Ok(()) => println!("wrote {} bytes to {path}", payload.bytes.len()),
                        Err(e) => println!("cannot write {path}: {e}"),
                    },
                    Err(e) => println!("export failed: {}", e.user_message()),
                }
            }
            ["markers"] => {
                println!(
                    "{} markers ({})",
                    backend.live_marker_count(),
                    if explorer.markers().is_clustered() {
                        "clustered"
                    } else {
                        "direct"
                    }
                );
            }
            ["select", id] => match id.parse() {
                Ok(place_id) => {
                    backend.simulate_click(place_id);
                }
                Err(_) => println!("usage: select <place-id>"),
            },
            ["reset"] => explorer.reset(),
            _ => println!("unknown command; try 'help'"),
        }

        settle(&mut explorer).await;
        drain(&mut explorer, &backend);
    }

    Ok(())
}

/// Pumps the engine until in-flight work and deferred marker rebuilds
/// have settled, or a short deadline passes.
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

fn drain(explorer: &mut Explorer, backend: &HeadlessBackend) {
    for event in explorer.poll_events() {
        match event {
            ExplorerEvent::ResultsUpdated { shown, total } => {
                println!("results: showing {shown} of {total}");
                for place in explorer.filtered().iter().take(15) {
                    let city = place.city.as_deref().unwrap_or("?");
                    let state = place.state.as_deref().unwrap_or("?");
                    println!("  [{}] {} — {city}, {state}", place.id, place.name);
                }
                println!(
                    "map: {} markers ({})",
                    backend.live_marker_count(),
                    if explorer.markers().is_clustered() {
                        "clustered"
                    } else {
                        "direct"
                    }
                );
            }
            ExplorerEvent::ResultsEmpty => println!("no places found"),
            ExplorerEvent::PlaceSelected(id) => {
                if let Some(place) = explorer.selected_place() {
                    println!("selected [{}] {}", place.id, place.name);
                } else {
                    println!("selected place {id}");
                }
            }
            ExplorerEvent::PlaceAdded(id) => println!("added place {id}"),
            ExplorerEvent::ImportFinished(summary) => println!(
                "import done: {} inserted, {} skipped of {} rows",
                summary.inserted, summary.skipped, summary.total_rows
            ),
            ExplorerEvent::StatsUpdated(stats) => {
                println!("dataset: {} places", stats.total_places)
            }
            ExplorerEvent::LoginRequired => {
                println!("this needs an account; use: account <username> <password>")
            }
            ExplorerEvent::SessionChanged => {
                let session = explorer.session();
                let role = session
                    .role()
                    .map(|r| r.role.clone())
                    .unwrap_or_else(|| "none".to_string());
                let account = session
                    .account()
                    .map(|a| a.username.clone())
                    .unwrap_or_else(|| "none".to_string());
                println!("session: role={role} account={account}");
            }
            ExplorerEvent::Message { level, text } => println!("[{level:?}] {text}"),
        }
    }
}

fn parse_list_kind(raw: &str) -> Option<ListKind> {
    match raw {
        "visited" => Some(ListKind::Visited),
        "wishlist" => Some(ListKind::Wishlist),
        "liked" => Some(ListKind::Liked),
        _ => None,
    }
}

fn print_help() {
    println!("commands:");
    println!("  radius <lat> <lon> <km>      search within a radius");
    println!("  nearest <lat> <lon> <k>      k nearest places");
    println!("  list visited|wishlist|liked  personal lists (account required)");
    println!("  group <id>                   a group's places");
    println!("  filter <text>                narrow the shown results");
    println!("  login <user> <pass>          app role login");
    println!("  account <user> <pass>        personal account login");
    println!("  logout | logout-account      end a session");
    println!("  add <name> <lat> <lon> <ty>  create a place (role required)");
    println!("  upload <path>                CSV bulk import (admin role)");
    println!("  groups                       your groups (account required)");
    println!("  density <lat> <lon> [km]     local place density");
    println!("  export csv|geojson <path>    download the dataset");
    println!("  select <place-id>            simulate a marker click");
    println!("  markers | stats | reset | quit");
}
