mod chords;

use lore_canvas::{command_for, Connection, Node, NodeChange, NodeId, NodeKind, Position};
use loremap_core::{
    AutoSaveHandle, AutoSaveScheduler, AutoSaveSettings, EditorSession, HttpRemoteStore,
    PersistenceBridge, RemoteStore, SqliteCache, SyncConfig, SyncCoordinator, SyncEvent,
    SyncEventBus,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const HELP: &str = "\
commands:
  list                       show nodes and edges
  add <type> <name>          add a node (character, faction, city, event, location)
  select <id>                select a node
  move <id> <x> <y>          drag a node
  connect <source> <target>  connect two nodes with the suggested type
  snap on|off                toggle snap-to-grid
  autosave on|off|<seconds>  configure auto-save
  ctrl+s, ctrl+z, ctrl+y, ctrl+shift+z, delete
  quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 1. Configuration and backends
    let config = SyncConfig::from_env()?;
    info!(api = %config.api_base_url, cache = %config.cache_url, "Starting Loremap playground");

    let cache = SqliteCache::new(&config.cache_url).await?;
    let remote = Arc::new(HttpRemoteStore::from_config(&config)?);
    if !remote.health().await.unwrap_or(false) {
        warn!("Remote store is not reachable; edits stay local until it is");
    }

    // 2. Session
    let bridge = Arc::new(PersistenceBridge::new(Arc::new(cache)));
    let events = SyncEventBus::default();
    spawn_event_logger(&events);

    let session =
        EditorSession::open(bridge.clone(), remote.as_ref(), config.editor_config(), &events)
            .await?;
    seed_if_empty(&session).await;

    // 3. Sync and auto-save
    let coordinator = Arc::new(SyncCoordinator::new(session, remote, events));
    let settings = AutoSaveSettings::resolve(&config, &bridge.load_settings().await);
    info!(
        enabled = settings.enabled,
        interval_secs = settings.interval.as_secs(),
        "Auto-save configured"
    );
    let autosave = AutoSaveScheduler::spawn(coordinator.clone(), settings);

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_line(&coordinator, &autosave, line.trim()).await {
                    break;
                }
            }
        }
    }

    if coordinator.session().has_unsaved_changes().await {
        warn!("Exiting with unsaved changes; they are kept in the local cache");
    }
    autosave.shutdown();
    bridge.flush().await;
    info!("Playground stopped");
    Ok(())
}

fn spawn_event_logger(events: &SyncEventBus) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(SyncEvent::NodeCreateFailed { name, error, .. }) => {
                    println!("! could not create {name}: {error}");
                }
                Ok(SyncEvent::SaveSucceeded { saved_at, .. }) => {
                    println!("saved at {}", saved_at.format("%H:%M:%S"));
                }
                Ok(SyncEvent::SaveFailed { error }) => println!("! save failed: {error}"),
                Ok(SyncEvent::OperationRolledBack { node_id, error, .. }) => {
                    println!("! change to {node_id} was reverted: {error}");
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event logger lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });
}

async fn seed_if_empty(session: &EditorSession) {
    if !session.read(|s| s.nodes().is_empty()).await {
        return;
    }
    let seeded = session
        .mutate(|store| {
            let aria = store.add_node(Node::draft(NodeKind::Character, "Aria", Position::new(0.0, 0.0)))?;
            let order = store.add_node(Node::draft(NodeKind::Faction, "Silver Order", Position::new(300.0, 0.0)))?;
            store.commit_edge(Connection::new(aria, order), None)
        })
        .await;
    match seeded {
        Ok(edge) => info!(edge = %edge, "Seeded an empty map"),
        Err(e) => warn!(error = %e, "Failed to seed map"),
    }
}

/// Runs one line of input. Returns false to quit.
async fn handle_line(coordinator: &SyncCoordinator, autosave: &AutoSaveHandle, line: &str) -> bool {
    let session = coordinator.session();
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        [] => {}
        ["quit" | "exit"] => return false,
        ["help"] => println!("{HELP}"),
        ["list"] => println!("{}", session.read(describe).await),
        ["add", kind, name @ ..] if !name.is_empty() => {
            let Some(kind) = NodeKind::ALL.into_iter().find(|k| k.as_str() == *kind) else {
                println!("unknown type {kind}");
                return true;
            };
            let name = name.join(" ");
            let id = session
                .mutate(|store| {
                    let x = store.nodes().len() as f32 * 220.0;
                    store.add_node(Node::draft(kind, name, Position::new(x, 200.0)))
                })
                .await;
            match id {
                Ok(id) => println!("added {id}"),
                Err(e) => println!("! {e}"),
            }
        }
        ["select", id] => {
            let id = NodeId::from(*id);
            session
                .mutate(|store| {
                    store.apply_node_changes([NodeChange::Select { id, selected: true }])
                })
                .await;
        }
        ["move", id, x, y] => {
            let (Ok(x), Ok(y)) = (x.parse::<f32>(), y.parse::<f32>()) else {
                println!("coordinates must be numbers");
                return true;
            };
            let id = NodeId::from(*id);
            let position = Position::new(x, y);
            session
                .mutate(|store| {
                    store.apply_node_changes([
                        NodeChange::Position { id: id.clone(), position, dragging: true },
                        NodeChange::Position { id, position, dragging: false },
                    ])
                })
                .await;
        }
        ["connect", source, target] => {
            let connection = Connection::new(*source, *target);
            match session.mutate(|store| store.commit_edge(connection, None)).await {
                Ok(edge) => println!("connected as {edge}"),
                Err(e) => println!("! {e}"),
            }
        }
        ["snap", flag @ ("on" | "off")] => session.set_snap_to_grid(*flag == "on").await,
        ["autosave", "on"] => autosave.set_enabled(true),
        ["autosave", "off"] => autosave.set_enabled(false),
        ["autosave", secs] => match secs.parse::<u64>() {
            Ok(secs) => autosave.set_interval(Duration::from_secs(secs)),
            Err(_) => println!("interval must be a number of seconds"),
        },
        _ => match chords::parse_chord(line).and_then(|(key, mods)| command_for(key, mods, false)) {
            Some(command) => match coordinator.handle_command(command).await {
                Ok(outcome) => println!("{command:?}: {outcome:?}"),
                Err(e) => error!(error = %e, ?command, "Command failed"),
            },
            None => println!("unrecognised input; type help"),
        },
    }
    true
}

fn describe(store: &lore_canvas::GraphStateStore) -> String {
    let mut out = String::new();
    for node in store.nodes() {
        out.push_str(&format!(
            "{:<40} {:<10} {} ({:.0}, {:.0})\n",
            node.id, node.kind.as_str(), node.name, node.position.x, node.position.y
        ));
    }
    for edge in store.edges() {
        out.push_str(&format!(
            "{} -> {} [{:?}]\n",
            edge.source,
            edge.target,
            edge.data.connection_type()
        ));
    }
    out.push_str(&format!(
        "{} pending change(s)",
        store.durable_pending().len()
    ));
    out
}
