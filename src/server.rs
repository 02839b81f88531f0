use crate::command;
use crate::config::SharedConfig;
use crate::connection::ClientState;
use crate::eviction::{self, EvictionPolicy, EvictionPool};
use crate::keywatcher::SharedKeyWatcher;
use crate::persistence::aof::SharedAofWriter;
use crate::pubsub::{PubSubReceiver, SharedPubSub};
use crate::resp::{RespParser, RespValue};
use crate::scripting::ScriptCache;
use crate::slowlog::{SharedSlowLog, SharedStats};
use crate::store::SharedStore;
use bytes::BytesMut;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

#[allow(clippy::too_many_arguments)]
pub async fn run_server(
    store: SharedStore,
    config: SharedConfig,
    pubsub: SharedPubSub,
    aof: SharedAofWriter,
    key_watcher: SharedKeyWatcher,
    script_cache: ScriptCache,
    slowlog: SharedSlowLog,
    stats: SharedStats,
    eviction_pool: Arc<Mutex<EvictionPool>>,
) -> std::io::Result<()> {
    let (bind, port) = {
        let cfg = config.read().await;
        (cfg.bind.clone(), cfg.port)
    };

    let addr = format!("{bind}:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!("Cedis server listening on {addr}");

    // Spawn active expiration background task
    let store_clone = store.clone();
    let config_clone = config.clone();
    tokio::spawn(async move {
        active_expiration_loop(store_clone, config_clone).await;
    });

    // Spawn the hierarchical time-wheel tick, a finer-grained companion to
    // the active expiration cycle above.
    let store_clone = store.clone();
    tokio::spawn(async move {
        time_wheel_loop(store_clone).await;
    });

    // Spawn the eviction checker, active only while maxmemory and a real
    // eviction policy are configured.
    let store_clone = store.clone();
    let config_clone = config.clone();
    tokio::spawn(async move {
        eviction_loop(store_clone, config_clone, eviction_pool).await;
    });

    // Spawn AOF fsync background task
    let aof_clone = aof.clone();
    tokio::spawn(async move {
        aof_fsync_loop(aof_clone).await;
    });

    // Accept loop with graceful shutdown on SIGINT or SIGTERM
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = result?;
                debug!("New connection from {peer_addr}");

                let maxclients = { config.read().await.maxclients };
                if stats.connected_clients.load(Ordering::Relaxed) >= maxclients {
                    let mut stream = stream;
                    let resp = RespValue::error(
                        "ERR max number of clients reached",
                    );
                    let _ = stream.write_all(&resp.serialize()).await;
                    continue;
                }

                stats.connected_clients.fetch_add(1, Ordering::Relaxed);
                stats.total_connections_received.fetch_add(1, Ordering::Relaxed);

                let store = store.clone();
                let config = config.clone();
                let pubsub = pubsub.clone();
                let aof = aof.clone();
                let key_watcher = key_watcher.clone();
                let script_cache = script_cache.clone();
                let slowlog = slowlog.clone();
                let stats_conn = stats.clone();

                tokio::spawn(async move {
                    if let Err(e) = handle_connection(
                        stream,
                        store,
                        config,
                        pubsub,
                        aof,
                        key_watcher,
                        script_cache,
                        slowlog,
                        stats_conn.clone(),
                    )
                    .await
                    {
                        debug!("Connection error from {peer_addr}: {e}");
                    }
                    stats_conn.connected_clients.fetch_sub(1, Ordering::Relaxed);
                    debug!("Connection closed: {peer_addr}");
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("SIGINT received, shutting down...");
                let mut aof = aof.lock().await;
                let _ = aof.flush();
                return Ok(());
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
                let mut aof = aof.lock().await;
                let _ = aof.flush();
                return Ok(());
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_connection(
    mut stream: TcpStream,
    store: SharedStore,
    config: SharedConfig,
    pubsub: SharedPubSub,
    aof: SharedAofWriter,
    key_watcher: SharedKeyWatcher,
    script_cache: ScriptCache,
    slowlog: SharedSlowLog,
    stats: SharedStats,
) -> std::io::Result<()> {
    let mut client = ClientState::new();
    let mut buf = BytesMut::with_capacity(4096);

    // Create pub/sub receiver channel
    let (pubsub_tx, mut pubsub_rx): (mpsc::UnboundedSender<RespValue>, PubSubReceiver) =
        mpsc::unbounded_channel();

    // Check if auth is required
    {
        let cfg = config.read().await;
        if cfg.requirepass.is_none() {
            client.authenticated = true;
        }
    }

    loop {
        // Try to parse any complete commands in the buffer first
        loop {
            match RespParser::parse(&mut buf) {
                Ok(Some(value)) => {
                    let response = process_command(
                        value,
                        &store,
                        &config,
                        &mut client,
                        &pubsub,
                        &pubsub_tx,
                        &key_watcher,
                        &script_cache,
                        &aof,
                        &slowlog,
                        &stats,
                    )
                    .await;

                    let serialized = response.serialize();
                    stream.write_all(&serialized).await?;

                    if client.should_close {
                        cleanup_client(&pubsub, &client).await;
                        return Ok(());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    let err_resp = RespValue::error(format!("ERR Protocol error: {e}"));
                    stream.write_all(&err_resp.serialize()).await?;
                    cleanup_client(&pubsub, &client).await;
                    return Ok(());
                }
            }
        }

        // Get timeout from config
        let timeout_duration = {
            let cfg = config.read().await;
            if cfg.timeout > 0 {
                Some(Duration::from_secs(cfg.timeout))
            } else {
                None
            }
        };

        // Wait for data from either TCP or pub/sub, with optional timeout
        tokio::select! {
            result = async {
                if let Some(dur) = timeout_duration {
                    match tokio::time::timeout(dur, stream.read_buf(&mut buf)).await {
                        Ok(result) => result,
                        Err(_) => Ok(0), // Timeout => treat as disconnect
                    }
                } else {
                    stream.read_buf(&mut buf).await
                }
            } => {
                match result {
                    Ok(0) => {
                        cleanup_client(&pubsub, &client).await;
                        return Ok(());
                    }
                    Ok(_) => {} // Got data, loop back to parse
                    Err(e) => {
                        cleanup_client(&pubsub, &client).await;
                        return Err(e);
                    }
                }
            }
            Some(msg) = pubsub_rx.recv() => {
                // Forward pub/sub message to the client
                stream.write_all(&msg.serialize()).await?;
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn process_command(
    value: RespValue,
    store: &SharedStore,
    config: &SharedConfig,
    client: &mut ClientState,
    pubsub: &SharedPubSub,
    pubsub_tx: &mpsc::UnboundedSender<RespValue>,
    key_watcher: &SharedKeyWatcher,
    script_cache: &ScriptCache,
    aof: &SharedAofWriter,
    slowlog: &SharedSlowLog,
    stats: &SharedStats,
) -> RespValue {
    let items = match value {
        RespValue::Array(Some(items)) if !items.is_empty() => items,
        _ => return RespValue::error("ERR invalid command format"),
    };

    let cmd_name = match items[0].to_string_lossy() {
        Some(name) => name.to_uppercase(),
        None => return RespValue::error("ERR invalid command name"),
    };

    let args = &items[1..];

    // Check authentication
    if !client.authenticated && cmd_name != "AUTH" && cmd_name != "QUIT" && cmd_name != "HELLO" {
        return RespValue::error("NOAUTH Authentication required.");
    }

    // In subscribe mode, only allow certain commands
    if client.in_subscribe_mode() {
        match cmd_name.as_str() {
            "SUBSCRIBE" | "UNSUBSCRIBE" | "PSUBSCRIBE" | "PUNSUBSCRIBE" | "PING" | "QUIT" | "RESET" => {}
            _ => {
                return RespValue::error(format!(
                    "ERR Can't execute '{cmd_name}': only (P)SUBSCRIBE / (P)UNSUBSCRIBE / PING / QUIT / RESET are allowed in this context"
                ));
            }
        }
    }

    command::dispatch(
        &cmd_name,
        args,
        store,
        config,
        client,
        pubsub,
        pubsub_tx,
        key_watcher,
        script_cache,
        aof,
        slowlog,
        stats,
    )
    .await
}

async fn cleanup_client(pubsub: &SharedPubSub, client: &ClientState) {
    let mut ps = pubsub.write().await;
    ps.unsubscribe_all(client.id);
}

/// Background task that periodically expires keys.
async fn active_expiration_loop(store: SharedStore, config: SharedConfig) {
    loop {
        let hz = {
            let cfg = config.read().await;
            cfg.hz
        };
        let interval = Duration::from_millis(1000 / hz.max(1));

        tokio::time::sleep(interval).await;

        let mut store = store.write().await;
        store.active_expire_cycle();
    }
}

/// Background task that advances the hierarchical time wheel, catching
/// expirations the coarser active-expiration cycle hasn't reached yet.
async fn time_wheel_loop(store: SharedStore) {
    loop {
        tokio::time::sleep(Duration::from_millis(10)).await;
        let mut store = store.write().await;
        store.wheel_tick_cycle();
    }
}

/// Background task that samples and evicts keys once memory usage is over
/// `maxmemory`, under whichever `maxmemory-policy` is configured.
async fn eviction_loop(
    store: SharedStore,
    config: SharedConfig,
    pool: Arc<Mutex<EvictionPool>>,
) {
    loop {
        tokio::time::sleep(Duration::from_millis(100)).await;

        let (maxmemory, policy, samples) = {
            let cfg = config.read().await;
            (
                cfg.maxmemory,
                EvictionPolicy::from_str(&cfg.maxmemory_policy),
                cfg.maxmemory_samples,
            )
        };

        if maxmemory == 0 || policy == EvictionPolicy::NoEviction {
            continue;
        }

        let mut store = store.write().await;
        let used = store.estimated_memory() as u64;
        if used <= maxmemory {
            continue;
        }
        let bytes_needed = used - maxmemory;

        let mut pool = pool.lock().await;
        eviction::run_cycle(&mut store, &mut pool, policy, samples, bytes_needed);
    }
}

/// Background task that flushes AOF every second (for everysec policy).
async fn aof_fsync_loop(aof: SharedAofWriter) {
    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let mut aof = aof.lock().await;
        let _ = aof.flush();
    }
}
