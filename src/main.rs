use cedis::config::Config;
use cedis::eviction::EvictionPool;
use cedis::keywatcher::KeyWatcher;
use cedis::persistence::aof::{AofWriter, FsyncPolicy};
use cedis::persistence::rdb;
use cedis::pubsub::PubSubRegistry;
use cedis::scripting::ScriptCache;
use cedis::server;
use cedis::slowlog::{SlowLog, new_stats};
use cedis::store::DataStore;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Parse command line args
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = Config::from_args(&args);

    let num_dbs = config.databases;
    let rdb_path = format!("{}/{}", config.dir, config.dbfilename);
    let aof_enabled = config.appendonly;
    let aof_path = format!("{}/{}", config.dir, config.appendfilename);
    let aof_policy = FsyncPolicy::from_str(&config.appendfsync);
    let slowlog_max_len = config.slowlog_max_len;

    // Startup load: the journal takes precedence over the snapshot when both
    // exist — only one source is ever consumed (SPEC_FULL.md §2).
    let aof_exists = aof_enabled && std::path::Path::new(&aof_path).exists();
    let store = if aof_exists {
        let mut store = DataStore::new(num_dbs);
        info!("Replaying AOF from {aof_path}...");
        match cedis::persistence::aof::replay(&aof_path, &mut store, num_dbs) {
            Ok(count) => info!("AOF replayed {count} commands"),
            Err(e) => tracing::warn!("Failed to replay AOF: {e}"),
        }
        store
    } else if std::path::Path::new(&rdb_path).exists() {
        info!("Loading RDB from {rdb_path}...");
        match rdb::load(&rdb_path, num_dbs) {
            Ok(store) => {
                info!("RDB loaded successfully");
                store
            }
            Err(e) => {
                tracing::warn!("Failed to load RDB: {e}, starting with empty store");
                DataStore::new(num_dbs)
            }
        }
    } else {
        DataStore::new(num_dbs)
    };

    let config = Arc::new(RwLock::new(config));
    let store = Arc::new(RwLock::new(store));
    let pubsub = Arc::new(RwLock::new(PubSubRegistry::new()));

    // Set up AOF writer
    let mut aof_writer = AofWriter::new();
    if aof_enabled {
        if let Err(e) = aof_writer.open(&aof_path, aof_policy) {
            tracing::warn!("Failed to open AOF: {e}");
        } else {
            info!("AOF enabled: {aof_path}");
        }
    }
    let aof = Arc::new(Mutex::new(aof_writer));

    let key_watcher = Arc::new(RwLock::new(KeyWatcher::new()));
    let script_cache = ScriptCache::new();
    let slowlog = Arc::new(Mutex::new(SlowLog::new(slowlog_max_len)));
    let stats = new_stats();
    let eviction_pool = Arc::new(Mutex::new(EvictionPool::new()));

    server::run_server(
        store,
        config,
        pubsub,
        aof,
        key_watcher,
        script_cache,
        slowlog,
        stats,
        eviction_pool,
    )
    .await
}
