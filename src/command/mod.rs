pub mod hash;
pub mod key;
pub mod list;
pub mod pubsub;
pub mod scripting;
pub mod server_cmd;
pub mod set;
pub mod sorted_set;
pub mod stream;
pub mod string;
pub mod transaction;

use crate::config::SharedConfig;
use crate::connection::ClientState;
use crate::keywatcher::SharedKeyWatcher;
use crate::persistence::aof::SharedAofWriter;
use crate::pubsub::SharedPubSub;
use crate::resp::RespValue;
use crate::scripting::ScriptCache;
use crate::slowlog::{SharedSlowLog, SharedStats};
use crate::store::SharedStore;
use std::sync::atomic::Ordering;
use std::time::Instant;
use tokio::sync::mpsc;

/// Dispatch a parsed command to the appropriate handler. Besides routing,
/// this is where the cross-cutting concerns live: MULTI-queueing, OOM
/// rejection under `noeviction`, post-success AOF logging (with automatic
/// SELECT-diffing and auto-rewrite triggering), command-processed counting,
/// and SLOWLOG capture.
#[allow(clippy::too_many_arguments)]
pub async fn dispatch(
    cmd_name: &str,
    args: &[RespValue],
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
    // Inside MULTI, every command except EXEC/DISCARD/MULTI/WATCH/RESET is
    // queued rather than executed. WATCH is rejected outright (not queued),
    // matching its own in-transaction guard below. An unrecognized command
    // name is rejected immediately and marks the transaction for EXECABORT,
    // same as a real arity/unknown-command error at queue time.
    if client.in_multi
        && !matches!(
            cmd_name,
            "EXEC" | "DISCARD" | "MULTI" | "WATCH" | "RESET" | "QUIT"
        )
    {
        if !is_known_command(cmd_name) {
            client.multi_error = true;
            let args_preview: Vec<String> = args
                .iter()
                .take(3)
                .filter_map(|a| a.to_string_lossy())
                .map(|s| format!("'{s}'"))
                .collect();
            return RespValue::error(format!(
                "ERR unknown command '{}', with args beginning with: {}",
                cmd_name,
                args_preview.join(" ")
            ));
        }
        client.multi_queue.push((cmd_name.to_string(), args.to_vec()));
        return RespValue::SimpleString("QUEUED".to_string());
    }

    // OOM guard: under a strict noeviction policy, reject further writes
    // once the store is already at or above the memory ceiling.
    if is_write_command(cmd_name) {
        let cfg = config.read().await;
        if cfg.maxmemory > 0 && cfg.maxmemory_policy == "noeviction" {
            let used = store.read().await.estimated_memory() as u64;
            if used >= cfg.maxmemory {
                return RespValue::error(
                    "OOM command not allowed when used memory > 'maxmemory'.",
                );
            }
        }
    }

    let start = Instant::now();
    let result = dispatch_inner(
        cmd_name,
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
    .await;
    let elapsed_micros = start.elapsed().as_micros() as u64;

    stats.total_commands_processed.fetch_add(1, Ordering::Relaxed);

    let threshold = config.read().await.slowlog_log_slower_than;
    if threshold >= 0 && elapsed_micros >= threshold as u64 {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let args_preview: Vec<String> = args.iter().filter_map(|a| a.to_string_lossy()).collect();
        slowlog
            .lock()
            .await
            .add(timestamp, elapsed_micros, cmd_name.to_string(), args_preview);
    }

    if is_write_command(cmd_name) && !result.is_error() {
        let mut writer = aof.lock().await;
        if writer.is_active() {
            let _ = writer.log_command(client.db_index, cmd_name, args);
            let (min_size, growth_pct) = {
                let cfg = config.read().await;
                (cfg.auto_aof_rewrite_min_size, cfg.auto_aof_rewrite_percentage)
            };
            if writer.should_auto_rewrite(min_size, growth_pct) {
                drop(writer);
                spawn_auto_rewrite(store.clone(), config.clone(), aof.clone());
            }
        }
    }

    result
}

/// Kick off a background AOF rewrite for the auto-rewrite trigger, mirroring
/// what BGREWRITEAOF does by hand.
fn spawn_auto_rewrite(store: SharedStore, config: SharedConfig, aof: SharedAofWriter) {
    tokio::spawn(async move {
        {
            let writer = aof.lock().await;
            if !writer.try_begin_rewrite() {
                return;
            }
        }
        let path = {
            let cfg = config.read().await;
            format!("{}/{}", cfg.dir, cfg.appendfilename)
        };
        let result = {
            let store_r = store.read().await;
            crate::persistence::aof::rewrite(&store_r, &path)
        };
        let mut writer = aof.lock().await;
        match result {
            Ok(()) => {
                if let Err(e) = writer.finish_rewrite(&path) {
                    tracing::warn!("Failed to reopen AOF after auto-rewrite: {e}");
                }
            }
            Err(e) => {
                writer.abort_rewrite();
                tracing::warn!("Auto AOF rewrite failed: {e}");
            }
        }
    });
}

/// Commands that mutate the keyspace and therefore get logged to the AOF
/// journal once they complete successfully. SELECT is deliberately absent:
/// the journal emits its own SELECT records based on db-diffing rather than
/// mirroring a client's SELECT calls.
fn is_write_command(cmd: &str) -> bool {
    matches!(
        cmd,
        "SET" | "SETNX" | "SETEX" | "PSETEX" | "MSET" | "MSETNX" | "APPEND"
            | "INCR" | "DECR" | "INCRBY" | "DECRBY" | "INCRBYFLOAT"
            | "SETRANGE" | "GETSET" | "GETDEL" | "GETEX"
            | "DEL" | "UNLINK" | "EXPIRE" | "PEXPIRE" | "EXPIREAT" | "PEXPIREAT" | "PERSIST"
            | "RENAME" | "RENAMENX" | "COPY" | "MOVE" | "RESTORE"
            | "LPUSH" | "RPUSH" | "LPUSHX" | "RPUSHX" | "LPOP" | "RPOP" | "LSET" | "LINSERT"
            | "LREM" | "LTRIM" | "RPOPLPUSH" | "LMOVE" | "LMPOP" | "BLPOP" | "BRPOP" | "BLMOVE"
            | "BLMPOP"
            | "HSET" | "HDEL" | "HINCRBY" | "HINCRBYFLOAT" | "HSETNX" | "HMSET"
            | "SADD" | "SREM" | "SPOP" | "SMOVE" | "SUNIONSTORE" | "SINTERSTORE" | "SDIFFSTORE"
            | "ZADD" | "ZREM" | "ZINCRBY" | "ZUNIONSTORE" | "ZINTERSTORE" | "ZPOPMIN" | "ZPOPMAX"
            | "ZDIFFSTORE" | "ZMPOP" | "BZPOPMIN" | "BZPOPMAX" | "BZMPOP"
            | "ZREMRANGEBYSCORE" | "ZREMRANGEBYLEX" | "ZREMRANGEBYRANK"
            | "XADD" | "XDEL" | "XTRIM" | "XGROUP" | "XACK" | "XCLAIM" | "XAUTOCLAIM"
            | "FLUSHDB" | "FLUSHALL" | "SWAPDB"
            | "EVAL" | "EVALSHA"
    )
}

#[allow(clippy::too_many_arguments)]
async fn dispatch_inner(
    cmd_name: &str,
    args: &[RespValue],
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
    match cmd_name {
        // Connection
        "PING" => server_cmd::cmd_ping(args),
        "ECHO" => server_cmd::cmd_echo(args),
        "QUIT" => server_cmd::cmd_quit(client),
        "SELECT" => server_cmd::cmd_select(args, client, config).await,
        "AUTH" => server_cmd::cmd_auth(args, client, config).await,
        "HELLO" => server_cmd::cmd_hello(args),
        "DBSIZE" => server_cmd::cmd_dbsize(store, client).await,
        "FLUSHDB" => server_cmd::cmd_flushdb(store, client).await,
        "FLUSHALL" => server_cmd::cmd_flushall(store).await,
        "SWAPDB" => server_cmd::cmd_swapdb(args, store, config).await,

        // Server
        "INFO" => server_cmd::cmd_info(args, store, config, stats).await,
        "CONFIG" => server_cmd::cmd_config(args, config, store).await,
        "TIME" => server_cmd::cmd_time(),
        "COMMAND" => server_cmd::cmd_command(args),
        "CLIENT" => server_cmd::cmd_client(args, client),
        "DEBUG" => server_cmd::cmd_debug(args, store, config, client).await,
        "RESET" => server_cmd::cmd_reset(client),
        "SLOWLOG" => server_cmd::cmd_slowlog(args, slowlog).await,

        // Strings
        "GET" => string::cmd_get(args, store, client).await,
        "SET" => string::cmd_set(args, store, client).await,
        "GETSET" => string::cmd_getset(args, store, client).await,
        "GETEX" => string::cmd_getex(args, store, client).await,
        "MGET" => string::cmd_mget(args, store, client).await,
        "MSET" => string::cmd_mset(args, store, client).await,
        "MSETNX" => string::cmd_msetnx(args, store, client).await,
        "APPEND" => string::cmd_append(args, store, client).await,
        "STRLEN" => string::cmd_strlen(args, store, client).await,
        "INCR" => string::cmd_incr(args, store, client).await,
        "DECR" => string::cmd_decr(args, store, client).await,
        "INCRBY" => string::cmd_incrby(args, store, client).await,
        "DECRBY" => string::cmd_decrby(args, store, client).await,
        "INCRBYFLOAT" => string::cmd_incrbyfloat(args, store, client).await,
        "SETNX" => string::cmd_setnx(args, store, client).await,
        "SETEX" => string::cmd_setex(args, store, client).await,
        "PSETEX" => string::cmd_psetex(args, store, client).await,
        "GETRANGE" => string::cmd_getrange(args, store, client).await,
        "SETRANGE" => string::cmd_setrange(args, store, client).await,
        "GETDEL" => string::cmd_getdel(args, store, client).await,

        // Keys
        "DEL" => key::cmd_del(args, store, client).await,
        "UNLINK" => key::cmd_del(args, store, client).await,
        "EXISTS" => key::cmd_exists(args, store, client).await,
        "EXPIRE" => key::cmd_expire(args, store, client).await,
        "PEXPIRE" => key::cmd_pexpire(args, store, client).await,
        "EXPIREAT" => key::cmd_expireat(args, store, client).await,
        "PEXPIREAT" => key::cmd_pexpireat(args, store, client).await,
        "EXPIRETIME" => key::cmd_expiretime(args, store, client).await,
        "PEXPIRETIME" => key::cmd_pexpiretime(args, store, client).await,
        "TTL" => key::cmd_ttl(args, store, client).await,
        "PTTL" => key::cmd_pttl(args, store, client).await,
        "PERSIST" => key::cmd_persist(args, store, client).await,
        "TYPE" => key::cmd_type(args, store, client).await,
        "RENAME" => key::cmd_rename(args, store, client).await,
        "RENAMENX" => key::cmd_renamenx(args, store, client).await,
        "KEYS" => key::cmd_keys(args, store, client).await,
        "SCAN" => key::cmd_scan(args, store, client).await,
        "RANDOMKEY" => key::cmd_randomkey(store, client).await,
        "OBJECT" => key::cmd_object(args, store, config, client).await,
        "DUMP" => key::cmd_dump(args),
        "RESTORE" => key::cmd_restore(args),
        "SORT" => key::cmd_sort(args, store, client).await,
        "COPY" => key::cmd_copy(args, store, client).await,
        "MOVE" => key::cmd_move(args, store, client).await,

        // Lists
        "LPUSH" => list::cmd_lpush(args, store, client, key_watcher).await,
        "RPUSH" => list::cmd_rpush(args, store, client, key_watcher).await,
        "LPUSHX" => list::cmd_lpushx(args, store, client, key_watcher).await,
        "RPUSHX" => list::cmd_rpushx(args, store, client, key_watcher).await,
        "LPOP" => list::cmd_lpop(args, store, client).await,
        "RPOP" => list::cmd_rpop(args, store, client).await,
        "LLEN" => list::cmd_llen(args, store, client).await,
        "LRANGE" => list::cmd_lrange(args, store, client).await,
        "LINDEX" => list::cmd_lindex(args, store, client).await,
        "LSET" => list::cmd_lset(args, store, client).await,
        "LINSERT" => list::cmd_linsert(args, store, client).await,
        "LREM" => list::cmd_lrem(args, store, client).await,
        "LTRIM" => list::cmd_ltrim(args, store, client).await,
        "RPOPLPUSH" => list::cmd_rpoplpush(args, store, client).await,
        "LMOVE" => list::cmd_lmove(args, store, client).await,
        "LPOS" => list::cmd_lpos(args, store, client).await,
        "LMPOP" => list::cmd_lmpop(args, store, client).await,
        "BLPOP" => list::cmd_blpop(args, store, client, key_watcher).await,
        "BRPOP" => list::cmd_brpop(args, store, client, key_watcher).await,
        "BLMOVE" => list::cmd_blmove(args, store, client, key_watcher).await,
        "BLMPOP" => list::cmd_blmpop(args, store, client, key_watcher).await,

        // Hashes
        "HSET" => hash::cmd_hset(args, store, client).await,
        "HGET" => hash::cmd_hget(args, store, client).await,
        "HDEL" => hash::cmd_hdel(args, store, client).await,
        "HEXISTS" => hash::cmd_hexists(args, store, client).await,
        "HLEN" => hash::cmd_hlen(args, store, client).await,
        "HKEYS" => hash::cmd_hkeys(args, store, client).await,
        "HVALS" => hash::cmd_hvals(args, store, client).await,
        "HGETALL" => hash::cmd_hgetall(args, store, client).await,
        "HMSET" => hash::cmd_hset(args, store, client).await,
        "HMGET" => hash::cmd_hmget(args, store, client).await,
        "HINCRBY" => hash::cmd_hincrby(args, store, client).await,
        "HINCRBYFLOAT" => hash::cmd_hincrbyfloat(args, store, client).await,
        "HSETNX" => hash::cmd_hsetnx(args, store, client).await,
        "HRANDFIELD" => hash::cmd_hrandfield(args, store, client).await,
        "HSCAN" => hash::cmd_hscan(args, store, client).await,

        // Sets
        "SADD" => set::cmd_sadd(args, store, client).await,
        "SREM" => set::cmd_srem(args, store, client).await,
        "SISMEMBER" => set::cmd_sismember(args, store, client).await,
        "SMISMEMBER" => set::cmd_smismember(args, store, client).await,
        "SMEMBERS" => set::cmd_smembers(args, store, client).await,
        "SCARD" => set::cmd_scard(args, store, client).await,
        "SPOP" => set::cmd_spop(args, store, client).await,
        "SRANDMEMBER" => set::cmd_srandmember(args, store, client).await,
        "SUNION" => set::cmd_sunion(args, store, client).await,
        "SINTER" => set::cmd_sinter(args, store, client).await,
        "SDIFF" => set::cmd_sdiff(args, store, client).await,
        "SUNIONSTORE" => set::cmd_sunionstore(args, store, client).await,
        "SINTERSTORE" => set::cmd_sinterstore(args, store, client).await,
        "SDIFFSTORE" => set::cmd_sdiffstore(args, store, client).await,
        "SMOVE" => set::cmd_smove(args, store, client).await,
        "SSCAN" => set::cmd_sscan(args, store, client).await,
        "SINTERCARD" => set::cmd_sintercard(args, store, client).await,

        // Sorted sets
        "ZADD" => sorted_set::cmd_zadd(args, store, client, key_watcher).await,
        "ZREM" => sorted_set::cmd_zrem(args, store, client).await,
        "ZSCORE" => sorted_set::cmd_zscore(args, store, client).await,
        "ZRANK" => sorted_set::cmd_zrank(args, store, client).await,
        "ZREVRANK" => sorted_set::cmd_zrevrank(args, store, client).await,
        "ZCARD" => sorted_set::cmd_zcard(args, store, client).await,
        "ZCOUNT" => sorted_set::cmd_zcount(args, store, client).await,
        "ZRANGE" => sorted_set::cmd_zrange(args, store, client).await,
        "ZREVRANGE" => sorted_set::cmd_zrevrange(args, store, client).await,
        "ZRANGEBYSCORE" => sorted_set::cmd_zrangebyscore(args, store, client).await,
        "ZREVRANGEBYSCORE" => sorted_set::cmd_zrevrangebyscore(args, store, client).await,
        "ZRANGEBYLEX" => sorted_set::cmd_zrangebylex(args, store, client).await,
        "ZREVRANGEBYLEX" => sorted_set::cmd_zrevrangebylex(args, store, client).await,
        "ZREMRANGEBYSCORE" => sorted_set::cmd_zremrangebyscore(args, store, client).await,
        "ZREMRANGEBYLEX" => sorted_set::cmd_zremrangebylex(args, store, client).await,
        "ZREMRANGEBYRANK" => sorted_set::cmd_zremrangebyrank(args, store, client).await,
        "ZINCRBY" => sorted_set::cmd_zincrby(args, store, client).await,
        "ZUNIONSTORE" => sorted_set::cmd_zunionstore(args, store, client).await,
        "ZINTERSTORE" => sorted_set::cmd_zinterstore(args, store, client).await,
        "ZUNION" => sorted_set::cmd_zunion(args, store, client).await,
        "ZINTER" => sorted_set::cmd_zinter(args, store, client).await,
        "ZDIFF" => sorted_set::cmd_zdiff(args, store, client).await,
        "ZDIFFSTORE" => sorted_set::cmd_zdiffstore(args, store, client).await,
        "ZINTERCARD" => sorted_set::cmd_zintercard(args, store, client).await,
        "ZMPOP" => sorted_set::cmd_zmpop(args, store, client).await,
        "BZPOPMIN" => sorted_set::cmd_bzpopmin(args, store, client, key_watcher).await,
        "BZPOPMAX" => sorted_set::cmd_bzpopmax(args, store, client, key_watcher).await,
        "BZMPOP" => sorted_set::cmd_bzmpop(args, store, client).await,
        "ZRANDMEMBER" => sorted_set::cmd_zrandmember(args, store, client).await,
        "ZSCAN" => sorted_set::cmd_zscan(args, store, client).await,
        "ZPOPMIN" => sorted_set::cmd_zpopmin(args, store, client).await,
        "ZPOPMAX" => sorted_set::cmd_zpopmax(args, store, client).await,
        "ZMSCORE" => sorted_set::cmd_zmscore(args, store, client).await,
        "ZLEXCOUNT" => sorted_set::cmd_zlexcount(args, store, client).await,

        // Streams
        "XADD" => stream::cmd_xadd(args, store, client, key_watcher).await,
        "XLEN" => stream::cmd_xlen(args, store, client).await,
        "XRANGE" => stream::cmd_xrange(args, store, client).await,
        "XREVRANGE" => stream::cmd_xrevrange(args, store, client).await,
        "XREAD" => stream::cmd_xread(args, store, client).await,
        "XDEL" => stream::cmd_xdel(args, store, client).await,
        "XINFO" => stream::cmd_xinfo(args, store, client).await,
        "XTRIM" => stream::cmd_xtrim(args, store, client).await,
        "XGROUP" => stream::cmd_xgroup(args, store, client).await,
        "XREADGROUP" => stream::cmd_xreadgroup(args, store, client, key_watcher).await,
        "XACK" => stream::cmd_xack(args, store, client).await,
        "XCLAIM" => stream::cmd_xclaim(args, store, client).await,
        "XAUTOCLAIM" => stream::cmd_xautoclaim(args, store, client).await,
        "XPENDING" => stream::cmd_xpending(args, store, client).await,

        // Transactions
        "MULTI" => transaction::cmd_multi(client),
        "EXEC" => {
            transaction::cmd_exec(
                store, config, client, pubsub, pubsub_tx, key_watcher, script_cache, aof, slowlog,
                stats,
            )
            .await
        }
        "DISCARD" => transaction::cmd_discard(client),
        "WATCH" => transaction::cmd_watch(args, store, client).await,
        "UNWATCH" => transaction::cmd_unwatch(client),

        // Pub/Sub
        "SUBSCRIBE" => pubsub::cmd_subscribe(args, client, pubsub, pubsub_tx).await,
        "UNSUBSCRIBE" => pubsub::cmd_unsubscribe(args, client, pubsub, pubsub_tx).await,
        "PSUBSCRIBE" => pubsub::cmd_psubscribe(args, client, pubsub, pubsub_tx).await,
        "PUNSUBSCRIBE" => pubsub::cmd_punsubscribe(args, client, pubsub, pubsub_tx).await,
        "PUBLISH" => pubsub::cmd_publish(args, pubsub).await,
        "PUBSUB" => pubsub::cmd_pubsub(args, pubsub).await,

        // Scripting
        "EVAL" => {
            scripting::cmd_eval(
                args,
                store,
                config,
                client,
                pubsub,
                pubsub_tx,
                key_watcher,
                script_cache,
            )
            .await
        }
        "EVALSHA" => {
            scripting::cmd_evalsha(
                args,
                store,
                config,
                client,
                pubsub,
                pubsub_tx,
                key_watcher,
                script_cache,
            )
            .await
        }
        "SCRIPT" => scripting::cmd_script(args, script_cache).await,

        // Persistence
        "SAVE" => server_cmd::cmd_save(store, config, stats).await,
        "BGSAVE" => server_cmd::cmd_bgsave(store, config, stats).await,
        "BGREWRITEAOF" => server_cmd::cmd_bgrewriteaof(store, config, aof).await,
        "LASTSAVE" => server_cmd::cmd_lastsave(stats),

        _ => {
            let args_preview: Vec<String> = args
                .iter()
                .take(3)
                .filter_map(|a| a.to_string_lossy())
                .map(|s| format!("'{s}'"))
                .collect();
            RespValue::error(format!(
                "ERR unknown command '{}', with args beginning with: {}",
                cmd_name,
                args_preview.join(" ")
            ))
        }
    }
}

/// Extract string bytes from a RespValue argument.
pub fn arg_to_bytes(arg: &RespValue) -> Option<&[u8]> {
    arg.as_str()
}

/// Extract a UTF-8 string from a RespValue argument.
pub fn arg_to_string(arg: &RespValue) -> Option<String> {
    arg.to_string_lossy()
}

/// Extract an i64 from a RespValue argument.
pub fn arg_to_i64(arg: &RespValue) -> Option<i64> {
    let s = arg.to_string_lossy()?;
    s.parse().ok()
}

/// Extract an f64 from a RespValue argument.
pub fn arg_to_f64(arg: &RespValue) -> Option<f64> {
    let s = arg.to_string_lossy()?;
    s.parse().ok()
}

/// Return a WRONGTYPE error.
pub fn wrong_type_error() -> RespValue {
    RespValue::error("WRONGTYPE Operation against a key holding the wrong kind of value")
}

/// Return a wrong number of arguments error.
pub fn wrong_arg_count(cmd: &str) -> RespValue {
    RespValue::error(format!("ERR wrong number of arguments for '{cmd}' command"))
}

/// Whether `name` is a recognized command, used to decide at MULTI-queue time
/// whether to queue a command or abort the transaction immediately.
fn is_known_command(name: &str) -> bool {
    const NAMES: &[&str] = &[
        "PING", "ECHO", "QUIT", "SELECT", "AUTH", "HELLO", "DBSIZE", "FLUSHDB", "FLUSHALL",
        "SWAPDB", "INFO", "CONFIG", "TIME", "COMMAND", "CLIENT", "DEBUG", "RESET", "GET", "SET",
        "GETSET", "GETEX", "MGET", "MSET", "MSETNX", "APPEND", "STRLEN", "INCR", "DECR", "INCRBY",
        "DECRBY", "INCRBYFLOAT", "SETNX", "SETEX", "PSETEX", "GETRANGE", "SETRANGE", "GETDEL",
        "DEL", "UNLINK", "EXISTS", "EXPIRE", "PEXPIRE", "EXPIREAT", "PEXPIREAT", "EXPIRETIME",
        "PEXPIRETIME", "TTL", "PTTL", "PERSIST", "TYPE", "RENAME", "RENAMENX", "KEYS", "SCAN",
        "RANDOMKEY", "OBJECT", "DUMP", "RESTORE", "SORT", "COPY", "MOVE", "LPUSH", "RPUSH",
        "LPUSHX", "RPUSHX", "LPOP", "RPOP", "LLEN", "LRANGE", "LINDEX", "LSET", "LINSERT", "LREM",
        "LTRIM", "RPOPLPUSH", "LMOVE", "LPOS", "LMPOP", "BLPOP", "BRPOP", "BLMOVE", "BLMPOP",
        "HSET", "HGET", "HDEL", "HEXISTS", "HLEN", "HKEYS", "HVALS", "HGETALL", "HMSET", "HMGET",
        "HINCRBY", "HINCRBYFLOAT", "HSETNX", "HRANDFIELD", "HSCAN", "SADD", "SREM", "SISMEMBER",
        "SMISMEMBER", "SMEMBERS", "SCARD", "SPOP", "SRANDMEMBER", "SUNION", "SINTER", "SDIFF",
        "SUNIONSTORE", "SINTERSTORE", "SDIFFSTORE", "SMOVE", "SSCAN", "SINTERCARD", "ZADD",
        "ZREM", "ZSCORE", "ZRANK", "ZREVRANK", "ZCARD", "ZCOUNT", "ZRANGE", "ZREVRANGE",
        "ZRANGEBYSCORE", "ZREVRANGEBYSCORE", "ZRANGEBYLEX", "ZREVRANGEBYLEX", "ZREMRANGEBYSCORE",
        "ZREMRANGEBYLEX", "ZREMRANGEBYRANK", "ZINCRBY", "ZUNIONSTORE", "ZINTERSTORE", "ZUNION",
        "ZINTER", "ZDIFF", "ZDIFFSTORE", "ZINTERCARD", "ZMPOP", "BZPOPMIN", "BZPOPMAX", "BZMPOP",
        "ZRANDMEMBER", "ZSCAN", "ZPOPMIN", "ZPOPMAX", "ZMSCORE", "ZLEXCOUNT", "XADD", "XLEN",
        "XRANGE", "XREVRANGE", "XREAD", "XDEL", "XINFO", "XTRIM", "XGROUP", "XREADGROUP", "XACK",
        "XCLAIM", "XAUTOCLAIM", "XPENDING", "MULTI", "EXEC", "DISCARD", "WATCH", "UNWATCH",
        "SUBSCRIBE", "UNSUBSCRIBE", "PSUBSCRIBE", "PUNSUBSCRIBE", "PUBLISH", "PUBSUB", "EVAL",
        "EVALSHA", "SCRIPT", "SAVE", "BGSAVE", "BGREWRITEAOF", "LASTSAVE", "SLOWLOG",
    ];
    NAMES.contains(&name)
}
