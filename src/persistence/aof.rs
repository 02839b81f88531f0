use crate::resp::RespValue;
use crate::store::DataStore;
use crate::types::RedisValue;
use std::io::{self, BufRead, Read, Write};
use std::sync::Arc;
use tokio::sync::Mutex;

/// AOF writer that logs write commands.
pub struct AofWriter {
    file: Option<std::fs::File>,
    fsync_policy: FsyncPolicy,
    /// The database index the journal last saw a SELECT for. A new SELECT
    /// record is emitted automatically whenever a logged command targets a
    /// different db, mirroring how Redis keeps its own AOF db-context.
    current_db: Option<usize>,
    /// File size in bytes as of the last successful rewrite, used to decide
    /// when growth has earned another auto-rewrite.
    base_size: u64,
    /// Guards against two BGREWRITEAOF cycles running concurrently.
    rewrite_in_progress: std::sync::atomic::AtomicBool,
}

#[derive(Clone, Copy, PartialEq)]
pub enum FsyncPolicy {
    Always,
    Everysec,
    No,
}

impl FsyncPolicy {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s {
            "always" => FsyncPolicy::Always,
            "everysec" => FsyncPolicy::Everysec,
            _ => FsyncPolicy::No,
        }
    }
}

impl Default for AofWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl AofWriter {
    pub fn new() -> Self {
        AofWriter {
            file: None,
            fsync_policy: FsyncPolicy::Everysec,
            current_db: None,
            base_size: 0,
            rewrite_in_progress: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Open or create the AOF file.
    pub fn open(&mut self, path: &str, policy: FsyncPolicy) -> io::Result<()> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        self.base_size = file.metadata().map(|m| m.len()).unwrap_or(0);
        self.file = Some(file);
        self.fsync_policy = policy;
        self.current_db = None;
        Ok(())
    }

    /// Log a write command, emitting a SELECT record first if `db_index`
    /// differs from the db the journal is currently positioned on.
    pub fn log_command(&mut self, db_index: usize, cmd_name: &str, args: &[RespValue]) -> io::Result<()> {
        if self.file.is_none() {
            return Ok(());
        }

        if self.current_db != Some(db_index) {
            let select = RespValue::array(vec![
                RespValue::bulk_string(b"SELECT".to_vec()),
                RespValue::bulk_string(db_index.to_string().into_bytes()),
            ]);
            let file = self.file.as_mut().unwrap();
            file.write_all(&select.serialize())?;
            self.current_db = Some(db_index);
        }

        let mut items = Vec::with_capacity(1 + args.len());
        items.push(RespValue::bulk_string(cmd_name.as_bytes().to_vec()));
        for arg in args {
            items.push(arg.clone());
        }
        let resp = RespValue::array(items);
        let serialized = resp.serialize();

        let file = self.file.as_mut().unwrap();
        file.write_all(&serialized)?;

        if self.fsync_policy == FsyncPolicy::Always {
            file.flush()?;
            file.sync_data()?;
        }

        Ok(())
    }

    /// Flush the file to disk.
    pub fn flush(&mut self) -> io::Result<()> {
        if let Some(f) = &mut self.file {
            f.flush()?;
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.file.is_some()
    }

    pub fn close(&mut self) {
        if let Some(f) = self.file.take() {
            let _ = f.sync_all();
        }
    }

    /// Current on-disk size, used by the auto-rewrite heuristic.
    fn current_size(&self) -> u64 {
        self.file
            .as_ref()
            .and_then(|f| f.metadata().ok())
            .map(|m| m.len())
            .unwrap_or(0)
    }

    /// Whether growth since the last rewrite has crossed both the absolute
    /// `auto_aof_rewrite_min_size` floor and the `auto_aof_rewrite_percentage`
    /// growth threshold, matching Redis's own auto-rewrite trigger.
    pub fn should_auto_rewrite(&self, min_size: u64, growth_percentage: u64) -> bool {
        if !self.is_active() || self.rewrite_in_progress.load(std::sync::atomic::Ordering::Acquire) {
            return false;
        }
        let size = self.current_size();
        if size < min_size {
            return false;
        }
        if self.base_size == 0 {
            return true;
        }
        let growth = ((size.saturating_sub(self.base_size)) * 100) / self.base_size;
        growth >= growth_percentage
    }

    /// Try to claim the single rewrite slot. Returns false if a rewrite is
    /// already in flight.
    pub fn try_begin_rewrite(&self) -> bool {
        self.rewrite_in_progress
            .compare_exchange(
                false,
                true,
                std::sync::atomic::Ordering::AcqRel,
                std::sync::atomic::Ordering::Acquire,
            )
            .is_ok()
    }

    /// Reopen the journal after a rewrite replaced the underlying file, and
    /// release the rewrite slot. The freshly rewritten file always starts
    /// positioned on db 0, since `rewrite` itself emits a leading SELECT.
    pub fn finish_rewrite(&mut self, path: &str) -> io::Result<()> {
        let policy = self.fsync_policy;
        self.open(path, policy)?;
        self.rewrite_in_progress
            .store(false, std::sync::atomic::Ordering::Release);
        Ok(())
    }

    /// Release the rewrite slot without reopening, used when the rewrite
    /// itself failed.
    pub fn abort_rewrite(&mut self) {
        self.rewrite_in_progress
            .store(false, std::sync::atomic::Ordering::Release);
    }
}

/// Replay an AOF file to restore state.
pub fn replay(path: &str, store: &mut DataStore, num_databases: usize) -> io::Result<usize> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut reader = io::BufReader::new(file);
    let mut cmd_count = 0usize;
    let mut current_db = 0usize;

    loop {
        // Read one RESP value
        let value = match read_resp_value(&mut reader) {
            Ok(Some(v)) => v,
            Ok(None) => break,
            Err(_) => break, // Truncated AOF, stop here
        };

        let items = match value {
            RespValue::Array(Some(items)) if !items.is_empty() => items,
            _ => continue,
        };

        let cmd_name = match items[0].to_string_lossy() {
            Some(s) => s.to_uppercase(),
            None => continue,
        };

        let args = &items[1..];

        // Apply the command to the store directly
        apply_command(store, &cmd_name, args, &mut current_db, num_databases);
        cmd_count += 1;
    }

    Ok(cmd_count)
}

/// Rewrite the AOF by scanning the current store state.
pub fn rewrite(store: &DataStore, path: &str) -> io::Result<()> {
    let tmp_path = format!("{path}.tmp");
    let mut file = std::fs::File::create(&tmp_path)?;

    for (db_index, db) in store.databases.iter().enumerate() {
        let entries: Vec<_> = db.iter().collect();
        if entries.is_empty() {
            continue;
        }

        // SELECT db
        let select_cmd = RespValue::array(vec![
            RespValue::bulk_string(b"SELECT".to_vec()),
            RespValue::bulk_string(db_index.to_string().into_bytes()),
        ]);
        file.write_all(&select_cmd.serialize())?;

        for (key, entry) in &entries {
            match &entry.value {
                RedisValue::String(s) => {
                    let cmd = RespValue::array(vec![
                        RespValue::bulk_string(b"SET".to_vec()),
                        RespValue::bulk_string(key.as_bytes().to_vec()),
                        RespValue::bulk_string(s.as_bytes().to_vec()),
                    ]);
                    file.write_all(&cmd.serialize())?;
                }
                RedisValue::List(list) => {
                    let items: Vec<_> = list.iter().collect();
                    if !items.is_empty() {
                        let mut cmd_parts = vec![
                            RespValue::bulk_string(b"RPUSH".to_vec()),
                            RespValue::bulk_string(key.as_bytes().to_vec()),
                        ];
                        for item in items {
                            cmd_parts.push(RespValue::bulk_string(item.to_vec()));
                        }
                        file.write_all(&RespValue::array(cmd_parts).serialize())?;
                    }
                }
                RedisValue::Hash(hash) => {
                    let fields: Vec<_> = hash.iter().collect();
                    if !fields.is_empty() {
                        let mut cmd_parts = vec![
                            RespValue::bulk_string(b"HSET".to_vec()),
                            RespValue::bulk_string(key.as_bytes().to_vec()),
                        ];
                        for (field, value) in fields {
                            cmd_parts.push(RespValue::bulk_string(field.as_bytes().to_vec()));
                            cmd_parts.push(RespValue::bulk_string(value.to_vec()));
                        }
                        file.write_all(&RespValue::array(cmd_parts).serialize())?;
                    }
                }
                RedisValue::Set(set) => {
                    let members = set.members();
                    if !members.is_empty() {
                        let mut cmd_parts = vec![
                            RespValue::bulk_string(b"SADD".to_vec()),
                            RespValue::bulk_string(key.as_bytes().to_vec()),
                        ];
                        for member in members {
                            cmd_parts.push(RespValue::bulk_string(member.to_vec()));
                        }
                        file.write_all(&RespValue::array(cmd_parts).serialize())?;
                    }
                }
                RedisValue::SortedSet(zset) => {
                    let items: Vec<_> = zset.iter().collect();
                    if !items.is_empty() {
                        let mut cmd_parts = vec![
                            RespValue::bulk_string(b"ZADD".to_vec()),
                            RespValue::bulk_string(key.as_bytes().to_vec()),
                        ];
                        for (member, score) in items {
                            cmd_parts.push(RespValue::bulk_string(score.to_string().into_bytes()));
                            cmd_parts.push(RespValue::bulk_string(member.to_vec()));
                        }
                        file.write_all(&RespValue::array(cmd_parts).serialize())?;
                    }
                }
                RedisValue::Stream(stream) => {
                    let lo = crate::types::stream::StreamEntryId::new(0, 0);
                    let hi = crate::types::stream::StreamEntryId::new(u64::MAX, u64::MAX);
                    for (id, fields) in stream.range(&lo, &hi) {
                        let mut cmd_parts = vec![
                            RespValue::bulk_string(b"XADD".to_vec()),
                            RespValue::bulk_string(key.as_bytes().to_vec()),
                            RespValue::bulk_string(id.to_string().into_bytes()),
                        ];
                        for (field, value) in fields {
                            cmd_parts.push(RespValue::bulk_string(field.clone()));
                            cmd_parts.push(RespValue::bulk_string(value.clone()));
                        }
                        file.write_all(&RespValue::array(cmd_parts).serialize())?;
                    }
                }
            }

            // Expiry
            if let Some(exp) = entry.expires_at {
                let cmd = RespValue::array(vec![
                    RespValue::bulk_string(b"PEXPIREAT".to_vec()),
                    RespValue::bulk_string(key.as_bytes().to_vec()),
                    RespValue::bulk_string(exp.to_string().into_bytes()),
                ]);
                file.write_all(&cmd.serialize())?;
            }
        }
    }

    file.flush()?;
    drop(file);
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Delete `key` if its current value is an empty container, matching how
/// the live command handlers clean up after the last element of a
/// List/Hash/Set/SortedSet is removed.
fn cleanup_if_empty(db: &mut crate::store::Database, key: &str) {
    let empty = match db.get(key).map(|e| &e.value) {
        Some(RedisValue::List(l)) => l.is_empty(),
        Some(RedisValue::Hash(h)) => h.is_empty(),
        Some(RedisValue::Set(s)) => s.is_empty(),
        Some(RedisValue::SortedSet(z)) => z.is_empty(),
        _ => false,
    };
    if empty {
        db.del(key);
    }
}

/// Apply a single command to the store (for AOF replay).
fn apply_command(
    store: &mut DataStore,
    cmd: &str,
    args: &[RespValue],
    current_db: &mut usize,
    num_databases: usize,
) {
    let arg_str = |i: usize| -> Option<String> { args.get(i)?.to_string_lossy() };
    let arg_bytes = |i: usize| -> Option<Vec<u8>> { args.get(i)?.as_str().map(|b| b.to_vec()) };

    match cmd {
        "SELECT" => {
            if let Some(db) = arg_str(0).and_then(|s| s.parse::<usize>().ok())
                && db < num_databases
            {
                *current_db = db;
            }
        }
        "SET" => {
            if let (Some(key), Some(val)) = (arg_str(0), arg_bytes(1)) {
                let mut expires_at: Option<u64> = None;
                let mut keepttl = false;
                let mut i = 2;
                while let Some(opt) = arg_str(i).map(|s| s.to_uppercase()) {
                    match opt.as_str() {
                        "EX" => {
                            if let Some(n) = arg_str(i + 1).and_then(|s| s.parse::<u64>().ok()) {
                                expires_at = Some(crate::store::entry::now_millis() + n * 1000);
                            }
                            i += 1;
                        }
                        "PX" => {
                            if let Some(n) = arg_str(i + 1).and_then(|s| s.parse::<u64>().ok()) {
                                expires_at = Some(crate::store::entry::now_millis() + n);
                            }
                            i += 1;
                        }
                        "EXAT" => {
                            if let Some(n) = arg_str(i + 1).and_then(|s| s.parse::<u64>().ok()) {
                                expires_at = Some(n * 1000);
                            }
                            i += 1;
                        }
                        "PXAT" => {
                            if let Some(n) = arg_str(i + 1).and_then(|s| s.parse::<u64>().ok()) {
                                expires_at = Some(n);
                            }
                            i += 1;
                        }
                        "KEEPTTL" => keepttl = true,
                        _ => {}
                    }
                    i += 1;
                }

                let db = store.db(*current_db);
                let old_expiry = if keepttl {
                    db.get(&key).and_then(|e| e.expires_at)
                } else {
                    None
                };
                let mut entry = crate::store::entry::Entry::new(RedisValue::String(
                    crate::types::rstring::RedisString::new(val),
                ));
                entry.expires_at = expires_at.or(old_expiry);
                db.set(key, entry);
            }
        }
        "DEL" | "UNLINK" => {
            for arg in args {
                if let Some(key) = arg.to_string_lossy() {
                    store.db(*current_db).del(&key);
                }
            }
        }
        "RPUSH" | "LPUSH" => {
            if let Some(key) = arg_str(0) {
                let db = store.db(*current_db);
                if db.get(&key).is_none() {
                    db.set(
                        key.clone(),
                        crate::store::entry::Entry::new(RedisValue::List(
                            crate::types::list::RedisList::new(),
                        )),
                    );
                }
                if let Some(entry) = db.get_mut(&key)
                    && let RedisValue::List(list) = &mut entry.value
                {
                    for arg in &args[1..] {
                        if let Some(v) = arg.as_str() {
                            if cmd == "RPUSH" {
                                list.rpush(v.to_vec());
                            } else {
                                list.lpush(v.to_vec());
                            }
                        }
                    }
                }
            }
        }
        "LPUSHX" | "RPUSHX" => {
            if let Some(key) = arg_str(0) {
                let db = store.db(*current_db);
                if let Some(entry) = db.get_mut(&key)
                    && let RedisValue::List(list) = &mut entry.value
                {
                    for arg in &args[1..] {
                        if let Some(v) = arg.as_str() {
                            if cmd == "RPUSHX" {
                                list.rpush(v.to_vec());
                            } else {
                                list.lpush(v.to_vec());
                            }
                        }
                    }
                }
            }
        }
        "HSET" | "HMSET" => {
            if let Some(key) = arg_str(0) {
                let db = store.db(*current_db);
                if db.get(&key).is_none() {
                    db.set(
                        key.clone(),
                        crate::store::entry::Entry::new(RedisValue::Hash(
                            crate::types::hash::RedisHash::new(),
                        )),
                    );
                }
                if let Some(entry) = db.get_mut(&key)
                    && let RedisValue::Hash(hash) = &mut entry.value
                {
                    for pair in args[1..].chunks(2) {
                        if let (Some(field), Some(val)) = (
                            pair[0].to_string_lossy(),
                            pair.get(1).and_then(|v| v.as_str()),
                        ) {
                            hash.set(field, val.to_vec());
                        }
                    }
                }
            }
        }
        "SADD" => {
            if let Some(key) = arg_str(0) {
                let db = store.db(*current_db);
                if db.get(&key).is_none() {
                    db.set(
                        key.clone(),
                        crate::store::entry::Entry::new(RedisValue::Set(
                            crate::types::set::RedisSet::new(),
                        )),
                    );
                }
                if let Some(entry) = db.get_mut(&key)
                    && let RedisValue::Set(set) = &mut entry.value
                {
                    for arg in &args[1..] {
                        if let Some(member) = arg.as_str() {
                            set.add(member.to_vec());
                        }
                    }
                }
            }
        }
        "ZADD" => {
            if let Some(key) = arg_str(0) {
                let db = store.db(*current_db);
                if db.get(&key).is_none() {
                    db.set(
                        key.clone(),
                        crate::store::entry::Entry::new(RedisValue::SortedSet(
                            crate::types::sorted_set::RedisSortedSet::new(),
                        )),
                    );
                }
                if let Some(entry) = db.get_mut(&key)
                    && let RedisValue::SortedSet(zset) = &mut entry.value
                {
                    for pair in args[1..].chunks(2) {
                        if let (Some(score_str), Some(member)) = (
                            pair[0].to_string_lossy(),
                            pair.get(1).and_then(|v| v.as_str()),
                        ) && let Ok(score) = score_str.parse::<f64>()
                        {
                            zset.add(member.to_vec(), score);
                        }
                    }
                }
            }
        }
        "XADD" => {
            if let Some(key) = arg_str(0) {
                let db = store.db(*current_db);
                if db.get(&key).is_none() {
                    db.set(
                        key.clone(),
                        crate::store::entry::Entry::new(RedisValue::Stream(
                            crate::types::stream::RedisStream::new(),
                        )),
                    );
                }
                if let Some(entry) = db.get_mut(&key)
                    && let RedisValue::Stream(stream) = &mut entry.value
                    && let Some(id_str) = arg_str(1)
                {
                    let fields: Vec<(Vec<u8>, Vec<u8>)> = args[2..]
                        .chunks(2)
                        .filter_map(|pair| {
                            let field = pair.first()?.as_str()?.to_vec();
                            let value = pair.get(1)?.as_str()?.to_vec();
                            Some((field, value))
                        })
                        .collect();
                    // The journal always carries the id assigned at execution
                    // time (never "*"), so replay reconstructs identical ids.
                    stream.add(Some(&id_str), fields);
                }
            }
        }
        "PEXPIREAT" => {
            if let (Some(key), Some(ts_str)) = (arg_str(0), arg_str(1))
                && let Ok(ts) = ts_str.parse::<u64>()
            {
                store.db(*current_db).set_expiry(&key, ts);
            }
        }
        "EXPIRE" | "EXPIREAT" => {
            if let (Some(key), Some(n_str)) = (arg_str(0), arg_str(1))
                && let Ok(n) = n_str.parse::<u64>()
            {
                let ms = if cmd == "EXPIRE" {
                    crate::store::entry::now_millis() + n * 1000
                } else {
                    n * 1000
                };
                store.db(*current_db).set_expiry(&key, ms);
            }
        }
        "PERSIST" => {
            if let Some(key) = arg_str(0) {
                store.db(*current_db).persist(&key);
            }
        }
        "GETEX" => {
            if let Some(key) = arg_str(0) {
                let db = store.db(*current_db);
                match arg_str(1).map(|s| s.to_uppercase()) {
                    Some(opt) if opt == "PERSIST" => db.persist(&key),
                    Some(opt) if matches!(opt.as_str(), "EX" | "PX" | "EXAT" | "PXAT") => {
                        if let Some(n) = arg_str(2).and_then(|s| s.parse::<i64>().ok()) && n > 0 {
                            let n = n as u64;
                            let ms = match opt.as_str() {
                                "EX" => crate::store::entry::now_millis() + n * 1000,
                                "PX" => crate::store::entry::now_millis() + n,
                                "EXAT" => n * 1000,
                                _ => n,
                            };
                            db.set_expiry(&key, ms);
                        }
                    }
                    _ => {}
                }
            }
        }
        "RENAME" | "RENAMENX" => {
            if let (Some(old), Some(new)) = (arg_str(0), arg_str(1)) {
                store.db(*current_db).rename(&old, &new);
            }
        }
        "LPOP" | "RPOP" => {
            if let Some(key) = arg_str(0) {
                let count = arg_str(1).and_then(|s| s.parse::<usize>().ok()).unwrap_or(1);
                let db = store.db(*current_db);
                if let Some(entry) = db.get_mut(&key)
                    && let RedisValue::List(list) = &mut entry.value
                {
                    for _ in 0..count {
                        let popped = if cmd == "LPOP" { list.lpop() } else { list.rpop() };
                        if popped.is_none() {
                            break;
                        }
                    }
                    cleanup_if_empty(db, &key);
                }
            }
        }
        "LSET" => {
            if let (Some(key), Some(idx_str), Some(val)) = (arg_str(0), arg_str(1), arg_bytes(2))
                && let Ok(idx) = idx_str.parse::<i64>()
                && let Some(entry) = store.db(*current_db).get_mut(&key)
                && let RedisValue::List(list) = &mut entry.value
            {
                list.lset(idx, val);
            }
        }
        "LREM" => {
            if let (Some(key), Some(count_str), Some(val)) = (arg_str(0), arg_str(1), arg_bytes(2))
                && let Ok(count) = count_str.parse::<i64>()
            {
                let db = store.db(*current_db);
                if let Some(entry) = db.get_mut(&key)
                    && let RedisValue::List(list) = &mut entry.value
                {
                    list.lrem(count, &val);
                    cleanup_if_empty(db, &key);
                }
            }
        }
        "LTRIM" => {
            if let (Some(key), Some(start_str), Some(stop_str)) = (arg_str(0), arg_str(1), arg_str(2))
                && let (Ok(start), Ok(stop)) = (start_str.parse::<i64>(), stop_str.parse::<i64>())
            {
                let db = store.db(*current_db);
                if let Some(entry) = db.get_mut(&key)
                    && let RedisValue::List(list) = &mut entry.value
                {
                    list.ltrim(start, stop);
                    cleanup_if_empty(db, &key);
                }
            }
        }
        "LINSERT" => {
            if let (Some(key), Some(where_str), Some(pivot), Some(val)) =
                (arg_str(0), arg_str(1), arg_bytes(2), arg_bytes(3))
                && let Some(entry) = store.db(*current_db).get_mut(&key)
                && let RedisValue::List(list) = &mut entry.value
            {
                if where_str.eq_ignore_ascii_case("BEFORE") {
                    list.linsert_before(&pivot, val);
                } else {
                    list.linsert_after(&pivot, val);
                }
            }
        }
        "RPOPLPUSH" | "LMOVE" => {
            // RPOPLPUSH src dst | LMOVE src dst FROM TO
            let src = arg_str(0);
            let dst = arg_str(1);
            let from_left = if cmd == "LMOVE" {
                arg_str(2).is_some_and(|s| s.eq_ignore_ascii_case("LEFT"))
            } else {
                false
            };
            let to_left = if cmd == "LMOVE" {
                arg_str(3).is_some_and(|s| s.eq_ignore_ascii_case("LEFT"))
            } else {
                // RPOPLPUSH always pushes onto destination's head.
                true
            };
            if let (Some(src), Some(dst)) = (src, dst) {
                let popped = store.db(*current_db).get_mut(&src).and_then(|entry| {
                    if let RedisValue::List(list) = &mut entry.value {
                        if from_left { list.lpop() } else { list.rpop() }
                    } else {
                        None
                    }
                });
                if let Some(value) = popped {
                    let db = store.db(*current_db);
                    if db.get(&dst).is_none() {
                        db.set(
                            dst.clone(),
                            crate::store::entry::Entry::new(RedisValue::List(
                                crate::types::list::RedisList::new(),
                            )),
                        );
                    }
                    if let Some(entry) = db.get_mut(&dst)
                        && let RedisValue::List(list) = &mut entry.value
                    {
                        if to_left {
                            list.lpush(value);
                        } else {
                            list.rpush(value);
                        }
                    }
                    if let Some(entry) = db.get(&src)
                        && let RedisValue::List(list) = &entry.value
                        && list.is_empty()
                    {
                        db.del(&src);
                    }
                }
            }
        }
        "HDEL" => {
            if let Some(key) = arg_str(0) {
                let db = store.db(*current_db);
                if let Some(entry) = db.get_mut(&key)
                    && let RedisValue::Hash(hash) = &mut entry.value
                {
                    for arg in &args[1..] {
                        if let Some(field) = arg.to_string_lossy() {
                            hash.del(&field);
                        }
                    }
                    cleanup_if_empty(db, &key);
                }
            }
        }
        "HSETNX" => {
            if let (Some(key), Some(field), Some(val)) = (arg_str(0), arg_str(1), arg_bytes(2)) {
                let db = store.db(*current_db);
                if db.get(&key).is_none() {
                    db.set(
                        key.clone(),
                        crate::store::entry::Entry::new(RedisValue::Hash(
                            crate::types::hash::RedisHash::new(),
                        )),
                    );
                }
                if let Some(entry) = db.get_mut(&key)
                    && let RedisValue::Hash(hash) = &mut entry.value
                {
                    hash.setnx(field, val);
                }
            }
        }
        "HINCRBY" => {
            if let (Some(key), Some(field), Some(delta_str)) = (arg_str(0), arg_str(1), arg_str(2))
                && let Ok(delta) = delta_str.parse::<i64>()
                && let Some(entry) = store.db(*current_db).get_mut(&key)
                && let RedisValue::Hash(hash) = &mut entry.value
            {
                let _ = hash.incr_by(&field, delta);
            }
        }
        "HINCRBYFLOAT" => {
            if let (Some(key), Some(field), Some(delta_str)) = (arg_str(0), arg_str(1), arg_str(2))
                && let Ok(delta) = delta_str.parse::<f64>()
                && let Some(entry) = store.db(*current_db).get_mut(&key)
                && let RedisValue::Hash(hash) = &mut entry.value
            {
                let _ = hash.incr_by_float(&field, delta);
            }
        }
        "SREM" => {
            if let Some(key) = arg_str(0) {
                let db = store.db(*current_db);
                if let Some(entry) = db.get_mut(&key)
                    && let RedisValue::Set(set) = &mut entry.value
                {
                    for arg in &args[1..] {
                        if let Some(member) = arg.as_str() {
                            set.remove(member);
                        }
                    }
                    cleanup_if_empty(db, &key);
                }
            }
        }
        "SMOVE" => {
            if let (Some(src), Some(dst), Some(member)) = (arg_str(0), arg_str(1), arg_bytes(2)) {
                let removed = store.db(*current_db).get_mut(&src).is_some_and(|entry| {
                    if let RedisValue::Set(set) = &mut entry.value {
                        set.remove(&member)
                    } else {
                        false
                    }
                });
                if removed {
                    let db = store.db(*current_db);
                    if db.get(&dst).is_none() {
                        db.set(
                            dst.clone(),
                            crate::store::entry::Entry::new(RedisValue::Set(
                                crate::types::set::RedisSet::new(),
                            )),
                        );
                    }
                    if let Some(entry) = db.get_mut(&dst)
                        && let RedisValue::Set(set) = &mut entry.value
                    {
                        set.add(member);
                    }
                    cleanup_if_empty(db, &src);
                }
            }
        }
        "ZREM" => {
            if let Some(key) = arg_str(0) {
                let db = store.db(*current_db);
                if let Some(entry) = db.get_mut(&key)
                    && let RedisValue::SortedSet(zset) = &mut entry.value
                {
                    for arg in &args[1..] {
                        if let Some(member) = arg.as_str() {
                            zset.remove(member);
                        }
                    }
                    cleanup_if_empty(db, &key);
                }
            }
        }
        "ZINCRBY" => {
            if let (Some(key), Some(delta_str), Some(member)) = (arg_str(0), arg_str(1), arg_bytes(2))
                && let Ok(delta) = delta_str.parse::<f64>()
            {
                let db = store.db(*current_db);
                if db.get(&key).is_none() {
                    db.set(
                        key.clone(),
                        crate::store::entry::Entry::new(RedisValue::SortedSet(
                            crate::types::sorted_set::RedisSortedSet::new(),
                        )),
                    );
                }
                if let Some(entry) = db.get_mut(&key)
                    && let RedisValue::SortedSet(zset) = &mut entry.value
                {
                    zset.incr_by(member, delta);
                }
            }
        }
        "ZPOPMIN" | "ZPOPMAX" => {
            if let Some(key) = arg_str(0) {
                let count = arg_str(1).and_then(|s| s.parse::<usize>().ok()).unwrap_or(1);
                let db = store.db(*current_db);
                if let Some(entry) = db.get_mut(&key)
                    && let RedisValue::SortedSet(zset) = &mut entry.value
                {
                    for _ in 0..count {
                        let popped = if cmd == "ZPOPMIN" { zset.pop_min() } else { zset.pop_max() };
                        if popped.is_none() {
                            break;
                        }
                    }
                    cleanup_if_empty(db, &key);
                }
            }
        }
        "ZREMRANGEBYSCORE" => {
            if let (Some(key), Some(min_str), Some(max_str)) = (arg_str(0), arg_str(1), arg_str(2))
                && let (Ok(min), Ok(max)) = (min_str.parse::<f64>(), max_str.parse::<f64>())
            {
                let db = store.db(*current_db);
                if let Some(entry) = db.get_mut(&key)
                    && let RedisValue::SortedSet(zset) = &mut entry.value
                {
                    let to_remove: Vec<Vec<u8>> = zset
                        .range_by_score(min, max)
                        .into_iter()
                        .map(|(m, _)| m.to_vec())
                        .collect();
                    for member in to_remove {
                        zset.remove(&member);
                    }
                    cleanup_if_empty(db, &key);
                }
            }
        }
        "ZREMRANGEBYRANK" => {
            if let (Some(key), Some(start_str), Some(stop_str)) = (arg_str(0), arg_str(1), arg_str(2))
                && let (Ok(start), Ok(stop)) = (start_str.parse::<i64>(), stop_str.parse::<i64>())
            {
                let db = store.db(*current_db);
                if let Some(entry) = db.get_mut(&key)
                    && let RedisValue::SortedSet(zset) = &mut entry.value
                {
                    let to_remove: Vec<Vec<u8>> = zset
                        .range(start, stop)
                        .into_iter()
                        .map(|(m, _)| m.to_vec())
                        .collect();
                    for member in to_remove {
                        zset.remove(&member);
                    }
                    cleanup_if_empty(db, &key);
                }
            }
        }
        "XDEL" => {
            if let Some(key) = arg_str(0)
                && let Some(entry) = store.db(*current_db).get_mut(&key)
                && let RedisValue::Stream(stream) = &mut entry.value
            {
                let ids: Vec<_> = args[1..]
                    .iter()
                    .filter_map(|a| a.to_string_lossy())
                    .filter_map(|s| crate::types::stream::StreamEntryId::parse(&s))
                    .collect();
                stream.xdel(&ids);
            }
        }
        "XTRIM" => {
            // XTRIM key MAXLEN [~|=] count
            if !args.is_empty()
                && let Some(key) = arg_str(0)
                && let Some(count_str) = arg_str(args.len() - 1)
                && let Ok(maxlen) = count_str.parse::<usize>()
                && let Some(entry) = store.db(*current_db).get_mut(&key)
                && let RedisValue::Stream(stream) = &mut entry.value
            {
                stream.trim_maxlen(maxlen);
            }
        }
        "APPEND" => {
            if let (Some(key), Some(val)) = (arg_str(0), arg_bytes(1)) {
                let db = store.db(*current_db);
                if db.get(&key).is_none() {
                    db.set(
                        key.clone(),
                        crate::store::entry::Entry::new(RedisValue::String(
                            crate::types::rstring::RedisString::new(Vec::new()),
                        )),
                    );
                }
                if let Some(entry) = db.get_mut(&key)
                    && let RedisValue::String(s) = &mut entry.value
                {
                    s.append(&val);
                }
            }
        }
        "SETNX" | "SETEX" | "PSETEX" => {
            let (key, val) = match cmd {
                "SETNX" => (arg_str(0), arg_bytes(1)),
                _ => (arg_str(0), arg_bytes(2)),
            };
            if let (Some(key), Some(val)) = (key, val) {
                let db = store.db(*current_db);
                db.set(
                    key.clone(),
                    crate::store::entry::Entry::new(RedisValue::String(
                        crate::types::rstring::RedisString::new(val),
                    )),
                );
                if cmd != "SETNX"
                    && let Some(secs_str) = arg_str(1)
                    && let Ok(secs) = secs_str.parse::<u64>()
                {
                    let factor = if cmd == "SETEX" { 1000 } else { 1 };
                    db.set_expiry(&key, crate::store::entry::now_millis() + secs * factor);
                }
            }
        }
        "MSET" | "MSETNX" => {
            for pair in args.chunks(2) {
                if let (Some(key), Some(val)) = (
                    pair.first().and_then(|a| a.to_string_lossy()),
                    pair.get(1).and_then(|a| a.as_str()),
                ) {
                    store.db(*current_db).set(
                        key,
                        crate::store::entry::Entry::new(RedisValue::String(
                            crate::types::rstring::RedisString::new(val.to_vec()),
                        )),
                    );
                }
            }
        }
        "GETSET" | "GETDEL" => {
            if let Some(key) = arg_str(0) {
                let db = store.db(*current_db);
                if cmd == "GETDEL" {
                    db.del(&key);
                } else if let Some(val) = arg_bytes(1) {
                    db.set(
                        key,
                        crate::store::entry::Entry::new(RedisValue::String(
                            crate::types::rstring::RedisString::new(val),
                        )),
                    );
                }
            }
        }
        "SETRANGE" => {
            if let (Some(key), Some(offset_str), Some(val)) = (arg_str(0), arg_str(1), arg_bytes(2))
                && let Ok(offset) = offset_str.parse::<usize>()
            {
                let db = store.db(*current_db);
                if db.get(&key).is_none() {
                    db.set(
                        key.clone(),
                        crate::store::entry::Entry::new(RedisValue::String(
                            crate::types::rstring::RedisString::new(Vec::new()),
                        )),
                    );
                }
                if let Some(entry) = db.get_mut(&key)
                    && let RedisValue::String(s) = &mut entry.value
                {
                    let _ = s.setrange(offset, &val);
                }
            }
        }
        "INCR" | "DECR" | "INCRBY" | "DECRBY" | "INCRBYFLOAT" => {
            if let Some(key) = arg_str(0) {
                let db = store.db(*current_db);
                if db.get(&key).is_none() {
                    db.set(
                        key.clone(),
                        crate::store::entry::Entry::new(RedisValue::String(
                            crate::types::rstring::RedisString::new(b"0".to_vec()),
                        )),
                    );
                }
                if let Some(entry) = db.get_mut(&key)
                    && let RedisValue::String(s) = &mut entry.value
                {
                    match cmd {
                        "INCR" => {
                            let _ = s.incr_by(1);
                        }
                        "DECR" => {
                            let _ = s.incr_by(-1);
                        }
                        "INCRBY" => {
                            if let Some(n) = arg_str(1).and_then(|v| v.parse::<i64>().ok()) {
                                let _ = s.incr_by(n);
                            }
                        }
                        "DECRBY" => {
                            if let Some(n) = arg_str(1).and_then(|v| v.parse::<i64>().ok()) {
                                let _ = s.incr_by(-n);
                            }
                        }
                        "INCRBYFLOAT" => {
                            if let Some(n) = arg_str(1).and_then(|v| v.parse::<f64>().ok()) {
                                let _ = s.incr_by_float(n);
                            }
                        }
                        _ => unreachable!(),
                    }
                }
            }
        }
        "FLUSHDB" => {
            store.db(*current_db).flush();
        }
        "FLUSHALL" => {
            store.flush_all();
        }
        "SWAPDB" => {
            if let (Some(a_str), Some(b_str)) = (arg_str(0), arg_str(1))
                && let (Ok(a), Ok(b)) = (a_str.parse::<usize>(), b_str.parse::<usize>())
            {
                store.swap_db(a, b);
            }
        }
        // Not replayed:
        // - SPOP journals its original `key [count]` args, not the members
        //   it actually removed, so replaying it can't pick the same
        //   member(s) as the live run. Documented as an accepted
        //   nondeterminism gap rather than replayed incorrectly.
        // - MOVE/COPY/RESTORE need cross-db or serialized-object handling
        //   this dispatch-free interpreter doesn't have.
        // - EVAL/EVALSHA effects would require re-running the Lua VM with
        //   no client context.
        // - BLPOP/BRPOP/BLMOVE/BLMPOP/BZPOPMIN/BZPOPMAX/BZMPOP journal the
        //   blocking form verbatim (key list + timeout), which doesn't say
        //   which key was actually served; a real rewrite-to-equivalent
        //   before journaling (as Redis does) would fix this.
        // - LMPOP/ZMPOP and the *STORE set/zset combinators (SUNIONSTORE,
        //   SINTERSTORE, SDIFFSTORE, ZUNIONSTORE, ZINTERSTORE, ZDIFFSTORE)
        //   and the consumer-group commands (XGROUP, XACK, XCLAIM,
        //   XAUTOCLAIM) aren't reconstructed from their journaled args.
        // A server relying on these for durability should prefer the RDB
        // snapshot path or a manual BGREWRITEAOF after they run.
        _ => {} // Skip unknown/unreplayed commands during replay
    }
}

/// Read a single RESP value from a buffered reader.
fn read_resp_value(reader: &mut io::BufReader<std::fs::File>) -> io::Result<Option<RespValue>> {
    let mut line = String::new();
    let n = reader.read_line(&mut line)?;
    if n == 0 {
        return Ok(None);
    }
    let line = line.trim_end_matches("\r\n").trim_end_matches('\n');

    if line.is_empty() {
        return Ok(None);
    }

    let first = line.as_bytes()[0];
    let rest = &line[1..];

    match first {
        b'+' => Ok(Some(RespValue::SimpleString(rest.to_string()))),
        b'-' => Ok(Some(RespValue::Error(rest.to_string()))),
        b':' => {
            let n: i64 = rest
                .parse()
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "Bad integer"))?;
            Ok(Some(RespValue::Integer(n)))
        }
        b'$' => {
            let len: i64 = rest
                .parse()
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "Bad bulk len"))?;
            if len == -1 {
                return Ok(Some(RespValue::null_bulk_string()));
            }
            let len = len as usize;
            let mut buf = vec![0u8; len + 2]; // +2 for \r\n
            reader.read_exact(&mut buf)?;
            buf.truncate(len);
            Ok(Some(RespValue::BulkString(Some(buf))))
        }
        b'*' => {
            let count: i64 = rest
                .parse()
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "Bad array len"))?;
            if count == -1 {
                return Ok(Some(RespValue::null_array()));
            }
            let count = count as usize;
            let mut items = Vec::with_capacity(count);
            for _ in 0..count {
                match read_resp_value(reader)? {
                    Some(v) => items.push(v),
                    None => {
                        return Err(io::Error::new(
                            io::ErrorKind::UnexpectedEof,
                            "Truncated array",
                        ));
                    }
                }
            }
            Ok(Some(RespValue::Array(Some(items))))
        }
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Unknown RESP byte: {first}"),
        )),
    }
}

pub type SharedAofWriter = Arc<Mutex<AofWriter>>;
