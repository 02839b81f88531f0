use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub databases: usize,
    pub requirepass: Option<String>,
    pub timeout: u64,
    pub tcp_keepalive: u64,
    pub hz: u64,
    pub loglevel: String,
    // Process
    pub daemonize: bool,
    pub pidfile: String,
    pub logfile: String,
    // Persistence
    pub dbfilename: String,
    pub dir: String,
    pub stop_writes_on_bgsave_error: bool,
    pub rdbcompression: bool,
    pub rdbchecksum: bool,
    pub appendonly: bool,
    pub appendfilename: String,
    pub appendfsync: String,
    pub no_appendfsync_on_rewrite: bool,
    pub auto_aof_rewrite_percentage: u64,
    pub auto_aof_rewrite_min_size: u64,
    pub save_rules: Vec<(u64, u64)>,
    // Limits & eviction
    pub maxclients: usize,
    pub maxmemory: u64,
    pub maxmemory_policy: String,
    pub maxmemory_samples: usize,
    // Observability
    pub slowlog_log_slower_than: i64,
    pub slowlog_max_len: usize,
    // Encoding thresholds
    pub list_max_listpack_size: i64,
    pub hash_max_listpack_entries: u64,
    pub hash_max_listpack_value: u64,
    pub set_max_intset_entries: u64,
    pub set_max_listpack_entries: u64,
    pub set_max_listpack_value: u64,
    pub list_compress_depth: i64,
    pub zset_max_listpack_entries: u64,
    pub zset_max_listpack_value: u64,
    // Debug flags
    pub active_expire_enabled: bool,
    // Replication
    pub replicaof: Option<(String, u16)>,
    pub replica_read_only: bool,
    pub repl_backlog_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind: "127.0.0.1".to_string(),
            port: 6379,
            databases: 16,
            requirepass: None,
            timeout: 0,
            tcp_keepalive: 300,
            hz: 10,
            loglevel: "notice".to_string(),
            daemonize: false,
            pidfile: "/var/run/cedis.pid".to_string(),
            logfile: String::new(),
            dbfilename: "dump.rdb".to_string(),
            dir: ".".to_string(),
            stop_writes_on_bgsave_error: true,
            rdbcompression: true,
            rdbchecksum: true,
            appendonly: false,
            appendfilename: "appendonly.aof".to_string(),
            appendfsync: "everysec".to_string(),
            no_appendfsync_on_rewrite: false,
            auto_aof_rewrite_percentage: 100,
            auto_aof_rewrite_min_size: 64 * 1024 * 1024,
            save_rules: vec![(900, 1), (300, 10), (60, 10000)],
            maxclients: 10_000,
            maxmemory: 0,
            maxmemory_policy: "noeviction".to_string(),
            maxmemory_samples: 5,
            slowlog_log_slower_than: 10_000,
            slowlog_max_len: 128,
            list_max_listpack_size: -2,
            hash_max_listpack_entries: 128,
            hash_max_listpack_value: 64,
            set_max_intset_entries: 512,
            set_max_listpack_entries: 128,
            set_max_listpack_value: 64,
            list_compress_depth: 0,
            zset_max_listpack_entries: 128,
            zset_max_listpack_value: 64,
            active_expire_enabled: true,
            replicaof: None,
            replica_read_only: true,
            repl_backlog_size: 1_048_576, // 1MB
        }
    }
}

/// Parse a Redis-style memory size with an optional kb/mb/gb/k/m/g suffix.
fn parse_memory_size(s: &str) -> Option<u64> {
    let s = s.trim();
    let lower = s.to_lowercase();
    let (digits, multiplier) = if let Some(n) = lower.strip_suffix("kb") {
        (n, 1024u64)
    } else if let Some(n) = lower.strip_suffix("mb") {
        (n, 1024 * 1024)
    } else if let Some(n) = lower.strip_suffix("gb") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = lower.strip_suffix('k') {
        (n, 1000)
    } else if let Some(n) = lower.strip_suffix('m') {
        (n, 1_000_000)
    } else if let Some(n) = lower.strip_suffix('g') {
        (n, 1_000_000_000)
    } else {
        (lower.as_str(), 1)
    };
    digits.trim().parse::<u64>().ok().map(|n| n * multiplier)
}

impl Config {
    /// Load directives from a `redis.conf`-style config file: one
    /// `directive value...` pair per line, `#` starts a comment.
    pub fn from_file(path: &str) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Config::default();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.splitn(2, char::is_whitespace);
            let directive = parts.next().unwrap_or("");
            let rest = parts.next().unwrap_or("").trim();
            let value = rest.trim_matches('"');
            let _ = config.apply_directive(directive, value);
        }
        Ok(config)
    }

    fn apply_directive(&mut self, directive: &str, value: &str) -> Result<(), String> {
        match directive.to_lowercase().as_str() {
            "port" => {
                self.port = value.parse().map_err(|_| "invalid port".to_string())?;
            }
            "bind" => self.bind = value.split_whitespace().next().unwrap_or("127.0.0.1").to_string(),
            "requirepass" => {
                self.requirepass = if value.is_empty() { None } else { Some(value.to_string()) };
            }
            "databases" => {
                self.databases = value.parse().map_err(|_| "invalid databases".to_string())?;
            }
            "dir" => self.dir = value.to_string(),
            "dbfilename" => self.dbfilename = value.to_string(),
            "daemonize" => self.daemonize = value.eq_ignore_ascii_case("yes"),
            "pidfile" => self.pidfile = value.to_string(),
            "logfile" => self.logfile = value.to_string(),
            "stop-writes-on-bgsave-error" => {
                self.stop_writes_on_bgsave_error = value.eq_ignore_ascii_case("yes")
            }
            "rdbcompression" => self.rdbcompression = value.eq_ignore_ascii_case("yes"),
            "rdbchecksum" => self.rdbchecksum = value.eq_ignore_ascii_case("yes"),
            "appendonly" => self.appendonly = value.eq_ignore_ascii_case("yes"),
            "appendfilename" => self.appendfilename = value.to_string(),
            "appendfsync" => self.appendfsync = value.to_string(),
            "no-appendfsync-on-rewrite" => {
                self.no_appendfsync_on_rewrite = value.eq_ignore_ascii_case("yes")
            }
            "auto-aof-rewrite-percentage" => {
                self.auto_aof_rewrite_percentage =
                    value.parse().map_err(|_| "invalid auto-aof-rewrite-percentage".to_string())?;
            }
            "auto-aof-rewrite-min-size" => {
                self.auto_aof_rewrite_min_size =
                    parse_memory_size(value).ok_or("invalid auto-aof-rewrite-min-size")?;
            }
            "maxclients" => {
                self.maxclients = value.parse().map_err(|_| "invalid maxclients".to_string())?;
            }
            "slowlog-log-slower-than" => {
                self.slowlog_log_slower_than =
                    value.parse().map_err(|_| "invalid slowlog-log-slower-than".to_string())?;
            }
            "slowlog-max-len" => {
                self.slowlog_max_len =
                    value.parse().map_err(|_| "invalid slowlog-max-len".to_string())?;
            }
            "timeout" => {
                self.timeout = value.parse().map_err(|_| "invalid timeout".to_string())?;
            }
            "tcp-keepalive" => {
                self.tcp_keepalive = value.parse().map_err(|_| "invalid tcp-keepalive".to_string())?;
            }
            "hz" => {
                self.hz = value.parse().map_err(|_| "invalid hz".to_string())?;
            }
            "loglevel" => self.loglevel = value.to_string(),
            "maxmemory" => {
                self.maxmemory = parse_memory_size(value).ok_or("invalid maxmemory")?;
            }
            "maxmemory-policy" => self.maxmemory_policy = value.to_string(),
            "maxmemory-samples" => {
                self.maxmemory_samples =
                    value.parse().map_err(|_| "invalid maxmemory-samples".to_string())?;
            }
            "save" => {
                let nums: Vec<u64> = value
                    .split_whitespace()
                    .filter_map(|n| n.parse().ok())
                    .collect();
                self.save_rules = nums.chunks(2).filter(|c| c.len() == 2).map(|c| (c[0], c[1])).collect();
            }
            "replicaof" | "slaveof" => {
                let mut it = value.split_whitespace();
                if let (Some(host), Some(port)) = (it.next(), it.next()) {
                    if host.eq_ignore_ascii_case("no") && port.eq_ignore_ascii_case("one") {
                        self.replicaof = None;
                    } else if let Ok(p) = port.parse() {
                        self.replicaof = Some((host.to_string(), p));
                    }
                }
            }
            "repl-backlog-size" => {
                self.repl_backlog_size = parse_memory_size(value)
                    .ok_or("invalid repl-backlog-size")?
                    as usize;
            }
            _ => return self.set(directive, value),
        }
        Ok(())
    }

    pub fn from_args(args: &[String]) -> Self {
        // A bare leading path (no `--`/`-` prefix) is a config file, per
        // `redis-server /path/to/redis.conf [options...]`.
        let (mut config, rest): (Config, &[String]) = if let Some(first) = args.first() {
            if !first.starts_with('-') {
                match Config::from_file(first) {
                    Ok(cfg) => (cfg, &args[1..]),
                    Err(_) => (Config::default(), args),
                }
            } else {
                (Config::default(), args)
            }
        } else {
            (Config::default(), args)
        };
        let args = rest;
        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--port" | "-p" => {
                    if i + 1 < args.len() {
                        if let Ok(p) = args[i + 1].parse() {
                            config.port = p;
                        }
                        i += 1;
                    }
                }
                "-c" => {
                    // -c <path>: load a config file mid-argv and merge its directives.
                    if i + 1 < args.len() {
                        if let Ok(loaded) = Config::from_file(&args[i + 1]) {
                            config = loaded;
                        }
                        i += 1;
                    }
                }
                "--bind" => {
                    if i + 1 < args.len() {
                        config.bind = args[i + 1].clone();
                        i += 1;
                    }
                }
                "--requirepass" => {
                    if i + 1 < args.len() {
                        config.requirepass = Some(args[i + 1].clone());
                        i += 1;
                    }
                }
                "--dbfilename" => {
                    if i + 1 < args.len() {
                        config.dbfilename = args[i + 1].clone();
                        i += 1;
                    }
                }
                "--dir" | "-d" => {
                    if i + 1 < args.len() {
                        config.dir = args[i + 1].clone();
                        i += 1;
                    }
                }
                "--maxmemory" => {
                    if i + 1 < args.len() {
                        if let Some(m) = parse_memory_size(&args[i + 1]) {
                            config.maxmemory = m;
                        }
                        i += 1;
                    }
                }
                "--maxmemory-policy" => {
                    if i + 1 < args.len() {
                        config.maxmemory_policy = args[i + 1].clone();
                        i += 1;
                    }
                }
                "--maxmemory-samples" => {
                    if i + 1 < args.len() {
                        if let Ok(s) = args[i + 1].parse() {
                            config.maxmemory_samples = s;
                        }
                        i += 1;
                    }
                }
                "--appendonly" => {
                    if i + 1 < args.len() {
                        config.appendonly = args[i + 1] == "yes";
                        i += 1;
                    }
                }
                "--appendfilename" => {
                    if i + 1 < args.len() {
                        config.appendfilename = args[i + 1].clone();
                        i += 1;
                    }
                }
                "--maxclients" => {
                    if i + 1 < args.len() {
                        if let Ok(m) = args[i + 1].parse() {
                            config.maxclients = m;
                        }
                        i += 1;
                    }
                }
                "--daemonize" => {
                    if i + 1 < args.len() {
                        config.daemonize = args[i + 1] == "yes";
                        i += 1;
                    }
                }
                "--databases" => {
                    if i + 1 < args.len() {
                        if let Ok(d) = args[i + 1].parse() {
                            config.databases = d;
                        }
                        i += 1;
                    }
                }
                "--timeout" => {
                    if i + 1 < args.len() {
                        if let Ok(t) = args[i + 1].parse() {
                            config.timeout = t;
                        }
                        i += 1;
                    }
                }
                "--loglevel" => {
                    if i + 1 < args.len() {
                        config.loglevel = args[i + 1].clone();
                        i += 1;
                    }
                }
                "--hz" => {
                    if i + 1 < args.len() {
                        if let Ok(h) = args[i + 1].parse() {
                            config.hz = h;
                        }
                        i += 1;
                    }
                }
                "--replicaof" | "--slaveof" => {
                    if i + 2 < args.len() {
                        let host = args[i + 1].clone();
                        if let Ok(port) = args[i + 2].parse::<u16>() {
                            if host.eq_ignore_ascii_case("no")
                                && args[i + 2].eq_ignore_ascii_case("one")
                            {
                                config.replicaof = None;
                            } else {
                                config.replicaof = Some((host, port));
                            }
                        }
                        i += 2;
                    }
                }
                "--repl-backlog-size" => {
                    if i + 1 < args.len() {
                        if let Ok(s) = args[i + 1].parse() {
                            config.repl_backlog_size = s;
                        }
                        i += 1;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        config
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key.to_lowercase().as_str() {
            "bind" => Some(self.bind.clone()),
            "port" => Some(self.port.to_string()),
            "databases" => Some(self.databases.to_string()),
            "requirepass" => self.requirepass.clone().or(Some(String::new())),
            "timeout" => Some(self.timeout.to_string()),
            "tcp-keepalive" => Some(self.tcp_keepalive.to_string()),
            "hz" => Some(self.hz.to_string()),
            "loglevel" => Some(self.loglevel.clone()),
            "dbfilename" => Some(self.dbfilename.clone()),
            "dir" => Some(self.dir.clone()),
            "daemonize" => Some(if self.daemonize { "yes" } else { "no" }.to_string()),
            "pidfile" => Some(self.pidfile.clone()),
            "logfile" => Some(self.logfile.clone()),
            "stop-writes-on-bgsave-error" => {
                Some(if self.stop_writes_on_bgsave_error { "yes" } else { "no" }.to_string())
            }
            "rdbcompression" => Some(if self.rdbcompression { "yes" } else { "no" }.to_string()),
            "rdbchecksum" => Some(if self.rdbchecksum { "yes" } else { "no" }.to_string()),
            "appendonly" => Some(if self.appendonly { "yes" } else { "no" }.to_string()),
            "appendfilename" => Some(self.appendfilename.clone()),
            "appendfsync" => Some(self.appendfsync.clone()),
            "no-appendfsync-on-rewrite" => {
                Some(if self.no_appendfsync_on_rewrite { "yes" } else { "no" }.to_string())
            }
            "auto-aof-rewrite-percentage" => Some(self.auto_aof_rewrite_percentage.to_string()),
            "auto-aof-rewrite-min-size" => Some(self.auto_aof_rewrite_min_size.to_string()),
            "maxclients" => Some(self.maxclients.to_string()),
            "maxmemory" => Some(self.maxmemory.to_string()),
            "maxmemory-policy" => Some(self.maxmemory_policy.clone()),
            "maxmemory-samples" => Some(self.maxmemory_samples.to_string()),
            "slowlog-log-slower-than" => Some(self.slowlog_log_slower_than.to_string()),
            "slowlog-max-len" => Some(self.slowlog_max_len.to_string()),
            "list-max-ziplist-size" | "list-max-listpack-size" => {
                Some(self.list_max_listpack_size.to_string())
            }
            "hash-max-ziplist-entries" | "hash-max-listpack-entries" => {
                Some(self.hash_max_listpack_entries.to_string())
            }
            "hash-max-ziplist-value" | "hash-max-listpack-value" => {
                Some(self.hash_max_listpack_value.to_string())
            }
            "set-max-intset-entries" => Some(self.set_max_intset_entries.to_string()),
            "set-max-listpack-entries" => Some(self.set_max_listpack_entries.to_string()),
            "set-max-listpack-value" => Some(self.set_max_listpack_value.to_string()),
            "list-compress-depth" => Some(self.list_compress_depth.to_string()),
            "zset-max-ziplist-entries" | "zset-max-listpack-entries" => {
                Some(self.zset_max_listpack_entries.to_string())
            }
            "zset-max-ziplist-value" | "zset-max-listpack-value" => {
                Some(self.zset_max_listpack_value.to_string())
            }
            "save" => {
                let s: Vec<String> = self
                    .save_rules
                    .iter()
                    .map(|(secs, changes)| format!("{secs} {changes}"))
                    .collect();
                Some(s.join(" "))
            }
            "repl-backlog-size" => Some(self.repl_backlog_size.to_string()),
            "replica-read-only" | "slave-read-only" => {
                Some(if self.replica_read_only { "yes" } else { "no" }.to_string())
            }
            _ => None,
        }
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key.to_lowercase().as_str() {
            "hz" => {
                self.hz = value.parse().map_err(|_| "Invalid hz value".to_string())?;
                Ok(())
            }
            "timeout" => {
                self.timeout = value
                    .parse()
                    .map_err(|_| "Invalid timeout value".to_string())?;
                Ok(())
            }
            "loglevel" => {
                self.loglevel = value.to_string();
                Ok(())
            }
            "maxmemory" => {
                self.maxmemory =
                    parse_memory_size(value).ok_or_else(|| "Invalid maxmemory value".to_string())?;
                Ok(())
            }
            "maxmemory-policy" => {
                self.maxmemory_policy = value.to_string();
                Ok(())
            }
            "maxmemory-samples" => {
                self.maxmemory_samples = value
                    .parse()
                    .map_err(|_| "Invalid maxmemory-samples value".to_string())?;
                Ok(())
            }
            "appendonly" => {
                self.appendonly = value == "yes";
                Ok(())
            }
            "appendfsync" => {
                self.appendfsync = value.to_string();
                Ok(())
            }
            "maxclients" => {
                self.maxclients = value.parse().map_err(|_| "Invalid maxclients value".to_string())?;
                Ok(())
            }
            "slowlog-log-slower-than" => {
                self.slowlog_log_slower_than =
                    value.parse().map_err(|_| "Invalid slowlog-log-slower-than value".to_string())?;
                Ok(())
            }
            "slowlog-max-len" => {
                self.slowlog_max_len =
                    value.parse().map_err(|_| "Invalid slowlog-max-len value".to_string())?;
                Ok(())
            }
            "stop-writes-on-bgsave-error" => {
                self.stop_writes_on_bgsave_error = value == "yes";
                Ok(())
            }
            "requirepass" => {
                self.requirepass = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
                Ok(())
            }
            "list-max-ziplist-size" | "list-max-listpack-size" => {
                self.list_max_listpack_size =
                    value.parse().map_err(|_| "Invalid value".to_string())?;
                Ok(())
            }
            "hash-max-ziplist-entries" | "hash-max-listpack-entries" => {
                self.hash_max_listpack_entries =
                    value.parse().map_err(|_| "Invalid value".to_string())?;
                Ok(())
            }
            "hash-max-ziplist-value" | "hash-max-listpack-value" => {
                self.hash_max_listpack_value =
                    value.parse().map_err(|_| "Invalid value".to_string())?;
                Ok(())
            }
            "set-max-intset-entries" => {
                self.set_max_intset_entries =
                    value.parse().map_err(|_| "Invalid value".to_string())?;
                Ok(())
            }
            "set-max-listpack-entries" => {
                self.set_max_listpack_entries =
                    value.parse().map_err(|_| "Invalid value".to_string())?;
                Ok(())
            }
            "set-max-listpack-value" => {
                self.set_max_listpack_value =
                    value.parse().map_err(|_| "Invalid value".to_string())?;
                Ok(())
            }
            "list-compress-depth" => {
                self.list_compress_depth =
                    value.parse().map_err(|_| "Invalid value".to_string())?;
                Ok(())
            }
            "zset-max-ziplist-entries" | "zset-max-listpack-entries" => {
                self.zset_max_listpack_entries =
                    value.parse().map_err(|_| "Invalid value".to_string())?;
                Ok(())
            }
            "zset-max-ziplist-value" | "zset-max-listpack-value" => {
                self.zset_max_listpack_value =
                    value.parse().map_err(|_| "Invalid value".to_string())?;
                Ok(())
            }
            _ => {
                // Accept unknown parameters silently for compatibility
                Ok(())
            }
        }
    }
}

pub type SharedConfig = Arc<RwLock<Config>>;
