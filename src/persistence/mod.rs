//! Durability layer: binary snapshots and the append-only command journal.
//! Both publish atomically via a `*.tmp` + rename.

pub mod aof;
pub mod crc64;
pub mod rdb;
