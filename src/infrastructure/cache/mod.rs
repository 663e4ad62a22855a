//! Shared lock store backends

mod redis_lock;

pub use redis_lock::RedisLockStore;
