mod auth;
mod redis_store;
mod store;

pub use auth::AuthService;
pub use redis_store::RedisStore;
pub use store::{MemoryStore, Reserve, Restocked, Store, StoreError, StoreResult};
