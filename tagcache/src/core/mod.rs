pub mod codec;
pub mod error;
pub mod service;
pub mod value;

pub use error::CacheError;
pub use service::RegionCache;
pub use value::{CacheValue, IntoCacheValue, WireValue};
