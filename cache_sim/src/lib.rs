pub mod addr;
pub mod cache;
pub mod common;
pub mod config;
pub mod hierarchy;
pub mod level;
pub mod sim;
pub mod trace;

cfg_if::cfg_if! {
    if #[cfg(feature = "stat")] {
        pub mod stat;
    }
}

pub use common::{Operation, Outcome};
pub use config::{CacheConfig, ConfigError};
pub use hierarchy::CacheHierarchy;
