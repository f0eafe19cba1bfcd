pub mod cache;
pub mod config;
pub mod datagen;
pub mod debug;
pub mod error;
pub mod format;
pub mod http;
pub mod pathfinder;
pub mod scenario;
pub mod schema;
pub mod serializer;
pub mod template;
pub mod types;

pub use cache::{Cache, Cached, ConcurrentCache, LocalCache};
pub use config::Settings;
pub use error::{ApiStepsError, Result};
pub use format::DataFormat;
pub use pathfinder::{PathExpr, PathFinder};
pub use scenario::{ApiContext, ApiContextBuilder, LAST_RESPONSE_KEY};
pub use types::{Node, TypeTag};
