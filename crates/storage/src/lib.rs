pub mod error;
pub mod export;
pub mod listing;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use error::StorageError;
pub use listing::DirectoryListing;
pub use sqlite::SqlitePlanStore;
pub use traits::*;
