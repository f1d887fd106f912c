pub mod migration;
pub mod storage;
pub mod types;
pub mod versions;


pub use migration::*;
pub use storage::*;
pub use types::*;
pub use versions::*;
