pub mod analytics;
pub mod market;
pub mod query;
pub mod response;

pub use analytics::*;
pub use market::*;
pub use query::*;
pub use response::*;
