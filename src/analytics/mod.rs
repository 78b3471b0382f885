//! Analytics module - cross-exchange spread monitoring
//!
//! Exchange pairing, rolling spread statistics and the query service that
//! turns store contents into the `/api/data` report.

pub mod pairing;
pub mod query;
pub mod spread;

pub use pairing::PairSelector;
pub use query::{QueryError, QueryService, SpreadRecord, SpreadReport, WindowSpec};
pub use spread::{Baseline, RollingStats, SpreadStats};
