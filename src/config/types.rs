//! Default values shared by the configuration layer

pub use crate::analytics::pairing::{DEFAULT_PRIMARY, DEFAULT_SECONDARY};
pub use crate::analytics::query::{DEFAULT_WINDOW, MAX_WINDOW};
pub use crate::feed::sources::DEFAULT_UPSTREAM_URL;
pub use crate::store::{DEFAULT_FUNDING_CAPACITY, DEFAULT_PRICE_CAPACITY};
