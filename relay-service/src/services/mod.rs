pub mod metrics;
pub mod origin;
pub mod providers;

pub use origin::{OriginCheck, OriginPolicy};
pub use providers::TextProvider;
