pub mod record;
pub mod topic;

pub use record::{CategoryStats, DatasetSnapshot, QaRecord};
pub use topic::Topic;
