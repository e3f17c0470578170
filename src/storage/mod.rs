pub mod dataset_store;

pub use dataset_store::{write_atomic, DatasetStore};
