pub mod databricks;
pub mod local;
pub mod warehouse;
