pub mod ip_extraction;
pub mod query;
pub mod upload;
