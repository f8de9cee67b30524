pub mod alerts;
pub mod recipients;
pub mod sensors;
