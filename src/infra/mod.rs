pub mod cache;
pub mod dvr;
pub mod mail;
pub mod sheets;
pub mod tvmaze;
