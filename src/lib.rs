// Library for tests to access modules

pub mod actions;
pub mod apps;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod probe;
pub mod rate;
pub mod store;
pub mod version;
pub mod worker;
