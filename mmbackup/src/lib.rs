pub mod api;
pub mod archive;
pub mod cache;
pub mod cli;
pub mod crawler;
pub mod credentials;
pub mod models;
pub mod services;
pub mod settings;
