pub mod api;
pub mod auth;
pub mod automl;
pub mod poller;
pub mod resource_manager;
pub mod runner;
pub mod state_store;
pub mod storage;
pub mod table;
pub mod wizard;
