pub mod api_types;
pub mod config;
pub mod pipeline;
pub mod providers;
pub mod router;
pub mod state;
