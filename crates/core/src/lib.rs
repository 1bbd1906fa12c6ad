pub mod cell_address;
pub mod command;
pub mod config;
pub mod edit_tracker;
pub mod executor;
pub mod export;
pub mod layout_engine;
pub mod result_model;
pub mod schema_lookup;
pub mod sort_filter;
pub mod value_codec;
