pub mod export;
pub mod mysql;
