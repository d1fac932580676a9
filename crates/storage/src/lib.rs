pub mod json_bank;
pub mod repository;
pub mod sample;
pub mod sqlite;
