pub mod alerts;
pub mod data_table;
