pub mod postgres;
pub mod snowflake;
