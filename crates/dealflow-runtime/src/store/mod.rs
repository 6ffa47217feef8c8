//! Durable record storage backends.

mod postgres;

pub use postgres::PgRecordStore;
