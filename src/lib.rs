// src/lib.rs
//! Sports equipment dashboard: Microsoft sign-in, a OneDrive workbook fetched
//! through Microsoft Graph, and a filterable, paginated, exportable table.

pub mod app;
pub mod config;
pub mod data_types;
pub mod errors;
pub mod excel_date;
pub mod export;
pub mod fetcher;
pub mod graph_client;
pub mod identity;
pub mod session_gate;
pub mod session_store;
pub mod sheet_transform;
pub mod ui;

pub use data_types::{Query, ResultPage, TransformedRecord, User};
pub use errors::{AppError, AuthError, FetchError};
