//! REST surface for the privacy core: request intake, admin processing,
//! export download, deletion-job control, and access checks.

pub mod rest;
pub mod server;

pub use rest::AppState;
pub use server::ApiServer;
