pub mod app;
pub mod errors;
pub mod github;
pub mod logging;
pub mod session;
