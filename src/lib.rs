pub mod aggregate;
pub mod cli;
pub mod diff;
pub mod error;
pub mod github;
pub mod instrument;
pub mod model;
pub mod report;
pub mod resolve;
