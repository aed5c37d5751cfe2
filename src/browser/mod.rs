//! Browser automation layer
//!
//! - `PageDriver`: the capability the harvest core depends on
//! - `ChromiumDriver`: the production implementation over the DevTools protocol

mod chromium;
mod driver;

pub use chromium::ChromiumDriver;
pub use driver::{DriverError, DriverResult, ElementHandle, PageDriver};
