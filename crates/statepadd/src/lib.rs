pub mod capture;
pub mod replay;

mod error;
mod hex;

pub use crate::error::{Error, Result};
pub use crate::hex::parse_hex;
