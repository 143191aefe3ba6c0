pub mod burn;
pub mod config;
pub mod error;
pub mod mirror;
pub mod source;
pub mod utils;

pub use burn::*;
pub use config::*;
pub use error::*;
pub use mirror::*;
pub use source::*;
pub use utils::*;
