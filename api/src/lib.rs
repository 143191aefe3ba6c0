pub mod consts;
pub mod error;
pub mod decode;
pub mod state;
pub mod pda;
pub mod event;
pub mod tables;
pub mod compose;
pub mod accumulator;

pub use crate::consts::*;

pub mod prelude {
    pub use crate::consts::*;
    pub use crate::error::*;
    pub use crate::decode::*;
    pub use crate::state::*;
    pub use crate::pda::*;
    pub use crate::event::*;
    pub use crate::tables::*;
    pub use crate::compose::*;
    pub use crate::accumulator::*;
}

use solana_program::declare_id;

declare_id!("uaDkkJGLLEY3kFMhhvrh5MZJ6fmwCmhNf8L7BZQJ9Aw");
