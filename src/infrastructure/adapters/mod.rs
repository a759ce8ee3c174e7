//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod caption;
pub mod muxer;
pub mod probe;
pub mod storage;
pub mod tts;

pub use caption::*;
pub use muxer::*;
pub use probe::*;
pub use storage::*;
pub use tts::*;
