pub mod conflict;
pub mod template;
pub mod vm;

pub use conflict::*;
pub use template::*;
pub use vm::*;
