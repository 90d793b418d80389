//! Auth-domain identifiers, scope keys, and token secrets.

pub mod program;
pub mod scope;
pub mod token;

pub use program::*;
pub use scope::*;
pub use token::*;
