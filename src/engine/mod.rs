//! Transformation engine
//!
//! Pure functions that turn source roles into target roles: filters decide
//! which packages a pull keeps, transforms rewrite their fields, pulls copy
//! roles into the target object and derived operations compute new roles
//! from the ones already there. The only I/O happens through the
//! `SourceLookup` handed to `assemble_target`.

pub mod assemble;
pub mod derived;
pub mod filter;
pub mod pull;
pub mod transform;

pub use assemble::assemble_target;
pub use derived::{apply_derived, extract_common};
pub use pull::{PulledRole, execute};
