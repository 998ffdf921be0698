//! Small helpers shared by the storage modules.

// -----------------------------------------------------------------------------
// Modules

mod debug_name;

// -----------------------------------------------------------------------------
// Exports

pub use debug_name::DebugName;
