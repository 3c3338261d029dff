pub mod byte_order;
pub mod missing;

// Re-export types for convenience.
pub use crate::types::byte_order::ByteOrder;
pub use crate::types::missing::Missing;
