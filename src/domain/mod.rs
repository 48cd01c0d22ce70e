//! Domain module containing core entities, value objects, and domain events.
//!
//! - **Entities**: objects with identity (`EmergencyAlert`)
//! - **Value objects**: immutable data (`MotionSample`, `Contact`, `LocationInfo`)
//! - **Domain events**: lifecycle transitions observable by outer layers

pub mod alert;
pub mod contact;
pub mod events;
pub mod sample;

// Re-export all domain types
pub use alert::*;
pub use contact::*;
pub use events::*;
pub use sample::*;
