//! Data types for the pharmatrack API wire format.
//!
//! The API emits snake_case JSON, so the structs map onto the wire without
//! field renaming. `*_display` fields are read-only strings the server
//! denormalizes onto list responses; they are absent on write.

pub mod audit;
pub mod obligation;
pub mod pva;
pub mod task;
pub mod user;

pub use audit::{AuditAction, AuditLogEntry};
pub use obligation::{Obligation, ObligationPayload, ResponsibilityType};
pub use pva::{MedicinalProduct, Pva, PvaPayload, PvaStatus};
pub use task::{
    Comment, Frequency, Task, TaskFilter, TaskPayload, TaskSchedule, TaskStatus,
};
pub use user::User;
