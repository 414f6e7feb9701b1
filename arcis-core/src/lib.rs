//! Arcis core
//!
//! Pure, synchronous building blocks of the detection backend:
//! - [`frame`]: normalizes detection frames into displayable JPEGs
//! - [`threat`]: threat levels, alert severity, alert planning, analysis
//!
//! Nothing here touches I/O. Diagnostics go through the `log` facade.

pub mod error;
pub mod frame;
pub mod threat;

pub use error::{ClassifyError, FrameError};
pub use frame::{decode, decode_strict, Frame, FrameEncoding, FramePayload};
pub use threat::{classify, classify_typed, plan_alert, AlertPlan, AlertSeverity, Classification, ObjectType, ThreatLevel};
