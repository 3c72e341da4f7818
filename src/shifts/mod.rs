//! Shift tracking on top of the PocketBase backend

pub mod lifecycle;
pub mod reply;
pub mod service;
pub mod timestamp;

pub use reply::Reply;
pub use service::{ShiftCommand, ShiftService};

use std::sync::Arc;

pub type SharedShiftService = Arc<ShiftService>;

pub fn create_shared_shift_service(service: ShiftService) -> SharedShiftService {
    Arc::new(service)
}
