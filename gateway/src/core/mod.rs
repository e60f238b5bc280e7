pub mod booking;
pub mod bridge;
pub mod codec;
pub mod delivery;
pub mod realtime;
pub mod session;
pub mod telephony;
pub mod turns;

// Re-export commonly used types for convenience
pub use booking::{BOOKING_MARKER, BookingError, BookingRecord, extract_booking};
pub use bridge::{BridgeAction, BridgeController, BridgeInput};
pub use delivery::{
    BookingSink, DeliveryContext, DeliveryError, WebhookBookingSink, dispatch_booking,
};
pub use realtime::{
    ConnectionState, OpenAIRealtime, RealtimeConfig, RealtimeError, RealtimeEvent,
    RealtimeHandle, RealtimeResult,
};
pub use session::CallSession;
pub use telephony::{TelephonyEvent, TelephonyOutgoing};
pub use turns::{ResponseRequest, TurnCoordinator, TurnState};
