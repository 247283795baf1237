//! Protocol identifiers shared by both ends of a link
//!
//! These values are agreed upon out of band: the listening and dialing side
//! must present the same service identifier or no stream connection can be
//! established, and the attribute identifiers below must match the remote
//! implementation byte for byte.

use uuid::Uuid;

// ----------------------------------------------------------------------------
// Stream Service Identifier
// ----------------------------------------------------------------------------

/// Service identifier under which stream endpoints are opened. Shared by the
/// acceptor and connector sides, and reused as the attribute service id.
pub const LINK_SERVICE_UUID: Uuid = Uuid::from_u128(0x5AE3B36E_16DB_4732_B2FB_B76CCFE30F89);

// ----------------------------------------------------------------------------
// Attribute Identifiers
// ----------------------------------------------------------------------------

/// Characteristic carrying the served content value (read + notify).
pub const CONTENT_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x4AED2DB1_2537_4D7B_A2AA_46708B4F7563);

/// Client configuration descriptor recording notification opt-in
/// (read + write).
pub const CLIENT_CONFIG_DESCRIPTOR_UUID: Uuid =
    Uuid::from_u128(0x00002902_0000_1000_8000_00805F9B34FB);

/// Descriptor value a peer writes to enable notifications.
pub const ENABLE_NOTIFICATIONS_VALUE: [u8; 2] = [0x01, 0x00];

/// Descriptor value a peer writes to disable notifications.
pub const DISABLE_NOTIFICATIONS_VALUE: [u8; 2] = [0x00, 0x00];

// ----------------------------------------------------------------------------
// Stream Tuning
// ----------------------------------------------------------------------------

/// Capacity of the read buffer used by the stream pump.
pub const READ_BUFFER_CAPACITY: usize = 1024;
