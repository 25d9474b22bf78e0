use crate::model::Minute;

/// Business hours open at 08:00.
pub const OPEN: Minute = 8 * 60;
/// Business hours close at 22:00 (exclusive).
pub const CLOSE: Minute = 22 * 60;

pub const MAX_NAME_LEN: usize = 200;
pub const MAX_CONTACT_LEN: usize = 254;
/// Serialized size bound for the free-form requirements map.
pub const MAX_REQUIREMENTS_BYTES: usize = 16 * 1024;

/// Longest accepted request line on the wire.
pub const MAX_LINE_LEN: usize = 64 * 1024;

pub const MAX_SEED_DAYS: u32 = 366;
