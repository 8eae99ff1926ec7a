//! Observation buffer contract.
//!
//! The simulation delivers world state straight into memory owned by the
//! caller. Before the first episode starts, the caller binds a typed,
//! fixed-shape region per [`Channel`] it cares about; every suspend point
//! the simulation writes the bound regions in place through a [`Frame`].
//! Unbound channels are skipped.
//!
//! ```text
//! caller memory ──bind──▶ ObservationBuffers ──resume──▶ Frame (simulation)
//!        ▲                                                    │
//!        └────────────── written in place, no copies ─────────┘
//! ```

mod buffers;
mod channel;
mod frame;

pub use buffers::{ObservationBuffers, RawBuffer};
pub use channel::{
    BLSTATS, CHARS, COLORS, Channel, ChannelKey, DType, Element, GLYPHS, INTERNAL, INV_GLYPHS,
    INV_LETTERS, INV_OCLASSES, INV_STRS, MESSAGE, MISC, PROGRAM_STATE, SCREEN_DESCRIPTIONS,
    SPECIALS, TTY_CHARS, TTY_COLORS, TTY_CURSOR,
};
pub use frame::Frame;

pub(crate) use frame::FrameTarget;

/// Number of map rows.
pub const ROWNO: usize = 21;
/// Number of map columns; the leftmost column is never displayed.
pub const COLNO: usize = 80;
/// Size of the status-line vector.
pub const NLE_BLSTATS_SIZE: usize = 27;
/// Size of the program-state vector.
pub const NLE_PROGRAM_STATE_SIZE: usize = 6;
/// Size of the internal-state vector.
pub const NLE_INTERNAL_SIZE: usize = 9;
/// Size of the miscellaneous-flags vector.
pub const NLE_MISC_SIZE: usize = 3;
/// Number of inventory slots.
pub const NLE_INVENTORY_SIZE: usize = 55;
/// Bytes per inventory description.
pub const NLE_INVENTORY_STR_LENGTH: usize = 80;
/// Bytes per screen description.
pub const NLE_SCREEN_DESCRIPTION_LENGTH: usize = 80;
/// Bytes in the message buffer.
pub const NLE_MESSAGE_SIZE: usize = 256;
/// Terminal rows.
pub const NLE_TERM_LI: usize = 24;
/// Terminal columns.
pub const NLE_TERM_CO: usize = 80;

/// Indices into the status-line vector.
pub mod blstats {
    /// Hero x coordinate.
    pub const NLE_BL_X: usize = 0;
    /// Hero y coordinate.
    pub const NLE_BL_Y: usize = 1;
    /// Strength (3..25).
    pub const NLE_BL_STR25: usize = 2;
    /// Strength (3..125).
    pub const NLE_BL_STR125: usize = 3;
    /// Dexterity.
    pub const NLE_BL_DEX: usize = 4;
    /// Constitution.
    pub const NLE_BL_CON: usize = 5;
    /// Intelligence.
    pub const NLE_BL_INT: usize = 6;
    /// Wisdom.
    pub const NLE_BL_WIS: usize = 7;
    /// Charisma.
    pub const NLE_BL_CHA: usize = 8;
    /// Score.
    pub const NLE_BL_SCORE: usize = 9;
    /// Hit points.
    pub const NLE_BL_HP: usize = 10;
    /// Maximum hit points.
    pub const NLE_BL_HPMAX: usize = 11;
    /// Dungeon depth.
    pub const NLE_BL_DEPTH: usize = 12;
    /// Gold.
    pub const NLE_BL_GOLD: usize = 13;
    /// Energy.
    pub const NLE_BL_ENE: usize = 14;
    /// Maximum energy.
    pub const NLE_BL_ENEMAX: usize = 15;
    /// Armor class.
    pub const NLE_BL_AC: usize = 16;
    /// Monster level (when polymorphed).
    pub const NLE_BL_HD: usize = 17;
    /// Experience level.
    pub const NLE_BL_XP: usize = 18;
    /// Experience points.
    pub const NLE_BL_EXP: usize = 19;
    /// Game time in turns.
    pub const NLE_BL_TIME: usize = 20;
    /// Hunger state.
    pub const NLE_BL_HUNGER: usize = 21;
    /// Carrying capacity.
    pub const NLE_BL_CAP: usize = 22;
    /// Dungeon number.
    pub const NLE_BL_DNUM: usize = 23;
    /// Level number within the dungeon.
    pub const NLE_BL_DLEVEL: usize = 24;
    /// Condition bitmask.
    pub const NLE_BL_CONDITION: usize = 25;
    /// Alignment.
    pub const NLE_BL_ALIGN: usize = 26;
}

/// Glyph-space offsets shared by simulations that speak this contract.
pub mod glyph {
    /// First monster glyph.
    pub const GLYPH_MON_OFF: i16 = 0;
    /// Number of monster species.
    pub const NUMMONS: i16 = 381;
    /// First pet glyph.
    pub const GLYPH_PET_OFF: i16 = GLYPH_MON_OFF + NUMMONS;
    /// First object glyph.
    pub const GLYPH_OBJ_OFF: i16 = 1907;
    /// First map-feature glyph.
    pub const GLYPH_CMAP_OFF: i16 = 2359;
    /// One past the last glyph.
    pub const MAX_GLYPH: i16 = 5976;
    /// Marker for "nothing here".
    pub const NO_GLYPH: i16 = MAX_GLYPH;
}

/// Copy `text` into `dst` as a NUL-terminated C string.
///
/// The text is truncated so that at least one trailing NUL fits; the rest of
/// `dst` is zeroed. Returns the number of text bytes written.
pub fn write_cstr(dst: &mut [u8], text: &[u8]) -> usize {
    let n = text.len().min(dst.len().saturating_sub(1));
    dst[..n].copy_from_slice(&text[..n]);
    dst[n..].fill(0);
    n
}
