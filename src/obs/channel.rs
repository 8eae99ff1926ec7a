//! Channel table: element type and shape of every observation slot.

use std::fmt;
use std::marker::PhantomData;

use super::{
    COLNO, NLE_BLSTATS_SIZE, NLE_INTERNAL_SIZE, NLE_INVENTORY_SIZE, NLE_INVENTORY_STR_LENGTH,
    NLE_MESSAGE_SIZE, NLE_MISC_SIZE, NLE_PROGRAM_STATE_SIZE, NLE_SCREEN_DESCRIPTION_LENGTH,
    NLE_TERM_CO, NLE_TERM_LI, ROWNO,
};

/// Element type of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// Signed 8-bit.
    I8,
    /// Unsigned 8-bit.
    U8,
    /// Signed 16-bit.
    I16,
    /// Signed 32-bit.
    I32,
    /// Signed 64-bit.
    I64,
}

impl DType {
    /// Size of one element in bytes.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            DType::I8 | DType::U8 => 1,
            DType::I16 => 2,
            DType::I32 => 4,
            DType::I64 => 8,
        }
    }

    /// Lower-case type name, as numpy spells it.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            DType::I8 => "int8",
            DType::U8 => "uint8",
            DType::I16 => "int16",
            DType::I32 => "int32",
            DType::I64 => "int64",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rust scalar types that can back a channel.
pub trait Element: Copy + Send + 'static {
    /// Matching element type tag.
    const DTYPE: DType;
}

impl Element for i8 {
    const DTYPE: DType = DType::I8;
}

impl Element for u8 {
    const DTYPE: DType = DType::U8;
}

impl Element for i16 {
    const DTYPE: DType = DType::I16;
}

impl Element for i32 {
    const DTYPE: DType = DType::I32;
}

impl Element for i64 {
    const DTYPE: DType = DType::I64;
}

const DUNGEON: [usize; 2] = [ROWNO, COLNO - 1];
const BLSTATS_SHAPE: [usize; 1] = [NLE_BLSTATS_SIZE];
const MESSAGE_SHAPE: [usize; 1] = [NLE_MESSAGE_SIZE];
const PROGRAM_STATE_SHAPE: [usize; 1] = [NLE_PROGRAM_STATE_SIZE];
const INTERNAL_SHAPE: [usize; 1] = [NLE_INTERNAL_SIZE];
const INVENTORY: [usize; 1] = [NLE_INVENTORY_SIZE];
const INV_STRS_SHAPE: [usize; 2] = [NLE_INVENTORY_SIZE, NLE_INVENTORY_STR_LENGTH];
const SCREEN_DESCRIPTIONS_SHAPE: [usize; 3] = [ROWNO, COLNO - 1, NLE_SCREEN_DESCRIPTION_LENGTH];
const TERMINAL: [usize; 2] = [NLE_TERM_LI, NLE_TERM_CO];
const TTY_CURSOR_SHAPE: [usize; 1] = [2];
const MISC_SHAPE: [usize; 1] = [NLE_MISC_SIZE];

/// A named observation slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Glyph id per map cell.
    Glyphs,
    /// Display character per map cell.
    Chars,
    /// Display color per map cell.
    Colors,
    /// Special rendering flags per map cell.
    Specials,
    /// Status-line values.
    Blstats,
    /// Current top-line message.
    Message,
    /// Program-state flags.
    ProgramState,
    /// Internal game state.
    Internal,
    /// Inventory glyphs.
    InvGlyphs,
    /// Inventory letters.
    InvLetters,
    /// Inventory object classes.
    InvOclasses,
    /// Inventory descriptions.
    InvStrs,
    /// Textual description per map cell.
    ScreenDescriptions,
    /// Terminal characters.
    TtyChars,
    /// Terminal colors.
    TtyColors,
    /// Terminal cursor as `[row, col]`.
    TtyCursor,
    /// Miscellaneous prompt flags.
    Misc,
}

impl Channel {
    /// Number of channels.
    pub const COUNT: usize = 17;

    /// Every channel, in table order.
    pub const ALL: [Channel; Channel::COUNT] = [
        Channel::Glyphs,
        Channel::Chars,
        Channel::Colors,
        Channel::Specials,
        Channel::Blstats,
        Channel::Message,
        Channel::ProgramState,
        Channel::Internal,
        Channel::InvGlyphs,
        Channel::InvLetters,
        Channel::InvOclasses,
        Channel::InvStrs,
        Channel::ScreenDescriptions,
        Channel::TtyChars,
        Channel::TtyColors,
        Channel::TtyCursor,
        Channel::Misc,
    ];

    /// Position in [`Channel::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Name used by bindings.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Channel::Glyphs => "glyphs",
            Channel::Chars => "chars",
            Channel::Colors => "colors",
            Channel::Specials => "specials",
            Channel::Blstats => "blstats",
            Channel::Message => "message",
            Channel::ProgramState => "program_state",
            Channel::Internal => "internal",
            Channel::InvGlyphs => "inv_glyphs",
            Channel::InvLetters => "inv_letters",
            Channel::InvOclasses => "inv_oclasses",
            Channel::InvStrs => "inv_strs",
            Channel::ScreenDescriptions => "screen_descriptions",
            Channel::TtyChars => "tty_chars",
            Channel::TtyColors => "tty_colors",
            Channel::TtyCursor => "tty_cursor",
            Channel::Misc => "misc",
        }
    }

    /// Look a channel up by its binding name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Declared element type.
    #[must_use]
    pub const fn dtype(self) -> DType {
        match self {
            Channel::Glyphs | Channel::InvGlyphs => DType::I16,
            Channel::Chars
            | Channel::Colors
            | Channel::Specials
            | Channel::Message
            | Channel::InvLetters
            | Channel::InvOclasses
            | Channel::InvStrs
            | Channel::ScreenDescriptions
            | Channel::TtyChars
            | Channel::TtyCursor => DType::U8,
            Channel::Blstats => DType::I64,
            Channel::ProgramState | Channel::Internal | Channel::Misc => DType::I32,
            Channel::TtyColors => DType::I8,
        }
    }

    /// Declared extents, outermost first.
    #[must_use]
    pub const fn shape(self) -> &'static [usize] {
        match self {
            Channel::Glyphs | Channel::Chars | Channel::Colors | Channel::Specials => &DUNGEON,
            Channel::Blstats => &BLSTATS_SHAPE,
            Channel::Message => &MESSAGE_SHAPE,
            Channel::ProgramState => &PROGRAM_STATE_SHAPE,
            Channel::Internal => &INTERNAL_SHAPE,
            Channel::InvGlyphs | Channel::InvLetters | Channel::InvOclasses => &INVENTORY,
            Channel::InvStrs => &INV_STRS_SHAPE,
            Channel::ScreenDescriptions => &SCREEN_DESCRIPTIONS_SHAPE,
            Channel::TtyChars | Channel::TtyColors => &TERMINAL,
            Channel::TtyCursor => &TTY_CURSOR_SHAPE,
            Channel::Misc => &MISC_SHAPE,
        }
    }

    /// Total number of elements.
    #[must_use]
    pub fn element_count(self) -> usize {
        self.shape().iter().product()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A channel tagged with its Rust element type.
///
/// Keys are only constructed inside this crate, so the element type of a key
/// always matches the channel's declared [`DType`].
pub struct ChannelKey<T> {
    channel: Channel,
    _element: PhantomData<fn() -> T>,
}

impl<T> ChannelKey<T> {
    const fn new(channel: Channel) -> Self {
        Self {
            channel,
            _element: PhantomData,
        }
    }

    /// The channel this key addresses.
    #[must_use]
    pub const fn channel(self) -> Channel {
        self.channel
    }
}

impl<T> Clone for ChannelKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ChannelKey<T> {}

impl<T> fmt::Debug for ChannelKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ChannelKey").field(&self.channel).finish()
    }
}

/// Glyph grid.
pub const GLYPHS: ChannelKey<i16> = ChannelKey::new(Channel::Glyphs);
/// Character overlay.
pub const CHARS: ChannelKey<u8> = ChannelKey::new(Channel::Chars);
/// Color overlay.
pub const COLORS: ChannelKey<u8> = ChannelKey::new(Channel::Colors);
/// Special-flag overlay.
pub const SPECIALS: ChannelKey<u8> = ChannelKey::new(Channel::Specials);
/// Status line.
pub const BLSTATS: ChannelKey<i64> = ChannelKey::new(Channel::Blstats);
/// Message buffer.
pub const MESSAGE: ChannelKey<u8> = ChannelKey::new(Channel::Message);
/// Program state.
pub const PROGRAM_STATE: ChannelKey<i32> = ChannelKey::new(Channel::ProgramState);
/// Internal state.
pub const INTERNAL: ChannelKey<i32> = ChannelKey::new(Channel::Internal);
/// Inventory glyphs.
pub const INV_GLYPHS: ChannelKey<i16> = ChannelKey::new(Channel::InvGlyphs);
/// Inventory letters.
pub const INV_LETTERS: ChannelKey<u8> = ChannelKey::new(Channel::InvLetters);
/// Inventory classes.
pub const INV_OCLASSES: ChannelKey<u8> = ChannelKey::new(Channel::InvOclasses);
/// Inventory descriptions.
pub const INV_STRS: ChannelKey<u8> = ChannelKey::new(Channel::InvStrs);
/// Screen descriptions.
pub const SCREEN_DESCRIPTIONS: ChannelKey<u8> = ChannelKey::new(Channel::ScreenDescriptions);
/// Terminal characters.
pub const TTY_CHARS: ChannelKey<u8> = ChannelKey::new(Channel::TtyChars);
/// Terminal colors.
pub const TTY_COLORS: ChannelKey<i8> = ChannelKey::new(Channel::TtyColors);
/// Terminal cursor.
pub const TTY_CURSOR: ChannelKey<u8> = ChannelKey::new(Channel::TtyCursor);
/// Miscellaneous flags.
pub const MISC: ChannelKey<i32> = ChannelKey::new(Channel::Misc);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_in_index_order() {
        for (i, channel) in Channel::ALL.iter().enumerate() {
            assert_eq!(channel.index(), i);
        }
    }

    #[test]
    fn test_name_lookup_roundtrips() {
        for channel in Channel::ALL {
            assert_eq!(Channel::from_name(channel.name()), Some(channel));
        }
        assert_eq!(Channel::from_name("nonsense"), None);
    }

    #[test]
    fn test_dungeon_channels_share_shape() {
        assert_eq!(Channel::Glyphs.shape(), &[21, 79]);
        assert_eq!(Channel::Specials.shape(), Channel::Glyphs.shape());
        assert_eq!(Channel::Glyphs.element_count(), 21 * 79);
    }

    #[test]
    fn test_screen_descriptions_is_rank_three() {
        assert_eq!(Channel::ScreenDescriptions.shape(), &[21, 79, 80]);
        assert_eq!(Channel::ScreenDescriptions.dtype(), DType::U8);
    }

    #[test]
    fn test_key_types_match_declared_dtypes() {
        fn check<T: Element>(key: ChannelKey<T>) {
            assert_eq!(T::DTYPE, key.channel().dtype(), "{}", key.channel());
        }
        check(GLYPHS);
        check(CHARS);
        check(COLORS);
        check(SPECIALS);
        check(BLSTATS);
        check(MESSAGE);
        check(PROGRAM_STATE);
        check(INTERNAL);
        check(INV_GLYPHS);
        check(INV_LETTERS);
        check(INV_OCLASSES);
        check(INV_STRS);
        check(SCREEN_DESCRIPTIONS);
        check(TTY_CHARS);
        check(TTY_COLORS);
        check(TTY_CURSOR);
        check(MISC);
    }
}
