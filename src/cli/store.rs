//! Owned memory for every observation channel.

use nle_bridge::obs::{
    BLSTATS, CHARS, COLORS, GLYPHS, INTERNAL, INV_GLYPHS, INV_LETTERS, INV_OCLASSES, INV_STRS,
    MESSAGE, MISC, PROGRAM_STATE, SCREEN_DESCRIPTIONS, SPECIALS, TTY_CHARS, TTY_COLORS,
    TTY_CURSOR,
};
use nle_bridge::{Channel, ObservationBuffers, ValidationError};

fn zeroed<T: Default + Clone>(channel: Channel) -> Vec<T> {
    vec![T::default(); channel.element_count()]
}

/// One vector per channel, sized from the channel table.
#[derive(Debug)]
pub(super) struct ObservationStore {
    glyphs: Vec<i16>,
    chars: Vec<u8>,
    colors: Vec<u8>,
    specials: Vec<u8>,
    blstats: Vec<i64>,
    message: Vec<u8>,
    program_state: Vec<i32>,
    internal: Vec<i32>,
    inv_glyphs: Vec<i16>,
    inv_letters: Vec<u8>,
    inv_oclasses: Vec<u8>,
    inv_strs: Vec<u8>,
    screen_descriptions: Vec<u8>,
    tty_chars: Vec<u8>,
    tty_colors: Vec<i8>,
    tty_cursor: Vec<u8>,
    misc: Vec<i32>,
}

impl ObservationStore {
    pub(super) fn new() -> Self {
        Self {
            glyphs: zeroed(Channel::Glyphs),
            chars: zeroed(Channel::Chars),
            colors: zeroed(Channel::Colors),
            specials: zeroed(Channel::Specials),
            blstats: zeroed(Channel::Blstats),
            message: zeroed(Channel::Message),
            program_state: zeroed(Channel::ProgramState),
            internal: zeroed(Channel::Internal),
            inv_glyphs: zeroed(Channel::InvGlyphs),
            inv_letters: zeroed(Channel::InvLetters),
            inv_oclasses: zeroed(Channel::InvOclasses),
            inv_strs: zeroed(Channel::InvStrs),
            screen_descriptions: zeroed(Channel::ScreenDescriptions),
            tty_chars: zeroed(Channel::TtyChars),
            tty_colors: zeroed(Channel::TtyColors),
            tty_cursor: zeroed(Channel::TtyCursor),
            misc: zeroed(Channel::Misc),
        }
    }

    /// Bind every channel.
    pub(super) fn bind_all(&mut self) -> Result<ObservationBuffers<'_>, ValidationError> {
        let mut buffers = ObservationBuffers::new();
        buffers
            .bind(GLYPHS, self.glyphs.as_mut_slice())?
            .bind(CHARS, self.chars.as_mut_slice())?
            .bind(COLORS, self.colors.as_mut_slice())?
            .bind(SPECIALS, self.specials.as_mut_slice())?
            .bind(BLSTATS, self.blstats.as_mut_slice())?
            .bind(MESSAGE, self.message.as_mut_slice())?
            .bind(PROGRAM_STATE, self.program_state.as_mut_slice())?
            .bind(INTERNAL, self.internal.as_mut_slice())?
            .bind(INV_GLYPHS, self.inv_glyphs.as_mut_slice())?
            .bind(INV_LETTERS, self.inv_letters.as_mut_slice())?
            .bind(INV_OCLASSES, self.inv_oclasses.as_mut_slice())?
            .bind(INV_STRS, self.inv_strs.as_mut_slice())?
            .bind(SCREEN_DESCRIPTIONS, self.screen_descriptions.as_mut_slice())?
            .bind(TTY_CHARS, self.tty_chars.as_mut_slice())?
            .bind(TTY_COLORS, self.tty_colors.as_mut_slice())?
            .bind(TTY_CURSOR, self.tty_cursor.as_mut_slice())?
            .bind(MISC, self.misc.as_mut_slice())?;
        Ok(buffers)
    }

    /// Bind only what unattended runs read.
    pub(super) fn bind_status(&mut self) -> Result<ObservationBuffers<'_>, ValidationError> {
        let mut buffers = ObservationBuffers::new();
        buffers
            .bind(BLSTATS, self.blstats.as_mut_slice())?
            .bind(CHARS, self.chars.as_mut_slice())?
            .bind(MESSAGE, self.message.as_mut_slice())?;
        Ok(buffers)
    }
}
