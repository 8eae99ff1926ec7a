//! A small deterministic dungeon walk that speaks the observation contract.
//!
//! The hero starts in a rectangular room and can walk, search, descend the
//! stairs or quit. A hunger clock ends the episode eventually; with
//! `spawn_monsters` set a newt may appear and bite. The level layout comes
//! from the level-generation stream, everything else from the core stream,
//! so episodes are reproducible from their seeds. Every channel is written
//! at every suspend point.

#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use rand::Rng;

use super::{EndCause, ModuleLoader, Simulation, SimulationModule};
use crate::context::{Host, InputRequest};
use crate::error::{Interrupted, LoadError};
use crate::obs::glyph::{GLYPH_CMAP_OFF, GLYPH_MON_OFF, GLYPH_OBJ_OFF, NO_GLYPH};
use crate::obs::{
    BLSTATS, CHARS, COLNO, COLORS, Frame, GLYPHS, INTERNAL, INV_GLYPHS, INV_LETTERS, INV_OCLASSES,
    INV_STRS, MESSAGE, MISC, NLE_INVENTORY_SIZE, NLE_INVENTORY_STR_LENGTH,
    NLE_SCREEN_DESCRIPTION_LENGTH, NLE_TERM_CO, NLE_TERM_LI, PROGRAM_STATE, ROWNO,
    SCREEN_DESCRIPTIONS, SPECIALS, TTY_CHARS, TTY_COLORS, TTY_CURSOR, blstats as bl, write_cstr,
};
use crate::seed::RngStreams;
use crate::settings::Settings;

/// Deepest level; descending past it escapes the dungeon.
pub const MAX_DEPTH: i64 = 3;
/// Turns of food the hero starts with.
pub const START_NUTRITION: i64 = 900;
/// Starting and maximum hit points.
pub const START_HP: i64 = 14;

/// Key codes the demo understands.
pub const ACTIONS: [u8; 12] = [
    b'k', b'j', b'h', b'l', b'y', b'u', b'b', b'n', b's', b'>', b'Q', 27,
];

const MAP_COLS: usize = COLNO - 1;
const HUNGRY_AT: i64 = 150;
const HERO_MONNUM: i16 = 337;
const NEWT_MONNUM: i16 = 31;
const NEWT_HP: i64 = 3;
/// One-in-N chance per turn of a newt appearing.
const SPAWN_ODDS: u32 = 25;
/// Object class that marks an empty inventory slot.
const MAXOCLASSES: u8 = 17;

/// Loads the demo module from any existing file.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoLoader;

impl ModuleLoader for DemoLoader {
    fn load(&self, path: &Path) -> Result<Arc<dyn SimulationModule>, LoadError> {
        let meta = fs::metadata(path)?;
        if !meta.is_file() {
            return Err(LoadError::Invalid(format!(
                "{} is not a regular file",
                path.display()
            )));
        }
        Ok(Arc::new(DemoModule))
    }
}

/// The demo simulation module.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoModule;

impl SimulationModule for DemoModule {
    fn name(&self) -> &str {
        "demo"
    }

    fn instantiate(&self, settings: &Settings, _trace_name: &str) -> Box<dyn Simulation> {
        Box::new(DemoGame::new(settings))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pos {
    x: usize,
    y: usize,
}

impl Pos {
    fn step(self, dx: isize, dy: isize) -> Option<Pos> {
        Some(Pos {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }

    fn is_adjacent(self, other: Pos) -> bool {
        self != other && self.x.abs_diff(other.x) <= 1 && self.y.abs_diff(other.y) <= 1
    }
}

/// Room bounds; the walls sit on the bounds, the floor strictly inside.
#[derive(Debug, Clone, Copy)]
struct Room {
    left: usize,
    top: usize,
    right: usize,
    bottom: usize,
}

impl Room {
    fn generate(rng: &mut impl Rng) -> Self {
        let width = rng.gen_range(4..=16);
        let height = rng.gen_range(2..=6);
        let left = rng.gen_range(1..=MAP_COLS - 3 - width);
        let top = rng.gen_range(1..=ROWNO - 3 - height);
        Self {
            left,
            top,
            right: left + width + 1,
            bottom: top + height + 1,
        }
    }

    fn contains_floor(&self, p: Pos) -> bool {
        p.x > self.left && p.x < self.right && p.y > self.top && p.y < self.bottom
    }

    fn random_floor(&self, rng: &mut impl Rng) -> Pos {
        Pos {
            x: rng.gen_range(self.left + 1..self.right),
            y: rng.gen_range(self.top + 1..self.bottom),
        }
    }

    fn feature(&self, p: Pos) -> Feature {
        let on_x = p.x == self.left || p.x == self.right;
        let on_y = p.y == self.top || p.y == self.bottom;
        let in_x = p.x >= self.left && p.x <= self.right;
        let in_y = p.y >= self.top && p.y <= self.bottom;
        match (on_x, on_y) {
            (true, true) => match (p.x == self.left, p.y == self.top) {
                (true, true) => Feature::TlCorner,
                (false, true) => Feature::TrCorner,
                (true, false) => Feature::BlCorner,
                (false, false) => Feature::BrCorner,
            },
            (true, false) if in_y => Feature::VWall,
            (false, true) if in_x => Feature::HWall,
            (false, false) if in_x && in_y => Feature::Floor,
            _ => Feature::Stone,
        }
    }
}

/// Map features, numbered like the engine's cmap symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Feature {
    Stone,
    VWall,
    HWall,
    TlCorner,
    TrCorner,
    BlCorner,
    BrCorner,
    Floor,
    Stairs,
}

impl Feature {
    fn cmap(self) -> i16 {
        match self {
            Feature::Stone => 0,
            Feature::VWall => 1,
            Feature::HWall => 2,
            Feature::TlCorner => 3,
            Feature::TrCorner => 4,
            Feature::BlCorner => 5,
            Feature::BrCorner => 6,
            Feature::Floor => 19,
            Feature::Stairs => 24,
        }
    }

    fn symbol(self) -> u8 {
        match self {
            Feature::Stone => b' ',
            Feature::VWall => b'|',
            Feature::HWall
            | Feature::TlCorner
            | Feature::TrCorner
            | Feature::BlCorner
            | Feature::BrCorner => b'-',
            Feature::Floor => b'.',
            Feature::Stairs => b'>',
        }
    }

    fn description(self) -> &'static [u8] {
        match self {
            Feature::Stone => b"",
            Feature::VWall
            | Feature::HWall
            | Feature::TlCorner
            | Feature::TrCorner
            | Feature::BlCorner
            | Feature::BrCorner => b"wall",
            Feature::Floor => b"floor of a room",
            Feature::Stairs => b"staircase down",
        }
    }
}

/// What one map cell shows.
#[derive(Debug, Clone, Copy)]
struct Cell {
    glyph: i16,
    ch: u8,
    color: u8,
    description: &'static [u8],
}

impl Cell {
    fn feature(f: Feature) -> Self {
        Self {
            glyph: GLYPH_CMAP_OFF + f.cmap(),
            ch: f.symbol(),
            color: if f == Feature::Stone { 0 } else { 7 },
            description: f.description(),
        }
    }
}

#[derive(Debug, Clone)]
struct Item {
    name: String,
    class: u8,
}

impl Item {
    fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        let class = [
            ("wand", 10),
            ("spellbook", 9),
            ("scroll", 8),
            ("potion", 7),
            ("ring", 3),
            ("amulet", 4),
            ("ration", 6),
            ("sword", 1),
            ("armor", 2),
        ]
        .iter()
        .find(|(key, _)| lower.contains(key))
        .map_or(5, |&(_, class)| class);
        Self {
            name: name.to_string(),
            class,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Monster {
    pos: Pos,
    hp: i64,
}

/// One episode of the demo.
#[derive(Debug)]
pub struct DemoGame {
    spawn_monsters: bool,
    inventory: Vec<Item>,
    room: Room,
    stairs: Pos,
    hero: Pos,
    monster: Option<Monster>,
    depth: i64,
    deepest: i64,
    turn: i64,
    hp: i64,
    nutrition: i64,
    score: i64,
    message: String,
    prompt: bool,
    over: bool,
}

impl DemoGame {
    /// A new episode configured from `settings`.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        let mut inventory = vec![
            Item::from_name("a +1 long sword (weapon in hand)"),
            Item::from_name("an uncursed food ration"),
        ];
        inventory.extend(settings.wizkit_items().map(Item::from_name));
        inventory.truncate(NLE_INVENTORY_SIZE);

        let origin = Pos { x: 0, y: 0 };
        Self {
            spawn_monsters: settings.spawn_monsters,
            inventory,
            room: Room {
                left: 0,
                top: 0,
                right: 0,
                bottom: 0,
            },
            stairs: origin,
            hero: origin,
            monster: None,
            depth: 1,
            deepest: 1,
            turn: 1,
            hp: START_HP,
            nutrition: START_NUTRITION,
            score: 0,
            message: String::new(),
            prompt: false,
            over: false,
        }
    }

    fn new_level(&mut self, rng: &mut RngStreams) {
        let lgen = rng.level_gen();
        self.room = Room::generate(lgen);
        self.stairs = self.room.random_floor(lgen);
        self.hero = loop {
            let p = self.room.random_floor(lgen);
            if p != self.stairs {
                break p;
            }
        };
        self.monster = None;
    }

    /// Apply one key; returns the end cause if the episode ended.
    fn act(&mut self, action: i32, rng: &mut RngStreams) -> Option<EndCause> {
        let key = u8::try_from(action).unwrap_or(0);

        if self.prompt {
            self.prompt = false;
            if key == b'y' {
                return Some(EndCause::Quit);
            }
            self.message = "Never mind.".into();
            return None;
        }

        let took_time = match key {
            b'k' => self.walk(0, -1),
            b'j' => self.walk(0, 1),
            b'h' => self.walk(-1, 0),
            b'l' => self.walk(1, 0),
            b'y' => self.walk(-1, -1),
            b'u' => self.walk(1, -1),
            b'b' => self.walk(-1, 1),
            b'n' => self.walk(1, 1),
            b's' => {
                self.message = "You search but find nothing.".into();
                true
            }
            b'>' => {
                if self.hero != self.stairs {
                    self.message = "You can't go down here.".into();
                    false
                } else {
                    self.depth += 1;
                    if self.depth > MAX_DEPTH {
                        self.score += 1000;
                        return Some(EndCause::Escaped);
                    }
                    self.deepest = self.deepest.max(self.depth);
                    self.score += 50;
                    rng.reseed_point();
                    self.new_level(rng);
                    true
                }
            }
            b'Q' => {
                self.prompt = true;
                self.message = "Really quit? [yn] (n)".into();
                false
            }
            27 => false,
            _ => {
                self.message = "Unknown command.".into();
                false
            }
        };

        if took_time { self.tick(rng) } else { None }
    }

    /// Move or attack; returns whether time passed.
    fn walk(&mut self, dx: isize, dy: isize) -> bool {
        let Some(to) = self.hero.step(dx, dy).filter(|&p| self.room.contains_floor(p)) else {
            self.message = "You can't move there.".into();
            return false;
        };
        match self.monster {
            Some(mut m) if m.pos == to => {
                m.hp -= 2;
                if m.hp <= 0 {
                    self.message = "You kill the newt!".into();
                    self.score += 20;
                    self.monster = None;
                } else {
                    self.message = "You hit the newt.".into();
                    self.monster = Some(m);
                }
            }
            _ => self.hero = to,
        }
        true
    }

    fn tick(&mut self, rng: &mut RngStreams) -> Option<EndCause> {
        self.turn += 1;
        self.nutrition -= 1;
        if self.nutrition <= 0 {
            self.message = "You die from starvation.".into();
            return Some(EndCause::Starving);
        }
        if self.nutrition == HUNGRY_AT {
            self.message = "You are beginning to feel hungry.".into();
        }

        if !self.spawn_monsters {
            return None;
        }
        let core = rng.core();
        match self.monster {
            None => {
                if core.gen_range(0..SPAWN_ODDS) == 0 {
                    let pos = self.room.random_floor(core);
                    if pos != self.hero {
                        self.monster = Some(Monster { pos, hp: NEWT_HP });
                    }
                }
            }
            Some(m) if m.pos.is_adjacent(self.hero) => {
                if core.gen_bool(0.5) {
                    self.hp -= core.gen_range(1..=3);
                    self.message = "The newt bites!".into();
                    if self.hp <= 0 {
                        return Some(EndCause::Died);
                    }
                } else {
                    self.message = "The newt misses.".into();
                }
            }
            Some(mut m) => {
                let dx = self.hero.x.cmp(&m.pos.x) as isize;
                let dy = self.hero.y.cmp(&m.pos.y) as isize;
                if let Some(next) = m.pos.step(dx, dy)
                    && next != self.hero
                    && self.room.contains_floor(next)
                {
                    m.pos = next;
                }
                self.monster = Some(m);
            }
        }
        None
    }

    fn cell(&self, p: Pos) -> Cell {
        if p == self.hero {
            return Cell {
                glyph: GLYPH_MON_OFF + HERO_MONNUM,
                ch: b'@',
                color: 15,
                description: b"human valkyrie called Agent",
            };
        }
        if self.monster.is_some_and(|m| m.pos == p) {
            return Cell {
                glyph: GLYPH_MON_OFF + NEWT_MONNUM,
                ch: b':',
                color: 3,
                description: b"newt",
            };
        }
        if p == self.stairs {
            return Cell::feature(Feature::Stairs);
        }
        Cell::feature(self.room.feature(p))
    }

    fn status_lines(&self) -> [String; 2] {
        let hunger = if self.nutrition < HUNGRY_AT {
            " Hungry"
        } else {
            ""
        };
        [
            "Agent the Stripling     St:16 Dx:14 Co:15 In:10 Wi:11 Ch:9 Neutral".to_string(),
            format!(
                "Dlvl:{} $:0 HP:{}({}) Pw:2(2) AC:6 Xp:1/0 T:{}{hunger}",
                self.depth, self.hp, START_HP, self.turn
            ),
        ]
    }

    /// Write every bound channel and queue the terminal image for the trace.
    fn render(&self, host: &mut Host) {
        let screen = self.screen();
        host.record(&screen.to_ansi());

        let mut frame = host.frame();
        self.render_map(&mut frame);
        self.render_status(&mut frame);
        self.render_inventory(&mut frame);
        screen.write_to(&mut frame);
        frame.write_str(MESSAGE, self.message.as_bytes());

        if let Some(cursor) = frame.get(TTY_CURSOR) {
            cursor[0] = (self.hero.y + 1) as u8;
            cursor[1] = self.hero.x as u8;
        }
        if let Some(misc) = frame.get(MISC) {
            misc.copy_from_slice(&[i32::from(self.prompt), 0, 0]);
        }
        if let Some(state) = frame.get(PROGRAM_STATE) {
            // gameover, panicking, exiting, in_moveloop, in_impossible, stopprint
            state.copy_from_slice(&[i32::from(self.over), 0, 0, 1, 0, 0]);
        }
        if let Some(internal) = frame.get(INTERNAL) {
            internal.fill(0);
            internal[0] = self.deepest as i32;
            internal[1] = self.turn as i32;
            internal[2] = self.nutrition as i32;
            internal[3] = i32::from(self.prompt);
        }
    }

    fn render_map(&self, frame: &mut Frame<'_>) {
        let cells: Vec<Cell> = (0..ROWNO)
            .flat_map(|y| (0..MAP_COLS).map(move |x| Pos { x, y }))
            .map(|p| self.cell(p))
            .collect();

        if let Some(glyphs) = frame.get(GLYPHS) {
            for (dst, cell) in glyphs.iter_mut().zip(&cells) {
                *dst = cell.glyph;
            }
        }
        if let Some(chars) = frame.get(CHARS) {
            for (dst, cell) in chars.iter_mut().zip(&cells) {
                *dst = cell.ch;
            }
        }
        if let Some(colors) = frame.get(COLORS) {
            for (dst, cell) in colors.iter_mut().zip(&cells) {
                *dst = cell.color;
            }
        }
        frame.fill(SPECIALS, 0);
        if let Some(descriptions) = frame.get(SCREEN_DESCRIPTIONS) {
            for (dst, cell) in descriptions
                .chunks_exact_mut(NLE_SCREEN_DESCRIPTION_LENGTH)
                .zip(&cells)
            {
                write_cstr(dst, cell.description);
            }
        }
    }

    fn render_status(&self, frame: &mut Frame<'_>) {
        let Some(stats) = frame.get(BLSTATS) else {
            return;
        };
        stats.fill(0);
        stats[bl::NLE_BL_X] = self.hero.x as i64;
        stats[bl::NLE_BL_Y] = self.hero.y as i64;
        stats[bl::NLE_BL_STR25] = 16;
        stats[bl::NLE_BL_STR125] = 16;
        stats[bl::NLE_BL_DEX] = 14;
        stats[bl::NLE_BL_CON] = 15;
        stats[bl::NLE_BL_INT] = 10;
        stats[bl::NLE_BL_WIS] = 11;
        stats[bl::NLE_BL_CHA] = 9;
        stats[bl::NLE_BL_SCORE] = self.score;
        stats[bl::NLE_BL_HP] = self.hp.max(0);
        stats[bl::NLE_BL_HPMAX] = START_HP;
        stats[bl::NLE_BL_DEPTH] = self.depth.min(MAX_DEPTH);
        stats[bl::NLE_BL_ENE] = 2;
        stats[bl::NLE_BL_ENEMAX] = 2;
        stats[bl::NLE_BL_AC] = 6;
        stats[bl::NLE_BL_XP] = 1;
        stats[bl::NLE_BL_TIME] = self.turn;
        stats[bl::NLE_BL_HUNGER] = i64::from(self.nutrition < HUNGRY_AT);
        stats[bl::NLE_BL_DLEVEL] = self.depth.min(MAX_DEPTH);
    }

    fn render_inventory(&self, frame: &mut Frame<'_>) {
        if let Some(glyphs) = frame.get(INV_GLYPHS) {
            glyphs.fill(NO_GLYPH);
            for (dst, item) in glyphs.iter_mut().zip(&self.inventory) {
                *dst = GLYPH_OBJ_OFF + i16::from(item.class);
            }
        }
        if let Some(letters) = frame.get(INV_LETTERS) {
            letters.fill(0);
            for (dst, letter) in letters.iter_mut().zip(inventory_letters()).take(self.inventory.len()) {
                *dst = letter;
            }
        }
        if let Some(classes) = frame.get(INV_OCLASSES) {
            classes.fill(MAXOCLASSES);
            for (dst, item) in classes.iter_mut().zip(&self.inventory) {
                *dst = item.class;
            }
        }
        if let Some(strs) = frame.get(INV_STRS) {
            strs.fill(0);
            for (dst, item) in strs
                .chunks_exact_mut(NLE_INVENTORY_STR_LENGTH)
                .zip(&self.inventory)
            {
                write_cstr(dst, item.name.as_bytes());
            }
        }
    }

    fn screen(&self) -> Screen {
        let mut screen = Screen::blank();
        screen.put_text(0, self.message.as_bytes());
        for y in 0..ROWNO {
            for x in 0..MAP_COLS {
                let cell = self.cell(Pos { x, y });
                screen.put(y + 1, x, cell.ch, cell.color as i8);
            }
        }
        let [top, bottom] = self.status_lines();
        screen.put_text(NLE_TERM_LI - 2, top.as_bytes());
        screen.put_text(NLE_TERM_LI - 1, bottom.as_bytes());
        screen
    }
}

/// `a..z` then `A..Z`, the engine's inventory lettering.
fn inventory_letters() -> impl Iterator<Item = u8> {
    (b'a'..=b'z').chain(b'A'..=b'Z')
}

/// The terminal image.
#[derive(Debug)]
struct Screen {
    chars: Vec<u8>,
    colors: Vec<i8>,
}

impl Screen {
    fn blank() -> Self {
        Self {
            chars: vec![b' '; NLE_TERM_LI * NLE_TERM_CO],
            colors: vec![0; NLE_TERM_LI * NLE_TERM_CO],
        }
    }

    fn put(&mut self, row: usize, col: usize, ch: u8, color: i8) {
        let i = row * NLE_TERM_CO + col;
        self.chars[i] = ch;
        self.colors[i] = color;
    }

    fn put_text(&mut self, row: usize, text: &[u8]) {
        for (col, &ch) in text.iter().take(NLE_TERM_CO).enumerate() {
            self.put(row, col, ch, 7);
        }
    }

    fn write_to(&self, frame: &mut Frame<'_>) {
        if let Some(chars) = frame.get(TTY_CHARS) {
            chars.copy_from_slice(&self.chars);
        }
        if let Some(colors) = frame.get(TTY_COLORS) {
            colors.copy_from_slice(&self.colors);
        }
    }

    /// Home, clear, then every row with trailing blanks trimmed.
    fn to_ansi(&self) -> Vec<u8> {
        let mut out = b"\x1b[H\x1b[2J".to_vec();
        for row in self.chars.chunks_exact(NLE_TERM_CO) {
            let end = row.iter().rposition(|&c| c != b' ').map_or(0, |i| i + 1);
            out.extend_from_slice(&row[..end]);
            out.extend_from_slice(b"\r\n");
        }
        out
    }
}

impl Simulation for DemoGame {
    fn run(&mut self, host: &mut Host) -> Result<EndCause, Interrupted> {
        self.new_level(host.rng());
        self.message = "Hello Agent, welcome to the demo dungeon!".into();

        loop {
            self.render(host);
            let request = InputRequest {
                in_normal_game: !self.prompt,
            };
            let action = host.wait_for_input(request)?;
            self.message.clear();

            if let Some(how) = self.act(action, host.rng()) {
                self.over = true;
                if self.message.is_empty() {
                    self.message = format!("Goodbye Agent... ({how})");
                }
                self.render(host);
                tracing::debug!(%how, turn = self.turn, depth = self.depth, "demo episode over");
                return Ok(how);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::Seeds;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn game() -> DemoGame {
        let mut g = DemoGame::new(&Settings::default());
        let mut rng = RngStreams::new(&Seeds::new(1, 2, false));
        g.new_level(&mut rng);
        g
    }

    #[test]
    fn test_room_fits_map() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..500 {
            let room = Room::generate(&mut rng);
            assert!(room.left >= 1);
            assert!(room.right < MAP_COLS - 1);
            assert!(room.top >= 1);
            assert!(room.bottom < ROWNO - 1);
        }
    }

    #[test]
    fn test_level_layout_is_seeded() {
        let a = game();
        let b = game();
        assert_eq!(a.hero, b.hero);
        assert_eq!(a.stairs, b.stairs);
        assert_ne!(a.hero, a.stairs);
        assert!(a.room.contains_floor(a.hero));
    }

    #[test]
    fn test_walls_block_movement() {
        let mut g = game();
        let mut rng = RngStreams::new(&Seeds::new(1, 2, false));
        g.hero = Pos {
            x: g.room.left + 1,
            y: g.room.top + 1,
        };
        let turn = g.turn;
        assert_eq!(g.act(i32::from(b'h'), &mut rng), None);
        assert_eq!(g.turn, turn);
        assert_eq!(g.message, "You can't move there.");
    }

    #[test]
    fn test_quit_prompt() {
        let mut g = game();
        let mut rng = RngStreams::new(&Seeds::new(1, 2, false));
        assert_eq!(g.act(i32::from(b'Q'), &mut rng), None);
        assert!(g.prompt);
        assert_eq!(g.act(i32::from(b'n'), &mut rng), None);
        assert!(!g.prompt);
        g.act(i32::from(b'Q'), &mut rng);
        assert_eq!(g.act(i32::from(b'y'), &mut rng), Some(EndCause::Quit));
    }

    #[test]
    fn test_starvation() {
        let mut g = game();
        g.spawn_monsters = false;
        let mut rng = RngStreams::new(&Seeds::new(1, 2, false));
        let mut end = None;
        for _ in 0..START_NUTRITION {
            end = g.act(i32::from(b's'), &mut rng);
            if end.is_some() {
                break;
            }
        }
        assert_eq!(end, Some(EndCause::Starving));
    }

    #[test]
    fn test_descending_past_bottom_escapes() {
        let mut g = game();
        g.spawn_monsters = false;
        let mut rng = RngStreams::new(&Seeds::new(1, 2, true));
        for depth in 2..=MAX_DEPTH {
            g.hero = g.stairs;
            assert_eq!(g.act(i32::from(b'>'), &mut rng), None);
            assert_eq!(g.depth, depth);
        }
        g.hero = g.stairs;
        assert_eq!(g.act(i32::from(b'>'), &mut rng), Some(EndCause::Escaped));
    }

    #[test]
    fn test_wizkit_items_join_inventory() {
        let mut settings = Settings::default();
        settings
            .set_wizkit("wand of digging\nblessed scroll of enchant armor")
            .unwrap();
        let g = DemoGame::new(&settings);
        assert_eq!(g.inventory.len(), 4);
        assert_eq!(g.inventory[2].class, 10);
        assert_eq!(g.inventory[3].class, 8);
    }

    #[test]
    fn test_screen_has_status_lines() {
        let g = game();
        let ansi = String::from_utf8(g.screen().to_ansi()).unwrap();
        assert!(ansi.contains("Dlvl:1"));
        assert!(ansi.contains('@'));
    }

    #[test]
    fn test_loader_requires_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            DemoLoader.load(dir.path()),
            Err(LoadError::Invalid(_))
        ));
        assert!(matches!(
            DemoLoader.load(&dir.path().join("missing.so")),
            Err(LoadError::Io(_))
        ));
        let file = dir.path().join("libdemo.so");
        fs::write(&file, b"").unwrap();
        assert_eq!(DemoLoader.load(&file).unwrap().name(), "demo");
    }
}
