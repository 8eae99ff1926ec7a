//! Seed controller and the random streams a simulation draws from.
//!
//! Two seed categories exist: the core/display pair and the optional
//! level-generation seed. Seeds set before an episode are pending and are
//! consumed by exactly the next `start`/`reset`; afterwards they are reported
//! as active until a new value replaces them.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

/// Seed values for one episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Seeds {
    /// Core (gameplay) RNG seed.
    pub core: u64,
    /// Display/cosmetic RNG seed.
    pub disp: u64,
    /// Re-derive auxiliary streams from the core stream at reseed points.
    pub reseed: bool,
    /// Level-generation seed; `None` leaves generation on the core stream.
    #[serde(default)]
    pub lgen: Option<u64>,
}

impl Seeds {
    /// Seeds with no level-generation seed.
    #[must_use]
    pub const fn new(core: u64, disp: u64, reseed: bool) -> Self {
        Self {
            core,
            disp,
            reseed,
            lgen: None,
        }
    }

    /// Same seeds with a level-generation seed.
    #[must_use]
    pub const fn with_lgen(mut self, lgen: Option<u64>) -> Self {
        self.lgen = lgen;
        self
    }

    /// `(core, disp, reseed, lgen)`, the shape bindings report.
    #[must_use]
    pub const fn as_tuple(&self) -> (u64, u64, bool, Option<u64>) {
        (self.core, self.disp, self.reseed, self.lgen)
    }

    /// Fresh core and display seeds from OS entropy.
    #[must_use]
    pub fn from_entropy(reseed: bool) -> Self {
        let mut rng = rand::thread_rng();
        Self::new(rng.next_u64(), rng.next_u64(), reseed)
    }
}

/// State of one seed category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedSlot<T> {
    /// Nothing set; the next episode draws its own value.
    #[default]
    Unset,
    /// Set but not yet consumed by an episode start.
    Pending(T),
    /// In effect for the current episode.
    Active(T),
}

impl<T: Copy> SeedSlot<T> {
    /// The value, whether pending or active.
    #[must_use]
    pub fn value(&self) -> Option<T> {
        match *self {
            SeedSlot::Unset => None,
            SeedSlot::Pending(v) | SeedSlot::Active(v) => Some(v),
        }
    }

    /// Whether a value waits for the next episode.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, SeedSlot::Pending(_))
    }

    /// Take a pending value, marking it active.
    fn consume(&mut self) -> Option<T> {
        if let SeedSlot::Pending(v) = *self {
            *self = SeedSlot::Active(v);
            Some(v)
        } else {
            None
        }
    }
}

/// Pending/active seed bookkeeping for one session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeedController {
    pair: SeedSlot<(u64, u64, bool)>,
    lgen: SeedSlot<u64>,
    current: Option<Seeds>,
}

impl SeedController {
    /// A controller with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue seeds for the next episode start.
    ///
    /// `lgen = None` leaves the generation category unset; it is not an
    /// error even when `reseed` is requested.
    pub fn set_initial(&mut self, seeds: Seeds) {
        self.pair = SeedSlot::Pending((seeds.core, seeds.disp, seeds.reseed));
        self.lgen = match seeds.lgen {
            Some(v) => SeedSlot::Pending(v),
            None => SeedSlot::Unset,
        };
    }

    /// Decide the seeds of a new episode, consuming whatever is pending.
    ///
    /// A category with nothing pending falls back to fresh entropy (core
    /// pair, keeping the last reseed flag) or to "disabled" (generation).
    pub fn begin_episode(&mut self) -> Seeds {
        let reseed = self.current.is_some_and(|s| s.reseed);
        let (core, disp, reseed) = self.pair.consume().unwrap_or_else(|| {
            let fresh = Seeds::from_entropy(reseed);
            (fresh.core, fresh.disp, fresh.reseed)
        });
        let lgen = self.lgen.consume();
        if lgen.is_none() {
            self.lgen = SeedSlot::Unset;
        }
        let seeds = Seeds {
            core,
            disp,
            reseed,
            lgen,
        };
        tracing::debug!(core, disp, reseed, ?lgen, "episode seeds chosen");
        self.current = Some(seeds);
        seeds
    }

    /// Record seeds applied to a running episode.
    ///
    /// Clears anything pending; the new values are already in effect.
    pub fn set_live(&mut self, seeds: Seeds) {
        self.pair = SeedSlot::Active((seeds.core, seeds.disp, seeds.reseed));
        self.lgen = match seeds.lgen {
            Some(v) => SeedSlot::Active(v),
            None => SeedSlot::Unset,
        };
        self.current = Some(seeds);
    }

    /// Seeds in effect for the current episode, if one has begun.
    #[must_use]
    pub fn current(&self) -> Option<Seeds> {
        self.current
    }

    /// Whether any category waits for the next episode.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pair.is_pending() || self.lgen.is_pending()
    }

    /// State of the core/display pair.
    #[must_use]
    pub fn pair_slot(&self) -> SeedSlot<(u64, u64, bool)> {
        self.pair
    }

    /// State of the generation seed.
    #[must_use]
    pub fn lgen_slot(&self) -> SeedSlot<u64> {
        self.lgen
    }
}

/// Parse a textual generation seed.
///
/// Empty text, `none` (any case) and anything that is not an unsigned
/// 64-bit integer disable the category instead of failing.
#[must_use]
pub fn parse_generation_seed(text: &str) -> Option<u64> {
    let text = text.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("none") {
        return None;
    }
    text.parse().ok()
}

/// The random streams a running simulation draws from.
#[derive(Debug, Clone)]
pub struct RngStreams {
    core: StdRng,
    disp: StdRng,
    lgen: Option<StdRng>,
    reseed: bool,
}

impl RngStreams {
    /// Streams seeded from `seeds`.
    #[must_use]
    pub fn new(seeds: &Seeds) -> Self {
        Self {
            core: StdRng::seed_from_u64(seeds.core),
            disp: StdRng::seed_from_u64(seeds.disp),
            lgen: seeds.lgen.map(StdRng::seed_from_u64),
            reseed: seeds.reseed,
        }
    }

    /// Replace every stream with ones seeded from `seeds`.
    pub fn apply(&mut self, seeds: &Seeds) {
        *self = Self::new(seeds);
    }

    /// Gameplay stream.
    pub fn core(&mut self) -> &mut StdRng {
        &mut self.core
    }

    /// Cosmetic stream.
    pub fn display(&mut self) -> &mut StdRng {
        &mut self.disp
    }

    /// Level-generation stream, or the core stream when no generation seed
    /// is in effect.
    pub fn level_gen(&mut self) -> &mut StdRng {
        match self.lgen.as_mut() {
            Some(rng) => rng,
            None => &mut self.core,
        }
    }

    /// Whether a dedicated generation stream exists.
    #[must_use]
    pub fn has_level_gen(&self) -> bool {
        self.lgen.is_some()
    }

    /// Whether auxiliary streams are re-derived at reseed points.
    #[must_use]
    pub fn reseeds(&self) -> bool {
        self.reseed
    }

    /// Called by the simulation at natural reseed points (e.g. level
    /// change). With `reseed` set the display stream is re-derived from the
    /// core stream; otherwise nothing happens.
    pub fn reseed_point(&mut self) {
        if self.reseed {
            let next = self.core.r#gen::<u64>();
            self.disp = StdRng::seed_from_u64(next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_seed_consumed_once() {
        let mut ctl = SeedController::new();
        ctl.set_initial(Seeds::new(1, 2, true));
        assert!(ctl.is_pending());

        let first = ctl.begin_episode();
        assert_eq!(first.as_tuple(), (1, 2, true, None));
        assert!(!ctl.is_pending());
        assert_eq!(ctl.pair_slot(), SeedSlot::Active((1, 2, true)));
        assert_eq!(ctl.current(), Some(first));

        let second = ctl.begin_episode();
        assert_ne!((second.core, second.disp), (1, 2));
        assert!(second.reseed);
    }

    #[test]
    fn test_generation_seed_is_one_shot() {
        let mut ctl = SeedController::new();
        ctl.set_initial(Seeds::new(5, 6, false).with_lgen(Some(77)));
        assert_eq!(ctl.begin_episode().lgen, Some(77));
        assert_eq!(ctl.lgen_slot(), SeedSlot::Active(77));
        assert_eq!(ctl.begin_episode().lgen, None);
        assert_eq!(ctl.lgen_slot(), SeedSlot::Unset);
    }

    #[test]
    fn test_reseed_with_unset_generation_seed_disables_it() {
        let mut ctl = SeedController::new();
        ctl.set_initial(Seeds::new(1, 2, true));
        let seeds = ctl.begin_episode();
        assert!(seeds.reseed);
        assert_eq!(seeds.lgen, None);
    }

    #[test]
    fn test_set_live_replaces_current() {
        let mut ctl = SeedController::new();
        ctl.set_initial(Seeds::new(1, 2, false));
        ctl.begin_episode();
        ctl.set_live(Seeds::new(9, 8, true).with_lgen(Some(3)));
        assert_eq!(ctl.current().unwrap().as_tuple(), (9, 8, true, Some(3)));
        assert!(!ctl.is_pending());
    }

    #[test]
    fn test_parse_generation_seed() {
        assert_eq!(parse_generation_seed("42"), Some(42));
        assert_eq!(parse_generation_seed(" 7 "), Some(7));
        assert_eq!(parse_generation_seed("none"), None);
        assert_eq!(parse_generation_seed("None"), None);
        assert_eq!(parse_generation_seed(""), None);
        assert_eq!(parse_generation_seed("-1"), None);
        assert_eq!(parse_generation_seed("abc"), None);
    }

    #[test]
    fn test_streams_are_deterministic() {
        let seeds = Seeds::new(1, 2, false);
        let mut a = RngStreams::new(&seeds);
        let mut b = RngStreams::new(&seeds);
        for _ in 0..16 {
            assert_eq!(a.core().next_u64(), b.core().next_u64());
            assert_eq!(a.display().next_u64(), b.display().next_u64());
        }
    }

    #[test]
    fn test_level_gen_falls_back_to_core() {
        let seeds = Seeds::new(11, 12, false);
        let mut with_core = RngStreams::new(&seeds);
        let mut reference = StdRng::seed_from_u64(11);
        assert!(!with_core.has_level_gen());
        assert_eq!(with_core.level_gen().next_u64(), reference.next_u64());

        let mut with_lgen = RngStreams::new(&seeds.with_lgen(Some(99)));
        let mut reference = StdRng::seed_from_u64(99);
        assert!(with_lgen.has_level_gen());
        assert_eq!(with_lgen.level_gen().next_u64(), reference.next_u64());
    }

    #[test]
    fn test_reseed_point_only_moves_display_when_enabled() {
        let mut off = RngStreams::new(&Seeds::new(1, 2, false));
        let mut plain = StdRng::seed_from_u64(2);
        off.reseed_point();
        assert_eq!(off.display().next_u64(), plain.next_u64());

        let mut on = RngStreams::new(&Seeds::new(1, 2, true));
        let mut plain = StdRng::seed_from_u64(2);
        on.reseed_point();
        assert_ne!(on.display().next_u64(), plain.next_u64());
    }
}
