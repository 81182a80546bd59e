// Macrokb Mode
// Named bind registry partitioned by gesture phase

use crate::bind::Bind;
use crate::phase::Phase;

/// A named set of binds for one keyboard.
///
/// Within each phase list, registration order is priority: the first bind
/// whose combination matches wins.
#[derive(Debug, Clone)]
pub struct Mode {
    name: String,
    down_binds: Vec<Bind>,
    hold_binds: Vec<Bind>,
    up_binds: Vec<Bind>,
    /// Index into `hold_binds` of the last matched hold bind
    hold_cache: Option<usize>,
}

impl Mode {
    /// Create a new empty Mode
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            down_binds: Vec::new(),
            hold_binds: Vec::new(),
            up_binds: Vec::new(),
            hold_cache: None,
        }
    }

    /// Get the name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_bind_down(&mut self, bind: Bind) {
        self.down_binds.push(bind);
    }

    pub fn add_bind_hold(&mut self, bind: Bind) {
        self.hold_binds.push(bind);
    }

    pub fn add_bind_up(&mut self, bind: Bind) {
        self.up_binds.push(bind);
    }

    /// Register a bind for the given phase
    pub fn add_bind(&mut self, phase: Phase, bind: Bind) {
        match phase {
            Phase::Down => self.add_bind_down(bind),
            Phase::Hold => self.add_bind_hold(bind),
            Phase::Up => self.add_bind_up(bind),
        }
    }

    /// Binds registered for a phase, in priority order
    pub fn binds(&self, phase: Phase) -> &[Bind] {
        match phase {
            Phase::Down => &self.down_binds,
            Phase::Hold => &self.hold_binds,
            Phase::Up => &self.up_binds,
        }
    }

    pub fn check_down<K: AsRef<str>>(&self, candidate: &[K]) -> Option<&Bind> {
        first_match(&self.down_binds, candidate)
    }

    pub fn check_up<K: AsRef<str>>(&self, candidate: &[K]) -> Option<&Bind> {
        first_match(&self.up_binds, candidate)
    }

    /// Look up a hold bind, trying the last matched one first.
    ///
    /// The cache is only a shortcut: a stale entry costs one extra match
    /// attempt before the full scan, never a different result.
    pub fn check_hold<K: AsRef<str>>(&mut self, candidate: &[K]) -> Option<&Bind> {
        if let Some(index) = self.hold_cache {
            if self.hold_binds[index].matches(candidate) {
                return Some(&self.hold_binds[index]);
            }
        }

        let index = self.hold_binds.iter().position(|b| b.matches(candidate))?;
        self.hold_cache = Some(index);
        Some(&self.hold_binds[index])
    }

    /// Phase-dispatching lookup
    pub fn check<K: AsRef<str>>(&mut self, phase: Phase, candidate: &[K]) -> Option<&Bind> {
        match phase {
            Phase::Down => self.check_down(candidate),
            Phase::Hold => self.check_hold(candidate),
            Phase::Up => self.check_up(candidate),
        }
    }

    /// The cached hold bind, if any
    pub fn cached_hold(&self) -> Option<&Bind> {
        self.hold_cache.map(|index| &self.hold_binds[index])
    }
}

fn first_match<'a, K: AsRef<str>>(binds: &'a [Bind], candidate: &[K]) -> Option<&'a Bind> {
    binds.iter().find(|b| b.matches(candidate))
}
