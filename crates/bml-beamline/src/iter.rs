//! Shallow and deep traversal of a [`Beamline`].
//!
//! Every iterator yields cloned [`ElmPtr`] handles and holds no
//! `RefCell` borrow between steps, so elements may be edited through
//! the yielded handles while iterating. Deep iterators descend into
//! nested lines and yield leaves only; empty nested lines contribute
//! nothing.

use crate::beamline::Beamline;
use crate::element::ElmPtr;

/// Top-level handles, first to last.
#[derive(Clone, Debug)]
pub struct ForwardIter<'a> {
    elements: &'a [ElmPtr],
    next: usize,
}

impl<'a> ForwardIter<'a> {
    /// Start at the first element of `line`.
    pub fn new(line: &'a Beamline) -> Self {
        Self {
            elements: line.elements(),
            next: 0,
        }
    }

    /// Return to the first element.
    pub fn reset(&mut self) {
        self.next = 0;
    }

    /// Step back `n` elements, stopping at the first.
    pub fn go_back(&mut self, n: usize) {
        self.next = self.next.saturating_sub(n);
    }
}

impl Iterator for ForwardIter<'_> {
    type Item = ElmPtr;

    fn next(&mut self) -> Option<ElmPtr> {
        let e = self.elements.get(self.next)?.clone();
        self.next += 1;
        Some(e)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.elements.len().saturating_sub(self.next);
        (n, Some(n))
    }
}

impl ExactSizeIterator for ForwardIter<'_> {}

/// Top-level handles, last to first.
#[derive(Clone, Debug)]
pub struct ReverseIter<'a> {
    elements: &'a [ElmPtr],
    taken: usize,
}

impl<'a> ReverseIter<'a> {
    /// Start at the last element of `line`.
    pub fn new(line: &'a Beamline) -> Self {
        Self {
            elements: line.elements(),
            taken: 0,
        }
    }

    /// Return to the last element.
    pub fn reset(&mut self) {
        self.taken = 0;
    }

    /// Step back `n` elements (downstream), stopping at the last.
    pub fn go_back(&mut self, n: usize) {
        self.taken = self.taken.saturating_sub(n);
    }
}

impl Iterator for ReverseIter<'_> {
    type Item = ElmPtr;

    fn next(&mut self) -> Option<ElmPtr> {
        let i = self.elements.len().checked_sub(self.taken + 1)?;
        self.taken += 1;
        Some(self.elements[i].clone())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.elements.len().saturating_sub(self.taken);
        (n, Some(n))
    }
}

impl ExactSizeIterator for ReverseIter<'_> {}

// ── Deep traversal ──────────────────────────────────────────────

#[derive(Clone, Debug)]
enum Level<'a> {
    Root(&'a [ElmPtr]),
    Nested(ElmPtr),
}

#[derive(Clone, Debug)]
struct Cursor<'a> {
    level: Level<'a>,
    taken: usize,
}

impl<'a> Cursor<'a> {
    fn len(&self) -> usize {
        match &self.level {
            Level::Root(s) => s.len(),
            Level::Nested(h) => h.borrow().as_line().map_or(0, Beamline::how_many),
        }
    }

    fn child(&self, i: usize) -> Option<ElmPtr> {
        match &self.level {
            Level::Root(s) => s.get(i).cloned(),
            Level::Nested(h) => h.borrow().as_line().and_then(|l| l.get(i).cloned()),
        }
    }

    fn advance(&mut self, reverse: bool) -> Option<ElmPtr> {
        let len = self.len();
        if self.taken >= len {
            return None;
        }
        let i = if reverse { len - 1 - self.taken } else { self.taken };
        self.taken += 1;
        self.child(i)
    }
}

#[derive(Clone, Debug)]
struct Walker<'a> {
    root: &'a [ElmPtr],
    stack: Vec<Cursor<'a>>,
    reverse: bool,
}

impl<'a> Walker<'a> {
    fn new(line: &'a Beamline, reverse: bool) -> Self {
        let mut w = Self {
            root: line.elements(),
            stack: Vec::new(),
            reverse,
        };
        w.reset();
        w
    }

    fn reset(&mut self) {
        self.stack.clear();
        self.stack.push(Cursor {
            level: Level::Root(self.root),
            taken: 0,
        });
    }

    fn next_leaf(&mut self) -> Option<ElmPtr> {
        loop {
            let top = self.stack.last_mut()?;
            let Some(child) = top.advance(self.reverse) else {
                self.stack.pop();
                continue;
            };
            if child.is_line() {
                self.stack.push(Cursor {
                    level: Level::Nested(child),
                    taken: 0,
                });
                continue;
            }
            return Some(child);
        }
    }
}

/// Leaves at every nesting level, first to last.
#[derive(Clone, Debug)]
pub struct DeepIter<'a>(Walker<'a>);

impl<'a> DeepIter<'a> {
    /// Start before the first leaf of `line`.
    pub fn new(line: &'a Beamline) -> Self {
        Self(Walker::new(line, false))
    }

    /// Return to the first leaf.
    pub fn reset(&mut self) {
        self.0.reset();
    }
}

impl Iterator for DeepIter<'_> {
    type Item = ElmPtr;

    fn next(&mut self) -> Option<ElmPtr> {
        self.0.next_leaf()
    }
}

/// Leaves at every nesting level, last to first.
#[derive(Clone, Debug)]
pub struct DeepReverseIter<'a>(Walker<'a>);

impl<'a> DeepReverseIter<'a> {
    /// Start after the last leaf of `line`.
    pub fn new(line: &'a Beamline) -> Self {
        Self(Walker::new(line, true))
    }

    /// Return to the last leaf.
    pub fn reset(&mut self) {
        self.0.reset();
    }
}

impl Iterator for DeepReverseIter<'_> {
    type Item = ElmPtr;

    fn next(&mut self) -> Option<ElmPtr> {
        self.0.next_leaf()
    }
}
