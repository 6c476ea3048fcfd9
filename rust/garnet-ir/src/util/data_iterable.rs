//! Typed, filterable views over a set of labelled edges.
//!
//! A [`DataIterable`] borrows an edge collection and yields the data attached
//! to one end of every edge whose kind matches a discriminator (or, when
//! negated, every edge whose kind does not). Nothing is buffered: each call to
//! [`DataIterable::iter`] starts a fresh pass over the underlying collection.

use serde::Serialize;

/// A directed edge between two data items, tagged with a kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Edge<D, K> {
    pub source: D,
    pub destination: D,
    pub kind: K,
}

impl<D, K> Edge<D, K> {
    pub fn new(source: D, destination: D, kind: K) -> Self {
        Self { source, destination, kind }
    }

    pub fn end(&self, end: EdgeEnd) -> &D {
        match end {
            EdgeEnd::Source => &self.source,
            EdgeEnd::Destination => &self.destination,
        }
    }
}

/// Which end of an edge a view yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeEnd {
    Source,
    Destination,
}

/// A restartable filtered view over `edges`.
///
/// `C` is any collection whose shared reference iterates `&Edge<D, K>`
/// (`Vec`, slices, `BTreeSet`, `HashSet`, ...).
#[derive(Debug, Clone)]
pub struct DataIterable<'a, C: ?Sized, K> {
    edges: &'a C,
    kind: K,
    negate: bool,
    end: EdgeEnd,
}

impl<'a, C: ?Sized, K> DataIterable<'a, C, K> {
    pub fn new(edges: &'a C, kind: K) -> Self {
        Self::with_negate(edges, kind, false)
    }

    pub fn with_negate(edges: &'a C, kind: K, negate: bool) -> Self {
        Self {
            edges,
            kind,
            negate,
            end: EdgeEnd::Destination,
        }
    }

    /// Yield edge sources instead of destinations.
    pub fn from_sources(mut self) -> Self {
        self.end = EdgeEnd::Source;
        self
    }

    pub fn iter<'s, D>(&'s self) -> DataIter<'s, <&'a C as IntoIterator>::IntoIter, K>
    where
        &'a C: IntoIterator<Item = &'a Edge<D, K>>,
        D: 'a,
        K: 'a,
    {
        DataIter {
            inner: self.edges.into_iter(),
            kind: &self.kind,
            negate: self.negate,
            end: self.end,
        }
    }
}

impl<'s, 'a, C: ?Sized, D, K> IntoIterator for &'s DataIterable<'a, C, K>
where
    &'a C: IntoIterator<Item = &'a Edge<D, K>>,
    D: 'a,
    K: PartialEq + 'a,
{
    type Item = &'a D;
    type IntoIter = DataIter<'s, <&'a C as IntoIterator>::IntoIter, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One pass over a [`DataIterable`].
#[derive(Debug)]
pub struct DataIter<'s, I, K> {
    inner: I,
    kind: &'s K,
    negate: bool,
    end: EdgeEnd,
}

impl<'s, 'a, I, D, K> Iterator for DataIter<'s, I, K>
where
    I: Iterator<Item = &'a Edge<D, K>>,
    D: 'a,
    K: PartialEq + 'a,
{
    type Item = &'a D;

    fn next(&mut self) -> Option<&'a D> {
        let (kind, negate, end) = (self.kind, self.negate, self.end);
        self.inner
            .by_ref()
            .find(|edge| (edge.kind == *kind) != negate)
            .map(|edge| edge.end(end))
    }
}
