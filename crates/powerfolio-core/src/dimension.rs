//! Named axes and the label sets that index them.
//!
//! Every array in a model build (parameters, variable grids, constraint rows)
//! is aligned through the same [`Coordinates`]: one [`Index`] per
//! [`Dimension`], shared by everyone. A [`Shape`] is an ordered subset of
//! those axes, and a [`Point`] addresses one cell of any shape by holding a
//! position per axis. Positions for axes a shape does not use are ignored,
//! which is what lets a per-generator scalar and a per-(scenario, time,
//! generator) profile be read with the same point.

use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A named axis of the model.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Scenario,
    Time,
    Generator,
    Battery,
    Load,
    Market,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Scenario,
        Dimension::Time,
        Dimension::Generator,
        Dimension::Battery,
        Dimension::Load,
        Dimension::Market,
    ];

    pub fn ordinal(self) -> usize {
        match self {
            Dimension::Scenario => 0,
            Dimension::Time => 1,
            Dimension::Generator => 2,
            Dimension::Battery => 3,
            Dimension::Load => 4,
            Dimension::Market => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Scenario => "scenario",
            Dimension::Time => "time",
            Dimension::Generator => "generator",
            Dimension::Battery => "battery",
            Dimension::Load => "load",
            Dimension::Market => "market",
        }
    }

    /// True for the axes that enumerate portfolio members.
    pub fn is_asset(self) -> bool {
        !matches!(self, Dimension::Scenario | Dimension::Time)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered, unique labels for exactly one axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    dimension: Dimension,
    labels: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Index {
    /// Fails with [`ModelError::DuplicateLabel`] on the first repeated label.
    pub fn new<I, S>(dimension: Dimension, labels: I) -> ModelResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut positions = HashMap::new();
        let mut ordered = Vec::new();
        for label in labels {
            let label = label.into();
            if positions.insert(label.clone(), ordered.len()).is_some() {
                return Err(ModelError::DuplicateLabel { dimension, label });
            }
            ordered.push(label);
        }
        Ok(Self {
            dimension,
            labels: ordered,
            positions,
        })
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, position: usize) -> Option<&str> {
        self.labels.get(position).map(String::as_str)
    }

    pub fn position(&self, label: &str) -> Option<usize> {
        self.positions.get(label).copied()
    }

    /// Like [`Index::position`] but reports a miss as [`ModelError::UnknownLabel`].
    pub fn require(&self, label: &str) -> ModelResult<usize> {
        self.position(label).ok_or_else(|| ModelError::UnknownLabel {
            dimension: self.dimension,
            label: label.to_string(),
        })
    }
}

/// A cell address: at most one position per axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point {
    slots: [Option<usize>; 6],
}

impl Point {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, dimension: Dimension, position: usize) -> Self {
        self.slots[dimension.ordinal()] = Some(position);
        self
    }

    pub fn set(&mut self, dimension: Dimension, position: usize) {
        self.slots[dimension.ordinal()] = Some(position);
    }

    pub fn get(&self, dimension: Dimension) -> Option<usize> {
        self.slots[dimension.ordinal()]
    }

    /// Position on `dimension`, or 0 when the point does not carry that axis.
    pub fn position(&self, dimension: Dimension) -> usize {
        self.get(dimension).unwrap_or(0)
    }
}

/// Ordered axes and their sizes; values laid out row-major.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Shape {
    dims: Vec<Dimension>,
    sizes: Vec<usize>,
}

impl Shape {
    /// Zero-dimensional shape holding a single value.
    pub fn scalar() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: &[(Dimension, usize)]) -> Self {
        Self {
            dims: pairs.iter().map(|(d, _)| *d).collect(),
            sizes: pairs.iter().map(|(_, n)| *n).collect(),
        }
    }

    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn size_of(&self, dimension: Dimension) -> Option<usize> {
        self.dims
            .iter()
            .position(|d| *d == dimension)
            .map(|i| self.sizes[i])
    }

    pub fn contains(&self, dimension: Dimension) -> bool {
        self.dims.contains(&dimension)
    }

    pub fn len(&self) -> usize {
        self.sizes.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat row-major offset of `point`, or `None` when the point lacks one of
    /// this shape's axes or lies outside it.
    pub fn offset(&self, point: &Point) -> Option<usize> {
        let mut offset = 0;
        for (dim, size) in self.dims.iter().zip(&self.sizes) {
            let pos = point.get(*dim)?;
            if pos >= *size {
                return None;
            }
            offset = offset * size + pos;
        }
        Some(offset)
    }

    /// Inverse of [`Shape::offset`].
    pub fn point_at(&self, mut offset: usize) -> Point {
        let mut point = Point::new();
        for (dim, size) in self.dims.iter().zip(&self.sizes).rev() {
            point.set(*dim, offset % size);
            offset /= size;
        }
        point
    }

    /// All cells in row-major order.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        (0..self.len()).map(move |offset| self.point_at(offset))
    }
}

/// The single source of truth for every axis in one build.
#[derive(Debug, Clone, Default)]
pub struct Coordinates {
    indexes: BTreeMap<Dimension, Index>,
}

impl Coordinates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an axis; a second index for the same dimension is rejected.
    pub fn insert(&mut self, index: Index) -> ModelResult<()> {
        let dimension = index.dimension();
        if self.indexes.contains_key(&dimension) {
            return Err(ModelError::DuplicateDimension(dimension));
        }
        self.indexes.insert(dimension, index);
        Ok(())
    }

    pub fn get(&self, dimension: Dimension) -> Option<&Index> {
        self.indexes.get(&dimension)
    }

    pub fn index(&self, dimension: Dimension) -> ModelResult<&Index> {
        self.get(dimension)
            .ok_or(ModelError::MissingAssetClass(dimension))
    }

    /// True when the axis exists and has at least one label.
    pub fn has(&self, dimension: Dimension) -> bool {
        self.get(dimension).is_some_and(|index| !index.is_empty())
    }

    pub fn len(&self, dimension: Dimension) -> usize {
        self.get(dimension).map_or(0, Index::len)
    }

    pub fn label(&self, dimension: Dimension, position: usize) -> &str {
        self.get(dimension)
            .and_then(|index| index.label(position))
            .unwrap_or("")
    }

    pub fn shape(&self, dims: &[Dimension]) -> ModelResult<Shape> {
        let mut pairs = Vec::with_capacity(dims.len());
        for dim in dims {
            pairs.push((*dim, self.index(*dim)?.len()));
        }
        Ok(Shape::from_pairs(&pairs))
    }

    /// `{dimension -> labels}` for every registered axis.
    pub fn coordinates(&self) -> BTreeMap<Dimension, Vec<String>> {
        self.indexes
            .iter()
            .map(|(dim, index)| (*dim, index.labels().to_vec()))
            .collect()
    }

    /// Human-readable `label,label,...` for a point over the given axes.
    pub fn describe(&self, dims: &[Dimension], point: &Point) -> String {
        dims.iter()
            .map(|dim| self.label(*dim, point.position(*dim)))
            .collect::<Vec<_>>()
            .join(",")
    }
}
