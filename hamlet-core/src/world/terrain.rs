//! Terrain kinds, their static attributes and the one-shot grid generator.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::rng::roll;
use crate::types::ResourceKind;

/// A terrain cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    /// Open grass.
    Grass,
    /// Impassable mountain.
    Mountain,
    /// Impassable water.
    Water,
    /// Forest.
    Forest,
    /// A house.
    House,
    /// Farmland.
    Farmland,
}

impl Terrain {
    /// Whether a character may stand here.
    #[must_use]
    pub fn is_walkable(self) -> bool {
        !matches!(self, Self::Mountain | Self::Water)
    }

    /// The need-satisfying resource this cell offers, if any.
    #[must_use]
    pub fn resource(self) -> Option<ResourceKind> {
        match self {
            Self::Grass | Self::Farmland => Some(ResourceKind::Food),
            Self::Water => Some(ResourceKind::Water),
            Self::House => Some(ResourceKind::Shelter),
            Self::Mountain | Self::Forest => None,
        }
    }

    /// Whether this cell satisfies a search for `kind`.
    #[must_use]
    pub fn provides(self, kind: ResourceKind) -> bool {
        self.resource() == Some(kind)
    }

    /// Lowercase label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Grass => "grass",
            Self::Mountain => "mountain",
            Self::Water => "water",
            Self::Forest => "forest",
            Self::House => "house",
            Self::Farmland => "farmland",
        }
    }
}

impl fmt::Display for Terrain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Interior mix as cumulative thresholds:
/// water 5%, farmland 3%, grass 25%, house 6%, forest 36%, mountain 25%.
const INTERIOR: [(f64, Terrain); 5] = [
    (0.05, Terrain::Water),
    (0.08, Terrain::Farmland),
    (0.33, Terrain::Grass),
    (0.39, Terrain::House),
    (0.75, Terrain::Forest),
];

const BORDER: [(f64, Terrain); 2] = [(0.4, Terrain::Mountain), (0.7, Terrain::Forest)];

const CORRIDOR: [(f64, Terrain); 3] = [
    (0.4, Terrain::Grass),
    (0.7, Terrain::Forest),
    (0.8, Terrain::Farmland),
];

fn pick(table: &[(f64, Terrain)], fallback: Terrain, r: f64) -> Terrain {
    table
        .iter()
        .find(|(threshold, _)| r < *threshold)
        .map_or(fallback, |(_, t)| *t)
}

fn is_corridor(x: i32, y: i32, width: i32, height: i32) -> bool {
    let cols = [width / 4, width / 2, width * 3 / 4];
    let rows = [height / 4, height / 2, height * 3 / 4];
    cols.contains(&x) || rows.contains(&y)
}

/// Generate a row-major `width * height` grid.
///
/// Cells within `border` of an edge draw mountain, forest or grass. Cells on
/// the corridor lines (quarter, half and three-quarter columns and rows)
/// never draw mountain or water, keeping the map crossable. Everything else
/// draws from the interior mix.
pub fn generate_grid<R: Rng>(width: i32, height: i32, border: i32, rng: &mut R) -> Vec<Terrain> {
    let mut grid = Vec::with_capacity(usize::try_from(width * height).unwrap_or(0));
    for y in 0..height {
        for x in 0..width {
            let on_border =
                x < border || y < border || x >= width - border || y >= height - border;
            let r = roll(rng);
            let cell = if on_border {
                pick(&BORDER, Terrain::Grass, r)
            } else if is_corridor(x, y, width, height) {
                pick(&CORRIDOR, Terrain::Grass, r)
            } else {
                pick(&INTERIOR, Terrain::Mountain, r)
            };
            grid.push(cell);
        }
    }
    grid
}
