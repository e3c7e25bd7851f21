use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;

use bevy::prelude::*;

use crate::components::{Rect, TileKind};

/// The 3x3 neighborhood used by every narrow-phase query. Order is fixed and
/// observable through `tiles_around`, so keep it stable.
const NEIGHBOR_OFFSETS: [(i32, i32); 9] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (0, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Neighbor-presence bitmask for autotiling, one bit per cardinal direction.
const AUTO_UP: u8 = 1;
const AUTO_DOWN: u8 = 2;
const AUTO_LEFT: u8 = 4;
const AUTO_RIGHT: u8 = 8;

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Tile {
    #[serde(rename = "type")]
    pub kind: TileKind,
    pub variant: u8,
    pub pos: (i32, i32),
}

/// A decoration placed at an arbitrary pixel position, not snapped to the
/// grid. Also the shape `extract` hands back (positions already in pixels).
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OffgridTile {
    #[serde(rename = "type")]
    pub kind: TileKind,
    pub variant: u8,
    pub pos: (f32, f32),
}

/// Persisted layout: grid tiles keyed by `"x;y"`, plus free decorations.
#[derive(serde::Serialize, serde::Deserialize)]
struct MapFile {
    tilemap: HashMap<String, Tile>,
    tile_size: i32,
    offgrid: Vec<OffgridTile>,
}

#[derive(Resource, Clone, Debug)]
pub struct Tilemap {
    pub tile_size: i32,
    tiles: HashMap<(i32, i32), Tile>,
    pub offgrid: Vec<OffgridTile>,
}

impl Tilemap {
    pub fn new(tile_size: i32) -> Self {
        Self {
            tile_size,
            tiles: HashMap::new(),
            offgrid: Vec::new(),
        }
    }

    pub fn insert(&mut self, kind: TileKind, variant: u8, pos: (i32, i32)) {
        self.tiles.insert(pos, Tile { kind, variant, pos });
    }

    pub fn insert_offgrid(&mut self, kind: TileKind, variant: u8, pos: (f32, f32)) {
        self.offgrid.push(OffgridTile { kind, variant, pos });
    }

    pub fn tile_at(&self, grid_pos: (i32, i32)) -> Option<&Tile> {
        self.tiles.get(&grid_pos)
    }

    pub fn grid_len(&self) -> usize {
        self.tiles.len()
    }

    fn grid_cell(&self, pos: (f32, f32)) -> (i32, i32) {
        let ts = self.tile_size as f32;
        ((pos.0 / ts).floor() as i32, (pos.1 / ts).floor() as i32)
    }

    /// Tiles in the 3x3 neighborhood around the cell containing `pos`, in
    /// `NEIGHBOR_OFFSETS` order. Bounds every collision query to nine lookups
    /// regardless of map size.
    pub fn tiles_around(&self, pos: (f32, f32)) -> Vec<&Tile> {
        let cell = self.grid_cell(pos);
        NEIGHBOR_OFFSETS
            .iter()
            .filter_map(|(dx, dy)| self.tiles.get(&(cell.0 + dx, cell.1 + dy)))
            .collect()
    }

    /// Collision rectangles for the solid tiles around `pos`, each exactly
    /// `tile_size` square at its grid-to-pixel position.
    pub fn physics_rects_around(&self, pos: (f32, f32)) -> Vec<Rect> {
        let ts = self.tile_size as f32;
        self.tiles_around(pos)
            .into_iter()
            .filter(|tile| tile.kind.is_solid())
            .map(|tile| {
                Rect::new(
                    tile.pos.0 as f32 * ts,
                    tile.pos.1 as f32 * ts,
                    ts,
                    ts,
                )
            })
            .collect()
    }

    /// True iff the cell containing `pos` holds a solid tile.
    pub fn solid_check(&self, pos: (f32, f32)) -> bool {
        self.tiles
            .get(&self.grid_cell(pos))
            .map(|tile| tile.kind.is_solid())
            .unwrap_or(false)
    }

    /// Pull every tile matching one of `pairs` out of the map (grid and
    /// offgrid), converting grid positions to pixels. With `keep` the map is
    /// left untouched. Used at level load to lift spawn markers and emitter
    /// anchors out of the static map.
    pub fn extract(&mut self, pairs: &[(TileKind, u8)], keep: bool) -> Vec<OffgridTile> {
        let matches_pair = |kind: TileKind, variant: u8| {
            pairs.iter().any(|&(k, v)| k == kind && v == variant)
        };

        let mut matches = Vec::new();
        for tile in &self.offgrid {
            if matches_pair(tile.kind, tile.variant) {
                matches.push(tile.clone());
            }
        }
        if !keep {
            self.offgrid
                .retain(|tile| !matches_pair(tile.kind, tile.variant));
        }

        let ts = self.tile_size as f32;
        let grid_hits: Vec<(i32, i32)> = self
            .tiles
            .values()
            .filter(|tile| matches_pair(tile.kind, tile.variant))
            .map(|tile| tile.pos)
            .collect();
        for pos in grid_hits {
            let tile = if keep {
                self.tiles[&pos].clone()
            } else {
                match self.tiles.remove(&pos) {
                    Some(tile) => tile,
                    None => continue,
                }
            };
            matches.push(OffgridTile {
                kind: tile.kind,
                variant: tile.variant,
                pos: (tile.pos.0 as f32 * ts, tile.pos.1 as f32 * ts),
            });
        }
        matches
    }

    /// Reassign variants of auto-tileable tiles from their cardinal neighbor
    /// pattern. Masks without a canonical variant leave the tile unchanged.
    /// Editing aid only, never called during simulation.
    pub fn autotile(&mut self) {
        let mut changes = Vec::new();
        for tile in self.tiles.values() {
            if !tile.kind.is_autotile() {
                continue;
            }
            let mut mask = 0u8;
            for (bit, (dx, dy)) in [
                (AUTO_UP, (0, -1)),
                (AUTO_DOWN, (0, 1)),
                (AUTO_LEFT, (-1, 0)),
                (AUTO_RIGHT, (1, 0)),
            ] {
                let neighbor = self.tiles.get(&(tile.pos.0 + dx, tile.pos.1 + dy));
                if neighbor.map(|n| n.kind == tile.kind).unwrap_or(false) {
                    mask |= bit;
                }
            }
            if let Some(variant) = autotile_variant(mask) {
                changes.push((tile.pos, variant));
            }
        }
        for (pos, variant) in changes {
            if let Some(tile) = self.tiles.get_mut(&pos) {
                tile.variant = variant;
            }
        }
    }

    /// Grid tiles inside the viewport rectangle anchored at `offset` (pixels),
    /// the culling set the tile renderer draws. Offgrid decorations are not
    /// culled and don't appear here.
    pub fn tiles_in_view(&self, offset: (i32, i32), view: (i32, i32)) -> Vec<&Tile> {
        let ts = self.tile_size;
        let x0 = offset.0.div_euclid(ts);
        let x1 = (offset.0 + view.0).div_euclid(ts);
        let y0 = offset.1.div_euclid(ts);
        let y1 = (offset.1 + view.1).div_euclid(ts);
        let mut out = Vec::new();
        for x in x0..=x1 {
            for y in y0..=y1 {
                if let Some(tile) = self.tiles.get(&(x, y)) {
                    out.push(tile);
                }
            }
        }
        out
    }

    /// Load a persisted map. A missing file is the recoverable "no saved map"
    /// case and comes back as `Ok(None)`; malformed content is an error.
    pub fn load(path: &Path) -> Result<Option<Self>, String> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(format!("failed to read {}: {e}", path.display())),
        };
        let file: MapFile = serde_json::from_str(&contents)
            .map_err(|e| format!("failed to parse {}: {e}", path.display()))?;

        let mut tiles = HashMap::with_capacity(file.tilemap.len());
        for (key, tile) in file.tilemap {
            let pos = parse_grid_key(&key)?;
            if pos != tile.pos {
                return Err(format!(
                    "grid key {key} disagrees with tile pos {:?} in {}",
                    tile.pos,
                    path.display()
                ));
            }
            tiles.insert(pos, tile);
        }
        Ok(Some(Self {
            tile_size: file.tile_size,
            tiles,
            offgrid: file.offgrid,
        }))
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        let file = MapFile {
            tilemap: self
                .tiles
                .iter()
                .map(|(pos, tile)| (format!("{};{}", pos.0, pos.1), tile.clone()))
                .collect(),
            tile_size: self.tile_size,
            offgrid: self.offgrid.clone(),
        };
        let json = serde_json::to_string(&file).map_err(|e| e.to_string())?;
        std::fs::write(path, json)
            .map_err(|e| format!("failed to write {}: {e}", path.display()))
    }
}

fn parse_grid_key(key: &str) -> Result<(i32, i32), String> {
    let (x, y) = key
        .split_once(';')
        .ok_or_else(|| format!("bad grid key: {key}"))?;
    let x = x.parse().map_err(|_| format!("bad grid key: {key}"))?;
    let y = y.parse().map_err(|_| format!("bad grid key: {key}"))?;
    Ok((x, y))
}

/// Canonical variant for a neighbor mask. Variants follow the tileset layout:
/// 0..=7 walk the border clockwise from the top-left corner, 8 is the interior.
fn autotile_variant(mask: u8) -> Option<u8> {
    match mask {
        m if m == AUTO_RIGHT | AUTO_DOWN => Some(0),
        m if m == AUTO_RIGHT | AUTO_DOWN | AUTO_LEFT => Some(1),
        m if m == AUTO_LEFT | AUTO_DOWN => Some(2),
        m if m == AUTO_LEFT | AUTO_UP | AUTO_DOWN => Some(3),
        m if m == AUTO_LEFT | AUTO_UP => Some(4),
        m if m == AUTO_LEFT | AUTO_UP | AUTO_RIGHT => Some(5),
        m if m == AUTO_RIGHT | AUTO_UP => Some(6),
        m if m == AUTO_RIGHT | AUTO_UP | AUTO_DOWN => Some(7),
        m if m == AUTO_UP | AUTO_DOWN | AUTO_LEFT | AUTO_RIGHT => Some(8),
        _ => None,
    }
}
