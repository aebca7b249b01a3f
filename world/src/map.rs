//! Tiled JSON map asset decoding.
//!
//! Only the data the board needs is read: per-tile walkability, healing values
//! and spawn point coordinates. Visual content is ignored.

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use keybound_core::CellCoord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::grid::{Grid, TerrainLayer};

/// Layer whose tiles make up the ground.
pub const TERRAIN_LAYER: &str = "terrain";
/// Optional decoration layer that may hold obstacles.
pub const ENVIRONMENT_LAYER: &str = "environment";
/// Optional layer of unreachable decoy loot that may hold obstacles.
pub const FAKE_LOOT_LAYER: &str = "Fake loot";
/// Card spawn points, grouped by gid.
pub const LOOT_LAYER: &str = "loot";
/// Key spawn points, grouped by gid.
pub const KEYS_LAYER: &str = "keys";
/// Healing tiles carrying a `heal` property.
pub const CAMPFIRE_LAYER: &str = "campfire";
/// Starting cells for the pawn roster, in row-major order.
pub const PAWN_SPAWN_LAYER: &str = "pawn_spawns";
/// Starting cells for the enemy roster, in row-major order.
pub const ENEMY_SPAWN_LAYER: &str = "enemy_spawns";

const REQUIRED_LAYERS: [&str; 6] = [
    TERRAIN_LAYER,
    LOOT_LAYER,
    KEYS_LAYER,
    CAMPFIRE_LAYER,
    PAWN_SPAWN_LAYER,
    ENEMY_SPAWN_LAYER,
];
const WALKABILITY_LAYERS: [&str; 3] = [TERRAIN_LAYER, ENVIRONMENT_LAYER, FAKE_LOOT_LAYER];

const WALKABLE_PROPERTY: &str = "walkable";
const HEAL_PROPERTY: &str = "heal";
const TILE_LAYER_KIND: &str = "tilelayer";
// Tiled stores flip flags in the top bits of every gid.
const GID_MASK: u32 = 0x1FFF_FFFF;

/// Failures raised while loading or interpreting a map asset.
#[derive(Debug, Error)]
pub enum MapError {
    /// The asset file could not be read.
    #[error("failed to read map `{}`", .path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The asset is not valid Tiled JSON.
    #[error("map is not valid Tiled JSON")]
    Json(#[from] serde_json::Error),
    /// The map has no cells.
    #[error("map dimensions {width}x{height} are invalid")]
    InvalidDimensions {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
    },
    /// A layer the board relies on is absent.
    #[error("map is missing the `{0}` layer")]
    MissingLayer(&'static str),
    /// A layer is not a tile layer.
    #[error("layer `{0}` is not a tile layer")]
    NotTileLayer(String),
    /// A layer's data does not cover the grid.
    #[error("layer `{layer}` holds {found} tiles, expected {expected}")]
    LayerSize {
        /// Offending layer.
        layer: String,
        /// Number of cells in the grid.
        expected: usize,
        /// Number of tiles in the layer.
        found: usize,
    },
    /// A tile lacks a property the board needs.
    #[error("tile {gid} on layer `{layer}` has no usable `{property}` property")]
    MissingProperty {
        /// Layer holding the tile.
        layer: &'static str,
        /// Global tile identifier.
        gid: u32,
        /// Name of the expected property.
        property: &'static str,
    },
}

/// Tiled JSON map export.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapAsset {
    /// Number of columns.
    pub width: u32,
    /// Number of rows.
    pub height: u32,
    /// Layers in drawing order.
    pub layers: Vec<LayerAsset>,
    /// Tilesets referenced by layer gids.
    #[serde(default)]
    pub tilesets: Vec<TilesetAsset>,
}

/// One Tiled layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerAsset {
    /// Layer name.
    pub name: String,
    /// Tiled layer type, `tilelayer` for grids of gids.
    #[serde(rename = "type")]
    pub kind: String,
    /// Row-major gids, zero meaning no tile.
    #[serde(default)]
    pub data: Vec<u32>,
}

/// Tileset reference holding per-tile properties.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TilesetAsset {
    /// Gid of the tileset's first tile.
    pub firstgid: u32,
    /// Tiles that carry properties.
    #[serde(default)]
    pub tiles: Vec<TileAsset>,
}

/// Property block of a single tile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileAsset {
    /// Tile index local to its tileset.
    pub id: u32,
    /// Custom properties.
    #[serde(default)]
    pub properties: Vec<PropertyAsset>,
}

/// Custom tile property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyAsset {
    /// Property name.
    pub name: String,
    /// Property value.
    #[serde(default)]
    pub value: Value,
}

/// Board data extracted from a map asset.
#[derive(Clone, Debug)]
pub(crate) struct BoardLayout {
    pub(crate) grid: Grid,
    pub(crate) card_groups: BTreeMap<u32, Vec<CellCoord>>,
    pub(crate) key_groups: BTreeMap<u32, Vec<CellCoord>>,
    pub(crate) pawn_spawns: Vec<CellCoord>,
    pub(crate) enemy_spawns: Vec<CellCoord>,
}

impl MapAsset {
    /// Creates an empty map with every required layer zeroed.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let cells = usize::try_from(width)
            .ok()
            .zip(usize::try_from(height).ok())
            .map_or(0, |(width, height)| width.saturating_mul(height));
        let layers = REQUIRED_LAYERS
            .iter()
            .map(|name| LayerAsset {
                name: (*name).to_owned(),
                kind: TILE_LAYER_KIND.to_owned(),
                data: vec![0; cells],
            })
            .collect();
        Self {
            width,
            height,
            layers,
            tilesets: Vec::new(),
        }
    }

    /// Parses a Tiled JSON document.
    pub fn from_json(source: &str) -> Result<Self, MapError> {
        Ok(serde_json::from_str(source)?)
    }

    /// Reads and parses a Tiled JSON file.
    pub fn from_path(path: &Path) -> Result<Self, MapError> {
        let source = fs::read_to_string(path).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&source)
    }

    /// Writes `gid` into a layer, creating the layer when absent.
    pub fn set_tile(&mut self, layer: &str, cell: CellCoord, gid: u32) -> Result<(), MapError> {
        let expected = self.cell_count()?;
        let index = self.tile_index(cell)?;
        let position = match self.layers.iter().position(|candidate| candidate.name == layer) {
            Some(position) => position,
            None => {
                self.layers.push(LayerAsset {
                    name: layer.to_owned(),
                    kind: TILE_LAYER_KIND.to_owned(),
                    data: vec![0; expected],
                });
                self.layers.len() - 1
            }
        };
        let target = &mut self.layers[position];
        let found = target.data.len();
        let slot = target
            .data
            .get_mut(index)
            .ok_or_else(|| MapError::LayerSize {
                layer: layer.to_owned(),
                expected,
                found,
            })?;
        *slot = gid;
        Ok(())
    }

    /// Attaches a custom property to the tile identified by `gid`.
    pub fn set_tile_property(&mut self, gid: u32, name: &str, value: Value) {
        if self.tilesets.is_empty() {
            self.tilesets.push(TilesetAsset {
                firstgid: 1,
                tiles: Vec::new(),
            });
        }
        let Some(tileset) = self
            .tilesets
            .iter_mut()
            .filter(|tileset| tileset.firstgid <= gid)
            .max_by_key(|tileset| tileset.firstgid)
        else {
            return;
        };
        let id = gid - tileset.firstgid;
        let position = match tileset.tiles.iter().position(|tile| tile.id == id) {
            Some(position) => position,
            None => {
                tileset.tiles.push(TileAsset {
                    id,
                    properties: Vec::new(),
                });
                tileset.tiles.len() - 1
            }
        };
        let tile = &mut tileset.tiles[position];
        tile.properties.retain(|property| property.name != name);
        tile.properties.push(PropertyAsset {
            name: name.to_owned(),
            value,
        });
    }

    /// Looks up a custom property of the tile identified by `gid`.
    #[must_use]
    pub fn tile_property(&self, gid: u32, name: &str) -> Option<&Value> {
        let gid = gid & GID_MASK;
        let tileset = self
            .tilesets
            .iter()
            .filter(|tileset| tileset.firstgid <= gid)
            .max_by_key(|tileset| tileset.firstgid)?;
        let id = gid - tileset.firstgid;
        tileset
            .tiles
            .iter()
            .find(|tile| tile.id == id)?
            .properties
            .iter()
            .find(|property| property.name == name)
            .map(|property| &property.value)
    }

    pub(crate) fn layout(&self) -> Result<BoardLayout, MapError> {
        let expected = self.cell_count()?;
        for name in REQUIRED_LAYERS {
            let _ = self.layer(name, expected)?.ok_or(MapError::MissingLayer(name))?;
        }

        let mut grid = Grid::new(self.width, self.height);
        for name in WALKABILITY_LAYERS {
            for (cell, gid) in self.tiles(name, expected)? {
                let walkable = self
                    .tile_property(gid, WALKABLE_PROPERTY)
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                grid.add_layer(cell, TerrainLayer::new(walkable))
                    .map_err(|_| MapError::InvalidDimensions {
                        width: self.width,
                        height: self.height,
                    })?;
            }
        }

        for (cell, gid) in self.tiles(CAMPFIRE_LAYER, expected)? {
            let heal = self
                .tile_property(gid, HEAL_PROPERTY)
                .and_then(Value::as_u64)
                .and_then(|heal| u32::try_from(heal).ok())
                .ok_or(MapError::MissingProperty {
                    layer: CAMPFIRE_LAYER,
                    gid,
                    property: HEAL_PROPERTY,
                })?;
            grid.set_heal_value(cell, heal)
                .map_err(|_| MapError::InvalidDimensions {
                    width: self.width,
                    height: self.height,
                })?;
        }

        Ok(BoardLayout {
            grid,
            card_groups: group_by_gid(self.tiles(LOOT_LAYER, expected)?),
            key_groups: group_by_gid(self.tiles(KEYS_LAYER, expected)?),
            pawn_spawns: self
                .tiles(PAWN_SPAWN_LAYER, expected)?
                .into_iter()
                .map(|(cell, _)| cell)
                .collect(),
            enemy_spawns: self
                .tiles(ENEMY_SPAWN_LAYER, expected)?
                .into_iter()
                .map(|(cell, _)| cell)
                .collect(),
        })
    }

    fn cell_count(&self) -> Result<usize, MapError> {
        let invalid = || MapError::InvalidDimensions {
            width: self.width,
            height: self.height,
        };
        let width = usize::try_from(self.width).map_err(|_| invalid())?;
        let height = usize::try_from(self.height).map_err(|_| invalid())?;
        match width.checked_mul(height) {
            Some(cells) if cells > 0 => Ok(cells),
            _ => Err(invalid()),
        }
    }

    fn tile_index(&self, cell: CellCoord) -> Result<usize, MapError> {
        if cell.column() >= self.width || cell.row() >= self.height {
            return Err(MapError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        let row = usize::try_from(cell.row()).unwrap_or(usize::MAX);
        let column = usize::try_from(cell.column()).unwrap_or(usize::MAX);
        let width = usize::try_from(self.width).unwrap_or(usize::MAX);
        Ok(row.saturating_mul(width).saturating_add(column))
    }

    fn layer(&self, name: &str, expected: usize) -> Result<Option<&LayerAsset>, MapError> {
        let Some(layer) = self.layers.iter().find(|layer| layer.name == name) else {
            return Ok(None);
        };
        if layer.kind != TILE_LAYER_KIND {
            return Err(MapError::NotTileLayer(layer.name.clone()));
        }
        if layer.data.len() != expected {
            return Err(MapError::LayerSize {
                layer: layer.name.clone(),
                expected,
                found: layer.data.len(),
            });
        }
        Ok(Some(layer))
    }

    /// Non-empty tiles of a layer as `(cell, gid)` in row-major order.
    fn tiles(&self, name: &str, expected: usize) -> Result<Vec<(CellCoord, u32)>, MapError> {
        let Some(layer) = self.layer(name, expected)? else {
            return Ok(Vec::new());
        };
        let mut tiles = Vec::new();
        let mut cursor = (0_u32, 0_u32);
        for &raw in &layer.data {
            let gid = raw & GID_MASK;
            if gid != 0 {
                tiles.push((CellCoord::new(cursor.0, cursor.1), gid));
            }
            cursor.0 += 1;
            if cursor.0 == self.width {
                cursor = (0, cursor.1 + 1);
            }
        }
        Ok(tiles)
    }
}

fn group_by_gid(tiles: Vec<(CellCoord, u32)>) -> BTreeMap<u32, Vec<CellCoord>> {
    let mut groups: BTreeMap<u32, Vec<CellCoord>> = BTreeMap::new();
    for (cell, gid) in tiles {
        groups.entry(gid).or_default().push(cell);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn walkability_follows_tile_properties() {
        let mut asset = MapAsset::new(3, 2);
        asset
            .set_tile(TERRAIN_LAYER, CellCoord::new(0, 0), 1)
            .expect("in bounds");
        asset
            .set_tile(ENVIRONMENT_LAYER, CellCoord::new(1, 0), 2)
            .expect("in bounds");
        asset.set_tile_property(2, WALKABLE_PROPERTY, json!(false));

        let layout = asset.layout().expect("valid map");
        assert!(layout.grid.walkable(CellCoord::new(0, 0)));
        assert!(!layout.grid.walkable(CellCoord::new(1, 0)));
        assert!(layout.grid.walkable(CellCoord::new(2, 1)));
    }

    #[test]
    fn spawn_layers_are_grouped() {
        let mut asset = MapAsset::new(4, 4);
        asset
            .set_tile(LOOT_LAYER, CellCoord::new(0, 0), 7)
            .expect("in bounds");
        asset
            .set_tile(LOOT_LAYER, CellCoord::new(3, 1), 7)
            .expect("in bounds");
        asset
            .set_tile(LOOT_LAYER, CellCoord::new(2, 2), 9)
            .expect("in bounds");
        asset
            .set_tile(PAWN_SPAWN_LAYER, CellCoord::new(1, 3), 1)
            .expect("in bounds");
        asset
            .set_tile(PAWN_SPAWN_LAYER, CellCoord::new(0, 3), 1)
            .expect("in bounds");

        let layout = asset.layout().expect("valid map");
        assert_eq!(
            layout.card_groups.get(&7),
            Some(&vec![CellCoord::new(0, 0), CellCoord::new(3, 1)])
        );
        assert_eq!(layout.card_groups.get(&9), Some(&vec![CellCoord::new(2, 2)]));
        assert_eq!(
            layout.pawn_spawns,
            vec![CellCoord::new(0, 3), CellCoord::new(1, 3)],
            "spawns are listed in row-major order"
        );
    }

    #[test]
    fn campfire_requires_heal_property() {
        let mut asset = MapAsset::new(2, 2);
        asset
            .set_tile(CAMPFIRE_LAYER, CellCoord::new(1, 1), 5)
            .expect("in bounds");
        assert!(matches!(
            asset.layout(),
            Err(MapError::MissingProperty { gid: 5, .. })
        ));

        asset.set_tile_property(5, HEAL_PROPERTY, json!(20));
        let layout = asset.layout().expect("valid map");
        assert_eq!(
            layout.grid.cell(CellCoord::new(1, 1)).map(|cell| cell.heal_value()),
            Some(20)
        );
    }

    #[test]
    fn structural_problems_are_reported() {
        let mut asset = MapAsset::new(2, 2);
        asset.layers.retain(|layer| layer.name != KEYS_LAYER);
        assert!(matches!(asset.layout(), Err(MapError::MissingLayer(KEYS_LAYER))));

        let mut asset = MapAsset::new(2, 2);
        let _ = asset.layers[0].data.pop();
        assert!(matches!(asset.layout(), Err(MapError::LayerSize { found: 3, .. })));

        assert!(matches!(
            MapAsset::new(0, 3).layout(),
            Err(MapError::InvalidDimensions { .. })
        ));
        assert!(matches!(MapAsset::from_json("{"), Err(MapError::Json(_))));
    }

    #[test]
    fn tiled_json_is_accepted() {
        let source = json!({
            "width": 2,
            "height": 1,
            "tiledversion": "1.10.2",
            "layers": [
                { "name": "terrain", "type": "tilelayer", "width": 2, "height": 1, "data": [1, 2] },
                { "name": "loot", "type": "tilelayer", "data": [0, 0] },
                { "name": "keys", "type": "tilelayer", "data": [0, 0] },
                { "name": "campfire", "type": "tilelayer", "data": [0, 0] },
                { "name": "pawn_spawns", "type": "tilelayer", "data": [1, 0] },
                { "name": "enemy_spawns", "type": "tilelayer", "data": [0, 1] },
                { "name": "decor", "type": "objectgroup" }
            ],
            "tilesets": [{
                "firstgid": 1,
                "tiles": [{
                    "id": 1,
                    "properties": [{ "name": "walkable", "type": "bool", "value": false }]
                }]
            }]
        })
        .to_string();

        let asset = MapAsset::from_json(&source).expect("valid Tiled JSON");
        let layout = asset.layout().expect("valid map");
        assert!(layout.grid.walkable(CellCoord::new(0, 0)));
        assert!(!layout.grid.walkable(CellCoord::new(1, 0)));
        assert_eq!(layout.enemy_spawns, vec![CellCoord::new(1, 0)]);
    }
}
