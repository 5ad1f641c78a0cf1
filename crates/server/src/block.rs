//! Block type definitions and property lookups.
//!
//! Ids follow the classic 0..=49 palette, so a `BlockId` can be handed to a
//! classic-protocol transport without a mapping layer.

use blockforge_engine::world::block::BlockId;

pub const AIR: BlockId = BlockId(0);
pub const STONE: BlockId = BlockId(1);
pub const GRASS: BlockId = BlockId(2);
pub const DIRT: BlockId = BlockId(3);
pub const COBBLESTONE: BlockId = BlockId(4);
pub const WOOD: BlockId = BlockId(5);
pub const SAPLING: BlockId = BlockId(6);
pub const BEDROCK: BlockId = BlockId(7);
pub const WATER: BlockId = BlockId(8);
pub const STILL_WATER: BlockId = BlockId(9);
pub const LAVA: BlockId = BlockId(10);
pub const STILL_LAVA: BlockId = BlockId(11);
pub const SAND: BlockId = BlockId(12);
pub const GRAVEL: BlockId = BlockId(13);
pub const GOLD_ORE: BlockId = BlockId(14);
pub const IRON_ORE: BlockId = BlockId(15);
pub const COAL_ORE: BlockId = BlockId(16);
pub const LOG: BlockId = BlockId(17);
pub const LEAVES: BlockId = BlockId(18);
pub const SPONGE: BlockId = BlockId(19);
pub const GLASS: BlockId = BlockId(20);
pub const GOLD: BlockId = BlockId(41);
pub const IRON: BlockId = BlockId(42);
/// Two slabs merged into a full block.
pub const DOUBLE_SLAB: BlockId = BlockId(43);
/// Half-height "stair" block; two stacked become a [`DOUBLE_SLAB`].
pub const SLAB: BlockId = BlockId(44);
pub const BRICK: BlockId = BlockId(45);
pub const TNT: BlockId = BlockId(46);
pub const BOOKSHELF: BlockId = BlockId(47);
pub const MOSSY_COBBLESTONE: BlockId = BlockId(48);
pub const OBSIDIAN: BlockId = BlockId(49);

/// Highest id in the palette.
pub const MAX_BLOCK: u16 = 49;

const NAMES: [(&str, BlockId); 33] = [
    ("air", AIR),
    ("stone", STONE),
    ("grass", GRASS),
    ("dirt", DIRT),
    ("cobblestone", COBBLESTONE),
    ("wood", WOOD),
    ("sapling", SAPLING),
    ("bedrock", BEDROCK),
    ("water", WATER),
    ("still_water", STILL_WATER),
    ("lava", LAVA),
    ("still_lava", STILL_LAVA),
    ("sand", SAND),
    ("gravel", GRAVEL),
    ("gold_ore", GOLD_ORE),
    ("iron_ore", IRON_ORE),
    ("coal_ore", COAL_ORE),
    ("log", LOG),
    ("leaves", LEAVES),
    ("sponge", SPONGE),
    ("glass", GLASS),
    ("gold", GOLD),
    ("iron", IRON),
    ("double_slab", DOUBLE_SLAB),
    ("slab", SLAB),
    ("brick", BRICK),
    ("tnt", TNT),
    ("bookshelf", BOOKSHELF),
    ("mossy_cobblestone", MOSSY_COBBLESTONE),
    ("obsidian", OBSIDIAN),
    // Aliases.
    ("adminium", BEDROCK),
    ("stair", SLAB),
    ("double_stair", DOUBLE_SLAB),
];

/// Is this a world-administrative block that ordinary ranks cannot touch?
pub fn is_admin(id: BlockId) -> bool {
    id == BEDROCK
}

pub fn is_water(id: BlockId) -> bool {
    id == WATER || id == STILL_WATER
}

pub fn is_lava(id: BlockId) -> bool {
    id == LAVA || id == STILL_LAVA
}

/// Does placing this block on top of another of the same kind merge them?
pub fn is_stair(id: BlockId) -> bool {
    id == SLAB
}

/// The block two stacked stairs become.
pub fn stacked(id: BlockId) -> Option<BlockId> {
    is_stair(id).then_some(DOUBLE_SLAB)
}

/// Parse a block by name (case-insensitive) or by numeric id.
pub fn by_name(name: &str) -> Option<BlockId> {
    let lower = name.to_ascii_lowercase();
    if let Ok(raw) = lower.parse::<u16>() {
        return (raw <= MAX_BLOCK).then_some(BlockId(raw));
    }
    NAMES
        .iter()
        .find(|(n, _)| *n == lower)
        .map(|(_, id)| *id)
}

/// Display name for user-facing messages.
pub fn name(id: BlockId) -> String {
    NAMES
        .iter()
        .find(|(_, b)| *b == id)
        .map(|(n, _)| n.to_string())
        .unwrap_or_else(|| format!("block #{}", id.0))
}
