//! Brood War 1.16.1 entity table layouts
//!
//! Addresses are absolute: the 1.16.1 executable has no relocations and is
//! always mapped at 0x400000.

use super::{EntityKind, EntitySchema, FieldDescriptor as F, SchemaSet, TableBase};

pub const BUILTIN_VERSION: &str = "1.16.1";

/// Target pointers are 32-bit
pub const POINTER_SIZE: u8 = 4;

/// CUnit table
pub mod unit {
    pub const TABLE: u64 = 0x0059_CCA8;
    pub const CAPACITY: u32 = 1700;
    pub const RECORD_SIZE: u32 = 0x150;
}

/// CSprite table
pub mod sprite {
    pub const TABLE: u64 = 0x0062_9D98;
    pub const CAPACITY: u32 = 2500;
    pub const RECORD_SIZE: u32 = 0x24;
}

/// CImage table
pub mod image {
    pub const TABLE: u64 = 0x0052_F568;
    pub const CAPACITY: u32 = 5000;
    pub const RECORD_SIZE: u32 = 0x40;
}

// Subset of unit type ids; unknown ids decode to their raw number.
const UNIT_TYPES: &[(&str, u64)] = &[
    ("Terran Marine", 0),
    ("Terran Ghost", 1),
    ("Terran Vulture", 2),
    ("Terran Goliath", 3),
    ("Terran Siege Tank", 5),
    ("Terran SCV", 7),
    ("Terran Wraith", 8),
    ("Terran Science Vessel", 9),
    ("Terran Dropship", 11),
    ("Terran Battlecruiser", 12),
    ("Terran Firebat", 32),
    ("Terran Medic", 34),
    ("Zerg Larva", 35),
    ("Zerg Egg", 36),
    ("Zerg Zergling", 37),
    ("Zerg Hydralisk", 38),
    ("Zerg Ultralisk", 39),
    ("Zerg Drone", 41),
    ("Zerg Overlord", 42),
    ("Zerg Mutalisk", 43),
    ("Zerg Queen", 45),
    ("Zerg Defiler", 46),
    ("Protoss Corsair", 60),
    ("Protoss Dark Templar", 61),
    ("Protoss Probe", 64),
    ("Protoss Zealot", 65),
    ("Protoss Dragoon", 66),
    ("Protoss High Templar", 67),
    ("Protoss Archon", 68),
    ("Protoss Shuttle", 69),
    ("Protoss Scout", 70),
    ("Protoss Arbiter", 71),
    ("Protoss Carrier", 72),
    ("Protoss Reaver", 83),
    ("Protoss Observer", 84),
    ("Zerg Lurker", 103),
    ("Terran Command Center", 106),
    ("Terran Supply Depot", 109),
    ("Terran Barracks", 111),
    ("Zerg Hatchery", 131),
    ("Zerg Lair", 132),
    ("Zerg Hive", 133),
    ("Protoss Nexus", 154),
    ("Protoss Pylon", 156),
    ("Protoss Gateway", 160),
    ("Resource Mineral Field", 176),
    ("Resource Vespene Geyser", 188),
];

fn unit_schema() -> EntitySchema {
    let p = POINTER_SIZE;
    EntitySchema {
        kind: EntityKind::Unit,
        table: TableBase::Absolute(unit::TABLE),
        record_size: unit::RECORD_SIZE,
        max_slots: unit::CAPACITY,
        alive_field: "sprite".to_string(),
        fields: vec![
            F::pointer("prev", 0x00, p),
            F::pointer("next", 0x04, p),
            F::signed("hit_points", 0x08, 4),
            F::pointer("sprite", 0x0C, p),
            F::unsigned("move_target_x", 0x10, 2),
            F::unsigned("move_target_y", 0x12, 2),
            F::pointer("move_target_unit", 0x14, p),
            F::unsigned("movement_flags", 0x20, 1),
            F::unsigned("current_direction", 0x21, 1),
            F::unsigned("flingy_id", 0x24, 2),
            F::unsigned("position_x", 0x28, 2),
            F::unsigned("position_y", 0x2A, 2),
            F::signed("halt_x", 0x2C, 4),
            F::signed("halt_y", 0x30, 4),
            F::unsigned("top_speed", 0x34, 4),
            F::signed("current_speed", 0x38, 4),
            F::unsigned("acceleration", 0x48, 2),
            F::unsigned("player", 0x4C, 1),
            F::unsigned("order", 0x4D, 1),
            F::unsigned("order_state", 0x4E, 1),
            F::unsigned("order_timer", 0x54, 1),
            F::unsigned("ground_cooldown", 0x55, 1),
            F::unsigned("air_cooldown", 0x56, 1),
            F::unsigned("spell_cooldown", 0x57, 1),
            F::unsigned("order_target_x", 0x58, 2),
            F::unsigned("order_target_y", 0x5A, 2),
            F::pointer("order_target_unit", 0x5C, p),
            F::signed("shields", 0x60, 4),
            F::enumeration("unit_type", 0x64, 2, UNIT_TYPES),
            F::pointer("subunit", 0x70, p),
            F::unsigned("order_queue_count", 0x84, 1),
            F::unsigned("kill_count", 0x8F, 1),
            F::unsigned("energy", 0xA2, 2),
            F::unsigned("remaining_build_time", 0xAC, 2),
            F::unsigned("status_flags", 0xDC, 4),
            F::unsigned("resource_type", 0xE0, 1),
            F::unsigned("visibility", 0xE4, 4),
            F::unsigned("defense_matrix_damage", 0x114, 2),
            F::unsigned("stim_timer", 0x117, 1),
            F::unsigned("ensnare_timer", 0x118, 1),
            F::unsigned("lockdown_timer", 0x119, 1),
            F::unsigned("irradiate_timer", 0x11A, 1),
            F::unsigned("stasis_timer", 0x11B, 1),
            F::unsigned("plague_timer", 0x11C, 1),
            F::unsigned("storm_timer", 0x11D, 1),
            F::flag("is_blind", 0x127, 1),
        ],
    }
}

fn sprite_schema() -> EntitySchema {
    let p = POINTER_SIZE;
    EntitySchema {
        kind: EntityKind::Sprite,
        table: TableBase::Absolute(sprite::TABLE),
        record_size: sprite::RECORD_SIZE,
        max_slots: sprite::CAPACITY,
        alive_field: "image_primary".to_string(),
        fields: vec![
            F::pointer("prev", 0x00, p),
            F::pointer("next", 0x04, p),
            F::unsigned("sprite_id", 0x08, 2),
            F::unsigned("player", 0x0A, 1),
            F::unsigned("selection_index", 0x0B, 1),
            F::unsigned("visibility_flags", 0x0C, 1),
            F::unsigned("elevation", 0x0D, 1),
            F::unsigned("flags", 0x0E, 1),
            F::unsigned("selection_timer", 0x0F, 1),
            F::unsigned("index", 0x10, 2),
            F::unsigned("position_x", 0x14, 2),
            F::unsigned("position_y", 0x16, 2),
            F::pointer("image_primary", 0x18, p),
            F::pointer("image_head", 0x1C, p),
            F::pointer("image_tail", 0x20, p),
        ],
    }
}

fn image_schema() -> EntitySchema {
    let p = POINTER_SIZE;
    EntitySchema {
        kind: EntityKind::Image,
        table: TableBase::Absolute(image::TABLE),
        record_size: image::RECORD_SIZE,
        max_slots: image::CAPACITY,
        alive_field: "sprite_owner".to_string(),
        fields: vec![
            F::pointer("prev", 0x00, p),
            F::pointer("next", 0x04, p),
            F::unsigned("image_id", 0x08, 2),
            F::unsigned("palette_type", 0x0A, 1),
            F::unsigned("direction", 0x0B, 1),
            F::unsigned("flags", 0x0C, 2),
            F::signed("horizontal_offset", 0x0E, 1),
            F::signed("vertical_offset", 0x0F, 1),
            F::unsigned("iscript_header", 0x10, 2),
            F::unsigned("iscript_offset", 0x12, 2),
            F::unsigned("animation", 0x16, 1),
            F::unsigned("wait", 0x17, 1),
            F::unsigned("frame_set", 0x18, 2),
            F::unsigned("frame_index", 0x1A, 2),
            F::unsigned("map_x", 0x1C, 2),
            F::unsigned("map_y", 0x1E, 2),
            F::signed("sprite_offset_x", 0x20, 2),
            F::signed("sprite_offset_y", 0x22, 2),
            F::pointer("grp_file", 0x2C, p),
            F::pointer("sprite_owner", 0x3C, p),
        ],
    }
}

/// Built-in layouts for all entity kinds
pub fn builtin_schema() -> SchemaSet {
    SchemaSet {
        version: BUILTIN_VERSION.to_string(),
        pointer_size: POINTER_SIZE,
        schemas: vec![unit_schema(), sprite_schema(), image_schema()],
    }
}
