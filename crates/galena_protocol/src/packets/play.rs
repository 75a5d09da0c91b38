use galena_nbt::{FromNbt, ToNbt};

use crate::{Decode, Encode, Nbt, Packet, VarInt};

/// The 1.16.5 join packet. The dimension registry and the joining player's
/// dimension travel as NBT documents embedded in the flat payload.
#[derive(Clone, PartialEq, Debug, Encode, Decode, Packet)]
#[packet(id = 0x24)]
pub struct GameJoinS2c {
    pub entity_id: i32,
    pub is_hardcore: bool,
    pub game_mode: u8,
    pub previous_game_mode: i8,
    pub world_count: VarInt,
    #[packet(len = "world_count")]
    pub world_names: Vec<String>,
    pub registry_codec: Nbt<RegistryCodec>,
    pub dimension: Nbt<DimensionType>,
    pub world_name: String,
    pub hashed_seed: i64,
    pub max_players: VarInt,
    pub view_distance: VarInt,
    pub reduced_debug_info: bool,
    pub enable_respawn_screen: bool,
    pub is_debug: bool,
    pub is_flat: bool,
}

/// The registry codec sent while joining: dimension types and biomes, keyed
/// the way the vanilla client expects.
#[derive(ToNbt, FromNbt, Clone, PartialEq, Debug)]
pub struct RegistryCodec {
    #[nbt(rename = "minecraft:dimension_type")]
    pub dimension_type: DimensionTypeRegistry,
    #[nbt(rename = "minecraft:worldgen/biome")]
    pub biome: BiomeRegistry,
}

/// A minimal vanilla-shaped codec: the overworld dimension and the plains
/// biome.
impl Default for RegistryCodec {
    fn default() -> Self {
        Self {
            dimension_type: DimensionTypeRegistry {
                kind: "minecraft:dimension_type".to_owned(),
                value: vec![DimensionTypeEntry {
                    name: "minecraft:overworld".to_owned(),
                    id: 0,
                    element: DimensionType::default(),
                }],
            },
            biome: BiomeRegistry {
                kind: "minecraft:worldgen/biome".to_owned(),
                value: vec![BiomeEntry {
                    name: "minecraft:plains".to_owned(),
                    id: 1,
                    element: Biome::default(),
                }],
            },
        }
    }
}

#[derive(ToNbt, FromNbt, Clone, Default, PartialEq, Debug)]
pub struct DimensionTypeRegistry {
    #[nbt(rename = "type")]
    pub kind: String,
    #[nbt(list)]
    pub value: Vec<DimensionTypeEntry>,
}

#[derive(ToNbt, FromNbt, Clone, Default, PartialEq, Debug)]
pub struct DimensionTypeEntry {
    pub name: String,
    pub id: i32,
    pub element: DimensionType,
}

#[derive(ToNbt, FromNbt, Clone, PartialEq, Debug)]
pub struct DimensionType {
    pub piglin_safe: bool,
    pub natural: bool,
    pub ambient_light: f32,
    #[nbt(optional)]
    pub fixed_time: Option<i64>,
    pub infiniburn: String,
    pub respawn_anchor_works: bool,
    pub has_skylight: bool,
    pub bed_works: bool,
    pub effects: String,
    pub has_raids: bool,
    pub logical_height: i32,
    pub coordinate_scale: f32,
    pub ultrawarm: bool,
    pub has_ceiling: bool,
}

/// The vanilla overworld.
impl Default for DimensionType {
    fn default() -> Self {
        Self {
            piglin_safe: false,
            natural: true,
            ambient_light: 0.0,
            fixed_time: None,
            infiniburn: "minecraft:infiniburn_overworld".to_owned(),
            respawn_anchor_works: false,
            has_skylight: true,
            bed_works: true,
            effects: "minecraft:overworld".to_owned(),
            has_raids: true,
            logical_height: 256,
            coordinate_scale: 1.0,
            ultrawarm: false,
            has_ceiling: false,
        }
    }
}

#[derive(ToNbt, FromNbt, Clone, Default, PartialEq, Debug)]
pub struct BiomeRegistry {
    #[nbt(rename = "type")]
    pub kind: String,
    #[nbt(list)]
    pub value: Vec<BiomeEntry>,
}

#[derive(ToNbt, FromNbt, Clone, Default, PartialEq, Debug)]
pub struct BiomeEntry {
    pub name: String,
    pub id: i32,
    pub element: Biome,
}

#[derive(ToNbt, FromNbt, Clone, PartialEq, Debug)]
pub struct Biome {
    pub precipitation: String,
    pub depth: f32,
    pub temperature: f32,
    pub scale: f32,
    pub downfall: f32,
    pub category: String,
    pub effects: BiomeEffects,
}

/// The vanilla plains biome.
impl Default for Biome {
    fn default() -> Self {
        Self {
            precipitation: "rain".to_owned(),
            depth: 0.125,
            temperature: 0.8,
            scale: 0.05,
            downfall: 0.4,
            category: "plains".to_owned(),
            effects: BiomeEffects::default(),
        }
    }
}

#[derive(ToNbt, FromNbt, Clone, PartialEq, Debug)]
pub struct BiomeEffects {
    pub sky_color: i32,
    pub water_fog_color: i32,
    pub fog_color: i32,
    pub water_color: i32,
    #[nbt(optional)]
    pub foliage_color: Option<i32>,
    #[nbt(optional)]
    pub grass_color_modifier: Option<String>,
    #[nbt(optional)]
    pub music: Option<BiomeMusic>,
    #[nbt(optional)]
    pub ambient_sound: Option<String>,
    #[nbt(optional)]
    pub additions_sound: Option<BiomeAdditionsSound>,
    #[nbt(optional)]
    pub mood_sound: Option<BiomeMoodSound>,
    #[nbt(optional)]
    pub particle: Option<BiomeParticle>,
}

impl Default for BiomeEffects {
    fn default() -> Self {
        Self {
            sky_color: 7907327,
            water_fog_color: 329011,
            fog_color: 12638463,
            water_color: 4159204,
            foliage_color: None,
            grass_color_modifier: None,
            music: None,
            ambient_sound: None,
            additions_sound: None,
            mood_sound: Some(BiomeMoodSound::default()),
            particle: None,
        }
    }
}

#[derive(ToNbt, FromNbt, Clone, Default, PartialEq, Debug)]
pub struct BiomeMusic {
    pub replace_current_music: bool,
    pub sound: String,
    pub max_delay: i32,
    pub min_delay: i32,
}

#[derive(ToNbt, FromNbt, Clone, Default, PartialEq, Debug)]
pub struct BiomeAdditionsSound {
    pub sound: String,
    pub tick_chance: f64,
}

#[derive(ToNbt, FromNbt, Clone, PartialEq, Debug)]
pub struct BiomeMoodSound {
    pub sound: String,
    pub tick_delay: i32,
    pub offset: f64,
    pub block_search_extent: i32,
}

impl Default for BiomeMoodSound {
    fn default() -> Self {
        Self {
            sound: "minecraft:ambient.cave".to_owned(),
            tick_delay: 6000,
            offset: 2.0,
            block_search_extent: 8,
        }
    }
}

#[derive(ToNbt, FromNbt, Clone, Default, PartialEq, Debug)]
pub struct BiomeParticle {
    pub probability: f32,
    pub options: BiomeParticleOptions,
}

#[derive(ToNbt, FromNbt, Clone, Default, PartialEq, Debug)]
pub struct BiomeParticleOptions {
    #[nbt(rename = "type")]
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use galena_nbt::schema::ToCompound;

    use super::*;
    use crate::{PacketDecoder, PacketEncoder};

    fn example_join() -> GameJoinS2c {
        GameJoinS2c {
            entity_id: 1,
            is_hardcore: false,
            game_mode: 1,
            previous_game_mode: -1,
            world_count: VarInt(1),
            world_names: vec!["minecraft:overworld".to_owned()],
            registry_codec: Nbt(RegistryCodec::default()),
            dimension: Nbt(DimensionType::default()),
            world_name: "minecraft:overworld".to_owned(),
            hashed_seed: 0,
            max_players: VarInt(20),
            view_distance: VarInt(10),
            reduced_debug_info: false,
            enable_respawn_screen: true,
            is_debug: false,
            is_flat: false,
        }
    }

    #[test]
    fn game_join_round_trip() {
        let pkt = example_join();

        let mut enc = PacketEncoder::new();
        enc.append_packet(&pkt).unwrap();

        let mut dec = PacketDecoder::new();
        dec.queue_bytes(enc.take());

        let frame = dec.try_next_packet().unwrap().unwrap();
        assert_eq!(frame.id, 0x24);

        assert_eq!(frame.decode::<GameJoinS2c>().unwrap(), pkt);
    }

    #[test]
    fn registry_entries_are_named_lists() {
        let codec = RegistryCodec::default().to_compound();

        let keys: Vec<&str> = codec.keys().map(|k| k.as_str()).collect();
        assert_eq!(
            keys,
            ["minecraft:dimension_type", "minecraft:worldgen/biome"]
        );

        let dims = match codec.get("minecraft:dimension_type") {
            Some(galena_nbt::Value::Compound(c)) => c,
            v => panic!("unexpected registry value {v:?}"),
        };

        assert_eq!(
            dims.get("type"),
            Some(&galena_nbt::Value::String(
                "minecraft:dimension_type".to_owned()
            ))
        );

        match dims.get("value") {
            Some(galena_nbt::Value::List(galena_nbt::List::Compound(entries))) => {
                assert_eq!(entries.len(), 1);
            }
            v => panic!("unexpected registry entry list {v:?}"),
        }
    }
}
