//! 卡牌模板目录：内置标准卡池、JSON 加载、牌组清单与融合配方表。

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::card::{
    BiomeKind, CardCategory, CardEffect, CardTemplate, Element, Rarity, Skill, SkillKind,
    TargetKind, TemplateId,
};
use super::fusion::FusionRecipe;

/// 目录数据错误：加载期致命，不会在对局动作层面出现。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("malformed catalog data: {reason}")]
    Malformed { reason: String },
    #[error("duplicate template id '{id}'")]
    DuplicateTemplate { id: TemplateId },
    #[error("deck list references unknown template '{id}'")]
    UnknownTemplate { id: TemplateId },
    #[error("no asset registered for template '{id}'")]
    MissingAsset { id: TemplateId },
    #[error("deck list is empty")]
    EmptyDeck,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeckEntry {
    pub template: TemplateId,
    pub copies: u8,
}

impl DeckEntry {
    pub fn new(template: impl Into<String>, copies: u8) -> Self {
        Self {
            template: template.into(),
            copies,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogFile {
    templates: Vec<CardTemplate>,
    deck: Vec<DeckEntry>,
    #[serde(default)]
    recipes: Vec<FusionRecipe>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    templates: Vec<CardTemplate>,
    index: HashMap<TemplateId, usize>,
    deck: Vec<DeckEntry>,
    recipes: Vec<FusionRecipe>,
}

static STANDARD: Lazy<Catalog> = Lazy::new(build_standard);

impl Catalog {
    pub fn new(
        templates: Vec<CardTemplate>,
        deck: Vec<DeckEntry>,
        recipes: Vec<FusionRecipe>,
    ) -> Result<Self, CatalogError> {
        let mut index = HashMap::new();
        let mut resolved = Vec::with_capacity(templates.len());
        for mut template in templates {
            if template.effect == CardEffect::None {
                template.effect = CardEffect::from_template_id(&template.id);
            }
            if index.insert(template.id.clone(), resolved.len()).is_some() {
                return Err(CatalogError::DuplicateTemplate { id: template.id });
            }
            resolved.push(template);
        }
        let catalog = Self {
            templates: resolved,
            index,
            deck,
            recipes,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json).map_err(|err| CatalogError::Malformed {
            reason: err.to_string(),
        })?;
        Self::new(file.templates, file.deck, file.recipes)
    }

    /// 内置标准卡池。
    pub fn standard() -> Self {
        STANDARD.clone()
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.deck.iter().all(|entry| entry.copies == 0) {
            return Err(CatalogError::EmptyDeck);
        }
        for entry in &self.deck {
            if !self.index.contains_key(&entry.template) {
                return Err(CatalogError::UnknownTemplate {
                    id: entry.template.clone(),
                });
            }
        }
        Ok(())
    }

    /// 校验每个模板都有对应的图像资源。
    pub fn verify_assets(&self, assets: &HashMap<TemplateId, String>) -> Result<(), CatalogError> {
        for template in &self.templates {
            match assets.get(&template.id) {
                Some(path) if !path.is_empty() => {}
                _ => {
                    return Err(CatalogError::MissingAsset {
                        id: template.id.clone(),
                    })
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&CardTemplate> {
        self.index.get(id).map(|idx| &self.templates[*idx])
    }

    pub fn require(&self, id: &str) -> Result<&CardTemplate, CatalogError> {
        self.get(id)
            .ok_or_else(|| CatalogError::UnknownTemplate { id: id.to_string() })
    }

    pub fn templates(&self) -> &[CardTemplate] {
        &self.templates
    }

    pub fn deck_list(&self) -> &[DeckEntry] {
        &self.deck
    }

    pub fn recipes(&self) -> &[FusionRecipe] {
        &self.recipes
    }
}

fn creature(id: &str, name: &str, cost: u8) -> CardTemplate {
    CardTemplate::new(id, name, CardCategory::Creature, cost)
}

fn spell(id: &str, name: &str, cost: u8, kind: SkillKind, target: TargetKind) -> CardTemplate {
    CardTemplate::new(id, name, CardCategory::Spell, cost).skill(Skill::new(name, kind, target))
}

fn biome(id: &str, name: &str, kind: BiomeKind) -> CardTemplate {
    CardTemplate::new(id, name, CardCategory::Biome, 0).biome(kind)
}

fn enchantment(id: &str, name: &str, cost: u8, element: Element) -> CardTemplate {
    CardTemplate::new(id, name, CardCategory::Enchantment, cost)
        .element(element)
        .rarity(Rarity::Uncommon)
}

fn build_standard() -> Catalog {
    use SkillKind::*;

    let templates = vec![
        creature("elemental_earth", "Earth Elemental", 2)
            .stats(2, 4, 1, 0)
            .biome(BiomeKind::Mountain)
            .element(Element::Earth)
            .skill(Skill::new("Stone Guard", Taunt, TargetKind::SelfTarget)),
        creature("elemental_fire", "Fire Elemental", 3)
            .stats(4, 3, 0, 10)
            .biome(BiomeKind::Volcano)
            .element(Element::Fire),
        creature("elemental_water", "Water Elemental", 3)
            .stats(2, 5, 1, 0)
            .biome(BiomeKind::Ice)
            .element(Element::Water)
            .skill(Skill::new("Tidal Mend", Heal { amount: 2 }, TargetKind::FriendlyCreature).with_cooldown(2)),
        creature("forest_sprite", "Forest Sprite", 1)
            .stats(1, 2, 0, 0)
            .biome(BiomeKind::Forest)
            .element(Element::Nature)
            .skill(Skill::new("Whisper", DrawCard { count: 1 }, TargetKind::None).with_cooldown(2)),
        creature("vampire_bat", "Vampire Bat", 2)
            .stats(2, 3, 0, 5)
            .biome(BiomeKind::Swamp)
            .element(Element::Shadow)
            .skill(Skill::new("Blood Drain", Lifesteal, TargetKind::None)),
        creature("desert_nomad", "Desert Nomad", 2)
            .stats(2, 3, 0, 10)
            .biome(BiomeKind::Desert)
            .element(Element::Air)
            .skill(
                Skill::new("Sand Lash", DamageAndHeal { damage: 1, heal: 1 }, TargetKind::OpponentCreature)
                    .with_cooldown(2),
            ),
        creature("frost_wolf", "Frost Wolf", 3)
            .stats(3, 4, 0, 5)
            .biome(BiomeKind::Ice)
            .element(Element::Ice)
            .skill(Skill::new("Howl", BuffAttack { amount: 1, duration: 2 }, TargetKind::SelfTarget).with_cooldown(3)),
        creature("sanctuary_monk", "Sanctuary Monk", 2)
            .stats(1, 4, 0, 0)
            .biome(BiomeKind::Sanctuary)
            .element(Element::Light)
            .skill(Skill::new("Final Offering", SacrificeToHealAlly, TargetKind::FriendlyCreature)),
        creature("shield_bearer", "Shield Bearer", 4)
            .stats(2, 6, 2, 0)
            .biome(BiomeKind::Forest)
            .element(Element::Earth)
            .rarity(Rarity::Uncommon)
            .skill(Skill::new("Phalanx", GlobalArmorAura { amount: 1 }, TargetKind::None).with_cooldown(3)),
        creature("necromancer", "Necromancer", 4)
            .stats(2, 4, 0, 5)
            .biome(BiomeKind::Swamp)
            .element(Element::Shadow)
            .rarity(Rarity::Rare)
            .skill(Skill::new("Raise Fallen", Revive, TargetKind::None)),
        creature("volcano_drake", "Volcano Drake", 5)
            .stats(5, 5, 1, 20)
            .biome(BiomeKind::Volcano)
            .element(Element::Fire)
            .rarity(Rarity::Rare)
            .skill(Skill::new("Magma Spit", Damage { amount: 2 }, TargetKind::OpponentCreature).with_cooldown(3)),
        creature("mountain_giant", "Mountain Giant", 6)
            .stats(6, 8, 2, 0)
            .biome(BiomeKind::Mountain)
            .element(Element::Earth)
            .rarity(Rarity::Epic),
        CardTemplate::new("phoenix", "Phoenix", CardCategory::SpecialSummon, 5)
            .stats(4, 3, 0, 25)
            .biome(BiomeKind::Volcano)
            .element(Element::Fire)
            .rarity(Rarity::Legendary),
        creature("berlin_wall", "Berlin Wall", 6)
            .stats(3, 15, 4, 0)
            .biome(BiomeKind::Mountain)
            .element(Element::Earth)
            .rarity(Rarity::Legendary)
            .skill(Skill::new("Iron Curtain", Taunt, TargetKind::SelfTarget)),
        creature("steam_titan", "Steam Titan", 6)
            .stats(7, 8, 1, 10)
            .element(Element::Water)
            .rarity(Rarity::Legendary),
        CardTemplate::new("land_plains", "Plains", CardCategory::Land, 0),
        biome("biome_forest", "Verdant Forest", BiomeKind::Forest),
        biome("biome_mountain", "High Mountain", BiomeKind::Mountain),
        biome("biome_desert", "Scorched Desert", BiomeKind::Desert),
        biome("biome_volcano", "Active Volcano", BiomeKind::Volcano),
        biome("biome_ice", "Frozen Tundra", BiomeKind::Ice),
        biome("biome_sanctuary", "Hidden Sanctuary", BiomeKind::Sanctuary),
        spell("fireball", "Fireball", 3, Damage { amount: 4 }, TargetKind::OpponentCreature),
        spell("lightning_bolt", "Lightning Bolt", 1, Damage { amount: 2 }, TargetKind::AnyCreature),
        spell("battle_cry", "Battle Cry", 2, BuffAttack { amount: 2, duration: 2 }, TargetKind::FriendlyCreature),
        spell("stone_skin", "Stone Skin", 1, BuffArmor { amount: 2, duration: 2 }, TargetKind::FriendlyCreature),
        spell(
            "war_blessing",
            "War Blessing",
            3,
            BuffAttackAndArmor { attack: 1, armor: 1, duration: 3 },
            TargetKind::FriendlyCreature,
        ),
        spell("vampiric_touch", "Vampiric Touch", 2, Lifesteal, TargetKind::FriendlyCreature),
        spell("arcane_insight", "Arcane Insight", 2, DrawCard { count: 2 }, TargetKind::None),
        spell("drain_life", "Drain Life", 4, DamageAndHeal { damage: 3, heal: 3 }, TargetKind::OpponentCreature),
        spell("mending", "Mending", 1, Heal { amount: 4 }, TargetKind::FriendlyCreature),
        spell("raise_dead", "Raise Dead", 3, Revive, TargetKind::None),
        CardTemplate::new("health_potion", "Health Potion", CardCategory::Potion, 1),
        CardTemplate::new("mana_potion", "Mana Potion", CardCategory::Potion, 0),
        enchantment("fire_aura", "Fire Aura", 2, Element::Fire),
        enchantment("ice_shield", "Ice Shield", 2, Element::Ice),
        enchantment("forest_heart", "Forest Heart", 2, Element::Nature),
        enchantment("shadow_link", "Shadow Link", 3, Element::Shadow),
        CardTemplate::new("iron_bulwark", "Iron Bulwark", CardCategory::Artifact, 3)
            .duration(3)
            .rarity(Rarity::Rare)
            .skill(Skill::new("Bulwark", GlobalArmorAura { amount: 1 }, TargetKind::None)),
    ];

    let deck = [
        ("elemental_earth", 3),
        ("elemental_fire", 2),
        ("elemental_water", 2),
        ("forest_sprite", 2),
        ("vampire_bat", 2),
        ("desert_nomad", 2),
        ("frost_wolf", 2),
        ("sanctuary_monk", 1),
        ("shield_bearer", 1),
        ("necromancer", 1),
        ("volcano_drake", 1),
        ("mountain_giant", 1),
        ("phoenix", 1),
        ("land_plains", 3),
        ("biome_forest", 1),
        ("biome_mountain", 1),
        ("biome_desert", 1),
        ("biome_volcano", 1),
        ("biome_ice", 1),
        ("biome_sanctuary", 1),
        ("fireball", 1),
        ("lightning_bolt", 2),
        ("battle_cry", 1),
        ("stone_skin", 1),
        ("war_blessing", 1),
        ("vampiric_touch", 1),
        ("arcane_insight", 1),
        ("drain_life", 1),
        ("mending", 1),
        ("raise_dead", 1),
        ("health_potion", 2),
        ("mana_potion", 1),
        ("fire_aura", 1),
        ("ice_shield", 1),
        ("forest_heart", 1),
        ("shadow_link", 1),
        ("iron_bulwark", 1),
    ]
    .into_iter()
    .map(|(id, copies)| DeckEntry::new(id, copies))
    .collect();

    let recipes = vec![
        FusionRecipe::new(
            "Berlin Wall",
            &["elemental_earth", "elemental_earth", "elemental_earth"],
            "berlin_wall",
        ),
        FusionRecipe::new("Steam Titan", &["elemental_fire", "elemental_water"], "steam_titan"),
        FusionRecipe::new(
            "Iron Colossus",
            &["iron_bulwark", "mountain_giant", "elemental_earth"],
            "iron_colossus",
        ),
        FusionRecipe::new(
            "Ancient Dragon",
            &["volcano_drake", "volcano_drake", "phoenix"],
            "ancient_dragon",
        ),
        FusionRecipe::new(
            "World Tree",
            &["forest_sprite", "forest_heart", "forest_sprite"],
            "world_tree",
        ),
    ];

    let mut index = HashMap::new();
    let templates: Vec<CardTemplate> = templates
        .into_iter()
        .enumerate()
        .map(|(idx, template)| {
            index.insert(template.id.clone(), idx);
            template
        })
        .collect();
    Catalog {
        templates,
        index,
        deck,
        recipes,
    }
}
