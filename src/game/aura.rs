//! 光环引擎：群系与附魔派生增益。
//!
//! 每次重新推导都先剥离对应来源的全部增益再重新施加，因此重复调用是幂等的，
//! 移除附魔或更换群系后残留为零。

use super::card::{
    BiomeKind, Buff, BuffKind, BuffSource, Card, CardCategory, CardEffect, Duration, Skill,
    SkillKind, TargetKind,
};
use super::state::{GameState, Player};

/// 群系对匹配生物给予的增益。圣所不给增益，改为回合结束治疗。
pub fn biome_bonus(biome: BiomeKind) -> &'static [(BuffKind, i16)] {
    match biome {
        BiomeKind::Forest => &[(BuffKind::Armor, 1)],
        BiomeKind::Mountain | BiomeKind::Desert => &[(BuffKind::Attack, 1)],
        BiomeKind::Volcano => &[(BuffKind::CritChance, 10)],
        BiomeKind::Ice => &[(BuffKind::Attack, 1), (BuffKind::Armor, 1)],
        BiomeKind::Sanctuary | BiomeKind::Swamp => &[],
    }
}

pub fn derive_biome_auras(battlefield: &mut [Card], active_biome: Option<&Card>) {
    let biome = active_biome.and_then(|card| card.template.biome);
    for card in battlefield.iter_mut().filter(|card| card.is_creature()) {
        card.strip_buffs_from(BuffSource::Biome);
        let Some(active) = biome else {
            continue;
        };
        if card.template.biome != Some(active) {
            continue;
        }
        for (kind, magnitude) in biome_bonus(active) {
            card.buffs
                .push(Buff::new(*kind, *magnitude, Duration::Unbounded, BuffSource::Biome));
        }
    }
}

fn shadow_link_skill() -> Skill {
    Skill::new("Shadow Link", SkillKind::Lifesteal, TargetKind::None)
}

pub fn derive_enchantment_auras(battlefield: &mut [Card]) {
    let enchantments: Vec<(Option<_>, CardEffect)> = battlefield
        .iter()
        .filter(|card| card.category() == CardCategory::Enchantment && card.template.effect.is_aura())
        .map(|card| (card.template.element, card.template.effect.clone()))
        .collect();

    for card in battlefield.iter_mut().filter(|card| card.is_creature()) {
        card.strip_buffs_from(BuffSource::Enchantment);
        if card.aura_skill {
            card.skill = None;
            card.aura_skill = false;
        }

        for (element, effect) in &enchantments {
            if element.is_none() || *element != card.template.element {
                continue;
            }
            match effect {
                CardEffect::FireAura => card.buffs.push(Buff::new(
                    BuffKind::Attack,
                    1,
                    Duration::Unbounded,
                    BuffSource::Enchantment,
                )),
                CardEffect::IceShield | CardEffect::ForestHeart => card.buffs.push(Buff::new(
                    BuffKind::Armor,
                    1,
                    Duration::Unbounded,
                    BuffSource::Enchantment,
                )),
                CardEffect::ShadowLink => {
                    if card.skill.is_none() {
                        card.skill = Some(shadow_link_skill());
                        card.aura_skill = true;
                    }
                }
                _ => {}
            }
        }
    }
}

pub fn rederive_player(player: &mut Player, active_biome: Option<&Card>) {
    derive_biome_auras(&mut player.battlefield, active_biome);
    derive_enchantment_auras(&mut player.battlefield);
}

/// 任何战场变动之后调用。
pub fn rederive(state: &mut GameState) {
    let biome = state.active_biome.as_ref();
    rederive_player(&mut state.player, biome);
    rederive_player(&mut state.opponent, biome);
    log::trace!("auras re-derived for turn {}", state.turn);
}
