//! 回合引擎：回合结束衰减、回合开始抽牌与法力恢复。

use super::aura;
use super::card::{BiomeKind, BuffSource, Card, CardCategory, CardId, Duration};
use super::deck;
use super::state::{GameState, LogKind, Phase, Side};

fn decay_buffs(card: &mut Card) -> Vec<String> {
    let mut faded = Vec::new();
    let name = card.name().to_string();
    card.buffs.retain_mut(|buff| {
        if !buff.decays() {
            return true;
        }
        if let Duration::Turns(turns) = &mut buff.duration {
            *turns = turns.saturating_sub(1);
            if *turns == 0 {
                faded.push(format!("{name} loses {:?} +{}", buff.kind, buff.magnitude));
                return false;
            }
        }
        true
    });
    faded
}

/// 对结束回合的一方执行回合结束处理。
pub fn end_of_turn(state: &mut GameState, side: Side) {
    let sanctuary = state
        .active_biome
        .as_ref()
        .and_then(|card| card.template.biome)
        == Some(BiomeKind::Sanctuary);
    let biome_changes = state.config.biome_changes_per_turn;

    let mut debuffs = Vec::new();
    let mut healed = Vec::new();
    let mut expired: Vec<CardId> = Vec::new();

    let player = state.side_mut(side);
    for card in player.battlefield.iter_mut() {
        debuffs.extend(decay_buffs(card));
        card.skill_state.tick();

        if card.category() == CardCategory::Artifact {
            if let Some(remaining) = card.remaining_duration.as_mut() {
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    expired.push(card.uid);
                }
            }
        }

        if sanctuary && card.is_creature() && card.template.biome == Some(BiomeKind::Sanctuary) {
            let amount = card.heal(1);
            if amount > 0 {
                healed.push(card.name().to_string());
            }
        }

        card.tapped = false;
        if card.is_creature() {
            card.summoning_sickness = false;
            card.can_attack = true;
        }
    }

    for uid in &expired {
        if let Some(artifact) = player.remove_from_battlefield(*uid) {
            for creature in player.battlefield.iter_mut() {
                creature
                    .buffs
                    .retain(|buff| !(buff.source == BuffSource::Artifact && buff.origin == Some(*uid)));
            }
            let name = artifact.name().to_string();
            player.bury(artifact);
            debuffs.push(format!("{name} crumbles"));
        }
    }

    player.biome_changes_left = biome_changes;
    player.land_played_this_turn = false;
    player.desperation_discards = 0;

    for message in debuffs {
        state.record(LogKind::Debuff, Some(side), message);
    }
    for name in healed {
        state.record(LogKind::Heal, Some(side), format!("{name} is soothed by the sanctuary"));
    }
    if !expired.is_empty() {
        aura::rederive(state);
    }
}

/// 对即将行动的一方执行回合开始处理。
pub fn start_of_turn(state: &mut GameState, side: Side) {
    let focus_count = state.config.focus_draw_count;
    let max_mana = state.config.max_mana;
    let focus = std::mem::take(&mut state.side_mut(side).focus_draw_next_turn);
    let count = if focus { focus_count } else { 1 };
    deck::draw_cards(state, side, count);

    let player = state.side_mut(side);
    player.max_mana = (player.max_mana + 1).min(max_mana);
    player.mana = player.max_mana;
    let mana = player.mana;
    state.record(LogKind::Mana, Some(side), format!("{side:?} has {mana} mana"));
}

/// 结束当前回合并把行动权交给另一方。
pub fn pass_turn(state: &mut GameState) {
    let ending = state.active;
    end_of_turn(state, ending);

    let next = ending.other();
    state.active = next;
    state.phase = Phase::Main;
    state.selection = Default::default();
    if next == Side::first_mover() {
        state.turn += 1;
    }
    state.record(LogKind::Phase, Some(next), format!("{next:?} begins turn {}", state.turn));
    start_of_turn(state, next);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::card::{Buff, BuffKind, CardTemplate, Skill, SkillKind, TargetKind};
    use crate::game::catalog::Catalog;

    fn creature(uid: u32) -> Card {
        let template = CardTemplate::new("grunt", "Grunt", CardCategory::Creature, 1).stats(2, 4, 0, 0);
        Card::from_template(&template, uid)
    }

    #[test]
    fn spell_buffs_decay_while_derived_and_unbounded_buffs_stay() {
        let mut state = GameState::default();
        let mut card = creature(1);
        card.buffs.push(Buff::new(BuffKind::Attack, 2, Duration::Turns(1), BuffSource::Spell));
        card.buffs.push(Buff::new(BuffKind::Armor, 1, Duration::Turns(2), BuffSource::Spell));
        card.buffs.push(Buff::new(BuffKind::Armor, 1, Duration::Turns(1), BuffSource::Biome));
        card.buffs.push(Buff::new(BuffKind::Armor, 1, Duration::Unbounded, BuffSource::Artifact));
        state.player.battlefield.push(card);

        end_of_turn(&mut state, Side::Player);

        let buffs = &state.player.battlefield[0].buffs;
        assert_eq!(buffs.len(), 3);
        assert!(buffs.iter().all(|b| b.kind == BuffKind::Armor));
        assert_eq!(state.log.count(LogKind::Debuff), 1);
    }

    #[test]
    fn end_of_turn_untaps_and_clears_creature_sickness_only() {
        let mut state = GameState::default();
        let mut grunt = creature(1);
        grunt.tapped = true;
        grunt.summoning_sickness = true;
        grunt.skill = Some(Skill::new("Guard", SkillKind::Taunt, TargetKind::SelfTarget));
        grunt.skill_state.used = true;
        let land_template = CardTemplate::new("land_plains", "Plains", CardCategory::Land, 0);
        let mut land = Card::from_template(&land_template, 2);
        land.tapped = true;
        land.summoning_sickness = true;
        state.player.battlefield.push(grunt);
        state.player.battlefield.push(land);
        state.player.biome_changes_left = 0;

        end_of_turn(&mut state, Side::Player);

        let grunt = &state.player.battlefield[0];
        assert!(!grunt.tapped && !grunt.summoning_sickness && grunt.can_attack);
        assert!(!grunt.skill_state.used);
        let land = &state.player.battlefield[1];
        assert!(!land.tapped);
        assert!(land.summoning_sickness);
        assert_eq!(state.player.biome_changes_left, 2);
    }

    #[test]
    fn expired_artifact_is_buried_and_its_armor_stripped() {
        let catalog = Catalog::standard();
        let mut state = GameState::default();
        let template = catalog.require("iron_bulwark").expect("artifact");
        let mut artifact = Card::from_template(template, 5);
        artifact.remaining_duration = Some(1);
        let mut grunt = creature(1);
        grunt.buffs.push(Buff::new(BuffKind::Armor, 1, Duration::Unbounded, BuffSource::Artifact).with_origin(5));
        state.player.battlefield.push(grunt);
        state.player.battlefield.push(artifact);

        end_of_turn(&mut state, Side::Player);

        assert_eq!(state.player.battlefield.len(), 1);
        assert!(state.player.battlefield[0].buffs.is_empty());
        assert_eq!(state.player.graveyard[0].uid, 5);
    }

    #[test]
    fn sanctuary_heals_sanctuary_creatures_by_one() {
        let catalog = Catalog::standard();
        let mut state = GameState::default();
        let monk = catalog.require("sanctuary_monk").expect("monk");
        let mut card = Card::from_template(monk, 1);
        card.current_health = 2;
        state.player.battlefield.push(card);
        let biome = catalog.require("biome_sanctuary").expect("biome");
        state.active_biome = Some(Card::from_template(biome, 99));

        end_of_turn(&mut state, Side::Player);
        assert_eq!(state.player.battlefield[0].current_health, 3);
    }

    #[test]
    fn turn_counter_advances_once_per_round() {
        let catalog = Catalog::standard();
        let mut state = GameState::new(Default::default(), 3);
        crate::game::deck::deal(&mut state, &catalog);

        pass_turn(&mut state);
        assert_eq!((state.turn, state.active), (1, Side::Opponent));
        assert_eq!((state.opponent.mana, state.opponent.max_mana), (1, 1));
        assert_eq!(state.opponent.hand.len(), 6);

        pass_turn(&mut state);
        assert_eq!((state.turn, state.active), (2, Side::Player));
        assert_eq!((state.player.mana, state.player.max_mana), (2, 2));
    }

    #[test]
    fn focus_draw_grants_three_cards_once() {
        let catalog = Catalog::standard();
        let mut state = GameState::new(Default::default(), 4);
        crate::game::deck::deal(&mut state, &catalog);
        state.opponent.hand.truncate(2);
        state.opponent.focus_draw_next_turn = true;

        pass_turn(&mut state);
        assert_eq!(state.opponent.hand.len(), 5);
        assert!(!state.opponent.focus_draw_next_turn);
    }
}
