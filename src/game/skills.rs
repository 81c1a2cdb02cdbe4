//! 技能/法术结算：目标解析、效果施加、冷却记账与销毁清扫。

use super::card::{Buff, BuffKind, BuffSource, Card, CardId, Duration, SkillKind, TargetKind};
use super::combat;
use super::deck;
use super::state::{AnimationMarker, GameState, LogKind, PendingCast, Phase, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOutcome {
    Resolved {
        /// 有卡牌进入战场（复活），调用方需要执行融合检测。
        summoned: bool,
    },
    Fizzled,
}

/// 按目标类别在战场上查找目标生物。
pub fn resolve_target(
    state: &GameState,
    owner: Side,
    caster: CardId,
    kind: TargetKind,
    requested: Option<CardId>,
) -> Option<(Side, CardId)> {
    let search = |side: Side, uid: CardId| {
        state
            .side(side)
            .find_on_battlefield(uid)
            .filter(|card| card.is_creature())
            .map(|card| (side, card.uid))
    };
    match kind {
        TargetKind::None => None,
        TargetKind::SelfTarget => search(owner, caster),
        TargetKind::FriendlyCreature => requested.and_then(|uid| search(owner, uid)),
        TargetKind::OpponentCreature => requested.and_then(|uid| search(owner.other(), uid)),
        TargetKind::AnyCreature => {
            requested.and_then(|uid| search(owner, uid).or_else(|| search(owner.other(), uid)))
        }
    }
}

fn caster_card(state: &GameState, cast: &PendingCast) -> Option<Card> {
    let owner = state.side(cast.owner);
    if cast.from_hand {
        owner.find_in_hand(cast.caster).cloned()
    } else {
        owner.find_on_battlefield(cast.caster).cloned()
    }
}

fn fizzle(state: &mut GameState, cast: &PendingCast, reason: &str) -> CastOutcome {
    state.phase = cast.resume_phase();
    state.selection.casting = None;
    state.info(Some(cast.owner), reason);
    CastOutcome::Fizzled
}

fn add_buff(state: &mut GameState, side: Side, uid: CardId, buff: Buff) {
    let kind = buff.kind;
    let magnitude = buff.magnitude;
    if let Some(card) = state.side_mut(side).find_on_battlefield_mut(uid) {
        card.buffs.push(buff);
        let name = card.name().to_string();
        state.record(LogKind::Buff, Some(side), format!("{name} gains {kind:?} +{magnitude}"));
    }
}

fn damage_creature(state: &mut GameState, side: Side, uid: CardId, amount: i16) {
    if let Some(card) = state.side_mut(side).find_on_battlefield_mut(uid) {
        card.current_health -= amount;
        let name = card.name().to_string();
        state.markers.push(AnimationMarker::Damaged { card_id: uid });
        state.record(LogKind::Damage, Some(side), format!("{name} takes {amount} damage"));
    }
}

fn heal_creature(state: &mut GameState, side: Side, uid: CardId, amount: i16) {
    if let Some(card) = state.side_mut(side).find_on_battlefield_mut(uid) {
        let healed = card.heal(amount);
        let name = card.name().to_string();
        state.record(LogKind::Heal, Some(side), format!("{name} recovers {healed} health"));
    }
}

fn heal_player(state: &mut GameState, side: Side, amount: i16) {
    let cap = state.config.max_hp;
    let healed = state.side_mut(side).heal(amount, cap);
    state.record(LogKind::Heal, Some(side), format!("{side:?} recovers {healed} health"));
}

/// 结算一次施放。成功后阶段回到 `main`，失效时回到施放前的阶段。
pub fn resolve_cast(state: &mut GameState, cast: PendingCast, requested: Option<CardId>) -> CastOutcome {
    let owner = cast.owner;
    let Some(caster) = caster_card(state, &cast) else {
        return fizzle(state, &cast, "The caster is no longer available");
    };
    let Some(skill) = caster.skill.clone() else {
        return fizzle(state, &cast, "Nothing to cast");
    };

    let target = resolve_target(state, owner, caster.uid, skill.target, requested);
    if skill.target != TargetKind::None && target.is_none() {
        return fizzle(state, &cast, "No valid target; the effect fizzles");
    }

    if cast.from_hand {
        let cost = caster.cost();
        let player = state.side_mut(owner);
        if player.mana < cost {
            return fizzle(state, &cast, "Not enough mana");
        }
        player.mana -= cost;
    }

    let verb = if cast.from_hand { LogKind::Spell } else { LogKind::Skill };
    state.record(verb, Some(owner), format!("{} uses {}", caster.name(), skill.name));

    let mut summoned = false;
    let mut sacrificed = false;
    match skill.kind {
        SkillKind::Taunt => {
            if let Some((side, uid)) = target {
                if let Some(card) = state.side_mut(side).find_on_battlefield_mut(uid) {
                    card.taunted = true;
                }
            }
        }
        SkillKind::Heal { amount } => match target {
            Some((side, uid)) => heal_creature(state, side, uid, amount),
            None => heal_player(state, owner, amount),
        },
        SkillKind::Lifesteal => {
            if let Some((side, uid)) = target {
                if let Some(card) = state.side_mut(side).find_on_battlefield_mut(uid) {
                    if card.skill.is_none() || card.aura_skill {
                        card.skill = Some(skill.clone());
                        card.aura_skill = false;
                    }
                }
            }
        }
        SkillKind::DrawCard { count } => {
            deck::draw_cards(state, owner, usize::from(count));
        }
        SkillKind::Damage { amount } => match target {
            Some((side, uid)) => damage_creature(state, side, uid, amount),
            None => {
                state.side_mut(owner.other()).hp -= amount;
                state.record(
                    LogKind::Damage,
                    Some(owner.other()),
                    format!("{} deals {amount} damage to {:?}", skill.name, owner.other()),
                );
            }
        },
        SkillKind::DamageAndHeal { damage, heal } => {
            if let Some((side, uid)) = target {
                damage_creature(state, side, uid, damage);
            }
            heal_player(state, owner, heal);
        }
        SkillKind::BuffAttack { amount, duration } => {
            if let Some((side, uid)) = target {
                add_buff(state, side, uid, Buff::new(BuffKind::Attack, amount, Duration::Turns(duration), BuffSource::Spell));
            }
        }
        SkillKind::BuffArmor { amount, duration } => {
            if let Some((side, uid)) = target {
                add_buff(state, side, uid, Buff::new(BuffKind::Armor, amount, Duration::Turns(duration), BuffSource::Spell));
            }
        }
        SkillKind::BuffAttackAndArmor { attack, armor, duration } => {
            if let Some((side, uid)) = target {
                add_buff(state, side, uid, Buff::new(BuffKind::Attack, attack, Duration::Turns(duration), BuffSource::Spell));
                add_buff(state, side, uid, Buff::new(BuffKind::Armor, armor, Duration::Turns(duration), BuffSource::Spell));
            }
        }
        SkillKind::SacrificeToHealAlly => {
            let Some((side, uid)) = target.filter(|(_, uid)| *uid != caster.uid && !cast.from_hand) else {
                return fizzle(state, &cast, "Sacrifice needs another ally");
            };
            if let Some(body) = state.side_mut(owner).remove_from_battlefield(caster.uid) {
                state.side_mut(owner).bury(body);
                state.record(LogKind::Destroy, Some(owner), format!("{} is sacrificed", caster.name()));
            }
            sacrificed = true;
            // 按目标自身剩余生命的 75% 回复。
            let amount = state
                .side(side)
                .find_on_battlefield(uid)
                .map(|card| card.current_health * 3 / 4)
                .unwrap_or(0);
            heal_creature(state, side, uid, amount);
        }
        SkillKind::GlobalArmorAura { amount } => {
            let allies: Vec<CardId> = state.side(owner).creatures().map(|card| card.uid).collect();
            for uid in allies {
                add_buff(state, owner, uid, Buff::new(BuffKind::Armor, amount, Duration::Turns(2), BuffSource::Spell));
            }
        }
        SkillKind::Revive => {
            let max_board = state.config.max_board_size;
            let player = state.side_mut(owner);
            let slot_free = player.occupied_slots() < max_board;
            let idx = player.graveyard.iter().rposition(|card| card.is_creature());
            match idx {
                Some(idx) if slot_free => {
                    let mut card = player.graveyard.remove(idx);
                    card.summoning_sickness = true;
                    card.can_attack = false;
                    let uid = card.uid;
                    let name = card.name().to_string();
                    player.battlefield.push(card);
                    state.markers.push(AnimationMarker::Entering { card_id: uid });
                    state.record(LogKind::Play, Some(owner), format!("{name} returns from the graveyard"));
                    summoned = true;
                }
                _ => state.info(Some(owner), "Nothing could be revived"),
            }
        }
    }

    combat::destroy_sweep(state);

    let player = state.side_mut(owner);
    if cast.from_hand {
        if let Some(card) = player.remove_from_hand(caster.uid) {
            player.bury(card);
        }
    } else if !sacrificed {
        if let Some(card) = player.find_on_battlefield_mut(caster.uid) {
            card.tapped = true;
            card.skill_state.start(skill.cooldown);
        }
    }

    state.selection.casting = None;
    if combat::check_winner(state).is_none() {
        state.phase = Phase::Main;
    }
    CastOutcome::Resolved { summoned }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::card::{CardCategory, CardTemplate, Skill};

    fn creature(uid: u32, attack: i16, health: i16, skill: Option<Skill>) -> Card {
        let mut template = CardTemplate::new(format!("c{uid}"), format!("Creature {uid}"), CardCategory::Creature, 2)
            .stats(attack, health, 0, 0);
        template.skill = skill;
        Card::from_template(&template, uid)
    }

    fn spell(uid: u32, cost: u8, kind: SkillKind, target: TargetKind) -> Card {
        let template = CardTemplate::new("spell", "Spell", CardCategory::Spell, cost)
            .skill(Skill::new("Spell", kind, target));
        Card::from_template(&template, uid)
    }

    fn hand_cast(uid: u32) -> PendingCast {
        PendingCast {
            caster: uid,
            owner: Side::Player,
            from_hand: true,
            post_mulligan: false,
        }
    }

    #[test]
    fn friendly_target_kind_ignores_enemy_creatures() {
        let mut state = GameState::default();
        state.player.battlefield.push(creature(1, 2, 2, None));
        state.opponent.battlefield.push(creature(2, 2, 2, None));

        assert_eq!(resolve_target(&state, Side::Player, 9, TargetKind::FriendlyCreature, Some(2)), None);
        assert_eq!(
            resolve_target(&state, Side::Player, 9, TargetKind::AnyCreature, Some(2)),
            Some((Side::Opponent, 2))
        );
        assert_eq!(
            resolve_target(&state, Side::Player, 9, TargetKind::OpponentCreature, Some(2)),
            Some((Side::Opponent, 2))
        );
    }

    #[test]
    fn damage_spell_kills_and_goes_to_graveyard() {
        let mut state = GameState::default();
        state.player.mana = 3;
        state.phase = Phase::SpellTargeting;
        state.player.hand.push(spell(10, 3, SkillKind::Damage { amount: 4 }, TargetKind::OpponentCreature));
        state.opponent.battlefield.push(creature(2, 3, 4, None));

        let outcome = resolve_cast(&mut state, hand_cast(10), Some(2));

        assert_eq!(outcome, CastOutcome::Resolved { summoned: false });
        assert!(state.opponent.battlefield.is_empty());
        assert_eq!(state.opponent.graveyard.len(), 1);
        assert_eq!(state.player.graveyard[0].uid, 10);
        assert_eq!(state.player.mana, 0);
        assert_eq!(state.phase, Phase::Main);
    }

    #[test]
    fn missing_target_fizzles_without_spending_the_card() {
        let mut state = GameState::default();
        state.player.mana = 3;
        state.phase = Phase::SpellTargeting;
        state.player.hand.push(spell(10, 3, SkillKind::Damage { amount: 4 }, TargetKind::OpponentCreature));

        assert_eq!(resolve_cast(&mut state, hand_cast(10), Some(77)), CastOutcome::Fizzled);
        assert_eq!(state.phase, Phase::Main);
        assert_eq!(state.player.hand.len(), 1);
        assert_eq!(state.player.mana, 3);
    }

    #[test]
    fn sacrifice_heals_by_target_remaining_health() {
        let mut state = GameState::default();
        let monk = creature(1, 1, 4, Some(Skill::new("Offer", SkillKind::SacrificeToHealAlly, TargetKind::FriendlyCreature)));
        let mut giant = creature(2, 6, 10, None);
        giant.current_health = 4;
        state.player.battlefield.push(monk);
        state.player.battlefield.push(giant);

        let cast = PendingCast {
            caster: 1,
            owner: Side::Player,
            from_hand: false,
            post_mulligan: false,
        };
        resolve_cast(&mut state, cast, Some(2));

        assert!(state.player.find_on_battlefield(1).is_none());
        assert_eq!(state.player.graveyard[0].uid, 1);
        assert_eq!(state.player.find_on_battlefield(2).map(|c| c.current_health), Some(7));
    }

    #[test]
    fn creature_skill_taps_caster_and_starts_cooldown() {
        let mut state = GameState::default();
        let skill = Skill::new("Mend", SkillKind::Heal { amount: 2 }, TargetKind::FriendlyCreature).with_cooldown(2);
        state.player.battlefield.push(creature(1, 1, 4, Some(skill)));
        let mut hurt = creature(2, 2, 5, None);
        hurt.current_health = 4;
        state.player.battlefield.push(hurt);

        let cast = PendingCast {
            caster: 1,
            owner: Side::Player,
            from_hand: false,
            post_mulligan: false,
        };
        resolve_cast(&mut state, cast, Some(2));

        let caster = state.player.find_on_battlefield(1).expect("caster stays");
        assert!(caster.tapped);
        assert!(caster.skill_state.used);
        assert_eq!(caster.skill_state.remaining_cooldown, 2);
        assert_eq!(state.player.find_on_battlefield(2).map(|c| c.current_health), Some(5));
    }

    #[test]
    fn revive_returns_latest_creature_with_sickness() {
        let mut state = GameState::default();
        state.player.mana = 3;
        state.player.graveyard.push(creature(5, 2, 2, None));
        state.player.hand.push(spell(10, 3, SkillKind::Revive, TargetKind::None));

        let outcome = resolve_cast(&mut state, hand_cast(10), None);

        assert_eq!(outcome, CastOutcome::Resolved { summoned: true });
        let revived = state.player.find_on_battlefield(5).expect("revived");
        assert!(revived.summoning_sickness);
    }

    #[test]
    fn lifesteal_spell_grants_skill_only_to_skill_less_creatures() {
        let mut state = GameState::default();
        state.player.mana = 4;
        state.player.battlefield.push(creature(1, 2, 3, None));
        let mend = Skill::new("Mend", SkillKind::Heal { amount: 2 }, TargetKind::FriendlyCreature);
        state.player.battlefield.push(creature(2, 2, 3, Some(mend)));
        state.player.hand.push(spell(10, 2, SkillKind::Lifesteal, TargetKind::FriendlyCreature));
        state.player.hand.push(spell(11, 2, SkillKind::Lifesteal, TargetKind::FriendlyCreature));

        resolve_cast(&mut state, hand_cast(10), Some(1));
        resolve_cast(&mut state, hand_cast(11), Some(2));

        let plain = state.player.find_on_battlefield(1).and_then(|c| c.skill.clone()).expect("granted");
        assert_eq!(plain.kind, SkillKind::Lifesteal);
        let healer = state.player.find_on_battlefield(2).and_then(|c| c.skill.clone()).expect("kept");
        assert_eq!(healer.kind, SkillKind::Heal { amount: 2 });
        assert_eq!(state.player.graveyard.len(), 2);
        assert_eq!(state.player.mana, 0);
    }

    #[test]
    fn fizzle_returns_to_the_phase_the_cast_started_from() {
        let mut state = GameState::default();
        state.player.mana = 3;
        state.phase = Phase::SpellTargeting;
        state.player.hand.push(spell(10, 3, SkillKind::Damage { amount: 4 }, TargetKind::OpponentCreature));
        let cast = PendingCast {
            post_mulligan: true,
            ..hand_cast(10)
        };

        assert_eq!(resolve_cast(&mut state, cast, None), CastOutcome::Fizzled);
        assert_eq!(state.phase, Phase::PostMulligan);
    }
}
