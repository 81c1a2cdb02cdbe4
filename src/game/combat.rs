//! 唯一的伤害结算例程：玩家攻击、反击与 AI 攻击都经过这里。

use rand::Rng;

use super::aura;
use super::card::{Card, CardId};
use super::state::{AnimationMarker, AttackTarget, GameLog, GameState, LogKind, Phase, Player, Side};

pub enum Defender<'a> {
    Creature(&'a mut Card),
    Player(&'a mut Player),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DamageReport {
    pub damage: i16,
    pub critical: bool,
    pub healed: i16,
}

/// 暴击伤害：攻击力 × 1.5 向下取整。
pub fn critical_damage(attack: i16) -> i16 {
    attack.saturating_mul(3) / 2
}

/// 结算一次伤害。暴击无视护甲且不消耗护甲；非暴击对生物先扣护甲，护甲按攻击力消耗。
/// 攻击者带吸血时，其拥有者回复实际伤害的一半（向上取整）。
pub fn resolve_damage<R: Rng>(
    attacker: &Card,
    defender: Defender<'_>,
    attacker_owner: &mut Player,
    log: &mut GameLog,
    turn: u32,
    hp_cap: i16,
    rng: &mut R,
) -> DamageReport {
    let attack = attacker.effective_attack();
    let crit_chance = f64::from(attacker.effective_crit()) / 100.0;
    let critical = rng.gen_bool(crit_chance.clamp(0.0, 1.0));
    let target_side = attacker_owner.side.other();

    let damage = match defender {
        Defender::Creature(card) => {
            let damage = if critical {
                critical_damage(attack)
            } else {
                let armor = card.effective_armor();
                card.current_armor = (card.current_armor - attack).max(0);
                (attack - armor).max(0)
            };
            card.current_health -= damage;
            let prefix = if critical { "Critical! " } else { "" };
            log.push(
                turn,
                LogKind::Damage,
                Some(target_side),
                format!("{prefix}{} deals {damage} damage to {}", attacker.name(), card.name()),
            );
            damage
        }
        Defender::Player(player) => {
            let damage = if critical {
                critical_damage(attack)
            } else {
                attack
            };
            player.hp -= damage;
            let prefix = if critical { "Critical! " } else { "" };
            log.push(
                turn,
                LogKind::Damage,
                Some(target_side),
                format!("{prefix}{} deals {damage} damage to {:?}", attacker.name(), player.side),
            );
            damage
        }
    };

    let mut healed = 0;
    if attacker.has_lifesteal() && damage > 0 {
        healed = attacker_owner.heal((damage + 1) / 2, hp_cap);
        if healed > 0 {
            log.push(
                turn,
                LogKind::Heal,
                Some(attacker_owner.side),
                format!("{} drains {healed} health", attacker.name()),
            );
        }
    }

    DamageReport {
        damage,
        critical,
        healed,
    }
}

/// 一次完整交战：攻击，存活的防守生物随即反击。调用方负责合法性校验。
pub fn engage(state: &mut GameState, side: Side, attacker_id: CardId, target: AttackTarget) {
    let Some(attacker) = state.side(side).find_on_battlefield(attacker_id).cloned() else {
        return;
    };
    let mut rng = state.take_rng();
    let hp_cap = state.config.max_hp;
    let turn = state.turn;
    let parts = state.parts_mut(side);
    parts.markers.push(AnimationMarker::Attacking { card_id: attacker_id });

    match target {
        AttackTarget::Player => {
            parts.log.push(
                turn,
                LogKind::Combat,
                Some(side.other()),
                format!("{} attacks {:?} directly", attacker.name(), side.other()),
            );
            resolve_damage(
                &attacker,
                Defender::Player(&mut *parts.other),
                parts.own,
                parts.log,
                turn,
                hp_cap,
                &mut rng,
            );
        }
        AttackTarget::Creature { card_id } => {
            if let Some(defender) = parts.other.battlefield.iter_mut().find(|c| c.uid == card_id) {
                parts.log.push(
                    turn,
                    LogKind::Combat,
                    Some(side.other()),
                    format!("{} attacks {}", attacker.name(), defender.name()),
                );
                resolve_damage(
                    &attacker,
                    Defender::Creature(defender),
                    parts.own,
                    parts.log,
                    turn,
                    hp_cap,
                    &mut rng,
                );
                parts.markers.push(AnimationMarker::Damaged { card_id });
            }

            let riposte = parts
                .other
                .find_on_battlefield(card_id)
                .filter(|defender| defender.is_creature() && defender.current_health > 0)
                .cloned();
            if let Some(defender) = riposte {
                if let Some(original) = parts.own.battlefield.iter_mut().find(|c| c.uid == attacker_id) {
                    parts.log.push(
                        turn,
                        LogKind::Combat,
                        Some(side),
                        format!("{} ripostes against {}", defender.name(), original.name()),
                    );
                    resolve_damage(
                        &defender,
                        Defender::Creature(original),
                        parts.other,
                        parts.log,
                        turn,
                        hp_cap,
                        &mut rng,
                    );
                    parts.markers.push(AnimationMarker::Damaged { card_id: attacker_id });
                }
            }
        }
    }

    if let Some(card) = parts.own.find_on_battlefield_mut(attacker_id) {
        card.tapped = true;
        card.can_attack = false;
    }
    state.restore_rng(rng);

    destroy_sweep(state);
    check_winner(state);
}

/// 把双方战场上生命值 ≤ 0 的生物移入各自墓地。
pub fn destroy_sweep(state: &mut GameState) -> usize {
    let mut removed = 0;
    for side in [Side::Player, Side::Opponent] {
        let player = state.side_mut(side);
        let (dead, alive): (Vec<Card>, Vec<Card>) = player
            .battlefield
            .drain(..)
            .partition(|card| card.is_creature() && card.current_health <= 0);
        player.battlefield = alive;
        let names: Vec<(CardId, String)> = dead
            .iter()
            .map(|card| (card.uid, card.name().to_string()))
            .collect();
        for card in dead {
            player.bury(card);
        }
        for (uid, name) in names {
            state.markers.push(AnimationMarker::Destroyed { card_id: uid });
            state.record(LogKind::Destroy, Some(side), format!("{name} is destroyed"));
            removed += 1;
        }
    }
    if removed > 0 {
        aura::rederive(state);
    }
    removed
}

/// 任一方生命 ≤ 0 时立即结束对局。双方同时阵亡时当前行动方获胜。
pub fn check_winner(state: &mut GameState) -> Option<Side> {
    if let Some(winner) = state.winner {
        return Some(winner);
    }
    let player_dead = state.player.hp <= 0;
    let opponent_dead = state.opponent.hp <= 0;
    let winner = match (player_dead, opponent_dead) {
        (false, false) => return None,
        (true, true) => state.active,
        (true, false) => Side::Opponent,
        (false, true) => Side::Player,
    };
    state.winner = Some(winner);
    state.phase = Phase::GameOver;
    state.selection = Default::default();
    state.record(LogKind::GameOver, Some(winner), format!("{winner:?} wins the game"));
    log::debug!("game over on turn {}: {:?} wins", state.turn, winner);
    Some(winner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::card::{CardCategory, CardTemplate, Skill, SkillKind, TargetKind};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn unit(uid: u32, attack: i16, health: i16, armor: i16, crit: i16) -> Card {
        let template = CardTemplate::new(format!("unit_{uid}"), format!("Unit {uid}"), CardCategory::Creature, 1)
            .stats(attack, health, armor, crit);
        let mut card = Card::from_template(&template, uid);
        card.can_attack = true;
        card
    }

    #[test]
    fn non_crit_damage_is_reduced_by_armor_and_consumes_armor() {
        let attacker = unit(1, 4, 5, 0, 0);
        let mut defender = unit(2, 1, 3, 2, 0);
        let mut owner = Player::new(Side::Player, 20, 1, 2);
        let mut log = GameLog::default();
        let mut rng = SmallRng::seed_from_u64(1);

        let report = resolve_damage(&attacker, Defender::Creature(&mut defender), &mut owner, &mut log, 1, 20, &mut rng);

        assert!(!report.critical);
        assert_eq!(report.damage, 2);
        assert_eq!(defender.current_health, 1);
        assert_eq!(defender.current_armor, 0);
    }

    #[test]
    fn critical_hits_bypass_armor_and_leave_it_intact() {
        let attacker = unit(1, 3, 5, 0, 100);
        let mut defender = unit(2, 1, 10, 2, 0);
        let mut owner = Player::new(Side::Player, 20, 1, 2);
        let mut log = GameLog::default();
        let mut rng = SmallRng::seed_from_u64(9);

        let report = resolve_damage(&attacker, Defender::Creature(&mut defender), &mut owner, &mut log, 1, 20, &mut rng);

        assert!(report.critical);
        assert_eq!(report.damage, 4);
        assert_eq!(defender.current_health, 6);
        assert_eq!(defender.current_armor, 2);
    }

    #[test]
    fn lifesteal_heals_owner_by_half_rounded_up_capped() {
        let mut attacker = unit(1, 3, 5, 0, 0);
        attacker.skill = Some(Skill::new("Drain", SkillKind::Lifesteal, TargetKind::None));
        let mut victim = Player::new(Side::Opponent, 20, 0, 2);
        let mut owner = Player::new(Side::Player, 15, 1, 2);
        let mut log = GameLog::default();
        let mut rng = SmallRng::seed_from_u64(2);

        let report = resolve_damage(&attacker, Defender::Player(&mut victim), &mut owner, &mut log, 1, 20, &mut rng);

        assert_eq!(report.damage, 3);
        assert_eq!(victim.hp, 17);
        assert_eq!(owner.hp, 17);

        owner.hp = 19;
        resolve_damage(&attacker, Defender::Player(&mut victim), &mut owner, &mut log, 1, 20, &mut rng);
        assert_eq!(owner.hp, 20);
    }

    #[test]
    fn engagement_applies_riposte_and_taps_attacker() {
        let mut state = GameState::default();
        state.player.battlefield.push(unit(1, 4, 5, 0, 0));
        state.opponent.battlefield.push(unit(2, 2, 3, 2, 0));

        engage(&mut state, Side::Player, 1, AttackTarget::Creature { card_id: 2 });

        let defender = state.opponent.find_on_battlefield(2).expect("defender survives");
        assert_eq!(defender.current_health, 1);
        let attacker = state.player.find_on_battlefield(1).expect("attacker survives");
        assert_eq!(attacker.current_health, 3);
        assert!(attacker.tapped);
        assert!(!attacker.can_attack);
    }

    #[test]
    fn lethal_player_damage_ends_the_game() {
        let mut state = GameState::default();
        state.player.battlefield.push(unit(1, 5, 5, 0, 0));
        state.opponent.hp = 4;

        engage(&mut state, Side::Player, 1, AttackTarget::Player);

        assert_eq!(state.winner, Some(Side::Player));
        assert_eq!(state.phase, Phase::GameOver);
        assert_eq!(state.log.count(LogKind::GameOver), 1);
    }

    #[test]
    fn sweep_moves_dead_creatures_to_graveyard_reset() {
        let mut state = GameState::default();
        let mut dead = unit(3, 1, 4, 1, 0);
        dead.current_health = 0;
        dead.current_armor = 0;
        state.opponent.battlefield.push(dead);

        assert_eq!(destroy_sweep(&mut state), 1);
        assert!(state.opponent.battlefield.is_empty());
        assert_eq!(state.opponent.graveyard[0].current_health, 4);
        assert_eq!(state.opponent.graveyard[0].current_armor, 1);
    }

    #[test]
    fn riposte_can_destroy_the_attacker() {
        let mut state = GameState::default();
        state.player.battlefield.push(unit(1, 5, 2, 0, 0));
        state.opponent.battlefield.push(unit(2, 3, 6, 0, 0));

        engage(&mut state, Side::Player, 1, AttackTarget::Creature { card_id: 2 });

        assert!(state.player.battlefield.is_empty());
        assert_eq!(state.player.graveyard.last().map(|c| c.uid), Some(1));
        assert_eq!(state.opponent.find_on_battlefield(2).map(|c| c.current_health), Some(1));
        assert_eq!(state.winner, None);
    }

    #[test]
    fn simultaneous_death_goes_to_the_active_player() {
        let mut state = GameState::default();
        state.active = Side::Opponent;
        state.player.hp = 0;
        state.opponent.hp = -2;

        assert_eq!(check_winner(&mut state), Some(Side::Opponent));
        assert_eq!(state.phase, Phase::GameOver);

        state.player.hp = 5;
        assert_eq!(check_winner(&mut state), Some(Side::Opponent));
        assert_eq!(state.log.count(LogKind::GameOver), 1);
    }
}
