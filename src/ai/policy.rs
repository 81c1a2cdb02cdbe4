use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::game::{
    AttackTarget, Card, CardCategory, CardEffect, CardId, GameState, Phase, Player, Side,
    SkillKind, TargetKind,
};
use crate::game::{Action, RuleEngine};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AiDifficulty {
    Easy,
    Normal,
    Hard,
}

impl FromStr for AiDifficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(AiDifficulty::Easy),
            "normal" | "medium" => Ok(AiDifficulty::Normal),
            "hard" | "expert" => Ok(AiDifficulty::Hard),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiConfig {
    /// 每回合优先级阶梯的最大迭代次数。
    pub action_cap: usize,
    /// 生命值不高于该值时优先喝治疗药水。
    pub emergency_hp: i16,
    /// 不利交换（预期反击伤害 ≥ 剩余生命）时放弃攻击。
    pub avoid_bad_trades: bool,
}

impl AiConfig {
    pub fn from_difficulty(difficulty: AiDifficulty) -> Self {
        match difficulty {
            AiDifficulty::Easy => Self {
                action_cap: 8,
                emergency_hp: 6,
                avoid_bad_trades: false,
            },
            AiDifficulty::Normal => Self {
                action_cap: 24,
                emergency_hp: 10,
                avoid_bad_trades: true,
            },
            AiDifficulty::Hard => Self {
                action_cap: 40,
                emergency_hp: 12,
                avoid_bad_trades: true,
            },
        }
    }

    pub fn with_action_cap(mut self, cap: usize) -> Self {
        self.action_cap = cap;
        self
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig::from_difficulty(AiDifficulty::Normal)
    }
}

/// 阶梯中触发的规则。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AiRule {
    EmergencyHeal,
    BoardPresence,
    PlayLand,
    ManaAcceleration,
    LethalSpell,
    BuffSpell,
    CreatureSkill,
    DesperationDiscard,
    Develop,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiDecision {
    pub rule: AiRule,
    pub actions: Vec<Action>,
}

impl AiDecision {
    fn new(rule: AiRule, actions: Vec<Action>) -> Self {
        Self { rule, actions }
    }

    fn single(rule: AiRule, action: Action) -> Self {
        Self::new(rule, vec![action])
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnSummary {
    pub rules: Vec<AiRule>,
    pub attacks: usize,
    /// 达到迭代上限而被迫结束。
    pub capped: bool,
}

pub struct OpponentPolicy {
    config: AiConfig,
}

fn affordable<'a>(me: &'a Player) -> impl Iterator<Item = &'a Card> + 'a {
    me.hand.iter().filter(move |card| me.can_afford(card))
}

fn highest_cost<'a>(cards: impl Iterator<Item = &'a Card>) -> Option<&'a Card> {
    // 同费用时取手牌中靠前的一张
    cards.fold(None, |best: Option<&Card>, card| match best {
        Some(current) if current.cost() >= card.cost() => Some(current),
        _ => Some(card),
    })
}

fn strongest<'a>(cards: impl Iterator<Item = &'a Card>) -> Option<&'a Card> {
    cards.fold(None, |best: Option<&Card>, card| match best {
        Some(current) if current.effective_attack() >= card.effective_attack() => Some(current),
        _ => Some(card),
    })
}

fn lethal_amount(kind: &SkillKind) -> Option<i16> {
    match kind {
        SkillKind::Damage { amount } => Some(*amount),
        SkillKind::DamageAndHeal { damage, .. } => Some(*damage),
        _ => None,
    }
}

fn is_buff(kind: &SkillKind) -> bool {
    matches!(
        kind,
        SkillKind::BuffAttack { .. } | SkillKind::BuffArmor { .. } | SkillKind::BuffAttackAndArmor { .. }
    )
}

fn expected_hit(attacker: &Card, defender: &Card) -> i16 {
    (attacker.effective_attack() - defender.effective_armor()).max(0)
}

impl OpponentPolicy {
    pub fn new(config: AiConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AiConfig {
        &self.config
    }

    /// 走完当前行动方的整个回合（不包括结束回合本身）。
    pub fn play_turn(&self, engine: &RuleEngine, state: &mut GameState) -> TurnSummary {
        let mut summary = TurnSummary::default();
        let mut iterations = 0;
        while !state.is_finished() {
            if iterations >= self.config.action_cap {
                summary.capped = true;
                log::debug!("ai reached its action cap of {}", self.config.action_cap);
                break;
            }
            iterations += 1;
            let Some(decision) = self.next_action(state) else {
                break;
            };
            log::trace!("ai applies {:?}: {:?}", decision.rule, decision.actions);
            if !Self::commit(engine, state, decision.actions) {
                log::debug!("ai decision {:?} was rejected", decision.rule);
                break;
            }
            summary.rules.push(decision.rule);
        }

        if !state.is_finished() {
            summary.attacks = self.combat_pass(engine, state);
        }
        summary
    }

    /// 在工作副本上依次派发；全部成功才写回。
    fn commit(engine: &RuleEngine, state: &mut GameState, actions: Vec<Action>) -> bool {
        let mut trial = state.clone();
        for action in actions {
            if engine.dispatch(&mut trial, action).is_err() {
                return false;
            }
        }
        *state = trial;
        true
    }

    /// 按优先级阶梯选出第一个可执行的决策。
    pub fn next_action(&self, state: &GameState) -> Option<AiDecision> {
        if state.phase != Phase::Main || state.is_finished() {
            return None;
        }
        let side = state.active;
        let me = state.side(side);
        let foe = state.side(side.other());
        let config = &state.config;
        let slot_free = me.occupied_slots() < config.max_board_size;
        let has_potion = me.hand.iter().any(|card| card.template.effect.is_healing());

        // 1. 紧急治疗
        if me.hp <= self.config.emergency_hp && me.hp < config.max_hp {
            if let Some(potion) = affordable(me).find(|card| card.template.effect.is_healing()) {
                return Some(AiDecision::single(AiRule::EmergencyHeal, Action::PlayCard { card_id: potion.uid }));
            }
        }

        // 2. 场面不足两只生物时先铺场
        if me.creature_count() < 2 && slot_free {
            if let Some(card) = highest_cost(affordable(me).filter(|card| card.is_creature())) {
                return Some(AiDecision::single(AiRule::BoardPresence, Action::PlayCard { card_id: card.uid }));
            }
        }

        // 3. 地
        if !me.land_played_this_turn {
            if let Some(land) = affordable(me).find(|card| card.category() == CardCategory::Land) {
                return Some(AiDecision::single(AiRule::PlayLand, Action::PlayCard { card_id: land.uid }));
            }
        }

        // 4. 法力药水只在能解锁一张牌时使用
        for potion in affordable(me) {
            let CardEffect::ManaPotion { amount } = potion.template.effect else {
                continue;
            };
            let after = (me.mana - potion.cost()).saturating_add(amount).min(config.max_mana);
            let unlocks = me.hand.iter().any(|card| {
                card.uid != potion.uid
                    && card.template.effect == CardEffect::None
                    && card.cost() > me.mana
                    && card.cost() <= after
            });
            if unlocks {
                return Some(AiDecision::single(AiRule::ManaAcceleration, Action::PlayCard { card_id: potion.uid }));
            }
        }

        // 5. 斩杀法术打对方攻击力最高、可被击杀的生物
        for spell in affordable(me).filter(|card| card.category() == CardCategory::Spell) {
            let Some(skill) = spell.skill.as_ref() else {
                continue;
            };
            let Some(amount) = lethal_amount(&skill.kind) else {
                continue;
            };
            if !matches!(skill.target, TargetKind::OpponentCreature | TargetKind::AnyCreature) {
                continue;
            }
            if let Some(target) = strongest(foe.creatures().filter(|c| c.current_health <= amount)) {
                return Some(AiDecision::new(
                    AiRule::LethalSpell,
                    vec![
                        Action::PlayCard { card_id: spell.uid },
                        Action::CastSpellOnTarget {
                            target_id: Some(target.uid),
                        },
                    ],
                ));
            }
        }

        // 6. 强化己方攻击力最高的可攻击生物
        if let Some(attacker) = strongest(me.creatures().filter(|c| c.ready_to_attack())) {
            let buff = affordable(me).find(|card| {
                card.category() == CardCategory::Spell
                    && card.skill.as_ref().is_some_and(|skill| {
                        is_buff(&skill.kind)
                            && matches!(skill.target, TargetKind::FriendlyCreature | TargetKind::AnyCreature)
                    })
            });
            if let Some(spell) = buff {
                return Some(AiDecision::new(
                    AiRule::BuffSpell,
                    vec![
                        Action::PlayCard { card_id: spell.uid },
                        Action::CastSpellOnTarget {
                            target_id: Some(attacker.uid),
                        },
                    ],
                ));
            }
        }

        // 7. 生物技能
        if let Some(decision) = self.creature_skill(me, config.max_hand_size) {
            return Some(decision);
        }

        // 8. 绝境弃牌
        if me.hp <= config.desperation_hp && !has_potion && me.desperation_discards < config.desperation_limit {
            let discard = me
                .hand
                .iter()
                .filter(|card| !card.is_creature() && !card.template.effect.is_healing())
                .max_by_key(|card| card.cost());
            if let Some(card) = discard {
                return Some(AiDecision::single(AiRule::DesperationDiscard, Action::Discard { card_id: card.uid }));
            }
        }

        // 9. 发展场面
        if slot_free {
            let board_empty = me.creature_count() == 0;
            let creature = highest_cost(affordable(me).filter(|card| card.is_creature()));
            let permanent = highest_cost(affordable(me).filter(|card| match card.category() {
                CardCategory::Creature | CardCategory::SpecialSummon | CardCategory::Artifact => true,
                CardCategory::Enchantment => !board_empty,
                _ => false,
            }));
            let choice = if board_empty { creature.or(permanent) } else { permanent };
            if let Some(card) = choice {
                return Some(AiDecision::single(AiRule::Develop, Action::PlayCard { card_id: card.uid }));
            }
        }

        None
    }

    fn creature_skill(&self, me: &Player, max_hand: usize) -> Option<AiDecision> {
        for caster in me.creatures() {
            if caster.summoning_sickness || !caster.skill_ready() {
                continue;
            }
            let Some(skill) = caster.skill.as_ref() else {
                continue;
            };
            let target_id = match skill.kind {
                SkillKind::DrawCard { .. } if me.hand.len() < max_hand => None,
                SkillKind::Taunt if !caster.taunted => None,
                SkillKind::SacrificeToHealAlly => {
                    let ally = me
                        .creatures()
                        .filter(|ally| ally.uid != caster.uid && ally.effective_attack() >= 4 && ally.is_damaged())
                        .max_by_key(|ally| ally.template.health - ally.current_health);
                    match ally {
                        Some(ally) => Some(ally.uid),
                        None => continue,
                    }
                }
                _ => continue,
            };
            return Some(AiDecision::single(
                AiRule::CreatureSkill,
                Action::ActivateSkill {
                    card_id: caster.uid,
                    target_id,
                },
            ));
        }
        None
    }

    /// 为一个攻击者挑选目标；`None` 表示放弃攻击。
    pub fn choose_target(&self, state: &GameState, attacker: &Card) -> Option<AttackTarget> {
        let foe = state.side(state.active.other());

        let taunted = foe
            .creatures()
            .filter(|card| card.taunted)
            .min_by_key(|card| card.current_health);
        if let Some(guard) = taunted {
            return Some(AttackTarget::Creature { card_id: guard.uid });
        }

        let kill = strongest(
            foe.creatures()
                .filter(|card| expected_hit(attacker, card) >= card.current_health),
        );
        if let Some(victim) = kill {
            return Some(AttackTarget::Creature { card_id: victim.uid });
        }

        if foe.creature_count() == 0 || attacker.effective_attack() >= foe.hp {
            return Some(AttackTarget::Player);
        }

        let favourable = foe
            .creatures()
            .filter(|card| expected_hit(card, attacker) < attacker.current_health)
            .min_by_key(|card| card.current_health);
        match favourable {
            Some(card) => Some(AttackTarget::Creature { card_id: card.uid }),
            None if !self.config.avoid_bad_trades => foe
                .creatures()
                .min_by_key(|card| card.current_health)
                .map(|card| AttackTarget::Creature { card_id: card.uid }),
            None => None,
        }
    }

    /// 依次让每个可攻击的生物出手；每次交战后立即判定胜负。
    fn combat_pass(&self, engine: &RuleEngine, state: &mut GameState) -> usize {
        let side: Side = state.active;
        let attackers: Vec<CardId> = state
            .side(side)
            .creatures()
            .filter(|card| card.ready_to_attack())
            .map(|card| card.uid)
            .collect();

        let mut attacks = 0;
        for uid in attackers {
            if state.is_finished() {
                break;
            }
            let Some(attacker) = state.side(side).find_on_battlefield(uid).filter(|c| c.ready_to_attack()).cloned()
            else {
                continue;
            };
            let Some(target) = self.choose_target(state, &attacker) else {
                log::trace!("ai holds back {}", attacker.name());
                continue;
            };
            let actions = vec![
                Action::ChangePhase { phase: Phase::Combat },
                Action::SelectAttacker { card_id: uid },
                Action::SelectDefender { target },
                Action::DeclareAttack,
            ];
            if Self::commit(engine, state, actions) {
                attacks += 1;
            }
        }
        attacks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{CardTemplate, LogKind};

    fn setup() -> (RuleEngine, GameState) {
        let engine = RuleEngine::default();
        let mut state = GameState::default();
        state.active = Side::Opponent;
        (engine, state)
    }

    fn give(state: &mut GameState, engine: &RuleEngine, id: &str) -> CardId {
        let uid = state.allocate_uid();
        let template = engine.catalog().require(id).expect("template");
        state.opponent.hand.push(Card::from_template(template, uid));
        uid
    }

    fn unit(state: &mut GameState, side: Side, attack: i16, health: i16) -> CardId {
        let uid = state.allocate_uid();
        let template = CardTemplate::new(format!("unit_{uid}"), format!("Unit {uid}"), CardCategory::Creature, 2)
            .stats(attack, health, 0, 0);
        let mut card = Card::from_template(&template, uid);
        card.can_attack = true;
        state.side_mut(side).battlefield.push(card);
        uid
    }

    fn field(state: &mut GameState, engine: &RuleEngine, id: &str) -> CardId {
        let uid = state.allocate_uid();
        let template = engine.catalog().require(id).expect("template");
        let mut card = Card::from_template(template, uid);
        card.can_attack = true;
        state.opponent.battlefield.push(card);
        uid
    }

    fn policy() -> OpponentPolicy {
        OpponentPolicy::new(AiConfig::default())
    }

    #[test]
    fn difficulty_parses_aliases() {
        assert_eq!("Medium".parse::<AiDifficulty>(), Ok(AiDifficulty::Normal));
        assert_eq!("expert".parse::<AiDifficulty>(), Ok(AiDifficulty::Hard));
        assert!("impossible".parse::<AiDifficulty>().is_err());
        assert_eq!(AiConfig::default().action_cap, 24);
    }

    #[test]
    fn emergency_heal_comes_first() {
        let (engine, mut state) = setup();
        state.opponent.hp = 9;
        state.opponent.mana = 1;
        give(&mut state, &engine, "health_potion");

        let summary = policy().play_turn(&engine, &mut state);

        assert_eq!(summary.rules.first(), Some(&AiRule::EmergencyHeal));
        assert_eq!(state.opponent.hp, 14);
    }

    #[test]
    fn board_presence_plays_most_expensive_affordable_creature() {
        let (engine, mut state) = setup();
        state.opponent.mana = 3;
        give(&mut state, &engine, "forest_sprite");
        let fire = give(&mut state, &engine, "elemental_fire");
        give(&mut state, &engine, "mountain_giant");

        let decision = policy().next_action(&state).expect("a decision");
        assert_eq!(decision, AiDecision::single(AiRule::BoardPresence, Action::PlayCard { card_id: fire }));
    }

    #[test]
    fn lethal_spell_targets_strongest_killable_creature() {
        let (engine, mut state) = setup();
        state.opponent.mana = 3;
        unit(&mut state, Side::Opponent, 1, 1);
        unit(&mut state, Side::Opponent, 1, 1);
        let fireball = give(&mut state, &engine, "fireball");
        unit(&mut state, Side::Player, 2, 3);
        let big = unit(&mut state, Side::Player, 5, 4);
        unit(&mut state, Side::Player, 9, 9);

        let decision = policy().next_action(&state).expect("a decision");
        assert_eq!(decision.rule, AiRule::LethalSpell);
        assert_eq!(
            decision.actions,
            vec![
                Action::PlayCard { card_id: fireball },
                Action::CastSpellOnTarget { target_id: Some(big) },
            ]
        );
    }

    #[test]
    fn land_is_played_once_the_board_is_established() {
        let (engine, mut state) = setup();
        unit(&mut state, Side::Opponent, 1, 1);
        unit(&mut state, Side::Opponent, 1, 1);
        let land = give(&mut state, &engine, "land_plains");

        let decision = policy().next_action(&state).expect("a decision");
        assert_eq!(decision, AiDecision::single(AiRule::PlayLand, Action::PlayCard { card_id: land }));

        state.opponent.land_played_this_turn = true;
        assert_eq!(policy().next_action(&state), None);
    }

    #[test]
    fn mana_potion_is_used_only_when_it_unlocks_a_card() {
        let (engine, mut state) = setup();
        unit(&mut state, Side::Opponent, 1, 1);
        unit(&mut state, Side::Opponent, 1, 1);
        state.opponent.mana = 1;
        let potion = give(&mut state, &engine, "mana_potion");
        let giant = give(&mut state, &engine, "mountain_giant");

        assert_eq!(policy().next_action(&state), None);

        state.opponent.hand.retain(|card| card.uid != giant);
        give(&mut state, &engine, "elemental_fire");
        let decision = policy().next_action(&state).expect("a decision");
        assert_eq!(decision, AiDecision::single(AiRule::ManaAcceleration, Action::PlayCard { card_id: potion }));
    }

    #[test]
    fn buff_spell_goes_on_the_strongest_ready_attacker() {
        let (engine, mut state) = setup();
        state.opponent.mana = 2;
        unit(&mut state, Side::Opponent, 2, 3);
        let strong = unit(&mut state, Side::Opponent, 5, 3);
        let resting = unit(&mut state, Side::Opponent, 7, 3);
        if let Some(card) = state.opponent.find_on_battlefield_mut(resting) {
            card.tapped = true;
        }
        let cry = give(&mut state, &engine, "battle_cry");

        let decision = policy().next_action(&state).expect("a decision");
        assert_eq!(decision.rule, AiRule::BuffSpell);
        assert_eq!(
            decision.actions,
            vec![
                Action::PlayCard { card_id: cry },
                Action::CastSpellOnTarget { target_id: Some(strong) },
            ]
        );
    }

    #[test]
    fn draw_and_taunt_skills_are_used_without_a_target() {
        let (engine, mut state) = setup();
        let earth = field(&mut state, &engine, "elemental_earth");
        let sprite = field(&mut state, &engine, "forest_sprite");

        let decision = policy().next_action(&state).expect("a decision");
        assert_eq!(
            decision,
            AiDecision::single(AiRule::CreatureSkill, Action::ActivateSkill { card_id: earth, target_id: None })
        );

        if let Some(card) = state.opponent.find_on_battlefield_mut(earth) {
            card.taunted = true;
        }
        let decision = policy().next_action(&state).expect("a decision");
        assert_eq!(
            decision,
            AiDecision::single(AiRule::CreatureSkill, Action::ActivateSkill { card_id: sprite, target_id: None })
        );
    }

    #[test]
    fn sacrifice_heals_the_most_damaged_strong_ally() {
        let (engine, mut state) = setup();
        let monk = field(&mut state, &engine, "sanctuary_monk");
        let weak = unit(&mut state, Side::Opponent, 3, 6);
        let strong = unit(&mut state, Side::Opponent, 5, 6);
        for (uid, health) in [(weak, 1), (strong, 4)] {
            if let Some(card) = state.opponent.find_on_battlefield_mut(uid) {
                card.current_health = health;
            }
        }

        let decision = policy().next_action(&state).expect("a decision");
        assert_eq!(
            decision,
            AiDecision::single(
                AiRule::CreatureSkill,
                Action::ActivateSkill { card_id: monk, target_id: Some(strong) }
            )
        );

        if let Some(card) = state.opponent.find_on_battlefield_mut(strong) {
            card.current_health = 6;
        }
        assert_eq!(policy().next_action(&state), None);
    }

    #[test]
    fn desperation_discard_stops_after_two_cards() {
        let (engine, mut state) = setup();
        unit(&mut state, Side::Opponent, 1, 1);
        unit(&mut state, Side::Opponent, 1, 1);
        unit(&mut state, Side::Player, 1, 9);
        state.opponent.hp = 2;
        give(&mut state, &engine, "lightning_bolt");
        let fireball = give(&mut state, &engine, "fireball");
        give(&mut state, &engine, "stone_skin");

        let decision = policy().next_action(&state).expect("a decision");
        assert_eq!(decision, AiDecision::single(AiRule::DesperationDiscard, Action::Discard { card_id: fireball }));

        let summary = policy().play_turn(&engine, &mut state);
        let discards = summary.rules.iter().filter(|rule| **rule == AiRule::DesperationDiscard).count();
        assert_eq!(discards, 2);
        assert_eq!(state.opponent.desperation_discards, 2);
        assert_eq!(state.opponent.hand.len(), 1);
        assert_eq!(state.opponent.hp, 8);
    }

    #[test]
    fn enchantment_waits_for_a_creature_in_play() {
        let (engine, mut state) = setup();
        state.opponent.mana = 2;
        let aura = give(&mut state, &engine, "fire_aura");

        assert_eq!(policy().next_action(&state), None);

        unit(&mut state, Side::Opponent, 2, 2);
        let decision = policy().next_action(&state).expect("a decision");
        assert_eq!(decision, AiDecision::single(AiRule::Develop, Action::PlayCard { card_id: aura }));
    }

    #[test]
    fn combat_pass_goes_face_without_blockers_and_can_win() {
        let (engine, mut state) = setup();
        unit(&mut state, Side::Opponent, 3, 3);
        unit(&mut state, Side::Opponent, 3, 3);
        state.player.hp = 5;

        let summary = policy().play_turn(&engine, &mut state);

        assert_eq!(summary.attacks, 2);
        assert_eq!(state.winner, Some(Side::Opponent));
        assert_eq!(state.phase, Phase::GameOver);
        assert_eq!(state.log.count(LogKind::GameOver), 1);
    }

    #[test]
    fn taunted_creature_is_attacked_first() {
        let (_, mut state) = setup();
        let attacker = unit(&mut state, Side::Opponent, 3, 5);
        unit(&mut state, Side::Player, 1, 1);
        let guard = unit(&mut state, Side::Player, 1, 6);
        if let Some(card) = state.player.find_on_battlefield_mut(guard) {
            card.taunted = true;
        }

        let card = state.opponent.find_on_battlefield(attacker).cloned().expect("attacker");
        assert_eq!(
            policy().choose_target(&state, &card),
            Some(AttackTarget::Creature { card_id: guard })
        );
    }

    #[test]
    fn unfavourable_trade_is_skipped() {
        let (_, mut state) = setup();
        let attacker = unit(&mut state, Side::Opponent, 1, 2);
        unit(&mut state, Side::Player, 5, 6);

        let card = state.opponent.find_on_battlefield(attacker).cloned().expect("attacker");
        assert_eq!(policy().choose_target(&state, &card), None);

        let reckless = OpponentPolicy::new(AiConfig::from_difficulty(AiDifficulty::Easy));
        assert!(reckless.choose_target(&state, &card).is_some());
    }

    #[test]
    fn action_cap_bounds_the_ladder() {
        let (engine, mut state) = setup();
        state.opponent.mana = 10;
        for _ in 0..4 {
            give(&mut state, &engine, "forest_sprite");
        }
        let capped = OpponentPolicy::new(AiConfig::default().with_action_cap(1));

        let summary = capped.play_turn(&engine, &mut state);

        assert!(summary.capped);
        assert_eq!(summary.rules.len(), 1);
        assert_eq!(state.opponent.hand.len(), 3);
    }

    #[test]
    fn execute_opponent_turn_returns_control_to_player() {
        let engine = RuleEngine::default();
        let state = engine.new_game(12);
        let state = engine.reduce(&state, Action::PassTurn);
        assert_eq!(state.active, Side::Opponent);

        let next = engine.reduce(&state, Action::ExecuteOpponentTurn);

        assert_eq!(next.active, Side::Player);
        assert_eq!(next.turn, 2);
        assert!(next.integrity_check().is_ok());
    }
}
