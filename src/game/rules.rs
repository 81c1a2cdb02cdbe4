use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ai::{AiConfig, OpponentPolicy};

use super::{
    aura,
    card::{Buff, BuffKind, BuffSource, Card, CardCategory, CardEffect, CardId, Duration, SkillKind, TargetKind},
    catalog::Catalog,
    combat, deck, fusion,
    skills::{self, CastOutcome},
    state::{
        AnimationMarker, AttackTarget, GameState, IntegrityError, LogEntry, LogKind, PendingCast,
        Phase, Side,
    },
    turn,
};

/// 完整的合法输入字母表。人类玩家与 AI 使用同一套动作。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    InitializeGame {
        seed: u64,
    },
    RestartGame {
        seed: u64,
    },
    DrawCard {
        player: Side,
        count: u8,
    },
    PlayCard {
        card_id: CardId,
    },
    ChangeBiome {
        card_id: CardId,
        player: Side,
    },
    SelectCard {
        #[serde(default)]
        card_id: Option<CardId>,
    },
    SelectAttacker {
        card_id: CardId,
    },
    SelectDefender {
        target: AttackTarget,
    },
    DeclareAttack,
    CastSpellOnTarget {
        #[serde(default)]
        target_id: Option<CardId>,
    },
    PassTurn,
    Meditate,
    RedrawHand,
    ExecuteOpponentTurn,
    ActivateSkill {
        card_id: CardId,
        #[serde(default)]
        target_id: Option<CardId>,
    },
    ChangePhase {
        phase: Phase,
    },
    ActivateFocusDraw,
    Discard {
        card_id: CardId,
    },
}

impl Action {
    /// 不受“当前行动方”约束、由系统/表现层发起的动作。
    pub fn is_system(&self) -> bool {
        matches!(
            self,
            Action::InitializeGame { .. } | Action::RestartGame { .. } | Action::ExecuteOpponentTurn
        )
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum RuleError {
    #[error("The game is over; only a restart is accepted")]
    GameFinished,
    #[error("It is not {side:?}'s turn")]
    NotPlayerTurn { side: Side },
    #[error("Action not allowed during the {actual:?} phase")]
    InvalidPhase { actual: Phase },
    #[error("Card {card_id} is not available")]
    CardNotFound { card_id: CardId },
    #[error("Not enough mana: {required} required, {available} available")]
    InsufficientMana { required: u8, available: u8 },
    #[error("The battlefield is full")]
    BoardFull,
    #[error("A land has already been played this turn")]
    LandAlreadyPlayed,
    #[error("No biome changes left this turn")]
    NoBiomeChanges,
    #[error("Card {card_id} is not a biome")]
    NotABiome { card_id: CardId },
    #[error("Card {card_id} cannot attack right now")]
    AttackerNotReady { card_id: CardId },
    #[error("No attacker selected")]
    NoAttackerSelected,
    #[error("No defender selected")]
    NoDefenderSelected,
    #[error("Must target a taunted creature")]
    MustTargetTaunt,
    #[error("Invalid attack target")]
    InvalidAttackTarget,
    #[error("The skill of card {card_id} is not available")]
    SkillUnavailable { card_id: CardId },
    #[error("Card {card_id} cannot be cast")]
    NotCastable { card_id: CardId },
    #[error("The hand can only be redrawn once, on the first turn")]
    RedrawUnavailable,
    #[error("Focus draw is already prepared")]
    FocusAlreadySet,
    #[error("A card must be played before the turn can end")]
    MustPlayCard,
    #[error("Cannot discard: {reason}")]
    DiscardNotAllowed { reason: String },
    #[error("Cannot switch to the {target:?} phase")]
    InvalidPhaseChange { target: Phase },
    #[error("State integrity violated: {error:?}")]
    IntegrityViolation { error: IntegrityError },
}

/// 一次归约的结果：新状态与本次新增的日志。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResolution {
    pub state: GameState,
    pub entries: Vec<LogEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<Side>,
    pub accepted: bool,
}

impl RuleResolution {
    pub fn new(state: GameState, previous_len: usize, accepted: bool) -> Self {
        let entries = state
            .log
            .entries()
            .get(previous_len..)
            .unwrap_or_else(|| state.log.entries())
            .to_vec();
        let winner = state.winner;
        Self {
            state,
            entries,
            winner,
            accepted,
        }
    }
}

#[derive(Clone)]
pub struct RuleEngine {
    catalog: Catalog,
    ai_config: AiConfig,
}

impl Default for RuleEngine {
    fn default() -> Self {
        RuleEngine::new(Catalog::standard())
    }
}

impl RuleEngine {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            ai_config: AiConfig::default(),
        }
    }

    pub fn with_ai_config(mut self, config: AiConfig) -> Self {
        self.ai_config = config;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn ai_config(&self) -> &AiConfig {
        &self.ai_config
    }

    /// 发牌并返回回合 1 的初始状态。
    pub fn new_game(&self, seed: u64) -> GameState {
        self.reduce(&GameState::default(), Action::InitializeGame { seed })
    }

    /// 纯函数：(状态, 动作) → 新状态。非法动作返回原状态加一条 info 日志。
    pub fn reduce(&self, state: &GameState, action: Action) -> GameState {
        let mut next = state.clone();
        // 拒绝的原因已经作为 info 写进日志。
        self.dispatch(&mut next, action).ok();
        next
    }

    pub fn resolve(&self, state: &GameState, action: Action) -> RuleResolution {
        let previous_len = state.log.len();
        let mut next = state.clone();
        let accepted = self.dispatch(&mut next, action).is_ok();
        RuleResolution::new(next, previous_len, accepted)
    }

    /// 以 `actor` 的身份归约：非系统动作只有在轮到 `actor` 时才被接受。
    pub fn resolve_as(&self, actor: Side, state: &GameState, action: Action) -> RuleResolution {
        if action.is_system() || state.active == actor || state.is_finished() {
            return self.resolve(state, action);
        }
        let previous_len = state.log.len();
        let mut next = state.clone();
        next.info(Some(actor), RuleError::NotPlayerTurn { side: actor }.to_string());
        RuleResolution::new(next, previous_len, false)
    }

    /// 原子地执行动作及其后续动作；失败时状态只追加一条 info。
    pub fn dispatch(&self, state: &mut GameState, action: Action) -> Result<(), RuleError> {
        let mut working = state.clone();
        working.markers.clear();
        match self.apply_sequence(&mut working, action.clone()) {
            Ok(()) => {
                *state = working;
                Ok(())
            }
            Err(error) => {
                log::debug!("rejected {:?}: {}", action, error);
                let active = state.active;
                state.info(Some(active), error.to_string());
                Err(error)
            }
        }
    }

    fn apply_sequence(&self, state: &mut GameState, action: Action) -> Result<(), RuleError> {
        let mut queue = VecDeque::from([action]);
        while let Some(next) = queue.pop_front() {
            let follow_ups = self.apply(state, next)?;
            for follow_up in follow_ups.into_iter().rev() {
                queue.push_front(follow_up);
            }
        }
        state
            .integrity_check()
            .map_err(|error| RuleError::IntegrityViolation { error })
    }

    fn ensure_phase(state: &GameState, allowed: &[Phase]) -> Result<(), RuleError> {
        if !allowed.contains(&state.phase) {
            return Err(RuleError::InvalidPhase {
                actual: state.phase,
            });
        }
        Ok(())
    }

    fn ensure_affordable(state: &GameState, card: &Card) -> Result<(), RuleError> {
        let available = state.active_player().mana;
        if card.cost() > available {
            return Err(RuleError::InsufficientMana {
                required: card.cost(),
                available,
            });
        }
        Ok(())
    }

    fn hand_card(state: &GameState, card_id: CardId) -> Result<Card, RuleError> {
        state
            .active_player()
            .find_in_hand(card_id)
            .cloned()
            .ok_or(RuleError::CardNotFound { card_id })
    }

    fn apply(&self, state: &mut GameState, action: Action) -> Result<Vec<Action>, RuleError> {
        let restart = matches!(
            action,
            Action::InitializeGame { .. } | Action::RestartGame { .. }
        );
        if state.is_finished() && !restart {
            return Err(RuleError::GameFinished);
        }

        match action {
            Action::InitializeGame { seed } | Action::RestartGame { seed } => {
                self.start_game(state, seed);
                Ok(Vec::new())
            }
            Action::DrawCard { player, count } => {
                Self::ensure_phase(state, &[Phase::Main])?;
                if player != state.active {
                    return Err(RuleError::NotPlayerTurn { side: player });
                }
                deck::draw_cards(state, player, usize::from(count));
                Ok(Vec::new())
            }
            Action::PlayCard { card_id } => self.play_card(state, card_id),
            Action::ChangeBiome { card_id, player } => self.change_biome(state, card_id, player),
            Action::SelectCard { card_id } => {
                Self::ensure_phase(state, &[Phase::Main, Phase::PostMulligan, Phase::Combat])?;
                if let Some(card_id) = card_id {
                    Self::hand_card(state, card_id)?;
                }
                state.selection.card = card_id;
                Ok(Vec::new())
            }
            Action::SelectAttacker { card_id } => {
                Self::ensure_phase(state, &[Phase::Combat, Phase::Targeting])?;
                Self::validate_attacker(state, card_id)?;
                state.selection.attacker = Some(card_id);
                state.selection.defender = None;
                state.phase = Phase::Targeting;
                Ok(Vec::new())
            }
            Action::SelectDefender { target } => {
                Self::ensure_phase(state, &[Phase::Targeting])?;
                if state.selection.attacker.is_none() {
                    return Err(RuleError::NoAttackerSelected);
                }
                Self::validate_defender(state, target)?;
                state.selection.defender = Some(target);
                Ok(Vec::new())
            }
            Action::DeclareAttack => {
                self.declare_attack(state)?;
                Ok(Vec::new())
            }
            Action::CastSpellOnTarget { target_id } => {
                Self::ensure_phase(state, &[Phase::SpellTargeting])?;
                let pending = state
                    .selection
                    .casting
                    .ok_or(RuleError::InvalidPhase { actual: state.phase })?;
                let outcome = self.finish_cast(state, pending, target_id);
                if pending.post_mulligan && outcome != CastOutcome::Fizzled && !state.is_finished() {
                    return Ok(vec![Action::PassTurn]);
                }
                Ok(Vec::new())
            }
            Action::PassTurn => {
                if state.phase == Phase::PostMulligan && Self::has_playable_card(state) {
                    return Err(RuleError::MustPlayCard);
                }
                turn::pass_turn(state);
                Ok(Vec::new())
            }
            Action::Meditate => {
                Self::ensure_phase(state, &[Phase::Main])?;
                let side = state.active;
                let (amount, cap) = (state.config.meditate_heal, state.config.max_hp);
                let healed = state.side_mut(side).heal(amount, cap);
                state.record(LogKind::Heal, Some(side), format!("{side:?} meditates and recovers {healed} health"));
                Ok(vec![Action::PassTurn])
            }
            Action::RedrawHand => {
                Self::ensure_phase(state, &[Phase::Main])?;
                let side = state.active;
                if state.turn != 1 || state.side(side).has_redrawn {
                    return Err(RuleError::RedrawUnavailable);
                }
                let count = deck::redraw_hand(state, side);
                state.side_mut(side).has_redrawn = true;
                state.phase = Phase::PostMulligan;
                state.record(LogKind::Draw, Some(side), format!("{side:?} redraws {count} cards"));
                Ok(Vec::new())
            }
            Action::ExecuteOpponentTurn => {
                if state.active != Side::Opponent {
                    return Err(RuleError::NotPlayerTurn {
                        side: Side::Opponent,
                    });
                }
                Self::ensure_phase(state, &[Phase::Main])?;
                OpponentPolicy::new(self.ai_config.clone()).play_turn(self, state);
                if state.is_finished() {
                    Ok(Vec::new())
                } else {
                    Ok(vec![Action::PassTurn])
                }
            }
            Action::ActivateSkill { card_id, target_id } => {
                self.activate_skill(state, card_id, target_id)?;
                Ok(Vec::new())
            }
            Action::ChangePhase { phase } => {
                Self::change_phase(state, phase)?;
                Ok(Vec::new())
            }
            Action::ActivateFocusDraw => {
                Self::ensure_phase(state, &[Phase::Main])?;
                let side = state.active;
                let cost = state.config.focus_draw_cost;
                let player = state.side_mut(side);
                if player.focus_draw_next_turn {
                    return Err(RuleError::FocusAlreadySet);
                }
                if player.mana < cost {
                    return Err(RuleError::InsufficientMana {
                        required: cost,
                        available: player.mana,
                    });
                }
                player.mana -= cost;
                player.focus_draw_next_turn = true;
                state.record(LogKind::Mana, Some(side), format!("{side:?} focuses for a larger draw next turn"));
                Ok(Vec::new())
            }
            Action::Discard { card_id } => {
                self.desperation_discard(state, card_id)?;
                Ok(Vec::new())
            }
        }
    }

    fn start_game(&self, state: &mut GameState, seed: u64) {
        let mut fresh = GameState::new(state.config.clone(), seed);
        deck::deal(&mut fresh, &self.catalog);
        fresh.record(LogKind::GameStart, None, "A new duel begins");
        fresh.record(LogKind::Phase, Some(fresh.active), format!("{:?} begins turn 1", fresh.active));
        log::debug!("game started with seed {seed}");
        *state = fresh;
    }

    /// 手里是否还有一张此刻真正能打出的牌（费用、场位与施法目标都满足）。
    fn has_playable_card(state: &GameState) -> bool {
        let player = state.active_player();
        let foe = state.side(state.active.other());
        let board_open = player.occupied_slots() < state.config.max_board_size;
        player.hand.iter().filter(|card| player.can_afford(card)).any(|card| match card.category() {
            CardCategory::Biome => player.biome_changes_left > 0,
            CardCategory::Land => !player.land_played_this_turn,
            CardCategory::Creature
            | CardCategory::SpecialSummon
            | CardCategory::Enchantment
            | CardCategory::Artifact => board_open,
            CardCategory::Potion if card.template.effect != CardEffect::None => true,
            CardCategory::Potion | CardCategory::Spell => match card.skill.as_ref().map(|skill| skill.target) {
                None => false,
                Some(TargetKind::FriendlyCreature) => player.creature_count() > 0,
                Some(TargetKind::OpponentCreature) => foe.creature_count() > 0,
                Some(TargetKind::AnyCreature) => player.creature_count() + foe.creature_count() > 0,
                Some(_) => true,
            },
        })
    }

    fn play_card(&self, state: &mut GameState, card_id: CardId) -> Result<Vec<Action>, RuleError> {
        Self::ensure_phase(state, &[Phase::Main, Phase::PostMulligan])?;
        let side = state.active;
        let card = Self::hand_card(state, card_id)?;
        Self::ensure_affordable(state, &card)?;
        let post_mulligan = state.phase == Phase::PostMulligan;

        let mut follow_ups = Vec::new();
        match card.category() {
            // 换牌后的强制结束回合由 ChangeBiome 自己追加。
            CardCategory::Biome => {
                return Ok(vec![Action::ChangeBiome {
                    card_id,
                    player: side,
                }]);
            }
            CardCategory::Land => self.play_land(state, side, card_id)?,
            CardCategory::Creature
            | CardCategory::SpecialSummon
            | CardCategory::Enchantment
            | CardCategory::Artifact => self.play_permanent(state, side, card_id)?,
            CardCategory::Potion if card.template.effect != CardEffect::None => {
                self.drink_potion(state, side, card_id)?
            }
            CardCategory::Potion | CardCategory::Spell => {
                let skill = card
                    .skill
                    .clone()
                    .ok_or(RuleError::NotCastable { card_id })?;
                let pending = PendingCast {
                    caster: card_id,
                    owner: side,
                    from_hand: true,
                    post_mulligan,
                };
                state.selection.card = Some(card_id);
                if skill.target.needs_target() {
                    state.selection.casting = Some(pending);
                    state.phase = Phase::SpellTargeting;
                    state.record(LogKind::Phase, Some(side), format!("Choose a target for {}", card.name()));
                    return Ok(follow_ups);
                }
                if self.finish_cast(state, pending, None) == CastOutcome::Fizzled {
                    return Ok(follow_ups);
                }
            }
        }

        if post_mulligan && !state.is_finished() {
            follow_ups.push(Action::PassTurn);
        }
        Ok(follow_ups)
    }

    fn play_land(&self, state: &mut GameState, side: Side, card_id: CardId) -> Result<(), RuleError> {
        let max_mana = state.config.max_mana;
        let player = state.side_mut(side);
        if player.land_played_this_turn {
            return Err(RuleError::LandAlreadyPlayed);
        }
        let mut land = player
            .remove_from_hand(card_id)
            .ok_or(RuleError::CardNotFound { card_id })?;
        player.mana -= land.cost();
        land.summoning_sickness = true;
        let name = land.name().to_string();
        player.battlefield.push(land);
        player.land_played_this_turn = true;
        player.mana = (player.mana + 1).min(max_mana);
        let mana = player.mana;
        state.record(LogKind::Play, Some(side), format!("{side:?} plays {name}"));
        state.record(LogKind::Mana, Some(side), format!("{side:?} has {mana} mana"));
        Ok(())
    }

    fn play_permanent(&self, state: &mut GameState, side: Side, card_id: CardId) -> Result<(), RuleError> {
        let max_board = state.config.max_board_size;
        let player = state.side_mut(side);
        if player.occupied_slots() >= max_board {
            return Err(RuleError::BoardFull);
        }
        let mut card = player
            .remove_from_hand(card_id)
            .ok_or(RuleError::CardNotFound { card_id })?;
        player.mana -= card.cost();

        match card.category() {
            CardCategory::SpecialSummon => {
                card.summoning_sickness = false;
                card.can_attack = true;
            }
            CardCategory::Creature => {
                card.summoning_sickness = true;
                card.can_attack = false;
            }
            CardCategory::Artifact => {
                card.remaining_duration = card.template.duration;
                if let Some(SkillKind::GlobalArmorAura { amount }) = card.skill.as_ref().map(|s| s.kind.clone()) {
                    for ally in player.battlefield.iter_mut().filter(|c| c.is_creature()) {
                        ally.buffs.push(
                            Buff::new(BuffKind::Armor, amount, Duration::Unbounded, BuffSource::Artifact)
                                .with_origin(card_id),
                        );
                    }
                }
            }
            _ => {}
        }

        let name = card.name().to_string();
        player.battlefield.push(card);
        state.markers.push(AnimationMarker::Entering { card_id });
        state.record(LogKind::Play, Some(side), format!("{side:?} plays {name}"));

        aura::rederive(state);
        fusion::detect_and_fuse(state, side, &self.catalog);
        Ok(())
    }

    fn drink_potion(&self, state: &mut GameState, side: Side, card_id: CardId) -> Result<(), RuleError> {
        let (max_hp, max_mana) = (state.config.max_hp, state.config.max_mana);
        let player = state.side_mut(side);
        let potion = player
            .remove_from_hand(card_id)
            .ok_or(RuleError::CardNotFound { card_id })?;
        player.mana -= potion.cost();
        let name = potion.name().to_string();
        let effect = potion.template.effect.clone();
        player.bury(potion);

        state.record(LogKind::Spell, Some(side), format!("{side:?} drinks {name}"));
        match effect {
            CardEffect::HealthPotion { amount } => {
                let healed = state.side_mut(side).heal(amount, max_hp);
                state.record(LogKind::Heal, Some(side), format!("{side:?} recovers {healed} health"));
            }
            CardEffect::ManaPotion { amount } => {
                let player = state.side_mut(side);
                player.mana = player.mana.saturating_add(amount).min(max_mana);
                let mana = player.mana;
                state.record(LogKind::Mana, Some(side), format!("{side:?} has {mana} mana"));
            }
            _ => {}
        }
        Ok(())
    }

    fn change_biome(&self, state: &mut GameState, card_id: CardId, player: Side) -> Result<Vec<Action>, RuleError> {
        Self::ensure_phase(state, &[Phase::Main, Phase::PostMulligan])?;
        let post_mulligan = state.phase == Phase::PostMulligan;
        if player != state.active {
            return Err(RuleError::NotPlayerTurn { side: player });
        }
        let card = Self::hand_card(state, card_id)?;
        if card.category() != CardCategory::Biome {
            return Err(RuleError::NotABiome { card_id });
        }
        Self::ensure_affordable(state, &card)?;
        let max_mana = state.config.max_mana;
        let owner = state.side_mut(player);
        if owner.biome_changes_left == 0 {
            return Err(RuleError::NoBiomeChanges);
        }
        let biome = owner
            .remove_from_hand(card_id)
            .ok_or(RuleError::CardNotFound { card_id })?;
        owner.mana -= biome.cost();
        owner.mana = (owner.mana + 1).min(max_mana);
        owner.biome_changes_left -= 1;
        let name = biome.name().to_string();
        let mana = owner.mana;
        let mut shared = biome.clone();
        shared.reset_to_template();
        owner.bury(biome);
        state.active_biome = Some(shared);

        state.record(LogKind::Biome, None, format!("{player:?} changes the biome to {name}"));
        state.record(LogKind::Mana, Some(player), format!("{player:?} has {mana} mana"));
        aura::rederive(state);
        if post_mulligan {
            return Ok(vec![Action::PassTurn]);
        }
        Ok(Vec::new())
    }

    fn validate_attacker(state: &GameState, card_id: CardId) -> Result<(), RuleError> {
        let card = state
            .active_player()
            .find_on_battlefield(card_id)
            .ok_or(RuleError::CardNotFound { card_id })?;
        if !card.ready_to_attack() {
            return Err(RuleError::AttackerNotReady { card_id });
        }
        Ok(())
    }

    fn validate_defender(state: &GameState, target: AttackTarget) -> Result<(), RuleError> {
        let defender = state.side(state.active.other());
        match target {
            AttackTarget::Player => {
                if defender.has_taunt() {
                    return Err(RuleError::MustTargetTaunt);
                }
            }
            AttackTarget::Creature { card_id } => {
                let card = defender
                    .find_on_battlefield(card_id)
                    .filter(|card| card.is_creature())
                    .ok_or(RuleError::InvalidAttackTarget)?;
                if defender.has_taunt() && !card.taunted {
                    return Err(RuleError::MustTargetTaunt);
                }
            }
        }
        Ok(())
    }

    fn declare_attack(&self, state: &mut GameState) -> Result<(), RuleError> {
        Self::ensure_phase(state, &[Phase::Targeting])?;
        let attacker = state.selection.attacker.ok_or(RuleError::NoAttackerSelected)?;
        let target = state.selection.defender.ok_or(RuleError::NoDefenderSelected)?;
        Self::validate_attacker(state, attacker)?;
        Self::validate_defender(state, target)?;

        let side = state.active;
        combat::engage(state, side, attacker, target);
        state.selection.attacker = None;
        state.selection.defender = None;
        if !state.is_finished() {
            state.phase = Phase::Main;
        }
        Ok(())
    }

    fn activate_skill(
        &self,
        state: &mut GameState,
        card_id: CardId,
        target_id: Option<CardId>,
    ) -> Result<(), RuleError> {
        Self::ensure_phase(state, &[Phase::Main])?;
        let side = state.active;
        let card = state
            .side(side)
            .find_on_battlefield(card_id)
            .cloned()
            .ok_or(RuleError::CardNotFound { card_id })?;
        if !card.is_creature() || card.summoning_sickness || !card.skill_ready() {
            return Err(RuleError::SkillUnavailable { card_id });
        }
        let skill = card.skill.clone().ok_or(RuleError::SkillUnavailable { card_id })?;
        let pending = PendingCast {
            caster: card_id,
            owner: side,
            from_hand: false,
            post_mulligan: false,
        };
        if skill.target.needs_target() && target_id.is_none() {
            state.selection.casting = Some(pending);
            state.selection.attacker = Some(card_id);
            state.phase = Phase::SpellTargeting;
            state.record(LogKind::Phase, Some(side), format!("Choose a target for {}", skill.name));
            return Ok(());
        }
        self.finish_cast(state, pending, target_id);
        Ok(())
    }

    fn finish_cast(&self, state: &mut GameState, pending: PendingCast, target_id: Option<CardId>) -> CastOutcome {
        let outcome = skills::resolve_cast(state, pending, target_id);
        if let CastOutcome::Resolved { summoned: true } = outcome {
            aura::rederive(state);
            fusion::detect_and_fuse(state, pending.owner, &self.catalog);
        }
        if state.selection.attacker == Some(pending.caster) {
            state.selection.attacker = None;
        }
        if state.selection.card == Some(pending.caster) {
            state.selection.card = None;
        }
        outcome
    }

    fn change_phase(state: &mut GameState, target: Phase) -> Result<(), RuleError> {
        let allowed = matches!(
            (state.phase, target),
            (Phase::Main, Phase::Combat)
                | (Phase::Combat, Phase::Main)
                | (Phase::Targeting, Phase::Combat)
                | (Phase::Targeting, Phase::Main)
                | (Phase::SpellTargeting, Phase::Main)
        );
        if !allowed {
            return Err(RuleError::InvalidPhaseChange { target });
        }
        // 取消施放时回到施放开始前的阶段。
        let target = match (state.phase, state.selection.casting) {
            (Phase::SpellTargeting, Some(pending)) => pending.resume_phase(),
            _ => target,
        };
        state.phase = target;
        state.selection.attacker = None;
        state.selection.defender = None;
        state.selection.casting = None;
        let side = state.active;
        state.record(LogKind::Phase, Some(side), format!("{target:?} phase"));
        Ok(())
    }

    fn desperation_discard(&self, state: &mut GameState, card_id: CardId) -> Result<(), RuleError> {
        Self::ensure_phase(state, &[Phase::Main])?;
        let side = state.active;
        let config = state.config.clone();
        let card = Self::hand_card(state, card_id)?;
        let player = state.side_mut(side);
        if player.hp > config.desperation_hp {
            return Err(RuleError::DiscardNotAllowed {
                reason: format!("health must be {} or lower", config.desperation_hp),
            });
        }
        if player.desperation_discards >= config.desperation_limit {
            return Err(RuleError::DiscardNotAllowed {
                reason: "no discards left this turn".into(),
            });
        }
        if card.is_creature() || card.template.effect.is_healing() {
            return Err(RuleError::DiscardNotAllowed {
                reason: format!("{} cannot be discarded", card.name()),
            });
        }
        if let Some(discarded) = player.remove_from_hand(card_id) {
            player.bury(discarded);
        }
        player.desperation_discards += 1;
        let healed = player.heal(config.desperation_heal, config.max_hp);
        state.record(
            LogKind::Heal,
            Some(side),
            format!("{side:?} discards {} and recovers {healed} health", card.name()),
        );
        Ok(())
    }
}
