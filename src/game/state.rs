use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::card::{Card, CardCategory, CardId};

/// 对局双方。`Player` 先手。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Player,
    Opponent,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Player => Side::Opponent,
            Side::Opponent => Side::Player,
        }
    }

    pub fn first_mover() -> Side {
        Side::Player
    }
}

/// 规则常量。随状态一起携带，保证归约函数是纯函数。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuleConfig {
    pub max_hp: i16,
    pub max_mana: u8,
    pub max_hand_size: usize,
    pub max_board_size: usize,
    pub starting_hand: usize,
    pub biome_changes_per_turn: u8,
    pub focus_draw_count: usize,
    pub focus_draw_cost: u8,
    pub meditate_heal: i16,
    pub desperation_hp: i16,
    pub desperation_heal: i16,
    pub desperation_limit: u8,
    pub affinity_window: usize,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            max_hp: 20,
            max_mana: 10,
            max_hand_size: 7,
            max_board_size: 7,
            starting_hand: 5,
            biome_changes_per_turn: 2,
            focus_draw_count: 3,
            focus_draw_cost: 2,
            meditate_heal: 2,
            desperation_hp: 8,
            desperation_heal: 3,
            desperation_limit: 2,
            affinity_window: 3,
        }
    }
}

/// 玩家状态，包括牌库、手牌、战场、墓地。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub side: Side,
    pub hp: i16,
    pub mana: u8,
    pub max_mana: u8,
    /// 牌库，下标 0 为下一张抽到的牌。
    #[serde(default)]
    pub deck: Vec<Card>,
    #[serde(default)]
    pub hand: Vec<Card>,
    #[serde(default)]
    pub battlefield: Vec<Card>,
    #[serde(default)]
    pub graveyard: Vec<Card>,
    pub biome_changes_left: u8,
    #[serde(default)]
    pub has_redrawn: bool,
    #[serde(default)]
    pub focus_draw_next_turn: bool,
    #[serde(default)]
    pub land_played_this_turn: bool,
    #[serde(default)]
    pub desperation_discards: u8,
}

impl Player {
    pub fn new(side: Side, hp: i16, mana: u8, biome_changes: u8) -> Self {
        Self {
            side,
            hp,
            mana,
            max_mana: mana,
            deck: Vec::new(),
            hand: Vec::new(),
            battlefield: Vec::new(),
            graveyard: Vec::new(),
            biome_changes_left: biome_changes,
            has_redrawn: false,
            focus_draw_next_turn: false,
            land_played_this_turn: false,
            desperation_discards: 0,
        }
    }

    pub fn find_in_hand(&self, uid: CardId) -> Option<&Card> {
        self.hand.iter().find(|card| card.uid == uid)
    }

    pub fn remove_from_hand(&mut self, uid: CardId) -> Option<Card> {
        let idx = self.hand.iter().position(|card| card.uid == uid)?;
        Some(self.hand.remove(idx))
    }

    pub fn find_on_battlefield(&self, uid: CardId) -> Option<&Card> {
        self.battlefield.iter().find(|card| card.uid == uid)
    }

    pub fn find_on_battlefield_mut(&mut self, uid: CardId) -> Option<&mut Card> {
        self.battlefield.iter_mut().find(|card| card.uid == uid)
    }

    pub fn remove_from_battlefield(&mut self, uid: CardId) -> Option<Card> {
        let idx = self.battlefield.iter().position(|card| card.uid == uid)?;
        Some(self.battlefield.remove(idx))
    }

    pub fn creatures(&self) -> impl Iterator<Item = &Card> {
        self.battlefield.iter().filter(|card| card.is_creature())
    }

    pub fn creature_count(&self) -> usize {
        self.creatures().count()
    }

    pub fn occupied_slots(&self) -> usize {
        self.battlefield
            .iter()
            .filter(|card| card.category().occupies_slot())
            .count()
    }

    pub fn has_taunt(&self) -> bool {
        self.creatures().any(|card| card.taunted)
    }

    /// 卡牌进入墓地：先恢复模板态，再放入。
    pub fn bury(&mut self, mut card: Card) {
        card.reset_to_template();
        self.graveyard.push(card);
    }

    pub fn heal(&mut self, amount: i16, cap: i16) -> i16 {
        if amount <= 0 || self.hp <= 0 {
            return 0;
        }
        let before = self.hp;
        self.hp = (self.hp + amount).min(cap);
        (self.hp - before).max(0)
    }

    pub fn can_afford(&self, card: &Card) -> bool {
        card.cost() <= self.mana
    }

    pub fn lands_in_play(&self) -> usize {
        self.battlefield
            .iter()
            .filter(|card| card.category() == CardCategory::Land)
            .count()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Main,
    Combat,
    Targeting,
    SpellTargeting,
    PostMulligan,
    GameOver,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    GameStart,
    GameOver,
    Phase,
    Play,
    Draw,
    Combat,
    Damage,
    Heal,
    Buff,
    Debuff,
    Destroy,
    Skill,
    Spell,
    Mana,
    Biome,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogEntry {
    pub turn: u32,
    pub kind: LogKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Side>,
    pub message: String,
}

/// 只追加的对局日志，表现层唯一的叙述通道。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct GameLog {
    entries: Vec<LogEntry>,
}

impl GameLog {
    pub fn push(&mut self, turn: u32, kind: LogKind, target: Option<Side>, message: impl Into<String>) {
        self.entries.push(LogEntry {
            turn,
            kind,
            target,
            message: message.into(),
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub fn count(&self, kind: LogKind) -> usize {
        self.entries.iter().filter(|entry| entry.kind == kind).count()
    }
}

/// 攻击目标：生物或对方玩家本人。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttackTarget {
    Creature { card_id: CardId },
    Player,
}

/// 正在施放、等待目标的技能或法术。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingCast {
    pub caster: CardId,
    pub owner: Side,
    /// 施法者来自手牌（法术/药水）而非战场生物。
    pub from_hand: bool,
    /// 换牌后必须出的那张牌：结算成功即结束回合，失效或取消则回到 `PostMulligan`。
    #[serde(default)]
    pub post_mulligan: bool,
}

impl PendingCast {
    /// 施放失效或被取消时回到的阶段。
    pub fn resume_phase(&self) -> Phase {
        if self.post_mulligan {
            Phase::PostMulligan
        } else {
            Phase::Main
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnimationMarker {
    Entering { card_id: CardId },
    Attacking { card_id: CardId },
    Damaged { card_id: CardId },
    Destroyed { card_id: CardId },
    Fused { card_id: CardId },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Selection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<CardId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attacker: Option<CardId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defender: Option<AttackTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub casting: Option<PendingCast>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum IntegrityError {
    DuplicateCardId { card_id: CardId },
    HpOutOfRange { side: Side, value: i16 },
    ManaOutOfRange { side: Side, value: u8 },
    HandOverflow { side: Side, size: usize },
    BoardOverflow { side: Side, size: usize },
}

/// 游戏整体状态。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameState {
    pub turn: u32,
    pub active: Side,
    pub phase: Phase,
    pub player: Player,
    pub opponent: Player,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_biome: Option<Card>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Side>,
    #[serde(default)]
    pub log: GameLog,
    #[serde(default)]
    pub selection: Selection,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<AnimationMarker>,
    #[serde(default)]
    pub config: RuleConfig,
    pub rng_seed: u64,
    pub next_uid: CardId,
}

/// 同时可变借用双方玩家与日志。
pub struct Parts<'a> {
    pub own: &'a mut Player,
    pub other: &'a mut Player,
    pub log: &'a mut GameLog,
    pub markers: &'a mut Vec<AnimationMarker>,
    pub active_biome: Option<&'a Card>,
    pub config: &'a RuleConfig,
    pub turn: u32,
}

impl GameState {
    pub fn new(config: RuleConfig, seed: u64) -> Self {
        let biome_changes = config.biome_changes_per_turn;
        let hp = config.max_hp;
        Self {
            turn: 1,
            active: Side::first_mover(),
            phase: Phase::Main,
            player: Player::new(Side::Player, hp, 1, biome_changes),
            opponent: Player::new(Side::Opponent, hp, 0, biome_changes),
            active_biome: None,
            winner: None,
            log: GameLog::default(),
            selection: Selection::default(),
            markers: Vec::new(),
            config,
            rng_seed: seed,
            next_uid: 1,
        }
    }

    pub fn side(&self, side: Side) -> &Player {
        match side {
            Side::Player => &self.player,
            Side::Opponent => &self.opponent,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut Player {
        match side {
            Side::Player => &mut self.player,
            Side::Opponent => &mut self.opponent,
        }
    }

    pub fn active_player(&self) -> &Player {
        self.side(self.active)
    }

    pub fn parts_mut(&mut self, side: Side) -> Parts<'_> {
        let GameState {
            player,
            opponent,
            log,
            markers,
            active_biome,
            config,
            turn,
            ..
        } = self;
        let (own, other) = match side {
            Side::Player => (player, opponent),
            Side::Opponent => (opponent, player),
        };
        Parts {
            own,
            other,
            log,
            markers,
            active_biome: active_biome.as_ref(),
            config,
            turn: *turn,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.winner.is_some() || self.phase == Phase::GameOver
    }

    pub fn record(&mut self, kind: LogKind, target: Option<Side>, message: impl Into<String>) {
        let turn = self.turn;
        self.log.push(turn, kind, target, message);
    }

    pub fn info(&mut self, target: Option<Side>, message: impl Into<String>) {
        self.record(LogKind::Info, target, message);
    }

    pub fn allocate_uid(&mut self) -> CardId {
        let uid = self.next_uid;
        self.next_uid += 1;
        uid
    }

    /// 取出由状态种子派生的随机数发生器；用完后必须 `restore_rng`。
    pub fn take_rng(&mut self) -> SmallRng {
        SmallRng::seed_from_u64(self.rng_seed)
    }

    pub fn restore_rng(&mut self, mut rng: SmallRng) {
        self.rng_seed = rng.gen();
    }

    /// 在卡牌所在区域内查找其归属方（战场优先）。
    pub fn owner_on_battlefield(&self, uid: CardId) -> Option<Side> {
        [Side::Player, Side::Opponent]
            .into_iter()
            .find(|side| self.side(*side).find_on_battlefield(uid).is_some())
    }

    pub fn integrity_check(&self) -> Result<(), IntegrityError> {
        let mut seen = HashSet::new();
        for player in [&self.player, &self.opponent] {
            if player.hp > self.config.max_hp {
                return Err(IntegrityError::HpOutOfRange {
                    side: player.side,
                    value: player.hp,
                });
            }
            if player.max_mana > self.config.max_mana || player.mana > self.config.max_mana {
                return Err(IntegrityError::ManaOutOfRange {
                    side: player.side,
                    value: player.mana.max(player.max_mana),
                });
            }
            if player.hand.len() > self.config.max_hand_size {
                return Err(IntegrityError::HandOverflow {
                    side: player.side,
                    size: player.hand.len(),
                });
            }
            if player.occupied_slots() > self.config.max_board_size {
                return Err(IntegrityError::BoardOverflow {
                    side: player.side,
                    size: player.occupied_slots(),
                });
            }
            for card in player
                .deck
                .iter()
                .chain(player.hand.iter())
                .chain(player.battlefield.iter())
                .chain(player.graveyard.iter())
            {
                if !seen.insert(card.uid) {
                    return Err(IntegrityError::DuplicateCardId { card_id: card.uid });
                }
            }
        }
        Ok(())
    }
}

impl Default for GameState {
    fn default() -> Self {
        GameState::new(RuleConfig::default(), 0)
    }
}
