use serde::{Deserialize, Serialize};

/// 牌组实例的全局唯一标识（区别于模板 id）。
pub type CardId = u32;
/// 卡牌模板标识，例如 `elemental_earth`。
pub type TemplateId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CardCategory {
    Creature,
    Land,
    Spell,
    Potion,
    Enchantment,
    Artifact,
    Biome,
    SpecialSummon,
}

impl CardCategory {
    /// 能够攻击、承受伤害并进入销毁清扫的类别。
    pub fn is_creature(self) -> bool {
        matches!(self, CardCategory::Creature | CardCategory::SpecialSummon)
    }

    /// 占用战场非地牌槽位的类别。
    pub fn occupies_slot(self) -> bool {
        matches!(
            self,
            CardCategory::Creature
                | CardCategory::SpecialSummon
                | CardCategory::Enchantment
                | CardCategory::Artifact
        )
    }

    /// 从手牌直接结算、结算后进入墓地的类别。
    pub fn is_instant(self) -> bool {
        matches!(self, CardCategory::Spell | CardCategory::Potion)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BiomeKind {
    Forest,
    Mountain,
    Desert,
    Volcano,
    Ice,
    Sanctuary,
    Swamp,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    Fire,
    Water,
    Earth,
    Air,
    Ice,
    Nature,
    Shadow,
    Light,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    #[default]
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuffKind {
    Attack,
    Armor,
    CritChance,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuffSource {
    Biome,
    Enchantment,
    Artifact,
    Spell,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Duration {
    Turns(u8),
    Unbounded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Buff {
    pub kind: BuffKind,
    pub magnitude: i16,
    pub duration: Duration,
    pub source: BuffSource,
    /// 授予该增益的卡牌实例（神器到期时据此剥离）。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<CardId>,
}

impl Buff {
    pub fn new(kind: BuffKind, magnitude: i16, duration: Duration, source: BuffSource) -> Self {
        Self {
            kind,
            magnitude,
            duration,
            source,
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: CardId) -> Self {
        self.origin = Some(origin);
        self
    }

    /// 群系与附魔增益属于派生状态，只能通过重新推导移除。
    pub fn is_derived(&self) -> bool {
        matches!(self.source, BuffSource::Biome | BuffSource::Enchantment)
    }

    pub fn decays(&self) -> bool {
        !self.is_derived() && matches!(self.duration, Duration::Turns(_))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    #[default]
    None,
    #[serde(rename = "self")]
    SelfTarget,
    FriendlyCreature,
    OpponentCreature,
    AnyCreature,
}

impl TargetKind {
    pub fn needs_target(self) -> bool {
        matches!(
            self,
            TargetKind::FriendlyCreature | TargetKind::OpponentCreature | TargetKind::AnyCreature
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SkillKind {
    Taunt,
    Heal { amount: i16 },
    Lifesteal,
    DrawCard { count: u8 },
    Damage { amount: i16 },
    DamageAndHeal { damage: i16, heal: i16 },
    BuffAttack { amount: i16, duration: u8 },
    BuffArmor { amount: i16, duration: u8 },
    BuffAttackAndArmor { attack: i16, armor: i16, duration: u8 },
    SacrificeToHealAlly,
    GlobalArmorAura { amount: i16 },
    Revive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Skill {
    pub name: String,
    pub kind: SkillKind,
    #[serde(default)]
    pub target: TargetKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<u8>,
}

impl Skill {
    pub fn new(name: impl Into<String>, kind: SkillKind, target: TargetKind) -> Self {
        Self {
            name: name.into(),
            kind,
            target,
            cooldown: None,
        }
    }

    pub fn with_cooldown(mut self, turns: u8) -> Self {
        self.cooldown = Some(turns);
        self
    }

    /// 被动技能不能主动激活。
    pub fn is_passive(&self) -> bool {
        matches!(self.kind, SkillKind::Lifesteal)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SkillState {
    pub used: bool,
    pub on_cooldown: bool,
    pub remaining_cooldown: u8,
}

impl SkillState {
    pub fn is_ready(&self) -> bool {
        !self.used && !self.on_cooldown
    }

    pub fn start(&mut self, cooldown: Option<u8>) {
        self.used = true;
        if let Some(turns) = cooldown.filter(|turns| *turns > 0) {
            self.on_cooldown = true;
            self.remaining_cooldown = turns;
        }
    }

    pub fn tick(&mut self) {
        if self.on_cooldown {
            self.remaining_cooldown = self.remaining_cooldown.saturating_sub(1);
            if self.remaining_cooldown == 0 {
                self.on_cooldown = false;
            }
        }
        self.used = false;
    }
}

/// 模板级的牌面效果，在加载目录时一次性解析，运行期不再解析 id。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CardEffect {
    #[default]
    None,
    HealthPotion { amount: i16 },
    ManaPotion { amount: u8 },
    FireAura,
    IceShield,
    ForestHeart,
    ShadowLink,
}

impl CardEffect {
    pub fn from_template_id(id: &str) -> Self {
        if id.starts_with("health_potion") {
            CardEffect::HealthPotion { amount: 5 }
        } else if id.starts_with("mana_potion") {
            CardEffect::ManaPotion { amount: 2 }
        } else if id.starts_with("fire_aura") {
            CardEffect::FireAura
        } else if id.starts_with("ice_shield") {
            CardEffect::IceShield
        } else if id.starts_with("forest_heart") {
            CardEffect::ForestHeart
        } else if id.starts_with("shadow_link") {
            CardEffect::ShadowLink
        } else {
            CardEffect::None
        }
    }

    pub fn is_healing(&self) -> bool {
        matches!(self, CardEffect::HealthPotion { .. })
    }

    pub fn is_aura(&self) -> bool {
        matches!(
            self,
            CardEffect::FireAura
                | CardEffect::IceShield
                | CardEffect::ForestHeart
                | CardEffect::ShadowLink
        )
    }
}

/// 卡牌模板（不可变部分）。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardTemplate {
    pub id: TemplateId,
    pub name: String,
    pub category: CardCategory,
    #[serde(default)]
    pub mana_cost: u8,
    #[serde(default)]
    pub attack: i16,
    #[serde(default)]
    pub health: i16,
    #[serde(default)]
    pub armor: i16,
    #[serde(default)]
    pub crit_chance: i16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biome: Option<BiomeKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element: Option<Element>,
    #[serde(default)]
    pub rarity: Rarity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<Skill>,
    #[serde(default)]
    pub effect: CardEffect,
    /// 神器的持续回合数。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u8>,
}

impl CardTemplate {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: CardCategory, mana_cost: u8) -> Self {
        let id = id.into();
        let effect = CardEffect::from_template_id(&id);
        Self {
            id,
            name: name.into(),
            category,
            mana_cost,
            attack: 0,
            health: 0,
            armor: 0,
            crit_chance: 0,
            biome: None,
            element: None,
            rarity: Rarity::Common,
            skill: None,
            effect,
            duration: None,
        }
    }

    pub fn stats(mut self, attack: i16, health: i16, armor: i16, crit_chance: i16) -> Self {
        self.attack = attack;
        self.health = health;
        self.armor = armor;
        self.crit_chance = crit_chance;
        self
    }

    pub fn biome(mut self, biome: BiomeKind) -> Self {
        self.biome = Some(biome);
        self
    }

    pub fn element(mut self, element: Element) -> Self {
        self.element = Some(element);
        self
    }

    pub fn rarity(mut self, rarity: Rarity) -> Self {
        self.rarity = rarity;
        self
    }

    pub fn skill(mut self, skill: Skill) -> Self {
        self.skill = Some(skill);
        self
    }

    pub fn effect(mut self, effect: CardEffect) -> Self {
        self.effect = effect;
        self
    }

    pub fn duration(mut self, turns: u8) -> Self {
        self.duration = Some(turns);
        self
    }
}

/// 对局中的卡牌实例：模板 + 实例可变状态。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    pub uid: CardId,
    pub template: CardTemplate,
    pub current_health: i16,
    pub current_armor: i16,
    #[serde(default)]
    pub tapped: bool,
    #[serde(default)]
    pub summoning_sickness: bool,
    #[serde(default)]
    pub can_attack: bool,
    #[serde(default)]
    pub taunted: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buffs: Vec<Buff>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<Skill>,
    /// 技能来自附魔光环（暗影连结），重新推导时撤销。
    #[serde(default)]
    pub aura_skill: bool,
    #[serde(default)]
    pub skill_state: SkillState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining_duration: Option<u8>,
}

impl Card {
    pub fn from_template(template: &CardTemplate, uid: CardId) -> Self {
        Self {
            uid,
            template: template.clone(),
            current_health: template.health,
            current_armor: template.armor,
            tapped: false,
            summoning_sickness: false,
            can_attack: false,
            taunted: false,
            buffs: Vec::new(),
            skill: template.skill.clone(),
            aura_skill: false,
            skill_state: SkillState::default(),
            remaining_duration: template.duration,
        }
    }

    pub fn id(&self) -> &str {
        &self.template.id
    }

    pub fn name(&self) -> &str {
        &self.template.name
    }

    pub fn category(&self) -> CardCategory {
        self.template.category
    }

    pub fn is_creature(&self) -> bool {
        self.template.category.is_creature()
    }

    pub fn cost(&self) -> u8 {
        self.template.mana_cost
    }

    fn buff_total(&self, kind: BuffKind) -> i16 {
        self.buffs
            .iter()
            .filter(|buff| buff.kind == kind)
            .map(|buff| buff.magnitude)
            .sum()
    }

    pub fn effective_attack(&self) -> i16 {
        (self.template.attack + self.buff_total(BuffKind::Attack)).max(0)
    }

    pub fn effective_armor(&self) -> i16 {
        (self.current_armor + self.buff_total(BuffKind::Armor)).max(0)
    }

    pub fn effective_crit(&self) -> i16 {
        (self.template.crit_chance + self.buff_total(BuffKind::CritChance)).clamp(0, 100)
    }

    pub fn has_lifesteal(&self) -> bool {
        matches!(
            self.skill.as_ref().map(|skill| &skill.kind),
            Some(SkillKind::Lifesteal)
        )
    }

    pub fn is_damaged(&self) -> bool {
        self.current_health < self.template.health
    }

    /// 回复生命，上限为模板初始生命值；返回实际回复量。
    pub fn heal(&mut self, amount: i16) -> i16 {
        if amount <= 0 {
            return 0;
        }
        let before = self.current_health;
        self.current_health = (self.current_health + amount).min(self.template.health);
        (self.current_health - before).max(0)
    }

    /// 可以宣告攻击：未横置、无召唤失调、本回合可攻击。
    pub fn ready_to_attack(&self) -> bool {
        self.is_creature() && !self.tapped && !self.summoning_sickness && self.can_attack
    }

    /// 能否主动激活技能。
    pub fn skill_ready(&self) -> bool {
        !self.tapped
            && self.skill_state.is_ready()
            && self
                .skill
                .as_ref()
                .map(|skill| !skill.is_passive())
                .unwrap_or(false)
    }

    /// 进入墓地前恢复为“模板态”。
    pub fn reset_to_template(&mut self) {
        let uid = self.uid;
        *self = Card::from_template(&self.template, uid);
    }

    pub fn strip_buffs_from(&mut self, source: BuffSource) {
        self.buffs.retain(|buff| buff.source != source);
    }
}
