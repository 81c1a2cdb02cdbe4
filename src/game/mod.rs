//! 游戏核心逻辑模块（状态、归约器、战斗、技能、光环、融合、回合）。

pub mod aura;
pub mod card;
pub mod catalog;
pub mod combat;
pub mod deck;
pub mod fusion;
pub mod rules;
pub mod skills;
pub mod state;
pub mod turn;

pub use card::{
    BiomeKind,
    Buff,
    BuffKind,
    BuffSource,
    Card,
    CardCategory,
    CardEffect,
    CardId,
    CardTemplate,
    Duration,
    Element,
    Rarity,
    Skill,
    SkillKind,
    TargetKind,
    TemplateId,
};
pub use catalog::{Catalog, CatalogError, DeckEntry};
pub use fusion::FusionRecipe;
pub use rules::{Action, RuleEngine, RuleError, RuleResolution};
pub use state::{
    AnimationMarker,
    AttackTarget,
    GameLog,
    GameState,
    IntegrityError,
    LogEntry,
    LogKind,
    Phase,
    Player,
    RuleConfig,
    Selection,
    Side,
};
