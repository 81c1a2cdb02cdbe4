//! 对手 AI：固定优先级阶梯 + 战斗阶段，所有动作都经由同一个归约器。

pub mod policy;

pub use policy::{AiConfig, AiDecision, AiDifficulty, AiRule, OpponentPolicy, TurnSummary};
