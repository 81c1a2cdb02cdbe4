//! 两个文本生成辅助接口的输入/输出校验。引擎本身从不调用它们。

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ai::{AiConfig, AiDifficulty};

pub const MAX_CARD_IDEAS: u8 = 10;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CosmeticError {
    #[error("win/loss ratio must be within [0, 1], got {0}")]
    RatioOutOfRange(f64),
    #[error("experience must be a finite number")]
    InvalidExperience,
    #[error("unknown difficulty '{0}'")]
    UnknownDifficulty(String),
    #[error("prompt must not be empty")]
    EmptyPrompt,
    #[error("card idea count must be between 1 and {max}, got {count}")]
    CountOutOfRange { count: u8, max: u8 },
    #[error("expected at most {expected} card ideas, got {actual}")]
    TooManyIdeas { expected: u8, actual: usize },
    #[error("card idea {index} is missing a name")]
    UnnamedIdea { index: usize },
    #[error("malformed reply: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Expert,
}

impl FromStr for Difficulty {
    type Err = CosmeticError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "normal" | "medium" => Ok(Difficulty::Normal),
            "hard" => Ok(Difficulty::Hard),
            "expert" => Ok(Difficulty::Expert),
            other => Err(CosmeticError::UnknownDifficulty(other.to_string())),
        }
    }
}

impl Difficulty {
    pub fn ai_difficulty(self) -> AiDifficulty {
        match self {
            Difficulty::Easy => AiDifficulty::Easy,
            Difficulty::Normal => AiDifficulty::Normal,
            Difficulty::Hard | Difficulty::Expert => AiDifficulty::Hard,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyRequest {
    pub win_loss_ratio: f64,
    pub experience: f64,
}

impl DifficultyRequest {
    pub fn new(win_loss_ratio: f64, experience: f64) -> Result<Self, CosmeticError> {
        let request = Self {
            win_loss_ratio,
            experience,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), CosmeticError> {
        if !(0.0..=1.0).contains(&self.win_loss_ratio) {
            return Err(CosmeticError::RatioOutOfRange(self.win_loss_ratio));
        }
        if !self.experience.is_finite() {
            return Err(CosmeticError::InvalidExperience);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DifficultyReply {
    pub difficulty: Difficulty,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Deserialize)]
struct RawDifficultyReply {
    difficulty: String,
    #[serde(default)]
    explanation: String,
}

impl DifficultyReply {
    /// 解析生成服务的 JSON 回复；难度必须落在枚举集合内。
    pub fn parse(json: &str) -> Result<Self, CosmeticError> {
        let raw: RawDifficultyReply =
            serde_json::from_str(json).map_err(|err| CosmeticError::Malformed(err.to_string()))?;
        Ok(Self {
            difficulty: raw.difficulty.parse()?,
            explanation: raw.explanation,
        })
    }

    /// 按回复给出的难度配置对手 AI。
    pub fn ai_config(&self) -> AiConfig {
        AiConfig::from_difficulty(self.difficulty.ai_difficulty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardIdeaRequest {
    pub prompt: String,
    pub count: u8,
}

impl CardIdeaRequest {
    pub fn new(prompt: impl Into<String>, count: u8) -> Result<Self, CosmeticError> {
        let request = Self {
            prompt: prompt.into(),
            count,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), CosmeticError> {
        if self.prompt.trim().is_empty() {
            return Err(CosmeticError::EmptyPrompt);
        }
        if self.count == 0 || self.count > MAX_CARD_IDEAS {
            return Err(CosmeticError::CountOutOfRange {
                count: self.count,
                max: MAX_CARD_IDEAS,
            });
        }
        Ok(())
    }

    pub fn parse_reply(&self, json: &str) -> Result<Vec<CardIdea>, CosmeticError> {
        let ideas: Vec<CardIdea> =
            serde_json::from_str(json).map_err(|err| CosmeticError::Malformed(err.to_string()))?;
        if ideas.len() > usize::from(self.count) {
            return Err(CosmeticError::TooManyIdeas {
                expected: self.count,
                actual: ideas.len(),
            });
        }
        if let Some(index) = ideas.iter().position(|idea| idea.name.trim().is_empty()) {
            return Err(CosmeticError::UnnamedIdea { index });
        }
        Ok(ideas)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CardIdea {
    pub name: String,
    #[serde(default)]
    pub description: String,
}
