pub mod ai;
pub mod cosmetic;
pub mod game;

use std::collections::HashMap;
use std::str::FromStr;

use gloo_timers::future::TimeoutFuture;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use ai::{AiConfig, AiDecision, AiDifficulty, AiRule, OpponentPolicy, TurnSummary};
pub use cosmetic::{CardIdea, CardIdeaRequest, CosmeticError, Difficulty, DifficultyReply, DifficultyRequest};
pub use game::{
    Action, AttackTarget, Card, CardId, Catalog, CatalogError, GameState, IntegrityError, LogEntry,
    LogKind, Phase, RuleConfig, RuleEngine, RuleError, RuleResolution, Side,
};

#[cfg(all(feature = "wee_alloc", target_arch = "wasm32"))]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
}

#[wasm_bindgen]
pub fn greet(name: &str) -> String {
    let message = format!("你好，{name}! 欢迎来到群系对决。");
    web_sys::console::log_1(&message.clone().into());
    message
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn resolution_json(resolution: &RuleResolution) -> Result<String, JsValue> {
    serde_json::to_string(resolution).map_err(serde_to_js_error)
}

fn parse_difficulty(difficulty: Option<String>) -> AiDifficulty {
    difficulty
        .as_deref()
        .and_then(|value| AiDifficulty::from_str(value).ok())
        .unwrap_or(AiDifficulty::Normal)
}

/// 加载卡牌目录；数据或素材缺失在此处即为致命错误。
fn load_catalog(catalog_json: &str, assets_json: Option<String>) -> Result<Catalog, JsValue> {
    let catalog = Catalog::from_json(catalog_json).map_err(serde_to_js_error)?;
    if let Some(assets_json) = assets_json {
        let assets: HashMap<String, String> =
            serde_json::from_str(&assets_json).map_err(serde_to_js_error)?;
        catalog.verify_assets(&assets).map_err(serde_to_js_error)?;
    }
    Ok(catalog)
}

#[wasm_bindgen]
pub struct GameEngine {
    engine: RuleEngine,
    state: GameState,
}

#[wasm_bindgen]
impl GameEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(seed: Option<u32>) -> GameEngine {
        let engine = RuleEngine::default();
        let state = engine.new_game(u64::from(seed.unwrap_or(0)));
        GameEngine { engine, state }
    }

    /// 使用外部卡牌目录（以及可选的素材清单）创建引擎。
    #[wasm_bindgen(js_name = "withCatalog")]
    pub fn with_catalog(
        catalog_json: &str,
        assets_json: Option<String>,
        seed: Option<u32>,
    ) -> Result<GameEngine, JsValue> {
        let engine = RuleEngine::new(load_catalog(catalog_json, assets_json)?);
        let state = engine.new_game(u64::from(seed.unwrap_or(0)));
        Ok(GameEngine { engine, state })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    pub fn set_state_json(&mut self, json: &str) -> Result<(), JsValue> {
        let state: GameState = serde_json::from_str(json).map_err(serde_to_js_error)?;
        state.integrity_check().map_err(|error| {
            to_value(&RuleError::IntegrityViolation { error }).unwrap_or_else(|err| serde_to_js_error(err))
        })?;
        self.state = state;
        Ok(())
    }

    pub fn set_difficulty(&mut self, difficulty: Option<String>) {
        let config = AiConfig::from_difficulty(parse_difficulty(difficulty));
        self.engine = self.engine.clone().with_ai_config(config);
    }

    /// 校验难度推荐服务的回复，并把推荐难度应用到对手 AI。
    pub fn apply_difficulty_reply(&mut self, json: &str) -> Result<JsValue, JsValue> {
        let reply = DifficultyReply::parse(json).map_err(serde_to_js_error)?;
        self.engine = self.engine.clone().with_ai_config(reply.ai_config());
        to_value(&reply).map_err(JsValue::from)
    }

    pub fn ai_config_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.engine.ai_config()).map_err(serde_to_js_error)
    }

    /// 人类玩家派发动作；非法动作不会报错，只会在日志里多一条 info。
    pub fn dispatch_json(&mut self, action_json: &str) -> Result<String, JsValue> {
        let action: Action = serde_json::from_str(action_json).map_err(serde_to_js_error)?;
        let resolution = self.engine.resolve_as(Side::Player, &self.state, action);
        self.state = resolution.state.clone();
        resolution_json(&resolution)
    }

    pub fn execute_opponent_turn(&mut self) -> Result<String, JsValue> {
        let resolution = self.engine.resolve(&self.state, Action::ExecuteOpponentTurn);
        self.state = resolution.state.clone();
        resolution_json(&resolution)
    }

    /// 延迟 `delay_ms` 后在当前状态的副本上执行对手回合，返回结算 JSON。
    /// 前端拿到结果后通过 `set_state_json` 提交。
    pub fn execute_opponent_turn_after(&self, delay_ms: Option<u32>) -> Promise {
        let engine = self.engine.clone();
        let state = self.state.clone();
        let delay = delay_ms.unwrap_or(0);

        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let resolution = engine.resolve(&state, Action::ExecuteOpponentTurn);
            let json = resolution_json(&resolution)?;
            Ok(JsValue::from_str(&json))
        })
    }

    /// 预览 AI 在当前状态下会采取的下一步。
    pub fn preview_ai_decision(&self) -> Result<JsValue, JsValue> {
        let policy = OpponentPolicy::new(self.engine.ai_config().clone());
        to_value(&policy.next_action(&self.state)).map_err(JsValue::from)
    }

    pub fn validate_state(&self) -> Result<(), JsValue> {
        self.state
            .integrity_check()
            .map_err(|error| serde_to_js_error(RuleError::IntegrityViolation { error }))
    }
}

/// 用标准目录生成一局新游戏的初始状态。
#[wasm_bindgen(js_name = "createGameState")]
pub fn create_game_state(seed: Option<u32>) -> Result<JsValue, JsValue> {
    let state = RuleEngine::default().new_game(u64::from(seed.unwrap_or(0)));
    to_value(&state).map_err(JsValue::from)
}

/// 纯函数接口：(状态, 动作) → 结算。
#[wasm_bindgen(js_name = "reduce")]
pub fn reduce(state: JsValue, action: JsValue) -> Result<JsValue, JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    let action: Action = from_value(action).map_err(JsValue::from)?;
    let resolution = RuleEngine::default().resolve(&state, action);
    to_value(&resolution).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    state
        .integrity_check()
        .map_err(|error| serde_to_js_error(RuleError::IntegrityViolation { error }))
}

#[wasm_bindgen(js_name = "validateDifficultyRequest")]
pub fn validate_difficulty_request(win_loss_ratio: f64, experience: f64) -> Result<JsValue, JsValue> {
    let request = DifficultyRequest::new(win_loss_ratio, experience).map_err(serde_to_js_error)?;
    to_value(&request).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "parseDifficultyReply")]
pub fn parse_difficulty_reply(json: &str) -> Result<JsValue, JsValue> {
    let reply = DifficultyReply::parse(json).map_err(serde_to_js_error)?;
    to_value(&reply).map_err(JsValue::from)
}

#[wasm_bindgen(js_name = "parseCardIdeas")]
pub fn parse_card_ideas(prompt: &str, count: u8, json: &str) -> Result<JsValue, JsValue> {
    let request = CardIdeaRequest::new(prompt, count).map_err(serde_to_js_error)?;
    let ideas = request.parse_reply(json).map_err(serde_to_js_error)?;
    to_value(&ideas).map_err(JsValue::from)
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
