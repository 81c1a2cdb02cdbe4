use serde::{Deserialize, Serialize};

use super::aura;
use super::card::{Card, TemplateId};
use super::catalog::Catalog;
use super::state::{AnimationMarker, GameState, LogKind, Side};

/// 融合配方：按顺序列出的组件 id 前缀与产物模板。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FusionRecipe {
    pub name: String,
    pub components: Vec<String>,
    pub result: TemplateId,
}

impl FusionRecipe {
    pub fn new(name: impl Into<String>, components: &[&str], result: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: components.iter().map(|c| c.to_string()).collect(),
            result: result.into(),
        }
    }

    /// 为每个组件在战场上找一张卡（每张至多使用一次，按前缀首个匹配）。
    pub fn match_battlefield(&self, battlefield: &[Card]) -> Option<Vec<usize>> {
        let mut taken: Vec<usize> = Vec::with_capacity(self.components.len());
        for prefix in &self.components {
            let (idx, _) = battlefield.iter().enumerate().find(|(idx, card)| {
                !taken.contains(idx) && card.id().starts_with(prefix.as_str())
            })?;
            taken.push(idx);
        }
        Some(taken)
    }
}

/// 对一方战场执行一轮融合检测。返回触发的融合次数。
pub fn detect_and_fuse(state: &mut GameState, side: Side, catalog: &Catalog) -> usize {
    let mut fused = 0;
    for recipe in catalog.recipes() {
        let Some(template) = catalog.get(&recipe.result) else {
            log::debug!("fusion recipe {} skipped: no template '{}'", recipe.name, recipe.result);
            continue;
        };
        let Some(mut indices) = recipe.match_battlefield(&state.side(side).battlefield) else {
            continue;
        };

        let uid = state.allocate_uid();
        let player = state.side_mut(side);
        indices.sort_unstable_by(|a, b| b.cmp(a));
        let mut consumed = Vec::with_capacity(indices.len());
        for idx in indices {
            consumed.push(player.battlefield.remove(idx));
        }
        for card in consumed.into_iter().rev() {
            player.bury(card);
        }

        let mut result = Card::from_template(template, uid);
        result.summoning_sickness = true;
        result.tapped = false;
        result.can_attack = false;
        player.battlefield.push(result);

        state.markers.push(AnimationMarker::Entering { card_id: uid });
        state.markers.push(AnimationMarker::Fused { card_id: uid });
        let message = format!("{} fused into {}", recipe.name, template.name);
        state.record(LogKind::Play, Some(side), message);
        log::debug!("fusion {} fired for {:?}", recipe.name, side);
        fused += 1;
    }

    if fused > 0 {
        aura::rederive(state);
    }
    fused
}
