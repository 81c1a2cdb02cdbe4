//! 发牌、洗牌与受群系亲和度加权的抽牌。

use rand::seq::SliceRandom;
use rand::Rng;

use super::card::Card;
use super::catalog::Catalog;
use super::state::{GameState, LogKind, Side};

/// 群系亲和的卡在抽牌窗口内的权重。
const AFFINITY_WEIGHT: u32 = 3;

/// 按牌组清单生成一副牌（每张实例有全局唯一 uid）。
pub fn build_deck(state: &mut GameState, catalog: &Catalog) -> Vec<Card> {
    let mut deck = Vec::new();
    for entry in catalog.deck_list() {
        let Some(template) = catalog.get(&entry.template) else {
            continue;
        };
        for _ in 0..entry.copies {
            let uid = state.allocate_uid();
            deck.push(Card::from_template(template, uid));
        }
    }
    deck
}

pub fn shuffle<R: Rng>(cards: &mut [Card], rng: &mut R) {
    cards.shuffle(rng);
}

/// 选出下一张要抽的牌在牌库中的下标。
///
/// 无激活群系时取牌库顶；否则在顶部窗口内按亲和度加权随机挑选。
pub fn pick_draw_index<R: Rng>(deck: &[Card], active_biome: Option<&Card>, window: usize, rng: &mut R) -> Option<usize> {
    if deck.is_empty() {
        return None;
    }
    let Some(biome) = active_biome.and_then(|card| card.template.biome) else {
        return Some(0);
    };
    let window = window.max(1).min(deck.len());
    let weights: Vec<u32> = deck[..window]
        .iter()
        .map(|card| {
            if card.template.biome == Some(biome) {
                AFFINITY_WEIGHT
            } else {
                1
            }
        })
        .collect();
    let total: u32 = weights.iter().sum();
    let mut roll = rng.gen_range(0..total);
    for (idx, weight) in weights.iter().enumerate() {
        if roll < *weight {
            return Some(idx);
        }
        roll -= weight;
    }
    Some(0)
}

/// 抽 `count` 张牌。手牌已满或牌库为空时停止，并记录一条 info。返回实际抽到的张数。
pub fn draw_cards(state: &mut GameState, side: Side, count: usize) -> usize {
    let mut rng = state.take_rng();
    let mut drawn = 0;
    for _ in 0..count {
        let max_hand = state.config.max_hand_size;
        let window = state.config.affinity_window;
        let biome = state.active_biome.clone();
        let player = state.side_mut(side);
        if player.hand.len() >= max_hand {
            state.info(Some(side), "Hand is full; draw skipped");
            break;
        }
        let Some(idx) = pick_draw_index(&player.deck, biome.as_ref(), window, &mut rng) else {
            state.info(Some(side), "Deck is empty; nothing to draw");
            break;
        };
        let card = player.deck.remove(idx);
        let name = card.name().to_string();
        player.hand.push(card);
        drawn += 1;
        state.record(LogKind::Draw, Some(side), format!("Drew {name}"));
    }
    state.restore_rng(rng);
    drawn
}

/// 开局/重开：构建并洗混双方牌组，各抽起手牌。
pub fn deal(state: &mut GameState, catalog: &Catalog) {
    let mut player_deck = build_deck(state, catalog);
    let mut opponent_deck = build_deck(state, catalog);
    let mut rng = state.take_rng();
    shuffle(&mut player_deck, &mut rng);
    shuffle(&mut opponent_deck, &mut rng);
    state.restore_rng(rng);
    state.player.deck = player_deck;
    state.opponent.deck = opponent_deck;

    let starting = state.config.starting_hand;
    for side in [Side::Player, Side::Opponent] {
        let player = state.side_mut(side);
        let take = starting.min(player.deck.len());
        let opening: Vec<Card> = player.deck.drain(..take).collect();
        player.hand.extend(opening);
    }
}

/// 手牌放回牌库、洗混后重抽同样张数。
pub fn redraw_hand(state: &mut GameState, side: Side) -> usize {
    let mut rng = state.take_rng();
    let player = state.side_mut(side);
    let count = player.hand.len();
    let returned: Vec<Card> = player.hand.drain(..).collect();
    player.deck.extend(returned);
    shuffle(&mut player.deck, &mut rng);
    let take = count.min(player.deck.len());
    let fresh: Vec<Card> = player.deck.drain(..take).collect();
    player.hand.extend(fresh);
    state.restore_rng(rng);
    take
}
