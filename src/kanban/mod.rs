/// Kanban board engine
///
/// The board has one lane per `Stage`. A card's lane is its `stage` and its
/// position is its index among the cards of the master collection sharing
/// that stage; there is no stored position field.
///
/// Moves read the whole card collection, rearrange it and write it back.
/// Nothing guards against two concurrent movers: the later whole-collection
/// write wins, including over cards the other mover did not touch.

use crate::{
    error::PipelineResult,
    models::{KanbanCard, Stage},
    store::{tables, EntityStore},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Index at which a dragged card lands relative to the card under the
/// pointer: before it when the pointer is above its midpoint, after it
/// otherwise (the midpoint itself counts as after)
pub fn compute_insertion_index(
    pointer_y: f64,
    card_top: f64,
    card_height: f64,
    card_index: usize,
) -> usize {
    if pointer_y < card_top + card_height / 2.0 {
        card_index
    } else {
        card_index + 1
    }
}

/// Vertical extent of a rendered card
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CardRect {
    pub top: f64,
    pub height: f64,
}

/// Drop index for a pointer over a lane
///
/// `cards` are the rects of the lane's cards in lane order, excluding the
/// card being dragged. Empty space below every card appends.
pub fn drop_index(pointer_y: f64, cards: &[CardRect]) -> usize {
    cards
        .iter()
        .enumerate()
        .find(|(i, rect)| compute_insertion_index(pointer_y, rect.top, rect.height, *i) == *i)
        .map(|(i, _)| i)
        .unwrap_or(cards.len())
}

/// Rects of `count` equally tall cards stacked from the top of a lane
pub fn stacked_rects(count: usize, card_height: f64) -> Vec<CardRect> {
    (0..count)
        .map(|i| CardRect {
            top: i as f64 * card_height,
            height: card_height,
        })
        .collect()
}

/// Command-surface message for a card move
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveCard {
    pub card_id: String,
    pub target_lane: Stage,
    pub target_index: usize,
}

/// Result of a move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveOutcome {
    pub success: bool,
    /// Card ids of the target lane after the move
    #[serde(rename = "updatedLaneOrder")]
    pub lane_order: Vec<String>,
}

impl MoveOutcome {
    fn failed() -> Self {
        Self {
            success: false,
            lane_order: Vec::new(),
        }
    }
}

/// One lane of the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lane {
    pub stage: Stage,
    pub cards: Vec<KanbanCard>,
}

/// Kanban engine
#[derive(Clone)]
pub struct KanbanEngine {
    store: Arc<EntityStore>,
}

impl KanbanEngine {
    pub fn new(store: Arc<EntityStore>) -> Self {
        Self { store }
    }

    /// All five lanes in board order
    pub async fn board(&self) -> PipelineResult<Vec<Lane>> {
        let cards = self.store.get(tables::KANBAN_CARDS).await?;
        Ok(Stage::ALL
            .iter()
            .map(|&stage| Lane {
                stage,
                cards: cards.iter().filter(|c| c.stage == stage).cloned().collect(),
            })
            .collect())
    }

    /// Ordered cards of one lane
    pub async fn lane(&self, stage: Stage) -> PipelineResult<Vec<KanbanCard>> {
        let cards = self.store.get(tables::KANBAN_CARDS).await?;
        Ok(cards.into_iter().filter(|c| c.stage == stage).collect())
    }

    pub async fn apply(&self, command: &MoveCard) -> PipelineResult<MoveOutcome> {
        self.move_card(&command.card_id, command.target_lane, command.target_index)
            .await
    }

    /// Move a card to where a pointer released at `pointer_y` lands in
    /// `target_lane`, with the lane's other cards stacked `card_height` apart
    pub async fn drop_card(
        &self,
        card_id: &str,
        target_lane: Stage,
        pointer_y: f64,
        card_height: f64,
    ) -> PipelineResult<MoveOutcome> {
        let others = self
            .lane(target_lane)
            .await?
            .iter()
            .filter(|c| c.id != card_id)
            .count();
        let index = drop_index(pointer_y, &stacked_rects(others, card_height));
        debug!(
            "Pointer at {} over {} resolves to index {}",
            pointer_y, target_lane, index
        );

        self.move_card(card_id, target_lane, index).await
    }

    /// Move a card into `target_lane` at `target_index`
    ///
    /// The index is taken relative to the target lane without the moved
    /// card and clamped to its length. The owning challenge's stage follows
    /// the card in the same unit of work.
    pub async fn move_card(
        &self,
        card_id: &str,
        target_lane: Stage,
        target_index: usize,
    ) -> PipelineResult<MoveOutcome> {
        let mut cards = self.store.get(tables::KANBAN_CARDS).await?;
        let Some(position) = cards.iter().position(|c| c.id == card_id) else {
            debug!("Move ignored, no card {}", card_id);
            return Ok(MoveOutcome::failed());
        };

        let mut card = cards.remove(position);
        let from = card.stage;

        let (mut lane, mut reassembled): (Vec<KanbanCard>, Vec<KanbanCard>) =
            cards.into_iter().partition(|c| c.stage == target_lane);

        let index = target_index.min(lane.len());
        card.stage = target_lane;
        lane.insert(index, card);

        let lane_order: Vec<String> = lane.iter().map(|c| c.id.clone()).collect();
        reassembled.extend(lane);

        let mut uow = self.store.begin();
        uow.set(tables::KANBAN_CARDS, &reassembled)?;

        let mut challenges = self.store.get(tables::CHALLENGES).await?;
        if let Some(challenge) = challenges
            .iter_mut()
            .find(|c| c.id == card_id && c.stage != target_lane)
        {
            challenge.stage = target_lane;
            challenge.updated_at = Utc::now();
            uow.set(tables::CHALLENGES, &challenges)?;
        }

        uow.commit().await?;

        info!(
            "Moved card {} from {} to {} at index {}",
            card_id, from, target_lane, index
        );

        Ok(MoveOutcome {
            success: true,
            lane_order,
        })
    }
}
