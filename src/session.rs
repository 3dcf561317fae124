//! Session-scoped UI state and its transition table.
//!
//! Every user or I/O event goes through [`Session::dispatch`], which mutates the
//! session and returns the render effects to apply. Nothing here touches the
//! network or a rendering surface; see `driver.rs` for the async side.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::catalog::{Catalog, Product};
use crate::conversation::{ChatMessage, Conversation};
use crate::filter::{self, FilterOutcome, FilterQuery};
use crate::selection::{ProductCard, SelectionSet};
use crate::storage::{load_direction, save_direction, Direction, KeyValueStore};

pub type SlotId = i64;

pub const EMPTY_SELECTION_MESSAGE: &str = "Please select at least one product first.";
pub const CHAT_ERROR_MESSAGE: &str = "Sorry, I couldn't process your message. Please try again.";
pub const ROUTINE_ERROR_MESSAGE: &str =
    "Sorry, there was an error generating your routine. Please try again.";
pub const ROUTINE_HEADING: &str = "Your Personalized Routine:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    CategoryChanged(Option<String>),
    /// Already debounced.
    SearchChanged(String),
    ProductClicked(String),
    ProductRemoved(String),
    SelectionCleared,
    DirectionToggled,
    ChatSubmitted(String),
    RoutineRequested,
    ReplyChunk { slot: SlotId, delta: String },
    ReplyFinished { slot: SlotId },
    ReplyFailed { slot: SlotId, error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Chat,
    Routine,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductView {
    Placeholder,
    NoResults,
    Cards(Vec<ProductCard>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ShowProducts(ProductView),
    HighlightCard { name: String, selected: bool },
    ShowSelection(Vec<Product>),
    SetDirection(Direction),
    AppendUserTurn(String),
    OpenSlot { slot: SlotId, kind: ReplyKind },
    UpdateSlot { slot: SlotId, content: String },
    FinalizeSlot { slot: SlotId },
    AppendError(String),
    SendToRelay { slot: SlotId, messages: Vec<ChatMessage> },
}

struct PendingReply {
    kind: ReplyKind,
    buffer: String,
}

pub struct Session {
    catalog: Catalog,
    store: Box<dyn KeyValueStore + Send>,
    selection: SelectionSet,
    query: FilterQuery,
    outcome: FilterOutcome,
    conversation: Conversation,
    direction: Direction,
    pending: HashMap<SlotId, PendingReply>,
    last_slot: SlotId,
}

impl Session {
    pub fn new(catalog: Catalog, store: Box<dyn KeyValueStore + Send>) -> Self {
        let selection = SelectionSet::restore(store.as_ref());
        let direction = load_direction(store.as_ref());
        debug!(
            "Session restored {} selected products, direction {}",
            selection.len(),
            direction.as_str()
        );
        Self {
            catalog,
            store,
            selection,
            query: FilterQuery::default(),
            outcome: FilterOutcome::Placeholder,
            conversation: Conversation::default(),
            direction,
            pending: HashMap::new(),
            last_slot: 0,
        }
    }

    /// Effects that draw the initial state of every panel.
    pub fn initial_effects(&self) -> Vec<Effect> {
        vec![
            Effect::SetDirection(self.direction),
            Effect::ShowProducts(self.product_view()),
            Effect::ShowSelection(self.selection.products().to_vec()),
        ]
    }

    pub fn dispatch(&mut self, event: UiEvent) -> Vec<Effect> {
        match event {
            UiEvent::CategoryChanged(category) => {
                self.query.category = category;
                self.refilter()
            }
            UiEvent::SearchChanged(search) => {
                self.query.search = search;
                self.refilter()
            }
            UiEvent::ProductClicked(name) => self.toggle(&name),
            UiEvent::ProductRemoved(name) => {
                if !self.selection.remove(&name, self.store.as_mut()) {
                    return Vec::new();
                }
                vec![
                    Effect::HighlightCard {
                        name,
                        selected: false,
                    },
                    Effect::ShowSelection(self.selection.products().to_vec()),
                ]
            }
            UiEvent::SelectionCleared => {
                self.selection.clear(self.store.as_mut());
                vec![
                    Effect::ShowProducts(self.product_view()),
                    Effect::ShowSelection(Vec::new()),
                ]
            }
            UiEvent::DirectionToggled => {
                self.direction = self.direction.toggled();
                save_direction(self.store.as_mut(), self.direction);
                vec![Effect::SetDirection(self.direction)]
            }
            UiEvent::ChatSubmitted(text) => {
                let text = text.trim();
                if text.is_empty() {
                    return Vec::new();
                }
                self.conversation.push_user(text);
                let mut effects = vec![Effect::AppendUserTurn(text.to_string())];
                effects.extend(self.open_reply(ReplyKind::Chat));
                effects
            }
            UiEvent::RoutineRequested => {
                if self.selection.is_empty() {
                    return vec![Effect::AppendError(EMPTY_SELECTION_MESSAGE.to_string())];
                }
                self.conversation.push_user(routine_prompt(&self.selection));
                self.open_reply(ReplyKind::Routine)
            }
            UiEvent::ReplyChunk { slot, delta } => match self.pending.get_mut(&slot) {
                Some(reply) => {
                    reply.buffer.push_str(&delta);
                    vec![Effect::UpdateSlot {
                        slot,
                        content: reply.buffer.clone(),
                    }]
                }
                None => {
                    warn!("Dropping chunk for unknown render slot {}", slot);
                    Vec::new()
                }
            },
            UiEvent::ReplyFinished { slot } => match self.pending.remove(&slot) {
                Some(reply) if !reply.buffer.is_empty() => {
                    self.conversation.complete_turn(reply.buffer);
                    vec![Effect::FinalizeSlot { slot }]
                }
                Some(reply) => {
                    warn!("Reply for slot {} finished without content", slot);
                    self.conversation.settle();
                    failure_effects(slot, reply.kind)
                }
                None => Vec::new(),
            },
            UiEvent::ReplyFailed { slot, error } => match self.pending.remove(&slot) {
                Some(reply) => {
                    warn!("Reply for slot {} failed: {}", slot, error);
                    self.conversation.settle();
                    failure_effects(slot, reply.kind)
                }
                None => Vec::new(),
            },
        }
    }

    fn toggle(&mut self, name: &str) -> Vec<Effect> {
        let Some(product) = self.catalog.find(name).cloned() else {
            debug!("Ignoring click on unknown product {:?}", name);
            return Vec::new();
        };
        let selected = self.selection.toggle(&product, self.store.as_mut());
        vec![
            Effect::HighlightCard {
                name: product.name,
                selected,
            },
            Effect::ShowSelection(self.selection.products().to_vec()),
        ]
    }

    fn refilter(&mut self) -> Vec<Effect> {
        self.outcome = filter::apply(&self.catalog, &self.query);
        vec![Effect::ShowProducts(self.product_view())]
    }

    /// The current filter result with highlights reconciled against the selection.
    pub fn product_view(&self) -> ProductView {
        match &self.outcome {
            FilterOutcome::Placeholder => ProductView::Placeholder,
            FilterOutcome::NoResults => ProductView::NoResults,
            FilterOutcome::Products(products) => {
                ProductView::Cards(self.selection.reconcile(products))
            }
        }
    }

    fn open_reply(&mut self, kind: ReplyKind) -> Vec<Effect> {
        let slot = self.next_slot();
        self.pending.insert(
            slot,
            PendingReply {
                kind,
                buffer: String::new(),
            },
        );
        vec![
            Effect::OpenSlot { slot, kind },
            Effect::SendToRelay {
                slot,
                messages: self.conversation.messages().to_vec(),
            },
        ]
    }

    // Slots are keyed by generation time; two turns in the same millisecond
    // still get distinct keys.
    fn next_slot(&mut self) -> SlotId {
        let now = chrono::Utc::now().timestamp_millis();
        self.last_slot = now.max(self.last_slot + 1);
        self.last_slot
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn query(&self) -> &FilterQuery {
        &self.query
    }
}

fn failure_effects(slot: SlotId, kind: ReplyKind) -> Vec<Effect> {
    let message = match kind {
        ReplyKind::Chat => CHAT_ERROR_MESSAGE,
        ReplyKind::Routine => ROUTINE_ERROR_MESSAGE,
    };
    vec![
        Effect::FinalizeSlot { slot },
        Effect::AppendError(message.to_string()),
    ]
}

fn routine_prompt(selection: &SelectionSet) -> String {
    format!(
        "Create a detailed routine using these products: {}. \
         Include the order of use, time of day, and any specific application tips.",
        selection.names().join(", ")
    )
}
