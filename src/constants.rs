// Defaults shared by the relay and the terminal client. Every one of these can be
// overridden through the CLI flags or their environment variables (see main.rs).

use crate::conversation::{ChatMessage, Role};

pub const DEFAULT_RELAY_PORT: u16 = 8787;
pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:8787/";
pub const DEFAULT_COMPLETION_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_TOKENS: u32 = 600;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

pub const DEFAULT_CATALOG: &str = "products.json";
pub const DEFAULT_STORAGE_FILE: &str = "advisor-storage.json";

/// Most recent turns kept in the conversation after a completed exchange.
pub const HISTORY_LIMIT: usize = 10;
/// Quiet interval for the search box, in milliseconds.
pub const SEARCH_DEBOUNCE_MS: u64 = 300;

pub const SELECTION_STORAGE_KEY: &str = "selectedProducts";
pub const DIRECTION_STORAGE_KEY: &str = "direction";

/// Prefix of every frame in a streamed completion.
pub const STREAM_FRAME_MARKER: &str = "data:";
pub const STREAM_DONE_SENTINEL: &str = "[DONE]";

pub const REFUSAL_MESSAGE: &str = "I'm your L'Oréal beauty advisor, so I can only help with beauty, skincare, haircare, makeup, and fragrance questions. What beauty goals can I help you achieve today?";

const SYSTEM_PROMPT: &str = r#"You are the official L'Oréal beauty advisor. You help people find products and build routines across skincare, haircare, makeup, and fragrance, covering L'Oréal Paris, Maybelline, Lancôme, Garnier, CeraVe, Kérastase and the other L'Oréal brands.

## Voice
- Confident, warm and inclusive. Celebrate every skin tone, hair type, age and background.
- Expert without jargon. When an ingredient matters (hyaluronic acid, retinol, niacinamide), say what it does in plain words.

## How to help
- Ask a clarifying question when the need is unclear (skin type, concern, budget).
- Recommend specific L'Oréal products and say why each one fits.
- Never give medical advice for serious skin conditions; suggest a dermatologist instead.
- Never pressure anyone into a purchase or make assumptions about gender or age.

## Routines
When asked for a routine, give concise step-by-step instructions: order of use, morning or evening, and one application tip per step. Always finish the routine completely.

## Topic restriction
You ONLY discuss beauty, skincare, haircare, makeup, fragrance and L'Oréal products. If the user asks about anything else (food, travel, technology, politics, general knowledge, other brands, and so on) you must answer with exactly this sentence and nothing more:

"{refusal}"

Do not answer the off-topic question even briefly. Do not connect it back to beauty. Redirect immediately.

For simple questions, give brief but complete answers."#;

lazy_static::lazy_static! {
    /// The fixed instruction the relay prepends to every forwarded conversation.
    pub static ref SYSTEM_INSTRUCTION: ChatMessage = ChatMessage {
        role: Role::System,
        content: SYSTEM_PROMPT.replace("{refusal}", REFUSAL_MESSAGE),
    };
}
