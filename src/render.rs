use minijinja::{context, Environment, Value};
use serde::Serialize;
use tracing::error;

use crate::catalog::Product;
use crate::selection::ProductCard;
use crate::session::{Effect, ProductView, ReplyKind, SlotId, ROUTINE_HEADING};
use crate::storage::Direction;

/// Anything that can display session effects.
pub trait RenderSurface {
    fn apply(&mut self, effect: &Effect);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Ai,
    System,
}

/// One rendered chat turn. `slot` is set for assistant replies that are or
/// were being streamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageView {
    pub slot: Option<SlotId>,
    pub role: TurnRole,
    pub content: String,
    pub heading: Option<String>,
    pub pending: bool,
    pub error: bool,
}

impl MessageView {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            slot: None,
            role: TurnRole::User,
            content: content.into(),
            heading: None,
            pending: false,
            error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::System,
            error: true,
            ..Self::user(content)
        }
    }

    pub fn reply_slot(slot: SlotId, kind: ReplyKind) -> Self {
        Self {
            slot: Some(slot),
            role: TurnRole::Ai,
            content: String::new(),
            heading: (kind == ReplyKind::Routine).then(|| ROUTINE_HEADING.to_string()),
            pending: true,
            error: false,
        }
    }
}

pub struct Renderer {
    env: Environment<'static>,
}

impl Renderer {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_filter("markdown", markdown_filter);
        env.add_template("message.html", include_str!("../templates/message.html"))?;
        env.add_template("products.html", include_str!("../templates/products.html"))?;
        env.add_template("selected.html", include_str!("../templates/selected.html"))?;
        env.add_template("page.html", include_str!("../templates/page.html"))?;
        Ok(Self { env })
    }

    pub fn message(&self, view: &MessageView) -> Result<String, minijinja::Error> {
        self.env.get_template("message.html")?.render(view)
    }

    pub fn products(&self, view: &ProductView) -> Result<String, minijinja::Error> {
        let (kind, cards): (&str, &[ProductCard]) = match view {
            ProductView::Placeholder => ("placeholder", &[]),
            ProductView::NoResults => ("empty", &[]),
            ProductView::Cards(cards) => ("cards", cards),
        };
        self.env
            .get_template("products.html")?
            .render(context! { view => kind, cards => cards })
    }

    pub fn selection(&self, products: &[Product]) -> Result<String, minijinja::Error> {
        self.env
            .get_template("selected.html")?
            .render(context! { products => products })
    }
}

fn markdown_filter(escaped: String) -> Value {
    Value::from_safe_string(markdown_to_html(&escaped))
}

/// Applies a small markdown subset to text that is already HTML-escaped:
/// headings, `- ` bullets, `**bold**`, and line breaks.
pub fn markdown_to_html(escaped: &str) -> String {
    let mut out = String::new();
    let mut items: Vec<String> = Vec::new();
    let mut needs_break = false;

    for line in escaped.split('\n') {
        let line = line.trim_end_matches('\r');
        let trimmed = line.trim_start();
        if let Some(item) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            items.push(format!("<li>{}</li>", inline(item)));
            continue;
        }
        if !items.is_empty() {
            out.push_str(&format!("<ul>{}</ul>", items.concat()));
            items.clear();
            needs_break = false;
        }
        if let Some((level, text)) = heading(trimmed) {
            out.push_str(&format!("<h{0}>{1}</h{0}>", level, inline(text)));
            needs_break = false;
            continue;
        }
        if needs_break {
            out.push_str("<br>");
        }
        out.push_str(&inline(line));
        needs_break = true;
    }
    if !items.is_empty() {
        out.push_str(&format!("<ul>{}</ul>", items.concat()));
    }
    out
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    line[hashes..]
        .strip_prefix(' ')
        .map(|text| ((hashes + 2).min(6), text.trim()))
}

fn inline(text: &str) -> String {
    let parts: Vec<&str> = text.split("**").collect();
    // An unmatched marker is left as typed.
    if parts.len() < 3 || parts.len() % 2 == 0 {
        return text.to_string();
    }
    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push_str(if i % 2 == 1 { "<strong>" } else { "</strong>" });
        }
        out.push_str(part);
    }
    out
}

/// Keeps the whole UI as a document model and renders it to one HTML page.
pub struct HtmlDocument {
    renderer: Renderer,
    direction: Direction,
    products: ProductView,
    selected: Vec<Product>,
    messages: Vec<MessageView>,
}

impl HtmlDocument {
    pub fn new(renderer: Renderer) -> Self {
        Self {
            renderer,
            direction: Direction::default(),
            products: ProductView::Placeholder,
            selected: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[MessageView] {
        &self.messages
    }

    pub fn products(&self) -> &ProductView {
        &self.products
    }

    fn slot_mut(&mut self, slot: SlotId) -> Option<&mut MessageView> {
        self.messages.iter_mut().find(|m| m.slot == Some(slot))
    }

    pub fn to_html(&self) -> Result<String, minijinja::Error> {
        let messages = self
            .messages
            .iter()
            .map(|m| self.renderer.message(m))
            .collect::<Result<Vec<_>, _>>()?;
        self.renderer.env.get_template("page.html")?.render(context! {
            title => "L'Oréal Routine Builder",
            dir => self.direction.as_str(),
            products => self.renderer.products(&self.products)?,
            selected => self.renderer.selection(&self.selected)?,
            messages => messages,
        })
    }
}

impl RenderSurface for HtmlDocument {
    fn apply(&mut self, effect: &Effect) {
        match effect {
            Effect::ShowProducts(view) => self.products = view.clone(),
            Effect::HighlightCard { name, selected } => {
                if let ProductView::Cards(cards) = &mut self.products {
                    for card in cards.iter_mut().filter(|c| &c.product.name == name) {
                        card.selected = *selected;
                    }
                }
            }
            Effect::ShowSelection(products) => self.selected = products.clone(),
            Effect::SetDirection(direction) => self.direction = *direction,
            Effect::AppendUserTurn(text) => self.messages.push(MessageView::user(text.clone())),
            Effect::OpenSlot { slot, kind } => {
                self.messages.push(MessageView::reply_slot(*slot, *kind))
            }
            Effect::UpdateSlot { slot, content } => match self.slot_mut(*slot) {
                Some(message) => message.content = content.clone(),
                None => error!("No render slot {} to update", slot),
            },
            Effect::FinalizeSlot { slot } => {
                if let Some(message) = self.slot_mut(*slot) {
                    message.pending = false;
                }
            }
            Effect::AppendError(text) => self.messages.push(MessageView::error(text.clone())),
            Effect::SendToRelay { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> Renderer {
        Renderer::new().unwrap()
    }

    fn product(name: &str) -> Product {
        Product {
            name: name.to_string(),
            brand: "Kérastase".to_string(),
            category: "haircare".to_string(),
            image: "mask.png".to_string(),
            description: None,
        }
    }

    #[test]
    fn test_markdown_subset() {
        assert_eq!(markdown_to_html("Hi there"), "Hi there");
        assert_eq!(markdown_to_html("a\nb"), "a<br>b");
        assert_eq!(
            markdown_to_html("### Morning\n- **Cleanse** gently\n- Tone\nDone"),
            "<h5>Morning</h5><ul><li><strong>Cleanse</strong> gently</li><li>Tone</li></ul>Done"
        );
        assert_eq!(markdown_to_html("2 ** 3"), "2 ** 3");
    }

    #[test]
    fn test_message_content_is_escaped() {
        let html = renderer()
            .message(&MessageView::user("<script>alert('x')</script> **hi**"))
            .unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("<strong>hi</strong>"));
        assert!(html.contains("user-message"));
    }

    #[test]
    fn test_pending_slot_has_typing_indicator_and_id() {
        let html = renderer()
            .message(&MessageView::reply_slot(1700000000000, ReplyKind::Routine))
            .unwrap();
        assert!(html.contains(r#"id="msg-1700000000000""#));
        assert!(html.contains("typing-indicator"));
        assert!(html.contains(ROUTINE_HEADING));
    }

    #[test]
    fn test_product_views() {
        let renderer = renderer();
        assert!(renderer
            .products(&ProductView::Placeholder)
            .unwrap()
            .contains("Select a category"));
        assert!(renderer
            .products(&ProductView::NoResults)
            .unwrap()
            .contains("No products match"));

        let html = renderer
            .products(&ProductView::Cards(vec![
                ProductCard {
                    product: product("Elixir \"Ultime\""),
                    selected: true,
                },
                ProductCard {
                    product: product("Mask"),
                    selected: false,
                },
            ]))
            .unwrap();
        assert_eq!(html.matches("product-card selected").count(), 1);
        assert!(!html.contains(r#""Ultime""#));
    }

    #[test]
    fn test_document_tracks_streaming_slot() {
        let mut doc = HtmlDocument::new(renderer());
        doc.apply(&Effect::AppendUserTurn("Hello".to_string()));
        doc.apply(&Effect::OpenSlot {
            slot: 42,
            kind: ReplyKind::Chat,
        });
        doc.apply(&Effect::UpdateSlot {
            slot: 42,
            content: "Hel".to_string(),
        });
        assert_eq!(doc.messages()[1].content, "Hel");
        assert!(doc.messages()[1].pending);

        doc.apply(&Effect::UpdateSlot {
            slot: 42,
            content: "Hello".to_string(),
        });
        doc.apply(&Effect::FinalizeSlot { slot: 42 });
        assert_eq!(doc.messages()[1].content, "Hello");
        assert!(!doc.messages()[1].pending);

        let page = doc.to_html().unwrap();
        assert!(page.contains(r#"dir="ltr""#));
        assert!(page.contains(r#"id="msg-42""#));
        assert!(!page.contains("typing-indicator"));
    }

    #[test]
    fn test_document_highlight_and_direction() {
        let mut doc = HtmlDocument::new(renderer());
        doc.apply(&Effect::ShowProducts(ProductView::Cards(vec![ProductCard {
            product: product("Mask"),
            selected: false,
        }])));
        doc.apply(&Effect::HighlightCard {
            name: "Mask".to_string(),
            selected: true,
        });
        doc.apply(&Effect::SetDirection(Direction::Rtl));
        doc.apply(&Effect::ShowSelection(vec![product("Mask")]));

        match doc.products() {
            ProductView::Cards(cards) => assert!(cards[0].selected),
            other => panic!("unexpected view {:?}", other),
        }
        let page = doc.to_html().unwrap();
        assert!(page.contains(r#"dir="rtl""#));
        assert!(page.contains("remove-product"));
    }
}
