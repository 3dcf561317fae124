// Interactive terminal front end. Reads commands from stdin, turns them into
// session events, and prints the resulting effects as plain text.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use crate::catalog::Catalog;
use crate::constants::SEARCH_DEBOUNCE_MS;
use crate::debounce::Debouncer;
use crate::driver::handle_event;
use crate::relay_client::RelayClient;
use crate::render::{HtmlDocument, RenderSurface, Renderer};
use crate::session::{Effect, ProductView, ReplyKind, Session, SlotId, UiEvent, ROUTINE_HEADING};
use crate::storage::FileStore;

pub struct ChatOptions {
    pub relay_url: String,
    pub catalog: String,
    pub storage: PathBuf,
    /// Where to write the rendered HTML page when the session ends.
    pub transcript: Option<PathBuf>,
}

#[derive(Debug, PartialEq)]
enum Command {
    Event(UiEvent),
    Search(String),
    Categories,
    Selected,
    Help,
    Quit,
    Unknown(String),
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Event(UiEvent::ChatSubmitted(line.to_string()));
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim().to_string()),
        None => (rest, String::new()),
    };
    match name {
        "category" => Command::Event(UiEvent::CategoryChanged((!arg.is_empty()).then_some(arg))),
        "search" => Command::Search(arg),
        "select" => Command::Event(UiEvent::ProductClicked(arg)),
        "remove" => Command::Event(UiEvent::ProductRemoved(arg)),
        "clear" => Command::Event(UiEvent::SelectionCleared),
        "routine" => Command::Event(UiEvent::RoutineRequested),
        "rtl" | "direction" => Command::Event(UiEvent::DirectionToggled),
        "categories" => Command::Categories,
        "selected" => Command::Selected,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => Command::Unknown(other.to_string()),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  /categories            list product categories");
    println!("  /category <name|all>   filter by category");
    println!("  /search <text>         search name, brand and description");
    println!("  /select <product>      select or unselect a product");
    println!("  /remove <product>      remove a product from the selection");
    println!("  /clear                 clear the selection");
    println!("  /selected              show the selection");
    println!("  /routine               build a routine from the selection");
    println!("  /rtl                   toggle text direction");
    println!("  /quit                  leave");
    println!("Anything else is sent to the beauty advisor.");
}

/// Prints effects to stdout and mirrors them into an optional HTML document.
struct TerminalSurface {
    printed: HashMap<SlotId, usize>,
    document: Option<HtmlDocument>,
}

impl TerminalSurface {
    fn print_products(view: &ProductView) {
        match view {
            ProductView::Placeholder => println!("Select a category to view products"),
            ProductView::NoResults => println!("No products match your filters"),
            ProductView::Cards(cards) => {
                for card in cards {
                    let marker = if card.selected { "[x]" } else { "[ ]" };
                    println!("{} {} ({})", marker, card.product.name, card.product.brand);
                }
            }
        }
    }
}

impl RenderSurface for TerminalSurface {
    fn apply(&mut self, effect: &Effect) {
        if let Some(document) = self.document.as_mut() {
            document.apply(effect);
        }
        match effect {
            Effect::ShowProducts(view) => Self::print_products(view),
            Effect::HighlightCard { name, selected } => {
                if *selected {
                    println!("Selected {}", name);
                } else {
                    println!("Unselected {}", name);
                }
            }
            Effect::ShowSelection(products) => {
                let names: Vec<_> = products.iter().map(|p| p.name.as_str()).collect();
                println!("Selected products ({}): {}", names.len(), names.join(", "));
            }
            Effect::SetDirection(direction) => println!("Text direction: {}", direction.as_str()),
            Effect::AppendUserTurn(_) | Effect::SendToRelay { .. } => {}
            Effect::OpenSlot { slot, kind } => {
                self.printed.insert(*slot, 0);
                if *kind == ReplyKind::Routine {
                    println!("{}", ROUTINE_HEADING);
                }
                print!("advisor> ");
                let _ = std::io::stdout().flush();
            }
            Effect::UpdateSlot { slot, content } => {
                let printed = self.printed.entry(*slot).or_insert(0);
                if let Some(fresh) = content.get(*printed..) {
                    print!("{}", fresh);
                    let _ = std::io::stdout().flush();
                }
                *printed = content.len();
            }
            Effect::FinalizeSlot { slot } => {
                self.printed.remove(slot);
                println!();
            }
            Effect::AppendError(message) => println!("! {}", message),
        }
    }
}

pub async fn run_chat(options: ChatOptions) -> Result<()> {
    info!("Starting chat session against {}", options.relay_url);
    let catalog = Catalog::load(&options.catalog)
        .await
        .with_context(|| format!("Failed to load product catalog from {}", options.catalog))?;
    let mut session = Session::new(catalog, Box::new(FileStore::new(&options.storage)));
    let client = RelayClient::new(options.relay_url);

    let document = match &options.transcript {
        Some(_) => Some(HtmlDocument::new(
            Renderer::new().context("Failed to initialize template engine")?,
        )),
        None => None,
    };
    let mut surface = TerminalSurface {
        printed: HashMap::new(),
        document,
    };

    print_help();
    for effect in session.initial_effects() {
        surface.apply(&effect);
    }

    let (mut debouncer, mut searches) =
        Debouncer::new(Duration::from_millis(SEARCH_DEBOUNCE_MS));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    break;
                };
                match parse_command(&line) {
                    Command::Event(event) => {
                        handle_event(&mut session, &client, &mut surface, event).await
                    }
                    Command::Search(term) => debouncer.schedule(term),
                    Command::Categories => {
                        println!("Categories: {}", session.catalog().categories().join(", "))
                    }
                    Command::Selected => {
                        let names = session.selection().names();
                        println!("Selected products ({}): {}", names.len(), names.join(", "));
                    }
                    Command::Help => print_help(),
                    Command::Quit => break,
                    Command::Unknown(name) => println!("Unknown command /{} (try /help)", name),
                }
            }
            Some(term) = searches.recv() => {
                handle_event(&mut session, &client, &mut surface, UiEvent::SearchChanged(term)).await
            }
        }
    }

    if let (Some(path), Some(document)) = (&options.transcript, &surface.document) {
        match document.to_html() {
            Ok(html) => {
                tokio::fs::write(path, html)
                    .await
                    .with_context(|| format!("Failed to write transcript to {:?}", path))?;
                info!("Transcript written to {:?}", path);
            }
            Err(e) => error!("Failed to render transcript: {}", e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_chat() {
        assert_eq!(
            parse_command("  What serum for dry skin? "),
            Command::Event(UiEvent::ChatSubmitted("What serum for dry skin?".to_string()))
        );
    }

    #[test]
    fn test_commands_with_arguments() {
        assert_eq!(
            parse_command("/category skincare"),
            Command::Event(UiEvent::CategoryChanged(Some("skincare".to_string())))
        );
        assert_eq!(
            parse_command("/category"),
            Command::Event(UiEvent::CategoryChanged(None))
        );
        assert_eq!(
            parse_command("/select Revitalift  Serum "),
            Command::Event(UiEvent::ProductClicked("Revitalift  Serum".to_string()))
        );
        assert_eq!(parse_command("/search lip"), Command::Search("lip".to_string()));
    }

    #[test]
    fn test_bare_commands() {
        assert_eq!(parse_command("/routine"), Command::Event(UiEvent::RoutineRequested));
        assert_eq!(parse_command("/rtl"), Command::Event(UiEvent::DirectionToggled));
        assert_eq!(parse_command("/quit"), Command::Quit);
        assert_eq!(parse_command("/wat"), Command::Unknown("wat".to_string()));
    }
}
