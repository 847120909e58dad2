use crate::dialogue::prompts;
use crate::domain::intent::Intent;
use crate::domain::menu::{self, MenuItem};
use crate::domain::session::{CartLine, CustomerInfo, PendingOffer, Session, SessionStatus};
use crate::parser::{self, ParsedUtterance};
use crate::resolver::normalize::normalize_text;
use crate::resolver::{MatchCandidate, MenuResolver, ResolutionAction};

/// One caller turn, already classified and (for provide_info turns)
/// already run through the customer-info extractor. The engine itself
/// is pure and synchronous; anything that needs an external call is
/// either supplied here or requested back via [`TurnEffect`].
#[derive(Clone, Debug)]
pub struct TurnInput<'a> {
    pub intent: Intent,
    pub utterance: &'a str,
    pub extracted: Option<CustomerInfo>,
}

/// Side work the runtime must perform after the state transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnEffect {
    None,
    /// The session entered PLACING_ORDER; run the commit coordinator.
    RequestCommit,
    /// Look up a committed order and replace the reply with its status.
    LookupOrderStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnOutcome {
    pub reply: String,
    pub effect: TurnEffect,
}

impl TurnOutcome {
    fn reply(reply: String) -> Self {
        Self { reply, effect: TurnEffect::None }
    }
}

const DONE_PHRASES: [&str; 10] = [
    "no",
    "nope",
    "no thanks",
    "no thank you",
    "nothing",
    "nothing else",
    "that s all",
    "thats all",
    "that s it",
    "thats it",
];

const AFFIRMATIVE_STARTS: [&str; 11] =
    ["yes", "yeah", "yep", "yup", "sure", "correct", "confirm", "ok", "okay", "perfect", "absolutely"];

const NEGATIVE_STARTS: [&str; 4] = ["no", "nope", "nah", "not"];

/// Spoken names for menu categories. The catalog decides which
/// categories exist; this table only maps what callers say onto a
/// keyword to find in the catalog's own category names.
const CATEGORY_ALIASES: [(&str, &str); 12] = [
    ("starters", "appetizer"),
    ("appetizers", "appetizer"),
    ("appetizer", "appetizer"),
    ("snacks", "appetizer"),
    ("mains", "main"),
    ("main course", "main"),
    ("main courses", "main"),
    ("entrees", "main"),
    ("drinks", "beverage"),
    ("beverages", "beverage"),
    ("desserts", "dessert"),
    ("sweets", "dessert"),
];

/// The intent-to-action dispatcher. Given a classified turn and the
/// live session it decides the next state, the spoken reply, and any
/// side work; the resolver and parser it drives are pure, so the whole
/// engine is deterministic for a fixed catalog snapshot.
#[derive(Clone, Debug, Default)]
pub struct DialogueEngine {
    resolver: MenuResolver,
}

impl DialogueEngine {
    pub fn new(resolver: MenuResolver) -> Self {
        Self { resolver }
    }

    pub fn greeting(&self) -> String {
        prompts::greeting()
    }

    pub fn dispatch(
        &self,
        session: &mut Session,
        input: TurnInput<'_>,
        catalog: &[MenuItem],
    ) -> TurnOutcome {
        let normalized = normalize_text(input.utterance);
        let parsed = parser::parse(input.utterance);

        let mut outcome = match input.intent {
            Intent::MenuInquiry => TurnOutcome::reply(prompts::menu_overview(catalog)),
            Intent::CategoryInquiry => {
                TurnOutcome::reply(self.answer_category_inquiry(&normalized, catalog))
            }
            Intent::ItemInquiry => {
                TurnOutcome::reply(self.answer_item_inquiry(session, &parsed, catalog))
            }
            Intent::OrderItem => self.handle_order_item(session, input.utterance, &parsed, catalog),
            Intent::ProvideInfo => self.handle_provide_info(session, input.extracted),
            Intent::ConfirmOrder => {
                self.handle_confirm(session, input.utterance, &normalized, &parsed)
            }
            Intent::GeneralQuestion => {
                self.handle_general(session, input.utterance, &normalized, &parsed)
            }
            // Mid-call the order is not committed yet, so there is
            // nothing to look up; answer from the session instead.
            Intent::OrderStatus if !session.cart.is_empty() => {
                TurnOutcome::reply(prompts::order_not_placed_yet(&session.cart))
            }
            Intent::OrderStatus => TurnOutcome {
                reply: prompts::order_status_ask_id(),
                effect: TurnEffect::LookupOrderStatus,
            },
            Intent::AngryComplaint => TurnOutcome::reply(format!(
                "{} {}",
                prompts::empathy(),
                self.continuation_prompt(session)
            )),
        };

        // No two consecutive assistant prompts may be verbatim-identical.
        outcome.reply = prompts::vary(outcome.reply, session.last_reply.as_deref());
        outcome
    }

    fn answer_category_inquiry(&self, normalized: &str, catalog: &[MenuItem]) -> String {
        let categories = menu::categories(catalog);

        // Exact category name spoken wins over the alias table.
        let spoken = categories
            .iter()
            .find(|category| normalized.contains(&normalize_text(category)))
            .cloned()
            .or_else(|| {
                CATEGORY_ALIASES.iter().find_map(|(alias, keyword)| {
                    if normalized.contains(alias) {
                        categories
                            .iter()
                            .find(|category| normalize_text(category).contains(keyword))
                            .cloned()
                    } else {
                        None
                    }
                })
            });

        match spoken {
            Some(category) => {
                let items = menu::items_in_category(catalog, &category);
                prompts::category_listing(&category, &items)
            }
            None => prompts::menu_overview(catalog),
        }
    }

    fn answer_item_inquiry(
        &self,
        session: &mut Session,
        parsed: &ParsedUtterance,
        catalog: &[MenuItem],
    ) -> String {
        let resolution = self.resolver.resolve(&parsed.residual, catalog);
        match resolution.action {
            ResolutionAction::AutoMatch => match resolution.best() {
                Some(best) => {
                    session.pending_offer = Some(PendingOffer {
                        menu_item_id: best.menu_item_id.clone(),
                        menu_item_name: best.menu_item_name.clone(),
                        unit_price: best.price,
                    });
                    prompts::item_offer(&best.menu_item_name, best.price)
                }
                None => prompts::no_match(),
            },
            ResolutionAction::AskClarification => prompts::clarify(&resolution.candidates),
            ResolutionAction::ShowMenu => prompts::show_alternatives(&resolution.candidates),
            ResolutionAction::NoMatch => prompts::no_match(),
        }
    }

    fn handle_order_item(
        &self,
        session: &mut Session,
        raw_utterance: &str,
        parsed: &ParsedUtterance,
        catalog: &[MenuItem],
    ) -> TurnOutcome {
        if session.status == SessionStatus::PlacingOrder {
            return TurnOutcome::reply(prompts::placing_order());
        }

        // A bare "no" or "nothing else" means the caller is done, even
        // when the classifier labels the turn order_item. A correction
        // only removes a line when a replacement item follows it.
        if parsed.residual.is_empty() || is_done_phrase(&parsed.residual) {
            return TurnOutcome::reply(self.finish_adding(session));
        }

        // Ordering from confirmation or info collection reopens the cart.
        if matches!(session.status, SessionStatus::CollectingInfo | SessionStatus::Confirmation) {
            session.reopen_for_items();
        }

        let removed = if parsed.is_correction && !session.cart.is_empty() {
            session.remove_last_cart_line().ok().flatten()
        } else {
            None
        };

        let resolution = self.resolver.resolve(&parsed.residual, catalog);
        match resolution.action {
            ResolutionAction::AutoMatch => match resolution.best() {
                Some(best) => self.add_line(session, raw_utterance, parsed, best.clone(), removed),
                None => TurnOutcome::reply(prompts::no_match()),
            },
            ResolutionAction::AskClarification => {
                TurnOutcome::reply(prompts::clarify(&resolution.candidates))
            }
            ResolutionAction::ShowMenu => {
                TurnOutcome::reply(prompts::show_alternatives(&resolution.candidates))
            }
            ResolutionAction::NoMatch => TurnOutcome::reply(prompts::no_match()),
        }
    }

    fn add_line(
        &self,
        session: &mut Session,
        raw_utterance: &str,
        parsed: &ParsedUtterance,
        best: MatchCandidate,
        removed: Option<CartLine>,
    ) -> TurnOutcome {
        let line = CartLine {
            raw_text: raw_utterance.to_string(),
            normalized_text: parsed.residual.clone(),
            menu_item_id: best.menu_item_id,
            menu_item_name: best.menu_item_name.clone(),
            unit_price: best.price,
            quantity: parsed.quantity,
            match_confidence: best.confidence,
        };
        session.pending_offer = None;
        match session.push_cart_line(line) {
            Ok(()) => TurnOutcome::reply(match removed {
                Some(old) => prompts::item_replaced(
                    &old.menu_item_name,
                    parsed.quantity,
                    &best.menu_item_name,
                ),
                None => prompts::item_added(parsed.quantity, &best.menu_item_name),
            }),
            // Unreachable after the reopen above; answered gracefully anyway.
            Err(_) => TurnOutcome::reply(prompts::placing_order()),
        }
    }

    fn handle_provide_info(
        &self,
        session: &mut Session,
        extracted: Option<CustomerInfo>,
    ) -> TurnOutcome {
        if let Some(info) = extracted {
            session.customer.merge(info);
        }

        match session.status {
            SessionStatus::Empty => TurnOutcome::reply(prompts::what_would_you_like()),
            SessionStatus::AddingItems => TurnOutcome::reply(prompts::info_noted()),
            SessionStatus::CollectingInfo => TurnOutcome::reply(self.advance_info(session)),
            SessionStatus::Confirmation => {
                TurnOutcome::reply(prompts::order_summary(&session.cart))
            }
            SessionStatus::PlacingOrder => TurnOutcome::reply(prompts::placing_order()),
        }
    }

    /// Re-prompts for whichever field is still missing; once both are
    /// present the session advances to confirmation with a summary.
    fn advance_info(&self, session: &mut Session) -> String {
        if session.cart.is_empty() {
            session.reopen_for_items();
            return prompts::what_would_you_like();
        }
        match (&session.customer.name, &session.customer.phone) {
            (None, _) => prompts::ask_name_again(),
            (Some(name), None) => prompts::ask_phone(name),
            (Some(_), Some(_)) => {
                session.status = SessionStatus::Confirmation;
                session.touch();
                prompts::order_summary(&session.cart)
            }
        }
    }

    fn handle_confirm(
        &self,
        session: &mut Session,
        raw_utterance: &str,
        normalized: &str,
        parsed: &ParsedUtterance,
    ) -> TurnOutcome {
        if is_negative(normalized) {
            return match session.status {
                SessionStatus::Confirmation => {
                    session.reopen_for_items();
                    TurnOutcome::reply(prompts::confirmation_reopened())
                }
                SessionStatus::AddingItems => TurnOutcome::reply(self.finish_adding(session)),
                _ => {
                    session.pending_offer = None;
                    TurnOutcome::reply(prompts::what_would_you_like())
                }
            };
        }

        // An affirmative after a single-item offer orders that item
        // without making the caller repeat its name.
        if let Some(offer) = session.pending_offer.clone() {
            if matches!(session.status, SessionStatus::Empty | SessionStatus::AddingItems) {
                return self.order_pending_offer(session, raw_utterance, parsed, offer);
            }
        }

        match session.status {
            SessionStatus::Confirmation => {
                if session.cart.is_empty() {
                    session.reopen_for_items();
                    return TurnOutcome::reply(prompts::what_would_you_like());
                }
                session.status = SessionStatus::PlacingOrder;
                session.touch();
                TurnOutcome { reply: prompts::placing_order(), effect: TurnEffect::RequestCommit }
            }
            SessionStatus::PlacingOrder => {
                // Retry of "confirm" after a store failure.
                TurnOutcome { reply: prompts::placing_order(), effect: TurnEffect::RequestCommit }
            }
            SessionStatus::CollectingInfo => TurnOutcome::reply(self.advance_info(session)),
            SessionStatus::AddingItems | SessionStatus::Empty => {
                TurnOutcome::reply(prompts::what_would_you_like())
            }
        }
    }

    fn order_pending_offer(
        &self,
        session: &mut Session,
        raw_utterance: &str,
        parsed: &ParsedUtterance,
        offer: PendingOffer,
    ) -> TurnOutcome {
        let line = CartLine {
            raw_text: raw_utterance.to_string(),
            normalized_text: normalize_text(&offer.menu_item_name),
            menu_item_id: offer.menu_item_id,
            menu_item_name: offer.menu_item_name.clone(),
            unit_price: offer.unit_price,
            quantity: parsed.quantity,
            match_confidence: 1.0,
        };
        session.pending_offer = None;
        match session.push_cart_line(line) {
            Ok(()) => {
                TurnOutcome::reply(prompts::item_added(parsed.quantity, &offer.menu_item_name))
            }
            Err(_) => TurnOutcome::reply(prompts::placing_order()),
        }
    }

    fn handle_general(
        &self,
        session: &mut Session,
        raw_utterance: &str,
        normalized: &str,
        parsed: &ParsedUtterance,
    ) -> TurnOutcome {
        if session.status == SessionStatus::AddingItems && is_done_phrase(normalized) {
            return TurnOutcome::reply(self.finish_adding(session));
        }
        if is_affirmative(normalized) {
            if let Some(offer) = session.pending_offer.clone() {
                if matches!(session.status, SessionStatus::Empty | SessionStatus::AddingItems) {
                    return self.order_pending_offer(session, raw_utterance, parsed, offer);
                }
            }
        }
        TurnOutcome::reply(self.continuation_prompt(session))
    }

    /// State-appropriate re-prompt used when a turn produced no state
    /// change; always asks for the next thing the flow needs.
    fn continuation_prompt(&self, session: &Session) -> String {
        match session.status {
            SessionStatus::Empty => prompts::general_help(),
            SessionStatus::AddingItems => prompts::what_would_you_like(),
            SessionStatus::CollectingInfo => match (&session.customer.name, &session.customer.phone)
            {
                (None, _) => prompts::ask_name_again(),
                (Some(name), None) => prompts::ask_phone(name),
                (Some(_), Some(_)) => prompts::order_summary(&session.cart),
            },
            SessionStatus::Confirmation => prompts::order_summary(&session.cart),
            SessionStatus::PlacingOrder => prompts::placing_order(),
        }
    }

    /// The "nothing else" transition: with a non-empty cart the flow
    /// moves on to collecting whatever customer details are missing.
    fn finish_adding(&self, session: &mut Session) -> String {
        if session.cart.is_empty() {
            return prompts::what_would_you_like();
        }
        session.status = SessionStatus::CollectingInfo;
        session.touch();
        match (&session.customer.name, &session.customer.phone) {
            (None, _) => prompts::ask_name(),
            (Some(name), None) => prompts::ask_phone(name),
            (Some(_), Some(_)) => {
                session.status = SessionStatus::Confirmation;
                prompts::order_summary(&session.cart)
            }
        }
    }
}

fn is_done_phrase(normalized: &str) -> bool {
    DONE_PHRASES.contains(&normalized)
}

fn is_affirmative(normalized: &str) -> bool {
    match normalized.split_whitespace().next() {
        Some(first) => {
            AFFIRMATIVE_STARTS.contains(&first)
                || normalized.contains("that s correct")
                || normalized.contains("that s right")
                || normalized.contains("sounds good")
        }
        None => false,
    }
}

fn is_negative(normalized: &str) -> bool {
    match normalized.split_whitespace().next() {
        Some(first) => NEGATIVE_STARTS.contains(&first) || is_done_phrase(normalized),
        None => false,
    }
}
