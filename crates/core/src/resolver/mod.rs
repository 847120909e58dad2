pub mod normalize;
pub mod scoring;
pub mod synonyms;

use serde::{Deserialize, Serialize};

use crate::domain::menu::{MenuItem, MenuItemId};
use crate::resolver::normalize::normalize_text;
use crate::resolver::synonyms::SynonymTable;

/// Confidence tier boundaries. Tunable policy, not physical law: the
/// values ship as defaults and can be overridden through configuration,
/// but the three-tier semantics (confident / ambiguous / low) are fixed
/// because downstream dialogue logic branches on the action, not the
/// raw score.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolverThresholds {
    pub high: f64,
    pub ambiguous: f64,
}

impl Default for ResolverThresholds {
    fn default() -> Self {
        Self { high: 0.85, ambiguous: 0.6 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionAction {
    AutoMatch,
    AskClarification,
    ShowMenu,
    NoMatch,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub menu_item_id: MenuItemId,
    pub menu_item_name: String,
    pub price: rust_decimal::Decimal,
    pub confidence: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub action: ResolutionAction,
    pub candidates: Vec<MatchCandidate>,
    pub raw_text: String,
    pub normalized_text: String,
}

impl Resolution {
    pub fn best(&self) -> Option<&MatchCandidate> {
        self.candidates.first()
    }
}

const CLARIFICATION_CANDIDATES: usize = 3;
const MENU_CANDIDATES: usize = 5;

/// Resolves spoken item fragments against the catalog snapshot.
/// Pure and deterministic: identical normalized input against an
/// unchanged catalog yields an identical action and candidate order.
#[derive(Clone, Debug)]
pub struct MenuResolver {
    thresholds: ResolverThresholds,
    synonyms: SynonymTable,
}

impl Default for MenuResolver {
    fn default() -> Self {
        Self::new(ResolverThresholds::default(), SynonymTable::default())
    }
}

impl MenuResolver {
    pub fn new(thresholds: ResolverThresholds, synonyms: SynonymTable) -> Self {
        Self { thresholds, synonyms }
    }

    pub fn thresholds(&self) -> ResolverThresholds {
        self.thresholds
    }

    pub fn resolve(&self, raw_text: &str, catalog: &[MenuItem]) -> Resolution {
        let normalized = normalize_text(raw_text);

        let mut queries = vec![normalized.clone()];
        queries.extend(self.synonyms.expand(&normalized));

        let mut scored: Vec<MatchCandidate> = Vec::new();
        for item in catalog.iter().filter(|item| item.available) {
            let item_name = normalize_text(&item.name);
            let mut best = 0.0_f64;
            for query in &queries {
                if query.is_empty() {
                    continue;
                }
                best = best.max(scoring::phrase_similarity(query, &item_name));
                if let Some(fallback) = scoring::substring_confidence(query, &item_name) {
                    best = best.max(fallback);
                }
            }
            if best > 0.0 {
                scored.push(MatchCandidate {
                    menu_item_id: item.id.clone(),
                    menu_item_name: item.name.clone(),
                    price: item.price,
                    confidence: best,
                });
            }
        }

        // Deterministic ordering: confidence descending, name as the
        // tie-breaker so equal scores never flap between runs.
        scored.sort_by(|left, right| {
            right
                .confidence
                .partial_cmp(&left.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| left.menu_item_name.cmp(&right.menu_item_name))
        });

        let action = match scored.first() {
            None => ResolutionAction::NoMatch,
            Some(best) if best.confidence >= self.thresholds.high => ResolutionAction::AutoMatch,
            Some(best) if best.confidence >= self.thresholds.ambiguous => {
                ResolutionAction::AskClarification
            }
            Some(_) => ResolutionAction::ShowMenu,
        };

        let keep = match action {
            ResolutionAction::AutoMatch => 1,
            ResolutionAction::AskClarification => CLARIFICATION_CANDIDATES,
            ResolutionAction::ShowMenu => MENU_CANDIDATES,
            ResolutionAction::NoMatch => 0,
        };
        scored.truncate(keep);

        Resolution { action, candidates: scored, raw_text: raw_text.to_string(), normalized_text: normalized }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::menu::MenuItem;
    use crate::resolver::synonyms::SynonymTable;

    use super::{MenuResolver, ResolutionAction, ResolverThresholds};

    fn catalog() -> Vec<MenuItem> {
        vec![
            MenuItem::new("m1", "Burger", "Main Course", Decimal::new(500, 2)),
            MenuItem::new("m2", "Vegetable Samosa", "Appetizers", Decimal::new(499, 2)),
            MenuItem::new("m3", "Butter Chicken", "Main Course", Decimal::new(1399, 2)),
            MenuItem::new("m4", "Chicken Biryani", "Main Course", Decimal::new(1299, 2)),
            MenuItem::new("m5", "Lemonade", "Beverages", Decimal::new(299, 2)),
        ]
    }

    #[test]
    fn exact_name_auto_matches() {
        let resolver = MenuResolver::default();
        let resolution = resolver.resolve("burger", &catalog());
        assert_eq!(resolution.action, ResolutionAction::AutoMatch);
        assert_eq!(resolution.best().expect("candidate").menu_item_name, "Burger");
        assert!(resolution.best().expect("candidate").confidence >= 0.85);
    }

    #[test]
    fn typo_resolves_through_synonym_table() {
        let resolver = MenuResolver::default();
        let resolution = resolver.resolve("simosa", &catalog());
        assert!(matches!(
            resolution.action,
            ResolutionAction::AutoMatch | ResolutionAction::AskClarification
        ));
        assert_eq!(resolution.best().expect("candidate").menu_item_name, "Vegetable Samosa");
    }

    #[test]
    fn misspelled_lemonade_is_never_a_silent_miss() {
        let resolver = MenuResolver::default();
        let resolution = resolver.resolve("lemmonade", &catalog());
        assert!(!resolution.candidates.is_empty(), "candidates must be non-empty");
        let best = resolution.best().expect("candidate");
        assert_eq!(best.menu_item_name, "Lemonade");
        assert!(best.confidence >= resolver.thresholds().ambiguous);
    }

    #[test]
    fn gibberish_yields_low_tier_or_no_match() {
        let resolver = MenuResolver::default();
        let resolution = resolver.resolve("xylophone sandwich", &catalog());
        assert!(matches!(
            resolution.action,
            ResolutionAction::ShowMenu | ResolutionAction::NoMatch
        ));
    }

    #[test]
    fn empty_catalog_degrades_to_no_match() {
        let resolver = MenuResolver::default();
        let resolution = resolver.resolve("burger", &[]);
        assert_eq!(resolution.action, ResolutionAction::NoMatch);
        assert!(resolution.candidates.is_empty());
    }

    #[test]
    fn unavailable_items_are_excluded_from_matching() {
        let mut items = catalog();
        items[0].available = false;
        let resolver = MenuResolver::default();
        let resolution = resolver.resolve("burger", &items);
        assert!(resolution
            .candidates
            .iter()
            .all(|candidate| candidate.menu_item_name != "Burger"));
    }

    #[test]
    fn resolution_is_idempotent_for_identical_input() {
        let resolver = MenuResolver::default();
        let first = resolver.resolve("chiken biryani", &catalog());
        let second = resolver.resolve("chiken biryani", &catalog());
        assert_eq!(first.action, second.action);
        assert_eq!(first.candidates, second.candidates);
    }

    #[test]
    fn decision_tier_is_monotonic_in_the_thresholds() {
        // Lowering the high threshold can only move the decision toward
        // a more confident tier for the same input.
        let strict = MenuResolver::new(
            ResolverThresholds { high: 0.99, ambiguous: 0.6 },
            SynonymTable::default(),
        );
        let lenient = MenuResolver::new(
            ResolverThresholds { high: 0.7, ambiguous: 0.4 },
            SynonymTable::default(),
        );

        let rank = |action: ResolutionAction| match action {
            ResolutionAction::AutoMatch => 3,
            ResolutionAction::AskClarification => 2,
            ResolutionAction::ShowMenu => 1,
            ResolutionAction::NoMatch => 0,
        };

        for utterance in ["burger", "lemmonade", "buter chiken", "veg samosa"] {
            let strict_action = strict.resolve(utterance, &catalog()).action;
            let lenient_action = lenient.resolve(utterance, &catalog()).action;
            assert!(
                rank(lenient_action) >= rank(strict_action),
                "lowering thresholds moved {utterance:?} to a less confident tier"
            );
        }
    }

    #[test]
    fn clarification_returns_at_most_three_candidates() {
        let resolver = MenuResolver::new(
            ResolverThresholds { high: 0.99, ambiguous: 0.1 },
            SynonymTable::default(),
        );
        let resolution = resolver.resolve("chicken", &catalog());
        assert_eq!(resolution.action, ResolutionAction::AskClarification);
        assert!(resolution.candidates.len() <= 3);
    }
}
