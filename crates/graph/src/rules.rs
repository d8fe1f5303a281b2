use crate::error::RulesError;
use shakmaty::fen::Fen;
use shakmaty::san::SanPlus;
use shakmaty::{Chess, EnPassantMode};

/// Outcome of applying one move token
#[derive(Debug, Clone)]
pub struct AppliedMove<P> {
    /// Position after the move
    pub position: P,

    /// Canonical key of `position`
    pub key: String,

    /// Normalized move notation (SAN with check suffix)
    pub notation: String,
}

/// Chess rules capability used by the graph builder
///
/// Implementations must be deterministic: the same position and token always
/// produce the same key and notation.
pub trait RulesProvider {
    type Position: Clone;

    /// Standard initial position
    fn initial(&self) -> Self::Position;

    /// Apply a move token to `position`
    fn apply(
        &self,
        position: &Self::Position,
        token: &str,
    ) -> Result<AppliedMove<Self::Position>, RulesError>;

    /// Serialization of the full board state that equates transpositions
    fn canonical_key(&self, position: &Self::Position) -> String;
}

/// Rules provider backed by `shakmaty`
///
/// Keys are six-field FENs; the en-passant square is only written when a
/// capture is actually legal, so transpositions through a double pawn push
/// still merge.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShakmatyRules;

impl RulesProvider for ShakmatyRules {
    type Position = Chess;

    fn initial(&self) -> Chess {
        Chess::default()
    }

    fn apply(&self, position: &Chess, token: &str) -> Result<AppliedMove<Chess>, RulesError> {
        let normalized = normalize_castling(token);
        let san: SanPlus = normalized
            .parse()
            .map_err(|_| RulesError::Unparseable(token.to_string()))?;

        let mv = san.san.to_move(position).map_err(|_| RulesError::Illegal {
            token: token.to_string(),
            fen: self.canonical_key(position),
        })?;

        let mut next = position.clone();
        let notation = SanPlus::from_move_and_play_unchecked(&mut next, &mv).to_string();
        let key = self.canonical_key(&next);

        Ok(AppliedMove {
            position: next,
            key,
            notation,
        })
    }

    fn canonical_key(&self, position: &Chess) -> String {
        Fen::from_position(position.clone(), EnPassantMode::Legal).to_string()
    }
}

/// Accept the digit-zero castling spelling found in some datasets
fn normalize_castling(token: &str) -> String {
    if let Some(rest) = token.strip_prefix("0-0-0") {
        format!("O-O-O{rest}")
    } else if let Some(rest) = token.strip_prefix("0-0") {
        format!("O-O{rest}")
    } else {
        token.to_string()
    }
}

/// Split PGN-style move text into move tokens
///
/// Drops move numbers (`1.`, `3...`, also glued as in `1.e4`), results,
/// NAGs, `{comments}` and `(variations)`, and trailing `!`/`?` annotations.
pub fn tokenize_move_text(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut comment_depth = 0usize;
    let mut variation_depth = 0usize;

    for raw in text.split_whitespace() {
        let mut word = raw;

        if comment_depth > 0 || word.starts_with('{') {
            comment_depth += word.matches('{').count();
            comment_depth = comment_depth.saturating_sub(word.matches('}').count());
            continue;
        }
        if variation_depth > 0 || word.starts_with('(') {
            variation_depth += word.matches('(').count();
            variation_depth = variation_depth.saturating_sub(word.matches(')').count());
            continue;
        }

        if is_result(word) || word.starts_with('$') {
            continue;
        }

        let digits = word.len() - word.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits > 0 && word[digits..].starts_with('.') {
            word = word[digits..].trim_start_matches('.');
        }

        let word = word.trim_end_matches(&['!', '?'][..]);
        if !word.is_empty() {
            tokens.push(word.to_string());
        }
    }

    tokens
}

fn is_result(word: &str) -> bool {
    matches!(word, "1-0" | "0-1" | "1/2-1/2" | "*")
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn test_tokenize_strips_move_numbers() {
        assert_eq!(tokenize_move_text("1. e4 e5 2. Nf3"), vec!["e4", "e5", "Nf3"]);
        assert_eq!(tokenize_move_text("1.e4 1...e5 2.Nf3"), vec!["e4", "e5", "Nf3"]);
        assert_eq!(tokenize_move_text("12... Qxd4"), vec!["Qxd4"]);
    }

    #[test]
    fn test_tokenize_drops_noise() {
        assert_eq!(
            tokenize_move_text("1. e4!? {a long comment} e5 $1 (1... c5 2. Nf3) 2. Nf3?? 1-0"),
            vec!["e4", "e5", "Nf3"]
        );
        assert!(tokenize_move_text("   ").is_empty());
        assert!(tokenize_move_text("1. *").is_empty());
    }

    #[test]
    fn test_castling_tokens_survive_tokenizer() {
        assert_eq!(tokenize_move_text("5. O-O 0-0-0"), vec!["O-O", "0-0-0"]);
    }

    #[test]
    fn test_initial_key() {
        let rules = ShakmatyRules;
        assert_eq!(rules.canonical_key(&rules.initial()), START);
    }

    #[test]
    fn test_apply_produces_san_and_fen() {
        let rules = ShakmatyRules;
        let applied = rules.apply(&rules.initial(), "e4").unwrap();

        assert_eq!(applied.notation, "e4");
        // No legal en-passant capture, so no target square in the key
        assert_eq!(
            applied.key,
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
        );
    }

    #[test]
    fn test_apply_adds_check_suffix() {
        let rules = ShakmatyRules;
        let mut position = rules.initial();
        for token in ["e4", "f5", "Qh5"] {
            let applied = rules.apply(&position, token).unwrap();
            position = applied.position;
            if token == "Qh5" {
                assert_eq!(applied.notation, "Qh5+");
            }
        }
    }

    #[test]
    fn test_apply_rejects_illegal_and_garbage() {
        let rules = ShakmatyRules;
        let start = rules.initial();

        assert!(matches!(
            rules.apply(&start, "e5"),
            Err(RulesError::Illegal { .. })
        ));
        assert!(matches!(
            rules.apply(&start, "Zz9"),
            Err(RulesError::Unparseable(_))
        ));
    }
}
