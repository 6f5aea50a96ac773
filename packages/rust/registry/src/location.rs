//! Location labels and origin tags derived from source paths.
//!
//! Registry workbooks are named after the room they inventory, usually
//! followed by the responsible person (`SALA 12_PROF_JOAO (2024).xlsx`).
//! The label produced here is best-effort display text. It never takes part
//! in record identity; only the tombamento is a key.

use std::path::Path;
use std::sync::LazyLock;

use patrimonio_shared::{LocationConfig, OriginRule};
use regex::Regex;

/// Matches a parenthesized span, e.g. `(2024)`.
static PAREN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("paren regex"));

/// Derives a location label from a workbook file name.
#[derive(Debug, Clone)]
pub struct LocationResolver {
    delimiter: String,
    separator: String,
    /// Upper-cased denylist keywords.
    denylist: Vec<String>,
}

impl LocationResolver {
    pub fn new(config: &LocationConfig) -> Self {
        Self {
            delimiter: config.delimiter.clone(),
            separator: config.separator.clone(),
            denylist: config
                .denylist
                .iter()
                .map(|k| k.trim().to_uppercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// Resolve `filename` to a location label.
    ///
    /// The first token is always kept; scanning stops at the first later
    /// token containing a denylisted keyword. Falls back to the
    /// extension-stripped name when no token survives.
    pub fn resolve(&self, filename: &str) -> String {
        let stem = Path::new(filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.to_string());

        let cleaned = PAREN_RE.replace_all(&stem, "");
        let tokens: Vec<&str> = if self.delimiter.is_empty() {
            vec![cleaned.trim()]
        } else {
            cleaned.split(self.delimiter.as_str()).map(str::trim).collect()
        };
        let tokens: Vec<&str> = tokens.into_iter().filter(|t| !t.is_empty()).collect();

        let Some((first, rest)) = tokens.split_first() else {
            return stem.clone();
        };

        let mut kept = vec![*first];
        for token in rest {
            if self.is_denied(token) {
                break;
            }
            kept.push(token);
        }

        kept.join(&self.separator)
    }

    fn is_denied(&self, token: &str) -> bool {
        let upper = token.to_uppercase();
        self.denylist.iter().any(|k| upper.contains(k.as_str()))
    }
}

/// Classify a root folder into an origin tag. First matching keyword wins.
pub fn classify_origin(root: &Path, rules: &[OriginRule], unknown: &str) -> String {
    let upper = root.to_string_lossy().to_uppercase();
    rules
        .iter()
        .find(|rule| upper.contains(&rule.keyword.to_uppercase()))
        .map(|rule| rule.name.clone())
        .unwrap_or_else(|| unknown.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(denylist: &[&str]) -> LocationResolver {
        LocationResolver::new(&LocationConfig {
            denylist: denylist.iter().map(|s| s.to_string()).collect(),
            ..LocationConfig::default()
        })
    }

    #[test]
    fn drops_parenthetical_and_denylisted_tail() {
        let r = resolver(&["PROF"]);
        assert_eq!(r.resolve("SALA 12_PROF_JOAO (2024)"), "SALA 12");
        assert_eq!(r.resolve("SALA 12_PROF_JOAO (2024).xlsx"), "SALA 12");
    }

    #[test]
    fn single_token_kept_even_when_denylisted() {
        let r = resolver(&["PROF"]);
        assert_eq!(r.resolve("ALMOXARIFADO"), "ALMOXARIFADO");
        assert_eq!(r.resolve("PROFESSORES.xlsx"), "PROFESSORES");
    }

    #[test]
    fn keeps_tokens_until_first_denied() {
        let r = resolver(&["resp"]);
        assert_eq!(r.resolve("LAB_INFORMATICA 2_Resp Maria_BLOCO B.xlsx"), "LAB INFORMATICA 2");
    }

    #[test]
    fn falls_back_to_stem_when_no_tokens() {
        let r = resolver(&["PROF"]);
        assert_eq!(r.resolve("(2024).xlsx"), "(2024)");
        assert_eq!(r.resolve("___.xlsx"), "___");
    }

    #[test]
    fn origin_keyword_order_matters() {
        let rules = vec![
            OriginRule {
                keyword: "NEOA".into(),
                name: "NEOA".into(),
            },
            OriginRule {
                keyword: "CEDUC".into(),
                name: "CEDUC".into(),
            },
        ];
        let neoa = Path::new("/srv/ceduc_secretaria/2025_patrimonio_neoa");
        let ceduc = Path::new("/srv/ceduc_secretaria/levantamento");
        let other = Path::new("/srv/outros");

        assert_eq!(classify_origin(neoa, &rules, "DESCONHECIDA"), "NEOA");
        assert_eq!(classify_origin(ceduc, &rules, "DESCONHECIDA"), "CEDUC");
        assert_eq!(classify_origin(other, &rules, "DESCONHECIDA"), "DESCONHECIDA");
    }
}
