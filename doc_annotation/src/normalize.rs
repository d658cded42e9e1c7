use std::borrow::Cow;

/// Penn Treebank escapes found in tokenized corpora and the characters they stand for.
const BRACKET_ESCAPES: [(&str, &str); 6] = [
    ("-LRB-", "("),
    ("-RRB-", ")"),
    ("-LSB-", "["),
    ("-RSB-", "]"),
    ("-LCB-", "{"),
    ("-RCB-", "}"),
];

/// Replaces a bracket escape (e.g. `-LRB-`) by the bracket itself. Any other token is borrowed
/// back untouched.
pub fn normalize_token(token: &str) -> Cow<'_, str> {
    match BRACKET_ESCAPES.iter().find(|(escape, _)| *escape == token) {
        Some((_, bracket)) => Cow::Borrowed(*bracket),
        None => Cow::Borrowed(token),
    }
}

/// Normalizes every token of a sequence. See [`normalize_token`].
pub fn normalize_tokens<S: AsRef<str>>(tokens: &[S]) -> Vec<String> {
    tokens
        .iter()
        .map(|t| normalize_token(t.as_ref()).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::quickcheck;
    use rstest::rstest;

    #[rstest]
    #[case("-LRB-", "(")]
    #[case("-RRB-", ")")]
    #[case("-LSB-", "[")]
    #[case("-RSB-", "]")]
    #[case("-LCB-", "{")]
    #[case("-RCB-", "}")]
    #[case("-lrb-", "-lrb-")]
    #[case("Paris", "Paris")]
    fn test_normalize_token(#[case] token: &str, #[case] expected: &str) {
        assert_eq!(normalize_token(token), expected)
    }

    #[test]
    fn test_normalize_tokens() {
        let tokens = vec!["He", "-LRB-", "born", "1950", "-RRB-"];
        assert_eq!(
            normalize_tokens(&tokens),
            vec!["He", "(", "born", "1950", ")"]
        );
    }

    quickcheck! {
        fn prop_normalization_is_idempotent(tokens: Vec<String>) -> bool {
            let once = normalize_tokens(&tokens);
            normalize_tokens(&once) == once
        }

        fn prop_normalization_keeps_length(tokens: Vec<String>) -> bool {
            normalize_tokens(&tokens).len() == tokens.len()
        }
    }
}
