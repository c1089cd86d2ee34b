//! Delimiter pairing and significant-token indexing shared by the scanners.

use crate::tokenizer::{Token, TokenKind};

use super::error::{Fault, MalformedReason};

/// Indices of every token that is neither trivia nor the end marker.
pub(crate) fn significant(tokens: &[Token]) -> Vec<usize> {
    tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.is_trivia() && t.kind != TokenKind::Eof)
        .map(|(i, _)| i)
        .collect()
}

fn closer_for(opener: &str) -> &'static str {
    match opener {
        "(" => ")",
        "{" => "}",
        _ => "]",
    }
}

/// Pair every opening `(`, `[`, `{` and `#[` with its closer.
///
/// The returned vector is indexed by token; both ends of a pair point at
/// each other. Unterminated literals and unbalanced delimiters are faults.
pub(crate) fn match_delimiters(tokens: &[Token]) -> Result<Vec<Option<usize>>, Fault> {
    let mut partners = vec![None; tokens.len()];
    let mut open: Vec<usize> = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::Unterminated(what) => {
                return Err(Fault::new(token.line, MalformedReason::Unterminated(what)));
            }
            TokenKind::Punct => {}
            _ => continue,
        }

        match token.text.as_str() {
            "(" | "[" | "{" | "#[" => open.push(i),
            ")" | "]" | "}" => {
                let Some(opener) = open.pop() else {
                    return Err(Fault::new(
                        token.line,
                        MalformedReason::Unexpected(token.text.clone()),
                    ));
                };
                let expected = closer_for(&tokens[opener].text);
                if token.text != expected {
                    return Err(Fault::new(
                        token.line,
                        MalformedReason::Mismatched {
                            expected: expected.to_string(),
                            found: token.text.clone(),
                        },
                    ));
                }
                partners[opener] = Some(i);
                partners[i] = Some(opener);
            }
            _ => {}
        }
    }

    if let Some(&opener) = open.last() {
        let token = &tokens[opener];
        return Err(Fault::new(
            token.line,
            MalformedReason::Unclosed(token.text.clone()),
        ));
    }

    Ok(partners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::{tokenize, Unclosed};

    #[test]
    fn test_pairs_nested_delimiters() {
        let tokens = tokenize("<?php f([1, (2)], #[A] {x});");
        let partners = match_delimiters(&tokens).unwrap();

        let open = tokens.iter().position(|t| t.text == "(").unwrap();
        let close = partners[open].unwrap();
        assert_eq!(tokens[close].text, ")");
        assert_eq!(close, tokens.len() - 3); // `)` `;` Eof

        let attr = tokens.iter().position(|t| t.text == "#[").unwrap();
        assert_eq!(tokens[partners[attr].unwrap()].text, "]");
    }

    #[test]
    fn test_unbalanced_delimiters() {
        let fault = match_delimiters(&tokenize("<?php\nfunction f() {\n")).unwrap_err();
        assert_eq!(fault.reason, MalformedReason::Unclosed("{".to_string()));
        assert_eq!(fault.line, 2);

        let fault = match_delimiters(&tokenize("<?php }")).unwrap_err();
        assert_eq!(fault.reason, MalformedReason::Unexpected("}".to_string()));

        let fault = match_delimiters(&tokenize("<?php f(];")).unwrap_err();
        assert_eq!(
            fault.reason,
            MalformedReason::Mismatched {
                expected: ")".to_string(),
                found: "]".to_string()
            }
        );
    }

    #[test]
    fn test_unterminated_literal_is_fault() {
        let fault = match_delimiters(&tokenize("<?php\n$a = \"open")).unwrap_err();
        assert_eq!(fault.reason, MalformedReason::Unterminated(Unclosed::String));
        assert_eq!(fault.line, 2);
    }

    #[test]
    fn test_significant_skips_trivia() {
        let tokens = tokenize("<?php /* c */ $a ;");
        let texts: Vec<&str> = significant(&tokens)
            .into_iter()
            .map(|i| tokens[i].text.as_str())
            .collect();
        assert_eq!(texts, vec!["<?php", "$a", ";"]);
    }
}
