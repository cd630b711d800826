//! Recursive-descent parser over the token stream produced by
//! [`crate::pattern::lexer`].
//!
//! Mirrors the Python source's `parse_rule`/`parse_subexp`/`parse_pattern`
//! trio in `codecs/pattern.py`, one function per grammar production.

use crate::error::{RemoteProtoError, Result};
use crate::pattern::lexer::{tokenize, Token};
use crate::pattern::{check_timing, get_argn, BitOrder, ConditionalRule, DataRule, Operation, RuleDef};
use crate::value::ValueOrArg;

struct Parser<'a> {
    tokens: Vec<crate::pattern::lexer::Spanned>,
    source: &'a str,
    pos: usize,
    timings: &'a [String],
    args: &'a [String],
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).map(|s| s.token.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn remainder(&self) -> String {
        match self.tokens.get(self.pos) {
            Some(spanned) => self.source[spanned.offset..].to_string(),
            None => String::new(),
        }
    }

    fn error(&self, message: impl Into<String>) -> RemoteProtoError {
        RemoteProtoError::PatternParse {
            remainder: self.remainder(),
            message: message.into(),
        }
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        if self.peek() == Some(&token) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!("expected {token:?}")))
        }
    }

    fn eat_tilde(&mut self) -> bool {
        if self.peek() == Some(&Token::Tilde) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Parses an `ident | int` operand as a value-or-arg.
    fn parse_operand(&mut self) -> Result<ValueOrArg> {
        match self.advance() {
            Some(Token::Ident(name)) => Ok(ValueOrArg::arg(get_argn(&name, self.args)?)),
            Some(Token::Int(value)) => Ok(ValueOrArg::literal(value)),
            _ => Err(self.error("expected an argument name or integer literal")),
        }
    }

    /// Parses an optional `op int` suffix, bundled with a preceding `negate`
    /// flag into one [`Operation`].
    fn parse_operation(&mut self, negate: bool) -> Result<Operation> {
        if let Some(Token::Op(op)) = self.peek().cloned() {
            self.advance();
            let op_arg = match self.advance() {
                Some(Token::Int(value)) => value,
                _ => return Err(self.error("expected an integer operand after operator")),
            };
            Ok(Operation {
                negate,
                op: Some(op),
                op_arg,
            })
        } else {
            Ok(Operation {
                negate,
                op: None,
                op_arg: 0,
            })
        }
    }

    /// `{ ~? (ident|int) (op int)? (LSB|MSB) (ident|int) }`
    fn parse_data_rule(&mut self) -> Result<RuleDef> {
        self.expect(Token::LBrace)?;
        let negate = self.eat_tilde();
        let data = self.parse_operand()?;
        let op = self.parse_operation(negate)?;

        let bit_order = match self.advance() {
            Some(Token::Msb) => BitOrder::Msb,
            Some(Token::Lsb) => BitOrder::Lsb,
            _ => return Err(self.error("expected LSB or MSB")),
        };

        let nbits = self.parse_operand()?;
        self.expect(Token::RBrace)?;

        Ok(RuleDef::Data(DataRule {
            data,
            op,
            bit_order,
            nbits,
        }))
    }

    /// `( ~? ident (op int)? (>|<|=) int ? subexp (: subexp)? )`
    fn parse_conditional_rule(&mut self) -> Result<RuleDef> {
        self.expect(Token::LParen)?;
        let negate = self.eat_tilde();

        let data = match self.advance() {
            Some(Token::Ident(name)) => ValueOrArg::arg(get_argn(&name, self.args)?),
            _ => return Err(self.error("expected an argument name in condition")),
        };
        let op = self.parse_operation(negate)?;

        let comparison = match self.advance() {
            Some(Token::Cmp(cmp)) => cmp,
            _ => return Err(self.error("expected a comparison operator")),
        };
        let threshold = match self.advance() {
            Some(Token::Int(value)) => value,
            _ => return Err(self.error("expected an integer threshold")),
        };
        self.expect(Token::Question)?;

        let consequent = self.parse_subexp()?;
        if consequent.is_empty() {
            return Err(self.error("missing consequent in conditional"));
        }

        let alternate = if self.peek() == Some(&Token::Colon) {
            self.advance();
            let alt = self.parse_subexp()?;
            if alt.is_empty() {
                return Err(self.error("missing alternate in conditional"));
            }
            Some(alt)
        } else {
            None
        };

        self.expect(Token::RParen)?;

        Ok(RuleDef::Conditional(ConditionalRule {
            data,
            op,
            comparison,
            threshold,
            consequent,
            alternate,
        }))
    }

    /// Tries to parse one rule at the current position; `None` means the
    /// current token cannot start a rule (end of subexpression, not an
    /// error by itself).
    fn try_parse_rule(&mut self) -> Result<Option<RuleDef>> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.advance();
                let idx = check_timing(&name, self.timings)?;
                Ok(Some(RuleDef::Timing(idx)))
            }
            Some(Token::LBrace) => self.parse_data_rule().map(Some),
            Some(Token::LParen) => self.parse_conditional_rule().map(Some),
            _ => Ok(None),
        }
    }

    /// A succession of zero or more consecutive rules.
    fn parse_subexp(&mut self) -> Result<Vec<RuleDef>> {
        let mut rules = Vec::new();
        while let Some(rule) = self.try_parse_rule()? {
            rules.push(rule);
        }
        Ok(rules)
    }
}

/// Parses a pattern string (one of a protocol's pre/data/mid/post fields)
/// into its rule list. `timings` is the list of named timing-slot
/// identifiers declared by the protocol's `timings` block (excluding the
/// fixed `frequency`/`unit`/`one`/`zero` fields); `args` is the protocol's
/// declared argument names, in order.
pub fn parse_pattern(pattern: &str, timings: &[String], args: &[String]) -> Result<Vec<RuleDef>> {
    let tokens = tokenize(pattern)?;
    let mut parser = Parser {
        tokens,
        source: pattern,
        pos: 0,
        timings,
        args,
    };

    let rules = parser.parse_subexp()?;

    if parser.pos != parser.tokens.len() {
        return Err(parser.error("invalid pattern format"));
    }

    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_timing_reference() {
        let timings = vec!["header".to_string()];
        let args = vec![];
        let rules = parse_pattern("header", &timings, &args).unwrap();
        assert_eq!(rules.len(), 1);
        assert!(matches!(rules[0], RuleDef::Timing(0)));
    }

    #[test]
    fn parses_data_rule_with_operator() {
        let timings = vec![];
        let args = vec!["addr".to_string()];
        let rules = parse_pattern("{addr + 0x1 MSB 8}", &timings, &args).unwrap();
        assert_eq!(rules.len(), 1);
        match &rules[0] {
            RuleDef::Data(d) => {
                assert_eq!(d.data, ValueOrArg::arg(1));
                assert_eq!(d.bit_order, BitOrder::Msb);
                assert_eq!(d.nbits, ValueOrArg::literal(8));
                assert_eq!(d.op.op_arg, 1);
            }
            other => panic!("expected data rule, got {other:?}"),
        }
    }

    #[test]
    fn parses_conditional_with_alternate() {
        let timings = vec!["zero_slot".to_string(), "one_slot".to_string()];
        let args = vec!["cmd".to_string()];
        let rules = parse_pattern("(cmd = 0x1?one_slot:zero_slot)", &timings, &args).unwrap();
        match &rules[0] {
            RuleDef::Conditional(c) => {
                assert_eq!(c.threshold, 1);
                assert_eq!(c.consequent.len(), 1);
                assert!(c.alternate.is_some());
            }
            other => panic!("expected conditional rule, got {other:?}"),
        }
    }

    #[test]
    fn full_pattern_sequence() {
        let timings = vec!["header".to_string()];
        let args = vec!["addr".to_string()];
        let rules = parse_pattern("header{addr MSB 8}header", &timings, &args).unwrap();
        assert_eq!(rules.len(), 3);
    }

    #[test]
    fn rejects_trailing_garbage() {
        let timings = vec![];
        let args = vec![];
        assert!(parse_pattern("{1 MSB 8} extra)", &timings, &args).is_err());
    }

    #[test]
    fn rejects_unknown_timing_name() {
        let timings = vec!["header".to_string()];
        let args = vec![];
        assert!(parse_pattern("footer", &timings, &args).is_err());
    }
}
