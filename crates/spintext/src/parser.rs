//! Recursive-descent scanner for `{a|b}` groups and `{{name}}` placeholders.

use campaign_core::{SyntaxError, SyntaxErrorKind};
use tracing::debug;

use crate::template::{Segment, Template};

/// Parse a spintext template.
///
/// `{{` opens a variable unless a third `{` follows: names cannot hold braces,
/// so `{{{nome}}|amigo}` is a group whose first option is a variable. A group
/// whose first option starts with another group still needs a separating
/// character (`{ {a|b}|c}`). A `|` outside any group is plain text.
pub fn parse(source: &str) -> Result<Template, SyntaxError> {
    let mut parser = Parser::new(source);
    let (template, stop) = parser.sequence(false)?;
    debug_assert_eq!(stop, Stop::End);
    debug!(
        segments = template.segments.len(),
        variables = template.variables().len(),
        "parsed template"
    );
    Ok(template)
}

/// Why a sequence ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    End,
    Pipe,
    Close,
}

struct Parser<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek_at(&self, pos: usize) -> Option<u8> {
        self.bytes.get(pos).copied()
    }

    /// Scan segments until end of input, or, inside a group, until a
    /// top-level `|` or `}` (left unconsumed).
    fn sequence(&mut self, in_group: bool) -> Result<(Template, Stop), SyntaxError> {
        let mut segments = Vec::new();
        let mut literal_start = self.pos;

        loop {
            let Some(b) = self.peek_at(self.pos) else {
                self.flush_literal(literal_start, &mut segments);
                return Ok((Template::new(segments), Stop::End));
            };

            match b {
                b'{' => {
                    self.flush_literal(literal_start, &mut segments);
                    let opens_variable = self.peek_at(self.pos + 1) == Some(b'{')
                        && self.peek_at(self.pos + 2) != Some(b'{');
                    let segment = if opens_variable {
                        self.variable()?
                    } else {
                        self.group()?
                    };
                    segments.push(segment);
                    literal_start = self.pos;
                }
                b'}' if in_group => {
                    self.flush_literal(literal_start, &mut segments);
                    return Ok((Template::new(segments), Stop::Close));
                }
                b'}' => {
                    return Err(SyntaxError::new(SyntaxErrorKind::UnbalancedBrace, self.pos));
                }
                b'|' if in_group => {
                    self.flush_literal(literal_start, &mut segments);
                    return Ok((Template::new(segments), Stop::Pipe));
                }
                _ => self.pos += 1,
            }
        }
    }

    // Braces and pipes are ASCII, so every cut lands on a char boundary.
    fn flush_literal(&self, start: usize, segments: &mut Vec<Segment>) {
        if start < self.pos {
            segments.push(Segment::Literal(self.src[start..self.pos].to_string()));
        }
    }

    fn variable(&mut self) -> Result<Segment, SyntaxError> {
        let open = self.pos;
        self.pos += 2;
        let name_start = self.pos;

        loop {
            match self.peek_at(self.pos) {
                None => {
                    return Err(SyntaxError::new(SyntaxErrorKind::UnterminatedVariable, open));
                }
                Some(b'}') if self.peek_at(self.pos + 1) == Some(b'}') => {
                    let name = &self.src[name_start..self.pos];
                    if name.is_empty() {
                        return Err(SyntaxError::new(SyntaxErrorKind::EmptyVariableName, open));
                    }
                    self.pos += 2;
                    return Ok(Segment::Variable(name.to_string()));
                }
                Some(b'}') if self.peek_at(self.pos + 1).is_none() => {
                    return Err(SyntaxError::new(SyntaxErrorKind::UnterminatedVariable, open));
                }
                Some(b'{' | b'}' | b'|') => {
                    return Err(SyntaxError::new(SyntaxErrorKind::InvalidVariableName, open));
                }
                Some(_) => self.pos += 1,
            }
        }
    }

    fn group(&mut self) -> Result<Segment, SyntaxError> {
        let open = self.pos;
        self.pos += 1;
        let mut options = Vec::new();

        loop {
            let (option, stop) = self.sequence(true)?;
            options.push(option);
            match stop {
                Stop::Pipe => self.pos += 1,
                Stop::Close => {
                    self.pos += 1;
                    return Ok(Segment::Variation(options));
                }
                Stop::End => {
                    return Err(SyntaxError::new(SyntaxErrorKind::UnterminatedGroup, open));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(s: &str) -> Segment {
        Segment::Literal(s.to_string())
    }

    fn var(s: &str) -> Segment {
        Segment::Variable(s.to_string())
    }

    fn kind_of(src: &str) -> SyntaxErrorKind {
        parse(src).unwrap_err().kind
    }

    #[test]
    fn test_plain_text_is_single_literal() {
        let t = parse("Hoje tem feijoada!").unwrap();
        assert_eq!(t.segments, vec![lit("Hoje tem feijoada!")]);
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn test_variable_and_group() {
        let t = parse("{Hi|Hey} {{nome}}").unwrap();
        assert_eq!(
            t.segments,
            vec![
                Segment::Variation(vec![
                    Template::new(vec![lit("Hi")]),
                    Template::new(vec![lit("Hey")]),
                ]),
                lit(" "),
                var("nome"),
            ]
        );
    }

    #[test]
    fn test_nested_pipes_do_not_split_outer_group() {
        let t = parse("{a|{b|c}|{{x}}}").unwrap();
        let Segment::Variation(options) = &t.segments[0] else {
            panic!("expected a variation group");
        };
        assert_eq!(options.len(), 3);
        assert_eq!(
            options[1].segments,
            vec![Segment::Variation(vec![
                Template::new(vec![lit("b")]),
                Template::new(vec![lit("c")]),
            ])]
        );
        assert_eq!(options[2].segments, vec![var("x")]);
    }

    #[test]
    fn test_empty_options_are_kept() {
        let t = parse("{|foo|}").unwrap();
        let Segment::Variation(options) = &t.segments[0] else {
            panic!("expected a variation group");
        };
        assert_eq!(options.len(), 3);
        assert!(options[0].is_empty());
        assert!(options[2].is_empty());

        let t = parse("{}").unwrap();
        assert_eq!(t.segments, vec![Segment::Variation(vec![Template::default()])]);
    }

    #[test]
    fn test_whitespace_preserved() {
        let t = parse("  { a | b }  {{ nome }}\n").unwrap();
        let Segment::Variation(options) = &t.segments[1] else {
            panic!("expected a variation group");
        };
        assert_eq!(options[0].segments, vec![lit(" a ")]);
        assert_eq!(t.segments[0], lit("  "));
        assert_eq!(t.segments[3], var(" nome "));
        assert_eq!(t.segments[4], lit("\n"));
    }

    #[test]
    fn test_top_level_pipe_is_literal() {
        let t = parse("Almoço | Jantar").unwrap();
        assert_eq!(t.segments, vec![lit("Almoço | Jantar")]);
    }

    #[test]
    fn test_unterminated_group() {
        let err = parse("{a|b").unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::UnterminatedGroup);
        assert_eq!(err.offset, 0);

        let err = parse("ok {a|{b|c}").unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::UnterminatedGroup);
        assert_eq!(err.offset, 3);
    }

    #[test]
    fn test_malformed_variables() {
        assert_eq!(kind_of("Oi {{nome"), SyntaxErrorKind::UnterminatedVariable);
        assert_eq!(kind_of("Oi {{nome}"), SyntaxErrorKind::UnterminatedVariable);
        assert_eq!(kind_of("{{}}"), SyntaxErrorKind::EmptyVariableName);
        assert_eq!(kind_of("{{a|b}}"), SyntaxErrorKind::InvalidVariableName);
        assert_eq!(kind_of("{{a{b}}"), SyntaxErrorKind::InvalidVariableName);
        assert_eq!(kind_of("{{a}b}}"), SyntaxErrorKind::InvalidVariableName);
        // `{` then `{{a|b}`: the inner placeholder is the malformed part.
        let err = parse("{{{a|b}|c}").unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::InvalidVariableName);
        assert_eq!(err.offset, 1);
    }

    #[test]
    fn test_triple_brace_opens_group_around_variable() {
        let t = parse("{{{nome}}|amigo}, tudo bem?").unwrap();
        assert_eq!(
            t.segments,
            vec![
                Segment::Variation(vec![
                    Template::new(vec![var("nome")]),
                    Template::new(vec![lit("amigo")]),
                ]),
                lit(", tudo bem?"),
            ]
        );

        let t = parse("{{{nome}}}").unwrap();
        assert_eq!(
            t.segments,
            vec![Segment::Variation(vec![Template::new(vec![var("nome")])])]
        );
        assert_eq!(kind_of("{{{nome}}"), SyntaxErrorKind::UnterminatedGroup);
    }

    #[test]
    fn test_unbalanced_closing_brace() {
        let err = parse("Oi}").unwrap_err();
        assert_eq!(err.kind, SyntaxErrorKind::UnbalancedBrace);
        assert_eq!(err.offset, 2);
        assert_eq!(kind_of("{a}}"), SyntaxErrorKind::UnbalancedBrace);
        assert_eq!(kind_of("{{nome}}}"), SyntaxErrorKind::UnbalancedBrace);
    }

    #[test]
    fn test_multibyte_text_around_braces() {
        let t = parse("Olá {é|ê} 😋{{preço}}").unwrap();
        assert_eq!(t.segments[0], lit("Olá "));
        assert_eq!(t.segments[2], lit(" 😋"));
        assert_eq!(t.segments[3], var("preço"));
    }
}
