//! A small recursive-descent parser for executable documents, standing in
//! for the external parser collaborator in tests.

use arcstr::ArcStr;

use crate::{
    ast::{
        Arguments, Definition, Directive, Field, Fragment, FragmentSpread, InlineFragment,
        InputValue, Operation, OperationType, OwnedDocument, Selection, Type,
        TypeSystemDefinition, VariableDefinition, VariableDefinitions,
    },
    parser::{ParseError, SourcePosition, Span, Spanning},
};

pub(crate) fn parse_document(source: &str) -> Result<OwnedDocument, Spanning<ParseError>> {
    let tokens = tokenize(source)?;
    Parser { tokens, index: 0 }.parse_document()
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Name(String),
    Int(i32),
    Float(f64),
    Str(String),
    Punct(&'static str),
    Eof,
}

const TYPE_SYSTEM_KEYWORDS: &[&str] = &[
    "schema",
    "scalar",
    "type",
    "interface",
    "union",
    "enum",
    "input",
    "extend",
    "directive",
];

fn tokenize(source: &str) -> Result<Vec<Spanning<Token>>, Spanning<ParseError>> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();
    let mut pos = SourcePosition::new_origin();

    macro_rules! bump {
        ($c:expr) => {
            if $c == '\n' {
                pos.advance_line();
            } else {
                pos.advance_col();
            }
        };
    }

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() || c == ',' {
            chars.next();
            bump!(c);
            continue;
        }
        if c == '#' {
            while let Some(&c) = chars.peek() {
                chars.next();
                bump!(c);
                if c == '\n' {
                    break;
                }
            }
            continue;
        }

        let start = pos;
        if c.is_ascii_alphabetic() || c == '_' {
            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    name.push(c);
                    chars.next();
                    bump!(c);
                } else {
                    break;
                }
            }
            tokens.push(Spanning::start_end(start, pos, Token::Name(name)));
        } else if c.is_ascii_digit() || c == '-' {
            let mut repr = String::new();
            let mut is_float = false;
            if c == '-' {
                repr.push(c);
                chars.next();
                bump!(c);
            }
            while let Some(&c) = chars.peek() {
                if c.is_ascii_digit() {
                    repr.push(c);
                    chars.next();
                    bump!(c);
                } else if (c == '.' || c == 'e' || c == 'E' || c == '+' || c == '-')
                    && !repr.is_empty()
                {
                    is_float = true;
                    repr.push(c);
                    chars.next();
                    bump!(c);
                } else {
                    break;
                }
            }
            let token = if is_float {
                repr.parse()
                    .map(Token::Float)
                    .map_err(|_| error_at(start, format!("Invalid number literal: {repr}")))?
            } else {
                repr.parse()
                    .map(Token::Int)
                    .map_err(|_| error_at(start, format!("Invalid number literal: {repr}")))?
            };
            tokens.push(Spanning::start_end(start, pos, token));
        } else if c == '"' {
            chars.next();
            bump!(c);
            let mut value = String::new();
            loop {
                match chars.next() {
                    None => return Err(error_at(start, "Unterminated string literal".into())),
                    Some('"') => {
                        pos.advance_col();
                        break;
                    }
                    Some('\\') => {
                        pos.advance_col();
                        match chars.next() {
                            Some('n') => {
                                value.push('\n');
                                pos.advance_col();
                            }
                            Some(escaped @ ('"' | '\\' | '/')) => {
                                value.push(escaped);
                                pos.advance_col();
                            }
                            other => {
                                return Err(error_at(
                                    start,
                                    format!("Unsupported string escape: {other:?}"),
                                ));
                            }
                        }
                    }
                    Some(c) => {
                        value.push(c);
                        bump!(c);
                    }
                }
            }
            tokens.push(Spanning::start_end(start, pos, Token::Str(value)));
        } else if c == '.' {
            for _ in 0..3 {
                if chars.next() != Some('.') {
                    return Err(error_at(start, "Expected \"...\"".into()));
                }
                pos.advance_col();
            }
            tokens.push(Spanning::start_end(start, pos, Token::Punct("...")));
        } else {
            let punct = match c {
                '{' => "{",
                '}' => "}",
                '(' => "(",
                ')' => ")",
                '[' => "[",
                ']' => "]",
                ':' => ":",
                '=' => "=",
                '$' => "$",
                '@' => "@",
                '!' => "!",
                '|' => "|",
                '&' => "&",
                other => {
                    return Err(error_at(start, format!("Unexpected character: {other:?}")));
                }
            };
            chars.next();
            pos.advance_col();
            tokens.push(Spanning::start_end(start, pos, Token::Punct(punct)));
        }
    }

    tokens.push(Spanning::start_end(pos, pos, Token::Eof));
    Ok(tokens)
}

fn error_at(pos: SourcePosition, message: String) -> Spanning<ParseError> {
    Spanning::new(Span::zero_width(pos), ParseError::new(message))
}

struct Parser {
    tokens: Vec<Spanning<Token>>,
    index: usize,
}

impl Parser {
    fn peek(&self) -> &Spanning<Token> {
        &self.tokens[self.index]
    }

    fn next(&mut self) -> Spanning<Token> {
        let token = self.tokens[self.index].clone();
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> Spanning<ParseError> {
        error_at(self.peek().span.start, message.into())
    }

    fn is_punct(&self, punct: &str) -> bool {
        matches!(&self.peek().item, Token::Punct(p) if *p == punct)
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if self.is_punct(punct) {
            self.next();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: &str) -> Result<Spanning<()>, Spanning<ParseError>> {
        if self.is_punct(punct) {
            Ok(self.next().map(|_| ()))
        } else {
            Err(self.error(format!("Expected \"{punct}\"")))
        }
    }

    fn expect_name(&mut self) -> Result<Spanning<String>, Spanning<ParseError>> {
        match &self.peek().item {
            Token::Name(_) => Ok(self.next().map(|t| match t {
                Token::Name(n) => n,
                _ => unreachable!(),
            })),
            _ => Err(self.error("Expected a name")),
        }
    }

    fn peek_name(&self) -> Option<&str> {
        match &self.peek().item {
            Token::Name(n) => Some(n),
            _ => None,
        }
    }

    fn parse_document(&mut self) -> Result<OwnedDocument, Spanning<ParseError>> {
        let mut definitions = Vec::new();
        while self.peek().item != Token::Eof {
            definitions.push(self.parse_definition()?);
        }
        if definitions.is_empty() {
            return Err(self.error("Document contains no definitions"));
        }
        Ok(definitions)
    }

    fn parse_definition(&mut self) -> Result<Definition, Spanning<ParseError>> {
        if self.is_punct("{") {
            let selection_set = self.parse_selection_set()?;
            return Ok(Definition::Operation(Spanning::new(
                selection_set.span,
                Operation {
                    operation_type: OperationType::Query,
                    name: None,
                    variable_definitions: None,
                    directives: None,
                    selection_set: selection_set.item,
                },
            )));
        }

        match self.peek_name() {
            Some("query") => self.parse_operation(OperationType::Query),
            Some("mutation") => self.parse_operation(OperationType::Mutation),
            Some("subscription") => self.parse_operation(OperationType::Subscription),
            Some("fragment") => self.parse_fragment(),
            Some(kw) if TYPE_SYSTEM_KEYWORDS.contains(&kw) => self.parse_type_system(),
            _ => Err(self.error("Expected a definition")),
        }
    }

    fn parse_operation(
        &mut self,
        operation_type: OperationType,
    ) -> Result<Definition, Spanning<ParseError>> {
        let keyword = self.next();
        let name = match self.peek_name() {
            Some(_) => Some(self.expect_name()?),
            None => None,
        };
        let variable_definitions = if self.is_punct("(") {
            Some(self.parse_variable_definitions()?)
        } else {
            None
        };
        let directives = self.parse_directives()?;
        let selection_set = self.parse_selection_set()?;

        Ok(Definition::Operation(Spanning::start_end(
            keyword.span.start,
            selection_set.span.end,
            Operation {
                operation_type,
                name,
                variable_definitions,
                directives,
                selection_set: selection_set.item,
            },
        )))
    }

    fn parse_variable_definitions(
        &mut self,
    ) -> Result<Spanning<VariableDefinitions>, Spanning<ParseError>> {
        let open = self.expect_punct("(")?;
        let mut items = Vec::new();
        while !self.is_punct(")") {
            self.expect_punct("$")?;
            let name = self.expect_name()?;
            self.expect_punct(":")?;
            let var_type = self.parse_type()?;
            let default_value = if self.eat_punct("=") {
                Some(self.parse_value()?)
            } else {
                None
            };
            items.push((
                name,
                VariableDefinition {
                    var_type,
                    default_value,
                },
            ));
        }
        let close = self.expect_punct(")")?;
        Ok(Spanning::start_end(
            open.span.start,
            close.span.end,
            VariableDefinitions { items },
        ))
    }

    fn parse_type(&mut self) -> Result<Spanning<Type>, Spanning<ParseError>> {
        let start = self.peek().span.start;
        let mut inner = if self.is_punct("[") {
            self.next();
            let inner = self.parse_type()?;
            let close = self.expect_punct("]")?;
            Spanning::start_end(start, close.span.end, Type::List(Box::new(inner.item)))
        } else {
            let name = self.expect_name()?;
            Spanning::new(name.span, Type::Named(ArcStr::from(name.item)))
        };
        if self.is_punct("!") {
            let bang = self.next();
            let wrapped = match inner.item {
                Type::Named(n) => Type::NonNullNamed(n),
                Type::List(l) => Type::NonNullList(l),
                t => t,
            };
            inner = Spanning::start_end(start, bang.span.end, wrapped);
        }
        Ok(inner)
    }

    fn parse_selection_set(&mut self) -> Result<Spanning<Vec<Selection>>, Spanning<ParseError>> {
        let open = self.expect_punct("{")?;
        let mut selections = Vec::new();
        while !self.is_punct("}") {
            selections.push(self.parse_selection()?);
        }
        let close = self.expect_punct("}")?;
        if selections.is_empty() {
            return Err(error_at(
                open.span.start,
                "Selection sets must select at least one field".into(),
            ));
        }
        Ok(Spanning::start_end(
            open.span.start,
            close.span.end,
            selections,
        ))
    }

    fn parse_selection(&mut self) -> Result<Selection, Spanning<ParseError>> {
        if self.is_punct("...") {
            let ellipsis = self.next();
            match self.peek_name() {
                Some("on") => {
                    self.next();
                    let type_condition = self.expect_name()?;
                    let directives = self.parse_directives()?;
                    let selection_set = self.parse_selection_set()?;
                    Ok(Selection::InlineFragment(Spanning::start_end(
                        ellipsis.span.start,
                        selection_set.span.end,
                        InlineFragment {
                            type_condition: Some(type_condition),
                            directives,
                            selection_set: selection_set.item,
                        },
                    )))
                }
                Some(_) => {
                    let name = self.expect_name()?;
                    let directives = self.parse_directives()?;
                    let end = name.span.end;
                    Ok(Selection::FragmentSpread(Spanning::start_end(
                        ellipsis.span.start,
                        end,
                        FragmentSpread { name, directives },
                    )))
                }
                None => {
                    let directives = self.parse_directives()?;
                    let selection_set = self.parse_selection_set()?;
                    Ok(Selection::InlineFragment(Spanning::start_end(
                        ellipsis.span.start,
                        selection_set.span.end,
                        InlineFragment {
                            type_condition: None,
                            directives,
                            selection_set: selection_set.item,
                        },
                    )))
                }
            }
        } else {
            self.parse_field().map(Selection::Field)
        }
    }

    fn parse_field(&mut self) -> Result<Spanning<Field>, Spanning<ParseError>> {
        let first = self.expect_name()?;
        let (alias, name) = if self.eat_punct(":") {
            (Some(first), self.expect_name()?)
        } else {
            (None, first)
        };

        let arguments = if self.is_punct("(") {
            Some(self.parse_arguments()?)
        } else {
            None
        };
        let directives = self.parse_directives()?;
        let selection_set = if self.is_punct("{") {
            Some(self.parse_selection_set()?)
        } else {
            None
        };

        let start = alias.as_ref().unwrap_or(&name).span.start;
        let end = selection_set
            .as_ref()
            .map(|s| s.span.end)
            .or_else(|| arguments.as_ref().map(|a| a.span.end))
            .unwrap_or(name.span.end);

        Ok(Spanning::start_end(
            start,
            end,
            Field {
                alias,
                name,
                arguments,
                directives,
                selection_set: selection_set.map(|s| s.item),
            },
        ))
    }

    fn parse_arguments(&mut self) -> Result<Spanning<Arguments>, Spanning<ParseError>> {
        let open = self.expect_punct("(")?;
        let mut items = Vec::new();
        while !self.is_punct(")") {
            let name = self.expect_name()?;
            self.expect_punct(":")?;
            let value = self.parse_value()?;
            items.push((name, value));
        }
        let close = self.expect_punct(")")?;
        Ok(Spanning::start_end(
            open.span.start,
            close.span.end,
            Arguments { items },
        ))
    }

    fn parse_directives(
        &mut self,
    ) -> Result<Option<Vec<Spanning<Directive>>>, Spanning<ParseError>> {
        let mut directives = Vec::new();
        while self.is_punct("@") {
            let at = self.next();
            let name = self.expect_name()?;
            let arguments = if self.is_punct("(") {
                Some(self.parse_arguments()?)
            } else {
                None
            };
            let end = arguments.as_ref().map(|a| a.span.end).unwrap_or(name.span.end);
            directives.push(Spanning::start_end(
                at.span.start,
                end,
                Directive { name, arguments },
            ));
        }
        Ok((!directives.is_empty()).then_some(directives))
    }

    fn parse_value(&mut self) -> Result<Spanning<InputValue>, Spanning<ParseError>> {
        let token = self.peek().clone();
        match &token.item {
            Token::Int(i) => {
                self.next();
                Ok(Spanning::new(token.span, InputValue::Int(*i)))
            }
            Token::Float(f) => {
                self.next();
                Ok(Spanning::new(token.span, InputValue::Float(*f)))
            }
            Token::Str(s) => {
                self.next();
                Ok(Spanning::new(token.span, InputValue::String(s.clone())))
            }
            Token::Name(n) => {
                self.next();
                let value = match n.as_str() {
                    "true" => InputValue::Boolean(true),
                    "false" => InputValue::Boolean(false),
                    "null" => InputValue::Null,
                    _ => InputValue::Enum(n.clone()),
                };
                Ok(Spanning::new(token.span, value))
            }
            Token::Punct("$") => {
                let dollar = self.next();
                let name = self.expect_name()?;
                Ok(Spanning::start_end(
                    dollar.span.start,
                    name.span.end,
                    InputValue::Variable(name.item),
                ))
            }
            Token::Punct("[") => {
                let open = self.next();
                let mut values = Vec::new();
                while !self.is_punct("]") {
                    values.push(self.parse_value()?);
                }
                let close = self.expect_punct("]")?;
                Ok(Spanning::start_end(
                    open.span.start,
                    close.span.end,
                    InputValue::List(values),
                ))
            }
            Token::Punct("{") => {
                let open = self.next();
                let mut fields = Vec::new();
                while !self.is_punct("}") {
                    let name = self.expect_name()?;
                    self.expect_punct(":")?;
                    let value = self.parse_value()?;
                    fields.push((name, value));
                }
                let close = self.expect_punct("}")?;
                Ok(Spanning::start_end(
                    open.span.start,
                    close.span.end,
                    InputValue::Object(fields),
                ))
            }
            _ => Err(self.error("Expected a value")),
        }
    }

    fn parse_fragment(&mut self) -> Result<Definition, Spanning<ParseError>> {
        let keyword = self.next();
        let name = self.expect_name()?;
        match self.peek_name() {
            Some("on") => {
                self.next();
            }
            _ => return Err(self.error("Expected \"on\"")),
        }
        let type_condition = self.expect_name()?;
        let directives = self.parse_directives()?;
        let selection_set = self.parse_selection_set()?;

        Ok(Definition::Fragment(Spanning::start_end(
            keyword.span.start,
            selection_set.span.end,
            Fragment {
                name,
                type_condition,
                directives,
                selection_set: selection_set.item,
            },
        )))
    }

    /// Consumes a type-system definition without interpreting it; the
    /// engine only needs to know it is there.
    fn parse_type_system(&mut self) -> Result<Definition, Spanning<ParseError>> {
        let keyword = self.next();
        let keyword_name = match keyword.item {
            Token::Name(n) => n,
            _ => unreachable!(),
        };
        let name = match self.peek_name() {
            Some(n) if !TYPE_SYSTEM_KEYWORDS.contains(&n) && n != "on" => {
                Some(self.expect_name()?)
            }
            _ => None,
        };

        let mut end = name.as_ref().map(|n| n.span.end).unwrap_or(keyword.span.end);
        let mut depth = 0usize;
        loop {
            match &self.peek().item {
                Token::Eof => break,
                Token::Punct("{") => {
                    depth += 1;
                    end = self.next().span.end;
                }
                Token::Punct("}") => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    end = self.next().span.end;
                    if depth == 0 {
                        break;
                    }
                }
                Token::Name(n)
                    if depth == 0
                        && (TYPE_SYSTEM_KEYWORDS.contains(&n.as_str())
                            || matches!(
                                n.as_str(),
                                "query" | "mutation" | "subscription" | "fragment"
                            )) =>
                {
                    break;
                }
                _ => {
                    end = self.next().span.end;
                }
            }
        }

        Ok(Definition::TypeSystem(Spanning::start_end(
            keyword.span.start,
            end,
            TypeSystemDefinition {
                keyword: keyword_name,
                name: name.clone(),
            },
        )))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::{Definition, InputValue, OperationType, Selection, Type},
        parser::SourcePosition,
    };

    use super::parse_document;

    #[test]
    fn parses_anonymous_operation() {
        let doc = parse_document("{ hero { name } }").unwrap();
        assert_eq!(doc.len(), 1);
        let Definition::Operation(op) = &doc[0] else {
            panic!("expected an operation");
        };
        assert_eq!(op.item.operation_type, OperationType::Query);
        assert!(op.item.name.is_none());
        assert_eq!(op.item.selection_set.len(), 1);
    }

    #[test]
    fn parses_field_positions() {
        let doc = parse_document("{ hero }").unwrap();
        let Definition::Operation(op) = &doc[0] else {
            panic!("expected an operation");
        };
        let Selection::Field(field) = &op.item.selection_set[0] else {
            panic!("expected a field");
        };
        assert_eq!(field.item.name.span.start, SourcePosition::new(2, 0, 2));
    }

    #[test]
    fn parses_variables_arguments_and_directives() {
        let doc = parse_document(
            r#"query Hero($ep: Episode = EMPIRE) { hero(episode: $ep) @include(if: true) { name } }"#,
        )
        .unwrap();
        let Definition::Operation(op) = &doc[0] else {
            panic!("expected an operation");
        };
        let defs = op.item.variable_definitions.as_ref().unwrap();
        let (name, def) = &defs.item.items[0];
        assert_eq!(name.item, "ep");
        assert_eq!(def.var_type.item, Type::Named("Episode".into()));
        assert_eq!(
            def.default_value.as_ref().unwrap().item,
            InputValue::Enum("EMPIRE".into()),
        );

        let Selection::Field(hero) = &op.item.selection_set[0] else {
            panic!("expected a field");
        };
        let args = hero.item.arguments.as_ref().unwrap();
        assert_eq!(
            args.item.get("episode").unwrap().item,
            InputValue::Variable("ep".into()),
        );
        assert_eq!(
            hero.item.directives.as_ref().unwrap()[0].item.name.item,
            "include",
        );
    }

    #[test]
    fn parses_fragments_and_spreads() {
        let doc = parse_document(
            "query { dog { ...fragA ... on Cat { meows } } } fragment fragA on Dog { barks }",
        )
        .unwrap();
        assert_eq!(doc.len(), 2);
        assert!(matches!(&doc[1], Definition::Fragment(_)));
    }

    #[test]
    fn parses_type_system_definitions_opaquely() {
        let doc = parse_document("type Foo { field: Int } { hero }").unwrap();
        assert_eq!(doc.len(), 2);
        let Definition::TypeSystem(ts) = &doc[0] else {
            panic!("expected a type-system definition");
        };
        assert_eq!(ts.item.keyword, "type");
        assert_eq!(ts.item.name.as_ref().unwrap().item, "Foo");
    }

    #[test]
    fn rejects_unterminated_selection_set() {
        assert!(parse_document("{ hero ").is_err());
    }

    #[test]
    fn parses_list_and_object_values() {
        let doc = parse_document(r#"{ f(a: [1 2] b: {x: "y" z: null}) }"#).unwrap();
        let Definition::Operation(op) = &doc[0] else {
            panic!("expected an operation");
        };
        let Selection::Field(f) = &op.item.selection_set[0] else {
            panic!("expected a field");
        };
        let args = f.item.arguments.as_ref().unwrap();
        assert!(matches!(
            args.item.get("a").unwrap().item,
            InputValue::List(_)
        ));
        assert!(matches!(
            args.item.get("b").unwrap().item,
            InputValue::Object(_)
        ));
    }
}
