use crate::error::DefinitionError;
use crate::lexer::lex;
use crate::types::*;

// --- Parser state ---

struct ParserState<'a> {
    source_name: &'a str,
    stack: Vec<Element>,
    root: Option<Element>,
}

impl ParserState<'_> {
    fn malformed(&self, line: usize, col: usize, message: String) -> DefinitionError {
        DefinitionError::MalformedMarkup {
            source_name: self.source_name.to_string(),
            line,
            col,
            message,
        }
    }
}

/// Parse markup text into a tree with exactly one root element.
pub fn parse_string(content: &str, source_name: &str) -> Result<MarkupTree, DefinitionError> {
    let tokens = lex(content, source_name)?;
    parse_tokens(&tokens, source_name)
}

/// Parse a token sequence into a tree.
pub fn parse_tokens(tokens: &[Token], source_name: &str) -> Result<MarkupTree, DefinitionError> {
    let mut state = ParserState {
        source_name,
        stack: Vec::new(),
        root: None,
    };

    for token in tokens {
        process_token(token, &mut state)?;
    }

    if let Some(open) = state.stack.last() {
        return Err(state.malformed(open.line, open.col, format!("unclosed tag <{}>", open.tag)));
    }

    let root = state
        .root
        .ok_or_else(|| DefinitionError::MalformedMarkup {
            source_name: source_name.to_string(),
            line: 1,
            col: 1,
            message: "no root element".into(),
        })?;

    Ok(MarkupTree {
        source_name: source_name.to_string(),
        root,
    })
}

fn process_token(token: &Token, state: &mut ParserState) -> Result<(), DefinitionError> {
    match token.token_type {
        TokenType::Comment => Ok(()),
        TokenType::Text => handle_text(token, state),
        TokenType::OpenTag => handle_open_tag(token, state),
        TokenType::CloseTag => handle_close_tag(token, state),
    }
}

fn handle_text(token: &Token, state: &mut ParserState) -> Result<(), DefinitionError> {
    let text = token.data.text.clone().unwrap_or_default();
    if text.trim().is_empty() {
        return Ok(());
    }
    if state.stack.is_empty() {
        return Err(state.malformed(
            token.line,
            token.col,
            "text outside the root element".into(),
        ));
    }
    if let Some(parent) = state.stack.last_mut() {
        parent.children.push(MarkupNode::Text(text));
    }
    Ok(())
}

fn handle_open_tag(token: &Token, state: &mut ParserState) -> Result<(), DefinitionError> {
    let element = build_element(token);
    check_link_import(&element, state.source_name)?;
    if token.data.self_closing {
        attach(element, state)
    } else {
        state.stack.push(element);
        Ok(())
    }
}

fn handle_close_tag(token: &Token, state: &mut ParserState) -> Result<(), DefinitionError> {
    let name = token.data.name.as_deref().unwrap_or_default();
    let Some(open) = state.stack.pop() else {
        return Err(state.malformed(
            token.line,
            token.col,
            format!("unexpected closing tag </{name}>"),
        ));
    };
    if !open.tag.eq_ignore_ascii_case(name) {
        return Err(state.malformed(
            token.line,
            token.col,
            format!("mismatched closing tag </{name}>, expected </{}>", open.tag),
        ));
    }
    attach(open, state)
}

fn attach(element: Element, state: &mut ParserState) -> Result<(), DefinitionError> {
    if let Some(parent) = state.stack.last_mut() {
        parent.children.push(MarkupNode::Element(element));
        return Ok(());
    }
    if state.root.is_some() {
        return Err(state.malformed(
            element.line,
            element.col,
            format!("multiple root elements (<{}>)", element.tag),
        ));
    }
    state.root = Some(element);
    Ok(())
}

fn build_element(token: &Token) -> Element {
    let tag = token.data.name.clone().unwrap_or_default();
    let (prefix, local_name) = match tag.split_once(':') {
        Some((p, l)) => (Some(p.to_string()), l.to_string()),
        None => (None, tag.clone()),
    };
    let attributes = token
        .data
        .attributes
        .iter()
        .map(|a| MarkupAttribute {
            name: a.name.clone(),
            value: AttributeValue::parse(&a.value),
            line: a.line,
            col: a.col,
        })
        .collect();

    Element {
        tag,
        prefix,
        local_name,
        attributes,
        children: Vec::new(),
        line: token.line,
        col: token.col,
    }
}

/// Elements that render as `<link>` may not import documents.
fn check_link_import(element: &Element, source_name: &str) -> Result<(), DefinitionError> {
    let renders_link = (element.prefix.is_none() && element.local_name.eq_ignore_ascii_case("link"))
        || (element.is_tag("aura:html")
            && element
                .literal("tag")
                .is_some_and(|t| t.trim().eq_ignore_ascii_case("link")));
    if !renders_link {
        return Ok(());
    }

    let has_import = element.attribute("import").is_some()
        || element
            .literal("rel")
            .is_some_and(|r| r.trim().eq_ignore_ascii_case("import"));
    if has_import {
        return Err(DefinitionError::InvalidMarkup {
            source_name: source_name.to_string(),
            tag: element.tag.clone(),
            line: element.line,
            col: element.col,
            message: "import attribute is not allowed in link tags".into(),
        });
    }
    Ok(())
}
