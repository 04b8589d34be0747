//! Recursive-descent parser for `.swen` scene descriptions.
//!
//! One method per grammar production, driven by a peek/advance cursor over
//! the token slice. Nodes are flattened into the scene tree's bounded arena
//! as they complete; each `nodes [ ... ]` list is root-filtered on close so
//! only its top-level entries become children of the enclosing node.
//!
//! Coordinate accumulation happens here: every child receives
//! `parent.local_position + parent.position` as its own `local_position`,
//! which is why `position` must be declared before `nodes`.
//!
//! Unknown constructs inside a body (`clip`, `wayland_surface`, stray
//! identifiers) are logged and skipped; a missing brace or bracket is fatal.

use std::collections::HashSet;

use swen_scene::{
    root_filter, App, Children, Color, Desktop, Matrix, Node, NodeId, RectNode, Root, SceneTree,
    StableId, System, TextNode, TransformNode, Vector, Workspace,
};

use crate::error::{ParseError, ParseErrorKind};
use crate::token::{Span, Token, TokenTag};

/// Parse a token slice into `tree`, replacing its root.
///
/// # Errors
/// Fatal for the whole file; the error carries the offending span.
pub fn parse(tokens: &[Token<'_>], tree: &mut SceneTree) -> Result<(), ParseError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        tree,
        id_scopes: Vec::new(),
    };
    parser.parse_root()
}

struct Parser<'src, 'a> {
    tokens: &'a [Token<'src>],
    pos: usize,
    tree: &'a mut SceneTree,
    /// One declared-id namespace per app subtree (and one for the desktop
    /// layer); duplicate declarations inside a scope are parse errors.
    id_scopes: Vec<HashSet<String>>,
}

impl<'src> Parser<'src, '_> {
    // Cursor helpers

    fn peek(&self) -> Token<'src> {
        self.tokens
            .get(self.pos)
            .copied()
            .unwrap_or(Token::new("", TokenTag::Eof, Span::new(0, 0, 0)))
    }

    fn advance(&mut self) -> Token<'src> {
        let token = self.peek();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, tag: TokenTag) -> bool {
        self.peek().tag == tag
    }

    fn expect(&mut self, tag: TokenTag) -> Result<Token<'src>, ParseError> {
        if self.check(tag) {
            Ok(self.advance())
        } else {
            Err(self.err(ParseErrorKind::ExpectedToken {
                expected: tag.name(),
            }))
        }
    }

    fn err(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, self.peek().span)
    }

    // Productions

    fn parse_root(&mut self) -> Result<(), ParseError> {
        self.expect(TokenTag::Root)?;
        self.expect(TokenTag::LBrace)?;
        let mut desktop: Option<Desktop> = None;
        let mut system: Option<System> = None;
        loop {
            match self.peek().tag {
                TokenTag::Desktop => {
                    if desktop.is_some() {
                        return Err(self.err(ParseErrorKind::DuplicateNode { node: "desktop" }));
                    }
                    desktop = Some(self.parse_desktop()?);
                }
                TokenTag::System => {
                    if system.is_some() {
                        return Err(self.err(ParseErrorKind::DuplicateNode { node: "system" }));
                    }
                    system = Some(self.parse_system()?);
                }
                TokenTag::RBrace => {
                    self.advance();
                    break;
                }
                TokenTag::Eof => {
                    return Err(self.err(ParseErrorKind::ExpectedToken { expected: "}" }))
                }
                _ => self.skip_unknown(),
            }
        }
        let desktop = desktop
            .ok_or_else(|| self.err(ParseErrorKind::MissingRequiredNode { node: "desktop" }))?;
        let system = system
            .ok_or_else(|| self.err(ParseErrorKind::MissingRequiredNode { node: "system" }))?;
        self.tree.root = Root { desktop, system };
        Ok(())
    }

    fn parse_desktop(&mut self) -> Result<Desktop, ParseError> {
        let start = self.expect(TokenTag::Desktop)?.span;
        self.expect(TokenTag::LBrace)?;
        self.id_scopes.push(HashSet::new());
        let mut size: Option<Vector> = None;
        let mut background: Option<Color> = None;
        let mut nodes: Option<Vec<NodeId>> = None;
        let mut workspaces: Option<Vec<Workspace>> = None;
        loop {
            match self.peek().tag {
                TokenTag::Size => {
                    if size.is_some() {
                        return Err(self.err(ParseErrorKind::DuplicateProperty {
                            property: "size",
                        }));
                    }
                    let span = self.advance().span;
                    let value = self.parse_vector()?;
                    if !value.is_strictly_positive() {
                        return Err(ParseError::new(ParseErrorKind::InvalidSize, span));
                    }
                    size = Some(value);
                }
                TokenTag::Background => {
                    if background.is_some() {
                        return Err(self.err(ParseErrorKind::DuplicateProperty {
                            property: "background",
                        }));
                    }
                    self.advance();
                    background = Some(self.parse_color()?);
                }
                TokenTag::Nodes => {
                    if nodes.is_some() {
                        return Err(self.err(ParseErrorKind::DuplicateProperty {
                            property: "nodes",
                        }));
                    }
                    self.advance();
                    nodes = Some(self.parse_node_list(Vector::ZERO)?);
                }
                TokenTag::Workspaces => {
                    if workspaces.is_some() {
                        return Err(self.err(ParseErrorKind::DuplicateProperty {
                            property: "workspaces",
                        }));
                    }
                    self.advance();
                    workspaces = Some(self.parse_workspaces()?);
                }
                TokenTag::RBrace => {
                    self.advance();
                    break;
                }
                TokenTag::Eof => {
                    return Err(self.err(ParseErrorKind::ExpectedToken { expected: "}" }))
                }
                _ => self.skip_unknown(),
            }
        }
        self.id_scopes.pop();
        let size = size.ok_or(ParseError::new(
            ParseErrorKind::MissingProperty { property: "size" },
            start,
        ))?;
        Ok(Desktop {
            size,
            background,
            active_workspace: None,
            workspaces: workspaces.unwrap_or_default(),
            nodes: nodes.unwrap_or_default(),
        })
    }

    fn parse_workspaces(&mut self) -> Result<Vec<Workspace>, ParseError> {
        self.expect(TokenTag::LBracket)?;
        let mut workspaces = Vec::new();
        loop {
            match self.peek().tag {
                TokenTag::LBrace => workspaces.push(self.parse_workspace()?),
                TokenTag::RBracket => {
                    self.advance();
                    break;
                }
                TokenTag::Eof => {
                    return Err(self.err(ParseErrorKind::ExpectedToken { expected: "]" }))
                }
                _ => self.skip_unknown(),
            }
        }
        Ok(workspaces)
    }

    fn parse_workspace(&mut self) -> Result<Workspace, ParseError> {
        self.expect(TokenTag::LBrace)?;
        let mut apps = Vec::new();
        loop {
            match self.peek().tag {
                TokenTag::App => apps.push(self.parse_app()?),
                TokenTag::RBrace => {
                    self.advance();
                    break;
                }
                TokenTag::Eof => {
                    return Err(self.err(ParseErrorKind::ExpectedToken { expected: "}" }))
                }
                _ => self.skip_unknown(),
            }
        }
        Ok(Workspace { apps })
    }

    /// System contents are structural only: app subtrees are retained for
    /// reachability, everything else is skipped.
    fn parse_system(&mut self) -> Result<System, ParseError> {
        self.expect(TokenTag::System)?;
        self.expect(TokenTag::LBrace)?;
        let mut apps = Vec::new();
        loop {
            match self.peek().tag {
                TokenTag::App => apps.push(self.parse_app()?),
                TokenTag::RBrace => {
                    self.advance();
                    break;
                }
                TokenTag::Eof => {
                    return Err(self.err(ParseErrorKind::ExpectedToken { expected: "}" }))
                }
                _ => self.skip_unknown(),
            }
        }
        Ok(System { apps })
    }

    fn parse_app(&mut self) -> Result<App, ParseError> {
        let start = self.expect(TokenTag::App)?.span;
        self.expect(TokenTag::LBrace)?;
        self.id_scopes.push(HashSet::new());
        let mut id: Option<String> = None;
        let mut size: Option<Vector> = None;
        let mut position: Option<Vector> = None;
        let mut background: Option<Color> = None;
        let mut children: Option<Vec<NodeId>> = None;
        loop {
            match self.peek().tag {
                TokenTag::Id => {
                    if id.is_some() {
                        return Err(
                            self.err(ParseErrorKind::DuplicateProperty { property: "id" })
                        );
                    }
                    self.advance();
                    id = Some(self.expect(TokenTag::Str)?.literal.to_owned());
                }
                TokenTag::Size => {
                    if size.is_some() {
                        return Err(self.err(ParseErrorKind::DuplicateProperty {
                            property: "size",
                        }));
                    }
                    let span = self.advance().span;
                    let value = self.parse_vector()?;
                    if !value.is_strictly_positive() {
                        return Err(ParseError::new(ParseErrorKind::InvalidSize, span));
                    }
                    size = Some(value);
                }
                TokenTag::Position => {
                    if position.is_some() {
                        return Err(self.err(ParseErrorKind::DuplicateProperty {
                            property: "position",
                        }));
                    }
                    self.advance();
                    position = Some(self.parse_vector()?);
                }
                TokenTag::Background => {
                    if background.is_some() {
                        return Err(self.err(ParseErrorKind::DuplicateProperty {
                            property: "background",
                        }));
                    }
                    self.advance();
                    background = Some(self.parse_color()?);
                }
                TokenTag::Nodes => {
                    if children.is_some() {
                        return Err(self.err(ParseErrorKind::DuplicateProperty {
                            property: "nodes",
                        }));
                    }
                    let span = self.advance().span;
                    let Some(origin) = position else {
                        return Err(ParseError::new(ParseErrorKind::InvalidPosition, span));
                    };
                    children = Some(self.parse_node_list(origin)?);
                }
                TokenTag::RBrace => {
                    self.advance();
                    break;
                }
                TokenTag::Eof => {
                    return Err(self.err(ParseErrorKind::ExpectedToken { expected: "}" }))
                }
                _ => self.skip_unknown(),
            }
        }
        self.id_scopes.pop();
        let id = id.ok_or(ParseError::new(
            ParseErrorKind::MissingProperty { property: "id" },
            start,
        ))?;
        let size = size.ok_or(ParseError::new(
            ParseErrorKind::MissingProperty { property: "size" },
            start,
        ))?;
        let position = position.ok_or(ParseError::new(
            ParseErrorKind::MissingProperty { property: "position" },
            start,
        ))?;
        Ok(App {
            id,
            size,
            position,
            background: background.unwrap_or(Color::BLACK),
            children: Children::from_slice(&children.unwrap_or_default()),
        })
    }

    /// Parse `[ node* ]`, flattening every node into the arena, then
    /// root-filter the emitted range so only top-level entries remain.
    fn parse_node_list(&mut self, local: Vector) -> Result<Vec<NodeId>, ParseError> {
        let list_span = self.expect(TokenTag::LBracket)?.span;
        let first = self.tree.next_node_id();
        loop {
            match self.peek().tag {
                TokenTag::Rect => {
                    self.parse_rect(local)?;
                }
                TokenTag::Text => {
                    self.parse_text(local)?;
                }
                TokenTag::Transform => {
                    self.parse_transform(local)?;
                }
                TokenTag::RBracket => {
                    self.advance();
                    break;
                }
                TokenTag::Eof => {
                    return Err(self.err(ParseErrorKind::ExpectedToken { expected: "]" }))
                }
                _ => self.skip_unknown(),
            }
        }
        let last = self.tree.next_node_id();
        let candidates: Vec<NodeId> = (first.0..last.0).map(NodeId).collect();
        root_filter(self.tree, &candidates, self.tree.node_capacity())
            .map_err(|_| ParseError::new(ParseErrorKind::OutOfMemory, list_span))
    }

    fn parse_rect(&mut self, local: Vector) -> Result<NodeId, ParseError> {
        let start = self.expect(TokenTag::Rect)?.span;
        self.expect(TokenTag::LBrace)?;
        let mut declared: Option<String> = None;
        let mut size: Option<Vector> = None;
        let mut position: Option<Vector> = None;
        let mut background: Option<Color> = None;
        let mut children: Option<Vec<NodeId>> = None;
        loop {
            match self.peek().tag {
                TokenTag::Id => {
                    if declared.is_some() {
                        return Err(
                            self.err(ParseErrorKind::DuplicateProperty { property: "id" })
                        );
                    }
                    self.advance();
                    declared = Some(self.expect(TokenTag::Str)?.literal.to_owned());
                }
                TokenTag::Size => {
                    if size.is_some() {
                        return Err(self.err(ParseErrorKind::DuplicateProperty {
                            property: "size",
                        }));
                    }
                    let span = self.advance().span;
                    let value = self.parse_vector()?;
                    if !value.is_strictly_positive() {
                        return Err(ParseError::new(ParseErrorKind::InvalidSize, span));
                    }
                    size = Some(value);
                }
                TokenTag::Position => {
                    if position.is_some() {
                        return Err(self.err(ParseErrorKind::DuplicateProperty {
                            property: "position",
                        }));
                    }
                    self.advance();
                    position = Some(self.parse_vector()?);
                }
                TokenTag::Background => {
                    if background.is_some() {
                        return Err(self.err(ParseErrorKind::DuplicateProperty {
                            property: "background",
                        }));
                    }
                    self.advance();
                    background = Some(self.parse_color()?);
                }
                TokenTag::Nodes => {
                    if children.is_some() {
                        return Err(self.err(ParseErrorKind::DuplicateProperty {
                            property: "nodes",
                        }));
                    }
                    let span = self.advance().span;
                    // The child's local coordinate is computed from the
                    // enclosing position, so it must already be known.
                    let Some(origin) = position else {
                        return Err(ParseError::new(ParseErrorKind::InvalidPosition, span));
                    };
                    children = Some(self.parse_node_list(local + origin)?);
                }
                TokenTag::RBrace => {
                    self.advance();
                    break;
                }
                TokenTag::Eof => {
                    return Err(self.err(ParseErrorKind::ExpectedToken { expected: "}" }))
                }
                _ => self.skip_unknown(),
            }
        }
        let size = size.ok_or(ParseError::new(
            ParseErrorKind::MissingProperty { property: "size" },
            start,
        ))?;
        let position = position.ok_or(ParseError::new(
            ParseErrorKind::MissingProperty { property: "position" },
            start,
        ))?;
        let stable_id = self.declare(declared.as_deref(), start)?;
        let node_id = self.tree.next_node_id();
        self.tree
            .push(Node::Rect(RectNode {
                node_id,
                stable_id,
                declared_id: declared,
                size,
                position,
                local_position: local,
                background,
                children: Children::from_slice(&children.unwrap_or_default()),
            }))
            .map_err(|_| ParseError::new(ParseErrorKind::OutOfMemory, start))
    }

    fn parse_text(&mut self, local: Vector) -> Result<NodeId, ParseError> {
        let start = self.expect(TokenTag::Text)?.span;
        self.expect(TokenTag::LBrace)?;
        let mut declared: Option<String> = None;
        let mut body: Option<String> = None;
        let mut color: Option<Color> = None;
        let mut position: Option<Vector> = None;
        let mut text_size: Option<u16> = None;
        loop {
            match self.peek().tag {
                TokenTag::Id => {
                    if declared.is_some() {
                        return Err(
                            self.err(ParseErrorKind::DuplicateProperty { property: "id" })
                        );
                    }
                    self.advance();
                    declared = Some(self.expect(TokenTag::Str)?.literal.to_owned());
                }
                TokenTag::Body => {
                    if body.is_some() {
                        return Err(self.err(ParseErrorKind::DuplicateProperty {
                            property: "body",
                        }));
                    }
                    self.advance();
                    body = Some(self.expect(TokenTag::Str)?.literal.to_owned());
                }
                TokenTag::Color => {
                    if color.is_some() {
                        return Err(self.err(ParseErrorKind::DuplicateProperty {
                            property: "color",
                        }));
                    }
                    self.advance();
                    color = Some(self.parse_color()?);
                }
                TokenTag::Position => {
                    if position.is_some() {
                        return Err(self.err(ParseErrorKind::DuplicateProperty {
                            property: "position",
                        }));
                    }
                    self.advance();
                    position = Some(self.parse_vector()?);
                }
                TokenTag::TextSize => {
                    if text_size.is_some() {
                        return Err(self.err(ParseErrorKind::DuplicateProperty {
                            property: "text_size",
                        }));
                    }
                    self.advance();
                    let token = self.peek();
                    let value = self.expect_int()?;
                    let value = u16::try_from(value)
                        .ok()
                        .filter(|&v| v > 0)
                        .ok_or(ParseError::new(ParseErrorKind::InvalidTextSize, token.span))?;
                    text_size = Some(value);
                }
                TokenTag::RBrace => {
                    self.advance();
                    break;
                }
                TokenTag::Eof => {
                    return Err(self.err(ParseErrorKind::ExpectedToken { expected: "}" }))
                }
                _ => self.skip_unknown(),
            }
        }
        let position = position.ok_or(ParseError::new(
            ParseErrorKind::MissingProperty { property: "position" },
            start,
        ))?;
        let text_size = text_size.ok_or(ParseError::new(
            ParseErrorKind::MissingProperty {
                property: "text_size",
            },
            start,
        ))?;
        let stable_id = self.declare(declared.as_deref(), start)?;
        let node_id = self.tree.next_node_id();
        self.tree
            .push(Node::Text(TextNode {
                node_id,
                stable_id,
                declared_id: declared,
                body: body.unwrap_or_default(),
                color: color.unwrap_or(Color::WHITE),
                position,
                local_position: local,
                text_size,
            }))
            .map_err(|_| ParseError::new(ParseErrorKind::OutOfMemory, start))
    }

    fn parse_transform(&mut self, local: Vector) -> Result<NodeId, ParseError> {
        let start = self.expect(TokenTag::Transform)?.span;
        self.expect(TokenTag::LBrace)?;
        let mut declared: Option<String> = None;
        let mut position: Option<Vector> = None;
        let mut matrix: Option<Matrix> = None;
        let mut children: Option<Vec<NodeId>> = None;
        loop {
            match self.peek().tag {
                TokenTag::Id => {
                    if declared.is_some() {
                        return Err(
                            self.err(ParseErrorKind::DuplicateProperty { property: "id" })
                        );
                    }
                    self.advance();
                    declared = Some(self.expect(TokenTag::Str)?.literal.to_owned());
                }
                TokenTag::Position => {
                    if position.is_some() {
                        return Err(self.err(ParseErrorKind::DuplicateProperty {
                            property: "position",
                        }));
                    }
                    self.advance();
                    position = Some(self.parse_vector()?);
                }
                TokenTag::Matrix => {
                    if matrix.is_some() {
                        return Err(self.err(ParseErrorKind::DuplicateProperty {
                            property: "matrix",
                        }));
                    }
                    self.advance();
                    matrix = Some(self.parse_matrix()?);
                }
                TokenTag::Nodes => {
                    if children.is_some() {
                        return Err(self.err(ParseErrorKind::DuplicateProperty {
                            property: "nodes",
                        }));
                    }
                    let span = self.advance().span;
                    let Some(origin) = position else {
                        return Err(ParseError::new(ParseErrorKind::InvalidPosition, span));
                    };
                    children = Some(self.parse_node_list(local + origin)?);
                }
                TokenTag::RBrace => {
                    self.advance();
                    break;
                }
                TokenTag::Eof => {
                    return Err(self.err(ParseErrorKind::ExpectedToken { expected: "}" }))
                }
                _ => self.skip_unknown(),
            }
        }
        let position = position.ok_or(ParseError::new(
            ParseErrorKind::MissingProperty { property: "position" },
            start,
        ))?;
        let stable_id = self.declare(declared.as_deref(), start)?;
        let node_id = self.tree.next_node_id();
        self.tree
            .push(Node::Transform(TransformNode {
                node_id,
                stable_id,
                declared_id: declared,
                position,
                local_position: local,
                matrix,
                children: Children::from_slice(&children.unwrap_or_default()),
            }))
            .map_err(|_| ParseError::new(ParseErrorKind::OutOfMemory, start))
    }

    // Tuples

    fn parse_vector(&mut self) -> Result<Vector, ParseError> {
        self.expect(TokenTag::LParen)?;
        let x = self.expect_int()?;
        self.expect(TokenTag::Comma)?;
        let y = self.expect_int()?;
        self.expect(TokenTag::RParen)?;
        Ok(Vector::new(x, y))
    }

    fn parse_color(&mut self) -> Result<Color, ParseError> {
        self.expect(TokenTag::LParen)?;
        let mut channels = [0u8; 4];
        for (i, channel) in channels.iter_mut().enumerate() {
            if i > 0 {
                self.expect(TokenTag::Comma)?;
            }
            let span = self.peek().span;
            let value = self.expect_int()?;
            *channel = u8::try_from(value)
                .map_err(|_| ParseError::new(ParseErrorKind::ExpectedColor, span))?;
        }
        self.expect(TokenTag::RParen)?;
        Ok(Color::new(channels[0], channels[1], channels[2], channels[3]))
    }

    /// Exactly six comma-separated numbers; a trailing comma before `)` is
    /// tolerated.
    fn parse_matrix(&mut self) -> Result<Matrix, ParseError> {
        let open = self.expect(TokenTag::LParen)?.span;
        let mut values = [0.0f32; 6];
        let mut count = 0usize;
        loop {
            if self.check(TokenTag::RParen) {
                self.advance();
                break;
            }
            if count == 6 {
                return Err(self.err(ParseErrorKind::InvalidMatrix));
            }
            values[count] = self.expect_number()?;
            count += 1;
            if self.check(TokenTag::Comma) {
                self.advance();
            } else if !self.check(TokenTag::RParen) {
                return Err(self.err(ParseErrorKind::InvalidMatrix));
            }
        }
        if count != 6 {
            return Err(ParseError::new(ParseErrorKind::InvalidMatrix, open));
        }
        Ok(Matrix::new(
            values[0], values[1], values[2], values[3], values[4], values[5],
        ))
    }

    fn expect_int(&mut self) -> Result<i32, ParseError> {
        let token = self.peek();
        if token.tag != TokenTag::Int {
            return Err(self.err(ParseErrorKind::ExpectedNumber));
        }
        self.advance();
        token
            .literal
            .parse::<i32>()
            .map_err(|_| ParseError::new(ParseErrorKind::InvalidNumber, token.span))
    }

    fn expect_number(&mut self) -> Result<f32, ParseError> {
        let token = self.peek();
        match token.tag {
            TokenTag::Int | TokenTag::Float => {
                self.advance();
                token
                    .literal
                    .parse::<f32>()
                    .map_err(|_| ParseError::new(ParseErrorKind::InvalidNumber, token.span))
            }
            _ => Err(self.err(ParseErrorKind::InvalidMatrix)),
        }
    }

    // Declared-id bookkeeping

    fn declare(&mut self, declared: Option<&str>, span: Span) -> Result<StableId, ParseError> {
        let Some(id) = declared else {
            return Ok(StableId::NONE);
        };
        if let Some(scope) = self.id_scopes.last_mut() {
            if !scope.insert(id.to_owned()) {
                return Err(ParseError::new(
                    ParseErrorKind::DuplicateId { id: id.to_owned() },
                    span,
                ));
            }
        }
        Ok(StableId::from_declared(id))
    }

    // Recovery

    /// Skip one unknown token, and its balanced body if one follows.
    fn skip_unknown(&mut self) {
        let token = self.advance();
        log::warn!(
            target: "swen_markup",
            "skipping unknown token '{}' at {}:{}",
            token.literal,
            token.span.line,
            token.span.column
        );
        if matches!(
            self.peek().tag,
            TokenTag::LBrace | TokenTag::LBracket | TokenTag::LParen
        ) {
            self.skip_balanced();
        }
    }

    fn skip_balanced(&mut self) {
        let mut depth = 0usize;
        loop {
            let token = self.advance();
            match token.tag {
                TokenTag::LBrace | TokenTag::LBracket | TokenTag::LParen => depth += 1,
                TokenTag::RBrace | TokenTag::RBracket | TokenTag::RParen => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                TokenTag::Eof => return,
                _ => {}
            }
        }
    }
}
