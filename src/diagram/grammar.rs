//! Parser for the flowchart and sequence dialects of the diagram mini-language.
//!
//! The grammar is line oriented. The first meaningful line names the dialect,
//! every following line is one statement. `%%` starts a comment.

use super::DiagramError;
use eframe::egui::Color32;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Diagram {
    Flowchart(Flowchart),
    Sequence(Sequence),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    TopDown,
    BottomUp,
    LeftRight,
    RightLeft,
}

impl Direction {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "TD" | "TB" => Some(Self::TopDown),
            "BT" => Some(Self::BottomUp),
            "LR" => Some(Self::LeftRight),
            "RL" => Some(Self::RightLeft),
            _ => None,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::LeftRight | Self::RightLeft)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    Rect,
    Round,
    Stadium,
    Cylinder,
    Circle,
    Diamond,
    Subroutine,
    Asymmetric,
}

/// Partial style declared by `classDef` or `style`. Unset fields inherit.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StyleProps {
    pub fill: Option<Color32>,
    pub stroke: Option<Color32>,
    pub text: Option<Color32>,
    pub stroke_width: Option<f32>,
    pub dashed: Option<bool>,
}

impl StyleProps {
    /// Overlays `other` on top of `self`.
    pub fn merged(self, other: StyleProps) -> StyleProps {
        StyleProps {
            fill: other.fill.or(self.fill),
            stroke: other.stroke.or(self.stroke),
            text: other.text.or(self.text),
            stroke_width: other.stroke_width.or(self.stroke_width),
            dashed: other.dashed.or(self.dashed),
        }
    }

    fn parse(raw: &str) -> Result<Self, String> {
        let mut props = StyleProps::default();
        for declaration in raw.split(',') {
            let declaration = declaration.trim();
            if declaration.is_empty() {
                continue;
            }
            let Some((key, value)) = declaration.split_once(':') else {
                return Err(format!("expected property:value, found `{declaration}`"));
            };
            let value = value.trim();
            match key.trim() {
                "fill" => props.fill = Some(parse_css_color(value)?),
                "stroke" => props.stroke = Some(parse_css_color(value)?),
                "color" => props.text = Some(parse_css_color(value)?),
                "stroke-width" => {
                    let width = value.trim_end_matches("px");
                    props.stroke_width = Some(
                        width
                            .parse()
                            .map_err(|_| format!("invalid stroke-width `{value}`"))?,
                    );
                }
                "stroke-dasharray" => props.dashed = Some(!value.is_empty() && value != "0"),
                // Font and other presentation properties have no counterpart in the scene.
                _ => {}
            }
        }
        Ok(props)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub shape: NodeShape,
    pub classes: Vec<String>,
    pub style: StyleProps,
    /// Innermost subgraph the node was first mentioned in.
    pub subgraph: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Solid,
    Dotted,
    Thick,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
    pub line: LineKind,
    pub arrow: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Subgraph {
    pub id: String,
    pub label: String,
    pub parent: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Flowchart {
    pub direction: Direction,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub subgraphs: Vec<Subgraph>,
    pub class_defs: BTreeMap<String, StyleProps>,
}

impl Flowchart {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn subgraph_index(&self, id: &str) -> Option<usize> {
        self.subgraphs.iter().position(|subgraph| subgraph.id == id)
    }

    /// Style of a node after `classDef default`, its classes and its `style` line.
    pub fn node_style(&self, node: &Node) -> StyleProps {
        let mut style = self.class_defs.get("default").copied().unwrap_or_default();
        for class in &node.classes {
            if let Some(def) = self.class_defs.get(class) {
                style = style.merged(*def);
            }
        }
        style.merged(node.style)
    }

    fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }

    fn touch_node(&mut self, id: &str, subgraph: Option<usize>) -> &mut Node {
        let index = match self.nodes.iter().position(|node| node.id == id) {
            Some(index) => index,
            None => {
                self.nodes.push(Node {
                    id: id.to_string(),
                    label: id.to_string(),
                    shape: NodeShape::Rect,
                    classes: Vec::new(),
                    style: StyleProps::default(),
                    subgraph,
                });
                self.nodes.len() - 1
            }
        };
        &mut self.nodes[index]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub id: String,
    pub label: String,
    pub actor: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowHead {
    Filled,
    Open,
    Cross,
    Async,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotePlacement {
    LeftOf(String),
    RightOf(String),
    Over(String, Option<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SequenceStep {
    Message {
        from: String,
        to: String,
        text: String,
        dotted: bool,
        head: ArrowHead,
    },
    Note {
        placement: NotePlacement,
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sequence {
    pub title: Option<String>,
    pub autonumber: bool,
    pub participants: Vec<Participant>,
    pub steps: Vec<SequenceStep>,
}

impl Sequence {
    pub fn participant_index(&self, id: &str) -> Option<usize> {
        self.participants.iter().position(|participant| participant.id == id)
    }

    fn ensure_participant(&mut self, id: &str) {
        if self.participant_index(id).is_none() {
            self.participants.push(Participant {
                id: id.to_string(),
                label: id.to_string(),
                actor: false,
            });
        }
    }
}

/// Parses a complete diagram description.
pub fn parse(source: &str) -> Result<Diagram, DiagramError> {
    let mut lines = statements(source);
    let Some((header_line, header)) = lines.next() else {
        return Err(DiagramError::Empty);
    };

    let mut words = header.split_whitespace();
    match words.next() {
        Some("graph") | Some("flowchart") => {
            let direction = match words.next() {
                None => Direction::default(),
                Some(raw) => Direction::parse(raw).ok_or_else(|| DiagramError::Syntax {
                    line: header_line,
                    message: format!("unknown direction `{raw}`"),
                })?,
            };
            parse_flowchart(direction, lines).map(Diagram::Flowchart)
        }
        Some("sequenceDiagram") => parse_sequence(lines).map(Diagram::Sequence),
        _ => Err(DiagramError::UnknownDialect {
            header: header.to_string(),
        }),
    }
}

/// Non-empty statements with their 1-based line numbers, comments removed.
fn statements(source: &str) -> impl Iterator<Item = (usize, &str)> {
    source.lines().enumerate().filter_map(|(index, line)| {
        let line = match line.find("%%") {
            Some(at) => &line[..at],
            None => line,
        };
        let line = line.trim().trim_end_matches(';').trim_end();
        (!line.is_empty()).then_some((index + 1, line))
    })
}

fn parse_flowchart<'a>(
    direction: Direction,
    lines: impl Iterator<Item = (usize, &'a str)>,
) -> Result<Flowchart, DiagramError> {
    let mut chart = Flowchart {
        direction,
        ..Flowchart::default()
    };
    let mut open: Vec<usize> = Vec::new();

    for (line, statement) in lines {
        let syntax = |message: String| DiagramError::Syntax { line, message };
        let (keyword, rest) = split_keyword(statement);
        match keyword {
            "subgraph" => {
                let (id, label) = parse_subgraph_header(rest).map_err(syntax)?;
                chart.subgraphs.push(Subgraph {
                    id,
                    label,
                    parent: open.last().copied(),
                });
                open.push(chart.subgraphs.len() - 1);
            }
            "end" if rest.is_empty() => {
                if open.pop().is_none() {
                    return Err(syntax("`end` without an open subgraph".to_string()));
                }
            }
            "classDef" => {
                let (names, props) = split_keyword(rest);
                if names.is_empty() {
                    return Err(syntax("classDef needs a class name".to_string()));
                }
                let props = StyleProps::parse(props).map_err(syntax)?;
                for name in names.split(',') {
                    let entry = chart.class_defs.entry(name.to_string()).or_default();
                    *entry = entry.merged(props);
                }
            }
            "class" => {
                let (ids, class) = split_keyword(rest);
                if ids.is_empty() || class.is_empty() {
                    return Err(syntax("class needs node ids and a class name".to_string()));
                }
                for id in ids.split(',') {
                    let subgraph = open.last().copied();
                    chart.touch_node(id, subgraph).classes.push(class.to_string());
                }
            }
            "style" => {
                let (id, props) = split_keyword(rest);
                let props = StyleProps::parse(props).map_err(syntax)?;
                let subgraph = open.last().copied();
                let node = chart.touch_node(id, subgraph);
                node.style = node.style.merged(props);
            }
            "direction" | "linkStyle" | "click" => {}
            _ => parse_chain(&mut chart, statement, open.last().copied()).map_err(syntax)?,
        }
    }

    if let Some(&index) = open.last() {
        return Err(DiagramError::Syntax {
            line: 0,
            message: format!("subgraph `{}` is never closed", chart.subgraphs[index].id),
        });
    }

    // Links that name a subgraph point at its box, not at a node of the same name.
    let subgraph_ids: Vec<String> = chart.subgraphs.iter().map(|s| s.id.clone()).collect();
    chart.nodes.retain(|node| {
        !(subgraph_ids.contains(&node.id) && node.label == node.id && node.classes.is_empty())
    });

    Ok(chart)
}

fn split_keyword(statement: &str) -> (&str, &str) {
    match statement.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (statement, ""),
    }
}

fn parse_subgraph_header(rest: &str) -> Result<(String, String), String> {
    let mut cursor = Cursor::new(rest);
    if cursor.peek() == Some('"') {
        let label = cursor.quoted()?;
        return Ok((label.clone(), label));
    }
    let id = cursor.identifier();
    if id.is_empty() {
        return Err("subgraph needs an id".to_string());
    }
    cursor.skip_ws();
    let label = if cursor.eat("[") {
        let label = if cursor.peek() == Some('"') {
            cursor.quoted()?
        } else {
            cursor.until("]")?.trim().to_string()
        };
        if !cursor.eat("]") {
            return Err("unterminated subgraph label".to_string());
        }
        label
    } else if cursor.is_done() {
        id.to_string()
    } else {
        // `subgraph Title With Spaces` uses the whole text as id and label.
        rest.to_string()
    };
    Ok((id.to_string(), label))
}

struct NodeRef {
    id: String,
    shape: Option<(NodeShape, String)>,
    class: Option<String>,
}

struct LinkToken {
    line: LineKind,
    arrow: bool,
    label: Option<String>,
}

/// `A[x] --> B -->|label| C:::cls`
fn parse_chain(chart: &mut Flowchart, statement: &str, subgraph: Option<usize>) -> Result<(), String> {
    let mut cursor = Cursor::new(statement);
    let mut current = parse_node_ref(&mut cursor)?;
    declare(chart, &current, subgraph);

    loop {
        cursor.skip_ws();
        if cursor.is_done() {
            return Ok(());
        }
        let Some(link) = parse_link(&mut cursor)? else {
            return Err(format!("unexpected `{}`", cursor.rest()));
        };
        cursor.skip_ws();
        let next = parse_node_ref(&mut cursor)?;
        declare(chart, &next, subgraph);
        chart.edges.push(Edge {
            from: current.id.clone(),
            to: next.id.clone(),
            label: link.label,
            line: link.line,
            arrow: link.arrow,
        });
        current = next;
    }
}

fn declare(chart: &mut Flowchart, node_ref: &NodeRef, subgraph: Option<usize>) {
    let node = chart.touch_node(&node_ref.id, subgraph);
    if let Some((shape, label)) = &node_ref.shape {
        node.shape = *shape;
        node.label = label.clone();
    }
    if let Some(class) = &node_ref.class {
        if !node.classes.contains(class) {
            node.classes.push(class.clone());
        }
    }
}

const SHAPES: [(&str, &str, NodeShape); 8] = [
    ("([", "])", NodeShape::Stadium),
    ("[(", ")]", NodeShape::Cylinder),
    ("[[", "]]", NodeShape::Subroutine),
    ("((", "))", NodeShape::Circle),
    ("[", "]", NodeShape::Rect),
    ("(", ")", NodeShape::Round),
    ("{", "}", NodeShape::Diamond),
    (">", "]", NodeShape::Asymmetric),
];

fn parse_node_ref(cursor: &mut Cursor<'_>) -> Result<NodeRef, String> {
    let id = cursor.identifier().to_string();
    if id.is_empty() {
        return Err(match cursor.peek() {
            Some(ch) => format!("expected a node id, found `{ch}`"),
            None => "expected a node id".to_string(),
        });
    }

    let mut shape = None;
    for (open, close, kind) in SHAPES {
        if cursor.eat(open) {
            let label = if cursor.peek() == Some('"') {
                cursor.quoted()?
            } else {
                cursor.until(close)?.trim().to_string()
            };
            if !cursor.eat(close) {
                return Err(format!("node `{id}` is missing `{close}`"));
            }
            shape = Some((kind, normalize_label(&label)));
            break;
        }
    }

    let class = if cursor.eat(":::") {
        let class = cursor.identifier();
        if class.is_empty() {
            return Err(format!("node `{id}` has an empty class"));
        }
        Some(class.to_string())
    } else {
        None
    };

    Ok(NodeRef { id, shape, class })
}

fn parse_link(cursor: &mut Cursor<'_>) -> Result<Option<LinkToken>, String> {
    let (line, arrow) = if cursor.eat("-.") {
        cursor.skip_while(|ch| ch == '.');
        if !cursor.eat("-") {
            return Err("dotted link must end with `-`".to_string());
        }
        (LineKind::Dotted, cursor.eat(">"))
    } else if cursor.starts_with("==") {
        let count = cursor.skip_while(|ch| ch == '=');
        let arrow = cursor.eat(">");
        if !arrow && count < 3 {
            return Err("thick link needs `===` or `==>`".to_string());
        }
        (LineKind::Thick, arrow)
    } else if cursor.starts_with("--") {
        let count = cursor.skip_while(|ch| ch == '-');
        let arrow = cursor.eat(">");
        if !arrow && count < 3 {
            return Err("link needs `---` or `-->`".to_string());
        }
        (LineKind::Solid, arrow)
    } else {
        return Ok(None);
    };

    cursor.skip_ws();
    let label = if cursor.eat("|") {
        let text = cursor.until("|")?;
        cursor.eat("|");
        let text = text.trim();
        let text = text.trim_matches('"');
        (!text.is_empty()).then(|| normalize_label(text))
    } else {
        None
    };

    Ok(Some(LinkToken { line, arrow, label }))
}

fn normalize_label(raw: &str) -> String {
    raw.replace("<br/>", "\n")
        .replace("<br />", "\n")
        .replace("<br>", "\n")
}

fn parse_sequence<'a>(lines: impl Iterator<Item = (usize, &'a str)>) -> Result<Sequence, DiagramError> {
    let mut sequence = Sequence::default();

    for (line, statement) in lines {
        let syntax = |message: String| DiagramError::Syntax { line, message };
        let (keyword, rest) = split_keyword(statement);
        match keyword {
            "participant" | "actor" => {
                let (id, label) = match rest.split_once(" as ") {
                    Some((id, label)) => (id.trim(), label.trim()),
                    None => (rest, rest),
                };
                if id.is_empty() {
                    return Err(syntax(format!("{keyword} needs a name")));
                }
                match sequence.participant_index(id) {
                    Some(index) => {
                        sequence.participants[index].label = label.to_string();
                        sequence.participants[index].actor = keyword == "actor";
                    }
                    None => sequence.participants.push(Participant {
                        id: id.to_string(),
                        label: label.to_string(),
                        actor: keyword == "actor",
                    }),
                }
            }
            "title" => sequence.title = Some(rest.trim_start_matches(':').trim().to_string()),
            "autonumber" => sequence.autonumber = true,
            "activate" | "deactivate" | "loop" | "alt" | "else" | "opt" | "par" | "and"
            | "critical" | "break" | "rect" | "end" => {}
            _ if keyword.eq_ignore_ascii_case("note") => {
                let step = parse_note(rest).map_err(syntax)?;
                if let SequenceStep::Note { placement, .. } = &step {
                    match placement {
                        NotePlacement::LeftOf(id) | NotePlacement::RightOf(id) => {
                            sequence.ensure_participant(id)
                        }
                        NotePlacement::Over(first, second) => {
                            sequence.ensure_participant(first);
                            if let Some(second) = second {
                                sequence.ensure_participant(second);
                            }
                        }
                    }
                }
                sequence.steps.push(step);
            }
            _ => {
                let step = parse_message(statement).map_err(syntax)?;
                if let SequenceStep::Message { from, to, .. } = &step {
                    sequence.ensure_participant(from);
                    sequence.ensure_participant(to);
                }
                sequence.steps.push(step);
            }
        }
    }

    Ok(sequence)
}

fn parse_note(rest: &str) -> Result<SequenceStep, String> {
    let Some((target, text)) = rest.split_once(':') else {
        return Err("note needs `: text`".to_string());
    };
    let text = normalize_label(text.trim());
    let target = target.trim();

    let placement = if let Some(id) = target.strip_prefix("left of ") {
        NotePlacement::LeftOf(id.trim().to_string())
    } else if let Some(id) = target.strip_prefix("right of ") {
        NotePlacement::RightOf(id.trim().to_string())
    } else if let Some(ids) = target.strip_prefix("over ") {
        match ids.split_once(',') {
            Some((first, second)) => {
                NotePlacement::Over(first.trim().to_string(), Some(second.trim().to_string()))
            }
            None => NotePlacement::Over(ids.trim().to_string(), None),
        }
    } else {
        return Err(format!("unknown note placement `{target}`"));
    };

    Ok(SequenceStep::Note { placement, text })
}

const MESSAGE_ARROWS: [(&str, bool, ArrowHead); 8] = [
    ("-->>", true, ArrowHead::Filled),
    ("->>", false, ArrowHead::Filled),
    ("--x", true, ArrowHead::Cross),
    ("-x", false, ArrowHead::Cross),
    ("--)", true, ArrowHead::Async),
    ("-)", false, ArrowHead::Async),
    ("-->", true, ArrowHead::Open),
    ("->", false, ArrowHead::Open),
];

fn parse_message(statement: &str) -> Result<SequenceStep, String> {
    let mut cursor = Cursor::new(statement);
    let from = cursor.identifier().to_string();
    if from.is_empty() {
        return Err(format!("unrecognized statement `{statement}`"));
    }
    cursor.skip_ws();

    let Some((dotted, head)) = MESSAGE_ARROWS
        .iter()
        .find(|(arrow, _, _)| cursor.eat(arrow))
        .map(|(_, dotted, head)| (*dotted, *head))
    else {
        return Err(format!("unrecognized statement `{statement}`"));
    };

    // Activation shorthand (`->>+B`) is accepted and ignored.
    cursor.eat("+");
    cursor.eat("-");
    cursor.skip_ws();
    let to = cursor.identifier().to_string();
    if to.is_empty() {
        return Err("message needs a receiver".to_string());
    }
    cursor.skip_ws();
    let text = if cursor.eat(":") {
        normalize_label(cursor.rest().trim())
    } else if cursor.is_done() {
        String::new()
    } else {
        return Err(format!("unexpected `{}`", cursor.rest()));
    };

    Ok(SequenceStep::Message {
        from,
        to,
        text,
        dotted,
        head,
    })
}

/// Accepts `#rgb`, `#rrggbb` and a handful of named colors.
pub fn parse_css_color(raw: &str) -> Result<Color32, String> {
    let raw = raw.trim();
    if let Some(color) = crate::theme::parse_hex_color(raw) {
        return Ok(color);
    }
    if let Some(hex) = raw.strip_prefix('#') {
        if hex.len() == 3 && hex.chars().all(|ch| ch.is_ascii_hexdigit()) {
            let expanded: String = hex.chars().flat_map(|ch| [ch, ch]).collect();
            if let Some(color) = crate::theme::parse_hex_color(&format!("#{expanded}")) {
                return Ok(color);
            }
        }
    }
    match raw {
        "white" => Ok(Color32::WHITE),
        "black" => Ok(Color32::BLACK),
        "red" => Ok(Color32::from_rgb(0xFF, 0x00, 0x00)),
        "green" => Ok(Color32::from_rgb(0x00, 0x80, 0x00)),
        "blue" => Ok(Color32::from_rgb(0x00, 0x00, 0xFF)),
        "transparent" | "none" => Ok(Color32::TRANSPARENT),
        _ => Err(format!("unsupported color `{raw}`")),
    }
}

struct Cursor<'a> {
    source: &'a str,
    position: usize,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            position: 0,
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.position..]
    }

    fn is_done(&self) -> bool {
        self.position >= self.source.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn starts_with(&self, token: &str) -> bool {
        self.rest().starts_with(token)
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.starts_with(token) {
            self.position += token.len();
            true
        } else {
            false
        }
    }

    fn skip_while(&mut self, predicate: impl Fn(char) -> bool) -> usize {
        let mut count = 0;
        while let Some(ch) = self.peek() {
            if !predicate(ch) {
                break;
            }
            self.position += ch.len_utf8();
            count += 1;
        }
        count
    }

    fn skip_ws(&mut self) {
        self.skip_while(char::is_whitespace);
    }

    fn identifier(&mut self) -> &'a str {
        let start = self.position;
        self.skip_while(|ch| ch.is_alphanumeric() || ch == '_');
        &self.source[start..self.position]
    }

    /// Text up to (not including) `terminator`.
    fn until(&mut self, terminator: &str) -> Result<&'a str, String> {
        let rest = self.rest();
        match rest.find(terminator) {
            Some(at) => {
                self.position += at;
                Ok(&rest[..at])
            }
            None => Err(format!("missing `{terminator}`")),
        }
    }

    fn quoted(&mut self) -> Result<String, String> {
        if !self.eat("\"") {
            return Err("expected `\"`".to_string());
        }
        let text = self.until("\"")?;
        self.eat("\"");
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn flowchart(source: &str) -> Flowchart {
        match parse(source).expect("fixture should parse") {
            Diagram::Flowchart(chart) => chart,
            other => panic!("expected flowchart, got {other:?}"),
        }
    }

    #[test]
    fn parses_shapes_classes_and_chained_links() {
        let chart = flowchart(
            "flowchart LR\n    A[Client]:::external --> B{Valid?} -->|Pass| C[(Store)]\n    B -.-> D((Done))\n",
        );
        assert_eq!(chart.direction, Direction::LeftRight);
        let shapes: Vec<(&str, NodeShape, &str)> = chart
            .nodes
            .iter()
            .map(|node| (node.id.as_str(), node.shape, node.label.as_str()))
            .collect();
        assert_eq!(
            shapes,
            vec![
                ("A", NodeShape::Rect, "Client"),
                ("B", NodeShape::Diamond, "Valid?"),
                ("C", NodeShape::Cylinder, "Store"),
                ("D", NodeShape::Circle, "Done"),
            ]
        );
        assert_eq!(chart.node("A").map(|n| n.classes.clone()), Some(vec!["external".to_string()]));
        assert_eq!(chart.edges.len(), 3);
        assert_eq!(chart.edges[1].label.as_deref(), Some("Pass"));
        assert_eq!(chart.edges[2].line, LineKind::Dotted);
        assert!(chart.edges[2].arrow);
    }

    #[test]
    fn node_ids_may_shadow_direction_keywords() {
        let chart = flowchart("flowchart LR\n    LR[Liquidity Risk]:::primary\n    P --> LR\n");
        assert_eq!(chart.node("LR").map(|n| n.label.as_str()), Some("Liquidity Risk"));
        assert_eq!(chart.edges[0].to, "LR");
    }

    #[test]
    fn subgraphs_nest_and_links_may_target_them() {
        let chart = flowchart(
            "flowchart TB\n  subgraph Before[\"Old\"]\n    M[Monolith]\n  end\n  subgraph After\n    subgraph Inner\n      S[Service]\n    end\n  end\n  Before -.->|Migration| After\n",
        );
        let subgraphs: Vec<(&str, &str, Option<usize>)> = chart
            .subgraphs
            .iter()
            .map(|s| (s.id.as_str(), s.label.as_str(), s.parent))
            .collect();
        assert_eq!(
            subgraphs,
            vec![("Before", "Old", None), ("After", "After", None), ("Inner", "Inner", Some(1))]
        );
        assert_eq!(chart.node("S").and_then(|n| n.subgraph), Some(2));
        assert!(chart.node("Before").is_none());
        assert_eq!(chart.edges[0].from, "Before");
    }

    #[test]
    fn class_defs_and_style_statements_resolve_per_node() {
        let chart = flowchart(
            "graph TD\n  A --> B\n  classDef hot fill:#dc2626,stroke:#f87171,stroke-width:2px,color:#fff\n  class B hot\n  style B stroke-dasharray: 5 5\n",
        );
        let style = chart.node_style(chart.node("B").expect("B exists"));
        assert_eq!(style.fill, Some(Color32::from_rgb(0xDC, 0x26, 0x26)));
        assert_eq!(style.text, Some(Color32::WHITE));
        assert_eq!(style.stroke_width, Some(2.0));
        assert_eq!(style.dashed, Some(true));
        assert_eq!(chart.node_style(chart.node("A").expect("A exists")), StyleProps::default());
    }

    #[test]
    fn comments_and_ignored_statements_are_skipped() {
        let chart = flowchart(
            "graph TD\n  %% a comment\n  A --> B %% trailing\n  linkStyle 0 stroke:#fff\n  click A callback\n",
        );
        assert_eq!(chart.edges.len(), 1);
        assert_eq!(chart.nodes.len(), 2);
    }

    #[test]
    fn sequence_messages_notes_and_aliases() {
        let source = "sequenceDiagram\n    autonumber\n    participant C as Client\n    C->>G: NewOrderSingle (35=D)\n    G-->>C: ExecutionReport\n    Note over G,C: Journaled\n    loop Every tick\n    G-)C: heartbeat\n    end\n";
        let Diagram::Sequence(sequence) = parse(source).expect("fixture should parse") else {
            panic!("expected a sequence diagram");
        };
        assert!(sequence.autonumber);
        let names: Vec<(&str, &str)> = sequence
            .participants
            .iter()
            .map(|p| (p.id.as_str(), p.label.as_str()))
            .collect();
        assert_eq!(names, vec![("C", "Client"), ("G", "G")]);
        assert_eq!(sequence.steps.len(), 4);
        assert_eq!(
            sequence.steps[1],
            SequenceStep::Message {
                from: "G".to_string(),
                to: "C".to_string(),
                text: "ExecutionReport".to_string(),
                dotted: true,
                head: ArrowHead::Filled,
            }
        );
        assert!(matches!(
            &sequence.steps[2],
            SequenceStep::Note { placement: NotePlacement::Over(a, Some(b)), .. } if a == "G" && b == "C"
        ));
    }

    #[test]
    fn errors_name_the_offending_line() {
        assert!(matches!(
            parse("not a valid graph"),
            Err(DiagramError::UnknownDialect { .. })
        ));
        assert!(matches!(parse("  \n %% only a comment"), Err(DiagramError::Empty)));
        assert!(matches!(
            parse("graph TD\n  A --> B\n  A -> B\n"),
            Err(DiagramError::Syntax { line: 3, .. })
        ));
        assert!(matches!(
            parse("graph TD\n  subgraph S\n  A\n"),
            Err(DiagramError::Syntax { .. })
        ));
        assert!(matches!(
            parse("sequenceDiagram\n  A => B: hi\n"),
            Err(DiagramError::Syntax { line: 2, .. })
        ));
    }
}
