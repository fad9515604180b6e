//! Turns a parsed diagram into a [`Scene`].
//!
//! Flowcharts use a compound layered layout: every subgraph is laid out on
//! its own and then treated as a single box by its parent, so cluster boxes
//! never overlap. Within one level, layers come from the longest path over
//! the graph with back edges removed, and layer order from barycenter sweeps.

use super::grammar::{
    ArrowHead, Diagram, Direction, Flowchart, LineKind, Node, NodeShape, NotePlacement,
    Sequence, SequenceStep, StyleProps,
};
use super::scene::{
    text_height, text_width, ClusterBox, EdgePath, NodeBox, NoteBox, ResolvedStyle, Scene,
    TextMark, LINE_HEIGHT,
};
use eframe::egui::{pos2, vec2, Pos2, Rect, Vec2};
use std::collections::{HashMap, VecDeque};

const MARGIN: f32 = 8.0;
const RANK_GAP: f32 = 56.0;
const CROSS_GAP: f32 = 28.0;
const CLUSTER_PADDING: f32 = 16.0;
const CLUSTER_LABEL_BAND: f32 = 24.0;
const ORDER_SWEEPS: usize = 4;
const BACK_EDGE_BOW: f32 = 48.0;

const SEQ_BOX_HEIGHT: f32 = 40.0;
const SEQ_BOX_MIN_WIDTH: f32 = 96.0;
const SEQ_COLUMN_GAP: f32 = 48.0;
const SEQ_SELF_LOOP: f32 = 36.0;
const NOTE_PADDING: f32 = 10.0;
const NOTE_OFFSET: f32 = 12.0;

pub fn layout(diagram: &Diagram) -> Scene {
    match diagram {
        Diagram::Flowchart(chart) => FlowLayout::new(chart).run(),
        Diagram::Sequence(sequence) => layout_sequence(sequence),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Item {
    Node(usize),
    Cluster(usize),
}

#[derive(Debug, Clone, Copy)]
enum Endpoint {
    Node(usize),
    Cluster(usize),
}

struct Block {
    size: Vec2,
    members: Vec<Member>,
}

struct Member {
    item: Item,
    offset: Vec2,
    size: Vec2,
    inner: Option<Block>,
}

struct FlowLayout<'a> {
    chart: &'a Flowchart,
    node_sizes: Vec<Vec2>,
    cluster_chains: Vec<Vec<usize>>,
    cluster_keys: Vec<usize>,
    links: Vec<(Endpoint, Endpoint, usize)>,
}

impl<'a> FlowLayout<'a> {
    fn new(chart: &'a Flowchart) -> Self {
        let cluster_chains: Vec<Vec<usize>> = (0..chart.subgraphs.len())
            .map(|index| {
                let mut chain = vec![index];
                let mut parent = chart.subgraphs[index].parent;
                while let Some(next) = parent {
                    chain.push(next);
                    parent = chart.subgraphs[next].parent;
                }
                chain.reverse();
                chain
            })
            .collect();

        // Clusters sort among their siblings by their earliest member node.
        let cluster_keys = (0..chart.subgraphs.len())
            .map(|cluster| {
                chart
                    .nodes
                    .iter()
                    .position(|node| {
                        node.subgraph
                            .is_some_and(|inner| cluster_chains[inner].contains(&cluster))
                    })
                    .unwrap_or(chart.nodes.len() + cluster)
            })
            .collect();

        let by_id: HashMap<&str, usize> = chart
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.as_str(), index))
            .collect();
        let resolve = |id: &str| {
            by_id
                .get(id)
                .map(|&index| Endpoint::Node(index))
                .or_else(|| chart.subgraph_index(id).map(Endpoint::Cluster))
        };
        let links = chart
            .edges
            .iter()
            .enumerate()
            .filter_map(|(index, edge)| Some((resolve(&edge.from)?, resolve(&edge.to)?, index)))
            .collect();

        Self {
            chart,
            node_sizes: chart.nodes.iter().map(node_size).collect(),
            cluster_chains,
            cluster_keys,
            links,
        }
    }

    fn run(self) -> Scene {
        let root = self.layout_level(None);
        let mut node_rects = vec![None; self.chart.nodes.len()];
        let mut cluster_rects = vec![None; self.chart.subgraphs.len()];
        let mut scene = Scene::default();
        self.place(&root, vec2(MARGIN, MARGIN), &mut scene, &mut node_rects, &mut cluster_rects);

        for (index, node) in self.chart.nodes.iter().enumerate() {
            if let Some(rect) = node_rects[index] {
                scene.nodes.push(NodeBox {
                    rect,
                    label: node.label.clone(),
                    shape: node.shape,
                    style: resolve_style(self.chart.node_style(node)),
                });
            }
        }

        for &(from, to, index) in &self.links {
            let edge = &self.chart.edges[index];
            let (Some(source), Some(target)) = (
                anchor(self.chart, from, &node_rects, &cluster_rects),
                anchor(self.chart, to, &node_rects, &cluster_rects),
            ) else {
                continue;
            };
            let points = route(self.chart.direction, source, target);
            let path = EdgePath {
                points,
                label: None,
                line: edge.line,
                head: edge.arrow.then_some(ArrowHead::Filled),
            };
            let label = edge.label.as_ref().map(|text| TextMark {
                pos: path.midpoint(),
                text: text.clone(),
            });
            scene.edges.push(EdgePath { label, ..path });
        }

        scene.size = root.size + vec2(2.0 * MARGIN, 2.0 * MARGIN);
        scene
    }

    fn endpoint_chain(&self, endpoint: Endpoint) -> &[usize] {
        match endpoint {
            Endpoint::Node(node) => match self.chart.nodes[node].subgraph {
                Some(cluster) => self.cluster_chains[cluster].as_slice(),
                None => &[],
            },
            Endpoint::Cluster(cluster) => self.cluster_chains[cluster].as_slice(),
        }
    }

    /// The box that stands for `endpoint` among the children of `level`.
    fn item_at(&self, level: Option<usize>, endpoint: Endpoint) -> Option<Item> {
        let chain = self.endpoint_chain(endpoint);
        let start = match level {
            None => 0,
            Some(parent) => chain.iter().position(|&cluster| cluster == parent)? + 1,
        };
        match (chain.get(start), endpoint) {
            (Some(&cluster), _) => Some(Item::Cluster(cluster)),
            (None, Endpoint::Node(node)) => Some(Item::Node(node)),
            (None, Endpoint::Cluster(_)) => None,
        }
    }

    fn level_items(&self, level: Option<usize>) -> Vec<Item> {
        let mut keyed: Vec<(usize, Item)> = self
            .chart
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.subgraph == level)
            .map(|(index, _)| (index, Item::Node(index)))
            .collect();
        keyed.extend(
            self.chart
                .subgraphs
                .iter()
                .enumerate()
                .filter(|(_, subgraph)| subgraph.parent == level)
                .map(|(index, _)| (self.cluster_keys[index], Item::Cluster(index))),
        );
        keyed.sort_by_key(|(key, _)| *key);
        keyed.into_iter().map(|(_, item)| item).collect()
    }

    fn layout_level(&self, level: Option<usize>) -> Block {
        let mut members: Vec<Member> = self
            .level_items(level)
            .into_iter()
            .map(|item| match item {
                Item::Node(node) => Member {
                    item,
                    offset: Vec2::ZERO,
                    size: self.node_sizes[node],
                    inner: None,
                },
                Item::Cluster(cluster) => {
                    let inner = self.layout_level(Some(cluster));
                    let label_width = text_width(&self.chart.subgraphs[cluster].label);
                    let size = vec2(
                        (inner.size.x + 2.0 * CLUSTER_PADDING)
                            .max(label_width + 2.0 * CLUSTER_PADDING),
                        inner.size.y + 2.0 * CLUSTER_PADDING + CLUSTER_LABEL_BAND,
                    );
                    Member {
                        item,
                        offset: Vec2::ZERO,
                        size,
                        inner: Some(inner),
                    }
                }
            })
            .collect();

        let index: HashMap<Item, usize> = members
            .iter()
            .enumerate()
            .map(|(position, member)| (member.item, position))
            .collect();

        let mut edges: Vec<(usize, usize)> = Vec::new();
        let mut widest_label: f32 = 0.0;
        for &(from, to, edge_index) in &self.links {
            let (Some(a), Some(b)) = (self.item_at(level, from), self.item_at(level, to)) else {
                continue;
            };
            let (Some(&a), Some(&b)) = (index.get(&a), index.get(&b)) else {
                continue;
            };
            if a == b {
                continue;
            }
            if !edges.contains(&(a, b)) {
                edges.push((a, b));
            }
            if let Some(label) = &self.chart.edges[edge_index].label {
                widest_label = widest_label.max(text_width(label));
            }
        }

        let direction = self.chart.direction;
        let rank_gap = if direction.is_horizontal() {
            RANK_GAP.max(widest_label + 32.0)
        } else {
            RANK_GAP
        };
        let sizes: Vec<Vec2> = members.iter().map(|member| member.size).collect();
        let (offsets, size) = arrange(&sizes, &edges, direction, rank_gap);
        for (member, offset) in members.iter_mut().zip(offsets) {
            member.offset = offset;
        }

        Block { size, members }
    }

    fn place(
        &self,
        block: &Block,
        origin: Vec2,
        scene: &mut Scene,
        node_rects: &mut [Option<Rect>],
        cluster_rects: &mut [Option<Rect>],
    ) {
        for member in &block.members {
            let min = origin + member.offset;
            let rect = Rect::from_min_size(min.to_pos2(), member.size);
            match member.item {
                Item::Node(node) => node_rects[node] = Some(rect),
                Item::Cluster(cluster) => {
                    cluster_rects[cluster] = Some(rect);
                    scene.clusters.push(ClusterBox {
                        rect,
                        label: self.chart.subgraphs[cluster].label.clone(),
                    });
                    if let Some(inner) = &member.inner {
                        let inner_origin =
                            min + vec2(CLUSTER_PADDING, CLUSTER_PADDING + CLUSTER_LABEL_BAND);
                        self.place(inner, inner_origin, scene, node_rects, cluster_rects);
                    }
                }
            }
        }
    }
}

/// Places boxes of the given sizes in layers; returns top-left offsets and the total size.
fn arrange(
    sizes: &[Vec2],
    edges: &[(usize, usize)],
    direction: Direction,
    rank_gap: f32,
) -> (Vec<Vec2>, Vec2) {
    let count = sizes.len();
    if count == 0 {
        return (Vec::new(), Vec2::ZERO);
    }
    let horizontal = direction.is_horizontal();
    let cross_extent = |item: usize| if horizontal { sizes[item].y } else { sizes[item].x };
    let rank_extent = |item: usize| if horizontal { sizes[item].x } else { sizes[item].y };

    let forward = acyclic_edges(count, edges);
    let layer_of = longest_path_layers(count, &forward);
    let layer_count = layer_of.iter().copied().max().unwrap_or(0) + 1;
    let mut layers: Vec<Vec<usize>> = vec![Vec::new(); layer_count];
    for item in 0..count {
        layers[layer_of[item]].push(item);
    }
    order_layers(&mut layers, &forward, count);

    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); count];
    for &(from, to) in &forward {
        predecessors[to].push(from);
    }

    // Each item aims for the mean cross position of its predecessors.
    let mut centers = vec![0.0_f32; count];
    for members in &layers {
        let desired: Vec<Option<f32>> = members
            .iter()
            .map(|&item| {
                let preds = &predecessors[item];
                (!preds.is_empty())
                    .then(|| preds.iter().map(|&pred| centers[pred]).sum::<f32>() / preds.len() as f32)
            })
            .collect();

        let mut placed = Vec::with_capacity(members.len());
        let mut previous_edge: Option<f32> = None;
        for (slot, &item) in members.iter().enumerate() {
            let half = cross_extent(item) / 2.0;
            let earliest = previous_edge.map(|edge| edge + CROSS_GAP + half);
            let wanted = desired[slot].unwrap_or_else(|| earliest.unwrap_or(half));
            let center = earliest.map_or(wanted, |earliest| wanted.max(earliest));
            placed.push(center);
            previous_edge = Some(center + half);
        }

        let drift: Vec<f32> = desired
            .iter()
            .zip(&placed)
            .filter_map(|(want, got)| want.map(|want| want - got))
            .collect();
        let shift = if drift.is_empty() {
            0.0
        } else {
            drift.iter().sum::<f32>() / drift.len() as f32
        };
        for (&item, center) in members.iter().zip(placed) {
            centers[item] = center + shift;
        }
    }

    let cross_min = (0..count)
        .map(|item| centers[item] - cross_extent(item) / 2.0)
        .fold(f32::INFINITY, f32::min);
    let cross_max = (0..count)
        .map(|item| centers[item] + cross_extent(item) / 2.0)
        .fold(f32::NEG_INFINITY, f32::max);
    let total_cross = cross_max - cross_min;

    let thickness: Vec<f32> = layers
        .iter()
        .map(|members| members.iter().map(|&item| rank_extent(item)).fold(0.0, f32::max))
        .collect();
    let mut layer_start = Vec::with_capacity(layer_count);
    let mut cursor = 0.0;
    for &thick in &thickness {
        layer_start.push(cursor);
        cursor += thick + rank_gap;
    }
    let total_rank = cursor - rank_gap;

    let reversed = matches!(direction, Direction::BottomUp | Direction::RightLeft);
    let offsets = (0..count)
        .map(|item| {
            let layer = layer_of[item];
            let mut rank = layer_start[layer] + (thickness[layer] - rank_extent(item)) / 2.0;
            if reversed {
                rank = total_rank - rank - rank_extent(item);
            }
            let cross = centers[item] - cross_extent(item) / 2.0 - cross_min;
            if horizontal {
                vec2(rank, cross)
            } else {
                vec2(cross, rank)
            }
        })
        .collect();

    let size = if horizontal {
        vec2(total_rank, total_cross)
    } else {
        vec2(total_cross, total_rank)
    };
    (offsets, size)
}

/// Drops edges that close a cycle in depth-first order.
fn acyclic_edges(count: usize, edges: &[(usize, usize)]) -> Vec<(usize, usize)> {
    fn visit(
        item: usize,
        adjacency: &[Vec<usize>],
        state: &mut [u8],
        back: &mut Vec<(usize, usize)>,
    ) {
        state[item] = 1;
        for &next in &adjacency[item] {
            match state[next] {
                0 => visit(next, adjacency, state, back),
                1 => back.push((item, next)),
                _ => {}
            }
        }
        state[item] = 2;
    }

    let mut adjacency = vec![Vec::new(); count];
    for &(from, to) in edges {
        adjacency[from].push(to);
    }
    let mut state = vec![0_u8; count];
    let mut back = Vec::new();
    for root in 0..count {
        if state[root] == 0 {
            visit(root, &adjacency, &mut state, &mut back);
        }
    }
    edges
        .iter()
        .copied()
        .filter(|edge| edge.0 != edge.1 && !back.contains(edge))
        .collect()
}

fn longest_path_layers(count: usize, forward: &[(usize, usize)]) -> Vec<usize> {
    let mut indegree = vec![0_usize; count];
    for &(_, to) in forward {
        indegree[to] += 1;
    }
    let mut queue: VecDeque<usize> = (0..count).filter(|&item| indegree[item] == 0).collect();
    let mut layer = vec![0_usize; count];
    while let Some(item) = queue.pop_front() {
        for &(from, to) in forward.iter().filter(|(from, _)| *from == item) {
            layer[to] = layer[to].max(layer[from] + 1);
            indegree[to] -= 1;
            if indegree[to] == 0 {
                queue.push_back(to);
            }
        }
    }
    layer
}

fn order_layers(layers: &mut [Vec<usize>], forward: &[(usize, usize)], count: usize) {
    let mut position = vec![0.0_f32; count];
    for members in layers.iter() {
        for (slot, &item) in members.iter().enumerate() {
            position[item] = slot as f32;
        }
    }

    for sweep in 0..ORDER_SWEEPS {
        let downward = sweep % 2 == 0;
        let sequence: Vec<usize> = if downward {
            (1..layers.len()).collect()
        } else {
            (0..layers.len().saturating_sub(1)).rev().collect()
        };
        for layer in sequence {
            let mut keyed: Vec<(f32, usize)> = layers[layer]
                .iter()
                .map(|&item| {
                    let neighbours: Vec<f32> = forward
                        .iter()
                        .filter_map(|&(from, to)| match downward {
                            true if to == item => Some(position[from]),
                            false if from == item => Some(position[to]),
                            _ => None,
                        })
                        .collect();
                    let key = if neighbours.is_empty() {
                        position[item]
                    } else {
                        neighbours.iter().sum::<f32>() / neighbours.len() as f32
                    };
                    (key, item)
                })
                .collect();
            keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
            layers[layer] = keyed.into_iter().map(|(_, item)| item).collect();
            for (slot, &item) in layers[layer].iter().enumerate() {
                position[item] = slot as f32;
            }
        }
    }
}

fn node_size(node: &Node) -> Vec2 {
    let text = vec2(text_width(&node.label), text_height(&node.label));
    match node.shape {
        NodeShape::Rect | NodeShape::Round | NodeShape::Asymmetric => {
            vec2(text.x + 32.0, text.y + 22.0).max(vec2(64.0, 40.0))
        }
        NodeShape::Subroutine => vec2(text.x + 48.0, text.y + 22.0).max(vec2(72.0, 40.0)),
        NodeShape::Stadium => vec2(text.x + 44.0, text.y + 22.0).max(vec2(72.0, 40.0)),
        NodeShape::Cylinder => vec2(text.x + 32.0, text.y + 36.0).max(vec2(64.0, 52.0)),
        NodeShape::Circle => {
            let diameter = text.x.max(text.y) + 24.0;
            vec2(diameter, diameter)
        }
        NodeShape::Diamond => {
            let width = text.x + 56.0;
            vec2(width, (text.y + 40.0).max(width * 0.55))
        }
    }
}

fn resolve_style(props: StyleProps) -> ResolvedStyle {
    let base = ResolvedStyle::default();
    ResolvedStyle {
        fill: props.fill.unwrap_or(base.fill),
        stroke: props.stroke.unwrap_or(base.stroke),
        text: props.text.unwrap_or(base.text),
        stroke_width: props.stroke_width.unwrap_or(base.stroke_width),
        dashed: props.dashed.unwrap_or(base.dashed),
    }
}

#[derive(Debug, Clone, Copy)]
struct Anchor {
    rect: Rect,
    shape: NodeShape,
}

fn anchor(
    chart: &Flowchart,
    endpoint: Endpoint,
    node_rects: &[Option<Rect>],
    cluster_rects: &[Option<Rect>],
) -> Option<Anchor> {
    match endpoint {
        Endpoint::Node(node) => Some(Anchor {
            rect: node_rects[node]?,
            shape: chart.nodes[node].shape,
        }),
        Endpoint::Cluster(cluster) => Some(Anchor {
            rect: cluster_rects[cluster]?,
            shape: NodeShape::Rect,
        }),
    }
}

fn route(direction: Direction, source: Anchor, target: Anchor) -> Vec<Pos2> {
    let from = source.rect.center();
    let to = target.rect.center();

    if source.rect == target.rect {
        let rect = source.rect;
        let y = rect.center().y;
        return vec![
            pos2(rect.right(), y - 8.0),
            pos2(rect.right() + 24.0, y - 8.0),
            pos2(rect.right() + 24.0, y + 8.0),
            pos2(rect.right(), y + 8.0),
        ];
    }

    let backward = match direction {
        Direction::TopDown => to.y < from.y - 1.0,
        Direction::BottomUp => to.y > from.y + 1.0,
        Direction::LeftRight => to.x < from.x - 1.0,
        Direction::RightLeft => to.x > from.x + 1.0,
    };
    if backward {
        let delta = to - from;
        let normal = vec2(-delta.y, delta.x).normalized() * BACK_EDGE_BOW;
        let bend = from + delta / 2.0 + normal;
        return vec![clip(source, bend), bend, clip(target, bend)];
    }

    vec![clip(source, to), clip(target, from)]
}

/// Where the segment from the anchor's center towards `toward` leaves its outline.
fn clip(anchor: Anchor, toward: Pos2) -> Pos2 {
    let center = anchor.rect.center();
    let delta = toward - center;
    if delta.length_sq() <= f32::EPSILON {
        return center;
    }
    let half = anchor.rect.size() / 2.0;
    let scale = match anchor.shape {
        NodeShape::Circle => half.x.min(half.y) / delta.length(),
        NodeShape::Diamond => 1.0 / (delta.x.abs() / half.x + delta.y.abs() / half.y),
        _ => {
            let sx = if delta.x.abs() > f32::EPSILON { half.x / delta.x.abs() } else { f32::INFINITY };
            let sy = if delta.y.abs() > f32::EPSILON { half.y / delta.y.abs() } else { f32::INFINITY };
            sx.min(sy)
        }
    };
    center + delta * scale.min(1.0)
}

fn layout_sequence(sequence: &Sequence) -> Scene {
    let mut scene = Scene::default();
    let count = sequence.participants.len();
    if count == 0 {
        scene.size = vec2(2.0 * MARGIN, 2.0 * MARGIN);
        return scene;
    }

    let widths: Vec<f32> = sequence
        .participants
        .iter()
        .map(|participant| (text_width(&participant.label) + 28.0).max(SEQ_BOX_MIN_WIDTH))
        .collect();
    let number_width = if sequence.autonumber { 24.0 } else { 0.0 };

    // spacing[i] is the distance between the centers of columns i - 1 and i.
    let mut spacing: Vec<f32> = (0..count)
        .map(|column| match column {
            0 => 0.0,
            _ => (widths[column - 1] + widths[column]) / 2.0 + SEQ_COLUMN_GAP,
        })
        .collect();
    let mut left_extra: f32 = 0.0;
    let mut right_extra: f32 = 0.0;

    for step in &sequence.steps {
        match step {
            SequenceStep::Message { from, to, text, .. } => {
                let (Some(a), Some(b)) =
                    (sequence.participant_index(from), sequence.participant_index(to))
                else {
                    continue;
                };
                let needed = text_width(text) + number_width + 32.0;
                if a == b {
                    let reach = needed + SEQ_SELF_LOOP;
                    if a + 1 < count {
                        spacing[a + 1] = spacing[a + 1].max(reach + widths[a + 1] / 2.0);
                    } else {
                        right_extra = right_extra.max(reach - widths[a] / 2.0);
                    }
                } else {
                    let (low, high) = (a.min(b), a.max(b));
                    let current: f32 = spacing[low + 1..=high].iter().sum();
                    if current < needed {
                        let extra = (needed - current) / (high - low) as f32;
                        for gap in &mut spacing[low + 1..=high] {
                            *gap += extra;
                        }
                    }
                }
            }
            SequenceStep::Note { placement, text } => {
                let width = text_width(text) + 2.0 * NOTE_PADDING;
                match placement {
                    NotePlacement::LeftOf(id) => {
                        let Some(column) = sequence.participant_index(id) else {
                            continue;
                        };
                        if column == 0 {
                            left_extra = left_extra.max(width + NOTE_OFFSET - widths[0] / 2.0);
                        } else {
                            spacing[column] =
                                spacing[column].max(width + NOTE_OFFSET + widths[column - 1] / 2.0);
                        }
                    }
                    NotePlacement::RightOf(id) => {
                        let Some(column) = sequence.participant_index(id) else {
                            continue;
                        };
                        if column + 1 < count {
                            spacing[column + 1] = spacing[column + 1]
                                .max(width + NOTE_OFFSET + widths[column + 1] / 2.0);
                        } else {
                            right_extra = right_extra.max(width + NOTE_OFFSET - widths[column] / 2.0);
                        }
                    }
                    NotePlacement::Over(id, None) => {
                        let Some(column) = sequence.participant_index(id) else {
                            continue;
                        };
                        let overhang = (width - widths[column]) / 2.0;
                        if column == 0 {
                            left_extra = left_extra.max(overhang);
                        }
                        if column + 1 == count {
                            right_extra = right_extra.max(overhang);
                        }
                    }
                    NotePlacement::Over(_, Some(_)) => {}
                }
            }
        }
    }

    let mut centers = Vec::with_capacity(count);
    let mut x = MARGIN + left_extra.max(0.0) + widths[0] / 2.0;
    for (column, gap) in spacing.iter().enumerate() {
        if column > 0 {
            x += gap;
        }
        centers.push(x);
    }

    let top = MARGIN + if sequence.title.is_some() { 32.0 } else { 0.0 };
    for (column, participant) in sequence.participants.iter().enumerate() {
        scene.nodes.push(participant_box(
            centers[column],
            top,
            widths[column],
            &participant.label,
            participant.actor,
        ));
    }

    let mut cursor = top + SEQ_BOX_HEIGHT + 20.0;
    let mut number = 0;
    for step in &sequence.steps {
        match step {
            SequenceStep::Message {
                from,
                to,
                text,
                dotted,
                head,
            } => {
                let (Some(a), Some(b)) =
                    (sequence.participant_index(from), sequence.participant_index(to))
                else {
                    continue;
                };
                let text = if sequence.autonumber {
                    number += 1;
                    format!("{number}. {text}")
                } else {
                    text.clone()
                };
                let label_height = if text.is_empty() { 0.0 } else { text_height(&text) };
                let line_y = cursor + label_height + 8.0;
                let line = if *dotted { LineKind::Dotted } else { LineKind::Solid };

                let (points, label_pos) = if a == b {
                    let x = centers[a];
                    let loop_x = x + SEQ_SELF_LOOP;
                    cursor = line_y + 20.0 + 16.0;
                    (
                        vec![
                            pos2(x, line_y),
                            pos2(loop_x, line_y),
                            pos2(loop_x, line_y + 20.0),
                            pos2(x, line_y + 20.0),
                        ],
                        pos2(loop_x + 8.0 + text_width(&text) / 2.0, line_y + 10.0),
                    )
                } else {
                    cursor = line_y + 18.0;
                    (
                        vec![pos2(centers[a], line_y), pos2(centers[b], line_y)],
                        pos2((centers[a] + centers[b]) / 2.0, line_y - 4.0 - label_height / 2.0),
                    )
                };

                scene.edges.push(EdgePath {
                    points,
                    label: (!text.is_empty()).then(|| TextMark {
                        pos: label_pos,
                        text,
                    }),
                    line,
                    head: Some(*head),
                });
            }
            SequenceStep::Note { placement, text } => {
                let width = text_width(text) + 2.0 * NOTE_PADDING;
                let height = text_height(text) + 2.0 * NOTE_PADDING;
                let center_of = |id: &str| sequence.participant_index(id).map(|column| centers[column]);
                let span = match placement {
                    NotePlacement::LeftOf(id) => center_of(id)
                        .map(|x| (x - NOTE_OFFSET - width, x - NOTE_OFFSET)),
                    NotePlacement::RightOf(id) => center_of(id)
                        .map(|x| (x + NOTE_OFFSET, x + NOTE_OFFSET + width)),
                    NotePlacement::Over(id, None) => {
                        center_of(id).map(|x| (x - width / 2.0, x + width / 2.0))
                    }
                    NotePlacement::Over(first, Some(second)) => {
                        match (center_of(first), center_of(second)) {
                            (Some(a), Some(b)) => {
                                let (low, high) = (a.min(b) - 30.0, a.max(b) + 30.0);
                                if high - low < width {
                                    let middle = (low + high) / 2.0;
                                    Some((middle - width / 2.0, middle + width / 2.0))
                                } else {
                                    Some((low, high))
                                }
                            }
                            _ => None,
                        }
                    }
                };
                let Some((left, right)) = span else {
                    continue;
                };
                scene.notes.push(NoteBox {
                    rect: Rect::from_min_max(pos2(left, cursor), pos2(right, cursor + height)),
                    text: text.clone(),
                });
                cursor += height + 14.0;
            }
        }
    }

    let bottom = cursor + 8.0;
    for (column, participant) in sequence.participants.iter().enumerate() {
        scene
            .lifelines
            .push([pos2(centers[column], top + SEQ_BOX_HEIGHT), pos2(centers[column], bottom)]);
        scene.nodes.push(participant_box(
            centers[column],
            bottom,
            widths[column],
            &participant.label,
            participant.actor,
        ));
    }

    let mut right = centers[count - 1] + widths[count - 1] / 2.0 + right_extra.max(0.0);
    for note in &scene.notes {
        right = right.max(note.rect.right());
    }
    for edge in &scene.edges {
        for point in &edge.points {
            right = right.max(point.x);
        }
        if let Some(label) = &edge.label {
            right = right.max(label.pos.x + text_width(&label.text) / 2.0);
        }
    }
    scene.size = vec2(right + MARGIN, bottom + SEQ_BOX_HEIGHT + MARGIN);

    if let Some(title) = &sequence.title {
        scene.title = Some(TextMark {
            pos: pos2(scene.size.x / 2.0, MARGIN + LINE_HEIGHT / 2.0),
            text: title.clone(),
        });
    }
    scene
}

fn participant_box(center_x: f32, top: f32, width: f32, label: &str, actor: bool) -> NodeBox {
    NodeBox {
        rect: Rect::from_min_size(pos2(center_x - width / 2.0, top), vec2(width, SEQ_BOX_HEIGHT)),
        label: label.to_string(),
        shape: if actor { NodeShape::Stadium } else { NodeShape::Rect },
        style: ResolvedStyle::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagram::grammar::parse;

    fn scene_for(source: &str) -> Scene {
        layout(&parse(source).expect("fixture should parse"))
    }

    fn node<'s>(scene: &'s Scene, label: &str) -> &'s NodeBox {
        scene
            .nodes
            .iter()
            .find(|node| node.label == label)
            .unwrap_or_else(|| panic!("no node labelled {label}"))
    }

    #[test]
    fn top_down_chain_stacks_vertically_and_aligns() {
        let scene = scene_for("graph TD\n  A[One] --> B[Two] --> C[Three]\n");
        let (a, b, c) = (node(&scene, "One"), node(&scene, "Two"), node(&scene, "Three"));
        assert!(a.rect.bottom() < b.rect.top());
        assert!(b.rect.bottom() < c.rect.top());
        assert!((a.rect.center().x - c.rect.center().x).abs() < 0.5);
        assert!(scene.size.x >= c.rect.right() && scene.size.y >= c.rect.bottom());
    }

    #[test]
    fn left_right_and_reversed_directions() {
        let scene = scene_for("flowchart LR\n  A[One] --> B[Two]\n");
        assert!(node(&scene, "One").rect.right() < node(&scene, "Two").rect.left());

        let scene = scene_for("flowchart BT\n  A[One] --> B[Two]\n");
        assert!(node(&scene, "One").rect.top() > node(&scene, "Two").rect.bottom());
    }

    #[test]
    fn back_edges_bow_and_keep_forward_layering() {
        let scene = scene_for("graph TD\n  A[a] --> B[b] --> C[c]\n  C -->|retry| A\n");
        assert!(node(&scene, "a").rect.top() < node(&scene, "c").rect.top());
        assert_eq!(scene.edges.len(), 3);
        let back = &scene.edges[2];
        assert_eq!(back.points.len(), 3);
        assert_eq!(back.label.as_ref().map(|mark| mark.text.as_str()), Some("retry"));
    }

    #[test]
    fn edges_start_and_end_on_node_outlines() {
        let scene = scene_for("graph TD\n  A[Start] --> B{Check}\n");
        let edge = &scene.edges[0];
        let start = edge.points[0];
        let end = edge.points[edge.points.len() - 1];
        let a = node(&scene, "Start").rect;
        let b = node(&scene, "Check").rect;
        assert!((start.y - a.bottom()).abs() < 0.5);
        assert!((end.y - b.top()).abs() < 0.5);
        assert_eq!(edge.head, Some(ArrowHead::Filled));
    }

    #[test]
    fn clusters_enclose_members_and_never_overlap() {
        let scene = scene_for(
            "flowchart LR\n  subgraph P1[\"One\"]\n    A[a1] --> B[b1]\n  end\n  subgraph P2[\"Two\"]\n    C[c2]\n  end\n  X[loose] --> A\n  P1 -.-> P2\n",
        );
        assert_eq!(scene.clusters.len(), 2);
        let (one, two) = (scene.clusters[0].rect, scene.clusters[1].rect);
        for label in ["a1", "b1"] {
            assert!(one.contains_rect(node(&scene, label).rect));
        }
        assert!(two.contains_rect(node(&scene, "c2").rect));
        assert!(!one.intersects(two));
        assert!(!one.contains_rect(node(&scene, "loose").rect));
        assert!(one.right() < two.left());
        let cluster_edge = scene.edges.last().expect("cluster edge is routed");
        assert_eq!(cluster_edge.line, LineKind::Dotted);
    }

    #[test]
    fn class_styles_reach_the_scene() {
        let scene = scene_for(
            "graph TD\n  A[Hot]:::danger\n  classDef danger fill:#dc2626,stroke:#f87171,stroke-width:2px,color:#ffffff\n",
        );
        let style = node(&scene, "Hot").style;
        assert_eq!(style.fill, eframe::egui::Color32::from_rgb(0xDC, 0x26, 0x26));
        assert_eq!(style.stroke_width, 2.0);
    }

    #[test]
    fn sequence_places_columns_rows_and_mirrored_boxes() {
        let scene = scene_for(
            "sequenceDiagram\n  participant C as Client\n  participant G as Gateway\n  C->>G: order\n  G-->>C: fill\n  Note over C,G: journaled\n",
        );
        assert_eq!(scene.nodes.len(), 4);
        assert_eq!(scene.lifelines.len(), 2);
        assert!(scene.nodes[0].rect.center().x < scene.nodes[1].rect.center().x);
        assert_eq!(scene.edges.len(), 2);
        assert!(scene.edges[0].points[0].y < scene.edges[1].points[0].y);
        assert_eq!(scene.edges[1].line, LineKind::Dotted);
        let note = &scene.notes[0];
        assert!(note.rect.top() > scene.edges[1].points[0].y);
        assert!(note.rect.left() < scene.nodes[0].rect.center().x);
        assert!(note.rect.right() > scene.nodes[1].rect.center().x);
    }

    #[test]
    fn autonumber_prefixes_message_labels() {
        let scene = scene_for("sequenceDiagram\n  autonumber\n  A->>B: first\n  B->>A: second\n");
        let labels: Vec<&str> = scene
            .edges
            .iter()
            .filter_map(|edge| edge.label.as_ref().map(|mark| mark.text.as_str()))
            .collect();
        assert_eq!(labels, vec!["1. first", "2. second"]);
    }
}
