use lineage_kg::{DetailField, DetailKind, PropertyQuery};
use lineage_types::{Direction, Edge, NodeId, RelationKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Which relationship tree a server explores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainKind {
    Family,
    Language,
    Species,
}

impl DomainKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Family => "family",
            Self::Language => "language",
            Self::Species => "species",
        }
    }

    pub fn adapter(&self) -> DomainAdapter {
        match self {
            Self::Family => DomainAdapter::family(),
            Self::Language => DomainAdapter::language(),
            Self::Species => DomainAdapter::species(),
        }
    }
}

impl fmt::Display for DomainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DomainKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "family" | "person" => Ok(Self::Family),
            "language" | "languages" => Ok(Self::Language),
            "species" | "taxon" => Ok(Self::Species),
            other => Err(format!("unknown domain '{}'", other)),
        }
    }
}

/// Which end of the recorded edge the expanded node sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// `(node, kind, other)`
    NodeIsSource,
    /// `(other, kind, node)`
    NodeIsTarget,
}

/// One backend property read while expanding a node in a direction
#[derive(Debug, Clone)]
pub struct RelationSpec {
    pub query: PropertyQuery,
    pub kind: RelationKind,
    pub orientation: Orientation,
    /// Whether the far end is queued for further expansion
    pub expand: bool,
}

impl RelationSpec {
    pub fn new(query: PropertyQuery, kind: RelationKind, orientation: Orientation) -> Self {
        Self {
            query,
            kind,
            orientation,
            expand: true,
        }
    }

    /// Record the edge but never walk past it
    pub fn leaf(mut self) -> Self {
        self.expand = false;
        self
    }

    pub fn edge(&self, node: &NodeId, other: &NodeId, direction: Direction) -> Edge {
        match self.orientation {
            Orientation::NodeIsSource => Edge::new(node.clone(), self.kind, other.clone(), direction),
            Orientation::NodeIsTarget => Edge::new(other.clone(), self.kind, node.clone(), direction),
        }
    }
}

/// Extra parent edges for children of a node with partners.
///
/// While expanding downward, every partner of the node that is also a parent
/// of a discovered child yields `(child, parent_kind, partner)`.
#[derive(Debug, Clone)]
pub struct CoParentRule {
    pub partner_kind: RelationKind,
    pub parent_kind: RelationKind,
    /// Parent claims read from each child
    pub parent_queries: Vec<PropertyQuery>,
}

/// Everything that differs between the family, language and species trees
#[derive(Debug, Clone)]
pub struct DomainAdapter {
    pub kind: DomainKind,
    pub up: Vec<RelationSpec>,
    pub down: Vec<RelationSpec>,
    pub details: Vec<DetailField>,
    pub co_parent: Option<CoParentRule>,
    pub depth_range: RangeInclusive<u32>,
}

impl DomainAdapter {
    /// Parents (P22 father, P25 mother) and spouses (P26) upward, children (P40) downward
    pub fn family() -> Self {
        let spouse = RelationSpec::new(
            PropertyQuery::forward("P26"),
            RelationKind::SpouseOf,
            Orientation::NodeIsSource,
        )
        .leaf();

        Self {
            kind: DomainKind::Family,
            up: vec![
                RelationSpec::new(PropertyQuery::forward("P22"), RelationKind::ChildOf, Orientation::NodeIsSource),
                RelationSpec::new(PropertyQuery::forward("P25"), RelationKind::ChildOf, Orientation::NodeIsSource),
                spouse.clone(),
            ],
            down: vec![
                RelationSpec::new(PropertyQuery::forward("P40"), RelationKind::ChildOf, Orientation::NodeIsTarget),
                spouse,
            ],
            details: vec![
                DetailField::new("birth_year", "P569", DetailKind::Year),
                DetailField::new("death_year", "P570", DetailKind::Year),
                DetailField::new("image_url", "P18", DetailKind::Image),
            ],
            co_parent: Some(CoParentRule {
                partner_kind: RelationKind::SpouseOf,
                parent_kind: RelationKind::ChildOf,
                parent_queries: vec![PropertyQuery::forward("P22"), PropertyQuery::forward("P25")],
            }),
            depth_range: 1..=5,
        }
    }

    /// Parent language family via P279 (subclass of), dialects and daughters via its reverse
    pub fn language() -> Self {
        Self {
            kind: DomainKind::Language,
            up: vec![RelationSpec::new(
                PropertyQuery::forward("P279"),
                RelationKind::MemberOf,
                Orientation::NodeIsSource,
            )],
            down: vec![RelationSpec::new(
                PropertyQuery::reverse("P279"),
                RelationKind::MemberOf,
                Orientation::NodeIsTarget,
            )],
            details: vec![
                DetailField::new("iso_code", "P220", DetailKind::Text),
                DetailField::new("speakers", "P1098", DetailKind::Quantity),
                DetailField::new("image_url", "P1846", DetailKind::Image),
            ],
            co_parent: None,
            depth_range: 1..=6,
        }
    }

    /// Parent taxon via P171, child taxa via its reverse
    pub fn species() -> Self {
        Self {
            kind: DomainKind::Species,
            up: vec![RelationSpec::new(
                PropertyQuery::forward("P171"),
                RelationKind::MemberOf,
                Orientation::NodeIsSource,
            )],
            down: vec![RelationSpec::new(
                PropertyQuery::reverse("P171"),
                RelationKind::MemberOf,
                Orientation::NodeIsTarget,
            )],
            details: vec![
                DetailField::new("taxon_name", "P225", DetailKind::Text),
                DetailField::new("image_url", "P18", DetailKind::Image),
            ],
            co_parent: None,
            depth_range: 1..=6,
        }
    }

    pub fn specs(&self, direction: Direction) -> &[RelationSpec] {
        match direction {
            Direction::Up => &self.up,
            Direction::Down => &self.down,
        }
    }

    pub fn queries(&self, direction: Direction) -> Vec<PropertyQuery> {
        self.specs(direction).iter().map(|spec| spec.query.clone()).collect()
    }

    /// Wire name of the node-details message (`person_details`, ...)
    pub fn details_event(&self) -> &'static str {
        match self.kind {
            DomainKind::Family => "person_details",
            DomainKind::Language => "language_details",
            DomainKind::Species => "species_details",
        }
    }

    pub fn accepts_depth(&self, depth: u32) -> bool {
        self.depth_range.contains(&depth)
    }

    pub fn with_depth_range(mut self, range: RangeInclusive<u32>) -> Self {
        self.depth_range = range;
        self
    }
}
