//! Layout configuration.
//!
//! Every field has a default, so an empty JSON object (or a missing `config` key in the input)
//! yields a usable configuration.

use selkie_layered::{GraphLabel, RankDir};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(alias = "TD")]
    TB,
    BT,
    LR,
    RL,
}

impl Direction {
    pub fn rank_dir(self) -> RankDir {
        match self {
            Direction::TB => RankDir::TB,
            Direction::BT => RankDir::BT,
            Direction::LR => RankDir::LR,
            Direction::RL => RankDir::RL,
        }
    }

    pub fn from_rank_dir(dir: RankDir) -> Self {
        match dir {
            RankDir::TB => Direction::TB,
            RankDir::BT => Direction::BT,
            RankDir::LR => Direction::LR,
            RankDir::RL => Direction::RL,
        }
    }

    /// Direction used for a collapsed cluster that does not request one: top-to-bottom
    /// parents get left-to-right clusters, everything else goes top-to-bottom.
    pub fn toggled(self) -> Self {
        match self {
            Direction::TB => Direction::LR,
            _ => Direction::TB,
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TB" | "TD" => Ok(Direction::TB),
            "BT" => Ok(Direction::BT),
            "LR" => Ok(Direction::LR),
            "RL" => Ok(Direction::RL),
            other => Err(Error::InvalidConfig {
                message: format!("unknown direction `{other}` (expected TB, BT, LR or RL)"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleMargin {
    pub top: f64,
    pub bottom: f64,
}

impl TitleMargin {
    pub fn total(&self) -> f64 {
        self.top + self.bottom
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub direction: Direction,
    pub node_spacing: f64,
    pub rank_spacing: f64,
    pub margin_x: f64,
    pub margin_y: f64,
    pub cluster_padding: f64,
    /// Added to the parent's rank spacing for every level of collapsed cluster.
    pub cluster_rank_spacing_increment: f64,
    pub sub_graph_title_margin: TitleMargin,
    /// Maximum nesting of collapsed clusters, and the bound on representative hoisting passes.
    pub max_depth: usize,
    pub font_size: f64,
    pub node_padding: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            direction: Direction::TB,
            node_spacing: 50.0,
            rank_spacing: 50.0,
            margin_x: 8.0,
            margin_y: 8.0,
            cluster_padding: 8.0,
            cluster_rank_spacing_increment: 25.0,
            sub_graph_title_margin: TitleMargin::default(),
            max_depth: 10,
            font_size: 16.0,
            node_padding: 15.0,
        }
    }
}

impl LayoutConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the layout cannot work with (negative or non-finite spacing, zero depth).
    pub fn validate(&self) -> Result<()> {
        let spacing = [
            ("nodeSpacing", self.node_spacing),
            ("rankSpacing", self.rank_spacing),
            ("marginX", self.margin_x),
            ("marginY", self.margin_y),
            ("clusterPadding", self.cluster_padding),
            ("clusterRankSpacingIncrement", self.cluster_rank_spacing_increment),
            ("subGraphTitleMargin.top", self.sub_graph_title_margin.top),
            ("subGraphTitleMargin.bottom", self.sub_graph_title_margin.bottom),
            ("nodePadding", self.node_padding),
        ];
        for (name, value) in spacing {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig {
                    message: format!("`{name}` must be a finite, non-negative number (got {value})"),
                });
            }
        }
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(Error::InvalidConfig {
                message: format!("`fontSize` must be positive (got {})", self.font_size),
            });
        }
        if self.max_depth == 0 {
            return Err(Error::InvalidConfig {
                message: "`maxDepth` must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Graph label for the top-level graph.
    pub fn graph_label(&self) -> GraphLabel {
        self.graph_label_for(self.direction)
    }

    /// Graph label for a collapsed cluster's sub-graph. Spacing is overridden again right
    /// before the sub-graph is laid out, relative to its parent.
    pub fn graph_label_for(&self, direction: Direction) -> GraphLabel {
        GraphLabel {
            rankdir: direction.rank_dir(),
            nodesep: self.node_spacing,
            ranksep: self.rank_spacing,
            marginx: self.margin_x,
            marginy: self.margin_y,
            cluster_padding: self.cluster_padding,
            ..Default::default()
        }
    }
}
