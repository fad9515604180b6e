//! Static portfolio content, authored as TOML and embedded at build time.

use crate::theme::parse_hex_color;
use serde::Deserialize;
use std::collections::BTreeSet;
use thiserror::Error;

const SITE_TOML: &str = include_str!("site.toml");
const GROUPS_TOML: &str = include_str!("groups.toml");
const CASE_STUDY_TOMLS: [(&str, &str); 4] = [
    ("dark_pool.toml", include_str!("dark_pool.toml")),
    ("var_cvar.toml", include_str!("var_cvar.toml")),
    ("monolith.toml", include_str!("monolith.toml")),
    ("openlink.toml", include_str!("openlink.toml")),
];

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to parse {document}: {source}")]
    Parse {
        document: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid content in {document}: {message}")]
    Invalid { document: String, message: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Site {
    pub owner: String,
    pub tagline: String,
    pub contact: Contact,
    pub projects: Vec<ProjectSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    pub email: String,
    pub links: Vec<SocialLink>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SocialLink {
    pub label: String,
    pub url: String,
}

impl Contact {
    pub fn mailto(&self) -> String {
        format!("mailto:{}", self.email)
    }
}

/// One external project card on the landing page.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSummary {
    pub id: String,
    pub title: String,
    pub url: String,
    pub link: String,
    pub description: String,
    pub icon: String,
    #[serde(default)]
    pub screenshot: Option<String>,
    /// Glyph for the screenshot placeholder when it should differ from `icon`.
    #[serde(default)]
    pub screenshot_icon: Option<String>,
}

impl ProjectSummary {
    pub fn fallback_icon(&self) -> &str {
        self.screenshot_icon.as_deref().unwrap_or(&self.icon)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct GroupsDocument {
    groups: Vec<ProjectGroup>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectGroup {
    pub title: String,
    pub icon: String,
    pub color: String,
    pub projects: Vec<GroupProject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupProject {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub description: String,
    #[serde(default)]
    pub case_study: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaseStudy {
    pub id: String,
    pub title: String,
    pub icon: String,
    pub subtitle: String,
    pub accent: String,
    pub tabs: Vec<CaseTab>,
}

impl CaseStudy {
    pub fn tab(&self, id: &str) -> Option<&CaseTab> {
        self.tabs.iter().find(|tab| tab.id == id)
    }

    pub fn first_tab_id(&self) -> Option<&str> {
        self.tabs.first().map(|tab| tab.id.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaseTab {
    pub id: String,
    pub label: String,
    pub cards: Vec<Card>,
}

impl CaseTab {
    pub fn diagrams(&self) -> impl Iterator<Item = &str> {
        self.cards.iter().flat_map(|card| {
            card.blocks.iter().filter_map(|block| match block {
                Block::Diagram { chart } => Some(chart.as_str()),
                _ => None,
            })
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Card {
    pub title: String,
    #[serde(default)]
    pub icon: Option<String>,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Paragraph {
        text: String,
    },
    Bullets {
        #[serde(default)]
        heading: Option<String>,
        #[serde(default)]
        color: Option<String>,
        #[serde(default)]
        marker: Option<String>,
        items: Vec<String>,
    },
    Badges {
        #[serde(default)]
        color: Option<String>,
        items: Vec<String>,
    },
    Tiles {
        tiles: Vec<Tile>,
    },
    Metrics {
        metrics: Vec<Metric>,
    },
    Role {
        role: String,
        duration: String,
    },
    /// A one-line formula, set in monospace.
    Formula {
        text: String,
    },
    Code {
        language: String,
        code: String,
    },
    Diagram {
        chart: String,
    },
    Questions {
        #[serde(default)]
        color: Option<String>,
        items: Vec<Question>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tile {
    pub title: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Metric {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Question {
    pub q: String,
    pub a: String,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    pub site: Site,
    pub groups: Vec<ProjectGroup>,
    pub case_studies: Vec<CaseStudy>,
}

impl Catalog {
    pub fn load_builtin() -> Result<Self, ContentError> {
        let site: Site = parse("site.toml", SITE_TOML)?;
        let groups: GroupsDocument = parse("groups.toml", GROUPS_TOML)?;
        let case_studies = CASE_STUDY_TOMLS
            .iter()
            .map(|(name, raw)| parse::<CaseStudy>(name, raw))
            .collect::<Result<Vec<_>, _>>()?;

        let catalog = Self {
            site,
            groups: groups.groups,
            case_studies,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn project(&self, id: &str) -> Option<&GroupProject> {
        self.groups
            .iter()
            .flat_map(|group| group.projects.iter())
            .find(|project| project.id == id)
    }

    pub fn case_study(&self, id: &str) -> Option<&CaseStudy> {
        self.case_studies.iter().find(|study| study.id == id)
    }

    pub fn case_study_for_project(&self, project_id: &str) -> Option<&CaseStudy> {
        let study_id = self.project(project_id)?.case_study.as_deref()?;
        self.case_study(study_id)
    }

    fn validate(&self) -> Result<(), ContentError> {
        let mut gallery_ids = BTreeSet::new();
        for project in &self.site.projects {
            if !gallery_ids.insert(project.id.as_str()) {
                return Err(invalid("site.toml", format!("duplicate project id {}", project.id)));
            }
        }

        let mut project_ids = BTreeSet::new();
        for group in &self.groups {
            check_color("groups.toml", &group.color)?;
            for project in &group.projects {
                check_color("groups.toml", &project.color)?;
                if !project_ids.insert(project.id.as_str()) {
                    return Err(invalid("groups.toml", format!("duplicate project id {}", project.id)));
                }
                if let Some(study_id) = &project.case_study {
                    if self.case_study(study_id).is_none() {
                        return Err(invalid(
                            "groups.toml",
                            format!("project {} references unknown case study {study_id}", project.id),
                        ));
                    }
                }
            }
        }

        let mut study_ids = BTreeSet::new();
        for study in &self.case_studies {
            if !study_ids.insert(study.id.as_str()) {
                return Err(invalid(&study.id, "duplicate case study id".to_string()));
            }
            validate_case_study(study)?;
        }
        Ok(())
    }
}

fn validate_case_study(study: &CaseStudy) -> Result<(), ContentError> {
    check_color(&study.id, &study.accent)?;
    if study.tabs.is_empty() {
        return Err(invalid(&study.id, "case study has no tabs".to_string()));
    }

    let mut tab_ids = BTreeSet::new();
    for tab in &study.tabs {
        if !tab_ids.insert(tab.id.as_str()) {
            return Err(invalid(&study.id, format!("duplicate tab id {}", tab.id)));
        }
        for card in &tab.cards {
            for block in &card.blocks {
                match block {
                    Block::Bullets { color: Some(color), .. }
                    | Block::Badges { color: Some(color), .. }
                    | Block::Questions { color: Some(color), .. } => check_color(&study.id, color)?,
                    Block::Tiles { tiles } => {
                        for color in tiles.iter().filter_map(|tile| tile.color.as_deref()) {
                            check_color(&study.id, color)?;
                        }
                    }
                    Block::Diagram { chart } if chart.trim().is_empty() => {
                        return Err(invalid(
                            &study.id,
                            format!("empty diagram in card {}", card.title),
                        ));
                    }
                    _ => {}
                }
            }
        }
    }
    Ok(())
}

fn parse<T: serde::de::DeserializeOwned>(document: &str, raw: &str) -> Result<T, ContentError> {
    toml::from_str(raw).map_err(|source| ContentError::Parse {
        document: document.to_string(),
        source,
    })
}

fn check_color(document: &str, color: &str) -> Result<(), ContentError> {
    match parse_hex_color(color) {
        Some(_) => Ok(()),
        None => Err(invalid(document, format!("malformed color {color}"))),
    }
}

fn invalid(document: &str, message: String) -> ContentError {
    ContentError::Invalid {
        document: document.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builtin_catalog_loads_and_validates() {
        let catalog = Catalog::load_builtin().expect("embedded content should be valid");
        assert_eq!(catalog.site.projects.len(), 5);
        assert_eq!(catalog.groups.len(), 7);
        assert_eq!(catalog.case_studies.len(), 4);
        assert!(!catalog.site.contact.links.is_empty());
    }

    #[test]
    fn every_case_study_is_reachable_from_a_project() {
        let catalog = Catalog::load_builtin().expect("embedded content should be valid");
        for study in &catalog.case_studies {
            let linked = catalog
                .groups
                .iter()
                .flat_map(|group| group.projects.iter())
                .any(|project| project.case_study.as_deref() == Some(study.id.as_str()));
            assert!(linked, "case study {} has no project", study.id);
        }
    }

    #[test]
    fn case_studies_carry_diagrams_and_tab_ids() {
        let catalog = Catalog::load_builtin().expect("embedded content should be valid");
        let study = catalog
            .case_study_for_project("dark-pool-matching-engine")
            .expect("dark pool project should link its case study");
        let ids: Vec<&str> = study.tabs.iter().map(|tab| tab.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["overview", "architecture", "diagram", "implementation", "results", "interview", "technical"]
        );
        let diagram_tab = study.tab("diagram").expect("diagram tab exists");
        assert_eq!(diagram_tab.diagrams().count(), 4);
    }

    #[test]
    fn case_studies_ship_every_card_and_question() {
        let catalog = Catalog::load_builtin().expect("embedded content should be valid");
        let mut counts: Vec<(&str, usize, usize)> = catalog
            .case_studies
            .iter()
            .map(|study| {
                let cards = study.tabs.iter().flat_map(|tab| tab.cards.iter());
                let questions = cards
                    .clone()
                    .flat_map(|card| card.blocks.iter())
                    .map(|block| match block {
                        Block::Questions { items, .. } => items.len(),
                        _ => 0,
                    })
                    .sum();
                (study.id.as_str(), cards.count(), questions)
            })
            .collect();
        counts.sort();
        assert_eq!(
            counts,
            vec![
                ("dark-pool", 24, 29),
                ("monolith", 22, 33),
                ("openlink", 16, 10),
                ("var-cvar", 23, 29),
            ]
        );
    }

    #[test]
    fn duplicate_tab_ids_are_rejected() {
        let raw = r##"
id = "dup"
title = "Dup"
icon = "x"
subtitle = "s"
accent = "#6366f1"

[[tabs]]
id = "overview"
label = "One"
cards = []

[[tabs]]
id = "overview"
label = "Two"
cards = []
"##;
        let study: CaseStudy = parse("dup.toml", raw).expect("fixture should parse");
        let error = validate_case_study(&study).expect_err("duplicate tabs should fail");
        assert!(error.to_string().contains("duplicate tab id overview"));
    }

    #[test]
    fn empty_diagrams_and_bad_colors_are_rejected() {
        let raw = r##"
id = "broken"
title = "Broken"
icon = "x"
subtitle = "s"
accent = "#6366f1"

[[tabs]]
id = "diagram"
label = "Diagram"

[[tabs.cards]]
title = "Empty"

[[tabs.cards.blocks]]
kind = "diagram"
chart = "   "
"##;
        let study: CaseStudy = parse("broken.toml", raw).expect("fixture should parse");
        assert!(validate_case_study(&study).is_err());

        let recolored = raw.replace("#6366f1", "indigo");
        let study: CaseStudy = parse("broken.toml", &recolored).expect("fixture should parse");
        let error = validate_case_study(&study).expect_err("bad accent should fail");
        assert!(error.to_string().contains("malformed color indigo"));
    }

    #[test]
    fn unknown_block_kind_fails_to_parse() {
        let raw = r##"
id = "odd"
title = "Odd"
icon = "x"
subtitle = "s"
accent = "#6366f1"

[[tabs]]
id = "overview"
label = "Overview"

[[tabs.cards]]
title = "Card"

[[tabs.cards.blocks]]
kind = "carousel"
"##;
        let error = parse::<CaseStudy>("odd.toml", raw).expect_err("unknown kind should fail");
        assert!(matches!(error, ContentError::Parse { .. }));
    }
}
