//! Arc templates: `{placeholder}` text parsing and rendering, plus the
//! per-archetype catalog loaded from RON.

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::schema::arc::ArcArchetype;

/// The catalog shipped with the crate.
const BUILTIN_TEMPLATES: &str = include_str!("../../arc_data/templates.ron");

/// Number of phases every generated arc has, and so the number of seed
/// objectives each template must provide.
pub const PHASE_COUNT: usize = 4;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template parse error: {0}")]
    TemplateParse(String),
    #[error("unknown template field: {{{0}}}")]
    UnknownField(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("duplicate template for {0}")]
    Duplicate(ArcArchetype),
    #[error("no template for {0}")]
    Missing(ArcArchetype),
    #[error("invalid template for {archetype}: {reason}")]
    Invalid {
        archetype: ArcArchetype,
        reason: String,
    },
}

/// Values a template can interpolate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextField {
    CharacterName,
    CharacterLevel,
    Location,
    SeriesName,
    Theme,
    Goal,
    Faction,
}

impl ContextField {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "character.name" => Some(Self::CharacterName),
            "character.level" => Some(Self::CharacterLevel),
            "world.location" => Some(Self::Location),
            "series.name" => Some(Self::SeriesName),
            "theme" => Some(Self::Theme),
            "goal" => Some(Self::Goal),
            "faction" => Some(Self::Faction),
            _ => None,
        }
    }
}

/// A segment of a parsed template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplateSegment {
    /// Literal text, emitted as-is.
    Literal(String),
    /// A `{field}` filled from the render context.
    Field(ContextField),
}

/// A parsed template: a sequence of segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub segments: Vec<TemplateSegment>,
}

impl Template {
    /// Parse a template string.
    ///
    /// Syntax:
    /// - `{character.name}`, `{character.level}`, `{world.location}`,
    ///   `{series.name}`, `{theme}`, `{goal}`, `{faction}` → `Field`
    /// - `{{` / `}}` → literal braces
    /// - Everything else → `Literal`
    pub fn parse(input: &str) -> Result<Template, TemplateError> {
        let mut segments = Vec::new();
        let mut literal_buf = String::new();
        let chars: Vec<char> = input.chars().collect();
        let len = chars.len();
        let mut i = 0;

        while i < len {
            if chars[i] == '{' {
                if i + 1 < len && chars[i + 1] == '{' {
                    literal_buf.push('{');
                    i += 2;
                    continue;
                }

                if !literal_buf.is_empty() {
                    segments.push(TemplateSegment::Literal(std::mem::take(&mut literal_buf)));
                }

                let start = i + 1;
                let mut end = start;
                while end < len && chars[end] != '}' {
                    if chars[end] == '{' {
                        return Err(TemplateError::TemplateParse(
                            "nested braces are not allowed".to_string(),
                        ));
                    }
                    end += 1;
                }
                if end == len {
                    return Err(TemplateError::TemplateParse("unclosed brace".to_string()));
                }

                let content: String = chars[start..end].iter().collect();
                let name = content.trim();
                if name.is_empty() {
                    return Err(TemplateError::TemplateParse("empty braces".to_string()));
                }
                let field = ContextField::from_name(name)
                    .ok_or_else(|| TemplateError::UnknownField(name.to_string()))?;
                segments.push(TemplateSegment::Field(field));
                i = end + 1;
            } else if chars[i] == '}' {
                if i + 1 < len && chars[i + 1] == '}' {
                    literal_buf.push('}');
                    i += 2;
                    continue;
                }
                return Err(TemplateError::TemplateParse(
                    "unmatched closing brace".to_string(),
                ));
            } else {
                literal_buf.push(chars[i]);
                i += 1;
            }
        }

        if !literal_buf.is_empty() {
            segments.push(TemplateSegment::Literal(literal_buf));
        }

        Ok(Template { segments })
    }

    pub fn render(&self, ctx: &TemplateContext) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                TemplateSegment::Literal(text) => out.push_str(text),
                TemplateSegment::Field(field) => out.push_str(&ctx.value(*field)),
            }
        }
        out
    }

    pub fn fields(&self) -> impl Iterator<Item = ContextField> + '_ {
        self.segments.iter().filter_map(|s| match s {
            TemplateSegment::Field(f) => Some(*f),
            TemplateSegment::Literal(_) => None,
        })
    }
}

/// Values substituted into templates while generating one arc.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    pub character_name: String,
    pub character_level: u32,
    pub location: String,
    pub series_name: String,
    pub theme: String,
    pub goal: String,
    pub faction: String,
}

impl TemplateContext {
    fn value(&self, field: ContextField) -> String {
        match field {
            ContextField::CharacterName => self.character_name.clone(),
            ContextField::CharacterLevel => self.character_level.to_string(),
            ContextField::Location => self.location.clone(),
            ContextField::SeriesName => self.series_name.clone(),
            ContextField::Theme => self.theme.clone(),
            ContextField::Goal => self.goal.clone(),
            ContextField::Faction => self.faction.clone(),
        }
    }
}

/// A weighted text alternative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub weight: u32,
    pub template: Template,
}

/// Pick one alternative by weight. `None` if the list is empty or all
/// weights are zero.
pub fn pick<'a>(alternatives: &'a [Alternative], rng: &mut StdRng) -> Option<&'a Template> {
    let weights: Vec<u32> = alternatives.iter().map(|a| a.weight).collect();
    let dist = WeightedIndex::new(&weights).ok()?;
    Some(&alternatives[dist.sample(rng)].template)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchTemplate {
    pub id: String,
    pub description: Template,
    /// Arc progress percentage that opens the branch.
    pub unlock_progress: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTemplate {
    pub id: String,
    /// 1-based phase the decision belongs to.
    pub phase: u32,
    pub prompt: Template,
    pub options: Vec<String>,
}

/// Everything needed to instantiate one archetype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArcTemplate {
    pub archetype: ArcArchetype,
    pub titles: Vec<Alternative>,
    pub descriptions: Vec<Alternative>,
    pub thematic_tags: Vec<String>,
    pub consequence_weight: f32,
    pub choice_influence: f32,
    /// One seed objective per phase, in phase order.
    pub objectives: Vec<Template>,
    pub branches: Vec<BranchTemplate>,
    pub endings: Vec<(String, Template)>,
    pub decisions: Vec<DecisionTemplate>,
}

impl ArcTemplate {
    fn validate(&self) -> Result<(), TemplateError> {
        let invalid = |reason: String| TemplateError::Invalid {
            archetype: self.archetype,
            reason,
        };
        if self.titles.is_empty() || self.descriptions.is_empty() {
            return Err(invalid("needs at least one title and description".to_string()));
        }
        if self
            .titles
            .iter()
            .chain(self.descriptions.iter())
            .any(|a| a.weight == 0)
        {
            return Err(invalid("alternative weights must be positive".to_string()));
        }
        if self.objectives.len() != PHASE_COUNT {
            return Err(invalid(format!(
                "expected {} phase objectives, found {}",
                PHASE_COUNT,
                self.objectives.len()
            )));
        }
        if !(0.0..=1.0).contains(&self.choice_influence) {
            return Err(invalid("choice_influence must be within [0, 1]".to_string()));
        }
        if let Some(d) = self
            .decisions
            .iter()
            .find(|d| d.phase == 0 || d.phase as usize > PHASE_COUNT)
        {
            return Err(invalid(format!("decision {} targets phase {}", d.id, d.phase)));
        }
        Ok(())
    }
}

/// Templates for every archetype.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArcTemplateSet {
    templates: Vec<ArcTemplate>,
}

// The RON catalog keeps text as plain strings; these mirror the public types.

#[derive(Debug, Deserialize)]
struct RonAlternative {
    weight: u32,
    text: String,
}

#[derive(Debug, Deserialize)]
struct RonBranch {
    id: String,
    text: String,
    unlock_progress: f32,
}

#[derive(Debug, Deserialize)]
struct RonEnding {
    id: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct RonDecision {
    id: String,
    phase: u32,
    prompt: String,
    options: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "ArcTemplate")]
struct RonTemplate {
    archetype: ArcArchetype,
    titles: Vec<RonAlternative>,
    descriptions: Vec<RonAlternative>,
    thematic_tags: Vec<String>,
    consequence_weight: f32,
    choice_influence: f32,
    objectives: Vec<String>,
    #[serde(default)]
    branches: Vec<RonBranch>,
    #[serde(default)]
    endings: Vec<RonEnding>,
    #[serde(default)]
    decisions: Vec<RonDecision>,
}

fn parse_alternatives(raw: Vec<RonAlternative>) -> Result<Vec<Alternative>, TemplateError> {
    raw.into_iter()
        .map(|alt| {
            Ok(Alternative {
                weight: alt.weight,
                template: Template::parse(&alt.text)?,
            })
        })
        .collect()
}

impl RonTemplate {
    fn into_template(self) -> Result<ArcTemplate, TemplateError> {
        let objectives = self
            .objectives
            .iter()
            .map(|text| Template::parse(text))
            .collect::<Result<Vec<_>, _>>()?;
        let branches = self
            .branches
            .into_iter()
            .map(|b| {
                Ok(BranchTemplate {
                    id: b.id,
                    description: Template::parse(&b.text)?,
                    unlock_progress: b.unlock_progress,
                })
            })
            .collect::<Result<Vec<_>, TemplateError>>()?;
        let endings = self
            .endings
            .into_iter()
            .map(|e| Ok((e.id, Template::parse(&e.text)?)))
            .collect::<Result<Vec<_>, TemplateError>>()?;
        let decisions = self
            .decisions
            .into_iter()
            .map(|d| {
                Ok(DecisionTemplate {
                    id: d.id,
                    phase: d.phase,
                    prompt: Template::parse(&d.prompt)?,
                    options: d.options,
                })
            })
            .collect::<Result<Vec<_>, TemplateError>>()?;

        Ok(ArcTemplate {
            archetype: self.archetype,
            titles: parse_alternatives(self.titles)?,
            descriptions: parse_alternatives(self.descriptions)?,
            thematic_tags: self.thematic_tags,
            consequence_weight: self.consequence_weight,
            choice_influence: self.choice_influence,
            objectives,
            branches,
            endings,
            decisions,
        })
    }
}

impl ArcTemplateSet {
    /// The catalog embedded in the crate.
    pub fn builtin() -> Result<ArcTemplateSet, TemplateError> {
        Self::parse_ron(BUILTIN_TEMPLATES)
    }

    /// Load a template set from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<ArcTemplateSet, TemplateError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a template set from a RON string. Each entry is validated, and
    /// an archetype may appear only once. Missing archetypes are allowed
    /// here; see [`ArcTemplateSet::validate_complete`].
    pub fn parse_ron(input: &str) -> Result<ArcTemplateSet, TemplateError> {
        let raw: Vec<RonTemplate> = ron::from_str(input)?;
        let mut set = ArcTemplateSet::default();
        for entry in raw {
            let template = entry.into_template()?;
            template.validate()?;
            if set.get(template.archetype).is_some() {
                return Err(TemplateError::Duplicate(template.archetype));
            }
            set.templates.push(template);
        }
        Ok(set)
    }

    /// Error unless every archetype has a template.
    pub fn validate_complete(&self) -> Result<(), TemplateError> {
        for archetype in ArcArchetype::ALL {
            if self.get(archetype).is_none() {
                return Err(TemplateError::Missing(archetype));
            }
        }
        Ok(())
    }

    pub fn get(&self, archetype: ArcArchetype) -> Option<&ArcTemplate> {
        self.templates.iter().find(|t| t.archetype == archetype)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArcTemplate> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Merge another set into this one. Templates from `other` replace
    /// templates in `self` for the same archetype.
    pub fn merge(&mut self, other: ArcTemplateSet) {
        for template in other.templates {
            match self
                .templates
                .iter_mut()
                .find(|t| t.archetype == template.archetype)
            {
                Some(existing) => *existing = template,
                None => self.templates.push(template),
            }
        }
    }
}
