//! The criteria enumeration, its classification rules and the training
//! recommendations.
//!
//! A [`Catalog`] is built once and passed by reference to everything that
//! needs it. It is never mutated after construction.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::classifier::{normalize, Classifier, Rule};
use crate::config::*;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Label,
    Keywords,
}

/// A classification rule as written in a catalog file.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub kind: RuleKind,
    pub criterion: String,
    pub patterns: Vec<String>,
}

/// A catalog as written in a JSON file.
///
/// When no rules are given, every criterion gets a label rule made of its id
/// and its name.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDefinition {
    pub version: String,
    pub criteria: Vec<Criterion>,
    #[serde(rename = "defaultCriterion")]
    pub default_criterion: String,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
    #[serde(default)]
    pub recommendations: BTreeMap<String, Vec<String>>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Catalog {
    version: String,
    criteria: Vec<Criterion>,
    positions: HashMap<CriterionId, usize>,
    classifier: Classifier,
    recommendations: HashMap<CriterionId, Vec<String>>,
}

impl Catalog {
    /// Assembles and checks a catalog.
    ///
    /// The criteria must be unique and every rule, recommendation and the
    /// default criterion must refer to one of them.
    pub fn new(
        version: &str,
        criteria: Vec<Criterion>,
        classifier: Classifier,
        recommendations: HashMap<CriterionId, Vec<String>>,
    ) -> Result<Catalog, EvaluationErrors> {
        if criteria.is_empty() {
            return Err(EvaluationErrors::EmptyCatalog);
        }
        let mut positions: HashMap<CriterionId, usize> = HashMap::new();
        for (idx, c) in criteria.iter().enumerate() {
            if positions.insert(c.id.clone(), idx).is_some() {
                return Err(EvaluationErrors::DuplicateCriterion(c.id.to_string()));
            }
        }

        let known = |cid: &CriterionId| -> Result<(), EvaluationErrors> {
            if positions.contains_key(cid) {
                Ok(())
            } else {
                Err(EvaluationErrors::UnknownCriterion(cid.to_string()))
            }
        };
        known(classifier.default_criterion())?;
        for rule in classifier.rules() {
            known(&rule.criterion)?;
        }
        for cid in recommendations.keys() {
            known(cid)?;
        }

        debug!(
            "Catalog::new: version {:?} with {} criteria and {} rules",
            version,
            criteria.len(),
            classifier.rules().len()
        );
        Ok(Catalog {
            version: version.to_string(),
            criteria,
            positions,
            classifier,
            recommendations,
        })
    }

    pub fn from_definition(def: &CatalogDefinition) -> Result<Catalog, EvaluationErrors> {
        let default_criterion = CriterionId::new(&def.default_criterion)
            .ok_or_else(|| EvaluationErrors::InvalidIdentifier(def.default_criterion.clone()))?;

        let mut rules: Vec<Rule> = Vec::new();
        if def.rules.is_empty() {
            for c in def.criteria.iter() {
                rules.push(Rule::label(c.id.clone(), &[c.id.as_str(), c.name.as_str()]));
            }
        }
        for rd in def.rules.iter() {
            let cid = CriterionId::new(&rd.criterion)
                .ok_or_else(|| EvaluationErrors::InvalidIdentifier(rd.criterion.clone()))?;
            let patterns: Vec<&str> = rd.patterns.iter().map(|s| s.as_str()).collect();
            rules.push(match rd.kind {
                RuleKind::Label => Rule::label(cid, &patterns),
                RuleKind::Keywords => Rule::keywords(cid, &patterns),
            });
        }

        let mut recommendations: HashMap<CriterionId, Vec<String>> = HashMap::new();
        for (key, topics) in def.recommendations.iter() {
            let cid = CriterionId::new(key)
                .ok_or_else(|| EvaluationErrors::InvalidIdentifier(key.clone()))?;
            recommendations.insert(cid, topics.clone());
        }

        Catalog::new(
            &def.version,
            def.criteria.clone(),
            Classifier::new(rules, default_criterion),
            recommendations,
        )
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The criteria, in enumeration order.
    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn criterion(&self, id: &CriterionId) -> Option<&Criterion> {
        self.positions.get(id).map(|idx| &self.criteria[*idx])
    }

    /// The position of the criterion in the enumeration.
    pub fn position(&self, id: &CriterionId) -> Option<usize> {
        self.positions.get(id).cloned()
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn default_criterion(&self) -> &CriterionId {
        self.classifier.default_criterion()
    }

    /// The recommended training topics for a criterion (possibly empty).
    pub fn recommendations(&self, id: &CriterionId) -> &[String] {
        self.recommendations
            .get(id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Finds the criterion of a competency.
    ///
    /// An explicit criterion id takes precedence when it names a criterion of
    /// this catalog (compared without case or accents). Otherwise the text of
    /// the competency goes through the classification rules.
    pub fn classify_competency(&self, competency: &Competency) -> CriterionId {
        if let Some(explicit) = competency.criterion_id.as_deref() {
            if let Some(cid) = self.lookup(explicit) {
                return cid.clone();
            }
            if !explicit.trim().is_empty() {
                warn!(
                    "classify_competency: competency {} refers to unknown criterion {:?}, using the text rules",
                    competency.id, explicit
                );
            }
        }
        self.classifier
            .classify(&competency.name, &competency.description)
            .clone()
    }

    pub fn classify_text(&self, name: &str, description: &str) -> &CriterionId {
        self.classifier.classify(name, description)
    }

    pub fn classify_point(&self, point: &str) -> &CriterionId {
        self.classifier.classify_point(point)
    }

    fn lookup(&self, id: &str) -> Option<&CriterionId> {
        if let Some(cid) = CriterionId::new(id) {
            if let Some(idx) = self.positions.get(&cid) {
                return Some(&self.criteria[*idx].id);
            }
        }
        let wanted = normalize(id);
        self.criteria
            .iter()
            .map(|c| &c.id)
            .find(|cid| normalize(cid.as_str()) == wanted)
    }

    /// The built-in catalog: 11 core leadership points and 6 additional
    /// relational categories.
    pub fn standard() -> Catalog {
        let criteria: Vec<Criterion> = STANDARD_CRITERIA
            .iter()
            .map(|(id, name, description, category)| Criterion {
                id: CriterionId(id.to_string()),
                name: name.to_string(),
                description: description.to_string(),
                category: *category,
            })
            .collect();
        let recommendations: HashMap<CriterionId, Vec<String>> = STANDARD_RECOMMENDATIONS
            .iter()
            .map(|(id, topics)| {
                (
                    CriterionId(id.to_string()),
                    topics.iter().map(|t| t.to_string()).collect(),
                )
            })
            .collect();
        let positions = criteria
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.id.clone(), idx))
            .collect();
        Catalog {
            version: STANDARD_VERSION.to_string(),
            criteria,
            positions,
            classifier: Classifier::standard(),
            recommendations,
        }
    }

    /// The ids of the criteria, for quick membership checks.
    pub fn criterion_ids(&self) -> HashSet<&CriterionId> {
        self.criteria.iter().map(|c| &c.id).collect()
    }
}

const STANDARD_VERSION: &str = "2024.1";

const STANDARD_CRITERIA: [(&str, &str, &str, Category); 17] = [
    (
        "liderazgo",
        "Liderazgo",
        "Guía al equipo hacia los objetivos del área con dirección clara.",
        Category::Core,
    ),
    (
        "comunicacion",
        "Comunicación",
        "Informa, explica y escucha de forma clara y oportuna.",
        Category::Core,
    ),
    (
        "trabajo_equipo",
        "Trabajo en equipo",
        "Promueve la colaboración y la cooperación entre compañeros.",
        Category::Core,
    ),
    (
        "toma_decisiones",
        "Toma de decisiones",
        "Decide con oportunidad y asume las consecuencias.",
        Category::Core,
    ),
    (
        "retroalimentacion",
        "Retroalimentación",
        "Da observaciones concretas sobre el desempeño.",
        Category::Core,
    ),
    (
        "reconocimiento",
        "Reconocimiento",
        "Reconoce los logros y el esfuerzo del personal.",
        Category::Core,
    ),
    (
        "desarrollo",
        "Desarrollo del personal",
        "Impulsa la capacitación y el crecimiento de sus colaboradores.",
        Category::Core,
    ),
    (
        "respeto",
        "Respeto y trato digno",
        "Trata a las personas con respeto y cortesía.",
        Category::Core,
    ),
    (
        "organizacion",
        "Organización y planeación",
        "Organiza el trabajo, fija prioridades y metas alcanzables.",
        Category::Core,
    ),
    (
        "solucion_problemas",
        "Solución de problemas",
        "Atiende los problemas y conflictos hasta resolverlos.",
        Category::Core,
    ),
    (
        "seguridad",
        "Seguridad",
        "Vigila las condiciones de seguridad y reduce los riesgos.",
        Category::Core,
    ),
    (
        "confianza",
        "Confianza",
        "Genera un ambiente de confianza y honestidad.",
        Category::Additional,
    ),
    (
        "accesibilidad",
        "Accesibilidad",
        "Está disponible cuando el personal lo necesita.",
        Category::Additional,
    ),
    (
        "equidad",
        "Equidad",
        "Trata a todos de manera justa, sin favoritismos.",
        Category::Additional,
    ),
    (
        "motivacion",
        "Motivación",
        "Motiva y contagia entusiasmo al equipo.",
        Category::Additional,
    ),
    (
        "empatia",
        "Empatía",
        "Comprende la situación personal de sus colaboradores.",
        Category::Additional,
    ),
    (
        "ejemplo",
        "Congruencia y ejemplo",
        "Actúa de acuerdo con lo que pide a los demás.",
        Category::Additional,
    ),
];

const STANDARD_RECOMMENDATIONS: [(&str, &[&str]); 17] = [
    (
        "liderazgo",
        &["Liderazgo situacional", "Dirección de equipos operativos"],
    ),
    (
        "comunicacion",
        &["Comunicación asertiva", "Escucha activa"],
    ),
    (
        "trabajo_equipo",
        &["Integración de equipos de alto desempeño"],
    ),
    (
        "toma_decisiones",
        &["Toma de decisiones bajo presión", "Análisis de alternativas"],
    ),
    (
        "retroalimentacion",
        &["Retroalimentación efectiva", "Conversaciones de desempeño"],
    ),
    (
        "reconocimiento",
        &["Reconocimiento y refuerzo positivo"],
    ),
    (
        "desarrollo",
        &["Coaching para supervisores", "Detección de necesidades de capacitación"],
    ),
    (
        "respeto",
        &["Trato digno y prevención del acoso laboral"],
    ),
    (
        "organizacion",
        &["Planeación y administración del tiempo", "Establecimiento de metas"],
    ),
    (
        "solucion_problemas",
        &["Solución de problemas y manejo de conflictos"],
    ),
    (
        "seguridad",
        &["Cultura de seguridad", "Identificación de riesgos"],
    ),
    (
        "confianza",
        &["Construcción de confianza"],
    ),
    (
        "accesibilidad",
        &["Gestión de la disponibilidad y puertas abiertas"],
    ),
    (
        "equidad",
        &["Equidad e inclusión en el trabajo"],
    ),
    (
        "motivacion",
        &["Motivación de equipos", "Clima laboral"],
    ),
    (
        "empatia",
        &["Inteligencia emocional"],
    ),
    (
        "ejemplo",
        &["Liderazgo con el ejemplo", "Ética y congruencia"],
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_is_consistent() {
        let catalog = Catalog::standard();
        assert_eq!(catalog.criteria().len(), 17);
        let core = catalog
            .criteria()
            .iter()
            .filter(|c| c.category == Category::Core)
            .count();
        assert_eq!(core, 11);
        // Same checks as a catalog built from parts.
        let rebuilt = Catalog::new(
            catalog.version(),
            catalog.criteria().to_vec(),
            catalog.classifier().clone(),
            catalog
                .criteria()
                .iter()
                .map(|c| (c.id.clone(), catalog.recommendations(&c.id).to_vec()))
                .collect(),
        );
        assert_eq!(rebuilt, Ok(catalog));
    }

    #[test]
    fn classification_always_lands_in_the_enumeration() {
        let catalog = Catalog::standard();
        let ids = catalog.criterion_ids();
        for text in ["", "Comunicación", "Reconoce mis logros", "???", "Es puntual"] {
            assert!(ids.contains(catalog.classify_point(text)));
        }
    }

    #[test]
    fn explicit_criterion_takes_precedence() {
        let catalog = Catalog::standard();
        let c = Competency::new(CompetencyId::new("c1").unwrap(), "Comunicación")
            .with_criterion("seguridad");
        assert_eq!(catalog.classify_competency(&c).as_str(), "seguridad");

        let c = Competency::new(CompetencyId::new("c2").unwrap(), "Comunicación")
            .with_criterion("Empatía");
        assert_eq!(catalog.classify_competency(&c).as_str(), "empatia");
    }

    #[test]
    fn unknown_explicit_criterion_uses_text() {
        let catalog = Catalog::standard();
        let c = Competency::new(CompetencyId::new("c1").unwrap(), "Comunicación")
            .with_criterion("no_such_thing");
        assert_eq!(catalog.classify_competency(&c).as_str(), "comunicacion");
        let c = Competency::new(CompetencyId::new("c2").unwrap(), "").with_criterion("");
        assert_eq!(catalog.classify_competency(&c).as_str(), "liderazgo");
    }

    #[test]
    fn recommendations() {
        let catalog = Catalog::standard();
        let cid = CriterionId::new("comunicacion").unwrap();
        assert_eq!(catalog.recommendations(&cid).len(), 2);
        let unknown = CriterionId::new("nope").unwrap();
        assert!(catalog.recommendations(&unknown).is_empty());
    }

    #[test]
    fn catalog_from_json_definition() {
        let js = r#"{
            "version": "test-1",
            "criteria": [
                {"id": "a", "name": "Alpha", "category": "core_12"},
                {"id": "b", "name": "Beta", "description": "second", "category": "additional"}
            ],
            "defaultCriterion": "a",
            "rules": [
                {"kind": "keywords", "criterion": "b", "patterns": ["beta", "segundo"]}
            ],
            "recommendations": {"b": ["Curso B"]}
        }"#;
        let def: CatalogDefinition = serde_json::from_str(js).unwrap();
        let catalog = Catalog::from_definition(&def).unwrap();
        assert_eq!(catalog.version(), "test-1");
        assert_eq!(catalog.classify_text("El segundo", "").as_str(), "b");
        assert_eq!(catalog.classify_text("Otro", "").as_str(), "a");
        assert_eq!(
            catalog.recommendations(&CriterionId::new("b").unwrap()),
            &["Curso B".to_string()]
        );
    }

    #[test]
    fn catalog_without_rules_uses_labels() {
        let js = r#"{
            "version": "test-2",
            "criteria": [
                {"id": "a", "name": "Alpha", "category": "core_12"},
                {"id": "b", "name": "Beta", "category": "additional"}
            ],
            "defaultCriterion": "a"
        }"#;
        let def: CatalogDefinition = serde_json::from_str(js).unwrap();
        let catalog = Catalog::from_definition(&def).unwrap();
        assert_eq!(catalog.classify_point("BETA").as_str(), "b");
        assert_eq!(catalog.classify_point("beta carotene").as_str(), "a");
    }

    #[test]
    fn invalid_catalogs() {
        let c = |id: &str| Criterion {
            id: CriterionId::new(id).unwrap(),
            name: id.to_string(),
            description: String::new(),
            category: Category::Core,
        };
        let default = CriterionId::new("a").unwrap();
        assert_eq!(
            Catalog::new(
                "v",
                vec![],
                Classifier::new(vec![], default.clone()),
                HashMap::new()
            ),
            Err(EvaluationErrors::EmptyCatalog)
        );
        assert_eq!(
            Catalog::new(
                "v",
                vec![c("a"), c("a")],
                Classifier::new(vec![], default.clone()),
                HashMap::new()
            ),
            Err(EvaluationErrors::DuplicateCriterion("a".to_string()))
        );
        assert_eq!(
            Catalog::new(
                "v",
                vec![c("b")],
                Classifier::new(vec![], default),
                HashMap::new()
            ),
            Err(EvaluationErrors::UnknownCriterion("a".to_string()))
        );
    }
}
