//! Maps competency texts to criteria.
//!
//! The classifier is an ordered list of rules. Short labels (the name of the
//! competency compared as a whole) are tried first, then keywords searched in
//! the full text. Within each group the first matching rule wins, so the
//! order of the rules decides ambiguous texts. When nothing matches, the
//! default criterion is returned.

use log::debug;

use crate::config::CriterionId;

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Matcher {
    /// The normalized name equals one of the labels.
    Label(Vec<String>),
    /// The normalized text contains one of the keywords.
    Keywords(Vec<String>),
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Rule {
    pub matcher: Matcher,
    pub criterion: CriterionId,
}

impl Rule {
    pub fn label(criterion: CriterionId, labels: &[&str]) -> Rule {
        Rule {
            matcher: Matcher::Label(labels.iter().map(|s| normalize(s)).collect()),
            criterion,
        }
    }

    pub fn keywords(criterion: CriterionId, keywords: &[&str]) -> Rule {
        Rule {
            matcher: Matcher::Keywords(keywords.iter().map(|s| normalize(s)).collect()),
            criterion,
        }
    }

    fn is_label(&self) -> bool {
        matches!(self.matcher, Matcher::Label(_))
    }

    // Both inputs are already normalized.
    fn matches(&self, label: &str, text: &str) -> bool {
        match &self.matcher {
            Matcher::Label(labels) => labels.iter().any(|l| !l.is_empty() && l == label),
            Matcher::Keywords(keywords) => keywords
                .iter()
                .any(|k| !k.is_empty() && text.contains(k.as_str())),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Classifier {
    rules: Vec<Rule>,
    default_criterion: CriterionId,
}

impl Classifier {
    pub fn new(rules: Vec<Rule>, default_criterion: CriterionId) -> Classifier {
        Classifier {
            rules,
            default_criterion,
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn default_criterion(&self) -> &CriterionId {
        &self.default_criterion
    }

    /// Classifies a competency from its name and its description.
    pub fn classify(&self, name: &str, description: &str) -> &CriterionId {
        let label = normalize(name);
        let text = normalize(&format!("{} {}", name, description));
        if text.is_empty() {
            return &self.default_criterion;
        }

        let label_rules = self.rules.iter().filter(|r| r.is_label());
        let keyword_rules = self.rules.iter().filter(|r| !r.is_label());
        for rule in label_rules.chain(keyword_rules) {
            if rule.matches(&label, &text) {
                debug!("classify: {:?} -> {:?}", text, rule.criterion);
                return &rule.criterion;
            }
        }
        debug!(
            "classify: no rule for {:?}, using {:?}",
            text, self.default_criterion
        );
        &self.default_criterion
    }

    /// Classifies a legacy single "point" label.
    pub fn classify_point(&self, point: &str) -> &CriterionId {
        self.classify(point, "")
    }

    /// The rules of the standard catalog.
    pub fn standard() -> Classifier {
        let c = |s: &str| CriterionId(s.to_string());
        let rules = vec![
            // Short labels.
            Rule::label(c("liderazgo"), &["liderazgo", "lider"]),
            Rule::label(c("comunicacion"), &["comunicación", "comunicacion efectiva"]),
            Rule::label(c("trabajo_equipo"), &["trabajo en equipo", "equipo"]),
            Rule::label(c("toma_decisiones"), &["toma de decisiones", "decisiones"]),
            Rule::label(c("retroalimentacion"), &["retroalimentación", "feedback"]),
            Rule::label(c("reconocimiento"), &["reconocimiento"]),
            Rule::label(
                c("desarrollo"),
                &["desarrollo", "desarrollo del personal", "capacitación"],
            ),
            Rule::label(c("respeto"), &["respeto", "trato digno"]),
            Rule::label(c("organizacion"), &["organización", "planeación"]),
            Rule::label(c("solucion_problemas"), &["solución de problemas"]),
            Rule::label(c("seguridad"), &["seguridad"]),
            Rule::label(c("confianza"), &["confianza"]),
            Rule::label(c("accesibilidad"), &["accesibilidad", "disponibilidad"]),
            Rule::label(c("equidad"), &["equidad", "justicia"]),
            Rule::label(c("motivacion"), &["motivación"]),
            Rule::label(c("empatia"), &["empatía"]),
            Rule::label(c("ejemplo"), &["ejemplo", "congruencia"]),
            // Keywords in the longer descriptive texts.
            Rule::keywords(
                c("seguridad"),
                &["seguridad", "riesgo", "accidente", "equipo de protección"],
            ),
            Rule::keywords(c("retroalimentacion"), &["retroaliment", "feedback"]),
            Rule::keywords(
                c("reconocimiento"),
                &["reconoce", "reconocimiento", "felicita", "logros"],
            ),
            Rule::keywords(c("toma_decisiones"), &["decisión", "decisiones", "decide"]),
            Rule::keywords(
                c("solucion_problemas"),
                &["problema", "conflicto", "soluciona", "solución"],
            ),
            Rule::keywords(
                c("desarrollo"),
                &["capacita", "desarrollo", "aprend", "crecimiento", "enseña"],
            ),
            Rule::keywords(
                c("organizacion"),
                &["organiza", "planea", "prioridad", "metas", "objetivos"],
            ),
            Rule::keywords(
                c("comunicacion"),
                &["comunica", "informa", "explica", "instrucciones", "escucha"],
            ),
            Rule::keywords(c("trabajo_equipo"), &["equipo", "colabora", "coopera"]),
            Rule::keywords(c("respeto"), &["respet", "trato", "digno", "cortés"]),
            Rule::keywords(c("confianza"), &["confianza", "confía", "honest", "sincer"]),
            Rule::keywords(
                c("accesibilidad"),
                &["disponible", "accesible", "acercarme", "atiende"],
            ),
            Rule::keywords(
                c("equidad"),
                &["justo", "justa", "equidad", "favoritismo", "imparcial", "igualdad"],
            ),
            Rule::keywords(c("motivacion"), &["motiva", "entusiasmo", "anima"]),
            Rule::keywords(
                c("empatia"),
                &["empatía", "comprende", "bienestar", "situación personal"],
            ),
            Rule::keywords(c("ejemplo"), &["ejemplo", "congruen", "coheren", "puntual"]),
            Rule::keywords(c("liderazgo"), &["líder", "guía", "dirige", "conduce"]),
        ];
        Classifier::new(rules, c("liderazgo"))
    }
}

/// Lowercases, folds the Spanish accents and collapses the whitespace.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .chars()
        .flat_map(|c| c.to_lowercase())
        .map(|c| match c {
            'á' | 'à' | 'ä' => 'a',
            'é' | 'è' | 'ë' => 'e',
            'í' | 'ì' | 'ï' => 'i',
            'ó' | 'ò' | 'ö' => 'o',
            'ú' | 'ù' | 'ü' => 'u',
            'ñ' => 'n',
            c => c,
        })
        .collect();
    folded.split_whitespace().collect::<Vec<&str>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(name: &str, description: &str) -> String {
        Classifier::standard()
            .classify(name, description)
            .as_str()
            .to_string()
    }

    #[test]
    fn normalize_folds_case_and_accents() {
        assert_eq!(normalize("  Comunicación   Efectiva "), "comunicacion efectiva");
        assert_eq!(normalize("ENSEÑA"), "ensena");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn short_labels() {
        assert_eq!(classify("Comunicación", ""), "comunicacion");
        assert_eq!(classify("COMUNICACION", ""), "comunicacion");
        assert_eq!(classify("Trabajo en equipo", ""), "trabajo_equipo");
        assert_eq!(classify("Empatía", ""), "empatia");
        assert_eq!(classify("justicia", ""), "equidad");
    }

    #[test]
    fn labels_win_over_keywords() {
        // "Equipo" alone is a label of trabajo_equipo, even if the description
        // mentions safety keywords that come first in the keyword rules.
        assert_eq!(
            classify("Equipo", "Reduce los riesgos de accidente"),
            "trabajo_equipo"
        );
    }

    #[test]
    fn keywords_in_descriptions() {
        assert_eq!(
            classify("Pregunta 4", "Mi jefe me explica claramente las instrucciones"),
            "comunicacion"
        );
        assert_eq!(
            classify("Pregunta 7", "Reconoce mis logros frente al grupo"),
            "reconocimiento"
        );
        assert_eq!(
            classify("Pregunta 9", "Trata a todos de manera justa y sin favoritismo"),
            "equidad"
        );
        assert_eq!(
            classify("Pregunta 12", "Se preocupa por mi bienestar"),
            "empatia"
        );
    }

    #[test]
    fn keyword_order_breaks_ties() {
        // Mentions both protective equipment (seguridad) and team (trabajo_equipo).
        assert_eq!(
            classify("Uso del equipo de protección", "Exige el equipo de protección al equipo"),
            "seguridad"
        );
        // Mentions both decisions and communication: decisions come first.
        assert_eq!(
            classify("", "Comunica las decisiones a tiempo"),
            "toma_decisiones"
        );
    }

    #[test]
    fn unmatched_and_empty_use_default() {
        assert_eq!(classify("", ""), "liderazgo");
        assert_eq!(classify("   ", "  "), "liderazgo");
        assert_eq!(classify("Pregunta 1", "xyz"), "liderazgo");
    }

    #[test]
    fn classification_is_deterministic() {
        let classifier = Classifier::standard();
        for text in ["", "Comunicación", "Es puntual", "sin palabras clave"] {
            let first = classifier.classify_point(text).clone();
            let second = classifier.classify_point(text).clone();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn legacy_points() {
        let classifier = Classifier::standard();
        assert_eq!(classifier.classify_point("Seguridad").as_str(), "seguridad");
        assert_eq!(
            classifier.classify_point("Da el ejemplo con su conducta").as_str(),
            "ejemplo"
        );
    }
}
