use std::fmt;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

// --- Academic catalog ---

/// An academic department ("cátedra") tracked for reputation monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    #[serde(alias = "id_comision")]
    pub id: i64,
    #[serde(rename = "codigo", default)]
    pub code: String,
    #[serde(rename = "nombre")]
    pub name: String,
    /// A plain name, or the backend's nested `docente` object.
    #[serde(
        rename = "titular",
        alias = "docente",
        default,
        deserialize_with = "instructor_name"
    )]
    pub lead_instructor: String,
    /// Times this department was matched from a scraped post.
    #[serde(rename = "menciones_fb", alias = "mencion_fb", default)]
    pub mentions: u32,
}

fn instructor_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Instructor {
        Name(String),
        Nested {
            #[serde(default)]
            nombre_completo: Option<String>,
            #[serde(default)]
            nombre: String,
            #[serde(default)]
            apellido: String,
        },
    }

    Ok(match Option::<Instructor>::deserialize(deserializer)? {
        None => String::new(),
        Some(Instructor::Name(name)) => name,
        Some(Instructor::Nested {
            nombre_completo,
            nombre,
            apellido,
        }) => nombre_completo
            .filter(|full| !full.trim().is_empty())
            .unwrap_or_else(|| format!("{nombre} {apellido}").trim().to_string()),
    })
}

// --- Scraping configuration ---

/// An external content source (a social-media group) to be scraped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapingSource {
    pub id: i64,
    #[serde(rename = "nombre")]
    pub name: String,
    pub url: String,
    #[serde(rename = "prioridad", default)]
    pub priority: i32,
    #[serde(rename = "activo", default)]
    pub active: bool,
}

/// A scheduled scraping job bound to a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapingTask {
    pub id: i64,
    #[serde(rename = "grupo_id", alias = "grupo")]
    pub source_id: i64,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(rename = "frecuencia_dias", default)]
    pub frequency_days: u32,
}

/// Session lifecycle. Transitions happen server-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    #[serde(rename = "PENDIENTE", alias = "iniciado")]
    Pending,
    #[serde(rename = "PROCESANDO", alias = "en_progreso")]
    Processing,
    #[serde(rename = "COMPLETADO", alias = "completado")]
    Completed,
    #[serde(rename = "FALLIDO", alias = "error")]
    Failed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionStatus::Pending => "PENDIENTE",
            SessionStatus::Processing => "PROCESANDO",
            SessionStatus::Completed => "COMPLETADO",
            SessionStatus::Failed => "FALLIDO",
        };
        f.write_str(label)
    }
}

/// One execution record of a scraping task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapingSession {
    pub id: i64,
    #[serde(rename = "usuario_id", alias = "usuario")]
    pub user_id: i64,
    #[serde(rename = "tarea_id", alias = "tarea")]
    pub task_id: i64,
    #[serde(rename = "estado")]
    pub status: SessionStatus,
    #[serde(rename = "posts_encontrados", default)]
    pub posts_found: u32,
    #[serde(rename = "fecha", alias = "inicio", default)]
    pub date: String,
}

impl ScrapingSession {
    /// Calendar day the session ran on. Accepts RFC 3339 timestamps and
    /// plain `YYYY-MM-DD` dates.
    pub fn started_on(&self) -> Option<NaiveDate> {
        let raw = self.date.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.date_naive());
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
    }
}

// --- Scraped content ---

/// A single piece of scraped text. `processed` only ever goes false → true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedPost {
    pub id: i64,
    #[serde(rename = "grupo_id", alias = "grupo")]
    pub source_id: i64,
    /// Identifier of the post on the social platform.
    #[serde(rename = "post_id")]
    pub external_id: String,
    #[serde(rename = "texto")]
    pub text: String,
    #[serde(rename = "procesado", default)]
    pub processed: bool,
}

// --- Recommendations ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    #[serde(rename = "POSITIVO")]
    Positive,
    #[serde(rename = "NEUTRAL")]
    Neutral,
    #[serde(rename = "NEGATIVO")]
    Negative,
}

impl Sentiment {
    /// Parse a free-text label from an analysis provider. Case-insensitive;
    /// English and Spanish spellings are accepted.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_uppercase().as_str() {
            "POSITIVE" | "POSITIVO" => Some(Sentiment::Positive),
            "NEUTRAL" => Some(Sentiment::Neutral),
            "NEGATIVE" | "NEGATIVO" => Some(Sentiment::Negative),
            _ => None,
        }
    }

    /// Stable index for per-sentiment tallies.
    pub fn index(self) -> usize {
        match self {
            Sentiment::Positive => 0,
            Sentiment::Neutral => 1,
            Sentiment::Negative => 2,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Sentiment::Positive => "POSITIVO",
            Sentiment::Neutral => "NEUTRAL",
            Sentiment::Negative => "NEGATIVO",
        };
        f.write_str(label)
    }
}

/// AI-derived insight linking one post to one department.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: i64,
    #[serde(rename = "catedra_id")]
    pub department_id: i64,
    #[serde(rename = "post_origen_id")]
    pub post_id: i64,
    #[serde(
        rename = "contribuidor_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub contributor_id: Option<i64>,
    #[serde(rename = "texto")]
    pub text: String,
    #[serde(rename = "sentimiento")]
    pub sentiment: Sentiment,
    /// In [0, 1].
    #[serde(rename = "confianza")]
    pub confidence: f64,
    #[serde(rename = "votos_utilidad", default)]
    pub useful_votes: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn department_accepts_backend_field_names() {
        let json = r#"{
            "id": 7,
            "codigo": "ALG1",
            "nombre": "Algoritmos I",
            "titular": "Rosa Wachenchauzer",
            "mencion_fb": 3
        }"#;
        let dept: Department = serde_json::from_str(json).unwrap();
        assert_eq!(dept.code, "ALG1");
        assert_eq!(dept.name, "Algoritmos I");
        assert_eq!(dept.mentions, 3);
    }

    #[test]
    fn department_accepts_commission_payload() {
        let json = r#"{
            "id_comision": 10,
            "codigo": "PROG1-A",
            "nombre": "Programación 1",
            "docente": {
                "id_docente": 1,
                "nombre": "Juan",
                "apellido": "García",
                "nombre_completo": "Juan García",
                "alias_search": "J. García, Garcia"
            },
            "numero_catedra": 1,
            "cuatrimestre": "1C2025",
            "mencion_fb": 3,
            "activa": true
        }"#;
        let dept: Department = serde_json::from_str(json).unwrap();
        assert_eq!(dept.id, 10);
        assert_eq!(dept.code, "PROG1-A");
        assert_eq!(dept.lead_instructor, "Juan García");
        assert_eq!(dept.mentions, 3);
    }

    #[test]
    fn nested_instructor_without_full_name_or_missing() {
        let json = r#"{
            "id_comision": 2,
            "nombre": "Redes",
            "docente": {"nombre": "Ana", "apellido": "Paz"}
        }"#;
        let dept: Department = serde_json::from_str(json).unwrap();
        assert_eq!(dept.lead_instructor, "Ana Paz");

        let json = r#"{"id_comision": 3, "nombre": "Física I", "docente": null}"#;
        let dept: Department = serde_json::from_str(json).unwrap();
        assert_eq!(dept.lead_instructor, "");
    }

    #[test]
    fn department_counter_defaults_to_zero() {
        let json = r#"{"id": 1, "nombre": "Bases de Datos"}"#;
        let dept: Department = serde_json::from_str(json).unwrap();
        assert_eq!(dept.mentions, 0);
        assert_eq!(dept.lead_instructor, "");
    }

    #[test]
    fn session_status_accepts_both_vocabularies() {
        let upper: SessionStatus = serde_json::from_str(r#""PROCESANDO""#).unwrap();
        let lower: SessionStatus = serde_json::from_str(r#""en_progreso""#).unwrap();
        assert_eq!(upper, SessionStatus::Processing);
        assert_eq!(lower, SessionStatus::Processing);

        let failed: SessionStatus = serde_json::from_str(r#""error""#).unwrap();
        assert_eq!(failed, SessionStatus::Failed);
        assert_eq!(serde_json::to_string(&failed).unwrap(), r#""FALLIDO""#);
    }

    #[test]
    fn session_date_parses_timestamps_and_plain_dates() {
        let mut session = ScrapingSession {
            id: 1,
            user_id: 1,
            task_id: 1,
            status: SessionStatus::Completed,
            posts_found: 12,
            date: "2024-05-02T14:30:00Z".to_string(),
        };
        assert_eq!(session.started_on(), NaiveDate::from_ymd_opt(2024, 5, 2));

        session.date = "2024-05-03".to_string();
        assert_eq!(session.started_on(), NaiveDate::from_ymd_opt(2024, 5, 3));

        session.date = "ayer".to_string();
        assert_eq!(session.started_on(), None);
    }

    #[test]
    fn post_processed_flag_defaults_to_false() {
        let json = r#"{"id": 4, "grupo_id": 2, "post_id": "fb_991", "texto": "Muy buena cursada"}"#;
        let post: ScrapedPost = serde_json::from_str(json).unwrap();
        assert!(!post.processed);
        assert_eq!(post.external_id, "fb_991");
    }

    #[test]
    fn sentiment_labels_are_case_insensitive() {
        assert_eq!(Sentiment::from_label("positive"), Some(Sentiment::Positive));
        assert_eq!(Sentiment::from_label(" Negativo "), Some(Sentiment::Negative));
        assert_eq!(Sentiment::from_label("NEUTRAL"), Some(Sentiment::Neutral));
        assert_eq!(Sentiment::from_label("mixed"), None);
    }

    #[test]
    fn recommendation_serializes_with_backend_names() {
        let rec = Recommendation {
            id: 1,
            department_id: 2,
            post_id: 3,
            contributor_id: None,
            text: "Recomiendan la cursada de la tarde".to_string(),
            sentiment: Sentiment::Positive,
            confidence: 0.9,
            useful_votes: 0,
        };
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["catedra_id"], 2);
        assert_eq!(value["post_origen_id"], 3);
        assert_eq!(value["sentimiento"], "POSITIVO");
        assert!(value.get("contribuidor_id").is_none());
    }
}
