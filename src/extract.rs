//! Event extraction from article text via the language model.
//!
//! The model is treated as an opaque, possibly-unreliable oracle with a
//! strict contract: a JSON object matching the event schema, or an explicit
//! "not relevant" marker. Anything else (prose around the JSON, a fenced
//! code block, a truncated or entirely malformed reply) is recovered where
//! possible and otherwise logged and treated as "not relevant".
//!
//! # Wire format
//!
//! The model replies with Spanish keys, matching the prompt's schema:
//!
//! ```json
//! { "es_evento_relevante": true, "fecha": "YYYY-MM-DD", "horario": "HH:MM",
//!   "lugar": "...", "quien": "...", "tipo_medida": "...", "motivo": "..." }
//! ```

use crate::api::Ask;
use crate::models::{EventRecord, Field, SourceSet, UNSPECIFIED};
use crate::utils::{looks_truncated, truncate_for_log};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{instrument, warn};

/// Article text beyond this many characters is not sent to the model.
const MAX_ARTICLE_CHARS: usize = 4000;

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*(\{.*?\})\s*```").unwrap());
static BARE_JSON: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// Event schema as the model emits it.
#[derive(Debug, Deserialize)]
struct WireEvent {
    #[serde(default)]
    es_evento_relevante: bool,
    #[serde(default)]
    fecha: Option<String>,
    #[serde(default)]
    horario: Option<String>,
    #[serde(default)]
    lugar: Option<String>,
    #[serde(default)]
    quien: Option<String>,
    #[serde(default)]
    tipo_medida: Option<String>,
    #[serde(default)]
    motivo: Option<String>,
}

impl WireEvent {
    fn into_record(self) -> EventRecord {
        EventRecord {
            date: Field::from(self.fecha),
            time: Field::from(self.horario),
            place: Field::from(self.lugar),
            organizer: Field::from(self.quien),
            measure_type: Field::from(self.tipo_medida),
            reason: Field::from(self.motivo),
            sources: SourceSet::new(),
        }
    }
}

fn clip_article(text: &str) -> &str {
    match text.char_indices().nth(MAX_ARTICLE_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Build the full-event extraction prompt for one article.
pub fn event_prompt(article_text: &str, reference_date: NaiveDate) -> String {
    let fecha = reference_date.format("%Y-%m-%d");
    format!(
        "Eres un asistente experto en conflictividad social en Argentina. Tu misión es \
         monitorear protestas. Analiza el siguiente texto de una noticia. La fecha de \
         referencia es {fecha}. Determina si el texto describe un evento de protesta \
         (movilización, corte, marcha, paro, etc.) que vaya a ocurrir en el futuro, \
         incluyendo más tarde el mismo día de la referencia.\n\n\
         Si encuentras un evento futuro, rellena TODOS los campos del siguiente JSON. \
         Sé proactivo: infiere la información del contexto si no es explícita.\n\n\
         Formato de salida OBLIGATORIO (JSON):\n\
         {{\n\
           \"es_evento_relevante\": true,\n\
           \"fecha\": \"YYYY-MM-DD\",\n\
           \"horario\": \"HH:MM\",\n\
           \"lugar\": \"Lugar específico del evento\",\n\
           \"quien\": \"Grupo, sindicato o colectivo que organiza\",\n\
           \"tipo_medida\": \"Tipo de medida (ej: Paro, Marcha, Movilización, Piquete, Acampe)\",\n\
           \"motivo\": \"Resumen conciso del reclamo\"\n\
         }}\n\n\
         REGLAS ESTRICTAS:\n\
         1. FECHA: formato YYYY-MM-DD. Usa la fecha de referencia para calcular fechas \
         relativas como \"mañana\" o \"el próximo lunes\".\n\
         2. TIPO DE MEDIDA: identifica la naturaleza de la protesta. Sé específico.\n\
         3. PERSISTENCIA: si un dato no es obvio, trata de inferirlo. Si dice \"el gremio \
         de camioneros\", quien es \"Camioneros\". Si dice \"frente al Congreso\", lugar es \
         \"Congreso Nacional\".\n\
         4. Usa \"{UNSPECIFIED}\" como ÚLTIMO RECURSO, solo si es imposible deducir el dato.\n\
         5. EVENTOS PASADOS: si el texto habla de un evento que ya ocurrió, devuelve \
         {{\"es_evento_relevante\": false}}.\n\n\
         Si el texto no contiene información sobre una protesta futura, devuelve \
         {{\"es_evento_relevante\": false}}.\n\n\
         DEVUELVE ÚNICA Y EXCLUSIVAMENTE EL OBJETO JSON SOLICITADO, SIN EXPLICACIONES NI \
         TEXTO ADICIONAL.\n\n\
         Texto de la noticia a analizar:\n---\n{body}\n---",
        body = clip_article(article_text),
    )
}

/// Build the narrow prompt that asks only for an event's start time.
pub fn time_prompt(article_text: &str) -> String {
    format!(
        "Analiza el siguiente texto y dime SOLAMENTE la hora de inicio del evento de \
         protesta. La hora debe estar en formato HH:MM. Si no encuentras una hora, \
         responde '{UNSPECIFIED}'.\n\nTexto:\n---\n{body}\n---",
        body = clip_article(article_text),
    )
}

/// Pull the JSON object out of a free-form model reply.
///
/// Tries an explicit fenced ```json block first, then falls back to the
/// first brace-delimited object anywhere in the reply.
pub fn find_json_block(raw: &str) -> Option<&str> {
    if let Some(caps) = FENCED_JSON.captures(raw) {
        return Some(caps.get(1).unwrap().as_str());
    }
    BARE_JSON.find(raw).map(|m| m.as_str())
}

fn parse_reply(raw: &str) -> Result<Option<EventRecord>, serde_json::Error> {
    let block = match find_json_block(raw) {
        Some(block) => block,
        None => {
            warn!(
                reply = %truncate_for_log(raw, 300),
                "Model reply contained no JSON object; treating as not relevant"
            );
            return Ok(None);
        }
    };

    let wire: WireEvent = serde_json::from_str(block)?;
    if wire.es_evento_relevante {
        Ok(Some(wire.into_record()))
    } else {
        Ok(None)
    }
}

/// Ask the model whether `article_text` announces a future protest event.
///
/// Returns `None` for "not relevant", for malformed replies, and for API
/// failures, none of which abort the run. A reply that parses as truncated
/// JSON earns exactly one re-ask.
#[instrument(level = "info", skip_all)]
pub async fn extract_event<L: Ask>(
    llm: &L,
    article_text: &str,
    reference_date: NaiveDate,
) -> Option<EventRecord> {
    let prompt = event_prompt(article_text, reference_date);

    let reply = match llm.ask(&prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!(error = %e, "Extraction call failed; treating article as not relevant");
            return None;
        }
    };

    match parse_reply(&reply) {
        Ok(record) => record,
        Err(e) if looks_truncated(&e) => {
            warn!(error = %e, "Truncated JSON in model reply; re-asking once");
            let reply = match llm.ask(&prompt).await {
                Ok(reply) => reply,
                Err(e2) => {
                    warn!(error = %e2, "Re-ask failed; treating article as not relevant");
                    return None;
                }
            };
            match parse_reply(&reply) {
                Ok(record) => record,
                Err(e2) => {
                    warn!(
                        error = %e2,
                        reply = %truncate_for_log(&reply, 300),
                        "Model returned non-conforming JSON; treating article as not relevant"
                    );
                    None
                }
            }
        }
        Err(e) => {
            warn!(
                error = %e,
                reply = %truncate_for_log(&reply, 300),
                "Model returned non-conforming JSON; treating article as not relevant"
            );
            None
        }
    }
}

/// Ask the model for the start time mentioned in `article_text`.
///
/// The trimmed reply is adopted verbatim when it is not the sentinel; an
/// empty or sentinel reply (and any API failure) normalizes to unspecified.
#[instrument(level = "info", skip_all)]
pub async fn extract_time<L: Ask>(llm: &L, article_text: &str) -> Field {
    match llm.ask(&time_prompt(article_text)).await {
        Ok(reply) => Field::from(reply),
        Err(e) => {
            warn!(error = %e, "Time extraction call failed");
            Field::Unspecified
        }
    }
}
