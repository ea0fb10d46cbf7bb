//! Prompt construction for each capture modality

use sdk::capture::{Artifact, Modality};
use sdk::types::Record;
use serde_json::{json, Value};

use super::ExtractionRequest;

const RECEIPT_INSTRUCTIONS: &str = "\
Analiza la imagen de esta factura o ticket y devuelve un objeto JSON.
- party.name: nombre de la tienda o comercio.
- party.id: número de identificación fiscal si aparece.
- party.address: dirección si aparece.
- lineItems: cada artículo comprado con description, quantity y unitPrice. \
Si la cantidad no figura, usa 1.
- notes: resume la fecha (AAAA-MM-DD) y el importe total del ticket.
- complete: true si la imagen contiene todos los datos de la factura.
Si un dato no está claro, infiérelo de la mejor manera posible. \
Omite los campos que no puedas determinar.";

const DICTATION_INSTRUCTIONS: &str = "\
Eres un asistente que arma una factura a partir de lo que dicta el usuario.
Extrae solo los datos nuevos mencionados en la transcripción y devuelve un objeto JSON.
- party: name, id y address del cliente si se mencionan.
- lineItems: productos o servicios nuevos con description, quantity (1 si no se dice) y unitPrice.
- notes: notas o condiciones de pago si se mencionan.
- complete: true solo si el usuario indica que terminó o que no hay nada más que agregar.
No repitas artículos que ya estén en la factura actual. \
Omite los campos que no se mencionen.";

/// Full text prompt for a request
pub fn build_prompt(request: &ExtractionRequest) -> String {
    let mut prompt = String::from(match request.artifact.modality() {
        Modality::Camera => RECEIPT_INSTRUCTIONS,
        Modality::Speech => DICTATION_INSTRUCTIONS,
    });

    if let Some(question) = &request.current_question {
        prompt.push_str("\n\nPregunta actual al usuario: ");
        prompt.push_str(question);
    }

    prompt.push_str("\n\nFactura actual:\n");
    prompt.push_str(&record_context(&request.current_record));

    if let Some(transcript) = transcript_of(request) {
        prompt.push_str("\n\nTranscripción:\n");
        prompt.push_str(transcript);
    }

    prompt
}

fn transcript_of(request: &ExtractionRequest) -> Option<&str> {
    match &request.artifact {
        Artifact::Transcript(text) => Some(text.trim()),
        Artifact::Image { .. } => None,
    }
}

fn record_context(record: &Record) -> String {
    serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
}

/// Gemini `responseSchema` mirroring `PartialResult`
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "party": {
                "type": "OBJECT",
                "properties": {
                    "name": {"type": "STRING", "description": "Nombre del cliente o comercio"},
                    "id": {"type": "STRING", "description": "Identificación fiscal"},
                    "address": {"type": "STRING", "description": "Dirección"}
                }
            },
            "lineItems": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "description": {"type": "STRING"},
                        "quantity": {"type": "NUMBER", "description": "1 si no se especifica"},
                        "unitPrice": {"type": "NUMBER"}
                    },
                    "required": ["description", "unitPrice"]
                }
            },
            "notes": {"type": "STRING"},
            "complete": {"type": "BOOLEAN"}
        }
    })
}
