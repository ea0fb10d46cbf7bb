//! Terminal rendering of session snapshots

use sdk::types::{LineItem, Party, Record};
use std::fmt;

use crate::config::DisplayConfig;
use crate::reconcile::{Phase, SessionSnapshot};

const NOT_SPECIFIED: &str = "No especificado";

/// Banner describing what the session is waiting for
pub fn phase_banner(snapshot: &SessionSnapshot) -> String {
    match snapshot.phase {
        Phase::Idle => "Bienvenido. Dictá los datos de la factura para comenzar.".to_string(),
        Phase::Capturing => "Escuchando...".to_string(),
        Phase::Processing => "Procesando... la IA está analizando la información.".to_string(),
        Phase::Guided => snapshot
            .current_question
            .clone()
            .unwrap_or_else(|| "Continuá dictando.".to_string()),
        Phase::Review => {
            "Revisá la factura. Confirmá con :done o seguí dictando para editar.".to_string()
        }
        Phase::Finalized => "Factura finalizada.".to_string(),
        Phase::Error => format!(
            "Ocurrió un error: {}",
            snapshot
                .last_error
                .as_deref()
                .unwrap_or("problema inesperado")
        ),
    }
}

/// Full text view: banner, party card, items table and notes
pub fn render_snapshot(snapshot: &SessionSnapshot, display: &DisplayConfig) -> String {
    format!(
        "== {} ==\n\n{}",
        phase_banner(snapshot),
        RecordView {
            record: &snapshot.record,
            display,
        }
    )
}

pub fn render_record(record: &Record, display: &DisplayConfig) -> String {
    RecordView { record, display }.to_string()
}

struct RecordView<'a> {
    record: &'a Record,
    display: &'a DisplayConfig,
}

impl fmt::Display for RecordView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_party(f, &self.record.party)?;
        writeln!(f)?;
        write_items(
            f,
            &self.record.line_items,
            self.record.total(),
            &self.display.currency_symbol,
        )?;

        if !self.record.notes.is_empty() {
            writeln!(f)?;
            writeln!(f, "Notas")?;
            writeln!(f, "  {}", self.record.notes)?;
        }
        Ok(())
    }
}

fn write_party(f: &mut fmt::Formatter<'_>, party: &Party) -> fmt::Result {
    writeln!(f, "Cliente")?;
    if party.is_empty() {
        return writeln!(f, "  Aún no se cargaron datos del cliente.");
    }

    let field = |v: &Option<String>| v.clone().unwrap_or_else(|| NOT_SPECIFIED.to_string());
    writeln!(f, "  Nombre:    {}", field(&party.name))?;
    writeln!(f, "  ID/CUIT:   {}", field(&party.id))?;
    writeln!(f, "  Dirección: {}", field(&party.address))
}

fn write_items(
    f: &mut fmt::Formatter<'_>,
    items: &[LineItem],
    total: f64,
    symbol: &str,
) -> fmt::Result {
    writeln!(f, "Artículos")?;
    if items.is_empty() {
        return writeln!(f, "  Aún no se agregaron artículos.");
    }

    let width = items
        .iter()
        .map(|i| i.description.chars().count())
        .max()
        .unwrap_or(0)
        .max("Descripción".chars().count());

    writeln!(
        f,
        "  {:<width$}  {:>8}  {:>14}  {:>14}",
        "Descripción",
        "Cant.",
        "P. Unitario",
        "Subtotal",
        width = width
    )?;
    for item in items {
        writeln!(
            f,
            "  {:<width$}  {:>8}  {:>14}  {:>14}",
            item.description,
            format_quantity(item.quantity),
            format_amount(item.unit_price, symbol),
            format_amount(item.subtotal(), symbol),
            width = width
        )?;
    }
    writeln!(
        f,
        "  {:>width$}  {:>14}",
        "Total",
        format_amount(total, symbol),
        width = width + 2 + 8 + 2 + 14
    )
}

/// Two decimals with the currency symbol in front
pub fn format_amount(amount: f64, symbol: &str) -> String {
    format!("{} {:.2}", symbol, amount)
}

/// Whole quantities without decimals
fn format_quantity(quantity: f64) -> String {
    if quantity.fract() == 0.0 {
        format!("{:.0}", quantity)
    } else {
        format!("{}", quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn snapshot(phase: Phase, record: Record) -> SessionSnapshot {
        SessionSnapshot {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            phase,
            record,
            question_index: 1,
            current_question: Some("¿Qué artículos?".to_string()),
            last_error: None,
        }
    }

    #[test]
    fn test_banner_shows_current_question_when_guided() {
        let s = snapshot(Phase::Guided, Record::default());
        assert_eq!(phase_banner(&s), "¿Qué artículos?");
    }

    #[test]
    fn test_banner_shows_error_message() {
        let mut s = snapshot(Phase::Error, Record::default());
        s.last_error = Some("Rate limit exceeded".to_string());
        assert!(phase_banner(&s).contains("Rate limit exceeded"));
    }

    #[test]
    fn test_empty_record_placeholders() {
        let text = render_record(&Record::default(), &DisplayConfig::default());
        assert!(text.contains("Aún no se cargaron datos del cliente."));
        assert!(text.contains("Aún no se agregaron artículos."));
        assert!(!text.contains("Notas"));
    }

    #[test]
    fn test_partial_party_shows_not_specified() {
        let mut record = Record::default();
        record.party.name = Some("Acme".to_string());
        let text = render_record(&record, &DisplayConfig::default());
        assert!(text.contains("Nombre:    Acme"));
        assert!(text.contains("ID/CUIT:   No especificado"));
    }

    #[test]
    fn test_items_table_with_total() {
        let mut record = Record::default();
        record.line_items.push(LineItem::new("Tornillo", 10.0, 2.5));
        record.line_items.push(LineItem::new("Tuerca", 1.5, 4.0));
        record.notes = "Pago contado".to_string();

        let text = render_record(&record, &DisplayConfig::default());
        assert!(text.contains("$ 25.00"));
        assert!(text.contains("1.5"));
        assert!(text.contains("$ 31.00"));
        assert!(text.contains("Pago contado"));
    }

    #[test]
    fn test_format_amount_uses_symbol() {
        assert_eq!(format_amount(1234.5, "ARS"), "ARS 1234.50");
    }

    #[test]
    fn test_snapshot_view_has_banner_then_record() {
        let mut record = Record::default();
        record.line_items.push(LineItem::new("Tornillo", 2.0, 1.0));
        let text = render_snapshot(&snapshot(Phase::Review, record), &DisplayConfig::default());

        assert!(text.starts_with("== Revisá la factura."));
        let cliente = text.find("Cliente").unwrap();
        let articulos = text.find("Artículos").unwrap();
        assert!(cliente < articulos);
        assert!(text.contains("$ 2.00"));
    }
}
