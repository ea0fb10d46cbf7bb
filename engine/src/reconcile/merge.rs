//! Record merge rules
//!
//! - Party: field-wise override, only by non-empty values
//! - Line items: append in arrival order, never deduplicated
//! - Notes: replaced whenever the key is present, even by an empty string
//!
//! Item identity matching (e.g. collapsing a repeated "3 bolts") would slot in
//! at `append_line_items`; today every extraction's items are appended as-is.

use sdk::types::{LineItem, PartialParty, PartialResult, Party, Record};
use tracing::warn;

/// Override party fields with the non-empty values supplied
pub fn merge_party(party: &mut Party, update: &PartialParty) {
    override_field(&mut party.name, update.name.as_deref());
    override_field(&mut party.id, update.id.as_deref());
    override_field(&mut party.address, update.address.as_deref());
}

fn override_field(slot: &mut Option<String>, value: Option<&str>) {
    if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
        *slot = Some(value.to_string());
    }
}

/// Append new items in order
pub fn append_line_items(items: &mut Vec<LineItem>, new_items: Option<&[LineItem]>) {
    let Some(new_items) = new_items else {
        return;
    };

    for item in new_items {
        if !item.is_well_formed() {
            warn!(
                "Keeping malformed line item '{}' (quantity {}, unit price {})",
                item.description, item.quantity, item.unit_price
            );
        }
    }

    items.extend_from_slice(new_items);
}

/// Replace notes when the partial result carries the key
pub fn replace_notes(notes: &mut String, value: Option<&str>) {
    if let Some(value) = value {
        *notes = value.to_string();
    }
}

/// Merge one partial result into the record
pub fn merge_record(record: &mut Record, partial: &PartialResult) {
    if let Some(party) = &partial.party {
        merge_party(&mut record.party, party);
    }
    append_line_items(&mut record.line_items, partial.line_items.as_deref());
    replace_notes(&mut record.notes, partial.notes.as_deref());
}
