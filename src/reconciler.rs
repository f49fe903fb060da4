use crate::fmt::money;
use crate::models::{InvoiceEvent, SourceRecord, SplitInfo, SplitIntent, SplitPlan};
use crate::runlog::RunLog;

pub const TOLERANCE: f64 = 0.01;

/// Expand one record into the invoice events it stands for.
///
/// Without intents, or when the record is already fully invoiced, the record
/// maps to a single event. An initial+rest plan assigns the already-invoiced
/// amount to the initial date and the remainder to the rest date; every other
/// shape is allocated proportionally to the stated percentages.
pub fn reconcile(record: &SourceRecord, plan: &SplitPlan, log: &mut RunLog) -> Vec<InvoiceEvent> {
    if plan.is_empty() {
        return vec![InvoiceEvent::from_record(record)];
    }

    if (record.amount - record.amount_invoiced).abs() <= TOLERANCE {
        let mut event = InvoiceEvent::from_record(record);
        event.amount_invoiced = record.amount;
        return vec![event];
    }

    let events: Vec<InvoiceEvent> = match plan {
        SplitPlan::InitialRest { initial, rest } => vec![
            split_event(record, initial, record.amount_invoiced),
            split_event(record, rest, record.amount - record.amount_invoiced),
        ],
        _ => plan
            .intents()
            .into_iter()
            .map(|intent| split_event(record, intent, record.amount * intent.percentage / 100.0))
            .collect(),
    };

    let total: f64 = events.iter().map(|e| e.amount_invoiced).sum();
    if (total - record.amount).abs() > TOLERANCE {
        log.warn(format!(
            "Split invoice total ({}) doesn't equal original amount ({}) for {}",
            money(total),
            money(record.amount),
            record.acgi
        ));
    }
    events
}

fn split_event(record: &SourceRecord, intent: &SplitIntent, amount: f64) -> InvoiceEvent {
    let mut event = InvoiceEvent::from_record(record);
    event.invoice_date = Some(intent.date);
    event.amount_invoiced = amount;
    event.split = Some(SplitInfo {
        label: intent.label.clone(),
        original_amount: record.amount,
        percentage: intent.percentage,
    });
    event
}
