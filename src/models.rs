use chrono::NaiveDate;

/// One row of a yearly project list, after column resolution and coercion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SourceRecord {
    pub acgi: String,
    pub dept: String,
    pub project: String,
    pub client_po: String,
    pub line: String,
    pub kind: String,
    pub po_date: Option<NaiveDate>,
    pub invoice_date: Option<NaiveDate>,
    pub amount: f64,
    pub amount_invoiced: f64,
    pub comments: Option<String>,
    pub completion_date: Option<NaiveDate>,
    pub source_year: String,
}

/// A partial invoice announced in a record's comments.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitIntent {
    pub percentage: f64,
    pub date: NaiveDate,
    pub label: String,
}

/// Result of reading a comment against the two split grammars.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitPlan {
    None,
    /// One clause survived: an initial without a rest, or a rest whose
    /// initial date could not be read.
    Single(SplitIntent),
    InitialRest {
        initial: SplitIntent,
        rest: SplitIntent,
    },
    Legacy(Vec<SplitIntent>),
}

impl SplitPlan {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::None => true,
            Self::Legacy(intents) => intents.is_empty(),
            _ => false,
        }
    }

    pub fn intents(&self) -> Vec<&SplitIntent> {
        match self {
            Self::None => Vec::new(),
            Self::Single(intent) => vec![intent],
            Self::InitialRest { initial, rest } => vec![initial, rest],
            Self::Legacy(intents) => intents.iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitInfo {
    pub label: String,
    pub original_amount: f64,
    pub percentage: f64,
}

/// The unit aggregated into ledgers. Derived 1:1 from a record, or 1:N when
/// the record was invoiced in parts.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceEvent {
    pub acgi: String,
    pub dept: String,
    pub project: String,
    pub client_po: String,
    pub line: String,
    pub kind: String,
    pub po_date: Option<NaiveDate>,
    pub amount: f64,
    pub invoice_date: Option<NaiveDate>,
    pub amount_invoiced: f64,
    pub completion_date: Option<NaiveDate>,
    pub source_year: String,
    pub split: Option<SplitInfo>,
}

impl InvoiceEvent {
    pub fn from_record(record: &SourceRecord) -> Self {
        Self {
            acgi: record.acgi.clone(),
            dept: record.dept.clone(),
            project: record.project.clone(),
            client_po: record.client_po.clone(),
            line: record.line.clone(),
            kind: record.kind.clone(),
            po_date: record.po_date,
            amount: record.amount,
            invoice_date: record.invoice_date,
            amount_invoiced: record.amount_invoiced,
            completion_date: record.completion_date,
            source_year: record.source_year.clone(),
            split: None,
        }
    }

    /// Project name with the split label appended, e.g.
    /// `Pump retrofit [50.0% invoiced 04/18/2025]`.
    pub fn display_project(&self) -> String {
        match &self.split {
            Some(split) => format!("{} [{}]", self.project, split.label),
            None => self.project.clone(),
        }
    }

    pub fn sort_key(&self) -> (i64, i64) {
        project_sort_key(&self.acgi)
    }
}

/// Sort key for `YY-NNNN` identifiers. Anything unreadable sorts first.
pub fn project_sort_key(acgi: &str) -> (i64, i64) {
    let s = acgi.trim();
    if s.is_empty() {
        return (0, 0);
    }
    match s.split_once('-') {
        Some((year, num)) => {
            let num = num.trim_start_matches('0');
            let num = if num.is_empty() { "0" } else { num };
            match (year.trim().parse::<i64>(), num.trim().parse::<i64>()) {
                (Ok(y), Ok(n)) => (y, n),
                _ => (0, 0),
            }
        }
        None => s.parse::<i64>().map(|n| (0, n)).unwrap_or((0, 0)),
    }
}

/// Twelve monthly totals plus the YTD slot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MonthlyAccumulator {
    slots: [f64; 13],
}

impl MonthlyAccumulator {
    pub fn from_months(months: [f64; 12]) -> Self {
        let mut acc = Self::default();
        acc.slots[..12].copy_from_slice(&months);
        acc.recompute_ytd();
        acc
    }

    /// Slots as persisted; the YTD slot is taken as-is.
    pub fn from_slots(slots: [f64; 13]) -> Self {
        Self { slots }
    }

    /// `month` is 1-based.
    pub fn month(&self, month: u32) -> f64 {
        self.slots[month as usize - 1]
    }

    pub fn set_month(&mut self, month: u32, value: f64) {
        self.slots[month as usize - 1] = value;
    }

    pub fn ytd(&self) -> f64 {
        self.slots[12]
    }

    pub fn recompute_ytd(&mut self) {
        self.slots[12] = self.slots[..12].iter().sum();
    }

    pub fn slots(&self) -> &[f64; 13] {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_sort_key() {
        assert_eq!(project_sort_key("25-1376"), (25, 1376));
        assert_eq!(project_sort_key("24-0042"), (24, 42));
        assert_eq!(project_sort_key("24-0000"), (24, 0));
        assert_eq!(project_sort_key("1234"), (0, 1234));
        assert_eq!(project_sort_key(""), (0, 0));
        assert_eq!(project_sort_key("TBD"), (0, 0));
        assert_eq!(project_sort_key("xx-12"), (0, 0));
    }

    #[test]
    fn test_display_project_appends_split_label() {
        let mut event = InvoiceEvent::from_record(&SourceRecord {
            project: "Pump retrofit".into(),
            ..SourceRecord::default()
        });
        assert_eq!(event.display_project(), "Pump retrofit");
        event.split = Some(SplitInfo {
            label: "50.0% invoiced 05/13/2025 (rest)".into(),
            original_amount: 10000.0,
            percentage: 50.0,
        });
        assert_eq!(
            event.display_project(),
            "Pump retrofit [50.0% invoiced 05/13/2025 (rest)]"
        );
    }

    #[test]
    fn test_accumulator_ytd_is_sum_of_months() {
        let mut months = [0.0; 12];
        months[0] = 100.0;
        months[5] = 250.5;
        let mut acc = MonthlyAccumulator::from_months(months);
        assert_eq!(acc.ytd(), 350.5);
        acc.set_month(12, 49.5);
        acc.recompute_ytd();
        assert_eq!(acc.ytd(), 400.0);
        assert_eq!(acc.month(6), 250.5);
    }
}
