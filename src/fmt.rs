use chrono::NaiveDate;

/// Format a float as a dollar amount with thousands separators: $1,234.56
pub fn money(val: f64) -> String {
    let negative = val < 0.0;
    let abs = val.abs();
    let cents = format!("{:.2}", abs);
    let (int_part, dec_part) = cents.split_once('.').unwrap_or((&cents, "00"));

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative {
        format!("-${with_commas}.{dec_part}")
    } else {
        format!("${with_commas}.{dec_part}")
    }
}

/// Percentages as written in split labels: `50%`, `12.5%`.
pub fn percent(val: f64) -> String {
    if val.fract() == 0.0 {
        format!("{}%", val as i64)
    } else {
        let s = format!("{val:.2}");
        format!("{}%", s.trim_end_matches('0').trim_end_matches('.'))
    }
}

/// `04/18/2025`
pub fn mdy(date: NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}

/// `04/18/25`, the short form used inside daily tables.
pub fn mdy_short(date: NaiveDate) -> String {
    date.format("%m/%d/%y").to_string()
}

pub const MONTH_ABBREVS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
