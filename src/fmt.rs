fn group_thousands(int_part: &str) -> String {
    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    with_commas.chars().rev().collect()
}

/// Format a float as rupees with thousands separators: ₹ 1,234.56
pub fn rupees(val: f64) -> String {
    let negative = val < 0.0;
    let fixed = format!("{:.2}", val.abs());
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((&fixed, "00"));
    let grouped = group_thousands(int_part);
    if negative {
        format!("-₹ {grouped}.{dec_part}")
    } else {
        format!("₹ {grouped}.{dec_part}")
    }
}

/// Whole rupees, rounded: ₹ 1,235
pub fn rupees_whole(val: f64) -> String {
    let rounded = val.round();
    let grouped = group_thousands(&format!("{:.0}", rounded.abs()));
    if rounded < 0.0 {
        format!("-₹ {grouped}")
    } else {
        format!("₹ {grouped}")
    }
}

/// Quantity with separators and at most two decimals: 1,250.5
pub fn quantity(val: f64) -> String {
    let fixed = format!("{:.2}", val.abs());
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((&fixed, "00"));
    let dec = dec_part.trim_end_matches('0');
    let sign = if val < 0.0 && fixed != "0.00" { "-" } else { "" };
    let grouped = group_thousands(int_part);
    if dec.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{dec}")
    }
}

pub fn percent(val: Option<f64>) -> String {
    match val {
        Some(p) => format!("{p:.2}%"),
        None => String::new(),
    }
}
