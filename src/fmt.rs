/// Group digits in threes: 1234567 -> "1,234,567".
pub fn number(val: i64) -> String {
    let digits = val.unsigned_abs().to_string();
    let mut with_commas = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();
    if val < 0 {
        format!("-{with_commas}")
    } else {
        with_commas
    }
}

/// Format whole yen with thousands separators: ¥1,234
pub fn yen(val: i64) -> String {
    if val < 0 {
        format!("-¥{}", number(val).trim_start_matches('-'))
    } else {
        format!("¥{}", number(val))
    }
}

/// Compact axis label: 74000 -> "74k", 1200000 -> "1.2M".
pub fn compact(val: u64) -> String {
    if val >= 1_000_000 {
        let m = val as f64 / 1_000_000.0;
        if m.fract() < 0.05 {
            format!("{:.0}M", m)
        } else {
            format!("{:.1}M", m)
        }
    } else if val >= 1_000 {
        format!("{}k", val / 1_000)
    } else {
        val.to_string()
    }
}

/// Human-readable file size: 2048 -> "2.0 KB".
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_yen_formatting() {
        assert_eq!(yen(1234), "¥1,234");
        assert_eq!(yen(-500), "-¥500");
        assert_eq!(yen(0), "¥0");
        assert_eq!(yen(1000000), "¥1,000,000");
        assert_eq!(yen(74000), "¥74,000");
        assert_eq!(yen(i64::MIN), "-¥9,223,372,036,854,775,808");
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(number(999), "999");
        assert_eq!(number(1000), "1,000");
        assert_eq!(number(-12345), "-12,345");
    }

    #[test]
    fn test_compact() {
        assert_eq!(compact(950), "950");
        assert_eq!(compact(74_000), "74k");
        assert_eq!(compact(1_000_000), "1M");
        assert_eq!(compact(1_500_000), "1.5M");
    }
}
