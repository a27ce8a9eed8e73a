//! State action limits for the pesticide panel.
//!
//! Limits are in ppm (µg/g). Names ending in `*` are summed compound groups;
//! lookups ignore that marker as well as case and surrounding whitespace.

use rust_decimal::Decimal;

/// Limit of quantitation, in ppm, shared by every analyte on the panel.
#[must_use]
pub fn loq() -> Decimal {
    Decimal::new(1, 1)
}

/// One analyte on the reporting panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyteLimit {
    /// Name as printed on reports.
    pub name: &'static str,
    limit_tenths: i64,
}

impl AnalyteLimit {
    /// State action limit in ppm.
    #[must_use]
    pub fn limit_ppm(&self) -> Decimal {
        Decimal::new(self.limit_tenths, 1)
    }
}

const fn entry(name: &'static str, limit_tenths: i64) -> AnalyteLimit {
    AnalyteLimit { name, limit_tenths }
}

/// Every analyte on the panel, in report order.
pub const PANEL: &[AnalyteLimit] = &[
    entry("Abamectin", 5),
    entry("Acephate", 4),
    entry("Acequinocyl", 20),
    entry("Acetamiprid", 2),
    entry("Aldicarb", 4),
    entry("Azoxystrobin", 2),
    entry("Bifenazate", 2),
    entry("Bifenthrin", 2),
    entry("Boscalid", 4),
    entry("Carbaryl", 2),
    entry("Carbofuran", 2),
    entry("Chlorantraniliprole", 2),
    entry("Chlorfenapyr", 10),
    entry("Chlorpyrifos", 2),
    entry("Clofentezine", 2),
    entry("Cyfluthrin", 10),
    entry("Cypermethrin", 10),
    entry("Daminozide", 10),
    entry("Diazinon", 2),
    entry("Dichlorvos", 10),
    entry("Dimethoate", 2),
    entry("Ethoprophos", 2),
    entry("Etofenprox", 4),
    entry("Etoxazole", 2),
    entry("Fenoxycarb", 2),
    entry("Fenpyroximate", 4),
    entry("Fipronil", 4),
    entry("Flonicamid", 10),
    entry("Fludioxonil", 4),
    entry("Hexythiazox", 10),
    entry("Imazalil", 2),
    entry("Imidacloprid", 4),
    entry("Kresoxim-methyl", 4),
    entry("Malathion A", 2),
    entry("Metalaxyl", 2),
    entry("Methiocarb", 2),
    entry("Methomyl", 4),
    entry("Methyl parathion", 2),
    entry("MGK 264", 2),
    entry("Myclobutanil", 2),
    entry("Naled", 5),
    entry("Oxamyl", 10),
    entry("Paclobutrazol", 4),
    entry("Permethrins*", 2),
    entry("Phosmet", 2),
    entry("Piperonyl butoxide", 20),
    entry("Prallethrin", 2),
    entry("Propiconazole", 4),
    entry("Propoxure", 2),
    entry("Pyrethrins*", 10),
    entry("Pyridaben", 2),
    entry("Spinosad*", 2),
    entry("Spiromesifen", 2),
    entry("Spirotetramat", 2),
    entry("Spiroxamine", 4),
    entry("Tebuconazole", 4),
    entry("Thiacloprid", 2),
    entry("Thiamethoxam", 2),
    entry("Trifloxystrobin", 2),
];

/// Key used to compare analyte names against the panel.
#[must_use]
pub fn lookup_key(name: &str) -> String {
    name.trim().trim_end_matches('*').trim_end().to_lowercase()
}

/// Find the panel entry for an analyte name.
#[must_use]
pub fn find(name: &str) -> Option<&'static AnalyteLimit> {
    let key = lookup_key(name);
    PANEL.iter().find(|entry| lookup_key(entry.name) == key)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn panel_has_unique_lookup_keys() {
        let mut keys: Vec<String> = PANEL.iter().map(|e| lookup_key(e.name)).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), PANEL.len());
    }

    #[test]
    fn find_ignores_case_and_group_marker() {
        let entry = find("pyrethrins").expect("pyrethrins on panel");
        assert_eq!(entry.name, "Pyrethrins*");
        assert_eq!(entry.limit_ppm(), Decimal::new(1, 0));

        let entry = find("  MGK 264 ").expect("MGK 264 on panel");
        assert_eq!(entry.limit_ppm(), Decimal::new(2, 1));
    }

    #[test]
    fn find_unknown_analyte() {
        assert!(find("Caffeine").is_none());
    }

    #[test]
    fn loq_is_one_tenth_ppm() {
        assert_eq!(loq().to_string(), "0.1");
    }
}
