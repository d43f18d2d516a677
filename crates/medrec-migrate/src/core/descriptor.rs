//! Declarative table descriptors.
//!
//! Each destination table is described once: its name, the natural key
//! used for cross-table lookups, and the generated-id column backing a
//! sequence (if any). Sequence reset and parity checks iterate these
//! uniformly instead of branching per table.

/// Descriptor for one destination table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDescriptor {
    /// Destination table name.
    pub name: &'static str,

    /// Natural key column (source-meaningful identifier).
    pub natural_key: &'static str,

    /// Generated-id column whose sequence needs resetting after bulk
    /// load, or None for tables keyed only by natural values.
    pub generated_id: Option<&'static str>,
}

/// The clinical tables in dependency order: tables with no inbound
/// foreign-key dependency first. Payments depend on patients via the
/// name cache, so patients must be listed (and migrated) first.
pub const CLINICAL_TABLES: &[TableDescriptor] = &[
    TableDescriptor {
        name: "patients",
        natural_key: "code",
        generated_id: Some("code"),
    },
    TableDescriptor {
        name: "visits",
        natural_key: "patient_code",
        generated_id: Some("id"),
    },
    TableDescriptor {
        name: "prescriptions",
        natural_key: "patient_code",
        generated_id: Some("id"),
    },
    TableDescriptor {
        name: "payments",
        natural_key: "patient_code",
        generated_id: Some("id"),
    },
];

/// Look up the descriptor for a table name, if one is declared.
#[must_use]
pub fn descriptor_for(name: &str) -> Option<&'static TableDescriptor> {
    CLINICAL_TABLES.iter().find(|d| d.name == name)
}

/// Default table processing order.
#[must_use]
pub fn default_table_order() -> Vec<String> {
    CLINICAL_TABLES.iter().map(|d| d.name.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patients_first() {
        assert_eq!(CLINICAL_TABLES[0].name, "patients");
        let order = default_table_order();
        let patients = order.iter().position(|t| t == "patients").unwrap();
        let payments = order.iter().position(|t| t == "payments").unwrap();
        assert!(patients < payments);
    }

    #[test]
    fn test_lookup() {
        assert_eq!(descriptor_for("visits").unwrap().generated_id, Some("id"));
        assert!(descriptor_for("unknown").is_none());
    }
}
