//! Status label → indicator color lookup.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::led::Color;

/// Lookup table from status label to color.
///
/// Keys are matched verbatim: no case folding, no trimming. The table does not
/// have to cover every label the cluster might report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusColorTable(HashMap<String, Color>);

impl Default for StatusColorTable {
    /// `green` → blue, `yellow` → yellow, `red` → red.
    fn default() -> Self {
        StatusColorTable(HashMap::from([
            ("green".to_string(), Color::BLUE),
            ("yellow".to_string(), Color::YELLOW),
            ("red".to_string(), Color::RED),
        ]))
    }
}

impl From<HashMap<String, Color>> for StatusColorTable {
    fn from(map: HashMap<String, Color>) -> Self {
        StatusColorTable(map)
    }
}

impl StatusColorTable {
    pub fn get(&self, label: &str) -> Option<Color> {
        self.0.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome of mapping a status label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusMapping {
    /// The label has a color.
    Mapped(Color),
    /// The label is not in the table; carries the raw label.
    Unmapped(String),
}

/// Look up `label` in `table`.
pub fn map_status(label: &str, table: &StatusColorTable) -> StatusMapping {
    match table.get(label) {
        Some(color) => StatusMapping::Mapped(color),
        None => StatusMapping::Unmapped(label.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_entries() {
        let table = StatusColorTable::default();
        assert_eq!(table.len(), 3);
        assert_eq!(map_status("green", &table), StatusMapping::Mapped(Color::rgb(0, 0, 255)));
        assert_eq!(map_status("yellow", &table), StatusMapping::Mapped(Color::rgb(255, 255, 0)));
        assert_eq!(map_status("red", &table), StatusMapping::Mapped(Color::rgb(255, 0, 0)));
    }

    #[test]
    fn every_present_label_maps_to_its_color() {
        let table = StatusColorTable::from(HashMap::from([
            ("green".to_string(), Color::rgb(1, 2, 3)),
            ("degraded".to_string(), Color::rgb(200, 100, 0)),
        ]));
        for (label, color) in [("green", Color::rgb(1, 2, 3)), ("degraded", Color::rgb(200, 100, 0))] {
            assert_eq!(map_status(label, &table), StatusMapping::Mapped(color));
        }
    }

    #[test]
    fn absent_label_is_unmapped_with_raw_label() {
        let table = StatusColorTable::from(HashMap::from([
            ("green".to_string(), Color::GREEN),
            ("red".to_string(), Color::RED),
        ]));
        assert_eq!(
            map_status("orange", &table),
            StatusMapping::Unmapped("orange".into())
        );
    }

    #[test]
    fn lookup_is_exact_match() {
        let table = StatusColorTable::default();
        assert_eq!(map_status("Green", &table), StatusMapping::Unmapped("Green".into()));
        assert_eq!(map_status(" green", &table), StatusMapping::Unmapped(" green".into()));
    }

    #[test]
    fn empty_table_maps_nothing() {
        let table = StatusColorTable::from(HashMap::new());
        assert!(table.is_empty());
        assert!(matches!(map_status("green", &table), StatusMapping::Unmapped(_)));
    }

    #[test]
    fn deserializes_from_plain_map() {
        let table: StatusColorTable =
            serde_json::from_str(r#"{"green": [0, 0, 255], "red": "red"}"#).unwrap();
        assert_eq!(table.get("green"), Some(Color::BLUE));
        assert_eq!(table.get("red"), Some(Color::RED));
    }
}
