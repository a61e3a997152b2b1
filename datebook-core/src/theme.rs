//! Theme tables: CSS class names and icon classes, looked up by key.
//!
//! Each theme is a complete flat table; nothing is inherited from another.

use serde::Serialize;

use crate::error::{DatebookError, DatebookResult};

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Theme {
    pub key: &'static str,
    pub root_class: &'static str,
    /// Class applied to every icon alongside its own class.
    pub base_icon_class: &'static str,
    class_names: &'static [(&'static str, &'static str)],
    icons: &'static [(&'static str, &'static str)],
    /// Icons swapped when laying out right to left.
    rtl_icons: &'static [(&'static str, &'static str)],
}

impl Theme {
    pub fn class_name(&self, key: &str) -> Option<&'static str> {
        lookup(self.class_names, key)
    }

    /// Full class list for an icon, `None` for unknown icons.
    pub fn icon_class(&self, name: &str, rtl: bool) -> Option<String> {
        let icon = rtl
            .then(|| lookup(self.rtl_icons, name))
            .flatten()
            .or_else(|| lookup(self.icons, name))?;
        Some(format!("{} {}", self.base_icon_class, icon))
    }

    pub fn class_names(&self) -> impl Iterator<Item = (&'static str, &'static str)> {
        self.class_names.iter().copied()
    }
}

fn lookup(table: &'static [(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

pub const STANDARD: Theme = Theme {
    key: "standard",
    root_class: "fc-theme-standard",
    base_icon_class: "fc-icon",
    class_names: &[
        ("table", "fc-scrollgrid"),
        ("tableCellShaded", "fc-cell-shaded"),
        ("buttonGroup", "fc-button-group"),
        ("button", "fc-button fc-button-primary"),
        ("buttonActive", "fc-button-active"),
        ("popover", "fc-popover"),
        ("popoverHeader", "fc-popover-header"),
        ("popoverContent", "fc-popover-body"),
    ],
    icons: &[
        ("close", "fc-icon-x"),
        ("prev", "fc-icon-chevron-left"),
        ("next", "fc-icon-chevron-right"),
        ("prevYear", "fc-icon-chevrons-left"),
        ("nextYear", "fc-icon-chevrons-right"),
    ],
    rtl_icons: &[
        ("prev", "fc-icon-chevron-right"),
        ("next", "fc-icon-chevron-left"),
        ("prevYear", "fc-icon-chevrons-right"),
        ("nextYear", "fc-icon-chevrons-left"),
    ],
};

pub const BOOTSTRAP5: Theme = Theme {
    key: "bootstrap5",
    root_class: "fc-theme-bootstrap5",
    base_icon_class: "bi",
    class_names: &[
        ("table", "table-bordered fc-theme-bootstrap5-shaded"),
        ("tableCellShaded", "fc-theme-bootstrap5-shaded"),
        ("buttonGroup", "btn-group"),
        ("button", "btn btn-primary"),
        ("buttonActive", "active"),
        ("popover", "popover"),
        ("popoverHeader", "popover-header"),
        ("popoverContent", "popover-body"),
    ],
    icons: &[
        ("close", "bi-x-lg"),
        ("prev", "bi-chevron-left"),
        ("next", "bi-chevron-right"),
        ("prevYear", "bi-chevron-double-left"),
        ("nextYear", "bi-chevron-double-right"),
    ],
    rtl_icons: &[
        ("prev", "bi-chevron-right"),
        ("next", "bi-chevron-left"),
        ("prevYear", "bi-chevron-double-right"),
        ("nextYear", "bi-chevron-double-left"),
    ],
};

pub fn theme_for(key: &str) -> DatebookResult<&'static Theme> {
    match key {
        "standard" => Ok(&STANDARD),
        "bootstrap5" | "bootstrap" => Ok(&BOOTSTRAP5),
        other => Err(DatebookError::Config(format!("Unknown theme system '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_key() {
        let theme = theme_for("bootstrap5").unwrap();
        assert_eq!(theme.class_name("button"), Some("btn btn-primary"));
        assert_eq!(theme.icon_class("close", false).as_deref(), Some("bi bi-x-lg"));
        assert_eq!(theme.class_name("nope"), None);
    }

    #[test]
    fn test_rtl_swaps_arrows_only() {
        let theme = theme_for("standard").unwrap();
        assert_eq!(
            theme.icon_class("prev", true).as_deref(),
            Some("fc-icon fc-icon-chevron-right")
        );
        assert_eq!(
            theme.icon_class("close", true).as_deref(),
            Some("fc-icon fc-icon-x")
        );
    }

    #[test]
    fn test_unknown_theme() {
        assert!(matches!(theme_for("material"), Err(DatebookError::Config(_))));
    }
}
